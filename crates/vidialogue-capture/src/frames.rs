use super::VDCaptureError;
use std::{
    fmt::Display,
    path::PathBuf,
    process::Command,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);
const JPEG_MAGIC: [u8; 3] = [0xff, 0xd8, 0xff];

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FrameSource {
    Camera { device: usize },
    VideoFile(PathBuf),
}

pub fn is_jpeg(bytes: &[u8]) -> bool {
    bytes.starts_with(&JPEG_MAGIC)
}

/// Anything that yields encoded frames one at a time. `None` means the source is exhausted.
pub trait FrameGrabber {
    fn grab(&mut self) -> Result<Option<Vec<u8>>, VDCaptureError>;
}

/// Grabs single JPEG frames through `ffmpeg`.
///
/// Video files are sampled at `n * period`, so playback keeps pace with the feed.
pub struct FfmpegGrabber {
    source: FrameSource,
    period: Duration,
    next_offset: Duration,
}

impl FfmpegGrabber {
    pub fn new(source: FrameSource, period: Duration) -> Self {
        Self {
            source,
            period,
            next_offset: Duration::ZERO,
        }
    }
}

fn camera_input_args(device: usize) -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec![
            "-f".into(),
            "avfoundation".into(),
            "-framerate".into(),
            "30".into(),
            "-pixel_format".into(),
            "uyvy422".into(),
            "-i".into(),
            format!("{device}:none"),
        ]
    } else {
        vec![
            "-f".into(),
            "v4l2".into(),
            "-i".into(),
            format!("/dev/video{device}"),
        ]
    }
}

pub fn ffmpeg_args(source: &FrameSource, offset: Duration) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
    match source {
        FrameSource::Camera { device } => args.extend(camera_input_args(*device)),
        FrameSource::VideoFile(path) => {
            args.push("-ss".into());
            args.push(format!("{:.3}", offset.as_secs_f64()));
            args.push("-i".into());
            args.push(path.display().to_string());
        }
    }
    args.extend(
        ["-frames:v", "1", "-f", "image2pipe", "-vcodec", "mjpeg", "pipe:1"]
            .into_iter()
            .map(String::from),
    );
    args
}

pub fn grab_frame(
    source: &FrameSource,
    offset: Duration,
) -> Result<Option<Vec<u8>>, VDCaptureError> {
    let output = Command::new("ffmpeg").args(ffmpeg_args(source, offset)).output()?;
    if !output.status.success() {
        return Err(VDCaptureError::Ffmpeg(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    if output.stdout.is_empty() {
        return Ok(None);
    }
    Ok(Some(output.stdout))
}

impl FrameGrabber for FfmpegGrabber {
    fn grab(&mut self) -> Result<Option<Vec<u8>>, VDCaptureError> {
        let frame = grab_frame(&self.source, self.next_offset)?;
        self.next_offset += self.period;
        Ok(frame)
    }
}

pub fn parse_avfoundation_devices(listing: &str) -> Vec<String> {
    let mut devices = Vec::new();
    let mut in_video_section = false;
    for line in listing.lines() {
        if line.contains("AVFoundation video devices:") {
            in_video_section = true;
            continue;
        }
        if line.contains("AVFoundation audio devices:") {
            break;
        }
        if in_video_section && let Some(idx) = line.rfind(']') {
            devices.push(line[idx + 1..].trim().to_owned());
        }
    }
    devices
}

pub fn list_video_input_devices() -> Result<Vec<String>, VDCaptureError> {
    if !cfg!(target_os = "macos") {
        let mut devices: Vec<String> = std::fs::read_dir("/dev")?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("video"))
            .collect();
        devices.sort();
        return Ok(devices);
    }
    let output = Command::new("ffmpeg")
        .args(["-f", "avfoundation", "-list_devices", "true", "-i", ""])
        .output()?;
    Ok(parse_avfoundation_devices(&String::from_utf8_lossy(
        &output.stderr,
    )))
}

#[derive(Clone, Debug)]
pub struct FrameFeed {
    pub period: Duration,
    /// Forward only every n-th JPEG frame. 1 forwards all of them.
    pub every_nth: usize,
}

impl Default for FrameFeed {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            every_nth: 1,
        }
    }
}

impl FrameFeed {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    pub fn with_every_nth(mut self, every_nth: usize) -> Self {
        self.every_nth = every_nth.max(1);
        self
    }

    /// Pumps frames into `sink` until the source runs dry or `stop` is set.
    ///
    /// `stop` is checked once per iteration. Sink failures are logged and the feed goes on.
    /// Returns the number of frames handed to the sink.
    pub fn run<G, S, E>(
        &self,
        grabber: &mut G,
        mut sink: S,
        stop: &AtomicBool,
    ) -> Result<usize, VDCaptureError>
    where
        G: FrameGrabber,
        S: FnMut(Vec<u8>) -> Result<(), E>,
        E: Display,
    {
        let mut jpegs = 0usize;
        let mut sent = 0usize;
        while !stop.load(Ordering::SeqCst) {
            let Some(frame) = grabber.grab()? else {
                tracing::info!(sent, "frame source exhausted");
                break;
            };
            if !is_jpeg(&frame) {
                tracing::warn!(len = frame.len(), "skipping non-JPEG frame");
            } else {
                if jpegs % self.every_nth.max(1) == 0 {
                    match sink(frame) {
                        Ok(()) => {
                            sent += 1;
                            tracing::debug!(sent, "frame sent");
                        }
                        Err(e) => tracing::warn!(error = %e, "frame was not recorded"),
                    }
                }
                jpegs += 1;
            }
            if !self.period.is_zero() {
                thread::sleep(self.period);
            }
        }
        Ok(sent)
    }
}
