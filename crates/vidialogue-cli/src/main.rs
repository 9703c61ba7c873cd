use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{
    io,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};
use tracing_subscriber::EnvFilter;
use vidialogue_capture::{
    dialogue::{self, DEFAULT_SCRIPT_DELAY},
    ensure_ffmpeg_installed,
    frames::{self, DEFAULT_PERIOD, FfmpegGrabber, FrameFeed, FrameSource},
};
use vidialogue_core::{
    Conversation, ConversationConfig, MockModel, ModelClient,
    context::{DEFAULT_BUFFER_SIZE, DEFAULT_RECAP_LIMIT},
};
use vidialogue_remote::{OpenAIClient, OpenAIConfig};

const MOCK_DELAY: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(
    name = "vidialogue",
    version,
    about = "Talk to a vision-language model that watches a camera or video"
)]
struct Cli {
    /// Log filter, e.g. `info` or `vidialogue_core=debug`. Falls back to RUST_LOG.
    #[arg(long, global = true, env = "VIDIALOGUE_LOG")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a dialogue while frames are fed in the background.
    Chat(ChatArgs),
    /// List video capture devices.
    Devices,
}

#[derive(Args)]
struct ChatArgs {
    /// Video file to sample frames from instead of the camera.
    #[arg(long)]
    video: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    device: usize,
    /// JSON array of utterances to play instead of reading stdin.
    #[arg(long)]
    script: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_SCRIPT_DELAY.as_secs())]
    script_delay: u64,
    /// Seconds between frames.
    #[arg(long, default_value_t = DEFAULT_PERIOD.as_secs())]
    period: u64,
    #[arg(long, default_value_t = 1)]
    every_nth: usize,
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,
    #[arg(long, default_value_t = DEFAULT_RECAP_LIMIT)]
    recap_limit: usize,
    /// File holding a replacement persona prompt.
    #[arg(long)]
    persona_file: Option<PathBuf>,
    /// Use the offline mock model instead of the API.
    #[arg(long)]
    mock: bool,
    #[arg(long, env = "VIDIALOGUE_MODEL")]
    model: Option<String>,
}

fn init_tracing(level: Option<&str>) {
    let filter = level.map(EnvFilter::new).unwrap_or_else(|| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_client(args: &ChatArgs) -> Result<Arc<dyn ModelClient>> {
    if args.mock {
        return Ok(Arc::new(MockModel::new().with_delay(MOCK_DELAY)));
    }
    let mut config = OpenAIConfig::from_env()?;
    if let Some(model) = &args.model {
        config = config.with_model(model.as_str());
    }
    Ok(Arc::new(OpenAIClient::new(config)?))
}

fn build_config(args: &ChatArgs) -> Result<ConversationConfig> {
    let mut config = ConversationConfig::default()
        .with_buffer_size(args.buffer_size)
        .with_recap_limit(args.recap_limit);
    if let Some(path) = &args.persona_file {
        let persona = std::fs::read_to_string(path)
            .with_context(|| format!("could not read persona file {}", path.display()))?;
        config = config.with_persona(persona.trim());
    }
    Ok(config)
}

fn frame_source(args: &ChatArgs) -> FrameSource {
    match &args.video {
        Some(path) => FrameSource::VideoFile(path.clone()),
        None => FrameSource::Camera {
            device: args.device,
        },
    }
}

fn run_dialogue(args: &ChatArgs, conversation: &Conversation) -> Result<usize> {
    let on_message = |text: &str| conversation.add_text(text);
    let answered = match &args.script {
        Some(path) => {
            tracing::info!(script = %path.display(), "using script");
            let script = dialogue::load_script(path)?;
            dialogue::run_script(
                &script,
                Duration::from_secs(args.script_delay),
                io::stdout().lock(),
                on_message,
            )?
        }
        None => dialogue::run_interactive(io::stdin().lock(), io::stdout().lock(), on_message)?,
    };
    Ok(answered)
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let client = build_client(&args)?;
    let config = build_config(&args)?;
    let conversation = Arc::new(Conversation::new(client.clone(), config)?);
    tracing::info!(model = client.id(), "conversation started");

    ensure_ffmpeg_installed()?;
    let source = frame_source(&args);
    tracing::info!(?source, "starting frame feed");
    let feed = FrameFeed::new(Duration::from_secs(args.period)).with_every_nth(args.every_nth);
    let stop = Arc::new(AtomicBool::new(false));
    let frame_thread = {
        let conversation = conversation.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut grabber = FfmpegGrabber::new(source, feed.period);
            feed.run(&mut grabber, |frame| conversation.add_frame(frame), &stop)
        })
    };

    let dialogue = run_dialogue(&args, &conversation);

    stop.store(true, Ordering::SeqCst);
    tracing::info!("waiting for frame feed to stop");
    match frame_thread.join() {
        Ok(Ok(sent)) => tracing::info!(sent, "frame feed stopped"),
        Ok(Err(e)) => tracing::warn!(error = %e, "frame feed ended with an error"),
        Err(_) => tracing::error!("frame feed thread panicked"),
    }

    let answered = dialogue?;
    tracing::info!(answered, frames = conversation.frame_count()?, "dialogue finished");
    tracing::debug!(transcript = %conversation.transcript()?, "final conversation");
    Ok(())
}

fn run_devices() -> Result<()> {
    let devices = frames::list_video_input_devices()?;
    if devices.is_empty() {
        println!("No video input devices found");
    }
    for (index, name) in devices.iter().enumerate() {
        println!("[{index}] {name}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    match cli.command {
        Commands::Chat(args) => run_chat(args),
        Commands::Devices => run_devices(),
    }
}
