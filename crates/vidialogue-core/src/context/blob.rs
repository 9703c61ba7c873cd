use base64::{Engine, engine::general_purpose::STANDARD};
use std::sync::Arc;

pub const JPEG_MIME: &str = "image/jpeg";

/// Encoded image bytes as handed over by a frame producer. Never decoded here.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameBlob {
    pub bytes: Arc<[u8]>,
    pub mime: &'static str,
}

impl FrameBlob {
    pub fn jpeg(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: JPEG_MIME,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}
