#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use imagecompare::{AppError, AppState, Config, EncodedImage, Result, VisionModel};

/// Model double answering with canned replies in turn.
pub struct ScriptedModel {
    replies: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Arc<Self> {
        Arc::new(Self {
            replies: replies.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _prompt: &str, images: &[EncodedImage]) -> Result<String> {
        assert_eq!(images.len(), 2);
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .get(n % self.replies.len().max(1))
            .cloned()
            .ok_or_else(|| AppError::Model("no scripted reply".to_string()))
    }
}

pub fn state_with(model: Arc<ScriptedModel>, config: Config) -> Arc<AppState> {
    AppState::new(config, model)
}

/// Base64 PNG of a solid-color image.
pub fn png_base64(width: u32, height: u32, color: [u8; 3]) -> String {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    STANDARD.encode(&buf)
}

/// Raw PNG bytes of a solid-color image.
pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    STANDARD.decode(png_base64(width, height, color)).unwrap()
}
