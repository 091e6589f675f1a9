#![doc(html_root_url = "https://docs.rs/imagecompare/0.1.0")]
#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

//! # imagecompare
//!
//! An HTTP service that scores how similar two images are by asking a hosted
//! multimodal model (Google Gemini), plus a load generator to exercise it.
//!
//! ## Features
//!
//! - **Image Decoding**: base64 and data-URL input, size limit, color
//!   normalization and downscaling
//! - **Model Client**: a `VisionModel` trait with a Gemini implementation
//! - **Reply Parsing**: tolerant `Score:` / `Explanation:` parsing that never fails
//! - **Result Cache**: bounded TTL cache keyed by a fingerprint of the two inputs
//! - **Web API**: `GET /` and `POST /compare` with an `X-Cache` header
//! - **Load Generator**: simulated users replaying `POST /compare`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use imagecompare::{AppState, Config, GeminiClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let model = GeminiClient::new(&config.api_key, &config.api_base, &config.model, None)?;
//!     let state = AppState::new(config, Arc::new(model));
//!     let comparison = state.comparator.compare("iVBOR...", "iVBOR...").await?;
//!     println!("{:?}", comparison.result.similarity_score);
//!     Ok(())
//! }
//! ```

// Internal modules
pub mod api;
pub mod core;
/// Defines the application's error types and result aliases.
pub mod error;
pub mod loadgen;
pub mod models;
mod state;
mod utils;

/// Build-time information generated by `build.rs`.
#[allow(missing_docs, dead_code, unreachable_pub)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

// Public API exports
pub use crate::{
    core::{
        cache::{CacheConfig, ResultCache},
        compare::{Comparator, COMPARISON_PROMPT},
        decode::{decode_base64_image, ColorMode, DecodedImage, EncodedImage, ImageLimits},
        hash::Fingerprint,
        model::{GeminiClient, VisionModel},
        reply::{parse_reply, ParseFailure, ParsedReply},
    },
    error::{AppError, Result, ResultExt},
    models::comparison::{CacheStatus, Comparison, ComparisonRequest, ComparisonResult, ComparisonStatus},
    state::{AppState, Config},
};

#[cfg(feature = "web")]
pub use crate::api::{compare_images, create_router, read_root};

/// Initialize logging with default settings
///
/// Honors `RUST_LOG`, defaulting to `info`. Calling it more than once is
/// harmless; later calls leave the first logger in place.
///
/// # Example
///
/// ```no_run
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     imagecompare::init()?;
///     // Application code here
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    let env = env_logger::Env::default()
        .default_filter_or("info")
        .default_write_style_or("auto");

    let installed = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_module_path(false)
        .try_init()
        .is_ok();

    if installed {
        log::info!(
            "Initializing imagecompare v{} (built {})",
            built_info::PKG_VERSION,
            built_info::BUILT_TIME_UTC
        );
    }
    Ok(())
}
