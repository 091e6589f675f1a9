use std::sync::Arc;

use serde_json::json;

use crate::core::cache::{CacheConfig, ResultCache};
use crate::core::decode::{decode_base64_image, DecodedImage, EncodedImage, ImageLimits};
use crate::core::hash::Fingerprint;
use crate::core::model::VisionModel;
use crate::core::reply::parse_reply;
use crate::error::Result;
use crate::models::comparison::{CacheStatus, Comparison, ComparisonResult};

/// Instructions sent along with every image pair.
pub const COMPARISON_PROMPT: &str = "\
Compare these two images and provide:
1. A similarity score from 0 to 100, where 0 means completely different and 100 means identical
2. A brief explanation of the similarities and differences

Format your response exactly like this:
Score: [number]
Explanation: [your explanation]
";

/// Decodes image pairs, asks the model to compare them and caches the answer.
#[derive(Clone)]
pub struct Comparator {
    model: Arc<dyn VisionModel>,
    cache: ResultCache,
    limits: ImageLimits,
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparator")
            .field("model", &self.model.name())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Comparator {
    /// Create a comparator with a fresh cache
    pub fn new(model: Arc<dyn VisionModel>, limits: ImageLimits, cache: CacheConfig) -> Self {
        Self {
            model,
            cache: ResultCache::new(cache),
            limits,
        }
    }

    /// The result cache
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Compare two base64 images.
    ///
    /// A cached result for the same ordered pair is returned without
    /// decoding. Otherwise both images are decoded before the model is
    /// called, so malformed input never costs a model request.
    #[tracing::instrument(skip_all, fields(model = self.model.name()))]
    pub async fn compare(&self, image1: &str, image2: &str) -> Result<Comparison> {
        let fingerprint = Fingerprint::of(image1, image2);
        if let Some(result) = self.cache.get(&fingerprint).await {
            log::debug!("Cache hit for {}", fingerprint);
            return Ok(Comparison {
                result,
                cache: CacheStatus::Hit,
            });
        }

        let ([first, second], uploads) = self.prepare_pair(image1, image2).await?;
        let data = json!({
            "model": self.model.name(),
            "image1": first,
            "image2": second,
        });

        let reply = self.model.generate(COMPARISON_PROMPT, &uploads).await?;
        let parsed = parse_reply(&reply);
        if parsed.is_degraded() {
            log::warn!("Model reply did not follow the expected format: {:?}", reply);
        }

        let result = ComparisonResult::from_reply(&parsed, Some(data));

        self.cache.insert(fingerprint, result.clone()).await;
        log::info!(
            "Compared images: score {:.1} ({:?})",
            result.similarity_score,
            result.status
        );

        Ok(Comparison {
            result,
            cache: CacheStatus::Miss,
        })
    }

    /// Decode both images and re-encode them for upload on the blocking pool.
    /// Returns the per-image metadata and the model payloads.
    async fn prepare_pair(
        &self,
        image1: &str,
        image2: &str,
    ) -> Result<([serde_json::Value; 2], [EncodedImage; 2])> {
        let limits = self.limits;
        let (image1, image2) = (image1.to_owned(), image2.to_owned());

        tokio::task::spawn_blocking(move || -> Result<([serde_json::Value; 2], [EncodedImage; 2])> {
            // Decode both before encoding either
            let first = decode_base64_image(&image1, &limits)?;
            let second = decode_base64_image(&image2, &limits)?;
            Ok((
                [describe(&first), describe(&second)],
                [first.encode_png()?, second.encode_png()?],
            ))
        })
        .await?
    }
}

fn describe(image: &DecodedImage) -> serde_json::Value {
    let (width, height) = image.dimensions();
    json!({
        "width": width,
        "height": height,
        "mode": image.color_mode(),
    })
}
