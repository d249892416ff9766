//! Generation Pipeline - Single Entry Point
//!
//! CRITICAL: every internal failure is caught once, here, and answered
//! with the fallback generator's output. Only a malformed explicit
//! assignment reaches the caller as an error.

use base64::Engine;
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::compositor::{composite, AssetStore, RenderError};
use crate::config::{AssetId, Gender, LayerAssignment, LayerConfig};
use crate::fallback::fallback;
use crate::hashing::compute_generation_hash;
use crate::manifest::{ManifestError, ManifestStore};
use crate::selector::select_layers;
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static FALLBACK_ENGAGED_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_fallback_engaged_count() -> u32 {
    FALLBACK_ENGAGED_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_fallback_engaged_count() {
    FALLBACK_ENGAGED_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("manifest unavailable: {0}")]
    ManifestUnavailable(#[from] ManifestError),

    #[error("selection produced an empty assignment; manifest has no usable assets")]
    EmptySelection,

    #[error(transparent)]
    RenderFailure(#[from] RenderError),

    #[error("invalid explicit assignment: {0}")]
    InvalidExplicitAssignment(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GenerationError {
    /// Caller contract violations surface; everything else is recovered
    /// with the fallback.
    fn is_caller_error(&self) -> bool {
        matches!(self, GenerationError::InvalidExplicitAssignment(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Random,
    Explicit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub gender: Gender,
    pub mode: GenerationMode,
    #[serde(default)]
    pub explicit_assignment: Option<BTreeMap<String, Option<AssetId>>>,
    #[serde(default = "default_output_size")]
    pub output_size: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_output_size() -> u32 {
    512
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub gender: Gender,
    pub assignment: LayerAssignment,
    /// SVG composite document.
    pub image: Vec<u8>,
    pub used_fallback: bool,
    /// Present only when the fallback answered.
    pub warning: Option<String>,
    pub generation_hash: String,
}

impl GenerationResult {
    pub fn image_data_uri(&self) -> String {
        format!(
            "data:image/svg+xml;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.image)
        )
    }
}

/// The generation pipeline - single entry point for character generation.
pub struct GenerationPipeline<S: AssetStore> {
    manifest: ManifestStore,
    config: LayerConfig,
    assets: S,
}

impl<S: AssetStore> GenerationPipeline<S> {
    pub fn new(manifest: ManifestStore, assets: S) -> Self {
        Self::with_config(manifest, assets, LayerConfig::default())
    }

    pub fn with_config(manifest: ManifestStore, assets: S, config: LayerConfig) -> Self {
        Self {
            manifest,
            config,
            assets,
        }
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Generate a character. Always produces an image: internal failures
    /// are answered with the fallback, flagged by `used_fallback` and a
    /// preserved `warning`.
    pub fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        match self.run(request) {
            Ok((assignment, image)) => self.finish(request, assignment, image, None),
            Err(err) if err.is_caller_error() => Err(err),
            Err(err) => {
                warn!(error = %err, "generation failed; answering with fallback");
                #[cfg(feature = "test-hooks")]
                FALLBACK_ENGAGED_COUNT.fetch_add(1, Ordering::SeqCst);

                let (image, assignment) = fallback(request.gender, &self.config);
                self.finish(request, assignment, image, Some(err.to_string()))
            }
        }
    }

    fn run(
        &self,
        request: &GenerationRequest,
    ) -> Result<(LayerAssignment, Vec<u8>), GenerationError> {
        let assignment = match request.mode {
            GenerationMode::Explicit => {
                let raw = request.explicit_assignment.as_ref().ok_or_else(|| {
                    GenerationError::InvalidExplicitAssignment(
                        "explicitAssignment is required in explicit mode".to_string(),
                    )
                })?;
                // The caller is trusted when overriding: no randomization,
                // no compatibility re-check.
                LayerAssignment::from_explicit(raw, &self.config)
                    .map_err(GenerationError::InvalidExplicitAssignment)?
            }
            GenerationMode::Random => {
                let manifest = self.manifest.get()?;
                let mut rng = match request.seed {
                    Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                    None => ChaCha8Rng::from_entropy(),
                };
                let assignment = select_layers(manifest, &self.config, request.gender, &mut rng);
                if assignment.is_unpopulated() {
                    return Err(GenerationError::EmptySelection);
                }
                assignment
            }
        };

        let manifest = self.manifest.get()?;
        let image = composite(
            manifest,
            &self.config,
            &assignment,
            &self.assets,
            request.output_size,
        )?;
        Ok((assignment, image))
    }

    fn finish(
        &self,
        request: &GenerationRequest,
        assignment: LayerAssignment,
        image: Vec<u8>,
        warning: Option<String>,
    ) -> Result<GenerationResult, GenerationError> {
        let generation_hash =
            compute_generation_hash(request.gender, request.seed, &assignment, ENGINE_VERSION)?;
        Ok(GenerationResult {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            gender: request.gender,
            assignment,
            image,
            used_fallback: warning.is_some(),
            warning,
            generation_hash,
        })
    }
}
