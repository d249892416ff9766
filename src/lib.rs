//! WasteGen Core - Procedural Character Appearance Engine
//!
//! # The Five Guarantees (Non-Negotiable)
//! 1. A required layer with any eligible asset is never left empty
//! 2. Optional layers never violate a declared incompatibility
//! 3. Paint order is fixed by the layer table, never by insertion order
//! 4. The caller always gets an image back; the fallback answers failures
//! 5. A seed reproduces the assignment exactly

pub mod catalog;
pub mod compat;
pub mod compositor;
pub mod config;
pub mod fallback;
pub mod hashing;
pub mod manifest;
pub mod pipeline;
pub mod selector;

pub use compat::{assignment_is_valid, conflicts, Conflict};
pub use compositor::{AssetStore, FsAssetStore, MemoryAssetStore, RenderError};
pub use config::{AssetId, Gender, LayerAssignment, LayerConfig, LayerPolicy, LayerSlot, LayerType};
pub use fallback::fallback;
pub use hashing::{canonical_json, compute_generation_hash};
pub use manifest::{AssetEntry, Manifest, ManifestError, ManifestStore};
pub use pipeline::{
    GenerationError, GenerationMode, GenerationPipeline, GenerationRequest, GenerationResult,
};
pub use selector::select_layers;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Upper bound on the square canvas edge, in pixels.
pub const MAX_CANVAS_PX: u32 = 4096;
/// Canvas edge used by the fallback placeholder.
pub const FALLBACK_CANVAS_PX: u32 = 512;
