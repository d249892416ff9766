//! Compositor - Fixed-Order Canvas Painting
//!
//! The canvas is an SVG document sized to the request; each populated
//! layer is embedded as a full-canvas raster in config order. Assets are
//! pre-sized to the target aspect ratio by convention, so every layer is
//! painted at full canvas size. A single unloadable asset is skipped, not
//! fatal; only an unusable canvas fails the composite.

use base64::Engine;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::catalog::find_asset;
use crate::config::{LayerAssignment, LayerConfig};
use crate::manifest::Manifest;
use crate::MAX_CANVAS_PX;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("canvas size {0}px is outside the supported range 1..={MAX_CANVAS_PX}")]
    InvalidCanvas(u32),
}

/// Read-only source of raster bytes, keyed by store-relative path.
pub trait AssetStore {
    fn load(&self, file: &str) -> io::Result<Vec<u8>>;
}

/// Filesystem-backed store rooted at the asset directory.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStore for FsAssetStore {
    fn load(&self, file: &str) -> io::Result<Vec<u8>> {
        // Relative paths only; no escapes above the root.
        let path = Path::new(file);
        if path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("asset path escapes the store: {file}"),
            ));
        }
        std::fs::read(self.root.join(path))
    }
}

/// In-memory store for tests and embedded asset packs.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssetStore {
    pub fn insert(&mut self, file: impl Into<String>, bytes: Vec<u8>) {
        let _ = self.files.insert(file.into(), bytes);
    }
}

impl AssetStore for MemoryAssetStore {
    fn load(&self, file: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(file)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, file.to_string()))
    }
}

/// Paint `assignment` onto a square canvas of `output_size` pixels.
/// Layers are painted strictly in config order, regardless of the order
/// slots were inserted into the assignment.
pub fn composite(
    manifest: &Manifest,
    config: &LayerConfig,
    assignment: &LayerAssignment,
    store: &impl AssetStore,
    output_size: u32,
) -> Result<Vec<u8>, RenderError> {
    if output_size == 0 || output_size > MAX_CANVAS_PX {
        return Err(RenderError::InvalidCanvas(output_size));
    }

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">"#,
        size = output_size
    );

    for layer in config.order() {
        let Some(id) = assignment.get(layer) else {
            continue;
        };
        let Some(entry) = find_asset(manifest, layer, id) else {
            warn!(layer = %layer, asset = id, "asset not in manifest; layer skipped");
            continue;
        };
        let bytes = match store.load(&entry.file) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                warn!(layer = %layer, file = %entry.file, "asset file is empty; layer skipped");
                continue;
            }
            Err(e) => {
                warn!(layer = %layer, file = %entry.file, error = %e, "asset could not be loaded; layer skipped");
                continue;
            }
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let _ = write!(
            svg,
            r#"<image x="0" y="0" width="{size}" height="{size}" href="data:{mime};base64,{encoded}"/>"#,
            size = output_size,
            mime = mime_for(&entry.file),
        );
    }

    svg.push_str("</svg>");
    Ok(svg.into_bytes())
}

fn mime_for(file: &str) -> &'static str {
    let ext = Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
