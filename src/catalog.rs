//! Asset Catalog - Gender-Aware Eligibility
//!
//! Eligibility for a layer is the gender bucket followed by the neutral
//! bucket. The concatenation is stable and never re-sorted, so selection
//! is deterministic under a fixed random source.

use crate::config::{Gender, LayerType};
use crate::manifest::{AssetEntry, Manifest};

/// Ordered eligible assets for one layer and gender. Absent layers yield
/// an empty list, not an error.
pub fn eligible_assets<'a>(
    manifest: &'a Manifest,
    layer: LayerType,
    gender: Gender,
) -> Vec<&'a AssetEntry> {
    let Some(buckets) = manifest.layer(layer) else {
        return Vec::new();
    };
    buckets
        .for_gender(gender)
        .iter()
        .chain(&buckets.neutral)
        .collect()
}

/// Look up an asset by id anywhere in a layer's buckets.
pub fn find_asset<'a>(
    manifest: &'a Manifest,
    layer: LayerType,
    id: &str,
) -> Option<&'a AssetEntry> {
    manifest.layer(layer)?.all().find(|entry| entry.id == id)
}
