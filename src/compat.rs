//! Compatibility Validation - Bidirectional, Pure
//!
//! Rules are declared on either asset of a pair; a pairing is invalid if
//! either side declares the other. Every function here is a pure function
//! of its inputs, safe to call repeatedly on growing partial assignments.

use serde::Serialize;

use crate::catalog::find_asset;
use crate::config::{LayerAssignment, LayerType};
use crate::manifest::{AssetEntry, Manifest};

/// One violating pair, with the declaring side identified.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub layer_a: LayerType,
    pub asset_a: String,
    pub layer_b: LayerType,
    pub asset_b: String,
    /// Which layer's asset declared the rule.
    pub declared_by: LayerType,
}

/// True when the two populated slots may coexist. Assets missing from the
/// manifest constrain nothing.
pub fn pair_is_compatible(
    manifest: &Manifest,
    a: (LayerType, &str),
    b: (LayerType, &str),
) -> bool {
    declared_against(manifest, a, b).is_none()
}

/// True when adding `candidate` at `layer` keeps `assignment` valid.
pub fn candidate_fits(
    manifest: &Manifest,
    assignment: &LayerAssignment,
    layer: LayerType,
    candidate: &AssetEntry,
) -> bool {
    assignment.populated().all(|(other_layer, other_id)| {
        if other_layer == layer {
            return true;
        }
        if candidate.excludes(other_layer, other_id) {
            return false;
        }
        match find_asset(manifest, other_layer, other_id) {
            Some(other) => !other.excludes(layer, &candidate.id),
            None => true,
        }
    })
}

/// True when no populated pair violates a declared rule, in either
/// declaring direction. Stops at the first violation.
pub fn assignment_is_valid(manifest: &Manifest, assignment: &LayerAssignment) -> bool {
    let populated: Vec<_> = assignment.populated().collect();
    for (i, &a) in populated.iter().enumerate() {
        for &b in &populated[i + 1..] {
            if !pair_is_compatible(manifest, a, b) {
                return false;
            }
        }
    }
    true
}

/// Every violating pair, for diagnostics and the CLI `check` command.
pub fn conflicts(manifest: &Manifest, assignment: &LayerAssignment) -> Vec<Conflict> {
    let populated: Vec<_> = assignment.populated().collect();
    let mut found = Vec::new();
    for (i, &(layer_a, id_a)) in populated.iter().enumerate() {
        for &(layer_b, id_b) in &populated[i + 1..] {
            if let Some(declared_by) =
                declared_against(manifest, (layer_a, id_a), (layer_b, id_b))
            {
                found.push(Conflict {
                    layer_a,
                    asset_a: id_a.to_string(),
                    layer_b,
                    asset_b: id_b.to_string(),
                    declared_by,
                });
            }
        }
    }
    found
}

/// Which side of the pair, if either, declares the other incompatible.
fn declared_against(
    manifest: &Manifest,
    (layer_a, id_a): (LayerType, &str),
    (layer_b, id_b): (LayerType, &str),
) -> Option<LayerType> {
    if let Some(a) = find_asset(manifest, layer_a, id_a) {
        if a.excludes(layer_b, id_b) {
            return Some(layer_a);
        }
    }
    if let Some(b) = find_asset(manifest, layer_b, id_b) {
        if b.excludes(layer_a, id_a) {
            return Some(layer_b);
        }
    }
    None
}
