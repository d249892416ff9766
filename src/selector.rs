//! Procedural Selector - Two Passes Over a Fixed Order
//!
//! Pass 1 populates required layers, pass 2 rolls optional layers, both in
//! config order. Earlier picks constrain later ones, never the reverse.
//! The precedence for required layers is deliberate: presence outranks
//! compatibility, so a required layer is populated from the unfiltered
//! eligible list when every candidate conflicts with an earlier pick.

use rand::Rng;
use tracing::debug;

use crate::catalog::eligible_assets;
use crate::compat::candidate_fits;
use crate::config::{Gender, LayerAssignment, LayerConfig, LayerType};
use crate::manifest::{AssetEntry, Manifest};

/// Build a complete assignment for `gender`. Never fails: a layer with no
/// usable asset is left explicitly empty.
pub fn select_layers(
    manifest: &Manifest,
    config: &LayerConfig,
    gender: Gender,
    rng: &mut impl Rng,
) -> LayerAssignment {
    let mut assignment = LayerAssignment::empty(config);

    // Pass 1: required layers.
    for slot in &config.layers {
        if !slot.policy.required {
            continue;
        }
        if let Some(pick) = pick_required(manifest, &assignment, slot.layer, gender, rng) {
            assignment.set(slot.layer, Some(pick));
        }
    }

    // Pass 2: optional layers. The probability draw happens for every
    // optional layer so a fixed seed replays the same stream regardless of
    // which layers end up eligible.
    for slot in &config.layers {
        if slot.policy.required {
            continue;
        }
        let roll: f64 = rng.gen();
        if roll >= slot.policy.probability {
            continue;
        }
        let eligible = eligible_assets(manifest, slot.layer, gender);
        let compatible: Vec<&AssetEntry> = eligible
            .into_iter()
            .filter(|entry| candidate_fits(manifest, &assignment, slot.layer, entry))
            .collect();
        // Optional layers never override compatibility.
        if let Some(entry) = pick_uniform(&compatible, rng) {
            assignment.set(slot.layer, Some(entry.id.clone()));
        }
    }

    assignment
}

fn pick_required(
    manifest: &Manifest,
    assignment: &LayerAssignment,
    layer: LayerType,
    gender: Gender,
    rng: &mut impl Rng,
) -> Option<String> {
    let eligible = eligible_assets(manifest, layer, gender);
    if eligible.is_empty() {
        return None;
    }

    let compatible: Vec<&AssetEntry> = eligible
        .iter()
        .copied()
        .filter(|entry| candidate_fits(manifest, assignment, layer, entry))
        .collect();

    if let Some(entry) = pick_uniform(&compatible, rng) {
        return Some(entry.id.clone());
    }

    // Presence outranks compatibility for required layers.
    let forced = pick_uniform(&eligible, rng)?;
    debug!(
        layer = %layer,
        asset = %forced.id,
        "no compatible candidate for required layer; forcing an incompatible pick"
    );
    Some(forced.id.clone())
}

fn pick_uniform<'a>(candidates: &[&'a AssetEntry], rng: &mut impl Rng) -> Option<&'a AssetEntry> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.gen_range(0..candidates.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerPolicy, LayerSlot};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn manifest() -> Manifest {
        Manifest::parse(
            r#"{
                "background": {"neutral": ["dunes.png", "ruins.png"]},
                "base": {
                    "male": [{"file": "lean.png", "incompatible_hair": ["mohawk"]}],
                    "female": ["wiry.png"]
                },
                "skin": {"neutral": ["pale.png", "tanned.png"]},
                "hair": {"male": ["mohawk.png"], "female": ["braids.png"]},
                "headwear": {"neutral": [{"file": "gas-hood.png", "incompatible_hair": ["mohawk", "braids"]}]}
            }"#,
        )
        .unwrap()
    }

    fn config(slots: &[(LayerType, LayerPolicy)]) -> LayerConfig {
        LayerConfig::new(
            slots
                .iter()
                .map(|&(layer, policy)| LayerSlot { layer, policy })
                .collect(),
        )
    }

    #[test]
    fn required_layers_always_populated_when_eligible() {
        let manifest = manifest();
        let config = LayerConfig::default();
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let assignment = select_layers(&manifest, &config, Gender::Female, &mut rng);
            assert!(assignment.get(LayerType::Background).is_some());
            assert!(assignment.get(LayerType::Base).is_some());
            assert!(assignment.get(LayerType::Skin).is_some());
            assert!(assignment.get(LayerType::Hair).is_some());
        }
    }

    #[test]
    fn required_layer_without_assets_stays_empty() {
        let manifest = manifest();
        let config = config(&[(LayerType::Clothing, LayerPolicy::required())]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let assignment = select_layers(&manifest, &config, Gender::Male, &mut rng);
        assert_eq!(assignment.get(LayerType::Clothing), None);
    }

    #[test]
    fn required_presence_outranks_compatibility() {
        // lean is male base's only option and it excludes mohawk, male
        // hair's only option. Both must still be populated.
        let manifest = manifest();
        let config = config(&[
            (LayerType::Base, LayerPolicy::required()),
            (LayerType::Hair, LayerPolicy::required()),
        ]);
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let assignment = select_layers(&manifest, &config, Gender::Male, &mut rng);
            assert_eq!(assignment.get(LayerType::Base), Some("lean"));
            assert_eq!(assignment.get(LayerType::Hair), Some("mohawk"));
        }
    }

    #[test]
    fn optional_layers_never_override_compatibility() {
        // gas-hood excludes both hairstyles, so headwear at probability 1.0
        // must stay empty once hair is placed.
        let manifest = manifest();
        let config = config(&[
            (LayerType::Hair, LayerPolicy::required()),
            (LayerType::Headwear, LayerPolicy::optional(1.0)),
        ]);
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let assignment = select_layers(&manifest, &config, Gender::Female, &mut rng);
            assert_eq!(assignment.get(LayerType::Hair), Some("braids"));
            assert_eq!(assignment.get(LayerType::Headwear), None);
        }
    }

    #[test]
    fn probability_bounds_respected() {
        let manifest = manifest();
        let never = config(&[(LayerType::Skin, LayerPolicy::optional(0.0))]);
        let always = config(&[(LayerType::Skin, LayerPolicy::optional(1.0))]);
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let assignment = select_layers(&manifest, &never, Gender::Male, &mut rng);
            assert_eq!(assignment.get(LayerType::Skin), None);

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let assignment = select_layers(&manifest, &always, Gender::Male, &mut rng);
            assert!(assignment.get(LayerType::Skin).is_some());
        }
    }

    #[test]
    fn fixed_seed_reproduces_the_assignment() {
        let manifest = manifest();
        let config = LayerConfig::default();
        let mut a = ChaCha8Rng::seed_from_u64(0xBAD1A2D5);
        let mut b = ChaCha8Rng::seed_from_u64(0xBAD1A2D5);
        assert_eq!(
            select_layers(&manifest, &config, Gender::Male, &mut a),
            select_layers(&manifest, &config, Gender::Male, &mut b)
        );
    }

    #[test]
    fn every_slot_is_explicitly_present() {
        let manifest = manifest();
        let config = LayerConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let assignment = select_layers(&manifest, &config, Gender::Male, &mut rng);
        assert_eq!(assignment.to_external().len(), config.layers.len());
    }
}
