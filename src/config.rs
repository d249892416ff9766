//! Layer Configuration - Single Source of Draw Order
//!
//! The layer list below is the one place that defines both selection
//! order and paint order. Selector and compositor read it; neither may
//! impose an order of its own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a selected asset within a layer.
pub type AssetId = String;

/// One visual slice of a composited character, painted in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    Background,
    Base,
    Skin,
    Undergarments,
    Clothing,
    Outerwear,
    Hair,
    FaceAccessories,
    Headwear,
    MiscAccessories,
    Overlay,
}

impl LayerType {
    /// Every layer type, in paint order.
    pub const ALL: [LayerType; 11] = [
        LayerType::Background,
        LayerType::Base,
        LayerType::Skin,
        LayerType::Undergarments,
        LayerType::Clothing,
        LayerType::Outerwear,
        LayerType::Hair,
        LayerType::FaceAccessories,
        LayerType::Headwear,
        LayerType::MiscAccessories,
        LayerType::Overlay,
    ];

    pub fn as_key(&self) -> &'static str {
        match self {
            LayerType::Background => "background",
            LayerType::Base => "base",
            LayerType::Skin => "skin",
            LayerType::Undergarments => "undergarments",
            LayerType::Clothing => "clothing",
            LayerType::Outerwear => "outerwear",
            LayerType::Hair => "hair",
            LayerType::FaceAccessories => "face-accessories",
            LayerType::Headwear => "headwear",
            LayerType::MiscAccessories => "misc-accessories",
            LayerType::Overlay => "overlay",
        }
    }

    /// Parse an external key. Accepts `_` as a separator alias so manifest
    /// rule keys like `incompatible_face_accessories` resolve too.
    pub fn from_key(key: &str) -> Option<LayerType> {
        let normalized = key.trim().to_ascii_lowercase().replace('_', "-");
        LayerType::ALL
            .into_iter()
            .find(|l| l.as_key() == normalized)
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Character gender; asset eligibility is the gender bucket plus neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Manifest bucket key for this gender.
    pub fn bucket_key(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Population policy for one layer type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPolicy {
    #[serde(default)]
    pub required: bool,
    /// Chance in [0, 1] that an optional layer is populated. Ignored for
    /// required layers.
    #[serde(default = "default_probability")]
    pub probability: f64,
}

fn default_probability() -> f64 {
    1.0
}

impl LayerPolicy {
    pub fn required() -> Self {
        Self {
            required: true,
            probability: 1.0,
        }
    }

    pub fn optional(probability: f64) -> Self {
        Self {
            required: false,
            probability,
        }
    }
}

/// One slot in the ordered layer table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSlot {
    pub layer: LayerType,
    pub policy: LayerPolicy,
}

/// Ordered layer table, passed explicitly into the selector and compositor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub layers: Vec<LayerSlot>,
}

impl LayerConfig {
    pub fn new(layers: Vec<LayerSlot>) -> Self {
        Self { layers }
    }

    /// Layer types in processing/paint order.
    pub fn order(&self) -> impl Iterator<Item = LayerType> + '_ {
        self.layers.iter().map(|s| s.layer)
    }

    pub fn policy(&self, layer: LayerType) -> Option<LayerPolicy> {
        self.layers
            .iter()
            .find(|s| s.layer == layer)
            .map(|s| s.policy)
    }

    pub fn contains(&self, layer: LayerType) -> bool {
        self.layers.iter().any(|s| s.layer == layer)
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            layers: vec![
                LayerSlot { layer: LayerType::Background, policy: LayerPolicy::required() },
                LayerSlot { layer: LayerType::Base, policy: LayerPolicy::required() },
                LayerSlot { layer: LayerType::Skin, policy: LayerPolicy::required() },
                LayerSlot { layer: LayerType::Undergarments, policy: LayerPolicy::optional(0.75) },
                LayerSlot { layer: LayerType::Clothing, policy: LayerPolicy::optional(0.90) },
                LayerSlot { layer: LayerType::Outerwear, policy: LayerPolicy::optional(0.35) },
                LayerSlot { layer: LayerType::Hair, policy: LayerPolicy::required() },
                LayerSlot { layer: LayerType::FaceAccessories, policy: LayerPolicy::optional(0.25) },
                LayerSlot { layer: LayerType::Headwear, policy: LayerPolicy::optional(0.30) },
                LayerSlot { layer: LayerType::MiscAccessories, policy: LayerPolicy::optional(0.20) },
                LayerSlot { layer: LayerType::Overlay, policy: LayerPolicy::optional(0.15) },
            ],
        }
    }
}

/// Mapping of every configured layer to a selected asset or an explicit
/// empty. Unpopulated layers are present with `None`, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerAssignment {
    slots: BTreeMap<LayerType, Option<AssetId>>,
}

impl LayerAssignment {
    /// All-empty assignment covering every layer in `config`.
    pub fn empty(config: &LayerConfig) -> Self {
        Self {
            slots: config.order().map(|l| (l, None)).collect(),
        }
    }

    /// Build from a caller-supplied explicit mapping. Every configured
    /// layer must be present; unknown keys are ignored.
    pub fn from_explicit(
        raw: &BTreeMap<String, Option<AssetId>>,
        config: &LayerConfig,
    ) -> Result<Self, String> {
        let mut slots = BTreeMap::new();
        let mut missing = Vec::new();

        for layer in config.order() {
            let entry = raw.iter().find_map(|(key, value)| {
                (LayerType::from_key(key) == Some(layer)).then(|| value.clone())
            });
            match entry {
                Some(value) => {
                    slots.insert(layer, value);
                }
                None => missing.push(layer.as_key()),
            }
        }

        if missing.is_empty() {
            Ok(Self { slots })
        } else {
            Err(format!("missing layers: {}", missing.join(", ")))
        }
    }

    pub fn get(&self, layer: LayerType) -> Option<&str> {
        self.slots.get(&layer).and_then(|v| v.as_deref())
    }

    pub fn set(&mut self, layer: LayerType, asset: Option<AssetId>) {
        self.slots.insert(layer, asset);
    }

    /// Populated slots only.
    pub fn populated(&self) -> impl Iterator<Item = (LayerType, &str)> + '_ {
        self.slots
            .iter()
            .filter_map(|(layer, v)| v.as_deref().map(|id| (*layer, id)))
    }

    pub fn is_unpopulated(&self) -> bool {
        self.populated().next().is_none()
    }

    /// External map form with kebab-case keys, for response payloads.
    pub fn to_external(&self) -> BTreeMap<String, Option<AssetId>> {
        self.slots
            .iter()
            .map(|(layer, v)| (layer.as_key().to_string(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_order_is_background_first_overlay_last() {
        let config = LayerConfig::default();
        let order: Vec<_> = config.order().collect();
        assert_eq!(order.first(), Some(&LayerType::Background));
        assert_eq!(order.last(), Some(&LayerType::Overlay));
        assert_eq!(order.len(), LayerType::ALL.len());
    }

    #[test]
    fn default_required_layers() {
        let config = LayerConfig::default();
        for layer in [
            LayerType::Background,
            LayerType::Base,
            LayerType::Skin,
            LayerType::Hair,
        ] {
            assert!(config.policy(layer).unwrap().required, "{layer} must be required");
        }
        assert!(!config.policy(LayerType::Headwear).unwrap().required);
    }

    #[test]
    fn layer_key_roundtrip() {
        for layer in LayerType::ALL {
            assert_eq!(LayerType::from_key(layer.as_key()), Some(layer));
        }
        assert_eq!(
            LayerType::from_key("face_accessories"),
            Some(LayerType::FaceAccessories)
        );
        assert_eq!(LayerType::from_key("compatibility_rules"), None);
    }

    #[test]
    fn explicit_assignment_requires_full_coverage() {
        let config = LayerConfig::default();
        let mut raw: BTreeMap<String, Option<AssetId>> = config
            .order()
            .map(|l| (l.as_key().to_string(), None))
            .collect();
        raw.insert("base".into(), Some("raider".into()));
        raw.insert("not-a-layer".into(), Some("junk".into()));

        let assignment = LayerAssignment::from_explicit(&raw, &config).unwrap();
        assert_eq!(assignment.get(LayerType::Base), Some("raider"));
        assert_eq!(assignment.get(LayerType::Hair), None);

        raw.remove("hair");
        let err = LayerAssignment::from_explicit(&raw, &config).unwrap_err();
        assert!(err.contains("hair"));
    }

    #[test]
    fn external_form_uses_kebab_keys() {
        let config = LayerConfig::default();
        let mut assignment = LayerAssignment::empty(&config);
        assignment.set(LayerType::FaceAccessories, Some("goggles".into()));

        let external = assignment.to_external();
        assert_eq!(external.len(), config.layers.len());
        assert_eq!(
            external.get("face-accessories"),
            Some(&Some("goggles".to_string()))
        );
    }
}
