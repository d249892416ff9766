//! Layer Manifest - Parsed Once, Immutable After
//!
//! The manifest's string-vs-object entry shapes are resolved into a single
//! tagged `AssetEntry` form at load time. Nothing downstream branches on
//! the raw shape again.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AssetId, Gender, LayerType};

/// Reserved manifest keys that are never layers.
pub const COMPATIBILITY_RULES_KEY: &str = "compatibility_rules";
pub const META_KEY: &str = "meta";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest not readable: {0}")]
    Unreadable(String),

    #[error("manifest is not valid JSON: {0}")]
    Parse(String),

    #[error("manifest requires engine >= {required}, current is {current}")]
    EngineTooOld { required: String, current: String },
}

/// One selectable visual option within a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub id: AssetId,
    /// Store-relative path to the raster file.
    pub file: String,
    /// Assets in other layers this one cannot appear with. Checked in both
    /// declaring directions by the validator.
    pub incompatible_with: BTreeMap<LayerType, BTreeSet<AssetId>>,
}

impl AssetEntry {
    pub fn excludes(&self, layer: LayerType, asset: &str) -> bool {
        self.incompatible_with
            .get(&layer)
            .is_some_and(|ids| ids.contains(asset))
    }
}

/// Per-gender asset buckets for one layer.
#[derive(Debug, Clone, Default)]
pub struct GenderBuckets {
    pub male: Vec<AssetEntry>,
    pub female: Vec<AssetEntry>,
    pub neutral: Vec<AssetEntry>,
}

impl GenderBuckets {
    pub fn for_gender(&self, gender: Gender) -> &[AssetEntry] {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &AssetEntry> {
        self.male.iter().chain(&self.female).chain(&self.neutral)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestMeta {
    #[serde(default)]
    pub version: Option<String>,
    /// Oldest engine allowed to consume this manifest.
    #[serde(default)]
    pub min_engine: Option<semver::Version>,
}

/// The full parsed manifest. Loaded once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    layers: BTreeMap<LayerType, GenderBuckets>,
    pub meta: ManifestMeta,
}

impl Manifest {
    pub fn parse(raw: &str) -> Result<Manifest, ManifestError> {
        let root: BTreeMap<String, Value> =
            serde_json::from_str(raw).map_err(|e| ManifestError::Parse(e.to_string()))?;

        let mut layers = BTreeMap::new();
        let mut meta = ManifestMeta::default();

        for (key, value) in root {
            if key == COMPATIBILITY_RULES_KEY {
                // Reserved pseudo-layer; per-asset declarations are the
                // sole rule source.
                continue;
            }
            if key == META_KEY {
                meta = serde_json::from_value(value)
                    .map_err(|e| ManifestError::Parse(format!("meta: {e}")))?;
                continue;
            }
            match LayerType::from_key(&key) {
                Some(layer) => {
                    let buckets: RawBuckets = serde_json::from_value(value)
                        .map_err(|e| ManifestError::Parse(format!("{key}: {e}")))?;
                    layers.insert(layer, buckets.resolve());
                }
                None => debug!(key, "ignoring unknown manifest section"),
            }
        }

        Ok(Manifest { layers, meta })
    }

    pub fn from_path(path: &Path) -> Result<Manifest, ManifestError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ManifestError::Unreadable(format!("{}: {e}", path.display())))?;
        Manifest::parse(&raw)
    }

    pub fn layer(&self, layer: LayerType) -> Option<&GenderBuckets> {
        self.layers.get(&layer)
    }

    /// Enforce the manifest's `meta.min_engine` floor.
    pub fn check_engine(&self, current: &str) -> Result<(), ManifestError> {
        let Some(min) = &self.meta.min_engine else {
            return Ok(());
        };
        let current = semver::Version::parse(current)
            .map_err(|e| ManifestError::Parse(format!("engine version: {e}")))?;
        if *min > current {
            return Err(ManifestError::EngineTooOld {
                required: min.to_string(),
                current: current.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    /// Bare filename, no rules.
    Plain(String),
    /// Object form carrying `incompatible_<layer>` rule keys.
    Detailed {
        file: String,
        #[serde(flatten)]
        extra: BTreeMap<String, Value>,
    },
}

impl RawEntry {
    fn resolve(self) -> AssetEntry {
        match self {
            RawEntry::Plain(file) => AssetEntry {
                id: file_stem(&file),
                file,
                incompatible_with: BTreeMap::new(),
            },
            RawEntry::Detailed { file, extra } => {
                let mut incompatible_with: BTreeMap<LayerType, BTreeSet<AssetId>> = BTreeMap::new();
                for (key, value) in extra {
                    let Some(rest) = key.strip_prefix("incompatible_") else {
                        continue;
                    };
                    let Some(layer) = LayerType::from_key(rest) else {
                        warn!(key, file, "rule targets unknown layer; ignored");
                        continue;
                    };
                    let ids: BTreeSet<AssetId> = match value {
                        Value::String(id) => BTreeSet::from([id]),
                        Value::Array(items) => items
                            .into_iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect(),
                        _ => {
                            warn!(key, file, "rule value is neither string nor array; ignored");
                            continue;
                        }
                    };
                    incompatible_with.entry(layer).or_default().extend(ids);
                }
                AssetEntry {
                    id: file_stem(&file),
                    file,
                    incompatible_with,
                }
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawBuckets {
    #[serde(default)]
    male: Vec<RawEntry>,
    #[serde(default)]
    female: Vec<RawEntry>,
    #[serde(default)]
    neutral: Vec<RawEntry>,
}

impl RawBuckets {
    fn resolve(self) -> GenderBuckets {
        GenderBuckets {
            male: self.male.into_iter().map(RawEntry::resolve).collect(),
            female: self.female.into_iter().map(RawEntry::resolve).collect(),
            neutral: self.neutral.into_iter().map(RawEntry::resolve).collect(),
        }
    }
}

fn file_stem(file: &str) -> AssetId {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file)
        .to_string()
}

/// Process-wide manifest handle with a populate-once cache. The load
/// result is computed at most once and never mutated afterwards, so
/// concurrent `generate` calls share it without synchronization.
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    cell: OnceLock<Result<Manifest, ManifestError>>,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceLock::new(),
        }
    }

    /// Pre-populated store, for tests and embedded manifests.
    pub fn from_manifest(manifest: Manifest) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(manifest));
        Self {
            path: PathBuf::new(),
            cell,
        }
    }

    pub fn get(&self) -> Result<&Manifest, ManifestError> {
        self.cell
            .get_or_init(|| {
                let manifest = Manifest::from_path(&self.path)?;
                manifest.check_engine(crate::ENGINE_VERSION)?;
                Ok(manifest)
            })
            .as_ref()
            .map_err(|e| e.clone())
    }
}
