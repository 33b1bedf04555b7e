//! Engine configuration: TOML file plus `MATCH3_<SECTION>_<KEY>` environment
//! overrides.
//!
//! Lookup order for the file:
//! 1. An explicit path (e.g. from a `--config` flag); it must exist.
//! 2. The path in `MATCH3_CONFIG`, when that file exists.
//! 3. `match3.toml` in the working directory.
//! 4. Built-in defaults (the Gemology preset).
//!
//! ```
//! use ai_match3::config::EngineConfig;
//! let cfg = EngineConfig::from_toml_str(r#"
//!     [search]
//!     depth = 3
//!     [scoring]
//!     probability_points = false
//! "#).unwrap();
//! let resolved = cfg.resolve().unwrap();
//! assert_eq!(resolved.search.depth, 3);
//! assert_eq!(resolved.catalog.len(), 5);
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::Refill;
use crate::scoring::{ScoreMode, ScoringConfig};
use crate::search::{SearchConfig, DEFAULT_DEPTH_FACTOR};
use crate::selfplay::SelfPlayConfig;
use crate::tiles::{CatalogError, TileCatalog, TileSpec};

pub const CONFIG_ENV: &str = "MATCH3_CONFIG";

/// Locations searched when no explicit path or `MATCH3_CONFIG` applies.
pub const CONFIG_SEARCH_PATHS: &[&str] = &["match3.toml"];

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid tile catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("scoring factor given for unknown tile {0:?}")]
    UnknownTile(String),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    pub three: f64,
    pub four: f64,
    pub five_plus: f64,
    pub count_factor: f64,
    /// `0.0` disables the bonus.
    pub multi_type_bonus: Option<f64>,
    pub probability_points: bool,
    /// `inf` disables the ceiling.
    pub point_ceiling: Option<f64>,
    /// Estimate-mode multiplier by tile name; overrides the tile's own factor.
    pub factors: BTreeMap<String, f64>,
}

impl Default for ScoringSection { fn default() -> Self { Self::from_preset(&ScoringConfig::gemology()) } }

impl ScoringSection {
    fn from_preset(s: &ScoringConfig) -> Self {
        Self {
            three: s.three,
            four: s.four,
            five_plus: s.five_plus,
            count_factor: s.count_factor,
            multi_type_bonus: s.multi_type_bonus,
            probability_points: s.probability_points,
            point_ceiling: s.point_ceiling,
            factors: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub depth: u32,
    pub depth_factor: f64,
    /// `None` uses the CPU count.
    pub workers: Option<usize>,
    pub refill: Refill,
}

impl Default for SearchSection {
    fn default() -> Self { Self { depth: 2, depth_factor: DEFAULT_DEPTH_FACTOR, workers: None, refill: Refill::Unknown } }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlaySection {
    pub energy: Option<u32>,
    pub fast0: bool,
    pub max_moves: Option<u64>,
    pub record: bool,
    pub seed: Option<u64>,
}

/// Everything the binaries need, as written in `match3.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tiles: Vec<TileSpec>,
    pub scoring: ScoringSection,
    pub search: SearchSection,
    pub selfplay: SelfPlaySection,
}

impl Default for EngineConfig { fn default() -> Self { Self::gemology() } }

/// Runtime objects built from an [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct Resolved {
    pub catalog: Arc<TileCatalog>,
    pub scoring: ScoringConfig,
    pub search: SearchConfig,
    pub selfplay: SelfPlayConfig,
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn gemology() -> Self {
        Self {
            tiles: TileCatalog::gemology().specs(),
            scoring: ScoringSection::from_preset(&ScoringConfig::gemology()),
            search: SearchSection::default(),
            selfplay: SelfPlaySection::default(),
        }
    }

    pub fn dragon_souls() -> Self {
        Self {
            tiles: TileCatalog::dragon_souls().specs(),
            scoring: ScoringSection::from_preset(&ScoringConfig::dragon_souls()),
            search: SearchSection::default(),
            selfplay: SelfPlaySection::default(),
        }
    }

    /// Built-in preset by name (`gemology`, `dragonsouls`).
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "gemology" => Some(Self::gemology()),
            "dragonsouls" | "dragonsoul" => Some(Self::dragon_souls()),
            _ => None,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> { Ok(toml::from_str(s)?) }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&content)
    }

    /// Scoring keys still at their Gemology defaults while `tiles` is some
    /// other set. A `[scoring]` table only overrides the keys it names.
    pub fn inherited_gemology_rules(&self) -> Vec<&'static str> {
        if self.tiles == TileCatalog::gemology().specs() {
            return Vec::new();
        }
        let gem = ScoringSection::default();
        let s = &self.scoring;
        [
            ("scoring.four", s.four == gem.four),
            ("scoring.five_plus", s.five_plus == gem.five_plus),
            ("scoring.multi_type_bonus", s.multi_type_bonus == gem.multi_type_bonus),
            ("scoring.point_ceiling", s.point_ceiling == gem.point_ceiling),
        ]
        .into_iter()
        .filter_map(|(key, inherited)| inherited.then_some(key))
        .collect()
    }

    /// Build the catalog, scoring, search and self-play settings.
    pub fn resolve(&self) -> Result<Resolved, ConfigError> {
        let catalog = TileCatalog::new(self.tiles.clone())?;
        let inherited = self.inherited_gemology_rules();
        if !inherited.is_empty() {
            warn!(keys = ?inherited, "custom tiles use Gemology scoring defaults; set these keys to override");
        }
        let s = &self.scoring;
        let mut scoring = ScoringConfig {
            three: s.three,
            four: s.four,
            five_plus: s.five_plus,
            factors: Vec::new(),
            count_factor: s.count_factor,
            multi_type_bonus: s.multi_type_bonus.filter(|&b| b != 0.0),
            probability_points: s.probability_points,
            point_ceiling: s.point_ceiling.filter(|c| c.is_finite()),
            mode: ScoreMode::Estimate,
        }
        .with_catalog_factors(&catalog);
        for (name, &factor) in &s.factors {
            let id = catalog.by_name(name).ok_or_else(|| ConfigError::UnknownTile(name.clone()))?;
            scoring = scoring.with_factor(id, factor);
        }

        if self.search.depth == 0 {
            return Err(ConfigError::Invalid { key: "search.depth", reason: "must be at least 1".into() });
        }
        if !(self.search.depth_factor.is_finite() && self.search.depth_factor >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "search.depth_factor",
                reason: format!("{} is not a non-negative number", self.search.depth_factor),
            });
        }
        let workers = match self.search.workers {
            Some(0) => return Err(ConfigError::Invalid { key: "search.workers", reason: "must be at least 1".into() }),
            Some(n) => n,
            None => num_cpus::get().max(1),
        };
        let search = SearchConfig {
            depth: self.search.depth,
            depth_factor: self.search.depth_factor,
            workers,
            refill: self.search.refill,
        };
        let p = &self.selfplay;
        let selfplay = SelfPlayConfig { energy: p.energy, fast0: p.fast0, max_moves: p.max_moves, record: p.record };
        Ok(Resolved { catalog: Arc::new(catalog), scoring, search, selfplay, seed: p.seed })
    }
}

impl FromStr for Refill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Refill::Random),
            "unknown" => Ok(Refill::Unknown),
            other => Err(format!("unknown refill mode {other:?}")),
        }
    }
}

/// Load configuration following the documented lookup order, then apply
/// environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    if let Some(path) = explicit {
        info!("Loading config from {}", path.display());
        return Ok(apply_env_overrides(EngineConfig::from_path(path)?));
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Loading config from {}: {}", CONFIG_ENV, path.display());
            return Ok(apply_env_overrides(EngineConfig::from_path(&path)?));
        }
        warn!("{}={} not found, searching defaults", CONFIG_ENV, path.display());
    }
    for path_str in CONFIG_SEARCH_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return Ok(apply_env_overrides(EngineConfig::from_path(path)?));
        }
    }
    debug!("No match3.toml found, using built-in defaults");
    Ok(apply_env_overrides(EngineConfig::default()))
}

macro_rules! env_override {
    // Parseable field
    ($lookup:expr, $config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Some(v) = $lookup($key) {
            match v.parse() {
                Ok(parsed) => $config.$section.$field = parsed,
                Err(_) => warn!("Ignoring {}={:?}: not a valid value", $key, v),
            }
        }
    };
    // Optional parseable field
    ($lookup:expr, $config:expr, $section:ident . $field:ident, $key:expr, optional) => {
        if let Some(v) = $lookup($key) {
            match v.parse() {
                Ok(parsed) => $config.$section.$field = Some(parsed),
                Err(_) => warn!("Ignoring {}={:?}: not a valid value", $key, v),
            }
        }
    };
}

/// Apply `MATCH3_<SECTION>_<KEY>` overrides from the process environment.
pub fn apply_env_overrides(config: EngineConfig) -> EngineConfig {
    apply_overrides_with(config, |key| std::env::var(key).ok())
}

/// Apply overrides using `lookup` in place of the process environment.
pub fn apply_overrides_with<F>(mut config: EngineConfig, lookup: F) -> EngineConfig
where
    F: Fn(&str) -> Option<String>,
{
    // Scoring
    env_override!(lookup, config, scoring.count_factor, "MATCH3_SCORING_COUNT_FACTOR");
    env_override!(lookup, config, scoring.probability_points, "MATCH3_SCORING_PROBABILITY_POINTS");
    env_override!(lookup, config, scoring.multi_type_bonus, "MATCH3_SCORING_MULTI_TYPE_BONUS", optional);
    env_override!(lookup, config, scoring.point_ceiling, "MATCH3_SCORING_POINT_CEILING", optional);

    // Search
    env_override!(lookup, config, search.depth, "MATCH3_SEARCH_DEPTH");
    env_override!(lookup, config, search.depth_factor, "MATCH3_SEARCH_DEPTH_FACTOR");
    env_override!(lookup, config, search.workers, "MATCH3_SEARCH_WORKERS", optional);
    env_override!(lookup, config, search.refill, "MATCH3_SEARCH_REFILL");

    // Self-play
    env_override!(lookup, config, selfplay.energy, "MATCH3_SELFPLAY_ENERGY", optional);
    env_override!(lookup, config, selfplay.fast0, "MATCH3_SELFPLAY_FAST0");
    env_override!(lookup, config, selfplay.max_moves, "MATCH3_SELFPLAY_MAX_MOVES", optional);
    env_override!(lookup, config, selfplay.record, "MATCH3_SELFPLAY_RECORD");
    env_override!(lookup, config, selfplay.seed, "MATCH3_SELFPLAY_SEED", optional);

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tiles.len(), 5);
        assert_eq!(config.search.depth, 2);
        assert!((config.search.depth_factor - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.scoring.point_ceiling, Some(60.0));
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.scoring, ScoringConfig::gemology().with_catalog_factors(&resolved.catalog));
        assert!(resolved.search.workers >= 1);
    }

    #[test]
    fn test_dragon_souls_file() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [[tiles]]
            name = "Wind"
            factor = 0.5
            [[tiles]]
            name = "Electro"
            [[tiles]]
            name = "Ice"
            [[tiles]]
            name = "Fire"
            [[tiles]]
            name = "Random"

            [scoring]
            three = 10.0
            four = 15.0
            five_plus = 20.0
            multi_type_bonus = 0.0
            point_ceiling = inf
            count_factor = 0.25
            factors = { Fire = 2.0 }

            [search]
            depth = 3
            workers = 2
            refill = "random"

            [selfplay]
            energy = 40
            fast0 = true
            seed = 9
            "#,
        )
        .unwrap();
        assert!(cfg.inherited_gemology_rules().is_empty());
        let r = cfg.resolve().unwrap();
        let wind = r.catalog.by_name("Wind").unwrap();
        let fire = r.catalog.by_name("Fire").unwrap();
        assert_eq!(r.scoring.factor(wind.index()), 0.5);
        assert_eq!(r.scoring.factor(fire.index()), 2.0);
        assert_eq!(r.scoring.count_factor, 0.25);
        assert_eq!(r.scoring.multi_type_bonus, None);
        assert_eq!(r.scoring.point_ceiling, None);
        assert_eq!(r.search, SearchConfig { depth: 3, depth_factor: 0.75, workers: 2, refill: Refill::Random });
        assert_eq!(r.selfplay.energy, Some(40));
        assert!(r.selfplay.fast0);
        assert_eq!(r.seed, Some(9));
    }

    #[test]
    fn test_custom_tiles_report_inherited_scoring() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [[tiles]]
            name = "Wind"
            [[tiles]]
            name = "Ice"
            [[tiles]]
            name = "Fire"
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.inherited_gemology_rules(),
            vec!["scoring.four", "scoring.five_plus", "scoring.multi_type_bonus", "scoring.point_ceiling"]
        );
        let r = cfg.resolve().unwrap();
        assert_eq!(r.scoring.multi_type_bonus, Some(30.0));
        assert_eq!(r.scoring.point_ceiling, Some(60.0));

        assert!(EngineConfig::gemology().inherited_gemology_rules().is_empty());
        let dragons = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/dragonsouls.toml");
        assert!(EngineConfig::from_path(&dragons).unwrap().inherited_gemology_rules().is_empty());
    }

    #[test]
    fn test_unknown_factor_tile() {
        let cfg = EngineConfig::from_toml_str("[scoring]\nfactors = { Mud = 2.0 }\n").unwrap();
        assert!(matches!(cfg.resolve(), Err(ConfigError::UnknownTile(name)) if name == "Mud"));
    }

    #[test]
    fn test_invalid_values() {
        let mut cfg = EngineConfig::default();
        cfg.search.depth = 0;
        assert!(matches!(cfg.resolve(), Err(ConfigError::Invalid { key: "search.depth", .. })));
        let mut cfg = EngineConfig::default();
        cfg.search.workers = Some(0);
        assert!(matches!(cfg.resolve(), Err(ConfigError::Invalid { key: "search.workers", .. })));
        let mut cfg = EngineConfig::default();
        cfg.tiles.clear();
        assert!(matches!(cfg.resolve(), Err(ConfigError::Catalog(CatalogError::Empty))));
        assert!(matches!(EngineConfig::from_toml_str("[search]\ndepth = \"deep\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = apply_overrides_with(
            EngineConfig::default(),
            overrides(&[
                ("MATCH3_SEARCH_DEPTH", "4"),
                ("MATCH3_SEARCH_WORKERS", "3"),
                ("MATCH3_SEARCH_REFILL", "Random"),
                ("MATCH3_SCORING_PROBABILITY_POINTS", "false"),
                ("MATCH3_SELFPLAY_ENERGY", "12"),
                ("MATCH3_SELFPLAY_FAST0", "true"),
            ]),
        );
        assert_eq!(cfg.search.depth, 4);
        assert_eq!(cfg.search.workers, Some(3));
        assert_eq!(cfg.search.refill, Refill::Random);
        assert!(!cfg.scoring.probability_points);
        assert_eq!(cfg.selfplay.energy, Some(12));
        assert!(cfg.selfplay.fast0);
    }

    #[test]
    fn test_bad_env_override_is_ignored() {
        let cfg = apply_overrides_with(EngineConfig::default(), overrides(&[("MATCH3_SEARCH_DEPTH", "lots")]));
        assert_eq!(cfg.search.depth, 2);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "[search]\ndepth = 1\n[selfplay]\nmax_moves = 5").unwrap();
        let cfg = EngineConfig::from_path(tmp.path()).unwrap();
        assert_eq!(cfg.search.depth, 1);
        assert_eq!(cfg.selfplay.max_moves, Some(5));
        let missing = EngineConfig::from_path(Path::new("/nonexistent/match3.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_presets_by_name() {
        assert_eq!(EngineConfig::preset("Dragon-Souls"), Some(EngineConfig::dragon_souls()));
        assert_eq!(EngineConfig::preset("gemology"), Some(EngineConfig::gemology()));
        assert_eq!(EngineConfig::preset("tetris"), None);
        assert_eq!(EngineConfig::dragon_souls().scoring.multi_type_bonus, None);
    }

    #[test]
    fn test_shipped_config_files_parse() {
        for path in ["configs/gemology.toml", "configs/dragonsouls.toml"] {
            let full = Path::new(env!("CARGO_MANIFEST_DIR")).join(path);
            let cfg = EngineConfig::from_path(&full).unwrap();
            cfg.resolve().unwrap();
        }
        let from_file = EngineConfig::from_path(&Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/dragonsouls.toml"))
            .unwrap()
            .resolve()
            .unwrap();
        let preset = EngineConfig::dragon_souls().resolve().unwrap();
        assert_eq!(from_file.scoring, preset.scoring);
    }
}
