use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Every tunable of a battery run, fixed before the first task starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    pub general: GeneralConfig,
    pub ant: AntConfig,
    pub flanker: FlankerConfig,
    pub ravens: RavensConfig,
    pub sternberg: SternbergConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbortKey {
    F12,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub fullscreen: bool,
    pub borderless: bool,
    pub width: u32,
    pub height: u32,
    pub abort_key: AbortKey,
    /// Fixes every shuffle and random draw when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
    pub assets: PathBuf,
    pub data_dir: PathBuf,
    /// How often waits drain the input queue.
    pub poll_interval_us: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            fullscreen: false,
            borderless: false,
            width: 1280,
            height: 1024,
            abort_key: AbortKey::F12,
            seed: None,
            font: None,
            icon: None,
            assets: PathBuf::from("assets"),
            data_dir: PathBuf::from("data"),
            poll_interval_us: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntConfig {
    pub blocks: usize,
}

impl Default for AntConfig {
    fn default() -> Self {
        Self { blocks: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockOrder {
    Compatible,
    Incompatible,
    /// Operator picks at the start of the task.
    Choose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlankerConfig {
    pub dark_mode: bool,
    pub sets_practice: usize,
    pub sets_main: usize,
    pub blocks_compat: usize,
    pub blocks_incompat: usize,
    pub block_order: BlockOrder,
}

impl Default for FlankerConfig {
    fn default() -> Self {
        Self {
            dark_mode: false,
            sets_practice: 3,
            sets_main: 25,
            blocks_compat: 1,
            blocks_incompat: 0,
            block_order: BlockOrder::Compatible,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RavensConfig {
    pub start_image: usize,
    pub num_trials: usize,
}

impl Default for RavensConfig {
    fn default() -> Self {
        Self {
            start_image: 13,
            num_trials: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SternbergConfig {
    pub blocks: usize,
}

impl Default for SternbergConfig {
    fn default() -> Self {
        Self { blocks: 2 }
    }
}

/// Items in the Raven's set shipped with the battery.
pub const RAVENS_ITEMS: usize = 36;

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl BatteryConfig {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = self.to_toml()?;
        std::fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.general.poll_interval_us)
    }

    /// Rejects combinations no session could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.general;
        if g.width == 0 || g.height == 0 {
            return Err(invalid("general.width/height", "window size must be non-zero"));
        }
        if g.poll_interval_us == 0 || g.poll_interval_us > 10_000 {
            return Err(invalid(
                "general.poll_interval_us",
                format!("{} is outside 1..=10000", g.poll_interval_us),
            ));
        }
        if self.ant.blocks == 0 {
            return Err(invalid("ant.blocks", "at least one block is required"));
        }
        if self.sternberg.blocks == 0 {
            return Err(invalid("sternberg.blocks", "at least one block is required"));
        }

        let f = &self.flanker;
        if f.sets_practice == 0 || f.sets_main == 0 {
            return Err(invalid(
                "flanker.sets_practice/sets_main",
                "every block needs at least one set of trials",
            ));
        }
        if f.blocks_compat + f.blocks_incompat == 0 {
            return Err(invalid(
                "flanker.blocks_compat/blocks_incompat",
                "at least one compatible or incompatible block is required",
            ));
        }

        let r = &self.ravens;
        if r.num_trials == 0 {
            return Err(invalid("ravens.num_trials", "at least one item is required"));
        }
        if r.start_image == 0 || r.start_image + r.num_trials - 1 > RAVENS_ITEMS {
            return Err(invalid(
                "ravens.start_image/num_trials",
                format!(
                    "items {}..={} fall outside the {RAVENS_ITEMS}-item set",
                    r.start_image,
                    r.start_image + r.num_trials - 1
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        BatteryConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = BatteryConfig::from_toml(
            r#"
            [general]
            fullscreen = true
            abort_key = "escape"

            [flanker]
            block_order = "choose"
            blocks_incompat = 1
            "#,
        )
        .unwrap();
        assert!(cfg.general.fullscreen);
        assert_eq!(cfg.general.abort_key, AbortKey::Escape);
        assert_eq!(cfg.general.width, 1280);
        assert_eq!(cfg.flanker.block_order, BlockOrder::Choose);
        assert_eq!(cfg.flanker.blocks_compat, 1);
        assert_eq!(cfg.ant.blocks, 3);
    }

    #[test]
    fn toml_round_trip() {
        let mut cfg = BatteryConfig::default();
        cfg.general.seed = Some(7);
        let back = BatteryConfig::from_toml(&cfg.to_toml().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn ravens_range_must_fit_item_set() {
        let mut cfg = BatteryConfig::default();
        cfg.ravens.start_image = 30;
        cfg.ravens.num_trials = 12;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field, .. } if field.starts_with("ravens")));

        cfg.ravens.num_trials = 7;
        cfg.validate().expect("30..=36 fits");
    }

    #[test]
    fn flanker_needs_some_blocks() {
        let mut cfg = BatteryConfig::default();
        cfg.flanker.blocks_compat = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_blocks_rejected() {
        let mut cfg = BatteryConfig::default();
        cfg.ant.blocks = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_means_defaults() {
        let cfg = BatteryConfig::load(Path::new("/nonexistent/cogbat/battery.toml")).unwrap();
        assert_eq!(cfg, BatteryConfig::default());
    }
}
