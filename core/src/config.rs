use std::{collections::BTreeMap, fs, path::Path};

use thiserror::Error;

use crate::EnemyKind;

/// Errors raised while reading a configuration source.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file `{path}`")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The TOML document could not be parsed.
    #[error("failed to parse configuration toml")]
    Toml(#[from] toml::de::Error),
}

/// Values that can be looked up from a [`GameConfig`].
pub trait ConfigValue: Sized {
    /// Parses the raw textual value, returning `None` when it is malformed.
    fn parse_value(raw: &str) -> Option<Self>;
}

macro_rules! from_str_config_value {
    ($($ty:ty),*) => {
        $(
            impl ConfigValue for $ty {
                fn parse_value(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

from_str_config_value!(u32, u64, i32, usize, f32, f64);

impl ConfigValue for bool {
    fn parse_value(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

impl ConfigValue for String {
    fn parse_value(raw: &str) -> Option<Self> {
        Some(raw.trim().to_owned())
    }
}

/// Read-only key-value configuration with per-lookup defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameConfig {
    values: BTreeMap<String, String>,
}

impl GameConfig {
    /// Parses `KEY = VALUE` lines; comments start with `--`.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let mut config = Self::default();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("--") {
                continue;
            }

            let mut parts = line.split('=');
            let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            config.set(key, value.trim());
        }
        config
    }

    /// Flattens the top-level scalar entries of a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(contents)?;
        let mut config = Self::default();
        for (key, value) in table {
            let raw = match value {
                toml::Value::String(text) => text,
                toml::Value::Integer(number) => number.to_string(),
                toml::Value::Float(number) => number.to_string(),
                toml::Value::Boolean(flag) => flag.to_string(),
                other => {
                    log::debug!("ignoring non-scalar configuration key `{key}`: {other:?}");
                    continue;
                }
            };
            config.set(&key, &raw);
        }
        Ok(config)
    }

    /// Loads a configuration file, choosing the TOML reader for `.toml` files.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        if path.extension().is_some_and(|extension| extension == "toml") {
            Self::from_toml_str(&contents)
        } else {
            Ok(Self::parse(&contents))
        }
    }

    /// Loads a configuration file, falling back to an empty configuration.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!("loaded {} configuration keys from {}", config.len(), path.display());
                config
            }
            Err(error) => {
                log::error!("{error}; using built-in defaults");
                Self::default()
            }
        }
    }

    /// Stores a value, replacing any previous one.
    pub fn set(&mut self, key: &str, value: &str) {
        let _ = self.values.insert(key.to_owned(), value.to_owned());
    }

    /// Looks up a typed value, returning `default` when missing or malformed.
    #[must_use]
    pub fn get<T: ConfigValue>(&self, key: &str, default: T) -> T {
        self.values
            .get(key)
            .and_then(|raw| T::parse_value(raw))
            .unwrap_or(default)
    }

    /// Looks up a typed value without a default.
    #[must_use]
    pub fn lookup<T: ConfigValue>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|raw| T::parse_value(raw))
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Reports whether no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Points awarded per kill and the extra-life threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreTable {
    /// Points for a Burwor.
    pub burwor: u32,
    /// Points for a Garwor.
    pub garwor: u32,
    /// Points for a Thorwor.
    pub thorwor: u32,
    /// Points for the Worluk.
    pub worluk: u32,
    /// Points for the Wizard.
    pub wizard: u32,
    /// Points for shooting the other player.
    pub other_player: u32,
    /// Score at which a player earns an extra life.
    pub extra_life: u32,
}

impl ScoreTable {
    /// Points awarded for killing an enemy of the provided kind.
    #[must_use]
    pub const fn for_kind(&self, kind: EnemyKind) -> u32 {
        match kind {
            EnemyKind::Burwor => self.burwor,
            EnemyKind::Garwor => self.garwor,
            EnemyKind::Thorwor => self.thorwor,
            EnemyKind::Worluk => self.worluk,
            EnemyKind::Wizard => self.wizard,
        }
    }
}

/// Enemy counts configured for one stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnemyCounts {
    /// Burwors spawned when the level starts.
    pub burwors: u32,
    /// Garwors spawned as reinforcements.
    pub garwors: u32,
    /// Thorwors spawned as reinforcements.
    pub thorwors: u32,
    /// Worluks allowed during the stage.
    pub worluks: u32,
}

impl EnemyCounts {
    /// Number of regular enemies that must die to clear the stage.
    #[must_use]
    pub const fn to_kill(&self) -> u32 {
        self.burwors + self.garwors + self.thorwors
    }
}

/// Gameplay constants resolved from a [`GameConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct Tuning {
    /// Lives a player starts with.
    pub player_max_lives: i32,
    /// Seconds after which a caged player leaves automatically.
    pub player_time_in_cage: f32,
    /// Player bullet speed in pixels per second.
    pub player_bullet_speed: f32,
    /// Enemy bullet speed in pixels per second.
    pub enemy_bullet_speed: f32,
    /// Base enemy speed per difficulty threshold.
    pub enemy_speeds: [f32; 5],
    /// Wizard speed.
    pub wizard_speed: f32,
    /// Seconds between two Wizard teleports.
    pub wizard_teleport_cooldown: f32,
    /// Kill scores.
    pub scores: ScoreTable,
    /// Whether camera shake is enabled.
    pub camera_shake: bool,
    config: GameConfig,
}

impl Tuning {
    /// Resolves every constant, substituting defaults for missing keys.
    #[must_use]
    pub fn from_config(config: &GameConfig) -> Self {
        let defaults = [25.0, 30.0, 40.0, 50.0, 60.0];
        let mut enemy_speeds = defaults;
        for (index, speed) in enemy_speeds.iter_mut().enumerate() {
            *speed = config.get(&format!("ENEMY_SPEED_{}", index + 1), defaults[index]);
        }

        Self {
            player_max_lives: config.get("PLAYER_MAX_LIVES", 3),
            player_time_in_cage: config.get("PLAYER_TIME_IN_CAGE", 5.0),
            player_bullet_speed: config.get("PLAYER_BULLET_SPEED", 150.0),
            enemy_bullet_speed: config.get("ENEMY_BULLET_SPEED", 100.0),
            enemy_speeds,
            wizard_speed: config.get("WIZARD_SPEED", 30.0),
            wizard_teleport_cooldown: config.get("WIZARD_TELEPORT_COOLDOWN", 3.0),
            scores: ScoreTable {
                burwor: config.get("BURWOR_SCORE", 100),
                garwor: config.get("GARWOR_SCORE", 200),
                thorwor: config.get("THORWOR_SCORE", 500),
                worluk: config.get("WORLUK_SCORE", 1000),
                wizard: config.get("WIZARD_SCORE", 2500),
                other_player: config.get("OTHER_PLAYER_SCORE", 1000),
                extra_life: config.get("EXTRA_LIFE_SCORE", 10_000),
            },
            camera_shake: config.get("CAMERA_SHAKE", true),
            config: config.clone(),
        }
    }

    /// Enemy counts for a zero-based stage index.
    #[must_use]
    pub fn enemy_counts(&self, stage: u32) -> EnemyCounts {
        let level = stage + 1;
        let default_burwors = self.config.get("BURWORS", 6);
        EnemyCounts {
            burwors: self
                .config
                .get(&format!("BURWORS_LEVEL_{level}"), default_burwors),
            garwors: self.config.get(&format!("GARWORS_LEVEL_{level}"), 0),
            thorwors: self.config.get(&format!("THORWORS_LEVEL_{level}"), 0),
            worluks: self.config.get(&format!("WORLUK_LEVEL_{level}"), 0),
        }
    }

    /// Base speed for a difficulty threshold, clamped to the known tiers.
    #[must_use]
    pub fn threshold_speed(&self, threshold: usize) -> f32 {
        self.enemy_speeds[threshold.min(self.enemy_speeds.len() - 1)]
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{GameConfig, Tuning};
    use crate::EnemyKind;

    #[test]
    fn parses_key_value_lines_and_skips_comments() {
        let config = GameConfig::parse(
            "-- enemy setup\nBURWORS = 4\n\nCAMERA_SHAKE = FALSE\nBROKEN LINE\nA=B=C\n",
        );
        assert_eq!(config.len(), 2);
        assert_eq!(config.get("BURWORS", 0_u32), 4);
        assert!(!config.get("CAMERA_SHAKE", true));
        assert_eq!(config.lookup::<String>("A"), None);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let config = GameConfig::parse("PLAYER_MAX_LIVES = many");
        assert_eq!(config.get("PLAYER_MAX_LIVES", 3_i32), 3);
        assert_eq!(config.get("MISSING", 2.5_f32), 2.5);
    }

    #[test]
    fn toml_scalars_are_flattened() {
        let config = GameConfig::from_toml_str(
            "PLAYER_BULLET_SPEED = 180.5\nBURWORS_LEVEL_3 = 2\nCAMERA_SHAKE = false\n[nested]\nX = 1\n",
        )
        .expect("valid toml");
        assert_eq!(config.get("PLAYER_BULLET_SPEED", 0.0_f32), 180.5);
        assert_eq!(config.get("BURWORS_LEVEL_3", 0_u32), 2);
        assert!(!config.get("CAMERA_SHAKE", true));
        assert_eq!(config.lookup::<u32>("X"), None);
    }

    #[test]
    fn tuning_resolves_defaults_and_per_level_counts() {
        let mut config = GameConfig::default();
        config.set("BURWORS", "5");
        config.set("GARWORS_LEVEL_2", "3");
        config.set("ENEMY_SPEED_5", "70");
        let tuning = Tuning::from_config(&config);

        assert_eq!(tuning.player_max_lives, 3);
        assert_eq!(tuning.scores.for_kind(EnemyKind::Wizard), 2500);
        assert_eq!(tuning.threshold_speed(9), 70.0);

        let first = tuning.enemy_counts(0);
        assert_eq!(first.burwors, 5);
        assert_eq!(first.garwors, 0);
        let second = tuning.enemy_counts(1);
        assert_eq!(second.to_kill(), 8);
    }
}
