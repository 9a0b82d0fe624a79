//! Configuration file support for Breakflow.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/breakflow/config.toml`.
//! Session settings entered by the user are clamped here, before they reach
//! the engine.

use crate::{get_default_catalog, Catalog, Error, Exercise, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Allowed work phase length in minutes
pub const WORK_MINUTES: RangeInclusive<u32> = 1..=120;

/// Allowed break phase length in minutes
pub const BREAK_MINUTES: RangeInclusive<u32> = 1..=60;

/// Allowed time per exercise in seconds
pub const EXERCISE_SECONDS: RangeInclusive<u64> = 1..=3600;

/// Allowed interval between camera feedback messages in seconds
pub const FEEDBACK_INTERVAL_SECONDS: RangeInclusive<u64> = 1..=3600;

/// Allowed number of feedback messages kept on screen
pub const FEEDBACK_HISTORY: RangeInclusive<usize> = 1..=50;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub exercises: ExerciseConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default = "default_presets")]
    pub presets: Vec<Preset>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            exercises: ExerciseConfig::default(),
            camera: CameraConfig::default(),
            presets: default_presets(),
        }
    }
}

/// Phase timing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,

    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,

    /// How often the host loop recomputes countdowns
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Break exercise configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseConfig {
    /// Time given to each exercise before moving on
    #[serde(default = "default_exercise_seconds")]
    pub duration_seconds: u64,

    /// Extra exercises appended to the built-in catalog
    #[serde(default)]
    pub custom: Vec<Exercise>,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            duration_seconds: default_exercise_seconds(),
            custom: Vec::new(),
        }
    }
}

/// Camera panel configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_feedback_interval_seconds")]
    pub feedback_interval_seconds: u64,

    /// Number of feedback messages kept on screen
    #[serde(default = "default_feedback_history")]
    pub feedback_history: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            feedback_interval_seconds: default_feedback_interval_seconds(),
            feedback_history: default_feedback_history(),
        }
    }
}

/// A named work/break pairing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub work_minutes: u32,
    pub break_minutes: u32,
}

impl Preset {
    fn new(name: &str, work_minutes: u32, break_minutes: u32) -> Self {
        Self {
            name: name.into(),
            work_minutes,
            break_minutes,
        }
    }
}

// Default value functions
fn default_work_minutes() -> u32 {
    50
}

fn default_break_minutes() -> u32 {
    10
}

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_exercise_seconds() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_feedback_interval_seconds() -> u64 {
    4
}

fn default_feedback_history() -> usize {
    3
}

fn default_presets() -> Vec<Preset> {
    vec![
        Preset::new("Test", 1, 1),
        Preset::new("Pomodoro", 25, 5),
        Preset::new("Classic", 50, 10),
        Preset::new("Deep", 90, 20),
    ]
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("breakflow").join("config.toml")
    }

    /// Save the configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(10..=1000).contains(&self.timer.tick_interval_ms) {
            return Err(Error::Config(format!(
                "timer.tick_interval_ms must be between 10 and 1000, got {}",
                self.timer.tick_interval_ms
            )));
        }
        check_range(
            "exercises.duration_seconds",
            self.exercises.duration_seconds,
            &EXERCISE_SECONDS,
        )?;
        check_range(
            "camera.feedback_interval_seconds",
            self.camera.feedback_interval_seconds,
            &FEEDBACK_INTERVAL_SECONDS,
        )?;
        check_range(
            "camera.feedback_history",
            self.camera.feedback_history,
            &FEEDBACK_HISTORY,
        )?;
        for preset in &self.presets {
            if preset.name.trim().is_empty() {
                return Err(Error::Config("preset with empty name".into()));
            }
        }

        let errors = self.catalog().validate();
        if !errors.is_empty() {
            return Err(Error::CatalogValidation(errors.join("; ")));
        }
        Ok(())
    }

    /// Built-in catalog followed by the configured custom exercises
    pub fn catalog(&self) -> Catalog {
        get_default_catalog()
            .clone()
            .with_custom(&self.exercises.custom)
    }

    /// Case-insensitive preset lookup
    pub fn find_preset(&self, name: &str) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }
}

// ============================================================================
// Session Settings
// ============================================================================

/// User-entered settings for one run, already clamped to the allowed ranges
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SessionSettings {
    pub user_name: String,
    pub work_minutes: u32,
    pub break_minutes: u32,
}

impl SessionSettings {
    /// Validate and clamp user input.
    ///
    /// Work is clamped to [`WORK_MINUTES`], break to [`BREAK_MINUTES`]. An empty
    /// name is rejected.
    pub fn new(user_name: &str, work_minutes: u32, break_minutes: u32) -> Result<Self> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(Error::InvalidSettings("user name must not be empty".into()));
        }

        Ok(Self {
            user_name: user_name.to_string(),
            work_minutes: clamp_minutes("work", work_minutes, &WORK_MINUTES),
            break_minutes: clamp_minutes("break", break_minutes, &BREAK_MINUTES),
        })
    }

    pub fn work_secs(&self) -> u64 {
        u64::from(self.work_minutes) * 60
    }

    pub fn break_secs(&self) -> u64 {
        u64::from(self.break_minutes) * 60
    }
}

fn check_range<T>(key: &str, value: T, range: &RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must be between {} and {}, got {}",
            key,
            range.start(),
            range.end(),
            value
        )))
    }
}

fn clamp_minutes(label: &str, minutes: u32, range: &RangeInclusive<u32>) -> u32 {
    let clamped = minutes.clamp(*range.start(), *range.end());
    if clamped != minutes {
        tracing::warn!(
            "{} duration {} min outside {}..={}, using {} min",
            label,
            minutes,
            range.start(),
            range.end(),
            clamped
        );
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timer.work_minutes, 50);
        assert_eq!(config.timer.break_minutes, 10);
        assert_eq!(config.timer.tick_interval_ms, 500);
        assert_eq!(config.exercises.duration_seconds, 60);
        assert!(config.camera.enabled);
        assert_eq!(config.presets.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_catalog_without_custom_matches_cached_default() {
        let config = Config::default();
        assert_eq!(&config.catalog(), get_default_catalog());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.timer.work_minutes, parsed.timer.work_minutes);
        assert_eq!(config.presets, parsed.presets);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[timer]
break_minutes = 5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timer.break_minutes, 5);
        assert_eq!(config.timer.work_minutes, 50); // default
        assert_eq!(config.camera.feedback_history, 3); // default
        assert_eq!(config.presets.len(), 4); // default
    }

    #[test]
    fn test_custom_exercises_extend_catalog() {
        let toml_str = r#"
[[exercises.custom]]
id = "wall_angels"
name = "Wall Angels"
reps = "8 reps"
cue = "Keep lower back against the wall"
checkpoints = ["Back flat", "Elbows touch wall"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let catalog = config.catalog();

        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.get(7).map(|e| e.name.as_str()), Some("Wall Angels"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_custom_exercise_rejected() {
        let toml_str = r#"
[[exercises.custom]]
id = "neck_rolls"
name = "Neck Rolls Again"
reps = "5"
cue = "Again"
checkpoints = ["Done"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(Error::CatalogValidation(_))
        ));
    }

    #[test]
    fn test_invalid_tick_interval_rejected() {
        let mut config = Config::default();
        config.timer.tick_interval_ms = 5_000;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_exercise_duration_bounds() {
        let mut config = Config::default();
        config.exercises.duration_seconds = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.exercises.duration_seconds = 100_000_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exercises.duration_seconds"));

        config.exercises.duration_seconds = 3600;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_feedback_interval_bounds() {
        let mut config = Config::default();
        config.camera.feedback_interval_seconds = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.camera.feedback_interval_seconds = 100_000_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("camera.feedback_interval_seconds"));
    }

    #[test]
    fn test_feedback_history_bounds() {
        let mut config = Config::default();
        config.camera.feedback_history = usize::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("camera.feedback_history"));

        config.camera.feedback_history = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_out_of_range_file_rejected_on_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        for body in [
            "[exercises]\nduration_seconds = 100000000000000\n",
            "[camera]\nfeedback_interval_seconds = 100000000000000\n",
            "[camera]\nfeedback_history = 9223372036854775807\n",
        ] {
            let path = temp_dir.path().join("config.toml");
            std::fs::write(&path, body).unwrap();
            assert!(
                matches!(Config::load_from(&path), Err(Error::Config(_))),
                "accepted: {}",
                body
            );
        }
    }

    #[test]
    fn test_load_and_save_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.timer.work_minutes = 25;
        config.camera.enabled = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timer.work_minutes, 25);
        assert!(!loaded.camera.enabled);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[timer\nwork_minutes = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Toml(_))));
    }

    #[test]
    fn test_find_preset_case_insensitive() {
        let config = Config::default();
        let preset = config.find_preset("pomodoro").unwrap();
        assert_eq!((preset.work_minutes, preset.break_minutes), (25, 5));
        assert!(config.find_preset("marathon").is_none());
    }

    #[test]
    fn test_settings_clamp_durations() {
        let settings = SessionSettings::new("Ann", 500, 0).unwrap();
        assert_eq!(settings.work_minutes, 120);
        assert_eq!(settings.break_minutes, 1);

        let settings = SessionSettings::new("Ann", 0, 90).unwrap();
        assert_eq!(settings.work_minutes, 1);
        assert_eq!(settings.break_minutes, 60);
        assert_eq!(settings.work_secs(), 60);
        assert_eq!(settings.break_secs(), 3600);
    }

    #[test]
    fn test_settings_reject_blank_name() {
        assert!(matches!(
            SessionSettings::new("   ", 25, 5),
            Err(Error::InvalidSettings(_))
        ));
        assert_eq!(SessionSettings::new(" Ann ", 25, 5).unwrap().user_name, "Ann");
    }
}
