//! TOML-based planner configuration.
//!
//! Stores:
//! - Parser defaults (timezone, semester start, reference year)
//! - Estimate settings (baseline minutes-per-page, overhead, fallback)
//! - Learner window
//! - Per-course minutes-per-page profiles
//!
//! Configuration is stored at `~/.config/syllabus-planner/config.toml`.
//! Nothing in the extraction core reads this file; callers load it and pass
//! the derived settings in.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dates::ResolveContext;
use crate::error::ConfigError;
use crate::estimate::{
    clamp_mpp, CourseMppProfile, EstimateCalculator, MppSettings, DEFAULT_BASELINE_MPP,
    DEFAULT_FALLBACK_MINUTES, DEFAULT_OVERHEAD_MINUTES,
};
use crate::learner::DEFAULT_WINDOW_DAYS;

/// Returns `~/.config/syllabus-planner[-dev]/` based on SYLLABUS_ENV.
///
/// Set SYLLABUS_ENV=dev to use the development directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SYLLABUS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("syllabus-planner-dev")
    } else {
        base_dir.join("syllabus-planner")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DirUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Date parsing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// IANA timezone name used for local-midnight due dates
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub semester_start: Option<NaiveDate>,
    /// Year for dates without one, when no semester start is set
    #[serde(default)]
    pub reference_year: Option<i32>,
}

/// Estimate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationConfig {
    #[serde(default = "default_baseline_mpp")]
    pub baseline_mpp: f64,
    #[serde(default = "default_overhead_minutes")]
    pub overhead_minutes: u32,
    #[serde(default = "default_fallback_minutes")]
    pub fallback_minutes: u32,
}

/// Learner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerConfig {
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/syllabus-planner/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub estimation: EstimationConfig,
    #[serde(default)]
    pub learner: LearnerConfig,
    /// Profiles keyed by normalized course key
    #[serde(default)]
    pub courses: BTreeMap<String, CourseMppProfile>,
}

// Default functions
fn default_timezone() -> String {
    "UTC".into()
}
fn default_baseline_mpp() -> f64 {
    DEFAULT_BASELINE_MPP
}
fn default_overhead_minutes() -> u32 {
    DEFAULT_OVERHEAD_MINUTES
}
fn default_fallback_minutes() -> u32 {
    DEFAULT_FALLBACK_MINUTES
}
fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            semester_start: None,
            reference_year: None,
        }
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            baseline_mpp: default_baseline_mpp(),
            overhead_minutes: default_overhead_minutes(),
            fallback_minutes: default_fallback_minutes(),
        }
    }
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Unset optionals take a number or bool if it parses, else a string.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg.normalized())
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit it.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated.normalized();
        Ok(())
    }

    /// Set a value and persist to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.parser
            .timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "parser.timezone".into(),
                message: e.to_string(),
            })
    }

    /// Year used for year-less dates: the configured year, else the semester
    /// start's year, else `fallback_year`.
    pub fn reference_year(&self, fallback_year: i32) -> i32 {
        self.parser
            .reference_year
            .or(self.parser.semester_start.map(|d| d.year()))
            .unwrap_or(fallback_year)
    }

    pub fn resolve_context(&self, fallback_year: i32) -> Result<ResolveContext, ConfigError> {
        let ctx = ResolveContext::new(self.reference_year(fallback_year), self.timezone()?);
        Ok(match self.parser.semester_start {
            Some(start) => ctx.with_semester_start(start),
            None => ctx,
        })
    }

    pub fn mpp_settings(&self) -> MppSettings {
        MppSettings {
            baseline_mpp: clamp_mpp(self.estimation.baseline_mpp),
            profiles: self.courses.clone(),
        }
    }

    pub fn calculator(&self) -> EstimateCalculator {
        EstimateCalculator {
            baseline_mpp: self.estimation.baseline_mpp,
            overhead_minutes: self.estimation.overhead_minutes,
            fallback_minutes: self.estimation.fallback_minutes,
        }
    }

    /// Replace course profiles with learned ones.
    pub fn store_profiles(&mut self, settings: MppSettings) {
        self.courses = settings.profiles;
    }

    /// Create or overwrite a course override.
    pub fn set_override(&mut self, course: &str, mpp: Option<f64>, now: DateTime<Utc>) {
        let baseline = self.estimation.baseline_mpp;
        let mut profile = self
            .mpp_settings()
            .profile_for(course)
            .cloned()
            .unwrap_or_else(|| CourseMppProfile::new(course, baseline, now));
        profile.override_enabled = mpp.is_some();
        profile.override_mpp = mpp.map(clamp_mpp);
        profile.updated_at = now;
        self.courses.insert(profile.course_key.clone(), profile);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        let baseline = self.estimation.baseline_mpp;
        if baseline.is_nan() || baseline <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "estimation.baseline_mpp".into(),
                message: "must be positive".into(),
            });
        }
        if self.learner.window_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "learner.window_days".into(),
                message: "must be at least one day".into(),
            });
        }
        Ok(())
    }

    /// Enforce profile bounds after hand edits.
    fn normalized(mut self) -> Self {
        self.courses = std::mem::take(&mut self.courses)
            .into_iter()
            .map(|(key, profile)| (key, profile.clamped()))
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.parser.timezone, "UTC");
        assert_eq!(parsed.estimation.baseline_mpp, 2.0);
        assert_eq!(parsed.learner.window_days, 60);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("parser.timezone").as_deref(), Some("UTC"));
        assert_eq!(cfg.get("estimation.overhead_minutes").as_deref(), Some("10"));
        assert!(cfg.get("parser.missing_key").is_none());
    }

    #[test]
    fn set_value_updates_nested_fields() {
        let mut cfg = Config::default();
        cfg.set_value("parser.timezone", "America/Chicago").unwrap();
        cfg.set_value("estimation.baseline_mpp", "2.5").unwrap();
        cfg.set_value("learner.window_days", "30").unwrap();
        assert_eq!(cfg.parser.timezone, "America/Chicago");
        assert_eq!(cfg.estimation.baseline_mpp, 2.5);
        assert_eq!(cfg.learner.window_days, 30);
    }

    #[test]
    fn set_value_fills_unset_optionals() {
        let mut cfg = Config::default();
        cfg.set_value("parser.semester_start", "2025-01-06").unwrap();
        cfg.set_value("parser.reference_year", "2026").unwrap();
        assert_eq!(cfg.parser.semester_start, NaiveDate::from_ymd_opt(2025, 1, 6));
        assert_eq!(cfg.parser.reference_year, Some(2026));
    }

    #[test]
    fn set_value_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("parser.nonexistent", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.set_value("learner.window_days", "soon").is_err());
        assert!(cfg.set_value("parser.timezone", "Mars/Olympus").is_err());
        assert!(cfg.set_value("estimation.baseline_mpp", "0").is_err());
        // failed sets leave the config untouched
        assert_eq!(cfg.parser.timezone, "UTC");
        assert_eq!(cfg.estimation.baseline_mpp, 2.0);
    }

    #[test]
    fn resolve_context_prefers_configured_year() {
        let mut cfg = Config::default();
        cfg.parser.timezone = "America/Chicago".into();
        assert_eq!(cfg.resolve_context(2030).unwrap().reference_year, 2030);

        cfg.parser.semester_start = NaiveDate::from_ymd_opt(2025, 8, 25);
        let ctx = cfg.resolve_context(2030).unwrap();
        assert_eq!(ctx.reference_year, 2025);
        assert_eq!(ctx.semester_start, NaiveDate::from_ymd_opt(2025, 8, 25));

        cfg.parser.reference_year = Some(2024);
        assert_eq!(cfg.resolve_context(2030).unwrap().reference_year, 2024);
    }

    #[test]
    fn course_overrides_flow_into_settings() {
        let mut cfg = Config::default();
        cfg.set_override("Criminal Law", Some(9.0), now());
        let settings = cfg.mpp_settings();
        let profile = settings.profile_for("Criminal").unwrap();
        assert!(profile.override_enabled);
        assert_eq!(profile.override_mpp, Some(6.0));
        assert_eq!(cfg.calculator().effective_mpp(Some(profile)), 6.0);

        cfg.set_override("criminal", None, now());
        assert!(!cfg.courses["criminal"].override_enabled);
        assert_eq!(cfg.courses.len(), 1);
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.parser.timezone = "Europe/Berlin".into();
        cfg.set_override("Torts", Some(1.5), now());
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.parser.timezone, "Europe/Berlin");
        assert_eq!(loaded.courses["torts"].override_mpp, Some(1.5));
    }

    #[test]
    fn load_from_clamps_hand_edited_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[parser]
timezone = "America/Chicago"

[courses.torts]
course_key = "torts"
minutes_per_page = 12.0
updated_at = "2025-01-01T00:00:00Z"
"#,
        )
        .unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.courses["torts"].minutes_per_page, 6.0);
        assert_eq!(loaded.estimation.fallback_minutes, 30);
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.parser.timezone, "UTC");
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "parser = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
