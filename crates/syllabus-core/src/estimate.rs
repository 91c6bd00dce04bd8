//! Reading-time estimates.
//!
//! An estimate comes from, in strict priority order:
//! 1. an explicit minute count (used verbatim)
//! 2. a page count times the effective minutes-per-page, plus a fixed
//!    context-switch overhead
//! 3. a flat fallback, flagged as a guess
//!
//! Per-course settings are passed in as an [`MppSettings`] value; nothing
//! here reads ambient state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::course::{matches, normalize};

pub const MIN_MPP: f64 = 0.5;
pub const MAX_MPP: f64 = 6.0;
pub const DEFAULT_BASELINE_MPP: f64 = 2.0;
pub const DEFAULT_OVERHEAD_MINUTES: u32 = 10;
pub const DEFAULT_FALLBACK_MINUTES: u32 = 30;

pub fn clamp_mpp(value: f64) -> f64 {
    if value.is_nan() {
        return DEFAULT_BASELINE_MPP;
    }
    value.clamp(MIN_MPP, MAX_MPP)
}

/// Per-course minutes-per-page calibration.
///
/// `minutes_per_page` and `override_mpp` always sit in `[MIN_MPP, MAX_MPP]`;
/// every constructor and setter clamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseMppProfile {
    pub course_key: String,
    pub minutes_per_page: f64,
    #[serde(default)]
    pub sample_size: u32,
    #[serde(default)]
    pub override_enabled: bool,
    #[serde(default)]
    pub override_mpp: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl CourseMppProfile {
    pub fn new(course: &str, minutes_per_page: f64, updated_at: DateTime<Utc>) -> Self {
        Self {
            course_key: normalize(course),
            minutes_per_page: clamp_mpp(minutes_per_page),
            sample_size: 0,
            override_enabled: false,
            override_mpp: None,
            updated_at,
        }
    }

    /// Pin the course to a user-chosen rate.
    pub fn with_override(mut self, mpp: f64) -> Self {
        self.override_enabled = true;
        self.override_mpp = Some(clamp_mpp(mpp));
        self
    }

    pub fn set_minutes_per_page(&mut self, mpp: f64, at: DateTime<Utc>) {
        self.minutes_per_page = clamp_mpp(mpp);
        self.updated_at = at;
    }

    /// Re-apply the bounds, e.g. after deserializing hand-edited config.
    pub fn clamped(mut self) -> Self {
        self.minutes_per_page = clamp_mpp(self.minutes_per_page);
        self.override_mpp = self.override_mpp.map(clamp_mpp);
        self
    }
}

/// Minutes-per-page settings injected by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MppSettings {
    pub baseline_mpp: f64,
    /// Profiles keyed by normalized course key
    #[serde(default)]
    pub profiles: BTreeMap<String, CourseMppProfile>,
}

impl Default for MppSettings {
    fn default() -> Self {
        Self {
            baseline_mpp: DEFAULT_BASELINE_MPP,
            profiles: BTreeMap::new(),
        }
    }
}

impl MppSettings {
    pub fn with_profile(mut self, profile: CourseMppProfile) -> Self {
        self.insert(profile);
        self
    }

    pub fn insert(&mut self, profile: CourseMppProfile) {
        self.profiles.insert(profile.course_key.clone(), profile.clamped());
    }

    /// Profile for a course name: exact key first, then the first fuzzy match
    /// in key order.
    pub fn profile_for(&self, course: &str) -> Option<&CourseMppProfile> {
        let key = normalize(course);
        if key.is_empty() {
            return None;
        }
        self.profiles.get(&key).or_else(|| {
            self.profiles
                .values()
                .find(|profile| matches(course, &profile.course_key, None))
        })
    }
}

/// What the calculator needs to know about a piece of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EstimateInput {
    pub explicit_minutes: Option<u32>,
    pub pages: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateResult {
    pub minutes: u32,
    /// Set only when neither a minute count nor a page count was available
    pub guessed: bool,
}

/// Turns explicit minutes or page counts into minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimateCalculator {
    pub baseline_mpp: f64,
    pub overhead_minutes: u32,
    pub fallback_minutes: u32,
}

impl Default for EstimateCalculator {
    fn default() -> Self {
        Self {
            baseline_mpp: DEFAULT_BASELINE_MPP,
            overhead_minutes: DEFAULT_OVERHEAD_MINUTES,
            fallback_minutes: DEFAULT_FALLBACK_MINUTES,
        }
    }
}

impl EstimateCalculator {
    pub fn new(baseline_mpp: f64) -> Self {
        Self {
            baseline_mpp,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &MppSettings) -> Self {
        Self::new(settings.baseline_mpp)
    }

    pub fn estimate(&self, input: &EstimateInput, profile: Option<&CourseMppProfile>) -> EstimateResult {
        if let Some(minutes) = input.explicit_minutes.filter(|m| *m > 0) {
            return EstimateResult {
                minutes,
                guessed: false,
            };
        }

        if let Some(pages) = input.pages.filter(|p| *p > 0) {
            let mpp = self.effective_mpp(profile);
            let minutes = (f64::from(pages) * mpp + f64::from(self.overhead_minutes)).round();
            return EstimateResult {
                minutes: minutes.min(f64::from(u32::MAX)) as u32,
                guessed: false,
            };
        }

        EstimateResult {
            minutes: self.fallback_minutes,
            guessed: true,
        }
    }

    /// Override when enabled and positive, else the learned rate, else the
    /// baseline; always clamped.
    pub fn effective_mpp(&self, profile: Option<&CourseMppProfile>) -> f64 {
        let chosen = profile.and_then(|p| {
            let pinned = p
                .override_mpp
                .filter(|mpp| p.override_enabled && *mpp > 0.0);
            pinned.or(Some(p.minutes_per_page).filter(|mpp| *mpp > 0.0))
        });
        clamp_mpp(chosen.unwrap_or(self.baseline_mpp))
    }
}
