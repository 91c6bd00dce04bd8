//! Per-course estimate correction learned from logged study time.
//!
//! Compares what was estimated for a course against what was actually logged
//! for it recently and turns the ratio into a bounded multiplier. The scale is
//! recomputed from the full snapshot every call and layered on top of the
//! per-course minutes-per-page rate, never replacing it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::course::{index_tasks, normalize, CourseAttributor, UNASSIGNED};
use crate::estimate::{CourseMppProfile, MppSettings};
use crate::snapshot::{SessionSnapshot, TaskSnapshot};

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 2.0;
pub const DEFAULT_WINDOW_DAYS: i64 = 60;

/// Estimated and logged totals for one course key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseTotals {
    pub estimated_minutes: u64,
    pub logged_minutes: u64,
    /// Sessions inside the window that fed `logged_minutes`
    pub sessions: u32,
}

impl CourseTotals {
    /// `logged / estimated`, clamped; `1.0` without any estimate to compare.
    pub fn scale_factor(&self) -> f64 {
        if self.estimated_minutes == 0 {
            return 1.0;
        }
        (self.logged_minutes as f64 / self.estimated_minutes as f64).clamp(MIN_SCALE, MAX_SCALE)
    }
}

/// Course key → bounded scale factor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseScale(BTreeMap<String, f64>);

impl CourseScale {
    /// Factor for a course name (normalized); `1.0` for unknown courses.
    pub fn factor(&self, course: &str) -> f64 {
        self.0.get(&normalize(course)).copied().unwrap_or(1.0)
    }

    /// Correct an estimate by the course's factor.
    pub fn apply(&self, course: &str, minutes: u32) -> u32 {
        (f64::from(minutes) * self.factor(course)).round() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, f64> {
        self.0
    }
}

/// Learns course scales from task and session snapshots.
#[derive(Debug, Default)]
pub struct ScaleLearner {
    pub attributor: CourseAttributor,
}

impl ScaleLearner {
    pub fn new(attributor: CourseAttributor) -> Self {
        Self { attributor }
    }

    /// Totals per course key. Tasks count regardless of age; sessions only
    /// when logged within `window_days` before `as_of` (inclusive).
    pub fn course_totals(
        &self,
        tasks: &[TaskSnapshot],
        sessions: &[SessionSnapshot],
        window_days: i64,
        as_of: DateTime<Utc>,
    ) -> BTreeMap<String, CourseTotals> {
        let mut totals: BTreeMap<String, CourseTotals> = BTreeMap::new();

        for task in tasks {
            let course = task
                .course
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(UNASSIGNED);
            let entry = totals.entry(normalize(course)).or_default();
            entry.estimated_minutes += u64::from(task.estimated_minutes.unwrap_or(0));
        }

        let index = index_tasks(tasks);
        // windows too wide for the calendar keep every session
        let window_start = Duration::try_days(window_days.max(0))
            .and_then(|span| as_of.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        for session in sessions {
            if session.logged_at < window_start || session.logged_at > as_of {
                continue;
            }
            let course = self.attributor.attribute(session, &index);
            let entry = totals.entry(normalize(&course)).or_default();
            entry.logged_minutes += u64::from(session.minutes);
            entry.sessions += 1;
        }

        totals
    }

    pub fn compute_course_scale(
        &self,
        tasks: &[TaskSnapshot],
        sessions: &[SessionSnapshot],
        window_days: i64,
        as_of: DateTime<Utc>,
    ) -> CourseScale {
        let scale = self
            .course_totals(tasks, sessions, window_days, as_of)
            .into_iter()
            .map(|(key, totals)| (key, totals.scale_factor()))
            .collect::<BTreeMap<_, _>>();
        tracing::debug!(courses = scale.len(), window_days, "computed course scale");
        CourseScale(scale)
    }
}

/// [`ScaleLearner::compute_course_scale`] with the default attribution rules.
pub fn compute_course_scale(
    tasks: &[TaskSnapshot],
    sessions: &[SessionSnapshot],
    window_days: i64,
    as_of: DateTime<Utc>,
) -> CourseScale {
    ScaleLearner::default().compute_course_scale(tasks, sessions, window_days, as_of)
}

/// Derive a profile's learned rate from the baseline and an observed scale.
///
/// The rate is `baseline_mpp * scale` (clamped) and `sample_size` is the
/// number of sessions behind the scale, so refining twice from the same
/// snapshot gives the same profile. The override, if any, is left alone; a
/// profile with no samples is returned unchanged.
pub fn refine_profile(
    profile: &CourseMppProfile,
    baseline_mpp: f64,
    scale: f64,
    samples: u32,
    now: DateTime<Utc>,
) -> CourseMppProfile {
    let mut refined = profile.clone();
    if samples == 0 {
        return refined;
    }
    let factor = scale.clamp(MIN_SCALE, MAX_SCALE);
    refined.set_minutes_per_page(baseline_mpp * factor, now);
    refined.sample_size = samples;
    refined
}

/// Refine every course profile that has fresh evidence behind it.
///
/// Courses with logged sessions and a non-zero estimate get a learned rate of
/// baseline times scale; profiles keep their stored key and override. The
/// unassigned bucket is never turned into a profile.
pub fn refine_settings(
    settings: &MppSettings,
    totals: &BTreeMap<String, CourseTotals>,
    now: DateTime<Utc>,
) -> MppSettings {
    let mut refined = settings.clone();
    let unassigned = normalize(UNASSIGNED);
    for (key, course) in totals {
        if *key == unassigned || course.sessions == 0 || course.estimated_minutes == 0 {
            continue;
        }
        let current = settings.profiles.get(key).cloned().unwrap_or_else(|| CourseMppProfile {
            course_key: key.clone(),
            ..CourseMppProfile::new(key, settings.baseline_mpp, now)
        });
        refined.insert(refine_profile(
            &current,
            settings.baseline_mpp,
            course.scale_factor(),
            course.sessions,
            now,
        ));
    }
    refined
}
