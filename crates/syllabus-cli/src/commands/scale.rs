use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use syllabus_core::{
    refine_settings, Config, CourseAttributor, CourseScale, CourseTotals, ScaleLearner,
    SessionSnapshot, TaskSnapshot,
};

use super::read_json;

#[derive(Args)]
pub struct ScaleArgs {
    /// JSON array of task snapshots
    pub tasks: PathBuf,
    /// JSON array of session snapshots
    pub sessions: PathBuf,
    /// Days of sessions to consider (default: learner.window_days)
    #[arg(long)]
    pub window_days: Option<i64>,
    /// End of the window, RFC 3339 (default: now)
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,
    /// Attribute sessions without the built-in override rules
    #[arg(long)]
    pub no_overrides: bool,
    /// Fold the learned scales into the saved course profiles
    #[arg(long)]
    pub apply: bool,
}

#[derive(Serialize)]
struct ScaleOutput {
    scale: CourseScale,
    totals: BTreeMap<String, CourseTotals>,
}

pub fn run(args: ScaleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let tasks: Vec<TaskSnapshot> = read_json(&args.tasks)?;
    let sessions: Vec<SessionSnapshot> = read_json(&args.sessions)?;

    let window_days = args.window_days.unwrap_or(config.learner.window_days);
    if window_days <= 0 {
        return Err("window must be at least one day".into());
    }
    let as_of = args.as_of.unwrap_or_else(Utc::now);

    let learner = if args.no_overrides {
        ScaleLearner::new(CourseAttributor::without_overrides())
    } else {
        ScaleLearner::default()
    };
    let totals = learner.course_totals(&tasks, &sessions, window_days, as_of);
    let scale = learner.compute_course_scale(&tasks, &sessions, window_days, as_of);

    if args.apply {
        let refined = refine_settings(&config.mpp_settings(), &totals, as_of);
        let changed = refined
            .profiles
            .iter()
            .filter(|(key, profile)| config.courses.get(key.as_str()) != Some(*profile))
            .count();
        config.store_profiles(refined);
        config.save()?;
        eprintln!("Updated {changed} course profile(s)");
    }

    let output = ScaleOutput { scale, totals };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
