pub mod config;
pub mod course;
pub mod estimate;
pub mod parse;
pub mod preview;
pub mod scale;

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::Args;
use std::io::Read;
use std::path::{Path, PathBuf};
use syllabus_core::{Config, CourseRecord, ExtractionPipeline, MppSettings, ResolveContext};

/// Options shared by every command that reads a syllabus.
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Syllabus text file ("-" reads stdin)
    pub file: PathBuf,
    /// Course to assign to every task (overrides [Course] tags)
    #[arg(long)]
    pub course: Option<String>,
    /// IANA timezone for due dates (default: parser.timezone)
    #[arg(long, value_parser = parse_timezone)]
    pub timezone: Option<Tz>,
    /// Year for dates without one (default: parser.reference_year, else current year)
    #[arg(long)]
    pub year: Option<i32>,
    /// First day of the semester, YYYY-MM-DD
    #[arg(long)]
    pub semester_start: Option<NaiveDate>,
    /// JSON array of known course records used to canonicalize course names
    #[arg(long)]
    pub courses: Option<PathBuf>,
}

impl DocumentArgs {
    pub fn read_text(&self) -> std::io::Result<String> {
        if self.file.as_os_str() == "-" {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            return Ok(text);
        }
        std::fs::read_to_string(&self.file)
    }

    /// Resolve context from config, with command-line flags taking precedence.
    pub fn context(&self, config: &Config) -> Result<ResolveContext, Box<dyn std::error::Error>> {
        let mut ctx = config.resolve_context(Utc::now().year())?;
        if let Some(tz) = self.timezone {
            ctx.timezone = tz;
        }
        if let Some(start) = self.semester_start {
            ctx = ctx.with_semester_start(start);
            if self.year.is_none() && config.parser.reference_year.is_none() {
                ctx.reference_year = start.year();
            }
        }
        if let Some(year) = self.year {
            ctx.reference_year = year;
        }
        tracing::debug!(
            timezone = %ctx.timezone,
            reference_year = ctx.reference_year,
            semester_start = ?ctx.semester_start,
            "resolve context"
        );
        Ok(ctx)
    }

    pub fn course_records(&self) -> Result<Vec<CourseRecord>, Box<dyn std::error::Error>> {
        match &self.courses {
            Some(path) => read_json(path),
            None => Ok(Vec::new()),
        }
    }

    pub fn course(&self) -> Option<&str> {
        self.course.as_deref()
    }
}

/// Build the extraction pipeline for a document command.
pub fn pipeline<'a>(
    args: &DocumentArgs,
    config: &Config,
    settings: &'a MppSettings,
    records: &'a [CourseRecord],
) -> Result<ExtractionPipeline<'a>, Box<dyn std::error::Error>> {
    let ctx = args.context(config)?;
    Ok(ExtractionPipeline::new(ctx, config.calculator(), settings).with_course_records(records))
}

fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|_| format!("unknown timezone '{name}' (expected an IANA name like America/Chicago)"))
}

pub fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let value = serde_json::from_str(&content)
        .map_err(|e| format!("invalid JSON in {}: {e}", path.display()))?;
    Ok(value)
}
