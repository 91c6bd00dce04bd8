//! Upload wizard pipeline: document text to reviewed or committed drafts.
//!
//! Both entry points run the same [`ExtractionPipeline`]. In
//! [`PipelineMode::Preview`] nothing leaves the pipeline except the returned
//! payload; in [`PipelineMode::Commit`] the drafts are handed to a
//! [`TaskSink`] for bulk creation.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::classifier::classify;
use crate::dates::ResolveContext;
use crate::error::{CoreError, LineIssue, Result};
use crate::estimate::{EstimateCalculator, MppSettings};
use crate::snapshot::CourseRecord;
use crate::synthesizer::{Synthesizer, TaskDraft};

/// Storage collaborator that persists drafts in one batch.
pub trait TaskSink {
    /// Persist every draft; returns how many were created.
    fn bulk_create(&mut self, drafts: &[TaskDraft]) -> Result<usize>;
}

impl TaskSink for Vec<TaskDraft> {
    fn bulk_create(&mut self, drafts: &[TaskDraft]) -> Result<usize> {
        self.extend_from_slice(drafts);
        Ok(drafts.len())
    }
}

/// Review-only payload shown before anything is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub tasks: Vec<TaskDraft>,
    pub warnings: Vec<String>,
}

/// Caller-facing options for a preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewOptions {
    pub timezone: Tz,
    pub reference_year: i32,
    pub semester_start: Option<chrono::NaiveDate>,
}

impl PreviewOptions {
    pub fn new(timezone: Tz, reference_year: i32) -> Self {
        Self {
            timezone,
            reference_year,
            semester_start: None,
        }
    }

    pub fn resolve_context(&self) -> ResolveContext {
        let ctx = ResolveContext::new(self.reference_year, self.timezone);
        match self.semester_start {
            Some(start) => ctx.with_semester_start(start),
            None => ctx,
        }
    }
}

/// Where the drafts go once extracted.
pub enum PipelineMode<'s> {
    Preview,
    Commit(&'s mut dyn TaskSink),
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub drafts: Vec<TaskDraft>,
    pub issues: Vec<LineIssue>,
    /// Drafts accepted by the sink; zero in preview mode
    pub committed: usize,
}

impl Extraction {
    pub fn warnings(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Classifier, synthesizer and estimator wired together.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline<'a> {
    ctx: ResolveContext,
    calculator: EstimateCalculator,
    settings: &'a MppSettings,
    course_records: &'a [CourseRecord],
}

impl<'a> ExtractionPipeline<'a> {
    pub fn new(ctx: ResolveContext, calculator: EstimateCalculator, settings: &'a MppSettings) -> Self {
        Self {
            ctx,
            calculator,
            settings,
            course_records: &[],
        }
    }

    /// Canonicalize course names taken from `[Course]` tags against known
    /// course records. A course passed by the caller is never rewritten.
    pub fn with_course_records(mut self, records: &'a [CourseRecord]) -> Self {
        self.course_records = records;
        self
    }

    pub fn run(&self, text: &str, course: Option<&str>, mode: PipelineMode<'_>) -> Result<Extraction> {
        if text.trim().is_empty() {
            return Err(CoreError::ExtractionEmpty);
        }

        let synthesizer = Synthesizer::new(&self.ctx, &self.calculator, self.settings)
            .with_course_records(self.course_records);
        let mut drafts = Vec::new();
        let mut issues = Vec::new();

        for outcome in classify(text, &self.ctx) {
            match outcome.and_then(|line| synthesizer.draft(&line, course)) {
                Ok(draft) => drafts.push(draft),
                Err(issue) => issues.push(issue),
            }
        }

        let committed = match mode {
            PipelineMode::Commit(sink) if !drafts.is_empty() => sink.bulk_create(&drafts)?,
            PipelineMode::Commit(_) | PipelineMode::Preview => 0,
        };

        tracing::info!(
            drafts = drafts.len(),
            issues = issues.len(),
            committed,
            "extracted syllabus text"
        );

        Ok(Extraction {
            drafts,
            issues,
            committed,
        })
    }

    /// Preview that never fails: an empty document becomes a single
    /// `ExtractionEmpty` warning.
    pub fn build_preview(&self, text: &str, course: Option<&str>) -> Preview {
        match self.run(text, course, PipelineMode::Preview) {
            Ok(extraction) => Preview {
                warnings: extraction.warnings(),
                tasks: extraction.drafts,
            },
            Err(err) => Preview {
                tasks: Vec::new(),
                warnings: vec![err.to_string()],
            },
        }
    }

    /// Extract and hand the drafts to `sink`.
    pub fn parse_to_tasks(
        &self,
        text: &str,
        course: Option<&str>,
        sink: &mut dyn TaskSink,
    ) -> Result<Extraction> {
        self.run(text, course, PipelineMode::Commit(sink))
    }
}

/// One-shot preview with default estimate settings.
pub fn build_preview(text: &str, course: Option<&str>, options: &PreviewOptions) -> Preview {
    let settings = MppSettings::default();
    ExtractionPipeline::new(options.resolve_context(), EstimateCalculator::default(), &settings)
        .build_preview(text, course)
}
