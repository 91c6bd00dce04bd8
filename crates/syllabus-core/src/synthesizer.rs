//! Turns classified lines into task drafts.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

use crate::classifier::AssignmentLine;
use crate::course::find_course_record;
use crate::dates::{resolve, ResolveContext};
use crate::error::LineIssue;
use crate::estimate::{EstimateCalculator, EstimateInput, MppSettings};
use crate::snapshot::CourseRecord;

pub const UNTITLED: &str = "Untitled reading";

static COURSE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]").expect("valid regex"));

const SEPARATORS: &[char] = &[':', ';', ',', '-', '–', '—', '|', '/', '.'];

/// An unsaved task parsed out of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub course: Option<String>,
    pub due_date: DateTime<Utc>,
    pub estimated_minutes: Option<u32>,
    pub pages_read: Option<u32>,
    pub source_line_index: usize,
    /// The estimate is the low-confidence fallback
    #[serde(default)]
    pub guessed: bool,
}

/// Builds drafts with a fixed resolve context and estimate settings.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
    ctx: &'a ResolveContext,
    calculator: &'a EstimateCalculator,
    settings: &'a MppSettings,
    course_records: &'a [CourseRecord],
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        ctx: &'a ResolveContext,
        calculator: &'a EstimateCalculator,
        settings: &'a MppSettings,
    ) -> Self {
        Self {
            ctx,
            calculator,
            settings,
            course_records: &[],
        }
    }

    /// Known courses used to canonicalize names taken from `[Course]` tags.
    pub fn with_course_records(mut self, records: &'a [CourseRecord]) -> Self {
        self.course_records = records;
        self
    }

    /// Draft for one line. `course`, when given and non-blank, replaces any
    /// `[Course]` tag found on the line and is used exactly as given. A tag
    /// name is replaced by the title of the course record it matches.
    pub fn draft(&self, line: &AssignmentLine, course: Option<&str>) -> Result<TaskDraft, LineIssue> {
        let due_date = line
            .date_tokens
            .iter()
            .filter_map(|token| resolve(token, self.ctx))
            .map(|resolved| resolved.due())
            .max()
            .ok_or_else(|| LineIssue::UnresolvableDate {
                line_index: line.line_index,
                token: line
                    .date_tokens
                    .first()
                    .map(|t| t.text.clone())
                    .unwrap_or_default(),
            })?;

        let tag = COURSE_TAG.captures(&line.raw_text).and_then(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().trim();
            (!name.is_empty()).then(|| (whole.range(), name.to_string()))
        });

        let mut spans = line.token_spans();
        if let Some((span, _)) = &tag {
            spans.push(span.clone());
        }
        let title = strip_title(&line.raw_text, &spans);

        let course = match course.map(str::trim).filter(|c| !c.is_empty()) {
            Some(explicit) => Some(explicit.to_string()),
            None => tag.map(|(_, name)| self.canonical_course(name)),
        };

        let profile = course.as_deref().and_then(|c| self.settings.profile_for(c));
        let input = EstimateInput {
            explicit_minutes: line.explicit_minutes(),
            pages: line.page_count,
        };
        let estimate = self.calculator.estimate(&input, profile);

        Ok(TaskDraft {
            title,
            course,
            due_date,
            estimated_minutes: Some(estimate.minutes),
            pages_read: line.page_count,
            source_line_index: line.line_index,
            guessed: estimate.guessed,
        })
    }

    fn canonical_course(&self, name: String) -> String {
        match find_course_record(self.course_records, &name) {
            Some(record) => record.title.clone(),
            None => name,
        }
    }

    /// Drafts in source order. Lines whose dates no longer resolve are
    /// skipped; use [`Synthesizer::draft`] to see why.
    pub fn synthesize<I>(&self, lines: I, course: Option<&str>) -> Vec<TaskDraft>
    where
        I: IntoIterator<Item = AssignmentLine>,
    {
        lines
            .into_iter()
            .filter_map(|line| match self.draft(&line, course) {
                Ok(draft) => Some(draft),
                Err(issue) => {
                    tracing::debug!(%issue, "skipping line without a due date");
                    None
                }
            })
            .collect()
    }
}

/// Convenience wrapper over [`Synthesizer::synthesize`].
pub fn synthesize<I>(
    lines: I,
    course: Option<&str>,
    ctx: &ResolveContext,
    calculator: &EstimateCalculator,
    settings: &MppSettings,
) -> Vec<TaskDraft>
where
    I: IntoIterator<Item = AssignmentLine>,
{
    Synthesizer::new(ctx, calculator, settings).synthesize(lines, course)
}

/// Remove token spans from `text` and tidy what is left.
fn strip_title(text: &str, spans: &[Range<usize>]) -> String {
    let mut kept = String::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        if spans.iter().any(|s| s.contains(&idx)) {
            kept.push(' ');
        } else {
            kept.push(ch);
        }
    }

    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    let tidied = collapsed
        .replace(" ,", ",")
        .replace(" ;", ";")
        .replace(" :", ":")
        .replace("()", "");
    let title = tidied
        .trim_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}
