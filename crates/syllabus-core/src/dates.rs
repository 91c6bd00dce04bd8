//! Date and date-range tokens found in syllabus text.
//!
//! Tokens are scanned out of a line with their byte spans, then resolved to
//! concrete instants against a [`ResolveContext`]. Resolution is always done at
//! local midnight in the context's timezone and handed back as UTC, so the
//! host timezone never leaks into a due date.
//!
//! Supported forms:
//! - `MM/DD`, `MM/DD/YY`, `MM/DD/YYYY`
//! - `Month D`, `Month D, YYYY` (full or abbreviated month, optional ordinal)
//! - ranges: `Month D1-D2`, `Month D1 - Month D2`, `MM/DD-MM/DD`

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";
const DAY: &str = r"(\d{1,2})(?:st|nd|rd|th)?";

static NAMED_SPAN_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTH}\s+{DAY}\s*[-–]\s*{MONTH}\s+{DAY}(?:,?\s+(\d{{4}}))?\b"
    ))
    .expect("valid regex")
});

static NAMED_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTH}\s+{DAY}\s*[-–]\s*{DAY}(?:,?\s+(\d{{4}}))?\b"
    ))
    .expect("valid regex")
});

static NUMERIC_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})\s*[-–]\s*(\d{1,2})/(\d{1,2})\b").expect("valid regex")
});

static NAMED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{MONTH}\s+{DAY}(?:,?\s+(\d{{4}}))?\b")).expect("valid regex")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").expect("valid regex")
});

/// Month and day as written, with the year only when the text carried one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
    pub year: Option<i32>,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Self {
        Self { month, day, year: None }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

/// Shape of a date token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateForm {
    Single(MonthDay),
    Range { start: MonthDay, end: MonthDay },
}

/// A date-like token found in a line of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateToken {
    /// The matched text, verbatim
    pub text: String,
    /// Byte span of `text` inside the scanned line
    pub span: Range<usize>,
    pub form: DateForm,
}

/// Inputs that turn a month/day into an instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveContext {
    /// Year used when the token has none and no semester start is known
    pub reference_year: i32,
    pub timezone: Tz,
    /// Year-less dates resolve to the nearest occurrence on/after this day
    pub semester_start: Option<NaiveDate>,
}

impl ResolveContext {
    pub fn new(reference_year: i32, timezone: Tz) -> Self {
        Self {
            reference_year,
            timezone,
            semester_start: None,
        }
    }

    pub fn with_semester_start(mut self, start: NaiveDate) -> Self {
        self.semester_start = Some(start);
        self
    }
}

/// Boundary instants of a resolved token. A single date has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDate {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ResolvedDate {
    /// Binding due date: work is due by the end of a range.
    pub fn due(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn is_range(&self) -> bool {
        self.start != self.end
    }
}

/// Find every date token in `line`, ordered by position.
///
/// Ranges win over the single dates they contain, named forms over numeric.
pub fn scan_dates(line: &str) -> Vec<DateToken> {
    type Builder = fn(&Captures<'_>) -> Option<DateForm>;
    let passes: [(&Regex, Builder); 5] = [
        (&*NAMED_SPAN_RANGE, named_span_range as Builder),
        (&*NAMED_RANGE, named_range),
        (&*NUMERIC_RANGE, numeric_range),
        (&*NAMED_DATE, named_date),
        (&*NUMERIC_DATE, numeric_date),
    ];

    let mut tokens: Vec<DateToken> = Vec::new();
    for (pattern, build) in passes {
        for caps in pattern.captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            let span = whole.range();
            if tokens.iter().any(|t| overlaps(&t.span, &span)) {
                continue;
            }
            if let Some(form) = build(&caps) {
                tokens.push(DateToken {
                    text: whole.as_str().to_string(),
                    span,
                    form,
                });
            }
        }
    }
    tokens.sort_by_key(|t| t.span.start);
    tokens
}

/// Parse a standalone token such as `"Jan 10"` or `"3/4-3/8"`.
///
/// Returns `None` unless one token covers the whole (trimmed) input.
pub fn parse_token(text: &str) -> Option<DateToken> {
    let trimmed = text.trim();
    let mut tokens = scan_dates(trimmed);
    if tokens.len() != 1 || tokens[0].span != (0..trimmed.len()) {
        return None;
    }
    tokens.pop()
}

/// Resolve a token to boundary instants.
///
/// Returns `None` for dates that do not exist in the inferred year and for
/// same-month ranges whose end precedes their start.
pub fn resolve(token: &DateToken, ctx: &ResolveContext) -> Option<ResolvedDate> {
    resolve_form(&token.form, ctx)
}

pub fn resolve_form(form: &DateForm, ctx: &ResolveContext) -> Option<ResolvedDate> {
    match form {
        DateForm::Single(md) => {
            let date = infer_date(md, ctx)?;
            let instant = local_midnight(date, ctx.timezone)?;
            Some(ResolvedDate {
                start: instant,
                end: instant,
            })
        }
        DateForm::Range { start, end } => {
            let first = infer_date(start, ctx)?;
            let mut last = match end.year {
                Some(year) => NaiveDate::from_ymd_opt(year, end.month, end.day)?,
                None => NaiveDate::from_ymd_opt(first.year(), end.month, end.day)?,
            };
            if last < first {
                // "Dec 28 - Jan 3" crosses a year; "Jan 12-10" is just wrong.
                if end.year.is_some() || end.month == start.month {
                    return None;
                }
                last = NaiveDate::from_ymd_opt(first.year() + 1, end.month, end.day)?;
            }
            Some(ResolvedDate {
                start: local_midnight(first, ctx.timezone)?,
                end: local_midnight(last, ctx.timezone)?,
            })
        }
    }
}

fn infer_date(md: &MonthDay, ctx: &ResolveContext) -> Option<NaiveDate> {
    if let Some(year) = md.year {
        return NaiveDate::from_ymd_opt(year, md.month, md.day);
    }
    let Some(semester_start) = ctx.semester_start else {
        return NaiveDate::from_ymd_opt(ctx.reference_year, md.month, md.day);
    };

    let earliest = semester_start - Duration::days(1);
    let this_year = NaiveDate::from_ymd_opt(semester_start.year(), md.month, md.day);
    match this_year {
        Some(date) if date >= earliest => Some(date),
        _ => NaiveDate::from_ymd_opt(semester_start.year() + 1, md.month, md.day)
            .filter(|date| *date >= earliest),
    }
}

/// Local midnight of `date` in `tz`, as UTC. Days that skip midnight
/// (DST gaps) use the first hour that exists.
fn local_midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    (0..3).find_map(|hour| {
        let naive = date.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn number(caps: &Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx)?.as_str().parse().ok()
}

fn year(caps: &Captures<'_>, idx: usize) -> Option<i32> {
    let raw = caps.get(idx)?.as_str();
    let value: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + value } else { value })
}

fn month_day(month: u32, day: u32, year: Option<i32>) -> Option<MonthDay> {
    // Day validity is checked at resolution, where the year is known.
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(MonthDay { month, day, year })
}

fn named_span_range(caps: &Captures<'_>) -> Option<DateForm> {
    let (m1, d1) = (month_number(&caps[1])?, number(caps, 2)?);
    let (m2, d2) = (month_number(&caps[3])?, number(caps, 4)?);
    let end_year = year(caps, 5);
    // a trailing year belongs to the end; "Dec 28 - Jan 3, 2026" starts the year before
    let start_year = end_year.map(|y| if (m2, d2) < (m1, d1) { y - 1 } else { y });
    Some(DateForm::Range {
        start: month_day(m1, d1, start_year)?,
        end: month_day(m2, d2, end_year)?,
    })
}

fn named_range(caps: &Captures<'_>) -> Option<DateForm> {
    let month = month_number(&caps[1])?;
    let y = year(caps, 4);
    Some(DateForm::Range {
        start: month_day(month, number(caps, 2)?, y)?,
        end: month_day(month, number(caps, 3)?, y)?,
    })
}

fn numeric_range(caps: &Captures<'_>) -> Option<DateForm> {
    Some(DateForm::Range {
        start: month_day(number(caps, 1)?, number(caps, 2)?, None)?,
        end: month_day(number(caps, 3)?, number(caps, 4)?, None)?,
    })
}

fn named_date(caps: &Captures<'_>) -> Option<DateForm> {
    let md = month_day(month_number(&caps[1])?, number(caps, 2)?, year(caps, 3))?;
    Some(DateForm::Single(md))
}

fn numeric_date(caps: &Captures<'_>) -> Option<DateForm> {
    let md = month_day(number(caps, 1)?, number(caps, 2)?, year(caps, 3))?;
    Some(DateForm::Single(md))
}
