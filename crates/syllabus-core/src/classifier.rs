//! Line classifier: raw syllabus text to candidate assignment lines.
//!
//! Each non-blank line is scanned for page references, time hints and date
//! tokens. A line is a candidate when it has a resolvable date or a page
//! reference. Lines with page references but no date of their own inherit the
//! most recent date seen on an earlier line; that "last date" is threaded
//! through the scan as an explicit [`CarryForward`] value, so
//! [`CarryForward::step`] can classify any line in isolation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::iter::Enumerate;
use std::ops::Range;
use std::str::Lines;
use std::sync::LazyLock;

use crate::dates::{resolve, scan_dates, DateToken, ResolveContext};
use crate::error::LineIssue;

static PAGE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpp?\.\s*(\d+)(?:\s*[-–]\s*(\d+))?").expect("valid regex")
});

/// Further ranges after a `pp.` reference: `pp. 10-15, 20-25`.
static PAGE_CONTINUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*,\s*(\d+)(?:\s*[-–]\s*(\d+))?\b(\s+(?:pages?|minutes?|mins?|hours?|hrs?)\b)?")
        .expect("valid regex")
});

static PAGE_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s+pages?\b").expect("valid regex"));

static TIME_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(?\b(\d+(?:\.\d+)?)\s*(minutes?|mins?|hours?|hrs?)\b\.?\)?")
        .expect("valid regex")
});

/// A page reference: `pp. 12-40`, `p. 7`, or `25 pages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub text: String,
    pub span: Range<usize>,
    pub start: u32,
    /// Last page of a hyphenated range
    pub end: Option<u32>,
}

impl PageRef {
    /// Pages covered. A range counts both ends; a bare number counts as
    /// written. `None` when the range runs backwards.
    pub fn count(&self) -> Option<u32> {
        match self.end {
            Some(end) if end < self.start => None,
            Some(end) => Some((end - self.start).saturating_add(1)),
            None => Some(self.start),
        }
    }
}

/// An explicit time budget written on the line, e.g. `(45 min)` or `1.5 hrs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeHint {
    pub text: String,
    pub span: Range<usize>,
    pub minutes: u32,
}

/// A classified candidate line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentLine {
    /// The line, trimmed; every span below indexes into it
    pub raw_text: String,
    pub line_index: usize,
    /// Own tokens, or the inherited ones when `inherited_date` is set
    pub date_tokens: Vec<DateToken>,
    /// Sum over `page_refs`, absent when the line has none
    pub page_count: Option<u32>,
    pub inherited_date: bool,
    pub page_refs: Vec<PageRef>,
    pub time_hints: Vec<TimeHint>,
}

impl AssignmentLine {
    pub fn explicit_minutes(&self) -> Option<u32> {
        if self.time_hints.is_empty() {
            return None;
        }
        Some(
            self.time_hints
                .iter()
                .fold(0u32, |acc, hint| acc.saturating_add(hint.minutes)),
        )
    }

    /// Spans of every recognised token that belongs to this line's own text.
    pub fn token_spans(&self) -> Vec<Range<usize>> {
        let mut spans: Vec<Range<usize>> = self
            .page_refs
            .iter()
            .map(|p| p.span.clone())
            .chain(self.time_hints.iter().map(|h| h.span.clone()))
            .collect();
        if !self.inherited_date {
            spans.extend(self.date_tokens.iter().map(|t| t.span.clone()));
        }
        spans.sort_by_key(|s| s.start);
        spans
    }
}

/// Running state of the scan: the dates of the last dated line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarryForward {
    last_dates: Option<Vec<DateToken>>,
}

impl CarryForward {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known date, as if a dated line had just been read.
    pub fn seeded(dates: Vec<DateToken>) -> Self {
        Self {
            last_dates: Some(dates).filter(|d| !d.is_empty()),
        }
    }

    pub fn last_dates(&self) -> Option<&[DateToken]> {
        self.last_dates.as_deref()
    }

    /// Classify one line against this accumulator.
    ///
    /// Returns the accumulator for the next line and the outcome for this
    /// one: `None` for lines that are not candidates, `Some(Err(_))` for
    /// lines dropped with an issue. Dropped lines never update the
    /// accumulator.
    pub fn step(
        self,
        line_index: usize,
        line: &str,
        ctx: &ResolveContext,
    ) -> (CarryForward, Option<Result<AssignmentLine, LineIssue>>) {
        let text = line.trim();
        if text.is_empty() {
            return (self, None);
        }

        let scan = scan_line(text);

        if let Some(bad) = scan.page_refs.iter().find(|p| p.count().is_none()) {
            let issue = LineIssue::InvalidRange {
                line_index,
                text: bad.text.clone(),
            };
            return (self, Some(Err(issue)));
        }

        if let Some(bad) = scan.dates.iter().find(|t| resolve(t, ctx).is_none()) {
            let issue = LineIssue::UnresolvableDate {
                line_index,
                token: bad.text.clone(),
            };
            return (self, Some(Err(issue)));
        }

        if scan.dates.is_empty() && scan.page_refs.is_empty() {
            return (self, None);
        }

        let page_count = if scan.page_refs.is_empty() {
            None
        } else {
            Some(
                scan.page_refs
                    .iter()
                    .filter_map(PageRef::count)
                    .fold(0u32, u32::saturating_add),
            )
        };

        let (next, date_tokens, inherited_date) = if scan.dates.is_empty() {
            match self.last_dates.clone() {
                Some(dates) => (self, dates, true),
                None => return (self, Some(Err(LineIssue::MissingDate { line_index }))),
            }
        } else {
            (CarryForward::seeded(scan.dates.clone()), scan.dates, false)
        };

        let line = AssignmentLine {
            raw_text: text.to_string(),
            line_index,
            date_tokens,
            page_count,
            inherited_date,
            page_refs: scan.page_refs,
            time_hints: scan.time_hints,
        };
        (next, Some(Ok(line)))
    }
}

/// Single-pass iterator over the candidate lines of a document.
#[derive(Debug)]
pub struct Classify<'a> {
    lines: Enumerate<Lines<'a>>,
    carry: CarryForward,
    ctx: ResolveContext,
}

/// Classify `text` line by line.
pub fn classify<'a>(text: &'a str, ctx: &ResolveContext) -> Classify<'a> {
    Classify {
        lines: text.lines().enumerate(),
        carry: CarryForward::new(),
        ctx: *ctx,
    }
}

impl Iterator for Classify<'_> {
    type Item = Result<AssignmentLine, LineIssue>;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, line) in self.lines.by_ref() {
            let carry = std::mem::take(&mut self.carry);
            let (next, outcome) = carry.step(index, line, &self.ctx);
            self.carry = next;
            match outcome {
                Some(Err(issue)) => {
                    tracing::debug!(%issue, "dropping line");
                    return Some(Err(issue));
                }
                Some(ok) => return Some(ok),
                None => continue,
            }
        }
        None
    }
}

struct LineScan {
    page_refs: Vec<PageRef>,
    time_hints: Vec<TimeHint>,
    dates: Vec<DateToken>,
}

/// Comma-separated ranges following a page reference that ends at `from`.
/// A bare number here is a single page; a number followed by `pages` or a
/// time unit ends the list.
fn continued_ranges(text: &str, mut from: usize) -> Vec<PageRef> {
    let mut refs = Vec::new();
    while let Some(caps) = PAGE_CONTINUATION.captures(&text[from..]) {
        let Some(whole) = caps.get(0) else { break };
        if caps.get(3).is_some() {
            break;
        }
        let Some(start) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
            break;
        };
        let end = match caps.get(2) {
            Some(m) => match m.as_str().parse().ok() {
                Some(end) => end,
                None => break,
            },
            None => start,
        };
        let span = from + whole.start()..from + whole.end();
        refs.push(PageRef {
            text: whole.as_str().trim().to_string(),
            span: span.clone(),
            start,
            end: Some(end),
        });
        from = span.end;
    }
    refs
}

fn scan_line(text: &str) -> LineScan {
    let mut page_refs: Vec<PageRef> = Vec::new();
    for caps in PAGE_REF.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(start) = caps.get(1).and_then(|m| m.as_str().parse().ok()) else {
            continue;
        };
        let end = match caps.get(2) {
            Some(m) => match m.as_str().parse().ok() {
                Some(end) => Some(end),
                None => continue,
            },
            None => None,
        };
        page_refs.push(PageRef {
            text: whole.as_str().to_string(),
            span: whole.range(),
            start,
            end,
        });
        page_refs.extend(continued_ranges(text, whole.end()));
    }
    for caps in PAGE_PHRASE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if page_refs.iter().any(|p| overlaps(&p.span, &whole.range())) {
            continue;
        }
        let Some(start) = caps.get(1).and_then(|m| m.as_str().parse().ok()) else {
            continue;
        };
        page_refs.push(PageRef {
            text: whole.as_str().to_string(),
            span: whole.range(),
            start,
            end: None,
        });
    }
    page_refs.sort_by_key(|p| p.span.start);
    page_refs.dedup_by(|later, earlier| overlaps(&earlier.span, &later.span));

    let mut time_hints: Vec<TimeHint> = Vec::new();
    for caps in TIME_HINT.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if page_refs.iter().any(|p| overlaps(&p.span, &whole.range())) {
            continue;
        }
        let Some(amount) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) else {
            continue;
        };
        let unit = caps.get(2).map(|m| m.as_str().to_ascii_lowercase()).unwrap_or_default();
        let minutes = if unit.starts_with('h') { amount * 60.0 } else { amount };
        time_hints.push(TimeHint {
            text: whole.as_str().to_string(),
            span: whole.range(),
            minutes: minutes.round().min(f64::from(u32::MAX)) as u32,
        });
    }

    // Blank out pages and time hints so "pp. 1-20" or "1/2 hr" never read as dates.
    let masked_spans: Vec<Range<usize>> = page_refs
        .iter()
        .map(|p| p.span.clone())
        .chain(time_hints.iter().map(|h| h.span.clone()))
        .collect();
    let masked = mask(text, &masked_spans);
    let dates = scan_dates(&masked);

    LineScan {
        page_refs,
        time_hints,
        dates,
    }
}

/// Replace the given byte spans with spaces, keeping every offset stable.
fn mask(text: &str, spans: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        if spans.iter().any(|s| s.contains(&idx)) {
            out.extend(std::iter::repeat(' ').take(ch.len_utf8()));
        } else {
            out.push(ch);
        }
    }
    out
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{DateForm, MonthDay};
    use chrono_tz::America::Chicago;

    fn ctx() -> ResolveContext {
        ResolveContext::new(2025, Chicago)
    }

    fn lines(text: &str) -> Vec<Result<AssignmentLine, LineIssue>> {
        classify(text, &ctx()).collect()
    }

    #[test]
    fn dated_page_range_line() {
        let out = lines("Jan 10: Read pp. 1-20");
        assert_eq!(out.len(), 1);
        let line = out[0].as_ref().unwrap();
        assert_eq!(line.page_count, Some(20));
        assert!(!line.inherited_date);
        assert_eq!(line.date_tokens[0].form, DateForm::Single(MonthDay::new(1, 10)));
        assert_eq!(line.token_spans(), vec![0..6, 13..21]);
    }

    #[test]
    fn multiple_page_refs_are_summed() {
        let out = lines("Jan 12 Casebook pp. 10-19 and supplement p. 5, plus 12 pages of notes");
        let line = out[0].as_ref().unwrap();
        assert_eq!(line.page_refs.len(), 3);
        assert_eq!(line.page_count, Some(10 + 5 + 12));
    }

    #[test]
    fn comma_separated_ranges_after_pp_are_summed() {
        let out = lines("Jan 10 Read pp. 10-15, 20-25");
        let line = out[0].as_ref().unwrap();
        assert_eq!(line.page_refs.len(), 2);
        assert_eq!(line.page_refs[1].text, ", 20-25");
        assert_eq!(line.page_count, Some(12));

        let out = lines("Jan 11 Cases pp. 3-4, 9, 12-13, plus 5 pages of notes");
        let line = out[0].as_ref().unwrap();
        assert_eq!(line.page_count, Some(2 + 1 + 2 + 5));

        // "10 pages" is its own phrase, not a continuation of p. 5
        let out = lines("Jan 12 Read p. 5, 10 pages");
        let line = out[0].as_ref().unwrap();
        assert_eq!(line.page_count, Some(5 + 10));

        let out = lines("Jan 13 Read pp. 1-4, 45 min");
        let line = out[0].as_ref().unwrap();
        assert_eq!(line.page_count, Some(4));
        assert_eq!(line.time_hints[0].minutes, 45);
    }

    #[test]
    fn inverted_range_is_an_issue() {
        let out = lines("Jan 10 Read pp. 30-10");
        assert_eq!(
            out,
            vec![Err(LineIssue::InvalidRange {
                line_index: 0,
                text: "pp. 30-10".to_string()
            })]
        );
    }

    #[test]
    fn unresolvable_date_is_an_issue() {
        let out = lines("Feb 30 Read pp. 1-2");
        assert!(matches!(
            out[0],
            Err(LineIssue::UnresolvableDate { line_index: 0, ref token }) if token == "Feb 30"
        ));
    }

    #[test]
    fn carry_forward_inherits_last_date() {
        let text = "Week 1\nJan 10 Intro\n\npp. 1-5\nSupplement pp. 6-8\nJan 14 pp. 9-10\npp. 11-12";
        let out: Vec<AssignmentLine> = lines(text).into_iter().map(Result::unwrap).collect();
        assert_eq!(out.len(), 5);
        assert_eq!(out[0].line_index, 1);
        assert_eq!(out[0].page_count, None);

        assert!(out[1].inherited_date);
        assert_eq!(out[1].line_index, 3);
        assert_eq!(out[1].date_tokens[0].text, "Jan 10");
        assert!(out[2].inherited_date);

        assert!(!out[3].inherited_date);
        assert_eq!(out[4].date_tokens[0].text, "Jan 14");
        // inherited spans belong to another line and are never stripped
        assert_eq!(out[4].token_spans(), vec![0..9]);
    }

    #[test]
    fn page_line_without_any_prior_date() {
        let out = lines("Read pp. 1-5");
        assert_eq!(out, vec![Err(LineIssue::MissingDate { line_index: 0 })]);
    }

    #[test]
    fn step_is_testable_in_isolation() {
        let seed = classify("Mar 3 Intro", &ctx()).next().unwrap().unwrap().date_tokens;
        let carry = CarryForward::seeded(seed);
        let (next, outcome) = carry.clone().step(7, "  pp. 4-6  ", &ctx());
        let line = outcome.unwrap().unwrap();
        assert_eq!(line.raw_text, "pp. 4-6");
        assert_eq!(line.line_index, 7);
        assert!(line.inherited_date);
        assert_eq!(next, carry);

        let (unchanged, none) = next.step(8, "no tokens here", &ctx());
        assert!(none.is_none());
        assert_eq!(unchanged, carry);
    }

    #[test]
    fn time_hints_are_captured_and_not_dates() {
        let out = lines("Jan 10 Memo draft (90 min)\nJan 11 Outline 1.5 hrs");
        let first = out[0].as_ref().unwrap();
        assert_eq!(first.explicit_minutes(), Some(90));
        assert_eq!(first.page_count, None);
        let second = out[1].as_ref().unwrap();
        assert_eq!(second.explicit_minutes(), Some(90));
    }

    #[test]
    fn non_candidate_lines_are_skipped() {
        let out = lines("Course policies\n\nAttendance is required.\n   \n");
        assert!(out.is_empty());
    }

    #[test]
    fn dropped_lines_do_not_feed_carry_forward() {
        let out = lines("Jan 10 Intro\nFeb 30 pp. 1-2\npp. 3-4");
        assert!(out[1].is_err());
        let last = out[2].as_ref().unwrap();
        assert_eq!(last.date_tokens[0].text, "Jan 10");
    }
}
