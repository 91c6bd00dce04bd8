//! Property tests over arbitrary syllabus text and snapshots.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::America::Chicago;
use proptest::prelude::*;
use syllabus_core::learner::{MAX_SCALE, MIN_SCALE};
use syllabus_core::{
    build_preview, compute_course_scale, EstimateCalculator, EstimateInput, PreviewOptions,
    SessionSnapshot, TaskSnapshot,
};

fn options() -> PreviewOptions {
    PreviewOptions::new(Chicago, 2025)
}

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
}

const COURSES: &[&str] = &["Torts", "Criminal Law", "Evidence", "Contracts"];

proptest! {
    #[test]
    fn page_range_counts_both_ends(day in 1u32..=28, a in 1u32..500, len in 0u32..200) {
        let b = a + len;
        let text = format!("Jan {day} Read pp. {a}-{b}");
        let preview = build_preview(&text, None, &options());
        prop_assert!(preview.warnings.is_empty());
        prop_assert_eq!(preview.tasks.len(), 1);
        prop_assert_eq!(preview.tasks[0].pages_read, Some(b - a + 1));
    }

    #[test]
    fn inverted_range_is_a_warning(a in 2u32..500, back in 1u32..100) {
        let b = a.saturating_sub(back).max(1);
        prop_assume!(b < a);
        let text = format!("Jan 10 Read pp. {a}-{b}");
        let preview = build_preview(&text, None, &options());
        prop_assert!(preview.tasks.is_empty());
        prop_assert_eq!(preview.warnings.len(), 1);
        prop_assert!(preview.warnings[0].contains("InvalidRange"));
    }

    #[test]
    fn arbitrary_text_never_panics(text in "\\PC{0,200}") {
        let preview = build_preview(&text, None, &options());
        // every line yields at most one task or one warning
        let lines = text.lines().count().max(1);
        prop_assert!(preview.tasks.len() + preview.warnings.len() <= lines);
    }

    #[test]
    fn preview_is_deterministic(lines in prop::collection::vec("(Jan|Feb|Mar) [0-9]{1,2} [a-z ]{0,12}(pp\\. [0-9]{1,3}-[0-9]{1,3})?", 0..8)) {
        let text = lines.join("\n");
        let first = serde_json::to_string(&build_preview(&text, Some("Torts"), &options())).unwrap();
        let second = serde_json::to_string(&build_preview(&text, Some("Torts"), &options())).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn estimate_is_deterministic(minutes in proptest::option::of(0u32..600), pages in proptest::option::of(0u32..400)) {
        let calculator = EstimateCalculator::default();
        let input = EstimateInput { explicit_minutes: minutes, pages };
        let first = calculator.estimate(&input, None);
        prop_assert_eq!(first, calculator.estimate(&input, None));
        prop_assert!(first.minutes > 0);
        prop_assert_eq!(first.guessed, minutes.unwrap_or(0) == 0 && pages.unwrap_or(0) == 0);
    }

    #[test]
    fn scale_stays_bounded(
        tasks in prop::collection::vec((0usize..4, 0u32..500), 0..10),
        sessions in prop::collection::vec((0usize..4, 0u32..600, 0i64..90), 0..20),
    ) {
        let tasks: Vec<TaskSnapshot> = tasks
            .into_iter()
            .enumerate()
            .map(|(i, (course, minutes))| TaskSnapshot {
                id: format!("t{i}"),
                title: String::new(),
                course: Some(COURSES[course].to_string()),
                estimated_minutes: Some(minutes),
            })
            .collect();
        let sessions: Vec<SessionSnapshot> = sessions
            .into_iter()
            .map(|(course, minutes, days_ago)| SessionSnapshot {
                task_id: None,
                course: Some(COURSES[course].to_string()),
                activity: None,
                notes: None,
                minutes,
                logged_at: as_of() - Duration::days(days_ago),
            })
            .collect();

        let scale = compute_course_scale(&tasks, &sessions, 60, as_of());
        for (_, factor) in scale.iter() {
            prop_assert!((MIN_SCALE..=MAX_SCALE).contains(&factor));
        }

        let mut reversed = sessions.clone();
        reversed.reverse();
        prop_assert_eq!(scale, compute_course_scale(&tasks, &reversed, 60, as_of()));
    }
}
