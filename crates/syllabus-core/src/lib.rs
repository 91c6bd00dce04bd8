//! # Syllabus Planner Core Library
//!
//! This library turns the plain text of a course syllabus into dated,
//! time-estimated task drafts. It follows a CLI-first philosophy: every
//! operation is a pure function over caller-supplied inputs and is exposed
//! through the standalone `syllabus-cli` binary.
//!
//! ## Architecture
//!
//! - **Dates**: Recognizes month/day tokens and ranges and pins them to local
//!   midnight in a configured timezone
//! - **Classifier**: Single pass over document lines, carrying the last seen
//!   dates forward onto page-only lines
//! - **Synthesizer**: Builds titled, course-tagged drafts from classified lines
//! - **Estimate / Learner**: Minutes-per-page estimates, corrected by a scale
//!   learned from logged study sessions
//! - **Wizard**: Preview and commit entry points over one extraction pipeline
//!
//! ## Key Components
//!
//! - [`ExtractionPipeline`]: Document text to drafts and warnings
//! - [`EstimateCalculator`]: Reading-time estimates
//! - [`ScaleLearner`]: Per-course estimate correction
//! - [`CourseAttributor`]: Session to course attribution
//! - [`Config`]: Application configuration management

pub mod classifier;
pub mod config;
pub mod course;
pub mod dates;
pub mod error;
pub mod estimate;
pub mod learner;
pub mod snapshot;
pub mod synthesizer;
pub mod wizard;

pub use classifier::{classify, AssignmentLine, CarryForward, Classify, PageRef, TimeHint};
pub use config::Config;
pub use course::{find_course_record, matches, normalize, CourseAttributor, OverrideRule};
pub use dates::{resolve, scan_dates, DateForm, DateToken, MonthDay, ResolveContext, ResolvedDate};
pub use error::{ConfigError, CoreError, LineIssue, Result};
pub use estimate::{
    CourseMppProfile, EstimateCalculator, EstimateInput, EstimateResult, MppSettings,
};
pub use learner::{
    compute_course_scale, refine_profile, refine_settings, CourseScale, CourseTotals, ScaleLearner,
};
pub use snapshot::{CourseRecord, SessionSnapshot, TaskSnapshot};
pub use synthesizer::{synthesize, Synthesizer, TaskDraft};
pub use wizard::{
    build_preview, Extraction, ExtractionPipeline, PipelineMode, Preview, PreviewOptions, TaskSink,
};
