use chrono::Utc;
use clap::Subcommand;
use syllabus_core::{course, Config};

#[derive(Subcommand)]
pub enum CourseAction {
    /// Print the normalized matching key for a course name
    Normalize {
        /// Course name (e.g. "Criminal Law")
        name: String,
    },
    /// Check whether a logged course name refers to a course
    Match {
        /// Course name as logged on a session
        session_course: String,
        /// Course title
        title: String,
        /// Course code
        #[arg(long)]
        code: Option<String>,
    },
    /// Pin a course to a fixed minutes-per-page rate
    Override {
        /// Course name
        name: String,
        /// Minutes per page (clamped to 0.5..=6.0)
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        mpp: Option<f64>,
        /// Remove the override and use the learned rate again
        #[arg(long)]
        clear: bool,
    },
}

pub fn run(action: CourseAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CourseAction::Normalize { name } => {
            println!("{}", course::normalize(&name));
        }
        CourseAction::Match {
            session_course,
            title,
            code,
        } => {
            let matched = course::matches(&session_course, &title, code.as_deref());
            println!("{matched}");
            if !matched {
                std::process::exit(1);
            }
        }
        CourseAction::Override { name, mpp, clear } => {
            if course::normalize(&name).is_empty() {
                return Err(format!("course name '{name}' has no matching key").into());
            }
            let mut config = Config::load()?;
            config.set_override(&name, if clear { None } else { mpp }, Utc::now());
            config.save()?;
            println!("ok");
        }
    }
    Ok(())
}
