use clap::Subcommand;
use syllabus_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting
    Get {
        /// Dotted key, e.g. "parser.timezone" or "courses.torts.minutes_per_page"
        key: String,
    },
    /// Change one setting (validated before saving)
    Set {
        key: String,
        value: String,
    },
    /// Print the whole config, course profiles included, as JSON
    List,
    /// Print the config file location
    Path,
    /// Restore parser, estimation and learner defaults
    Reset {
        /// Keep learned and overridden course profiles
        #[arg(long)]
        keep_courses: bool,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown config key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            Config::load()?.set(&key, &value)?;
            tracing::info!(%key, %value, "config updated");
            println!("ok");
        }
        ConfigAction::List => {
            println!("{}", serde_json::to_string_pretty(&Config::load()?)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Reset { keep_courses } => {
            let mut config = Config::default();
            if keep_courses {
                config.courses = Config::load()?.courses;
            }
            config.save()?;
            println!(
                "config reset to defaults ({} course profile(s) kept)",
                config.courses.len()
            );
        }
    }
    Ok(())
}
