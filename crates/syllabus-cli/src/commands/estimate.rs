use clap::Args;
use serde::Serialize;
use syllabus_core::{Config, EstimateInput};

#[derive(Args)]
pub struct EstimateArgs {
    /// Explicit minutes (used verbatim when positive)
    #[arg(long)]
    pub minutes: Option<u32>,
    /// Number of pages to read
    #[arg(long)]
    pub pages: Option<u32>,
    /// Course whose minutes-per-page profile applies
    #[arg(long)]
    pub course: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EstimateOutput {
    minutes: u32,
    guessed: bool,
    minutes_per_page: f64,
    course_key: Option<String>,
}

pub fn run(args: EstimateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let settings = config.mpp_settings();
    let calculator = config.calculator();

    let profile = args.course.as_deref().and_then(|c| settings.profile_for(c));
    let input = EstimateInput {
        explicit_minutes: args.minutes,
        pages: args.pages,
    };
    let result = calculator.estimate(&input, profile);

    let output = EstimateOutput {
        minutes: result.minutes,
        guessed: result.guessed,
        minutes_per_page: calculator.effective_mpp(profile),
        course_key: profile.map(|p| p.course_key.clone()),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
