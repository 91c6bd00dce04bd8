use clap::Args;
use syllabus_core::Config;

use super::DocumentArgs;

#[derive(Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub document: DocumentArgs,
}

pub fn run(args: PreviewArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let settings = config.mpp_settings();
    let records = args.document.course_records()?;
    let pipeline = super::pipeline(&args.document, &config, &settings, &records)?;

    let text = args.document.read_text()?;
    let preview = pipeline.build_preview(&text, args.document.course());

    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}
