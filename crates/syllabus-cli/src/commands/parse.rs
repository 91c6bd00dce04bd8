use clap::Args;
use std::path::PathBuf;
use syllabus_core::{Config, CoreError, TaskDraft, TaskSink};

use super::DocumentArgs;

#[derive(Args)]
pub struct ParseArgs {
    #[command(flatten)]
    pub document: DocumentArgs,
    /// Write drafts to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Writes each batch of drafts as a JSON array.
struct JsonSink {
    out: Option<PathBuf>,
}

impl TaskSink for JsonSink {
    fn bulk_create(&mut self, drafts: &[TaskDraft]) -> syllabus_core::Result<usize> {
        let json = serde_json::to_string_pretty(drafts)?;
        match &self.out {
            Some(path) => std::fs::write(path, json).map_err(|e| {
                CoreError::storage(format!("cannot write {}", path.display()), e)
            })?,
            None => println!("{json}"),
        }
        Ok(drafts.len())
    }
}

pub fn run(args: ParseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let settings = config.mpp_settings();
    let records = args.document.course_records()?;
    let pipeline = super::pipeline(&args.document, &config, &settings, &records)?;

    let text = args.document.read_text()?;
    let mut sink = JsonSink {
        out: args.out.clone(),
    };
    let extraction = pipeline.parse_to_tasks(&text, args.document.course(), &mut sink)?;

    // The sink is skipped when nothing was extracted.
    if extraction.committed == 0 {
        match &args.out {
            Some(path) => std::fs::write(path, "[]")?,
            None => println!("[]"),
        }
    }

    for warning in extraction.warnings() {
        eprintln!("warning: {warning}");
    }
    if args.out.is_some() {
        eprintln!("Created {} task(s)", extraction.committed);
    }
    Ok(())
}
