//! `mender repair` — Repair a transcript file for a target provider.

use std::io::Read;
use std::path::Path;

use mender_config::AppConfig;
use mender_core::{parse_transcript, Result};
use mender_repair::TranscriptPreparer;

use super::TargetArgs;

pub fn run(
    input: &Path,
    args: &TargetArgs,
    output: Option<&Path>,
    report_only: bool,
) -> Result<()> {
    let config = AppConfig::load()?;
    let target = args.resolve(&config);

    let raw = read_input(input)?;
    let messages = parse_transcript(&raw)?;

    let preparer = TranscriptPreparer::new(config.transcript.overrides);
    let prepared = preparer.prepare(&messages, &target.api, &target.provider, &target.model);

    if config.transcript.log_repairs {
        if prepared.is_unchanged() {
            eprintln!("✅ Transcript already conformant ({} messages)", messages.len());
        } else {
            let r = &prepared.report;
            eprintln!(
                "🔧 Repaired transcript: {} → {} messages (dropped calls: {}, synthetic: {}, duplicates: {}, orphans: {}, split: {}, textified: {})",
                messages.len(),
                prepared.messages.len(),
                r.dropped_tool_calls,
                r.synthetic_results_added,
                r.dropped_duplicate_count,
                r.dropped_orphan_count,
                r.split_messages,
                r.textified,
            );
        }
    }

    let body = if report_only {
        serde_json::to_string_pretty(&prepared.report)?
    } else {
        serde_json::to_string_pretty(&*prepared.messages)?
    };

    match output {
        Some(path) => std::fs::write(path, body + "\n")?,
        None => println!("{body}"),
    }
    Ok(())
}

fn read_input(input: &Path) -> std::io::Result<String> {
    if input == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        Ok(raw)
    } else {
        std::fs::read_to_string(input)
    }
}
