//! Import CLI command.

use crate::config::KinshipConfig;
use crate::models::{Decision, ImportReport, PersonId};
use crate::store::FilesystemStore;
use crate::sync::{ImportOutcome, ImportPipeline, PendingImport, ProgressReporter};
use crate::{Error, Result};
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

/// Unattended conflict decision, substituting for the interactive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ApplyMode {
    /// Apply additions and updates.
    All,
    /// Apply additions only.
    New,
    /// Apply only the ids passed via `--select`.
    Selected,
    /// Abort without writing.
    Cancel,
}

/// Runs the import command.
///
/// # Errors
///
/// Returns an error for run-level failures; per-person failures are
/// reported, not raised.
pub fn cmd_import(
    config: &KinshipConfig,
    archive: &Path,
    apply: Option<ApplyMode>,
    select: &[String],
) -> Result<ImportReport> {
    let store = Arc::new(FilesystemStore::new(&config.data_dir));
    let pipeline = ImportPipeline::new(store.clone(), store, config.clone())
        .with_progress(console_progress());

    let report = match pipeline.start(archive)? {
        ImportOutcome::Completed(report) => report,
        ImportOutcome::NeedsDecision(pending) => {
            let decision = match apply {
                Some(mode) => decision_from_mode(mode, select)?,
                None => prompt_decision(&pending)?,
            };
            pipeline.resume(pending, decision)?
        },
    };

    print_report(&report);
    Ok(report)
}

fn decision_from_mode(mode: ApplyMode, select: &[String]) -> Result<Decision> {
    match mode {
        ApplyMode::All => Ok(Decision::All),
        ApplyMode::New => Ok(Decision::New),
        ApplyMode::Cancel => Ok(Decision::Cancel),
        ApplyMode::Selected => {
            if select.is_empty() {
                return Err(Error::InvalidInput(
                    "--apply selected requires --select <ids>".to_string(),
                ));
            }
            Ok(Decision::Selected(
                select.iter().map(PersonId::new).collect(),
            ))
        },
    }
}

/// Interactive fallback when no `--apply` flag was given.
fn prompt_decision(pending: &PendingImport) -> Result<Decision> {
    let diff = pending.diff();
    println!(
        "{} record(s) would be updated: {}",
        diff.to_update.len(),
        diff.summary.updated
    );
    print!("Apply [a]ll, [n]ew only, or [c]ancel? ");
    std::io::stdout()
        .flush()
        .map_err(|e| Error::op("flush_stdout", e))?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| Error::op("read_stdin", e))?;

    Ok(match line.trim().to_lowercase().as_str() {
        "n" | "new" => Decision::New,
        "c" | "cancel" => Decision::Cancel,
        _ => Decision::All,
    })
}

fn console_progress() -> ProgressReporter {
    ProgressReporter::from_fn(|event| {
        if event.total_files > 0 {
            println!(
                "[{:>5.1}%] ({}/{}) {}",
                event.percent, event.processed_files, event.total_files, event.message
            );
        } else {
            println!("{}", event.message);
        }
    })
}

fn print_report(report: &ImportReport) {
    println!("{}", report.summary());
    for error in &report.errors {
        println!("  error for {}: {}", error.person_id, error.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_from_mode() {
        assert_eq!(decision_from_mode(ApplyMode::All, &[]).unwrap(), Decision::All);
        assert_eq!(decision_from_mode(ApplyMode::New, &[]).unwrap(), Decision::New);
        assert_eq!(
            decision_from_mode(ApplyMode::Cancel, &[]).unwrap(),
            Decision::Cancel
        );
    }

    #[test]
    fn test_selected_requires_ids() {
        assert!(decision_from_mode(ApplyMode::Selected, &[]).is_err());
        assert_eq!(
            decision_from_mode(ApplyMode::Selected, &["104".to_string()]).unwrap(),
            Decision::Selected(vec![PersonId::new("104")])
        );
    }
}
