use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::transcribe::runner::CONSOLIDATED_FILENAME;

/// Paths of the two artifacts a successful run leaves behind.
#[derive(Debug)]
pub struct RunArtifacts {
    pub transcript_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Persist the final artifacts and clear the working state.
///
/// Runs only after the summarizer succeeded. This step is destructive
/// and not idempotent: it deletes the source voice notes and every
/// cached transcript. A failure partway through leaves the directories
/// in an intermediate state with no recovery procedure.
pub fn finalize_run(config: &Config, stamp: &str, summary: &str) -> Result<RunArtifacts> {
    let output_dir = &config.storage.output_dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let summary_path = output_dir.join(format!("{stamp}-summary_action.md"));
    std::fs::write(&summary_path, summary)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;

    let consolidated_path = config.storage.cache_dir.join(CONSOLIDATED_FILENAME);
    let transcript_path = output_dir.join(format!("{stamp}-transcripts.md"));
    move_file(&consolidated_path, &transcript_path).with_context(|| {
        format!(
            "failed to move {} to {}",
            consolidated_path.display(),
            transcript_path.display()
        )
    })?;

    let cleared_inputs = clear_dir_files(&config.storage.input_dir)?;
    let cleared_cache = clear_dir_files(&config.storage.cache_dir)?;
    tracing::info!(
        "Cleared {} input files and {} cache files",
        cleared_inputs,
        cleared_cache
    );

    Ok(RunArtifacts {
        transcript_path,
        summary_path,
    })
}

/// Rename, falling back to copy-and-delete when the rename crosses a
/// filesystem boundary.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
    }
}

/// Delete every regular file directly inside `dir`. Subdirectories are
/// untouched. Returns the number of files removed.
pub fn clear_dir_files(dir: &Path) -> Result<usize> {
    let mut removed = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())
                .with_context(|| format!("failed to delete {}", entry.path().display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Count regular files directly inside `dir`, optionally filtered by
/// extension.
pub fn count_files(dir: &Path, extension: Option<&str>) -> Result<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match extension {
            Some(ext) => {
                if entry.path().extension().map(|e| e == ext).unwrap_or(false) {
                    count += 1;
                }
            }
            None => count += 1,
        }
    }
    Ok(count)
}
