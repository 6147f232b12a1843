use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::Config;
use crate::storage;
use crate::summarize::llm::LlmClient;
use crate::summarize::prompt;
use crate::transcribe::assemblyai::AssemblyAiBackend;
use crate::transcribe::runner::{self, CONSOLIDATED_FILENAME};

/// Format of the timestamp prefix on the final artifacts.
const RUN_STAMP_FORMAT: &str = "%Y-%m-%d-%H-%M";

/// One end-to-end run: transcribe the batch, summarize, finalize.
pub fn run_pipeline(config: &Config) -> Result<()> {
    // Both clients are built up front so a misconfigured credential
    // fails the run before any file is touched.
    let backend = AssemblyAiBackend::from_config(&config.transcription)
        .context("Failed to initialize transcription client")?;
    let llm = LlmClient::from_config(&config.summarization)
        .context("Failed to initialize LLM client")?;

    let stamp = Local::now().format(RUN_STAMP_FORMAT).to_string();

    let consolidated = runner::run_transcription(config, &backend)?;
    if consolidated.trim().is_empty() {
        tracing::info!("Nothing to summarize, leaving directories untouched");
        return Ok(());
    }

    let system = prompt::system_prompt(&config.summarization).to_string();
    let user = prompt::build_user_prompt(&consolidated);
    let summary = llm.chat(&system, &user).context("Summarization failed")?;

    let artifacts = storage::finalize_run(config, &stamp, &summary)?;

    println!("Processing complete. Files generated:");
    println!(" - Full transcription: {}", artifacts.transcript_path.display());
    println!(" - Summary and actions: {}", artifacts.summary_path.display());
    println!("Input directory and transcript cache have been cleared.");
    Ok(())
}

/// Show what a run would pick up and what previous runs produced.
pub fn show_status(config: &Config) -> Result<()> {
    let pending = runner::find_input_files(&config.storage.input_dir)?.len();
    let cached = storage::count_files(&config.storage.cache_dir, Some("txt"))?;
    let consolidated = config
        .storage
        .cache_dir
        .join(CONSOLIDATED_FILENAME)
        .exists();
    let artifacts = storage::count_files(&config.storage.output_dir, None)?;

    println!("voicebatch status:");
    println!(
        "  Input dir:  {} ({} pending)",
        config.storage.input_dir.display(),
        pending
    );
    println!(
        "  Cache dir:  {} ({} cached transcripts, consolidated: {})",
        config.storage.cache_dir.display(),
        cached,
        if consolidated { "yes" } else { "no" }
    );
    println!(
        "  Output dir: {} ({} artifacts)",
        config.storage.output_dir.display(),
        artifacts
    );
    Ok(())
}

/// Write a commented default config into the current directory.
pub fn init_config() -> Result<()> {
    let path = Path::new("voicebatch.toml");
    if path.exists() {
        anyhow::bail!("voicebatch.toml already exists in the current directory");
    }
    std::fs::write(path, Config::generate_default_commented())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
