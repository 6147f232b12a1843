use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "voicebatch",
    version,
    about = "Batch voice-note transcription and AI summarization pipeline"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process the input directory end-to-end (default if no subcommand)
    Run,

    /// Show pending files, cached transcripts, and output artifacts
    Status,

    /// Write a commented default voicebatch.toml to the current directory
    Init,
}
