use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub transcription: TranscriptionConfig,
    pub summarization: SummarizationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory watched for incoming voice notes.
    pub input_dir: PathBuf,
    /// Directory holding per-file transcripts and the consolidated transcript.
    pub cache_dir: PathBuf,
    /// Directory receiving the final timestamped artifacts.
    pub output_dir: PathBuf,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Transcription service base URL.
    pub base_url: String,
    /// API key (or set VOICEBATCH_ASSEMBLYAI_KEY environment variable).
    pub api_key: String,
    /// Seconds between transcript job status polls.
    pub poll_interval_secs: u64,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl fmt::Debug for TranscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    /// Completion service base URL.
    pub base_url: String,
    /// API key (or set VOICEBATCH_OPENAI_KEY environment variable).
    pub api_key: String,
    /// Chat model used for the summary.
    pub model: String,
    /// Upper bound on the generated completion length.
    pub max_tokens: u32,
    /// Sampling temperature. Non-zero, so summaries are not bit-for-bit reproducible.
    pub temperature: f32,
    /// Custom system prompt for summarization. Leave empty to use the built-in default.
    pub system_prompt: String,
}

impl fmt::Debug for SummarizationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizationConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

// --- Default implementations ---

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            transcription: TranscriptionConfig::default(),
            summarization: SummarizationConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./incoming_audio"),
            cache_dir: PathBuf::from("./intermediate_transcripts"),
            output_dir: PathBuf::from("./output"),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.assemblyai.com".to_string(),
            api_key: String::new(),
            poll_interval_secs: 3,
            request_timeout_secs: 300,
        }
    }
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            max_tokens: 2500,
            temperature: 0.7,
            system_prompt: String::new(),
        }
    }
}

// --- Config loading ---

impl Config {
    /// Load config and return the resolved file path (if any).
    pub fn load_with_path(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        let (mut config, resolved) = Self::resolve(path)?;
        config.apply_env_overrides();
        Ok((config, resolved))
    }

    /// Load config (without tracking the resolved path).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_path(path).map(|(config, _)| config)
    }

    fn resolve(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        // 1. Check explicit path
        if let Some(p) = path {
            let content = std::fs::read_to_string(p).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", p.display(), e)
            })?;
            let config: Config = toml::from_str(&content)?;
            return Ok((config, Some(p.to_path_buf())));
        }

        // 2. Check beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let beside_exe = exe_path.parent().map(|p| p.join("voicebatch.toml"));
            if let Some(p) = beside_exe {
                if p.exists() {
                    let content = std::fs::read_to_string(&p)?;
                    let config: Config = toml::from_str(&content)?;
                    return Ok((config, Some(p)));
                }
            }
        }

        // 3. Check platform config directory (e.g. ~/.config/voicebatch/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_config = config_dir.join("voicebatch").join("config.toml");
            if platform_config.exists() {
                let content = std::fs::read_to_string(&platform_config)?;
                let config: Config = toml::from_str(&content)?;
                return Ok((config, Some(platform_config)));
            }
        }

        // 4. Fall back to defaults
        tracing::info!("No config file found, using defaults");
        Ok((Config::default(), None))
    }

    /// Directory paths may be overridden per-run through the environment.
    /// API keys are resolved at client construction instead.
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("VOICEBATCH_INPUT_DIR") {
            self.storage.input_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("VOICEBATCH_CACHE_DIR") {
            self.storage.cache_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("VOICEBATCH_OUTPUT_DIR") {
            self.storage.output_dir = PathBuf::from(dir);
        }
    }

    /// Generate a default config file with all fields and inline documentation.
    pub fn generate_default_commented() -> String {
        r#"# voicebatch configuration
# Edit this file to customize directories and service settings.

[storage]
# Directory watched for incoming voice notes (.m4a). All files in it are
# deleted after a successful run.
input_dir = "./incoming_audio"
# Directory holding per-file transcripts and the consolidated transcript.
# Cleared after a successful run. Leave it in place to resume a failed run.
cache_dir = "./intermediate_transcripts"
# Directory receiving the final timestamped transcript and summary files.
output_dir = "./output"

[transcription]
# Transcription service base URL.
base_url = "https://api.assemblyai.com"
# API key (or set VOICEBATCH_ASSEMBLYAI_KEY environment variable).
# api_key = ""
# Seconds between transcript job status polls.
poll_interval_secs = 3
# Per-request HTTP timeout in seconds. Uploads of long notes need headroom.
request_timeout_secs = 300

[summarization]
# Completion service base URL.
base_url = "https://api.openai.com"
# API key (or set VOICEBATCH_OPENAI_KEY environment variable).
# api_key = ""
# Chat model used for the summary.
model = "gpt-4o"
# Upper bound on the generated completion length.
max_tokens = 2500
# Sampling temperature.
temperature = 0.7
# Custom system prompt for the summarizer. Leave empty to use the built-in default.
# system_prompt = ""
"#
        .to_string()
    }
}
