use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use voicebatch::config::Config;
use voicebatch::storage;
use voicebatch::transcribe::backend::{TranscriptionBackend, TranscriptionError};
use voicebatch::transcribe::cache::{FsTranscriptStore, TranscriptStore};
use voicebatch::transcribe::runner::{self, CONSOLIDATED_FILENAME};

/// Test double for the hosted transcription service. Counts invocations
/// and derives deterministic text from the audio filename.
struct MockBackend {
    calls: AtomicUsize,
    fail_stem: Option<&'static str>,
}

impl MockBackend {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_stem: None,
        }
    }

    fn failing_on(stem: &'static str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_stem: Some(stem),
        }
    }
}

impl TranscriptionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.fail_stem == Some(stem.as_str()) {
            return Err(TranscriptionError::JobFailed("service outage".to_string()));
        }
        Ok(format!("transcript of {stem}"))
    }
}

/// WAV content under an `.m4a` name: the normalizer probes by content,
/// so these decode without shipping binary fixtures.
fn create_voice_note(dir: &Path, name: &str) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(dir.join(name), spec).unwrap();
    for i in 0..1600 {
        writer.write_sample((i % 90) as i16 * 30).unwrap();
    }
    writer.finalize().unwrap();
}

fn test_config(tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.input_dir = tmp.path().join("incoming_audio");
    config.storage.cache_dir = tmp.path().join("intermediate_transcripts");
    config.storage.output_dir = tmp.path().join("output");
    std::fs::create_dir_all(&config.storage.input_dir).unwrap();
    config
}

#[test]
fn test_full_batch_consolidates_in_submission_order() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    for name in ["gamma.m4a", "alpha.m4a", "beta.m4a"] {
        create_voice_note(&config.storage.input_dir, name);
    }

    let backend = MockBackend::new();
    let combined = runner::run_transcription(&config, &backend).unwrap();

    // Filename-sorted submission order, one blank line between entries.
    assert_eq!(
        combined,
        "transcript of alpha\n\ntranscript of beta\n\ntranscript of gamma"
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);

    // Per-file cache entries and the consolidated artifact were persisted.
    let store = FsTranscriptStore::new(config.storage.cache_dir.clone());
    for key in ["alpha.m4a", "beta.m4a", "gamma.m4a"] {
        assert!(store.has(key), "missing cache entry for {key}");
    }
    assert_eq!(
        std::fs::read_to_string(config.storage.cache_dir.join(CONSOLIDATED_FILENAME)).unwrap(),
        combined
    );

    // Intermediate WAVs were removed; the inputs are untouched.
    assert_eq!(
        storage::count_files(&config.storage.input_dir, Some("wav")).unwrap(),
        0
    );
    assert_eq!(
        storage::count_files(&config.storage.input_dir, Some("m4a")).unwrap(),
        3
    );
}

#[test]
fn test_rerun_is_idempotent_without_backend_calls() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    for name in ["one.m4a", "two.m4a"] {
        create_voice_note(&config.storage.input_dir, name);
    }

    let first = MockBackend::new();
    let combined_first = runner::run_transcription(&config, &first).unwrap();
    assert_eq!(first.calls.load(Ordering::SeqCst), 2);

    let second = MockBackend::new();
    let combined_second = runner::run_transcription(&config, &second).unwrap();

    assert_eq!(combined_second, combined_first);
    assert_eq!(
        second.calls.load(Ordering::SeqCst),
        0,
        "a rerun over an unchanged working directory must not hit the service"
    );
}

#[test]
fn test_existing_consolidated_artifact_skips_enumeration() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    std::fs::create_dir_all(&config.storage.cache_dir).unwrap();
    std::fs::write(
        config.storage.cache_dir.join(CONSOLIDATED_FILENAME),
        "artifact from an interrupted run",
    )
    .unwrap();
    // Undecodable input would fail the pipeline if it were enumerated.
    std::fs::write(config.storage.input_dir.join("junk.m4a"), b"not audio").unwrap();

    let backend = MockBackend::new();
    let combined = runner::run_transcription(&config, &backend).unwrap();

    assert_eq!(combined, "artifact from an interrupted run");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cached_entry_skips_normalizer_and_backend() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    std::fs::create_dir_all(&config.storage.cache_dir).unwrap();

    // "broken" is undecodable, but its cache entry short-circuits the
    // decode; "fresh" goes through the full path.
    std::fs::write(config.storage.input_dir.join("broken.m4a"), b"not audio").unwrap();
    create_voice_note(&config.storage.input_dir, "fresh.m4a");

    let store = FsTranscriptStore::new(config.storage.cache_dir.clone());
    store.put("broken.m4a", "salvaged from an earlier run").unwrap();

    let backend = MockBackend::new();
    let combined = runner::run_transcription(&config, &backend).unwrap();

    assert_eq!(
        combined,
        "salvaged from an earlier run\n\ntranscript of fresh"
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_one_failure_produces_no_artifact_and_keeps_state() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    for name in ["a.m4a", "b.m4a", "c.m4a"] {
        create_voice_note(&config.storage.input_dir, name);
    }

    let backend = MockBackend::failing_on("b");
    let result = runner::run_transcription(&config, &backend);
    assert!(result.is_err());

    // No consolidated artifact, no finalization side effects.
    assert!(!config.storage.cache_dir.join(CONSOLIDATED_FILENAME).exists());
    assert_eq!(
        storage::count_files(&config.storage.input_dir, Some("m4a")).unwrap(),
        3,
        "inputs must survive a failed batch"
    );

    // Cache entries of files that succeeded before the join are kept,
    // so a manual rerun resumes instead of restarting.
    let store = FsTranscriptStore::new(config.storage.cache_dir.clone());
    assert!(!store.has("b.m4a"));

    let retry = MockBackend::new();
    let combined = runner::run_transcription(&config, &retry).unwrap();
    assert_eq!(
        combined,
        "transcript of a\n\ntranscript of b\n\ntranscript of c"
    );
}

#[test]
fn test_finalization_clears_working_state_and_stamps_artifacts() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    for name in ["a.m4a", "b.m4a"] {
        create_voice_note(&config.storage.input_dir, name);
    }

    let backend = MockBackend::new();
    let combined = runner::run_transcription(&config, &backend).unwrap();
    let artifacts = storage::finalize_run(&config, "2026-08-05-09-15", "summary text").unwrap();

    assert_eq!(
        std::fs::read_to_string(&artifacts.transcript_path).unwrap(),
        combined
    );
    assert_eq!(
        std::fs::read_to_string(&artifacts.summary_path).unwrap(),
        "summary text"
    );
    assert!(artifacts
        .transcript_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("2026-08-05-09-15"));

    assert_eq!(storage::count_files(&config.storage.input_dir, None).unwrap(), 0);
    assert_eq!(storage::count_files(&config.storage.cache_dir, None).unwrap(), 0);
    assert_eq!(storage::count_files(&config.storage.output_dir, None).unwrap(), 2);
}
