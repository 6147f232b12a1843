use std::path::Path;

use anyhow::{Context, Result};

use crate::audio::normalizer;
use crate::transcribe::backend::TranscriptionBackend;
use crate::transcribe::cache::TranscriptStore;

/// Cache key for an input file: its final path component.
pub fn cache_key(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("input path has no filename: {}", path.display()))
}

/// Process one input file end to end.
///
/// A present cache entry short-circuits everything: no decode, no
/// network call. Otherwise the file is normalized, transcribed, the
/// transcript persisted, and the intermediate WAV deleted. Any step's
/// failure propagates to the caller; the intermediate WAV is left
/// behind on failure.
pub fn process_file(
    path: &Path,
    backend: &dyn TranscriptionBackend,
    store: &dyn TranscriptStore,
) -> Result<String> {
    let key = cache_key(path)?;

    if let Some(text) = store.get(&key)? {
        tracing::info!("Transcript for {} exists, loading from cache", key);
        return Ok(text);
    }

    tracing::info!("Processing {}", path.display());
    let wav_path = normalizer::normalize_to_wav(path)
        .with_context(|| format!("failed to normalize {}", path.display()))?;

    let text = backend
        .transcribe(&wav_path)
        .with_context(|| format!("failed to transcribe {}", wav_path.display()))?;

    store.put(&key, &text)?;
    std::fs::remove_file(&wav_path)
        .with_context(|| format!("failed to remove intermediate {}", wav_path.display()))?;

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    use crate::transcribe::backend::TranscriptionError;
    use crate::transcribe::cache::FsTranscriptStore;

    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl CountingBackend {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TranscriptionBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let stem = audio_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            Ok(format!("transcript of {stem}"))
        }
    }

    fn create_audio_file(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..1600 {
            writer.write_sample((i % 80) as i16 * 50).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_cache_key_is_filename() {
        assert_eq!(
            cache_key(Path::new("/some/dir/note.m4a")).unwrap(),
            "note.m4a"
        );
    }

    #[test]
    fn test_uncached_file_is_normalized_transcribed_and_persisted() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("note.m4a");
        create_audio_file(&input);
        let store = FsTranscriptStore::new(tmp.path());
        let backend = CountingBackend::new();

        let text = process_file(&input, &backend, &store).unwrap();
        assert_eq!(text, "transcript of note");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("note.m4a").unwrap().as_deref(), Some(text.as_str()));
        assert!(
            !tmp.path().join("note.wav").exists(),
            "intermediate WAV must be deleted after transcription"
        );
        assert!(input.exists(), "input file is untouched until finalization");
    }

    #[test]
    fn test_cached_file_skips_decode_and_backend() {
        let tmp = TempDir::new().unwrap();
        // Undecodable bytes prove the normalizer is never consulted.
        let input = tmp.path().join("note.m4a");
        std::fs::write(&input, b"not audio").unwrap();

        let store = FsTranscriptStore::new(tmp.path());
        store.put("note.m4a", "previously transcribed").unwrap();
        let backend = CountingBackend::new();

        let text = process_file(&input, &backend, &store).unwrap();
        assert_eq!(text, "previously transcribed");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_undecodable_uncached_file_fails() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("broken.m4a");
        std::fs::write(&input, b"not audio").unwrap();

        let store = FsTranscriptStore::new(tmp.path());
        let backend = CountingBackend::new();

        let result = process_file(&input, &backend, &store);
        assert!(result.is_err());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(!store.has("broken.m4a"));
    }
}
