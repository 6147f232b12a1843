use std::fs::File;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Sample rate of the canonical decoded format sent to transcription.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unrecognized audio container: {0}")]
    Probe(SymphoniaError),
    #[error("no decodable audio track in {0}")]
    NoAudioTrack(PathBuf),
    #[error("unknown sample rate in {0}")]
    UnknownSampleRate(PathBuf),
    #[error("decoder initialization failed: {0}")]
    DecoderInit(SymphoniaError),
    #[error("decode failed: {0}")]
    Decode(SymphoniaError),
    #[error("no audio samples decoded from {0}")]
    Empty(PathBuf),
    #[error("failed to write WAV: {0}")]
    Write(#[from] hound::Error),
}

/// Decode an audio container into 16 kHz mono 16-bit PCM and write it as
/// a WAV file alongside the input (same stem, `.wav` extension). Returns
/// the path of the new file. The input file is left untouched.
pub fn normalize_to_wav(input: &Path) -> Result<PathBuf, DecodeError> {
    let samples = decode_to_mono_pcm(input)?;

    let wav_path = input.with_extension("wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&wav_path, spec)?;
    for sample in &samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
    }
    writer.finalize()?;

    tracing::debug!(
        "Normalized {} -> {} ({:.1}s)",
        input.display(),
        wav_path.display(),
        samples.len() as f32 / TARGET_SAMPLE_RATE as f32
    );
    Ok(wav_path)
}

/// Decode any symphonia-supported container to mono f32 PCM at
/// [`TARGET_SAMPLE_RATE`].
fn decode_to_mono_pcm(input: &Path) -> Result<Vec<f32>, DecodeError> {
    let file = File::open(input).map_err(|source| DecodeError::Open {
        path: input.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // The extension is a hint only; probing falls back to content sniffing.
    let mut hint = Hint::new();
    if let Some(ext) = input.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(DecodeError::Probe)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::NoAudioTrack(input.to_path_buf()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnknownSampleRate(input.to_path_buf()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(DecodeError::DecoderInit)?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(DecodeError::Decode(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!("Skipping corrupt audio frame: {}", e);
                continue;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(DecodeError::Decode(e)),
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        let mut sample_buf = SampleBuffer::<f32>::new(frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let interleaved = sample_buf.samples();

        let channels = spec.channels.count();
        if channels > 1 {
            for frame in interleaved.chunks(channels) {
                samples.push(frame.iter().sum::<f32>() / channels as f32);
            }
        } else {
            samples.extend_from_slice(interleaved);
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::Empty(input.to_path_buf()));
    }

    if source_rate != TARGET_SAMPLE_RATE {
        samples = resample(&samples, source_rate, TARGET_SAMPLE_RATE);
    }
    Ok(samples)
}

/// Linear-interpolation resampler. Adequate for speech headed to a
/// transcription service.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let ratio = to_rate as f32 / from_rate as f32;
    let new_len = (samples.len() as f32 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f32 / ratio;
        let idx = src_idx as usize;
        let frac = src_idx - idx as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples.last().copied().unwrap_or(0.0)
        };
        resampled.push(sample);
    }
    resampled
}
