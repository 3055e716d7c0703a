//! Top-level conversion entry point

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::assembler;
use crate::audio::merge::{merge, reconstruct_transcript};
use crate::audio::AudioClip;
use crate::config::{default_speakers, AudioFormat, SpeakerConfig, TtsConfig};
use crate::error::{Error, Result};
use crate::providers::{create_provider, SpeechProvider};

/// Converts tagged transcript text into one merged audio track plus an
/// annotated transcript.
///
/// Directories are established once at construction and are read-only
/// afterwards; every conversion call runs in its own scratch
/// subdirectory of the temp root, removed when the call exits on
/// success and on failure alike.
pub struct TextToSpeech {
    provider: Box<dyn SpeechProvider>,
    config: TtsConfig,
}

impl TextToSpeech {
    /// Build the subsystem with a provider from the registry.
    pub fn new(provider_name: &str, config: TtsConfig) -> Result<Self> {
        let provider = create_provider(provider_name, &config)?;
        Self::with_provider(provider, config)
    }

    /// Build the subsystem around an already-constructed provider.
    pub fn with_provider(provider: Box<dyn SpeechProvider>, config: TtsConfig) -> Result<Self> {
        if config.audio_format == AudioFormat::Mp3 {
            return Err(Error::ConfigError(
                "mp3 is decode-only; select wav as the output format".to_string(),
            ));
        }

        std::fs::create_dir_all(&config.output_directories.audio)?;
        std::fs::create_dir_all(&config.output_directories.transcripts)?;
        std::fs::create_dir_all(&config.temp_audio_dir)?;

        Ok(Self { provider, config })
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    /// Convert transcript text to speech.
    ///
    /// Returns the reconstructed transcript (with timing attributes)
    /// and the combined clip. With `save_to_file` the clip is exported
    /// to `output_file` and the transcript lands next to it with a
    /// `_transcript.txt` suffix. The conversion either fully succeeds
    /// or fails without retaining partial artifacts.
    pub async fn convert_to_speech(
        &self,
        text: &str,
        speaker_configs: Option<HashMap<u32, SpeakerConfig>>,
        output_file: Option<&Path>,
        save_to_file: bool,
    ) -> Result<(String, AudioClip)> {
        let speakers = speaker_configs.unwrap_or_else(default_speakers);

        let scratch = tempfile::Builder::new()
            .prefix("voxweave-")
            .tempdir_in(&self.config.temp_audio_dir)?;

        let result = self
            .convert_in_scratch(text, &speakers, scratch.path(), output_file, save_to_file)
            .await;

        // scratch and everything in it is removed here, pass or fail
        if let Err(ref e) = result {
            error!("Error converting text to speech: {}", e);
        }
        result
    }

    async fn convert_in_scratch(
        &self,
        text: &str,
        speakers: &HashMap<u32, SpeakerConfig>,
        scratch: &Path,
        output_file: Option<&Path>,
        save_to_file: bool,
    ) -> Result<(String, AudioClip)> {
        let (mut segments, joint_audio) = assembler::assemble(
            self.provider.as_ref(),
            text,
            speakers,
            scratch,
            self.config.audio_format,
        )
        .await?;

        let combined = merge(&mut segments, joint_audio.as_deref())?;
        let transcript = reconstruct_transcript(&segments);

        if save_to_file {
            let output_file = output_file.ok_or_else(|| {
                Error::ConfigError("An output path is required when saving to file".to_string())
            })?;
            if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            combined.export(output_file)?;
            info!("Audio saved to {:?}", output_file);

            let transcript_file = transcript_path(output_file);
            std::fs::write(&transcript_file, &transcript)?;
            info!("Transcript saved to {:?}", transcript_file);
        }

        Ok((transcript, combined))
    }
}

/// `out/episode.wav` -> `out/episode_transcript.txt`
fn transcript_path(output_file: &Path) -> PathBuf {
    let stem = output_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_file.with_file_name(format!("{}_transcript.txt", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_path_derivation() {
        assert_eq!(
            transcript_path(Path::new("out/episode.wav")),
            Path::new("out/episode_transcript.txt")
        );
        assert_eq!(
            transcript_path(Path::new("plain")),
            Path::new("plain_transcript.txt")
        );
    }

    #[test]
    fn mp3_output_is_rejected_at_construction() {
        use crate::providers::{GeneratedAudio, SpeechProvider};
        use crate::segment::SpeakerSegment;

        struct Noop;

        #[async_trait::async_trait]
        impl SpeechProvider for Noop {
            fn name(&self) -> &'static str {
                "noop"
            }
            async fn generate(
                &self,
                _segments: &mut [SpeakerSegment],
            ) -> Result<GeneratedAudio> {
                Ok(GeneratedAudio::PerSegment)
            }
        }

        let config = TtsConfig {
            audio_format: AudioFormat::Mp3,
            ..TtsConfig::default()
        };
        assert!(matches!(
            TextToSpeech::with_provider(Box::new(Noop), config),
            Err(Error::ConfigError(_))
        ));
    }
}
