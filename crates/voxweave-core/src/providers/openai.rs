//! OpenAI provider
//!
//! Straightforward per-segment synthesis against the speech endpoint.

use serde::Serialize;
use tracing::info;

use super::{GeneratedAudio, SpeechProvider};
use crate::config::{AudioFormat, TtsConfig};
use crate::error::{Error, Result};
use crate::segment::SpeakerSegment;

const BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "tts-1-hd";

/// Tags the vendor renders rather than reads aloud.
const PROVIDER_SSML_TAGS: &[&str] = &["break", "emphasis"];

pub struct OpenAiTts {
    client: reqwest::Client,
    api_key: String,
    model: String,
    audio_format: AudioFormat,
    streaming: bool,
    speed: f32,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f32,
}

impl OpenAiTts {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::ConfigError("OpenAI API key must be provided".to_string()))?;

        if !(0.5..=2.0).contains(&config.speed) {
            return Err(Error::ConfigError(format!(
                "Invalid speed: {}. Must be between 0.5 and 2.0",
                config.speed
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            audio_format: config.audio_format,
            streaming: config.streaming,
            speed: config.speed,
        })
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            response_format: self.audio_format.extension(),
            speed: self.speed,
        };

        let mut response = self
            .client
            .post(format!("{}/v1/audio/speech", BASE_URL))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        if self.streaming {
            let mut audio = Vec::new();
            while let Some(chunk) = response.chunk().await? {
                audio.extend_from_slice(&chunk);
            }
            Ok(audio)
        } else {
            Ok(response.bytes().await?.to_vec())
        }
    }
}

#[async_trait::async_trait]
impl SpeechProvider for OpenAiTts {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn supported_tags(&self) -> &[&'static str] {
        PROVIDER_SSML_TAGS
    }

    async fn generate(&self, segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio> {
        for segment in segments.iter_mut() {
            info!(
                "Generating audio for speaker {}: {}",
                segment.speaker_id, segment.text
            );
            let audio = self
                .synthesize(&segment.text, &segment.voice_config.voice)
                .await
                .map_err(|e| {
                    Error::GenerationError(format!(
                        "Failed to generate audio for speaker {}: {}",
                        segment.speaker_id, e
                    ))
                })?;
            segment.audio = Some(audio);
        }
        Ok(GeneratedAudio::PerSegment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> TtsConfig {
        TtsConfig {
            api_key: Some("sk-test".to_string()),
            ..TtsConfig::default()
        }
    }

    #[test]
    fn speed_out_of_range_fails_construction() {
        let mut config = config_with_key();
        config.speed = 2.5;
        assert!(matches!(
            OpenAiTts::new(&config),
            Err(Error::ConfigError(_))
        ));

        config.speed = 0.4;
        assert!(matches!(
            OpenAiTts::new(&config),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn valid_config_constructs_with_defaults() {
        let provider = OpenAiTts::new(&config_with_key()).unwrap();
        assert_eq!(provider.model, "tts-1-hd");
        assert_eq!(provider.speed, 1.0);
        assert!(!provider.streaming);
    }

    #[test]
    fn provider_tags_replace_the_common_set() {
        let provider = OpenAiTts::new(&config_with_key()).unwrap();
        assert_eq!(provider.supported_tags(), &["break", "emphasis"]);
    }
}
