//! Google Cloud TTS provider (single speaker)

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{GeneratedAudio, SpeechProvider, COMMON_SSML_TAGS};
use crate::config::TtsConfig;
use crate::error::{Error, Result};
use crate::segment::SpeakerSegment;

const BASE_URL: &str = "https://texttospeech.googleapis.com";
const DEFAULT_MODEL: &str = "en-US-Journey-F";

pub struct GoogleTts {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

impl GoogleTts {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::ConfigError("Google API key must be provided".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    async fn synthesize(&self, request: &SynthesizeRequest<'_>) -> Result<Vec<u8>> {
        let response: SynthesizeResponse = self
            .client
            .post(format!("{}/v1/text:synthesize", BASE_URL))
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        base64::engine::general_purpose::STANDARD
            .decode(&response.audio_content)
            .map_err(|e| Error::GenerationError(format!("Invalid audio payload: {}", e)))
    }
}

#[async_trait::async_trait]
impl SpeechProvider for GoogleTts {
    fn name(&self) -> &'static str {
        "google"
    }

    fn supported_tags(&self) -> &[&'static str] {
        COMMON_SSML_TAGS
    }

    async fn generate(&self, segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio> {
        for segment in segments.iter_mut() {
            info!(
                "Generating audio for speaker {}: {}",
                segment.speaker_id, segment.text
            );

            let voice = if segment.voice_config.voice.starts_with("default_voice") {
                self.model.as_str()
            } else {
                segment.voice_config.voice.as_str()
            };
            let request = SynthesizeRequest {
                input: SynthesisInput {
                    text: &segment.text,
                },
                voice: VoiceSelection {
                    language_code: &segment.voice_config.language,
                    name: voice,
                    ssml_gender: ssml_gender(&segment.voice_config.ssml_gender),
                },
                audio_config: AudioConfig {
                    audio_encoding: "MP3",
                },
            };

            let audio = self.synthesize(&request).await.map_err(|e| {
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

/// Normalize a configured gender onto the vendor enum, defaulting to
/// NEUTRAL for anything unrecognized.
fn ssml_gender(value: &str) -> &'static str {
    match value.to_ascii_uppercase().as_str() {
        "MALE" => "MALE",
        "FEMALE" => "FEMALE",
        _ => "NEUTRAL",
    }
}
