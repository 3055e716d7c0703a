//! Azure OpenAI provider
//!
//! Same speech surface as OpenAI, addressed through a deployment on the
//! caller's Azure resource.

use serde::Serialize;
use tracing::info;

use super::{GeneratedAudio, SpeechProvider, COMMON_SSML_TAGS};
use crate::config::TtsConfig;
use crate::error::{Error, Result};
use crate::segment::SpeakerSegment;

const DEFAULT_MODEL: &str = "gpt-4o-audio-preview";
const DEFAULT_VOICE: &str = "alloy";

pub struct AzureOpenAiTts {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    api_version: String,
    deployment: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

impl AzureOpenAiTts {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let (Some(api_base), Some(api_key), Some(deployment)) = (
            config.api_base.clone(),
            config.api_key.clone(),
            config.deployment.clone(),
        ) else {
            return Err(Error::ConfigError(
                "Azure OpenAI API base, API key, and deployment name must be provided".to_string(),
            ));
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            api_version: config.api_version.clone(),
            deployment,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let voice = if voice.is_empty() { DEFAULT_VOICE } else { voice };
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
        };

        let bytes = self
            .client
            .post(format!(
                "{}/openai/deployments/{}/audio/speech",
                self.api_base, self.deployment
            ))
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl SpeechProvider for AzureOpenAiTts {
    fn name(&self) -> &'static str {
        "azureopenai"
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
