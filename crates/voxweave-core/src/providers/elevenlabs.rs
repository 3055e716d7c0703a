//! ElevenLabs provider
//!
//! The reference per-segment adapter. Beyond plain synthesis it feeds
//! the vendor prosodic context: neighboring turn text, a rolling window
//! of recent request ids recovered from the generation history, and,
//! for emotive turns, a narrated aside separated from the speech by a
//! long pause so the merge stage can trim it back out.

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{GeneratedAudio, SpeechProvider, COMMON_SSML_TAGS};
use crate::config::{SpeakerConfig, TtsConfig};
use crate::error::{Error, Result};
use crate::narration::{said_phrase, SaidPhrase};
use crate::retry::{retry, RetryPolicy};
use crate::segment::SpeakerSegment;

const BASE_URL: &str = "https://api.elevenlabs.io";
const API_KEY_HEADER: &str = "xi-api-key";
const DEFAULT_MODEL: &str = "eleven_multilingual_v2";

/// How many previous request ids travel with each generation call.
const CONTEXT_WINDOW: usize = 3;

pub struct ElevenLabsTts {
    client: reqwest::Client,
    api_key: HeaderValue,
    model: String,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

impl From<&SpeakerConfig> for VoiceSettings {
    fn from(config: &SpeakerConfig) -> Self {
        Self {
            stability: config.stability,
            similarity_boost: config.similarity_boost,
            style: config.style,
            use_speaker_boost: config.use_speaker_boost,
        }
    }
}

#[derive(Debug, Serialize)]
struct ConvertRequest {
    text: String,
    model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_text: Option<String>,
    previous_request_ids: Vec<String>,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<Voice>,
}

#[derive(Debug, Deserialize)]
struct Voice {
    voice_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    date_unix: i64,
}

impl ElevenLabsTts {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            Error::ConfigError("ElevenLabs API key must be provided".to_string())
        })?;
        let api_key = HeaderValue::from_str(api_key)
            .map_err(|_| Error::ConfigError("ElevenLabs API key is not a valid header".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        let response: VoicesResponse = self
            .client
            .get(format!("{}/v1/voices", BASE_URL))
            .query(&[("show_legacy", "true")])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.voices)
    }

    /// Resolve a configured voice value to a vendor voice id.
    ///
    /// Values that already look like ids pass through; names go through
    /// the voices listing, fetched once per conversion.
    async fn resolve_voice_id(
        &self,
        voice: &str,
        voices_cache: &mut Option<Vec<Voice>>,
    ) -> Result<String> {
        let voice = voice.trim();
        if is_voice_id(voice) {
            return Ok(voice.to_string());
        }
        if voices_cache.is_none() {
            *voices_cache = Some(self.list_voices().await?);
        }
        let voices = voices_cache.as_deref().unwrap_or_default();
        find_voice(voices, voice)
            .map(str::to_string)
            .ok_or_else(|| Error::VoiceNotFound(voice.to_string()))
    }

    async fn convert(&self, voice_id: &str, request: &ConvertRequest) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .post(format!("{}/v1/text-to-speech/{}", BASE_URL, voice_id))
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    /// Find the history item for `text`, newest first.
    ///
    /// Freshly generated items take a moment to become visible, so the
    /// caller retries this lookup.
    async fn find_history_item(&self, text: &str) -> Result<(String, String)> {
        let response: HistoryResponse = self
            .client
            .get(format!("{}/v1/history", BASE_URL))
            .query(&[("page_size", "4")])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut items = response.history;
        items.sort_by_key(|item| std::cmp::Reverse(item.date_unix));

        items
            .into_iter()
            .find_map(|item| match (item.request_id, item.text) {
                (Some(id), Some(item_text)) if item_text == text => Some((id, item_text)),
                _ => None,
            })
            .ok_or_else(|| {
                Error::GenerationError("Generated item not yet visible in history".to_string())
            })
    }
}

#[async_trait::async_trait]
impl SpeechProvider for ElevenLabsTts {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    fn supported_tags(&self) -> &[&'static str] {
        COMMON_SSML_TAGS
    }

    async fn generate(&self, segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio> {
        let mut voices_cache: Option<Vec<Voice>> = None;
        let mut previous_requests: Vec<(String, String)> = Vec::new();

        for i in 0..segments.len() {
            let segment = &segments[i];
            info!(
                "Generating audio for speaker {}: {}",
                segment.speaker_id, segment.text
            );
            let said = said_phrase(&segment.voice_config.language);

            let previous_text = (i > 0).then(|| {
                neighbor_context(
                    &segments[i - 1],
                    segments[i - 1].speaker_id == segments[i].speaker_id,
                    said,
                )
            });
            let next_text = (i + 1 < segments.len()).then(|| {
                neighbor_context(
                    &segments[i + 1],
                    segments[i + 1].speaker_id == segments[i].speaker_id,
                    said,
                )
            });

            let segment = &segments[i];
            let voice_id = self
                .resolve_voice_id(&segment.voice_config.voice, &mut voices_cache)
                .await?;

            let text = if segment.wants_emote() {
                build_emote_cue(
                    &segment.text,
                    segment.emote().unwrap_or_default(),
                    segment.voice_config.emote_pause,
                    said,
                )
            } else {
                segment.text.clone()
            };

            let window_start = previous_requests.len().saturating_sub(CONTEXT_WINDOW);
            let request = ConvertRequest {
                text: text.clone(),
                model_id: self.model.clone(),
                previous_text,
                next_text,
                previous_request_ids: previous_requests[window_start..]
                    .iter()
                    .map(|(id, _)| id.clone())
                    .collect(),
                voice_settings: VoiceSettings::from(&segment.voice_config),
            };

            let audio = retry(RetryPolicy::default(), |_| self.convert(&voice_id, &request))
                .await
                .map_err(|e| {
                    Error::GenerationError(format!(
                        "Unable to generate audio for speaker {}: {}",
                        segment.speaker_id, e
                    ))
                })?;
            segments[i].audio = Some(audio);

            match retry(RetryPolicy::default(), |_| self.find_history_item(&text)).await {
                Ok(item) => {
                    debug!("Found history item {} for continuity", item.0);
                    previous_requests.push(item);
                }
                Err(e) => {
                    warn!("Continuity lookup exhausted; proceeding without: {}", e);
                }
            }
        }

        Ok(GeneratedAudio::PerSegment)
    }
}

/// ElevenLabs voice ids are 20 alphanumeric characters.
fn is_voice_id(value: &str) -> bool {
    value.len() == 20 && value.chars().all(|c| c.is_ascii_alphanumeric())
}

fn find_voice<'a>(voices: &'a [Voice], name: &str) -> Option<&'a str> {
    voices
        .iter()
        .find(|v| v.name == name)
        .map(|v| v.voice_id.as_str())
}

/// Text sent for an emotive turn: the speech, an explicit pause of the
/// configured length, then the narrated emote description. The pause
/// lets the merge stage split the narration back off.
fn build_emote_cue(text: &str, emote: &str, pause_secs: f32, said: SaidPhrase) -> String {
    format!(
        "{}<break time=\"{}s\" />{}{}",
        text, pause_secs, said.connector, emote
    )
}

/// Context text for a neighboring turn.
///
/// A same-speaker neighbor contributes its raw text; a turn by another
/// speaker is framed as reported speech: its text plus the narration
/// connector and either its own emote description or the localized
/// fallback verb.
fn neighbor_context(neighbor: &SpeakerSegment, same_speaker: bool, said: SaidPhrase) -> String {
    if same_speaker {
        neighbor.text.clone()
    } else {
        let narration = neighbor
            .emote()
            .filter(|_| neighbor.voice_config.use_emote)
            .unwrap_or(said.verb);
        format!("{}{}{}", neighbor.text, said.connector, narration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn segment(speaker_id: u32, text: &str, emote: Option<&str>) -> SpeakerSegment {
        let mut parameters = BTreeMap::new();
        if let Some(emote) = emote {
            parameters.insert("emote".to_string(), emote.to_string());
        }
        SpeakerSegment::new(
            speaker_id,
            parameters,
            text.to_string(),
            SpeakerConfig::speaker_one(),
        )
    }

    #[test]
    fn voice_id_shape() {
        assert!(is_voice_id("21m00Tcm4TlvDq8ikWAM"));
        assert!(!is_voice_id("Rachel"));
        assert!(!is_voice_id("21m00Tcm4TlvDq8ikWA-"));
    }

    #[test]
    fn voice_lookup_by_name() {
        let voices = vec![
            Voice {
                voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
                name: "Rachel".to_string(),
            },
            Voice {
                voice_id: "AZnzlk1XvdvUeBnXmlld".to_string(),
                name: "Domi".to_string(),
            },
        ];
        assert_eq!(find_voice(&voices, "Domi"), Some("AZnzlk1XvdvUeBnXmlld"));
        assert_eq!(find_voice(&voices, "Nobody"), None);
    }

    #[test]
    fn emote_cue_carries_pause_and_narration() {
        let cue = build_emote_cue("Hello there", "he whispered", 1.5, said_phrase("en"));
        assert_eq!(cue, "Hello there<break time=\"1.5s\" />, he whispered");
    }

    #[test]
    fn same_speaker_context_is_raw_text() {
        let neighbor = segment(1, "How are you?", Some("cheerful"));
        assert_eq!(
            neighbor_context(&neighbor, true, said_phrase("en")),
            "How are you?"
        );
    }

    #[test]
    fn other_speaker_context_uses_emote_when_present() {
        let neighbor = segment(2, "Fine, thanks", Some("she replied warmly"));
        assert_eq!(
            neighbor_context(&neighbor, false, said_phrase("en")),
            "Fine, thanks, she replied warmly"
        );
    }

    #[test]
    fn other_speaker_context_falls_back_to_said_verb() {
        let neighbor = segment(2, "Fine, thanks", None);
        assert_eq!(
            neighbor_context(&neighbor, false, said_phrase("en")),
            "Fine, thanks, he said"
        );

        let mut muted = segment(2, "Fine, thanks", Some("warmly"));
        muted.voice_config.use_emote = false;
        assert_eq!(
            neighbor_context(&muted, false, said_phrase("en")),
            "Fine, thanks, he said"
        );
    }

    #[test]
    fn missing_api_key_fails_construction() {
        assert!(matches!(
            ElevenLabsTts::new(&TtsConfig::default()),
            Err(Error::ConfigError(_))
        ));
    }
}
