//! Google Cloud TTS provider with multi-speaker support
//!
//! The one joint-capability vendor: the whole ordered segment list goes
//! into a single multi-speaker markup, each turn labeled with its
//! resolved voice. Vendor limits cap request size, so turns are planned
//! into requests first (turn text split at sentence boundaries with a
//! word fallback under a character ceiling, whole turns packed under a
//! byte ceiling) and the per-request blobs are merged back into one.

use std::sync::OnceLock;

use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{GeneratedAudio, SpeechProvider, COMMON_SSML_TAGS};
use crate::audio::AudioClip;
use crate::config::TtsConfig;
use crate::error::{Error, Result};
use crate::segment::SpeakerSegment;

const BASE_URL: &str = "https://texttospeech.googleapis.com";
const DEFAULT_MODEL: &str = "en-US-Studio-MultiSpeaker";

/// Vendor byte limit per synthesize request.
const MAX_REQUEST_BYTES: usize = 1300;

/// Character ceiling for a single turn's text.
const MAX_TURN_CHARS: usize = 500;

pub struct GoogleMultiTts {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

/// One speaker turn inside a planned request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub text: String,
    pub speaker: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisInput<'a> {
    multi_speaker_markup: MultiSpeakerMarkup<'a>,
}

#[derive(Debug, Serialize)]
struct MultiSpeakerMarkup<'a> {
    turns: &'a [Turn],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
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

impl GoogleMultiTts {
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

    async fn synthesize(&self, turns: &[Turn]) -> Result<Vec<u8>> {
        let request = SynthesizeRequest {
            input: SynthesisInput {
                multi_speaker_markup: MultiSpeakerMarkup { turns },
            },
            voice: VoiceSelection {
                language_code: "en-US",
                name: &self.model,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let response: SynthesizeResponse = self
            .client
            .post(format!("{}/v1beta1/text:synthesize", BASE_URL))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
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
impl SpeechProvider for GoogleMultiTts {
    fn name(&self) -> &'static str {
        "googlemulti"
    }

    fn supported_tags(&self) -> &[&'static str] {
        COMMON_SSML_TAGS
    }

    async fn generate(&self, segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio> {
        info!("Starting joint audio generation for {} segments", segments.len());

        let plan = plan_requests(segments, MAX_TURN_CHARS, MAX_REQUEST_BYTES);
        if plan.is_empty() {
            return Err(Error::GenerationError(
                "No turns to synthesize".to_string(),
            ));
        }
        debug!("Planned {} synthesize requests", plan.len());

        let mut blobs = Vec::with_capacity(plan.len());
        for turns in &plan {
            let blob = self.synthesize(turns).await.map_err(|e| {
                Error::GenerationError(format!("Failed to generate joint audio: {}", e))
            })?;
            blobs.push(blob);
        }

        if blobs.len() == 1 {
            return Ok(GeneratedAudio::Joint(blobs.remove(0)));
        }
        Ok(GeneratedAudio::Joint(merge_blobs(&blobs)?))
    }
}

/// Concatenate per-request audio blobs into one joint WAV payload.
fn merge_blobs(blobs: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut clips = Vec::with_capacity(blobs.len());
    for (i, blob) in blobs.iter().enumerate() {
        if blob.is_empty() {
            warn!("Skipping empty audio blob {}", i);
            continue;
        }
        clips.push(AudioClip::from_bytes(blob)?);
    }
    if clips.is_empty() {
        return Err(Error::GenerationError(
            "No valid audio blobs to merge".to_string(),
        ));
    }
    AudioClip::concat(&clips)?.to_wav_bytes()
}

/// Plan synthesize requests from ordered segments.
///
/// Each segment becomes one or more turns (its text split under
/// `max_turn_chars`), labeled with the segment's voice. Whole turns are
/// then packed into requests under `max_request_bytes`; a turn is the
/// planning atom, so no request boundary ever lands inside one.
pub fn plan_requests(
    segments: &[SpeakerSegment],
    max_turn_chars: usize,
    max_request_bytes: usize,
) -> Vec<Vec<Turn>> {
    let mut requests = Vec::new();
    let mut current: Vec<Turn> = Vec::new();
    let mut current_bytes = 0usize;

    for segment in segments {
        let speaker = &segment.voice_config.voice;
        for text in split_turn_text(&segment.text, max_turn_chars) {
            let cost = text.len() + speaker.len();
            if current_bytes + cost > max_request_bytes && !current.is_empty() {
                requests.push(std::mem::take(&mut current));
                current_bytes = 0;
            }
            current_bytes += cost;
            current.push(Turn {
                text,
                speaker: speaker.clone(),
            });
        }
    }
    if !current.is_empty() {
        requests.push(current);
    }
    requests
}

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s).*?[.!?]+(?:\s+|$)").unwrap())
}

/// Split turn text into pieces of at most `max_chars` bytes, preferring
/// sentence boundaries and falling back to word boundaries when a
/// single sentence is too long.
pub fn split_turn_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut sentences: Vec<&str> = Vec::new();
    let mut last = 0;
    for m in sentence_re().find_iter(text) {
        sentences.push(m.as_str());
        last = m.end();
    }
    if last < text.len() {
        sentences.push(&text[last..]);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for sentence in sentences {
        if current.len() + sentence.len() <= max_chars {
            current.push_str(sentence);
            continue;
        }
        if !current.is_empty() {
            chunks.push(current.trim().to_string());
            current = sentence.to_string();
            if current.len() <= max_chars {
                continue;
            }
            current.clear();
        }
        // A single sentence over the ceiling: split at word boundaries
        for word in sentence.split_whitespace() {
            if !current.is_empty() && current.len() + word.len() + 1 > max_chars {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    let current = current.trim();
    if !current.is_empty() {
        chunks.push(current.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeakerConfig;
    use std::collections::BTreeMap;

    fn segment(voice: &str, text: &str) -> SpeakerSegment {
        let mut config = SpeakerConfig::speaker_one();
        config.voice = voice.to_string();
        SpeakerSegment::new(1, BTreeMap::new(), text.to_string(), config)
    }

    #[test]
    fn short_text_is_one_piece() {
        assert_eq!(split_turn_text("Hello there.", 500), vec!["Hello there."]);
    }

    #[test]
    fn splits_at_sentence_boundaries() {
        let text = "One sentence here. Another sentence there. And a third one now.";
        let chunks = split_turn_text(text, 45);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 45, "chunk too long: {:?}", chunk);
            assert!(!chunk.is_empty());
        }
        assert!(chunks[0].starts_with("One sentence"));
        assert_eq!(
            chunks.join(" ").replace("  ", " "),
            text
        );
    }

    #[test]
    fn falls_back_to_word_boundaries() {
        let text = "word ".repeat(50);
        let chunks = split_turn_text(text.trim(), 40);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 40);
            assert!(!chunk.starts_with(' ') && !chunk.ends_with(' '));
        }
    }

    #[test]
    fn plan_packs_whole_turns_under_byte_ceiling() {
        let segments = vec![
            segment("R", "Aaaaaaaaaa."),
            segment("S", "Bbbbbbbbbb."),
            segment("R", "Cccccccccc."),
        ];
        // each turn costs 12 bytes (11 text + 1 speaker); ceiling 25
        let plan = plan_requests(&segments, 500, 25);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].len(), 2);
        assert_eq!(plan[1].len(), 1);
        // order and speaker labels survive planning
        assert_eq!(plan[0][0].speaker, "R");
        assert_eq!(plan[0][1].speaker, "S");
        assert_eq!(plan[1][0].text, "Cccccccccc.");
    }

    #[test]
    fn oversized_turn_is_split_before_packing() {
        let text = "word ".repeat(20);
        let segments = vec![segment("R", text.trim())];
        let plan = plan_requests(&segments, 30, 40);
        // the turn was split under the char ceiling, then packed
        let turns: usize = plan.iter().map(Vec::len).sum();
        assert!(turns >= 3);
        for request in &plan {
            for turn in request {
                assert!(turn.text.len() <= 30);
            }
        }
    }

    #[test]
    fn empty_segment_list_plans_nothing() {
        assert!(plan_requests(&[], 500, 1300).is_empty());
    }
}
