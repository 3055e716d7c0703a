//! Configuration types for the Voxweave TTS pipeline

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Audio container format for temp artifacts and the final export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            other => Err(Error::ConfigError(format!(
                "Unsupported audio format: {}",
                other
            ))),
        }
    }
}

/// Per-speaker voice settings, resolved per segment.
///
/// Unknown fields are preserved in `extra` rather than rejected, so
/// vendor-specific keys can pass through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerConfig {
    /// Voice identifier or human-readable voice name
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Language code, e.g. "en-US"
    #[serde(default = "default_speaker_language")]
    pub language: String,

    #[serde(default = "default_pitch")]
    pub pitch: String,

    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f32,

    /// Stability of the speech generation (ElevenLabs)
    #[serde(default = "default_stability")]
    pub stability: f32,

    /// Similarity boost in speech tone (ElevenLabs)
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,

    /// Style of speech delivery (ElevenLabs)
    #[serde(default)]
    pub style: f32,

    #[serde(default = "default_true")]
    pub use_speaker_boost: bool,

    /// Gender identifier for SSML-driven vendors (Google)
    #[serde(default = "default_ssml_gender")]
    pub ssml_gender: String,

    /// Whether to narrate `emote` descriptions into the generated audio
    #[serde(default = "default_true")]
    pub use_emote: bool,

    /// Pause separating the emote narration from the spoken text, in seconds
    #[serde(default = "default_emote_pause")]
    pub emote_pause: f32,

    /// Silence padding kept at split boundaries when trimming emotes, in ms
    #[serde(default = "default_emote_merge_pause")]
    pub emote_merge_pause: u64,

    /// Vendor-specific passthrough fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            language: default_speaker_language(),
            pitch: default_pitch(),
            speaking_rate: default_speaking_rate(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
            style: 0.0,
            use_speaker_boost: true,
            ssml_gender: default_ssml_gender(),
            use_emote: true,
            emote_pause: default_emote_pause(),
            emote_merge_pause: default_emote_merge_pause(),
            extra: BTreeMap::new(),
        }
    }
}

impl SpeakerConfig {
    /// Fresh default configuration for speaker identity 1.
    pub fn speaker_one() -> Self {
        Self::default()
    }

    /// Fresh default configuration for speaker identity 2.
    pub fn speaker_two() -> Self {
        Self {
            voice: "default_voice_2".to_string(),
            ..Self::default()
        }
    }

    /// Override known fields from parsed tag attributes.
    ///
    /// Keys that do not name a `SpeakerConfig` field are left to the
    /// caller (they stay in the segment parameter map). Values that fail
    /// to parse are ignored; markup tolerance must never abort a run.
    pub fn apply_attr_overrides(&mut self, params: &BTreeMap<String, String>) {
        for (key, value) in params {
            match key.as_str() {
                "voice" => self.voice = value.clone(),
                "language" => self.language = value.clone(),
                "pitch" => self.pitch = value.clone(),
                "ssml_gender" => self.ssml_gender = value.clone(),
                "speaking_rate" => Self::set_f32(&mut self.speaking_rate, key, value),
                "stability" => Self::set_f32(&mut self.stability, key, value),
                "similarity_boost" => Self::set_f32(&mut self.similarity_boost, key, value),
                "style" => Self::set_f32(&mut self.style, key, value),
                "emote_pause" => Self::set_f32(&mut self.emote_pause, key, value),
                "use_speaker_boost" => Self::set_bool(&mut self.use_speaker_boost, key, value),
                "use_emote" => Self::set_bool(&mut self.use_emote, key, value),
                "emote_merge_pause" => match value.parse::<u64>() {
                    Ok(v) => self.emote_merge_pause = v,
                    Err(_) => warn!("Ignoring unparseable attribute {}=\"{}\"", key, value),
                },
                _ => {}
            }
        }
    }

    fn set_f32(slot: &mut f32, key: &str, value: &str) {
        match value.parse::<f32>() {
            Ok(v) => *slot = v,
            Err(_) => warn!("Ignoring unparseable attribute {}=\"{}\"", key, value),
        }
    }

    fn set_bool(slot: &mut bool, key: &str, value: &str) {
        match value.parse::<bool>() {
            Ok(v) => *slot = v,
            Err(_) => warn!("Ignoring unparseable attribute {}=\"{}\"", key, value),
        }
    }
}

/// Fresh default configs for the two baseline speaker identities.
pub fn default_speakers() -> HashMap<u32, SpeakerConfig> {
    HashMap::from([
        (1, SpeakerConfig::speaker_one()),
        (2, SpeakerConfig::speaker_two()),
    ])
}

/// Output directory layout for finished audio and transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDirectories {
    #[serde(default = "default_audio_dir")]
    pub audio: PathBuf,

    #[serde(default = "default_transcripts_dir")]
    pub transcripts: PathBuf,
}

impl Default for OutputDirectories {
    fn default() -> Self {
        Self {
            audio: default_audio_dir(),
            transcripts: default_transcripts_dir(),
        }
    }
}

/// Process-wide settings for one conversion run. Immutable once a
/// conversion starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_audio_format")]
    pub audio_format: AudioFormat,

    #[serde(default)]
    pub output_directories: OutputDirectories,

    #[serde(default = "default_temp_audio_dir")]
    pub temp_audio_dir: PathBuf,

    /// Base URL for the API endpoint (Azure OpenAI)
    #[serde(default)]
    pub api_base: Option<String>,

    /// Vendor API key; may also come from the environment
    #[serde(default)]
    pub api_key: Option<String>,

    /// API version (Azure OpenAI)
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Deployment name (Azure OpenAI)
    #[serde(default)]
    pub deployment: Option<String>,

    /// Vendor model identifier; defaults vary by provider
    #[serde(default)]
    pub model: Option<String>,

    /// Stream the vendor response body (OpenAI)
    #[serde(default)]
    pub streaming: bool,

    /// Speaking speed multiplier (OpenAI)
    #[serde(default = "default_speaking_rate")]
    pub speed: f32,

    /// Request-level language, distinct from per-speaker language
    #[serde(default = "default_request_language")]
    pub language: String,

    /// Vendor-specific passthrough fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            audio_format: default_audio_format(),
            output_directories: OutputDirectories::default(),
            temp_audio_dir: default_temp_audio_dir(),
            api_base: None,
            api_key: None,
            api_version: default_api_version(),
            deployment: None,
            model: None,
            streaming: false,
            speed: default_speaking_rate(),
            language: default_request_language(),
            extra: BTreeMap::new(),
        }
    }
}

fn default_voice() -> String {
    "default_voice_1".to_string()
}

fn default_speaker_language() -> String {
    "en-US".to_string()
}

fn default_pitch() -> String {
    "default".to_string()
}

fn default_speaking_rate() -> f32 {
    1.0
}

fn default_stability() -> f32 {
    0.75
}

fn default_similarity_boost() -> f32 {
    0.85
}

fn default_ssml_gender() -> String {
    "NEUTRAL".to_string()
}

fn default_true() -> bool {
    true
}

fn default_emote_pause() -> f32 {
    1.5
}

fn default_emote_merge_pause() -> u64 {
    500
}

fn default_audio_format() -> AudioFormat {
    AudioFormat::Wav
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("data/audio")
}

fn default_transcripts_dir() -> PathBuf {
    PathBuf::from("data/transcripts")
}

fn default_temp_audio_dir() -> PathBuf {
    PathBuf::from("data/audio/tmp")
}

fn default_api_version() -> String {
    "2025-01-01-preview".to_string()
}

fn default_request_language() -> String {
    "en".to_string()
}
