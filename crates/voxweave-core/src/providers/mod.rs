//! TTS provider adapters
//!
//! Every vendor implements the same contract: one `generate` call per
//! conversion over the full ordered segment list, so adapters can use
//! inter-segment context. Two capability shapes exist, per-segment
//! audio placed on each segment or one joint blob spanning all turns,
//! and the merge stage dispatches on which one came back.

mod azure;
mod elevenlabs;
mod google;
mod googlemulti;
mod openai;

pub use azure::AzureOpenAiTts;
pub use elevenlabs::ElevenLabsTts;
pub use google::GoogleTts;
pub use googlemulti::GoogleMultiTts;
pub use openai::OpenAiTts;

use async_trait::async_trait;

use crate::config::TtsConfig;
use crate::error::{Error, Result};
use crate::segment::SpeakerSegment;

/// SSML tags most vendors pass through unchanged.
pub const COMMON_SSML_TAGS: &[&str] = &["lang", "p", "phoneme", "s", "sub"];

/// What a provider produced for one conversion.
#[derive(Debug)]
pub enum GeneratedAudio {
    /// Audio bytes were placed on each segment
    PerSegment,
    /// One blob covering all turns in order
    Joint(Vec<u8>),
}

/// Uniform vendor contract.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Provider registry name.
    fn name(&self) -> &'static str;

    /// Markup tags the vendor understands as SSML; consulted by the
    /// parser so those tags survive cleaning.
    fn supported_tags(&self) -> &[&'static str] {
        COMMON_SSML_TAGS
    }

    /// Generate audio for all segments in one call.
    ///
    /// Per-segment providers fill `segment.audio` and return
    /// [`GeneratedAudio::PerSegment`]; multi-speaker providers leave
    /// the segments untouched and return [`GeneratedAudio::Joint`].
    async fn generate(&self, segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio>;
}

/// Build a provider by registry name.
///
/// Construction is where configuration errors surface: missing
/// credentials, bad speed ranges and the like fail here, before any
/// generation attempt.
pub fn create_provider(name: &str, config: &TtsConfig) -> Result<Box<dyn SpeechProvider>> {
    match name {
        "elevenlabs" => Ok(Box::new(ElevenLabsTts::new(config)?)),
        "openai" => Ok(Box::new(OpenAiTts::new(config)?)),
        "azureopenai" => Ok(Box::new(AzureOpenAiTts::new(config)?)),
        "google" => Ok(Box::new(GoogleTts::new(config)?)),
        "googlemulti" => Ok(Box::new(GoogleMultiTts::new(config)?)),
        other => Err(Error::UnknownProvider(other.to_string())),
    }
}
