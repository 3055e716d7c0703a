//! Speaker segments: one contiguous turn of transcript text

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::audio::AudioClip;
use crate::config::SpeakerConfig;

/// One parsed speaker turn.
///
/// Created by the markup parser with the audio fields empty; a provider
/// adapter fills `audio`, the assembler records `audio_file`, and the
/// merge engine attaches the decoded `clip` plus timing offsets.
#[derive(Debug, Clone, Default)]
pub struct SpeakerSegment {
    /// Speaker identity from the tag, e.g. 1 for `<person1>`
    pub speaker_id: u32,

    /// Free-form parameters from the tag that are not voice settings
    /// (e.g. `emote`)
    pub parameters: BTreeMap<String, String>,

    /// Raw text of the turn
    pub text: String,

    /// Resolved voice configuration for this turn
    pub voice_config: SpeakerConfig,

    /// Generated audio bytes, if any
    pub audio: Option<Vec<u8>>,

    /// Path to the persisted temporary audio artifact, if any
    pub audio_file: Option<PathBuf>,

    /// Decoded (and possibly trimmed) audio clip, if any
    pub clip: Option<AudioClip>,

    /// Clip duration in milliseconds, set by the merge engine
    pub audio_length: Option<u64>,

    /// Start offset in the combined track, milliseconds
    pub start_time: Option<u64>,

    /// End offset in the combined track, milliseconds
    pub end_time: Option<u64>,
}

impl SpeakerSegment {
    pub fn new(
        speaker_id: u32,
        parameters: BTreeMap<String, String>,
        text: String,
        voice_config: SpeakerConfig,
    ) -> Self {
        Self {
            speaker_id,
            parameters,
            text,
            voice_config,
            ..Self::default()
        }
    }

    /// The `emote` description for this turn, if present.
    pub fn emote(&self) -> Option<&str> {
        self.parameters.get("emote").map(String::as_str)
    }

    /// True when this turn should receive emotive delivery.
    pub fn wants_emote(&self) -> bool {
        self.voice_config.use_emote && self.emote().is_some()
    }

    /// Re-serialize the segment to its tag form.
    ///
    /// Parameters come back as attributes; computed `length`, `start`
    /// and `end` (milliseconds) are appended when available so the
    /// reconstructed transcript carries timing.
    pub fn to_tag(&self) -> String {
        let mut attrs: Vec<String> = self
            .parameters
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, value))
            .collect();

        if let Some(length) = self.audio_length {
            attrs.push(format!("length=\"{}\"", length));
        }
        if let Some(start) = self.start_time {
            attrs.push(format!("start=\"{}\"", start));
        }
        if let Some(end) = self.end_time {
            attrs.push(format!("end=\"{}\"", end));
        }

        if attrs.is_empty() {
            format!(
                "<person{id}>{text}</person{id}>",
                id = self.speaker_id,
                text = self.text
            )
        } else {
            format!(
                "<person{id} {attrs}>{text}</person{id}>",
                id = self.speaker_id,
                attrs = attrs.join(" "),
                text = self.text
            )
        }
    }
}
