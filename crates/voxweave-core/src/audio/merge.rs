//! Audio merge engine
//!
//! Takes the segments back from the assembler, trims emotive narration
//! tails, normalizes loudness across all clips, concatenates them in
//! transcript order and computes per-segment timing offsets.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::audio::{split_on_silence, AudioClip};
use crate::config::SpeakerConfig;
use crate::error::{Error, Result};
use crate::segment::SpeakerSegment;

/// Silence threshold for emotive trimming, dBFS.
pub const SILENCE_THRESH_DB: f32 = -40.0;

/// Minimum silence length when the config leaves the pause unset, ms.
pub const DEFAULT_MIN_SILENCE_MS: u64 = 2000;

/// Silence padding kept at split boundaries when the config leaves the
/// merge pause unset, ms.
pub const DEFAULT_KEEP_SILENCE_MS: u64 = 500;

/// Clips quieter than this RMS are treated as silent for normalization.
const RMS_FLOOR: f32 = 1e-6;

/// Merge generated audio into one combined clip.
///
/// With a joint artifact present (multi-speaker vendors) the artifact
/// is the result: per-segment trimming, normalization and timing are
/// skipped because no per-segment clips exist. Otherwise every segment
/// must carry a temp audio artifact; the merge is all-or-nothing.
pub fn merge(segments: &mut [SpeakerSegment], joint_audio: Option<&Path>) -> Result<AudioClip> {
    if let Some(path) = joint_audio {
        let clip = AudioClip::load(path)?;
        info!("Loaded joint audio: {} ms", clip.duration_ms());
        return Ok(clip);
    }

    if segments.is_empty() {
        return Err(Error::MergeError("No segments to merge".to_string()));
    }

    for segment in segments.iter_mut() {
        let path = segment.audio_file.as_deref().ok_or_else(|| {
            Error::MergeError(format!(
                "Segment for speaker {} has no audio artifact",
                segment.speaker_id
            ))
        })?;
        let clip = AudioClip::load(path)?;
        let clip = if segment.wants_emote() {
            trim_emote_tail(clip, &segment.voice_config)?
        } else {
            clip
        };
        segment.clip = Some(clip);
    }

    normalize_segments(segments);

    let clips: Vec<AudioClip> = segments
        .iter()
        .filter_map(|s| s.clip.clone())
        .collect();
    let combined = AudioClip::concat(&clips).map_err(|e| Error::MergeError(e.to_string()))?;

    let mut cursor = 0u64;
    for segment in segments.iter_mut() {
        let length = segment.clip.as_ref().map(AudioClip::duration_ms).unwrap_or(0);
        segment.audio_length = Some(length);
        segment.start_time = Some(cursor);
        cursor += length;
        segment.end_time = Some(cursor);
    }

    info!(
        "Merged {} segments into {} ms of audio",
        segments.len(),
        combined.duration_ms()
    );
    Ok(combined)
}

/// Cut the synthesized narration tail off an emotive clip.
///
/// The generation step inserts a long pause between the spoken text and
/// the narrated emote description; splitting on that pause and dropping
/// the final piece removes the narration. One piece means no qualifying
/// pause was rendered; the clip stays untouched.
pub fn trim_emote_tail(clip: AudioClip, config: &SpeakerConfig) -> Result<AudioClip> {
    let min_silence = match (config.emote_pause * 1000.0).round() as u64 {
        0 => DEFAULT_MIN_SILENCE_MS,
        ms => ms,
    };
    let keep_silence = match config.emote_merge_pause {
        0 => DEFAULT_KEEP_SILENCE_MS,
        ms => ms,
    };

    let chunks = split_on_silence(&clip, min_silence, SILENCE_THRESH_DB, keep_silence);
    debug!("Silence detection found {} chunks", chunks.len());

    if chunks.len() <= 1 {
        return Ok(clip);
    }
    if chunks.len() > 2 {
        // More pauses than the one we synthesized: the dropped tail may
        // not be the narration alone.
        warn!(
            "Emotive trim found {} pieces; dropping the final one may lose speech",
            chunks.len()
        );
    }
    AudioClip::concat(&chunks[..chunks.len() - 1])
}

/// Bring every clip to the mean RMS of the set.
///
/// Silent clips are left at 0 dB and excluded from the mean; a
/// singleton set gets 0 dB by construction (its RMS is the mean).
fn normalize_segments(segments: &mut [SpeakerSegment]) {
    let loudness: Vec<f32> = segments
        .iter()
        .filter_map(|s| s.clip.as_ref())
        .map(AudioClip::rms)
        .collect();

    let audible: Vec<f32> = loudness.iter().copied().filter(|&r| r > RMS_FLOOR).collect();
    if audible.is_empty() {
        warn!("All clips are silent; skipping loudness normalization");
        return;
    }
    let target = audible.iter().sum::<f32>() / audible.len() as f32;

    for (segment, rms) in segments.iter_mut().zip(loudness) {
        if rms <= RMS_FLOOR {
            warn!(
                "Speaker {} clip is near-silent; leaving gain at 0 dB",
                segment.speaker_id
            );
            continue;
        }
        let gain = 20.0 * (target / rms).log10();
        if let Some(clip) = segment.clip.take() {
            segment.clip = Some(clip.apply_gain(gain));
        }
    }
}

/// Re-serialize segments into annotated transcript text.
pub fn reconstruct_transcript(segments: &[SpeakerSegment]) -> String {
    segments
        .iter()
        .map(SpeakerSegment::to_tag)
        .collect::<Vec<_>>()
        .join("\n")
}
