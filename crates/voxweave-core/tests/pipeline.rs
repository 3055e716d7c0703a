//! End-to-end conversion against a stub provider

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use voxweave_core::audio::AudioClip;
use voxweave_core::config::{OutputDirectories, TtsConfig};
use voxweave_core::markup;
use voxweave_core::providers::{GeneratedAudio, SpeechProvider, COMMON_SSML_TAGS};
use voxweave_core::segment::SpeakerSegment;
use voxweave_core::{default_speakers, Error, Result, TextToSpeech};

const RATE: u32 = 8000;

/// Constant-amplitude clip; amplitude doubles as an RMS fingerprint.
fn tone(duration_ms: u64, amplitude: f32) -> AudioClip {
    let len = duration_ms as usize * RATE as usize / 1000;
    AudioClip::new(vec![amplitude; len], RATE, 1).unwrap()
}

fn wav_bytes(clip: &AudioClip) -> Vec<u8> {
    clip.to_wav_bytes().unwrap()
}

/// Returns a fixed 1000 ms clip per segment; emotive segments get a
/// speech + pause + narration shape instead.
struct StubProvider;

#[async_trait]
impl SpeechProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn supported_tags(&self) -> &[&'static str] {
        COMMON_SSML_TAGS
    }

    async fn generate(&self, segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio> {
        for segment in segments.iter_mut() {
            let clip = if segment.wants_emote() {
                // 500 ms speech, a pause long enough to split on, and
                // the narrated emote tail
                let mut clip = tone(500, 0.5);
                clip.append(&tone(2500, 0.0)).unwrap();
                clip.append(&tone(300, 0.5)).unwrap();
                clip
            } else {
                tone(1000, 0.5)
            };
            segment.audio = Some(wav_bytes(&clip));
        }
        Ok(GeneratedAudio::PerSegment)
    }
}

struct FailingProvider;

#[async_trait]
impl SpeechProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn generate(&self, _segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio> {
        Err(Error::GenerationError("vendor is down".to_string()))
    }
}

struct JointProvider;

#[async_trait]
impl SpeechProvider for JointProvider {
    fn name(&self) -> &'static str {
        "joint"
    }

    async fn generate(&self, _segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio> {
        Ok(GeneratedAudio::Joint(wav_bytes(&tone(1500, 0.4))))
    }
}

fn test_config(root: &std::path::Path) -> TtsConfig {
    TtsConfig {
        output_directories: OutputDirectories {
            audio: root.join("audio"),
            transcripts: root.join("transcripts"),
        },
        temp_audio_dir: root.join("tmp"),
        ..TtsConfig::default()
    }
}

fn scratch_leftovers(config: &TtsConfig) -> Vec<PathBuf> {
    std::fs::read_dir(&config.temp_audio_dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn two_turns_merge_with_sequential_timing() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let tts = TextToSpeech::with_provider(Box::new(StubProvider), config.clone()).unwrap();

    let (transcript, audio) = tts
        .convert_to_speech(
            "<person1>Hi</person1><person2>Hello</person2>",
            None,
            None,
            false,
        )
        .await
        .unwrap();

    assert_eq!(audio.duration_ms(), 2000);
    assert!(transcript.contains("start=\"0\""));
    assert!(transcript.contains("end=\"1000\""));
    assert!(transcript.contains("start=\"1000\""));
    assert!(transcript.contains("end=\"2000\""));
    assert!(scratch_leftovers(&config).is_empty());
}

#[tokio::test]
async fn transcript_round_trips_back_to_the_same_turns() {
    let root = tempfile::tempdir().unwrap();
    let tts =
        TextToSpeech::with_provider(Box::new(StubProvider), test_config(root.path())).unwrap();

    let input =
        "<person1 emote=\"he said brightly\">Good morning!</person1><person2>Morning.</person2>";
    let (transcript, _) = tts
        .convert_to_speech(input, None, None, false)
        .await
        .unwrap();

    let original = markup::parse(input, COMMON_SSML_TAGS, &default_speakers());
    let reparsed = markup::parse(&transcript, COMMON_SSML_TAGS, &default_speakers());

    assert_eq!(original.len(), reparsed.len());
    for (a, b) in original.iter().zip(&reparsed) {
        assert_eq!(a.speaker_id, b.speaker_id);
        assert_eq!(a.text, b.text);

        // timing attributes are derived, not part of the round trip
        let mut params: BTreeMap<String, String> = b.parameters.clone();
        params.remove("length");
        params.remove("start");
        params.remove("end");
        assert_eq!(a.parameters, params);
    }
}

#[tokio::test]
async fn emotive_tail_is_trimmed_from_the_mix() {
    let root = tempfile::tempdir().unwrap();
    let tts =
        TextToSpeech::with_provider(Box::new(StubProvider), test_config(root.path())).unwrap();

    let (transcript, audio) = tts
        .convert_to_speech(
            "<person1 emote=\"with a grin\">Hi</person1><person2>Hello</person2>",
            None,
            None,
            false,
        )
        .await
        .unwrap();

    // 500 ms speech + 500 ms kept pause; the narration tail is gone
    assert_eq!(audio.duration_ms(), 2000);
    assert!(transcript.contains("length=\"1000\""));
}

#[tokio::test]
async fn ordering_follows_the_transcript_not_the_speakers() {
    let root = tempfile::tempdir().unwrap();
    let tts =
        TextToSpeech::with_provider(Box::new(StubProvider), test_config(root.path())).unwrap();

    let (transcript, audio) = tts
        .convert_to_speech(
            "<person2>first</person2><person1>second</person1><person2>third</person2>",
            None,
            None,
            false,
        )
        .await
        .unwrap();

    assert_eq!(audio.duration_ms(), 3000);
    let lines: Vec<&str> = transcript.lines().collect();
    assert!(lines[0].contains(">first<") && lines[0].starts_with("<person2"));
    assert!(lines[1].contains(">second<") && lines[1].starts_with("<person1"));
    assert!(lines[2].contains(">third<") && lines[2].starts_with("<person2"));
}

#[tokio::test]
async fn saving_writes_audio_and_transcript_sidecar() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let output = config.output_directories.audio.join("episode.wav");
    let tts = TextToSpeech::with_provider(Box::new(StubProvider), config.clone()).unwrap();

    let (transcript, _) = tts
        .convert_to_speech(
            "<person1>Hi</person1>",
            None,
            Some(&output),
            true,
        )
        .await
        .unwrap();

    let exported = AudioClip::load(&output).unwrap();
    assert_eq!(exported.duration_ms(), 1000);

    let sidecar = config.output_directories.audio.join("episode_transcript.txt");
    assert_eq!(std::fs::read_to_string(sidecar).unwrap(), transcript);
}

#[tokio::test]
async fn joint_provider_bypasses_per_segment_merge() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let tts = TextToSpeech::with_provider(Box::new(JointProvider), config.clone()).unwrap();

    let (transcript, audio) = tts
        .convert_to_speech(
            "<person1>Hi</person1><person2>Hello</person2>",
            None,
            None,
            false,
        )
        .await
        .unwrap();

    assert_eq!(audio.duration_ms(), 1500);
    // no per-segment clips, so no timing annotations
    assert!(!transcript.contains("start="));
    assert!(scratch_leftovers(&config).is_empty());
}

#[tokio::test]
async fn provider_failure_aborts_and_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let tts = TextToSpeech::with_provider(Box::new(FailingProvider), config.clone()).unwrap();

    let result = tts
        .convert_to_speech("<person1>Hi</person1>", None, None, false)
        .await;

    assert!(matches!(result, Err(Error::GenerationError(_))));
    assert!(scratch_leftovers(&config).is_empty());
    let audio_dir = std::fs::read_dir(&config.output_directories.audio).unwrap();
    assert_eq!(audio_dir.count(), 0);
}

#[tokio::test]
async fn input_without_turns_fails_in_the_merge_stage() {
    let root = tempfile::tempdir().unwrap();
    let tts =
        TextToSpeech::with_provider(Box::new(StubProvider), test_config(root.path())).unwrap();

    let result = tts
        .convert_to_speech("no tags at all", None, None, false)
        .await;
    assert!(matches!(result, Err(Error::MergeError(_))));
}
