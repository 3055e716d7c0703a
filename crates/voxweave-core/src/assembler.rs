//! Segment assembly
//!
//! Orchestrates parser and provider, then persists the generated audio
//! to per-run temporary artifacts so the merge engine can work from
//! files. Artifact names carry a fresh run id, so concurrent
//! conversions sharing a scratch root can never collide.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::config::{AudioFormat, SpeakerConfig};
use crate::error::{Error, Result};
use crate::markup;
use crate::providers::{GeneratedAudio, SpeechProvider};
use crate::segment::SpeakerSegment;

/// Parse `text`, generate audio through `provider`, and persist the
/// results under `scratch_dir`.
///
/// Per-segment providers leave each segment pointing at its own
/// artifact; the joint variant yields one shared artifact returned
/// separately, with the segments left audio-less.
pub async fn assemble(
    provider: &dyn SpeechProvider,
    text: &str,
    speaker_configs: &HashMap<u32, SpeakerConfig>,
    scratch_dir: &Path,
    audio_format: AudioFormat,
) -> Result<(Vec<SpeakerSegment>, Option<PathBuf>)> {
    let mut segments = markup::parse(text, provider.supported_tags(), speaker_configs);
    debug!("Assembling {} segments", segments.len());

    let generated = provider.generate(&mut segments).await?;
    let run_id = Uuid::new_v4();

    match generated {
        GeneratedAudio::PerSegment => {
            for (idx, segment) in segments.iter_mut().enumerate() {
                let Some(audio) = segment.audio.as_deref() else {
                    return Err(Error::GenerationError(format!(
                        "Provider returned no audio for speaker {} (segment {})",
                        segment.speaker_id, idx
                    )));
                };
                let path = scratch_dir.join(format!(
                    "{}_{}_speaker{}.{}",
                    run_id,
                    idx,
                    segment.speaker_id,
                    audio_format.extension()
                ));
                std::fs::write(&path, audio)?;
                segment.audio_file = Some(path);
            }
            Ok((segments, None))
        }
        GeneratedAudio::Joint(blob) => {
            let path = scratch_dir.join(format!(
                "{}_full_audio.{}",
                run_id,
                audio_format.extension()
            ));
            std::fs::write(&path, blob)?;
            Ok((segments, Some(path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_speakers;
    use crate::providers::COMMON_SSML_TAGS;
    use async_trait::async_trait;

    struct PerSegmentStub;

    #[async_trait]
    impl SpeechProvider for PerSegmentStub {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn supported_tags(&self) -> &[&'static str] {
            COMMON_SSML_TAGS
        }

        async fn generate(&self, segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio> {
            for segment in segments.iter_mut() {
                segment.audio = Some(segment.text.clone().into_bytes());
            }
            Ok(GeneratedAudio::PerSegment)
        }
    }

    struct JointStub;

    #[async_trait]
    impl SpeechProvider for JointStub {
        fn name(&self) -> &'static str {
            "joint-stub"
        }

        async fn generate(&self, _segments: &mut [SpeakerSegment]) -> Result<GeneratedAudio> {
            Ok(GeneratedAudio::Joint(vec![1, 2, 3]))
        }
    }

    #[tokio::test]
    async fn per_segment_artifacts_are_namespaced_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let (segments, joint) = assemble(
            &PerSegmentStub,
            "<person1>Hi</person1><person2>Hello</person2>",
            &default_speakers(),
            dir.path(),
            AudioFormat::Wav,
        )
        .await
        .unwrap();

        assert!(joint.is_none());
        assert_eq!(segments.len(), 2);
        for (idx, segment) in segments.iter().enumerate() {
            let path = segment.audio_file.as_ref().unwrap();
            let name = path.file_name().unwrap().to_str().unwrap();
            assert!(name.contains(&format!("_{}_speaker{}", idx, segment.speaker_id)));
            assert_eq!(
                std::fs::read(path).unwrap(),
                segment.text.as_bytes().to_vec()
            );
        }
    }

    #[tokio::test]
    async fn joint_blob_lands_in_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (segments, joint) = assemble(
            &JointStub,
            "<person1>Hi</person1>",
            &default_speakers(),
            dir.path(),
            AudioFormat::Wav,
        )
        .await
        .unwrap();

        let joint = joint.unwrap();
        assert!(joint
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("_full_audio.wav"));
        assert_eq!(std::fs::read(&joint).unwrap(), vec![1, 2, 3]);
        assert!(segments[0].audio.is_none());
        assert!(segments[0].audio_file.is_none());
    }

    #[tokio::test]
    async fn two_runs_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let text = "<person1>Hi</person1>";
        let (a, _) = assemble(
            &PerSegmentStub,
            text,
            &default_speakers(),
            dir.path(),
            AudioFormat::Wav,
        )
        .await
        .unwrap();
        let (b, _) = assemble(
            &PerSegmentStub,
            text,
            &default_speakers(),
            dir.path(),
            AudioFormat::Wav,
        )
        .await
        .unwrap();
        assert_ne!(a[0].audio_file, b[0].audio_file);
    }
}
