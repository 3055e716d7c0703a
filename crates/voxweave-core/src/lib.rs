//! Voxweave Core - Transcript-to-Audio Conversion
//!
//! This crate turns speaker-tagged transcript text into a single merged
//! audio track by dispatching turns to external TTS vendor APIs.
//!
//! # Architecture
//!
//! The pipeline runs parser -> provider adapter -> merge engine:
//! - Markup parsing of `<personN>` turns with per-segment voice config
//! - A uniform provider contract with per-segment and joint
//!   multi-speaker capability shapes
//! - Silence-based emote trimming, RMS loudness normalization,
//!   sequential concatenation and timing computation
//!
//! # Example
//!
//! ```ignore
//! use voxweave_core::{TextToSpeech, TtsConfig};
//!
//! let config = TtsConfig::default();
//! let tts = TextToSpeech::new("elevenlabs", config)?;
//!
//! let (transcript, audio) = tts
//!     .convert_to_speech("<person1>Hello!</person1>", None, None, false)
//!     .await?;
//! ```

pub mod assembler;
pub mod audio;
pub mod config;
pub mod error;
pub mod markup;
pub mod narration;
pub mod providers;
pub mod retry;
pub mod segment;
pub mod tts;

pub use audio::AudioClip;
pub use config::{default_speakers, AudioFormat, SpeakerConfig, TtsConfig};
pub use error::{Error, Result};
pub use providers::{create_provider, GeneratedAudio, SpeechProvider};
pub use segment::SpeakerSegment;
pub use tts::TextToSpeech;
