//! In-memory audio clip
//!
//! Interleaved f32 PCM with a sample rate and channel count. Vendor
//! responses are decoded into clips (hound for WAV, symphonia for
//! compressed containers); the merge engine works on clips and exports
//! the combined result as 16-bit WAV.

use std::io::Cursor;
use std::path::Path;

use hound::{WavSpec, WavWriter};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(Error::AudioError(format!(
                "Invalid clip spec: {} Hz, {} channels",
                sample_rate, channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// A mono clip of silence.
    pub fn silent(duration_ms: u64, sample_rate: u32) -> Self {
        let len = (duration_ms as usize * sample_rate as usize) / 1000;
        Self {
            samples: vec![0.0; len],
            sample_rate,
            channels: 1,
        }
    }

    /// Decode audio bytes, sniffing the container.
    ///
    /// WAV goes through hound; everything else (notably the MP3 most
    /// vendors return) through symphonia.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match Self::from_wav_bytes(bytes) {
            Ok(clip) => Ok(clip),
            Err(_) => decode_compressed(bytes),
        }
    }

    /// Decode a WAV payload.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .filter_map(|s| s.ok())
                    .map(|s| s as f32 / max_val)
                    .collect()
            }
            hound::SampleFormat::Float => reader.samples::<f32>().filter_map(|s| s.ok()).collect(),
        };

        Self::new(samples, spec.sample_rate, spec.channels)
    }

    /// Load a clip from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let clip = Self::from_bytes(&bytes)?;
        debug!(
            "Loaded {:?}: {} ms at {} Hz",
            path,
            clip.duration_ms(),
            clip.sample_rate
        );
        Ok(clip)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Clip length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }

    /// Root-mean-square amplitude over all samples, full scale 1.0.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / self.samples.len() as f64).sqrt() as f32
    }

    /// Loudness relative to full scale, in dB. Silence is `-inf`.
    pub fn dbfs(&self) -> f32 {
        let rms = self.rms();
        if rms <= 0.0 {
            f32::NEG_INFINITY
        } else {
            20.0 * rms.log10()
        }
    }

    /// A copy with `gain_db` applied.
    pub fn apply_gain(&self, gain_db: f32) -> Self {
        let factor = 10f32.powf(gain_db / 20.0);
        Self {
            samples: self.samples.iter().map(|&s| s * factor).collect(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Append another clip. Both clips must share a spec; one vendor
    /// run produces one format, so a mismatch is a hard error.
    pub fn append(&mut self, other: &AudioClip) -> Result<()> {
        if other.sample_rate != self.sample_rate || other.channels != self.channels {
            return Err(Error::AudioError(format!(
                "Clip spec mismatch: {} Hz/{}ch vs {} Hz/{}ch",
                self.sample_rate, self.channels, other.sample_rate, other.channels
            )));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Concatenate clips in order.
    pub fn concat(clips: &[AudioClip]) -> Result<Self> {
        let mut iter = clips.iter();
        let mut combined = iter
            .next()
            .ok_or_else(|| Error::AudioError("No clips to concatenate".to_string()))?
            .clone();
        for clip in iter {
            combined.append(clip)?;
        }
        Ok(combined)
    }

    /// Sub-clip covering `[start_ms, end_ms)`, clamped to the clip.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> Self {
        let start = self.sample_index(start_ms).min(self.samples.len());
        let end = self.sample_index(end_ms).min(self.samples.len());
        Self {
            samples: self.samples[start..end.max(start)].to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    fn sample_index(&self, ms: u64) -> usize {
        (ms as usize * self.sample_rate as usize / 1000) * self.channels as usize
    }

    /// Encode as 16-bit PCM WAV.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut buffer, spec)?;
            for &sample in &self.samples {
                let sample_i16 = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                writer.write_sample(sample_i16)?;
            }
            writer.finalize()?;
        }

        Ok(buffer.into_inner())
    }

    /// Write the clip to `path` as WAV.
    pub fn export(&self, path: &Path) -> Result<()> {
        let bytes = self.to_wav_bytes()?;
        std::fs::write(path, bytes)?;
        debug!("Exported {} ms to {:?}", self.duration_ms(), path);
        Ok(())
    }
}

fn decode_compressed(bytes: &[u8]) -> Result<AudioClip> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(bytes.to_vec())),
        Default::default(),
    );
    let probed = symphonia::default::get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| Error::AudioError("No audio track in payload".to_string()))?;
    let track_id = track.id;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(1);

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_buf.is_none() {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count() as u16;
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = &mut sample_buf {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            // A corrupt frame is recoverable; skip it
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    AudioClip::new(samples, sample_rate, channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(duration_ms: u64, amplitude: f32) -> AudioClip {
        let rate = 8000;
        let len = duration_ms as usize * rate / 1000;
        AudioClip::new(vec![amplitude; len], rate as u32, 1).unwrap()
    }

    #[test]
    fn duration_and_rms() {
        let clip = constant(1500, 0.5);
        assert_eq!(clip.duration_ms(), 1500);
        assert!((clip.rms() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn gain_scales_rms() {
        let clip = constant(100, 0.25);
        let louder = clip.apply_gain(6.0);
        let ratio = louder.rms() / clip.rms();
        assert!((ratio - 10f32.powf(0.3)).abs() < 1e-3);
        // 0 dB is a no-op
        assert_eq!(clip.apply_gain(0.0).samples(), clip.samples());
    }

    #[test]
    fn concat_preserves_order_and_length() {
        let a = constant(400, 0.1);
        let b = constant(600, 0.9);
        let combined = AudioClip::concat(&[a.clone(), b]).unwrap();
        assert_eq!(combined.duration_ms(), 1000);
        // the first 400 ms are still the quiet clip
        assert!((combined.slice_ms(0, 400).rms() - 0.1).abs() < 1e-6);
        assert!((combined.slice_ms(400, 1000).rms() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn append_rejects_spec_mismatch() {
        let mut a = constant(100, 0.1);
        let b = AudioClip::new(vec![0.0; 160], 16000, 1).unwrap();
        assert!(a.append(&b).is_err());
    }

    #[test]
    fn wav_round_trip() {
        let clip = constant(250, 0.5);
        let bytes = clip.to_wav_bytes().unwrap();
        let decoded = AudioClip::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.duration_ms(), 250);
        assert_eq!(decoded.sample_rate(), 8000);
        assert!((decoded.rms() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn slice_clamps_to_bounds() {
        let clip = constant(500, 0.5);
        assert_eq!(clip.slice_ms(400, 10_000).duration_ms(), 100);
        assert!(clip.slice_ms(600, 700).is_empty());
    }

    #[test]
    fn silent_clip_has_zero_rms() {
        let clip = AudioClip::silent(1000, 8000);
        assert_eq!(clip.duration_ms(), 1000);
        assert_eq!(clip.rms(), 0.0);
        assert_eq!(clip.dbfs(), f32::NEG_INFINITY);
    }
}
