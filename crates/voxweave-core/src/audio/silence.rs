//! Silence-based clip splitting
//!
//! Frame-level port of the classic pydub contract: frames quieter than
//! the threshold for at least `min_silence_len_ms` split the clip, and
//! each resulting chunk keeps up to `keep_silence_ms` of padding at its
//! edges.

use super::AudioClip;

/// Split `clip` wherever it stays below `silence_thresh_db` (dBFS,
/// full scale 1.0) for at least `min_silence_len_ms`.
///
/// Returns the non-silent chunks in order, each padded with up to
/// `keep_silence_ms` of the surrounding silence. A clip with no
/// qualifying silent stretch comes back whole; an entirely silent clip
/// yields no chunks.
pub fn split_on_silence(
    clip: &AudioClip,
    min_silence_len_ms: u64,
    silence_thresh_db: f32,
    keep_silence_ms: u64,
) -> Vec<AudioClip> {
    let total_ms = clip.duration_ms();
    if total_ms == 0 {
        return Vec::new();
    }
    if total_ms < min_silence_len_ms {
        return vec![clip.clone()];
    }

    let silent = frame_silence_map(clip, silence_thresh_db);
    let silent_ranges = silent_runs(&silent, min_silence_len_ms);

    if silent_ranges.is_empty() {
        return vec![clip.clone()];
    }

    let mut chunks = Vec::new();
    let mut cursor = 0u64;
    for &(start, end) in &silent_ranges {
        if start > cursor {
            let chunk_start = cursor.saturating_sub(keep_silence_ms);
            let chunk_end = (start + keep_silence_ms).min(total_ms);
            chunks.push(clip.slice_ms(chunk_start, chunk_end));
        }
        cursor = end;
    }
    if cursor < total_ms {
        let chunk_start = cursor.saturating_sub(keep_silence_ms);
        chunks.push(clip.slice_ms(chunk_start, total_ms));
    }

    chunks
}

/// Per-millisecond silence flags.
fn frame_silence_map(clip: &AudioClip, silence_thresh_db: f32) -> Vec<bool> {
    let total_ms = clip.duration_ms();
    let threshold_amplitude = 10f32.powf(silence_thresh_db / 20.0);
    let samples = clip.samples();
    let channels = clip.channels() as usize;
    let rate = clip.sample_rate() as usize;

    (0..total_ms)
        .map(|ms| {
            let start = (ms as usize * rate / 1000) * channels;
            let end = (((ms + 1) as usize * rate / 1000) * channels).min(samples.len());
            if start >= end {
                return true;
            }
            let frame = &samples[start..end];
            let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
            let rms = (sum_sq / frame.len() as f64).sqrt() as f32;
            rms < threshold_amplitude
        })
        .collect()
}

/// Maximal runs of silent frames at least `min_len` ms long, as
/// `(start_ms, end_ms)` half-open ranges.
fn silent_runs(silent: &[bool], min_len: u64) -> Vec<(u64, u64)> {
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, &is_silent) in silent.iter().enumerate() {
        match (is_silent, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                if (i - start) as u64 >= min_len {
                    runs.push((start as u64, i as u64));
                }
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        let end = silent.len();
        if (end - start) as u64 >= min_len {
            runs.push((start as u64, end as u64));
        }
    }

    runs
}
