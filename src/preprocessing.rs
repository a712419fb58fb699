//! Frame alignment and resampling of the decoder's control streams.

use crate::error::{Result, SynthesisError};
use ndarray::{Array2, Axis};
use rand::Rng;

/// Sub-sample phase for [`resample_indices`], in `[0, 1)`.
///
/// Drawn once per synthesis request and passed to every resampled stream so
/// that the pitch and phoneme streams pick the same source frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResamplePhase(f32);

impl ResamplePhase {
    pub fn new(value: f32) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 1.0 - f32::EPSILON))
        } else {
            Self(0.0)
        }
    }

    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(0.0..1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

/// Number of `rate`-Hz frames covered by each duration (in seconds).
pub fn frame_counts(durations: &[f32], rate: f32) -> Vec<usize> {
    durations
        .iter()
        .map(|&d| (d * rate).round().max(0.0) as usize)
        .collect()
}

/// Repeat `values[i]` `counts[i]` times.
pub fn repeat_by_counts<T: Copy>(values: &[T], counts: &[usize]) -> Vec<T> {
    values
        .iter()
        .zip(counts)
        .flat_map(|(&value, &count)| std::iter::repeat(value).take(count))
        .collect()
}

/// Expand per-phoneme ids and per-mora pitch onto the same frame grid.
///
/// Fails if the two expansions disagree on the total frame count.
pub fn expand_frames(
    phoneme_ids: &[i64],
    phoneme_durations: &[f32],
    mora_pitch: &[f32],
    mora_durations: &[f32],
    rate: f32,
) -> Result<(Vec<i64>, Vec<f32>)> {
    let phoneme_frames = repeat_by_counts(phoneme_ids, &frame_counts(phoneme_durations, rate));
    let pitch_frames = repeat_by_counts(mora_pitch, &frame_counts(mora_durations, rate));
    if phoneme_frames.len() != pitch_frames.len() {
        return Err(SynthesisError::StructuralMismatch(format!(
            "phoneme frames ({}) and mora frames ({}) differ",
            phoneme_frames.len(),
            pitch_frames.len()
        )));
    }
    Ok((phoneme_frames, pitch_frames))
}

/// One-hot encode ids into a `[frames, width]` matrix.
pub fn one_hot(ids: &[i64], width: usize) -> Result<Array2<f32>> {
    let mut encoded = Array2::<f32>::zeros((ids.len(), width));
    for (row, &id) in ids.iter().enumerate() {
        let column = usize::try_from(id)
            .ok()
            .filter(|&c| c < width)
            .ok_or_else(|| {
                SynthesisError::StructuralMismatch(format!(
                    "phoneme id {} outside one-hot width {}",
                    id, width
                ))
            })?;
        encoded[[row, column]] = 1.0;
    }
    Ok(encoded)
}

/// Source frame index for every output frame when decimating `len` frames
/// from `rate` to `new_rate` by nearest-index sampling.
pub fn resample_indices(len: usize, rate: f64, new_rate: f64, phase: ResamplePhase) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let out_len = (len as f64 * new_rate / rate) as usize;
    let step = rate / new_rate;
    let offset = phase.value() as f64;
    (0..out_len)
        .map(|i| (((offset + i as f64) * step) as usize).min(len - 1))
        .collect()
}

pub fn resample<T: Copy>(values: &[T], rate: f64, new_rate: f64, phase: ResamplePhase) -> Vec<T> {
    resample_indices(values.len(), rate, new_rate, phase)
        .into_iter()
        .map(|i| values[i])
        .collect()
}

/// Resample the rows of a `[frames, width]` matrix.
pub fn resample_rows(
    frames: &Array2<f32>,
    rate: f64,
    new_rate: f64,
    phase: ResamplePhase,
) -> Array2<f32> {
    let indices = resample_indices(frames.nrows(), rate, new_rate, phase);
    frames.select(Axis(0), &indices)
}
