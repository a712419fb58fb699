//! Interfaces to the three neural stages.
//!
//! The pipeline only talks to these traits; backends return `anyhow` errors
//! and the pipeline attaches the failing stage.

use anyhow::Result;

/// Per-mora inputs to the pitch model.
///
/// All slices have one entry per mora. `consonant_ids` uses `-1` for moras
/// without a consonant.
#[derive(Debug, Clone, Copy)]
pub struct PitchInput<'a> {
    pub vowel_ids: &'a [i64],
    pub consonant_ids: &'a [i64],
    pub start_accent: &'a [bool],
    pub end_accent: &'a [bool],
    pub start_accent_phrase: &'a [bool],
    pub end_accent_phrase: &'a [bool],
}

impl PitchInput<'_> {
    pub fn len(&self) -> usize {
        self.vowel_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vowel_ids.is_empty()
    }
}

pub trait DurationModel: Send {
    /// Seconds per phoneme.
    fn predict(&mut self, phoneme_ids: &[i64], speaker: i64) -> Result<Vec<f32>>;
}

pub trait PitchModel: Send {
    /// One pitch value per mora.
    fn predict(&mut self, input: PitchInput<'_>, speaker: i64) -> Result<Vec<f32>>;
}

pub trait WaveDecoder: Send {
    /// `one_hot` is row-major `[frames, vocab_size]`; `pitch` has `frames` entries.
    fn decode(
        &mut self,
        pitch: &[f32],
        one_hot: &[f32],
        vocab_size: usize,
        speaker: i64,
    ) -> Result<Vec<f32>>;
}

/// The three model stages handed to a pipeline.
pub struct ModelBackends {
    pub duration: Box<dyn DurationModel>,
    pub pitch: Box<dyn PitchModel>,
    pub decoder: Box<dyn WaveDecoder>,
}

impl ModelBackends {
    pub fn disabled() -> Self {
        Self {
            duration: Box::new(DisabledModel),
            pitch: Box::new(DisabledModel),
            decoder: Box::new(DisabledModel),
        }
    }
}

/// Backend used when no model runtime is configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledModel;

const DISABLED: &str = "no model backend configured; pass a replay recording";

impl DurationModel for DisabledModel {
    fn predict(&mut self, _phoneme_ids: &[i64], _speaker: i64) -> Result<Vec<f32>> {
        anyhow::bail!(DISABLED)
    }
}

impl PitchModel for DisabledModel {
    fn predict(&mut self, _input: PitchInput<'_>, _speaker: i64) -> Result<Vec<f32>> {
        anyhow::bail!(DISABLED)
    }
}

impl WaveDecoder for DisabledModel {
    fn decode(
        &mut self,
        _pitch: &[f32],
        _one_hot: &[f32],
        _vocab_size: usize,
        _speaker: i64,
    ) -> Result<Vec<f32>> {
        anyhow::bail!(DISABLED)
    }
}
