//! Model backend that replays recorded stage outputs.
//!
//! A recording holds what a reference engine produced for one utterance.
//! When the recording also carries the inputs the reference engine saw, each
//! stage verifies that this pipeline fed it the same ids.

use crate::error::{Result, SynthesisError};
use crate::models::{DurationModel, ModelBackends, PitchInput, PitchModel, WaveDecoder};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub durations: Vec<f32>,
    pub pitch: Vec<f32>,
    pub audio: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phoneme_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vowel_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consonant_ids: Option<Vec<i64>>,
}

/// Replays one [`Recording`] through all three model traits.
#[derive(Debug, Clone)]
pub struct ReplayModels {
    recording: Arc<Recording>,
}

impl ReplayModels {
    pub fn new(recording: Recording) -> Self {
        Self {
            recording: Arc::new(recording),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| SynthesisError::io(path, err))?;
        let recording: Recording = serde_json::from_str(&text).map_err(|err| {
            SynthesisError::InvalidConfig(format!("replay recording {}: {}", path.display(), err))
        })?;
        Ok(Self::new(recording))
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn into_backends(self) -> ModelBackends {
        ModelBackends {
            duration: Box::new(self.clone()),
            pitch: Box::new(self.clone()),
            decoder: Box::new(self),
        }
    }
}

/// Index of the first position where `got` and `expected` differ, if any.
fn first_mismatch<T: PartialEq>(got: &[T], expected: &[T]) -> Option<usize> {
    got.iter()
        .zip(expected)
        .position(|(g, e)| g != e)
        .or_else(|| (got.len() != expected.len()).then_some(got.len().min(expected.len())))
}

fn verify<T: PartialEq + Debug>(
    what: &str,
    got: &[T],
    expected: Option<&[T]>,
) -> anyhow::Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    if let Some(index) = first_mismatch(got, expected) {
        anyhow::bail!(
            "{} differ from recording at index {}: got {:?}, recorded {:?} ({} vs {} values)",
            what,
            index,
            got.get(index),
            expected.get(index),
            got.len(),
            expected.len()
        );
    }
    Ok(())
}

impl DurationModel for ReplayModels {
    fn predict(&mut self, phoneme_ids: &[i64], _speaker: i64) -> anyhow::Result<Vec<f32>> {
        verify("phoneme ids", phoneme_ids, self.recording.phoneme_ids.as_deref())?;
        Ok(self.recording.durations.clone())
    }
}

impl PitchModel for ReplayModels {
    fn predict(&mut self, input: PitchInput<'_>, _speaker: i64) -> anyhow::Result<Vec<f32>> {
        verify("vowel ids", input.vowel_ids, self.recording.vowel_ids.as_deref())?;
        verify("consonant ids", input.consonant_ids, self.recording.consonant_ids.as_deref())?;
        Ok(self.recording.pitch.clone())
    }
}

impl WaveDecoder for ReplayModels {
    fn decode(
        &mut self,
        _pitch: &[f32],
        _one_hot: &[f32],
        _vocab_size: usize,
        _speaker: i64,
    ) -> anyhow::Result<Vec<f32>> {
        Ok(self.recording.audio.clone())
    }
}
