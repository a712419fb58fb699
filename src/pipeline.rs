//! Acoustic pipeline: labels in, waveform samples out.
//!
//! Stages run strictly in order:
//! - re-annotate the labels and derive accent flags
//! - duration model, quantized to the control rate
//! - mora split and pitch model, unvoiced moras zeroed
//! - frame expansion at the control rate, one-hot encoding
//! - shared-phase resampling to the vocoder frame rate
//! - waveform decoder

use crate::annotation::annotate_labels;
use crate::constants::{CONTROL_RATE, SAMPLES_PER_FRAME, VOCODER_FRAME_RATE};
use crate::error::{ModelStage, Result, SynthesisError};
use crate::features::{
    quantize_durations, zero_unvoiced_pitch, AccentConvention, AccentFlags, MoraSplit,
};
use crate::label::ContextLabel;
use crate::models::{DurationModel, ModelBackends, PitchInput, PitchModel, WaveDecoder};
use crate::preprocessing::{expand_frames, one_hot, resample, resample_rows, ResamplePhase};
use crate::vocab::{normalize_boundaries, PhonemeSet, Vocab};
use ndarray::Array2;
use tracing::{debug, info, warn};

/// Every intermediate produced by one synthesis run.
#[derive(Debug, Clone)]
pub struct PipelineTrace {
    pub labels: Vec<ContextLabel>,
    pub phonemes: Vec<String>,
    pub phoneme_ids: Vec<i64>,
    pub flags: AccentFlags,
    pub durations: Vec<f32>,
    pub moras: MoraSplit,
    pub mora_durations: Vec<f32>,
    pub pitch: Vec<f32>,
    /// Frames at the control rate.
    pub frame_count: usize,
    pub phase: ResamplePhase,
    pub resampled_pitch: Vec<f32>,
    /// `[frames, vocab width]` at the vocoder frame rate.
    pub resampled_one_hot: Array2<f32>,
    pub audio: Vec<f32>,
}

pub struct SynthesisPipeline {
    duration: Box<dyn DurationModel>,
    pitch: Box<dyn PitchModel>,
    decoder: Box<dyn WaveDecoder>,
    vocab: Vocab,
}

impl SynthesisPipeline {
    pub fn new(models: ModelBackends, phoneme_set: PhonemeSet) -> Self {
        Self {
            duration: models.duration,
            pitch: models.pitch,
            decoder: models.decoder,
            vocab: Vocab::new(phoneme_set),
        }
    }

    /// Pipeline whose model stages always fail.
    pub fn disabled(phoneme_set: PhonemeSet) -> Self {
        Self::new(ModelBackends::disabled(), phoneme_set)
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Parse, re-annotate and flatten labels without running any model.
    pub fn prepare<S: AsRef<str>>(labels: &[S]) -> Result<Vec<ContextLabel>> {
        annotate_labels(labels)
    }

    /// Run the full pipeline with a fresh resampling phase.
    pub fn forward<S: AsRef<str>>(&mut self, labels: &[S], speaker: i64) -> Result<Vec<f32>> {
        let phase = ResamplePhase::draw(&mut rand::thread_rng());
        Ok(self.forward_trace(labels, speaker, phase)?.audio)
    }

    /// Run the full pipeline with a caller-supplied resampling phase and keep
    /// every intermediate.
    pub fn forward_trace<S: AsRef<str>>(
        &mut self,
        labels: &[S],
        speaker: i64,
        phase: ResamplePhase,
    ) -> Result<PipelineTrace> {
        let labels = Self::prepare(labels)?;
        for label in &labels {
            debug!("{}", label);
        }

        let convention = AccentConvention::detect(&labels);
        let flags = AccentFlags::from_labels(&labels, convention);

        let mut phonemes: Vec<String> = labels.iter().map(|l| l.phoneme().to_string()).collect();
        normalize_boundaries(&mut phonemes);
        let phoneme_ids = self.vocab.encode(&phonemes)?;
        debug!(?convention, phonemes = phoneme_ids.len(), "encoded phonemes");

        let mut durations = self
            .duration
            .predict(&phoneme_ids, speaker)
            .map_err(|err| SynthesisError::model(ModelStage::Duration, err))?;
        expect_len(ModelStage::Duration, durations.len(), phoneme_ids.len(), "phonemes")?;
        quantize_durations(&mut durations, CONTROL_RATE);
        info!(phonemes = durations.len(), "duration ok");

        let moras = MoraSplit::from_symbols(&phonemes)?;
        let mora_durations = moras.mora_durations(&durations);
        let (vowel_ids, consonant_ids) = moras.model_ids(&phoneme_ids);
        let mora_flags = flags.select(&moras.vowel_indices);
        let input = PitchInput {
            vowel_ids: &vowel_ids,
            consonant_ids: &consonant_ids,
            start_accent: &mora_flags.start_accent,
            end_accent: &mora_flags.end_accent,
            start_accent_phrase: &mora_flags.start_accent_phrase,
            end_accent_phrase: &mora_flags.end_accent_phrase,
        };
        let mut pitch = self
            .pitch
            .predict(input, speaker)
            .map_err(|err| SynthesisError::model(ModelStage::Pitch, err))?;
        expect_len(ModelStage::Pitch, pitch.len(), moras.mora_count(), "moras")?;
        let vowel_symbols: Vec<&str> = moras
            .vowel_indices
            .iter()
            .map(|&i| phonemes[i].as_str())
            .collect();
        zero_unvoiced_pitch(&mut pitch, &vowel_symbols);
        info!(moras = pitch.len(), "pitch ok");

        let (frame_ids, frame_pitch) =
            expand_frames(&phoneme_ids, &durations, &pitch, &mora_durations, CONTROL_RATE)?;
        let frame_count = frame_ids.len();
        let encoded = one_hot(&frame_ids, self.vocab.width())?;
        let control_rate = f64::from(CONTROL_RATE);
        let resampled_pitch = resample(&frame_pitch, control_rate, VOCODER_FRAME_RATE, phase);
        let resampled_one_hot = resample_rows(&encoded, control_rate, VOCODER_FRAME_RATE, phase);
        debug!(
            frames = frame_count,
            resampled = resampled_pitch.len(),
            phase = phase.value(),
            "frames ok"
        );

        let flat: Vec<f32> = resampled_one_hot.iter().copied().collect();
        let audio = self
            .decoder
            .decode(&resampled_pitch, &flat, self.vocab.width(), speaker)
            .map_err(|err| SynthesisError::model(ModelStage::Decoder, err))?;
        let expected = resampled_pitch.len() * SAMPLES_PER_FRAME;
        if audio.len() != expected {
            warn!(
                samples = audio.len(),
                expected, "decoder output length differs from frame count"
            );
        }
        info!(samples = audio.len(), "decode ok");

        Ok(PipelineTrace {
            labels,
            phonemes,
            phoneme_ids,
            flags,
            durations,
            moras,
            mora_durations,
            pitch,
            frame_count,
            phase,
            resampled_pitch,
            resampled_one_hot,
            audio,
        })
    }
}

fn expect_len(stage: ModelStage, got: usize, want: usize, unit: &str) -> Result<()> {
    if got == want {
        return Ok(());
    }
    Err(SynthesisError::ModelCallFailed {
        stage,
        message: format!("returned {} values for {} {}", got, want, unit),
    })
}
