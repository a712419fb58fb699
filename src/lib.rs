//! Japanese speech synthesis from full-context labels.
//!
//! Labels from a linguistic analyzer are rebuilt into a mora / accent phrase /
//! breath group hierarchy, re-annotated, and driven through duration, pitch
//! and waveform models to produce 16-bit mono WAV output.

pub mod analyzer;
pub mod annotation;
mod audio;
pub mod error;
pub mod features;
pub mod hierarchy;
pub mod label;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod replay;
pub mod runtime;
pub mod vocab;

pub use analyzer::{AnalyzerBackend, DisabledAnalyzer, InitOutcome, LinguisticAnalyzer};
pub use annotation::annotate_labels;
pub use audio::{save_wav, write_wav};
pub use error::{ModelStage, Result, SynthesisError};
pub use hierarchy::{AccentPhrase, BreathGroup, Mora, Utterance};
pub use label::{ContextLabel, FieldKey};
pub use models::{DisabledModel, DurationModel, ModelBackends, PitchInput, PitchModel, WaveDecoder};
pub use pipeline::{PipelineTrace, SynthesisPipeline};
pub use preprocessing::ResamplePhase;
pub use replay::{Recording, ReplayModels};
pub use runtime::{
    init, shutdown, status, synthesize, synthesize_to_file, Backends, RuntimeConfig,
    RuntimeStatus, SynthesisInput, SynthesisRequest, SynthesisResult,
};
pub use vocab::{PhonemeSet, Vocab};

/// Rates shared by the models.
pub mod constants {
    /// Output sample rate in Hz.
    pub const SAMPLE_RATE: u32 = 24000;
    /// Waveform samples per vocoder frame.
    pub const SAMPLES_PER_FRAME: usize = 256;
    /// Internal control rate for durations and frame expansion, in Hz.
    pub const CONTROL_RATE: f32 = 200.0;
    /// Vocoder frame rate, 93.75 Hz.
    pub const VOCODER_FRAME_RATE: f64 = SAMPLE_RATE as f64 / SAMPLES_PER_FRAME as f64;
}
