//! Process-wide synthesis runtime.
//!
//! One worker thread owns the analyzer and the pipeline; the public functions
//! send it commands and wait for the reply, which serialises concurrent callers.
//! The analyzer is opened once per process and survives [`shutdown`].

use crate::analyzer::{AnalyzerBackend, InitOutcome, LinguisticAnalyzer};
use crate::audio::save_wav;
use crate::constants::SAMPLE_RATE;
use crate::error::{Result, SynthesisError};
use crate::models::ModelBackends;
use crate::pipeline::SynthesisPipeline;
use crate::vocab::PhonemeSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, OnceLock};
use std::thread;
use tracing::{debug, error, info};

fn default_dictionary_dir() -> PathBuf {
    PathBuf::from("./open_jtalk_dic_utf_8-1.11")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub dictionary_dir: PathBuf,
    pub phoneme_set: PhonemeSet,
    pub speaker_id: i64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dictionary_dir: default_dictionary_dir(),
            phoneme_set: PhonemeSet::default(),
            speaker_id: 0,
        }
    }
}

impl RuntimeConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            SynthesisError::InvalidConfig(format!("cannot read {}: {}", path.display(), err))
        })?;
        serde_json::from_str(&text)
            .map_err(|err| SynthesisError::InvalidConfig(format!("{}: {}", path.display(), err)))
    }
}

/// Collaborators handed to [`init`].
pub struct Backends {
    pub analyzer: Box<dyn AnalyzerBackend>,
    pub models: ModelBackends,
}

impl Backends {
    /// Disabled analyzer and models; only useful with label input and for tests.
    pub fn disabled() -> Self {
        Self {
            analyzer: Box::new(crate::analyzer::DisabledAnalyzer),
            models: ModelBackends::disabled(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum SynthesisInput {
    Text(String),
    /// Full-context labels, one per phoneme; skips the analyzer.
    Labels(Vec<String>),
}

#[derive(Clone, Debug)]
pub struct SynthesisRequest {
    pub input: SynthesisInput,
    /// Overrides the configured speaker.
    pub speaker: Option<i64>,
}

impl SynthesisRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            input: SynthesisInput::Text(text.into()),
            speaker: None,
        }
    }

    pub fn labels(labels: Vec<String>) -> Self {
        Self {
            input: SynthesisInput::Labels(labels),
            speaker: None,
        }
    }

    pub fn with_speaker(mut self, speaker: i64) -> Self {
        self.speaker = Some(speaker);
        self
    }
}

#[derive(Clone, Debug)]
pub struct SynthesisResult {
    pub audio: Vec<f32>,
    pub sample_rate: u32,
}

impl SynthesisResult {
    pub fn duration_secs(&self) -> f32 {
        self.audio.len() as f32 / self.sample_rate as f32
    }
}

#[derive(Clone, Debug)]
pub struct RuntimeStatus {
    pub initialized: bool,
    pub analyzer_open: bool,
    pub dictionary_dir: Option<PathBuf>,
    pub phoneme_set: Option<PhonemeSet>,
    pub speaker_id: Option<i64>,
}

type Reply<T> = mpsc::Sender<Result<T>>;

enum RuntimeCommand {
    Init {
        config: RuntimeConfig,
        backends: Backends,
        reply: Reply<InitOutcome>,
    },
    Synthesize {
        request: SynthesisRequest,
        reply: Reply<SynthesisResult>,
    },
    SynthesizeToFile {
        request: SynthesisRequest,
        path: PathBuf,
        reply: Reply<SynthesisResult>,
    },
    Status {
        reply: Reply<RuntimeStatus>,
    },
    Reset {
        reply: Reply<()>,
    },
}

#[derive(Default)]
struct RuntimeWorker {
    config: Option<RuntimeConfig>,
    pipeline: Option<SynthesisPipeline>,
    analyzer: Option<LinguisticAnalyzer>,
}

impl RuntimeWorker {
    fn init(&mut self, config: RuntimeConfig, backends: Backends) -> Result<InitOutcome> {
        let outcome = match self.analyzer.as_mut() {
            Some(analyzer) => analyzer.open(&config.dictionary_dir)?,
            None => {
                let mut analyzer = LinguisticAnalyzer::new(backends.analyzer);
                let outcome = analyzer.open(&config.dictionary_dir)?;
                self.analyzer = Some(analyzer);
                outcome
            }
        };

        self.pipeline = Some(SynthesisPipeline::new(backends.models, config.phoneme_set));
        info!(
            phoneme_set = ?config.phoneme_set,
            speaker = config.speaker_id,
            ?outcome,
            "runtime initialized"
        );
        self.config = Some(config);
        Ok(outcome)
    }

    fn synthesize(&mut self, request: SynthesisRequest) -> Result<SynthesisResult> {
        let config = self.config.as_ref().ok_or(SynthesisError::NotInitialized)?;
        let pipeline = self.pipeline.as_mut().ok_or(SynthesisError::NotInitialized)?;
        let speaker = request.speaker.unwrap_or(config.speaker_id);

        let labels = match request.input {
            SynthesisInput::Text(text) => self
                .analyzer
                .as_mut()
                .ok_or(SynthesisError::NotInitialized)?
                .extract_labels(&text)?,
            SynthesisInput::Labels(labels) => labels,
        };
        debug!(labels = labels.len(), speaker, "synthesizing");

        let audio = pipeline.forward(&labels, speaker)?;
        Ok(SynthesisResult {
            audio,
            sample_rate: SAMPLE_RATE,
        })
    }

    fn synthesize_to_file(
        &mut self,
        request: SynthesisRequest,
        path: &Path,
    ) -> Result<SynthesisResult> {
        let result = self.synthesize(request)?;
        save_wav(&result.audio, path, result.sample_rate)?;
        Ok(result)
    }

    fn reset(&mut self) {
        self.config = None;
        self.pipeline = None;
    }

    fn status(&self) -> RuntimeStatus {
        let config = self.config.as_ref();
        RuntimeStatus {
            initialized: self.pipeline.is_some(),
            analyzer_open: self.analyzer.as_ref().is_some_and(LinguisticAnalyzer::is_open),
            dictionary_dir: config.map(|cfg| cfg.dictionary_dir.clone()),
            phoneme_set: config.map(|cfg| cfg.phoneme_set),
            speaker_id: config.map(|cfg| cfg.speaker_id),
        }
    }
}

fn logged<T>(what: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        error!("{} failed: {}", what, err);
    }
    result
}

struct RuntimeHandle {
    tx: mpsc::Sender<RuntimeCommand>,
}

impl RuntimeHandle {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<RuntimeCommand>();
        thread::spawn(move || {
            let mut worker = RuntimeWorker::default();
            for command in rx {
                match command {
                    RuntimeCommand::Init {
                        config,
                        backends,
                        reply,
                    } => {
                        let _ = reply.send(logged("Init", worker.init(config, backends)));
                    }
                    RuntimeCommand::Synthesize { request, reply } => {
                        let _ = reply.send(logged("Synthesize", worker.synthesize(request)));
                    }
                    RuntimeCommand::SynthesizeToFile {
                        request,
                        path,
                        reply,
                    } => {
                        let result = worker.synthesize_to_file(request, &path);
                        let _ = reply.send(logged("Synthesize to file", result));
                    }
                    RuntimeCommand::Status { reply } => {
                        let _ = reply.send(Ok(worker.status()));
                    }
                    RuntimeCommand::Reset { reply } => {
                        worker.reset();
                        let _ = reply.send(Ok(()));
                    }
                }
            }
        });
        Self { tx }
    }

    fn request<T>(&self, command: impl FnOnce(Reply<T>) -> RuntimeCommand) -> Result<T> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(command(reply_tx))
            .map_err(|_| SynthesisError::RuntimeStopped)?;
        reply_rx.recv().map_err(|_| SynthesisError::RuntimeStopped)?
    }
}

static RUNTIME: OnceLock<RuntimeHandle> = OnceLock::new();

fn runtime_handle() -> &'static RuntimeHandle {
    RUNTIME.get_or_init(RuntimeHandle::spawn)
}

/// Configure the runtime. The analyzer backend is only used by the first
/// successful call in the process; models and config are replaced every time.
pub fn init(config: RuntimeConfig, backends: Backends) -> Result<InitOutcome> {
    runtime_handle().request(|reply| RuntimeCommand::Init {
        config,
        backends,
        reply,
    })
}

pub fn synthesize(request: SynthesisRequest) -> Result<SynthesisResult> {
    runtime_handle().request(|reply| RuntimeCommand::Synthesize { request, reply })
}

/// Synthesize and commit the result to a WAV file at `path`.
pub fn synthesize_to_file(
    request: SynthesisRequest,
    path: impl Into<PathBuf>,
) -> Result<SynthesisResult> {
    let path = path.into();
    runtime_handle().request(|reply| RuntimeCommand::SynthesizeToFile {
        request,
        path,
        reply,
    })
}

pub fn status() -> Result<RuntimeStatus> {
    runtime_handle().request(|reply| RuntimeCommand::Status { reply })
}

/// Drop the pipeline and config. The analyzer stays open.
pub fn shutdown() -> Result<()> {
    runtime_handle().request(|reply| RuntimeCommand::Reset { reply })
}
