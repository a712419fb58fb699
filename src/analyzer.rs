//! Linguistic analyzer: text to full-context labels.

use crate::error::{Result, SynthesisError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Text analysis backend producing one full-context label per phoneme.
pub trait AnalyzerBackend: Send {
    fn initialize(&mut self) -> anyhow::Result<()>;
    fn load(&mut self, dictionary_dir: &Path) -> anyhow::Result<()>;
    fn extract_labels(&mut self, text: &str) -> anyhow::Result<Vec<String>>;
}

/// Successful outcome of [`LinguisticAnalyzer::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized,
    /// The analyzer was already open; nothing was repeated.
    AlreadyInitialized,
}

/// Wraps a backend and enforces open-once semantics.
pub struct LinguisticAnalyzer {
    backend: Box<dyn AnalyzerBackend>,
    dictionary_dir: Option<PathBuf>,
}

impl LinguisticAnalyzer {
    pub fn new(backend: Box<dyn AnalyzerBackend>) -> Self {
        Self {
            backend,
            dictionary_dir: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Box::new(DisabledAnalyzer))
    }

    /// Initialize the backend and load its dictionary.
    ///
    /// Only the first successful call touches the backend. Later calls log a
    /// warning and report [`InitOutcome::AlreadyInitialized`].
    pub fn open(&mut self, dictionary_dir: &Path) -> Result<InitOutcome> {
        if let Some(current) = &self.dictionary_dir {
            warn!(
                current = %current.display(),
                requested = %dictionary_dir.display(),
                "linguistic analyzer already initialized; keeping existing dictionary"
            );
            return Ok(InitOutcome::AlreadyInitialized);
        }

        self.backend
            .initialize()
            .map_err(|err| SynthesisError::AnalyzerFailed(format!("initialize: {:#}", err)))?;
        self.backend.load(dictionary_dir).map_err(|err| {
            SynthesisError::AnalyzerFailed(format!(
                "load dictionary {}: {:#}",
                dictionary_dir.display(),
                err
            ))
        })?;
        debug!(dictionary = %dictionary_dir.display(), "linguistic analyzer ready");
        self.dictionary_dir = Some(dictionary_dir.to_path_buf());
        Ok(InitOutcome::Initialized)
    }

    pub fn is_open(&self) -> bool {
        self.dictionary_dir.is_some()
    }

    pub fn dictionary_dir(&self) -> Option<&Path> {
        self.dictionary_dir.as_deref()
    }

    pub fn extract_labels(&mut self, text: &str) -> Result<Vec<String>> {
        if !self.is_open() {
            return Err(SynthesisError::NotInitialized);
        }
        let labels = self
            .backend
            .extract_labels(text)
            .map_err(|err| SynthesisError::AnalyzerFailed(format!("{:#}", err)))?;
        if labels.is_empty() {
            return Err(SynthesisError::AnalyzerFailed(format!(
                "no labels produced for {:?}",
                text
            )));
        }
        debug!(count = labels.len(), "extracted labels");
        for label in &labels {
            debug!("{}", label);
        }
        Ok(labels)
    }
}

/// Backend used when no dictionary-based analyzer is linked in.
///
/// Opening succeeds so that label-file input keeps working; text analysis fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAnalyzer;

impl AnalyzerBackend for DisabledAnalyzer {
    fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn load(&mut self, _dictionary_dir: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    fn extract_labels(&mut self, _text: &str) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("text analysis backend is disabled; supply labels instead")
    }
}
