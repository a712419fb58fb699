//! Phonological hierarchy: mora → accent phrase → breath group → utterance.
//!
//! Accent phrases live in one arena owned by the [`Utterance`]; breath groups
//! refer to them by index range so neighbouring phrases can be rewritten by
//! index during re-annotation.

use crate::error::{Result, SynthesisError};
use crate::label::{field, ContextLabel, FieldKey};
use std::ops::Range;

/// `a2` value that ends mora scanning for the rest of an accent phrase.
pub const NO_MORA_SENTINEL: &str = "49";

/// One vowel with an optional preceding consonant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mora {
    pub consonant: Option<ContextLabel>,
    pub vowel: ContextLabel,
}

impl Mora {
    /// Phonemes in spoken order: consonant (if any), then vowel.
    pub fn phonemes(&self) -> impl Iterator<Item = &ContextLabel> {
        self.consonant.iter().chain(std::iter::once(&self.vowel))
    }

    pub(crate) fn set_context(&mut self, key: FieldKey, value: &str) {
        self.vowel.set(key, value);
        if let Some(consonant) = self.consonant.as_mut() {
            consonant.set(key, value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccentPhrase {
    pub(crate) moras: Vec<Mora>,
    pub(crate) accent: usize,
}

impl AccentPhrase {
    /// Group the phonemes of one accent phrase into moras.
    ///
    /// Moras are maximal runs of equal `a2`. A phoneme whose `a2` is `"49"`
    /// ends the phrase; it and everything after it are dropped.
    pub fn from_phonemes(phonemes: &[ContextLabel]) -> Result<Self> {
        let mut moras = Vec::new();
        let mut run: Vec<&ContextLabel> = Vec::with_capacity(2);

        for (i, phoneme) in phonemes.iter().enumerate() {
            if phoneme[field::A2] == NO_MORA_SENTINEL {
                break;
            }
            run.push(phoneme);

            let closes_run = phonemes
                .get(i + 1)
                .map_or(true, |next| next[field::A2] != phoneme[field::A2]);
            if closes_run {
                let mora = match run.as_slice() {
                    [vowel] => Mora {
                        consonant: None,
                        vowel: (*vowel).clone(),
                    },
                    [consonant, vowel] => Mora {
                        consonant: Some((*consonant).clone()),
                        vowel: (*vowel).clone(),
                    },
                    other => {
                        let symbols: Vec<&str> = other.iter().map(|p| p.phoneme()).collect();
                        return Err(SynthesisError::StructuralMismatch(format!(
                            "mora run of {} phonemes {:?} (expected 1 or 2)",
                            other.len(),
                            symbols
                        )));
                    }
                };
                moras.push(mora);
                run.clear();
            }
        }

        let first = moras.first().ok_or_else(|| {
            SynthesisError::StructuralMismatch("accent phrase has no moras".to_string())
        })?;
        let accent: usize = first.vowel[field::F2].parse().map_err(|_| {
            SynthesisError::malformed(
                &first.vowel.to_label_string(),
                format!("f2 {:?} is not an accent position", first.vowel[field::F2]),
            )
        })?;
        let accent = accent.min(moras.len());

        Ok(Self { moras, accent })
    }

    pub fn moras(&self) -> &[Mora] {
        &self.moras
    }

    pub fn mora_count(&self) -> usize {
        self.moras.len()
    }

    /// Accent nucleus position, always `<= mora_count()`.
    pub fn accent(&self) -> usize {
        self.accent
    }

    pub fn phonemes(&self) -> impl Iterator<Item = &ContextLabel> {
        self.moras.iter().flat_map(Mora::phonemes)
    }

    pub(crate) fn set_context(&mut self, key: FieldKey, value: &str) {
        for mora in &mut self.moras {
            mora.set_context(key, value);
        }
    }
}

/// A run of accent phrases between two pauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreathGroup {
    pub(crate) phrases: Range<usize>,
}

impl BreathGroup {
    /// Indices of this group's phrases in [`Utterance::accent_phrases`].
    pub fn phrase_range(&self) -> Range<usize> {
        self.phrases.clone()
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

/// Split a breath group's phonemes wherever `i3` or `f5` changes.
///
/// `first_index` is the utterance-wide index of the group's first phrase, used
/// to name the offending phrase in errors.
fn split_accent_phrases(
    phonemes: &[ContextLabel],
    first_index: usize,
) -> Result<Vec<AccentPhrase>> {
    let mut phrases = Vec::new();
    let mut start = 0;
    for i in 0..phonemes.len() {
        let boundary = phonemes.get(i + 1).map_or(true, |next| {
            next[field::I3] != phonemes[i][field::I3] || next[field::F5] != phonemes[i][field::F5]
        });
        if boundary {
            let phrase = AccentPhrase::from_phonemes(&phonemes[start..=i]).map_err(|err| match err {
                SynthesisError::StructuralMismatch(message) => SynthesisError::StructuralMismatch(
                    format!("accent phrase {}: {}", first_index + phrases.len(), message),
                ),
                other => other,
            })?;
            phrases.push(phrase);
            start = i + 1;
        }
    }
    Ok(phrases)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub(crate) accent_phrases: Vec<AccentPhrase>,
    pub(crate) breath_groups: Vec<BreathGroup>,
    pub(crate) pauses: Vec<ContextLabel>,
}

impl Utterance {
    /// Parse label strings and build the hierarchy.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let phonemes = labels
            .iter()
            .map(|label| ContextLabel::parse(label.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_phonemes(&phonemes)
    }

    /// Build the hierarchy from parsed phonemes.
    ///
    /// Pause phonemes close the current breath group and are kept separately.
    /// The input must start and end with a pause.
    pub fn from_phonemes(phonemes: &[ContextLabel]) -> Result<Self> {
        let mut groups: Vec<Vec<AccentPhrase>> = Vec::new();
        let mut pauses = Vec::new();
        let mut group_start: Option<usize> = None;
        let mut phrase_count = 0;

        for (i, phoneme) in phonemes.iter().enumerate() {
            if phoneme.is_pause() {
                pauses.push(phoneme.clone());
                if let Some(start) = group_start.take() {
                    let group = split_accent_phrases(&phonemes[start..i], phrase_count)?;
                    phrase_count += group.len();
                    groups.push(group);
                }
            } else if group_start.is_none() {
                group_start = Some(i);
            }
        }
        if let Some(start) = group_start {
            groups.push(split_accent_phrases(&phonemes[start..], phrase_count)?);
        }

        Self::new(groups, pauses)
    }

    /// Assemble an utterance from grouped phrases and the pauses around them.
    ///
    /// Requires exactly one more pause than breath groups.
    pub fn new(groups: Vec<Vec<AccentPhrase>>, pauses: Vec<ContextLabel>) -> Result<Self> {
        if pauses.len() != groups.len() + 1 {
            return Err(SynthesisError::StructuralMismatch(format!(
                "{} pauses around {} breath groups (expected {})",
                pauses.len(),
                groups.len(),
                groups.len() + 1
            )));
        }

        let mut accent_phrases = Vec::new();
        let mut breath_groups = Vec::with_capacity(groups.len());
        for group in groups {
            let start = accent_phrases.len();
            accent_phrases.extend(group);
            breath_groups.push(BreathGroup {
                phrases: start..accent_phrases.len(),
            });
        }

        Ok(Self {
            accent_phrases,
            breath_groups,
            pauses,
        })
    }

    pub fn accent_phrases(&self) -> &[AccentPhrase] {
        &self.accent_phrases
    }

    pub fn breath_groups(&self) -> &[BreathGroup] {
        &self.breath_groups
    }

    pub fn pauses(&self) -> &[ContextLabel] {
        &self.pauses
    }

    /// Phrases belonging to one breath group.
    pub fn group_phrases(&self, group: &BreathGroup) -> &[AccentPhrase] {
        &self.accent_phrases[group.phrase_range()]
    }
}
