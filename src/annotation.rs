//! Context re-annotation.
//!
//! After the hierarchy is built, positional fields are rewritten from the
//! structure itself (mora positions, neighbouring phrase sizes, breath group
//! counts) and the hierarchy is flattened back into phoneme order.

use crate::error::{Result, SynthesisError};
use crate::hierarchy::Utterance;
use crate::label::{field, ContextLabel, FieldKey};
use tracing::debug;

impl Utterance {
    /// Rewrite the derived context fields of every phoneme.
    ///
    /// Accent phrase fields are written first, then breath group fields,
    /// then the utterance-wide phrase count.
    pub fn reannotate(&mut self) {
        let phrase_count = self.accent_phrases.len();

        for i in 0..phrase_count {
            let mora_num = self.accent_phrases[i].mora_count();
            let accent = self.accent_phrases[i].accent();
            let mora_num_str = mora_num.to_string();
            let accent_str = accent.to_string();

            if i > 0 {
                let prev = &mut self.accent_phrases[i - 1];
                prev.set_context(field::G1, &mora_num_str);
                prev.set_context(field::G2, &accent_str);
            }
            if let Some(next) = self.accent_phrases.get_mut(i + 1) {
                next.set_context(field::E1, &mora_num_str);
                next.set_context(field::E2, &accent_str);
            }

            let phrase = &mut self.accent_phrases[i];
            phrase.set_context(field::F1, &mora_num_str);
            phrase.set_context(field::F2, &accent_str);
            for (j, mora) in phrase.moras.iter_mut().enumerate() {
                let offset = j as i64 - accent as i64 + 1;
                mora.set_context(field::A1, &offset.to_string());
                mora.set_context(field::A2, &(j + 1).to_string());
                mora.set_context(field::A3, &(mora_num - j).to_string());
            }
        }

        for i in 0..self.breath_groups.len() {
            let phrases = self.breath_groups[i].phrase_range();
            let count = phrases.len().to_string();

            if i > 0 {
                let prev = self.breath_groups[i - 1].phrase_range();
                self.set_range_context(prev, field::J1, &count);
            }
            if let Some(next) = self.breath_groups.get(i + 1) {
                let next = next.phrase_range();
                self.set_range_context(next, field::H1, &count);
            }

            let first_position = (phrases.start + 1).to_string();
            let remaining = (phrase_count - phrases.start).to_string();
            self.set_range_context(phrases.clone(), field::I1, &count);
            self.set_range_context(phrases.clone(), field::I5, &first_position);
            self.set_range_context(phrases, field::I6, &remaining);
        }

        let total = phrase_count.to_string();
        self.set_range_context(0..phrase_count, field::K2, &total);
    }

    fn set_range_context(&mut self, range: std::ops::Range<usize>, key: FieldKey, value: &str) {
        for phrase in &mut self.accent_phrases[range] {
            phrase.set_context(key, value);
        }
    }

    /// Flatten into phoneme order: `pause[0], group[0], pause[1], ..., pause[n]`.
    pub fn phonemes(&self) -> Result<Vec<ContextLabel>> {
        if self.pauses.len() != self.breath_groups.len() + 1 {
            return Err(SynthesisError::StructuralMismatch(format!(
                "cannot interleave {} pauses with {} breath groups",
                self.pauses.len(),
                self.breath_groups.len()
            )));
        }

        let mut phonemes = Vec::new();
        for (i, pause) in self.pauses.iter().enumerate() {
            phonemes.push(pause.clone());
            if let Some(group) = self.breath_groups.get(i) {
                for phrase in self.group_phrases(group) {
                    phonemes.extend(phrase.phonemes().cloned());
                }
            }
        }
        Ok(phonemes)
    }
}

/// Parse, build, re-annotate and flatten a label sequence.
pub fn annotate_labels<S: AsRef<str>>(labels: &[S]) -> Result<Vec<ContextLabel>> {
    let mut utterance = Utterance::from_labels(labels)?;
    debug!(
        breath_groups = utterance.breath_groups().len(),
        accent_phrases = utterance.accent_phrases().len(),
        "utterance ok"
    );
    utterance.reannotate();
    let phonemes = utterance.phonemes()?;
    debug!(phonemes = phonemes.len(), "phonemes ok");
    Ok(phonemes)
}
