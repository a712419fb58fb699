//! Per-phoneme and per-mora features fed to the duration and pitch models.

use crate::error::{Result, SynthesisError};
use crate::label::{field, ContextLabel};
use crate::vocab::{is_unvoiced, is_vowel};

/// Duration forced onto the first and last phoneme, in seconds.
pub const EDGE_PHONEME_LENGTH: f32 = 0.1;

/// How accent nuclei are marked in this utterance.
///
/// Decided once from the first phoneme that starts an accent phrase: if that
/// phoneme carries the nucleus (`a1 == 0`) the utterance uses the type-1
/// convention, where accents start on the first mora; otherwise on the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccentConvention {
    Type1,
    Other,
}

impl AccentConvention {
    pub fn detect(labels: &[ContextLabel]) -> Self {
        labels
            .iter()
            .find(|label| label[field::A2] == "1")
            .map_or(AccentConvention::Other, |label| {
                if label[field::A1] == "0" {
                    AccentConvention::Type1
                } else {
                    AccentConvention::Other
                }
            })
    }
}

/// Boolean accent flags, one entry per phoneme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccentFlags {
    pub start_accent: Vec<bool>,
    pub end_accent: Vec<bool>,
    pub start_accent_phrase: Vec<bool>,
    pub end_accent_phrase: Vec<bool>,
}

impl AccentFlags {
    pub fn from_labels(labels: &[ContextLabel], convention: AccentConvention) -> Self {
        let type1 = convention == AccentConvention::Type1;
        let mut flags = AccentFlags::default();
        for label in labels {
            let a2 = label[field::A2].as_str();
            flags.end_accent.push(label[field::A1] == "0");
            flags
                .start_accent
                .push((a2 == "1" && type1) || (a2 == "2" && !type1));
            flags.start_accent_phrase.push(a2 == "1");
            flags.end_accent_phrase.push(label[field::A3] == "1");
        }
        flags
    }

    /// Keep only the entries at `indices`.
    pub fn select(&self, indices: &[usize]) -> Self {
        let pick = |values: &[bool]| indices.iter().map(|&i| values[i]).collect::<Vec<_>>();
        Self {
            start_accent: pick(&self.start_accent),
            end_accent: pick(&self.end_accent),
            start_accent_phrase: pick(&self.start_accent_phrase),
            end_accent_phrase: pick(&self.end_accent_phrase),
        }
    }

    pub fn len(&self) -> usize {
        self.start_accent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_accent.is_empty()
    }
}

/// Pin the edge phonemes to [`EDGE_PHONEME_LENGTH`] and snap every duration
/// to the `1 / rate` grid.
pub fn quantize_durations(durations: &mut [f32], rate: f32) {
    if let Some(first) = durations.first_mut() {
        *first = EDGE_PHONEME_LENGTH;
    }
    if let Some(last) = durations.last_mut() {
        *last = EDGE_PHONEME_LENGTH;
    }
    for duration in durations.iter_mut() {
        *duration = (*duration * rate).round() / rate;
    }
}

/// Mora structure over a phoneme sequence.
///
/// Only a single consonant before each vowel is recognised; with longer
/// clusters the consonant is the phoneme directly before the vowel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoraSplit {
    pub vowel_indices: Vec<usize>,
    pub consonant_indices: Vec<Option<usize>>,
}

impl MoraSplit {
    pub fn from_symbols<S: AsRef<str>>(symbols: &[S]) -> Result<Self> {
        let vowel_indices: Vec<usize> = symbols
            .iter()
            .enumerate()
            .filter(|(_, symbol)| is_vowel(symbol.as_ref()))
            .map(|(i, _)| i)
            .collect();
        if vowel_indices.is_empty() {
            return Err(SynthesisError::StructuralMismatch(
                "phoneme sequence contains no vowels".to_string(),
            ));
        }

        let mut consonant_indices = Vec::with_capacity(vowel_indices.len());
        consonant_indices.push(None);
        for pair in vowel_indices.windows(2) {
            let (prev, post) = (pair[0], pair[1]);
            consonant_indices.push((post - prev != 1).then(|| post - 1));
        }

        Ok(Self {
            vowel_indices,
            consonant_indices,
        })
    }

    pub fn mora_count(&self) -> usize {
        self.vowel_indices.len()
    }

    /// Sum phoneme durations per mora.
    ///
    /// Each mora runs up to and including its vowel; the last mora also takes
    /// every phoneme after the final vowel.
    pub fn mora_durations(&self, durations: &[f32]) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.vowel_indices.len());
        let mut start = 0;
        let last = self.vowel_indices.len().saturating_sub(1);
        for (n, &vowel) in self.vowel_indices.iter().enumerate() {
            let end = if n == last { durations.len() } else { vowel + 1 };
            let end = end.clamp(start, durations.len());
            result.push(durations[start..end].iter().sum());
            start = end;
        }
        result
    }

    /// Ids for the pitch model: vowel ids and consonant ids (`-1` when absent).
    pub fn model_ids(&self, phoneme_ids: &[i64]) -> (Vec<i64>, Vec<i64>) {
        let vowels = self.vowel_indices.iter().map(|&i| phoneme_ids[i]).collect();
        let consonants = self
            .consonant_indices
            .iter()
            .map(|c| c.map_or(-1, |i| phoneme_ids[i]))
            .collect();
        (vowels, consonants)
    }
}

/// Zero the pitch of every mora whose vowel is unvoiced.
pub fn zero_unvoiced_pitch<S: AsRef<str>>(pitch: &mut [f32], vowel_symbols: &[S]) {
    for (value, symbol) in pitch.iter_mut().zip(vowel_symbols) {
        if is_unvoiced(symbol.as_ref()) {
            *value = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::phoneme;

    fn accented(a1: &str, a2: &str, a3: &str) -> ContextLabel {
        let mut label = phoneme("a", a2, "1", "1");
        label.set(field::A1, a1);
        label.set(field::A3, a3);
        label
    }

    #[test]
    fn convention_from_first_phrase_start() {
        let type1 = [accented("xx", "xx", "xx"), accented("0", "1", "2"), accented("-1", "1", "1")];
        assert_eq!(AccentConvention::detect(&type1), AccentConvention::Type1);

        let other = [accented("-1", "1", "3"), accented("0", "1", "1")];
        assert_eq!(AccentConvention::detect(&other), AccentConvention::Other);

        assert_eq!(AccentConvention::detect(&[]), AccentConvention::Other);
    }

    #[test]
    fn flags_follow_convention() {
        let labels = [accented("-1", "1", "3"), accented("0", "2", "2"), accented("1", "3", "1")];
        let flags = AccentFlags::from_labels(&labels, AccentConvention::Other);
        assert_eq!(flags.start_accent, [false, true, false]);
        assert_eq!(flags.end_accent, [false, true, false]);
        assert_eq!(flags.start_accent_phrase, [true, false, false]);
        assert_eq!(flags.end_accent_phrase, [false, false, true]);

        let flags = AccentFlags::from_labels(&labels, AccentConvention::Type1);
        assert_eq!(flags.start_accent, [true, false, false]);

        let picked = flags.select(&[0, 2]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.end_accent_phrase, [false, true]);
    }

    #[test]
    fn quantizes_to_control_grid() {
        let mut durations = vec![0.7, 0.0123, 0.0975, 0.3];
        quantize_durations(&mut durations, 200.0);
        assert_eq!(durations[0], 0.1);
        assert_eq!(durations[3], 0.1);
        assert!((durations[1] - 0.01).abs() < 1e-6);
        assert!((durations[2] - 0.095).abs() < 1e-6 || (durations[2] - 0.1).abs() < 1e-6);
        for d in &durations {
            let steps = d * 200.0;
            assert!((steps - steps.round()).abs() < 1e-3);
        }
    }

    #[test]
    fn splits_moras_with_single_consonants() {
        let symbols = ["pau", "k", "o", "N", "n", "i", "ch", "i", "pau"];
        let split = MoraSplit::from_symbols(&symbols).unwrap();
        assert_eq!(split.vowel_indices, [0, 2, 3, 5, 7, 8]);
        assert_eq!(split.consonant_indices, [None, Some(1), None, Some(4), Some(6), None]);

        let ids = [0, 23, 30, 4, 28, 21, 10, 21, 0];
        let (vowels, consonants) = split.model_ids(&ids);
        assert_eq!(vowels, [0, 30, 4, 21, 21, 0]);
        assert_eq!(consonants, [-1, 23, -1, 28, 10, -1]);
    }

    #[test]
    fn requires_a_vowel() {
        let err = MoraSplit::from_symbols(&["k", "t"]).unwrap_err();
        assert!(matches!(err, SynthesisError::StructuralMismatch(_)));
    }

    #[test]
    fn mora_durations_cover_every_phoneme() {
        let symbols = ["pau", "k", "o", "N", "pau", "t"];
        let split = MoraSplit::from_symbols(&symbols).unwrap();
        let durations = [0.1, 0.05, 0.08, 0.06, 0.1, 0.02];
        let moras = split.mora_durations(&durations);
        assert_eq!(moras.len(), 4);
        assert!((moras[0] - 0.1).abs() < 1e-6);
        assert!((moras[1] - 0.13).abs() < 1e-6);
        assert!((moras[2] - 0.06).abs() < 1e-6);
        assert!((moras[3] - 0.12).abs() < 1e-6);
        let total: f32 = durations.iter().sum();
        assert!((moras.iter().sum::<f32>() - total).abs() < 1e-6);
    }

    #[test]
    fn zeroes_unvoiced_moras() {
        let mut pitch = vec![5.5, 5.8, 5.9, 6.0];
        zero_unvoiced_pitch(&mut pitch, &["a", "cl", "I", "o"]);
        assert_eq!(pitch, [5.5, 0.0, 0.0, 6.0]);
    }
}
