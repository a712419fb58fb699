//! Phoneme vocabularies and tokenization.

use crate::error::{Result, SynthesisError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical pause symbol; leading/trailing `sil` is mapped to it.
pub const PAUSE_PHONEME: &str = "pau";

/// Vowel-class symbols: each one ends a mora.
pub const VOWEL_PHONEMES: [&str; 13] = [
    "A", "I", "U", "E", "O", "cl", "pau", "a", "i", "u", "e", "o", "N",
];

/// Symbols whose mora pitch is forced to zero.
pub const UNVOICED_PHONEMES: [&str; 7] = ["A", "I", "U", "E", "O", "cl", "pau"];

const OPEN_JTALK_TABLE: [(&str, i64); 45] = [
    ("pau", 0),
    ("A", 1),
    ("E", 2),
    ("I", 3),
    ("N", 4),
    ("O", 5),
    ("U", 6),
    ("a", 7),
    ("b", 8),
    ("by", 9),
    ("ch", 10),
    ("cl", 11),
    ("d", 12),
    ("dy", 13),
    ("e", 14),
    ("f", 15),
    ("g", 16),
    ("gw", 17),
    ("gy", 18),
    ("h", 19),
    ("hy", 20),
    ("i", 21),
    ("j", 22),
    ("k", 23),
    ("kw", 24),
    ("ky", 25),
    ("m", 26),
    ("my", 27),
    ("n", 28),
    ("ny", 29),
    ("o", 30),
    ("p", 31),
    ("py", 32),
    ("r", 33),
    ("ry", 34),
    ("s", 35),
    ("sh", 36),
    ("t", 37),
    ("ts", 38),
    ("ty", 39),
    ("u", 40),
    ("v", 41),
    ("w", 42),
    ("y", 43),
    ("z", 44),
];

// Id 17 is unassigned; the scheme lists "h" twice and keeps the first.
const JVS_TABLE: [(&str, i64); 39] = [
    ("pau", 0),
    ("I", 1),
    ("N", 2),
    ("U", 3),
    ("a", 4),
    ("b", 5),
    ("by", 6),
    ("ch", 7),
    ("cl", 8),
    ("d", 9),
    ("dy", 10),
    ("e", 11),
    ("f", 12),
    ("g", 13),
    ("gy", 14),
    ("h", 15),
    ("hy", 16),
    ("i", 18),
    ("j", 19),
    ("k", 20),
    ("ky", 21),
    ("m", 22),
    ("my", 23),
    ("n", 24),
    ("ny", 25),
    ("o", 26),
    ("p", 27),
    ("py", 28),
    ("r", 29),
    ("ry", 30),
    ("s", 31),
    ("sh", 32),
    ("t", 33),
    ("ts", 34),
    ("u", 35),
    ("v", 36),
    ("w", 37),
    ("y", 38),
    ("z", 39),
];

/// Which closed phoneme vocabulary the acoustic models were trained on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhonemeSet {
    /// 45 symbols, ids 0..=44.
    #[default]
    OpenJtalk,
    /// Legacy 40-wide scheme, ids 0..=39.
    Jvs,
}

impl PhonemeSet {
    fn table(self) -> &'static [(&'static str, i64)] {
        match self {
            PhonemeSet::OpenJtalk => &OPEN_JTALK_TABLE,
            PhonemeSet::Jvs => &JVS_TABLE,
        }
    }

    /// One-hot width: largest id plus one.
    pub fn width(self) -> usize {
        match self {
            PhonemeSet::OpenJtalk => 45,
            PhonemeSet::Jvs => 40,
        }
    }
}

/// Symbol → id mapping for one [`PhonemeSet`].
#[derive(Debug, Clone)]
pub struct Vocab {
    set: PhonemeSet,
    map: HashMap<&'static str, i64>,
}

impl Vocab {
    pub fn new(set: PhonemeSet) -> Self {
        Self {
            set,
            map: set.table().iter().copied().collect(),
        }
    }

    pub fn phoneme_set(&self) -> PhonemeSet {
        self.set
    }

    pub fn id(&self, symbol: &str) -> Option<i64> {
        self.map.get(symbol).copied()
    }

    /// Encode phoneme symbols to ids, failing on the first unknown symbol.
    pub fn encode<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<i64>> {
        symbols
            .iter()
            .enumerate()
            .map(|(position, symbol)| {
                let symbol = symbol.as_ref();
                self.id(symbol).ok_or_else(|| SynthesisError::UnknownPhoneme {
                    symbol: symbol.to_string(),
                    position,
                })
            })
            .collect()
    }

    /// Width of the one-hot encoding. For JVS this exceeds the symbol count
    /// because id 17 is unassigned.
    pub fn width(&self) -> usize {
        self.set.width()
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Replace a leading or trailing `sil`-containing symbol with [`PAUSE_PHONEME`].
pub fn normalize_boundaries(symbols: &mut [String]) {
    if let Some(first) = symbols.first_mut() {
        if first.contains("sil") {
            *first = PAUSE_PHONEME.to_string();
        }
    }
    if let Some(last) = symbols.last_mut() {
        if last.contains("sil") {
            *last = PAUSE_PHONEME.to_string();
        }
    }
}

pub fn is_vowel(symbol: &str) -> bool {
    VOWEL_PHONEMES.contains(&symbol)
}

pub fn is_unvoiced(symbol: &str) -> bool {
    UNVOICED_PHONEMES.contains(&symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_basic() {
        let vocab = Vocab::new(PhonemeSet::OpenJtalk);
        let ids = vocab.encode(&["pau", "k", "o", "N", "cl", "z", "pau"]).unwrap();
        assert_eq!(ids, vec![0, 23, 30, 4, 11, 44, 0]);
        assert_eq!(vocab.len(), 45);
        assert_eq!(vocab.width(), 45);
    }

    #[test]
    fn jvs_width_counts_the_unassigned_id() {
        let vocab = Vocab::new(PhonemeSet::Jvs);
        assert_eq!(vocab.width(), 40);
        assert_eq!(vocab.len(), 39);
        assert!(!vocab.is_empty());
    }

    #[test]
    fn rejects_unknown_symbol() {
        let vocab = Vocab::new(PhonemeSet::OpenJtalk);
        let err = vocab.encode(&["pau", "sil"]).unwrap_err();
        match err {
            SynthesisError::UnknownPhoneme { symbol, position } => {
                assert_eq!(symbol, "sil");
                assert_eq!(position, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tables_are_closed_and_dense() {
        for set in [PhonemeSet::OpenJtalk, PhonemeSet::Jvs] {
            let vocab = Vocab::new(set);
            let max_id = set.table().iter().map(|(_, id)| *id).max().unwrap();
            assert_eq!(max_id as usize + 1, set.width());
            // No symbol listed twice.
            assert_eq!(vocab.map.len(), set.table().len());
        }
        assert_eq!(Vocab::new(PhonemeSet::Jvs).id("h"), Some(15));
        assert_eq!(Vocab::new(PhonemeSet::Jvs).id("gw"), None);
    }

    #[test]
    fn normalizes_silence_at_edges_only() {
        let mut symbols: Vec<String> =
            ["sil", "a", "sil", "sil"].iter().map(|s| s.to_string()).collect();
        normalize_boundaries(&mut symbols);
        assert_eq!(symbols, ["pau", "a", "sil", "pau"]);

        let mut empty: Vec<String> = Vec::new();
        normalize_boundaries(&mut empty);
    }

    #[test]
    fn vowel_classes() {
        assert!(is_vowel("pau"));
        assert!(is_vowel("N"));
        assert!(!is_vowel("k"));
        assert!(is_unvoiced("cl"));
        assert!(!is_unvoiced("a"));
        for symbol in UNVOICED_PHONEMES {
            assert!(is_vowel(symbol));
        }
    }
}
