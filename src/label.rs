//! Full-context label parsing.
//!
//! A label is one phoneme plus its linguistic context, written as 50 fields in
//! 11 sections:
//!
//! ```text
//! p1^p2-p3+p4=p5/A:a1+a2+a3/B:b1-b2_b3/C:c1_c2+c3/D:d1+d2_d3
//! /E:e1_e2!e3_e4-e5/F:f1_f2#f3_f4@f5_f6|f7_f8/G:g1_g2%g3_g4_g5
//! /H:h1_h2/I:i1-i2@i3+i4&i5-i6|i7+i8/J:j1_j2/K:k1+k2-k3
//! ```
//!
//! The grammar is kept as one table of `(name, leading delimiter)` pairs; both
//! the parser regex and [`ContextLabel::to_label_string`] are derived from it.

use crate::error::{Result, SynthesisError};
use regex::Regex;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::LazyLock;

/// Number of context fields in a label.
pub const FIELD_COUNT: usize = 50;

/// Field name and the literal that precedes it, in label order.
const GRAMMAR: [(&str, &str); FIELD_COUNT] = [
    ("p1", ""),
    ("p2", "^"),
    ("p3", "-"),
    ("p4", "+"),
    ("p5", "="),
    ("a1", "/A:"),
    ("a2", "+"),
    ("a3", "+"),
    ("b1", "/B:"),
    ("b2", "-"),
    ("b3", "_"),
    ("c1", "/C:"),
    ("c2", "_"),
    ("c3", "+"),
    ("d1", "/D:"),
    ("d2", "+"),
    ("d3", "_"),
    ("e1", "/E:"),
    ("e2", "_"),
    ("e3", "!"),
    ("e4", "_"),
    ("e5", "-"),
    ("f1", "/F:"),
    ("f2", "_"),
    ("f3", "#"),
    ("f4", "_"),
    ("f5", "@"),
    ("f6", "_"),
    ("f7", "|"),
    ("f8", "_"),
    ("g1", "/G:"),
    ("g2", "_"),
    ("g3", "%"),
    ("g4", "_"),
    ("g5", "_"),
    ("h1", "/H:"),
    ("h2", "_"),
    ("i1", "/I:"),
    ("i2", "-"),
    ("i3", "@"),
    ("i4", "+"),
    ("i5", "&"),
    ("i6", "-"),
    ("i7", "|"),
    ("i8", "+"),
    ("j1", "/J:"),
    ("j2", "_"),
    ("k1", "/K:"),
    ("k2", "+"),
    ("k3", "-"),
];

static LABEL_RE: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| {
    let mut pattern = String::from("^");
    for (_, delimiter) in GRAMMAR {
        pattern.push_str(&regex::escape(delimiter));
        pattern.push_str("(.+?)");
    }
    pattern.push('$');
    Regex::new(&pattern)
});

/// Index of one field in the fixed label vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey(usize);

impl FieldKey {
    /// Look up a field by its name (`"a2"`, `"k3"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        GRAMMAR
            .iter()
            .position(|(field, _)| *field == name)
            .map(FieldKey)
    }

    pub fn name(self) -> &'static str {
        GRAMMAR[self.0].0
    }

    /// Section letter: `'P'` for the phoneme section, `'A'`..`'K'` otherwise.
    pub fn section(self) -> char {
        let name = self.name();
        name.chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('P')
    }

    pub fn all() -> impl Iterator<Item = FieldKey> {
        (0..FIELD_COUNT).map(FieldKey)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field keys used by the hierarchy and re-annotation passes.
pub mod field {
    use super::FieldKey;

    pub const P3: FieldKey = FieldKey(2);
    pub const A1: FieldKey = FieldKey(5);
    pub const A2: FieldKey = FieldKey(6);
    pub const A3: FieldKey = FieldKey(7);
    pub const E1: FieldKey = FieldKey(17);
    pub const E2: FieldKey = FieldKey(18);
    pub const F1: FieldKey = FieldKey(22);
    pub const F2: FieldKey = FieldKey(23);
    pub const F5: FieldKey = FieldKey(26);
    pub const G1: FieldKey = FieldKey(30);
    pub const G2: FieldKey = FieldKey(31);
    pub const H1: FieldKey = FieldKey(35);
    pub const I1: FieldKey = FieldKey(37);
    pub const I3: FieldKey = FieldKey(39);
    pub const I5: FieldKey = FieldKey(41);
    pub const I6: FieldKey = FieldKey(42);
    pub const J1: FieldKey = FieldKey(45);
    pub const K2: FieldKey = FieldKey(48);
}

/// Value of `f1` on pause phonemes.
pub const PAUSE_MARKER: &str = "xx";

/// One phoneme with its 50 context fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLabel {
    fields: [String; FIELD_COUNT],
}

impl ContextLabel {
    /// Parse one full-context label string.
    pub fn parse(label: &str) -> Result<Self> {
        let grammar = LABEL_RE
            .as_ref()
            .map_err(|err| SynthesisError::malformed(label, format!("label grammar: {err}")))?;
        let captures = grammar
            .captures(label)
            .ok_or_else(|| SynthesisError::malformed(label, "does not match label grammar"))?;

        let mut fields: [String; FIELD_COUNT] = std::array::from_fn(|_| String::new());
        for (i, slot) in fields.iter_mut().enumerate() {
            let value = captures.get(i + 1).ok_or_else(|| {
                SynthesisError::malformed(label, format!("missing {}", GRAMMAR[i].0))
            })?;
            *slot = value.as_str().to_string();
        }
        Ok(Self { fields })
    }

    /// Build a label from field values in grammar order.
    pub fn from_fields(fields: [String; FIELD_COUNT]) -> Self {
        Self { fields }
    }

    /// Phoneme symbol (`p3`).
    pub fn phoneme(&self) -> &str {
        &self[field::P3]
    }

    pub fn is_pause(&self) -> bool {
        self[field::F1] == PAUSE_MARKER
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        FieldKey::from_name(name).map(|key| self[key].as_str())
    }

    pub fn set(&mut self, key: FieldKey, value: impl Into<String>) {
        self.fields[key.0] = value.into();
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        FieldKey::all().map(move |key| (key, self[key].as_str()))
    }

    /// Serialize back to the label grammar.
    pub fn to_label_string(&self) -> String {
        let mut out = String::with_capacity(256);
        for ((_, delimiter), value) in GRAMMAR.iter().zip(self.fields.iter()) {
            out.push_str(delimiter);
            out.push_str(value);
        }
        out
    }
}

impl Index<FieldKey> for ContextLabel {
    type Output = String;

    fn index(&self, key: FieldKey) -> &String {
        &self.fields[key.0]
    }
}

impl IndexMut<FieldKey> for ContextLabel {
    fn index_mut(&mut self, key: FieldKey) -> &mut String {
        &mut self.fields[key.0]
    }
}

impl fmt::Display for ContextLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_label_string())
    }
}
