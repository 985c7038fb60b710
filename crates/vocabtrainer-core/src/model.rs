//! Core data model types for vocabtrainer.
//!
//! These are the records shared by the word store, the retrieval pipeline
//! and the LLM boundary validators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Common European Framework of Reference proficiency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    /// Position of the band on a 0..=1 scale (A1 = 0.0, C2 = 1.0).
    pub fn difficulty(self) -> f64 {
        match self {
            CefrLevel::A1 => 0.0,
            CefrLevel::A2 => 0.2,
            CefrLevel::B1 => 0.4,
            CefrLevel::B2 => 0.6,
            CefrLevel::C1 => 0.8,
            CefrLevel::C2 => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CefrLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            "C2" => Ok(CefrLevel::C2),
            other => Err(format!("unknown CEFR level: {other}")),
        }
    }
}

/// Exams a word can be tagged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exam {
    Ielts,
    Gre,
}

impl Exam {
    pub const ALL: [Exam; 2] = [Exam::Ielts, Exam::Gre];

    pub fn as_str(self) -> &'static str {
        match self {
            Exam::Ielts => "IELTS",
            Exam::Gre => "GRE",
        }
    }
}

impl fmt::Display for Exam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exam {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IELTS" => Ok(Exam::Ielts),
            "GRE" => Ok(Exam::Gre),
            _ => Err(StoreError::UnknownExam(s.to_string())),
        }
    }
}

/// Which exams a word belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamFlags {
    pub ielts: bool,
    pub gre: bool,
}

impl ExamFlags {
    pub fn new(ielts: bool, gre: bool) -> Self {
        Self { ielts, gre }
    }

    pub fn contains(&self, exam: Exam) -> bool {
        match exam {
            Exam::Ielts => self.ielts,
            Exam::Gre => self.gre,
        }
    }
}

/// A persisted vocabulary record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    /// The word itself; primary key.
    pub word: String,
    /// Embedding computed at import; never changes afterwards.
    pub embedding: Vec<f32>,
    pub cefr_level: CefrLevel,
    pub in_exam: ExamFlags,
    /// Learner's current grasp of the word, always within [0, 1].
    pub understanding_rating: f64,
}

impl WordEntry {
    pub fn candidate(&self) -> Candidate {
        Candidate {
            word: self.word.clone(),
            cefr_level: self.cefr_level,
            understanding_rating: self.understanding_rating,
        }
    }
}

/// Structured reading of a learner's free-text goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Exam name as produced by the interpreter (upper case), if any.
    pub exam: Option<String>,
    pub topic: Option<String>,
    pub keywords: Vec<String>,
}

impl Intent {
    /// The exam gate to apply. Names the store does not recognise mean no gate.
    pub fn exam_gate(&self) -> Option<Exam> {
        self.exam.as_deref().and_then(|name| name.parse().ok())
    }
}

/// One row of the candidate table handed to the word selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub word: String,
    pub cefr_level: CefrLevel,
    pub understanding_rating: f64,
}

/// Words eligible for a quiz, deduplicated and in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateSet(Vec<Candidate>);

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate unless its word is already present.
    ///
    /// Returns `false` when the candidate was a duplicate.
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if self.contains(&candidate.word) {
            return false;
        }
        self.0.push(candidate);
        true
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.iter().any(|c| c.word == word)
    }

    pub fn get(&self, word: &str) -> Option<&Candidate> {
        self.0.iter().find(|c| c.word == word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.0.iter()
    }

    pub fn words(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.word.as_str()).collect()
    }

    /// Keep only the candidates matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&Candidate) -> bool) {
        self.0.retain(keep);
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for candidate in iter {
            set.push(candidate);
        }
        set
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(word: &str, rating: f64) -> Candidate {
        Candidate {
            word: word.into(),
            cefr_level: CefrLevel::B1,
            understanding_rating: rating,
        }
    }

    #[test]
    fn cefr_display_and_parse() {
        assert_eq!(CefrLevel::B2.to_string(), "B2");
        assert_eq!("a1".parse::<CefrLevel>().unwrap(), CefrLevel::A1);
        assert_eq!(" C2 ".parse::<CefrLevel>().unwrap(), CefrLevel::C2);
        assert!("D1".parse::<CefrLevel>().is_err());
        assert!(CefrLevel::A2 < CefrLevel::C1);
    }

    #[test]
    fn exam_parse_is_case_insensitive() {
        assert_eq!("IELTS".parse::<Exam>().unwrap(), Exam::Ielts);
        assert_eq!("gre".parse::<Exam>().unwrap(), Exam::Gre);
        assert!(matches!(
            "TOEFL".parse::<Exam>(),
            Err(StoreError::UnknownExam(name)) if name == "TOEFL"
        ));
    }

    #[test]
    fn intent_exam_gate_ignores_unknown_exams() {
        let mut intent = Intent {
            exam: Some("IELTS".into()),
            topic: None,
            keywords: vec!["travel".into()],
        };
        assert_eq!(intent.exam_gate(), Some(Exam::Ielts));

        intent.exam = Some("TOEFL".into());
        assert_eq!(intent.exam_gate(), None);

        intent.exam = None;
        assert_eq!(intent.exam_gate(), None);
    }

    #[test]
    fn candidate_set_keeps_first_occurrence() {
        let mut set = CandidateSet::new();
        assert!(set.push(candidate("ephemeral", 0.1)));
        assert!(set.push(candidate("tenacious", 0.2)));
        assert!(!set.push(candidate("ephemeral", 0.4)));

        assert_eq!(set.len(), 2);
        assert_eq!(set.words(), vec!["ephemeral", "tenacious"]);
        assert_eq!(set.get("ephemeral").unwrap().understanding_rating, 0.1);
    }

    #[test]
    fn candidate_set_serializes_as_plain_list() {
        let set: CandidateSet = vec![candidate("apple", 0.0)].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with('['));
        let back: CandidateSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
