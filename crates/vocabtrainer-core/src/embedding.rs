//! Word embeddings.
//!
//! An [`EmbeddingTable`] is loaded once at startup from a GloVe-style text
//! file and never changes afterwards. [`Embedder`] wraps a shared table and
//! maps words or short text spans to vectors, using the all-zero vector as a
//! "no signal" sentinel for out-of-vocabulary input.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::error::EmbeddingError;

/// Immutable word → vector lookup.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    vectors: HashMap<String, Vec<f32>>,
    dim: usize,
}

impl EmbeddingTable {
    /// Load a GloVe-format file: one `word f1 f2 ... fd` record per line.
    pub fn load(path: &Path) -> Result<Self, EmbeddingError> {
        let file = std::fs::File::open(path).map_err(|source| EmbeddingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            EmbeddingError::Io { source, .. } => EmbeddingError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        tracing::info!(
            "loaded {} embeddings of dimension {} from {}",
            table.len(),
            table.dim,
            path.display()
        );
        Ok(table)
    }

    /// Parse GloVe-format records from any reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, EmbeddingError> {
        let mut vectors = HashMap::new();
        let mut dim = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|source| EmbeddingError::Io {
                path: Default::default(),
                source,
            })?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let vector = parts
                .map(|v| {
                    v.parse::<f32>().map_err(|_| EmbeddingError::Parse {
                        line: line_no,
                        reason: format!("invalid component '{v}'"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            if vector.is_empty() {
                return Err(EmbeddingError::Parse {
                    line: line_no,
                    reason: format!("no vector for '{word}'"),
                });
            }
            if dim == 0 {
                dim = vector.len();
            } else if vector.len() != dim {
                return Err(EmbeddingError::Parse {
                    line: line_no,
                    reason: format!("expected {dim} components, found {}", vector.len()),
                });
            }

            // First record wins, matching the import rule for duplicate words.
            vectors.entry(word.to_lowercase()).or_insert(vector);
        }

        if vectors.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        Ok(Self { vectors, dim })
    }

    /// Build a table from in-memory pairs. All vectors must share a dimension.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, EmbeddingError>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut vectors = HashMap::new();
        let mut dim = 0;
        for (idx, (word, vector)) in pairs.into_iter().enumerate() {
            if vector.is_empty() || (dim != 0 && vector.len() != dim) {
                return Err(EmbeddingError::Parse {
                    line: idx + 1,
                    reason: "inconsistent vector dimension".into(),
                });
            }
            dim = vector.len();
            vectors
                .entry(word.into().to_lowercase())
                .or_insert(vector);
        }
        if vectors.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        Ok(Self { vectors, dim })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn lookup(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(Vec::as_slice)
    }
}

/// Maps words and text spans to fixed-length vectors.
#[derive(Debug, Clone)]
pub struct Embedder {
    table: Arc<EmbeddingTable>,
}

impl Embedder {
    pub fn new(table: Arc<EmbeddingTable>) -> Self {
        Self { table }
    }

    pub fn dim(&self) -> usize {
        self.table.dim()
    }

    /// True iff `word` has a real (non-sentinel) vector.
    pub fn contains(&self, word: &str) -> bool {
        self.table
            .lookup(&normalize(word))
            .is_some_and(|v| !is_sentinel(v))
    }

    /// Encode a word or a whitespace-separated span.
    ///
    /// A single known word returns its stored vector. A span returns the mean
    /// of its known tokens. Unknown input yields the zero vector; callers must
    /// treat that as "no signal" rather than average it in.
    pub fn encode(&self, text: &str) -> Vec<f32> {
        let text = normalize(text);
        if let Some(vector) = self.table.lookup(&text) {
            return vector.to_vec();
        }

        let mut sum = vec![0.0f32; self.dim()];
        let mut known = 0usize;
        for token in text.split_whitespace() {
            if let Some(vector) = self.table.lookup(token) {
                if is_sentinel(vector) {
                    continue;
                }
                for (acc, x) in sum.iter_mut().zip(vector) {
                    *acc += x;
                }
                known += 1;
            }
        }
        if known > 1 {
            for acc in &mut sum {
                *acc /= known as f32;
            }
        }
        sum
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// The all-zero vector marks "no signal".
pub fn is_sentinel(vector: &[f32]) -> bool {
    vector.iter().all(|&x| x == 0.0)
}

/// Cosine similarity, or `None` for mismatched lengths or zero-norm input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        None
    } else {
        Some((dot / denom) as f32)
    }
}
