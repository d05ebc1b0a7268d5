//! TF-IDF text vectorizer
//!
//! Learns a vocabulary and inverse document frequencies from a corpus, then
//! projects any text into that space as an L2-normalized sparse vector.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sparse vector stored as `(column, value)` pairs sorted by column, zeros omitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Builds a vector from unordered entries, summing repeated columns
    pub fn from_entries(entries: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (column, value) in entries {
            *merged.entry(column).or_insert(0.0) += value;
        }
        Self {
            entries: merged.into_iter().filter(|(_, v)| *v != 0.0).collect(),
        }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_col, a_val) = self.entries[i];
            let (b_col, b_val) = other.entries[j];
            match a_col.cmp(&b_col) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_val * b_val;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
    }

    fn normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, value) in &mut self.entries {
                *value /= norm;
            }
        }
        self
    }
}

/// Lowercased runs of alphanumeric characters (and `_`)
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Fitted vocabulary with per-term inverse document frequency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Term -> column, columns assigned in lexicographic term order
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learns the vocabulary and idf weights of `documents`
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for document in documents {
            let terms: BTreeSet<String> = tokenize(document.as_ref()).collect();
            for term in terms {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let n_documents = documents.len();
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (column, (term, df)) in document_frequency.into_iter().enumerate() {
            idf.push(smoothed_idf(n_documents, df));
            vocabulary.insert(term, column);
        }

        Self { vocabulary, idf }
    }

    pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> (Self, Vec<SparseVector>) {
        let vectorizer = Self::fit(documents);
        let vectors = vectorizer.transform(documents);
        (vectorizer, vectors)
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Vec<SparseVector> {
        documents
            .iter()
            .map(|document| self.transform_one(document.as_ref()))
            .collect()
    }

    /// Term count times idf, L2-normalized. Unknown terms are ignored.
    pub fn transform_one(&self, text: &str) -> SparseVector {
        let entries = tokenize(text).filter_map(|token| {
            let column = *self.vocabulary.get(&token)?;
            let weight = *self.idf.get(column)?;
            Some((column, weight))
        });
        SparseVector::from_entries(entries).normalized()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    pub fn column(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.column(term).and_then(|column| self.idf.get(column).copied())
    }

    /// Every term maps to a distinct column with an idf weight
    pub fn is_consistent(&self) -> bool {
        self.idf.len() == self.vocabulary.len()
            && self.vocabulary.values().all(|&column| column < self.idf.len())
    }
}

/// `ln((1 + n) / (1 + df)) + 1`
fn smoothed_idf(n_documents: usize, document_frequency: usize) -> f64 {
    ((1 + n_documents) as f64 / (1 + document_frequency) as f64).ln() + 1.0
}
