//! Embedding-based keyword extraction.
//!
//! Candidates are the n-grams of the document (lowercased, stop words
//! removed). Each candidate and the whole document are embedded, and
//! candidates are ranked by cosine similarity to the document.

use crate::core::stop_words::ENGLISH_STOP_WORDS;
use crate::domain::model::Keyword;
use crate::domain::ports::{Embedder, KeywordTagger};
use crate::utils::error::{DocError, Result};
use crate::utils::validation::{validate_positive_number, validate_range};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

/// Candidates are embedded in chunks of this size.
const EMBED_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    /// Highest cosine similarity first.
    Similarity,
    /// Maximal marginal relevance; `diversity` in `[0, 1]`.
    Mmr { diversity: f32 },
    /// Least mutually similar `top_n` out of the `nr_candidates` best.
    MaxSum { nr_candidates: usize },
}

#[derive(Debug, Clone)]
pub struct KeywordConfig {
    pub top_n: usize,
    pub ngram_range: (usize, usize),
    pub use_stop_words: bool,
    pub extra_stop_words: Vec<String>,
    pub selection: Selection,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            ngram_range: (1, 1),
            use_stop_words: true,
            extra_stop_words: Vec::new(),
            selection: Selection::Similarity,
        }
    }
}

impl KeywordConfig {
    pub fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        validate_positive_number("keywords.ngram_min", min_n, 1)?;
        if max_n < min_n {
            return Err(DocError::InvalidConfigValueError {
                field: "keywords.ngram_max".to_string(),
                value: max_n.to_string(),
                reason: format!("Must not be smaller than ngram_min ({})", min_n),
            });
        }
        match self.selection {
            Selection::Mmr { diversity } => validate_range("keywords.diversity", diversity, 0.0, 1.0),
            Selection::MaxSum { nr_candidates } => {
                validate_positive_number("keywords.nr_candidates", nr_candidates, 1)
            }
            Selection::Similarity => Ok(()),
        }
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

pub struct KeywordExtractor<E: Embedder> {
    embedder: E,
    config: KeywordConfig,
    stop_words: HashSet<String>,
}

impl<E: Embedder> KeywordExtractor<E> {
    pub fn new(embedder: E, config: KeywordConfig) -> Result<Self> {
        config.validate()?;

        let mut stop_words: HashSet<String> = HashSet::new();
        if config.use_stop_words {
            stop_words.extend(ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()));
        }
        stop_words.extend(config.extra_stop_words.iter().map(|w| w.to_lowercase()));

        Ok(Self {
            embedder,
            config,
            stop_words,
        })
    }

    pub fn config(&self) -> &KeywordConfig {
        &self.config
    }

    /// Unique candidate phrases in lexical order.
    pub fn candidates(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = token_pattern()
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .collect();

        let (min_n, max_n) = self.config.ngram_range;
        let mut phrases = BTreeSet::new();
        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                phrases.insert(window.join(" "));
            }
        }
        phrases.into_iter().collect()
    }

    fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            let batch = self.embedder.embed_batch(chunk)?;
            if batch.len() != chunk.len() {
                return Err(DocError::EmbeddingError {
                    message: format!("Expected {} embeddings, model returned {}", chunk.len(), batch.len()),
                });
            }
            embeddings.extend(batch);
        }
        Ok(embeddings)
    }

    pub fn extract(&self, text: &str, top_n: usize) -> Result<Vec<Keyword>> {
        if top_n == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.candidates(text);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let doc_embedding = self
            .embed_all(&[text])?
            .pop()
            .ok_or_else(|| DocError::EmbeddingError {
                message: "Model returned no document embedding".to_string(),
            })?;
        let candidate_refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
        let candidate_embeddings = self.embed_all(&candidate_refs)?;

        let doc_similarity: Vec<f32> = candidate_embeddings
            .iter()
            .map(|e| cosine_similarity(&doc_embedding, e))
            .collect();
        let top_n = top_n.min(candidates.len());

        let selected = match self.config.selection {
            Selection::Similarity => top_by_similarity(&doc_similarity, top_n),
            Selection::Mmr { diversity } => {
                mmr(&doc_similarity, &candidate_embeddings, top_n, diversity)
            }
            Selection::MaxSum { nr_candidates } => {
                max_sum(&doc_similarity, &candidate_embeddings, top_n, nr_candidates)
            }
        };

        let mut keywords: Vec<Keyword> = selected
            .into_iter()
            .map(|idx| Keyword {
                text: candidates[idx].clone(),
                score: round4(doc_similarity[idx]),
            })
            .collect();
        // MMR 保留挑選順序
        if !matches!(self.config.selection, Selection::Mmr { .. }) {
            keywords.sort_by(|a, b| b.score.total_cmp(&a.score));
        }
        Ok(keywords)
    }
}

impl<E: Embedder> KeywordTagger for KeywordExtractor<E> {
    fn extract_keywords(&self, text: &str) -> Result<Vec<Keyword>> {
        self.extract(text, self.config.top_n)
    }

    fn extract_keywords_top(&self, text: &str, top_n: usize) -> Result<Vec<Keyword>> {
        self.extract(text, top_n)
    }
}

fn ranked(doc_similarity: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..doc_similarity.len()).collect();
    // 穩定排序：分數相同時保留字典序
    order.sort_by(|&a, &b| doc_similarity[b].total_cmp(&doc_similarity[a]));
    order
}

fn top_by_similarity(doc_similarity: &[f32], top_n: usize) -> Vec<usize> {
    let mut order = ranked(doc_similarity);
    order.truncate(top_n);
    order
}

fn mmr(doc_similarity: &[f32], embeddings: &[Vec<f32>], top_n: usize, diversity: f32) -> Vec<usize> {
    let mut remaining = ranked(doc_similarity);
    let mut selected = vec![remaining.remove(0)];

    while selected.len() < top_n && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (pos, &candidate) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&s| cosine_similarity(&embeddings[candidate], &embeddings[s]))
                .fold(f32::NEG_INFINITY, f32::max);
            let score = (1.0 - diversity) * doc_similarity[candidate] - diversity * redundancy;
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }
        selected.push(remaining.remove(best_pos));
    }
    selected
}

fn max_sum(
    doc_similarity: &[f32],
    embeddings: &[Vec<f32>],
    top_n: usize,
    nr_candidates: usize,
) -> Vec<usize> {
    let mut pool = ranked(doc_similarity);
    pool.truncate(nr_candidates.max(top_n));

    let pair_similarity: Vec<Vec<f32>> = pool
        .iter()
        .map(|&a| pool.iter().map(|&b| cosine_similarity(&embeddings[a], &embeddings[b])).collect())
        .collect();

    let mut best: Option<(f32, Vec<usize>)> = None;
    let mut combination: Vec<usize> = (0..top_n).collect();
    loop {
        let mut sum = 0.0;
        for (i, &a) in combination.iter().enumerate() {
            for &b in &combination[i + 1..] {
                sum += pair_similarity[a][b];
            }
        }
        let improves = match &best {
            Some((best_sum, _)) => sum < *best_sum,
            None => true,
        };
        if improves {
            best = Some((sum, combination.clone()));
        }
        if !next_combination(&mut combination, pool.len()) {
            break;
        }
    }

    best.map(|(_, combo)| combo.into_iter().map(|i| pool[i]).collect())
        .unwrap_or_default()
}

/// Advances `combo` to the next k-combination of `0..n` in lexical order.
fn next_combination(combo: &mut [usize], n: usize) -> bool {
    let k = combo.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if combo[i] < n - k + i {
            combo[i] += 1;
            for j in i + 1..k {
                combo[j] = combo[j - 1] + 1;
            }
            return true;
        }
    }
    false
}
