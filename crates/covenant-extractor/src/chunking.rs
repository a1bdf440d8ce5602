//! Semantic chunking of contract text
//!
//! Sentences are embedded together with their neighbours, and a chunk
//! boundary is placed wherever the cosine distance between consecutive
//! groups exceeds a percentile of all such distances. Chunks that are still
//! too long are packed sentence by sentence under the character limit.

use crate::config::ChunkingConfig;
use crate::error::ExtractorError;
use covenant_domain::traits::Embedder;
use std::sync::Arc;
use tracing::debug;

/// Splits text into topic-coherent chunks using an embedder
pub struct SemanticChunker<E> {
    embedder: Arc<E>,
    config: ChunkingConfig,
}

impl<E: Embedder> SemanticChunker<E> {
    /// Create a new chunker
    pub fn new(embedder: Arc<E>, config: ChunkingConfig) -> Self {
        Self { embedder, config }
    }

    /// Chunk the given text
    pub async fn chunk(&self, text: &str) -> Result<Vec<String>, ExtractorError> {
        let sentences = split_sentences(text);
        if sentences.len() <= 1 {
            return Ok(self.enforce_limit(sentences));
        }

        let groups = buffered_groups(&sentences, self.config.buffer_size);
        let vectors = embed_batched(&*self.embedder, &groups, self.config.embedding_batch_size).await?;
        let distances: Vec<f64> = vectors
            .windows(2)
            .map(|pair| cosine_distance(&pair[0], &pair[1]))
            .collect();
        let threshold = percentile(&distances, self.config.breakpoint_percentile);

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for (i, sentence) in sentences.iter().enumerate() {
            current.push(sentence);
            if distances.get(i).is_some_and(|d| *d > threshold) {
                chunks.push(current.join(" "));
                current.clear();
            }
        }
        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        debug!(
            "{} sentences grouped into {} semantic chunks (threshold {:.4})",
            sentences.len(),
            chunks.len(),
            threshold
        );
        Ok(self.enforce_limit(chunks))
    }

    fn enforce_limit(&self, chunks: Vec<String>) -> Vec<String> {
        let limit = self.config.max_chunk_chars;
        chunks
            .into_iter()
            .flat_map(|chunk| {
                if chunk.chars().count() <= limit {
                    vec![chunk]
                } else {
                    pack_sentences(&split_sentences(&chunk), limit)
                }
            })
            .collect()
    }
}

/// Split text after `.`, `!` or `?` followed by whitespace, and at blank lines
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let next = chars.peek().copied();
        let ends_sentence = matches!(c, '.' | '!' | '?') && next.is_none_or(char::is_whitespace);
        let blank_line = c == '\n' && next == Some('\n');
        if ends_sentence || blank_line {
            let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let tail = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Each sentence joined with `buffer` neighbours on either side
fn buffered_groups(sentences: &[String], buffer: usize) -> Vec<String> {
    (0..sentences.len())
        .map(|i| {
            let start = i.saturating_sub(buffer);
            let end = (i + buffer + 1).min(sentences.len());
            sentences[start..end].join(" ")
        })
        .collect()
}

/// Embed `texts` in batches of at most `batch_size`
pub(crate) async fn embed_batched<E: Embedder + ?Sized>(
    embedder: &E,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, ExtractorError> {
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let embedded = embedder.embed(batch).await.map_err(ExtractorError::embedding)?;
        if embedded.len() != batch.len() {
            return Err(ExtractorError::Embedding(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                embedded.len()
            )));
        }
        vectors.extend(embedded);
    }
    Ok(vectors)
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Percentile with linear interpolation between closest ranks
fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Combine sentences into chunks of at most `limit` characters
fn pack_sentences(sentences: &[String], limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences {
        let len = sentence.chars().count();
        if current_len > 0 && current_len + 1 + len > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if len > limit {
            chunks.extend(split_at_char_limit(sentence, limit));
            continue;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(sentence);
        current_len += len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split text into pieces of at most `limit` characters, preferring whitespace
fn split_at_char_limit(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + limit).min(chars.len());
        if end < chars.len() {
            if let Some(space) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if space > 0 {
                    end = start + space;
                }
            }
        }
        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        start = end;
    }
    pieces
}
