//! BM25 lexical index
//!
//! Scores passages with Okapi BM25 (`k1 = 1.2`, `b = 0.75`). Tokens are
//! lowercase alphanumeric runs with inner decimal points kept, so `99.9%`
//! indexes as `99.9` and matches a bare number query.

use std::collections::HashMap;

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Split text into lowercase search terms
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Inverted term statistics over a growing set of passages
#[derive(Debug, Default, Clone)]
pub struct Bm25Index {
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    doc_freqs: HashMap<String, usize>,
    total_len: usize,
}

impl Bm25Index {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a passage; its id is its insertion position
    pub fn add(&mut self, text: &str) -> usize {
        let tokens = tokenize(text);
        let mut freqs: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *freqs.entry(token.clone()).or_insert(0) += 1;
        }
        for term in freqs.keys() {
            *self.doc_freqs.entry(term.clone()).or_insert(0) += 1;
        }
        self.total_len += tokens.len();
        self.doc_lens.push(tokens.len());
        self.term_freqs.push(freqs);
        self.term_freqs.len() - 1
    }

    /// Number of passages
    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    /// Whether the index holds no passages
    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.len() as f32;
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// BM25 score of passage `id` for the query terms
    pub fn score(&self, terms: &[String], id: usize) -> f32 {
        let Some(freqs) = self.term_freqs.get(id) else {
            return 0.0;
        };
        let avg_len = if self.is_empty() {
            0.0
        } else {
            self.total_len as f32 / self.len() as f32
        };
        let doc_len = self.doc_lens[id] as f32;
        terms
            .iter()
            .map(|term| {
                let tf = freqs.get(term).copied().unwrap_or(0) as f32;
                if tf == 0.0 {
                    return 0.0;
                }
                let norm = if avg_len > 0.0 {
                    1.0 - B + B * doc_len / avg_len
                } else {
                    1.0
                };
                self.idf(term) * tf * (K1 + 1.0) / (tf + K1 * norm)
            })
            .sum()
    }

    /// Best-scoring passages among those accepted by `filter`, best first
    ///
    /// Passages with no matching term are never returned.
    pub fn search<F>(&self, query: &str, filter: F, limit: usize) -> Vec<(usize, f32)>
    where
        F: Fn(usize) -> bool,
    {
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .filter(|id| filter(*id))
            .map(|id| (id, self.score(&terms, id)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(limit);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> Bm25Index {
        let mut index = Bm25Index::new();
        index.add("The service uptime shall be at least 99.9% per calendar month.");
        index.add("Incident response time for severity one issues is 30 minutes.");
        index.add("Invoices are payable within thirty days of receipt.");
        index.add("Uptime credits apply when uptime falls below the committed level.");
        index
    }

    #[test]
    fn test_tokenize_keeps_numbers() {
        assert_eq!(
            tokenize("Uptime >= 99.9%, monthly."),
            vec!["uptime", "99.9", "monthly"]
        );
        assert_eq!(tokenize("15% of fees"), vec!["15", "of", "fees"]);
    }

    #[test]
    fn test_number_query_matches_percentage() {
        let index = index();
        for query in ["99.9", "99.9%"] {
            let results = index.search(query, |_| true, 10);
            assert_eq!(results.len(), 1, "query {}", query);
            assert_eq!(results[0].0, 0);
        }
    }

    #[test]
    fn test_search_ranks_term_frequency() {
        let index = index();
        let results = index.search("uptime", |_| true, 10);
        assert_eq!(results.len(), 2);
        // Passage 3 mentions uptime twice
        assert_eq!(results[0].0, 3);
        assert_eq!(results[1].0, 0);
    }

    #[test]
    fn test_filter_and_limit() {
        let index = index();
        let results = index.search("uptime response invoices", |id| id != 3, 2);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(id, _)| *id != 3));
    }

    #[test]
    fn test_no_match() {
        let index = index();
        assert!(index.search("penalty", |_| true, 5).is_empty());
        assert!(index.search("   ", |_| true, 5).is_empty());
        assert_eq!(index.score(&["uptime".to_string()], 99), 0.0);
    }
}
