//! BM25 ranking
//!
//! ```text
//! score(q, d) = Σ IDF(t) * (TF(t,d) * (k1 + 1)) / (TF(t,d) + k1 * (1 - b + b * |d|/avgdl))
//! IDF(t)      = ln((N - df(t) + 0.5) / (df(t) + 0.5) + 1)
//! ```

/// BM25 scoring parameters
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f64,
    /// Length normalization (0 = none, 1 = full)
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Params {
    /// Inverse document frequency of a term found in `df` of `n` documents
    pub fn idf(&self, n: u64, df: u64) -> f64 {
        let n = n as f64;
        let df = df as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Contribution of one term to one document's score
    pub fn term_score(&self, idf: f64, tf: u32, doc_len: u32, avg_doc_len: f64) -> f64 {
        let tf = tf as f64;
        let norm = if avg_doc_len > 0.0 {
            doc_len as f64 / avg_doc_len
        } else {
            1.0
        };
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * norm))
    }
}
