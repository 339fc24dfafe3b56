//! Tokenizer and query parser

/// Longest term kept; longer runs are truncated
pub const MAX_TERM_LEN: usize = 64;

/// Split text into lowercase alphanumeric terms
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.chars().take(MAX_TERM_LEN).flat_map(char::to_lowercase).collect())
        .collect()
}

/// A parsed keyword query
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Query {
    /// `+term`: every hit must contain these
    pub required: Vec<String>,
    /// `-term`: no hit may contain these
    pub excluded: Vec<String>,
    /// plain terms: ranked when present
    pub optional: Vec<String>,
}

impl Query {
    /// Parse whitespace separated words with optional `+`/`-` prefixes
    pub fn parse(input: &str) -> Self {
        let mut query = Query::default();
        for word in input.split_whitespace() {
            let (target, rest) = match word.as_bytes()[0] {
                b'+' => (&mut query.required, &word[1..]),
                b'-' => (&mut query.excluded, &word[1..]),
                _ => (&mut query.optional, word),
            };
            for term in tokenize(rest) {
                if !target.contains(&term) {
                    target.push(term);
                }
            }
        }
        query
    }

    /// Terms that contribute to the score
    pub fn scored_terms(&self) -> impl Iterator<Item = &String> {
        self.required.iter().chain(self.optional.iter())
    }

    /// True if nothing could match
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty()
    }
}
