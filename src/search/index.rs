//! Inverted index persisted in its own store file

use std::collections::{BTreeMap, HashMap};
use std::fs;

use serde::{Deserialize, Serialize};

use crate::config::StoreOptions;
use crate::engine::{Engine, WriteTxn};
use crate::error::{LarigotError, Result};
use crate::store::{encode_id, parse_id, BucketPath, BucketRead, BucketWrite};
use super::bm25::Bm25Params;
use super::tokenizer::{tokenize, Query};
use super::IndexTask;

const DOCS: &str = "docs";
const POSTINGS: &str = "postings";
const META: &str = "meta";

const READY_KEY: &[u8] = b"ready";
const STATS_KEY: &[u8] = b"stats";

/// Separates a term from the post id in a postings key
const TERM_SEPARATOR: u8 = 0x00;

/// Per-document record: what to remove when the post is reindexed
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocRecord {
    thread_id: u64,
    length: u32,
    terms: Vec<(String, u32)>,
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
struct IndexStats {
    doc_count: u64,
    total_len: u64,
}

/// A ranked keyword match
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub post_id: u64,
    pub thread_id: u64,
    pub score: f64,
}

/// Keyword index mapping terms to posts
pub struct SearchIndex {
    engine: Engine,
    params: Bm25Params,
    limit: usize,
    docs: BucketPath,
    postings: BucketPath,
    meta: BucketPath,
}

impl SearchIndex {
    /// Open (or create) the index file
    pub fn open(options: StoreOptions, limit: usize) -> Result<Self> {
        let engine = Engine::open(options)?;
        let index = Self {
            engine,
            params: Bm25Params::default(),
            limit,
            docs: BucketPath::root(DOCS),
            postings: BucketPath::root(POSTINGS),
            meta: BucketPath::root(META),
        };
        index.engine.update(|tx| {
            tx.create_bucket_if_not_exists(&index.docs)?;
            tx.create_bucket_if_not_exists(&index.postings)?;
            tx.create_bucket_if_not_exists(&index.meta)
        })?;
        Ok(index)
    }

    /// Open the index, starting from an empty file if the existing one is
    /// unreadable or was never completed
    ///
    /// Returns the index and whether it has to be rebuilt.
    pub fn open_or_reset(options: StoreOptions, limit: usize) -> Result<(Self, bool)> {
        let existed = options.path.exists();
        match Self::open(options.clone(), limit) {
            Ok(index) => match index.is_ready() {
                Ok(true) => return Ok((index, false)),
                Ok(false) if existed => tracing::warn!(
                    "Search index {} is incomplete, rebuilding",
                    options.path.display()
                ),
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    "Search index {} is unreadable ({}), rebuilding",
                    options.path.display(),
                    e
                ),
            },
            Err(e) => tracing::warn!(
                "Search index {} failed to open ({}), rebuilding",
                options.path.display(),
                e
            ),
        }

        if options.path.exists() {
            fs::remove_file(&options.path)?;
        }
        Ok((Self::open(options, limit)?, true))
    }

    /// True if the index was last closed with every post applied
    ///
    /// The marker is cleared while an indexing pipeline runs, so an unclean
    /// exit leaves it unset.
    pub fn is_ready(&self) -> Result<bool> {
        self.engine
            .view(|tx| Ok(tx.read(&self.meta, READY_KEY)?.is_some()))
    }

    /// Set or clear the ready marker and sync it to disk
    pub fn set_ready(&self, ready: bool) -> Result<()> {
        self.engine.update(|tx| {
            if ready {
                tx.write(&self.meta, READY_KEY, vec![1])
            } else {
                tx.remove(&self.meta, READY_KEY)
            }
        })?;
        self.engine.sync()
    }

    /// Number of indexed posts
    pub fn doc_count(&self) -> Result<u64> {
        self.engine.view(|tx| {
            Ok(tx
                .read_record::<IndexStats>(&self.meta, STATS_KEY)?
                .unwrap_or_default()
                .doc_count)
        })
    }

    /// Index one post, replacing any earlier version of it
    pub fn index(&self, task: &IndexTask) -> Result<()> {
        self.engine.update(|tx| self.index_in(tx, task))
    }

    /// Index several posts in one transaction
    pub fn index_batch(&self, tasks: &[IndexTask]) -> Result<()> {
        self.engine.update(|tx| {
            for task in tasks {
                self.index_in(tx, task)?;
            }
            Ok(())
        })
    }

    fn index_in(&self, tx: &mut WriteTxn<'_>, task: &IndexTask) -> Result<()> {
        let doc_key = encode_id(task.post_id);
        let mut stats: IndexStats = tx
            .read_record(&self.meta, STATS_KEY)?
            .unwrap_or_default();

        if let Some(old) = tx.read_record::<DocRecord>(&self.docs, doc_key.as_bytes())? {
            for (term, _) in &old.terms {
                tx.remove(&self.postings, &posting_key(term, &doc_key))?;
            }
            stats.doc_count = stats.doc_count.saturating_sub(1);
            stats.total_len = stats.total_len.saturating_sub(old.length as u64);
        }

        let mut frequencies: BTreeMap<String, u32> = BTreeMap::new();
        let mut length = 0u32;
        for term in tokenize(&task.author).into_iter().chain(tokenize(&task.text)) {
            *frequencies.entry(term).or_insert(0) += 1;
            length += 1;
        }

        for (term, tf) in &frequencies {
            tx.write(&self.postings, &posting_key(term, &doc_key), tf.to_be_bytes().to_vec())?;
        }
        tx.write_record(
            &self.docs,
            doc_key.as_bytes(),
            &DocRecord {
                thread_id: task.thread_id,
                length,
                terms: frequencies.into_iter().collect(),
            },
        )?;

        stats.doc_count += 1;
        stats.total_len += length as u64;
        tx.write_record(&self.meta, STATS_KEY, &stats)
    }

    /// Ranked posts matching `query`, at most the configured limit
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query = Query::parse(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        self.engine.view(|tx| {
            let stats: IndexStats = tx
                .read_record(&self.meta, STATS_KEY)?
                .unwrap_or_default();
            if stats.doc_count == 0 {
                return Ok(Vec::new());
            }
            let avg_len = stats.total_len as f64 / stats.doc_count as f64;

            let mut postings: HashMap<&str, BTreeMap<u64, u32>> = HashMap::new();
            for term in query.scored_terms().chain(query.excluded.iter()) {
                postings.insert(term.as_str(), self.postings_of(tx, term)?);
            }

            let candidates: Vec<u64> = if query.required.is_empty() {
                let mut all: Vec<u64> = query
                    .optional
                    .iter()
                    .flat_map(|t| postings[t.as_str()].keys().copied())
                    .collect();
                all.sort_unstable();
                all.dedup();
                all
            } else {
                let (first, rest) = query.required.split_at(1);
                postings[first[0].as_str()]
                    .keys()
                    .copied()
                    .filter(|id| rest.iter().all(|t| postings[t.as_str()].contains_key(id)))
                    .collect()
            };

            let mut hits = Vec::new();
            for post_id in candidates {
                if query
                    .excluded
                    .iter()
                    .any(|t| postings[t.as_str()].contains_key(&post_id))
                {
                    continue;
                }
                let Some(doc) = tx.read_record::<DocRecord>(&self.docs, encode_id(post_id).as_bytes())? else {
                    tracing::warn!("Posting for post {} has no document record", post_id);
                    continue;
                };

                let score = query
                    .scored_terms()
                    .filter_map(|t| {
                        let list = &postings[t.as_str()];
                        list.get(&post_id).map(|tf| {
                            let idf = self.params.idf(stats.doc_count, list.len() as u64);
                            self.params.term_score(idf, *tf, doc.length, avg_len)
                        })
                    })
                    .sum();

                hits.push(SearchHit {
                    post_id,
                    thread_id: doc.thread_id,
                    score,
                });
            }

            hits.sort_by(|a, b| {
                b.score
                    .total_cmp(&a.score)
                    .then_with(|| b.post_id.cmp(&a.post_id))
            });
            hits.truncate(self.limit);
            Ok(hits)
        })
    }

    fn postings_of<T: BucketRead>(&self, tx: &T, term: &str) -> Result<BTreeMap<u64, u32>> {
        let mut prefix = term.as_bytes().to_vec();
        prefix.push(TERM_SEPARATOR);

        let mut out = BTreeMap::new();
        let mut cursor = tx.cursor(&self.postings)?;
        let mut item = cursor.seek(&prefix);
        while let Some((key, value)) = item {
            let Some(id_part) = key.strip_prefix(prefix.as_slice()) else {
                break;
            };
            let id = std::str::from_utf8(id_part).ok().and_then(parse_id);
            let tf = <[u8; 4]>::try_from(value.as_slice()).ok().map(u32::from_be_bytes);
            match (id, tf) {
                (Some(id), Some(tf)) => {
                    out.insert(id, tf);
                }
                _ => {
                    return Err(LarigotError::Search(format!(
                        "malformed posting for term {:?}",
                        term
                    )))
                }
            }
            item = cursor.next();
        }
        Ok(out)
    }

    /// Sync and close the index file
    pub fn close(self) -> Result<()> {
        self.engine.close()
    }
}

fn posting_key(term: &str, doc_key: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(term.len() + 1 + doc_key.len());
    key.extend_from_slice(term.as_bytes());
    key.push(TERM_SEPARATOR);
    key.extend_from_slice(doc_key.as_bytes());
    key
}
