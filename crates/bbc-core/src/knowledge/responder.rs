//! Keyword-scoring FAQ responder.
//!
//! Three tiers, first hit wins:
//!
//! | Tier    | Match rule                                                    |
//! |---------|---------------------------------------------------------------|
//! | Keyword | best `matched phrase tokens / phrase tokens`, must be > 0.3   |
//! | Topic   | any trigger token is a substring of the normalized query      |
//! | Default | uniform random pick from the default replies                  |

use super::base::KnowledgeBase;
use rand::Rng;
use std::fmt;
use std::sync::Arc;

/// A keyword phrase must score strictly above this to be used.
pub const RELEVANCE_THRESHOLD: f64 = 0.3;

/// Characters of the query kept in the per-call log line.
const LOG_QUERY_CHARS: usize = 50;

/// Which tier produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// Empty or whitespace-only query.
    EmptyQuery,
    /// Keyword entry at this index of the knowledge base.
    Keyword(usize),
    /// Topic trigger at this index.
    Topic(usize),
    /// Default reply at this index.
    Default(usize),
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplySource::EmptyQuery => f.write_str("empty"),
            ReplySource::Keyword(_) => f.write_str("keyword"),
            ReplySource::Topic(_) => f.write_str("topic"),
            ReplySource::Default(_) => f.write_str("default"),
        }
    }
}

/// A reply together with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<'a> {
    pub text: &'a str,
    pub source: ReplySource,
}

/// Answers free-text questions from an immutable [`KnowledgeBase`].
///
/// Holds no mutable state; share it behind an `Arc` and call from any thread.
#[derive(Debug, Clone)]
pub struct Responder {
    kb: Arc<KnowledgeBase>,
}

impl Responder {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self { kb: Arc::new(kb) }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// The reply for an empty question.
    pub fn empty_prompt(&self) -> &str {
        &self.kb.empty_prompt
    }

    /// Answers `query` using the thread-local generator for the default tier.
    pub fn respond(&self, query: &str) -> String {
        self.respond_with_rng(query, &mut rand::thread_rng())
    }

    /// Answers `query`; `rng` is only consulted when no keyword or topic matches.
    pub fn respond_with_rng<R: Rng>(&self, query: &str, rng: &mut R) -> String {
        self.reply_with_rng(query, rng).text.to_string()
    }

    /// Like [`Responder::respond_with_rng`] but also reports which tier answered.
    pub fn reply_with_rng<R: Rng>(&self, query: &str, rng: &mut R) -> Reply<'_> {
        let normalized = query.trim().to_lowercase();
        let reply = self.select(&normalized, rng);
        let preview: String = normalized.chars().take(LOG_QUERY_CHARS).collect();
        tracing::info!(target: "bbc::chatbot", branch = %reply.source, "Chatbot reply for '{}'", preview);
        reply
    }

    fn select<R: Rng>(&self, normalized: &str, rng: &mut R) -> Reply<'_> {
        if normalized.is_empty() {
            return Reply {
                text: &self.kb.empty_prompt,
                source: ReplySource::EmptyQuery,
            };
        }

        let query_words: Vec<&str> = normalized.split_whitespace().collect();
        if let Some((index, _score)) = self.best_keyword(&query_words) {
            return Reply {
                text: &self.kb.entries[index].response,
                source: ReplySource::Keyword(index),
            };
        }

        if let Some((index, topic)) = self
            .kb
            .topics
            .iter()
            .enumerate()
            .find(|(_, t)| t.fires_on(normalized))
        {
            return Reply {
                text: &topic.response,
                source: ReplySource::Topic(index),
            };
        }

        // A base without defaults still answers something.
        if self.kb.defaults.is_empty() {
            return Reply {
                text: &self.kb.empty_prompt,
                source: ReplySource::EmptyQuery,
            };
        }
        let index = rng.gen_range(0..self.kb.defaults.len());
        Reply {
            text: &self.kb.defaults[index],
            source: ReplySource::Default(index),
        }
    }

    /// Index and score of the best entry if it clears [`RELEVANCE_THRESHOLD`].
    /// Ties keep the earlier entry.
    fn best_keyword(&self, query_words: &[&str]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        let mut best_score = 0.0;
        for (index, entry) in self.kb.entries.iter().enumerate() {
            let score = phrase_score(&entry.keyword_phrase, query_words);
            if score > best_score {
                best_score = score;
                best = Some((index, score));
            }
        }
        best.filter(|(_, score)| *score > RELEVANCE_THRESHOLD)
    }
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(KnowledgeBase::builtin())
    }
}

/// Fraction of the phrase's whitespace tokens present verbatim in `query_words`.
/// A phrase with no tokens scores 0.
pub fn phrase_score(keyword_phrase: &str, query_words: &[&str]) -> f64 {
    let phrase = keyword_phrase.to_lowercase();
    let tokens: Vec<&str> = phrase.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let matches = tokens.iter().filter(|t| query_words.contains(*t)).count();
    matches as f64 / tokens.len() as f64
}
