//! FAQ knowledge base and the keyword-scoring responder behind `POST /chatbot`.

mod base;
mod responder;

pub use base::{KnowledgeBase, KnowledgeEntry, TopicTrigger, EMPTY_QUERY_PROMPT};
pub use responder::{phrase_score, Reply, ReplySource, Responder, RELEVANCE_THRESHOLD};
