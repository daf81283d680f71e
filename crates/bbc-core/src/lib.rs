//! bbc-core: BBC School registration backend library (config, FAQ responder,
//! CSV registration store, notification mail).
//!
//! The gateway add-on wires these into HTTP routes; nothing here depends on axum.

mod error;
mod knowledge;
mod notify;
mod registrations;
mod shared;

pub use error::{MailError, StoreError};

pub use shared::{CoreConfig, INSCRIPTIONS_FILE_NAME};

pub use knowledge::{
    phrase_score, KnowledgeBase, KnowledgeEntry, Reply, ReplySource, Responder, TopicTrigger,
    EMPTY_QUERY_PROMPT, RELEVANCE_THRESHOLD,
};

pub use registrations::{
    title_case, Appended, RecentRegistration, Registration, RegistrationForm, RegistrationStats,
    RegistrationStore, ValidationError, CONFIRMED_STATUS, CSV_HEADER, DEFAULT_FORMAT, EXPORT_URL,
    REQUIRED_FIELDS, UNKNOWN,
};

pub use notify::{render_html, subject_for, Notifier, SmtpNotifier};
