//! Registration notifications sent to the school's mailbox.

mod smtp;

pub use smtp::{render_html, subject_for, SmtpNotifier};

use crate::error::MailError;
use crate::registrations::Registration;

/// Delivers a notification for a freshly stored registration.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Sends the notification. Callers log failures and carry on.
    async fn notify(&self, registration: &Registration) -> Result<(), MailError>;
}
