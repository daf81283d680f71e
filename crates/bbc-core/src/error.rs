use thiserror::Error;

/// Errors from the CSV registration store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error on the data directory or CSV file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV or a row that does not fit the registration schema.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors from the notification mailer.
#[derive(Debug, Error)]
pub enum MailError {
    /// No SMTP password configured; nothing was sent.
    #[error("mail not configured: set BBC_EMAIL_PASSWORD")]
    NotConfigured,

    /// Sender or recipient address failed to parse.
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled.
    #[error("message build error: {0}")]
    Build(#[from] lettre::error::Error),

    /// SMTP connection, TLS or authentication failure.
    #[error("smtp error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}
