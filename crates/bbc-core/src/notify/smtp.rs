//! SMTP + STARTTLS notifier.

use super::Notifier;
use crate::error::MailError;
use crate::registrations::Registration;
use crate::shared::CoreConfig;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

const NAME: &str = "smtp";

/// Sends an HTML summary of each registration from and to the school address.
pub struct SmtpNotifier {
    server: String,
    port: u16,
    address: String,
    password: String,
}

impl SmtpNotifier {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        address: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            address: address.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(
            config.smtp_server.clone(),
            config.smtp_port,
            config.email_address.clone(),
            config.email_password.clone(),
        )
    }

    /// Builds the message without sending it.
    pub fn build_message(&self, registration: &Registration) -> Result<Message, MailError> {
        let mailbox: Mailbox = self.address.parse()?;
        let message = Message::builder()
            .from(mailbox.clone())
            .to(mailbox)
            .subject(subject_for(registration))
            .header(ContentType::TEXT_HTML)
            .body(render_html(registration))?;
        Ok(message)
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        NAME
    }

    async fn notify(&self, registration: &Registration) -> Result<(), MailError> {
        if self.password.trim().is_empty() {
            return Err(MailError::NotConfigured);
        }
        let message = self.build_message(registration)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.server)?
            .port(self.port)
            .credentials(Credentials::new(self.address.clone(), self.password.clone()))
            .build();
        transport.send(message).await?;
        tracing::info!(
            target: "bbc::mail",
            to = %self.address,
            registrant = %registration.email,
            "Notification email sent"
        );
        Ok(())
    }
}

pub fn subject_for(registration: &Registration) -> String {
    format!(
        "✅ Nouvelle inscription BBC School - {} {}",
        registration.prenom, registration.nom
    )
}

/// HTML body of the notification. Registrant-supplied values are escaped.
pub fn render_html(r: &Registration) -> String {
    let telephone = if r.telephone.is_empty() {
        "Non renseigné".to_string()
    } else {
        escape(&r.telephone)
    };
    let row = |label: &str, value: &str, first: bool| {
        let width = if first { " width: 40%;" } else { "" };
        format!(
            "<tr><td style=\"padding: 8px; background-color: #f8f9fa; font-weight: bold;{width}\">{label}</td><td style=\"padding: 8px;\">{value}</td></tr>"
        )
    };
    let email = escape(&r.email);
    let candidate = [
        row("Nom complet:", &escape(&r.full_name()), true),
        row("Email:", &format!("<a href=\"mailto:{email}\">{email}</a>"), false),
        row("Téléphone:", &telephone, false),
        row("Établissement:", &escape(&r.etablissement), false),
    ]
    .concat();
    let course = [
        row("Matière:", &escape(&r.matiere), true),
        row("Niveau:", &escape(&r.niveau.to_uppercase()), false),
        row("Format:", &escape(&r.format), false),
    ]
    .concat();

    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; background-color: #f4f4f4; padding: 20px;">
<div style="max-width: 600px; margin: 0 auto; background-color: white; border-radius: 10px; padding: 30px;">
<h2 style="color: #4267B2; border-bottom: 3px solid #FF6B35; padding-bottom: 10px;">📝 Nouvelle inscription BBC School</h2>
<div style="margin: 20px 0;">
<h3 style="color: #333;">👤 Informations du candidat</h3>
<table style="width: 100%; border-collapse: collapse;">{candidate}</table>
</div>
<div style="margin: 20px 0;">
<h3 style="color: #333;">📚 Détails de la formation</h3>
<table style="width: 100%; border-collapse: collapse;">{course}</table>
</div>
<div style="margin: 20px 0; padding: 15px; background-color: #e3f2fd; border-left: 4px solid #4267B2; border-radius: 5px;">
<p style="margin: 5px 0;"><strong>ID inscription:</strong> {id}</p>
<p style="margin: 5px 0;"><strong>Date:</strong> {timestamp}</p>
<p style="margin: 5px 0;"><strong>IP:</strong> {ip}</p>
</div>
<div style="margin-top: 30px; padding-top: 20px; border-top: 2px solid #e0e0e0; text-align: center; color: #666;">
<p>BBC School Algeria - Système d'inscription automatique</p>
<p style="font-size: 12px;">Cet email a été généré automatiquement</p>
</div>
</div>
</body>
</html>"#,
        id = escape(&r.id),
        timestamp = escape(&r.timestamp),
        ip = escape(&r.ip_address),
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            id: "20250914103005".to_string(),
            timestamp: "2025-09-14T10:30:05.000000".to_string(),
            prenom: "Karim".to_string(),
            nom: "HADDAD".to_string(),
            email: "karim@example.dz".to_string(),
            etablissement: "Lycée <Pilote>".to_string(),
            matiere: "Informatique".to_string(),
            niveau: "intermediaire".to_string(),
            format: "hybride".to_string(),
            ip_address: "10.1.2.3".to_string(),
            ..Registration::default()
        }
    }

    #[test]
    fn subject_names_the_registrant() {
        assert_eq!(
            subject_for(&registration()),
            "✅ Nouvelle inscription BBC School - Karim HADDAD"
        );
    }

    #[test]
    fn html_lists_details_and_escapes_input() {
        let html = render_html(&registration());
        assert!(html.contains("Karim HADDAD"));
        assert!(html.contains("mailto:karim@example.dz"));
        assert!(html.contains("Non renseigné"));
        assert!(html.contains("INTERMEDIAIRE"));
        assert!(html.contains("Lycée &lt;Pilote&gt;"));
        assert!(!html.contains("<Pilote>"));
        assert!(html.contains("20250914103005"));
        assert!(html.contains("10.1.2.3"));
    }

    #[test]
    fn build_message_accepts_configured_address() {
        let notifier = SmtpNotifier::new("smtp.example.com", 587, "school@example.com", "secret");
        assert!(notifier.build_message(&registration()).is_ok());
    }

    #[test]
    fn build_message_rejects_bad_address() {
        let notifier = SmtpNotifier::new("smtp.example.com", 587, "not an address", "secret");
        assert!(matches!(
            notifier.build_message(&registration()),
            Err(MailError::Address(_))
        ));
    }

    #[tokio::test]
    async fn notify_without_password_is_not_configured() {
        let notifier = SmtpNotifier::new("smtp.example.com", 587, "school@example.com", "");
        let err = notifier.notify(&registration()).await.unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));
    }
}
