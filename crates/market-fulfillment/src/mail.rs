//! # SMTP Delivery
//!
//! [`NotificationDispatcher`] over an async lettre transport.
//!
//! ```text
//! Notification ──► build_message ──► multipart/mixed
//!                                     ├── text/plain  body
//!                                     └── attachment  order_*.pdf
//!                       │
//!                       ▼
//!              AsyncSmtpTransport (plain SMTP, optional AUTH)
//! ```
//!
//! The transport is unencrypted. It targets a local relay or a development
//! catcher such as MailHog on port 1025.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::MailSettings;
use crate::error::DeliveryError;
use crate::ports::{Notification, NotificationDispatcher};

/// Sends notifications through an SMTP server.
#[derive(Clone)]
pub struct SmtpDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpDispatcher {
    /// Builds the transport. No connection is made until the first send.
    pub fn new(settings: &MailSettings) -> Result<Self, DeliveryError> {
        let from: Mailbox = settings
            .from_address
            .parse()
            .map_err(|e| DeliveryError::InvalidMessage(format!("from address: {e}")))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(settings.smtp_host.as_str())
                .port(settings.smtp_port)
                .timeout(Some(settings.timeout()));

        if let Some(username) = settings.username.as_deref().filter(|u| !u.is_empty()) {
            builder = builder.credentials(Credentials::new(
                username.to_string(),
                settings.password.clone().unwrap_or_default(),
            ));
        }

        debug!(
            host = %settings.smtp_host,
            port = settings.smtp_port,
            "SMTP dispatcher configured"
        );

        Ok(SmtpDispatcher {
            transport: builder.build(),
            from,
        })
    }

    /// Turns a notification into a MIME message.
    pub fn build_message(&self, notification: &Notification) -> Result<Message, DeliveryError> {
        let to: Mailbox = notification
            .recipient
            .parse()
            .map_err(|e| DeliveryError::InvalidMessage(format!("recipient: {e}")))?;

        let content_type = ContentType::parse(&notification.attachment.content_type)
            .map_err(|e| DeliveryError::InvalidMessage(format!("content type: {e}")))?;

        let attachment = MailAttachment::new(notification.attachment.file_name.clone())
            .body(notification.attachment.bytes.clone(), content_type);

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(notification.body.clone()))
                    .singlepart(attachment),
            )
            .map_err(|e| DeliveryError::InvalidMessage(e.to_string()))
    }
}

#[async_trait]
impl NotificationDispatcher for SmtpDispatcher {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let message = self.build_message(notification)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        info!(
            recipient = %notification.recipient,
            code = %response.code(),
            "Confirmation mail accepted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn settings() -> MailSettings {
        MailSettings {
            smtp_host: "127.0.0.1".to_string(),
            // Nothing listens on port 1, so the connection is refused.
            smtp_port: 1,
            username: None,
            password: None,
            from_address: "orders@market.test".to_string(),
            timeout_secs: 2,
        }
    }

    fn notification(recipient: &str) -> Notification {
        Notification::order_confirmation(
            recipient,
            Path::new("order_20240301_120000_1.pdf"),
            b"%PDF-1.4\n%%EOF\n".to_vec(),
        )
    }

    #[test]
    fn test_message_has_subject_and_attachment() {
        let dispatcher = SmtpDispatcher::new(&settings()).unwrap();
        let message = dispatcher
            .build_message(&notification("ada@example.com"))
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Order Confirmation"));
        assert!(raw.contains("To: ada@example.com"));
        assert!(raw.contains("order_20240301_120000_1.pdf"));
        assert!(raw.contains("application/pdf"));
    }

    #[test]
    fn test_bad_from_address_is_rejected() {
        let mut bad = settings();
        bad.from_address = "not an address".to_string();

        assert!(matches!(
            SmtpDispatcher::new(&bad),
            Err(DeliveryError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_bad_recipient_is_rejected() {
        let dispatcher = SmtpDispatcher::new(&settings()).unwrap();
        assert!(matches!(
            dispatcher.build_message(&notification("nobody")),
            Err(DeliveryError::InvalidMessage(_))
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        let dispatcher = SmtpDispatcher::new(&settings()).unwrap();
        let err = dispatcher
            .deliver(&notification("ada@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Transport(_)), "{err:?}");
    }
}
