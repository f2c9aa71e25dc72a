//! Email service for sending transactional emails.
//!
//! Uses `lettre` for SMTP transport.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Summary of an invoice used in the "invoice sent" notification.
#[derive(Debug, Clone)]
pub struct InvoiceNotice<'a> {
    /// Invoice number, e.g. `INV-2026-004`.
    pub number: &'a str,
    /// Issuing business name.
    pub business_name: &'a str,
    /// Total amount as formatted text.
    pub total: &'a str,
    /// Currency code.
    pub currency: &'a str,
    /// Due date as formatted text.
    pub due_date: &'a str,
}

/// Email service for sending transactional emails.
#[derive(Debug, Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
            &self.config.smtp_host,
        )
        .port(self.config.smtp_port);

        if !self.config.smtp_username.is_empty() {
            builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| EmailError::SendError(e.to_string()))?
                .port(self.config.smtp_port)
                .credentials(Credentials::new(
                    self.config.smtp_username.clone(),
                    self.config.smtp_password.clone(),
                ));
        }

        Ok(builder.build())
    }

    /// Link the user follows to verify their email address.
    #[must_use]
    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/verify-email?token={token}", self.config.frontend_url)
    }

    /// Link the user follows to choose a new password.
    #[must_use]
    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={token}", self.config.frontend_url)
    }

    /// Sends an email verification email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_verification_email(
        &self,
        to_email: &str,
        to_name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = self.verification_link(token);
        let app = &self.config.from_name;

        let subject = "Verify your email address";
        let body = format!(
            r"Hi {to_name},

Thanks for signing up to {app}. Please verify your email address by opening the link below:

{link}

This link will expire in 24 hours.

If you didn't create an account, you can safely ignore this email."
        );

        self.send_email(to_email, subject, &body).await
    }

    /// Sends a password reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        to_name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = self.reset_link(token);

        let subject = "Reset your password";
        let body = format!(
            r"Hi {to_name},

We received a request to reset your password. Open the link below to choose a new one:

{link}

This link will expire in 1 hour.

If you didn't request a password reset, you can ignore this email. Your password won't be changed."
        );

        self.send_email(to_email, subject, &body).await
    }

    /// Sends the welcome email once an address is verified.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_welcome_email(&self, to_email: &str, to_name: &str) -> Result<(), EmailError> {
        let app = &self.config.from_name;
        let dashboard = format!("{}/dashboard", self.config.frontend_url);

        let subject = format!("Welcome to {app}!");
        let body = format!(
            r"Welcome aboard, {to_name}!

Your email has been verified. From here you can set up your business profile,
create your first invoice and start tracking expenses.

{dashboard}"
        );

        self.send_email(to_email, &subject, &body).await
    }

    /// Notifies a client that an invoice was issued to them.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_invoice_email(
        &self,
        to_email: &str,
        to_name: &str,
        invoice: &InvoiceNotice<'_>,
    ) -> Result<(), EmailError> {
        let subject = format!("Invoice {} from {}", invoice.number, invoice.business_name);
        let body = format!(
            r"Dear {to_name},

{business} has issued invoice {number} for {total} {currency}, due on {due}.

Kind regards,
{business}",
            business = invoice.business_name,
            number = invoice.number,
            total = invoice.total,
            currency = invoice.currency,
            due = invoice.due_date,
        );

        self.send_email(to_email, &subject, &body).await
    }

    /// Sends a generic email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let email = self.build_message(to_email, subject, body)?;

        let transport = self.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        tracing::debug!(to = %to_email, subject = %subject, "email sent");
        Ok(())
    }

    fn build_message(&self, to_email: &str, subject: &str, body: &str) -> Result<Message, EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> EmailService {
        EmailService::new(EmailConfig {
            frontend_url: "https://app.factura.tn".to_string(),
            ..EmailConfig::default()
        })
    }

    #[test]
    fn test_links_use_frontend_url() {
        let service = service();
        assert_eq!(
            service.verification_link("abc"),
            "https://app.factura.tn/verify-email?token=abc"
        );
        assert_eq!(
            service.reset_link("xyz"),
            "https://app.factura.tn/reset-password?token=xyz"
        );
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let result = service().build_message("not an address", "s", "b");
        assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
    }

    #[test]
    fn test_build_message_ok() {
        assert!(service().build_message("client@example.tn", "s", "b").is_ok());
    }
}
