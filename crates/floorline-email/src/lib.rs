//! Outbound email. Every sender tolerates failure: the state change that
//! queued the message has already committed, so failures are logged, never
//! propagated into request outcomes.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

pub type EmailResult<T> = Result<T, EmailError>;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

fn default_port() -> u16 {
    587
}

/// `Disabled` is the dev-mode transport: sends are logged and dropped, and
/// callers can ask `is_enabled()` to skip flows that require delivery (2FA).
#[derive(Clone)]
pub enum EmailService {
    Disabled,
    Smtp(SmtpMailer),
}

impl EmailService {
    pub fn disabled() -> Self {
        Self::Disabled
    }

    pub fn smtp(settings: &SmtpSettings) -> EmailResult<Self> {
        Ok(Self::Smtp(SmtpMailer::try_new(settings)?))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Smtp(_))
    }

    pub async fn send(&self, to: &str, subject: &str, body: String) -> EmailResult<()> {
        match self {
            Self::Disabled => {
                tracing::info!(recipient = %to, subject, "email transport disabled; skipping send");
                Ok(())
            }
            Self::Smtp(mailer) => mailer.send(to, subject, body).await,
        }
    }

    // ─────────────── typed messages the platform sends ───────────────

    pub async fn order_confirmation(
        &self,
        to: &str,
        order_number: &str,
        total: &str,
    ) -> EmailResult<()> {
        self.send(
            to,
            &format!("Order {order_number} confirmed"),
            format!(
                "Thanks for your order!\n\nOrder number: {order_number}\nTotal: ${total}\n\n\
                 We'll email you tracking as soon as it ships."
            ),
        )
        .await
    }

    pub async fn two_factor_code(&self, to: &str, code: &str) -> EmailResult<()> {
        self.send(
            to,
            "Your verification code",
            format!("Your sign-in code is {code}. It expires in 10 minutes."),
        )
        .await
    }

    pub async fn payment_request(
        &self,
        to: &str,
        order_number: &str,
        amount: &str,
        checkout_url: &str,
    ) -> EmailResult<()> {
        self.send(
            to,
            &format!("Balance due on order {order_number}"),
            format!(
                "There is a balance of ${amount} on order {order_number}.\n\n\
                 Pay securely here: {checkout_url}\n\nThis link expires in 24 hours."
            ),
        )
        .await
    }

    pub async fn payment_receipt(&self, to: &str, order_number: &str, amount: &str) -> EmailResult<()> {
        self.send(
            to,
            &format!("Payment received for order {order_number}"),
            format!("We received your payment of ${amount} on order {order_number}. Thank you!"),
        )
        .await
    }

    pub async fn refund_notice(&self, to: &str, order_number: &str, amount: &str) -> EmailResult<()> {
        self.send(
            to,
            &format!("Refund issued for order {order_number}"),
            format!(
                "A refund of ${amount} has been issued on order {order_number}. \
                 Allow 5-10 business days for it to appear on your statement."
            ),
        )
        .await
    }

    pub async fn rep_order_notification(
        &self,
        to: &str,
        order_number: &str,
        total: &str,
    ) -> EmailResult<()> {
        self.send(
            to,
            &format!("New order {order_number} on your book"),
            format!("Order {order_number} (${total}) was just placed by one of your accounts."),
        )
        .await
    }

    pub async fn tier_promotion(&self, to: &str, tier: &str) -> EmailResult<()> {
        self.send(
            to,
            &format!("You've been upgraded to {tier}"),
            format!(
                "Congratulations! Your account has reached the {tier} tier and your new \
                 pricing is already live."
            ),
        )
        .await
    }

    pub async fn quote_link(&self, to: &str, quote_number: &str, total: &str) -> EmailResult<()> {
        self.send(
            to,
            &format!("Your quote {quote_number}"),
            format!("Your quote {quote_number} for ${total} is ready to review."),
        )
        .await
    }

    pub async fn scrape_failure(&self, to: &str, source: &str, reason: &str) -> EmailResult<()> {
        self.send(
            to,
            &format!("Scrape failed: {source}"),
            format!("The scrape job for {source} failed:\n\n{reason}"),
        )
        .await
    }

    pub async fn subscription_lapse_warning(&self, to: &str, days_left: i64) -> EmailResult<()> {
        self.send(
            to,
            "Your trade membership needs attention",
            format!(
                "Your trade membership payment is past due. Your pricing benefits lapse in \
                 {days_left} days unless payment is updated."
            ),
        )
        .await
    }

    pub async fn subscription_renewal_reminder(&self, to: &str) -> EmailResult<()> {
        self.send(
            to,
            "Your trade membership renews soon",
            "Your trade membership renews in 30 days. No action is needed if your card on file is current.".to_string(),
        )
        .await
    }

    pub async fn stock_alert(&self, to: &str, product_name: &str) -> EmailResult<()> {
        self.send(
            to,
            &format!("{product_name} is back in stock"),
            format!("Good news: {product_name} is back in stock. Order soon, quantities are limited."),
        )
        .await
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    fn try_new(settings: &SmtpSettings) -> EmailResult<Self> {
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|e| EmailError::Address(format!("invalid from address: {e}")))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| EmailError::Smtp(format!("invalid SMTP relay config: {e}")))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        Ok(Self { from, transport })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> EmailResult<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| EmailError::Address(format!("invalid recipient {to}: {e}")))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::Smtp(e.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| EmailError::Smtp(e.to_string()))?;
        Ok(())
    }
}
