//! Mail Service
//!
//! Fire-and-forget notification mails over SMTP (lettre). Without an SMTP
//! host configured, sends are logged instead, which is what development and
//! tests want. Delivery failures are logged and swallowed; they never surface as
//! user-facing errors and never roll anything back.

use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::core::SmtpConfig;
use shared::models::{Order, Settlement, User};

#[derive(Clone)]
pub struct Mailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: String,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Self {
        let transport = match &config.host {
            Some(host) => {
                match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                    Ok(builder) => {
                        let transport = builder
                            .port(config.port)
                            .credentials(Credentials::new(
                                config.user.clone(),
                                config.pass.clone(),
                            ))
                            .build();
                        Some(Arc::new(transport))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, host = %host, "Failed to build SMTP transport, mails will be logged only");
                        None
                    }
                }
            }
            None => None,
        };

        Self {
            transport,
            from: config.from.clone(),
        }
    }

    /// Log-only mailer (tests, development)
    pub fn disabled() -> Self {
        Self {
            transport: None,
            from: "noreply@market.example.com".to_string(),
        }
    }

    /// Queue one mail in the background. Never blocks the caller on SMTP,
    /// never propagates failure.
    pub fn send_background(&self, to: &str, subject: &str, body: &str) {
        let to = to.to_string();
        let subject = subject.to_string();
        let body = body.to_string();
        let from = self.from.clone();
        let transport = self.transport.clone();

        tokio::spawn(async move {
            let Some(transport) = transport else {
                tracing::info!(to = %to, subject = %subject, "[mail] logged (no SMTP configured)");
                return;
            };

            let message = Message::builder()
                .from(match from.parse() {
                    Ok(mbox) => mbox,
                    Err(e) => {
                        tracing::error!(error = %e, "Invalid mail sender address");
                        return;
                    }
                })
                .to(match to.parse() {
                    Ok(mbox) => mbox,
                    Err(e) => {
                        tracing::error!(error = %e, to = %to, "Invalid mail recipient address");
                        return;
                    }
                })
                .subject(&subject)
                .header(ContentType::TEXT_PLAIN)
                .body(body);

            let message = match message {
                Ok(m) => m,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build mail");
                    return;
                }
            };

            if let Err(e) = transport.send(message).await {
                tracing::error!(error = %e, to = %to, subject = %subject, "Failed to send mail");
            }
        });
    }

    // ========== Notification kinds ==========

    pub fn welcome(&self, user: &User) {
        self.send_background(
            &user.email,
            "Welcome to the marketplace",
            &format!(
                "Hi {},\n\nYour account has been created. Happy shopping!\n",
                user.name
            ),
        );
    }

    pub fn vendor_welcome(&self, user: &User) {
        self.send_background(
            &user.email,
            "Your vendor account is ready",
            &format!(
                "Hi {},\n\nYour vendor account has been created. You can now list products and receive payouts.\n",
                user.name
            ),
        );
    }

    pub fn otp(&self, email: &str, otp: &str, reason: &str) {
        self.send_background(
            email,
            "Your one-time code",
            &format!("Your one-time code for {reason} is: {otp}\n\nIt expires in 15 minutes.\n"),
        );
    }

    pub fn reset_link(&self, email: &str, link: &str) {
        self.send_background(
            email,
            "Reset your password",
            &format!("Use the link below to reset your password (valid for 15 minutes):\n\n{link}\n"),
        );
    }

    pub fn order_confirmation(&self, order: &Order) {
        self.send_background(
            &order.email,
            "Your payment was received",
            &format!(
                "Thanks for your order #{}.\n\nAmount paid: {:.2}\nWe will let you know when it ships.\n",
                order.id, order.total_amount
            ),
        );
    }

    pub fn payment_failed(&self, order: &Order) {
        self.send_background(
            &order.email,
            "Payment failed",
            &format!(
                "Payment for order #{} could not be confirmed. The reserved items have been released; please try again.\n",
                order.id
            ),
        );
    }

    pub fn new_order_for_vendor(&self, vendor_email: &str, order: &Order) {
        self.send_background(
            vendor_email,
            "You have a new order",
            &format!(
                "Order #{} includes one or more of your products. Total order amount: {:.2}.\n",
                order.id, order.total_amount
            ),
        );
    }

    pub fn order_progress(&self, order: &Order) {
        self.send_background(
            &order.email,
            "Order update",
            &format!(
                "Order #{} is now: {}.\n{}",
                order.id,
                order.status.as_str(),
                order
                    .tracking_number
                    .as_deref()
                    .map(|t| format!("Tracking number: {t}\n"))
                    .unwrap_or_default()
            ),
        );
    }

    pub fn settlement_update(&self, vendor_email: &str, settlement: &Settlement) {
        self.send_background(
            vendor_email,
            "Settlement update",
            &format!(
                "Settlement #{} for order #{} is now: {}. Amount: {:.2}.\n",
                settlement.id,
                settlement.order_id,
                settlement.status.as_str(),
                settlement.amount
            ),
        );
    }

    pub fn cart_followup(&self, email: &str, name: &str) {
        self.send_background(
            email,
            "You left something behind",
            &format!("Hi {name},\n\nYour cart is still waiting for you. Items are reserved only once you check out.\n"),
        );
    }

    pub fn product_approval(&self, vendor_email: &str, product_name: &str, approved: bool) {
        let decision = if approved { "approved" } else { "rejected" };
        self.send_background(
            vendor_email,
            "Product listing review",
            &format!("Your product listing '{product_name}' has been {decision}.\n"),
        );
    }
}
