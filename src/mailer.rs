use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

use crate::config::MailConfig;

/// Message handed to the relay's JSON submission endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()>;
}

/// Client for the outbound mail relay.
#[derive(Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    relay_url: String,
    api_token: String,
    from_address: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url: config.relay_url.clone(),
            api_token: config.api_token.clone(),
            from_address: config.from_address.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
        let message = OutboundEmail {
            from: self.from_address.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
        };
        self.http
            .post(&self.relay_url)
            .bearer_auth(&self.api_token)
            .json(&message)
            .send()
            .await
            .context("mail relay request")?
            .error_for_status()
            .context("mail relay rejected message")?;
        Ok(())
    }
}

pub const WELCOME_SUBJECT: &str = "Welcome to Cortexa! Verify your email";

/// Plain-text body of the registration email.
pub fn welcome_body(full_name: &str, otp: &str) -> String {
    format!(
        "Hi {full_name},\n\n\
         Welcome to Cortexa!\n\
         To complete your registration and verify your email address, \
         please use the following One-Time Password (OTP):\n\n\
         Your OTP: {otp}\n\n\
         This OTP is valid for the next 10 minutes. Please do not share \
         this code with anyone for your account's security.\n\n\
         If you didn't request this, please ignore this email or reach out \
         to our support team.\n\n\
         Thank you,\n\
         The Cortexa Team\n"
    )
}

/// In-memory mailer for tests; records every message instead of sending.
pub mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutboundEmail>>,
        fail: bool,
    }

    impl RecordingMailer {
        /// A mailer whose every send fails, for exercising the
        /// best-effort delivery path.
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("relay unavailable");
            }
            self.sent.lock().unwrap().push(OutboundEmail {
                from: "no-reply@cortexa.test".into(),
                to: to.to_string(),
                subject: subject.to_string(),
                text: text.to_string(),
            });
            Ok(())
        }
    }
}
