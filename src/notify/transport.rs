use async_trait::async_trait;
use serde_json::json;

use crate::config::{EmailConfig, SmsConfig};

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// REST mail provider (SendGrid-style JSON API with a bearer key).
pub struct HttpMailer {
    http: reqwest::Client,
    config: EmailConfig,
}

impl HttpMailer {
    pub fn new(http: reqwest::Client, config: EmailConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl EmailTransport for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": self.config.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("mail provider returned {status}: {body}");
        }
        Ok(())
    }
}

/// Twilio-style SMS REST API.
pub struct TwilioSms {
    http: reqwest::Client,
    config: SmsConfig,
}

impl TwilioSms {
    pub fn new(http: reqwest::Client, config: SmsConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl SmsTransport for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        );
        let resp = self
            .http
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("sms provider returned {status}: {text}");
        }
        Ok(())
    }
}
