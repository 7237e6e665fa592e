use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Envelope returned by both the passcode and the email endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct GatewayReply {
    pub success: bool,
    #[serde(default)]
    pub otp: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Out-of-band delivery: issues passcodes and sends mail.
pub(crate) trait OtpGateway {
    /// Ask the service to email a passcode. The reply carries the issued code.
    fn request_otp(&self, email: &str) -> Result<GatewayReply>;

    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<GatewayReply>;
}

pub(crate) struct HttpGateway {
    client: reqwest::blocking::Client,
    otp_url: String,
    mail_url: String,
}

impl HttpGateway {
    pub(crate) fn new(otp_url: &str, mail_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            otp_url: otp_url.to_string(),
            mail_url: mail_url.to_string(),
        })
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<GatewayReply> {
        if url.trim().is_empty() {
            anyhow::bail!("Endpoint URL is not configured");
        }
        let reply = self
            .client
            .get(url)
            .query(query)
            .send()
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()?
            .json::<GatewayReply>()
            .context("Unexpected response body")?;
        tracing::debug!(success = reply.success, "gateway replied");
        Ok(reply)
    }
}

impl OtpGateway for HttpGateway {
    fn request_otp(&self, email: &str) -> Result<GatewayReply> {
        self.get(&self.otp_url, &[("email", email)])
            .context("Could not reach the passcode service")
    }

    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<GatewayReply> {
        self.get(
            &self.mail_url,
            &[("email", to), ("subject", subject), ("body", body)],
        )
        .context("Could not reach the mail service")
    }
}
