use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::OtpGateway;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum LoginError {
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("please enter the passcode")]
    MissingCode,
    #[error("failed to send passcode: {0}")]
    Rejected(String),
    #[error("the passcode service did not return a code")]
    NoCodeIssued,
    #[error("unable to reach the passcode service: {0}")]
    Unreachable(String),
    #[error("no passcode has been requested")]
    NotRequested,
    #[error("invalid passcode, {remaining} attempt(s) left")]
    Mismatch { remaining: u32 },
    #[error("passcode expired, request a new one")]
    Expired,
    #[error("too many failed attempts, request a new passcode")]
    LockedOut,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct OtpPolicy {
    pub ttl: Duration,
    pub max_attempts: u32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
            max_attempts: 5,
        }
    }
}

#[derive(Debug)]
struct PendingCode {
    email: String,
    code: u32,
    issued_at: DateTime<Utc>,
    failures: u32,
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    email_pattern().is_some_and(|re| re.is_match(email.trim()))
}

/// Holds at most one outstanding passcode. A new request replaces it; a
/// successful verification consumes it.
#[derive(Debug, Default)]
pub(crate) struct OtpVerifier {
    policy: OtpPolicy,
    pending: Option<PendingCode>,
}

impl OtpVerifier {
    pub(crate) fn new(policy: OtpPolicy) -> Self {
        Self {
            policy,
            pending: None,
        }
    }

    pub(crate) fn pending_email(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.email.as_str())
    }

    pub(crate) fn request(
        &mut self,
        gateway: &dyn OtpGateway,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LoginError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(LoginError::InvalidEmail(email.to_string()));
        }

        let reply = gateway.request_otp(email).map_err(|err| {
            tracing::error!("passcode request failed: {err:#}");
            LoginError::Unreachable(format!("{err:#}"))
        })?;
        if !reply.success {
            let message = reply
                .message
                .unwrap_or_else(|| "the service declined the request".to_string());
            return Err(LoginError::Rejected(message));
        }
        let code = reply.otp.ok_or(LoginError::NoCodeIssued)?;

        tracing::info!(email, "passcode issued");
        self.pending = Some(PendingCode {
            email: email.to_string(),
            code,
            issued_at: now,
            failures: 0,
        });
        Ok(())
    }

    /// Returns the verified email on success.
    pub(crate) fn verify(&mut self, submitted: &str, now: DateTime<Utc>) -> Result<String, LoginError> {
        let submitted = submitted.trim();
        if submitted.is_empty() {
            return Err(LoginError::MissingCode);
        }
        let pending = self.pending.as_mut().ok_or(LoginError::NotRequested)?;

        if now - pending.issued_at > self.policy.ttl {
            self.pending = None;
            return Err(LoginError::Expired);
        }

        if submitted.parse::<u32>().ok() == Some(pending.code) {
            let email = pending.email.clone();
            self.pending = None;
            tracing::info!(email = %email, "passcode verified");
            return Ok(email);
        }

        pending.failures += 1;
        tracing::warn!(email = %pending.email, failures = pending.failures, "passcode mismatch");
        if pending.failures >= self.policy.max_attempts {
            self.pending = None;
            return Err(LoginError::LockedOut);
        }
        Err(LoginError::Mismatch {
            remaining: self.policy.max_attempts - pending.failures,
        })
    }
}
