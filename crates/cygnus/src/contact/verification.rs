use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one siteverify round trip. Ephemeral, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerificationResult {
    pub accepted: bool,
    pub confidence_score: f64,
}

impl VerificationResult {
    /// Decision rule: the remote must report success and the score must clear
    /// the threshold. An absent score deserializes as 0.0 and so rejects.
    pub fn is_human(&self, threshold: f64) -> bool {
        self.accepted && self.confidence_score >= threshold
    }
}

/// Errors from the verification round trip. The orchestrator maps every one
/// of these to a rejection: a broken verifier must fail closed, never open.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("verification call failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("verification service answered with status {0}")]
    UpstreamStatus(reqwest::StatusCode),
}

/// Seam for the remote trust-scoring service so the contact flow can be
/// exercised without network access.
#[async_trait]
pub trait HumanVerifier: Send + Sync {
    async fn verify(
        &self,
        token: &str,
        client_ip: IpAddr,
    ) -> Result<VerificationResult, VerificationError>;
}

/// Production verifier speaking the reCAPTCHA siteverify protocol: one
/// form-encoded POST per submission, bounded by a timeout, no retry.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    endpoint: String,
    secret: String,
}

impl RecaptchaVerifier {
    pub fn new(
        secret: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(VERIFY_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            secret: secret.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    score: f64,
}

#[async_trait]
impl HumanVerifier for RecaptchaVerifier {
    async fn verify(
        &self,
        token: &str,
        client_ip: IpAddr,
    ) -> Result<VerificationResult, VerificationError> {
        let remote_ip = client_ip.to_string();
        let params = [
            ("secret", self.secret.as_str()),
            ("response", token),
            ("remoteip", remote_ip.as_str()),
        ];

        let response = self.client.post(&self.endpoint).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VerificationError::UpstreamStatus(status));
        }

        let body: SiteVerifyResponse = response.json().await?;
        Ok(VerificationResult {
            accepted: body.success,
            confidence_score: body.score,
        })
    }
}
