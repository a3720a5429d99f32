use std::net::IpAddr;
use std::sync::Arc;

use super::form::{ContactForm, ValidationError};
use super::notification::ContactNotifier;
use super::storage::{ContactStore, NewContact};
use super::verification::HumanVerifier;
use tracing::{error, warn};

/// Acknowledgment returned to the submitter on the happy path.
pub const SUCCESS_MESSAGE: &str = "Thank you! Your message has been sent successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub message: &'static str,
}

/// What a failed submission looks like to the caller. Storage detail stays
/// generic; the underlying cause is logged where it happens and never leaves
/// the process.
#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("verification failed")]
    Verification,
    #[error("something went wrong on our end; please try again later")]
    Storage,
}

/// Orchestrates one submission end-to-end: validate, verify humanness,
/// persist, notify, respond. Strictly sequential; each step gates the next,
/// and the notification outcome never reaches the caller.
pub struct ContactService<V, S, N> {
    verifier: Arc<V>,
    store: Arc<S>,
    notifier: Arc<N>,
    score_threshold: f64,
}

impl<V, S, N> ContactService<V, S, N>
where
    V: HumanVerifier + 'static,
    S: ContactStore + 'static,
    N: ContactNotifier + 'static,
{
    pub fn new(verifier: Arc<V>, store: Arc<S>, notifier: Arc<N>, score_threshold: f64) -> Self {
        Self {
            verifier,
            store,
            notifier,
            score_threshold,
        }
    }

    pub async fn submit(
        &self,
        form: ContactForm,
        client_ip: IpAddr,
    ) -> Result<SubmissionReceipt, ContactError> {
        // Nothing leaves the process until every field checks out.
        let contact = form.validate()?;

        match self.verifier.verify(&contact.recaptcha_token, client_ip).await {
            Ok(result) if result.is_human(self.score_threshold) => {}
            Ok(result) => {
                warn!(
                    score = result.confidence_score,
                    success = result.accepted,
                    "submission rejected by verification"
                );
                return Err(ContactError::Verification);
            }
            // Fail closed: a broken verifier rejects, it never waves through.
            Err(err) => {
                warn!(error = %err, "verification call failed; rejecting submission");
                return Err(ContactError::Verification);
            }
        }

        let record = NewContact::from(&contact);
        if let Err(err) = self.store.store(&record).await {
            error!(error = %err, "failed to persist contact submission");
            return Err(ContactError::Storage);
        }

        // Best effort only; runs strictly after the successful insert.
        self.notifier.notify(&contact).await;

        Ok(SubmissionReceipt {
            message: SUCCESS_MESSAGE,
        })
    }
}
