//! Contact form intake: validation, humanness verification, durable storage,
//! and best-effort email notification, orchestrated by [`ContactService`].

pub mod form;
pub mod notification;
pub mod router;
pub mod service;
pub mod storage;
pub mod verification;

pub use form::{ContactForm, FieldIssue, ValidContact, ValidationError};
pub use notification::{ContactNotifier, SendGridNotifier};
pub use router::contact_router;
pub use service::{ContactError, ContactService, SubmissionReceipt, SUCCESS_MESSAGE};
pub use storage::{ContactStore, NewContact, PgContactStore, StorageError};
pub use verification::{
    HumanVerifier, RecaptchaVerifier, VerificationError, VerificationResult,
};
