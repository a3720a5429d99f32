use super::form::ValidContact;
use async_trait::async_trait;
use sqlx::{Connection, PgConnection};

/// Durable record for one accepted submission. Written once, never read
/// back, mutated, or deleted by this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub website_url: Option<String>,
    pub message: String,
}

impl From<&ValidContact> for NewContact {
    fn from(contact: &ValidContact) -> Self {
        Self {
            name: contact.name.clone(),
            email: contact.email.clone(),
            website_url: contact
                .website_url
                .as_ref()
                .map(|url| url.as_str().to_string()),
            message: contact.message.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("contact insert failed: {0}")]
    Insert(#[source] sqlx::Error),
}

/// Seam for the relational store so the contact flow can be exercised
/// without a running database.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn store(&self, contact: &NewContact) -> Result<(), StorageError>;
}

/// Postgres-backed store. Each call opens its own connection and releases it
/// before returning, so a request never holds state beyond its own lifetime
/// and the process needs no pool.
pub struct PgContactStore {
    database_url: String,
}

impl PgContactStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn store(&self, contact: &NewContact) -> Result<(), StorageError> {
        let mut conn = PgConnection::connect(&self.database_url)
            .await
            .map_err(StorageError::Connect)?;

        // Single parameterized insert; the connection is scoped to this call,
        // so every exit path below releases it (close here, drop otherwise).
        let inserted = sqlx::query(
            "INSERT INTO contacts (name, email, website_url, message) VALUES ($1, $2, $3, $4)",
        )
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(contact.website_url.as_deref())
        .bind(&contact.message)
        .execute(&mut conn)
        .await;

        if let Err(err) = conn.close().await {
            tracing::debug!(error = %err, "contact store connection close failed");
        }

        inserted.map_err(StorageError::Insert)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn new_contact_flattens_url_and_keeps_fields() {
        let contact = ValidContact {
            name: "Al".to_string(),
            email: "a@b.com".to_string(),
            website_url: Some(Url::parse("https://example.com/work").expect("valid url")),
            message: "Hello there, this is a test.".to_string(),
            recaptcha_token: "tok".to_string(),
        };

        let record = NewContact::from(&contact);
        assert_eq!(record.name, "Al");
        assert_eq!(record.website_url.as_deref(), Some("https://example.com/work"));
        assert_eq!(record.message, contact.message);
    }

    #[test]
    fn new_contact_preserves_absent_url() {
        let contact = ValidContact {
            name: "Al".to_string(),
            email: "a@b.com".to_string(),
            website_url: None,
            message: "Hello there, this is a test.".to_string(),
            recaptcha_token: "tok".to_string(),
        };

        assert!(NewContact::from(&contact).website_url.is_none());
    }
}
