use super::form::ValidContact;
use crate::config::EmailConfig;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);
const SUBJECT: &str = "🚀 New Message from your Cygnus Website!";

/// Best-effort side channel for a successful submission. Implementations
/// must swallow their own failures: by the time a notification goes out the
/// response is already decided, and nothing here may change it.
#[async_trait]
pub trait ContactNotifier: Send + Sync {
    async fn notify(&self, contact: &ValidContact);
}

/// Notifier backed by the SendGrid v3 mail-send API. Constructed without
/// credentials it degrades to a logged no-op, so a deployment without the
/// email environment variables still accepts submissions.
pub struct SendGridNotifier {
    client: reqwest::Client,
    endpoint: String,
    settings: Option<EmailConfig>,
}

impl SendGridNotifier {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.sendgrid.com/v3/mail/send";

    pub fn new(
        settings: Option<EmailConfig>,
        endpoint: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            settings,
        })
    }
}

#[async_trait]
impl ContactNotifier for SendGridNotifier {
    async fn notify(&self, contact: &ValidContact) {
        let Some(settings) = &self.settings else {
            debug!("email configuration not set; skipping notification");
            return;
        };

        let payload = json!({
            "personalizations": [{ "to": [{ "email": settings.to_address }] }],
            "from": { "email": settings.from_address },
            "subject": SUBJECT,
            "content": [{ "type": "text/html", "value": render_body(contact) }],
        });

        let outcome = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&settings.api_key)
            .json(&payload)
            .send()
            .await;

        match outcome {
            Ok(response) if response.status().is_success() => {
                info!(status = %response.status(), "contact notification sent");
            }
            Ok(response) => {
                warn!(status = %response.status(), "email service rejected the notification");
            }
            Err(err) => {
                warn!(error = %err, "failed to dispatch contact notification");
            }
        }
    }
}

fn render_body(contact: &ValidContact) -> String {
    let name = escape_html(&contact.name);
    let email = escape_html(&contact.email);
    let website = contact
        .website_url
        .as_ref()
        .map(|url| escape_html(url.as_str()))
        .unwrap_or_else(|| "Not provided".to_string());
    let message = escape_html(&contact.message).replace('\n', "<br>");

    format!(
        "<h3>New Contact Form Submission from Cygnus Website</h3>\n\
         <p><strong>Name:</strong> {name}</p>\n\
         <p><strong>Email:</strong> {email}</p>\n\
         <p><strong>Website:</strong> {website}</p>\n\
         <hr>\n\
         <p><strong>Message:</strong></p>\n\
         <p>{message}</p>"
    )
}

// User-supplied text lands in HTML email; escape the five significant
// characters before interpolation.
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}
