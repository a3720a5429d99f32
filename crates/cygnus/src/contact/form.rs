use serde::Deserialize;
use std::fmt;
use url::Url;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const MESSAGE_MIN: usize = 10;
const MESSAGE_MAX: usize = 2000;

/// Raw request body for `POST /api/contact`, exactly as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub website_url: Option<String>,
    pub message: String,
    pub recaptcha_token: String,
}

/// A submission whose fields have all passed the intake constraints. Only
/// this type flows onward to verification, storage, and notification.
#[derive(Debug, Clone)]
pub struct ValidContact {
    pub name: String,
    pub email: String,
    pub website_url: Option<Url>,
    pub message: String,
    pub recaptcha_token: String,
}

impl ContactForm {
    /// Check every field against its constraint, reporting all violations at
    /// once rather than stopping at the first. No side effects.
    pub fn validate(self) -> Result<ValidContact, ValidationError> {
        let mut issues = Vec::new();

        let name = self.name.trim().to_string();
        let name_len = name.chars().count();
        if !(NAME_MIN..=NAME_MAX).contains(&name_len) {
            issues.push(FieldIssue {
                field: "name",
                reason: format!("must be between {NAME_MIN} and {NAME_MAX} characters"),
            });
        }

        let email = self.email.trim().to_string();
        if !is_plausible_email(&email) {
            issues.push(FieldIssue {
                field: "email",
                reason: "must be a valid email address".to_string(),
            });
        }

        let website_url = match self.website_url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                _ => {
                    issues.push(FieldIssue {
                        field: "website_url",
                        reason: "must be an absolute http(s) URL".to_string(),
                    });
                    None
                }
            },
        };

        let message_len = self.message.chars().count();
        if !(MESSAGE_MIN..=MESSAGE_MAX).contains(&message_len) {
            issues.push(FieldIssue {
                field: "message",
                reason: format!("must be between {MESSAGE_MIN} and {MESSAGE_MAX} characters"),
            });
        }

        if self.recaptcha_token.trim().is_empty() {
            issues.push(FieldIssue {
                field: "recaptcha_token",
                reason: "must be present".to_string(),
            });
        }

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        Ok(ValidContact {
            name,
            email,
            website_url,
            message: self.message,
            recaptcha_token: self.recaptcha_token,
        })
    }
}

/// One violated constraint, attributed to the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub reason: String,
}

/// Aggregate of every constraint the submission violated.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid submission: ")?;
        for (index, issue) in self.issues.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} {}", issue.field, issue.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// Intentionally loose: one '@', a non-empty local part, and a dotted domain
// without whitespace. Deliverability is the mail provider's problem.
fn is_plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if value.chars().any(char::is_whitespace) || domain.contains('@') {
        return false;
    }
    let Some((head, tail)) = domain.rsplit_once('.') else {
        return false;
    };
    !head.is_empty() && !tail.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            name: "Al".to_string(),
            email: "a@b.com".to_string(),
            website_url: None,
            message: "Hello there, this is a test.".to_string(),
            recaptcha_token: "tok".to_string(),
        }
    }

    #[test]
    fn accepts_minimal_valid_submission() {
        let contact = form().validate().expect("valid form passes");
        assert_eq!(contact.name, "Al");
        assert!(contact.website_url.is_none());
    }

    #[test]
    fn rejects_one_character_name() {
        let mut input = form();
        input.name = "A".to_string();
        let err = input.validate().expect_err("short name rejected");
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].field, "name");
        assert!(err.to_string().contains("between 2 and 100"));
    }

    #[test]
    fn rejects_malformed_email() {
        for bad in ["plainaddress", "a@b", "two words@c.com", "@d.com", "a@.com"] {
            let mut input = form();
            input.email = bad.to_string();
            let err = input.validate().expect_err("bad email rejected");
            assert!(
                err.issues.iter().any(|issue| issue.field == "email"),
                "'{bad}' should fail the email check"
            );
        }
    }

    #[test]
    fn empty_website_url_is_treated_as_absent() {
        let mut input = form();
        input.website_url = Some("   ".to_string());
        let contact = input.validate().expect("blank url passes");
        assert!(contact.website_url.is_none());
    }

    #[test]
    fn rejects_relative_or_non_http_url() {
        for bad in ["example.com/about", "ftp://example.com", "not a url"] {
            let mut input = form();
            input.website_url = Some(bad.to_string());
            let err = input.validate().expect_err("bad url rejected");
            assert!(err.issues.iter().any(|issue| issue.field == "website_url"));
        }
    }

    #[test]
    fn accepts_absolute_https_url() {
        let mut input = form();
        input.website_url = Some("https://example.com/portfolio".to_string());
        let contact = input.validate().expect("https url passes");
        assert_eq!(
            contact.website_url.expect("url kept").as_str(),
            "https://example.com/portfolio"
        );
    }

    #[test]
    fn rejects_short_message_and_missing_token_together() {
        let mut input = form();
        input.message = "hi".to_string();
        input.recaptcha_token = "  ".to_string();
        let err = input.validate().expect_err("two violations rejected");
        let fields: Vec<_> = err.issues.iter().map(|issue| issue.field).collect();
        assert_eq!(fields, vec!["message", "recaptcha_token"]);
    }

    #[test]
    fn rejects_message_above_upper_bound() {
        let mut input = form();
        input.message = "x".repeat(2001);
        let err = input.validate().expect_err("oversize message rejected");
        assert!(err.issues.iter().any(|issue| issue.field == "message"));
    }
}
