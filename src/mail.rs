//! Outgoing email, via Amazon SES.

use aws_sdk_sesv2::{
    types::{Body, Content, Destination, EmailContent, Message},
    Client as SesClient,
};
use rocket::http::Status;

use crate::error::{Error, Result};
use crate::model::db::member::MemberCore;

/// A plausibility check of an email address: exactly one `@`, something
/// before it, a dotted domain after it, and no whitespace.
pub fn is_email_valid(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// The text of a password reset email.
fn password_reset_body(member: &MemberCore, password: &str) -> String {
    format!(
        "Hi {firstname},\n\n\
         Your Freeside members site password has been reset.\n\n\
         Username: {username}\n\
         Temporary password: {password}\n\n\
         Please log in and choose a new password.\n",
        firstname = member.firstname,
        username = member.username,
    )
}

fn mail_error(e: impl std::fmt::Display) -> Error {
    error!("Failed to build email: {e}");
    Error::Status(
        Status::InternalServerError,
        "Failed to send email".to_string(),
    )
}

/// Email a member their new temporary password.
#[cfg_attr(test, allow(unused_variables))]
pub async fn send_password_reset(
    client: &SesClient,
    sender: &str,
    member: &MemberCore,
    password: &str,
) -> Result<()> {
    let subject = Content::builder()
        .data("Your Freeside password has been reset")
        .charset("UTF-8")
        .build()
        .map_err(mail_error)?;
    let text = Content::builder()
        .data(password_reset_body(member, password))
        .charset("UTF-8")
        .build()
        .map_err(mail_error)?;
    let message = Message::builder()
        .subject(subject)
        .body(Body::builder().text(text).build())
        .build();
    let content = EmailContent::builder().simple(message).build();

    #[cfg(not(test))]
    client
        .send_email()
        .from_email_address(sender)
        .destination(
            Destination::builder()
                .to_addresses(member.email.clone())
                .build(),
        )
        .content(content)
        .send()
        .await
        .map_err(|e| {
            error!("Failed to send password reset to {}: {e}", member.username);
            Error::Status(
                Status::InternalServerError,
                "Failed to send email".to_string(),
            )
        })?;

    info!("Sent password reset email to {}", member.username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_addresses() {
        assert!(is_email_valid("alice@example.org"));
        assert!(is_email_valid("first.last+tag@mail.example.co.uk"));
    }

    #[test]
    fn invalid_addresses() {
        assert!(!is_email_valid(""));
        assert!(!is_email_valid("alice"));
        assert!(!is_email_valid("@example.org"));
        assert!(!is_email_valid("alice@localhost"));
        assert!(!is_email_valid("alice@@example.org"));
        assert!(!is_email_valid("alice@example.org."));
        assert!(!is_email_valid("alice smith@example.org"));
    }

    #[test]
    fn reset_body_contains_credentials() {
        let member = MemberCore::example();
        let body = password_reset_body(&member, "Tr0ub4dor3");
        assert!(body.contains("Hi Alice"));
        assert!(body.contains("Username: alice"));
        assert!(body.contains("Temporary password: Tr0ub4dor3"));
    }
}
