use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, DateTime as BsonDateTime};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mail::is_email_valid;
use crate::model::{
    api::member::NewMemberRequest,
    mongodb::{Coll, Id},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const RESET_PASSWORD_LENGTH: usize = 10;
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Core member data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct MemberCore {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    /// Members on the reduced "starving hacker" dues tier.
    pub starving: bool,
    pub admin: bool,
    /// Cleared instead of deleting the member.
    pub active: bool,
    /// Set when an admin resets the password; cleared when the member picks a new one.
    pub password_expired: bool,
    /// Local midnight at the end of the last day covered by dues.
    #[serde(default)]
    pub dues_paid_through: Option<BsonDateTime>,
}

impl MemberCore {
    /// Create a new, active, non-admin member from an admin's request.
    pub fn new(request: NewMemberRequest) -> Result<Self> {
        validate_username(&request.username)?;
        validate_email(&request.email)?;
        let password_hash = hash_password(&request.password)?;
        Ok(Self {
            username: request.username,
            firstname: request.firstname,
            lastname: request.lastname,
            email: request.email,
            password_hash,
            starving: request.starving,
            admin: false,
            active: true,
            password_expired: false,
            dues_paid_through: None,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash cannot match anything.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    /// Replace the password with one the member chose.
    pub fn set_password(&mut self, password: &str) -> Result<()> {
        self.password_hash = hash_password(password)?;
        self.password_expired = false;
        Ok(())
    }

    /// Scramble the password, returning the new plaintext so it can be sent
    /// to the member. The member is expected to change it on next login.
    pub fn reset_password(&mut self, rng: &mut impl Rng) -> Result<String> {
        let password: String = rng
            .sample_iter(&Alphanumeric)
            .take(RESET_PASSWORD_LENGTH)
            .map(char::from)
            .collect();
        self.password_hash = hash_password(&password)?;
        self.password_expired = true;
        Ok(password)
    }

    /// The instant this member's dues run out, if ever recorded.
    pub fn paid_through(&self) -> Option<DateTime<Utc>> {
        self.dues_paid_through.map(BsonDateTime::to_chrono)
    }

    /// Are the member's dues paid up as of `now`?
    pub fn dues_paid_at(&self, now: DateTime<Utc>) -> bool {
        self.paid_through().map_or(false, |paid| paid > now)
    }
}

/// A member without an ID.
pub type NewMember = MemberCore;

/// A member from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub member: MemberCore,
}

impl Deref for Member {
    type Target = MemberCore;

    fn deref(&self) -> &Self::Target {
        &self.member
    }
}

impl DerefMut for Member {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.member
    }
}

/// Usernames appear in profile URLs, so they must be a single path segment.
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::bad_request("Username must not be empty."));
    }
    if username.contains('/') || username.chars().any(char::is_whitespace) {
        return Err(Error::bad_request(format!(
            "Username '{username}' must not contain slashes or spaces."
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if is_email_valid(email) {
        Ok(())
    } else {
        Err(Error::bad_request(format!("Invalid email address '{email}'.")))
    }
}

/// Hash a password with Argon2 and a random salt, enforcing the minimum length.
fn hash_password(password: &str) -> Result<String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    // 16 bytes is the recommended salt length for Argon2.
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    let hash = argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())?;
    Ok(hash)
}

/// Ensure at least one active administrator exists, so the admin panel is
/// reachable on a fresh database. The default administrator is named
/// [`DEFAULT_ADMIN_USERNAME`] and must change the given password on first login.
pub async fn ensure_admin_exists(members: &Coll<NewMember>, password: &str) -> Result<()> {
    let admins = members
        .count_documents(doc! { "admin": true, "active": true }, None)
        .await?;
    if admins > 0 {
        return Ok(());
    }

    // Someone may already hold the name; promote them rather than failing.
    let promote = doc! { "$set": { "admin": true, "active": true } };
    let result = members
        .update_one(doc! { "username": DEFAULT_ADMIN_USERNAME }, promote, None)
        .await?;
    if result.matched_count > 0 {
        warn!("No active admin found, promoted existing member '{DEFAULT_ADMIN_USERNAME}'");
        return Ok(());
    }

    let admin = NewMember {
        username: DEFAULT_ADMIN_USERNAME.to_string(),
        firstname: String::new(),
        lastname: String::new(),
        email: String::new(),
        password_hash: hash_password(password)?,
        starving: false,
        admin: true,
        active: true,
        password_expired: true,
        dues_paid_through: None,
    };
    members.insert_one(admin, None).await?;
    warn!("No active admin found, created default admin '{DEFAULT_ADMIN_USERNAME}'");
    Ok(())
}


#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::local::asynchronous::Client;

    use super::*;

    #[test]
    fn new_member_defaults() {
        let member = MemberCore::example();
        assert!(member.active);
        assert!(!member.admin);
        assert!(!member.password_expired);
        assert_eq!(member.dues_paid_through, None);
        assert_ne!(member.password_hash, NewMemberRequest::example().password);
    }

    #[test]
    fn verify_password() {
        let member = MemberCore::example();
        assert!(member.verify_password(NewMemberRequest::example().password));
        assert!(!member.verify_password("wrong password"));
        assert!(!member.verify_password(""));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let mut member = MemberCore::example();
        member.password_hash = "not a hash".to_string();
        assert!(!member.verify_password(NewMemberRequest::example().password));
    }

    #[test]
    fn rejects_short_password() {
        let request = NewMemberRequest {
            password: "short".to_string(),
            ..NewMemberRequest::example()
        };
        assert!(MemberCore::new(request).is_err());

        let mut member = MemberCore::example();
        assert!(member.set_password("1234567").is_err());
    }

    #[test]
    fn rejects_bad_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("a/b").is_err());
        assert!(validate_username("two words").is_err());
        assert!(validate_username("hacker_1").is_ok());
    }

    #[test]
    fn rejects_bad_email() {
        let request = NewMemberRequest {
            email: "not-an-email".to_string(),
            ..NewMemberRequest::example()
        };
        assert!(MemberCore::new(request).is_err());
    }

    #[test]
    fn reset_then_change_password() {
        let mut member = MemberCore::example();
        let scrambled = member.reset_password(&mut rand::thread_rng()).unwrap();

        assert_eq!(scrambled.len(), RESET_PASSWORD_LENGTH);
        assert!(scrambled.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(member.password_expired);
        assert!(member.verify_password(&scrambled));
        assert!(!member.verify_password(NewMemberRequest::example().password));

        member.set_password("a much better password").unwrap();
        assert!(!member.password_expired);
        assert!(member.verify_password("a much better password"));
    }

    #[test]
    fn dues_status() {
        let now = Utc::now();
        let mut member = MemberCore::example();
        assert!(!member.dues_paid_at(now));

        member.dues_paid_through = Some(BsonDateTime::from_chrono(now + Duration::days(30)));
        assert!(member.dues_paid_at(now));

        member.dues_paid_through = Some(BsonDateTime::from_chrono(now - Duration::days(1)));
        assert!(!member.dues_paid_at(now));
    }

    async fn admin_count(members: &Coll<NewMember>) -> u64 {
        members
            .count_documents(doc! { "admin": true, "active": true }, None)
            .await
            .unwrap()
    }

    #[backend_test]
    async fn existing_admin_is_kept(_client: Client, members: Coll<NewMember>) {
        members.insert_one(MemberCore::admin_example(), None).await.unwrap();

        ensure_admin_exists(&members, "change-me-please").await.unwrap();

        assert_eq!(admin_count(&members).await, 1);
        assert_eq!(members.count_documents(None, None).await.unwrap(), 1);
        let none = members
            .find_one(doc! { "username": DEFAULT_ADMIN_USERNAME }, None)
            .await
            .unwrap();
        assert_eq!(none, None);
    }

    #[backend_test]
    async fn member_named_admin_is_promoted(_client: Client, members: Coll<NewMember>) {
        let mut named_admin = MemberCore::example();
        named_admin.username = DEFAULT_ADMIN_USERNAME.to_string();
        named_admin.active = false;
        members.insert_one(named_admin, None).await.unwrap();

        ensure_admin_exists(&members, "change-me-please").await.unwrap();

        assert_eq!(members.count_documents(None, None).await.unwrap(), 1);
        let promoted = members
            .find_one(doc! { "username": DEFAULT_ADMIN_USERNAME }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(promoted.admin);
        assert!(promoted.active);
        // The existing password is left alone.
        assert!(promoted.verify_password(NewMemberRequest::example().password));
    }

    #[backend_test]
    async fn default_admin_is_created(_client: Client, members: Coll<NewMember>) {
        members.insert_one(MemberCore::example(), None).await.unwrap();

        ensure_admin_exists(&members, "change-me-please").await.unwrap();

        assert_eq!(admin_count(&members).await, 1);
        let admin = members
            .find_one(doc! { "username": DEFAULT_ADMIN_USERNAME }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.admin);
        assert!(admin.password_expired);
        assert!(admin.verify_password("change-me-please"));

        // Running again changes nothing.
        ensure_admin_exists(&members, "change-me-please").await.unwrap();
        assert_eq!(members.count_documents(None, None).await.unwrap(), 2);
    }
}
