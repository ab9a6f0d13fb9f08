mod token;
mod user;

pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Admin, Rights, User};

use serde::{Deserialize, Serialize};

/// Raw login credentials, received from a user. The password is in
/// plaintext and never stored.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    /// A username, or failing that an email address.
    pub username: String,
    pub password: String,
}
