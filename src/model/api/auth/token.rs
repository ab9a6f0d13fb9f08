use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    db::member::Member,
    mongodb::{Coll, Id},
};

use super::user::{Rights, User};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token for a specific member, checked to carry at least
/// the rights of user type `U` when used as a request guard.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<U> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// Create a new [`AuthToken`] for the given member, with the rights they
    /// currently hold.
    pub fn new(member: &Member) -> Self {
        Self {
            id: member.id,
            rights: Rights::of(member),
            phantom: PhantomData,
        }
    }

    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights >= target
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims<U>>| data.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

fn not_logged_in() -> Error {
    Error::Status(Status::Unauthorized, "You are not logged in.".to_string())
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie, and check against the database
    /// that the member is still active and still holds the rights of `U`.
    ///
    /// Fails with 401 if nobody is logged in and 403 if the member lacks the rights.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let token: Self = match req
            .cookies()
            .get(AUTH_TOKEN_COOKIE)
            .map(|cookie| Self::from_cookie(cookie, config))
        {
            Some(Ok(token)) => token,
            Some(Err(e)) => {
                debug!("Rejected auth token: {e}");
                return Outcome::Failure((Status::Unauthorized, not_logged_in()));
            }
            None => return Outcome::Failure((Status::Unauthorized, not_logged_in())),
        };

        // Rights may have been revoked, or the member deactivated, since the
        // token was issued.
        let db = req.guard::<&State<mongodb::Database>>().await.unwrap();
        let member = Coll::<Member>::from_db(db)
            .find_one(token.id.as_doc(), None)
            .await;
        match member {
            Ok(Some(member)) if member.active => {
                let current = Self::new(&member);
                if current.permits(U::RIGHTS) {
                    Outcome::Success(current)
                } else {
                    Outcome::Failure((
                        Status::Forbidden,
                        Error::Status(
                            Status::Forbidden,
                            format!("Only {}s may do that.", U::RIGHTS),
                        ),
                    ))
                }
            }
            Ok(_) => Outcome::Failure((Status::Unauthorized, not_logged_in())),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}
