use std::fmt::Display;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// A 404 for the described resource.
    pub fn not_found(what: impl Display) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    /// A 400 carrying the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, msg.into())
    }

    /// The status this error will be reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(_) => Status::Unauthorized,
            Self::Status(status, _) => *status,
        }
    }

    /// The message shown to the user. Internal details are not exposed.
    pub fn user_message(&self) -> String {
        match self {
            Self::Db(_) | Self::Argon2(_) => "Internal server error".to_string(),
            Self::Jwt(_) => "Invalid session".to_string(),
            Self::Status(_, msg) => msg.clone(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{} {}: {self}", req.method(), req.uri()),
            _ => warn!("{} {}: {self}", req.method(), req.uri()),
        }
        let body = ErrorBody {
            error: self.user_message(),
        };
        Custom(status, Json(body)).respond_to(req)
    }
}
