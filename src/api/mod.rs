use rocket::{serde::json::Json, Catcher, Request, Route};

use crate::error::ErrorBody;

pub mod admin;
pub mod auth;
pub mod common;
pub mod dues;
pub mod elections;
pub mod members;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(members::routes());
    routes.extend(admin::routes());
    routes.extend(elections::routes());
    routes.extend(dues::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error
    ]
}

fn body(error: &str) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: error.to_string(),
    })
}

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    body("Malformed request.")
}

#[catch(401)]
fn unauthorized() -> Json<ErrorBody> {
    body("You are not logged in.")
}

#[catch(403)]
fn forbidden() -> Json<ErrorBody> {
    body("Only admins may do that.")
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ErrorBody> {
    body(&format!("No such page: {}", req.uri()))
}

#[catch(422)]
fn unprocessable() -> Json<ErrorBody> {
    body("Request is missing fields or has invalid values.")
}

#[catch(500)]
fn internal_error() -> Json<ErrorBody> {
    body("Internal server error")
}
