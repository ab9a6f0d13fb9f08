use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    api::common::member_from_token,
    error::{Error, Result},
    mail::is_email_valid,
    model::{
        api::{
            auth::{AuthToken, LoginRequest, AUTH_TOKEN_COOKIE},
            session::SessionInfo,
        },
        db::member::Member,
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![login, logout, session]
}

/// The page a member lands on after logging in.
const HOME: &str = "/home";

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginRequest>,
    members: Coll<Member>,
    config: &State<Config>,
) -> Result<Json<SessionInfo>> {
    // Members may log in with either their username or their email. Only
    // real addresses are tried as emails, so blank emails never match.
    let with_username = doc! {
        "username": &credentials.username,
        "active": true,
    };
    let member = match members.find_one(with_username, None).await? {
        Some(member) => Some(member),
        None if !is_email_valid(&credentials.username) => None,
        None => {
            let with_email = doc! {
                "email": &credentials.username,
                "active": true,
            };
            members.find_one(with_email, None).await?
        }
    };

    let member = member.ok_or_else(|| {
        Error::Status(Status::Unauthorized, "Invalid username.".to_string())
    })?;
    if !member.verify_password(&credentials.password) {
        return Err(Error::Status(
            Status::Unauthorized,
            "Incorrect password.".to_string(),
        ));
    }

    info!("Member '{}' logged in", member.username);
    let token = AuthToken::<Member>::new(&member);
    cookies.add(token.into_cookie(config));

    Ok(Json(SessionInfo::new(&member, HOME)))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[get("/session?<current>")]
pub async fn session(
    token: AuthToken<Member>,
    current: Option<String>,
    members: Coll<Member>,
) -> Result<Json<SessionInfo>> {
    let member = member_from_token(&token, &members).await?;
    let current = current.as_deref().unwrap_or(HOME);
    Ok(Json(SessionInfo::new(&member, current)))
}
