use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::{
    api::common::member_from_token,
    error::Result,
    model::{
        api::{auth::AuthToken, member::DuesStatus},
        db::member::Member,
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![status]
}

/// The viewer's own dues.
#[get("/dues")]
pub async fn status(
    token: AuthToken<Member>,
    members: Coll<Member>,
    config: &State<Config>,
) -> Result<Json<DuesStatus>> {
    let member = member_from_token(&token, &members).await?;
    let rate = config.dues_rate(member.starving);
    Ok(Json(DuesStatus::new(&member, rate, Utc::now())))
}
