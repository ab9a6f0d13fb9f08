use mongodb::bson::doc;

use crate::error::{Error, Result};
use crate::model::{
    api::auth::AuthToken,
    db::{election::Election, member::Member},
    mongodb::{Coll, Id},
};

/// Look up a member by username, active or not.
pub async fn member_by_username(members: &Coll<Member>, username: &str) -> Result<Member> {
    members
        .find_one(doc! { "username": username }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Member '{username}'")))
}

/// The member a token was issued to.
pub async fn member_from_token<U>(token: &AuthToken<U>, members: &Coll<Member>) -> Result<Member> {
    members
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Member with ID {}", token.id)))
}

/// Look up an election that has not been cancelled.
pub async fn election_by_id(elections: &Coll<Election>, id: Id) -> Result<Election> {
    let filter = doc! {
        "_id": id,
        "cancelled": { "$ne": true },
    };
    elections
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {id}")))
}
