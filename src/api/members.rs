use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::{
    api::common::{member_by_username, member_from_token},
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            member::{MemberDescription, Profile, ProfileUpdate},
        },
        db::member::{validate_email, validate_username, Member, NewMember},
        mongodb::{is_duplicate_key_error, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![list, profile, update]
}

const USERNAME_TAKEN: &str = "Requested username is already in use.";

/// Every active member, ordered by username.
pub async fn active_members(members: &Coll<Member>) -> Result<Vec<Member>> {
    let by_username = FindOptions::builder().sort(doc! { "username": 1 }).build();
    let active: Vec<Member> = members
        .find(doc! { "active": true }, by_username)
        .await?
        .try_collect()
        .await?;
    Ok(active)
}

#[get("/members")]
pub async fn list(
    _token: AuthToken<Member>,
    members: Coll<Member>,
) -> Result<Json<Vec<MemberDescription>>> {
    let active = active_members(&members).await?;
    Ok(Json(active.into_iter().map(MemberDescription::from).collect()))
}

#[get("/members/<username>")]
pub async fn profile(
    token: AuthToken<Member>,
    username: &str,
    members: Coll<Member>,
) -> Result<Json<Profile>> {
    let viewer = member_from_token(&token, &members).await?;
    let member = member_by_username(&members, username).await?;

    Ok(Json(Profile {
        can_edit: viewer.id == member.id || viewer.admin,
        member: member.into(),
    }))
}

#[put("/members/<username>", data = "<changes>", format = "json")]
pub async fn update(
    token: AuthToken<Member>,
    username: &str,
    changes: Json<ProfileUpdate>,
    members: Coll<Member>,
    new_members: Coll<NewMember>,
) -> Result<Json<Profile>> {
    let viewer = member_from_token(&token, &members).await?;
    let member = member_by_username(&members, username).await?;
    if viewer.id != member.id && !viewer.admin {
        return Err(Error::Status(
            Status::Forbidden,
            "You may only edit your own profile.".to_string(),
        ));
    }

    let mut updated = member.clone();
    if let Some((current, new)) = changes.password_change() {
        if !member.verify_password(current) {
            return Err(Error::Status(
                Status::Unauthorized,
                "Incorrect Password. Please try again.".to_string(),
            ));
        }
        updated.set_password(new)?;
    }

    if changes.username != member.username {
        validate_username(&changes.username)?;
        let taken = members
            .count_documents(doc! { "username": &changes.username }, None)
            .await?;
        if taken > 0 {
            return Err(Error::bad_request(USERNAME_TAKEN));
        }
        updated.username = changes.username.clone();
    }
    if changes.email != member.email {
        validate_email(&changes.email)?;
        updated.email = changes.email.clone();
    }
    updated.firstname = changes.firstname.clone();
    updated.lastname = changes.lastname.clone();

    if updated != member {
        new_members
            .replace_one(member.id.as_doc(), &updated.member, None)
            .await
            .map_err(|e| {
                // Lost a race for the username.
                if is_duplicate_key_error(&e) {
                    Error::bad_request(USERNAME_TAKEN)
                } else {
                    Error::Db(e)
                }
            })?;
        info!("Member '{}' updated by '{}'", updated.username, viewer.username);
    }

    Ok(Json(Profile {
        member: updated.into(),
        can_edit: true,
    }))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::serde_json::{self, json, Value},
    };

    use crate::model::{api::member::NewMemberRequest, db::member::MemberCore};

    use super::*;

    async fn put_update(client: &Client, username: &str, changes: &ProfileUpdate) -> Status {
        client
            .put(uri!(update(username)))
            .header(ContentType::JSON)
            .body(json!(changes).to_string())
            .dispatch()
            .await
            .status()
    }

    #[backend_test(member)]
    async fn list_active_members(client: Client, members: Coll<NewMember>) {
        let mut inactive = MemberCore::admin_example();
        inactive.active = false;
        members.insert_one(MemberCore::example2(), None).await.unwrap();
        members.insert_one(inactive, None).await.unwrap();

        let response = client.get(uri!(list)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let listed: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let usernames: Vec<_> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["username"].as_str().unwrap())
            .collect();
        assert_eq!(usernames, ["alice", "bob"]);
        assert!(!listed.to_string().contains("password_hash"));
    }

    #[backend_test]
    async fn list_requires_login(client: Client) {
        let response = client.get(uri!(list)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(member)]
    async fn view_profiles(client: Client, members: Coll<NewMember>) {
        members.insert_one(MemberCore::example2(), None).await.unwrap();

        let own = client.get(uri!(profile("alice"))).dispatch().await;
        let own: Value = serde_json::from_str(&own.into_string().await.unwrap()).unwrap();
        assert_eq!(own["can_edit"], json!(true));

        let other = client.get(uri!(profile("bob"))).dispatch().await;
        let other: Value = serde_json::from_str(&other.into_string().await.unwrap()).unwrap();
        assert_eq!(other["can_edit"], json!(false));
        assert_eq!(other["member"]["firstname"], json!("Bob"));

        let missing = client.get(uri!(profile("nobody"))).dispatch().await;
        assert_eq!(Status::NotFound, missing.status());
    }

    #[backend_test(member)]
    async fn update_own_profile(client: Client, members: Coll<Member>) {
        let changes = ProfileUpdate {
            firstname: "Alicia".into(),
            email: "alicia@example.org".into(),
            ..ProfileUpdate::example()
        };
        assert_eq!(Status::Ok, put_update(&client, "alice", &changes).await);

        let alice = member_by_username(&members, "alice").await.unwrap();
        assert_eq!(alice.firstname, "Alicia");
        assert_eq!(alice.email, "alicia@example.org");
    }

    #[backend_test(member)]
    async fn change_password(client: Client, members: Coll<Member>) {
        let mut changes = ProfileUpdate::example();
        changes.current_password = Some("wrong password".into());
        changes.new_password = Some("brand new password".into());
        assert_eq!(
            Status::Unauthorized,
            put_update(&client, "alice", &changes).await
        );

        changes.current_password = Some(NewMemberRequest::example().password);
        assert_eq!(Status::Ok, put_update(&client, "alice", &changes).await);

        let alice = member_by_username(&members, "alice").await.unwrap();
        assert!(alice.verify_password("brand new password"));
        assert!(!alice.password_expired);
    }

    #[backend_test(member)]
    async fn rename_to_taken_username(client: Client, members: Coll<NewMember>) {
        members.insert_one(MemberCore::example2(), None).await.unwrap();

        let changes = ProfileUpdate {
            username: "bob".into(),
            ..ProfileUpdate::example()
        };
        let response = client
            .put(uri!(update("alice")))
            .header(ContentType::JSON)
            .body(json!(changes).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let body: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["error"], json!(USERNAME_TAKEN));
    }

    #[backend_test(member)]
    async fn cannot_edit_others(client: Client, members: Coll<NewMember>) {
        members.insert_one(MemberCore::example2(), None).await.unwrap();

        let changes = ProfileUpdate {
            username: "bob".into(),
            firstname: "Robert".into(),
            ..ProfileUpdate::example()
        };
        assert_eq!(Status::Forbidden, put_update(&client, "bob", &changes).await);
    }

    #[backend_test(admin)]
    async fn admin_edits_others(client: Client, members: Coll<NewMember>) {
        members.insert_one(MemberCore::example(), None).await.unwrap();

        let changes = ProfileUpdate {
            lastname: "Pleasance Liddell".into(),
            ..ProfileUpdate::example()
        };
        assert_eq!(Status::Ok, put_update(&client, "alice", &changes).await);

        let alice = members
            .find_one(doc! { "username": "alice" }, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.lastname, "Pleasance Liddell");
    }
}
