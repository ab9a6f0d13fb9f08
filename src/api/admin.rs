use chrono::Utc;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use rocket::{http::Status, serde::json::Json, Route, State};

use aws_sdk_sesv2::Client as SesClient;

use crate::{
    api::{
        common::{election_by_id, member_by_username, member_from_token},
        members::active_members,
    },
    error::{Error, Result},
    mail,
    model::{
        api::{
            admin::{AdminPanel, AdminTask},
            auth::{Admin, AuthToken},
            election::{ElectionDescription, ElectionSpec},
            member::{DuesPayment, DuesStatus, MemberDescription, NewMemberRequest},
        },
        common::date::parse_end_of_date,
        db::{
            election::{Election, NewElection},
            member::{Member, MemberCore, NewMember},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![
        panel,
        add_member,
        reset_password,
        deactivate_member,
        activate_member,
        create_election,
        cancel_election,
        dues,
        set_dues,
    ]
}

#[get("/admin?<task>")]
pub async fn panel(
    _token: AuthToken<Admin>,
    task: Option<AdminTask>,
    members: Coll<Member>,
) -> Result<Json<AdminPanel>> {
    let resettable = match task {
        Some(AdminTask::ResetPassword) => Some(
            active_members(&members)
                .await?
                .into_iter()
                .map(MemberDescription::from)
                .collect(),
        ),
        _ => None,
    };
    Ok(Json(AdminPanel::new(task, resettable)))
}

#[post("/admin/members", data = "<request>", format = "json")]
pub async fn add_member(
    _token: AuthToken<Admin>,
    request: Json<NewMemberRequest>,
    new_members: Coll<NewMember>,
) -> Result<Json<MemberDescription>> {
    let member = MemberCore::new(request.0)?;

    // Check username uniqueness up front for a friendlier message; the unique
    // index still catches concurrent inserts.
    let taken = new_members
        .count_documents(doc! { "username": &member.username }, None)
        .await?;
    let username_taken =
        || Error::bad_request(format!("Username '{}' is already in use.", member.username));
    if taken > 0 {
        return Err(username_taken());
    }

    let inserted = new_members
        .insert_one(&member, None)
        .await
        .map_err(|e| {
            if is_duplicate_key_error(&e) {
                username_taken()
            } else {
                Error::Db(e)
            }
        })?;
    let id: Id = inserted
        .inserted_id
        .as_object_id()
        .unwrap() // Valid because the ID comes directly from the DB
        .into();

    info!("Added member '{}'", member.username);
    Ok(Json(Member { id, member }.into()))
}

#[post("/admin/members/<username>/reset-password")]
pub async fn reset_password(
    _token: AuthToken<Admin>,
    username: &str,
    members: Coll<Member>,
    new_members: Coll<NewMember>,
    mailer: &State<SesClient>,
    config: &State<Config>,
) -> Result<Status> {
    let mut member = member_by_username(&members, username).await?;
    if !member.active {
        return Err(Error::bad_request("Member is not active"));
    }
    if !mail::is_email_valid(&member.email) {
        return Err(Error::bad_request("Members email is not valid"));
    }

    let password = member.reset_password(&mut rand::thread_rng())?;
    // Save before mailing, so a member is never sent a password that does not work.
    new_members
        .replace_one(member.id.as_doc(), &member.member, None)
        .await?;
    mail::send_password_reset(mailer, config.mail_sender(), &member, &password).await?;

    info!("Reset password of member '{}'", member.username);
    Ok(Status::Ok)
}

#[post("/admin/members/<username>/deactivate")]
pub async fn deactivate_member(
    token: AuthToken<Admin>,
    username: &str,
    members: Coll<Member>,
) -> Result<Status> {
    let member = member_by_username(&members, username).await?;
    if member.id == token.id {
        return Err(Error::bad_request("You cannot deactivate yourself."));
    }
    set_active(&members, &member, false).await
}

#[post("/admin/members/<username>/activate")]
pub async fn activate_member(
    _token: AuthToken<Admin>,
    username: &str,
    members: Coll<Member>,
) -> Result<Status> {
    let member = member_by_username(&members, username).await?;
    set_active(&members, &member, true).await
}

async fn set_active(members: &Coll<Member>, member: &Member, active: bool) -> Result<Status> {
    members
        .update_one(
            member.id.as_doc(),
            doc! { "$set": { "active": active } },
            None,
        )
        .await?;
    info!(
        "Member '{}' {}",
        member.username,
        if active { "activated" } else { "deactivated" }
    );
    Ok(Status::Ok)
}

#[post("/admin/elections", data = "<spec>", format = "json")]
pub async fn create_election(
    _token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    new_elections: Coll<NewElection>,
    config: &State<Config>,
) -> Result<Json<ElectionDescription>> {
    let local = config.local_offset();
    let election = spec.0.into_election(local)?;
    let id: Id = new_elections
        .insert_one(&election, None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Valid because the ID comes directly from the DB
        .into();

    info!("Created {} for {}", election.kind, election.position);
    let election = Election { id, election };
    Ok(Json(ElectionDescription::new(&election, Utc::now(), local)))
}

#[post("/admin/elections/<election_id>/cancel")]
pub async fn cancel_election(
    _token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
) -> Result<Status> {
    let election = election_by_id(&elections, election_id).await?;
    elections
        .update_one(
            election.id.as_doc(),
            doc! { "$set": { "cancelled": true } },
            None,
        )
        .await?;
    info!("Cancelled election {election_id}");
    Ok(Status::Ok)
}

#[get("/admin/dues")]
pub async fn dues(
    _token: AuthToken<Admin>,
    members: Coll<Member>,
    config: &State<Config>,
) -> Result<Json<Vec<DuesStatus>>> {
    let now = Utc::now();
    let statuses = active_members(&members)
        .await?
        .iter()
        .map(|member| DuesStatus::new(member, config.dues_rate(member.starving), now))
        .collect();
    Ok(Json(statuses))
}

#[put("/admin/dues/<username>", data = "<payment>", format = "json")]
pub async fn set_dues(
    token: AuthToken<Admin>,
    username: &str,
    payment: Json<DuesPayment>,
    members: Coll<Member>,
    config: &State<Config>,
) -> Result<Json<DuesStatus>> {
    let admin = member_from_token(&token, &members).await?;
    let mut member = member_by_username(&members, username).await?;
    let paid_through = parse_end_of_date(&payment.paid_through, config.local_offset())?;

    members
        .update_one(
            member.id.as_doc(),
            doc! { "$set": { "dues_paid_through": BsonDateTime::from_chrono(paid_through) } },
            None,
        )
        .await?;
    member.dues_paid_through = Some(BsonDateTime::from_chrono(paid_through));

    info!(
        "Dues of '{}' paid through {}, recorded by '{}'",
        member.username, payment.paid_through, admin.username
    );
    Ok(Json(DuesStatus::new(
        &member,
        config.dues_rate(member.starving),
        Utc::now(),
    )))
}
