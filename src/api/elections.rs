use std::collections::HashMap;

use chrono::Utc;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::FindOptions,
};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::{
    api::common::{election_by_id, member_by_username, member_from_token},
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            election::{ElectionsOverview, NominationRequest, VoteRequest},
        },
        common::election::ElectionPhase,
        db::{election::Election, member::Member},
        mongodb::{Coll, Id},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![overview, nominate, vote]
}

#[get("/elections")]
pub async fn overview(
    token: AuthToken<Member>,
    elections: Coll<Election>,
    members: Coll<Member>,
    config: &State<Config>,
) -> Result<Json<ElectionsOverview>> {
    let by_end = FindOptions::builder().sort(doc! { "vote_end": 1 }).build();
    let current: Vec<Election> = elections
        .find(doc! { "cancelled": { "$ne": true } }, by_end)
        .await?
        .try_collect()
        .await?;

    // Every member, so that deactivated nominees are still named.
    let directory: HashMap<Id, Member> = members
        .find(None, None)
        .await?
        .map_ok(|member| (member.id, member))
        .try_collect()
        .await?;

    Ok(Json(ElectionsOverview::build(
        &current,
        &directory,
        token.id,
        Utc::now(),
        config.local_offset(),
    )))
}

#[post("/elections/<election_id>/nominate", data = "<nomination>", format = "json")]
pub async fn nominate(
    token: AuthToken<Member>,
    election_id: Id,
    nomination: Json<NominationRequest>,
    elections: Coll<Election>,
    members: Coll<Member>,
) -> Result<Status> {
    let nominee = nomination
        .nominee
        .as_deref()
        .filter(|username| !username.is_empty())
        .ok_or_else(|| Error::bad_request("You have not selected a member to nominate."))?;

    let nominator = member_from_token(&token, &members).await?;
    let election = election_by_id(&elections, election_id).await?;
    let now = Utc::now();
    if election.phase_at(now) != ElectionPhase::Nominating {
        return Err(Error::bad_request(
            "Nominations are not open for this election.",
        ));
    }
    if election.has_nominated(nominator.id) {
        return Err(Error::bad_request(
            "You have already made a nomination in this election.",
        ));
    }

    let nominee = member_by_username(&members, nominee).await?;
    if !nominee.active {
        return Err(Error::bad_request(format!(
            "'{}' is not an active member.",
            nominee.username
        )));
    }
    if nominee.id == nominator.id {
        return Err(Error::bad_request("You cannot nominate yourself."));
    }
    if election.is_nominee(nominee.id) {
        return Err(Error::bad_request(format!(
            "'{}' has already been nominated.",
            nominee.username
        )));
    }

    // Re-check everything in the update itself, so concurrent requests
    // cannot nominate twice or outside the window.
    let now = BsonDateTime::from_chrono(now);
    let filter = doc! {
        "_id": election.id,
        "cancelled": { "$ne": true },
        "nominate_start": { "$lt": now },
        "nominate_end": { "$gt": now },
        "nominators": { "$ne": nominator.id },
        "nominees": { "$ne": nominee.id },
    };
    let update = doc! {
        "$push": {
            "nominators": nominator.id,
            "nominees": nominee.id,
        }
    };
    let result = elections.update_one(filter, update, None).await?;
    if result.modified_count == 0 {
        return Err(Error::Status(
            Status::Conflict,
            "Your nomination could not be recorded. Please try again.".to_string(),
        ));
    }

    info!(
        "'{}' nominated '{}' in election {}",
        nominator.username, nominee.username, election.id
    );
    Ok(Status::Ok)
}

#[post("/elections/<election_id>/vote", data = "<ballot>", format = "json")]
pub async fn vote(
    token: AuthToken<Member>,
    election_id: Id,
    ballot: Json<VoteRequest>,
    elections: Coll<Election>,
    members: Coll<Member>,
) -> Result<Status> {
    let candidate = ballot
        .candidate
        .as_deref()
        .filter(|username| !username.is_empty())
        .ok_or_else(|| Error::bad_request("You have not selected a candidate in this election."))?;

    let voter = member_from_token(&token, &members).await?;
    let election = election_by_id(&elections, election_id).await?;
    let now = Utc::now();
    if election.phase_at(now) != ElectionPhase::Voting {
        return Err(Error::bad_request("Voting is not open for this election."));
    }
    if election.has_voted(voter.id) {
        return Err(Error::bad_request(
            "You have already voted in this election.",
        ));
    }

    let candidate = member_by_username(&members, candidate).await?;
    if !election.is_nominee(candidate.id) {
        return Err(Error::bad_request(format!(
            "'{}' is not a candidate in this election.",
            candidate.username
        )));
    }

    let now = BsonDateTime::from_chrono(now);
    let filter = doc! {
        "_id": election.id,
        "cancelled": { "$ne": true },
        "vote_start": { "$lt": now },
        "vote_end": { "$gt": now },
        "voters": { "$ne": voter.id },
        "nominees": candidate.id,
    };
    let update = doc! {
        "$push": {
            "voters": voter.id,
            "votes": candidate.id,
        }
    };
    let result = elections.update_one(filter, update, None).await?;
    if result.modified_count == 0 {
        return Err(Error::Status(
            Status::Conflict,
            "Your vote could not be recorded. Please try again.".to_string(),
        ));
    }

    // The choice is not logged, only that a vote was cast.
    info!("'{}' voted in election {}", voter.username, election.id);
    Ok(Status::Ok)
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json::{self, json, Value},
    };

    use crate::model::db::{
        election::{ElectionCore, NewElection},
        member::{MemberCore, NewMember},
    };

    use super::*;

    async fn body_json(response: LocalResponse<'_>) -> Value {
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn insert_election(elections: &Coll<NewElection>, election: ElectionCore) -> Id {
        elections
            .insert_one(election, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    async fn insert_member(members: &Coll<NewMember>, member: MemberCore) -> Id {
        members
            .insert_one(member, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    async fn post_nomination(client: &Client, id: Id, nominee: Value) -> LocalResponse<'_> {
        client
            .post(uri!(nominate(id)))
            .header(ContentType::JSON)
            .body(json!({ "nominee": nominee }).to_string())
            .dispatch()
            .await
    }

    async fn post_vote(client: &Client, id: Id, candidate: Value) -> LocalResponse<'_> {
        client
            .post(uri!(vote(id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate": candidate }).to_string())
            .dispatch()
            .await
    }

    #[backend_test(member)]
    async fn overview_by_phase(
        client: Client,
        elections: Coll<NewElection>,
        members: Coll<NewMember>,
    ) {
        let bob = insert_member(&members, MemberCore::example2()).await;
        let mut ended = ElectionCore::ended_example();
        ended.nominees.push(bob);
        ended.votes = vec![bob, bob];
        let mut cancelled = ElectionCore::voting_example();
        cancelled.cancelled = true;
        for election in [
            ElectionCore::nominating_example(),
            ElectionCore::voting_example(),
            ended,
            cancelled,
        ] {
            insert_election(&elections, election).await;
        }

        let response = client.get(uri!(overview)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let page = body_json(response).await;
        assert_eq!(page["nominating"].as_array().unwrap().len(), 1);
        assert_eq!(page["voting"].as_array().unwrap().len(), 1);
        let ended = page["ended"].as_array().unwrap();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0]["total_votes"], json!(2));
        assert_eq!(ended[0]["totals"][0], json!({ "candidate": "bob", "votes": 2 }));

        // The viewer may nominate bob, but not themselves.
        let eligible = &page["nominating"][0]["eligible"];
        assert_eq!(eligible.as_array().unwrap().len(), 1);
        assert_eq!(eligible[0]["username"], json!("bob"));
    }

    #[backend_test(member)]
    async fn nominate_once(
        client: Client,
        elections: Coll<Election>,
        new_elections: Coll<NewElection>,
        members: Coll<NewMember>,
    ) {
        let bob = insert_member(&members, MemberCore::example2()).await;
        insert_member(&members, MemberCore::admin_example()).await;
        let id = insert_election(&new_elections, ElectionCore::nominating_example()).await;

        let response = post_nomination(&client, id, json!("bob")).await;
        assert_eq!(Status::Ok, response.status());

        let election = election_by_id(&elections, id).await.unwrap();
        assert_eq!(election.nominees, vec![bob]);
        assert_eq!(election.nominators.len(), 1);

        // A second nomination by the same member is refused.
        let response = post_nomination(&client, id, json!("root")).await;
        assert_eq!(Status::BadRequest, response.status());
        let election = election_by_id(&elections, id).await.unwrap();
        assert_eq!(election.nominees, vec![bob]);
    }

    #[backend_test(member)]
    async fn invalid_nominations(
        client: Client,
        elections: Coll<NewElection>,
        members: Coll<NewMember>,
    ) {
        let mut inactive = MemberCore::example2();
        inactive.active = false;
        insert_member(&members, inactive).await;
        let id = insert_election(&elections, ElectionCore::nominating_example()).await;

        let response = post_nomination(&client, id, Value::Null).await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(
            body_json(response).await["error"],
            json!("You have not selected a member to nominate.")
        );

        let response = post_nomination(&client, id, json!("alice")).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = post_nomination(&client, id, json!("bob")).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = post_nomination(&client, id, json!("nobody")).await;
        assert_eq!(Status::NotFound, response.status());

        let response = post_nomination(&client, Id::new(), json!("bob")).await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(member)]
    async fn nominations_closed(
        client: Client,
        elections: Coll<NewElection>,
        members: Coll<NewMember>,
    ) {
        insert_member(&members, MemberCore::example2()).await;
        let id = insert_election(&elections, ElectionCore::voting_example()).await;

        let response = post_nomination(&client, id, json!("bob")).await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(member)]
    async fn vote_once(
        client: Client,
        elections: Coll<Election>,
        new_elections: Coll<NewElection>,
        members: Coll<NewMember>,
    ) {
        let bob = insert_member(&members, MemberCore::example2()).await;
        let mut voting = ElectionCore::voting_example();
        voting.nominees.push(bob);
        let id = insert_election(&new_elections, voting).await;

        let response = post_vote(&client, id, json!("bob")).await;
        assert_eq!(Status::Ok, response.status());

        let response = post_vote(&client, id, json!("bob")).await;
        assert_eq!(Status::BadRequest, response.status());

        let election = election_by_id(&elections, id).await.unwrap();
        assert_eq!(election.votes, vec![bob]);
        assert_eq!(election.voters.len(), 1);
        // Ballots are not linked to voters.
        assert_ne!(election.voters, election.votes);
    }

    #[backend_test(member)]
    async fn invalid_votes(
        client: Client,
        elections: Coll<NewElection>,
        members: Coll<NewMember>,
    ) {
        insert_member(&members, MemberCore::example2()).await;
        let voting = insert_election(&elections, ElectionCore::voting_example()).await;
        let nominating = insert_election(&elections, ElectionCore::nominating_example()).await;

        let response = post_vote(&client, voting, Value::Null).await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(
            body_json(response).await["error"],
            json!("You have not selected a candidate in this election.")
        );

        // Not a nominee.
        let response = post_vote(&client, voting, json!("bob")).await;
        assert_eq!(Status::BadRequest, response.status());

        // Not open for voting.
        let response = post_vote(&client, nominating, json!("bob")).await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(member)]
    async fn cancelled_elections_reject_participation(
        client: Client,
        elections: Coll<NewElection>,
        members: Coll<NewMember>,
    ) {
        let bob = insert_member(&members, MemberCore::example2()).await;
        let mut nominating = ElectionCore::nominating_example();
        nominating.cancelled = true;
        let mut voting = ElectionCore::voting_example();
        voting.nominees.push(bob);
        voting.cancelled = true;
        let nominating = insert_election(&elections, nominating).await;
        let voting = insert_election(&elections, voting).await;

        let response = post_nomination(&client, nominating, json!("bob")).await;
        assert_eq!(Status::NotFound, response.status());

        let response = post_vote(&client, voting, json!("bob")).await;
        assert_eq!(Status::NotFound, response.status());

        let untouched = elections
            .count_documents(doc! { "nominators": [], "voters": [] }, None)
            .await
            .unwrap();
        assert_eq!(untouched, 2);
    }

    #[backend_test]
    async fn elections_require_login(client: Client) {
        let response = client.get(uri!(overview)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
