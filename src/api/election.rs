use log::info;
use rocket::{http::Status, response::status::Custom, serde::json::Json, Route, State};

use crate::error::Result;
use crate::logging::RequestId;
use crate::model::{api::VoteRequest, auth::BearerToken, Candidate, CandidateTotal, Vote};
use crate::store::{ElectionStore, SessionStore, Store};

pub fn routes() -> Vec<Route> {
    routes![candidates, vote, results, totals]
}

#[get("/candidates")]
pub fn candidates(token: BearerToken, store: &State<Store>) -> Result<Json<Vec<Candidate>>> {
    store.resolve_token(&token)?;
    Ok(Json(store.list_candidates()))
}

#[post("/vote", data = "<ballot>")]
pub fn vote(
    id: RequestId,
    token: BearerToken,
    ballot: Json<VoteRequest>,
    store: &State<Store>,
) -> Result<Custom<Json<Vote>>> {
    let voter = store.resolve_token(&token)?;
    let vote = store.cast_vote(voter.id, ballot.candidate_id)?;
    info!("req{id}: user {} voted", voter.username);
    Ok(Custom(Status::Created, Json(vote)))
}

/// Every vote cast so far.
#[get("/results")]
pub fn results(token: BearerToken, store: &State<Store>) -> Result<Json<Vec<Vote>>> {
    store.resolve_token(&token)?;
    Ok(Json(store.tally()))
}

/// Votes per candidate.
#[get("/results/totals")]
pub fn totals(token: BearerToken, store: &State<Store>) -> Result<Json<Vec<CandidateTotal>>> {
    store.resolve_token(&token)?;
    let votes = store.tally();
    Ok(Json(CandidateTotal::count(&store.list_candidates(), &votes)))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header},
        local::asynchronous::Client,
        serde::json::json,
    };

    use super::*;
    use crate::error::ErrorBody;
    use crate::model::{
        api::{LoginRequest, LoginResponse, RegisterRequest},
        auth::AUTHORIZATION_HEADER,
        SessionToken, User,
    };
    use crate::store::CredentialStore;

    const BOB_SMITH: u64 = 2;

    fn auth_header(token: &SessionToken) -> Header<'static> {
        Header::new(AUTHORIZATION_HEADER, format!("Token {token}"))
    }

    async fn cast(client: &Client, token: &SessionToken, candidate: u64) -> (Status, String) {
        let response = client
            .post("/api/vote")
            .header(ContentType::JSON)
            .header(auth_header(token))
            .body(json!({ "candidate": candidate }).to_string())
            .dispatch()
            .await;
        let status = response.status();
        (status, response.into_string().await.unwrap_or_default())
    }

    #[backend_test]
    async fn endpoints_require_token(client: Client) {
        for uri in ["/api/candidates", "/api/results", "/api/results/totals"] {
            let response = client.get(uri).dispatch().await;
            assert_eq!(Status::Unauthorized, response.status());

            let response = client
                .get(uri)
                .header(auth_header(&SessionToken::from("forged")))
                .dispatch()
                .await;
            assert_eq!(Status::Unauthorized, response.status());
        }

        let response = client
            .post("/api/vote")
            .header(ContentType::JSON)
            .body(json!({ "candidate": BOB_SMITH }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(voter)]
    async fn list_candidates(client: Client, token: SessionToken) {
        let response = client
            .get("/api/candidates")
            .header(auth_header(&token))
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let seeded: Vec<Candidate> = response.into_json().await.unwrap();
        let names: Vec<_> = seeded.into_iter().map(|c| c.name).collect();
        assert_eq!(vec!["Alice Johnson", "Bob Smith", "Charlie Brown"], names);
    }

    #[backend_test(voter)]
    async fn vote_once(client: Client, store: Store, token: SessionToken) {
        let (status, body) = cast(&client, &token, BOB_SMITH).await;
        assert_eq!(Status::Created, status);
        let recorded: Vote = rocket::serde::json::from_str(&body).unwrap();
        assert_eq!(BOB_SMITH, recorded.candidate_id);

        let (status, body) = cast(&client, &token, 1).await;
        assert_eq!(Status::BadRequest, status);
        let error: ErrorBody = rocket::serde::json::from_str(&body).unwrap();
        assert_eq!("User has already voted", error.error);

        assert_eq!(vec![recorded], store.tally());
    }

    #[backend_test(voter)]
    async fn vote_unknown_candidate(client: Client, store: Store, token: SessionToken) {
        let (status, body) = cast(&client, &token, 42).await;
        assert_eq!(Status::BadRequest, status);
        let error: ErrorBody = rocket::serde::json::from_str(&body).unwrap();
        assert_eq!("Candidate not found", error.error);

        assert!(store.tally().is_empty());
        assert!(!store.resolve_token(&token).unwrap().has_voted);
    }

    #[backend_test(voter)]
    async fn vote_with_mistyped_candidate(client: Client, store: Store, token: SessionToken) {
        let response = client
            .post("/api/vote")
            .header(ContentType::JSON)
            .header(auth_header(&token))
            .body(json!({ "candidate": "two" }).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::BadRequest, response.status());
        let error: ErrorBody = response.into_json().await.unwrap();
        assert_eq!("Invalid request body", error.error);
        assert!(store.tally().is_empty());
    }

    #[backend_test(voter)]
    async fn concurrent_votes(client: Client, store: Store, token: SessionToken) {
        let attempts = (1..=3).cycle().take(12).map(|candidate| cast(&client, &token, candidate));
        let statuses: Vec<Status> = rocket::futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|(status, _)| status)
            .collect();

        assert_eq!(1, statuses.iter().filter(|s| **s == Status::Created).count());
        assert_eq!(11, statuses.iter().filter(|s| **s == Status::BadRequest).count());
        assert_eq!(1, store.tally().len());
    }

    #[backend_test(voter)]
    async fn results_and_totals(client: Client, store: Store, token: SessionToken) {
        let bob = store.create_user("bob", "bob@example.com", "pw456").unwrap();
        cast(&client, &token, BOB_SMITH).await;
        store.cast_vote(bob.id, BOB_SMITH).unwrap();

        let response = client
            .get("/api/results")
            .header(auth_header(&token))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let votes: Vec<Vote> = response.into_json().await.unwrap();
        assert_eq!(vec![1, 2], votes.iter().map(|v| v.id).collect::<Vec<_>>());

        let response = client
            .get("/api/results/totals")
            .header(auth_header(&token))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let per_candidate: Vec<CandidateTotal> = response.into_json().await.unwrap();
        let counts: Vec<_> = per_candidate.iter().map(|t| t.votes).collect();
        assert_eq!(vec![0, 2, 0], counts);
    }

    #[backend_test]
    async fn preflight(client: Client) {
        let response = client.options("/api/vote").dispatch().await;

        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            Some("*"),
            response.headers().get_one("Access-Control-Allow-Origin")
        );
        assert_eq!(
            Some("Content-Type, Authorization"),
            response.headers().get_one("Access-Control-Allow-Headers")
        );
    }

    #[backend_test]
    async fn full_election(client: Client) {
        let response = client
            .post("/api/register")
            .header(ContentType::JSON)
            .body(json!(RegisterRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let alice: User = response.into_json().await.unwrap();

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!(LoginRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let session: LoginResponse = response.into_json().await.unwrap();

        let response = client
            .get("/api/candidates")
            .header(auth_header(&session.token))
            .dispatch()
            .await;
        let seeded: Vec<Candidate> = response.into_json().await.unwrap();
        let bob_smith = seeded
            .iter()
            .find(|c| c.name == "Bob Smith")
            .unwrap()
            .id;

        let (status, _) = cast(&client, &session.token, bob_smith).await;
        assert_eq!(Status::Created, status);
        let (status, _) = cast(&client, &session.token, bob_smith).await;
        assert_eq!(Status::BadRequest, status);

        let response = client
            .get("/api/results")
            .header(auth_header(&session.token))
            .dispatch()
            .await;
        let votes: Vec<Vote> = response.into_json().await.unwrap();
        assert_eq!(1, votes.len());
        assert_eq!(alice.id, votes[0].user_id);
        assert_eq!(bob_smith, votes[0].candidate_id);
    }
}
