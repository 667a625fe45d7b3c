//! End-to-end scenario against a running server.
//!
//! Walks the whole flow once: two accounts, a committee, a meeting, a
//! motion, votes (including a changed vote), discussion, a forbidden close
//! by a non-chair, the real close, and the conflict responses afterwards.
//! Exits nonzero on the first assertion that fails.
//!
//! ```sh
//! TESTER_URL=http://127.0.0.1:1111 cargo run -p tester
//! ```

use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Result, ensure};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

struct Api {
    http: Client,
    base: String,
}

impl Api {
    async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = self.http.request(method, format!("{}{path}", self.base));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);

        Ok((status, body))
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, path, token, Some(body)).await
    }

    async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::PATCH, path, token, Some(body)).await
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, path, token, None).await
    }

    async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, path, token, None).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let api = Api {
        http: Client::new(),
        base: env::var("TESTER_URL").unwrap_or_else(|_| "http://127.0.0.1:1111".to_string()),
    };

    // Unique suffix so the run is repeatable against a dirty database.
    let run = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();

    let ada_email = format!("ada+{run}@example.com");
    let grace_email = format!("grace+{run}@example.com");

    // Accounts.
    let (status, _) = api
        .post(
            "/auth/register",
            None,
            json!({ "name": "Ada", "email": ada_email, "password": "correcthorse" }),
        )
        .await?;
    ensure!(status == StatusCode::CREATED, "register ada: {status}");

    let (status, _) = api
        .post(
            "/auth/register",
            None,
            json!({ "name": "Grace", "email": grace_email, "password": "correcthorse" }),
        )
        .await?;
    ensure!(status == StatusCode::CREATED, "register grace: {status}");

    let (status, _) = api
        .post(
            "/auth/register",
            None,
            json!({ "name": "Ada Again", "email": ada_email, "password": "correcthorse" }),
        )
        .await?;
    ensure!(status == StatusCode::CONFLICT, "duplicate email: {status}");

    let (status, body) = api
        .post(
            "/auth/login",
            None,
            json!({ "email": ada_email, "password": "correcthorse" }),
        )
        .await?;
    ensure!(status == StatusCode::OK, "login: {status}");
    let token = body["token"].as_str().expect("token").to_string();
    let token = Some(token.as_str());

    let (status, _) = api
        .post(
            "/auth/login",
            None,
            json!({ "email": ada_email, "password": "wrong" }),
        )
        .await?;
    ensure!(status == StatusCode::UNAUTHORIZED, "bad login: {status}");

    println!("Accounts OK");

    // Committee with both members.
    let (status, body) = api
        .post(
            "/committees",
            token,
            json!({ "name": format!("Budget {run}"), "description": "annual budget" }),
        )
        .await?;
    ensure!(status == StatusCode::CREATED, "create committee: {status}");
    let committee_id = body["committee"]["id"]
        .as_str()
        .expect("committee id")
        .to_string();
    ensure!(body["committee"]["members"].as_array().expect("members").len() == 1);
    ensure!(body["committee"]["members"][0]["role"] == "owner");

    let (status, body) = api
        .post(
            &format!("/committees/{committee_id}/members"),
            token,
            json!({ "email": grace_email, "role": "member" }),
        )
        .await?;
    ensure!(status == StatusCode::OK, "add member: {status}");
    ensure!(body["committee"]["members"].as_array().expect("members").len() == 2);

    let (status, body) = api.get("/committees", token).await?;
    ensure!(status == StatusCode::OK, "list committees: {status}");
    let listed = body["committees"]
        .as_array()
        .expect("committees")
        .iter()
        .any(|c| c["id"] == committee_id.as_str());
    ensure!(listed, "created committee missing from list");

    println!("Committee OK");

    // Meeting: Ada creates (and so chairs), Grace joins by code.
    let (status, body) = api
        .post(
            "/meetings",
            token,
            json!({ "name": "Budget session", "committeeIds": [committee_id] }),
        )
        .await?;
    ensure!(status == StatusCode::CREATED, "create meeting: {status}");
    let meeting_id = body["meetingId"].as_str().expect("meeting id").to_string();
    let code = body["code"].as_str().expect("code").to_string();
    let chair = body["creatorParticipantId"]
        .as_str()
        .expect("creator participant")
        .to_string();

    let (status, _) = api
        .get(&format!("/meetings/code/{}", code.to_lowercase()), None)
        .await?;
    ensure!(status == StatusCode::OK, "lookup by lowercased code: {status}");

    let (status, body) = api
        .post(
            &format!("/meetings/{meeting_id}/join"),
            None,
            json!({ "displayName": "Grace" }),
        )
        .await?;
    ensure!(status == StatusCode::OK, "join: {status}");
    let grace_participant = body["participantId"]
        .as_str()
        .expect("participant")
        .to_string();

    println!("Meeting OK (code {code})");

    // Motion, votes, and a changed vote.
    let (status, body) = api
        .post(
            "/motions",
            None,
            json!({ "meetingId": meeting_id, "title": "Adopt the budget" }),
        )
        .await?;
    ensure!(status == StatusCode::CREATED, "create motion: {status}");
    let motion_id = body["motion"]["id"].as_str().expect("motion id").to_string();
    ensure!(body["motion"]["status"] == "voting");
    ensure!(body["motion"]["threshold"] == 0.5);

    let (status, _) = api
        .post(
            &format!("/motions/{motion_id}/vote"),
            None,
            json!({ "meetingId": meeting_id, "participantId": chair, "vote": "yes" }),
        )
        .await?;
    ensure!(status == StatusCode::OK, "chair votes yes: {status}");

    let (status, _) = api
        .post(
            &format!("/motions/{motion_id}/vote"),
            None,
            json!({ "meetingId": meeting_id, "participantId": grace_participant, "vote": "yes" }),
        )
        .await?;
    ensure!(status == StatusCode::OK, "grace votes yes: {status}");

    let (status, body) = api
        .post(
            &format!("/motions/{motion_id}/vote"),
            None,
            json!({ "meetingId": meeting_id, "participantId": grace_participant, "vote": "no" }),
        )
        .await?;
    ensure!(status == StatusCode::OK, "grace changes vote: {status}");
    ensure!(body["motion"]["votes"]["yes"].as_array().expect("yes").len() == 1);
    ensure!(body["motion"]["votes"]["no"].as_array().expect("no").len() == 1);

    let (status, _) = api
        .post(
            &format!("/motions/{motion_id}/vote"),
            None,
            json!({ "meetingId": meeting_id, "participantId": grace_participant, "vote": "perhaps" }),
        )
        .await?;
    ensure!(status == StatusCode::BAD_REQUEST, "invalid choice: {status}");

    let (status, _) = api
        .post(
            &format!("/motions/{motion_id}/discuss"),
            None,
            json!({
                "meetingId": meeting_id,
                "participantId": grace_participant,
                "comment": "The reserve line is too thin.",
                "stance": "con",
            }),
        )
        .await?;
    ensure!(status == StatusCode::CREATED, "discussion: {status}");

    println!("Voting OK");

    // Close: member forbidden, chair closes, everything after conflicts.
    let (status, _) = api
        .patch(
            &format!("/motions/{motion_id}"),
            None,
            json!({
                "meetingId": meeting_id,
                "participantId": grace_participant,
                "status": "completed",
            }),
        )
        .await?;
    ensure!(status == StatusCode::FORBIDDEN, "member close: {status}");

    let (status, body) = api
        .patch(
            &format!("/motions/{motion_id}"),
            None,
            json!({
                "meetingId": meeting_id,
                "participantId": chair,
                "status": "completed",
                "chairSummary": "Split vote, no decision.",
            }),
        )
        .await?;
    ensure!(status == StatusCode::OK, "chair close: {status}");
    ensure!(body["motion"]["status"] == "completed");
    // One yes, one no, threshold 0.5: a tie.
    ensure!(
        body["motion"]["result"] == "tied",
        "result: {}",
        body["motion"]["result"]
    );

    let (status, _) = api
        .post(
            &format!("/motions/{motion_id}/vote"),
            None,
            json!({ "meetingId": meeting_id, "participantId": chair, "vote": "no" }),
        )
        .await?;
    ensure!(status == StatusCode::CONFLICT, "vote after close: {status}");

    let (status, _) = api
        .patch(
            &format!("/motions/{motion_id}"),
            None,
            json!({ "meetingId": meeting_id, "participantId": chair, "status": "completed" }),
        )
        .await?;
    ensure!(status == StatusCode::CONFLICT, "double close: {status}");

    println!("Close OK");

    // Cleanup paths.
    let (status, _) = api
        .post(
            &format!("/meetings/{meeting_id}/leave"),
            None,
            json!({ "participantId": grace_participant }),
        )
        .await?;
    ensure!(status == StatusCode::OK, "leave: {status}");

    let (status, _) = api
        .delete(&format!("/committees/{committee_id}"), token)
        .await?;
    ensure!(status == StatusCode::OK, "delete committee: {status}");

    println!("Scenario passed");

    Ok(())
}
