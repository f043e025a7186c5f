//! Integration tests for the Orbit backend.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::auth::MEMBER_EMAIL_HEADER;
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::models::{CreateMemberRequest, CreateTeamHistoryRequest, CreateTeamRequest, Privilege};
use crate::search::SearchIndex;
use crate::{create_router, AppState};

const BEA: &str = "bea@orbitntnu.com";
const MONA: &str = "mona@orbitntnu.com";
const NILS: &str = "nils@orbitntnu.com";

/// IDs of the seeded directory.
///
/// Bea holds the Treasurer seat on the board, Mona leads Software with Nils as
/// a member, and Anne is not on any team.
struct Seed {
    board: i64,
    software: i64,
    bea: i64,
    mona: i64,
    nils: i64,
    anne: i64,
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    seed: Seed,
    _temp_dir: TempDir,
}

fn new_member(first: &str, last: &str, mail: &str) -> CreateMemberRequest {
    CreateMemberRequest {
        first_name: first.to_string(),
        last_name: last.to_string(),
        orbit_mail: mail.to_string(),
        ntnu_mail: None,
        personal_mail: None,
        phone_number: None,
        show_phone_nr_on_website: None,
        birthday: None,
        nationalities: None,
        field_of_study: "MTDT".to_string(),
        year_of_study: None,
        additional_comments: None,
        slack_id: None,
        active_status: false,
    }
}

async fn seed(repo: &Repository) -> Seed {
    let board = repo
        .create_team(&CreateTeamRequest {
            team_name: "Board".to_string(),
        })
        .await
        .unwrap();
    let software = repo
        .create_team(&CreateTeamRequest {
            team_name: "Software".to_string(),
        })
        .await
        .unwrap();

    let mut bea = new_member("Bea", "Bakke", BEA);
    bea.active_status = true;
    let bea = repo.create_member(&bea).await.unwrap();
    let mut mona = new_member("Mona", "Lie", MONA);
    mona.active_status = true;
    mona.phone_number = Some("+47 400 00 000".to_string());
    let mona = repo.create_member(&mona).await.unwrap();
    let mut nils = new_member("Nils", "Dahl", NILS);
    nils.active_status = true;
    let nils = repo.create_member(&nils).await.unwrap();
    let anne = repo
        .create_member(&new_member("Anne", "Berg", "anne@orbitntnu.com"))
        .await
        .unwrap();

    let mut seat = CreateTeamHistoryRequest::new(bea.member_id, board.team_id, Privilege::Board);
    seat.c_position = Some("Treasurer".to_string());
    repo.create_team_history(&seat).await.unwrap();
    repo.create_team_history(&CreateTeamHistoryRequest::new(
        mona.member_id,
        software.team_id,
        Privilege::Leader,
    ))
    .await
    .unwrap();
    repo.create_team_history(&CreateTeamHistoryRequest::new(
        nils.member_id,
        software.team_id,
        Privilege::Member,
    ))
    .await
    .unwrap();

    Seed {
        board: board.team_id,
        software: software.team_id,
        bea: bea.member_id,
        mona: mona.member_id,
        nils: nils.member_id,
        anne: anne.member_id,
    }
}

/// Build the application state over a fresh database in `temp_dir`.
async fn test_state(temp_dir: &TempDir, psk: Option<String>) -> (AppState, Seed) {
    let db_path = temp_dir.path().join("test.sqlite");
    let index_path = temp_dir.path().join("index");

    let pool = init_database(&db_path).await.expect("Failed to init DB");
    let repo = Arc::new(Repository::new(pool));
    let seed = seed(&repo).await;

    let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));
    let directory = repo.get_directory().await.unwrap();
    search
        .rebuild(
            &directory.members,
            &directory.teams,
            &directory.team_histories,
        )
        .await
        .unwrap();

    let config = Config {
        api_psk: psk,
        db_path,
        index_path,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        board_team_id: seed.board,
    };

    (AppState::new(repo, search, config), seed)
}

async fn serve(state: AppState) -> SocketAddr {
    let app = create_router(state);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Wait for server to start
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    addr
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let psk = "test-api-key".to_string();
        let (state, seed) = test_state(&temp_dir, Some(psk.clone())).await;
        let addr = serve(state).await;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-api-key", psk.parse().unwrap());

        TestFixture {
            client: Client::builder().default_headers(headers).build().unwrap(),
            base_url: format!("http://{}", addr),
            seed,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_as(&self, path: &str, mail: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .header(MEMBER_EMAIL_HEADER, mail)
    }

    fn post_as(&self, path: &str, mail: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header(MEMBER_EMAIL_HEADER, mail)
    }

    async fn roster(&self, team_id: i64, mail: &str) -> Value {
        let resp = self
            .get_as(&format!("/api/teams/{}/roster", team_id), mail)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn member(&self, member_id: i64) -> Value {
        let resp = self
            .client
            .get(self.url(&format!("/api/members/{}", member_id)))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }
}

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|m| m["memberID"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let temp_dir = TempDir::new().unwrap();
    let (state, _) = test_state(&temp_dir, Some("secret-key".to_string())).await;
    let addr = serve(state).await;

    // Request without API key
    let resp = Client::new()
        .get(format!("http://{}/api/directory", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let temp_dir = TempDir::new().unwrap();
    let (state, _) = test_state(&temp_dir, Some("correct-key".to_string())).await;
    let addr = serve(state).await;

    let resp = Client::new()
        .get(format!("http://{}/api/directory", addr))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = Client::new()
        .get(format!("http://{}/api/directory", addr))
        .bearer_auth("correct-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_router_without_psk() {
    let temp_dir = TempDir::new().unwrap();
    let (state, _) = test_state(&temp_dir, None).await;

    let resp = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/directory/revision")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_directory_snapshot() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/directory"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["data"]["schemaVersion"].is_number());
    assert_eq!(body["data"]["members"].as_array().unwrap().len(), 4);
    assert_eq!(body["data"]["teams"].as_array().unwrap().len(), 2);

    let histories = body["data"]["teamHistories"].as_array().unwrap();
    assert_eq!(histories.len(), 3);
    assert_eq!(histories[0]["priviledges"], "BOARD");
    assert_eq!(histories[0]["cPosition"], "Treasurer");
    assert_eq!(body["revisionId"], body["data"]["revisionId"]);

    let resp = fixture
        .client
        .get(fixture.url("/api/directory/revision"))
        .send()
        .await
        .unwrap();
    let revision: Value = resp.json().await.unwrap();
    assert_eq!(revision["data"]["revisionId"], body["revisionId"]);
}

#[tokio::test]
async fn test_member_crud() {
    let fixture = TestFixture::new().await;

    // Create member
    let create_resp = fixture
        .client
        .post(fixture.url("/api/members"))
        .json(&json!({
            "firstName": "Test",
            "lastName": "User",
            "orbitMail": "test.user@orbitntnu.com",
            "fieldOfStudy": "MTTK"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(create_resp.status(), 200);
    let create_body: Value = create_resp.json().await.unwrap();
    assert_eq!(create_body["success"], true);
    let member_id = create_body["data"]["memberID"].as_i64().unwrap();
    assert_eq!(create_body["data"]["activeStatus"], false);
    let revision_after_create = create_body["revisionId"].as_i64().unwrap();

    // Update member
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/members/{}", member_id)))
        .json(&json!({
            "firstName": "Updated",
            "slackID": "U42",
            "expectedVersion": 1
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["firstName"], "Updated");
    assert_eq!(update_body["data"]["slackID"], "U42");
    assert_eq!(update_body["data"]["version"], 2);
    assert!(update_body["revisionId"].as_i64().unwrap() > revision_after_create);

    // Delete member
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/members/{}", member_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 200);

    let get_deleted_resp = fixture
        .client
        .get(fixture.url(&format!("/api/members/{}", member_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_deleted_resp.status(), 404);
    let body: Value = get_deleted_resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_member_with_history_cannot_be_deleted() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/members/{}", fixture.seed.nils)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_optimistic_concurrency_conflict() {
    let fixture = TestFixture::new().await;

    let conflict_resp = fixture
        .client
        .put(fixture.url(&format!("/api/members/{}", fixture.seed.anne)))
        .json(&json!({
            "firstName": "Should Fail",
            "expectedVersion": 999
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(conflict_resp.status(), 409);
    let conflict_body: Value = conflict_resp.json().await.unwrap();
    assert_eq!(conflict_body["success"], false);
    assert_eq!(conflict_body["error"]["code"], "VERSION_MISMATCH");
    assert_eq!(conflict_body["error"]["details"]["currentVersion"], 1);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/members"))
        .json(&json!({
            "firstName": "",
            "lastName": "Nobody",
            "orbitMail": "nobody@orbitntnu.com"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let resp = fixture
        .client
        .post(fixture.url("/api/teams"))
        .json(&json!({ "teamName": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_member_directory_listing() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/members/directory"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    let active = &body["data"]["active"];
    assert_eq!(
        ids(active),
        vec![fixture.seed.bea, fixture.seed.mona, fixture.seed.nils]
    );
    assert_eq!(active[0]["currentTeam"], "Board");
    assert_eq!(active[0]["role"], "Treasurer");
    assert_eq!(active[1]["currentTeam"], "Software");
    assert_eq!(active[1]["role"], "Leader");
    assert_eq!(ids(&body["data"]["inactive"]), vec![fixture.seed.anne]);
    assert_eq!(body["data"]["inactive"][0]["currentTeam"], "N/A");
}

#[tokio::test]
async fn test_roster_view() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;

    let resp = fixture
        .get_as(&format!("/api/teams/{}/roster?q=ANN", seed.software), MONA)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let view = &body["data"];

    assert_eq!(view["team"]["teamName"], "Software");
    assert_eq!(view["leader"]["memberID"], seed.mona);
    assert_eq!(ids(&view["members"]), vec![seed.nils]);
    assert_eq!(view["canEdit"], true);
    assert_eq!(ids(&view["eligible"]), vec![seed.anne]);
    assert!(view["issues"].as_array().unwrap().is_empty());

    // Viewing without edit rights omits the eligible list
    let view = fixture.roster(seed.software, NILS).await;
    assert_eq!(view["canEdit"], false);
    assert!(view.get("eligible").is_none());

    let resp = fixture
        .client
        .get(fixture.url("/api/teams/999/roster"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_my_team() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get_as("/api/teams/mine", NILS).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["teamID"], fixture.seed.software);

    let resp = fixture
        .client
        .get(fixture.url("/api/teams/mine"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .get_as("/api/teams/mine", "anne@orbitntnu.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_add_then_remove_member() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;

    let resp = fixture
        .post_as(&format!("/api/teams/{}/members", seed.software), MONA)
        .json(&json!({ "memberID": seed.anne }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["operation"], "add member");
    assert_eq!(body["data"]["steps"][0]["kind"], "OPENED");
    assert_eq!(body["data"]["steps"][0]["history"]["priviledges"], "MEMBER");
    assert_eq!(body["data"]["steps"][1]["kind"], "ACTIVE_STATUS");
    assert_eq!(fixture.member(seed.anne).await["activeStatus"], true);

    let view = fixture.roster(seed.software, MONA).await;
    assert_eq!(ids(&view["members"]), vec![seed.nils, seed.anne]);

    // Adding again conflicts
    let resp = fixture
        .post_as(&format!("/api/teams/{}/members", seed.software), MONA)
        .json(&json!({ "memberID": seed.anne }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = fixture
        .client
        .delete(fixture.url(&format!(
            "/api/teams/{}/members/{}",
            seed.software, seed.anne
        )))
        .header(MEMBER_EMAIL_HEADER, MONA)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(fixture.member(seed.anne).await["activeStatus"], false);

    let view = fixture.roster(seed.software, MONA).await;
    assert_eq!(ids(&view["members"]), vec![seed.nils]);
}

#[tokio::test]
async fn test_remove_member_keeps_history() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;

    let resp = fixture
        .client
        .delete(fixture.url(&format!(
            "/api/teams/{}/members/{}",
            seed.software, seed.nils
        )))
        .header(MEMBER_EMAIL_HEADER, BEA)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(fixture.member(seed.nils).await["activeStatus"], false);

    let resp = fixture
        .client
        .get(fixture.url("/api/team-histories"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let nils_records: Vec<&Value> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|h| h["memberID"] == seed.nils)
        .collect();
    assert_eq!(nils_records.len(), 1);
    assert!(nils_records[0]["endSem"].is_string());
    assert!(nils_records[0]["endYear"].is_number());
}

#[tokio::test]
async fn test_remove_leader_reports_missing_leader() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;

    let resp = fixture
        .client
        .delete(fixture.url(&format!(
            "/api/teams/{}/members/{}",
            seed.software, seed.mona
        )))
        .header(MEMBER_EMAIL_HEADER, BEA)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(fixture.member(seed.mona).await["activeStatus"], false);

    let view = fixture.roster(seed.software, BEA).await;
    assert!(view["leader"].is_null());
    assert_eq!(ids(&view["members"]), vec![seed.nils]);
    assert_eq!(view["issues"][0]["kind"], "MISSING_LEADER");
}

#[tokio::test]
async fn test_transfer_leadership() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;
    let path = format!("/api/teams/{}/leader", seed.software);

    let resp = fixture
        .post_as(&path, MONA)
        .json(&json!({ "memberID": seed.nils }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let kinds: Vec<&str> = body["data"]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["CLOSED", "CLOSED", "OPENED", "OPENED"]);

    let view = fixture.roster(seed.software, NILS).await;
    assert_eq!(view["leader"]["memberID"], seed.nils);
    assert_eq!(ids(&view["members"]), vec![seed.mona]);
    assert_eq!(view["canEdit"], true);

    // Mona is no longer leader and may not transfer back
    let resp = fixture
        .post_as(&path, MONA)
        .json(&json!({ "memberID": seed.mona }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Transferring to someone off the roster
    let resp = fixture
        .post_as(&path, NILS)
        .json(&json!({ "memberID": seed.anne }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_roster_mutation_requires_identity() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/teams/{}/members", seed.software)))
        .json(&json!({ "memberID": seed.anne }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .post_as(&format!("/api/teams/{}/members", seed.software), NILS)
        .json(&json!({ "memberID": seed.anne }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(fixture.member(seed.anne).await["activeStatus"], false);
}

#[tokio::test]
async fn test_team_histories_board_only() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;
    let seat = json!({
        "memberID": seed.nils,
        "teamID": seed.board,
        "priviledges": "BOARD",
        "cPosition": "Head of IT"
    });

    let resp = fixture
        .post_as("/api/team-histories", MONA)
        .json(&seat)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = fixture
        .post_as("/api/team-histories", BEA)
        .json(&seat)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let history_id = body["data"]["teamHistoryID"].as_i64().unwrap();
    assert_eq!(body["data"]["cPosition"], "Head of IT");

    let terminate = format!("/api/team-histories/{}/terminate", history_id);
    let resp = fixture.post_as(&terminate, BEA).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["endSem"].is_string());

    let resp = fixture.post_as(&terminate, BEA).send().await.unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_profile_views() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;

    let resp = fixture.get_as("/api/profile/me", MONA).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let view = &body["data"];
    assert_eq!(view["isSelf"], true);
    assert_eq!(view["fullName"], "Mona Lie");
    assert!(!view["editable"].as_array().unwrap().is_empty());
    assert_eq!(view["teams"][0]["teamName"], "Software");
    assert_eq!(view["teams"][0]["current"], true);

    let known: Vec<&str> = view["known"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(known.contains(&"phoneNumber"));
    assert!(!known.contains(&"orbitMail"));

    // Someone else sees neither the phone number nor the edit form
    let resp = fixture
        .get_as(&format!("/api/profile/{}", seed.mona), NILS)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let view = &body["data"];
    assert_eq!(view["isSelf"], false);
    assert!(view.get("editable").is_none());
    let shown: Vec<&str> = view["known"]
        .as_array()
        .unwrap()
        .iter()
        .chain(view["unknown"].as_array().unwrap())
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(!shown.contains(&"phoneNumber"));

    let resp = fixture
        .client
        .get(fixture.url("/api/profile/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_update_own_profile() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.url("/api/profile/me"))
        .header(MEMBER_EMAIL_HEADER, NILS)
        .json(&json!({ "nationalities": "Norwegian", "yearOfStudy": 4, "expectedVersion": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["version"], 2);
    let nationalities = body["data"]["known"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["field"] == "nationalities")
        .cloned()
        .unwrap();
    assert_eq!(nationalities["value"], "Norwegian");

    // Fields outside the edit view are rejected
    let resp = fixture
        .client
        .put(fixture.url("/api/profile/me"))
        .header(MEMBER_EMAIL_HEADER, NILS)
        .json(&json!({ "activeStatus": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(
        fixture.member(fixture.seed.nils).await["activeStatus"],
        true
    );

    // The edit is searchable right away
    let resp = fixture
        .client
        .get(fixture.url("/api/search?q=norwegian"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["data"]["results"][0]["member"]["memberID"],
        fixture.seed.nils
    );
}

#[tokio::test]
async fn test_search_endpoint() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;

    let resp = fixture
        .client
        .get(fixture.url("/api/search?q=software"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let mut found: Vec<i64> = body["data"]["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["member"]["memberID"].as_i64().unwrap())
        .collect();
    found.sort_unstable();
    assert_eq!(found, vec![seed.mona, seed.nils]);
    assert_eq!(body["data"]["total"], 2);

    // Roster changes are reflected in the index
    fixture
        .post_as(&format!("/api/teams/{}/members", seed.software), MONA)
        .json(&json!({ "memberID": seed.anne }))
        .send()
        .await
        .unwrap();
    let resp = fixture
        .client
        .get(fixture.url("/api/search?q=software&limit=10"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 3);

    let resp = fixture
        .client
        .get(fixture.url("/api/search?q=anne"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let hit = &body["data"]["results"][0];
    assert_eq!(hit["member"]["memberID"], seed.anne);
    assert_eq!(hit["currentTeam"], "Software");
    assert_eq!(hit["role"], "Member");
}

#[tokio::test]
async fn test_revision_increments_on_writes() {
    let fixture = TestFixture::new().await;
    let seed = &fixture.seed;

    let initial_resp = fixture
        .client
        .get(fixture.url("/api/directory/revision"))
        .send()
        .await
        .unwrap();
    let initial_body: Value = initial_resp.json().await.unwrap();
    let initial_revision = initial_body["data"]["revisionId"].as_i64().unwrap();

    // Add: one open record plus the active flag
    let resp = fixture
        .post_as(&format!("/api/teams/{}/members", seed.software), MONA)
        .json(&json!({ "memberID": seed.anne }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial_revision + 2);

    // Transfer: four record writes
    let resp = fixture
        .post_as(&format!("/api/teams/{}/leader", seed.software), MONA)
        .json(&json!({ "memberID": seed.anne }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial_revision + 6);

    // Rejected mutations leave the revision alone
    let resp = fixture
        .post_as(&format!("/api/teams/{}/leader", seed.software), MONA)
        .json(&json!({ "memberID": seed.nils }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial_revision + 6);
}
