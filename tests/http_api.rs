use std::net::SocketAddr;

use leaderboards::{
    Leaderboard,
    routes,
    state::{AppState, LeaderboardRegistry},
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn spawn_server(base_path: &str) -> SocketAddr {
    let registry = LeaderboardRegistry::new();

    let kills = Leaderboard::builder("kills")
        .score_field("kills")
        .identity_field("player")
        .build();
    for (player, count, id) in [("Steve", 150, 1), ("Alex", 300, 2), ("Herobrine", 150, 3)] {
        kills
            .submit_with(|e| e.field("player", player).field("kills", count).field("id", id))
            .await
            .unwrap();
    }
    registry.register(kills);
    registry.register(Leaderboard::builder("empty").build());

    let app = routes::router(AppState::new(registry), base_path);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn get(addr: SocketAddr, path: &str) -> (StatusCode, Value) {
    let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn top_orders_and_limits() {
    let addr = spawn_server("").await;

    let (status, body) = get(addr, "/kills/top").await;
    assert_eq!(status, StatusCode::OK);
    let players: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["player"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(players, vec!["Alex", "Steve", "Herobrine"]);

    let (_, body) = get(addr, "/kills/top?limit=1").await;
    assert_eq!(body, json!([{ "player": "Alex", "kills": 300, "id": 2 }]));

    for bad in ["abc", "0", "-1"] {
        let (status, body) = get(addr, &format!("/kills/top?limit={bad}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
    }
}

#[tokio::test]
async fn entry_and_rank_lookups() {
    let addr = spawn_server("").await;

    let (status, body) = get(addr, "/kills/entry?player=Steve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kills"], json!(150));

    let (status, body) = get(addr, "/kills/entry?id=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["player"], json!("Herobrine"));

    let (status, body) = get(addr, "/kills/rank?player=Herobrine&ignored=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "rank": 3 }));

    let (status, body) = get(addr, "/kills/rank").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    for valueless in ["/kills/rank?player", "/kills/entry?player=", "/kills/entry?=Steve"] {
        let (status, body) = get(addr, valueless).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{valueless}");
        assert!(body["error"].as_str().unwrap().contains("missing query parameter"));
    }

    let (status, body) = get(addr, "/kills/entry?player&id=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["player"], json!("Alex"));

    let (status, _) = get(addr, "/kills/entry?player=Notch").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn size_listing_and_unknown_boards() {
    let addr = spawn_server("").await;

    let (_, body) = get(addr, "/kills/size").await;
    assert_eq!(body, json!({ "size": 3 }));
    let (_, body) = get(addr, "/empty/size").await;
    assert_eq!(body, json!({ "size": 0 }));

    let (status, body) = get(addr, "/deaths/top").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("deaths"));

    let (status, body) = get(addr, "/leaderboards").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "name": "empty", "score_field": "score", "identity_field": null },
            { "name": "kills", "score_field": "kills", "identity_field": "player" }
        ])
    );
}

#[tokio::test]
async fn routes_live_under_base_path() {
    let addr = spawn_server("/api/").await;

    let (status, _) = get(addr, "/api/kills/size").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(addr, "/kills/size").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(addr, "/healthcheck").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "leaderboards": 2 }));
}

#[tokio::test]
async fn only_get_is_allowed() {
    let addr = spawn_server("").await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/kills/top"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
