/// End-to-end scenarios against a real core server, and through a gateway
/// in front of it. Both listen on ephemeral local ports.
use axum::Router;
use chrono::{Duration, NaiveDateTime};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use shareit::db;
use shareit::gateway::{self, GatewayClient};
use shareit::routes;
use shareit::state::AppState;

type TestResult = Result<(), Box<dyn std::error::Error>>;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_core() -> (String, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::create_pool(&temp_dir.path().join("shareit.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    let url = spawn(routes::router(AppState::new(pool))).await;
    (url, temp_dir)
}

struct Api {
    client: Client,
    base: String,
}

impl Api {
    fn new(base: String) -> Self {
        Self {
            client: Client::new(),
            base,
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        user: Option<u64>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value), reqwest::Error> {
        let mut request = self.client.request(method, format!("{}{}", self.base, path));
        if let Some(id) = user {
            request = request.header("X-Sharer-User-Id", id.to_string());
        }
        if let Some(json) = body {
            request = request.json(&json);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let value = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok((status, value))
    }

    async fn user(&self, name: &str) -> Result<u64, Box<dyn std::error::Error>> {
        let (status, user) = self
            .call(
                Method::POST,
                "/users",
                None,
                Some(json!({"name": name, "email": format!("{}@example.com", name.to_lowercase())})),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{}", user);
        Ok(user["id"].as_u64().ok_or("user without id")?)
    }

    async fn item(&self, owner: u64, name: &str) -> Result<u64, Box<dyn std::error::Error>> {
        let (status, item) = self
            .call(
                Method::POST,
                "/items",
                Some(owner),
                Some(json!({"name": name, "description": format!("A {}", name), "available": true})),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{}", item);
        Ok(item["id"].as_u64().ok_or("item without id")?)
    }

    async fn book(
        &self,
        booker: u64,
        item: u64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(StatusCode, Value), reqwest::Error> {
        self.call(
            Method::POST,
            "/bookings",
            Some(booker),
            Some(json!({"itemId": item, "start": start, "end": end})),
        )
        .await
    }

    async fn decide(
        &self,
        owner: u64,
        booking: u64,
        approved: &str,
    ) -> Result<(StatusCode, Value), reqwest::Error> {
        self.call(
            Method::PATCH,
            &format!("/bookings/{}?approved={}", booking, approved),
            Some(owner),
            None,
        )
        .await
    }
}

fn now() -> NaiveDateTime {
    shareit::clock::now()
}

#[tokio::test]
async fn test_booking_is_approved_by_owner_and_visible_to_booker() -> TestResult {
    let (url, _temp) = spawn_core().await;
    let api = Api::new(url);
    let owner = api.user("Ann").await?;
    let booker = api.user("Ben").await?;
    let item = api.item(owner, "Drill").await?;

    let (status, booking) = api
        .book(booker, item, now() + Duration::hours(1), now() + Duration::hours(2))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["id"], 1);
    assert_eq!(booking["status"], "WAITING");

    let (status, approved) = api.decide(owner, 1, "true").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "APPROVED");

    let (status, read) = api.call(Method::GET, "/bookings/1", Some(booker), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read, approved);

    Ok(())
}

#[tokio::test]
async fn test_booking_ending_before_start_is_invalid() -> TestResult {
    let (url, _temp) = spawn_core().await;
    let api = Api::new(url);
    let owner = api.user("Ann").await?;
    let booker = api.user("Ben").await?;
    let item = api.item(owner, "Drill").await?;

    let (status, body) = api
        .book(booker, item, now() + Duration::hours(1), now() - Duration::hours(1))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    Ok(())
}

#[tokio::test]
async fn test_owner_cannot_book_own_item() -> TestResult {
    let (url, _temp) = spawn_core().await;
    let api = Api::new(url);
    let owner = api.user("Ann").await?;
    let item = api.item(owner, "Drill").await?;

    let (status, _) = api
        .book(owner, item, now() + Duration::hours(1), now() + Duration::hours(2))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_owner_current_listing_across_items() -> TestResult {
    let (url, _temp) = spawn_core().await;
    let api = Api::new(url);
    let owner = api.user("Ann").await?;
    let booker = api.user("Ben").await?;
    let x1 = api.item(owner, "Drill").await?;
    let x2 = api.item(owner, "Saw").await?;

    // (item, start offset h, end offset h, decision)
    let plan: [(u64, i64, i64, Option<&str>); 10] = [
        (x1, -50, -48, Some("true")),
        (x2, -30, -29, Some("false")),
        (x1, -3, 3, Some("true")),
        (x2, -2, 5, None),
        (x1, -1, 1, Some("false")),
        (x2, 4, 6, None),
        (x1, 10, 12, Some("true")),
        (x2, 20, 22, Some("false")),
        (x1, 30, 31, None),
        (x2, -10, -9, None),
    ];

    let base = now();
    let mut current = Vec::new();
    for (item, start, end, decision) in plan {
        let (status, booking) = api
            .book(booker, item, base + Duration::hours(start), base + Duration::hours(end))
            .await?;
        assert_eq!(status, StatusCode::OK, "{}", booking);
        let id = booking["id"].as_u64().ok_or("booking without id")?;
        if let Some(approved) = decision {
            let (status, _) = api.decide(owner, id, approved).await?;
            assert_eq!(status, StatusCode::OK);
        }
        if start <= 0 && end >= 0 {
            current.push((start, id));
        }
    }
    current.sort_by(|a, b| b.cmp(a));
    let expected: Vec<u64> = current.into_iter().map(|(_, id)| id).collect();

    let (status, listed) = api
        .call(
            Method::GET,
            "/bookings/owner?state=CURRENT&from=0&size=10",
            Some(owner),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = listed
        .as_array()
        .ok_or("listing is not an array")?
        .iter()
        .filter_map(|b| b["id"].as_u64())
        .collect();
    assert_eq!(ids, expected);

    let (status, all) = api
        .call(Method::GET, "/bookings?size=20", Some(booker), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().map(|a| a.len()), Some(10));

    Ok(())
}

#[tokio::test]
async fn test_comment_requires_finished_booking() -> TestResult {
    let (url, _temp) = spawn_core().await;
    let api = Api::new(url);
    let owner = api.user("Ann").await?;
    let booker = api.user("Ben").await?;
    let stranger = api.user("Cid").await?;
    let item = api.item(owner, "Drill").await?;

    let (_, booking) = api
        .book(booker, item, now() - Duration::days(2), now() - Duration::days(1))
        .await?;
    let id = booking["id"].as_u64().ok_or("booking without id")?;
    api.decide(owner, id, "true").await?;

    let path = format!("/items/{}/comment", item);
    let (status, comment) = api
        .call(Method::POST, &path, Some(booker), Some(json!({"text": "good"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["text"], "good");
    assert_eq!(comment["authorName"], "Ben");

    let (status, _) = api
        .call(Method::POST, &path, Some(stranger), Some(json!({"text": "good"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, view) = api
        .call(Method::GET, &format!("/items/{}", item), Some(owner), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["comments"][0]["text"], "good");
    assert_eq!(view["lastBooking"]["id"], id);

    Ok(())
}

#[tokio::test]
async fn test_unknown_state_is_reported_verbatim() -> TestResult {
    let (url, _temp) = spawn_core().await;
    let api = Api::new(url);
    let user = api.user("Ann").await?;

    let (status, body) = api
        .call(Method::GET, "/bookings?state=qwe", Some(user), None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Unknown state: qwe"}));

    Ok(())
}

#[tokio::test]
async fn test_gateway_forwards_valid_and_rejects_invalid() -> TestResult {
    let (core_url, _temp) = spawn_core().await;
    let gateway_url = spawn(gateway::router(GatewayClient::new(core_url.clone())?)).await;
    let api = Api::new(gateway_url);

    let (status, health) = api.call(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health, json!({"status": "ok"}));

    let owner = api.user("Ann").await?;
    let booker = api.user("Ben").await?;
    let item = api.item(owner, "Drill").await?;

    // Rejected by the gateway before reaching the core.
    let (status, _) = api
        .call(Method::POST, "/users", None, Some(json!({"name": "NoMail"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = api.call(Method::GET, "/items", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = api
        .call(Method::GET, "/bookings/owner?state=soon", Some(owner), None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Unknown state: soon"}));
    let (status, _) = api
        .call(Method::GET, "/requests/all?size=0", Some(owner), None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Core errors are relayed unchanged.
    let (status, _) = api
        .book(owner, item, now() + Duration::hours(1), now() + Duration::hours(2))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = api
        .call(
            Method::POST,
            "/users",
            None,
            Some(json!({"name": "Twin", "email": "ann@example.com"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    // And successes too.
    let (status, booking) = api
        .book(booker, item, now() + Duration::hours(1), now() + Duration::hours(2))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, approved) = api
        .decide(owner, booking["id"].as_u64().ok_or("booking without id")?, "TRUE")
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "APPROVED");

    // The item request flow goes through the gateway as well.
    let (status, request) = api
        .call(
            Method::POST,
            "/requests",
            Some(booker),
            Some(json!({"description": "Need a ladder"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["items"], json!([]));
    let (status, others) = api
        .call(Method::GET, "/requests/all", Some(owner), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(others[0]["description"], "Need a ladder");

    Ok(())
}
