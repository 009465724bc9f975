use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use storegate_api::ServerConfig;

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = storegate_api::app::build_app(&ServerConfig::with_secret(SECRET))
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: &str, role: Option<&str>) -> String {
    let now = Utc::now();
    let mut claims = json!({
        "sub": sub,
        "email": format!("{sub}@shop.test"),
        "iat": now.timestamp(),
        "exp": (now + ChronoDuration::minutes(10)).timestamp(),
    });
    if let Some(role) = role {
        claims["app_metadata"] = json!({ "role": role });
    }

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = client().get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn whoami_requires_a_valid_session() {
    let srv = TestServer::spawn().await;
    let client = client();

    let res = client.get(srv.url("/api/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "NOT_AUTHENTICATED");

    let res = client
        .get(srv.url("/api/whoami"))
        .bearer_auth(mint_jwt("a1", Some("admin")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], "a1");
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let srv = TestServer::spawn().await;
    let res = client()
        .get(srv.url("/api/whoami"))
        .header("cookie", format!("sb-access-token={}", mint_jwt("u1", None)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role"], "customer");
}

#[tokio::test]
async fn product_listing_validates_query() {
    let srv = TestServer::spawn().await;
    let client = client();

    let res = client.get(srv.url("/api/products?page=abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["issues"][0]["path"], "page");

    let res = client.get(srv.url("/api/products?limit=2")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["page"], 1);
}

#[tokio::test]
async fn product_creation_needs_permission() {
    let srv = TestServer::spawn().await;
    let client = client();
    let payload = json!({ "name": "Milk Jug", "price": 18.5 });

    let res = client
        .post(srv.url("/api/products"))
        .bearer_auth(mint_jwt("u1", Some("customer")))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "INSUFFICIENT_PERMISSIONS");
    assert_eq!(body["details"]["missing"], json!(["products:create"]));

    let res = client
        .post(srv.url("/api/products"))
        .bearer_auth(mint_jwt("a1", Some("admin")))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], "Milk Jug");
}

#[tokio::test]
async fn malformed_body_and_wrong_method() {
    let srv = TestServer::spawn().await;
    let client = client();

    let res = client
        .post(srv.url("/api/products"))
        .bearer_auth(mint_jwt("a1", Some("admin")))
        .header("content-type", "application/json")
        .body("{\"name\":")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_REQUEST_BODY");

    let res = client.delete(srv.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()["allow"], "GET, POST");
}

#[tokio::test]
async fn order_status_requires_moderator() {
    let srv = TestServer::spawn().await;
    let client = client();
    let payload = json!({
        "orderId": "0190f3a2-6d7e-7c4b-9a55-2f1f6f0c1d11",
        "status": "shipped",
    });

    let res = client
        .patch(srv.url("/api/orders/status"))
        .bearer_auth(mint_jwt("u1", None))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "INSUFFICIENT_ROLE");

    let res = client
        .patch(srv.url("/api/orders/status"))
        .bearer_auth(mint_jwt("m1", Some("moderator")))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["updatedBy"], "m1");
    assert_eq!(body["status"], "shipped");
}

#[tokio::test]
async fn profile_edits_are_self_or_manager() {
    let srv = TestServer::spawn().await;
    let client = client();
    let token = mint_jwt("u1", None);

    let res = client
        .put(srv.url("/api/profile"))
        .bearer_auth(&token)
        .json(&json!({ "userId": "u1", "firstName": "Ada" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The resolver now sees the stored profile.
    let res = client
        .get(srv.url("/api/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["displayName"], "Ada");

    let res = client
        .put(srv.url("/api/profile"))
        .bearer_auth(&token)
        .json(&json!({ "userId": "u2", "firstName": "Mallory" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pages_redirect_when_denied() {
    let srv = TestServer::spawn().await;
    let client = client();

    let res = client.get(srv.url("/account")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "/login");

    let res = client
        .get(srv.url("/admin"))
        .bearer_auth(mint_jwt("m1", Some("moderator")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "/unauthorized");

    let res = client
        .get(srv.url("/admin"))
        .bearer_auth(mint_jwt("a1", Some("admin")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn rbac_audit_is_admin_only() {
    let srv = TestServer::spawn().await;
    let client = client();

    let res = client
        .get(srv.url("/api/admin/rbac/roles"))
        .bearer_auth(mint_jwt("m1", Some("moderator")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/api/admin/rbac/explain?role=customer&permission=reviews:moderate"))
        .bearer_auth(mint_jwt("a1", Some("admin")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["explanation"]["granted"], false);
    assert_eq!(
        body["explanation"]["denial_reason"]["granting_roles"],
        json!(["moderator", "admin"])
    );
}

#[tokio::test]
async fn expired_tokens_are_anonymous() {
    let srv = TestServer::spawn().await;
    let now = Utc::now();
    let claims = json!({
        "sub": "a1",
        "iat": (now - ChronoDuration::hours(2)).timestamp(),
        "exp": (now - ChronoDuration::hours(1)).timestamp(),
        "app_metadata": { "role": "admin" },
    });
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let res = client()
        .get(srv.url("/api/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
