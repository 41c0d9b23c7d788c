use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use migration::MigratorTrait;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use server::auth::{AppState, Claims, Role};
use server::routes;
use service::authz::mock::MockAuthzClient;
use service::authz::VisibleRole;
use service::health::mock::MockHealthProber;
use service::manager::ServiceManager;

const JWT_SECRET: &str = "test-secret";

fn skip() -> bool {
    std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err()
}

struct TestApp {
    base_url: String,
    authz: Arc<MockAuthzClient>,
}

async fn start_server() -> anyhow::Result<TestApp> {
    let db = models::db::connect().await?;
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("migrations notice: {}", e);
    }

    let authz = Arc::new(MockAuthzClient::default());
    let prober = Arc::new(MockHealthProber::new(true));
    let manager = Arc::new(ServiceManager::new(db, authz.clone(), prober));

    let state = AppState { manager, jwt_secret: JWT_SECRET.into() };
    let app: Router = routes::build_router(CorsLayer::very_permissive(), state);

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });

    Ok(TestApp { base_url, authz })
}

fn token(role: Role) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    let claims = Claims { sub: "tester".into(), role, exp };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes()))
        .expect("encode token")
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

async fn created_id(app: &TestApp, name: &str) -> Uuid {
    let res = client()
        .get(format!("{}/services", app.base_url))
        .query(&[("name", name)])
        .bearer_auth(token(Role::Admin))
        .send()
        .await
        .expect("search");
    let body = res.json::<serde_json::Value>().await.expect("search body");
    body["items"][0]["id"].as_str().and_then(|s| s.parse().ok()).expect("created id")
}

#[tokio::test]
async fn public_health_endpoint() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_server().await?;
    let res = client().get(format!("{}/health", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn read_requires_admin_role() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_server().await?;
    let c = client();

    // No token at all
    let res = c.get(format!("{}/services", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::UNAUTHORIZED);

    // Authenticated but below the read tier
    let res = c
        .get(format!("{}/services", app.base_url))
        .bearer_auth(token(Role::User))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::FORBIDDEN);

    // Admin may read
    let res = c
        .get(format!("{}/services", app.base_url))
        .bearer_auth(token(Role::Admin))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_server().await?;

    use jsonwebtoken::{encode, EncodingKey, Header};
    let exp = (chrono::Utc::now() - chrono::Duration::minutes(5)).timestamp() as usize;
    let claims = Claims { sub: "tester".into(), role: Role::SuperAdmin, exp };
    let stale =
        encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes()))?;

    let res = client()
        .get(format!("{}/services", app.base_url))
        .bearer_auth(stale)
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn mutations_require_super_admin() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_server().await?;
    let c = client();
    let name = format!("http_create_{}", Uuid::new_v4());

    // Admin may read but not mutate
    let res = c
        .post(format!("{}/services", app.base_url))
        .bearer_auth(token(Role::Admin))
        .json(&json!({ "name": name }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::FORBIDDEN);

    let res = c
        .post(format!("{}/services", app.base_url))
        .bearer_auth(token(Role::SuperAdmin))
        .json(&json!({ "name": name, "displayName": "Test Portal" }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);

    // Duplicate active name conflicts
    let res = c
        .post(format!("{}/services", app.base_url))
        .bearer_auth(token(Role::SuperAdmin))
        .json(&json!({ "name": name }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CONFLICT);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"]["code"], "SERVICE_ALREADY_EXISTS");
    Ok(())
}

#[tokio::test]
async fn detail_update_and_delete_flow() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_server().await?;
    let c = client();
    let name = format!("http_flow_{}", Uuid::new_v4());

    let res = c
        .post(format!("{}/services", app.base_url))
        .bearer_auth(token(Role::SuperAdmin))
        .json(&json!({ "name": name, "baseUrl": "https://flow.example.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let id = created_id(&app, &name).await;

    // Detail is enriched from the authorization mock
    app.authz.set_roles(id, vec![VisibleRole { id: "r1".into(), name: "admin".into() }]);
    let res = c
        .get(format!("{}/services/{}", app.base_url, id))
        .bearer_auth(token(Role::Admin))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["name"], name.as_str());
    assert_eq!(body["visibleRoles"].as_array().map(|a| a.len()), Some(1));

    // Health check reflects the prober
    let res = c
        .get(format!("{}/services/{}/health", app.base_url, id))
        .bearer_auth(token(Role::Admin))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "healthy");

    // Partial update
    let res = c
        .patch(format!("{}/services/{}", app.base_url, id))
        .bearer_auth(token(Role::SuperAdmin))
        .json(&json!({ "description": "flow test" }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NO_CONTENT);

    // Delete is refused while role assignments reference the service
    let res = c
        .delete(format!("{}/services/{}", app.base_url, id))
        .bearer_auth(token(Role::SuperAdmin))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CONFLICT);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"]["code"], "SERVICE_DELETE_BLOCKED");

    app.authz.clear_roles(id);
    let res = c
        .delete(format!("{}/services/{}", app.base_url, id))
        .bearer_auth(token(Role::SuperAdmin))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NO_CONTENT);

    let res = c
        .get(format!("{}/services/{}", app.base_url, id))
        .bearer_auth(token(Role::Admin))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn unknown_id_maps_to_not_found() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_server().await?;
    let res = client()
        .get(format!("{}/services/{}", app.base_url, Uuid::new_v4()))
        .bearer_auth(token(Role::Admin))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"]["code"], "SERVICE_NOT_FOUND");
    Ok(())
}
