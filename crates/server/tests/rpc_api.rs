use std::sync::Arc;

use migration::MigratorTrait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

use service::authz::mock::MockAuthzClient;
use service::authz::VisibleRole;
use service::health::mock::MockHealthProber;
use service::manager::ServiceManager;

fn skip() -> bool {
    std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err()
}

struct RpcApp {
    addr: String,
    authz: Arc<MockAuthzClient>,
}

async fn start_rpc() -> anyhow::Result<RpcApp> {
    let db = models::db::connect().await?;
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("migrations notice: {}", e);
    }

    let authz = Arc::new(MockAuthzClient::default());
    let prober = Arc::new(MockHealthProber::new(true));
    let manager = Arc::new(ServiceManager::new(db, authz.clone(), prober));

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?.to_string();

    tokio::spawn(async move {
        if let Err(e) = server::rpc::serve(listener, manager).await {
            eprintln!("rpc server error: {}", e);
        }
    });

    Ok(RpcApp { addr, authz })
}

async fn send_line(stream: &mut TcpStream, line: &str) -> Value {
    stream.write_all(line.as_bytes()).await.expect("write request");
    stream.write_all(b"\n").await.expect("write newline");
    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    reader.read_line(&mut response).await.expect("read response");
    serde_json::from_str(response.trim_end()).expect("parse response")
}

async fn rpc_call(addr: &str, pattern: &str, data: Value) -> Value {
    let mut stream = TcpStream::connect(addr).await.expect("connect rpc");
    let request = json!({ "pattern": pattern, "data": data }).to_string();
    send_line(&mut stream, &request).await
}

#[tokio::test]
async fn find_by_id_answers_null_for_unknown() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_rpc().await?;
    let res = rpc_call(&app.addr, "service.findById", json!({ "serviceId": Uuid::new_v4() })).await;
    assert_eq!(res["ok"], Value::Null);

    let res =
        rpc_call(&app.addr, "service.getDetailById", json!({ "serviceId": Uuid::new_v4() })).await;
    assert_eq!(res["ok"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn crud_lifecycle_over_rpc() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_rpc().await?;
    let name = format!("rpc_crud_{}", Uuid::new_v4());

    let res = rpc_call(
        &app.addr,
        "service.create",
        json!({ "createInput": { "name": name, "baseUrl": "https://rpc.example.com" } }),
    )
    .await;
    assert_eq!(res["ok"]["success"], true);

    // Duplicate create surfaces the domain error code
    let res =
        rpc_call(&app.addr, "service.create", json!({ "createInput": { "name": name } })).await;
    assert_eq!(res["err"]["code"], "SERVICE_ALREADY_EXISTS");

    let found = rpc_call(&app.addr, "service.findByName", json!({ "name": name })).await;
    assert_eq!(found["ok"]["name"], name.as_str());
    let id: Uuid = found["ok"]["id"].as_str().and_then(|s| s.parse().ok()).expect("id");

    let res = rpc_call(&app.addr, "service.exists", json!({ "serviceId": id })).await;
    assert_eq!(res["ok"], true);

    let res = rpc_call(
        &app.addr,
        "service.update",
        json!({ "serviceId": id, "updateData": { "description": "rpc managed" } }),
    )
    .await;
    assert_eq!(res["ok"]["success"], true);

    let found = rpc_call(&app.addr, "service.findById", json!({ "serviceId": id })).await;
    assert_eq!(found["ok"]["description"], "rpc managed");

    let res = rpc_call(&app.addr, "service.checkHealth", json!({ "serviceId": id })).await;
    assert_eq!(res["ok"]["status"], "healthy");

    let res = rpc_call(&app.addr, "service.delete", json!({ "serviceId": id })).await;
    assert_eq!(res["ok"]["success"], true);

    let res = rpc_call(&app.addr, "service.findById", json!({ "serviceId": id })).await;
    assert_eq!(res["ok"], Value::Null);

    // Second delete reports the not-found outcome
    let res = rpc_call(&app.addr, "service.delete", json!({ "serviceId": id })).await;
    assert_eq!(res["err"]["code"], "SERVICE_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn search_and_filters_over_rpc() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_rpc().await?;
    let name = format!("rpc_search_{}", Uuid::new_v4());

    let res = rpc_call(
        &app.addr,
        "service.create",
        json!({ "createInput": { "name": name, "isVisible": true } }),
    )
    .await;
    assert_eq!(res["ok"]["success"], true);

    let found = rpc_call(&app.addr, "service.findByName", json!({ "name": name })).await;
    let id: Uuid = found["ok"]["id"].as_str().and_then(|s| s.parse().ok()).expect("id");
    app.authz.set_roles(
        id,
        vec![
            VisibleRole { id: "r1".into(), name: "admin".into() },
            VisibleRole { id: "r2".into(), name: "viewer".into() },
        ],
    );

    let res =
        rpc_call(&app.addr, "service.search", json!({ "query": { "name": name } })).await;
    assert_eq!(res["ok"]["pageInfo"]["totalItems"], 1);
    assert_eq!(res["ok"]["items"][0]["visibleRoleCount"], 2);

    let res = rpc_call(
        &app.addr,
        "service.findByFilter",
        json!({ "filter": { "name": name, "isVisible": true } }),
    )
    .await;
    assert_eq!(res["ok"].as_array().map(|a| a.len()), Some(1));

    let res = rpc_call(&app.addr, "service.findVisible", Value::Null).await;
    assert!(res["ok"].as_array().is_some());

    let res = rpc_call(&app.addr, "service.getStats", Value::Null).await;
    assert!(res["ok"]["totalServices"].as_u64().unwrap_or(0) >= 1);
    Ok(())
}

#[tokio::test]
async fn protocol_errors_are_reported() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_rpc().await?;

    let res = rpc_call(&app.addr, "service.doesNotExist", json!({})).await;
    assert_eq!(res["err"]["code"], "UNKNOWN_PATTERN");

    let mut stream = TcpStream::connect(&app.addr).await?;
    let res = send_line(&mut stream, "this is not json").await;
    assert_eq!(res["err"]["code"], "BAD_REQUEST");

    // Payload that fails to deserialize
    let res = rpc_call(&app.addr, "service.findById", json!({ "serviceId": "not-a-uuid" })).await;
    assert_eq!(res["err"]["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn connection_pipelines_sequential_requests() -> anyhow::Result<()> {
    if skip() {
        return Ok(());
    }
    let app = start_rpc().await?;

    let mut stream = TcpStream::connect(&app.addr).await?;
    let first = json!({ "pattern": "service.exists", "data": { "serviceId": Uuid::new_v4() } });
    let second = json!({ "pattern": "service.getStats" });

    stream.write_all(first.to_string().as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.write_all(second.to_string().as_bytes()).await?;
    stream.write_all(b"\n").await?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let first_res: Value = serde_json::from_str(line.trim_end())?;
    assert_eq!(first_res["ok"], false);

    line.clear();
    reader.read_line(&mut line).await?;
    let second_res: Value = serde_json::from_str(line.trim_end())?;
    assert!(second_res["ok"]["totalServices"].is_u64());
    Ok(())
}
