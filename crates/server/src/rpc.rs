//! Internal TCP RPC adapter.
//!
//! Wire format: one JSON object per line. Requests carry a named message
//! pattern plus a payload, `{"pattern": "service.findById", "data": {...}}`;
//! responses are `{"ok": <value>}` or `{"err": {"code", "message"}}`.
//! Callers are trusted internal services, so there is no per-caller
//! authorization here; handlers log and re-raise failures to the caller.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};
use uuid::Uuid;

use service::domain::{CreateServiceInput, SearchQuery, ServiceFilter, UpdateServiceInput};
use service::errors::ServiceError;
use service::manager::ServiceManager;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    pattern: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Error)]
enum RpcError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("bad payload: {0}")]
    BadPayload(String),
    #[error("unknown pattern: {0}")]
    UnknownPattern(String),
    #[error("serialization failed: {0}")]
    Serialize(String),
}

impl RpcError {
    fn code(&self) -> &'static str {
        match self {
            Self::Service(e) => e.code(),
            Self::BadPayload(_) => "BAD_REQUEST",
            Self::UnknownPattern(_) => "UNKNOWN_PATTERN",
            Self::Serialize(_) => "SERVICE_INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceIdPayload {
    service_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceIdsPayload {
    service_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct NamePayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FilterPayload {
    #[serde(default)]
    filter: ServiceFilter,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePayload {
    create_input: CreateServiceInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePayload {
    service_id: Uuid,
    #[serde(default)]
    update_data: UpdateServiceInput,
}

fn parse<T: DeserializeOwned>(data: Value) -> Result<T, RpcError> {
    let data = if data.is_null() { json!({}) } else { data };
    serde_json::from_value(data).map_err(|e| RpcError::BadPayload(e.to_string()))
}

fn to_ok<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Serialize(e.to_string()))
}

async fn route_pattern(
    manager: &ServiceManager,
    pattern: &str,
    data: Value,
) -> Result<Value, RpcError> {
    match pattern {
        "service.findById" => {
            let p: ServiceIdPayload = parse(data)?;
            to_ok(manager.get_by_id(p.service_id).await?)
        }
        "service.getDetailById" => {
            let p: ServiceIdPayload = parse(data)?;
            match manager.get_detail(p.service_id).await {
                Ok(detail) => to_ok(detail),
                Err(ServiceError::NotFound) => Ok(Value::Null),
                Err(e) => Err(e.into()),
            }
        }
        "service.findByName" => {
            let p: NamePayload = parse(data)?;
            to_ok(manager.find_by_name(&p.name).await?)
        }
        "service.findByIds" => {
            let p: ServiceIdsPayload = parse(data)?;
            to_ok(manager.find_by_ids(&p.service_ids).await?)
        }
        "service.findByFilter" => {
            let p: FilterPayload = parse(data)?;
            to_ok(manager.find_matching_all(&p.filter).await?)
        }
        "service.exists" => {
            let p: ServiceIdPayload = parse(data)?;
            to_ok(manager.exists(p.service_id).await?)
        }
        "service.findVisible" => {
            let filter = ServiceFilter { is_visible: Some(true), ..Default::default() };
            to_ok(manager.find_matching_all(&filter).await?)
        }
        "service.findVisibleByRole" => {
            let filter = ServiceFilter { is_visible_by_role: Some(true), ..Default::default() };
            to_ok(manager.find_matching_all(&filter).await?)
        }
        "service.search" => {
            let p: SearchPayload = parse(data)?;
            to_ok(manager.search(&p.query).await?)
        }
        "service.getStats" => to_ok(manager.get_stats().await?),
        "service.checkHealth" => {
            let p: ServiceIdPayload = parse(data)?;
            to_ok(manager.check_health(p.service_id).await?)
        }
        "service.create" => {
            let p: CreatePayload = parse(data)?;
            manager.create(&p.create_input).await?;
            Ok(json!({ "success": true }))
        }
        "service.update" => {
            let p: UpdatePayload = parse(data)?;
            manager.update(p.service_id, &p.update_data).await?;
            Ok(json!({ "success": true }))
        }
        "service.delete" => {
            let p: ServiceIdPayload = parse(data)?;
            manager.delete(p.service_id).await?;
            Ok(json!({ "success": true }))
        }
        other => Err(RpcError::UnknownPattern(other.to_string())),
    }
}

async fn dispatch(manager: &ServiceManager, request: RpcRequest) -> Value {
    debug!(pattern = %request.pattern, "rpc request");
    match route_pattern(manager, &request.pattern, request.data).await {
        Ok(value) => json!({ "ok": value }),
        Err(e) => {
            error!(pattern = %request.pattern, error = %e, "rpc handler failed");
            json!({ "err": { "code": e.code(), "message": e.to_string() } })
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    manager: Arc<ServiceManager>,
) -> anyhow::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch(&manager, request).await,
            Err(e) => {
                json!({ "err": { "code": "BAD_REQUEST", "message": format!("malformed request: {e}") } })
            }
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        write_half.write_all(out.as_bytes()).await?;
    }
    Ok(())
}

/// Accept loop; one task per connection, sequential requests per connection.
pub async fn serve(listener: TcpListener, manager: Arc<ServiceManager>) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "rpc listener started");
    loop {
        let (stream, peer) = listener.accept().await?;
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, manager).await {
                debug!(%peer, error = %e, "rpc connection closed with error");
            }
        });
    }
}
