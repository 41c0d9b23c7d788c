//! Remote-call boundary to the authorization service, which owns the
//! service<->visible-role assignments.
//!
//! Every operation is a remote call with its own timeout and returns a
//! `Result`; the manager decides what a failure degrades to. The client
//! itself never substitutes fallback values.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("authorization service timed out")]
    Timeout,
    #[error("authorization transport error: {0}")]
    Transport(String),
    #[error("authorization protocol error: {0}")]
    Protocol(String),
}

/// Role projection as the authorization domain ships it; this service never
/// persists roles locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleRole {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait AuthzClient: Send + Sync {
    /// Visible-role count per service id, one batch round trip.
    async fn count_visible_roles(
        &self,
        service_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, AuthzError>;

    async fn list_visible_roles(&self, service_id: Uuid) -> Result<Vec<VisibleRole>, AuthzError>;

    /// Whether any role assignment references the service; gates deletion.
    async fn has_any_visible_role(&self, service_id: Uuid) -> Result<bool, AuthzError>;
}

/// Client speaking the internal newline-delimited JSON message-pattern
/// protocol to the authorization service.
pub struct TcpAuthzClient {
    addr: String,
    timeout: Duration,
}

impl TcpAuthzClient {
    pub fn new(addr: impl Into<String>, timeout_ms: u64) -> Self {
        Self { addr: addr.into(), timeout: Duration::from_millis(timeout_ms) }
    }

    async fn call(
        &self,
        pattern: &str,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, AuthzError> {
        let exchange = async {
            let mut stream = TcpStream::connect(&self.addr)
                .await
                .map_err(|e| AuthzError::Transport(e.to_string()))?;

            let request = serde_json::to_string(&json!({ "pattern": pattern, "data": data }))
                .map_err(|e| AuthzError::Protocol(e.to_string()))?;
            stream
                .write_all(request.as_bytes())
                .await
                .map_err(|e| AuthzError::Transport(e.to_string()))?;
            stream
                .write_all(b"\n")
                .await
                .map_err(|e| AuthzError::Transport(e.to_string()))?;

            let mut line = String::new();
            let mut reader = BufReader::new(&mut stream);
            let read = reader
                .read_line(&mut line)
                .await
                .map_err(|e| AuthzError::Transport(e.to_string()))?;
            if read == 0 {
                return Err(AuthzError::Transport("connection closed before response".into()));
            }

            let response: serde_json::Value = serde_json::from_str(line.trim_end())
                .map_err(|e| AuthzError::Protocol(e.to_string()))?;
            if let Some(err) = response.get("err") {
                return Err(AuthzError::Protocol(err.to_string()));
            }
            response
                .get("ok")
                .cloned()
                .ok_or_else(|| AuthzError::Protocol("response missing ok payload".into()))
        };

        timeout(self.timeout, exchange).await.map_err(|_| AuthzError::Timeout)?
    }
}

#[async_trait]
impl AuthzClient for TcpAuthzClient {
    async fn count_visible_roles(
        &self,
        service_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, AuthzError> {
        let value = self
            .call("authz.countVisibleRoles", json!({ "serviceIds": service_ids }))
            .await?;
        serde_json::from_value(value).map_err(|e| AuthzError::Protocol(e.to_string()))
    }

    async fn list_visible_roles(&self, service_id: Uuid) -> Result<Vec<VisibleRole>, AuthzError> {
        let value = self
            .call("authz.listVisibleRoles", json!({ "serviceId": service_id }))
            .await?;
        serde_json::from_value(value).map_err(|e| AuthzError::Protocol(e.to_string()))
    }

    async fn has_any_visible_role(&self, service_id: Uuid) -> Result<bool, AuthzError> {
        let value = self
            .call("authz.hasAnyVisibleRole", json!({ "serviceId": service_id }))
            .await?;
        value
            .as_bool()
            .ok_or_else(|| AuthzError::Protocol("expected boolean payload".into()))
    }
}

/// In-memory client with programmable state and failures, for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthzClient {
        roles: Mutex<HashMap<Uuid, Vec<VisibleRole>>>,
        fail_counts: AtomicBool,
        fail_list: AtomicBool,
        fail_has_any: AtomicBool,
    }

    impl MockAuthzClient {
        pub fn set_roles(&self, service_id: Uuid, roles: Vec<VisibleRole>) {
            self.roles.lock().unwrap().insert(service_id, roles);
        }

        pub fn clear_roles(&self, service_id: Uuid) {
            self.roles.lock().unwrap().remove(&service_id);
        }

        pub fn fail_counts(&self, fail: bool) {
            self.fail_counts.store(fail, Ordering::SeqCst);
        }

        pub fn fail_list(&self, fail: bool) {
            self.fail_list.store(fail, Ordering::SeqCst);
        }

        pub fn fail_has_any(&self, fail: bool) {
            self.fail_has_any.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AuthzClient for MockAuthzClient {
        async fn count_visible_roles(
            &self,
            service_ids: &[Uuid],
        ) -> Result<HashMap<Uuid, u64>, AuthzError> {
            if self.fail_counts.load(Ordering::SeqCst) {
                return Err(AuthzError::Timeout);
            }
            let roles = self.roles.lock().unwrap();
            Ok(service_ids
                .iter()
                .map(|id| (*id, roles.get(id).map_or(0, |r| r.len() as u64)))
                .collect())
        }

        async fn list_visible_roles(
            &self,
            service_id: Uuid,
        ) -> Result<Vec<VisibleRole>, AuthzError> {
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(AuthzError::Timeout);
            }
            let roles = self.roles.lock().unwrap();
            Ok(roles.get(&service_id).cloned().unwrap_or_default())
        }

        async fn has_any_visible_role(&self, service_id: Uuid) -> Result<bool, AuthzError> {
            if self.fail_has_any.load(Ordering::SeqCst) {
                return Err(AuthzError::Transport("authorization service unreachable".into()));
            }
            let roles = self.roles.lock().unwrap();
            Ok(roles.get(&service_id).is_some_and(|r| !r.is_empty()))
        }
    }
}
