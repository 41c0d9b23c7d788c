//! Orchestration over the store, the authorization client and the health
//! prober.
//!
//! Enrichment is strictly best-effort: a failing authorization call degrades
//! the response (count 0, empty role list) and is logged, never surfaced.
//! The one deliberate exception is the delete guard, where a failed
//! existence check defaults to "no roles" and lets the deletion proceed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::pagination::Paginated;
use models::service;

use crate::authz::AuthzClient;
use crate::domain::{
    CatalogStats, CreateServiceInput, HealthStatus, SearchQuery, SearchResultItem, ServiceDetail,
    ServiceFilter, ServiceHealth, UpdateServiceInput,
};
use crate::errors::ServiceError;
use crate::health::HealthProber;
use crate::store;

/// Domain outcomes pass through; infrastructure failures are re-wrapped into
/// the operation's error kind so callers never see raw driver errors.
fn wrap_infra(err: ServiceError, op: fn(String) -> ServiceError) -> ServiceError {
    if err.is_domain() {
        err
    } else {
        op(err.to_string())
    }
}

pub struct ServiceManager {
    db: DatabaseConnection,
    authz: Arc<dyn AuthzClient>,
    prober: Arc<dyn HealthProber>,
}

impl ServiceManager {
    pub fn new(
        db: DatabaseConnection,
        authz: Arc<dyn AuthzClient>,
        prober: Arc<dyn HealthProber>,
    ) -> Self {
        Self { db, authz, prober }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<service::Model>, ServiceError> {
        store::find_by_id(&self.db, id)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Fetch))
    }

    pub async fn get_by_id_or_fail(&self, id: Uuid) -> Result<service::Model, ServiceError> {
        self.get_by_id(id).await?.ok_or(ServiceError::NotFound)
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.get_by_id(id).await?.is_some())
    }

    pub async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<service::Model>, ServiceError> {
        store::find_by_name(&self.db, name)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Fetch))
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<service::Model>, ServiceError> {
        store::find_by_ids(&self.db, ids)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Fetch))
    }

    pub async fn find_matching_all(
        &self,
        filter: &ServiceFilter,
    ) -> Result<Vec<service::Model>, ServiceError> {
        store::find_matching_all(&self.db, filter)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Fetch))
    }

    pub async fn find_matching_any(
        &self,
        filter: &ServiceFilter,
    ) -> Result<Vec<service::Model>, ServiceError> {
        store::find_matching_any(&self.db, filter)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Fetch))
    }

    /// Paginated search with per-item visible-role counts. The counts come
    /// from one batch call; when it fails every count falls back to 0 and
    /// the search still succeeds.
    pub async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<Paginated<SearchResultItem>, ServiceError> {
        let page = store::search(&self.db, query)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Search))?;

        let ids: Vec<Uuid> = page.items.iter().map(|m| m.id).collect();
        let counts: HashMap<Uuid, u64> = if ids.is_empty() {
            HashMap::new()
        } else {
            match self.authz.count_visible_roles(&ids).await {
                Ok(counts) => counts,
                Err(e) => {
                    warn!(error = %e, "visible-role counts unavailable, defaulting to 0");
                    HashMap::new()
                }
            }
        };

        Ok(page.map(|model| {
            let count = counts.get(&model.id).copied().unwrap_or(0);
            SearchResultItem::from_model(model, count)
        }))
    }

    /// Detail view. The role list is enrichment only; the core record is
    /// returned even when the authorization service is down.
    pub async fn get_detail(&self, id: Uuid) -> Result<ServiceDetail, ServiceError> {
        let model = store::find_by_id(&self.db, id)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Fetch))?
            .ok_or(ServiceError::NotFound)?;

        let visible_roles = match self.authz.list_visible_roles(id).await {
            Ok(roles) => roles,
            Err(e) => {
                warn!(service_id = %id, error = %e, "visible-role list unavailable, returning empty");
                Vec::new()
            }
        };

        Ok(ServiceDetail::from_model(model, visible_roles))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &CreateServiceInput) -> Result<(), ServiceError> {
        let existing = store::find_by_name(&self.db, &input.name)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Create))?;
        if existing.is_some() {
            return Err(ServiceError::AlreadyExists);
        }

        let created = store::insert(&self.db, input)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Create))?;
        info!(service_id = %created.id, name = %created.name, "service_created");
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: &UpdateServiceInput) -> Result<(), ServiceError> {
        let current = store::find_by_id(&self.db, id)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Update))?
            .ok_or(ServiceError::NotFound)?;

        // A changed name must stay unique among active rows, excluding the
        // row being updated itself.
        if let Some(name) = &input.name {
            if *name != current.name {
                let existing = store::find_by_name(&self.db, name)
                    .await
                    .map_err(|e| wrap_infra(e, ServiceError::Update))?;
                if existing.is_some_and(|other| other.id != id) {
                    return Err(ServiceError::AlreadyExists);
                }
            }
        }

        store::apply_update(&self.db, current, input)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Update))?;
        info!(service_id = %id, "service_updated");
        Ok(())
    }

    /// Soft delete, refused while visible-role assignments still reference
    /// the service. A failed existence check defaults to "no roles" so that
    /// an authorization outage does not block deletion.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        store::find_by_id(&self.db, id)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Delete))?
            .ok_or(ServiceError::NotFound)?;

        let referenced = match self.authz.has_any_visible_role(id).await {
            Ok(referenced) => referenced,
            Err(e) => {
                warn!(service_id = %id, error = %e, "visible-role existence check failed, assuming none");
                false
            }
        };
        if referenced {
            return Err(ServiceError::DeleteBlocked);
        }

        let rows = store::soft_delete(&self.db, id)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::Delete))?;
        if rows == 0 {
            return Err(ServiceError::NotFound);
        }
        info!(service_id = %id, "service_deleted");
        Ok(())
    }

    pub async fn check_health(&self, id: Uuid) -> Result<ServiceHealth, ServiceError> {
        let model = store::find_by_id(&self.db, id)
            .await
            .map_err(|e| wrap_infra(e, ServiceError::HealthCheck))?
            .ok_or(ServiceError::NotFound)?;

        let status = match model.base_url.as_deref() {
            None => HealthStatus::Unknown,
            Some(base_url) => {
                if self.prober.probe(base_url).await {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Unhealthy
                }
            }
        };

        Ok(ServiceHealth { status, timestamp: Utc::now() })
    }

    /// Catalog counters; the three counts are independent read-only queries
    /// and run concurrently.
    pub async fn get_stats(&self) -> Result<CatalogStats, ServiceError> {
        let all = ServiceFilter::default();
        let visible = ServiceFilter { is_visible: Some(true), ..Default::default() };
        let active = ServiceFilter {
            is_visible: Some(true),
            is_visible_by_role: Some(true),
            ..Default::default()
        };

        let (total_services, visible_services, active_services) = tokio::try_join!(
            store::count_matching(&self.db, &all),
            store::count_matching(&self.db, &visible),
            store::count_matching(&self.db, &active),
        )
        .map_err(|e| wrap_infra(e, ServiceError::Search))?;

        Ok(CatalogStats { total_services, visible_services, active_services })
    }
}
