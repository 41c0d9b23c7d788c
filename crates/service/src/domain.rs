//! Business-facing views and inputs for catalog operations.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::VisibleRole;

/// Field-equality predicate used by the AND/OR lookup paths. Empty fields do
/// not constrain the result; an entirely empty filter matches every active
/// service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceFilter {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_url: Option<String>,
    pub display_name: Option<String>,
    pub icon_url: Option<String>,
    pub is_visible: Option<bool>,
    pub is_visible_by_role: Option<bool>,
}

impl ServiceFilter {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.base_url.is_none()
            && self.display_name.is_none()
            && self.icon_url.is_none()
            && self.is_visible.is_none()
            && self.is_visible_by_role.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    /// Substring match on `name`.
    pub name: Option<String>,
    /// Substring match on `description`.
    pub description: Option<String>,
    pub is_visible: Option<bool>,
    pub is_visible_by_role: Option<bool>,
    /// 1-based, defaults to 1.
    pub page: Option<u32>,
    /// Defaults to 15, clamped to 1..=100.
    pub limit: Option<u32>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceInput {
    pub name: String,
    pub description: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_visible_by_role: bool,
    pub display_name: Option<String>,
    pub icon_url: Option<String>,
}

/// Partial update; fields left `None` keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateServiceInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_url: Option<String>,
    pub display_name: Option<String>,
    pub icon_url: Option<String>,
    pub is_visible: Option<bool>,
    pub is_visible_by_role: Option<bool>,
}

/// One row of a paginated search, enriched with the number of roles allowed
/// to see the service (0 when the authorization service is unavailable).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_url: Option<String>,
    pub display_name: Option<String>,
    pub icon_url: Option<String>,
    pub is_visible: bool,
    pub is_visible_by_role: bool,
    pub visible_role_count: u64,
}

impl SearchResultItem {
    pub fn from_model(model: models::service::Model, visible_role_count: u64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            base_url: model.base_url,
            display_name: model.display_name,
            icon_url: model.icon_url,
            is_visible: model.is_visible,
            is_visible_by_role: model.is_visible_by_role,
            visible_role_count,
        }
    }
}

/// Full service view, enriched with the role list (empty when the
/// authorization service is unavailable).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetail {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_url: Option<String>,
    pub display_name: Option<String>,
    pub icon_url: Option<String>,
    pub is_visible: bool,
    pub is_visible_by_role: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub visible_roles: Vec<VisibleRole>,
}

impl ServiceDetail {
    pub fn from_model(model: models::service::Model, visible_roles: Vec<VisibleRole>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            base_url: model.base_url,
            display_name: model.display_name,
            icon_url: model.icon_url,
            is_visible: model.is_visible,
            is_visible_by_role: model.is_visible_by_role,
            created_at: model.created_at,
            updated_at: model.updated_at,
            visible_roles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

/// Catalog-wide counters; computed from commuting read-only counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_services: u64,
    pub visible_services: u64,
    pub active_services: u64,
}
