use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;

/// A registered downstream service in the portal catalog.
///
/// `deleted_at` non-null marks a soft-deleted row; such rows stay in the
/// table but are excluded from every normal read path.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

// The service<->role association lives in the authorization service's store,
// so this entity carries no local relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() {
        return Err(errors::ModelError::Validation("name required".into()));
    }
    if name.len() > 128 {
        return Err(errors::ModelError::Validation("name too long (<=128)".into()));
    }
    Ok(())
}

pub fn validate_http_url(field: &str, url: &str) -> Result<(), errors::ModelError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(errors::ModelError::Validation(format!(
            "{field} must start with http(s)"
        )));
    }
    Ok(())
}
