//! Persistence operations for catalog entries.
//!
//! Every read here excludes soft-deleted rows; callers that need to see a
//! deleted row (tests, admin tooling) use `find_by_id_including_deleted`.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use uuid::Uuid;

use common::pagination::{Paginated, PageInfo, Pagination};
use models::service::{self, Column, Entity as ServiceEntity};

use crate::domain::{CreateServiceInput, SearchQuery, ServiceFilter, SortBy, SortOrder, UpdateServiceInput};
use crate::errors::ServiceError;

fn db_err(e: DbErr) -> ServiceError {
    ServiceError::Db(e.to_string())
}

/// The partial unique index on active names reports duplicates as a unique
/// violation; map that to the domain error so racing creates do not surface
/// as internal failures.
fn write_err(e: DbErr) -> ServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::AlreadyExists,
        _ => ServiceError::Db(e.to_string()),
    }
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<service::Model>, ServiceError> {
    ServiceEntity::find()
        .filter(Column::Id.eq(id))
        .filter(Column::DeletedAt.is_null())
        .one(db)
        .await
        .map_err(db_err)
}

/// Lookup that does not exclude soft-deleted rows.
pub async fn find_by_id_including_deleted(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<service::Model>, ServiceError> {
    ServiceEntity::find_by_id(id).one(db).await.map_err(db_err)
}

/// Batch lookup in a single `IN` query.
pub async fn find_by_ids(
    db: &DatabaseConnection,
    ids: &[Uuid],
) -> Result<Vec<service::Model>, ServiceError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    ServiceEntity::find()
        .filter(Column::Id.is_in(ids.iter().copied()))
        .filter(Column::DeletedAt.is_null())
        .all(db)
        .await
        .map_err(db_err)
}

pub async fn find_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<service::Model>, ServiceError> {
    ServiceEntity::find()
        .filter(Column::Name.eq(name))
        .filter(Column::DeletedAt.is_null())
        .one(db)
        .await
        .map_err(db_err)
}

fn filter_condition(filter: &ServiceFilter, any: bool) -> Condition {
    let mut cond = if any { Condition::any() } else { Condition::all() };
    if let Some(name) = &filter.name {
        cond = cond.add(Column::Name.eq(name.clone()));
    }
    if let Some(description) = &filter.description {
        cond = cond.add(Column::Description.eq(description.clone()));
    }
    if let Some(base_url) = &filter.base_url {
        cond = cond.add(Column::BaseUrl.eq(base_url.clone()));
    }
    if let Some(display_name) = &filter.display_name {
        cond = cond.add(Column::DisplayName.eq(display_name.clone()));
    }
    if let Some(icon_url) = &filter.icon_url {
        cond = cond.add(Column::IconUrl.eq(icon_url.clone()));
    }
    if let Some(is_visible) = filter.is_visible {
        cond = cond.add(Column::IsVisible.eq(is_visible));
    }
    if let Some(by_role) = filter.is_visible_by_role {
        cond = cond.add(Column::IsVisibleByRole.eq(by_role));
    }
    cond
}

/// AND of every provided filter field; an empty filter returns all active
/// services.
pub async fn find_matching_all(
    db: &DatabaseConnection,
    filter: &ServiceFilter,
) -> Result<Vec<service::Model>, ServiceError> {
    let mut finder = ServiceEntity::find().filter(Column::DeletedAt.is_null());
    if !filter.is_empty() {
        finder = finder.filter(filter_condition(filter, false));
    }
    finder.all(db).await.map_err(db_err)
}

/// OR semantics: a row matches if it satisfies at least one provided field;
/// an empty filter returns all active services.
pub async fn find_matching_any(
    db: &DatabaseConnection,
    filter: &ServiceFilter,
) -> Result<Vec<service::Model>, ServiceError> {
    let mut finder = ServiceEntity::find().filter(Column::DeletedAt.is_null());
    if !filter.is_empty() {
        finder = finder.filter(filter_condition(filter, true));
    }
    finder.all(db).await.map_err(db_err)
}

pub async fn count_matching(
    db: &DatabaseConnection,
    filter: &ServiceFilter,
) -> Result<u64, ServiceError> {
    let mut finder = ServiceEntity::find().filter(Column::DeletedAt.is_null());
    if !filter.is_empty() {
        finder = finder.filter(filter_condition(filter, false));
    }
    finder.count(db).await.map_err(db_err)
}

/// Filtered, sorted, paginated search.
///
/// Ties on the sort key come back in storage order; no secondary key is
/// applied.
pub async fn search(
    db: &DatabaseConnection,
    query: &SearchQuery,
) -> Result<Paginated<service::Model>, ServiceError> {
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(common::pagination::DEFAULT_LIMIT),
    };
    let (page_idx, per_page) = pagination.normalize();

    let mut finder = ServiceEntity::find().filter(Column::DeletedAt.is_null());
    if let Some(name) = query.name.as_deref() {
        finder = finder.filter(Column::Name.contains(name));
    }
    if let Some(description) = query.description.as_deref() {
        finder = finder.filter(Column::Description.contains(description));
    }
    if let Some(is_visible) = query.is_visible {
        finder = finder.filter(Column::IsVisible.eq(is_visible));
    }
    if let Some(by_role) = query.is_visible_by_role {
        finder = finder.filter(Column::IsVisibleByRole.eq(by_role));
    }

    let order = match query.sort_order.unwrap_or_default() {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    };
    finder = match query.sort_by.unwrap_or_default() {
        SortBy::CreatedAt => finder.order_by(Column::CreatedAt, order),
        SortBy::UpdatedAt => finder.order_by(Column::UpdatedAt, order),
        SortBy::Name => finder.order_by(Column::Name, order),
    };

    let paginator = finder.paginate(db, per_page);
    let total_items = paginator.num_items().await.map_err(db_err)?;
    let items = if total_items > 0 {
        paginator.fetch_page(page_idx).await.map_err(db_err)?
    } else {
        Vec::new()
    };

    let page_info = PageInfo::new((page_idx + 1) as u32, per_page as u32, total_items);
    Ok(Paginated { items, page_info })
}

pub async fn insert(
    db: &DatabaseConnection,
    input: &CreateServiceInput,
) -> Result<service::Model, ServiceError> {
    service::validate_name(&input.name)?;
    if let Some(base_url) = &input.base_url {
        service::validate_http_url("baseUrl", base_url)?;
    }
    if let Some(icon_url) = &input.icon_url {
        service::validate_http_url("iconUrl", icon_url)?;
    }

    let now = Utc::now().into();
    let am = service::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name.clone()),
        description: Set(input.description.clone()),
        base_url: Set(input.base_url.clone()),
        display_name: Set(input.display_name.clone()),
        icon_url: Set(input.icon_url.clone()),
        is_visible: Set(input.is_visible),
        is_visible_by_role: Set(input.is_visible_by_role),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    am.insert(db).await.map_err(write_err)
}

/// Copy the provided fields onto the row, field by field. Identity and
/// lifecycle columns (`id`, `created_at`, `deleted_at`) are never touched.
pub async fn apply_update(
    db: &DatabaseConnection,
    current: service::Model,
    input: &UpdateServiceInput,
) -> Result<service::Model, ServiceError> {
    if let Some(name) = &input.name {
        service::validate_name(name)?;
    }
    if let Some(base_url) = &input.base_url {
        service::validate_http_url("baseUrl", base_url)?;
    }
    if let Some(icon_url) = &input.icon_url {
        service::validate_http_url("iconUrl", icon_url)?;
    }

    let mut am: service::ActiveModel = current.into();
    if let Some(name) = &input.name {
        am.name = Set(name.clone());
    }
    if let Some(description) = &input.description {
        am.description = Set(Some(description.clone()));
    }
    if let Some(base_url) = &input.base_url {
        am.base_url = Set(Some(base_url.clone()));
    }
    if let Some(display_name) = &input.display_name {
        am.display_name = Set(Some(display_name.clone()));
    }
    if let Some(icon_url) = &input.icon_url {
        am.icon_url = Set(Some(icon_url.clone()));
    }
    if let Some(is_visible) = input.is_visible {
        am.is_visible = Set(is_visible);
    }
    if let Some(by_role) = input.is_visible_by_role {
        am.is_visible_by_role = Set(by_role);
    }
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(write_err)
}

/// Mark the active row deleted; returns the number of rows affected (0 when
/// the id does not resolve to an active row). The row itself persists.
pub async fn soft_delete(db: &DatabaseConnection, id: Uuid) -> Result<u64, ServiceError> {
    let Some(found) = find_by_id(db, id).await? else {
        return Ok(0);
    };
    let mut am: service::ActiveModel = found.into();
    am.deleted_at = Set(Some(Utc::now().into()));
    am.update(db).await.map_err(db_err)?;
    Ok(1)
}
