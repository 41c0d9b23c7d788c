use thiserror::Error;

/// Error taxonomy of the catalog domain.
///
/// `NotFound`, `AlreadyExists` and `DeleteBlocked` are domain outcomes and
/// cross the manager boundary unchanged. The operation-scoped variants wrap
/// unexpected infrastructure failures so callers never see raw driver errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service not found")]
    NotFound,
    #[error("service already exists")]
    AlreadyExists,
    #[error("service is still referenced by visible-role assignments")]
    DeleteBlocked,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("create failed: {0}")]
    Create(String),
    #[error("update failed: {0}")]
    Update(String),
    #[error("delete failed: {0}")]
    Delete(String),
    #[error("health check failed: {0}")]
    HealthCheck(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    /// Stable machine-readable code for transport envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "SERVICE_NOT_FOUND",
            Self::AlreadyExists => "SERVICE_ALREADY_EXISTS",
            Self::DeleteBlocked => "SERVICE_DELETE_BLOCKED",
            Self::Validation(_) | Self::Model(_) => "SERVICE_INVALID_INPUT",
            Self::Search(_) => "SERVICE_SEARCH_ERROR",
            Self::Fetch(_) => "SERVICE_FETCH_ERROR",
            Self::Create(_) => "SERVICE_CREATE_ERROR",
            Self::Update(_) => "SERVICE_UPDATE_ERROR",
            Self::Delete(_) => "SERVICE_DELETE_ERROR",
            Self::HealthCheck(_) => "SERVICE_HEALTH_CHECK_ERROR",
            Self::Db(_) => "SERVICE_INTERNAL_ERROR",
        }
    }

    /// True for errors that express a domain outcome rather than an
    /// infrastructure failure.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::NotFound
                | Self::AlreadyExists
                | Self::DeleteBlocked
                | Self::Validation(_)
                | Self::Model(_)
        )
    }
}
