use thiserror::Error;

/// Domain errors the API layer maps onto HTTP statuses. Everything else
/// travels as a plain `anyhow::Error` and surfaces as an internal error.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} '{key}' not found")]
    NotFoundByKey { entity: &'static str, key: String },

    #[error("{0}")]
    Validation(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn not_found_by_key(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFoundByKey {
            entity,
            key: key.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
