#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic concurrency failure: the write was based on a stale version.
    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Rejected by store: {0}")]
    Rejected(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Index already registered: {0}")]
    IndexConflict(String),

    #[error("Index not registered: {0}")]
    IndexNotFound(String),

    #[error("Invalid object: {0}")]
    InvalidObject(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished() {
        assert!(StoreError::NotFound("ns/a".into()).is_not_found());
        assert!(!StoreError::Unavailable("down".into()).is_not_found());
        assert!(!StoreError::Conflict("ns/a".into()).is_not_found());
    }
}
