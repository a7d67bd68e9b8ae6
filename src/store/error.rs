use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document already exists: {0}")]
    DocumentExists(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_not_found_error() {
        let err = StoreError::DocumentNotFound("chair".to_string());
        assert_eq!(err.to_string(), "Document not found: chair");
    }

    #[test]
    fn test_document_exists_error() {
        let err = StoreError::DocumentExists("chair".to_string());
        assert_eq!(err.to_string(), "Document already exists: chair");
    }

    #[test]
    fn test_path_not_found_error() {
        let err = StoreError::PathNotFound("chair/legs".to_string());
        assert_eq!(err.to_string(), "Path not found: chair/legs");
    }

    #[test]
    fn test_invalid_path_error() {
        let err = StoreError::InvalidPath("empty".to_string());
        assert_eq!(err.to_string(), "Invalid path: empty");
    }
}
