use crate::validation::ValidationErrors;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("serde error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model class `{0}` is not registered")]
    Resolution(String),

    #[error("{model} is invalid: {errors}")]
    Validation { model: String, errors: ValidationErrors },

    #[error("{model} not saved, its `{role}` parent failed to persist: {source}")]
    Persistence {
        model: String,
        role: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("{model} has no `{role}` parent to delegate `{member}` to")]
    DelegationTargetMissing { model: String, role: String, member: String },

    #[error("{model} has no attribute `{name}`")]
    UnknownAttribute { model: String, name: String },

    #[error("{model} has no association `{name}`")]
    UnknownAssociation { model: String, name: String },

    #[error("{model}.{name} expects {expected}, got {found}")]
    TypeMismatch { model: String, name: String, expected: String, found: String },

    #[error("cannot create `{association}` through an unsaved {model}")]
    UnsavedOwner { model: String, association: String },

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl AppError {
    /// Unwraps hook-level wrappers down to the failure that actually happened.
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::Persistence { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.root_cause(), AppError::Validation { .. })
    }
}
