use jsonrpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The client went away; no further collaborator calls were made.
    #[error("Search cancelled")]
    Cancelled,
}

pub type CoffeeResult<T> = Result<T, SearchError>;

impl From<sea_orm::DbErr> for SearchError {
    fn from(err: sea_orm::DbErr) -> Self {
        SearchError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Embedding(err.to_string())
    }
}

impl From<SearchError> for RpcError {
    fn from(err: SearchError) -> Self {
        RpcError::Internal(err.to_string())
    }
}
