use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credential store error: {0}")]
    Storage(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        AuthError::Storage(err.to_string())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
