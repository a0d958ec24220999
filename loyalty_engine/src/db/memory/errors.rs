use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum InMemoryStoreError {
    #[error("The login '{0}' is already taken")]
    DuplicateLogin(String),
}
