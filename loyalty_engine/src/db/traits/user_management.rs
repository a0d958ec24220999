use std::future::Future;

use crate::db_types::{NewUser, User};

/// Credential storage for the authentication layer.
pub trait UserManagement: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates a new user. Implementations must return an error if the login is already taken.
    fn create_user(&self, user: NewUser) -> impl Future<Output = Result<User, Self::Error>> + Send;

    fn fetch_user_by_login(&self, login: &str) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send;
}
