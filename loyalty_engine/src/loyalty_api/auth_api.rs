use std::fmt::Debug;

use log::*;
use loyalty_common::Secret;

use crate::{
    db::traits::UserManagement,
    db_types::{NewUser, User},
    helpers::{hash_password, verify_password},
    loyalty_api::errors::AuthApiError,
};

/// `AuthApi` registers users and checks their credentials. Passwords are stored as keyed hashes, never in the clear.
#[derive(Clone)]
pub struct AuthApi<B> {
    db: B,
    secret: Secret<String>,
}

impl<B: Debug> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi ({:?})", self.db)
    }
}

impl<B> AuthApi<B>
where B: UserManagement
{
    pub fn new(db: B, secret: Secret<String>) -> Self {
        Self { db, secret }
    }

    pub async fn register(&self, login: &str, password: &str) -> Result<User, AuthApiError> {
        if login.is_empty() || password.is_empty() {
            return Err(AuthApiError::EmptyCredentials);
        }
        if self.user_by_login(login).await?.is_some() {
            return Err(AuthApiError::LoginTaken(login.to_string()));
        }
        let hash = hash_password(self.secret.reveal(), password).map_err(|e| AuthApiError::HashError(e.to_string()))?;
        match self.db.create_user(NewUser::new(login, hash)).await {
            Ok(user) => {
                info!("🔑️ New user '{login}' registered");
                Ok(user)
            },
            Err(e) => {
                // Lost a race with a concurrent registration for the same login
                if self.user_by_login(login).await?.is_some() {
                    Err(AuthApiError::LoginTaken(login.to_string()))
                } else {
                    Err(AuthApiError::DatabaseError(e.to_string()))
                }
            },
        }
    }

    /// Returns the user if the login exists and the password matches.
    pub async fn verify_credentials(&self, login: &str, password: &str) -> Result<User, AuthApiError> {
        let user = self.user_by_login(login).await?.ok_or(AuthApiError::InvalidCredentials)?;
        let valid = verify_password(self.secret.reveal(), password, &user.password_hash)
            .map_err(|e| AuthApiError::HashError(e.to_string()))?;
        if valid {
            trace!("🔑️ Credentials for '{login}' verified");
            Ok(user)
        } else {
            debug!("🔑️ Invalid password for '{login}'");
            Err(AuthApiError::InvalidCredentials)
        }
    }

    pub async fn user_by_login(&self, login: &str) -> Result<Option<User>, AuthApiError> {
        self.db.fetch_user_by_login(login).await.map_err(|e| AuthApiError::DatabaseError(e.to_string()))
    }
}
