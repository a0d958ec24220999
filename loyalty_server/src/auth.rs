//! Access tokens.
//!
//! Tokens are HS256 JWTs signed with the server's hash secret. They carry the user's login and id, so authenticated
//! requests do not need a store lookup to find out who the caller is.
use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use loyalty_common::Secret;
use loyalty_engine::db_types::User;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user's login
    pub sub: String,
    /// The user's id
    pub uid: i64,
    /// Expiry, in seconds since the Unix epoch
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(secret: &Secret<String>, expiry: chrono::Duration) -> Self {
        let key = secret.reveal().as_bytes();
        Self { encoding_key: EncodingKey::from_secret(key), decoding_key: DecodingKey::from_secret(key), expiry }
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let exp = (Utc::now() + self.expiry).timestamp();
        let claims = JwtClaims { sub: user.login.clone(), uid: user.id, exp };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenSigningError(e.to_string()))
    }

    /// Checks the token signature and expiry, returning the claims it carries.
    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::PoorlyFormattedToken(e.to_string())
            },
            _ => AuthError::ValidationError(e.to_string()),
        })?;
        Ok(data.claims)
    }

    /// The value for the `Authorization` header of a response.
    pub fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }
}

/// Extracts and validates the access token from the `Authorization` header. Accepts the token with or without a
/// `Bearer ` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub login: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::ConfigurationError("No token issuer has been configured".into()))?;
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken.into());
    }
    let claims = issuer.validate(token).map_err(|e| {
        debug!("🔑️ Rejected access token. {e}");
        e
    })?;
    trace!("🔑️ Request authenticated for '{}'", claims.sub);
    Ok(AuthenticatedUser { id: claims.uid, login: claims.sub })
}
