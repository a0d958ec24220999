use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use loyalty_engine::{AuthApiError, LoyaltyApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(String),
    #[error("Order {0} has already been submitted by another user")]
    OrderOwnedByAnotherUser(String),
    #[error("The login '{0}' is already taken")]
    LoginTaken(String),
    #[error("Insufficient balance. {0}")]
    InsufficientBalance(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OrderOwnedByAnotherUser(_) => StatusCode::CONFLICT,
            Self::LoginTaken(_) => StatusCode::CONFLICT,
            Self::InsufficientBalance(_) => StatusCode::PAYMENT_REQUIRED,
            Self::AuthenticationError(e) => match e {
                AuthError::TokenSigningError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Access token is invalid or has expired. {0}")]
    ValidationError(String),
    #[error("Invalid login or password.")]
    InvalidCredentials,
    #[error("Could not sign access token. {0}")]
    TokenSigningError(String),
}

impl From<AuthApiError> for ServerError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::EmptyCredentials => Self::InvalidRequestBody(e.to_string()),
            AuthApiError::LoginTaken(login) => Self::LoginTaken(login),
            AuthApiError::InvalidCredentials => Self::AuthenticationError(AuthError::InvalidCredentials),
            AuthApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            AuthApiError::HashError(e) => Self::BackendError(e),
        }
    }
}

impl From<LoyaltyApiError> for ServerError {
    fn from(e: LoyaltyApiError) -> Self {
        match e {
            LoyaltyApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            LoyaltyApiError::OrderOwnedByAnotherUser(number) => Self::OrderOwnedByAnotherUser(number.to_string()),
            LoyaltyApiError::InsufficientBalance { .. } => Self::InsufficientBalance(e.to_string()),
            LoyaltyApiError::InvalidAmount(_) => Self::InvalidRequestBody(e.to_string()),
            // Resubmission by the same user is not an error at the HTTP level, so handlers deal with it before this
            LoyaltyApiError::OrderAlreadyExists(_) => Self::BackendError(e.to_string()),
        }
    }
}
