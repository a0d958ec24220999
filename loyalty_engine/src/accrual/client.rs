use std::{future::Future, sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, RETRY_AFTER},
    Client,
    StatusCode,
};

use crate::{
    accrual::{AccrualClientError, AccrualVerdict},
    db_types::OrderNumber,
};

/// The raw outcome of one oracle lookup.
#[derive(Debug, Clone)]
pub struct OracleResponse {
    pub status: StatusCode,
    /// The decoded verdict, or the decoding error. Only present for `200 OK` responses.
    pub verdict: Option<Result<AccrualVerdict, String>>,
    /// The `Retry-After` hint, in whole seconds, if the oracle sent one.
    pub retry_after: Option<Duration>,
}

impl OracleResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status, verdict: None, retry_after: None }
    }

    pub fn ok(verdict: AccrualVerdict) -> Self {
        Self { status: StatusCode::OK, verdict: Some(Ok(verdict)), retry_after: None }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// Anything that can be asked for an accrual verdict on an order.
pub trait AccrualOracle: Clone + Send + Sync + 'static {
    /// Looks up a single order. An `Err` means the oracle could not be reached at all; every HTTP response, whatever
    /// its status, is returned as `Ok`.
    fn lookup(&self, number: &OrderNumber) -> impl Future<Output = Result<OracleResponse, AccrualClientError>> + Send;
}

#[derive(Clone)]
pub struct AccrualClient {
    base_url: String,
    client: Arc<Client>,
}

impl AccrualClient {
    /// Creates a client for the oracle at `base_url`. With no `timeout`, reqwest's transport defaults apply.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, AccrualClientError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let mut builder = Client::builder().user_agent("Loyalty Accrual Client").default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| AccrualClientError::Initialization(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { base_url, client: Arc::new(client) })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn url(&self, number: &OrderNumber) -> String {
        format!("{}/api/orders/{}", self.base_url, number.as_str())
    }
}

impl AccrualOracle for AccrualClient {
    async fn lookup(&self, number: &OrderNumber) -> Result<OracleResponse, AccrualClientError> {
        let url = self.url(number);
        trace!("📡️ GET {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let verdict = if status == StatusCode::OK {
            Some(response.json::<AccrualVerdict>().await.map_err(|e| e.to_string()))
        } else {
            None
        };
        debug!("📡️ Accrual service replied {status} for order {number}");
        Ok(OracleResponse { status, verdict, retry_after })
    }
}
