//! HTTP client for the backtest API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use strategy_editor_core::{
    ApiError, Error, Instrument, RemoteValidator, Result, UniverseProvider, ValidationOutcome,
};

const PARSE_PATH: &str = "/backtest/parse";
const UNIVERSE_PATH: &str = "/backtest/universe";

#[derive(Debug, Serialize)]
struct ParseRequest<'a> {
    content: &'a str,
}

/// Remote validator and universe provider backed by the backtest service.
#[derive(Debug, Clone)]
pub struct BacktestClient {
    client: reqwest::Client,
    base_url: Url,
}

impl BacktestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::internal(format!("invalid API base URL '{}': {}", base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint paths are absolute: they replace any path on the base URL.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::internal(format!("invalid endpoint '{}': {}", path, e)))
    }
}

#[async_trait]
impl RemoteValidator for BacktestClient {
    async fn parse(&self, content: &str) -> Result<ValidationOutcome> {
        let url = self.endpoint(PARSE_PATH)?;
        let response = self
            .client
            .post(url)
            .json(&ParseRequest { content })
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(ValidationOutcome::Success);
        }

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::transport(e.to_string()))?;
            match serde_json::from_slice::<ApiError>(&body) {
                Ok(ApiError::ParserError(error)) => {
                    return Ok(ValidationOutcome::StructuredFailure(error))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "422 response without a parser error payload");
                }
            }
        }

        Ok(ValidationOutcome::TransportFailure {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl UniverseProvider for BacktestClient {
    async fn get_universe(&self) -> Result<Vec<Instrument>> {
        let url = self.endpoint(UNIVERSE_PATH)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::unexpected_status(
                status.as_u16(),
                "universe request failed",
            ));
        }

        let instruments: Vec<Instrument> = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("invalid universe payload: {}", e)))?;
        tracing::debug!(instruments = instruments.len(), "Universe fetched");
        Ok(instruments)
    }
}
