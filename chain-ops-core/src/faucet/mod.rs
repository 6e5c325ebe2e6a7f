// =================================================================
// faucet/mod.rs - Asset Request Client
// =================================================================

pub mod errors;

use std::time::Duration;

use chain_ops_common::AccountAddress;
use serde::Serialize;
use tracing::{debug, error, info};

pub use errors::FaucetError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(50);

#[derive(Debug, Serialize)]
struct AssetRequest<'a> {
    destination: &'a str,
    network: &'a str,
}

/// HTTP client for the network's asset faucet
pub struct FaucetClient {
    endpoint: String,
    network: String,
    client: reqwest::Client,
}

impl FaucetClient {
    pub fn new(endpoint: impl Into<String>, network: &str) -> Self {
        Self {
            endpoint: endpoint.into(),
            network: normalize_network_name(network),
            client: reqwest::Client::new(),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Ask the faucet to fund `destination`
    pub async fn request_assets(
        &self,
        destination: &AccountAddress,
    ) -> Result<serde_json::Value, FaucetError> {
        info!("Requesting assets for {} on {}", destination, self.network);

        let body = AssetRequest {
            destination: destination.as_str(),
            network: &self.network,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Error requesting assets: {}", e);
                FaucetError::from(e)
            })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Error requesting assets: HTTP {}: {}", status, text);
            return Err(FaucetError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: serde_json::Value = serde_json::from_str(&text)?;
        debug!("Faucet response for {}: {}", destination, payload);
        Ok(payload)
    }
}

/// Faucets key networks as `UPPER_SNAKE`, e.g. `qa-net` becomes `QA_NET`
pub fn normalize_network_name(network: &str) -> String {
    network.to_uppercase().replace('-', "_")
}
