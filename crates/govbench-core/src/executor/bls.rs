//! Labor-statistics provider adapter (BLS public timeseries API).

use super::registry::{FunctionSpec, ProviderFamily};
use super::ProviderClient;
use crate::model::CallParams;
use async_trait::async_trait;
use serde_json::json;

pub struct BlsClient {
    pub api_key: String,
    pub base_url: String,
    client: reqwest::Client,
}

impl BlsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.bls.gov/publicAPI/v2/timeseries/data/".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl ProviderClient for BlsClient {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::LaborStatistics
    }

    async fn fetch(
        &self,
        _spec: &FunctionSpec,
        params: &CallParams,
    ) -> anyhow::Result<serde_json::Value> {
        let series_id = params
            .get("series_id")
            .and_then(|v| v.as_text())
            .ok_or_else(|| anyhow::anyhow!("missing series_id"))?;
        let start_year = params
            .get("start_year")
            .and_then(|v| v.as_int())
            .ok_or_else(|| anyhow::anyhow!("missing start_year"))?;
        let end_year = params
            .get("end_year")
            .and_then(|v| v.as_int())
            .ok_or_else(|| anyhow::anyhow!("missing end_year"))?;

        let body = json!({
            "seriesid": [series_id],
            "startyear": start_year.to_string(),
            "endyear": end_year.to_string(),
            "registrationkey": self.api_key,
        });

        let resp = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("labor statistics API error: HTTP {}", resp.status());
        }
        Ok(resp.json().await?)
    }
}
