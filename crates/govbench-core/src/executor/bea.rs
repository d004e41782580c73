//! Economic-analysis provider adapter (BEA data API).

use super::registry::{FunctionSpec, ProviderFamily};
use super::ProviderClient;
use crate::model::CallParams;
use async_trait::async_trait;

pub struct BeaClient {
    pub api_key: String,
    pub base_url: String,
    client: reqwest::Client,
}

impl BeaClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://apps.bea.gov/api/data".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl ProviderClient for BeaClient {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::EconomicAnalysis
    }

    async fn fetch(
        &self,
        spec: &FunctionSpec,
        params: &CallParams,
    ) -> anyhow::Result<serde_json::Value> {
        let dataset = spec
            .dataset
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("function {} has no dataset mapping", spec.name))?;

        let mut query: Vec<(String, String)> = vec![
            ("UserID".to_string(), self.api_key.clone()),
            ("method".to_string(), "GetData".to_string()),
            ("DataSetName".to_string(), dataset.to_string()),
            ("ResultFormat".to_string(), "JSON".to_string()),
        ];
        for (k, v) in params {
            query.push((k.clone(), v.canonical()));
        }

        let resp = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("economic analysis API error: HTTP {}", resp.status());
        }
        Ok(resp.json().await?)
    }
}
