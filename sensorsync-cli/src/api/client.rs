//! HTTP client for the ServiceNow Table API

use anyhow::{Context, Result};
use serde_json::Value;

use super::models::{ListResponse, RecordResponse};
use super::store::RecordStore;
use crate::config::Settings;

/// Thin synchronous-request client over `api/now/table/{table}`.
///
/// Credentials are injected from `Settings`; the client never touches the
/// environment. One request is in flight at a time.
pub struct ServiceNowClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl ServiceNowClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: format!("https://{}.service-now.com/api/now/table", settings.instance),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn record_url(&self, table: &str, sys_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, table, sys_id)
    }
}

impl RecordStore for ServiceNowClient {
    async fn list(&self, table: &str, limit: u32) -> Result<Vec<Value>> {
        let url = self.table_url(table);
        log::debug!("GET {url} (sysparm_limit={limit})");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("sysparm_limit", limit.to_string())])
            .send()
            .await
            .with_context(|| format!("Failed to list records from {table}"))?
            .error_for_status()
            .with_context(|| format!("List request rejected for {table}"))?;

        let body: ListResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to decode list response from {table}"))?;
        Ok(body.result)
    }

    async fn create(&self, table: &str, data: &Value) -> Result<Value> {
        let url = self.table_url(table);
        log::debug!("POST {url}");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(data)
            .send()
            .await
            .with_context(|| format!("Failed to create record in {table}"))?
            .error_for_status()
            .with_context(|| format!("Create request rejected for {table}"))?;

        let body: RecordResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to decode create response from {table}"))?;
        Ok(body.result)
    }

    async fn update(&self, table: &str, sys_id: &str, data: &Value) -> Result<Value> {
        let url = self.record_url(table, sys_id);
        log::debug!("PATCH {url}");

        let response = self
            .http
            .patch(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(data)
            .send()
            .await
            .with_context(|| format!("Failed to update record {sys_id} in {table}"))?
            .error_for_status()
            .with_context(|| format!("Update request rejected for {table}"))?;

        let body: RecordResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to decode update response from {table}"))?;
        Ok(body.result)
    }
}
