//! Table access over the REST endpoint (`/rest/v1/<table>`).

use reqwest::Method;
use reqwest::header::HeaderValue;
use serde_json::Value;
use studyhub_core::query::{Direction, Filter, Query};

use crate::client::StudyHubClient;
use crate::error::{ClientError, Result, check};

/// Query-string pairs for a read.
pub fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(query.filters.len() + 3);
    let columns = query
        .columns
        .as_ref()
        .map(|c| c.join(","))
        .unwrap_or_else(|| "*".to_string());
    params.push(("select".to_string(), columns));
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        let dir = match order.direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        params.push(("order".to_string(), format!("{}.{}", order.column, dir)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Query-string pairs for row filters.
pub fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.clone(), f.rest_value()))
        .collect()
}

/// Total from a `Content-Range` header such as `0-24/156` or `*/0`.
pub fn parse_content_range(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}

impl StudyHubClient {
    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config().base_url(), table)
    }

    pub(crate) async fn rest_select(&self, query: &Query) -> Result<Vec<Value>> {
        let request = self
            .authorized(Method::GET, &self.table_url(&query.table))
            .await
            .query(&select_params(query));
        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn rest_count(&self, query: &Query) -> Result<u64> {
        let mut params = filter_params(&query.filters);
        params.insert(0, ("select".to_string(), "*".to_string()));
        let request = self
            .authorized(Method::HEAD, &self.table_url(&query.table))
            .await
            .header("Prefer", "count=exact")
            .query(&params);
        let response = check(request.send().await?).await?;
        response
            .headers()
            .get("content-range")
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| ClientError::Decode("missing Content-Range total".to_string()))
    }

    pub(crate) async fn rest_insert(&self, table: &str, rows: &[Value]) -> Result<Vec<Value>> {
        let request = self
            .authorized(Method::POST, &self.table_url(table))
            .await
            .header("Prefer", "return=representation")
            .json(rows);
        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn rest_update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: &Value,
    ) -> Result<Vec<Value>> {
        if filters.is_empty() {
            return Err(ClientError::Config(format!(
                "refusing to update every row of {table}"
            )));
        }
        let request = self
            .authorized(Method::PATCH, &self.table_url(table))
            .await
            .header("Prefer", "return=representation")
            .query(&filter_params(filters))
            .json(patch);
        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn rest_delete(&self, table: &str, filters: &[Filter]) -> Result<u64> {
        if filters.is_empty() {
            return Err(ClientError::Config(format!(
                "refusing to delete every row of {table}"
            )));
        }
        let request = self
            .authorized(Method::DELETE, &self.table_url(table))
            .await
            .header("Prefer", "return=representation")
            .query(&filter_params(filters));
        let response = check(request.send().await?).await?;
        let removed: Vec<Value> = response.json().await?;
        Ok(removed.len() as u64)
    }
}
