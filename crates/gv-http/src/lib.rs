//! HTTP fetch source
//!
//! Answers grid queries from a remote JSON endpoint:
//!
//! ```text
//! GET <endpoint>?query=<search>&sort=<sort token>&filters=<filter token>[&skip=N&limit=N]
//! -> { "<rows_key>": [ {..}, .. ], "<total_key>": N }
//! ```
//!
//! Every row must carry a non-null `<id_field>`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use gv_core::{GridConfig, GridError, GridResult, PageResult, Row, ValidationErrors};
use gv_queries::QueryDescriptor;
use gv_view::FetchSource;

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    endpoint: Url,
    rows_key: String,
    total_key: String,
    id_field: String,
}

impl HttpSource {
    pub fn new(endpoint: &str, rows_key: impl Into<String>, total_key: impl Into<String>) -> GridResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.add("endpoint", format!("is not a valid URL: {e}"));
            GridError::Config(errors)
        })?;

        let client = Client::builder()
            .user_agent(concat!("gridview/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GridError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            rows_key: rows_key.into(),
            total_key: total_key.into(),
            id_field: "id".to_string(),
        })
    }

    pub fn from_config(config: &GridConfig) -> GridResult<Self> {
        Ok(Self::new(&config.endpoint, config.rows_key.clone(), config.total_key.clone())?
            .with_id_field(config.id_field.clone()))
    }

    /// Field every decoded row must carry
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Pull the page out of a decoded response body
    pub fn decode(&self, body: Value) -> GridResult<PageResult> {
        decode_page(body, &self.rows_key, &self.total_key, &self.id_field)
    }
}

#[async_trait]
impl FetchSource for HttpSource {
    async fn fetch(&self, query: &QueryDescriptor) -> GridResult<PageResult> {
        debug!(endpoint = %self.endpoint, bounded = query.is_bounded(), "HTTP GET");

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query.to_params())
            .send()
            .await
            .map_err(|e| GridError::transport(format!("HTTP GET error for '{}': {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GridError::Transport {
                status: Some(status.as_u16()),
                message: format!("HTTP GET failed for '{}': status {status}", self.endpoint),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GridError::Decode(format!("Response body is not JSON: {e}")))?;
        self.decode(body)
    }
}

/// Extract `{ rows_key: [...], total_key: n }` from a response body,
/// rejecting rows without an `id_field`
pub fn decode_page(mut body: Value, rows_key: &str, total_key: &str, id_field: &str) -> GridResult<PageResult> {
    let total_count = body
        .get(total_key)
        .and_then(Value::as_u64)
        .ok_or_else(|| GridError::Decode(format!("missing or non-integer '{total_key}'")))?;

    let rows = match body.get_mut(rows_key).map(Value::take) {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let row = Row::from_value(item)
                    .ok_or_else(|| GridError::Decode(format!("'{rows_key}[{i}]' is not an object")))?;
                match row.id(id_field) {
                    Some(_) => Ok(row),
                    None => Err(GridError::Decode(format!("'{rows_key}[{i}]' has no '{id_field}'"))),
                }
            })
            .collect::<GridResult<Vec<_>>>()?,
        Some(_) => return Err(GridError::Decode(format!("'{rows_key}' is not an array"))),
        None => return Err(GridError::Decode(format!("missing '{rows_key}'"))),
    };

    Ok(PageResult::new(rows, total_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gv_core::GridMode;
    use serde_json::json;

    #[test]
    fn test_decode_page() {
        let body = json!({
            "products": [
                {"id": 1, "title": "iPhone 9", "price": 549},
                {"id": 2, "title": "iPhone X", "price": 899}
            ],
            "total": 100,
            "skip": 0,
            "limit": 2
        });

        let page = decode_page(body, "products", "total", "id").unwrap();
        assert_eq!(page.total_count, 100);
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[1].get("title"), Some(&json!("iPhone X")));
    }

    #[test]
    fn test_decode_missing_keys() {
        let err = decode_page(json!({"products": []}), "products", "total", "id").unwrap_err();
        assert_eq!(err.error_code(), "decode_error");

        let err = decode_page(json!({"total": 3}), "products", "total", "id").unwrap_err();
        assert!(err.to_string().contains("missing 'products'"));
    }

    #[test]
    fn test_decode_rejects_non_object_rows() {
        let err = decode_page(json!({"items": [1, 2], "count": 2}), "items", "count", "id").unwrap_err();
        assert!(matches!(err, GridError::Decode(ref m) if m.contains("items[0]")));
    }

    #[test]
    fn test_custom_keys_from_config() {
        let mut config = GridConfig::new(GridMode::Server, "https://dummyjson.com/products", vec![]);
        config.rows_key = "items".into();
        config.total_key = "count".into();
        config.id_field = "sku".into();

        let source = HttpSource::from_config(&config).unwrap();
        assert_eq!(source.endpoint().host_str(), Some("dummyjson.com"));
        let page = source.decode(json!({"items": [{"sku": "A-7"}], "count": 1})).unwrap();
        assert_eq!(page.rows.len(), 1);

        let err = source.decode(json!({"items": [{"id": 7}], "count": 1})).unwrap_err();
        assert!(matches!(err, GridError::Decode(ref m) if m.contains("has no 'sku'")));
    }

    #[test]
    fn test_decode_rejects_rows_without_id() {
        let body = json!({"products": [{"id": 1}, {"id": null, "title": "ghost"}], "total": 2});
        let err = decode_page(body, "products", "total", "id").unwrap_err();
        assert!(matches!(err, GridError::Decode(ref m) if m.contains("products[1]")));
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = HttpSource::new("not a url", "products", "total").unwrap_err();
        assert!(matches!(err, GridError::Config(ref e) if e.has_error("endpoint")));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let source = HttpSource::new("http://127.0.0.1:9/products", "products", "total").unwrap();
        let query = QueryDescriptor {
            search_term: String::new(),
            sort_token: String::new(),
            filter_token: String::new(),
            pagination: None,
        };

        let err = source.fetch(&query).await.unwrap_err();
        assert!(matches!(err, GridError::Transport { status: None, .. }));
    }
}
