use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DashboardError, Result};
use crate::models::{AdminStats, ChefStats, MonthlyDataPoint, Settings};

#[cfg(test)]
pub mod fake;

/// The backend endpoints the dashboards read from. List endpoints hand back
/// raw records; normalizing them is the caller's job.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn orders(&self) -> Result<Vec<Value>>;
    async fn users(&self) -> Result<Vec<Value>>;
    async fn meals_by_chef(&self, email: &str) -> Result<Vec<Value>>;
    async fn user_orders(&self, email: &str) -> Result<Vec<Value>>;
    async fn user_reviews(&self, email: &str) -> Result<Vec<Value>>;
    async fn user_favorites(&self, email: &str) -> Result<Vec<Value>>;
    async fn admin_stats(&self) -> Result<AdminStats>;
    async fn admin_monthly_data(&self) -> Result<Vec<MonthlyDataPoint>>;
    async fn chef_stats(&self, email: &str) -> Result<ChefStats>;
}

pub struct HttpDashboardApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDashboardApi {
    pub fn new(settings: &Settings) -> Result<Self> {
        let base_url = settings.api_base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(DashboardError::Config(format!(
                "API base URL must start with http:// or https://, got {:?}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(HttpDashboardApi {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Status { status, body });
        }

        let text = response.text().await?;
        parse_body(&text)
    }

    async fn get_list(&self, path: &str) -> Result<Vec<Value>> {
        let payload = self.get_json(path).await?;
        into_list(payload, path)
    }

    async fn get_typed<T: DeserializeOwned + Default>(&self, path: &str) -> Result<T> {
        let payload = self.get_json(path).await?;
        if payload.is_null() {
            return Ok(T::default());
        }
        Ok(serde_json::from_value(payload)?)
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn orders(&self) -> Result<Vec<Value>> {
        self.get_list("/orders").await
    }

    async fn users(&self) -> Result<Vec<Value>> {
        self.get_list("/users").await
    }

    async fn meals_by_chef(&self, email: &str) -> Result<Vec<Value>> {
        self.get_list(&format!("/meals-by-chef/{}", urlencoding::encode(email)))
            .await
    }

    async fn user_orders(&self, email: &str) -> Result<Vec<Value>> {
        self.get_list(&format!("/orders/user/{}", urlencoding::encode(email)))
            .await
    }

    async fn user_reviews(&self, email: &str) -> Result<Vec<Value>> {
        self.get_list(&format!("/orders/user/{}/reviews", urlencoding::encode(email)))
            .await
    }

    async fn user_favorites(&self, email: &str) -> Result<Vec<Value>> {
        self.get_list(&format!("/orders/user/{}/favorites", urlencoding::encode(email)))
            .await
    }

    async fn admin_stats(&self) -> Result<AdminStats> {
        self.get_typed("/admin/stats").await
    }

    async fn admin_monthly_data(&self) -> Result<Vec<MonthlyDataPoint>> {
        self.get_typed("/admin/monthly-data").await
    }

    async fn chef_stats(&self, email: &str) -> Result<ChefStats> {
        self.get_typed(&format!("/chef/{}/stats", urlencoding::encode(email)))
            .await
    }
}

pub fn parse_body(text: &str) -> Result<Value> {
    let body: Value = serde_json::from_str(text)?;
    unwrap_envelope(body)
}

/// Endpoints answer either with the bare payload or with `{success, data}`.
pub fn unwrap_envelope(body: Value) -> Result<Value> {
    let mut map = match body {
        Value::Object(map) => map,
        other => return Ok(other),
    };
    let Some(success) = map.get("success").cloned() else {
        return Ok(Value::Object(map));
    };

    if success.as_bool() == Some(false) {
        let message = map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        return Err(DashboardError::Envelope(message));
    }

    Ok(map.remove("data").unwrap_or(Value::Null))
}

pub fn into_list(payload: Value, path: &str) -> Result<Vec<Value>> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(DashboardError::Envelope(format!(
            "Expected a list from {}, got {}",
            path,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn bare_payloads_pass_through() {
        assert_eq!(unwrap_envelope(json!([1, 2])).unwrap(), json!([1, 2]));
        assert_eq!(
            unwrap_envelope(json!({"totalUsers": 3})).unwrap(),
            json!({"totalUsers": 3})
        );
    }

    #[test]
    fn success_envelope_is_unwrapped() {
        assert_eq!(
            unwrap_envelope(json!({"success": true, "data": [{"a": 1}]})).unwrap(),
            json!([{"a": 1}])
        );
        assert_eq!(unwrap_envelope(json!({"success": true})).unwrap(), Value::Null);
    }

    #[test]
    fn failed_envelope_carries_server_message() {
        let err = unwrap_envelope(json!({"success": false, "message": "Chef not found"})).unwrap_err();
        assert!(matches!(err, DashboardError::Envelope(ref m) if m == "Chef not found"));

        let err = unwrap_envelope(json!({"success": false})).unwrap_err();
        assert_eq!(err.user_message(), "Request failed");
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = parse_body("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, DashboardError::Decode(_)));
        assert_eq!(err.user_message(), "Received malformed data from the server.");

        assert_eq!(
            parse_body(r#"{"success": true, "data": [1]}"#).unwrap(),
            json!([1])
        );
    }

    #[test]
    fn list_shapes() {
        assert_eq!(into_list(json!([{"x": 1}]), "/orders").unwrap().len(), 1);
        assert!(into_list(Value::Null, "/orders").unwrap().is_empty());
        let err = into_list(json!({"x": 1}), "/orders").unwrap_err();
        assert_eq!(err.to_string(), "Server rejected request: Expected a list from /orders, got an object");
    }

    fn settings_for(url: &str) -> Settings {
        Settings {
            api_base_url: url.to_string(),
            refresh_interval: None,
            request_timeout: Duration::from_secs(5),
            loading_tier: Default::default(),
        }
    }

    #[test]
    fn base_url_is_trimmed() {
        let api = HttpDashboardApi::new(&settings_for("http://localhost:5000/")).unwrap();
        assert_eq!(api.base_url(), "http://localhost:5000");
    }

    #[test]
    fn base_url_needs_a_scheme() {
        let err = HttpDashboardApi::new(&settings_for("localhost:5000")).err().unwrap();
        assert!(matches!(err, DashboardError::Config(_)));
    }
}
