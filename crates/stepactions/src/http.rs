use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use stepcore::{Action, ActionError, Context, Parameters};
use stepruntime::ActionFactory;

/// Make an HTTP request
///
/// Parameters: `url` and `method` (required), `headers` (string map),
/// `body` (JSON, sent for POST/PUT), `timeout` seconds (default 30).
/// Returns `{status_code, data, headers}`; the body is parsed as JSON when
/// possible, otherwise returned as text.
pub struct HttpRequestAction {
    client: reqwest::Client,
}

impl HttpRequestAction {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequestAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for HttpRequestAction {
    fn action_type(&self) -> &str {
        "http_request"
    }

    fn validate(&self, parameters: &Parameters) -> Result<(), ActionError> {
        if !parameters.contains_key("url") {
            return Err(ActionError::MissingParameter("url".to_string()));
        }
        if !parameters.contains_key("method") {
            return Err(ActionError::MissingParameter("method".to_string()));
        }
        Ok(())
    }

    async fn execute(&self, parameters: &Parameters, _context: &Context) -> Result<Value, ActionError> {
        let url = parameters
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::InvalidParameter {
                field: "url".to_string(),
                reason: "expected a string".to_string(),
            })?;
        let method = parameters
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::InvalidParameter {
                field: "method".to_string(),
                reason: "expected a string".to_string(),
            })?
            .to_uppercase();
        let timeout = parameters
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(30);
        let body = parameters.get("body");

        tracing::info!("{} {}", method, url);

        let mut request = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => {
                let mut req = self.client.post(url);
                if let Some(body) = body {
                    req = req.json(body);
                }
                req
            }
            "PUT" => {
                let mut req = self.client.put(url);
                if let Some(body) = body {
                    req = req.json(body);
                }
                req
            }
            "DELETE" => self.client.delete(url),
            other => {
                return Err(ActionError::InvalidParameter {
                    field: "method".to_string(),
                    reason: format!("unsupported HTTP method: {}", other),
                })
            }
        };

        if let Some(Value::Object(headers)) = parameters.get("headers") {
            for (key, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(key, value);
                }
            }
        }

        let response = request
            .timeout(Duration::from_secs(timeout))
            .send()
            .await
            .map_err(|e| ActionError::ExecutionFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| ActionError::ExecutionFailed(format!("failed to read response: {}", e)))?;
        let data = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        tracing::info!("response status: {}", status);

        Ok(json!({
            "status_code": status,
            "data": data,
            "headers": headers,
        }))
    }
}

pub struct HttpRequestFactory;

impl ActionFactory for HttpRequestFactory {
    fn create(&self) -> Box<dyn Action> {
        Box::new(HttpRequestAction::new())
    }

    fn action_type(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> String {
        "Make an HTTP request".to_string()
    }
}
