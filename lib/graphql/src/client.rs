use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use specter_config::client::{ClientConfig, RequestEncoding};
use tracing::debug;

/// The request envelope for `application/json` transport.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    #[serde(rename = "operationName")]
    pub operation_name: Option<String>,
    pub variables: HashMap<String, serde_json::Value>,
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ResponseBody {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

/// A parsed probe response. Non-2xx statuses are reported, not raised, so
/// runners can decide what to skip.
#[derive(Debug, Clone, Default)]
pub struct ProbeResponse {
    pub data: Option<serde_json::Value>,
    pub errors: Vec<GraphQLError>,
    pub raw: String,
    pub status: u16,
}

impl ProbeResponse {
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.message.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("creating HTTP client failed: {0}")]
    ClientCreation(reqwest::Error),
    #[error("invalid proxy URL: {0}")]
    InvalidProxy(reqwest::Error),
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("network error: {0}")]
    Network(reqwest::Error),
    #[error("reading response body failed: {0}")]
    ResponseRead(reqwest::Error),
}

/// The seam between runners and the wire. Tests plug in scripted
/// transports; production uses [`ProbeClient`].
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn post(&self, request: GraphQLRequest) -> Result<ProbeResponse, ClientError>;
}

/// Reqwest-backed probe client.
pub struct ProbeClient {
    url: String,
    encoding: RequestEncoding,
    http: reqwest::Client,
}

impl ProbeClient {
    pub fn new(config: &ClientConfig) -> Result<ProbeClient, ClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &config.headers {
            let name: reqwest::header::HeaderName =
                name.parse().map_err(|_| ClientError::InvalidHeader {
                    name: name.clone(),
                    reason: "invalid header name".to_string(),
                })?;
            let value = reqwest::header::HeaderValue::from_str(value.trim()).map_err(|_| {
                ClientError::InvalidHeader {
                    name: name.to_string(),
                    reason: "invalid header value".to_string(),
                }
            })?;
            headers.insert(name, value);
        }
        if let Some(cookies) = &config.cookies {
            headers.insert(
                reqwest::header::COOKIE,
                reqwest::header::HeaderValue::from_str(cookies).map_err(|_| {
                    ClientError::InvalidHeader {
                        name: "Cookie".to_string(),
                        reason: "invalid header value".to_string(),
                    }
                })?,
            );
        }
        if let Some(authorization) = &config.authorization {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(authorization).map_err(|_| {
                    ClientError::InvalidHeader {
                        name: "Authorization".to_string(),
                        reason: "invalid header value".to_string(),
                    }
                })?,
            );
        }

        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(config.timeout())
            .default_headers(headers);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy).map_err(ClientError::InvalidProxy)?);
        }

        Ok(ProbeClient {
            url: config.url.clone(),
            encoding: config.content_type,
            http: builder.build().map_err(ClientError::ClientCreation)?,
        })
    }
}

#[async_trait]
impl ProbeTransport for ProbeClient {
    async fn post(&self, request: GraphQLRequest) -> Result<ProbeResponse, ClientError> {
        let builder = match self.encoding {
            RequestEncoding::Json => self.http.post(&self.url).json(&request),
            RequestEncoding::Graphql => self
                .http
                .post(&self.url)
                .header(reqwest::header::CONTENT_TYPE, "application/graphql")
                .body(request.query.clone()),
        };

        let response = builder.send().await.map_err(ClientError::Network)?;
        let status = response.status().as_u16();
        let raw = response.text().await.map_err(ClientError::ResponseRead)?;

        // A body that is not a GraphQL response yields zero errors, which
        // simply means no results for this probe.
        let body: ResponseBody = serde_json::from_str(&raw).unwrap_or_else(|err| {
            debug!(status, error = %err, "response body is not a GraphQL result");
            ResponseBody::default()
        });

        Ok(ProbeResponse {
            data: body.data,
            errors: body.errors,
            raw,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serialises_with_introspection_field_names() {
        let request = GraphQLRequest {
            operation_name: Some("probe".to_string()),
            variables: HashMap::from([("kind".to_string(), serde_json::json!("x"))]),
            query: "query probe { a }".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["operationName"], "probe");
        assert_eq!(json["variables"]["kind"], "x");
        assert_eq!(json["query"], "query probe { a }");
    }

    #[test]
    fn malformed_bodies_parse_to_zero_errors() {
        let body: ResponseBody = serde_json::from_str("{\"errors\":[{\"message\":\"x\"}]}").unwrap();
        assert_eq!(body.errors.len(), 1);
        assert_eq!(body.errors[0].message, "x");

        assert!(serde_json::from_str::<ResponseBody>("<html>").is_err());
    }
}
