use std::collections::HashMap;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings for the outbound HTTP probe client.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// The GraphQL endpoint URL.
    pub url: String,

    /// Extra headers sent with every probe.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Raw `Cookie` header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,

    /// `Authorization` header value (e.g. `Bearer <token>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,

    /// Proxy URL for all probe traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept invalid TLS certificates. Probing staging endpoints usually
    /// needs this.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,

    /// Request encoding: a JSON envelope or a raw `application/graphql` body.
    #[serde(default)]
    pub content_type: RequestEncoding,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            cookies: None,
            authorization: None,
            proxy: None,
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: default_accept_invalid_certs(),
            content_type: RequestEncoding::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestEncoding {
    #[default]
    Json,
    Graphql,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_accept_invalid_certs() -> bool {
    true
}
