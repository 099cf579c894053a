use std::sync::Mutex;

use async_trait::async_trait;
use specter_graphql::client::ClientError;
use specter_graphql::{GraphQLError, GraphQLRequest, ProbeResponse, ProbeTransport};

struct Rule {
    needle: String,
    errors: Vec<String>,
    status: u16,
}

/// A scripted endpoint: the first rule whose needle occurs in the query
/// text answers with its canned error list; everything else gets a clean
/// empty response. Register specific needles before general ones.
#[derive(Default)]
pub struct ScriptedTransport {
    rules: Vec<Rule>,
    pub requests: Mutex<Vec<GraphQLRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> ScriptedTransport {
        ScriptedTransport::default()
    }

    pub fn on(mut self, needle: &str, errors: &[&str]) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            errors: errors.iter().map(|e| e.to_string()).collect(),
            status: 200,
        });
        self
    }

    #[allow(dead_code)]
    pub fn on_status(mut self, needle: &str, status: u16) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            errors: Vec::new(),
            status,
        });
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.query.clone())
            .collect()
    }
}

#[async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn post(&self, request: GraphQLRequest) -> Result<ProbeResponse, ClientError> {
        let query = request.query.clone();
        self.requests.lock().unwrap().push(request);

        for rule in &self.rules {
            if query.contains(&rule.needle) {
                return Ok(ProbeResponse {
                    data: None,
                    errors: rule
                        .errors
                        .iter()
                        .map(|message| GraphQLError {
                            message: message.clone(),
                        })
                        .collect(),
                    raw: String::new(),
                    status: rule.status,
                });
            }
        }

        Ok(ProbeResponse {
            status: 200,
            ..ProbeResponse::default()
        })
    }
}
