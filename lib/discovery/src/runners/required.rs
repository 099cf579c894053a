use std::sync::Arc;

use specter_graphql::{ObjectId, ProbeTransport, ProbeTree};
use tokio::sync::mpsc;
use tracing::warn;

use crate::matchers;
use crate::result::{DiscoveryResult, Location};

use super::RESULT_CHANNEL_CAPACITY;

/// Collects the server's `is required` / `was not provided` complaints by
/// sending the subject with everything left out: bare for argument
/// discovery, or with an empty-object argument and a sentinel selection
/// for input-field discovery.
pub(crate) struct RequiredInputRunner {
    pub transport: Arc<dyn ProbeTransport>,
    pub tree: ProbeTree,
    pub subject: ObjectId,
    pub subject_name: String,
    pub type_root: String,
}

impl RequiredInputRunner {
    pub fn spawn(self) -> mpsc::Receiver<DiscoveryResult> {
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            self.run(tx).await;
        });
        rx
    }

    async fn run(self, tx: mpsc::Sender<DiscoveryResult>) {
        let response = match self.transport.post(self.tree.to_request()).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "probe failed");
                return;
            }
        };

        let arg_required = matchers::required_arg(&self.subject_name);
        let field_required = matchers::required_arg_field(&self.type_root);

        for message in response.messages() {
            if let Some(caps) = arg_required.captures(message) {
                let _ = tx
                    .send(DiscoveryResult::Required {
                        text: caps[1].to_string(),
                        type_string: caps[2].to_string(),
                        location: Location::Arg,
                        subject: self.subject,
                    })
                    .await;
                continue;
            }

            if let Some(caps) = field_required.captures(message) {
                let _ = tx
                    .send(DiscoveryResult::Required {
                        text: caps[1].to_string(),
                        type_string: caps[2].to_string(),
                        location: Location::ArgField,
                        subject: self.subject,
                    })
                    .await;
            }
        }
    }
}
