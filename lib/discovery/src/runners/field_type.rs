use std::sync::Arc;

use specter_graphql::{ObjectId, ProbeNode, ProbeTransport, ProbeTree, TypeKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::matchers;
use crate::result::{DiscoveryResult, Location};
use crate::state::SharedState;

use super::{RESULT_CHANNEL_CAPACITY, SENTINEL_FIELD};

/// Determines whether the subject is an object or a scalar, and extracts
/// its concrete type name.
///
/// A sentinel subselection forces one of two diagnostics: `Cannot query
/// field "<sentinel>" on type "<T>"` names the subject's type directly
/// (including the root operation types), while `has no subfields` marks a
/// scalar leaf. When neither fires, a second probe with an empty
/// selection extracts `Field "<name>" of type "<T>"`.
pub(crate) struct FieldTypeRunner {
    pub transport: Arc<dyn ProbeTransport>,
    pub tree: ProbeTree,
    pub subject: ObjectId,
    pub subject_name: String,
    pub state: SharedState,
}

impl FieldTypeRunner {
    pub fn spawn(self) -> mpsc::Receiver<DiscoveryResult> {
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            self.run(tx).await;
        });
        rx
    }

    async fn run(self, tx: mpsc::Sender<DiscoveryResult>) {
        let mut probe = self.tree.clone();
        probe.push_target_child(ProbeNode::leaf(SENTINEL_FIELD));

        let response = match self.transport.post(probe.to_request()).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "probe failed");
                return;
            }
        };

        let mut kind = TypeKind::Object;
        let mut type_string = String::new();

        let on_type = matchers::query_field(SENTINEL_FIELD);
        let no_subfields = matchers::no_subfields(&self.subject_name);
        for message in response.messages() {
            if let Some(caps) = on_type.captures(message) {
                type_string = caps[1].to_string();
                break;
            }
            if let Some(caps) = no_subfields.captures(message) {
                kind = TypeKind::Scalar;
                type_string = caps[1].to_string();
                break;
            }
        }

        if type_string.is_empty() {
            // Leaf render: selecting a composite without subfields makes
            // the server name the field's type.
            let mut probe = self.tree.clone();
            probe.set_target_children(Vec::new());

            let response = match self.transport.post(probe.to_request()).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "probe failed");
                    return;
                }
            };

            let of_type = matchers::field_of_type(&self.subject_name);
            for message in response.messages() {
                if let Some(caps) = of_type.captures(message) {
                    type_string = caps[1].to_string();
                    break;
                }
            }

            if type_string.is_empty() {
                debug!(field = %self.subject_name, "no type diagnostic");
                return;
            }
        }

        if self.state.is_known_or_inferred_scalar(&type_string) {
            kind = TypeKind::Scalar;
        } else if self.state.is_known_or_inferred_enum(&type_string) {
            kind = TypeKind::Enum;
        }

        let _ = tx
            .send(DiscoveryResult::Type {
                type_string,
                kind,
                location: Location::Field,
                subject: self.subject,
            })
            .await;
    }
}
