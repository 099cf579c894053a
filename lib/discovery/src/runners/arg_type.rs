use std::sync::Arc;

use specter_graphql::projection::VariableDef;
use specter_graphql::{GraphValue, ObjectId, ProbeTransport, ProbeTree, TypeKind, TypeRef};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::matchers;
use crate::result::{DiscoveryResult, Location};
use crate::state::SharedState;

use super::{RESULT_CHANNEL_CAPACITY, SENTINEL_ARG};

/// The wrong-on-purpose declared type: almost no real argument is a
/// non-null list of non-null booleans, so the coercion error naming the
/// expected type is guaranteed.
const DECOY_TYPE: &str = "[Boolean!]!";

/// Determines an argument's (or input field's) type by binding it to a
/// deliberately mistyped variable, then narrows scalar/enum ambiguity
/// with a second `{}`-valued probe when needed.
pub(crate) struct ArgTypeRunner {
    pub transport: Arc<dyn ProbeTransport>,
    pub tree: ProbeTree,
    pub subject: ObjectId,
    pub arg_name: String,
    /// Set when the subject's type was already reported by a required-arg
    /// diagnostic; skips the first probe.
    pub preset_type: Option<String>,
    pub has_fields: bool,
    pub location: Location,
    pub state: SharedState,
}

impl ArgTypeRunner {
    pub fn spawn(self) -> mpsc::Receiver<DiscoveryResult> {
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            self.run(tx).await;
        });
        rx
    }

    async fn run(self, tx: mpsc::Sender<DiscoveryResult>) {
        let mut kind = TypeKind::Object;

        let type_string = match &self.preset_type {
            Some(preset) => preset.clone(),
            None => {
                let mut probe = self.tree.clone();
                probe.set_target_value(GraphValue::Variable(self.arg_name.clone()));
                probe.variables = vec![VariableDef {
                    name: self.arg_name.clone(),
                    type_ref: TypeRef::parse(DECOY_TYPE, TypeKind::Scalar),
                    value: serde_json::Value::String(SENTINEL_ARG.to_string()),
                }];

                let response = match self.transport.post(probe.to_request()).await {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(error = %err, "probe failed");
                        return;
                    }
                };

                let coercion = matchers::expecting_type(&self.arg_name, DECOY_TYPE);
                let expected = matchers::expected_type(SENTINEL_ARG);
                let mut found = String::new();
                for message in response.messages() {
                    if let Some(caps) = coercion.captures(message) {
                        found = caps[1].to_string();
                        break;
                    }
                    if let Some(caps) = expected.captures(message) {
                        found = caps[1].to_string();
                        break;
                    }
                    debug!(message, "type not found");
                }
                found
            }
        };

        if self.state.is_known_or_inferred_scalar(&type_string) {
            kind = TypeKind::Scalar;
        } else if self.state.is_known_or_inferred_enum(&type_string) {
            kind = TypeKind::Enum;
        } else if !self.has_fields && !type_string.is_empty() {
            // Re-declare the variable with the reported type and an empty
            // object value; the complaint separates enums from custom
            // scalars.
            let mut probe = self.tree.clone();
            probe.set_target_value(GraphValue::Variable(self.arg_name.clone()));
            probe.variables = vec![VariableDef {
                name: self.arg_name.clone(),
                type_ref: TypeRef::parse(&type_string, TypeKind::Unknown),
                value: serde_json::json!({}),
            }];

            match self.transport.post(probe.to_request()).await {
                Ok(response) => {
                    for message in response.messages() {
                        if matchers::hints_enum(message) {
                            kind = TypeKind::Enum;
                            break;
                        }
                        if matchers::hints_non_scalar_value(message) {
                            kind = TypeKind::Scalar;
                            break;
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "probe failed");
                    return;
                }
            }
        }

        if !type_string.is_empty() {
            let _ = tx
                .send(DiscoveryResult::Type {
                    type_string,
                    kind,
                    location: self.location,
                    subject: self.subject,
                })
                .await;
        }
    }
}
