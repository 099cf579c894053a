use std::collections::BTreeMap;
use std::sync::Arc;

use specter_graphql::{GraphValue, ObjectId, ProbeNode, ProbeResponse, ProbeTransport, ProbeTree};
use tokio::sync::mpsc;
use tracing::warn;

use crate::matchers;
use crate::result::{DiscoveryResult, Location};
use crate::state::SharedState;
use crate::words::{WordFeed, BATCH_SIZE};

use super::{truncate_last, RESULT_CHANNEL_CAPACITY, SENTINEL_ARG_FIELD};

/// Fuzzes field names on an object type (`Location::Field`) or input
/// fields on an input object (`Location::ArgField`). Input-field probes
/// ride inside the argument literal with an enum-style sentinel value so
/// the server rejects each unknown key individually.
pub(crate) struct FieldRunner {
    pub transport: Arc<dyn ProbeTransport>,
    pub location: Location,
    pub tree: ProbeTree,
    pub subject: ObjectId,
    pub words: Arc<WordFeed>,
    pub threads: usize,
    pub state: SharedState,
}

impl FieldRunner {
    pub fn spawn(self) -> mpsc::Receiver<DiscoveryResult> {
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let runner = Arc::new(self);
        for _ in 0..runner.threads.max(1) {
            let runner = Arc::clone(&runner);
            let tx = tx.clone();
            tokio::spawn(async move {
                runner.worker(tx).await;
            });
        }
        rx
    }

    async fn worker(&self, tx: mpsc::Sender<DiscoveryResult>) {
        let mut retries = Vec::new();
        loop {
            let batch = self.words.next_batch(BATCH_SIZE);
            if batch.is_empty() {
                break;
            }
            if !self.probe_batch(&batch, &tx, Some(&mut retries)).await {
                return;
            }
        }

        // Exact matches produce no diagnostic at all; retry those words
        // once with the last character stripped so the server answers with
        // a suggestion list. A word that stays silent is dropped.
        let mut start = 0;
        while start < retries.len() {
            let end = (start + BATCH_SIZE).min(retries.len());
            let chunk = retries[start..end].to_vec();
            if !self.probe_batch(&chunk, &tx, None).await {
                return;
            }
            start = end;
        }
    }

    /// Returns false when the batch proved the subject is an enum, which
    /// ends the worker.
    async fn probe_batch(
        &self,
        batch: &[String],
        tx: &mpsc::Sender<DiscoveryResult>,
        mut retries: Option<&mut Vec<String>>,
    ) -> bool {
        let mut tree = self.tree.clone();
        if self.location == Location::ArgField {
            let map: BTreeMap<String, GraphValue> = batch
                .iter()
                .map(|word| {
                    (
                        word.clone(),
                        GraphValue::Enum(SENTINEL_ARG_FIELD.to_string()),
                    )
                })
                .collect();
            tree.set_target_value(GraphValue::Object(map));
        } else {
            tree.set_target_children(batch.iter().map(ProbeNode::leaf).collect());
        }

        let response = match self.transport.post(tree.to_request()).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "probe failed");
                return true;
            }
        };
        if response.is_server_error() {
            warn!(status = response.status, "server error, skipping batch");
            return true;
        }

        for word in batch {
            let (handled, found, keep_going) = self.process(word, &response, tx).await;
            if !keep_going {
                return false;
            }
            if !handled && !found {
                if let Some(retries) = retries.as_mut() {
                    if word.chars().count() == 1 {
                        // Too short to truncate, assume an exact match.
                        self.emit(tx, word.clone(), self.location).await;
                    } else {
                        retries.push(truncate_last(word));
                    }
                }
            }
        }

        true
    }

    async fn process(
        &self,
        word: &str,
        response: &ProbeResponse,
        tx: &mpsc::Sender<DiscoveryResult>,
    ) -> (bool, bool, bool) {
        let mut handled = false;
        let mut found = false;

        let matcher = match self.location {
            Location::ArgField => matchers::field_not_defined(word),
            _ => matchers::query_field(word),
        };
        let enum_value = matchers::enum_not_exists(word, "");
        let sentinel_pair = format!("{word}: {SENTINEL_ARG_FIELD}");

        for message in response.messages() {
            // Either of these means the subject is an enum, not a type
            // with fields; the whole fuzz is pointless.
            if enum_value.is_match(message) {
                return (handled, found, false);
            }
            if matchers::non_enum_value(message)
                .is_some_and(|embedded| embedded.contains(&sentinel_pair))
            {
                return (handled, found, false);
            }

            if !matcher.is_match(message) {
                continue;
            }
            handled = true;

            let names = matchers::suggestions(message);
            if names.is_empty() {
                continue;
            }

            let location = if matchers::mentions_inline_fragment(message) {
                if self.location != Location::Field {
                    warn!("inline fragment suggestion outside field position");
                }
                Location::Interface
            } else {
                self.location
            };

            for name in names {
                found = true;
                self.state.add_found_word(&name);
                self.emit(tx, name, location).await;
            }
            break;
        }

        (handled, found, true)
    }

    async fn emit(&self, tx: &mpsc::Sender<DiscoveryResult>, text: String, location: Location) {
        let _ = tx
            .send(DiscoveryResult::Fuzz {
                text,
                location,
                subject: self.subject,
            })
            .await;
    }
}
