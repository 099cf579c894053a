use std::sync::Arc;

use specter_graphql::{GraphValue, ObjectId, ProbeArg, ProbeResponse, ProbeTransport, ProbeTree};
use tokio::sync::mpsc;
use tracing::warn;

use crate::matchers;
use crate::result::{DiscoveryResult, Location};
use crate::state::SharedState;
use crate::words::{WordFeed, BATCH_SIZE};

use super::{truncate_last, RESULT_CHANNEL_CAPACITY};

/// Fuzzes argument names on a field. The probe renders the field with the
/// candidate arguments and a placeholder selection; every name the server
/// does not recognise comes back as `Unknown argument`, usually with a
/// suggestion list.
pub(crate) struct ArgRunner {
    pub transport: Arc<dyn ProbeTransport>,
    pub tree: ProbeTree,
    pub subject: ObjectId,
    pub words: Arc<WordFeed>,
    pub threads: usize,
    pub state: SharedState,
}

impl ArgRunner {
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
            self.probe_batch(&batch, &tx, Some(&mut retries)).await;
        }

        let mut start = 0;
        while start < retries.len() {
            let end = (start + BATCH_SIZE).min(retries.len());
            let chunk = retries[start..end].to_vec();
            self.probe_batch(&chunk, &tx, None).await;
            start = end;
        }
    }

    async fn probe_batch(
        &self,
        batch: &[String],
        tx: &mpsc::Sender<DiscoveryResult>,
        mut retries: Option<&mut Vec<String>>,
    ) {
        let mut tree = self.tree.clone();
        tree.set_target_args(
            batch
                .iter()
                .map(|word| ProbeArg {
                    name: word.clone(),
                    value: GraphValue::String(format!("unknown {word}")),
                })
                .collect(),
        );

        let response = match self.transport.post(tree.to_request()).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "probe failed");
                return;
            }
        };
        if response.is_server_error() {
            warn!(status = response.status, "server error, skipping batch");
            return;
        }

        for word in batch {
            let (handled, found) = self.process(word, &response, tx).await;
            if !handled && !found {
                if let Some(retries) = retries.as_mut() {
                    if word.chars().count() == 1 {
                        self.emit(tx, word.clone()).await;
                    } else {
                        retries.push(truncate_last(word));
                    }
                }
            }
        }
    }

    async fn process(
        &self,
        word: &str,
        response: &ProbeResponse,
        tx: &mpsc::Sender<DiscoveryResult>,
    ) -> (bool, bool) {
        let mut handled = false;
        let mut found = false;

        let unknown = matchers::unknown_arg(word);
        let exact = matchers::exact_arg(word);

        for message in response.messages() {
            if !unknown.is_match(message) {
                // The name exists: the server complained about the
                // argument instead of rejecting it.
                if exact.is_match(message) {
                    handled = true;
                    found = true;
                    self.emit(tx, word.to_string()).await;
                    break;
                }
                continue;
            }
            handled = true;

            for name in matchers::suggestions(message) {
                found = true;
                self.state.add_found_word(&name);
                self.emit(tx, name).await;
            }
        }

        (handled, found)
    }

    async fn emit(&self, tx: &mpsc::Sender<DiscoveryResult>, text: String) {
        let _ = tx
            .send(DiscoveryResult::Fuzz {
                text,
                location: Location::Arg,
                subject: self.subject,
            })
            .await;
    }
}
