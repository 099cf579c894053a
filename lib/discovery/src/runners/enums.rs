use std::sync::Arc;

use specter_graphql::{GraphValue, ObjectId, ProbeResponse, ProbeTransport, ProbeTree};
use tokio::sync::mpsc;
use tracing::warn;

use crate::matchers;
use crate::result::{DiscoveryResult, Location};
use crate::words::WordFeed;

use super::{truncate_last, RESULT_CHANNEL_CAPACITY};

/// Probes possible enum values one word at a time: each candidate is
/// placed as a bare literal in the target argument position and the
/// `does not exist in … enum` diagnostic is mined for suggestions.
pub(crate) struct EnumRunner {
    pub transport: Arc<dyn ProbeTransport>,
    pub tree: ProbeTree,
    pub subject: ObjectId,
    pub type_root: String,
    pub words: Arc<WordFeed>,
    pub threads: usize,
}

impl EnumRunner {
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
        while let Some(word) = self.words.next_word() {
            self.probe(&word, &tx, Some(&mut retries)).await;
        }
        for word in retries {
            self.probe(&word, &tx, None).await;
        }
    }

    async fn probe(
        &self,
        word: &str,
        tx: &mpsc::Sender<DiscoveryResult>,
        retries: Option<&mut Vec<String>>,
    ) {
        let mut tree = self.tree.clone();
        tree.set_target_value(GraphValue::Enum(word.to_string()));

        let response = match self.transport.post(tree.to_request()).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "probe failed");
                return;
            }
        };

        let (handled, found) = self.process(word, &response, tx).await;
        if !handled && !found {
            if let Some(retries) = retries {
                if word.chars().count() == 1 {
                    self.emit(tx, word.to_string()).await;
                } else {
                    retries.push(truncate_last(word));
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

        let not_exists = matchers::enum_not_exists(word, &self.type_root);
        let expected = matchers::expected_type(word);

        for message in response.messages() {
            if !not_exists.is_match(message) && !expected.is_match(message) {
                continue;
            }
            handled = true;

            for name in matchers::suggestions(message) {
                found = true;
                self.emit(tx, name).await;
            }
        }

        (handled, found)
    }

    async fn emit(&self, tx: &mpsc::Sender<DiscoveryResult>, text: String) {
        let _ = tx
            .send(DiscoveryResult::Fuzz {
                text,
                location: Location::Enum,
                subject: self.subject,
            })
            .await;
    }
}
