use std::collections::VecDeque;
use std::sync::Mutex;

/// Words per probe request. One batch becomes one HTTP round trip.
pub const BATCH_SIZE: usize = 64;

/// A shared pull-based word stream. Workers take batches until the feed
/// runs dry; the lock is never held across I/O.
#[derive(Debug)]
pub struct WordFeed {
    queue: Mutex<VecDeque<String>>,
}

impl WordFeed {
    pub fn new<I, S>(words: I) -> WordFeed
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WordFeed {
            queue: Mutex::new(words.into_iter().map(Into::into).collect()),
        }
    }

    pub fn next_batch(&self, size: usize) -> Vec<String> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        let take = size.min(queue.len());
        queue.drain(..take).collect()
    }

    pub fn next_word(&self) -> Option<String> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_drain_in_order() {
        let feed = WordFeed::new(["a", "b", "c"]);
        assert_eq!(feed.next_batch(2), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(feed.next_batch(2), vec!["c".to_string()]);
        assert!(feed.next_batch(2).is_empty());
        assert_eq!(feed.next_word(), None);
    }
}
