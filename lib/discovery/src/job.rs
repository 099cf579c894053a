use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::{self, Display};

use specter_graphql::ObjectId;

/// The nine discovery steps. One runner exists per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Field,
    FieldType,
    Arg,
    ArgType,
    ArgField,
    ArgFieldType,
    RequiredArgs,
    RequiredArgFields,
    Enum,
}

impl Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobKind::Field => "FIELD",
            JobKind::FieldType => "FIELD_TYPE",
            JobKind::Arg => "ARG",
            JobKind::ArgType => "ARG_TYPE",
            JobKind::ArgField => "ARG_FIELD",
            JobKind::ArgFieldType => "ARG_FIELD_TYPE",
            JobKind::RequiredArgs => "REQUIRED_ARGS",
            JobKind::RequiredArgFields => "REQUIRED_ARG_FIELDS",
            JobKind::Enum => "ENUM",
        };
        f.write_str(s)
    }
}

/// A unit of discovery work. `previous` carries the job that scheduled
/// this one; the enum/scalar demotion rules depend on it.
#[derive(Debug, Clone)]
pub struct Job {
    pub priority: i32,
    pub kind: JobKind,
    pub object: ObjectId,
    pub previous: Option<Box<Job>>,
}

impl Job {
    pub fn new(priority: i32, kind: JobKind, object: ObjectId) -> Job {
        Job {
            priority,
            kind,
            object,
            previous: None,
        }
    }

    pub fn follow_up(priority: i32, kind: JobKind, object: ObjectId, previous: &Job) -> Job {
        Job {
            priority,
            kind,
            object,
            previous: Some(Box::new(previous.clone())),
        }
    }
}

struct QueuedJob {
    job: Job,
    root_name: String,
    seq: u64,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.job.priority == other.job.priority && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, FIFO among equals.
        self.job
            .priority
            .cmp(&other.job.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue with an O(1) `is_queued` view keyed on
/// `(kind, root type name)`, used to deduplicate resolution work.
#[derive(Default)]
pub struct JobQueue {
    heap: BinaryHeap<QueuedJob>,
    counts: HashMap<(JobKind, String), usize>,
    seq: u64,
}

impl JobQueue {
    pub fn new() -> JobQueue {
        JobQueue::default()
    }

    pub fn push(&mut self, job: Job, root_name: String) {
        *self
            .counts
            .entry((job.kind, root_name.clone()))
            .or_insert(0) += 1;
        self.seq += 1;
        self.heap.push(QueuedJob {
            job,
            root_name,
            seq: self.seq,
        });
    }

    pub fn pop(&mut self) -> Option<Job> {
        let queued = self.heap.pop()?;
        if let Some(count) = self
            .counts
            .get_mut(&(queued.job.kind, queued.root_name.clone()))
        {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.counts.remove(&(queued.job.kind, queued.root_name));
            }
        }
        Some(queued.job)
    }

    pub fn is_queued(&self, kind: JobKind, root_name: &str) -> bool {
        self.counts
            .get(&(kind, root_name.to_string()))
            .is_some_and(|count| *count > 0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specter_graphql::{Object, ObjectArena};

    fn ids(n: usize) -> Vec<ObjectId> {
        let mut arena = ObjectArena::new();
        (0..n).map(|i| arena.alloc(Object::named(format!("o{i}")))).collect()
    }

    #[test]
    fn higher_priority_pops_first_with_fifo_ties() {
        let ids = ids(4);
        let mut queue = JobQueue::new();
        queue.push(Job::new(25, JobKind::Field, ids[0]), "A".to_string());
        queue.push(Job::new(100, JobKind::FieldType, ids[1]), "B".to_string());
        queue.push(Job::new(100, JobKind::FieldType, ids[2]), "C".to_string());
        queue.push(Job::new(120, JobKind::RequiredArgs, ids[3]), "D".to_string());

        assert_eq!(queue.pop().unwrap().object, ids[3]);
        assert_eq!(queue.pop().unwrap().object, ids[1]);
        assert_eq!(queue.pop().unwrap().object, ids[2]);
        assert_eq!(queue.pop().unwrap().object, ids[0]);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn is_queued_tracks_kind_and_root_name() {
        let ids = ids(2);
        let mut queue = JobQueue::new();
        queue.push(Job::new(25, JobKind::Field, ids[0]), "User".to_string());
        queue.push(Job::new(25, JobKind::Field, ids[1]), "User".to_string());

        assert!(queue.is_queued(JobKind::Field, "User"));
        assert!(!queue.is_queued(JobKind::ArgField, "User"));

        queue.pop();
        assert!(queue.is_queued(JobKind::Field, "User"));
        queue.pop();
        assert!(!queue.is_queued(JobKind::Field, "User"));
    }
}
