use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use specter_config::fuzz::{FuzzTarget, TargetOperation};
use specter_graphql::introspection::{self, IntrospectionResponse, SeedSchema};
use specter_graphql::projection::{CallerSelection, Projector, Roots};
use specter_graphql::value::scalar_value;
use specter_graphql::{
    GraphValue, Object, ObjectArena, ObjectId, OperationKind, ProbeNode, ProbeTransport, TypeKind,
    TypeRef,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::job::{Job, JobKind, JobQueue};
use crate::result::{DiscoveryResult, Location};
use crate::runners::{
    ArgRunner, ArgTypeRunner, EnumRunner, FieldRunner, FieldTypeRunner, RequiredInputRunner,
    SENTINEL_ENUM, SENTINEL_FIELD,
};
use crate::state::SharedState;
use crate::words::WordFeed;

/// A continuation recorded against a type that is still resolving: once
/// the type's job completes, its fields and possible values are spliced
/// into `target`. Descriptors, not closures, so completion runs them
/// imperatively.
#[derive(Debug)]
pub(crate) struct DeferredSplice {
    pub(crate) target: ObjectId,
    /// The splice satisfied a field occurrence that still needs its own
    /// argument discovery.
    pub(crate) schedule_arg_jobs: bool,
}

/// The discovery engine. Owns every piece of mutable state except the
/// three concurrent word sets; probe workers talk back exclusively
/// through result channels.
pub struct Discovery {
    pub(crate) arena: ObjectArena,
    pub(crate) type_map: HashMap<String, ObjectId>,
    pub(crate) queue: JobQueue,
    pub(crate) resolve_stack: Vec<String>,
    pub(crate) defer_resolve: HashMap<String, Vec<DeferredSplice>>,
    pub(crate) state: SharedState,
    pub(crate) transport: Arc<dyn ProbeTransport>,
    pub(crate) base_words: Vec<String>,
    pub(crate) threads: usize,
    pub(crate) roots: Roots,
    current_priority: i32,
}

/// Everything a run produced, ready for introspection emission.
pub struct DiscoveryOutcome {
    pub arena: ObjectArena,
    pub type_map: HashMap<String, ObjectId>,
    pub query: ObjectId,
    pub mutation: ObjectId,
    pub found_words: Vec<String>,
    pub known_scalars: Vec<String>,
    pub known_enums: Vec<String>,
}

impl DiscoveryOutcome {
    pub fn to_introspection(&self) -> IntrospectionResponse {
        introspection::emit(&self.arena, self.query, self.mutation, &self.type_map)
    }
}

impl Discovery {
    pub fn new(
        transport: Arc<dyn ProbeTransport>,
        base_words: Vec<String>,
        threads: usize,
    ) -> Discovery {
        Discovery::with_seed(
            transport,
            base_words,
            threads,
            ObjectArena::new(),
            SeedSchema::default(),
        )
    }

    /// Starts from a previously saved schema: cached types are never
    /// re-probed, only extended.
    pub fn with_seed(
        transport: Arc<dyn ProbeTransport>,
        base_words: Vec<String>,
        threads: usize,
        mut arena: ObjectArena,
        seed: SeedSchema,
    ) -> Discovery {
        let query = seed.query.unwrap_or_else(|| {
            arena.alloc(Object {
                name: "Query".to_string(),
                ..Object::default()
            })
        });
        let mutation = seed.mutation.unwrap_or_else(|| {
            arena.alloc(Object {
                name: "Mutation".to_string(),
                ..Object::default()
            })
        });
        arena[query].template = Some(OperationKind::Query);
        arena[mutation].template = Some(OperationKind::Mutation);

        Discovery {
            arena,
            type_map: seed.type_map,
            queue: JobQueue::new(),
            resolve_stack: Vec::new(),
            defer_resolve: HashMap::new(),
            state: SharedState::new(),
            transport,
            base_words,
            threads: threads.max(1),
            roots: Roots { query, mutation },
            current_priority: 0,
        }
    }

    /// Queues the initial type probes for each fuzz target.
    pub fn seed_targets(&mut self, targets: &[FuzzTarget]) {
        for target in targets {
            let (root, template) = match target.operation {
                TargetOperation::Query => (self.roots.query, OperationKind::Query),
                TargetOperation::Mutation => (self.roots.mutation, OperationKind::Mutation),
            };

            let object = match &target.field {
                None => root,
                Some(field) => match self.arena.field_named(root, field) {
                    Some(existing) => existing,
                    None => {
                        let id = self.arena.alloc(Object {
                            name: field.clone(),
                            parent: Some(root),
                            template: Some(template),
                            ..Object::default()
                        });
                        self.arena.add_field(root, id);
                        id
                    }
                },
            };

            self.push(Job::new(100, JobKind::FieldType, object));
        }
    }

    pub async fn run(mut self) -> DiscoveryOutcome {
        while let Some(job) = self.queue.pop() {
            self.current_priority = job.priority;
            debug!(
                job = %job.kind,
                priority = job.priority,
                path = %self.arena.path(job.object),
                "processing job"
            );

            let resolves_type = matches!(
                job.kind,
                JobKind::Field | JobKind::ArgField | JobKind::Enum
            );
            if resolves_type {
                let root_name = self.root_name_of(job.object);
                self.resolve_stack.push(root_name);
            }

            let from_cache = resolves_type && self.splice_from_cache(&job);
            let mut had_results = false;
            if !from_cache {
                if let Some(mut results) = self.dispatch(&job) {
                    while let Some(result) = results.recv().await {
                        had_results = true;
                        self.apply_result(&job, result);
                    }
                }
            }

            self.post_process(&job, had_results, from_cache);
        }

        for root in [self.roots.query, self.roots.mutation] {
            let mut key = self.root_name_of(root);
            if key.is_empty() {
                key = self.arena[root].name.clone();
            }
            self.type_map.entry(key).or_insert(root);
        }

        DiscoveryOutcome {
            found_words: self.state.found_words.values(),
            known_scalars: self.state.known_scalars.values(),
            known_enums: self.state.known_enums.values(),
            arena: self.arena,
            type_map: self.type_map,
            query: self.roots.query,
            mutation: self.roots.mutation,
        }
    }

    /// Cache shortcut for type-resolving jobs: a type fuzzed once is never
    /// fuzzed again, its structure is spliced into the new occurrence.
    fn splice_from_cache(&mut self, job: &Job) -> bool {
        let root_name = self.root_name_of(job.object);
        if root_name.is_empty() {
            return false;
        }
        let Some(&cached) = self.type_map.get(&root_name) else {
            return false;
        };
        if cached != job.object {
            self.arena.update_fields(job.object, cached);
        }
        debug!(type_name = %root_name, "type already resolved, splicing from cache");
        true
    }

    fn dispatch(&mut self, job: &Job) -> Option<mpsc::Receiver<DiscoveryResult>> {
        let roots = self.roots;
        match job.kind {
            JobKind::Field | JobKind::ArgField => {
                let tree =
                    Projector::new(&self.arena, &self.type_map, roots).to_root(job.object)?;
                let location = if job.kind == JobKind::Field {
                    Location::Field
                } else {
                    Location::ArgField
                };
                Some(
                    FieldRunner {
                        transport: Arc::clone(&self.transport),
                        location,
                        tree,
                        subject: job.object,
                        words: Arc::new(WordFeed::new(self.combined_words())),
                        threads: self.threads,
                        state: self.state.clone(),
                    }
                    .spawn(),
                )
            }
            JobKind::FieldType => {
                let tree =
                    Projector::new(&self.arena, &self.type_map, roots).to_root(job.object)?;
                Some(
                    FieldTypeRunner {
                        transport: Arc::clone(&self.transport),
                        tree,
                        subject: job.object,
                        subject_name: self.arena[job.object].name.clone(),
                        state: self.state.clone(),
                    }
                    .spawn(),
                )
            }
            JobKind::Arg => {
                let mut tree =
                    Projector::new(&self.arena, &self.type_map, roots).to_root(job.object)?;
                tree.set_target_children(vec![ProbeNode::leaf(SENTINEL_FIELD)]);
                Some(
                    ArgRunner {
                        transport: Arc::clone(&self.transport),
                        tree,
                        subject: job.object,
                        words: Arc::new(WordFeed::new(self.combined_words())),
                        threads: self.threads,
                        state: self.state.clone(),
                    }
                    .spawn(),
                )
            }
            JobKind::ArgType | JobKind::ArgFieldType => {
                let tree = Projector::new(&self.arena, &self.type_map, roots)
                    .to_caller(job.object, CallerSelection::MinScalar);
                let Some(tree) = tree else {
                    self.requeue_for_scalar_caller(job);
                    return None;
                };

                let obj = &self.arena[job.object];
                let preset_type = if obj.type_ref.root_name().is_empty() {
                    None
                } else {
                    Some(obj.type_ref.to_string())
                };
                let location = if job.kind == JobKind::ArgType {
                    Location::Arg
                } else {
                    Location::ArgField
                };
                Some(
                    ArgTypeRunner {
                        transport: Arc::clone(&self.transport),
                        tree,
                        subject: job.object,
                        arg_name: obj.name.clone(),
                        preset_type,
                        has_fields: !obj.fields.is_empty(),
                        location,
                        state: self.state.clone(),
                    }
                    .spawn(),
                )
            }
            JobKind::RequiredArgs => {
                let mut tree =
                    Projector::new(&self.arena, &self.type_map, roots).to_root(job.object)?;
                tree.set_target_children(Vec::new());
                tree.set_target_args(Vec::new());
                Some(
                    RequiredInputRunner {
                        transport: Arc::clone(&self.transport),
                        tree,
                        subject: job.object,
                        subject_name: self.arena[job.object].name.clone(),
                        type_root: self.root_name_of(job.object),
                    }
                    .spawn(),
                )
            }
            JobKind::RequiredArgFields => {
                let tree = Projector::new(&self.arena, &self.type_map, roots)
                    .to_caller(job.object, CallerSelection::Sentinel(SENTINEL_FIELD))?;
                Some(
                    RequiredInputRunner {
                        transport: Arc::clone(&self.transport),
                        tree,
                        subject: job.object,
                        subject_name: self.arena[job.object].name.clone(),
                        type_root: self.root_name_of(job.object),
                    }
                    .spawn(),
                )
            }
            JobKind::Enum => {
                let tree = Projector::new(&self.arena, &self.type_map, roots)
                    .to_caller(job.object, CallerSelection::MinScalar);
                let Some(tree) = tree else {
                    // The probe cannot surface an error without a scalar
                    // to select; yielding no results lets post-processing
                    // draw its conclusion.
                    debug!(
                        path = %self.arena.path(job.object),
                        "enum probe skipped, caller has no scalar selection"
                    );
                    return None;
                };
                Some(
                    EnumRunner {
                        transport: Arc::clone(&self.transport),
                        tree,
                        subject: job.object,
                        type_root: self.root_name_of(job.object),
                        words: Arc::new(WordFeed::new(self.combined_words())),
                        threads: self.threads,
                    }
                    .spawn(),
                )
            }
        }
    }

    fn requeue_for_scalar_caller(&mut self, job: &Job) {
        let new_priority = self.current_priority - 10;
        let path = self.arena.path(job.object);
        if new_priority < 0 {
            warn!(%path, "giving up on argument type, caller never gained scalar fields");
            return;
        }
        debug!(%path, new_priority, "requeueing argument type until caller has scalar fields");
        self.push(Job::new(new_priority, job.kind, job.object));
    }

    pub(crate) fn apply_result(&mut self, job: &Job, result: DiscoveryResult) {
        match result {
            DiscoveryResult::Fuzz {
                text,
                location,
                subject,
            } => self.apply_fuzz(job, text, location, subject),
            DiscoveryResult::Type {
                type_string,
                kind,
                location,
                subject,
            } => self.apply_type(job, type_string, kind, location, subject),
            DiscoveryResult::Required {
                text,
                type_string,
                location,
                subject,
            } => self.apply_required(text, type_string, location, subject),
        }
    }

    fn apply_fuzz(&mut self, job: &Job, text: String, location: Location, subject: ObjectId) {
        match location {
            Location::Arg => {
                let fuzzed = self.arena.alloc(Object {
                    name: text,
                    caller: Some(subject),
                    ..Object::default()
                });
                if self.arena.add_arg(subject, fuzzed) {
                    info!(path = %self.arena.path(fuzzed), "found argument");
                    self.push(Job::new(50, JobKind::ArgType, fuzzed));
                }
            }
            Location::Enum => {
                let fuzzed = self.arena.alloc(Object {
                    name: text,
                    ..Object::default()
                });
                if self.arena.add_possible_value(subject, fuzzed) {
                    info!(
                        path = %self.arena.path(subject),
                        value = %self.arena[fuzzed].name,
                        "found enum value"
                    );
                }
            }
            Location::Interface => {
                if self.arena[subject].type_ref.root_kind() != TypeKind::Interface {
                    self.arena[subject]
                        .type_ref
                        .set_root_kind(TypeKind::Interface);
                }

                let fuzzed = self.arena.alloc(Object {
                    name: text.clone(),
                    type_ref: TypeRef::named(&text, TypeKind::Object),
                    parent: Some(subject),
                    ..Object::default()
                });
                if !self.arena.add_possible_value(subject, fuzzed) {
                    return;
                }
                info!(path = %self.arena.path(subject), variant = %text, "found possible type");

                if let Some(&cached) = self.type_map.get(&text) {
                    self.check_cached_kind(fuzzed, cached);
                    self.arena.update_fields(fuzzed, cached);
                    return;
                }
                if self.is_resolving(&text) || self.queue.is_queued(JobKind::Field, &text) {
                    self.defer_resolve.entry(text).or_default().push(
                        DeferredSplice {
                            target: fuzzed,
                            schedule_arg_jobs: false,
                        },
                    );
                    return;
                }
                self.push(Job::new(self.current_priority, JobKind::Field, fuzzed));
            }
            Location::Field | Location::ArgField => {
                let fuzzed = self.arena.alloc(Object {
                    name: text,
                    parent: Some(subject),
                    ..Object::default()
                });
                if self.arena.add_field(subject, fuzzed) {
                    info!(path = %self.arena.path(fuzzed), "found field");
                    if location == Location::Field {
                        self.push(Job::new(100, JobKind::FieldType, fuzzed));
                    } else {
                        self.push(Job::new(75, JobKind::ArgFieldType, fuzzed));
                    }
                }
            }
        }
    }

    fn apply_type(
        &mut self,
        job: &Job,
        type_string: String,
        mut kind: TypeKind,
        location: Location,
        subject: ObjectId,
    ) {
        if subject == self.roots.query || subject == self.roots.mutation {
            info!(root = %self.arena[subject].name, type_name = %type_string, "found root type");
            self.arena[subject].name = type_string.clone();
            self.arena[subject].type_ref = TypeRef::named(&type_string, TypeKind::Object);
            self.push(Job::follow_up(25, JobKind::Field, subject, job));
            return;
        }

        info!(path = %self.arena.path(subject), type_name = %type_string, "found type");

        let mut type_ref = TypeRef::parse(&type_string, kind);
        let root_name = type_ref.root_name().to_string();
        if !root_name.is_empty() {
            self.state.add_found_word(&root_name);
        }

        if kind == TypeKind::Object && self.state.is_inferred_scalar(&type_string) {
            kind = TypeKind::Scalar;
            type_ref.set_root_kind(kind);
        } else if kind == TypeKind::Object && self.state.is_inferred_enum(&type_string) {
            kind = TypeKind::Enum;
            type_ref.set_root_kind(kind);
        }
        self.arena[subject].type_ref = type_ref;

        if (kind == TypeKind::Scalar || kind == TypeKind::Enum)
            && matches!(location, Location::Arg | Location::ArgField)
        {
            if kind == TypeKind::Scalar {
                self.state.known_scalars.add(root_name.as_str());
            } else {
                self.state.known_enums.add(root_name.as_str());
            }
        }

        let (next_kind, next_priority) = if kind == TypeKind::Enum && location != Location::Field {
            self.arena
                .set_value(subject, Some(GraphValue::String(SENTINEL_ENUM.to_string())));
            (JobKind::Enum, 20)
        } else {
            match location {
                Location::Arg | Location::ArgField => (JobKind::ArgField, 25),
                _ => (JobKind::Field, 25),
            }
        };

        if let Some(&cached) = self.type_map.get(&root_name) {
            self.check_cached_kind(subject, cached);
            self.arena.update_fields(subject, cached);
            if location == Location::Field && kind != TypeKind::Enum {
                self.schedule_arg_jobs(subject);
            }
            return;
        }

        // Types still being resolved (or queued for resolution), and enums
        // discovered in field position, wait for the canonical resolution
        // and splice later.
        if (kind == TypeKind::Enum && location == Location::Field)
            || self.is_resolving(&root_name)
            || self.queue.is_queued(next_kind, &root_name)
        {
            self.defer_resolve
                .entry(root_name)
                .or_default()
                .push(DeferredSplice {
                    target: subject,
                    schedule_arg_jobs: location == Location::Field && kind != TypeKind::Enum,
                });
            return;
        }

        if kind == TypeKind::Scalar {
            return;
        }

        self.push(Job::follow_up(next_priority, next_kind, subject, job));
    }

    fn apply_required(
        &mut self,
        text: String,
        type_string: String,
        location: Location,
        subject: ObjectId,
    ) {
        let mut type_ref = TypeRef::parse(&type_string, TypeKind::Unknown);
        if self.state.is_known_or_inferred_scalar(&type_string) {
            type_ref.set_root_kind(TypeKind::Scalar);
            self.state.known_scalars.add(type_ref.root_name());
        } else if self.state.is_known_or_inferred_enum(&type_string) {
            type_ref.set_root_kind(TypeKind::Enum);
            self.state.known_enums.add(type_ref.root_name());
        }

        let root_name = type_ref.root_name().to_string();
        self.state.add_found_word(&root_name);

        let known_scalar = self.state.is_known_scalar(&type_string);
        let value = if known_scalar {
            scalar_value(&text, &root_name)
        } else {
            GraphValue::Object(Default::default())
        };

        match location {
            Location::Arg => {
                let fuzzed = self.arena.alloc(Object {
                    name: text,
                    type_ref,
                    caller: Some(subject),
                    value_override: Some(value),
                    ..Object::default()
                });
                if !self.arena.add_arg(subject, fuzzed) {
                    return;
                }
                info!(
                    path = %self.arena.path(fuzzed),
                    type_name = %type_string,
                    "found required argument"
                );

                if known_scalar {
                    return;
                }

                if !self.state.is_known_enum(&type_string) {
                    if let Some(&cached) = self.type_map.get(&root_name) {
                        self.check_cached_kind(fuzzed, cached);
                        self.arena.update_fields(fuzzed, cached);
                        return;
                    }
                    if self.is_resolving(&root_name) {
                        self.defer_resolve
                            .entry(root_name)
                            .or_default()
                            .push(DeferredSplice {
                                target: fuzzed,
                                schedule_arg_jobs: false,
                            });
                        return;
                    }
                    self.push(Job::new(110, JobKind::RequiredArgFields, fuzzed));
                }

                self.push(Job::new(50, JobKind::ArgType, fuzzed));
            }
            _ => {
                let fuzzed = self.arena.alloc(Object {
                    name: text,
                    type_ref,
                    parent: Some(subject),
                    value_override: Some(value),
                    ..Object::default()
                });
                if !self.arena.add_field(subject, fuzzed) {
                    return;
                }
                // The holder's placeholder literal gives way to a value
                // assembled from its input fields.
                self.arena.set_value(subject, None);
                info!(
                    path = %self.arena.path(fuzzed),
                    type_name = %type_string,
                    "found required input field"
                );

                if known_scalar {
                    return;
                }
                if let Some(&cached) = self.type_map.get(&root_name) {
                    self.check_cached_kind(fuzzed, cached);
                    self.arena.update_fields(fuzzed, cached);
                    return;
                }
                if self.is_resolving(&root_name) {
                    self.defer_resolve
                        .entry(root_name)
                        .or_default()
                        .push(DeferredSplice {
                            target: fuzzed,
                            schedule_arg_jobs: false,
                        });
                    return;
                }
                if self.state.is_known_enum(&type_string) {
                    return;
                }

                self.push(Job::new(110, JobKind::RequiredArgFields, fuzzed));
                self.push(Job::new(50, JobKind::ArgFieldType, fuzzed));
            }
        }
    }

    pub(crate) fn post_process(&mut self, job: &Job, had_results: bool, from_cache: bool) {
        if !matches!(
            job.kind,
            JobKind::Field | JobKind::ArgField | JobKind::Enum
        ) {
            return;
        }
        self.resolve_stack.pop();

        let root_name = self.root_name_of(job.object);
        if let Some(splices) = self.defer_resolve.remove(&root_name) {
            for splice in splices {
                self.arena.update_fields(splice.target, job.object);
                if splice.schedule_arg_jobs {
                    self.schedule_arg_jobs(splice.target);
                }
            }
        }

        if job.kind == JobKind::Field {
            let parent = self.arena[job.object].parent;
            let parent_is_interface = parent
                .map(|p| self.arena[p].type_ref.root_kind() == TypeKind::Interface)
                .unwrap_or(false);
            if parent.is_some() && !parent_is_interface {
                self.schedule_arg_jobs(job.object);
            }
        }

        // A field fuzz that found nothing may have been aimed at an enum.
        if job.kind == JobKind::ArgField && !had_results && !from_cache {
            self.push(Job::follow_up(10, JobKind::Enum, job.object, job));
        }

        // No fields and no enum values either: treat the type as a scalar.
        if job.kind == JobKind::Enum
            && !had_results
            && job
                .previous
                .as_ref()
                .is_some_and(|previous| previous.kind == JobKind::ArgField)
        {
            self.arena[job.object].type_ref.set_root_kind(TypeKind::Scalar);
            self.state.known_scalars.add(root_name.as_str());
        }

        if !root_name.is_empty() {
            match self.type_map.get(&root_name) {
                None => {
                    self.type_map.insert(root_name.clone(), job.object);
                }
                Some(&existing) if existing != job.object => {
                    debug!(type_name = %root_name, "type already cached");
                }
                _ => {}
            }
        }

        if job.object == self.roots.query {
            for field in self.arena[self.roots.query].fields.clone() {
                self.arena[field].template = Some(OperationKind::Query);
            }
        }
        if job.object == self.roots.mutation {
            for field in self.arena[self.roots.mutation].fields.clone() {
                self.arena[field].template = Some(OperationKind::Mutation);
            }
        }
    }

    fn schedule_arg_jobs(&mut self, object: ObjectId) {
        self.push(Job::new(55, JobKind::Arg, object));
        self.push(Job::new(120, JobKind::RequiredArgs, object));
    }

    fn check_cached_kind(&self, subject: ObjectId, cached: ObjectId) {
        let discovered = self.arena[subject].type_ref.root_kind();
        let resolved = self.arena[cached].type_ref.root_kind();
        if discovered != resolved && discovered != TypeKind::Unknown {
            warn!(
                type_name = %self.arena[subject].type_ref.root_name(),
                ?discovered,
                ?resolved,
                "cached kind disagrees with discovery, keeping the discovered kind"
            );
        }
    }

    pub(crate) fn push(&mut self, job: Job) {
        let root_name = self.root_name_of(job.object);
        self.queue.push(job, root_name);
    }

    pub(crate) fn is_resolving(&self, root_name: &str) -> bool {
        self.resolve_stack.iter().any(|name| name == root_name)
    }

    pub(crate) fn root_name_of(&self, id: ObjectId) -> String {
        self.arena[id].type_ref.root_name().to_string()
    }

    fn combined_words(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut words = Vec::new();
        for word in self.base_words.iter().cloned() {
            if seen.insert(word.clone()) {
                words.push(word);
            }
        }
        for word in self.state.found_words.values() {
            if seen.insert(word.clone()) {
                words.push(word);
            }
        }
        words
    }
}
