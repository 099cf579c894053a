use std::collections::HashSet;
use std::sync::Arc;

use specter_config::fuzz::FuzzTarget;
use specter_graphql::{TypeKind, TypeRef};

use crate::job::{Job, JobKind};
use crate::orchestrator::{Discovery, DiscoveryOutcome};
use crate::result::{DiscoveryResult, Location};

use super::mock::ScriptedTransport;

async fn run_discovery(
    transport: Arc<ScriptedTransport>,
    words: &[&str],
    targets: &[&str],
) -> DiscoveryOutcome {
    let mut discovery = Discovery::new(
        transport,
        words.iter().map(|w| w.to_string()).collect(),
        1,
    );
    let targets: Vec<FuzzTarget> = targets.iter().map(|t| t.parse().unwrap()).collect();
    discovery.seed_targets(&targets);
    discovery.run().await
}

/// The probe on a bare root leaks the real name of the query type.
#[tokio::test]
async fn discovers_root_query_type_name() {
    let transport = Arc::new(ScriptedTransport::new().on(
        "specter_field",
        &[r#"Cannot query field "specter_field" on type "RootQuery"."#],
    ));

    let outcome = run_discovery(Arc::clone(&transport), &[], &["query"]).await;

    assert_eq!(outcome.arena[outcome.query].name, "RootQuery");
    assert_eq!(outcome.type_map.get("RootQuery"), Some(&outcome.query));
}

/// Full chain for a single scalar field: root type, field fuzz, field
/// type, nested field fuzz, scalar leaf detection.
#[tokio::test]
async fn discovers_single_scalar_field() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(
                "Query { specter_field",
                &[r#"Cannot query field "specter_field" on type "Query"."#],
            )
            .on(
                "name { specter_field",
                &[r#"Field "name" of type "String!" must not have a selection of subfields since type "String" has no subfields."#],
            )
            .on(
                "user { specter_field",
                &[r#"Cannot query field "specter_field" on type "User"."#],
            )
            .on(
                "query user { user {",
                &[r#"Cannot query field "name" on type "User". Did you mean "name"?"#],
            )
            .on(
                "query Query {",
                &[
                    r#"Cannot query field "user" on type "Query". Did you mean "user"?"#,
                    r#"Cannot query field "name" on type "Query"."#,
                ],
            ),
    );

    let outcome = run_discovery(Arc::clone(&transport), &["user", "name"], &["query"]).await;

    let user = outcome
        .arena
        .field_named(outcome.query, "user")
        .expect("user field discovered");
    assert_eq!(outcome.arena[user].type_ref.root_name(), "User");
    assert_eq!(outcome.arena[user].type_ref.root_kind(), TypeKind::Object);

    let name = outcome
        .arena
        .field_named(user, "name")
        .expect("name field discovered");
    assert_eq!(outcome.arena[name].type_ref.root_name(), "String");
    assert!(outcome.arena[name].type_ref.is_scalar());

    assert!(outcome.known_scalars.contains(&"String".to_string()));
    assert!(outcome.type_map.contains_key("User"));
}

/// Required-argument discovery promotes into enum value discovery: the
/// bare probe reports the missing argument, the mistyped variable leaks
/// nothing (the type came with the requirement), the `{}` probe flags an
/// enum, and the enum fuzz collects the values.
#[tokio::test]
async fn discovers_required_enum_argument() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(
                "search { specter_field",
                &[r#"Cannot query field "specter_field" on type "SearchResult"."#],
            )
            .on(
                "total { specter_field",
                &[r#"Field "total" of type "Int!" must not have a selection of subfields since type "Int" has no subfields."#],
            )
            .on(
                "query search { search }",
                &[r#"Field "search" argument "kind" of type "SearchKind!" is required, but it was not provided."#],
            )
            .on(
                "$kind: SearchKind!",
                &[r#"Variable "$kind" got invalid value {}; Expected type "SearchKind" to be a GraphQL enum."#],
            )
            .on(
                "(kind: FOO)",
                &[r#"Value "FOO" does not exist in "SearchKind" enum. Did you mean the enum value "USERS" or "POSTS"?"#],
            )
            .on(
                "query search { search",
                &[r#"Cannot query field "total" on type "SearchResult". Did you mean "total"?"#],
            ),
    );

    let outcome =
        run_discovery(Arc::clone(&transport), &["total", "FOO"], &["query.search"]).await;

    let search = outcome
        .arena
        .field_named(outcome.query, "search")
        .expect("search target");
    let kind = outcome
        .arena
        .arg_named(search, "kind")
        .expect("required argument discovered");

    let kind_type = &outcome.arena[kind].type_ref;
    assert_eq!(kind_type.to_string(), "SearchKind!");
    assert!(kind_type.is_required());
    assert_eq!(kind_type.root_kind(), TypeKind::Enum);

    let values: Vec<&str> = outcome.arena[kind]
        .possible_values
        .iter()
        .map(|v| outcome.arena[*v].name.as_str())
        .collect();
    assert_eq!(values, vec!["USERS", "POSTS"]);

    assert!(outcome.known_enums.contains(&"SearchKind".to_string()));
    assert!(outcome.type_map.contains_key("SearchKind"));
}

/// A type reported while it is still on the resolve stack is not queued a
/// second time; a splice continuation runs when the outer job completes.
#[tokio::test]
async fn cyclic_types_defer_instead_of_requeueing() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut discovery = Discovery::new(transport, Vec::new(), 1);

    let query = discovery.roots.query;
    let user = {
        let id = discovery.arena.alloc(specter_graphql::Object {
            name: "user".to_string(),
            type_ref: TypeRef::named("User", TypeKind::Object),
            parent: Some(query),
            ..specter_graphql::Object::default()
        });
        discovery.arena.add_field(query, id);
        id
    };

    // A FIELD job for `user` is in flight: User sits on the resolve stack.
    let field_job = Job::new(25, JobKind::Field, user);
    discovery.resolve_stack.push("User".to_string());

    discovery.apply_result(
        &field_job,
        DiscoveryResult::Fuzz {
            text: "friends".to_string(),
            location: Location::Field,
            subject: user,
        },
    );
    let friends = discovery
        .arena
        .field_named(user, "friends")
        .expect("friends field");

    // The FIELD_TYPE probe for friends resolves to [User] mid-flight.
    let type_job = Job::new(100, JobKind::FieldType, friends);
    discovery.apply_result(
        &type_job,
        DiscoveryResult::Type {
            type_string: "[User]".to_string(),
            kind: TypeKind::Object,
            location: Location::Field,
            subject: friends,
        },
    );

    assert!(!discovery.queue.is_queued(JobKind::Field, "User"));
    let deferred = discovery.defer_resolve.get("User").expect("deferred splice");
    assert_eq!(deferred.len(), 1);
    assert_eq!(deferred[0].target, friends);

    // Outer job completes: the continuation splices User's fields into
    // friends, sharing structure.
    discovery.post_process(&field_job, true, false);
    assert!(discovery.defer_resolve.is_empty());
    assert_eq!(
        discovery.arena[friends].fields,
        discovery.arena[user].fields
    );
    assert_eq!(discovery.type_map.get("User"), Some(&user));
}

/// Inline-fragment suggestions promote the subject to an interface and
/// fan FIELD jobs out over the variants.
#[tokio::test]
async fn detects_interfaces_from_fragment_suggestions() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(
                "node { specter_field",
                &[r#"Cannot query field "specter_field" on type "Node"."#],
            )
            .on(
                "name { specter_field",
                &[r#"Field "name" of type "String!" must not have a selection of subfields since type "String" has no subfields."#],
            )
            .on(
                "... on Person {",
                &[r#"Cannot query field "x" on type "Person". Did you mean "name"?"#],
            )
            .on("... on Company {", &[])
            .on(
                "query node { node {",
                &[r#"Cannot query field "x" on type "Node". Did you mean to use an inline fragment on "Person" or "Company"?"#],
            ),
    );

    let outcome = run_discovery(Arc::clone(&transport), &["x"], &["query.node"]).await;

    let node = outcome
        .arena
        .field_named(outcome.query, "node")
        .expect("node target");
    assert_eq!(outcome.arena[node].type_ref.root_kind(), TypeKind::Interface);

    let variants: HashSet<&str> = outcome.arena[node]
        .possible_values
        .iter()
        .map(|v| outcome.arena[*v].name.as_str())
        .collect();
    assert_eq!(variants, HashSet::from(["Person", "Company"]));

    // Both variants got their own FIELD job and were published.
    assert!(outcome.type_map.contains_key("Person"));
    assert!(outcome.type_map.contains_key("Company"));

    let person = outcome
        .arena
        .possible_value_named(node, "Person")
        .expect("person variant");
    assert!(outcome.arena.field_named(person, "name").is_some());
}

/// A word that is an exact match produces no diagnostic; the truncated
/// retry surfaces it through the suggestion list.
#[tokio::test]
async fn exact_matches_surface_through_truncated_retry() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(
                "Query { specter_field",
                &[r#"Cannot query field "specter_field" on type "Query"."#],
            )
            .on(
                "users { specter_field",
                &[r#"Cannot query field "specter_field" on type "[User]"."#],
            )
            .on(
                "{ user }",
                &[r#"Cannot query field "user" on type "Query". Did you mean "users"?"#],
            ),
    );

    let outcome = run_discovery(Arc::clone(&transport), &["users"], &["query"]).await;

    let users = outcome
        .arena
        .field_named(outcome.query, "users")
        .expect("exact-match field discovered");
    assert_eq!(outcome.arena[users].type_ref.to_string(), "[User]");
    assert!(!outcome.arena[users].type_ref.is_required());
    assert!(outcome.type_map.contains_key("User"));

    // The retry actually went out with the truncated word.
    assert!(transport
        .queries()
        .iter()
        .any(|q| q.contains("{ user }")));
}

/// Every type name reachable from the roots ends up either cached or
/// known to be a scalar.
#[tokio::test]
async fn reachable_types_are_cached_or_scalar() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(
                "Query { specter_field",
                &[r#"Cannot query field "specter_field" on type "Query"."#],
            )
            .on(
                "name { specter_field",
                &[r#"Field "name" of type "String!" must not have a selection of subfields since type "String" has no subfields."#],
            )
            .on(
                "user { specter_field",
                &[r#"Cannot query field "specter_field" on type "User"."#],
            )
            .on(
                "query user { user {",
                &[r#"Cannot query field "name" on type "User". Did you mean "name"?"#],
            )
            .on(
                "query Query {",
                &[r#"Cannot query field "user" on type "Query". Did you mean "user"?"#],
            ),
    );

    let outcome = run_discovery(Arc::clone(&transport), &["user", "name"], &["query"]).await;

    let mut stack = vec![outcome.query, outcome.mutation];
    let mut visited = HashSet::new();
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let object = &outcome.arena[id];
        let root_name = object.type_ref.root_name();
        if !root_name.is_empty() {
            assert!(
                outcome.type_map.contains_key(root_name)
                    || outcome.known_scalars.contains(&root_name.to_string()),
                "type {root_name} is neither cached nor a known scalar"
            );
        }
        stack.extend(object.fields.iter().copied());
        stack.extend(object.args.iter().copied());
        stack.extend(object.possible_values.iter().copied());
    }
}
