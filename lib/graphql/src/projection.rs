use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};

use crate::client::GraphQLRequest;
use crate::object::{ObjectArena, ObjectId, OperationKind};
use crate::type_ref::{TypeKind, TypeRef};
use crate::value::{is_unknown_scalar, scalar_value, GraphValue};

/// Upper bound on projected selection depth. The live graph can contain
/// cycles (`User.friends: [User]`), which the visiting guard cuts, but
/// anonymous intermediate types carry no name to guard on.
const MAX_DEPTH: usize = 8;

/// The two process-singleton root operations.
#[derive(Debug, Clone, Copy)]
pub struct Roots {
    pub query: ObjectId,
    pub mutation: ObjectId,
}

/// How to fill the caller field's selection set when projecting towards a
/// caller.
#[derive(Debug, Clone, Copy)]
pub enum CallerSelection<'a> {
    /// Keep the fields known for the caller's type.
    Spliced,
    /// Replace with the minimal scalar-yielding subtree; fail when no
    /// scalar is reachable.
    MinScalar,
    /// Replace with a single sentinel leaf field.
    Sentinel(&'a str),
}

/// One hop on the path from the rendered document root to the probe target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Index into `selections` (first step) or a node's `children`.
    Child(usize),
    /// Index into a node's `args`.
    Arg(usize),
    /// Key within an argument's object literal.
    Key(String),
}

#[derive(Debug, Clone)]
pub struct ProbeArg {
    pub name: String,
    pub value: GraphValue,
}

#[derive(Debug, Clone)]
pub struct ProbeNode {
    pub name: String,
    pub args: Vec<ProbeArg>,
    pub children: Vec<ProbeNode>,
    /// Render as `... on Name` instead of a field selection. Set when the
    /// node is a possible type of its parent rather than a field.
    pub inline_fragment: bool,
}

impl ProbeNode {
    pub fn leaf(name: impl Into<String>) -> ProbeNode {
        ProbeNode {
            name: name.into(),
            args: Vec::new(),
            children: Vec::new(),
            inline_fragment: false,
        }
    }
}

impl Display for ProbeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inline_fragment {
            write!(f, "... on {}", self.name)?;
        } else {
            f.write_str(&self.name)?;
            if !self.args.is_empty() {
                let args: Vec<String> = self
                    .args
                    .iter()
                    .map(|a| format!("{}: {}", a.name, a.value))
                    .collect();
                write!(f, "({})", args.join(", "))?;
            }
        }

        if !self.children.is_empty() {
            let children: Vec<String> = self.children.iter().map(|c| c.to_string()).collect();
            write!(f, " {{ {} }}", children.join(" "))?;
        }

        Ok(())
    }
}

/// A declared operation variable, bound to a concrete JSON value in the
/// request envelope.
#[derive(Debug, Clone)]
pub struct VariableDef {
    pub name: String,
    pub type_ref: TypeRef,
    pub value: serde_json::Value,
}

/// An owned, renderable query document. Built by [`Projector`], mutated by
/// probe workers (each worker clones its own tree and swaps the target
/// position per batch), never written back to the arena.
#[derive(Debug, Clone)]
pub struct ProbeTree {
    pub operation: OperationKind,
    pub operation_name: Option<String>,
    pub variables: Vec<VariableDef>,
    pub selections: Vec<ProbeNode>,
    target: Vec<Step>,
}

enum TargetMut<'a> {
    Selections(&'a mut Vec<ProbeNode>),
    Node(&'a mut ProbeNode),
    Value(&'a mut GraphValue),
}

impl ProbeTree {
    fn target_mut(&mut self) -> Option<TargetMut<'_>> {
        // The path always has the shape `Child* (Arg Key*)?`.
        if self.target.is_empty() {
            return Some(TargetMut::Selections(&mut self.selections));
        }

        let arg_split = self
            .target
            .iter()
            .position(|s| matches!(s, Step::Arg(_)));
        let node_end = arg_split.unwrap_or(self.target.len());

        let Step::Child(first) = &self.target[0] else {
            return None;
        };
        let mut node = self.selections.get_mut(*first)?;
        for step in &self.target[1..node_end] {
            let Step::Child(i) = step else {
                return None;
            };
            let cur = node;
            node = cur.children.get_mut(*i)?;
        }

        let Some(split) = arg_split else {
            return Some(TargetMut::Node(node));
        };
        let Step::Arg(arg) = &self.target[split] else {
            return None;
        };
        let mut value = &mut node.args.get_mut(*arg)?.value;
        for step in &self.target[split + 1..] {
            let Step::Key(key) = step else {
                return None;
            };
            let GraphValue::Object(map) = value else {
                return None;
            };
            value = map.get_mut(key)?;
        }

        Some(TargetMut::Value(value))
    }

    /// Replaces the target's selection set. For a root-level target this
    /// replaces the document's top-level selections.
    pub fn set_target_children(&mut self, children: Vec<ProbeNode>) {
        match self.target_mut() {
            Some(TargetMut::Selections(sel)) => *sel = children,
            Some(TargetMut::Node(node)) => node.children = children,
            _ => {}
        }
    }

    pub fn push_target_child(&mut self, child: ProbeNode) {
        match self.target_mut() {
            Some(TargetMut::Selections(sel)) => sel.push(child),
            Some(TargetMut::Node(node)) => node.children.push(child),
            _ => {}
        }
    }

    pub fn set_target_args(&mut self, args: Vec<ProbeArg>) {
        if let Some(TargetMut::Node(node)) = self.target_mut() {
            node.args = args;
        }
    }

    /// Replaces the literal at the target's argument position.
    pub fn set_target_value(&mut self, value: GraphValue) {
        if let Some(TargetMut::Value(slot)) = self.target_mut() {
            *slot = value;
        }
    }

    pub fn to_request(&self) -> GraphQLRequest {
        GraphQLRequest {
            operation_name: self.operation_name.clone(),
            query: self.to_string(),
            variables: self
                .variables
                .iter()
                .map(|v| (v.name.clone(), v.value.clone()))
                .collect(),
        }
    }
}

impl Display for ProbeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if let Some(name) = &self.operation_name {
            if !name.is_empty() {
                write!(f, " {name}")?;
            }
        }
        if !self.variables.is_empty() {
            let vars: Vec<String> = self
                .variables
                .iter()
                .map(|v| format!("${}: {}", v.name, v.type_ref))
                .collect();
            write!(f, "({})", vars.join(", "))?;
        }

        let selections: Vec<String> = self.selections.iter().map(|s| s.to_string()).collect();
        write!(f, " {{ {} }}", selections.join(" "))
    }
}

/// Builds [`ProbeTree`] projections over the arena. Structure for a node is
/// taken from the canonical cached object of its type when one exists, so a
/// freshly discovered occurrence renders with everything known about the
/// type so far.
pub struct Projector<'a> {
    arena: &'a ObjectArena,
    cache: &'a HashMap<String, ObjectId>,
    roots: Roots,
}

impl<'a> Projector<'a> {
    pub fn new(
        arena: &'a ObjectArena,
        cache: &'a HashMap<String, ObjectId>,
        roots: Roots,
    ) -> Projector<'a> {
        Projector {
            arena,
            cache,
            roots,
        }
    }

    /// The minimal document that reaches `target` in its natural position:
    /// selection position for parent chains, argument position for caller
    /// chains. At each ancestor, siblings are pruned away; required
    /// siblings of arguments and input fields are kept with generated
    /// values.
    pub fn to_root(&self, target: ObjectId) -> Option<ProbeTree> {
        self.build(target, CallerSelection::Spliced)
    }

    /// Like [`Projector::to_root`], but the nearest caller's selection set
    /// is replaced so the server actually reports errors about the
    /// argument: either the minimal scalar subtree or a sentinel leaf.
    /// Returns `None` when `MinScalar` is requested and no scalar field is
    /// reachable yet.
    pub fn to_caller(&self, target: ObjectId, selection: CallerSelection) -> Option<ProbeTree> {
        self.build(target, selection)
    }

    fn build(&self, target: ObjectId, caller_selection: CallerSelection) -> Option<ProbeTree> {
        if target == self.roots.query || target == self.roots.mutation {
            return Some(self.root_tree(target));
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Via {
            Parent,
            Caller,
        }
        struct El {
            id: ObjectId,
            via: Option<Via>,
        }

        let mut chain = vec![El {
            id: target,
            via: None,
        }];
        let mut cur = target;
        loop {
            let obj = &self.arena[cur];
            if let Some(parent) = obj.parent {
                chain.push(El {
                    id: parent,
                    via: Some(Via::Parent),
                });
                cur = parent;
            } else if let Some(caller) = obj.caller {
                chain.push(El {
                    id: caller,
                    via: Some(Via::Caller),
                });
                cur = caller;
            } else {
                break;
            }
        }

        let top_id = chain.last().map(|el| el.id)?;
        let (operation, operation_name, spine_top) =
            if top_id == self.roots.query || top_id == self.roots.mutation {
                let operation = if top_id == self.roots.query {
                    OperationKind::Query
                } else {
                    OperationKind::Mutation
                };
                let field = chain[chain.len() - 2].id;
                (operation, self.arena[field].name.clone(), chain.len() - 2)
            } else {
                let obj = &self.arena[top_id];
                (
                    obj.template.unwrap_or(OperationKind::Query),
                    obj.name.clone(),
                    chain.len() - 1,
                )
            };

        let caller_idx = (1..=spine_top).find(|&i| chain[i].via == Some(Via::Caller));
        let mut visiting = Vec::new();

        let (mut node, steps_tail) = match caller_idx {
            None => {
                if !matches!(caller_selection, CallerSelection::Spliced) {
                    // Caller-directed walk requested for a node with no
                    // caller in its chain.
                    return None;
                }
                (self.project_node(chain[0].id, &mut visiting, 0), Vec::new())
            }
            Some(ci) => {
                let caller_id = chain[ci].id;
                let arg_idx = ci - 1;

                let mut value = self.gen_value(chain[0].id, &mut visiting, 0);
                let mut keys = Vec::new();
                for i in 1..=arg_idx {
                    let holder = chain[i].id;
                    let child_name = self.arena[chain[i - 1].id].name.clone();
                    let mut map = BTreeMap::new();
                    for field in self.spliced_fields(holder) {
                        let field_obj = &self.arena[field];
                        if field_obj.name != child_name && field_obj.type_ref.is_required() {
                            map.insert(
                                field_obj.name.clone(),
                                self.gen_value(field, &mut visiting, 0),
                            );
                        }
                    }
                    map.insert(child_name.clone(), value);
                    value = GraphValue::Object(map);
                    keys.push(Step::Key(child_name));
                }
                keys.reverse();

                let arg_id = chain[arg_idx].id;
                let arg_name = self.arena[arg_id].name.clone();
                let mut args = vec![ProbeArg {
                    name: arg_name.clone(),
                    value,
                }];
                for sibling in &self.arena[caller_id].args {
                    let sibling_obj = &self.arena[*sibling];
                    if sibling_obj.name != arg_name && sibling_obj.type_ref.is_required() {
                        args.push(ProbeArg {
                            name: sibling_obj.name.clone(),
                            value: self.gen_value(*sibling, &mut visiting, 0),
                        });
                    }
                }

                let children = match caller_selection {
                    CallerSelection::Spliced => self
                        .spliced_fields(caller_id)
                        .into_iter()
                        .map(|f| self.project_node(f, &mut visiting, 1))
                        .collect(),
                    CallerSelection::MinScalar => {
                        self.min_scalar_children(caller_id, &mut visiting)?
                    }
                    CallerSelection::Sentinel(name) => vec![ProbeNode::leaf(name)],
                };

                let node = ProbeNode {
                    name: self.arena[caller_id].name.clone(),
                    args,
                    children,
                    inline_fragment: false,
                };
                let mut tail = vec![Step::Arg(0)];
                tail.extend(keys);
                (node, tail)
            }
        };

        // Wrap the deepest node in the remaining selection spine, pruning
        // every level to just the path child.
        let deepest = caller_idx.unwrap_or(0);
        for el in chain[deepest + 1..=spine_top].iter() {
            node.inline_fragment = self
                .arena
                .possible_value_named(el.id, &node.name)
                .is_some();
            let wrapper_obj = &self.arena[el.id];
            let args = wrapper_obj
                .args
                .iter()
                .map(|a| ProbeArg {
                    name: self.arena[*a].name.clone(),
                    value: self.gen_value(*a, &mut visiting, 0),
                })
                .collect();
            node = ProbeNode {
                name: wrapper_obj.name.clone(),
                args,
                children: vec![node],
                inline_fragment: false,
            };
        }

        let mut target_steps = vec![Step::Child(0); spine_top - deepest + 1];
        target_steps.extend(steps_tail);

        Some(ProbeTree {
            operation,
            operation_name: Some(operation_name),
            variables: Vec::new(),
            selections: vec![node],
            target: target_steps,
        })
    }

    fn root_tree(&self, root: ObjectId) -> ProbeTree {
        let operation = if root == self.roots.query {
            OperationKind::Query
        } else {
            OperationKind::Mutation
        };
        let mut visiting = Vec::new();
        let selections = self
            .spliced_fields(root)
            .into_iter()
            .map(|f| self.project_node(f, &mut visiting, 1))
            .collect();

        ProbeTree {
            operation,
            operation_name: Some(self.arena[root].name.clone()),
            variables: Vec::new(),
            selections,
            target: Vec::new(),
        }
    }

    /// The canonical object carrying structure for `id`'s type, falling
    /// back to `id` itself when the type is not cached yet.
    fn effective(&self, id: ObjectId) -> ObjectId {
        let root_name = self.arena[id].type_ref.root_name();
        self.cache.get(root_name).copied().unwrap_or(id)
    }

    fn spliced_fields(&self, id: ObjectId) -> Vec<ObjectId> {
        self.arena[self.effective(id)].fields.clone()
    }

    fn project_node(&self, id: ObjectId, visiting: &mut Vec<String>, depth: usize) -> ProbeNode {
        let obj = &self.arena[id];
        let args = obj
            .args
            .iter()
            .map(|a| ProbeArg {
                name: self.arena[*a].name.clone(),
                value: self.gen_value(*a, visiting, 0),
            })
            .collect();

        let mut node = ProbeNode {
            name: obj.name.clone(),
            args,
            children: Vec::new(),
            inline_fragment: false,
        };

        let root_name = obj.type_ref.root_name().to_string();
        let guarded = !root_name.is_empty();
        if depth >= MAX_DEPTH || (guarded && visiting.contains(&root_name)) {
            return node;
        }
        if guarded {
            visiting.push(root_name);
        }
        for field in self.spliced_fields(id) {
            node.children.push(self.project_node(field, visiting, depth + 1));
        }
        if guarded {
            visiting.pop();
        }

        node
    }

    /// Minimal scalar-yielding selection for `id`'s type: the first scalar
    /// field if any, otherwise a descent into the first field whose subtree
    /// reaches a scalar. `None` when nothing scalar is known yet.
    fn min_scalar_children(
        &self,
        id: ObjectId,
        visiting: &mut Vec<String>,
    ) -> Option<Vec<ProbeNode>> {
        let root_name = self.arena[id].type_ref.root_name().to_string();
        if !root_name.is_empty() && visiting.contains(&root_name) {
            return None;
        }

        let fields = self.spliced_fields(id);
        for field in &fields {
            if self.arena[*field].type_ref.is_scalar() {
                return Some(vec![ProbeNode::leaf(&self.arena[*field].name)]);
            }
        }
        if fields.is_empty() {
            return None;
        }

        if !root_name.is_empty() {
            visiting.push(root_name);
        }
        let mut found = None;
        for field in &fields {
            if let Some(children) = self.min_scalar_children(*field, visiting) {
                found = Some(vec![ProbeNode {
                    name: self.arena[*field].name.clone(),
                    args: Vec::new(),
                    children,
                    inline_fragment: false,
                }]);
                break;
            }
        }
        if !self.arena[id].type_ref.root_name().is_empty() {
            visiting.pop();
        }

        found
    }

    /// The literal rendered for `id` in argument position: the explicit
    /// override, a recorded default, a generated scalar, or a composite
    /// built from what is known of the type.
    fn gen_value(&self, id: ObjectId, visiting: &mut Vec<String>, depth: usize) -> GraphValue {
        let obj = &self.arena[id];
        if let Some(value) = &obj.value_override {
            return value.clone();
        }
        if let Some(value) = &obj.default_value {
            return value.clone();
        }

        let scalar = scalar_value(&obj.name, obj.type_ref.root_name());
        if !is_unknown_scalar(&scalar) {
            return scalar;
        }

        let source = self.effective(id);
        let source_obj = &self.arena[source];
        if !source_obj.possible_values.is_empty() && source_obj.fields.is_empty() {
            let first = source_obj.possible_values[0];
            if obj.type_ref.root_kind() == TypeKind::Enum {
                return GraphValue::Enum(self.arena[first].name.clone());
            }
            return self.gen_value(first, visiting, depth + 1);
        }

        if source_obj.fields.is_empty() {
            return GraphValue::Object(BTreeMap::new());
        }

        let root_name = obj.type_ref.root_name().to_string();
        if depth >= MAX_DEPTH || (!root_name.is_empty() && visiting.contains(&root_name)) {
            return GraphValue::Null;
        }
        if !root_name.is_empty() {
            visiting.push(root_name);
        }
        let mut map = BTreeMap::new();
        for field in &source_obj.fields {
            map.insert(
                self.arena[*field].name.clone(),
                self.gen_value(*field, visiting, depth + 1),
            );
        }
        if !obj.type_ref.root_name().is_empty() {
            visiting.pop();
        }

        GraphValue::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    fn fixture() -> (ObjectArena, HashMap<String, ObjectId>, Roots) {
        let mut arena = ObjectArena::new();
        let query = arena.alloc(Object::with_type(
            "Query",
            TypeRef::named("Query", TypeKind::Object),
        ));
        let mutation = arena.alloc(Object::with_type(
            "Mutation",
            TypeRef::named("Mutation", TypeKind::Object),
        ));
        (
            arena,
            HashMap::new(),
            Roots {
                query,
                mutation,
            },
        )
    }

    #[test]
    fn renders_root_probe() {
        let (mut arena, cache, roots) = fixture();
        let user = arena.alloc(Object {
            name: "user".to_string(),
            parent: Some(roots.query),
            template: Some(OperationKind::Query),
            ..Object::default()
        });
        arena.add_field(roots.query, user);

        let projector = Projector::new(&arena, &cache, roots);
        let mut tree = projector.to_root(roots.query).unwrap();
        tree.push_target_child(ProbeNode::leaf("specter_field"));
        insta::assert_snapshot!(tree, @"query Query { user specter_field }");
    }

    #[test]
    fn prunes_spine_to_the_target() {
        let (mut arena, cache, roots) = fixture();
        let user = arena.alloc(Object {
            name: "user".to_string(),
            type_ref: TypeRef::named("User", TypeKind::Object),
            parent: Some(roots.query),
            template: Some(OperationKind::Query),
            ..Object::default()
        });
        arena.add_field(roots.query, user);
        let name = arena.alloc(Object {
            name: "name".to_string(),
            type_ref: TypeRef::named("String", TypeKind::Scalar),
            parent: Some(user),
            ..Object::default()
        });
        arena.add_field(user, name);
        let email = arena.alloc(Object {
            name: "email".to_string(),
            parent: Some(user),
            ..Object::default()
        });
        arena.add_field(user, email);

        let projector = Projector::new(&arena, &cache, roots);
        let mut tree = projector.to_root(name).unwrap();
        tree.push_target_child(ProbeNode::leaf("specter_field"));
        insta::assert_snapshot!(tree, @"query user { user { name { specter_field } } }");
    }

    #[test]
    fn places_caller_targets_in_argument_position() {
        let (mut arena, cache, roots) = fixture();
        let search = arena.alloc(Object {
            name: "search".to_string(),
            type_ref: TypeRef::named("SearchResult", TypeKind::Object),
            parent: Some(roots.query),
            template: Some(OperationKind::Query),
            ..Object::default()
        });
        arena.add_field(roots.query, search);
        let total = arena.alloc(Object {
            name: "total".to_string(),
            type_ref: TypeRef::named("Int", TypeKind::Scalar),
            parent: Some(search),
            ..Object::default()
        });
        arena.add_field(search, total);

        let kind = arena.alloc(Object {
            name: "kind".to_string(),
            type_ref: TypeRef::parse("SearchKind!", TypeKind::Enum),
            caller: Some(search),
            ..Object::default()
        });
        arena.add_arg(search, kind);

        let projector = Projector::new(&arena, &cache, roots);
        let mut tree = projector
            .to_caller(kind, CallerSelection::MinScalar)
            .unwrap();
        tree.set_target_value(GraphValue::Enum("FOO".to_string()));
        insta::assert_snapshot!(tree, @"query search { search(kind: FOO) { total } }");
    }

    #[test]
    fn nested_input_fields_render_inside_object_literals() {
        let (mut arena, cache, roots) = fixture();
        let search = arena.alloc(Object {
            name: "search".to_string(),
            parent: Some(roots.query),
            template: Some(OperationKind::Query),
            ..Object::default()
        });
        arena.add_field(roots.query, search);
        let total = arena.alloc(Object {
            name: "total".to_string(),
            type_ref: TypeRef::named("Int", TypeKind::Scalar),
            parent: Some(search),
            ..Object::default()
        });
        arena.add_field(search, total);

        let filter = arena.alloc(Object {
            name: "filter".to_string(),
            type_ref: TypeRef::named("SearchFilter", TypeKind::InputObject),
            caller: Some(search),
            ..Object::default()
        });
        arena.add_arg(search, filter);
        let term = arena.alloc(Object {
            name: "term".to_string(),
            parent: Some(filter),
            ..Object::default()
        });
        arena.add_field(filter, term);

        let projector = Projector::new(&arena, &cache, roots);
        let mut tree = projector
            .to_caller(term, CallerSelection::MinScalar)
            .unwrap();
        tree.set_target_value(GraphValue::String("x".to_string()));
        insta::assert_snapshot!(
            tree,
            @r#"query search { search(filter: {term: "x"}) { total } }"#);
    }

    #[test]
    fn caller_walk_fails_without_reachable_scalar() {
        let (mut arena, cache, roots) = fixture();
        let search = arena.alloc(Object {
            name: "search".to_string(),
            parent: Some(roots.query),
            template: Some(OperationKind::Query),
            ..Object::default()
        });
        arena.add_field(roots.query, search);
        let kind = arena.alloc(Object {
            name: "kind".to_string(),
            caller: Some(search),
            ..Object::default()
        });
        arena.add_arg(search, kind);

        let projector = Projector::new(&arena, &cache, roots);
        assert!(projector.to_caller(kind, CallerSelection::MinScalar).is_none());
        let sentinel = projector
            .to_caller(kind, CallerSelection::Sentinel("specter_field"))
            .unwrap();
        assert_eq!(
            sentinel.to_string(),
            "query search { search(kind: {}) { specter_field } }"
        );
    }

    #[test]
    fn required_siblings_keep_generated_values() {
        let (mut arena, cache, roots) = fixture();
        let search = arena.alloc(Object {
            name: "search".to_string(),
            parent: Some(roots.query),
            template: Some(OperationKind::Query),
            ..Object::default()
        });
        arena.add_field(roots.query, search);
        let total = arena.alloc(Object {
            name: "total".to_string(),
            type_ref: TypeRef::named("Int", TypeKind::Scalar),
            parent: Some(search),
            ..Object::default()
        });
        arena.add_field(search, total);

        let first = arena.alloc(Object {
            name: "first".to_string(),
            type_ref: TypeRef::parse("Int!", TypeKind::Scalar),
            caller: Some(search),
            ..Object::default()
        });
        arena.set_value(first, Some(GraphValue::Int(10)));
        arena.add_arg(search, first);

        let kind = arena.alloc(Object {
            name: "kind".to_string(),
            type_ref: TypeRef::parse("SearchKind!", TypeKind::Enum),
            caller: Some(search),
            ..Object::default()
        });
        arena.add_arg(search, kind);

        let projector = Projector::new(&arena, &cache, roots);
        let mut tree = projector
            .to_caller(kind, CallerSelection::MinScalar)
            .unwrap();
        tree.set_target_value(GraphValue::Enum("USERS".to_string()));
        insta::assert_snapshot!(tree, @"query search { search(kind: USERS, first: 10) { total } }");
    }

    #[test]
    fn cycles_are_cut_instead_of_recursing() {
        let (mut arena, mut cache, roots) = fixture();
        let user = arena.alloc(Object {
            name: "user".to_string(),
            type_ref: TypeRef::named("User", TypeKind::Object),
            parent: Some(roots.query),
            template: Some(OperationKind::Query),
            ..Object::default()
        });
        arena.add_field(roots.query, user);
        let friends = arena.alloc(Object {
            name: "friends".to_string(),
            type_ref: TypeRef::parse("[User]", TypeKind::Object),
            parent: Some(user),
            ..Object::default()
        });
        arena.add_field(user, friends);
        // User is its own canonical type object: rendering must terminate.
        cache.insert("User".to_string(), user);

        let projector = Projector::new(&arena, &cache, roots);
        let tree = projector.to_root(friends).unwrap();
        let rendered = tree.to_string();
        assert!(rendered.starts_with("query user { user { friends"));
    }
}
