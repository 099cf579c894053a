use std::fmt::{self, Display};
use std::ops::{Index, IndexMut};

use crate::type_ref::{TypeKind, TypeRef};
use crate::value::GraphValue;

/// Stable handle into an [`ObjectArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => f.write_str("query"),
            OperationKind::Mutation => f.write_str("mutation"),
        }
    }
}

/// A node in the discovered graph. Depending on its position it models a
/// type definition, a field or argument occurrence, or an input field.
///
/// Exactly one of `parent` and `caller` may be set: a node reached through
/// `parent` renders in selection position, one reached through `caller`
/// renders in argument position.
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub name: String,
    pub description: Option<String>,
    pub type_ref: TypeRef,
    pub fields: Vec<ObjectId>,
    pub args: Vec<ObjectId>,
    pub possible_values: Vec<ObjectId>,
    pub parent: Option<ObjectId>,
    pub caller: Option<ObjectId>,
    /// Set on root-level operations so they can render as a standalone
    /// query or mutation document.
    pub template: Option<OperationKind>,
    /// Explicit literal used instead of a generated one when rendering
    /// this node in argument position.
    pub value_override: Option<GraphValue>,
    /// Default recorded from a seed schema, lowest-precedence value source.
    pub default_value: Option<GraphValue>,
}

impl Object {
    pub fn named(name: impl Into<String>) -> Object {
        Object {
            name: name.into(),
            ..Object::default()
        }
    }

    pub fn with_type(name: impl Into<String>, type_ref: TypeRef) -> Object {
        Object {
            name: name.into(),
            type_ref,
            ..Object::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct ObjectArena {
    nodes: Vec<Object>,
}

impl ObjectArena {
    pub fn new() -> ObjectArena {
        ObjectArena::default()
    }

    pub fn alloc(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.nodes.len());
        self.nodes.push(object);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds `child` to `parent`'s fields unless a field of the same name is
    /// already present. Returns whether the child was added.
    pub fn add_field(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        if self.field_named(parent, &self[child].name).is_some() {
            return false;
        }
        self.nodes[parent.0].fields.push(child);
        true
    }

    /// Same contract as [`ObjectArena::add_field`], for arguments.
    pub fn add_arg(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        if self.arg_named(parent, &self[child].name).is_some() {
            return false;
        }
        self.nodes[parent.0].args.push(child);
        true
    }

    /// Same contract as [`ObjectArena::add_field`], for enum literals and
    /// union/interface variants.
    pub fn add_possible_value(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        if self.possible_value_named(parent, &self[child].name).is_some() {
            return false;
        }
        self.nodes[parent.0].possible_values.push(child);
        true
    }

    pub fn field_named(&self, id: ObjectId, name: &str) -> Option<ObjectId> {
        self[id].fields.iter().copied().find(|f| self[*f].name == name)
    }

    pub fn arg_named(&self, id: ObjectId, name: &str) -> Option<ObjectId> {
        self[id].args.iter().copied().find(|a| self[*a].name == name)
    }

    pub fn possible_value_named(&self, id: ObjectId, name: &str) -> Option<ObjectId> {
        self[id]
            .possible_values
            .iter()
            .copied()
            .find(|v| self[*v].name == name)
    }

    /// Copies `fields` and `possible_values` from `src` into `dst` while
    /// preserving `dst`'s identity (name, links, args, template). This is
    /// how a freshly discovered occurrence of a cached type picks up the
    /// type's structure.
    pub fn update_fields(&mut self, dst: ObjectId, src: ObjectId) {
        let fields = self[src].fields.clone();
        let possible_values = self[src].possible_values.clone();
        let node = &mut self.nodes[dst.0];
        node.fields = fields;
        node.possible_values = possible_values;
    }

    /// Sets the explicit value, coercing strings to bare enum literals when
    /// the node's type is an enum.
    pub fn set_value(&mut self, id: ObjectId, value: Option<GraphValue>) {
        let node = &mut self.nodes[id.0];
        node.value_override = match value {
            Some(GraphValue::String(s)) if node.type_ref.root_kind() == TypeKind::Enum => {
                Some(GraphValue::Enum(s))
            }
            other => other,
        };
    }

    /// Dotted path from the root to `id`, arguments shown in call syntax.
    /// Used for log lines only.
    pub fn path(&self, id: ObjectId) -> String {
        let mut segment = self[id].name.clone();
        let mut cur = id;
        loop {
            let node = &self[cur];
            match (node.parent, node.caller) {
                (Some(parent), _) => {
                    segment = format!("{}.{}", self[parent].name, segment);
                    cur = parent;
                }
                (None, Some(caller)) => {
                    segment = format!("{}({})", self[caller].name, segment);
                    cur = caller;
                }
                (None, None) => break,
            }
        }
        segment
    }
}

impl Index<ObjectId> for ObjectArena {
    type Output = Object;

    fn index(&self, id: ObjectId) -> &Object {
        &self.nodes[id.0]
    }
}

impl IndexMut<ObjectId> for ObjectArena {
    fn index_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_operations_are_idempotent_on_name() {
        let mut arena = ObjectArena::new();
        let user = arena.alloc(Object::named("User"));
        let name_a = arena.alloc(Object::named("name"));
        let name_b = arena.alloc(Object::named("name"));

        assert!(arena.add_field(user, name_a));
        assert!(!arena.add_field(user, name_b));
        assert_eq!(arena[user].fields.len(), 1);

        let arg_a = arena.alloc(Object::named("id"));
        let arg_b = arena.alloc(Object::named("id"));
        assert!(arena.add_arg(user, arg_a));
        assert!(!arena.add_arg(user, arg_b));
        assert_eq!(arena[user].args.len(), 1);

        let v_a = arena.alloc(Object::named("ADMIN"));
        let v_b = arena.alloc(Object::named("ADMIN"));
        assert!(arena.add_possible_value(user, v_a));
        assert!(!arena.add_possible_value(user, v_b));
        assert_eq!(arena[user].possible_values.len(), 1);
    }

    #[test]
    fn update_fields_preserves_identity() {
        let mut arena = ObjectArena::new();
        let canonical = arena.alloc(Object::named("User"));
        let field = arena.alloc(Object::named("name"));
        arena.add_field(canonical, field);

        let occurrence = arena.alloc(Object {
            name: "author".to_string(),
            type_ref: TypeRef::named("User", TypeKind::Object),
            ..Object::default()
        });
        let arg = arena.alloc(Object::named("id"));
        arena.add_arg(occurrence, arg);

        arena.update_fields(occurrence, canonical);
        assert_eq!(arena[occurrence].name, "author");
        assert_eq!(arena[occurrence].fields, vec![field]);
        assert_eq!(arena[occurrence].args, vec![arg]);
    }

    #[test]
    fn set_value_coerces_enum_strings() {
        let mut arena = ObjectArena::new();
        let kind = arena.alloc(Object::with_type(
            "kind",
            TypeRef::named("SearchKind", TypeKind::Enum),
        ));
        arena.set_value(kind, Some(GraphValue::String("USERS".to_string())));
        assert_eq!(
            arena[kind].value_override,
            Some(GraphValue::Enum("USERS".to_string()))
        );

        let plain = arena.alloc(Object::named("q"));
        arena.set_value(plain, Some(GraphValue::String("text".to_string())));
        assert_eq!(
            arena[plain].value_override,
            Some(GraphValue::String("text".to_string()))
        );
    }

    #[test]
    fn path_renders_args_in_call_syntax() {
        let mut arena = ObjectArena::new();
        let root = arena.alloc(Object::named("Query"));
        let search = arena.alloc(Object {
            name: "search".to_string(),
            parent: Some(root),
            ..Object::default()
        });
        let kind = arena.alloc(Object {
            name: "kind".to_string(),
            caller: Some(search),
            ..Object::default()
        });
        assert_eq!(arena.path(kind), "Query.search(kind)");
    }
}
