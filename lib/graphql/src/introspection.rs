use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::object::{Object, ObjectArena, ObjectId};
use crate::type_ref::{TypeKind, TypeRef};
use crate::value::GraphValue;

/// The standard introspection query, sent verbatim by `schema introspect`.
pub const INTROSPECTION_QUERY: &str = r#"query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types {
      ...FullType
    }
    directives {
      name
      description
      locations
      args {
        ...InputValue
      }
    }
  }
}

fragment FullType on __Type {
  kind
  name
  description
  fields(includeDeprecated: true) {
    name
    description
    args {
      ...InputValue
    }
    type {
      ...TypeRef
    }
    isDeprecated
    deprecationReason
  }
  inputFields {
    ...InputValue
  }
  interfaces {
    ...TypeRef
  }
  enumValues(includeDeprecated: true) {
    name
    description
    isDeprecated
    deprecationReason
  }
  possibleTypes {
    ...TypeRef
  }
}

fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType {
                kind
                name
              }
            }
          }
        }
      }
    }
  }
}"#;

#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    #[error("introspection document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntrospectionResponse {
    pub data: IntrospectionData,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntrospectionData {
    #[serde(rename = "__schema")]
    pub schema: IntrospectionSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntrospectionSchema {
    #[serde(rename = "queryType", skip_serializing_if = "Option::is_none", default)]
    pub query_type: Option<RootTypeName>,
    #[serde(
        rename = "mutationType",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub mutation_type: Option<RootTypeName>,
    #[serde(default)]
    pub types: Vec<FullType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RootTypeName {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FullType {
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
    pub input_fields: Vec<InputValueDef>,
    pub interfaces: Vec<IntrospectionTypeRef>,
    pub enum_values: Vec<EnumValueDef>,
    pub possible_types: Vec<IntrospectionTypeRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub args: Vec<InputValueDef>,
    #[serde(rename = "type")]
    pub field_type: IntrospectionTypeRef,
    pub is_deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InputValueDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub value_type: IntrospectionTypeRef,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EnumValueDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

/// The `{kind, name, ofType}` wire form of a [`TypeRef`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IntrospectionTypeRef {
    pub kind: String,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of_type: Option<Box<IntrospectionTypeRef>>,
}

impl From<&TypeRef> for IntrospectionTypeRef {
    fn from(value: &TypeRef) -> Self {
        match value {
            TypeRef::Named { name, kind } => IntrospectionTypeRef {
                kind: kind.as_str().to_string(),
                name: Some(name.clone()),
                of_type: None,
            },
            TypeRef::NonNull(inner) => IntrospectionTypeRef {
                kind: TypeKind::NonNull.as_str().to_string(),
                name: None,
                of_type: Some(Box::new(inner.as_ref().into())),
            },
            TypeRef::List(inner) => IntrospectionTypeRef {
                kind: TypeKind::List.as_str().to_string(),
                name: None,
                of_type: Some(Box::new(inner.as_ref().into())),
            },
        }
    }
}

impl From<&IntrospectionTypeRef> for TypeRef {
    fn from(value: &IntrospectionTypeRef) -> Self {
        match (TypeKind::from_str_loose(&value.kind), &value.of_type) {
            (TypeKind::NonNull, Some(inner)) => TypeRef::NonNull(Box::new(inner.as_ref().into())),
            (TypeKind::List, Some(inner)) => TypeRef::List(Box::new(inner.as_ref().into())),
            (kind, _) => TypeRef::named(value.name.clone().unwrap_or_default(), kind),
        }
    }
}

/// What a previously saved introspection document contributes to a new run.
#[derive(Debug, Default)]
pub struct SeedSchema {
    pub type_map: HashMap<String, ObjectId>,
    pub query: Option<ObjectId>,
    pub mutation: Option<ObjectId>,
}

pub fn parse_document(raw: &str) -> Result<IntrospectionResponse, IntrospectionError> {
    Ok(serde_json::from_str(raw)?)
}

/// Loads a document into the arena: one object per type, with one level of
/// field/argument/value children each. Cross-type structure is shared at
/// projection time through the type map, so cyclic schemas need no special
/// handling here.
pub fn populate(arena: &mut ObjectArena, document: &IntrospectionResponse) -> SeedSchema {
    let mut seed = SeedSchema::default();
    let schema = &document.data.schema;

    for full_type in &schema.types {
        let kind = TypeKind::from_str_loose(&full_type.kind);
        let type_id = arena.alloc(Object {
            name: full_type.name.clone(),
            description: full_type.description.clone(),
            type_ref: TypeRef::named(&full_type.name, kind),
            ..Object::default()
        });

        for field in &full_type.fields {
            let field_id = arena.alloc(Object {
                name: field.name.clone(),
                description: field.description.clone(),
                type_ref: (&field.field_type).into(),
                parent: Some(type_id),
                ..Object::default()
            });
            arena.add_field(type_id, field_id);

            for arg in &field.args {
                let arg_id = arena.alloc(Object {
                    name: arg.name.clone(),
                    description: arg.description.clone(),
                    type_ref: (&arg.value_type).into(),
                    caller: Some(field_id),
                    default_value: arg.default_value.clone().map(raw_literal),
                    ..Object::default()
                });
                arena.add_arg(field_id, arg_id);
            }
        }

        for input_field in &full_type.input_fields {
            let field_id = arena.alloc(Object {
                name: input_field.name.clone(),
                description: input_field.description.clone(),
                type_ref: (&input_field.value_type).into(),
                parent: Some(type_id),
                default_value: input_field.default_value.clone().map(raw_literal),
                ..Object::default()
            });
            arena.add_field(type_id, field_id);
        }

        for enum_value in &full_type.enum_values {
            let value_id = arena.alloc(Object {
                name: enum_value.name.clone(),
                description: enum_value.description.clone(),
                ..Object::default()
            });
            arena.add_possible_value(type_id, value_id);
        }

        for possible in &full_type.possible_types {
            let type_ref: TypeRef = possible.into();
            let value_id = arena.alloc(Object {
                name: type_ref.root_name().to_string(),
                type_ref,
                ..Object::default()
            });
            arena.add_possible_value(type_id, value_id);
        }

        seed.type_map.insert(full_type.name.clone(), type_id);
    }

    let query_name = schema.query_type.as_ref().map(|t| t.name.as_str());
    let mutation_name = schema.mutation_type.as_ref().map(|t| t.name.as_str());
    for (name, id) in &seed.type_map {
        if Some(name.as_str()) == query_name || name.eq_ignore_ascii_case("query") {
            seed.query.get_or_insert(*id);
        }
        if Some(name.as_str()) == mutation_name || name.eq_ignore_ascii_case("mutation") {
            seed.mutation.get_or_insert(*id);
        }
    }

    seed
}

/// Introspection default values arrive as GraphQL literal text; rendering
/// them back verbatim keeps the literal intact.
fn raw_literal(text: String) -> GraphValue {
    GraphValue::Enum(text)
}

/// Assembles the synthetic introspection document from everything that was
/// discovered: the roots first, then every cached type not reachable from
/// them.
pub fn emit(
    arena: &ObjectArena,
    query: ObjectId,
    mutation: ObjectId,
    type_map: &HashMap<String, ObjectId>,
) -> IntrospectionResponse {
    let mut emitter = Emitter {
        arena,
        seen: HashSet::new(),
        types: Vec::new(),
    };

    emitter.walk(query, TypeKind::Object);
    emitter.walk(mutation, TypeKind::Object);

    let mut remaining: Vec<(&String, &ObjectId)> = type_map.iter().collect();
    remaining.sort_by(|a, b| a.0.cmp(b.0));
    for (_, id) in remaining {
        let kind = arena[*id].type_ref.root_kind();
        emitter.walk(*id, kind);
    }

    IntrospectionResponse {
        data: IntrospectionData {
            schema: IntrospectionSchema {
                query_type: Some(RootTypeName {
                    name: type_name(arena, query),
                }),
                mutation_type: Some(RootTypeName {
                    name: type_name(arena, mutation),
                }),
                types: emitter.types,
            },
        },
    }
}

fn type_name(arena: &ObjectArena, id: ObjectId) -> String {
    let root_name = arena[id].type_ref.root_name();
    if root_name.is_empty() {
        arena[id].name.clone()
    } else {
        root_name.to_string()
    }
}

struct Emitter<'a> {
    arena: &'a ObjectArena,
    seen: HashSet<String>,
    types: Vec<FullType>,
}

impl Emitter<'_> {
    fn walk(&mut self, id: ObjectId, kind: TypeKind) {
        let full_type = match kind {
            TypeKind::Enum => self.to_enum(id),
            TypeKind::InputObject => self.to_input_object(id),
            TypeKind::Scalar => self.to_scalar(id),
            TypeKind::Union => self.to_union(id),
            TypeKind::Interface => {
                let mut t = self.to_object(id);
                t.kind = TypeKind::Interface.as_str().to_string();
                t
            }
            _ => self.to_object(id),
        };

        let name = type_name(self.arena, id);
        if !self.seen.contains(&name) {
            self.seen.insert(name);
            self.types.push(full_type);

            for field in self.arena[id].fields.clone() {
                let field_kind = self.arena[field].type_ref.root_kind();
                self.walk(field, field_kind);
            }
        }

        for arg in self.arena[id].args.clone() {
            let arg_kind = self.arena[arg].type_ref.root_kind();
            self.walk(arg, arg_kind);
        }
        for value in self.arena[id].possible_values.clone() {
            let value_kind = self.arena[value].type_ref.root_kind();
            if value_kind != TypeKind::Unknown {
                self.walk(value, value_kind);
            }
        }
    }

    fn to_object(&self, id: ObjectId) -> FullType {
        let arena = self.arena;
        let fields = arena[id]
            .fields
            .iter()
            .map(|f| {
                let field = &arena[*f];
                FieldDef {
                    name: field.name.clone(),
                    description: field.description.clone(),
                    args: field
                        .args
                        .iter()
                        .map(|a| self.to_input_value(*a))
                        .collect(),
                    field_type: (&field.type_ref).into(),
                    is_deprecated: false,
                    deprecation_reason: None,
                }
            })
            .collect();

        FullType {
            kind: TypeKind::Object.as_str().to_string(),
            name: type_name(arena, id),
            description: arena[id].description.clone(),
            fields,
            ..FullType::default()
        }
    }

    fn to_input_object(&self, id: ObjectId) -> FullType {
        let input_fields = self.arena[id]
            .fields
            .iter()
            .map(|f| self.to_input_value(*f))
            .collect();

        FullType {
            kind: TypeKind::InputObject.as_str().to_string(),
            name: type_name(self.arena, id),
            description: self.arena[id].description.clone(),
            input_fields,
            ..FullType::default()
        }
    }

    fn to_input_value(&self, id: ObjectId) -> InputValueDef {
        let obj = &self.arena[id];
        InputValueDef {
            name: obj.name.clone(),
            description: obj.description.clone(),
            value_type: (&obj.type_ref).into(),
            default_value: obj.value_override.as_ref().map(|v| v.to_string()),
        }
    }

    fn to_scalar(&self, id: ObjectId) -> FullType {
        FullType {
            kind: TypeKind::Scalar.as_str().to_string(),
            name: type_name(self.arena, id),
            description: self.arena[id].description.clone(),
            ..FullType::default()
        }
    }

    fn to_enum(&self, id: ObjectId) -> FullType {
        let enum_values = self.arena[id]
            .possible_values
            .iter()
            .map(|v| EnumValueDef {
                name: self.arena[*v].name.clone(),
                description: self.arena[*v].description.clone(),
                is_deprecated: false,
                deprecation_reason: None,
            })
            .collect();

        FullType {
            kind: TypeKind::Enum.as_str().to_string(),
            name: type_name(self.arena, id),
            description: self.arena[id].description.clone(),
            enum_values,
            ..FullType::default()
        }
    }

    fn to_union(&self, id: ObjectId) -> FullType {
        let possible_types = self.arena[id]
            .possible_values
            .iter()
            .map(|v| (&self.arena[*v].type_ref).into())
            .collect();

        FullType {
            kind: TypeKind::Union.as_str().to_string(),
            name: type_name(self.arena, id),
            description: self.arena[id].description.clone(),
            possible_types,
            ..FullType::default()
        }
    }
}
