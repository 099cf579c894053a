use std::fmt::{self, Display};

/// The introspection kind of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeKind {
    Scalar,
    Object,
    InputObject,
    Interface,
    Union,
    Enum,
    List,
    NonNull,
    /// Not yet determined. Probes narrow this down over time.
    #[default]
    Unknown,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Scalar => "SCALAR",
            TypeKind::Object => "OBJECT",
            TypeKind::InputObject => "INPUT_OBJECT",
            TypeKind::Interface => "INTERFACE",
            TypeKind::Union => "UNION",
            TypeKind::Enum => "ENUM",
            TypeKind::List => "LIST",
            TypeKind::NonNull => "NON_NULL",
            TypeKind::Unknown => "UNKNOWN",
        }
    }

    pub fn from_str_loose(s: &str) -> TypeKind {
        match s {
            "SCALAR" => TypeKind::Scalar,
            "OBJECT" => TypeKind::Object,
            "INPUT_OBJECT" => TypeKind::InputObject,
            "INTERFACE" => TypeKind::Interface,
            "UNION" => TypeKind::Union,
            "ENUM" => TypeKind::Enum,
            "LIST" => TypeKind::List,
            "NON_NULL" => TypeKind::NonNull,
            _ => TypeKind::Unknown,
        }
    }
}

impl Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recursive type descriptor. `List` and `NonNull` always wrap an inner
/// ref; `Named` is a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named { name: String, kind: TypeKind },
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl Default for TypeRef {
    fn default() -> Self {
        TypeRef::Named {
            name: String::new(),
            kind: TypeKind::Unknown,
        }
    }
}

impl TypeRef {
    pub fn named(name: impl Into<String>, kind: TypeKind) -> TypeRef {
        TypeRef::Named {
            name: name.into(),
            kind,
        }
    }

    /// Parses the string form (`User`, `User!`, `[User]`, `[User!]!`, …).
    /// `kind` applies to the innermost named type.
    pub fn parse(input: &str, kind: TypeKind) -> TypeRef {
        if let Some(inner) = input.strip_suffix('!') {
            return TypeRef::NonNull(Box::new(TypeRef::parse(inner, kind)));
        }
        if let Some(inner) = input
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return TypeRef::List(Box::new(TypeRef::parse(inner, kind)));
        }

        TypeRef::named(input, kind)
    }

    /// The innermost type name.
    pub fn root_name(&self) -> &str {
        match self {
            TypeRef::Named { name, .. } => name,
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.root_name(),
        }
    }

    pub fn root_kind(&self) -> TypeKind {
        match self {
            TypeRef::Named { kind, .. } => *kind,
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.root_kind(),
        }
    }

    pub fn set_root_kind(&mut self, kind: TypeKind) {
        match self {
            TypeRef::Named { kind: k, .. } => *k = kind,
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.set_root_kind(kind),
        }
    }

    /// Whether the outermost wrapper is `NonNull`.
    pub fn is_required(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    pub fn is_scalar(&self) -> bool {
        self.root_kind() == TypeKind::Scalar
    }

    /// The wrapper kind of this level (`NON_NULL`, `LIST`, or the named kind).
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeRef::Named { kind, .. } => *kind,
            TypeRef::NonNull(_) => TypeKind::NonNull,
            TypeRef::List(_) => TypeKind::List,
        }
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named { name, .. } => f.write_str(name),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_display_round_trip() {
        for s in ["User", "User!", "[User]", "[User]!", "[User!]!", "[[Int]]"] {
            let parsed = TypeRef::parse(s, TypeKind::Object);
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn root_accessors_see_through_wrappers() {
        let t = TypeRef::parse("[SearchKind!]!", TypeKind::Enum);
        assert_eq!(t.root_name(), "SearchKind");
        assert_eq!(t.root_kind(), TypeKind::Enum);
        assert!(t.is_required());
        assert!(!t.is_scalar());

        let inner = TypeRef::parse("ID", TypeKind::Scalar);
        assert!(inner.is_scalar());
        assert!(!inner.is_required());
    }

    #[test]
    fn set_root_kind_rewrites_the_leaf() {
        let mut t = TypeRef::parse("[Status]", TypeKind::Object);
        t.set_root_kind(TypeKind::Enum);
        assert_eq!(t.root_kind(), TypeKind::Enum);
        assert_eq!(t.to_string(), "[Status]");
    }
}
