use specter_graphql::{ObjectId, TypeKind};

/// Where a discovery was made, which decides how it is folded into the
/// graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Field,
    Arg,
    ArgField,
    Enum,
    Interface,
}

/// What runners send back to the orchestrator. `subject` is the graph node
/// the probe was built around, not the discovery itself.
#[derive(Debug, Clone)]
pub enum DiscoveryResult {
    /// An identifier surfaced by a suggestion list or exact match.
    Fuzz {
        text: String,
        location: Location,
        subject: ObjectId,
    },
    /// A type learned for the subject.
    Type {
        type_string: String,
        kind: TypeKind,
        location: Location,
        subject: ObjectId,
    },
    /// A required argument or input field reported by the server.
    Required {
        text: String,
        type_string: String,
        location: Location,
        subject: ObjectId,
    },
}
