//! GraphQL object graph and probe plumbing.
//!
//! The model in this crate is built for reconnaissance, not execution: an
//! arena of [`object::Object`] nodes describes what has been learned about a
//! remote schema so far, [`projection`] turns a node into the smallest query
//! that reaches it, and [`client`] ships that query to the endpoint.

pub mod client;
pub mod introspection;
pub mod object;
pub mod projection;
pub mod type_ref;
pub mod value;

pub use client::{GraphQLError, GraphQLRequest, ProbeClient, ProbeResponse, ProbeTransport};
pub use object::{Object, ObjectArena, ObjectId, OperationKind};
pub use projection::{ProbeArg, ProbeNode, ProbeTree, Projector, Step};
pub use type_ref::{TypeKind, TypeRef};
pub use value::GraphValue;
