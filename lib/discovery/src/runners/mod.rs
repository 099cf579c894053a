//! One runner per job kind. Runners fan probe workers out over tokio
//! tasks; every worker owns a clone of the probe tree and reports through
//! a bounded channel that the orchestrator drains to completion before it
//! touches the graph.

mod arg;
mod arg_type;
mod enums;
mod field;
mod field_type;
mod required;

pub(crate) use arg::ArgRunner;
pub(crate) use arg_type::ArgTypeRunner;
pub(crate) use enums::EnumRunner;
pub(crate) use field::FieldRunner;
pub(crate) use field_type::FieldTypeRunner;
pub(crate) use required::RequiredInputRunner;

/// Reserved identifiers that can never collide with a real schema name,
/// guaranteeing a predictable diagnostic.
pub const SENTINEL_FIELD: &str = "specter_field";
pub const SENTINEL_ARG: &str = "specter_arg";
pub const SENTINEL_ARG_FIELD: &str = "specter_arg_field";
pub const SENTINEL_ENUM: &str = "specter_enum";

pub(crate) const RESULT_CHANNEL_CAPACITY: usize = 64;

/// Strips the final character, respecting UTF-8 boundaries.
pub(crate) fn truncate_last(word: &str) -> String {
    let mut chars = word.chars();
    chars.next_back();
    chars.as_str().to_string()
}
