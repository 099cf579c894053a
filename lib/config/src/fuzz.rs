use std::fmt::{self, Display};
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings for the discovery engine itself.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FuzzConfig {
    /// Number of concurrent probe workers per fuzzing job.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Scopes to fuzz: `query`, `mutation`, or `query.someField` /
    /// `mutation.someField` to restrict discovery to a single operation.
    #[serde(default = "FuzzTarget::defaults")]
    pub targets: Vec<FuzzTarget>,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            targets: FuzzTarget::defaults(),
        }
    }
}

fn default_threads() -> usize {
    1
}

/// A scope selector of the form `{query|mutation}[.fieldName]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct FuzzTarget {
    pub operation: TargetOperation,
    pub field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetOperation {
    Query,
    Mutation,
}

impl FuzzTarget {
    pub fn defaults() -> Vec<FuzzTarget> {
        vec![
            FuzzTarget {
                operation: TargetOperation::Query,
                field: None,
            },
            FuzzTarget {
                operation: TargetOperation::Mutation,
                field: None,
            },
        ]
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid fuzz target {0:?}: expected query, mutation, query.<field> or mutation.<field>")]
pub struct FuzzTargetError(String);

impl FromStr for FuzzTarget {
    type Err = FuzzTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (root, field) = match s.split_once('.') {
            Some((root, field)) => (root, Some(field)),
            None => (s, None),
        };

        let operation = if root.eq_ignore_ascii_case("query") {
            TargetOperation::Query
        } else if root.eq_ignore_ascii_case("mutation") {
            TargetOperation::Mutation
        } else {
            return Err(FuzzTargetError(s.to_string()));
        };

        if matches!(field, Some(f) if f.is_empty()) {
            return Err(FuzzTargetError(s.to_string()));
        }

        Ok(FuzzTarget {
            operation,
            field: field.map(str::to_string),
        })
    }
}

impl TryFrom<String> for FuzzTarget {
    type Error = FuzzTargetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FuzzTarget> for String {
    fn from(value: FuzzTarget) -> Self {
        value.to_string()
    }
}

impl Display for FuzzTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = match self.operation {
            TargetOperation::Query => "query",
            TargetOperation::Mutation => "mutation",
        };
        match &self.field {
            Some(field) => write!(f, "{root}.{field}"),
            None => write!(f, "{root}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_scoped_targets() {
        let t: FuzzTarget = "query".parse().unwrap();
        assert_eq!(t.operation, TargetOperation::Query);
        assert_eq!(t.field, None);

        let t: FuzzTarget = "Mutation.createUser".parse().unwrap();
        assert_eq!(t.operation, TargetOperation::Mutation);
        assert_eq!(t.field.as_deref(), Some("createUser"));

        assert!("subscription".parse::<FuzzTarget>().is_err());
        assert!("query.".parse::<FuzzTarget>().is_err());
    }

    #[test]
    fn round_trips_display() {
        for raw in ["query", "mutation", "query.users"] {
            let t: FuzzTarget = raw.parse().unwrap();
            assert_eq!(t.to_string(), raw);
        }
    }
}
