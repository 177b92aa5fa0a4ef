//! Table naming, schema and row types.

use crate::{ContextId, ResourceId};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fully-qualified table name: `{prefix}_{context}_{resource}`.
///
/// The network appends the context and resource id to the caller's prefix
/// once a create operation is confirmed. The prefix may itself contain
/// underscores; only the last two segments are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    /// Caller-chosen prefix.
    pub prefix: String,
    /// Network the table lives on.
    pub context: ContextId,
    /// Network-assigned table id.
    pub resource: ResourceId,
}

impl TableName {
    /// Create a table name from its parts.
    pub fn new(prefix: impl Into<String>, context: ContextId, resource: ResourceId) -> Self {
        Self {
            prefix: prefix.into(),
            context,
            resource,
        }
    }

    /// Parse a full table name.
    pub fn parse(name: &str) -> Result<Self, TableNameError> {
        let mut parts = name.rsplitn(3, '_');
        let resource = parts.next().filter(|s| !s.is_empty());
        let context = parts.next().filter(|s| !s.is_empty());
        let prefix = parts.next();

        let (Some(resource), Some(context), Some(prefix)) = (resource, context, prefix) else {
            return Err(TableNameError::MissingSegments(name.to_string()));
        };

        let context = context
            .parse()
            .map(ContextId)
            .map_err(|_| TableNameError::InvalidContext(name.to_string()))?;
        let resource = resource
            .parse()
            .map_err(|_| TableNameError::InvalidResource(name.to_string()))?;

        Ok(Self::new(prefix, context, resource))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.prefix, self.context, self.resource)
    }
}

impl FromStr for TableName {
    type Err = TableNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors from [`TableName::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableNameError {
    /// Fewer than three `_`-separated segments.
    #[error("Table name {0:?} is not of the form prefix_context_id")]
    MissingSegments(String),

    /// Context segment is not a decimal integer.
    #[error("Table name {0:?} has a non-numeric context segment")]
    InvalidContext(String),

    /// Resource segment is not a decimal integer.
    #[error("Table name {0:?} has a non-numeric table id segment")]
    InvalidResource(String),
}

/// One column of a table schema, as reported by the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Declared column type (e.g. `integer`, `text`).
    #[serde(rename = "type")]
    pub column_type: String,
    /// Column constraints joined into one clause (e.g. `primary key`).
    #[serde(default)]
    pub constraints: Option<String>,
}

impl ColumnSpec {
    /// Create an unconstrained column.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            constraints: None,
        }
    }

    /// Attach a constraint clause.
    pub fn with_constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = Some(constraints.into());
        self
    }
}

/// A provisioned table.
///
/// Created once a create operation is confirmed. The schema is the one the
/// network reports after confirmation, not the one that was declared, and
/// is never re-derived afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Full table name used in statements.
    pub name: String,
    /// Network the table lives on.
    pub context: ContextId,
    /// Authoritative column list, in declaration order.
    pub schema: Vec<ColumnSpec>,
}

impl ResourceDescriptor {
    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A row of the demonstration table.
///
/// `id` is assigned by the network; `block` and `tx` are computed by the
/// network at write time and are never supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Auto-increment primary key.
    pub id: i64,
    /// Free-form name column.
    pub name: String,
    /// Block height the row was written at.
    #[serde(deserialize_with = "string_or_number")]
    pub block: String,
    /// Hash of the transaction that wrote the row.
    pub tx: String,
}

/// Gateways disagree on whether block heights are JSON numbers or strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}
