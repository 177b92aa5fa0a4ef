//! Mutating statements and their bound parameters.
//!
//! Statements are carried as text. The only checks done here are the ones
//! needed to classify a statement as a create or a write and to refuse
//! batches; everything else is validated by the network.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a mutating operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Creates a new table.
    Create,
    /// Writes to an existing table.
    Write,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Write => write!(f, "write"),
        }
    }
}

/// A primitive value bound to a positional `?` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    /// SQL `NULL`.
    Null,
    /// Boolean, stored by the network as 0 or 1.
    Bool(bool),
    /// 64-bit integer.
    Integer(i64),
    /// Floating point.
    Real(f64),
    /// Text.
    Text(String),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Integer(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

/// A single create or write statement.
///
/// Deserialization goes through the same checks as [`Statement::create`]
/// and [`Statement::write`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStatement")]
pub struct Statement {
    kind: OperationKind,
    sql: String,
}

impl Statement {
    /// A table-creating statement. Must start with `CREATE`.
    pub fn create(sql: impl Into<String>) -> Result<Self, StatementError> {
        Self::new(OperationKind::Create, sql.into())
    }

    /// A write against an existing table. Must not start with `CREATE`.
    pub fn write(sql: impl Into<String>) -> Result<Self, StatementError> {
        Self::new(OperationKind::Write, sql.into())
    }

    fn new(kind: OperationKind, sql: String) -> Result<Self, StatementError> {
        let trimmed = sql.trim().trim_end_matches(';').trim_end();
        if trimmed.is_empty() {
            return Err(StatementError::Empty);
        }
        if unquoted(trimmed).any(|c| c == ';') {
            return Err(StatementError::MultipleStatements);
        }

        let is_create = trimmed
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("create"));
        if is_create != (kind == OperationKind::Create) {
            return Err(StatementError::KindMismatch { expected: kind });
        }

        Ok(Self {
            kind,
            sql: trimmed.to_string(),
        })
    }

    /// Create or write.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Statement text, without a trailing `;`.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of positional `?` placeholders outside quoted literals.
    pub fn placeholder_count(&self) -> usize {
        unquoted(&self.sql).filter(|&c| c == '?').count()
    }

    /// Check that `params` fills every placeholder exactly once.
    pub fn check_params(&self, params: &[Param]) -> Result<(), StatementError> {
        let expected = self.placeholder_count();
        if expected != params.len() {
            return Err(StatementError::ParameterCount {
                expected,
                actual: params.len(),
            });
        }
        Ok(())
    }
}

/// Wire shape of a [`Statement`] before validation.
#[derive(Deserialize)]
struct RawStatement {
    kind: OperationKind,
    sql: String,
}

impl TryFrom<RawStatement> for Statement {
    type Error = StatementError;

    fn try_from(raw: RawStatement) -> Result<Self, Self::Error> {
        Self::new(raw.kind, raw.sql)
    }
}

/// Characters of `sql` outside `'...'` and `"..."` literals.
fn unquoted(sql: &str) -> impl Iterator<Item = char> + '_ {
    let mut quote: Option<char> = None;
    sql.chars().filter(move |&c| match quote {
        Some(q) => {
            if c == q {
                quote = None;
            }
            false
        }
        None if c == '\'' || c == '"' => {
            quote = Some(c);
            false
        }
        None => true,
    })
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Errors from statement construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatementError {
    /// Nothing but whitespace and `;`.
    #[error("Statement is empty")]
    Empty,

    /// An unquoted `;` separates two statements.
    #[error("Only a single statement may be submitted per operation")]
    MultipleStatements,

    /// A create where a write was expected, or the other way round.
    #[error("Statement is not a {expected} statement")]
    KindMismatch {
        /// The kind the caller asked for.
        expected: OperationKind,
    },

    /// A table name or prefix that cannot be interpolated safely.
    #[error("Invalid identifier {0:?}")]
    InvalidIdentifier(String),

    /// Bound parameters do not match the `?` placeholders.
    #[error("Statement has {expected} placeholders but {actual} parameters were bound")]
    ParameterCount {
        /// Placeholders outside literals.
        expected: usize,
        /// Parameters supplied.
        actual: usize,
    },
}
