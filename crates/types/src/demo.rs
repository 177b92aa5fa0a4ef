//! Statements for the fixed demonstration schema.
//!
//! The demo table is `(id integer primary key, name text, block text, tx text)`.
//! `block` and `tx` are filled in by the network through `BLOCK_NUM()` and
//! `TXN_HASH()`; the client only ever supplies `name`.

use crate::{ColumnSpec, Param, Statement, StatementError};

/// Column definitions as declared in the create statement.
pub const DEMO_COLUMNS: &str = "id integer primary key, name text, block text, tx text";

/// The schema the demo create statement declares, in order.
pub fn declared_schema() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("id", "integer").with_constraints("primary key"),
        ColumnSpec::new("name", "text"),
        ColumnSpec::new("block", "text"),
        ColumnSpec::new("tx", "text"),
    ]
}

/// Whether `ident` is safe to interpolate as a table prefix or name.
///
/// Letters, digits and underscores only, not starting with a digit.
pub fn is_valid_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn checked(ident: &str) -> Result<&str, StatementError> {
    if is_valid_identifier(ident) {
        Ok(ident)
    } else {
        Err(StatementError::InvalidIdentifier(ident.to_string()))
    }
}

/// `CREATE TABLE {prefix} (...)` with the demo columns.
pub fn create_statement(prefix: &str) -> Result<Statement, StatementError> {
    let prefix = checked(prefix)?;
    Statement::create(format!("CREATE TABLE {prefix} ({DEMO_COLUMNS})"))
}

/// Insert one row; `name` is bound by [`insert_params`].
pub fn insert_statement(table: &str) -> Result<Statement, StatementError> {
    let table = checked(table)?;
    Statement::write(format!(
        "INSERT INTO {table} (name, block, tx) VALUES (?, BLOCK_NUM(), TXN_HASH())"
    ))
}

/// Parameters for [`insert_statement`].
pub fn insert_params(name: &str) -> Vec<Param> {
    vec![Param::from(name)]
}

/// The refresh query: every row in id order, optionally capped.
pub fn select_all(table: &str, limit: Option<u32>) -> String {
    match limit {
        Some(limit) => format!("SELECT * FROM {table} ORDER BY id LIMIT {limit}"),
        None => format!("SELECT * FROM {table} ORDER BY id"),
    }
}
