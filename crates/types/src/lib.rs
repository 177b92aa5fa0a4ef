//! Core types for Tableflow.
//!
//! This crate holds the plain data model shared by every other crate:
//!
//! - **Identifiers**: [`ContextId`], [`ResourceId`], [`OperationHandle`]
//! - **Identity**: the signer-backed [`Identity`] a session operates as
//! - **Tables**: [`TableName`], [`ColumnSpec`], [`ResourceDescriptor`], [`Row`]
//! - **Statements**: [`Statement`], [`OperationKind`], [`Param`]
//!
//! Nothing in here performs I/O.

pub mod demo;
mod identifiers;
mod identity;
mod statement;
mod table;

pub use identifiers::{ContextId, HandleError, OperationHandle, ResourceId};
pub use identity::Identity;
pub use statement::{OperationKind, Param, Statement, StatementError};
pub use table::{ColumnSpec, ResourceDescriptor, Row, TableName, TableNameError};
