//! Gateway wire types.

use serde::Deserialize;
use tableflow_core::OperationStatus;
use tableflow_types::ColumnSpec;

/// Response from the receipt endpoint.
///
/// The gateway only answers once it has seen the transaction; an unseen
/// transaction is a 404.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub transaction_hash: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub block_number: Option<u64>,
    /// Table created by the transaction, as a decimal string.
    #[serde(default)]
    pub table_id: Option<String>,
    /// Set when the network refused the statement.
    #[serde(default)]
    pub error: Option<String>,
}

impl ReceiptResponse {
    /// Convert into the verifier's status shape.
    pub fn into_status(self) -> OperationStatus {
        OperationStatus {
            seen: true,
            success: self.error.is_none(),
            resource_id: self
                .table_id
                .as_deref()
                .and_then(|id| id.parse().ok()),
            block_number: self.block_number,
            error: self.error,
        }
    }
}

/// Response from the table endpoint.
#[derive(Debug, Deserialize)]
pub struct TableResponse {
    #[serde(default)]
    pub name: Option<String>,
    pub schema: SchemaResponse,
}

#[derive(Debug, Deserialize)]
pub struct SchemaResponse {
    pub columns: Vec<ColumnResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl From<ColumnResponse> for ColumnSpec {
    fn from(column: ColumnResponse) -> Self {
        let spec = ColumnSpec::new(column.name, column.column_type);
        if column.constraints.is_empty() {
            spec
        } else {
            spec.with_constraints(column.constraints.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableflow_types::ResourceId;

    #[test]
    fn test_receipt_success() {
        let receipt: ReceiptResponse = serde_json::from_str(
            r#"{"chainId":31337,"transactionHash":"0xabc","blockNumber":12,"tableId":"2"}"#,
        )
        .unwrap();
        assert_eq!(receipt.transaction_hash, "0xabc");
        assert_eq!(receipt.chain_id, Some(31337));

        let status = receipt.into_status();
        assert!(status.is_confirmed());
        assert_eq!(status.resource_id, Some(ResourceId(2)));
        assert_eq!(status.block_number, Some(12));
    }

    #[test]
    fn test_receipt_failure() {
        let receipt: ReceiptResponse = serde_json::from_str(
            r#"{"transactionHash":"0xabc","blockNumber":12,"error":"no such table: t_1_9"}"#,
        )
        .unwrap();
        let status = receipt.into_status();
        assert!(status.seen);
        assert!(!status.success);
        assert_eq!(status.error.as_deref(), Some("no such table: t_1_9"));
    }

    #[test]
    fn test_table_schema() {
        let table: TableResponse = serde_json::from_str(
            r#"{
                "name": "t_1_1",
                "schema": {
                    "columns": [
                        {"name": "id", "type": "integer", "constraints": ["PRIMARY KEY"]},
                        {"name": "name", "type": "text"}
                    ]
                }
            }"#,
        )
        .unwrap();
        let columns: Vec<ColumnSpec> = table.schema.columns.into_iter().map(Into::into).collect();
        assert_eq!(
            columns,
            vec![
                ColumnSpec::new("id", "integer").with_constraints("PRIMARY KEY"),
                ColumnSpec::new("name", "text"),
            ]
        );
    }
}
