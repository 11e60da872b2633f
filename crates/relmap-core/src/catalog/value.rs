//! Values merged into create, update, and delete statements.

use rkyv::{Archive, Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column-to-value payload attached to one kind of write operation.
///
/// Ordered by column name so generated statements are stable.
pub type OperationData = BTreeMap<String, OperationValue>;

/// A fixed value or an engine-evaluated marker for one column.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OperationValue {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Current timestamp (evaluated when the statement runs).
    CurrentTimestamp,
    /// Raw expression (evaluated when the statement runs).
    Expression(String),
}

impl OperationValue {
    /// Create a raw expression value.
    pub fn expression(expr: impl Into<String>) -> Self {
        OperationValue::Expression(expr.into())
    }

    /// True when the engine must evaluate this value at statement time.
    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            OperationValue::CurrentTimestamp | OperationValue::Expression(_)
        )
    }
}

impl From<bool> for OperationValue {
    fn from(v: bool) -> Self {
        OperationValue::Bool(v)
    }
}

impl From<i64> for OperationValue {
    fn from(v: i64) -> Self {
        OperationValue::Int(v)
    }
}

impl From<f64> for OperationValue {
    fn from(v: f64) -> Self {
        OperationValue::Float(v)
    }
}

impl From<&str> for OperationValue {
    fn from(v: &str) -> Self {
        OperationValue::String(v.to_string())
    }
}

impl From<String> for OperationValue {
    fn from(v: String) -> Self {
        OperationValue::String(v)
    }
}

impl From<Vec<u8>> for OperationValue {
    fn from(v: Vec<u8>) -> Self {
        OperationValue::Bytes(v)
    }
}

/// Build an [`OperationData`] map from column/value pairs.
pub fn operation_data<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> OperationData
where
    K: Into<String>,
    V: Into<OperationValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferred_values() {
        assert!(OperationValue::CurrentTimestamp.is_deferred());
        assert!(OperationValue::expression("now()").is_deferred());
        assert!(!OperationValue::Int(1).is_deferred());
        assert!(!OperationValue::Null.is_deferred());
    }

    #[test]
    fn test_operation_data_is_ordered() {
        let data = operation_data([("updated_by", "system"), ("archived", "no")]);
        let keys: Vec<_> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["archived", "updated_by"]);
    }

    #[test]
    fn test_json_shape() {
        let value: OperationValue = serde_json::from_str(r#""current_timestamp""#).unwrap();
        assert_eq!(value, OperationValue::CurrentTimestamp);

        let value: OperationValue = serde_json::from_str(r#"{"int": 7}"#).unwrap();
        assert_eq!(value, OperationValue::Int(7));
    }
}
