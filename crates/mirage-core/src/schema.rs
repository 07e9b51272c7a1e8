//! Schema snapshot types.
//!
//! A snapshot is captured once at setup time and handed to the model on every
//! request so that it can write queries against real table and column names.
//! Layout: schema name -> table name -> [`TableInfo`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nested map of schema -> table -> table description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaSnapshot(pub BTreeMap<String, BTreeMap<String, TableInfo>>);

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a table description.
    pub fn insert_table(&mut self, schema: impl Into<String>, table: impl Into<String>, info: TableInfo) {
        self.0.entry(schema.into()).or_default().insert(table.into(), info);
    }

    /// Look up a table description.
    pub fn table(&self, schema: &str, table: &str) -> Option<&TableInfo> {
        self.0.get(schema).and_then(|tables| tables.get(table))
    }

    /// Total number of tables across all schemas.
    pub fn table_count(&self) -> usize {
        self.0.values().map(|tables| tables.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pretty JSON rendering, used as model context.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Description of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references: ForeignKeyTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyTarget {
    pub schema: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_as_nested_map() {
        let mut snapshot = SchemaSnapshot::new();
        snapshot.insert_table(
            "public",
            "items",
            TableInfo {
                columns: vec![ColumnInfo {
                    name: "id".to_string(),
                    data_type: "integer".to_string(),
                    nullable: false,
                }],
                primary_keys: vec!["id".to_string()],
                ..Default::default()
            },
        );

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["public"]["items"]["columns"][0]["type"], "integer");
        assert_eq!(value["public"]["items"]["primary_keys"][0], "id");
        assert_eq!(snapshot.table_count(), 1);
        assert!(snapshot.table("public", "items").is_some());
    }
}
