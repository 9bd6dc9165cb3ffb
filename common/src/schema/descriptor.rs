use crate::db::store::CatalogColumn;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// table and column metadata for one namespace, in catalog order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescriptor {
    namespace: String,
    tables: Vec<TableInfo>,
}

impl SchemaDescriptor {
    /// group catalog lines by table. a table keeps the position of its first
    /// column in the catalog, columns keep their catalog order.
    pub fn from_catalog(namespace: impl Into<String>, columns: Vec<CatalogColumn>) -> Self {
        let mut tables: Vec<TableInfo> = Vec::new();

        for col in columns {
            let column = ColumnInfo {
                name: col.column_name,
                data_type: col.data_type,
            };

            match tables.iter_mut().find(|t| t.name == col.table_name) {
                Some(table) => table.columns.push(column),
                None => tables.push(TableInfo {
                    name: col.table_name,
                    columns: vec![column],
                }),
            }
        }

        Self {
            namespace: namespace.into(),
            tables,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// plain-text form embedded in the synthesis prompt
    pub fn describe(&self) -> String {
        self.tables
            .iter()
            .map(|table| {
                let mut block = format!("Tabela: {}.{}", self.namespace, table.name);
                for column in &table.columns {
                    block.push_str(&format!("\n - {} ({})", column.name, column.data_type));
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
