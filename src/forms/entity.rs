use super::{BannerPolicy, DialogError, DialogMachine, ValidationError};
use crate::client::ApiClient;
use crate::model::{Created, NewColumn, NewTable};
use std::collections::HashSet;
use std::time::Duration;
use tracing::info;

pub const CREATED_MESSAGE: &str = "Table created successfully!";

/// Column types offered by the type picker.
pub const DATA_TYPES: [&str; 13] = [
    "STRING",
    "INT",
    "BIGINT",
    "FLOAT",
    "DOUBLE",
    "BOOLEAN",
    "DATE",
    "TIMESTAMP",
    "DECIMAL(10,2)",
    "BINARY",
    "ARRAY<type>",
    "MAP<key_type,value_type>",
    "STRUCT<col:type,...>",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDraft {
    pub name: String,
    pub data_type: String,
    pub primary: bool,
    pub required: bool,
    pub auto_increment: bool,
    pub default_value: Option<String>,
}

impl ColumnDraft {
    /// The `id INTEGER` key every new table starts with.
    pub fn id() -> Self {
        Self {
            name: "id".to_string(),
            data_type: "INTEGER".to_string(),
            primary: true,
            required: true,
            auto_increment: true,
            default_value: None,
        }
    }

    pub fn blank() -> Self {
        Self {
            name: String::new(),
            data_type: "VARCHAR(255)".to_string(),
            primary: false,
            required: false,
            auto_increment: false,
            default_value: None,
        }
    }

    fn definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.data_type);
        if self.required {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_value.as_deref().filter(|d| !d.is_empty()) {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        def
    }
}

/// Add Entity: draft a table definition and create it in a logical
/// database. The diagram is reloaded by the caller afterwards.
pub struct AddEntityDialog {
    pub table_name: String,
    pub schema_name: String,
    database_id: i64,
    columns: Vec<ColumnDraft>,
    machine: DialogMachine,
}

impl AddEntityDialog {
    pub fn new(database_id: i64) -> Self {
        Self {
            table_name: String::new(),
            schema_name: String::new(),
            database_id,
            columns: vec![ColumnDraft::id()],
            machine: DialogMachine::new(BannerPolicy::ADD_ENTITY),
        }
    }

    pub fn machine(&self) -> &DialogMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut DialogMachine {
        &mut self.machine
    }

    pub fn columns(&self) -> &[ColumnDraft] {
        &self.columns
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut ColumnDraft> {
        self.columns.get_mut(index)
    }

    pub fn add_column(&mut self) {
        self.columns.push(ColumnDraft::blank());
    }

    /// The last remaining column cannot be removed.
    pub fn remove_column(&mut self, index: usize) -> bool {
        if self.columns.len() <= 1 || index >= self.columns.len() {
            return false;
        }
        self.columns.remove(index);
        true
    }

    pub fn reset(&mut self) {
        self.table_name.clear();
        self.schema_name.clear();
        self.columns = vec![ColumnDraft::id()];
    }

    /// `CREATE TABLE` statement for the current draft.
    pub fn ddl_preview(&self) -> String {
        let name = if self.schema_name.trim().is_empty() {
            self.table_name.trim().to_string()
        } else {
            format!("{}.{}", self.schema_name.trim(), self.table_name.trim())
        };
        let defs = self
            .columns
            .iter()
            .map(ColumnDraft::definition)
            .collect::<Vec<_>>()
            .join(",\n  ");
        format!("CREATE TABLE {name} (\n  {defs}\n);")
    }

    pub fn validate(&self) -> Result<NewTable, ValidationError> {
        if self.table_name.trim().is_empty() || self.schema_name.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        let mut seen = HashSet::new();
        for col in &self.columns {
            let name = col.name.trim();
            if name.is_empty() || col.data_type.trim().is_empty() {
                return Err(ValidationError::MissingFields);
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(ValidationError::DuplicateColumn(name.to_string()));
            }
        }
        Ok(NewTable {
            table_name: self.table_name.trim().to_string(),
            schema_name: self.schema_name.trim().to_string(),
            database_id: self.database_id,
            columns: self
                .columns
                .iter()
                .map(|c| NewColumn {
                    name: c.name.trim().to_string(),
                    data_type: c.data_type.clone(),
                    primary: c.primary,
                    required: c.required,
                    auto_increment: c.auto_increment,
                    default_value: c.default_value.clone().filter(|d| !d.is_empty()),
                })
                .collect(),
        })
    }

    pub async fn submit<N>(&mut self, client: &ApiClient, now: N) -> Result<Created, DialogError>
    where
        N: Fn() -> Duration,
    {
        self.machine.begin()?;
        let body = self.machine.validated(self.validate(), now())?;
        let created = client.create_table(&body).await;
        let created = self.machine.finish(created, CREATED_MESSAGE, now())?;
        info!(table = %body.table_name, schema = %body.schema_name, "table created");
        self.reset();
        Ok(created)
    }

    pub fn tick(&mut self, now: Duration) {
        self.machine.tick(now);
    }
}
