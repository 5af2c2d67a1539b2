//! Wire-level view models shared by the client, projector and dialogs.
//!
//! Every type here is owned by whichever view fetched it; nothing is cached
//! across screens.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Table identifier as issued by the backend.
///
/// The backend emits ids as JSON numbers in listings but the UI posts them
/// back as strings, so both forms decode to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TableId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for TableId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for TableId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => TableId(n.to_string()),
            Raw::Str(s) => TableId(s),
        })
    }
}

/// One end of a relationship as drawn on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    One,
    Many,
}

impl Multiplicity {
    pub fn marker_id(&self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Many => "many",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    pub const ALL: [Cardinality; 4] = [
        Self::OneToOne,
        Self::OneToMany,
        Self::ManyToOne,
        Self::ManyToMany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToOne => "many-to-one",
            Self::ManyToMany => "many-to-many",
        }
    }

    /// Accepts `one-to-many`, `One - to - Many`, `one_to_many` and `1:N`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if c == '_' { '-' } else { c.to_ascii_lowercase() })
            .collect();

        match normalized.as_str() {
            "one-to-one" | "1:1" => Some(Self::OneToOne),
            "one-to-many" | "1:n" => Some(Self::OneToMany),
            "many-to-one" | "n:1" => Some(Self::ManyToOne),
            "many-to-many" | "n:n" | "n:m" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    /// (source end, target end)
    pub fn ends(&self) -> (Multiplicity, Multiplicity) {
        match self {
            Self::OneToOne => (Multiplicity::One, Multiplicity::One),
            Self::OneToMany => (Multiplicity::One, Multiplicity::Many),
            Self::ManyToOne => (Multiplicity::Many, Multiplicity::One),
            Self::ManyToMany => (Multiplicity::Many, Multiplicity::Many),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Cardinality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Cardinality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Cardinality::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown cardinality: {raw}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    #[default]
    ForeignKey,
    Reference,
    Association,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForeignKey => "foreign_key",
            Self::Reference => "reference",
            Self::Association => "association",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "foreign_key" => Some(Self::ForeignKey),
            "reference" => Some(Self::Reference),
            "association" => Some(Self::Association),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
    #[serde(default, alias = "primaryKey", alias = "primary")]
    pub primary_key: bool,
    #[serde(default, alias = "foreignKey")]
    pub foreign_key: Option<ForeignKeyRef>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    #[serde(alias = "table_name")]
    pub name: String,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub database_name: Option<String>,
    /// Column names in declaration order.
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default, alias = "rowCount")]
    pub row_count: Option<u64>,
}

impl Table {
    pub fn new(id: impl Into<TableId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            schema_name: None,
            database_name: None,
            attributes: Vec::new(),
            columns: Vec::new(),
            row_count: None,
        }
    }

    /// Stand-in for a table whose metadata could not be resolved.
    pub fn placeholder(id: &TableId) -> Self {
        Self::new(id.clone(), format!("Table {id}"))
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Attribute names, falling back to detailed column metadata.
    pub fn attribute_names(&self) -> Vec<&str> {
        if !self.attributes.is_empty() {
            self.attributes.iter().map(String::as_str).collect()
        } else {
            self.columns.iter().map(|c| c.name.as_str()).collect()
        }
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.name == column && c.primary_key)
    }

    pub fn is_foreign_key(&self, column: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.name == column && c.foreign_key.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub id: Option<i64>,
    pub from_table_id: TableId,
    pub from_column: String,
    pub to_table_id: TableId,
    pub to_column: String,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub relationship_type: RelationshipType,
}

impl Relationship {
    /// `"{from} → {to} ({cardinality})"`
    pub fn label_line(&self) -> String {
        format!(
            "{} → {} ({})",
            self.from_column, self.to_column, self.cardinality
        )
    }

    pub fn is_self_referencing(&self) -> bool {
        self.from_table_id == self.to_table_id
    }

    /// True when both rows link the same columns, in either direction.
    /// On a self-referencing table the mirrored pair is a different link
    /// (`manager_id → id` vs `id → manager_id`), so only the forward match
    /// counts there.
    pub fn links_same_columns(&self, other: &Relationship) -> bool {
        let forward = self.from_table_id == other.from_table_id
            && self.from_column == other.from_column
            && self.to_table_id == other.to_table_id
            && self.to_column == other.to_column;
        if forward {
            return true;
        }
        !self.is_self_referencing()
            && self.from_table_id == other.to_table_id
            && self.from_column == other.to_column
            && self.to_table_id == other.from_table_id
            && self.to_column == other.from_column
    }
}

/// Body of `POST /er_relationships`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelationship {
    pub from_table_id: TableId,
    pub from_column: String,
    pub to_table_id: TableId,
    pub to_column: String,
    pub cardinality: Cardinality,
    pub relationship_type: RelationshipType,
    pub database_name: String,
}

impl NewRelationship {
    pub fn to_relationship(&self, id: Option<i64>) -> Relationship {
        Relationship {
            id,
            from_table_id: self.from_table_id.clone(),
            from_column: self.from_column.clone(),
            to_table_id: self.to_table_id.clone(),
            to_column: self.to_column.clone(),
            cardinality: self.cardinality,
            relationship_type: self.relationship_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub primary: bool,
    pub required: bool,
    pub auto_increment: bool,
    pub default_value: Option<String>,
}

/// Body of `POST /tables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTable {
    pub table_name: String,
    pub schema_name: String,
    pub database_id: i64,
    pub columns: Vec<NewColumn>,
}

/// Body of `POST /create_er_diagram`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewErDiagram {
    pub er_diagram_name: String,
    pub lob: String,
    pub from_table_id: TableId,
    pub from_column: String,
    pub to_table_id: TableId,
    pub to_column: String,
    pub cardinality: Cardinality,
    pub relationship_type: RelationshipType,
}

/// Body of `POST /createER`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiagramRelationship {
    #[serde(rename = "er_entity_id")]
    pub er_entity_id: i64,
    pub lob: String,
    pub from_table_id: TableId,
    pub from_column: String,
    pub to_table_id: TableId,
    pub to_column: String,
    pub cardinality: Cardinality,
    pub relationship_type: RelationshipType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLob {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubjectArea {
    pub name: String,
    pub lob_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLogicalDatabase {
    pub name: String,
    pub subject_area_id: i64,
}

/// Generic acknowledgement returned by the create endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Created {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalDatabase {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub subject_area_id: Option<i64>,
}

/// A saved ER diagram belonging to a line of business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErEntity {
    pub id: i64,
    pub entity_name: String,
    #[serde(default)]
    pub lob_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Result discriminator for `/search`, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "LOB")]
    Lob,
    #[serde(rename = "Subject Area")]
    SubjectArea,
    #[serde(rename = "Database")]
    Database,
    #[serde(rename = "Table")]
    Table,
}

impl EntityKind {
    pub const ORDER: [EntityKind; 4] = [Self::Lob, Self::SubjectArea, Self::Database, Self::Table];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Lob => "LOB",
            Self::SubjectArea => "Subject Area",
            Self::Database => "Database",
            Self::Table => "Table",
        }
    }

    pub fn granularity(&self) -> &'static str {
        match self {
            Self::Lob => "Line of Business",
            other => other.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default)]
    pub lob: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

/// Body of `POST /profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub schema: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    pub table: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub row_count: Option<i64>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// Payload of `/schema-overview/{schema}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaOverview {
    pub schema: String,
    #[serde(default)]
    pub table_count: u64,
    #[serde(default)]
    pub schema_size_bytes: Option<u64>,
    #[serde(default)]
    pub schema_size_pretty: Option<String>,
    #[serde(default)]
    pub tablespace: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableStats>,
}

/// Human-readable byte count; `N/A` when unknown.
pub fn format_bytes(bytes: Option<u64>) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let Some(bytes) = bytes else {
        return "N/A".to_string();
    };
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else {
        format!("{:.2} GB", b / GB)
    }
}
