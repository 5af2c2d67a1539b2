//! The user's current position in the hierarchy.

use serde::{Deserialize, Serialize};

/// `{lob, subject, database, table}`; choosing a level clears every level
/// below it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPath {
    pub lob: Option<String>,
    pub subject: Option<String>,
    pub database: Option<String>,
    pub table: Option<String>,
}

impl SelectedPath {
    pub fn select_lob(&mut self, lob: impl Into<String>) {
        self.lob = Some(lob.into());
        self.subject = None;
        self.database = None;
        self.table = None;
    }

    pub fn select_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
        self.database = None;
        self.table = None;
    }

    pub fn select_database(&mut self, database: impl Into<String>) {
        self.database = Some(database.into());
        self.table = None;
    }

    pub fn select_table(&mut self, table: impl Into<String>) {
        self.table = Some(table.into());
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn with_lob(mut self, lob: impl Into<String>) -> Self {
        self.select_lob(lob);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.select_subject(subject);
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.select_database(database);
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.select_table(table);
        self
    }

    /// Number of leading levels that are set (0..=4).
    pub fn depth(&self) -> usize {
        [&self.lob, &self.subject, &self.database, &self.table]
            .iter()
            .take_while(|l| l.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.lob.is_none()
    }

    /// `"LOB > Subject > Database > Table"` over the set levels.
    pub fn breadcrumb(&self) -> String {
        [&self.lob, &self.subject, &self.database, &self.table]
            .iter()
            .map_while(|l| l.as_deref())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}
