//! Create dialogs and the state machine they share.
//!
//! `Idle → Validating → Submitting → Success → Closed`, or
//! `… → Error → Idle` once the banner is dismissed. Banner timers are
//! deadlines held in the phase itself; [`DialogMachine::tick`] fires them,
//! so closing a dialog drops its pending timers with it.

pub mod diagram;
pub mod entity;
pub mod relationship;

use crate::client::{ApiClient, ClientError};
use crate::model::{Cardinality, RelationshipType, TableId};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub use diagram::{AddDiagramRelationshipDialog, AddErDiagramDialog};
pub use entity::AddEntityDialog;
pub use relationship::AddRelationshipDialog;

/// Client-side rejections, raised before any request is sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all required fields")]
    MissingFields,
    #[error("Cannot select the same table for both sides")]
    SameTable,
    #[error("A relationship between these tables and columns already exists")]
    Duplicate,
    #[error("Column names must be unique: {0}")]
    DuplicateColumn(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("a request is already in flight")]
    Busy,
    #[error("dialog is closed")]
    Closed,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("{0}")]
    Server(String),
}

impl From<ClientError> for DialogError {
    fn from(e: ClientError) -> Self {
        DialogError::Server(e.user_message())
    }
}

/// How long each banner stays up. `None` means sticky until dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerPolicy {
    pub success_close: Duration,
    pub validation_dismiss: Option<Duration>,
    pub server_dismiss: Option<Duration>,
}

impl BannerPolicy {
    pub const ADD_RELATIONSHIP: Self = Self {
        success_close: Duration::from_millis(1500),
        validation_dismiss: Some(Duration::from_secs(7)),
        server_dismiss: Some(Duration::from_secs(7)),
    };

    pub const ADD_ER_DIAGRAM: Self = Self {
        success_close: Duration::from_millis(1200),
        validation_dismiss: None,
        server_dismiss: None,
    };

    pub const ADD_DIAGRAM_RELATIONSHIP: Self = Self {
        success_close: Duration::from_secs(2),
        validation_dismiss: Some(Duration::from_secs(5)),
        server_dismiss: None,
    };

    pub const ADD_ENTITY: Self = Self {
        success_close: Duration::from_millis(1500),
        validation_dismiss: Some(Duration::from_secs(5)),
        server_dismiss: Some(Duration::from_secs(5)),
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Validation,
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogPhase {
    Idle,
    Validating,
    Submitting,
    Success {
        message: String,
        close_at: Duration,
    },
    Error {
        message: String,
        source: ErrorSource,
        dismiss_at: Option<Duration>,
    },
    Closed,
}

/// Fired by [`DialogMachine::tick`] when a deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogEvent {
    Dismissed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Banner<'a> {
    pub kind: BannerKind,
    pub message: &'a str,
}

#[derive(Debug, Clone)]
pub struct DialogMachine {
    phase: DialogPhase,
    policy: BannerPolicy,
}

impl DialogMachine {
    pub fn new(policy: BannerPolicy) -> Self {
        Self {
            phase: DialogPhase::Idle,
            policy,
        }
    }

    pub fn phase(&self) -> &DialogPhase {
        &self.phase
    }

    pub fn policy(&self) -> BannerPolicy {
        self.policy
    }

    /// Controls are disabled while validating or submitting.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, DialogPhase::Validating | DialogPhase::Submitting)
    }

    pub fn is_closed(&self) -> bool {
        self.phase == DialogPhase::Closed
    }

    pub fn banner(&self) -> Option<Banner<'_>> {
        match &self.phase {
            DialogPhase::Success { message, .. } => Some(Banner {
                kind: BannerKind::Success,
                message: message.as_str(),
            }),
            DialogPhase::Error { message, .. } => Some(Banner {
                kind: BannerKind::Error,
                message: message.as_str(),
            }),
            _ => None,
        }
    }

    /// Start a submission. A visible error banner is replaced.
    pub fn begin(&mut self) -> Result<(), DialogError> {
        match self.phase {
            DialogPhase::Idle | DialogPhase::Error { .. } => {
                self.phase = DialogPhase::Validating;
                Ok(())
            }
            DialogPhase::Closed => Err(DialogError::Closed),
            _ => Err(DialogError::Busy),
        }
    }

    pub fn reject(&mut self, error: &ValidationError, now: Duration) {
        self.phase = DialogPhase::Error {
            message: error.to_string(),
            source: ErrorSource::Validation,
            dismiss_at: self.policy.validation_dismiss.map(|d| now + d),
        };
    }

    pub fn submit(&mut self) {
        self.phase = DialogPhase::Submitting;
    }

    pub fn succeed(&mut self, message: impl Into<String>, now: Duration) {
        self.phase = DialogPhase::Success {
            message: message.into(),
            close_at: now + self.policy.success_close,
        };
    }

    pub fn fail(&mut self, message: impl Into<String>, now: Duration) {
        self.phase = DialogPhase::Error {
            message: message.into(),
            source: ErrorSource::Server,
            dismiss_at: self.policy.server_dismiss.map(|d| now + d),
        };
    }

    /// Close button on the error banner.
    pub fn dismiss(&mut self) {
        if matches!(self.phase, DialogPhase::Error { .. }) {
            self.phase = DialogPhase::Idle;
        }
    }

    pub fn close(&mut self) {
        self.phase = DialogPhase::Closed;
    }

    pub fn tick(&mut self, now: Duration) -> Option<DialogEvent> {
        match &self.phase {
            DialogPhase::Success { close_at, .. } if now >= *close_at => {
                self.phase = DialogPhase::Closed;
                Some(DialogEvent::Closed)
            }
            DialogPhase::Error {
                dismiss_at: Some(at),
                ..
            } if now >= *at => {
                self.phase = DialogPhase::Idle;
                Some(DialogEvent::Dismissed)
            }
            _ => None,
        }
    }

    /// Run a validation result through the machine: on success the phase
    /// moves to submitting, on failure the rejection banner goes up.
    fn validated<T>(
        &mut self,
        result: Result<T, ValidationError>,
        now: Duration,
    ) -> Result<T, DialogError> {
        match result {
            Ok(value) => {
                self.submit();
                Ok(value)
            }
            Err(e) => {
                self.reject(&e, now);
                Err(e.into())
            }
        }
    }

    fn finish<T>(
        &mut self,
        result: Result<T, ClientError>,
        success: &str,
        now: Duration,
    ) -> Result<T, DialogError> {
        match result {
            Ok(value) => {
                self.succeed(success, now);
                Ok(value)
            }
            Err(e) => {
                let message = e.user_message();
                warn!(error = %e, "submission failed");
                self.fail(message.clone(), now);
                Err(DialogError::Server(message))
            }
        }
    }
}

/// Loading flags for the two column pickers; each side loads on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnLoading {
    pub from: bool,
    pub to: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    From,
    To,
}

/// Table/column/cardinality picks shared by the relationship dialogs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipDraft {
    pub from_table: Option<TableId>,
    pub from_column: Option<String>,
    pub to_table: Option<TableId>,
    pub to_column: Option<String>,
    pub cardinality: Option<Cardinality>,
    pub relationship_type: RelationshipType,
    from_columns: Vec<String>,
    to_columns: Vec<String>,
    loading: ColumnLoading,
}

impl RelationshipDraft {
    pub fn loading(&self) -> ColumnLoading {
        self.loading
    }

    pub fn columns(&self, side: Side) -> &[String] {
        match side {
            Side::From => &self.from_columns,
            Side::To => &self.to_columns,
        }
    }

    /// Pick a table for one side. The column pick for that side is reset
    /// and its column list must be reloaded. Picking the table already
    /// chosen on the other side is refused.
    pub fn select_table(&mut self, side: Side, table: TableId) -> Result<(), ValidationError> {
        let other = match side {
            Side::From => &self.to_table,
            Side::To => &self.from_table,
        };
        if other.as_ref() == Some(&table) {
            return Err(ValidationError::SameTable);
        }
        match side {
            Side::From => {
                self.from_table = Some(table);
                self.from_column = None;
                self.from_columns.clear();
                self.loading.from = true;
            }
            Side::To => {
                self.to_table = Some(table);
                self.to_column = None;
                self.to_columns.clear();
                self.loading.to = true;
            }
        }
        Ok(())
    }

    pub fn select_column(&mut self, side: Side, column: impl Into<String>) {
        match side {
            Side::From => self.from_column = Some(column.into()),
            Side::To => self.to_column = Some(column.into()),
        }
    }

    /// Store a column list for one side. A list for a table that is no
    /// longer selected is ignored.
    pub fn columns_loaded(
        &mut self,
        side: Side,
        table: &TableId,
        result: Result<Vec<String>, ClientError>,
    ) -> Result<(), ClientError> {
        let (current, columns, loading) = match side {
            Side::From => (&self.from_table, &mut self.from_columns, &mut self.loading.from),
            Side::To => (&self.to_table, &mut self.to_columns, &mut self.loading.to),
        };
        if current.as_ref() != Some(table) {
            return Ok(());
        }
        *loading = false;
        match result {
            Ok(list) => {
                *columns = list;
                Ok(())
            }
            Err(e) => {
                warn!(table_id = %table, error = %e, "failed to load columns");
                columns.clear();
                Err(e)
            }
        }
    }

    /// Fetch column lists for every side whose list is pending, both
    /// requests in flight at once.
    pub async fn load_columns(&mut self, client: &ApiClient) -> Result<(), ClientError> {
        let from = self.from_table.clone().filter(|_| self.loading.from);
        let to = self.to_table.clone().filter(|_| self.loading.to);

        let (from_result, to_result) = futures::join!(
            async {
                match &from {
                    Some(id) => Some(client.table_attributes(id).await),
                    None => None,
                }
            },
            async {
                match &to {
                    Some(id) => Some(client.table_attributes(id).await),
                    None => None,
                }
            }
        );

        let mut first_error = None;
        if let (Some(id), Some(result)) = (&from, from_result) {
            if let Err(e) = self.columns_loaded(Side::From, id, result) {
                first_error.get_or_insert(e);
            }
        }
        if let (Some(id), Some(result)) = (&to, to_result) {
            if let Err(e) = self.columns_loaded(Side::To, id, result) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Every field present and the two tables distinct.
    pub fn complete(&self) -> Result<CompleteDraft, ValidationError> {
        let (Some(from_table), Some(from_column), Some(to_table), Some(to_column), Some(cardinality)) = (
            self.from_table.clone(),
            self.from_column.clone().filter(|c| !c.trim().is_empty()),
            self.to_table.clone(),
            self.to_column.clone().filter(|c| !c.trim().is_empty()),
            self.cardinality,
        ) else {
            return Err(ValidationError::MissingFields);
        };
        if from_table == to_table {
            return Err(ValidationError::SameTable);
        }
        Ok(CompleteDraft {
            from_table,
            from_column,
            to_table,
            to_column,
            cardinality,
            relationship_type: self.relationship_type,
        })
    }
}

/// A draft that passed [`RelationshipDraft::complete`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteDraft {
    pub from_table: TableId,
    pub from_column: String,
    pub to_table: TableId,
    pub to_column: String,
    pub cardinality: Cardinality,
    pub relationship_type: RelationshipType,
}
