use super::{BannerPolicy, CompleteDraft, DialogError, DialogMachine, RelationshipDraft, ValidationError};
use crate::client::ApiClient;
use crate::model::{Created, ErEntity, NewDiagramRelationship, NewErDiagram, Relationship};
use std::time::Duration;
use tracing::{info, warn};

pub const DIAGRAM_CREATED: &str = "ER diagram created successfully!";
pub const RELATIONSHIP_CREATED: &str = "ER relationship created successfully!";

/// Add ER Diagram: name a new diagram under a line of business, seeded
/// with its first relationship.
pub struct AddErDiagramDialog {
    pub name: String,
    pub lob: String,
    pub draft: RelationshipDraft,
    machine: DialogMachine,
}

impl AddErDiagramDialog {
    pub fn new(lob: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            lob: lob.into(),
            draft: RelationshipDraft::default(),
            machine: DialogMachine::new(BannerPolicy::ADD_ER_DIAGRAM),
        }
    }

    pub fn machine(&self) -> &DialogMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut DialogMachine {
        &mut self.machine
    }

    pub fn validate(&self) -> Result<NewErDiagram, ValidationError> {
        if self.name.trim().is_empty() || self.lob.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        let draft = self.draft.complete()?;
        Ok(NewErDiagram {
            er_diagram_name: self.name.trim().to_string(),
            lob: self.lob.clone(),
            from_table_id: draft.from_table,
            from_column: draft.from_column,
            to_table_id: draft.to_table,
            to_column: draft.to_column,
            cardinality: draft.cardinality,
            relationship_type: draft.relationship_type,
        })
    }

    /// Create the diagram and append it to `entities`, the caller's list
    /// for this line of business.
    pub async fn submit<N>(
        &mut self,
        client: &ApiClient,
        entities: &mut Vec<ErEntity>,
        now: N,
    ) -> Result<Created, DialogError>
    where
        N: Fn() -> Duration,
    {
        self.machine.begin()?;
        let body = self.machine.validated(self.validate(), now())?;
        let created = client.create_er_diagram(&body).await;
        let created = self.machine.finish(created, DIAGRAM_CREATED, now())?;

        match created.id {
            Some(id) => {
                info!(id, name = %body.er_diagram_name, lob = %body.lob, "er diagram created");
                entities.push(ErEntity {
                    id,
                    entity_name: body.er_diagram_name,
                    lob_name: Some(body.lob),
                    created_at: created.created_at.clone(),
                });
            }
            None => warn!(name = %body.er_diagram_name, "create returned no id, list not updated"),
        }
        Ok(created)
    }

    pub fn tick(&mut self, now: Duration) {
        self.machine.tick(now);
    }
}

/// Add a relationship to an existing ER diagram.
pub struct AddDiagramRelationshipDialog {
    pub er_entity_id: Option<i64>,
    pub lob: String,
    pub draft: RelationshipDraft,
    machine: DialogMachine,
}

impl AddDiagramRelationshipDialog {
    pub fn new(lob: impl Into<String>) -> Self {
        Self {
            er_entity_id: None,
            lob: lob.into(),
            draft: RelationshipDraft::default(),
            machine: DialogMachine::new(BannerPolicy::ADD_DIAGRAM_RELATIONSHIP),
        }
    }

    pub fn machine(&self) -> &DialogMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut DialogMachine {
        &mut self.machine
    }

    pub fn validate(&self) -> Result<(i64, CompleteDraft), ValidationError> {
        let id = self.er_entity_id.ok_or(ValidationError::MissingFields)?;
        if self.lob.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        Ok((id, self.draft.complete()?))
    }

    pub async fn submit<N>(
        &mut self,
        client: &ApiClient,
        now: N,
    ) -> Result<Relationship, DialogError>
    where
        N: Fn() -> Duration,
    {
        self.machine.begin()?;
        let (er_entity_id, draft) = self.machine.validated(self.validate(), now())?;
        let body = NewDiagramRelationship {
            er_entity_id,
            lob: self.lob.clone(),
            from_table_id: draft.from_table,
            from_column: draft.from_column,
            to_table_id: draft.to_table,
            to_column: draft.to_column,
            cardinality: draft.cardinality,
            relationship_type: draft.relationship_type,
        };
        let created = client.create_diagram_relationship(&body).await;
        let created = self.machine.finish(created, RELATIONSHIP_CREATED, now())?;
        info!(er_entity_id, id = ?created.id, "er relationship created");

        Ok(Relationship {
            id: created.id,
            from_table_id: body.from_table_id,
            from_column: body.from_column,
            to_table_id: body.to_table_id,
            to_column: body.to_column,
            cardinality: body.cardinality,
            relationship_type: body.relationship_type,
        })
    }

    pub fn tick(&mut self, now: Duration) {
        self.machine.tick(now);
    }
}
