use super::{BannerPolicy, CompleteDraft, DialogError, DialogMachine, RelationshipDraft, ValidationError};
use crate::client::ApiClient;
use crate::ir::GraphIR;
use crate::model::{NewRelationship, Relationship};
use crate::projector::Projector;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

pub const CREATED_MESSAGE: &str = "Relationship created successfully!";

/// Add Relationship: link two columns of tables in the active database.
pub struct AddRelationshipDialog {
    pub draft: RelationshipDraft,
    database_name: String,
    machine: DialogMachine,
}

impl AddRelationshipDialog {
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            draft: RelationshipDraft::default(),
            database_name: database_name.into(),
            machine: DialogMachine::new(BannerPolicy::ADD_RELATIONSHIP),
        }
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn machine(&self) -> &DialogMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut DialogMachine {
        &mut self.machine
    }

    fn body(&self, draft: CompleteDraft) -> NewRelationship {
        NewRelationship {
            from_table_id: draft.from_table,
            from_column: draft.from_column,
            to_table_id: draft.to_table,
            to_column: draft.to_column,
            cardinality: draft.cardinality,
            relationship_type: draft.relationship_type,
            database_name: self.database_name.clone(),
        }
    }

    /// Best-effort duplicate check against the relationships already stored
    /// for the database. A failed lookup lets the submission through; the
    /// check and the create are separate requests and can race.
    async fn exists(&self, client: &ApiClient, candidate: &Relationship) -> bool {
        match client.relationships(&self.database_name).await {
            Ok(existing) => existing.iter().any(|r| r.links_same_columns(candidate)),
            Err(e) => {
                warn!(database = %self.database_name, error = %e, "duplicate check failed, continuing");
                false
            }
        }
    }

    /// Validate, check for a duplicate, create, then merge the new
    /// relationship into `graph` when one is on screen.
    ///
    /// `now` is read when each banner goes up so its deadline counts from
    /// the moment it is shown.
    pub async fn submit<G, N>(
        &mut self,
        client: &ApiClient,
        graph: Option<&mut GraphIR>,
        projector: &Projector,
        rng: &mut G,
        now: N,
    ) -> Result<Relationship, DialogError>
    where
        G: Rng + ?Sized,
        N: Fn() -> Duration,
    {
        self.machine.begin()?;
        let draft = self.machine.validated(self.draft.complete(), now())?;
        let body = self.body(draft);
        let candidate = body.to_relationship(None);

        if self.exists(client, &candidate).await {
            let e = ValidationError::Duplicate;
            self.machine.reject(&e, now());
            return Err(e.into());
        }

        let created = client.create_relationship(&body).await;
        let created = self.machine.finish(created, CREATED_MESSAGE, now())?;
        let rel = body.to_relationship(created.id);
        info!(
            from = %rel.from_table_id,
            to = %rel.to_table_id,
            id = ?rel.id,
            "relationship created"
        );

        if let Some(graph) = graph {
            projector
                .add_relationship(graph, rel.clone(), client, rng)
                .await;
        }
        Ok(rel)
    }

    pub fn tick(&mut self, now: Duration) {
        self.machine.tick(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::forms::{BannerKind, DialogPhase, Side};
    use crate::model::{Cardinality, RelationshipType, Table};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn zero() -> Duration {
        Duration::ZERO
    }

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&ClientConfig::new(format!("{}/api", server.uri()))).unwrap()
    }

    fn filled(dialog: &mut AddRelationshipDialog, from: &str, to: &str) {
        dialog.draft.select_table(Side::From, from.into()).unwrap();
        dialog.draft.select_table(Side::To, to.into()).unwrap();
        dialog.draft.select_column(Side::From, "customer_id");
        dialog.draft.select_column(Side::To, "id");
        dialog.draft.cardinality = Some(Cardinality::ManyToOne);
    }

    #[tokio::test]
    async fn test_same_table_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut dialog = AddRelationshipDialog::new("shop");
        dialog.draft.from_table = Some("1".into());
        dialog.draft.to_table = Some("1".into());
        dialog.draft.from_column = Some("a".into());
        dialog.draft.to_column = Some("b".into());
        dialog.draft.cardinality = Some(Cardinality::OneToOne);

        let mut rng = StdRng::seed_from_u64(0);
        let err = dialog
            .submit(&client(&server), None, &Projector::default(), &mut rng, zero)
            .await
            .unwrap_err();

        assert_eq!(err, DialogError::Invalid(ValidationError::SameTable));
        assert_eq!(
            dialog.machine().banner().unwrap().message,
            "Cannot select the same table for both sides"
        );
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut dialog = AddRelationshipDialog::new("shop");
        dialog.draft.select_table(Side::From, "1".into()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let err = dialog
            .submit(&client(&server), None, &Projector::default(), &mut rng, zero)
            .await
            .unwrap_err();
        assert_eq!(err, DialogError::Invalid(ValidationError::MissingFields));

        // banner clears itself after seven seconds
        dialog.tick(Duration::from_secs(7));
        assert_eq!(dialog.machine().phase(), &DialogPhase::Idle);
    }

    #[tokio::test]
    async fn test_duplicate_in_reverse_direction_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/er_relationships/shop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 3,
                "from_table_id": 1,
                "from_column": "id",
                "to_table_id": 2,
                "to_column": "customer_id",
                "cardinality": "one-to-many",
                "relationship_type": "foreign_key"
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/er_relationships"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let mut dialog = AddRelationshipDialog::new("shop");
        filled(&mut dialog, "2", "1");
        let mut rng = StdRng::seed_from_u64(0);
        let err = dialog
            .submit(&client(&server), None, &Projector::default(), &mut rng, zero)
            .await
            .unwrap_err();
        assert_eq!(err, DialogError::Invalid(ValidationError::Duplicate));
    }

    #[tokio::test]
    async fn test_create_merges_into_graph() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/er_relationships/shop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/er_relationships"))
            .and(body_json(json!({
                "from_table_id": "2",
                "from_column": "customer_id",
                "to_table_id": "1",
                "to_column": "id",
                "cardinality": "many-to-one",
                "relationship_type": "foreign_key",
                "database_name": "shop"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
            .expect(1)
            .mount(&server)
            .await;

        let catalog: HashMap<_, _> = [
            Table::new("1", "customers"),
            Table::new("2", "orders"),
        ]
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect();
        let projector = Projector::default();
        let existing = Relationship {
            id: Some(1),
            from_table_id: "1".into(),
            from_column: "id".into(),
            to_table_id: "2".into(),
            to_column: "order_owner".into(),
            cardinality: Cardinality::OneToMany,
            relationship_type: RelationshipType::ForeignKey,
        };
        let mut graph = projector.project(&[existing], &catalog).await;

        let mut dialog = AddRelationshipDialog::new("shop");
        filled(&mut dialog, "2", "1");
        let mut rng = StdRng::seed_from_u64(0);
        let rel = dialog
            .submit(
                &client(&server),
                Some(&mut graph),
                &projector,
                &mut rng,
                || Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(rel.id, Some(9));
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].label_lines().len(), 2);

        let banner = dialog.machine().banner().unwrap();
        assert_eq!(banner.kind, BannerKind::Success);
        assert_eq!(banner.message, CREATED_MESSAGE);
        dialog.tick(Duration::from_millis(2500));
        assert!(dialog.machine().is_closed());
    }

    #[tokio::test]
    async fn test_precheck_failure_still_creates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/er_relationships/shop"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/er_relationships"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 4})))
            .expect(1)
            .mount(&server)
            .await;

        let mut dialog = AddRelationshipDialog::new("shop");
        filled(&mut dialog, "2", "1");
        let mut rng = StdRng::seed_from_u64(0);
        let rel = dialog
            .submit(&client(&server), None, &Projector::default(), &mut rng, zero)
            .await
            .unwrap();
        assert_eq!(rel.id, Some(4));
    }

    #[tokio::test]
    async fn test_conflict_shows_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/er_relationships/shop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/er_relationships"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let mut dialog = AddRelationshipDialog::new("shop");
        filled(&mut dialog, "2", "1");
        let mut rng = StdRng::seed_from_u64(0);
        let err = dialog
            .submit(&client(&server), None, &Projector::default(), &mut rng, zero)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DialogError::Server(
                "A relationship already exists between these tables and columns.".into()
            )
        );
        assert!(!dialog.machine().is_busy());
    }
}
