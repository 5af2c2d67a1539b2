//! Per-screen data: fetch on mount or selection change, show a banner on
//! failure, re-issue the same request on Retry.

use crate::canvas::Canvas;
use crate::client::{ApiClient, ClientError};
use crate::forms::{AddRelationshipDialog, DialogError};
use crate::ir::GraphIR;
use crate::model::{Relationship, SchemaOverview, Table, TableId};
use crate::projector::{CatalogResolver, Projector, remove_relationship};
use crate::shell::ViewContext;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed {
        message: String,
    },
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Drive one request through `Loading` to its outcome.
    pub async fn run<F>(&mut self, request: F)
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        *self = Self::Loading;
        *self = match request.await {
            Ok(value) => Self::Loaded(value),
            Err(e) => {
                warn!(error = %e, "load failed");
                Self::Failed {
                    message: e.user_message(),
                }
            }
        };
    }
}

/// Which relationships a diagram shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramSource {
    Database {
        name: String,
        table: Option<TableId>,
    },
    ErDiagram {
        id: i64,
        table: Option<TableId>,
    },
}

impl DiagramSource {
    /// The logical database of the selection, if one is chosen.
    pub fn from_context(ctx: &ViewContext) -> Option<Self> {
        ctx.selected_path.database.as_ref().map(|name| Self::Database {
            name: name.clone(),
            table: None,
        })
    }

    fn database(&self) -> Option<&str> {
        match self {
            Self::Database { name, .. } => Some(name.as_str()),
            Self::ErDiagram { .. } => None,
        }
    }
}

/// ER diagram screen: relationships projected onto a canvas.
pub struct DiagramView {
    source: Option<DiagramSource>,
    state: LoadState<usize>,
    canvas: Canvas,
    projector: Projector,
}

impl DiagramView {
    pub fn new(width: f64, height: f64, darkmode: bool) -> Self {
        Self {
            source: None,
            state: LoadState::Idle,
            canvas: Canvas::new(width, height, darkmode),
            projector: Projector::default(),
        }
    }

    pub fn source(&self) -> Option<&DiagramSource> {
        self.source.as_ref()
    }

    /// Relationship count once loaded.
    pub fn state(&self) -> &LoadState<usize> {
        &self.state
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Follow the shell's selection: reload when the database changes.
    pub async fn sync(&mut self, ctx: &ViewContext, client: &ApiClient, now: Duration) {
        self.canvas.set_darkmode(ctx.darkmode);
        let next = DiagramSource::from_context(ctx);
        if next == self.source {
            return;
        }
        match next {
            Some(source) => self.load(client, source, now).await,
            None => {
                self.source = None;
                self.state = LoadState::Idle;
                self.canvas.set_graph(GraphIR::default(), now);
            }
        }
    }

    pub async fn load(&mut self, client: &ApiClient, source: DiagramSource, now: Duration) {
        self.source = Some(source);
        self.reload(client, now).await;
    }

    /// Retry button: re-issue the last load.
    pub async fn retry(&mut self, client: &ApiClient, now: Duration) {
        self.reload(client, now).await;
    }

    async fn reload(&mut self, client: &ApiClient, now: Duration) {
        let Some(source) = self.source.clone() else {
            return;
        };
        self.state = LoadState::Loading;

        let relationships = async {
            match &source {
                DiagramSource::Database { name, table: None } => client.relationships(name).await,
                DiagramSource::Database {
                    name,
                    table: Some(table),
                } => client.table_relationships(name, table).await,
                DiagramSource::ErDiagram { id, table: None } => {
                    client.diagram_relationships(*id).await
                }
                DiagramSource::ErDiagram {
                    id,
                    table: Some(table),
                } => client.diagram_table_relationships(*id, table).await,
            }
        };
        let catalog = async {
            match source.database() {
                Some(db) => client.tables_in_database(db).await,
                None => Ok(Vec::new()),
            }
        };
        let (relationships, catalog) = futures::join!(relationships, catalog);

        let relationships: Vec<Relationship> = match relationships {
            Ok(list) => list,
            Err(e) => {
                warn!(source = ?source, error = %e, "failed to load relationships");
                // the previous diagram belongs to another source
                self.canvas.set_graph(GraphIR::default(), now);
                self.state = LoadState::Failed {
                    message: e.user_message(),
                };
                return;
            }
        };
        let catalog: Vec<Table> = catalog.unwrap_or_else(|e| {
            warn!(error = %e, "table catalog unavailable, resolving tables one by one");
            Vec::new()
        });

        let resolver = CatalogResolver::new(catalog, client);
        let graph = self.projector.project(&relationships, &resolver).await;
        info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "diagram loaded"
        );
        self.canvas.set_graph(graph, now);
        self.state = LoadState::Loaded(relationships.len());
    }

    /// Submit the dialog and merge the result into the canvas.
    pub async fn submit_relationship<G: Rng + ?Sized>(
        &mut self,
        dialog: &mut AddRelationshipDialog,
        client: &ApiClient,
        rng: &mut G,
        now: Duration,
    ) -> Result<Relationship, DialogError> {
        let mut graph = self.canvas.graph().clone();
        let rel = dialog
            .submit(client, Some(&mut graph), &self.projector, rng, || now)
            .await?;
        self.canvas.update_graph(now, |g| *g = graph);
        Ok(rel)
    }

    pub async fn delete_relationship(
        &mut self,
        client: &ApiClient,
        id: i64,
        now: Duration,
    ) -> Result<(), ClientError> {
        client.delete_relationship(id).await?;
        self.canvas
            .update_graph(now, |g| remove_relationship(g, id));
        info!(id, "relationship deleted");
        Ok(())
    }
}

/// Schema overview tab.
#[derive(Debug, Default)]
pub struct OverviewView {
    schema: Option<String>,
    state: LoadState<SchemaOverview>,
}

impl OverviewView {
    pub fn state(&self) -> &LoadState<SchemaOverview> {
        &self.state
    }

    pub async fn load(&mut self, client: &ApiClient, schema: impl Into<String>) {
        let schema = schema.into();
        self.state.run(client.schema_overview(&schema)).await;
        self.schema = Some(schema);
    }

    pub async fn retry(&mut self, client: &ApiClient) {
        if let Some(schema) = self.schema.clone() {
            self.state.run(client.schema_overview(&schema)).await;
        }
    }
}
