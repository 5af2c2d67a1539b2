#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use anyhow::{Context, bail};
    use clap::{Parser, Subcommand};
    use erbrowser::client::ApiClient;
    use erbrowser::config::ClientConfig;
    use erbrowser::forms::{AddRelationshipDialog, Side};
    use erbrowser::hierarchy::HierarchyNode;
    use erbrowser::model::{
        Cardinality, NewLob, NewLogicalDatabase, NewSubjectArea, ProfileRequest, RelationshipType,
        TableId, format_bytes,
    };
    use erbrowser::projector::Projector;
    use erbrowser::search::group_results;
    use erbrowser::view::{DiagramSource, DiagramView, LoadState};
    use std::fs;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Instant;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    /// Browse the schema hierarchy and export ER diagrams
    #[derive(Parser, Debug)]
    #[command(name = "erbrowser", version, about)]
    pub struct Args {
        /// Backend base URL [default: $ERBROWSER_API_URL, then
        /// http://localhost:5000/api]
        #[arg(long)]
        pub api_url: Option<String>,

        /// Log level when RUST_LOG is unset
        #[arg(long, default_value = "info")]
        pub log_level: String,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Print the LOB / subject area / database / table tree
        Hierarchy,
        /// Search the hierarchy
        Search { query: String },
        /// List tables, optionally for one logical database
        Tables {
            #[arg(long)]
            database: Option<String>,
        },
        /// Render a database's relationships as SVG
        Diagram {
            database: String,
            /// Only relationships touching this table
            #[arg(long)]
            table: Option<String>,
            #[arg(long)]
            dark: bool,
            #[arg(short, long)]
            output: Option<PathBuf>,
        },
        /// Render a saved ER diagram as SVG
        ErDiagram {
            id: i64,
            #[arg(long)]
            dark: bool,
            #[arg(short, long)]
            output: Option<PathBuf>,
        },
        /// List relationships of a database
        Relationships {
            database: String,
            #[arg(long)]
            table: Option<String>,
        },
        AddRelationship {
            #[arg(long)]
            database: String,
            #[arg(long)]
            from_table: String,
            #[arg(long)]
            from_column: String,
            #[arg(long)]
            to_table: String,
            #[arg(long)]
            to_column: String,
            #[arg(long, value_parser = parse_cardinality)]
            cardinality: Cardinality,
            #[arg(long = "type", value_parser = parse_relationship_type, default_value = "foreign_key")]
            relationship_type: RelationshipType,
        },
        DeleteRelationship { id: i64 },
        DeleteTable { id: String },
        DeleteErDiagram { id: i64 },
        /// Download a table's rows as CSV
        TableCsv {
            schema: String,
            table: String,
            #[arg(short, long)]
            output: Option<PathBuf>,
        },
        SchemaOverview { schema: String },
        TableOverview {
            table: String,
            #[arg(long)]
            schema: Option<String>,
        },
        /// Fetch the data-profiling HTML report
        Profile {
            #[arg(long)]
            schema: String,
            #[arg(long)]
            table: String,
            #[arg(short, long)]
            output: Option<PathBuf>,
        },
        CreateLob { name: String },
        CreateSubjectArea {
            name: String,
            #[arg(long)]
            lob_id: i64,
        },
        CreateDatabase {
            name: String,
            #[arg(long)]
            subject_area_id: i64,
        },
        /// List ER diagrams saved for a line of business
        ErEntities { lob: String },
    }

    fn parse_cardinality(s: &str) -> Result<Cardinality, String> {
        Cardinality::parse(s).ok_or_else(|| format!("unknown cardinality: {s}"))
    }

    fn parse_relationship_type(s: &str) -> Result<RelationshipType, String> {
        RelationshipType::parse(s).ok_or_else(|| format!("unknown relationship type: {s}"))
    }

    pub async fn main() -> anyhow::Result<()> {
        let args = Args::parse();

        let log_filter = args.log_level.clone();
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| format!("erbrowser={log_filter}").into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();

        let config = args
            .api_url
            .map(|url| ClientConfig::new(url))
            .unwrap_or_else(ClientConfig::from_env);
        let client = ApiClient::new(&config)?;
        run(&client, args.command).await
    }

    fn write_output(output: Option<PathBuf>, content: &str) -> anyhow::Result<()> {
        match output {
            Some(path) => fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display())),
            None => {
                print!("{content}");
                Ok(())
            }
        }
    }

    fn print_node(node: &HierarchyNode, depth: usize) {
        println!("{}{} ({})", "  ".repeat(depth), node.name, node.level.label());
        for child in &node.children {
            print_node(child, depth + 1);
        }
    }

    async fn render_diagram(
        client: &ApiClient,
        source: DiagramSource,
        dark: bool,
        output: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let start = Instant::now();
        let mut view = DiagramView::new(1200.0, 800.0, dark);
        view.load(client, source, start.elapsed()).await;
        if let LoadState::Failed { message } = view.state() {
            bail!("{message}");
        }
        let graph = view.canvas().graph();
        tracing::info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            relationships = graph.relationship_count(),
            "rendering diagram"
        );
        write_output(output, &view.canvas().export_svg())
    }

    async fn run(client: &ApiClient, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Hierarchy => {
                let hierarchy = client.hierarchy().await?;
                for lob in &hierarchy.lobs {
                    print_node(lob, 0);
                }
            }
            Command::Search { query } => {
                let results = client.search(&query).await?;
                if results.is_empty() {
                    println!("No results");
                }
                for group in group_results(&results) {
                    println!("{}", group.kind.label());
                    for result in group.results {
                        println!("  {}", result.name);
                    }
                }
            }
            Command::Tables { database } => {
                let tables = match database {
                    Some(db) => client.tables_in_database(&db).await?,
                    None => client.tables().await?,
                };
                for table in tables {
                    let schema = table.schema_name.as_deref().unwrap_or("-");
                    println!("{}\t{}\t{}", table.id, schema, table.name);
                }
            }
            Command::Diagram {
                database,
                table,
                dark,
                output,
            } => {
                let source = DiagramSource::Database {
                    name: database,
                    table: table.map(TableId::from),
                };
                render_diagram(client, source, dark, output).await?;
            }
            Command::ErDiagram { id, dark, output } => {
                let source = DiagramSource::ErDiagram { id, table: None };
                render_diagram(client, source, dark, output).await?;
            }
            Command::Relationships { database, table } => {
                let rels = match table {
                    Some(t) => client.table_relationships(&database, &TableId::from(t)).await?,
                    None => client.relationships(&database).await?,
                };
                for rel in rels {
                    let id = rel.id.map(|i| i.to_string()).unwrap_or_else(|| "-".into());
                    println!(
                        "{id}\t{} -> {}\t{}",
                        rel.from_table_id,
                        rel.to_table_id,
                        rel.label_line()
                    );
                }
            }
            Command::AddRelationship {
                database,
                from_table,
                from_column,
                to_table,
                to_column,
                cardinality,
                relationship_type,
            } => {
                let mut dialog = AddRelationshipDialog::new(database);
                dialog
                    .draft
                    .select_table(Side::From, TableId::from(from_table))?;
                dialog
                    .draft
                    .select_table(Side::To, TableId::from(to_table))?;
                dialog.draft.select_column(Side::From, from_column);
                dialog.draft.select_column(Side::To, to_column);
                dialog.draft.cardinality = Some(cardinality);
                dialog.draft.relationship_type = relationship_type;

                let start = Instant::now();
                let rel = dialog
                    .submit(
                        client,
                        None,
                        &Projector::default(),
                        &mut rand::thread_rng(),
                        || start.elapsed(),
                    )
                    .await?;
                println!(
                    "Created {}: {}",
                    rel.id.map(|i| i.to_string()).unwrap_or_else(|| "-".into()),
                    rel.label_line()
                );
            }
            Command::DeleteRelationship { id } => {
                client.delete_relationship(id).await?;
                println!("Deleted relationship {id}");
            }
            Command::DeleteTable { id } => {
                client.delete_table(&TableId::from(id.as_str())).await?;
                println!("Deleted table {id}");
            }
            Command::DeleteErDiagram { id } => {
                client.delete_er_diagram(id).await?;
                println!("Deleted ER diagram {id}");
            }
            Command::TableCsv {
                schema,
                table,
                output,
            } => {
                let csv = client.table_csv(&schema, &table).await?;
                match output {
                    Some(path) => fs::write(&path, &csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?,
                    None => std::io::stdout().write_all(&csv)?,
                }
            }
            Command::SchemaOverview { schema } => {
                let overview = client.schema_overview(&schema).await?;
                let size = overview
                    .schema_size_pretty
                    .clone()
                    .unwrap_or_else(|| format_bytes(overview.schema_size_bytes));
                println!("Schema:     {}", overview.schema);
                println!("Tables:     {}", overview.table_count);
                println!("Size:       {size}");
                if let Some(tablespace) = &overview.tablespace {
                    println!("Tablespace: {tablespace}");
                }
                for t in &overview.tables {
                    let rows = t.row_count.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
                    println!("  {}\t{}\t{}", t.table, rows, format_bytes(t.size_bytes));
                }
            }
            Command::TableOverview { table, schema } => {
                let overview = client.table_overview(schema.as_deref(), &table).await?;
                println!("{}", serde_json::to_string_pretty(&overview)?);
            }
            Command::Profile {
                schema,
                table,
                output,
            } => {
                let html = client.profile(&ProfileRequest { schema, table }).await?;
                write_output(output, &html)?;
            }
            Command::CreateLob { name } => {
                let created = client.create_lob(&NewLob { name }).await?;
                println!("{}", created.message.unwrap_or_else(|| "Created".into()));
            }
            Command::CreateSubjectArea { name, lob_id } => {
                let created = client
                    .create_subject_area(&NewSubjectArea { name, lob_id })
                    .await?;
                println!("{}", created.message.unwrap_or_else(|| "Created".into()));
            }
            Command::CreateDatabase {
                name,
                subject_area_id,
            } => {
                let created = client
                    .create_logical_database(&NewLogicalDatabase {
                        name,
                        subject_area_id,
                    })
                    .await?;
                println!("{}", created.message.unwrap_or_else(|| "Created".into()));
            }
            Command::ErEntities { lob } => {
                for entity in client.er_entities(&lob).await? {
                    let created = entity.created_at.as_deref().unwrap_or("-");
                    println!("{}\t{}\t{created}", entity.id, entity.entity_name);
                }
            }
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
