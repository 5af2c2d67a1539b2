//! HTTP client for the schema browser backend.
//!
//! One method per endpoint. No caching and no automatic retry: callers
//! re-issue a request when the user asks for it.

use crate::config::ClientConfig;
use crate::hierarchy::Hierarchy;
use crate::model::{
    Created, ErEntity, LogicalDatabase, NewDiagramRelationship, NewErDiagram, NewLob,
    NewLogicalDatabase, NewRelationship, NewSubjectArea, NewTable, ProfileRequest, Relationship,
    SchemaOverview, SearchResult, Table, TableId,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Banner text: the server's own message when it sent one, otherwise a
    /// generic line chosen by failure class.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Status { status, .. } if *status == StatusCode::CONFLICT => {
                "A relationship already exists between these tables and columns.".to_string()
            }
            Self::Status { status, .. } if *status == StatusCode::BAD_REQUEST => {
                "Invalid data provided. Please check your inputs.".to_string()
            }
            Self::Status { status, .. } if status.is_server_error() => {
                "Server error. Please try again later.".to_string()
            }
            Self::Status { .. } => "An unexpected error occurred. Please try again.".to_string(),
            Self::Transport(_) => "Could not reach the server. Please try again.".to_string(),
            Self::Decode(_) => "The server sent an unexpected response.".to_string(),
            Self::InvalidBaseUrl(_) => self.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AttributeList {
    Wrapped { attributes: Vec<String> },
    Bare(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErEntityList {
    Wrapped { data: Vec<ErEntity> },
    Bare(Vec<ErEntity>),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| ClientError::InvalidBaseUrl(config.base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(config.base_url.clone()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.error));
        tracing::debug!(%status, ?message, "request rejected");
        Err(ClientError::Status { status, message })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Like [`Self::decode`] but tolerates an empty body.
    async fn decode_or_default<T: DeserializeOwned + Default>(
        response: Response,
    ) -> Result<T, ClientError> {
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.url(segments)?;
        tracing::debug!(%url, "GET");
        let response = self.send(self.http.get(url)).await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<Response, ClientError> {
        let url = self.url(segments)?;
        tracing::debug!(%url, "POST");
        self.send(self.http.post(url).json(body)).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), ClientError> {
        let url = self.url(segments)?;
        tracing::debug!(%url, "DELETE");
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    // Hierarchy

    pub async fn hierarchy(&self) -> Result<Hierarchy, ClientError> {
        self.get_json(&["hierarchy"]).await
    }

    pub async fn create_lob(&self, body: &NewLob) -> Result<Created, ClientError> {
        let response = self.post_json(&["lobs"], body).await?;
        Self::decode_or_default(response).await
    }

    pub async fn create_subject_area(&self, body: &NewSubjectArea) -> Result<Created, ClientError> {
        let response = self.post_json(&["subject-areas"], body).await?;
        Self::decode_or_default(response).await
    }

    pub async fn logical_databases(&self) -> Result<Vec<LogicalDatabase>, ClientError> {
        self.get_json(&["logical-databases"]).await
    }

    pub async fn logical_database(&self, name: &str) -> Result<LogicalDatabase, ClientError> {
        self.get_json(&["logical-databases", name]).await
    }

    pub async fn create_logical_database(
        &self,
        body: &NewLogicalDatabase,
    ) -> Result<Created, ClientError> {
        let response = self.post_json(&["logical-databases"], body).await?;
        Self::decode_or_default(response).await
    }

    // Tables

    pub async fn tables(&self) -> Result<Vec<Table>, ClientError> {
        self.get_json(&["tables"]).await
    }

    pub async fn tables_in_database(&self, database: &str) -> Result<Vec<Table>, ClientError> {
        self.get_json(&["tables", database]).await
    }

    pub async fn table(&self, id: &TableId) -> Result<Table, ClientError> {
        self.get_json(&["tables", id.as_str()]).await
    }

    pub async fn table_attributes(&self, id: &TableId) -> Result<Vec<String>, ClientError> {
        let list: AttributeList = self.get_json(&["tables", id.as_str(), "attributes"]).await?;
        Ok(match list {
            AttributeList::Wrapped { attributes } => attributes,
            AttributeList::Bare(attributes) => attributes,
        })
    }

    pub async fn create_table(&self, body: &NewTable) -> Result<Created, ClientError> {
        let response = self.post_json(&["tables"], body).await?;
        Self::decode_or_default(response).await
    }

    pub async fn delete_table(&self, id: &TableId) -> Result<(), ClientError> {
        self.delete(&["tables", id.as_str()]).await
    }

    /// Raw CSV export of a table's rows.
    pub async fn table_csv(&self, schema: &str, table: &str) -> Result<Vec<u8>, ClientError> {
        let url = self.url(&["table-csv", schema, table])?;
        tracing::debug!(%url, "GET");
        let response = self.send(self.http.get(url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // Relationships

    pub async fn relationships(&self, database: &str) -> Result<Vec<Relationship>, ClientError> {
        self.get_json(&["er_relationships", database]).await
    }

    pub async fn table_relationships(
        &self,
        database: &str,
        table: &TableId,
    ) -> Result<Vec<Relationship>, ClientError> {
        self.get_json(&["er_relationships", database, table.as_str()])
            .await
    }

    pub async fn diagram_relationships(
        &self,
        er_entity_id: i64,
    ) -> Result<Vec<Relationship>, ClientError> {
        let id = er_entity_id.to_string();
        self.get_json(&["er_relationships", id.as_str()]).await
    }

    pub async fn diagram_table_relationships(
        &self,
        er_entity_id: i64,
        table: &TableId,
    ) -> Result<Vec<Relationship>, ClientError> {
        let id = er_entity_id.to_string();
        self.get_json(&["er_relationships", id.as_str(), table.as_str()])
            .await
    }

    pub async fn create_relationship(&self, body: &NewRelationship) -> Result<Created, ClientError> {
        let response = self.post_json(&["er_relationships"], body).await?;
        Self::decode_or_default(response).await
    }

    pub async fn delete_relationship(&self, id: i64) -> Result<(), ClientError> {
        let id = id.to_string();
        self.delete(&["er_relationships", id.as_str()]).await
    }

    // ER diagrams

    pub async fn er_entities(&self, lob: &str) -> Result<Vec<ErEntity>, ClientError> {
        let list: ErEntityList = self.get_json(&["get_er_entities", lob]).await?;
        Ok(match list {
            ErEntityList::Wrapped { data } => data,
            ErEntityList::Bare(data) => data,
        })
    }

    pub async fn create_er_diagram(&self, body: &NewErDiagram) -> Result<Created, ClientError> {
        let response = self.post_json(&["create_er_diagram"], body).await?;
        Self::decode_or_default(response).await
    }

    pub async fn delete_er_diagram(&self, id: i64) -> Result<(), ClientError> {
        let id = id.to_string();
        self.delete(&["delete_er_diagram", id.as_str()]).await
    }

    pub async fn create_diagram_relationship(
        &self,
        body: &NewDiagramRelationship,
    ) -> Result<Created, ClientError> {
        let response = self.post_json(&["createER"], body).await?;
        Self::decode_or_default(response).await
    }

    // Search and metadata

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ClientError> {
        let mut url = self.url(&["search"])?;
        url.query_pairs_mut().append_pair("q", query);
        tracing::debug!(%url, "GET");
        let response = self.send(self.http.get(url)).await?;
        Self::decode(response).await
    }

    pub async fn schema_overview(&self, schema: &str) -> Result<SchemaOverview, ClientError> {
        self.get_json(&["schema-overview", schema]).await
    }

    /// Descriptive table metadata; the payload shape is backend-defined.
    pub async fn table_overview(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<serde_json::Value, ClientError> {
        match schema {
            Some(schema) => self.get_json(&["table-overview", schema, table]).await,
            None => self.get_json(&["table-overview", table]).await,
        }
    }

    /// Data-profiling report as an HTML document.
    pub async fn profile(&self, body: &ProfileRequest) -> Result<String, ClientError> {
        let response = self.post_json(&["profile"], body).await?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, RelationshipType};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&ClientConfig::new(format!("{}/api", server.uri()))).unwrap()
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ApiClient::new(&ClientConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl(_)));

        let err = ApiClient::new(&ClientConfig::new("mailto:someone@example.com")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_url_joins_and_encodes_segments() {
        let client = ApiClient::new(&ClientConfig::new("http://localhost:5000/api/")).unwrap();
        let url = client.url(&["er_relationships", "card db"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/er_relationships/card%20db");
    }

    #[tokio::test]
    async fn test_relationships_for_database() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/er_relationships/card%20db"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1,
                    "from_table_id": 1,
                    "from_column": "A",
                    "to_table_id": 2,
                    "to_column": "B",
                    "cardinality": "one-to-many",
                    "relationship_type": "foreign_key"
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rels = client_for(&server).relationships("card db").await.unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].cardinality, Cardinality::OneToMany);
    }

    #[tokio::test]
    async fn test_server_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tables"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "relation exists"})),
            )
            .mount(&server)
            .await;

        let body = NewTable {
            table_name: "t".into(),
            schema_name: "s".into(),
            database_id: 1,
            columns: vec![],
        };
        let err = client_for(&server).create_table(&body).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.user_message(), "relation exists");
    }

    #[tokio::test]
    async fn test_error_field_and_generic_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/hierarchy"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/er_relationships"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.hierarchy().await.unwrap_err();
        assert_eq!(err.user_message(), "db down");

        let body = NewRelationship {
            from_table_id: "1".into(),
            from_column: "a".into(),
            to_table_id: "2".into(),
            to_column: "b".into(),
            cardinality: Cardinality::OneToOne,
            relationship_type: RelationshipType::ForeignKey,
            database_name: "db".into(),
        };
        let err = client.create_relationship(&body).await.unwrap_err();
        assert_eq!(
            err.user_message(),
            "A relationship already exists between these tables and columns."
        );
    }

    #[tokio::test]
    async fn test_create_relationship_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/er_relationships"))
            .and(body_json(json!({
                "from_table_id": "1",
                "from_column": "a",
                "to_table_id": "2",
                "to_column": "b",
                "cardinality": "many-to-one",
                "relationship_type": "reference",
                "database_name": "db"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42})))
            .expect(1)
            .mount(&server)
            .await;

        let body = NewRelationship {
            from_table_id: "1".into(),
            from_column: "a".into(),
            to_table_id: "2".into(),
            to_column: "b".into(),
            cardinality: Cardinality::ManyToOne,
            relationship_type: RelationshipType::Reference,
            database_name: "db".into(),
        };
        let created = client_for(&server).create_relationship(&body).await.unwrap();
        assert_eq!(created.id, Some(42));
    }

    #[tokio::test]
    async fn test_empty_create_response_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/lobs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let created = client_for(&server)
            .create_lob(&NewLob { name: "Cards".into() })
            .await
            .unwrap();
        assert_eq!(created, Created::default());
    }

    #[tokio::test]
    async fn test_search_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(query_param("q", "pay ments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "payments", "type": "Table", "lob": "Cards", "subject": "Payments", "database": "pay_db"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server).search("pay ments").await.unwrap();
        assert_eq!(results[0].name, "payments");
    }

    #[tokio::test]
    async fn test_attributes_accept_both_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tables/1/attributes"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"attributes": ["id", "name"]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tables/2/attributes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["code"])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(
            client.table_attributes(&TableId::from(1)).await.unwrap(),
            vec!["id", "name"]
        );
        assert_eq!(
            client.table_attributes(&TableId::from(2)).await.unwrap(),
            vec!["code"]
        );
    }

    #[tokio::test]
    async fn test_er_entities_unwraps_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get_er_entities/Branded%20Cards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 3, "entity_name": "Payments ERD", "lob_name": "Branded Cards"}]
            })))
            .mount(&server)
            .await;

        let entities = client_for(&server).er_entities("Branded Cards").await.unwrap();
        assert_eq!(entities[0].entity_name, "Payments ERD");
    }

    #[tokio::test]
    async fn test_profile_returns_html() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/profile"))
            .and(body_json(json!({"schema": "sales", "table": "orders"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>report</html>"))
            .mount(&server)
            .await;

        let html = client_for(&server)
            .profile(&ProfileRequest {
                schema: "sales".into(),
                table: "orders".into(),
            })
            .await
            .unwrap();
        assert_eq!(html, "<html>report</html>");
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tables"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).tables().await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_delete_relationship() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/er_relationships/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_relationship(9).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_table_and_er_diagram() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/tables/12"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/delete_er_diagram/31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete_table(&TableId::from(12)).await.unwrap();
        client.delete_er_diagram(31).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_er_diagram() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/delete_er_diagram/99"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
            .mount(&server)
            .await;

        let err = client_for(&server).delete_er_diagram(99).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.user_message(), "not found");
    }

    #[tokio::test]
    async fn test_table_csv_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/table-csv/sales/orders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/csv")
                    .set_body_string("id,total\n1,9.50\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let csv = client_for(&server).table_csv("sales", "orders").await.unwrap();
        assert_eq!(csv, b"id,total\n1,9.50\n");
    }

    #[tokio::test]
    async fn test_table_overview_path_with_and_without_schema() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/table-overview/sales/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"table": "orders", "schema": "sales"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/table-overview/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"table": "orders"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let scoped = client.table_overview(Some("sales"), "orders").await.unwrap();
        assert_eq!(scoped["schema"], json!("sales"));
        let bare = client.table_overview(None, "orders").await.unwrap();
        assert_eq!(bare, json!({"table": "orders"}));
    }

    #[tokio::test]
    async fn test_logical_databases() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/logical-databases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "payments_db", "subject_area_id": 4},
                {"name": "ledger_db"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/logical-databases/payments_db"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                {"id": 1, "name": "payments_db", "subject_area_id": 4}
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let all = client.logical_databases().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].id, None);

        let one = client.logical_database("payments_db").await.unwrap();
        assert_eq!(one.subject_area_id, Some(4));
    }
}
