//! Request surface over the document store.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use doctree_core::{
    AdminConfig, DocumentId, DocumentStore, DoctreeConfig, DoctreeError, NewBlock, NewDocument,
    Result,
};
use doctree_store::SqliteStore;

/// The admin credential mutations are checked against.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    email: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn matches(&self, email: &str, password: &str) -> bool {
        self.email == email && self.password == password
    }
}

impl From<&AdminConfig> for AdminCredentials {
    fn from(config: &AdminConfig) -> Self {
        Self::new(&config.email, &config.password)
    }
}

/// Credentials presented by a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RequestContext {
    /// A request without credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A request presenting the given credentials.
    pub fn with_credentials(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    /// Read the `email` and `password` headers (names are case-insensitive).
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut ctx = Self::default();
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("email") {
                ctx.email = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("password") {
                ctx.password = Some(value.to_string());
            }
        }
        ctx
    }
}

/// Create document request body.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentParams {
    pub title: String,

    #[serde(default)]
    pub parent_id: Option<DocumentId>,

    #[serde(default)]
    pub order_index: i64,
}

/// Update document request body.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentParams {
    pub title: String,
    pub order_index: i64,
}

/// Move document request body. A missing or null `parentId` moves to the top level.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveDocumentParams {
    #[serde(default)]
    pub parent_id: Option<DocumentId>,
    pub order_index: i64,
}

/// Create block request body.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockParams {
    #[serde(rename = "type")]
    pub kind: String,

    pub content: Value,

    #[serde(default)]
    pub order_index: i64,
}

/// Update block request body.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlockParams {
    #[serde(rename = "type")]
    pub kind: String,

    pub content: Value,

    pub order_index: i64,
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginParams {
    pub email: String,
    pub password: String,
}

/// A request routed through [`DoctreeApi::handle`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn context(&self) -> RequestContext {
        RequestContext::from_headers(
            self.headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }
}

/// Response status and JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Result<Self> {
        Ok(Self {
            status,
            body: Some(serde_json::to_value(value)?),
        })
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }

    fn message(status: u16, error: &str) -> Self {
        Self {
            status,
            body: Some(json!({ "error": error })),
        }
    }

    /// Render an error with its status code.
    pub fn from_error(err: DoctreeError) -> Self {
        let status = err.status_code();
        let body = match &err {
            DoctreeError::DocumentNotFound { .. } => {
                json!({ "error": "Document not found", "code": err.error_code() })
            }
            DoctreeError::BlockNotFound { .. } => {
                json!({ "error": "Block not found", "code": err.error_code() })
            }
            DoctreeError::Unauthorized => json!({ "error": "Unauthorized", "code": err.error_code() }),
            _ if status >= 500 => json!({
                "error": "Server error",
                "code": err.error_code(),
                "message": err.to_string(),
            }),
            _ => json!({ "error": err.to_string(), "code": err.error_code() }),
        };

        if status >= 500 {
            warn!("Request failed: {}", err);
        }

        Self {
            status,
            body: Some(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn respond(result: Result<ApiResponse>) -> ApiResponse {
    result.unwrap_or_else(ApiResponse::from_error)
}

/// Parse a path id segment.
fn parse_id(raw: &str) -> Result<DocumentId> {
    raw.trim()
        .parse::<DocumentId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| DoctreeError::invalid_argument(format!("Invalid id: {:?}", raw)))
}

/// Deserialize a request body into its parameter struct.
fn parse_body<T: DeserializeOwned>(body: Option<Value>) -> Result<T> {
    let body = body.ok_or_else(|| DoctreeError::invalid_argument("Missing request body"))?;
    serde_json::from_value(body)
        .map_err(|e| DoctreeError::invalid_argument(format!("Invalid request body: {}", e)))
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DoctreeError::invalid_argument(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

/// Route info.
#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub admin: bool,
    pub description: &'static str,
}

/// Document API bound to a store and an admin credential.
pub struct DoctreeApi<S> {
    /// Document store.
    store: Arc<S>,

    /// Credential required for mutations.
    admin: AdminCredentials,
}

impl DoctreeApi<SqliteStore> {
    /// Open the database described by `config`.
    pub fn open(config: &DoctreeConfig) -> Result<Self> {
        info!(
            "Initializing document API with database at {:?}",
            config.database.path
        );
        let store = SqliteStore::open_with_config(&config.database)?;
        Ok(Self::new(Arc::new(store), AdminCredentials::from(&config.admin)))
    }

    /// Create an API over an in-memory database with default credentials.
    pub fn new_memory() -> Result<Self> {
        info!("Initializing document API with in-memory database");
        let store = SqliteStore::open_memory()?;
        Ok(Self::new(
            Arc::new(store),
            AdminCredentials::from(&AdminConfig::default()),
        ))
    }
}

impl<S: DocumentStore> DoctreeApi<S> {
    pub fn new(store: Arc<S>, admin: AdminCredentials) -> Self {
        Self { store, admin }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// List available routes.
    pub fn routes() -> Vec<RouteInfo> {
        let route = |method, path, admin, description| RouteInfo {
            method,
            path,
            admin,
            description,
        };
        vec![
            route("POST", "/login", false, "Check admin credentials"),
            route("GET", "/documents/tree", false, "Full document forest"),
            route("GET", "/documents/roots", false, "Top-level documents"),
            route("GET", "/documents/children/:parentId", false, "Children of a document"),
            route("GET", "/documents/:id", false, "Document with its blocks"),
            route("GET", "/documents/:id/path", false, "Breadcrumb from the root"),
            route("POST", "/documents", true, "Create a document"),
            route("PUT", "/documents/:id", true, "Rename or reorder a document"),
            route("PUT", "/documents/:id/move", true, "Reparent a document"),
            route("DELETE", "/documents/:id", true, "Delete a document and its subtree"),
            route("POST", "/documents/:id/blocks", true, "Add a content block"),
            route("PUT", "/documents/blocks/:blockId", true, "Replace a content block"),
            route("DELETE", "/documents/blocks/:blockId", true, "Delete a content block"),
        ]
    }

    fn authorize(&self, ctx: &RequestContext) -> Result<()> {
        match (ctx.email.as_deref(), ctx.password.as_deref()) {
            (Some(email), Some(password)) if self.admin.matches(email, password) => Ok(()),
            _ => {
                warn!("Rejected unauthenticated mutation");
                Err(DoctreeError::Unauthorized)
            }
        }
    }

    /// Check admin credentials.
    pub async fn login(&self, body: Option<Value>) -> ApiResponse {
        respond(
            async {
                let params: LoginParams = parse_body(body)?;
                if self.admin.matches(&params.email, &params.password) {
                    info!("Admin login succeeded");
                    ApiResponse::json(200, &json!({ "loggedIn": true }))
                } else {
                    warn!("Admin login failed");
                    Ok(ApiResponse::message(401, "Invalid credentials"))
                }
            }
            .await,
        )
    }

    /// Get the full document forest.
    pub async fn get_tree(&self) -> ApiResponse {
        respond(async { ApiResponse::json(200, &self.store.get_document_tree().await?) }.await)
    }

    /// Get top-level documents.
    pub async fn get_roots(&self) -> ApiResponse {
        respond(async { ApiResponse::json(200, &self.store.get_root_documents().await?) }.await)
    }

    /// Get the children of a document.
    pub async fn get_children(&self, parent_id: &str) -> ApiResponse {
        respond(
            async {
                let parent_id = parse_id(parent_id)?;
                ApiResponse::json(200, &self.store.get_child_documents(parent_id).await?)
            }
            .await,
        )
    }

    /// Get a document with its blocks.
    pub async fn get_document(&self, id: &str) -> ApiResponse {
        respond(
            async {
                let id = parse_id(id)?;
                match self.store.get_document_by_id(id).await? {
                    Some(doc) => ApiResponse::json(200, &doc),
                    None => Err(DoctreeError::DocumentNotFound { id }),
                }
            }
            .await,
        )
    }

    /// Get the breadcrumb of a document.
    pub async fn get_path(&self, id: &str) -> ApiResponse {
        respond(
            async {
                let id = parse_id(id)?;
                ApiResponse::json(200, &self.store.get_document_path(id).await?)
            }
            .await,
        )
    }

    /// Create a document.
    pub async fn create_document(&self, ctx: &RequestContext, body: Option<Value>) -> ApiResponse {
        respond(
            async {
                self.authorize(ctx)?;
                let params: CreateDocumentParams = parse_body(body)?;
                require_non_empty("title", &params.title)?;

                let doc = self
                    .store
                    .create_document(NewDocument {
                        title: params.title,
                        parent_id: params.parent_id,
                        order_index: params.order_index,
                    })
                    .await?;
                info!("Created document {} ({:?})", doc.id, doc.title);
                ApiResponse::json(201, &doc)
            }
            .await,
        )
    }

    /// Rename or reorder a document.
    pub async fn update_document(
        &self,
        ctx: &RequestContext,
        id: &str,
        body: Option<Value>,
    ) -> ApiResponse {
        respond(
            async {
                self.authorize(ctx)?;
                let id = parse_id(id)?;
                let params: UpdateDocumentParams = parse_body(body)?;
                require_non_empty("title", &params.title)?;

                match self
                    .store
                    .update_document(id, &params.title, params.order_index)
                    .await?
                {
                    Some(doc) => {
                        info!("Updated document {}", id);
                        ApiResponse::json(200, &doc)
                    }
                    None => Err(DoctreeError::DocumentNotFound { id }),
                }
            }
            .await,
        )
    }

    /// Reparent a document.
    pub async fn move_document(
        &self,
        ctx: &RequestContext,
        id: &str,
        body: Option<Value>,
    ) -> ApiResponse {
        respond(
            async {
                self.authorize(ctx)?;
                let id = parse_id(id)?;
                let params: MoveDocumentParams = parse_body(body)?;

                match self
                    .store
                    .move_document(id, params.parent_id, params.order_index)
                    .await?
                {
                    Some(doc) => {
                        info!("Moved document {} under {:?}", id, params.parent_id);
                        ApiResponse::json(200, &doc)
                    }
                    None => Err(DoctreeError::DocumentNotFound { id }),
                }
            }
            .await,
        )
    }

    /// Delete a document and its subtree.
    pub async fn delete_document(&self, ctx: &RequestContext, id: &str) -> ApiResponse {
        respond(
            async {
                self.authorize(ctx)?;
                let id = parse_id(id)?;
                self.store.delete_document(id).await?;
                info!("Deleted document {}", id);
                Ok(ApiResponse::no_content())
            }
            .await,
        )
    }

    /// Add a content block to a document.
    pub async fn create_block(
        &self,
        ctx: &RequestContext,
        document_id: &str,
        body: Option<Value>,
    ) -> ApiResponse {
        respond(
            async {
                self.authorize(ctx)?;
                let document_id = parse_id(document_id)?;
                let params: CreateBlockParams = parse_body(body)?;
                require_non_empty("type", &params.kind)?;

                let block = self
                    .store
                    .create_document_block(
                        document_id,
                        NewBlock {
                            kind: params.kind,
                            content: params.content,
                            order_index: params.order_index,
                        },
                    )
                    .await?;
                info!("Created block {} on document {}", block.id, document_id);
                ApiResponse::json(201, &block)
            }
            .await,
        )
    }

    /// Replace a content block.
    pub async fn update_block(
        &self,
        ctx: &RequestContext,
        block_id: &str,
        body: Option<Value>,
    ) -> ApiResponse {
        respond(
            async {
                self.authorize(ctx)?;
                let id = parse_id(block_id)?;
                let params: UpdateBlockParams = parse_body(body)?;
                require_non_empty("type", &params.kind)?;

                let block = NewBlock {
                    kind: params.kind,
                    content: params.content,
                    order_index: params.order_index,
                };
                match self.store.update_document_block(id, block).await? {
                    Some(block) => {
                        info!("Updated block {}", id);
                        ApiResponse::json(200, &block)
                    }
                    None => Err(DoctreeError::BlockNotFound { id }),
                }
            }
            .await,
        )
    }

    /// Delete a content block.
    pub async fn delete_block(&self, ctx: &RequestContext, block_id: &str) -> ApiResponse {
        respond(
            async {
                self.authorize(ctx)?;
                let id = parse_id(block_id)?;
                self.store.delete_document_block(id).await?;
                info!("Deleted block {}", id);
                Ok(ApiResponse::no_content())
            }
            .await,
        )
    }

    /// Dispatch a request by method and path.
    ///
    /// Paths may carry an `/api` prefix. Unknown routes answer 404.
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let ctx = request.context();
        let method = request.method.to_ascii_uppercase();
        let path = request.path.split('?').next().unwrap_or("");
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.first() == Some(&"api") {
            segments.remove(0);
        }
        let body = request.body;

        match (method.as_str(), segments.as_slice()) {
            ("POST", ["login"]) => self.login(body).await,

            ("GET", ["documents", "tree"]) => self.get_tree().await,
            ("GET", ["documents", "roots"]) => self.get_roots().await,
            ("GET", ["documents", "children", parent_id]) => self.get_children(parent_id).await,
            ("PUT", ["documents", "blocks", block_id]) => {
                self.update_block(&ctx, block_id, body).await
            }
            ("DELETE", ["documents", "blocks", block_id]) => self.delete_block(&ctx, block_id).await,

            ("POST", ["documents"]) => self.create_document(&ctx, body).await,
            ("GET", ["documents", id]) => self.get_document(id).await,
            ("PUT", ["documents", id]) => self.update_document(&ctx, id, body).await,
            ("DELETE", ["documents", id]) => self.delete_document(&ctx, id).await,
            ("GET", ["documents", id, "path"]) => self.get_path(id).await,
            ("PUT", ["documents", id, "move"]) => self.move_document(&ctx, id, body).await,
            ("POST", ["documents", id, "blocks"]) => self.create_block(&ctx, id, body).await,

            _ => ApiResponse::message(404, "Not found"),
        }
    }
}
