//! doctree-api - Request surface for the document store
//!
//! Maps the documentation routes onto a [`DocumentStore`]. Mutating routes
//! require the admin credentials.
//!
//! # Routes
//!
//! - `GET /documents/tree` - Full document forest
//! - `GET /documents/roots` - Top-level documents
//! - `GET /documents/children/:parentId` - Children of a document
//! - `GET /documents/:id` - Document with its blocks
//! - `GET /documents/:id/path` - Breadcrumb from the root
//! - `POST /documents`, `PUT /documents/:id`, `PUT /documents/:id/move`,
//!   `DELETE /documents/:id` - Document mutations (admin)
//! - `POST /documents/:id/blocks`, `PUT /documents/blocks/:blockId`,
//!   `DELETE /documents/blocks/:blockId` - Block mutations (admin)
//!
//! [`DocumentStore`]: doctree_core::DocumentStore

mod server;

pub use server::{
    AdminCredentials, ApiRequest, ApiResponse, CreateBlockParams, CreateDocumentParams,
    DoctreeApi, LoginParams, MoveDocumentParams, RequestContext, RouteInfo, UpdateBlockParams,
    UpdateDocumentParams,
};
