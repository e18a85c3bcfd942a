//! Doctree CLI - Command-line interface for the documentation tree.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use doctree_api::{ApiRequest, ApiResponse, DoctreeApi, RequestContext};
use doctree_core::DoctreeConfig;
use doctree_store::{default_seed, load_seed_file, seed_documentation, SqliteStore};

/// Doctree - hierarchical documentation store
#[derive(Parser)]
#[command(name = "doctree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database path (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Config file path (default: ~/.config/doctree/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Load the documentation outline into an empty database
    Seed {
        /// JSON outline to load instead of the built-in one
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the full document tree
    Tree,

    /// List top-level documents
    Roots,

    /// List the children of a document
    Children {
        /// Parent document id
        id: i64,
    },

    /// Show a document with its blocks
    Show {
        /// Document id
        id: i64,
    },

    /// Print the breadcrumb of a document
    Path {
        /// Document id
        id: i64,
    },

    /// Create a document
    Create {
        /// Document title
        title: String,

        /// Parent document id (top level if omitted)
        #[arg(short, long)]
        parent: Option<i64>,

        /// Position among siblings
        #[arg(short, long, default_value = "0")]
        order: i64,
    },

    /// Rename or reorder a document
    Update {
        /// Document id
        id: i64,

        /// New title
        title: String,

        /// Position among siblings
        #[arg(short, long, default_value = "0")]
        order: i64,
    },

    /// Move a document under a new parent
    Move {
        /// Document id
        id: i64,

        /// New parent id (top level if omitted)
        #[arg(short, long)]
        parent: Option<i64>,

        /// Position among siblings
        #[arg(short, long, default_value = "0")]
        order: i64,
    },

    /// Delete a document and everything beneath it
    Delete {
        /// Document id
        id: i64,
    },

    /// Manage content blocks
    Block {
        #[command(subcommand)]
        action: BlockAction,
    },

    /// List the request routes
    Routes,

    /// Send a raw request through the route dispatcher
    Request {
        /// HTTP method
        method: String,

        /// Request path, e.g. /documents/tree
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,

        /// Attach the configured admin credentials
        #[arg(short, long)]
        admin: bool,
    },
}

#[derive(Subcommand)]
enum BlockAction {
    /// Append a block to a document
    Add {
        /// Document id
        document_id: i64,

        /// Block type
        #[arg(short = 't', long = "type", default_value = "rich-text")]
        kind: String,

        /// Block content as JSON
        #[arg(short, long, conflicts_with = "html")]
        content: Option<String>,

        /// Rich-text HTML, stored as {"html": ...}
        #[arg(long)]
        html: Option<String>,

        /// Position within the document
        #[arg(short, long, default_value = "0")]
        order: i64,
    },

    /// Replace a block
    Update {
        /// Block id
        id: i64,

        /// Block type
        #[arg(short = 't', long = "type", default_value = "rich-text")]
        kind: String,

        /// Block content as JSON
        #[arg(short, long, conflicts_with = "html")]
        content: Option<String>,

        /// Rich-text HTML, stored as {"html": ...}
        #[arg(long)]
        html: Option<String>,

        /// Position within the document
        #[arg(short, long, default_value = "0")]
        order: i64,
    },

    /// Delete a block
    Delete {
        /// Block id
        id: i64,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(
    config: Option<PathBuf>,
    database: Option<PathBuf>,
) -> Result<DoctreeConfig, Box<dyn std::error::Error>> {
    let mut config = match config {
        Some(path) => DoctreeConfig::load(&path)?,
        None => DoctreeConfig::load_default()?,
    };
    if let Some(path) = database {
        config.database.path = path;
    }
    Ok(config)
}

fn admin_context(config: &DoctreeConfig) -> RequestContext {
    RequestContext::with_credentials(&config.admin.email, &config.admin.password)
}

/// Build a block body from either raw JSON or rich-text HTML.
fn block_body(
    kind: String,
    content: Option<String>,
    html: Option<String>,
    order: i64,
) -> Result<Value, Box<dyn std::error::Error>> {
    let content = match (content, html) {
        (Some(raw), _) => serde_json::from_str(&raw)?,
        (None, Some(html)) => json!({ "html": html }),
        (None, None) => return Err("either --content or --html is required".into()),
    };
    Ok(json!({ "type": kind, "content": content, "orderIndex": order }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(cli.config, cli.database)?;
    let api = DoctreeApi::open(&config)?;
    let admin = admin_context(&config);

    let response = match cli.command {
        Commands::Init => {
            println!("Initialized database at: {}", config.database.path.display());
            return Ok(());
        }
        Commands::Seed { file } => {
            seed(api.store(), file)?;
            return Ok(());
        }
        Commands::Routes => {
            println!("{}", serde_json::to_string_pretty(&DoctreeApi::<SqliteStore>::routes())?);
            return Ok(());
        }
        Commands::Tree => api.get_tree().await,
        Commands::Roots => api.get_roots().await,
        Commands::Children { id } => api.get_children(&id.to_string()).await,
        Commands::Show { id } => api.get_document(&id.to_string()).await,
        Commands::Path { id } => api.get_path(&id.to_string()).await,
        Commands::Create {
            title,
            parent,
            order,
        } => {
            let body = json!({ "title": title, "parentId": parent, "orderIndex": order });
            api.create_document(&admin, Some(body)).await
        }
        Commands::Update { id, title, order } => {
            let body = json!({ "title": title, "orderIndex": order });
            api.update_document(&admin, &id.to_string(), Some(body))
                .await
        }
        Commands::Move { id, parent, order } => {
            let body = json!({ "parentId": parent, "orderIndex": order });
            api.move_document(&admin, &id.to_string(), Some(body)).await
        }
        Commands::Delete { id } => api.delete_document(&admin, &id.to_string()).await,
        Commands::Block { action } => match action {
            BlockAction::Add {
                document_id,
                kind,
                content,
                html,
                order,
            } => {
                let body = block_body(kind, content, html, order)?;
                api.create_block(&admin, &document_id.to_string(), Some(body))
                    .await
            }
            BlockAction::Update {
                id,
                kind,
                content,
                html,
                order,
            } => {
                let body = block_body(kind, content, html, order)?;
                api.update_block(&admin, &id.to_string(), Some(body)).await
            }
            BlockAction::Delete { id } => api.delete_block(&admin, &id.to_string()).await,
        },
        Commands::Request {
            method,
            path,
            body,
            admin: with_admin,
        } => {
            let mut request = ApiRequest::new(method, path);
            if let Some(raw) = body {
                request = request.body(serde_json::from_str(&raw)?);
            }
            if with_admin {
                request = request
                    .header("email", &config.admin.email)
                    .header("password", &config.admin.password);
            }
            api.handle(request).await
        }
    };

    print_response(response)
}

fn seed(store: &SqliteStore, file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let entries = match file {
        Some(path) => load_seed_file(&path)?,
        None => default_seed(),
    };

    let report = seed_documentation(store, &entries)?;
    if report.skipped {
        println!(
            "Database already holds {} documents, nothing seeded",
            report.existing
        );
    } else {
        println!(
            "Seeded {} documents and {} blocks",
            report.documents_created, report.blocks_created
        );
    }
    for key in &report.unresolved {
        eprintln!("  Skipped {}: parent not found", key);
    }
    Ok(())
}

fn print_response(response: ApiResponse) -> Result<(), Box<dyn std::error::Error>> {
    let rendered = match &response.body {
        Some(body) => serde_json::to_string_pretty(body)?,
        None => format!("{} No Content", response.status),
    };

    if response.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error ({}): {}", response.status, rendered);
        std::process::exit(1);
    }
    Ok(())
}
