//! # Knowledge Desk CLI (`kdesk`)
//!
//! Drives one page session against the knowledge backend from the terminal.
//! A page session is identified by its URL; the `vector_index` query
//! parameter in that URL is the only session state.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kdesk open <page-url>` | Bind the page and show its sources |
//! | `kdesk add-url <page-url> <url>` | Ingest a URL |
//! | `kdesk add-file <page-url> <path>` | Ingest a file |
//! | `kdesk check <index>` | Validate an index directly |
//! | `kdesk ping` | Backend health check |
//! | `kdesk preview-index <title>` | Show the index name the backend derives |
//!
//! ## Examples
//!
//! ```bash
//! # First source: creates an index and prints the page URL that carries it
//! kdesk add-url "http://localhost:3000/" https://example.com/guide
//!
//! # Later sources go into the bound index
//! kdesk add-file "http://localhost:3000/?vector_index=guide_index_name" ./notes.pdf
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use knowledge_desk::backend::{HttpBackend, KnowledgeBackend};
use knowledge_desk::binder::{BindResult, IndexBinder};
use knowledge_desk::config::{self, Config};
use knowledge_desk::error::KbError;
use knowledge_desk::ingest::{preview_index_name, UploadFile};
use knowledge_desk::location::SessionBinding;
use knowledge_desk::modal::{ModalState, Tab};
use knowledge_desk::models::VectorIndexId;
use knowledge_desk::page::{KnowledgePage, SubmitOutcome};
use knowledge_desk::redirect::RecordingNavigator;

/// Knowledge Desk CLI: bind a chat session to a backend vector index and
/// register knowledge sources against it.
#[derive(Parser)]
#[command(name = "kdesk", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Missing file falls back to built-in defaults; a file that exists but
    /// fails to parse is an error.
    #[arg(long, global = true, default_value = "./config/kdesk.toml")]
    config: PathBuf,

    /// Show debug logs (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page session: validate its index and list sources.
    ///
    /// When the index is invalid, waits for the delayed redirect and prints
    /// the clean page URL.
    Open {
        /// Page URL, e.g. `http://localhost:3000/?vector_index=abc`.
        page: String,

        /// Mark a source as excluded (by id, e.g. `source-0`). Repeatable.
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Submit a URL as a knowledge source.
    AddUrl {
        page: String,
        url: String,
    },

    /// Upload a file as a knowledge source.
    AddFile {
        page: String,
        path: PathBuf,
    },

    /// Validate an index against the backend and list its sources.
    Check {
        index: String,
    },

    /// Check that the backend is reachable.
    Ping,

    /// Print the index name the backend derives from a document title.
    PreviewIndex {
        title: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "knowledge_desk=debug,kdesk=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Config::minimal().finalize()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads the config and builds the HTTP backend it points at.
fn connect(path: &Path) -> Result<(Config, Arc<dyn KnowledgeBackend>)> {
    let cfg = load_config(path)?;
    let backend: Arc<dyn KnowledgeBackend> = Arc::new(HttpBackend::from_config(&cfg)?);
    Ok((cfg, backend))
}

/// Runs a command. `Ok(false)` means the operation failed in a way already
/// reported to the user.
async fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::PreviewIndex { title } => {
            println!("{}", preview_index_name(&title));
            Ok(true)
        }
        Commands::Ping => {
            let (cfg, backend) = connect(&cli.config)?;
            match backend.ping().await {
                Ok(message) => {
                    println!("{} ({})", message, cfg.backend.base_url);
                    Ok(true)
                }
                Err(e) => {
                    println!("unreachable: {}", e);
                    Ok(false)
                }
            }
        }
        Commands::Check { index } => {
            let (cfg, backend) = connect(&cli.config)?;
            run_check(&cfg, backend, &index).await
        }
        Commands::Open { page, exclude } => {
            let (cfg, backend) = connect(&cli.config)?;
            let (mut page, nav) = open_page(&cfg, backend, &page)?;
            page.load().await;
            for id in &exclude {
                if !page.set_included(id, false) {
                    println!("warning: no source with id {}", id);
                }
            }
            print_page(&page);
            if let Some(redirect) = page.take_pending_redirect() {
                redirect.await.context("redirect task failed")?;
                if let Some(target) = nav.last() {
                    println!("navigate: {}", target);
                }
                return Ok(false);
            }
            Ok(true)
        }
        Commands::AddUrl { page, url } => {
            let (cfg, backend) = connect(&cli.config)?;
            let (mut page, nav) = open_page(&cfg, backend, &page)?;
            if !prepare_submit(&mut page, &nav, Tab::Url).await? {
                return Ok(false);
            }
            let result = page.submit_url(&url).await;
            Ok(report_submit(&page, result))
        }
        Commands::AddFile { page, path } => {
            let file = UploadFile::from_path(&path).await?;
            let (cfg, backend) = connect(&cli.config)?;
            let (mut page, nav) = open_page(&cfg, backend, &page)?;
            if !prepare_submit(&mut page, &nav, Tab::File).await? {
                return Ok(false);
            }
            let result = page.submit_file(Some(file)).await;
            Ok(report_submit(&page, result))
        }
    }
}

fn open_page(
    cfg: &Config,
    backend: Arc<dyn KnowledgeBackend>,
    page: &str,
) -> Result<(KnowledgePage, Arc<RecordingNavigator>)> {
    let location = Url::parse(page).with_context(|| format!("Invalid page URL: {}", page))?;
    let nav = Arc::new(RecordingNavigator::new());
    let page = KnowledgePage::from_config(cfg, location, backend, nav.clone());
    Ok((page, nav))
}

/// Loads the page and opens the modal on `tab`. Returns `false` when the
/// page's index is invalid: the delayed redirect is awaited and reported,
/// and nothing is submitted.
async fn prepare_submit(
    page: &mut KnowledgePage,
    nav: &RecordingNavigator,
    tab: Tab,
) -> Result<bool> {
    page.load().await;
    if let Some(redirect) = page.take_pending_redirect() {
        print_notifications(page);
        redirect.await.context("redirect task failed")?;
        if let Some(target) = nav.last() {
            println!("navigate: {}", target);
        }
        return Ok(false);
    }
    page.open_modal(tab);
    Ok(true)
}

fn report_submit(
    page: &KnowledgePage,
    result: Result<SubmitOutcome, KbError>,
) -> bool {
    print_notifications(page);
    match result {
        Ok(SubmitOutcome::Navigated(target)) => {
            println!("navigate: {}", target);
            true
        }
        Ok(SubmitOutcome::Appended(source)) => {
            println!("added {}  {}", source.id, source.title);
            print_sources(page);
            true
        }
        Ok(SubmitOutcome::Discarded) => true,
        Err(_) => false,
    }
}

async fn run_check(cfg: &Config, backend: Arc<dyn KnowledgeBackend>, index: &str) -> Result<bool> {
    let Some(index) = VectorIndexId::new(index) else {
        println!("no index given");
        return Ok(false);
    };
    let base = SessionBinding::new(cfg.base_url()?, cfg.session.index_param.clone());
    let binding = SessionBinding::new(base.with_index(&index), cfg.session.index_param.clone());

    match IndexBinder::new().bind(backend.as_ref(), &binding).await {
        BindResult::Bound { index, sources } => {
            println!("index {}: ok ({} sources)", index, sources.len());
            for source in sources {
                println!("  {}", source);
            }
            Ok(true)
        }
        BindResult::Invalid { error, .. } => {
            println!("{}", error);
            Ok(false)
        }
        BindResult::NoIndex => {
            println!("no index given");
            Ok(false)
        }
    }
}

fn print_page(page: &KnowledgePage) {
    println!("page:   {}", page.binding().location());
    println!("state:  {}", page.state().label());
    let modal = match page.modal_state() {
        ModalState::Closed => "closed".to_string(),
        ModalState::Open(tab) => format!("open ({})", tab.label()),
        ModalState::Navigating(url) => format!("navigating to {}", url),
    };
    println!("modal:  {}", modal);
    print_sources(page);
    print_notifications(page);
}

fn print_sources(page: &KnowledgePage) {
    let sources = page.sources();
    if sources.is_empty() {
        println!("no sources");
        return;
    }
    println!("{:<40} {:<9} TITLE", "ID", "INCLUDED");
    for source in sources {
        let mark = if source.included { "[x]" } else { "[ ]" };
        println!("{:<40} {:<9} {}", source.id, mark, source.title);
    }
}

fn print_notifications(page: &KnowledgePage) {
    for note in page.notifications().items() {
        println!("{}: {}", note.level.label(), note.message);
    }
}
