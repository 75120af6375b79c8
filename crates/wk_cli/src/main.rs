use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info};
use wk_core::ResultSet;
use wk_gateway::prelude::*;
use wk_session::prelude::*;
use wk_session::{DetailStatus, LibraryStatus, SaveStatus, SearchState, SearchStatus};
use wk_storage::prelude::*;

mod logging;
mod render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RemoteKind {
    /// The article API over HTTP
    Http,
    /// A built-in sample catalog, nothing leaves the process
    Memory,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Search, read and annotate Wikipedia articles", long_about = None)]
struct Cli {
    #[arg(long, value_enum, default_value = "http")]
    remote: RemoteKind,
    /// Base URL of the article API (default http://localhost:8000/api/)
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Where the last search query is kept: file or memory
    #[arg(long, default_value = "file")]
    store: String,
    #[arg(long)]
    state_dir: Option<PathBuf>,
    /// Quiet period before typed input triggers a search
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search Wikipedia
    Search { query: String },
    /// Show an article with its analysis
    Show { page_id: String },
    /// Save an article to the library
    Save { page_id: String },
    /// List saved articles
    Saved {
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
    /// Delete a saved article by its id
    Delete {
        id: i64,
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
    /// Replace the personal notes of a saved article
    Notes { page_id: String, text: String },
    /// Type queries interactively; `:q` exits
    Repl,
}

fn build_gateway(cli: &Cli) -> anyhow::Result<Arc<dyn Gateway>> {
    match cli.remote {
        RemoteKind::Http => {
            let mut config = GatewayConfig::default();
            if let Some(url) = &cli.api_url {
                config = config.with_base_url(url);
            }
            if let Some(secs) = cli.timeout_secs {
                config = config.with_timeout(Duration::from_secs(secs));
            }
            info!("🌐 Using article API at {}", config.base_url);
            Ok(Arc::new(HttpGateway::new(&config)?))
        }
        RemoteKind::Memory => {
            info!("🧪 Using the built-in sample catalog");
            Ok(Arc::new(InMemoryGateway::with_sample_catalog()))
        }
    }
}

async fn show_detail(detail: &DetailSession, page_id: &str) -> anyhow::Result<()> {
    if detail.load(page_id).await != DetailStatus::Ready {
        let state = detail.snapshot();
        bail!(state.error_info.unwrap_or_else(|| format!("Could not load {}", page_id)));
    }
    Ok(())
}

async fn load_library(library: &LibrarySession, page: u64) -> anyhow::Result<()> {
    library.load_page(page).await;
    let state = library.snapshot();
    if state.status == LibraryStatus::Error {
        bail!(state.error_info.unwrap_or_else(|| "Could not load saved articles".to_string()));
    }
    Ok(())
}

async fn print_results(mut rx: watch::Receiver<SearchState>) {
    let mut shown: Option<ResultSet> = None;
    let mut last_error: Option<String> = None;
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        match state.status {
            SearchStatus::Success if state.result_set != shown => {
                if let Some(set) = &state.result_set {
                    render::results(set);
                }
                shown = state.result_set;
                last_error = None;
            }
            SearchStatus::Error if state.error_info != last_error => {
                if let Some(error) = &state.error_info {
                    eprintln!("❌ {}", error);
                }
                last_error = state.error_info;
            }
            _ => {}
        }
    }
}

async fn repl(
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn KeyValueStore>,
    config: &SessionConfig,
) -> anyhow::Result<()> {
    let search = SearchSession::new(gateway, store).await;
    let restored = search.snapshot().query_text;
    if !restored.is_empty() {
        println!("Last search: {}", restored);
    }

    let (mut debouncer, committed) = Debouncer::new(config.debounce);
    let driver = search.drive(committed);
    let printer = tokio::spawn(print_results(search.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == ":q" {
            break;
        }
        search.set_query(&line).await;
        if line.trim().is_empty() {
            debouncer.cancel();
            search.commit(&line).await;
        } else {
            debouncer.push(line);
        }
    }

    debug!("👋 Leaving repl");
    debouncer.cancel();
    driver.abort();
    printer.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = SessionConfig {
        debounce: Duration::from_millis(cli.debounce_ms),
        ..SessionConfig::default()
    };
    let gateway = build_gateway(&cli)?;
    let store_kind = StoreKind::from_str(&cli.store)?;
    let store = create_store(store_kind, cli.state_dir.as_deref())
        .await
        .with_context(|| format!("Failed to open the {} store", store_kind))?;

    match cli.command {
        Commands::Search { query } => {
            let search = SearchSession::new(gateway, store).await;
            search.set_query(&query).await;
            search.commit(&query).await;
            let state = search.snapshot();
            match state.status {
                SearchStatus::Success => {
                    if let Some(set) = &state.result_set {
                        render::results(set);
                    }
                }
                SearchStatus::Error => {
                    bail!(state.error_info.unwrap_or_else(|| "Search failed".to_string()));
                }
                _ => println!("Nothing to search for"),
            }
        }
        Commands::Show { page_id } => {
            let detail = DetailSession::new(gateway);
            show_detail(&detail, &page_id).await?;
            let state = detail.snapshot();
            if let Some(article) = &state.article {
                render::article(article, state.analysis.as_ref());
            }
        }
        Commands::Save { page_id } => {
            let detail = DetailSession::new(gateway);
            show_detail(&detail, &page_id).await?;
            match detail.save().await {
                SaveStatus::Saved => {
                    if let Some(article) = detail.article() {
                        println!("💾 Saved {} as #{}", article.title, article.id);
                    }
                }
                SaveStatus::Failed => {
                    let error = detail.snapshot().error_info;
                    bail!(error.unwrap_or_else(|| "Save failed".to_string()));
                }
                status => println!("Save not performed ({:?})", status),
            }
        }
        Commands::Saved { page } => {
            let library = LibrarySession::with_page_size(gateway, config.page_size);
            load_library(&library, page).await?;
            render::library(&library.snapshot());
        }
        Commands::Delete { id, page } => {
            let library = LibrarySession::with_page_size(gateway, config.page_size);
            load_library(&library, page).await?;
            let phase = library.delete_item(id).await;
            render::mutation(phase, "Delete");
            let state = library.snapshot();
            if let Some(error) = &state.error_info {
                eprintln!("❌ {}", error);
            }
            render::library(&state);
        }
        Commands::Notes { page_id, text } => {
            let detail = DetailSession::new(gateway.clone());
            show_detail(&detail, &page_id).await?;
            let notes = NotesEditor::new(gateway, detail.clone());
            if !notes.begin_current() {
                let error = notes.snapshot().error_info;
                bail!(error.unwrap_or_else(|| format!("Cannot edit notes for {}", page_id)));
            }
            notes.set_draft(&text);
            let phase = notes.confirm().await;
            render::mutation(phase, "Notes for");
            if let Some(error) = notes.snapshot().error_info {
                bail!(error);
            }
        }
        Commands::Repl => repl(gateway, store, &config).await?,
    }

    Ok(())
}
