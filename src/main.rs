use anidost_catalog::catalog::{
    CatalogAggregator, FilmDetailView, FilmLibrary, GenreSelection, HomeView, SeriesDetailView,
};
use anidost_catalog::catalog_store::{CatalogBackend, CommentTarget, EntryKind, SqliteCatalogStore};
use anidost_catalog::config::{AppConfig, CliConfig, FileConfig};
use anidost_catalog::discussion::{DiscussionThread, PostOutcome};
use anidost_catalog::featured::FeaturedRotator;
use anidost_catalog::search::SearchEngine;
use anidost_catalog::session::SessionContext;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[clap(name = "anidost-catalog", about = "Browse the Anidost catalog from the command line")]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite catalog database file.
    #[clap(long = "db", value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Default log level (overridden by LOG_LEVEL).
    #[clap(long)]
    pub logging_level: Option<String>,

    /// Base URL used when building share links.
    #[clap(long)]
    pub share_base_url: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Series,
    Film,
}

impl From<KindArg> for EntryKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Series => EntryKind::Series,
            KindArg::Film => EntryKind::Film,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create (or validate) the catalog database.
    Init,

    /// Home page shelves, optionally filtered by genre.
    Home {
        #[clap(long)]
        genre: Option<String>,
    },

    /// A series with its episodes.
    Series {
        id: String,
        #[clap(long)]
        language: Option<String>,
        #[clap(long)]
        season: Option<u32>,
    },

    /// A film with its playback links.
    Film {
        id: String,
        #[clap(long)]
        language: Option<String>,
    },

    /// All films, alphabetically.
    Films {
        #[clap(long)]
        query: Option<String>,
    },

    /// Search series by title.
    Search { query: String },

    /// The featured carousel.
    Featured {
        /// Number of rotation intervals to wait before printing.
        #[clap(long, default_value_t = 0)]
        ticks: u32,
    },

    /// Comments on an entry, newest first.
    Comments { kind: KindArg, id: String },

    /// Comment on an entry.
    Post {
        kind: KindArg,
        id: String,
        #[clap(long)]
        user: String,
        content: String,
    },

    /// Delete one of your comments.
    Delete {
        comment_id: String,
        /// Needed to locate the thread the comment is in.
        #[clap(long, value_enum)]
        kind: KindArg,
        #[clap(long)]
        entry: String,
        #[clap(long)]
        user: String,
    },

    /// Record that a user started watching an entry.
    Play {
        kind: KindArg,
        id: String,
        #[clap(long)]
        user: String,
        #[clap(long)]
        episode: Option<u32>,
    },
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            db_path: args.db_path.clone(),
            logging_level: args.logging_level.clone(),
            share_base_url: args.share_base_url.clone(),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let app_config = AppConfig::resolve(&(&cli_args).into(), file_config)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(app_config.logging_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    info!("Opening catalog database at {:?}...", app_config.db_path);
    let store = SqliteCatalogStore::new(&app_config.db_path)?;
    let backend: Arc<dyn CatalogBackend> = Arc::new(store);
    let aggregator = CatalogAggregator::new(backend.clone());

    run(cli_args.command, &app_config, backend, aggregator).await
}

async fn run(
    command: Command,
    app_config: &AppConfig,
    backend: Arc<dyn CatalogBackend>,
    aggregator: CatalogAggregator,
) -> Result<()> {
    match command {
        Command::Init => print_json(&json!({
            "db_path": app_config.db_path,
            "status": "ready",
        })),

        Command::Home { genre } => {
            let home = HomeView::new(aggregator, &app_config.catalog);
            home.load().await?;
            if let Some(genre) = genre {
                home.select_genre(GenreSelection::from_label(&genre)).await;
            }
            print_json(&json!({
                "genre": home.genre().await,
                "genres": home.genres().await,
                "shelves": home.shelves().await,
            }))
        }

        Command::Series {
            id,
            language,
            season,
        } => {
            let view = SeriesDetailView::new(aggregator, &app_config.catalog);
            view.load(&id).await?;
            if language.is_some() {
                view.select_language(language).await;
            }
            if season.is_some() {
                view.select_season(season).await;
            }
            let snapshot = view.snapshot().await;
            print_json(&json!({
                "detail": snapshot.ready().map(|d| d.as_ref()),
                "selection": view.selection().await,
                "visible_episodes": view.visible_episodes().await,
                "share": view.share_payload(&app_config.share_base_url).await,
            }))
        }

        Command::Film { id, language } => {
            let view = FilmDetailView::new(aggregator, &app_config.catalog);
            view.load(&id).await?;
            if let Some(language) = language {
                if !view.select_language(&language).await {
                    anyhow::bail!("Film {} has no links in {}", id, language);
                }
            }
            let snapshot = view.snapshot().await;
            print_json(&json!({
                "detail": snapshot.ready().map(|d| d.as_ref()),
                "language": view.selected_language().await,
                "visible_links": view.visible_links().await,
                "share": view.share_payload(&app_config.share_base_url).await,
            }))
        }

        Command::Films { query } => {
            let library = FilmLibrary::new(backend);
            library.load().await?;
            if let Some(query) = query {
                library.set_query(&query).await;
            }
            print_json(&library.visible().await)
        }

        Command::Search { query } => {
            let engine = SearchEngine::new(backend, &app_config.search);
            let mut rx = engine.subscribe();
            let ticket = engine.on_query_changed(&query);
            let state = rx
                .wait_for(|state| state.revision == ticket)
                .await
                .context("Search engine went away")?
                .clone();
            print_json(&state)
        }

        Command::Featured { ticks } => {
            let rotator = FeaturedRotator::load(&aggregator, &app_config.featured).await;
            if let Some(err) = rotator.load_error() {
                if rotator.is_empty() {
                    anyhow::bail!("Failed to load featured content: {}", err);
                }
            }
            rotator.start();
            if ticks > 0 {
                // Land halfway into the next interval so the last tick has fired.
                let wait = app_config.featured.rotation_interval * ticks
                    + app_config.featured.rotation_interval / 2;
                tokio::time::sleep(wait).await;
            }
            rotator.stop();
            print_json(&rotator.state())
        }

        Command::Comments { kind, id } => {
            let thread = DiscussionThread::new(backend, CommentTarget::new(kind.into(), id));
            thread.fetch().await?;
            let now = chrono::Utc::now().timestamp();
            let comments: Vec<_> = thread
                .comments()
                .await
                .into_iter()
                .map(|c| {
                    let age = c.age(now);
                    json!({ "comment": c, "age": age })
                })
                .collect();
            print_json(&comments)
        }

        Command::Post {
            kind,
            id,
            user,
            content,
        } => {
            let thread = DiscussionThread::new(backend, CommentTarget::new(kind.into(), id));
            match thread.post(&SessionContext::signed_in(user), &content).await? {
                PostOutcome::Posted(record) => print_json(&record),
                PostOutcome::Ignored => print_json(&json!({ "status": "ignored" })),
            }
        }

        Command::Delete {
            comment_id,
            kind,
            entry,
            user,
        } => {
            let thread = DiscussionThread::new(backend, CommentTarget::new(kind.into(), entry));
            thread.fetch().await?;
            thread
                .delete(&SessionContext::signed_in(user), &comment_id)
                .await?;
            print_json(&thread.comments().await)
        }

        Command::Play {
            kind,
            id,
            user,
            episode,
        } => {
            let session = SessionContext::signed_in(user);
            let update = match EntryKind::from(kind) {
                EntryKind::Series => {
                    let view = SeriesDetailView::new(aggregator, &app_config.catalog);
                    view.load(&id).await?;
                    view.play(&session, episode).await?
                }
                EntryKind::Film => {
                    let view = FilmDetailView::new(aggregator, &app_config.catalog);
                    view.load(&id).await?;
                    view.play(&session).await?
                }
            };
            print_json(&update)
        }
    }
}
