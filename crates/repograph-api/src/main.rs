use clap::{Parser, Subcommand};
use repograph_api::pipeline::{index_pipeline, parse_pipeline, IndexRequest, ParseRequest};
use repograph_api::{server, AppState};
use repograph_core::{RepoGraphError, Settings};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repograph", version, about = "Program-graph semantic code search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Parse a repository into graph.json
    Parse {
        /// Local path or git URL
        repo: String,
        #[arg(long)]
        branch: Option<String>,
        /// Output path for graph.json
        #[arg(long)]
        output: Option<String>,
    },
    /// Embed and upsert an existing graph into the vector index
    Index {
        #[arg(long)]
        collection: Option<String>,
        /// Path of the graph file to index
        #[arg(long)]
        graph: Option<String>,
        #[arg(long)]
        recreate: bool,
    },
    /// Semantic search over an indexed collection
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        #[arg(long)]
        collection: Option<String>,
    },
    /// Search plus answer-path assembly through the graph
    Analyze {
        query: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        #[arg(long)]
        collection: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(std::cmp::max(2, num_cpus::get()))
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

/// 0 success, 2 invalid argument, 3 fetch failure, 4 parse failure,
/// 5 index unreachable, 6 query failed.
fn exit_code(error: &RepoGraphError) -> i32 {
    match error {
        RepoGraphError::InvalidInput(_) => 2,
        RepoGraphError::FetchFailed(_) => 3,
        RepoGraphError::ParseFailed(_) => 4,
        RepoGraphError::IndexUnavailable(_) => 5,
        RepoGraphError::IndexNotReady(_)
        | RepoGraphError::NotFound(_)
        | RepoGraphError::EmbedFailed(_)
        | RepoGraphError::Timeout(_) => 6,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<(), RepoGraphError> {
    let mut settings = Settings::from_env();

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            let state = AppState::from_settings(settings);
            server::serve(state).await
        }

        Command::Parse {
            repo,
            branch,
            output,
        } => {
            let state = AppState::from_settings(settings);
            let request = parse_request_for(repo, branch, output);
            let result =
                parse_pipeline(&state, &CancellationToken::new(), "cli", &request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }

        Command::Index {
            collection,
            graph,
            recreate,
        } => {
            let state = AppState::from_settings(settings);
            let request = IndexRequest {
                collection,
                graph_path: graph,
                recreate,
            };
            let result =
                index_pipeline(&state, &CancellationToken::new(), "cli", &request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }

        Command::Search {
            query,
            top_k,
            collection,
        } => {
            let state = AppState::from_settings(settings);
            let collection = collection.unwrap_or_else(|| state.settings.collection.clone());
            let results = state.query.search(&query, top_k, &collection).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }

        Command::Analyze {
            query,
            top_k,
            collection,
        } => {
            let state = AppState::from_settings(settings);
            let collection = collection.unwrap_or_else(|| state.settings.collection.clone());
            state.ensure_graph().await?;
            let guard = state.graph.read().await;
            let graph = guard
                .as_ref()
                .ok_or_else(|| RepoGraphError::NotFound("graph not loaded".into()))?;
            let answer = state.query.analyze(graph, &query, top_k, &collection).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
            Ok(())
        }
    }
}

/// A repo argument that names an existing directory is a local checkout;
/// anything else is treated as a clone URL.
fn parse_request_for(repo: String, branch: Option<String>, output: Option<String>) -> ParseRequest {
    if std::path::Path::new(&repo).is_dir() {
        ParseRequest {
            repo_path: Some(repo),
            branch,
            output_path: output,
            ..ParseRequest::default()
        }
    } else {
        ParseRequest {
            repo_url: Some(repo),
            branch,
            output_path: output,
            ..ParseRequest::default()
        }
    }
}
