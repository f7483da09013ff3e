//! Pantry Worker - Command Line Host
//!
//! Drives the offline worker against a live origin, persisting its caches
//! between runs.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pantry_net::{CacheStorage, HttpNetwork, Method, Network, NetworkConfig, Request, Response};
use pantry_worker::{
    ConsolePlatform, EventOutcome, FetchDecision, PushMessage, ServiceWorker, WorkerConfig,
    WorkerEvent,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pantry-worker", version, about = "Offline cache worker for the grocery-list app")]
struct Cli {
    /// Origin the worker is registered for (overrides the config file)
    #[arg(long)]
    origin: Option<String>,

    /// Worker configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// File the named caches are persisted in
    #[arg(long, default_value = "pantry-caches.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Install and activate the worker
    Start,
    /// Send one request through the activated worker
    Fetch {
        url: String,
        /// Accept header to send
        #[arg(long)]
        accept: Option<String>,
        #[arg(long, default_value = "GET")]
        method: String,
    },
    /// List caches and their entries
    Caches,
    /// Deliver a push message
    Push { payload: Option<String> },
    /// Deliver a background sync event
    Sync {
        #[arg(default_value = "grocery-sync")]
        tag: String,
    },
}

impl Command {
    /// Whether the command can change cache contents
    fn writes_caches(&self) -> bool {
        matches!(self, Command::Start | Command::Fetch { .. })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => WorkerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => WorkerConfig::default(),
    };
    if let Some(origin) = &cli.origin {
        config = config.with_origin(origin);
        config.validate()?;
    }
    let storage = CacheStorage::load(&cli.store)
        .with_context(|| format!("loading caches from {}", cli.store.display()))?;
    let network = HttpNetwork::new(NetworkConfig {
        origin: config.origin.clone(),
        ..Default::default()
    })?;

    let writes = cli.command.writes_caches();
    smol::block_on(run(cli.command, config, storage.clone(), &network))?;

    if writes {
        storage
            .save(&cli.store)
            .with_context(|| format!("saving caches to {}", cli.store.display()))?;
    }
    Ok(())
}

async fn run<N: Network>(
    command: Command,
    config: WorkerConfig,
    storage: CacheStorage,
    network: &N,
) -> Result<()> {
    if let Command::Start = command {
        let worker = ServiceWorker::new(config, storage, network, ConsolePlatform);
        worker.dispatch(WorkerEvent::Install).await?;
        if let EventOutcome::Activated { deleted } = worker.dispatch(WorkerEvent::Activate).await? {
            println!("activated; deleted {} old cache(s)", deleted.len());
            for name in deleted {
                println!("  - {}", name);
            }
        }
        return Ok(());
    }

    if let Command::Caches = command {
        list_caches(&storage);
        return Ok(());
    }

    if !storage.has(&config.static_cache) {
        bail!("worker is not installed; run `pantry-worker start` first");
    }
    let worker = ServiceWorker::activated(config, storage, network, ConsolePlatform);

    match command {
        Command::Fetch { url, accept, method } => {
            let method: Method = method.parse()?;
            let mut request = Request::new(method, &url);
            if let Some(accept) = accept {
                request = request.with_header("Accept", &accept);
            }

            match worker.fetch(&request).await {
                FetchDecision::Respond { response, source } => {
                    println!("source: {:?}", source);
                    print_response(&response);
                }
                FetchDecision::Passthrough => {
                    println!("source: passthrough");
                    print_response(&network.fetch(&request).await?);
                }
            }
        }
        Command::Push { payload } => {
            let message = payload.map(PushMessage::new).unwrap_or_default();
            worker.dispatch(WorkerEvent::Push(message)).await?;
        }
        Command::Sync { tag } => {
            if let EventOutcome::Sync(outcome) = worker.dispatch(WorkerEvent::Sync { tag }).await? {
                println!("sync: {:?}", outcome);
            }
        }
        Command::Start | Command::Caches => {}
    }
    Ok(())
}

fn list_caches(storage: &CacheStorage) {
    let names = storage.keys();
    if names.is_empty() {
        println!("no caches");
    }
    for name in names {
        let cache = storage.open(&name);
        let stats = cache.stats();
        println!("{} ({} entries, {} bytes)", name, stats.entry_count, stats.total_size);
        for key in cache.keys() {
            println!("  {}", key);
        }
    }
}

fn print_response(response: &Response) {
    println!("HTTP {} {}", response.status, response.status_text);
    for (name, value) in response.headers.iter() {
        println!("{}: {}", name, value);
    }
    println!();
    println!("{}", String::from_utf8_lossy(&response.body));
}
