mod cli;

use clap::Parser;
use color_eyre::Result;
use std::process::ExitCode;
use std::sync::Arc;

use paydash::api::HttpTransport;
use paydash::cache::QueryCache;
use paydash::config::{Config, StorageKind};
use paydash::notify::ConsoleNotifier;
use paydash::ops::Client;
use paydash::session::{KeyValueStorage, MemoryStorage, SessionStore, SqliteStorage};

#[tokio::main]
async fn main() -> Result<ExitCode> {
  color_eyre::install()?;

  let args = cli::Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let _log_guard = paydash::logging::init(&config.log)?;

  let storage: Box<dyn KeyValueStorage> = match config.session.storage {
    StorageKind::Sqlite => Box::new(SqliteStorage::open(config.session.path.as_deref())?),
    StorageKind::Memory => Box::new(MemoryStorage::new()),
  };
  let session = Arc::new(SessionStore::new(storage));
  session.restore();

  let client = Client::new(
    Arc::new(HttpTransport::new(&config.api)?),
    session,
    QueryCache::new(config.cache.stale_policy()),
    Arc::new(ConsoleNotifier),
  );

  cli::run(&client, args.command).await
}
