use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use finboard::cache::{KvStore, NoopStore, PersistentCache, SqliteStore};
use finboard::catalog::{self, INDICATORS_KR, INDICATORS_US};
use finboard::config::Config;
use finboard::fetch::ReqwestTransport;
use finboard::logging;
use finboard::providers::{DataService, ProviderClient};

#[derive(Parser, Debug)]
#[command(name = "finboard")]
#[command(about = "Cache-first market and macro data for a finance dashboard")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/finboard/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Also write logs to a daily file, under DIR or the default log directory
  #[arg(long, value_name = "DIR", num_args = 0..=1, global = true)]
  log_dir: Option<Option<PathBuf>>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Load every dashboard indicator
  Dashboard,
  /// Latest value of an economic series
  Fred { series_id: String },
  /// Economic series over a window
  Series {
    series_id: String,
    #[arg(long, default_value_t = 365)]
    days: u32,
  },
  /// Latest monthly statistic
  Ecos { stat_code: String, item_code: String },
  /// Top crypto assets by market cap
  Crypto,
  /// One crypto asset in detail
  Coin { coin_id: String },
  /// USD exchange rates
  Forex,
  /// Fear & greed index readings
  FearGreed,
  /// Headlines of every built-in feed for a tag
  News {
    tag: String,
    /// Load only this feed instead of the built-in ones
    #[arg(long)]
    url: Option<String>,
  },
  /// When a cache key was last written
  CacheAge { key: String },
}

fn open_store(config: &Config) -> Result<Box<dyn KvStore>> {
  if !config.cache.enabled {
    return Ok(Box::new(NoopStore));
  }

  let store = match &config.cache.path {
    Some(path) => SqliteStore::open_at(path, config.cache.quota_bytes)?,
    None => SqliteStore::open(config.cache.quota_bytes)?,
  };
  Ok(Box::new(store))
}

fn print<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let log_dir = match args.log_dir {
    Some(Some(dir)) => Some(dir),
    Some(None) => Some(logging::default_log_dir()?),
    None => None,
  };
  let _log_guard = logging::init(log_dir.as_deref())?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let store = open_store(&config)?;
  let cache = PersistentCache::with_namespace(store, config.cache.namespace.clone());
  let client = ProviderClient::new(Arc::new(ReqwestTransport::new()?), &config);
  let service = DataService::new(client, cache, config.ttl.clone());

  match args.command {
    Command::Dashboard => {
      let indicators: Vec<_> = INDICATORS_US.iter().chain(INDICATORS_KR).copied().collect();
      let values = catalog::load_indicators(&service, &indicators, config.batch.width).await;
      print(&values)
    }
    Command::Fred { series_id } => print(&service.fred_latest(&series_id).await),
    Command::Series { series_id, days } => print(&service.fred_series(&series_id, days).await),
    Command::Ecos {
      stat_code,
      item_code,
    } => print(&service.ecos_latest(&stat_code, &item_code).await),
    Command::Crypto => print(&service.crypto_markets().await),
    Command::Coin { coin_id } => print(&service.crypto_detail(&coin_id).await),
    Command::Forex => print(&service.forex_rates().await),
    Command::FearGreed => print(&service.fear_greed().await),
    Command::News { tag, url } => match url {
      Some(url) => print(&service.news(&url, &tag).await),
      None => {
        let feeds = catalog::feeds_for(&tag);
        if feeds.is_empty() {
          return Err(eyre!("No built-in feed for tag {}; pass --url", tag));
        }
        print(&catalog::load_news(&service, &feeds, &tag, config.batch.width).await)
      }
    },
    Command::CacheAge { key } => {
      let cached_at = service.cache().timestamp(&key);
      print(&cached_at)
    }
  }
}
