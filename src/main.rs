use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;

use fleetcache::config::Config;
use fleetcache::http::{ClientSettings, HttpClient, ReqwestTransport, RequestOptions};
use fleetcache::logging;
use fleetcache::storage::StorageEngine;

#[derive(Parser, Debug)]
#[command(name = "fleetcache")]
#[command(about = "Cached access to the fleet maintenance API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fleetcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// GET a path from the API and print the JSON body
  Get {
    /// Path relative to the configured base URL (e.g. /vehicles)
    path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short = 'q', long = "query", value_parser = parse_key_val)]
    query: Vec<(String, String)>,

    /// Skip the response cache for this call
    #[arg(long)]
    no_cache: bool,
  },

  /// Inspect or manage the local storage namespace
  Storage {
    #[command(subcommand)]
    action: StorageAction,
  },

  /// Drop all cached API responses
  ClearCache,
}

#[derive(Subcommand, Debug)]
enum StorageAction {
  /// List live keys
  Keys,
  /// Print all live entries as JSON
  Export,
  /// Load entries from a JSON file produced by `export`
  Import { file: PathBuf },
  /// Remove every key in the namespace
  Clear,
  /// Remove expired entries
  Purge,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
  s.split_once('=')
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(config.log_file.as_deref())?;

  let storage = Arc::new(StorageEngine::open(config.storage.clone(), None)?);

  match args.command {
    Command::Get {
      path,
      query,
      no_cache,
    } => {
      let transport = Arc::new(ReqwestTransport::new()?);
      let mut client = HttpClient::new(
        ClientSettings::from(&config.api),
        Arc::clone(&storage),
        transport,
      );
      if let Some(token) = Config::get_api_token() {
        client.set_token(token);
      }

      let mut options = RequestOptions::new();
      for (key, value) in query {
        options = options.param(key, value);
      }
      if no_cache {
        options = options.cache(false);
      }

      let response = client.get::<serde_json::Value>(&path, options).await?;
      println!("{}", serde_json::to_string_pretty(&response.data)?);
    }

    Command::Storage { action } => match action {
      StorageAction::Keys => {
        for key in storage.keys() {
          println!("{}", key);
        }
      }
      StorageAction::Export => println!("{}", storage.export()),
      StorageAction::Import { file } => {
        let json = std::fs::read_to_string(&file)
          .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
        let imported = storage.import(&json);
        println!("imported {} keys", imported);
      }
      StorageAction::Clear => storage.clear(),
      StorageAction::Purge => println!("purged {} expired keys", storage.purge_expired()),
    },

    Command::ClearCache => {
      let transport = Arc::new(ReqwestTransport::new()?);
      let client = HttpClient::new(ClientSettings::from(&config.api), storage, transport);
      println!("removed {} cached responses", client.clear_cache());
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_key_val() {
    assert_eq!(
      parse_key_val("status=active"),
      Ok(("status".to_string(), "active".to_string()))
    );
    assert_eq!(
      parse_key_val("filter=a=b"),
      Ok(("filter".to_string(), "a=b".to_string()))
    );
    assert!(parse_key_val("novalue").is_err());
  }

  #[test]
  fn test_cli_parses_get() {
    let args =
      Args::try_parse_from(["fleetcache", "get", "/vehicles", "-q", "page=2", "--no-cache"]).unwrap();
    match args.command {
      Command::Get {
        path,
        query,
        no_cache,
      } => {
        assert_eq!(path, "/vehicles");
        assert_eq!(query, vec![("page".to_string(), "2".to_string())]);
        assert!(no_cache);
      }
      other => panic!("unexpected command {:?}", other),
    }
  }
}
