use std::path::PathBuf;

use clap::{parser::ValueSource, ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use route_cloak::config::{self, CloakConfig};
use route_cloak::obfuscation::{Classification, KeySource, SecretKey};
use route_cloak::routing::RouteCloak;
use serde_json::json;

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Encode, decode and classify obfuscated route segments", long_about = None)]
struct Cli {
    /// Obfuscation key. Falls back to the gateway's key resolution when absent.
    #[arg(short, long, env = "ROUTE_ENCRYPTION_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Gateway config file, for route lists and key settings.
    #[arg(short, long, env = "ROUTE_CLOAK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a plaintext path prefix (e.g. publisher/dashboard)
    Encode { path: String },
    /// Decode a token back to its plaintext path
    Decode { token: String },
    /// Classify a single path segment
    Classify { segment: String },
    /// Show what the gateway would do with a request path
    Route {
        path: String,
        /// Pretend the redirect marker header is present
        #[arg(long)]
        marker: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Cli::command().get_matches();
    let source = key_source(&matches);
    let cli = Cli::from_arg_matches(&matches)?;

    let cloak_config = match &cli.config {
        Some(path) => config::load_config(path)?.cloak,
        None => CloakConfig::default(),
    };
    let key = match cli.key.as_deref() {
        Some(key) => SecretKey::new(key, source)?,
        None => config::resolve_key(&cloak_config)?,
    };
    if key.is_fallback() {
        eprintln!("warning: using the public fallback key");
    }

    let cloak = RouteCloak::from_config(&cloak_config, key);
    let classifier = cloak.classifier();

    let output = match cli.command {
        Commands::Encode { path } => {
            let token = classifier.codec().encode(&path);
            json!({ "path": path, "token": token, "url": format!("/{}", token) })
        }
        Commands::Decode { token } => match classifier.codec().decode(&token) {
            Ok(path) => json!({ "token": token, "path": path }),
            Err(e) => json!({ "token": token, "error": e.to_string() }),
        },
        Commands::Classify { segment } => {
            let (class, decoded) = match classifier.classify(&segment) {
                Classification::Plain => ("plain", None),
                Classification::Token { decoded } => ("token", Some(decoded)),
                Classification::Ambiguous => ("ambiguous", None),
            };
            json!({
                "segment": segment,
                "classification": class,
                "is_encoded": class == "token",
                "decoded": decoded,
            })
        }
        Commands::Route { path, marker } => {
            let (path_only, query) = match path.split_once('?') {
                Some((p, q)) => (p, Some(q)),
                None => (path.as_str(), None),
            };
            let decision = cloak.decide(path_only, query, marker);
            json!({
                "path": path,
                "outcome": decision.outcome(),
                "reason": decision.reason(),
                "decision": format!("{:?}", decision),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Where `--key` came from: the flag itself or its environment fallback.
fn key_source(matches: &ArgMatches) -> KeySource {
    match matches.value_source("key") {
        Some(ValueSource::EnvVariable) => KeySource::Environment,
        _ => KeySource::CommandLine,
    }
}
