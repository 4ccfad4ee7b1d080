use fleet_control::ControllerConfig;
use fleet_store::MemoryStore;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FLEET_LOG";

/// Log to stderr, filtered by `FLEET_LOG`, then `RUST_LOG`, then `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn parse_vars_or_exit(vars: &[String]) -> BTreeMap<String, String> {
    let mut parsed = BTreeMap::new();
    for var in vars {
        let Some((name, value)) = var.split_once('=') else {
            exit_with(format_args!("--var expects NAME=VALUE, got {var:?}"));
        };
        if name.is_empty() {
            exit_with(format_args!("--var has an empty name: {var:?}"));
        }
        parsed.insert(name.to_string(), value.to_string());
    }
    parsed
}

pub fn load_state_or_exit(state_arg: &str) -> (MemoryStore, PathBuf) {
    let path = PathBuf::from(state_arg);
    let store = MemoryStore::load_jsonl(&path)
        .unwrap_or_else(|e| exit_with(format_args!("failed to load {}: {e}", path.display())));
    (store, path)
}

pub fn load_config_or_exit(config_arg: Option<&str>) -> ControllerConfig {
    match config_arg {
        Some(path) => ControllerConfig::load(path).unwrap_or_else(|e| exit_with(e)),
        None => ControllerConfig::default(),
    }
}

pub fn print_json_or_exit(payload: &serde_json::Value) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_with(format_args!("failed to render json: {e}")),
    }
}
