use crate::support::{exit_with, load_config_or_exit, load_state_or_exit, print_json_or_exit};
use fleet_control::{DeliveryMode, Manager, SettleReport};
use fleet_store::ObjectStore;
use serde_json::json;
use std::sync::Arc;

pub fn run(state: String, config: Option<String>, json_output: bool) {
    let config = load_config_or_exit(config.as_deref());
    if config.delivery != DeliveryMode::Direct {
        exit_with("converge runs direct delivery only; set delivery = \"direct\"");
    }
    let (store, path) = load_state_or_exit(&state);
    let store = Arc::new(store);
    let writes_before = store.write_count();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| exit_with(format_args!("failed to create tokio runtime: {e}")));
    let report: SettleReport = runtime
        .block_on(Manager::new(store.clone(), config).run_until_settled())
        .unwrap_or_else(|e| exit_with(format_args!("converge failed: {e}")));

    let writes = store.write_count() - writes_before;
    store
        .save_jsonl(&path)
        .unwrap_or_else(|e| exit_with(format_args!("failed to save {}: {e}", path.display())));

    let failed: Vec<_> = report
        .failed
        .iter()
        .map(|(key, error)| json!({"object": key.to_string(), "error": error}))
        .collect();
    if json_output {
        print_json_or_exit(&json!({
            "state": path.display().to_string(),
            "objects": store.len(),
            "reconciled": report.reconciled,
            "writes": writes,
            "failed": failed,
        }));
    } else {
        println!("fleet converge --state {}", path.display());
        println!("  Objects: {}", store.len());
        println!("  Reconciled: {}", report.reconciled);
        println!("  Writes: {writes}");
        println!("  Failed: {}", report.failed.len());
        for (key, error) in &report.failed {
            println!("    - {key}: {error}");
        }
    }

    if !report.failed.is_empty() {
        std::process::exit(2);
    }
}
