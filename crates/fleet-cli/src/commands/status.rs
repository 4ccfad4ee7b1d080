use crate::support::{exit_with, load_state_or_exit, print_json_or_exit};
use fleet_control::api::{Assemblage, Module};
use fleet_store::{MemoryStore, Resource};
use serde_json::{Value, json};

fn typed_or_exit<R: Resource>(store: &MemoryStore) -> Vec<R> {
    store
        .snapshot()
        .into_iter()
        .filter(|object| object.kind == R::KIND)
        .map(|object| {
            let key = object.key();
            object
                .into_resource::<R>()
                .unwrap_or_else(|e| exit_with(format_args!("malformed {key}: {e}")))
        })
        .collect()
}

pub fn run(state: String, json_output: bool) {
    let (store, path) = load_state_or_exit(&state);
    let modules: Vec<Module> = typed_or_exit(&store);
    let assemblages: Vec<Assemblage> = typed_or_exit(&store);

    if json_output {
        let modules: Vec<Value> = modules
            .iter()
            .map(|m| {
                json!({
                    "namespace": m.metadata.namespace,
                    "name": m.metadata.name,
                    "summary": m.status.summary,
                })
            })
            .collect();
        let assemblages: Vec<Value> = assemblages
            .iter()
            .map(|a| {
                json!({
                    "namespace": a.metadata.namespace,
                    "name": a.metadata.name,
                    "syncs": a.status.syncs,
                })
            })
            .collect();
        print_json_or_exit(&json!({
            "state": path.display().to_string(),
            "modules": modules,
            "assemblages": assemblages,
        }));
        return;
    }

    println!("fleet status --state {}", path.display());
    println!("  Modules: {}", modules.len());
    for module in &modules {
        match &module.status.summary {
            Some(s) => println!(
                "    - {}/{}: total={} succeeded={} updating={} failed={}",
                module.metadata.namespace,
                module.metadata.name,
                s.total,
                s.succeeded,
                s.updating,
                s.failed
            ),
            None => println!(
                "    - {}/{}: not reconciled",
                module.metadata.namespace, module.metadata.name
            ),
        }
    }
    println!("  Assemblages: {}", assemblages.len());
    for asm in &assemblages {
        let syncs: Vec<String> = asm
            .status
            .syncs
            .iter()
            .map(|s| format!("{}={}", s.name, s.state))
            .collect();
        println!(
            "    - {}/{}: {}",
            asm.metadata.namespace,
            asm.metadata.name,
            if syncs.is_empty() {
                "no syncs".to_string()
            } else {
                syncs.join(" ")
            }
        );
    }
}
