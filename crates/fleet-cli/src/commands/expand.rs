use crate::support::{parse_vars_or_exit, print_json_or_exit};
use fleet_kernel::{expand, mapping_for, references};
use serde_json::json;

pub fn run(input: String, vars: Vec<String>, json_output: bool) {
    let vars = parse_vars_or_exit(&vars);
    let output = expand(&input, mapping_for(&[&vars]));
    let unresolved: Vec<String> = references(&input)
        .into_iter()
        .filter(|name| !vars.contains_key(name))
        .collect();

    if json_output {
        print_json_or_exit(&json!({
            "input": input,
            "output": output,
            "unresolved": unresolved,
        }));
    } else {
        println!("{output}");
        for name in unresolved {
            tracing::warn!(name, "no value given; left as a reference");
        }
    }
}
