//! Input resolution shared by the orchestrator (frontier nodes) and the
//! coordinator (ready successors) — §4.1 "resolved inputs" and §4.3 step 5.

use std::collections::HashMap;
use std::str::FromStr;

use nodes::kind::NodeKind;
use serde_json::Value;

/// Resolved inputs for a frontier node: the Run's declared `inputs`
/// filtered to the keys this node type declares it consumes.
pub fn resolve_frontier_inputs(node_type: &str, run_inputs: &Value) -> Value {
    let Ok(kind) = NodeKind::from_str(node_type) else {
        return Value::Object(Default::default());
    };
    filter_keys(run_inputs.as_object(), kind.consumed_input_keys())
}

/// Resolved inputs for a non-frontier node: the key-union merge of its
/// predecessors' outputs (later predecessor, by node-id ordering, wins on
/// collision — §4.3), overlaid on the run's own declared inputs, then
/// filtered to the keys this node type consumes.
///
/// `sorted_dep_ids` must already be in ascending node-id order; callers
/// (the coordinator) own that sort so the tie-break rule is visible at the
/// call site rather than hidden in this helper.
pub fn resolve_successor_inputs(
    node_type: &str,
    run_inputs: &Value,
    sorted_dep_ids: &[String],
    outputs: &HashMap<String, Value>,
) -> Value {
    let Ok(kind) = NodeKind::from_str(node_type) else {
        return Value::Object(Default::default());
    };
    let consumed = kind.consumed_input_keys();

    let mut merged = serde_json::Map::new();
    if let Some(base) = run_inputs.as_object() {
        for key in consumed {
            if let Some(v) = base.get(*key) {
                merged.insert((*key).to_string(), v.clone());
            }
        }
    }
    // Ascending id order; each subsequent predecessor's value for a shared
    // key overwrites the previous one, so the *last* (greatest id) wins.
    for dep_id in sorted_dep_ids {
        if let Some(out) = outputs.get(dep_id).and_then(Value::as_object) {
            for key in consumed {
                if let Some(v) = out.get(*key) {
                    merged.insert((*key).to_string(), v.clone());
                }
            }
        }
    }

    Value::Object(merged)
}

fn filter_keys(source: Option<&serde_json::Map<String, Value>>, keys: &[&str]) -> Value {
    let mut out = serde_json::Map::new();
    if let Some(obj) = source {
        for key in keys {
            if let Some(v) = obj.get(*key) {
                out.insert((*key).to_string(), v.clone());
            }
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frontier_inputs_filter_to_consumed_keys() {
        let run_inputs = json!({ "data": {"a": 1}, "unused": "nope" });
        let resolved = resolve_frontier_inputs("ingest.webhook", &run_inputs);
        assert_eq!(resolved, json!({ "data": {"a": 1} }));
    }

    #[test]
    fn successor_inputs_merge_with_later_dep_winning() {
        let mut outputs = HashMap::new();
        outputs.insert("node_b".to_string(), json!({ "content": "from-b" }));
        outputs.insert("node_c".to_string(), json!({ "content": "from-c" }));

        let resolved = resolve_successor_inputs(
            "act.email",
            &json!({}),
            &["node_b".to_string(), "node_c".to_string()],
            &outputs,
        );
        assert_eq!(resolved["content"], "from-c");
    }
}
