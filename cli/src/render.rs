use std::io::{self, Write};

use serde_json::{Map, Value};

/// Truthiness of a decoded `result` value. A falsy result means "nothing
/// to display" for generic actions, so `0`, `false`, `""` and empty
/// containers all suppress output.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Natural display form of a value: strings unquoted, everything else
/// compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered merge of one worker mapping into `out` under a node label.
///
/// Keys become `"<name> (<label>)"` and every entry gains a leading `node`
/// field carrying the label. An already-present key is overwritten: last
/// write wins.
pub fn merge_labeled(out: &mut Map<String, Value>, workers: &Map<String, Value>, label: &str) {
    for (name, metrics) in workers {
        let mut entry = Map::new();
        entry.insert("node".to_string(), Value::String(label.to_string()));
        if let Value::Object(metrics) = metrics {
            for (key, value) in metrics {
                entry.insert(key.clone(), value.clone());
            }
        }
        out.insert(format!("{name} ({label})"), Value::Object(entry));
    }
}

/// Build the flattened status report: `info` first, then the remaining
/// top-level fields, then the `nodes` and aggregated `workers` mappings
/// when the deployment spans nodes.
pub fn flatten_report(
    display: Map<String, Value>,
    data: Map<String, Value>,
    nodes: &Map<String, Value>,
) -> Map<String, Value> {
    let mut report = Map::new();
    report.insert("info".to_string(), Value::Object(display));
    for (key, value) in data {
        report.insert(key, value);
    }
    if nodes.is_empty() {
        return report;
    }

    let mut node_infos = Map::new();
    for (name, node) in nodes {
        node_infos.insert(name.clone(), node.get("info").cloned().unwrap_or(Value::Null));
    }
    report.insert("nodes".to_string(), Value::Object(node_infos));

    let mut workers = Map::new();
    if let Some(Value::Object(hub_workers)) = report.get("workers") {
        merge_labeled(&mut workers, hub_workers, "Hub");
    }
    for (name, node) in nodes {
        if let Some(Value::Object(node_workers)) = node.get("workers") {
            merge_labeled(&mut workers, node_workers, name);
        }
    }
    // Replaces the hub-only mapping in place, keeping its position.
    report.insert("workers".to_string(), Value::Object(workers));
    report
}

/// Render the deployment banner for the status report.
///
/// The `extra` sub-mapping is appended after the primary fields and the
/// `packages` sequence is re-joined into one comma-separated value.
pub fn info_panel<W: Write>(
    out: &mut W,
    base_url: &str,
    mut display: Map<String, Value>,
) -> io::Result<()> {
    let extra = match display.remove("extra") {
        Some(Value::Object(extra)) => extra,
        _ => Map::new(),
    };
    if let Some(Value::Array(packages)) = display.get("packages") {
        let joined = packages
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", ");
        display.insert("packages".to_string(), Value::String(joined));
    }

    writeln!(out)?;
    writeln!(out, "  Inspecting {base_url}")?;
    writeln!(out)?;
    for (key, value) in &display {
        writeln!(out, "  {key}: {}", display_value(value))?;
    }
    for (key, value) in &extra {
        writeln!(out, "  {key}: {}", display_value(value))?;
    }
    Ok(())
}

/// Render one worker mapping, one block per worker in insertion order,
/// with a blank line separating blocks.
pub fn worker_list<W: Write>(
    out: &mut W,
    workers: &Map<String, Value>,
    node: Option<&str>,
) -> io::Result<()> {
    for (name, metrics) in workers {
        writeln!(out)?;
        match node {
            Some(node) => writeln!(out, "  {name}, ({node})")?,
            None => writeln!(out, "  {name}")?,
        }
        if let Value::Object(metrics) = metrics {
            for (key, value) in metrics {
                writeln!(out, "  \t{key}: {}", display_value(value))?;
            }
        }
    }
    Ok(())
}
