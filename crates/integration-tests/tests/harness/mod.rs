#![allow(dead_code)]

pub mod config;
pub mod mock_identity;
pub mod mock_upstream;
pub mod server;

/// Parse an NDJSON body into one value per line
pub fn json_lines(body: &str) -> Vec<serde_json::Value> {
    assert!(
        body.is_empty() || body.ends_with('\n'),
        "body must be newline-terminated: {body:?}"
    );
    body.lines()
        .map(|line| serde_json::from_str(line).unwrap_or_else(|e| panic!("invalid JSON line {line:?}: {e}")))
        .collect()
}

/// Content fragment of a relayed chunk line
pub fn delta_content(line: &serde_json::Value) -> Option<&str> {
    line["choices"].get(0).and_then(|choice| choice["delta"]["content"].as_str())
}
