use anyhow::Context;
use fanout::WorkerRecord;
use std::{fs, path::Path};

/// Reads the worker records stored at `path`.
///
/// The file holds a JSON array of objects. Record order is preserved because
/// it decides dispatch order and report order.
pub fn load_records(path: &Path) -> anyhow::Result<Vec<WorkerRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read registry {}", path.display()))?;
    let records: Vec<WorkerRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("registry {} is not an array of records", path.display()))?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Loaded {} records ({} live) from {}",
        records.len(),
        records.iter().filter(|r| r.is_live()).count(),
        path.display()
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("fanout-probe-registry-{name}.json"));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_records_in_order() {
        let path = write(
            "ok",
            r#"[
                {"url": "http://a:7331", "token": "t", "proc": {"pid": 1}},
                {":url": "http://b:7331", "proc": {}},
                {"url": "http://c:7331", ":proc": "running"}
            ]"#,
        );

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 3);
        let live: Vec<_> = records.iter().map(WorkerRecord::is_live).collect();
        assert_eq!(live, [true, false, true]);
    }

    #[test]
    fn rejects_non_arrays() {
        let path = write("object", r#"{"url": "http://a:7331"}"#);
        let err = load_records(&path).unwrap_err();
        assert!(err.to_string().contains("not an array"));
    }
}
