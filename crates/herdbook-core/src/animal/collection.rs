use std::fs;
use std::path::Path;

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use super::{AnimalRecord, RecordError};

/// On-disk shape of an exported animal list: a bare array or a `data` envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum CollectionFile {
    List(Vec<Value>),
    Envelope { data: Vec<Value> },
}

impl CollectionFile {
    fn into_items(self) -> Vec<Value> {
        match self {
            CollectionFile::List(items) | CollectionFile::Envelope { data: items } => items,
        }
    }
}

/// Loads a local animal collection from a `.json`, `.yaml` or `.yml` file.
///
/// Records that fail to normalize, such as ones without a valid id, are
/// skipped with a warning.
pub fn load_collection(path: impl AsRef<Path>) -> Result<Vec<AnimalRecord>, RecordError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| RecordError::io(path, e))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let file: CollectionFile = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };

    let records = file
        .into_items()
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<AnimalRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping record {} in {}: {}", index, path.display(), e);
                None
            }
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_envelope() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("animals.json");
        fs::write(&path, r#"{"data": [{"id": 1}, {"id": 2, "idFather": 1}]}"#).unwrap();

        let records = load_collection(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].father_id(), Some(1));
    }

    #[test]
    fn test_invalid_records_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("animals.json");
        fs::write(
            &path,
            r#"[{"id": 5, "idFather": 2}, {"id": 2, "sex": "Macho"}, {"record": "no-id"}, {"id": "abc"}]"#,
        )
        .unwrap();

        let records = load_collection(&path).unwrap();
        let ids: Vec<u64> = records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![5, 2]);
        assert_eq!(records[0].father_id(), Some(2));
    }

    #[test]
    fn test_invalid_yaml_record_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("animals.yml");
        fs::write(&path, "data:\n  - id: 1\n  - name: nameless\n").unwrap();

        let records = load_collection(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), 1);
    }

    #[test]
    fn test_load_yaml_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("animals.yaml");
        fs::write(&path, "- id: 1\n  sex: Macho\n- id: 2\n  father_id: 1\n").unwrap();

        let records = load_collection(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].father_id(), Some(1));
    }

    #[test]
    fn test_missing_file() {
        let result = load_collection("/nonexistent/animals.json");
        assert!(matches!(result, Err(RecordError::Io { .. })));
    }
}
