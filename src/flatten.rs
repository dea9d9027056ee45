//! Flattens `grib_dump -j` output into a plain key → value object.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{ser::PrettyFormatter, Map, Serializer, Value};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("dump has no messages")]
    MissingMessages,
    #[error("`{}` is not a grib dump", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("io error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The dump document. Only `messages` is interpreted; everything else is kept as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DumpRecord {
    #[serde(default)]
    pub messages: Vec<Vec<DumpEntry>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpEntry {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

/// Keys of the first message mapped to their values, in first-seen order.
pub type FlattenedRecord = Map<String, Value>;

/// Flattens the first message of a dump. A key that appears more than once
/// takes its last value but keeps its first position.
pub fn flatten(record: &DumpRecord) -> Result<FlattenedRecord, FlattenError> {
    let first = record
        .messages
        .first()
        .ok_or(FlattenError::MissingMessages)?;

    let mut flat = Map::with_capacity(first.len());
    for entry in first {
        flat.insert(entry.key.clone(), entry.value.clone());
    }

    Ok(flat)
}

/// `foo.json` → `foo_new.json`; a name without extension just gets `_new`.
pub fn flattened_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let new_name = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{stem}_new.{extension}"),
        _ => format!("{name}_new"),
    };

    path.with_file_name(new_name)
}

pub fn read_dump(path: &Path) -> Result<DumpRecord, FlattenError> {
    let file = File::open(path).map_err(|source| FlattenError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| FlattenError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Serializes `value` as JSON indented by four spaces.
pub fn write_pretty<T: Serialize, W: Write>(value: &T, writer: W) -> serde_json::Result<()> {
    let mut serializer = Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)
}

/// Writes `value` to `path` in the [`write_pretty`] layout.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), FlattenError> {
    let io_error = |source| FlattenError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    write_pretty(value, &mut writer).map_err(|e| io_error(io::Error::from(e)))?;
    writer.flush().map_err(io_error)
}

/// Reads a dump file, flattens it and writes the result beside it.
pub fn flatten_file(path: &Path) -> Result<PathBuf, FlattenError> {
    let record = read_dump(path)?;
    let flat = flatten(&record)?;
    let target = flattened_path(path);

    write_json(&flat, &target)?;
    info!(source = %path.display(), target = %target.display(), keys = flat.len(), "Flattened");

    Ok(target)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn record(value: Value) -> DumpRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn should_flatten_the_first_message() {
        let dump = record(json!({
            "messages": [
                [{"key": "a", "value": 1}, {"key": "b", "value": 2}],
                [{"key": "c", "value": 3}]
            ]
        }));

        assert_eq!(Value::Object(flatten(&dump).unwrap()), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn should_let_the_last_duplicate_win() {
        let dump = record(json!({
            "messages": [[
                {"key": "a", "value": 1},
                {"key": "b", "value": [1, 2]},
                {"key": "a", "value": "second"}
            ]]
        }));

        let flat = flatten(&dump).unwrap();

        assert_eq!(flat["a"], json!("second"));
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn should_reject_empty_messages() {
        let dump = record(json!({"messages": []}));
        assert!(matches!(flatten(&dump), Err(FlattenError::MissingMessages)));
    }

    #[test]
    fn should_reject_absent_messages() {
        let dump = record(json!({"something": "else"}));
        assert!(matches!(flatten(&dump), Err(FlattenError::MissingMessages)));
        assert_eq!(dump.extra["something"], json!("else"));
    }

    #[test]
    fn should_keep_null_values() {
        let dump = record(json!({"messages": [[{"key": "missingValue"}]]}));
        assert_eq!(flatten(&dump).unwrap()["missingValue"], Value::Null);
    }

    #[test]
    fn should_insert_new_before_the_extension() {
        assert_eq!(flattened_path(Path::new("foo.json")), PathBuf::from("foo_new.json"));
        assert_eq!(
            flattened_path(Path::new("/d/icon.grib2.json")),
            PathBuf::from("/d/icon.grib2_new.json")
        );
        assert_eq!(flattened_path(Path::new("/d/dump")), PathBuf::from("/d/dump_new"));
        assert_eq!(flattened_path(Path::new(".json")), PathBuf::from(".json_new"));
    }

    #[test]
    fn should_write_the_flattened_file_beside_the_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("foo.json");
        fs::write(
            &source,
            r#"{"messages": [[{"key": "shortName", "value": "u"}, {"key": "level", "value": 10}]]}"#,
        )
        .unwrap();

        let target = flatten_file(&source).unwrap();

        assert_eq!(target, dir.path().join("foo_new.json"));
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "{\n    \"shortName\": \"u\",\n    \"level\": 10\n}"
        );
    }

    #[test]
    fn should_not_write_anything_for_an_empty_dump() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("empty.json");
        fs::write(&source, r#"{"messages": []}"#).unwrap();

        assert!(matches!(flatten_file(&source), Err(FlattenError::MissingMessages)));
        assert!(!dir.path().join("empty_new.json").exists());
    }

    #[test]
    fn should_report_invalid_json() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.json");
        fs::write(&source, "GRIB").unwrap();

        let err = flatten_file(&source).unwrap_err();

        assert!(matches!(err, FlattenError::Malformed { .. }));
        let rendered = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(rendered.matches("expected value").count(), 1);
        assert!(rendered.contains("is not a grib dump: expected value"));
    }
}
