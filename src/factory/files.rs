//! Uploaded files from a `$_FILES`-shaped description
//!
//! Each form field is described by parallel `name`, `type`, `tmp_name`,
//! `size` and `error` entries. For a single file they are scalars; for
//! multiple files (`docs[]`) or named files (`docs[cv]`) each entry is an
//! array or map with the same shape, which is zipped back into one
//! [`UploadedFile`] per position.

use crate::environment::Environment;
use crate::http::{FileTree, Params, UploadedFile};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

/// The parallel attribute entries at one level of a field description
#[derive(Clone, Copy)]
struct Attributes<'a> {
    name: Option<&'a Value>,
    media_type: Option<&'a Value>,
    tmp_name: Option<&'a Value>,
    size: Option<&'a Value>,
}

impl<'a> Attributes<'a> {
    fn of(entry: &'a Params) -> Self {
        Attributes {
            name: entry.get("name"),
            media_type: entry.get("type"),
            tmp_name: entry.get("tmp_name"),
            size: entry.get("size"),
        }
    }

    /// Descend every entry one level
    fn select(&self, pick: impl Fn(&'a Value) -> Option<&'a Value>) -> Self {
        Attributes {
            name: self.name.and_then(&pick),
            media_type: self.media_type.and_then(&pick),
            tmp_name: self.tmp_name.and_then(&pick),
            size: self.size.and_then(&pick),
        }
    }
}

/// Build the uploaded files tree
///
/// Every field maps to a list, even when it holds a single file, unless it
/// uses named entries, which map to a nested map. Files without a
/// `tmp_name` or a readable `error` code are left out, and fields without
/// an `error` entry are skipped.
pub fn from_environment(env: &Environment) -> IndexMap<String, FileTree> {
    let Some(fields) = env.files().as_object() else {
        return IndexMap::new();
    };

    fields
        .iter()
        .filter_map(|(field, entry)| {
            let Some(entry) = entry.as_object() else {
                warn!(field = %field, "Ignoring malformed uploaded file entry");
                return None;
            };
            let Some(error) = entry.get("error") else {
                warn!(field = %field, "Ignoring uploaded file entry without error code");
                return None;
            };

            let tree = match build(field, Attributes::of(entry), error) {
                Some(FileTree::File(file)) => FileTree::List(vec![FileTree::File(file)]),
                Some(tree) => tree,
                None => FileTree::List(Vec::new()),
            };
            Some((field.clone(), tree))
        })
        .collect()
}

fn build(field: &str, attributes: Attributes<'_>, error: &Value) -> Option<FileTree> {
    match error {
        Value::Array(errors) => Some(FileTree::List(
            errors
                .iter()
                .enumerate()
                .filter_map(|(i, error)| build(field, attributes.select(|v| v.get(i)), error))
                .collect(),
        )),
        Value::Object(errors) => Some(FileTree::Map(
            errors
                .iter()
                .filter_map(|(key, error)| {
                    let tree = build(field, attributes.select(|v| v.get(key)), error)?;
                    Some((key.clone(), tree))
                })
                .collect(),
        )),
        error => file(field, attributes, error).map(FileTree::File),
    }
}

fn file(field: &str, attributes: Attributes<'_>, error: &Value) -> Option<UploadedFile> {
    let Some(tmp_name) = attributes.tmp_name.and_then(Value::as_str) else {
        warn!(field = %field, "Ignoring uploaded file without tmp_name");
        return None;
    };
    let Some(error) = as_integer(error) else {
        warn!(field = %field, error = %error, "Ignoring uploaded file with invalid error code");
        return None;
    };

    Some(UploadedFile::new(
        tmp_name,
        attributes.name.and_then(Value::as_str).map(String::from),
        attributes.media_type.and_then(Value::as_str).map(String::from),
        attributes.size.and_then(as_integer).and_then(|size| u64::try_from(size).ok()),
        error,
    ))
}

/// Read an integer given as a JSON number or a numeric string
fn as_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn files(description: Value) -> IndexMap<String, FileTree> {
        from_environment(&Environment::builder().files(description).build())
    }

    #[test]
    fn test_single_file() {
        let tree = files(json!({
            "avatar": {
                "name": "me.png",
                "type": "image/png",
                "tmp_name": "/tmp/php1",
                "size": 123,
                "error": 0
            }
        }));

        let FileTree::List(items) = &tree["avatar"] else {
            panic!("single file should be wrapped in a list");
        };
        assert_eq!(items.len(), 1);
        let file = items[0].as_file().unwrap();
        assert_eq!(file.file().to_str(), Some("/tmp/php1"));
        assert_eq!(file.client_filename(), Some("me.png"));
        assert_eq!(file.client_media_type(), Some("image/png"));
        assert_eq!(file.size(), Some(123));
        assert_eq!(file.error(), 0);
    }

    #[test]
    fn test_multiple_files() {
        let tree = files(json!({
            "docs": {
                "name": ["a.txt", "b.txt"],
                "type": ["text/plain", "text/plain"],
                "tmp_name": ["/tmp/php1", "/tmp/php2"],
                "size": [1, "2"],
                "error": [0, "4"]
            }
        }));

        let files = tree["docs"].files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].client_filename(), Some("b.txt"));
        assert_eq!(files[1].size(), Some(2));
        assert_eq!(files[1].error(), 4);
    }

    #[test]
    fn test_named_files() {
        let tree = files(json!({
            "docs": {
                "name": {"cv": "cv.pdf"},
                "tmp_name": {"cv": "/tmp/php9"},
                "error": {"cv": 0}
            }
        }));

        let FileTree::Map(named) = &tree["docs"] else {
            panic!("named files should form a map");
        };
        let cv = named["cv"].as_file().unwrap();
        assert_eq!(cv.client_filename(), Some("cv.pdf"));
        assert_eq!(cv.client_media_type(), None);
        assert_eq!(cv.size(), None);
    }

    #[test]
    fn test_missing_attributes() {
        let tree = files(json!({
            "upload": {"tmp_name": "/tmp/php1", "error": 0}
        }));
        let file = tree["upload"].files()[0];
        assert_eq!(file.client_filename(), None);
        assert_eq!(file.client_media_type(), None);
        assert_eq!(file.size(), None);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let tree = files(json!({
            "no_tmp": {"name": "a.txt", "error": 0},
            "no_error": {"tmp_name": "/tmp/php1"},
            "scalar": "nonsense",
            "partial": {
                "tmp_name": ["/tmp/php1"],
                "error": [0, 0]
            }
        }));

        assert!(tree["no_tmp"].files().is_empty());
        assert!(!tree.contains_key("no_error"));
        assert!(!tree.contains_key("scalar"));
        assert_eq!(tree["partial"].files().len(), 1);
    }

    #[test]
    fn test_no_files() {
        assert!(files(json!({})).is_empty());
        assert!(files(Value::Null).is_empty());
    }
}
