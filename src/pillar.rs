//! Pillar data resolution — source selection, parsing, and colon-path
//! key normalization.

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Origin};

/// Environment variable consulted for inline pillar data when no data
/// file is given.
pub const PILLAR_ENV: &str = "DESALT_PILLAR";

/// On-disk pillar document format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Guess from the file extension: `.json` is JSON, anything else YAML.
    Auto,
    Yaml,
    Json,
}

/// Produce the single pillar mapping for this run.
///
/// Exactly one source is consulted, in order of precedence: an explicit
/// data file, then inline data captured from [`PILLAR_ENV`], then
/// nothing at all (an empty mapping). Sources are never merged; when
/// both are present the file wins outright.
pub fn resolve(
    file: Option<&Path>,
    inline: Option<&str>,
    format: Format,
) -> Result<Mapping, Error> {
    let doc = match (file, inline) {
        (Some(path), _) => {
            let origin = Origin::File(path.to_path_buf());
            let text = fs::read_to_string(path).map_err(|source| Error::NotFound {
                origin: origin.clone(),
                source,
            })?;
            parse(&text, detect(format, path), origin)?
        }
        // Environment data has no extension to guess from; it is
        // always YAML, which also accepts inline JSON-style mappings.
        (None, Some(text)) => parse(text, Format::Yaml, Origin::Environment)?,
        (None, None) => Mapping::new(),
    };

    Ok(normalize(doc))
}

/// Parse one pillar document. The top level must be a mapping; an
/// empty document counts as an empty mapping.
fn parse(text: &str, format: Format, origin: Origin) -> Result<Mapping, Error> {
    let doc: Value = match format {
        Format::Json => serde_json::from_str(text).map_err(|e| Error::Parse {
            origin: origin.clone(),
            source: Box::new(e),
        })?,
        Format::Auto | Format::Yaml => serde_yaml::from_str(text).map_err(|e| Error::Parse {
            origin: origin.clone(),
            source: Box::new(e),
        })?,
    };

    match doc {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(Error::NotAMapping { origin }),
    }
}

/// Pick a concrete format for a data file.
fn detect(format: Format, path: &Path) -> Format {
    if format != Format::Auto {
        return format;
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Format::Json,
        _ => Format::Yaml,
    }
}

/// Expand top-level colon-path keys into nested mappings, so
/// `"a:b": 1` and `a: {b: 1}` produce identical lookups in the
/// template. Later document entries win on overlapping leaves.
fn normalize(doc: Mapping) -> Mapping {
    let mut out = Mapping::new();

    for (key, value) in doc {
        match &key {
            Value::String(s) if s.contains(':') => {
                let path: Vec<&str> = s.split(':').collect();
                insert_path(&mut out, &path, value);
            }
            _ => {
                out.insert(key, value);
            }
        }
    }

    out
}

/// Insert `value` at the nested location named by `path`, creating
/// intermediate mappings as needed. Anything already sitting at an
/// intermediate step that is not a mapping is replaced; the leaf is
/// replaced outright.
fn insert_path(map: &mut Mapping, path: &[&str], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            map.insert(Value::String((*leaf).to_owned()), value);
        }
        [head, rest @ ..] => {
            let key = Value::String((*head).to_owned());
            if !matches!(map.get(&key), Some(Value::Mapping(_))) {
                map.insert(key.clone(), Value::Mapping(Mapping::new()));
            }
            if let Some(Value::Mapping(inner)) = map.get_mut(&key) {
                insert_path(inner, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(s: &str) -> Value {
        Value::String(s.to_owned())
    }

    fn parsed(text: &str) -> Mapping {
        resolve(None, Some(text), Format::Auto).unwrap()
    }

    #[test]
    fn colon_key_and_nested_input_are_equivalent() {
        let flat = parsed("kube-config:node-env: production");
        let nested = parsed("kube-config:\n  node-env: production");
        assert_eq!(flat, nested);
    }

    #[test]
    fn colon_key_merges_into_existing_nested_mapping() {
        let got = parsed("service:\n  port: 8080\nservice:host: db01");
        let service = got.get(&key("service")).unwrap().as_mapping().unwrap();
        assert_eq!(service.get(&key("port")), Some(&Value::from(8080)));
        assert_eq!(service.get(&key("host")), Some(&Value::from("db01")));
    }

    #[test]
    fn later_entry_wins_on_overlapping_leaf() {
        let got = parsed("service:\n  host: first\nservice:host: second");
        let service = got.get(&key("service")).unwrap().as_mapping().unwrap();
        assert_eq!(service.get(&key("host")), Some(&Value::from("second")));
    }

    #[test]
    fn deep_colon_path_expands_every_level() {
        let got = parsed("a:b:c: leaf");
        let nested = parsed("a:\n  b:\n    c: leaf");
        assert_eq!(got, nested);
    }

    #[test]
    fn no_source_yields_empty_mapping() {
        let got = resolve(None, None, Format::Auto).unwrap();
        assert_eq!(got, Mapping::new());
    }

    #[test]
    fn empty_document_yields_empty_mapping() {
        assert_eq!(parsed(""), Mapping::new());
    }

    #[test]
    fn environment_used_when_no_file_given() {
        let got = resolve(None, Some("name: from-env"), Format::Auto).unwrap();
        assert_eq!(got.get(&key("name")), Some(&Value::from("from-env")));
    }

    #[test]
    fn file_beats_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pillar.yaml");
        fs::write(&path, "name: from-file").unwrap();

        let got = resolve(Some(path.as_path()), Some("name: from-env"), Format::Auto).unwrap();
        assert_eq!(got.get(&key("name")), Some(&Value::from("from-file")));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve(Some(Path::new("/no/such/pillar.yaml")), None, Format::Auto)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn malformed_document_names_the_environment() {
        let err = resolve(None, Some("a: [unclosed"), Format::Auto).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                origin: Origin::Environment,
                ..
            }
        ));
    }

    #[test]
    fn malformed_file_names_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "a: [unclosed").unwrap();

        match resolve(Some(path.as_path()), None, Format::Auto).unwrap_err() {
            Error::Parse { origin, .. } => assert_eq!(origin, Origin::File(path)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn top_level_sequence_is_rejected() {
        let err = resolve(None, Some("- a\n- b"), Format::Auto).unwrap_err();
        assert!(matches!(err, Error::NotAMapping { .. }));
    }

    #[test]
    fn json_file_parses_under_auto_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pillar.json");
        fs::write(&path, r#"{"name": "World", "port": 8080}"#).unwrap();

        let got = resolve(Some(path.as_path()), None, Format::Auto).unwrap();
        assert_eq!(got.get(&key("name")), Some(&Value::from("World")));
        assert_eq!(got.get(&key("port")), Some(&Value::from(8080)));
    }

    #[test]
    fn explicit_format_overrides_the_extension() {
        assert_eq!(detect(Format::Yaml, Path::new("data.json")), Format::Yaml);
        assert_eq!(detect(Format::Auto, Path::new("data.json")), Format::Json);
        assert_eq!(detect(Format::Auto, Path::new("data.yml")), Format::Yaml);
        assert_eq!(detect(Format::Auto, Path::new("data")), Format::Yaml);
    }
}
