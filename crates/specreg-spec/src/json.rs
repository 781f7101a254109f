use serde_json::{Map, Value};
use tracing::debug;

use specreg_crypto::ContentHasher;
use specreg_types::{Language, SpecInfo, SpecVersion};

use crate::error::{SpecError, SpecResult};
use crate::processor::SpecProcessor;

/// Number of hex characters in a content-derived version.
pub const VERSION_HASH_LEN: usize = 20;

const TABLENAME_KEY: &str = "x-tablename";
const INHERITS_KEY: &str = "x-inherits";

/// Reference processor for JSON OpenAPI documents.
///
/// A schema under `components.schemas` counts as a model when it carries
/// `x-tablename` or a truthy `x-inherits`. The canonical body keeps only the
/// schemas and the descriptive parts of `info`, with every object's keys
/// sorted, so two uploads that differ only in formatting canonicalize to the
/// same bytes and hence the same derived version.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSpecProcessor;

impl JsonSpecProcessor {
    pub fn new() -> Self {
        Self
    }

    fn is_model(name: &str, schema: &Map<String, Value>) -> SpecResult<bool> {
        if let Some(tablename) = schema.get(TABLENAME_KEY) {
            return match tablename {
                Value::String(s) if !s.is_empty() => Ok(true),
                _ => Err(SpecError::InvalidSchema {
                    name: name.to_string(),
                    reason: format!("{TABLENAME_KEY} must be a non-empty string"),
                }),
            };
        }
        match schema.get(INHERITS_KEY) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if !s.is_empty() => Ok(true),
            Some(_) => Err(SpecError::InvalidSchema {
                name: name.to_string(),
                reason: format!("{INHERITS_KEY} must be a boolean or a non-empty string"),
            }),
        }
    }

    fn derive_version(info: Option<&Map<String, Value>>, canonical: &str) -> SpecResult<SpecVersion> {
        let declared = info.and_then(|info| match info.get("version") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });
        let raw = match declared {
            Some(v) => v,
            None => ContentHasher::SPEC_VERSION.short_hex(canonical.as_bytes(), VERSION_HASH_LEN),
        };
        SpecVersion::new(raw.clone()).map_err(|e| SpecError::InvalidVersion {
            version: raw,
            reason: e.to_string(),
        })
    }
}

impl SpecProcessor for JsonSpecProcessor {
    fn process(&self, body: &[u8], language: Language) -> SpecResult<SpecInfo> {
        if language != Language::Json {
            return Err(SpecError::UnsupportedLanguage(language.to_string()));
        }

        let text = std::str::from_utf8(body).map_err(|e| SpecError::NotUtf8(e.to_string()))?;
        let document: Value = serde_json::from_str(text).map_err(|e| SpecError::Parse {
            language: language.to_string(),
            reason: e.to_string(),
        })?;
        let document = document.as_object().ok_or(SpecError::NotAnObject)?;

        let schemas = document
            .get("components")
            .and_then(Value::as_object)
            .and_then(|components| components.get("schemas"))
            .and_then(Value::as_object)
            .ok_or(SpecError::MissingSchemas)?;

        let mut model_count = 0u64;
        for (name, schema) in schemas {
            let schema = schema.as_object().ok_or_else(|| SpecError::SchemaNotObject {
                name: name.clone(),
            })?;
            if Self::is_model(name, schema)? {
                model_count += 1;
            }
        }
        if model_count == 0 {
            return Err(SpecError::NoModels);
        }

        let info = document.get("info").and_then(Value::as_object);
        let text_field = |key: &str| {
            info.and_then(|info| info.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let title = text_field("title");
        let description = text_field("description");

        let mut canonical_info = Map::new();
        if let Some(title) = &title {
            canonical_info.insert("title".into(), Value::String(title.clone()));
        }
        if let Some(description) = &description {
            canonical_info.insert("description".into(), Value::String(description.clone()));
        }
        let mut components = Map::new();
        components.insert("schemas".into(), Value::Object(schemas.clone()));
        let mut canonical = Map::new();
        canonical.insert("components".into(), Value::Object(components));
        canonical.insert("info".into(), Value::Object(canonical_info));

        let spec_str = serde_json::to_string(&sort_keys(Value::Object(canonical))).map_err(|e| {
            SpecError::Parse {
                language: language.to_string(),
                reason: e.to_string(),
            }
        })?;
        let version = Self::derive_version(info, &spec_str)?;

        debug!(%version, model_count, "processed spec");
        Ok(SpecInfo {
            version,
            model_count,
            title,
            description,
            spec_str,
        })
    }
}

/// Prepare a stored canonical body for delivery: re-insert `info.version`
/// and pretty-print.
pub fn prepare(spec_str: &str, version: &SpecVersion) -> SpecResult<String> {
    let mut document: Value = serde_json::from_str(spec_str).map_err(|e| SpecError::Parse {
        language: Language::Json.to_string(),
        reason: e.to_string(),
    })?;
    let root = document.as_object_mut().ok_or(SpecError::NotAnObject)?;
    let info = root
        .entry("info")
        .or_insert_with(|| Value::Object(Map::new()));
    match info.as_object_mut() {
        Some(info) => {
            info.insert("version".into(), Value::String(version.to_string()));
        }
        None => return Err(SpecError::NotAnObject),
    }
    serde_json::to_string_pretty(&sort_keys(document)).map_err(|e| SpecError::Parse {
        language: Language::Json.to_string(),
        reason: e.to_string(),
    })
}

/// Rebuild every object with its keys in sorted order.
///
/// Insertion order is what `serde_json` serializes when `preserve_order` is
/// enabled anywhere in the build, so sorting here keeps the canonical form
/// independent of feature unification.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn process(value: Value) -> SpecResult<SpecInfo> {
        JsonSpecProcessor::new().process(value.to_string().as_bytes(), Language::Json)
    }

    fn sample(version: Option<&str>) -> Value {
        let mut info = json!({"title": "Pets", "description": "Pet store models"});
        if let Some(v) = version {
            info["version"] = json!(v);
        }
        json!({
            "openapi": "3.0.0",
            "info": info,
            "paths": {},
            "components": {
                "schemas": {
                    "Pet": {"type": "object", "x-tablename": "pet"},
                    "Owner": {"type": "object", "x-tablename": "owner"},
                    "Dog": {"allOf": [{"$ref": "#/components/schemas/Pet"}], "x-inherits": true},
                    "Helper": {"type": "string"}
                }
            }
        })
    }

    #[test]
    fn counts_models_and_extracts_info() {
        let info = process(sample(Some("1"))).unwrap();
        assert_eq!(info.version.as_str(), "1");
        assert_eq!(info.model_count, 3);
        assert_eq!(info.title.as_deref(), Some("Pets"));
        assert_eq!(info.description.as_deref(), Some("Pet store models"));
    }

    #[test]
    fn canonical_body_drops_version_and_paths() {
        let info = process(sample(Some("2"))).unwrap();
        let canonical: Value = serde_json::from_str(&info.spec_str).unwrap();
        assert!(canonical.get("paths").is_none());
        assert!(canonical["info"].get("version").is_none());
        assert_eq!(canonical["components"]["schemas"]["Pet"]["x-tablename"], "pet");
    }

    #[test]
    fn version_is_hash_when_not_declared() {
        let info = process(sample(None)).unwrap();
        assert_eq!(info.version.as_str().len(), VERSION_HASH_LEN);
        assert!(info.version.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_version_ignores_formatting() {
        let compact = sample(None).to_string();
        let pretty = serde_json::to_string_pretty(&sample(None)).unwrap();
        let p = JsonSpecProcessor::new();
        let a = p.process(compact.as_bytes(), Language::Json).unwrap();
        let b = p.process(pretty.as_bytes(), Language::Json).unwrap();
        assert_eq!(a.version, b.version);
        assert_eq!(a.spec_str, b.spec_str);
    }

    #[test]
    fn hash_version_tracks_content() {
        let a = process(sample(None)).unwrap();
        let mut changed = sample(None);
        changed["components"]["schemas"]["Cat"] = json!({"x-tablename": "cat"});
        let b = process(changed).unwrap();
        assert_ne!(a.version, b.version);
        assert_eq!(b.model_count, 4);
    }

    #[test]
    fn numeric_version_is_accepted() {
        let mut doc = sample(None);
        doc["info"]["version"] = json!(3);
        assert_eq!(process(doc).unwrap().version.as_str(), "3");
    }

    #[test]
    fn rejects_yaml() {
        let err = JsonSpecProcessor::new()
            .process(b"openapi: 3.0.0", Language::Yaml)
            .unwrap_err();
        assert_eq!(err, SpecError::UnsupportedLanguage("YAML".into()));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = JsonSpecProcessor::new()
            .process(b"{not json", Language::Json)
            .unwrap_err();
        assert!(matches!(err, SpecError::Parse { .. }));
    }

    #[test]
    fn rejects_non_utf8() {
        let err = JsonSpecProcessor::new()
            .process(&[0xff, 0xfe, 0x00], Language::Json)
            .unwrap_err();
        assert!(matches!(err, SpecError::NotUtf8(_)));
    }

    #[test]
    fn rejects_non_object_document() {
        assert_eq!(process(json!([1, 2])).unwrap_err(), SpecError::NotAnObject);
    }

    #[test]
    fn rejects_missing_schemas() {
        assert_eq!(
            process(json!({"info": {"version": "1"}})).unwrap_err(),
            SpecError::MissingSchemas
        );
    }

    #[test]
    fn rejects_spec_without_models() {
        let doc = json!({"components": {"schemas": {"Plain": {"type": "object"}}}});
        assert_eq!(process(doc).unwrap_err(), SpecError::NoModels);
    }

    #[test]
    fn rejects_non_string_tablename() {
        let doc = json!({"components": {"schemas": {"Pet": {"x-tablename": 5}}}});
        assert!(matches!(process(doc).unwrap_err(), SpecError::InvalidSchema { name, .. } if name == "Pet"));
    }

    #[test]
    fn rejects_non_object_schema() {
        let doc = json!({"components": {"schemas": {"Pet": "oops"}}});
        assert!(matches!(process(doc).unwrap_err(), SpecError::SchemaNotObject { .. }));
    }

    #[test]
    fn rejects_unsafe_declared_version() {
        let err = process(sample(Some("1/../2"))).unwrap_err();
        assert!(matches!(err, SpecError::InvalidVersion { .. }));
    }

    #[test]
    fn prepare_reinserts_version() {
        let info = process(sample(Some("7"))).unwrap();
        let prepared = prepare(&info.spec_str, &info.version).unwrap();
        let doc: Value = serde_json::from_str(&prepared).unwrap();
        assert_eq!(doc["info"]["version"], "7");
        assert_eq!(doc["info"]["title"], "Pets");
        assert!(prepared.contains('\n'), "prepared output is pretty-printed");
    }

    #[test]
    fn prepare_creates_missing_info() {
        let version = SpecVersion::new("1").unwrap();
        let prepared = prepare(r#"{"components":{"schemas":{}}}"#, &version).unwrap();
        let doc: Value = serde_json::from_str(&prepared).unwrap();
        assert_eq!(doc["info"]["version"], "1");
    }

    #[test]
    fn sort_keys_is_recursive() {
        let sorted = sort_keys(json!({"b": {"z": 1, "a": 2}, "a": [{"d": 1, "c": 2}]}));
        assert_eq!(
            serde_json::to_string(&sorted).unwrap(),
            r#"{"a":[{"c":2,"d":1}],"b":{"a":2,"z":1}}"#
        );
    }
}
