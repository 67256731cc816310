//! Template rendering via MiniJinja.
//!
//! The engine's own semantics (loops, conditionals, filters, attribute
//! access) are taken as-is; this module only wires the resolved pillar
//! mapping into the template namespace and classifies engine failures.

use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value};
use serde_yaml::Mapping;

use crate::error::Error;

/// Render `source` against the resolved pillar mapping.
///
/// Every top-level key of the mapping is addressable in the template by
/// that name, nested values via the engine's native `a.b` / `a["b"]`
/// access. In strict mode an undefined reference aborts the render;
/// otherwise it produces empty output.
pub fn render(source: &str, pillar: &Mapping, strict: bool) -> Result<String, Error> {
    let namespace = mapping_to_value(pillar);

    let mut env = Environment::new();
    env.set_undefined_behavior(if strict {
        UndefinedBehavior::Strict
    } else {
        UndefinedBehavior::Lenient
    });
    env.add_global("salt", salt_namespace(namespace.clone()));

    let template = env.template_from_str(source).map_err(Error::TemplateSyntax)?;
    template.render(&namespace).map_err(classify)
}

/// Split engine render failures into the undefined-variable case
/// (strict mode) and everything else.
fn classify(err: minijinja::Error) -> Error {
    if matches!(err.kind(), ErrorKind::UndefinedError) {
        Error::Undefined(err)
    } else {
        Error::Render(err)
    }
}

/// Convert the resolved pillar mapping into the engine's value space.
fn mapping_to_value(map: &Mapping) -> Value {
    Value::from_iter(
        map.iter()
            .filter_map(|(k, v)| key_name(k).map(|name| (name, yaml_to_value(v)))),
    )
}

/// Exhaustive over the YAML variants so data-model additions fail to
/// compile here instead of rendering wrong.
fn yaml_to_value(value: &serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Value::from(()),
        Yaml::Bool(b) => Value::from(*b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                Value::from(n.as_f64().unwrap_or_default())
            }
        }
        Yaml::String(s) => Value::from(s.as_str()),
        Yaml::Sequence(items) => items.iter().map(yaml_to_value).collect(),
        Yaml::Mapping(inner) => mapping_to_value(inner),
        Yaml::Tagged(tagged) => yaml_to_value(&tagged.value),
    }
}

/// Template namespace keys must be strings. Scalar keys keep their
/// YAML rendering (`8080:` becomes `"8080"`); aggregate and null keys
/// are not addressable from a template and are skipped.
fn key_name(key: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Null | Yaml::Sequence(_) | Yaml::Mapping(_) | Yaml::Tagged(_) => None,
    }
}

/// Build the `salt` namespace exposed to templates. Only `pillar.get`
/// is provided: colon-path lookup with an optional default, mirroring
/// Salt's own accessor so existing pillar templates render unmodified.
fn salt_namespace(pillar: Value) -> Value {
    let get = Value::from_function(move |path: String, default: Option<Value>| {
        lookup(&pillar, &path)
            .or(default)
            .unwrap_or_else(|| Value::from(()))
    });
    Value::from_iter([("pillar.get", get)])
}

/// Walk a colon-delimited path through nested values.
fn lookup(root: &Value, path: &str) -> Option<Value> {
    let mut current = root.clone();
    for part in path.split(':') {
        let next = current.get_attr(part).ok()?;
        if next.is_undefined() {
            return None;
        }
        current = next;
    }
    Some(current)
}
