//! Template expression parsing, reference extraction, and resolution.
//!
//! Templates are `{{ <path> }}` tokens embedded in task input values and the
//! workflow output mapping. A path is a dot-delimited chain rooted at
//! `input` (workflow input) or `tasks` (`tasks.<id>.output...`).
//!
//! Extraction is pure string scanning with no evaluation; it feeds both
//! implicit dependency inference and validation. Resolution evaluates paths
//! against an execution context and never fails: unknown paths are reported
//! in [`Resolved::unresolved`] instead.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Root segment for workflow input references.
pub const INPUT_ROOT: &str = "input";

/// Root segment for task references.
pub const TASKS_ROOT: &str = "tasks";

/// Fields a `tasks.<id>` reference may select.
pub const TASK_FIELDS: [&str; 3] = ["output", "status", "error"];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Syntax errors in a template string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unterminated '{{{{' at byte {position}")]
    Unterminated { position: usize },

    #[error("empty template expression")]
    Empty,

    #[error("invalid path '{path}'")]
    InvalidPath { path: String },
}

// ---------------------------------------------------------------------------
// Paths and segments
// ---------------------------------------------------------------------------

/// A parsed `a.b.c` reference path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplatePath {
    raw: String,
    segments: Vec<String>,
}

impl TemplatePath {
    /// Parse the text between `{{` and `}}`. Surrounding whitespace is ignored.
    pub fn parse(expr: &str) -> Result<Self, TemplateError> {
        let raw = expr.trim();
        if raw.is_empty() {
            return Err(TemplateError::Empty);
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        let valid = segments.iter().all(|s| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        });
        if !valid {
            return Err(TemplateError::InvalidPath {
                path: raw.to_string(),
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// `<id>` for a `tasks.<id>...` path.
    pub fn task_id(&self) -> Option<&str> {
        if self.root() == TASKS_ROOT {
            self.segments.get(1).map(String::as_str)
        } else {
            None
        }
    }

    /// `<field>` for an `input.<field>...` path.
    pub fn input_field(&self) -> Option<&str> {
        if self.root() == INPUT_ROOT {
            self.segments.get(1).map(String::as_str)
        } else {
            None
        }
    }
}

impl fmt::Display for TemplatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A piece of a parsed template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text between tokens.
    Literal(&'a str),
    /// A `{{ path }}` token; `token` is the original text including braces.
    Reference { path: TemplatePath, token: &'a str },
}

/// Split a string into literal text and template references.
pub fn parse_template(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }

        let after_open = &rest[start + 2..];
        let end = after_open
            .find("}}")
            .ok_or(TemplateError::Unterminated {
                position: offset + start,
            })?;

        let consumed = start + 2 + end + 2;
        segments.push(Segment::Reference {
            path: TemplatePath::parse(&after_open[..end])?,
            token: &rest[start..consumed],
        });

        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    Ok(segments)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Every distinct path referenced anywhere in `value` (objects, arrays,
/// nested structures). Strings with syntax errors contribute nothing; use
/// [`template_errors`] to report them.
pub fn extract_references(value: &Value) -> BTreeSet<String> {
    extract_references_in([value])
}

/// [`extract_references`] over several values (e.g. the entries of a map).
pub fn extract_references_in<'a>(values: impl IntoIterator<Item = &'a Value>) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    for value in values {
        walk_strings(value, &mut |s| {
            if let Ok(segments) = parse_template(s) {
                for segment in segments {
                    if let Segment::Reference { path, .. } = segment {
                        refs.insert(path.raw);
                    }
                }
            }
        });
    }
    refs
}

/// Task IDs referenced through `tasks.<id>...` paths.
pub fn referenced_task_ids<'a>(values: impl IntoIterator<Item = &'a Value>) -> BTreeSet<String> {
    extract_references_in(values)
        .iter()
        .filter_map(|raw| TemplatePath::parse(raw).ok())
        .filter_map(|path| path.task_id().map(str::to_string))
        .collect()
}

/// Every template string in `value` that fails to parse, with its error.
pub fn template_errors(value: &Value) -> Vec<(String, TemplateError)> {
    let mut errors = Vec::new();
    walk_strings(value, &mut |s| {
        if let Err(e) = parse_template(s) {
            errors.push((s.to_string(), e));
        }
    });
    errors
}

fn walk_strings<'a>(value: &'a Value, visit: &mut impl FnMut(&'a str)) {
    match value {
        Value::String(s) => visit(s),
        Value::Array(items) => items.iter().for_each(|v| walk_strings(v, visit)),
        Value::Object(map) => map.values().for_each(|v| walk_strings(v, visit)),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Result of resolving templates against a context.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: Value,
    /// Paths that had no value in the context (not-found markers).
    pub unresolved: Vec<String>,
}

impl Resolved {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Look up a path in a context object. Numeric segments index arrays.
pub fn lookup<'a>(path: &TemplatePath, context: &'a Value) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve every template string inside `value`.
///
/// Non-template strings pass through unchanged. A string that is exactly
/// one token keeps the native type of the resolved value; embedded tokens
/// are substituted as text. Unknown paths resolve to `null` (whole-token)
/// or stay verbatim (embedded) and are listed in `unresolved`. Strings with
/// syntax errors pass through untouched.
pub fn resolve_value(value: &Value, context: &Value) -> Resolved {
    let mut unresolved = Vec::new();
    let value = resolve_inner(value, context, &mut unresolved);
    Resolved { value, unresolved }
}

/// Resolve a single template string.
pub fn resolve_str(template: &str, context: &Value) -> Resolved {
    let mut unresolved = Vec::new();
    let value = resolve_string(template, context, &mut unresolved);
    Resolved { value, unresolved }
}

fn resolve_inner(value: &Value, context: &Value, unresolved: &mut Vec<String>) -> Value {
    match value {
        Value::String(s) => resolve_string(s, context, unresolved),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| resolve_inner(v, context, unresolved))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_inner(v, context, unresolved)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_string(template: &str, context: &Value, unresolved: &mut Vec<String>) -> Value {
    let Ok(segments) = parse_template(template) else {
        return Value::String(template.to_string());
    };

    // Whole-string token: keep the native JSON type.
    if let [Segment::Reference { path, .. }] = segments.as_slice() {
        return match lookup(path, context) {
            Some(v) => v.clone(),
            None => {
                unresolved.push(path.as_str().to_string());
                Value::Null
            }
        };
    }

    let mut result = String::with_capacity(template.len());
    for segment in &segments {
        match segment {
            Segment::Literal(text) => result.push_str(text),
            Segment::Reference { path, token } => match lookup(path, context) {
                Some(v) => result.push_str(&value_to_string(v)),
                None => {
                    unresolved.push(path.as_str().to_string());
                    result.push_str(token);
                }
            },
        }
    }
    Value::String(result)
}

/// Set `value` at `segments` inside `target`, creating intermediate objects.
///
/// `null` intermediates become objects; array segments must be in-bounds
/// indices. Returns `false` when the path runs through a scalar.
pub fn assign(target: &mut Value, segments: &[String], value: Value) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        *target = value;
        return true;
    };

    let mut current = target;
    for segment in parents {
        if current.is_null() {
            *current = Value::Object(serde_json::Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert(Value::Null),
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(item) => item,
                None => return false,
            },
            _ => return false,
        };
    }

    if current.is_null() {
        *current = Value::Object(serde_json::Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            true
        }
        Value::Array(items) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(item) => {
                *item = value;
                true
            }
            None => false,
        },
        _ => false,
    }
}

/// Convert a JSON value to a display string for string interpolation.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // For objects/arrays, return compact JSON
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Value {
        json!({
            "input": { "userId": "u-42", "count": 3, "flags": { "vip": true } },
            "tasks": {
                "fetch-user": {
                    "status": "success",
                    "output": { "name": "Ada", "tags": ["a", "b"] }
                }
            }
        })
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_literal_only() {
        let segments = parse_template("plain text").unwrap();
        assert_eq!(segments, vec![Segment::Literal("plain text")]);
    }

    #[test]
    fn test_parse_embedded_and_trimmed() {
        let segments = parse_template("Hello {{ input.userId }}!").unwrap();
        assert_eq!(segments.len(), 3);
        match &segments[1] {
            Segment::Reference { path, token } => {
                assert_eq!(path.as_str(), "input.userId");
                assert_eq!(*token, "{{ input.userId }}");
                assert_eq!(path.input_field(), Some("userId"));
            }
            other => panic!("expected reference, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_task_path_with_hyphen() {
        let path = TemplatePath::parse("tasks.fetch-user.output.name").unwrap();
        assert_eq!(path.root(), "tasks");
        assert_eq!(path.task_id(), Some("fetch-user"));
        assert_eq!(path.input_field(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_template("oops {{ input.x").unwrap_err(),
            TemplateError::Unterminated { position: 5 }
        );
        assert_eq!(parse_template("{{   }}").unwrap_err(), TemplateError::Empty);
        assert!(matches!(
            parse_template("{{ input..x }}").unwrap_err(),
            TemplateError::InvalidPath { .. }
        ));
        assert!(matches!(
            parse_template("{{ input.a b }}").unwrap_err(),
            TemplateError::InvalidPath { .. }
        ));
    }

    // -----------------------------------------------------------------------
    // Extraction
    // -----------------------------------------------------------------------

    #[test]
    fn test_extract_references_nested() {
        let value = json!({
            "user": "{{input.userId}}",
            "nested": { "items": ["{{tasks.fetch-user.output.tags}}", 5, "x"] },
            "msg": "Hi {{ tasks.fetch-user.output.name }} ({{input.userId}})",
            "broken": "{{ unterminated"
        });
        let refs = extract_references(&value);
        let refs: Vec<&str> = refs.iter().map(String::as_str).collect();
        assert_eq!(
            refs,
            vec![
                "input.userId",
                "tasks.fetch-user.output.name",
                "tasks.fetch-user.output.tags"
            ]
        );
    }

    #[test]
    fn test_referenced_task_ids() {
        let a = json!("{{tasks.a.output}}");
        let b = json!({ "x": "{{ tasks.b.status }}", "y": "{{input.z}}" });
        let ids = referenced_task_ids([&a, &b]);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_template_errors_reported() {
        let value = json!({ "ok": "{{input.a}}", "bad": ["{{ }}"] });
        let errors = template_errors(&value);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "{{ }}");
        assert_eq!(errors[0].1, TemplateError::Empty);
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    #[test]
    fn test_whole_token_keeps_native_type() {
        let ctx = context();
        assert_eq!(resolve_str("{{input.count}}", &ctx).value, json!(3));
        assert_eq!(resolve_str("{{ input.flags }}", &ctx).value, json!({ "vip": true }));
        assert_eq!(
            resolve_str("{{tasks.fetch-user.output.tags.1}}", &ctx).value,
            json!("b")
        );
    }

    #[test]
    fn test_embedded_tokens_substitute_as_text() {
        let ctx = context();
        let resolved = resolve_str("User {{input.userId}} has {{input.count}} orders", &ctx);
        assert_eq!(resolved.value, json!("User u-42 has 3 orders"));
        assert!(resolved.is_complete());

        let resolved = resolve_str("flags={{input.flags}}", &ctx);
        assert_eq!(resolved.value, json!(r#"flags={"vip":true}"#));
    }

    #[test]
    fn test_literals_pass_through() {
        let ctx = context();
        assert_eq!(resolve_value(&json!(12), &ctx).value, json!(12));
        assert_eq!(resolve_value(&json!("hello"), &ctx).value, json!("hello"));
        assert_eq!(resolve_value(&json!("{{ broken"), &ctx).value, json!("{{ broken"));
    }

    #[test]
    fn test_unknown_paths_are_marked_not_raised() {
        let ctx = context();
        let resolved = resolve_value(
            &json!({ "a": "{{tasks.ghost.output}}", "b": "x {{input.missing}} y" }),
            &ctx,
        );
        assert_eq!(resolved.value["a"], Value::Null);
        assert_eq!(resolved.value["b"], json!("x {{input.missing}} y"));
        assert_eq!(
            resolved.unresolved,
            vec!["tasks.ghost.output".to_string(), "input.missing".to_string()]
        );
    }

    #[test]
    fn test_extract_then_resolve_roundtrip() {
        let input = json!({
            "a": "{{input.customer.id}}",
            "b": ["{{tasks.load.output.items}}", "n={{tasks.load.status}}"]
        });

        let mut ctx = json!({});
        for raw in extract_references(&input) {
            let path = TemplatePath::parse(&raw).unwrap();
            assert!(assign(&mut ctx, path.segments(), json!("value")));
        }

        let resolved = resolve_value(&input, &ctx);
        assert!(resolved.is_complete(), "unresolved: {:?}", resolved.unresolved);
    }

    #[test]
    fn test_assign_creates_objects_and_rejects_scalars() {
        let mut target = json!({ "name": "x" });
        let path = |s: &str| s.split('.').map(str::to_string).collect::<Vec<_>>();

        assert!(assign(&mut target, &path("a.b.c"), json!(1)));
        assert_eq!(target["a"]["b"]["c"], json!(1));

        assert!(!assign(&mut target, &path("name.inner"), json!(2)));
        assert_eq!(target["name"], json!("x"));

        let mut list = json!({ "items": [1, 2] });
        assert!(assign(&mut list, &path("items.1"), json!(9)));
        assert_eq!(list["items"], json!([1, 9]));
        assert!(!assign(&mut list, &path("items.5"), json!(9)));
    }
}
