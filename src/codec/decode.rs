//! Schema-driven decoding of untrusted values.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::codec::schema::{ObjectMode, Schema};

/// What went wrong at a given location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// The value at the location does not match the expected shape.
    Invalid { expected: String, actual: String },
    /// An exact object carried a key it does not declare.
    ExcessKey(String),
    /// The decoded value could not be converted into the requested Rust type.
    Conversion { target: String, reason: String },
}

/// A single path-qualified validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeIssue {
    /// Keys/indices from the root of the input to the offending value.
    pub path: Vec<String>,
    pub kind: IssueKind,
}

impl DecodeIssue {
    fn invalid(path: &[String], schema: &Schema, actual: Option<&Value>) -> Self {
        Self {
            path: path.to_vec(),
            kind: IssueKind::Invalid {
                expected: schema.to_string(),
                actual: actual
                    .map(Value::to_string)
                    .unwrap_or_else(|| "undefined".to_string()),
            },
        }
    }

    /// How far into the input this issue sits.
    pub fn depth(&self) -> usize {
        match self.kind {
            IssueKind::ExcessKey(_) => self.path.len() + 1,
            _ => self.path.len(),
        }
    }

    fn location(&self) -> String {
        if self.path.is_empty() {
            "(root)".to_string()
        } else {
            self.path.join("/")
        }
    }
}

impl fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Invalid { expected, actual } => write!(
                f,
                "Invalid value {} supplied to {}, expected {}",
                actual,
                self.location(),
                expected
            ),
            IssueKind::ExcessKey(key) => {
                write!(f, "Excess key \"{}\" found at {}", key, self.location())
            }
            IssueKind::Conversion { target, reason } => write!(
                f,
                "Cannot convert value at {} to {}: {}",
                self.location(),
                target,
                reason
            ),
        }
    }
}

/// Non-empty, ordered list of decode issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeErrors {
    issues: Vec<DecodeIssue>,
}

impl DecodeErrors {
    fn from_issues(issues: Vec<DecodeIssue>) -> Self {
        debug_assert!(!issues.is_empty());
        Self { issues }
    }

    /// A single root-level issue for inputs that never reached the schema
    /// (e.g. a body that is not JSON).
    pub fn unparsable(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::from_issues(vec![DecodeIssue {
            path: Vec::new(),
            kind: IssueKind::Invalid {
                expected: expected.into(),
                actual: actual.into(),
            },
        }])
    }

    pub fn issues(&self) -> &[DecodeIssue] {
        &self.issues
    }

    pub fn first(&self) -> &DecodeIssue {
        &self.issues[0]
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeErrors {}

type Decoded = Result<Value, Vec<DecodeIssue>>;

/// Validate `input` against `schema`.
///
/// Returns the decoded value (coerced where the schema coerces, with open
/// object extras preserved) or every issue found.
pub fn decode(schema: &Schema, input: &Value) -> Result<Value, DecodeErrors> {
    let mut path = Vec::new();
    decode_at(schema, input, &mut path, None).map_err(DecodeErrors::from_issues)
}

/// Decode, then deserialize the decoded value into `T`.
pub fn decode_into<T: DeserializeOwned>(schema: &Schema, input: &Value) -> Result<T, DecodeErrors> {
    let value = decode(schema, input)?;
    serde_json::from_value(value).map_err(|e| {
        DecodeErrors::from_issues(vec![DecodeIssue {
            path: Vec::new(),
            kind: IssueKind::Conversion {
                target: std::any::type_name::<T>().to_string(),
                reason: e.to_string(),
            },
        }])
    })
}

/// Like [`decode`], but top-level keys of `input` never count as excess.
/// Used when choosing a union variant for an already-trusted value.
pub(crate) fn matches_ignoring_excess(schema: &Schema, input: &Value) -> bool {
    let keys: BTreeSet<String> = match input {
        Value::Object(entries) => entries.keys().cloned().collect(),
        _ => BTreeSet::new(),
    };
    let mut path = Vec::new();
    decode_at(schema, input, &mut path, Some(&keys)).is_ok()
}

/// `sibling_keys` carries keys declared by the other parts of the
/// intersection branch being tried; an exact object accepts them without
/// emitting them.
fn decode_at(
    schema: &Schema,
    value: &Value,
    path: &mut Vec<String>,
    sibling_keys: Option<&BTreeSet<String>>,
) -> Decoded {
    match schema {
        Schema::Unknown => Ok(value.clone()),
        Schema::Null => accept_if(value.is_null(), schema, value, path),
        Schema::String => accept_if(value.is_string(), schema, value, path),
        Schema::Number => accept_if(value.is_number(), schema, value, path),
        Schema::Integer => accept_if(is_integer(value), schema, value, path),
        Schema::Boolean => accept_if(value.is_boolean(), schema, value, path),
        Schema::NumberFromString => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => parse_number(s)
                .map(Value::Number)
                .ok_or_else(|| vec![DecodeIssue::invalid(path, schema, Some(value))]),
            _ => Err(vec![DecodeIssue::invalid(path, schema, Some(value))]),
        },
        Schema::BooleanFromString => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            _ => Err(vec![DecodeIssue::invalid(path, schema, Some(value))]),
        },
        Schema::Literal(expected) => {
            accept_if(literal_eq(expected, value), schema, value, path)
        }
        Schema::Array(items) => {
            let Value::Array(elements) = value else {
                return Err(vec![DecodeIssue::invalid(path, schema, Some(value))]);
            };
            let mut out = Vec::with_capacity(elements.len());
            let mut issues = Vec::new();
            for (i, element) in elements.iter().enumerate() {
                path.push(i.to_string());
                match decode_at(items, element, path, None) {
                    Ok(v) => out.push(v),
                    Err(mut e) => issues.append(&mut e),
                }
                path.pop();
            }
            finish(Value::Array(out), issues)
        }
        Schema::Record(values) => {
            let Value::Object(entries) = value else {
                return Err(vec![DecodeIssue::invalid(path, schema, Some(value))]);
            };
            let mut out = Map::new();
            let mut issues = Vec::new();
            for (key, entry) in entries {
                path.push(key.clone());
                match decode_at(values, entry, path, None) {
                    Ok(v) => {
                        out.insert(key.clone(), v);
                    }
                    Err(mut e) => issues.append(&mut e),
                }
                path.pop();
            }
            finish(Value::Object(out), issues)
        }
        Schema::Object { fields, mode } => {
            let Value::Object(entries) = value else {
                return Err(vec![DecodeIssue::invalid(path, schema, Some(value))]);
            };
            let mut out = Map::new();
            let mut issues = Vec::new();

            for field in fields {
                path.push(field.name.clone());
                match entries.get(&field.name) {
                    Some(v) => match decode_at(&field.schema, v, path, None) {
                        Ok(decoded) => {
                            out.insert(field.name.clone(), decoded);
                        }
                        Err(mut e) => issues.append(&mut e),
                    },
                    None if field.required => {
                        issues.push(DecodeIssue::invalid(path, &field.schema, None));
                    }
                    None => {}
                }
                path.pop();
            }

            for (key, extra) in entries {
                if fields.iter().any(|f| &f.name == key) {
                    continue;
                }
                match mode {
                    ObjectMode::Open => {
                        out.insert(key.clone(), extra.clone());
                    }
                    ObjectMode::Exact => {
                        let owned_by_sibling = sibling_keys.is_some_and(|keys| keys.contains(key));
                        if !owned_by_sibling {
                            issues.push(DecodeIssue {
                                path: path.clone(),
                                kind: IssueKind::ExcessKey(key.clone()),
                            });
                        }
                    }
                }
            }

            finish(Value::Object(out), issues)
        }
        Schema::Union(variants) => {
            if variants.is_empty() {
                return Err(vec![DecodeIssue::invalid(path, schema, Some(value))]);
            }
            let mut furthest = Furthest::default();
            for variant in variants {
                match decode_at(variant, value, path, sibling_keys) {
                    Ok(decoded) => return Ok(decoded),
                    Err(issues) => furthest.offer(issues),
                }
            }
            Err(furthest.into_issues())
        }
        Schema::Intersection(_) => {
            let alternatives = branches(schema);
            if alternatives.is_empty() {
                return Err(vec![DecodeIssue::invalid(path, schema, Some(value))]);
            }
            let mut furthest = Furthest::default();
            for parts in &alternatives {
                let mut keys = BTreeSet::new();
                for part in parts {
                    part.declared_keys(&mut keys);
                }
                if let Some(outer) = sibling_keys {
                    keys.extend(outer.iter().cloned());
                }
                match decode_branch(parts, value, path, &keys) {
                    Ok(decoded) => return Ok(decoded),
                    Err(issues) => furthest.offer(issues),
                }
            }
            Err(furthest.into_issues())
        }
    }
}

/// Issues of the failed alternative that got furthest into the input.
/// Later alternatives win a tie.
#[derive(Default)]
struct Furthest {
    best: Option<(usize, Vec<DecodeIssue>)>,
}

impl Furthest {
    fn offer(&mut self, issues: Vec<DecodeIssue>) {
        let depth = issues.iter().map(DecodeIssue::depth).max().unwrap_or(0);
        let further = match &self.best {
            Some((best_depth, _)) => depth >= *best_depth,
            None => true,
        };
        if further {
            self.best = Some((depth, issues));
        }
    }

    fn into_issues(self) -> Vec<DecodeIssue> {
        self.best.map(|(_, issues)| issues).unwrap_or_default()
    }
}

/// Expand an intersection into its concrete branches: unions are
/// distributed so every branch is a flat list of non-composite parts.
/// An empty intersection or union contributes no branch.
fn branches(schema: &Schema) -> Vec<Vec<&Schema>> {
    match schema {
        Schema::Union(variants) => variants.iter().flat_map(branches).collect(),
        Schema::Intersection(parts) => {
            if parts.is_empty() {
                return Vec::new();
            }
            let mut combined: Vec<Vec<&Schema>> = vec![Vec::new()];
            for part in parts {
                let choices = branches(part);
                let mut next = Vec::with_capacity(combined.len() * choices.len());
                for prefix in &combined {
                    for choice in &choices {
                        let mut branch = prefix.clone();
                        branch.extend(choice.iter().copied());
                        next.push(branch);
                    }
                }
                combined = next;
            }
            combined
        }
        _ => vec![vec![schema]],
    }
}

/// Decode every part of one branch; exact parts accept `keys`.
fn decode_branch(
    parts: &[&Schema],
    value: &Value,
    path: &mut Vec<String>,
    keys: &BTreeSet<String>,
) -> Decoded {
    let mut results = Vec::with_capacity(parts.len());
    let mut issues: Vec<DecodeIssue> = Vec::new();
    for part in parts {
        match decode_at(part, value, path, Some(keys)) {
            Ok(decoded) => results.push(decoded),
            Err(part_issues) => {
                for issue in part_issues {
                    if !issues.contains(&issue) {
                        issues.push(issue);
                    }
                }
            }
        }
    }
    if !issues.is_empty() {
        return Err(issues);
    }
    Ok(merge_parts(results, value))
}

fn accept_if(ok: bool, schema: &Schema, value: &Value, path: &[String]) -> Decoded {
    if ok {
        Ok(value.clone())
    } else {
        Err(vec![DecodeIssue::invalid(path, schema, Some(value))])
    }
}

fn finish(value: Value, issues: Vec<DecodeIssue>) -> Decoded {
    if issues.is_empty() {
        Ok(value)
    } else {
        Err(issues)
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Number::from(i));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

fn literal_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => expected == actual,
    }
}

/// Object results merge into one shape; anything else keeps the first result.
fn merge_parts(results: Vec<Value>, original: &Value) -> Value {
    if !results.is_empty() && results.iter().all(Value::is_object) {
        let mut merged = Map::new();
        for result in results {
            if let Value::Object(map) = result {
                merged.extend(map);
            }
        }
        return Value::Object(merged);
    }
    results.into_iter().next().unwrap_or_else(|| original.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn connector_variant(kind: &str, fields: Schema) -> Schema {
        Schema::exact()
            .required("type", Schema::literal(kind))
            .required("fields", fields)
            .build()
    }

    #[test]
    fn test_conforming_input_round_trips() {
        let schema = Schema::exact()
            .required("id", Schema::String)
            .required("tags", Schema::array(Schema::String))
            .optional("count", Schema::Integer)
            .required("meta", Schema::record(Schema::Unknown))
            .build();
        let input = json!({"id": "a", "tags": ["x", "y"], "count": 3, "meta": {"k": [1, null]}});
        assert_eq!(decode(&schema, &input).unwrap(), input);
    }

    #[test]
    fn test_exact_rejects_extra_key_open_accepts() {
        let exact = Schema::exact().required("id", Schema::String).build();
        let open = Schema::open().required("id", Schema::String).build();
        let input = json!({"id": "a", "extra": true});

        let errors = decode(&exact, &input).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().kind, IssueKind::ExcessKey("extra".into()));
        assert_eq!(errors.to_string(), "Excess key \"extra\" found at (root)");

        assert_eq!(decode(&open, &input).unwrap(), input);
    }

    #[test]
    fn test_missing_required_field_is_reported_at_its_path() {
        let schema = Schema::exact()
            .required("body", Schema::exact().required("name", Schema::String).build())
            .build();
        let errors = decode(&schema, &json!({"body": {}})).unwrap_err();
        assert_eq!(errors.first().path, vec!["body", "name"]);
        assert_eq!(
            errors.to_string(),
            "Invalid value undefined supplied to body/name, expected string"
        );
    }

    #[test]
    fn test_optional_field_may_be_absent_but_not_wrong() {
        let schema = Schema::exact().optional("limit", Schema::Number).build();
        assert!(decode(&schema, &json!({})).is_ok());
        assert!(decode(&schema, &json!({"limit": null})).is_err());
    }

    #[test]
    fn test_union_picks_second_variant_when_first_fails() {
        let a = Schema::exact().required("kind", Schema::literal("a")).build();
        let b = Schema::exact()
            .required("kind", Schema::literal("b"))
            .required("size", Schema::Number)
            .build();
        let schema = Schema::union([a, b]);
        let input = json!({"kind": "b", "size": 2});
        assert_eq!(decode(&schema, &input).unwrap(), input);
    }

    #[test]
    fn test_union_reports_furthest_branch() {
        let schema = Schema::union([
            connector_variant(".none", Schema::Null),
            connector_variant(
                ".jira",
                Schema::nullable(
                    Schema::exact()
                        .required("issueType", Schema::nullable(Schema::String))
                        .build(),
                ),
            ),
            connector_variant(".swimlane", Schema::Null),
        ]);
        let errors = decode(&schema, &json!({"type": ".jira", "fields": {"issueType": 7}}))
            .unwrap_err();
        assert_eq!(errors.first().path, vec!["fields", "issueType"]);
    }

    #[test]
    fn test_union_tie_goes_to_last_branch() {
        let schema = Schema::union([Schema::String, Schema::Number]);
        let errors = decode(&schema, &json!(true)).unwrap_err();
        assert_eq!(
            errors.first().kind,
            IssueKind::Invalid {
                expected: "number".into(),
                actual: "true".into()
            }
        );
    }

    #[test]
    fn test_literal_requires_exact_equality() {
        assert!(decode(&Schema::literal(".jira"), &json!(".jira")).is_ok());
        assert!(decode(&Schema::literal(".jira"), &json!(".JIRA")).is_err());
        assert!(decode(&Schema::literal(1), &json!(1.0)).is_ok());
        assert!(decode(&Schema::literal(1), &json!("1")).is_err());
    }

    #[test]
    fn test_intersection_of_exact_parts_merges_shapes() {
        let schema = Schema::intersection([
            Schema::exact().required("id", Schema::String).build(),
            connector_variant(".none", Schema::Null),
            Schema::exact().required("name", Schema::String).build(),
        ]);
        let input = json!({"id": "c1", "type": ".none", "fields": null, "name": "None"});
        assert_eq!(decode(&schema, &input).unwrap(), input);

        let errors = decode(&schema, &json!({"id": "c1", "type": ".none", "fields": null, "name": "n", "x": 1}))
            .unwrap_err();
        // Three exact parts, one deduplicated issue.
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().kind, IssueKind::ExcessKey("x".into()));
    }

    #[test]
    fn test_intersection_requires_every_part() {
        let schema = Schema::intersection([
            Schema::open().required("id", Schema::String).build(),
            Schema::open().required("name", Schema::String).build(),
        ]);
        let errors = decode(&schema, &json!({"id": "c1"})).unwrap_err();
        assert_eq!(errors.first().path, vec!["name"]);
    }

    #[test]
    fn test_intersection_keys_come_from_the_chosen_variant_only() {
        let schema = Schema::intersection([
            Schema::exact().required("a", Schema::String).build(),
            Schema::union([
                Schema::exact().required("b", Schema::String).build(),
                Schema::exact()
                    .optional("c", Schema::String)
                    .required("d", Schema::String)
                    .build(),
            ]),
        ]);

        let errors = decode(&schema, &json!({"a": "x", "b": "y", "c": "z"})).unwrap_err();
        assert!(errors
            .issues()
            .iter()
            .any(|issue| issue.kind == IssueKind::ExcessKey("c".into())));

        let input = json!({"a": "x", "c": "z", "d": "w"});
        assert_eq!(decode(&schema, &input).unwrap(), input);
    }

    #[test]
    fn test_intersection_tries_later_variant_that_declares_the_key() {
        let schema = Schema::intersection([
            Schema::exact().required("a", Schema::String).build(),
            Schema::union([
                Schema::exact().required("b", Schema::String).build(),
                Schema::exact()
                    .required("b", Schema::String)
                    .required("c", Schema::String)
                    .build(),
            ]),
        ]);
        let input = json!({"a": "x", "b": "y", "c": "z"});
        assert_eq!(decode(&schema, &input).unwrap(), input);
    }

    #[test]
    fn test_empty_intersection_accepts_nothing() {
        let schema = Schema::intersection(Vec::<Schema>::new());
        assert!(decode(&schema, &json!(5)).is_err());
        assert!(decode(&schema, &json!({})).is_err());

        let nested = Schema::intersection([Schema::Unknown, Schema::intersection(Vec::<Schema>::new())]);
        assert!(decode(&nested, &json!({"a": 1})).is_err());
    }

    #[test]
    fn test_coercing_codecs() {
        assert_eq!(decode(&Schema::NumberFromString, &json!("25")).unwrap(), json!(25));
        assert_eq!(decode(&Schema::NumberFromString, &json!("2.5")).unwrap(), json!(2.5));
        assert!(decode(&Schema::NumberFromString, &json!("abc")).is_err());
        assert!(decode(&Schema::NumberFromString, &json!("")).is_err());
        assert_eq!(decode(&Schema::BooleanFromString, &json!("false")).unwrap(), json!(false));
        assert!(decode(&Schema::BooleanFromString, &json!("yes")).is_err());
    }

    #[test]
    fn test_array_issues_name_indices() {
        let errors = decode(&Schema::array(Schema::Integer), &json!([1, 2.5, "x"])).unwrap_err();
        let paths: Vec<_> = errors.issues().iter().map(|i| i.path.join("/")).collect();
        assert_eq!(paths, vec!["1", "2"]);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let schema = Schema::exact().required("a", Schema::Boolean).build();
        let input = json!({"a": "nope", "b": 1});
        assert_eq!(decode(&schema, &input), decode(&schema, &input));
    }

    #[test]
    fn test_decode_into_typed_value() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Page {
            per_page: u32,
        }
        let schema = Schema::exact().required("per_page", Schema::NumberFromString).build();
        let page: Page = decode_into(&schema, &json!({"per_page": "20"})).unwrap();
        assert_eq!(page, Page { per_page: 20 });
    }
}
