//! Schema definitions.
//!
//! A [`Schema`] is an immutable description of an expected value's shape.
//! Feature modules build their schemas once (typically in a `Lazy` static)
//! and share them behind `Arc`.

use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Whether an object schema tolerates keys it does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectMode {
    /// Undeclared keys are decode errors.
    Exact,
    /// Undeclared keys are passed through untouched.
    Open,
}

/// A named member of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
}

/// Declarative shape description.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Accepts any value.
    Unknown,
    Null,
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    Boolean,
    /// A number, or a string that parses to a finite number.
    NumberFromString,
    /// A boolean, or the strings `"true"` / `"false"`.
    BooleanFromString,
    /// Exactly this value.
    Literal(Value),
    Array(Box<Schema>),
    /// String-keyed map whose values all match the inner schema.
    Record(Box<Schema>),
    Object { fields: Vec<Field>, mode: ObjectMode },
    /// First variant (in declared order) that decodes cleanly wins.
    Union(Vec<Schema>),
    /// Every part must decode against the same input.
    Intersection(Vec<Schema>),
}

impl Schema {
    pub fn literal(value: impl Into<Value>) -> Self {
        Schema::Literal(value.into())
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn record(values: Schema) -> Self {
        Schema::Record(Box::new(values))
    }

    pub fn union(variants: impl IntoIterator<Item = Schema>) -> Self {
        Schema::Union(variants.into_iter().collect())
    }

    pub fn intersection(parts: impl IntoIterator<Item = Schema>) -> Self {
        Schema::Intersection(parts.into_iter().collect())
    }

    /// `schema | null`
    pub fn nullable(schema: Schema) -> Self {
        Schema::Union(vec![schema, Schema::Null])
    }

    /// Start an exact (closed) object schema.
    pub fn exact() -> ObjectBuilder {
        ObjectBuilder::new(ObjectMode::Exact)
    }

    /// Start an open object schema.
    pub fn open() -> ObjectBuilder {
        ObjectBuilder::new(ObjectMode::Open)
    }

    /// The exact empty object: accepts `{}` only.
    pub fn empty() -> Self {
        Schema::Object {
            fields: Vec::new(),
            mode: ObjectMode::Exact,
        }
    }

    /// Collect every key declared by object schemas reachable through
    /// intersections and unions.
    pub fn declared_keys(&self, out: &mut BTreeSet<String>) {
        match self {
            Schema::Object { fields, .. } => {
                out.extend(fields.iter().map(|f| f.name.clone()));
            }
            Schema::Union(parts) | Schema::Intersection(parts) => {
                for part in parts {
                    part.declared_keys(out);
                }
            }
            _ => {}
        }
    }

    /// Returns true if `value` decodes cleanly against this schema.
    pub fn is(&self, value: &Value) -> bool {
        crate::codec::decode(self, value).is_ok()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Unknown => write!(f, "unknown"),
            Schema::Null => write!(f, "null"),
            Schema::String => write!(f, "string"),
            Schema::Number => write!(f, "number"),
            Schema::Integer => write!(f, "integer"),
            Schema::Boolean => write!(f, "boolean"),
            Schema::NumberFromString => write!(f, "NumberFromString"),
            Schema::BooleanFromString => write!(f, "BooleanFromString"),
            Schema::Literal(value) => write!(f, "{}", value),
            Schema::Array(items) => write!(f, "Array<{}>", items),
            Schema::Record(values) => write!(f, "{{ [K in string]: {} }}", values),
            Schema::Object { fields, mode } => {
                let (open, close) = match mode {
                    ObjectMode::Exact => ("{|", "|}"),
                    ObjectMode::Open => ("{", "}"),
                };
                if fields.is_empty() {
                    return write!(f, "{}{}", open, close);
                }
                write!(f, "{} ", open)?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let marker = if field.required { "" } else { "?" };
                    write!(f, "{}{}: {}", field.name, marker, field.schema)?;
                }
                write!(f, " {}", close)
            }
            Schema::Union(variants) => write_joined(f, variants, " | "),
            Schema::Intersection(parts) => write_joined(f, parts, " & "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Schema], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", part)?;
    }
    write!(f, ")")
}

/// Builder for object schemas.
#[derive(Debug, Clone)]
pub struct ObjectBuilder {
    fields: Vec<Field>,
    mode: ObjectMode,
}

impl ObjectBuilder {
    fn new(mode: ObjectMode) -> Self {
        Self {
            fields: Vec::new(),
            mode,
        }
    }

    pub fn required(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(Field {
            name: name.into(),
            schema,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(Field {
            name: name.into(),
            schema,
            required: false,
        });
        self
    }

    pub fn build(self) -> Schema {
        Schema::Object {
            fields: self.fields,
            mode: self.mode,
        }
    }
}

impl From<ObjectBuilder> for Schema {
    fn from(builder: ObjectBuilder) -> Self {
        builder.build()
    }
}
