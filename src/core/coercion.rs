//! Named attribute types.
//!
//! An attribute's `type` is the name of a coercion registered here. A
//! coercion turns a raw description value into the attribute's canonical
//! form, or explains why it can't. Built-in types are always present; more
//! can be added with [`register`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use semver::Version;
use serde::Serialize;

use crate::core::Value;

/// Extra construction arguments for a type (e.g. `radix` for integers).
pub type TypeArgs = BTreeMap<String, Value>;

/// A conversion from a raw value to a typed value.
pub trait Coercion: Send + Sync {
    /// Convert `raw`. The error string ends up in resolution reports.
    fn coerce(&self, raw: &Value, args: &TypeArgs) -> Result<Value, String>;
}

impl<F> Coercion for F
where
    F: Fn(&Value, &TypeArgs) -> Result<Value, String> + Send + Sync,
{
    fn coerce(&self, raw: &Value, args: &TypeArgs) -> Result<Value, String> {
        self(raw, args)
    }
}

static TYPES: LazyLock<RwLock<HashMap<String, Arc<dyn Coercion>>>> = LazyLock::new(|| {
    let mut types: HashMap<String, Arc<dyn Coercion>> = HashMap::new();
    types.insert("text".into(), Arc::new(TextType));
    types.insert("integer".into(), Arc::new(IntegerType));
    types.insert("float".into(), Arc::new(FloatType));
    types.insert("boolean".into(), Arc::new(BooleanType));
    types.insert("version".into(), Arc::new(VersionType));
    types.insert("list".into(), Arc::new(ListType { dedup: false }));
    types.insert("set".into(), Arc::new(ListType { dedup: true }));
    types.insert("shared".into(), Arc::new(SharedType));
    RwLock::new(types)
});

/// Register (or replace) a named coercion.
pub fn register(name: impl Into<String>, coercion: Arc<dyn Coercion>) {
    let name = name.into();
    tracing::debug!("registering attribute type `{}`", name);
    TYPES.write().insert(name, coercion);
}

/// Look up a coercion by name.
pub fn lookup(name: &str) -> Option<Arc<dyn Coercion>> {
    TYPES.read().get(name).cloned()
}

/// Names of all registered types, sorted.
pub fn registered() -> Vec<String> {
    let mut names: Vec<_> = TYPES.read().keys().cloned().collect();
    names.sort();
    names
}

/// The `type` of an attribute: a registered coercion name plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSpec {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: TypeArgs,
}

impl TypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        TypeSpec {
            name: name.into(),
            args: TypeArgs::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Whether the named coercion is currently registered.
    pub fn is_known(&self) -> bool {
        lookup(&self.name).is_some()
    }

    /// Coerce `raw` to this type.
    pub fn coerce(&self, raw: &Value) -> Result<Value, String> {
        let coercion =
            lookup(&self.name).ok_or_else(|| format!("unknown type `{}`", self.name))?;
        coercion.coerce(raw, &self.args)
    }
}

impl Default for TypeSpec {
    fn default() -> Self {
        TypeSpec::new("text")
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            let args: Vec<_> = self
                .args
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "({})", args.join(", "))?;
        }
        Ok(())
    }
}

fn unsupported(raw: &Value, target: &str) -> String {
    format!("cannot convert {} `{}` to {}", raw.kind(), raw, target)
}

fn arg_str<'a>(args: &'a TypeArgs, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

struct TextType;

impl Coercion for TextType {
    fn coerce(&self, raw: &Value, args: &TypeArgs) -> Result<Value, String> {
        let text = match raw.peel() {
            Value::List(_) => return Err(unsupported(raw, "text")),
            other => other.to_string(),
        };
        let text = match arg_str(args, "case") {
            Some("lower") => text.to_lowercase(),
            Some("upper") => text.to_uppercase(),
            Some(other) => return Err(format!("unknown text case `{}`", other)),
            None => text,
        };
        Ok(Value::Text(text))
    }
}

struct IntegerType;

/// Floats in `[I64_LOW, I64_HIGH)` convert to `i64` exactly.
const I64_LOW: f64 = -9_223_372_036_854_775_808.0;
const I64_HIGH: f64 = 9_223_372_036_854_775_808.0;

impl Coercion for IntegerType {
    fn coerce(&self, raw: &Value, args: &TypeArgs) -> Result<Value, String> {
        let radix = match args.get("radix") {
            Some(r) => r
                .as_i64()
                .filter(|r| (2..=36).contains(r))
                .ok_or_else(|| format!("invalid radix `{}`", r))? as u32,
            None => 10,
        };
        match raw.peel() {
            Value::Integer(i) => Ok(Value::Integer(*i)),
            Value::Float(x) if x.fract() == 0.0 && (I64_LOW..I64_HIGH).contains(x) => Ok(Value::Integer(*x as i64)),
            Value::Text(s) => i64::from_str_radix(s.trim(), radix)
                .map(Value::Integer)
                .map_err(|e| format!("`{}` is not an integer: {}", s, e)),
            _ => Err(unsupported(raw, "integer")),
        }
    }
}

struct FloatType;

impl Coercion for FloatType {
    fn coerce(&self, raw: &Value, _args: &TypeArgs) -> Result<Value, String> {
        match raw.peel() {
            Value::Float(x) => Ok(Value::Float(*x)),
            Value::Integer(i) => Ok(Value::Float(*i as f64)),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("`{}` is not a number: {}", s, e)),
            _ => Err(unsupported(raw, "float")),
        }
    }
}

struct BooleanType;

impl Coercion for BooleanType {
    fn coerce(&self, raw: &Value, _args: &TypeArgs) -> Result<Value, String> {
        match raw.peel() {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Integer(0) => Ok(Value::Bool(false)),
            Value::Integer(1) => Ok(Value::Bool(true)),
            Value::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("`{}` is not a boolean", s)),
            },
            _ => Err(unsupported(raw, "boolean")),
        }
    }
}

struct VersionType;

impl Coercion for VersionType {
    fn coerce(&self, raw: &Value, _args: &TypeArgs) -> Result<Value, String> {
        match raw.peel() {
            Value::Version(v) => Ok(Value::Version(v.clone())),
            Value::Text(s) => Version::parse(s.trim())
                .map(Value::Version)
                .map_err(|e| format!("`{}` is not a version: {}", s, e)),
            _ => Err(unsupported(raw, "version")),
        }
    }
}

/// Lists split text on `separator` (default `,`) and coerce each item with
/// the `item` type (default `text`). Sets are sorted, de-duplicated lists.
struct ListType {
    dedup: bool,
}

impl Coercion for ListType {
    fn coerce(&self, raw: &Value, args: &TypeArgs) -> Result<Value, String> {
        let item_type = TypeSpec::new(arg_str(args, "item").unwrap_or("text"));
        let items: Vec<Value> = match raw.peel() {
            Value::List(items) => items.clone(),
            Value::Text(s) => {
                let separator = arg_str(args, "separator").unwrap_or(",");
                s.split(separator)
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(Value::from)
                    .collect()
            }
            scalar => vec![scalar.clone()],
        };
        let mut coerced = items
            .iter()
            .map(|item| item_type.coerce(item))
            .collect::<Result<Vec<_>, _>>()?;
        if self.dedup {
            coerced.sort();
            coerced.dedup();
        }
        Ok(Value::List(coerced))
    }
}

struct SharedType;

impl Coercion for SharedType {
    fn coerce(&self, raw: &Value, _args: &TypeArgs) -> Result<Value, String> {
        match raw {
            Value::Shared(_) => Ok(raw.clone()),
            other => Ok(Value::Shared(Arc::new(other.clone()))),
        }
    }
}
