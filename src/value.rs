//! Script values as seen by the engine, the assertion library and the formatter.
//!
//! Primitives compare by value; every composite (arrays, objects, sets, maps,
//! dates, functions, promises, errors, symbols) is a reference and compares by
//! identity, mirroring the `===` operator of the sandboxed language. Composite
//! contents are immutable once built, so a value graph can never contain a cycle.

use std::{cell::RefCell, fmt, rc::Rc};

use chrono::{DateTime, Utc};
use im::Vector;

use crate::error::ScriptResult;

pub mod promise;

pub use promise::{Promise, PromiseState, Thenable};

/// Canonical script value.
///
/// # Examples
///
/// ```rust
/// use sandcheck::value::Value;
/// let n = Value::from(3.0);
/// assert_eq!(n.type_name(), "number");
/// assert!(n.strict_equals(&Value::from(3.0)));
/// assert!(!n.strict_equals(&Value::from("3")));
/// ```
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol(Symbol),
    Array(Array),
    Object(Object),
    Set(SetValue),
    Map(MapValue),
    Date(Date),
    Function(Function),
    Promise(Promise),
    Error(ErrorValue),
}

impl Value {
    /// Returns the `typeof`-style type name, refined for reference kinds.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Date(_) => "date",
            Value::Function(_) => "function",
            Value::Promise(_) => "promise",
            Value::Error(_) => "error",
        }
    }

    /// Builds an array value.
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Array(Array::new(items))
    }

    /// Builds a plain object from `(key, value)` pairs, keeping insertion order.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Object::new(entries))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Boolean coercion of the sandboxed language.
    ///
    /// `false`, `0`, `-0`, `NaN`, `""`, `null` and `undefined` are falsy;
    /// every reference value is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Strict identity comparison (`===`): no coercion, no structural equality.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Date(a), Value::Date(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }

    /// `SameValueZero`: like `===` except that `NaN` equals itself.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the value as a thenable if it exposes callable `then` and `catch`.
    pub fn as_thenable(&self) -> Option<Thenable> {
        Thenable::from_value(self)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(a) => f.debug_list().entries(a.iter()).finish(),
            Value::Object(o) => f
                .debug_map()
                .entries(o.entries().iter().map(|(k, v)| (k, v)))
                .finish(),
            other => write!(f, "{other}"),
        }
    }
}

/// String conversion of the sandboxed language (`String(value)`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{s}"),
            Value::Symbol(sym) => write!(f, "Symbol({})", sym.description().unwrap_or("")),
            Value::Array(items) => {
                let mut first = true;
                for item in items.iter() {
                    if !first {
                        write!(f, ",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                    first = false;
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Set(_) => write!(f, "[object Set]"),
            Value::Map(_) => write!(f, "[object Map]"),
            Value::Date(date) => match date.to_datetime() {
                Some(dt) => write!(
                    f,
                    "{} GMT+0000 (Coordinated Universal Time)",
                    dt.format("%a %b %d %Y %H:%M:%S")
                ),
                None => write!(f, "Invalid Date"),
            },
            Value::Function(func) => {
                write!(f, "function {}() {{ [native code] }}", func.name())
            }
            Value::Promise(_) => write!(f, "[object Promise]"),
            Value::Error(err) => write!(f, "{err}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Value::Promise(p)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Number-to-string conversion of the sandboxed language.
///
/// Integers print without a fraction, `-0` prints as `0`, and magnitudes
/// outside `[1e-6, 1e21)` switch to exponent notation with an explicit sign.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{n}");
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
}

// ============================================================================
// REFERENCE TYPES
// ============================================================================

#[derive(Debug)]
struct SymbolData {
    description: Option<String>,
}

/// A unique symbol; two symbols are never identical unless cloned from one another.
#[derive(Clone, Debug)]
pub struct Symbol(Rc<SymbolData>);

impl Symbol {
    pub fn new(description: Option<&str>) -> Self {
        Self(Rc::new(SymbolData {
            description: description.map(str::to_string),
        }))
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }
}

/// An ordered sequence of values.
#[derive(Clone)]
pub struct Array(Rc<Vector<Value>>);

impl Array {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self(Rc::new(items.into_iter().collect()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn iter(&self) -> im::vector::Iter<'_, Value> {
        self.0.iter()
    }

    /// Membership by identity, as used by `contains`.
    pub fn includes(&self, needle: &Value) -> bool {
        self.0.iter().any(|item| item.strict_equals(needle))
    }
}

/// A plain object: string keys in insertion order.
#[derive(Clone)]
pub struct Object(Rc<Vec<(String, Value)>>);

impl Object {
    /// Builds an object; a repeated key overwrites the earlier value in place.
    pub fn new<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut out: Vec<(String, Value)> = Vec::new();
        for (key, value) in entries {
            let key = key.into();
            match out.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => out.push((key, value)),
            }
        }
        Self(Rc::new(out))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A collection of distinct values (`SameValueZero`), in insertion order.
#[derive(Clone)]
pub struct SetValue(Rc<Vector<Value>>);

impl SetValue {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut out = Vector::new();
        for item in items {
            if !out.iter().any(|v: &Value| v.same_value_zero(&item)) {
                out.push_back(item);
            }
        }
        Self(Rc::new(out))
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    pub fn has(&self, value: &Value) -> bool {
        self.0.iter().any(|v| v.same_value_zero(value))
    }
}

/// A keyed collection with arbitrary value keys (`SameValueZero`).
#[derive(Clone)]
pub struct MapValue(Rc<Vec<(Value, Value)>>);

impl MapValue {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        let mut out: Vec<(Value, Value)> = Vec::new();
        for (key, value) in entries {
            match out.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
                Some(slot) => slot.1 = value,
                None => out.push((key, value)),
            }
        }
        Self(Rc::new(out))
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0
            .iter()
            .find(|(k, _)| k.same_value_zero(key))
            .map(|(_, v)| v)
    }
}

/// A point in time, stored as milliseconds since the Unix epoch.
/// A `NaN` time value is an invalid date.
#[derive(Clone)]
pub struct Date(Rc<f64>);

/// Largest magnitude a date's time value may have, in milliseconds.
const MAX_TIME_VALUE: f64 = 8.64e15;

impl Date {
    /// Clips `millis` to a valid time value: non-finite or out-of-range
    /// inputs become `NaN`, fractions are truncated.
    pub fn from_millis(millis: f64) -> Self {
        let clipped = if !millis.is_finite() || millis.abs() > MAX_TIME_VALUE {
            f64::NAN
        } else {
            // + 0.0 folds -0 into +0
            millis.trunc() + 0.0
        };
        Self(Rc::new(clipped))
    }

    pub fn invalid() -> Self {
        Self::from_millis(f64::NAN)
    }

    pub fn now() -> Self {
        Self::from_millis(Utc::now().timestamp_millis() as f64)
    }

    pub fn time_value(&self) -> f64 {
        *self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_nan()
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if !self.is_valid() {
            return None;
        }
        DateTime::from_timestamp_millis(*self.0 as i64)
    }

    /// ISO-8601 rendering in UTC, or `None` for an invalid date.
    pub fn to_iso_string(&self) -> Option<String> {
        self.to_datetime()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
    }
}

type NativeCall = dyn Fn(&[Value]) -> ScriptResult<Value>;

struct FunctionData {
    name: String,
    call: Box<NativeCall>,
}

/// A callable value backed by a Rust closure.
#[derive(Clone)]
pub struct Function(Rc<FunctionData>);

impl Function {
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&[Value]) -> ScriptResult<Value> + 'static,
    {
        Self(Rc::new(FunctionData {
            name: name.into(),
            call: Box::new(call),
        }))
    }

    /// Wraps a one-shot closure; calls after the first return `undefined`.
    pub fn once<F>(name: impl Into<String>, call: F) -> Self
    where
        F: FnOnce(&[Value]) -> ScriptResult<Value> + 'static,
    {
        let slot = RefCell::new(Some(call));
        Self::new(name, move |args| match slot.borrow_mut().take() {
            Some(call) => call(args),
            None => Ok(Value::Undefined),
        })
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn call(&self, args: &[Value]) -> ScriptResult<Value> {
        (self.0.call)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.0.name)
    }
}

#[derive(Debug)]
struct ErrorData {
    name: String,
    message: String,
}

/// A script-level error object.
#[derive(Clone, Debug)]
pub struct ErrorValue(Rc<ErrorData>);

impl ErrorValue {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self(Rc::new(ErrorData {
            name: name.into(),
            message: message.into(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn message(&self) -> &str {
        &self.0.message
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.0.name.is_empty(), self.0.message.is_empty()) {
            (_, true) => write!(f, "{}", self.0.name),
            (true, false) => write!(f, "{}", self.0.message),
            (false, false) => write!(f, "{}: {}", self.0.name, self.0.message),
        }
    }
}
