//! Dynamic values
//!
//! Every member read, write and call in the engine moves `Value`s around.
//! Primitives are stored inline; strings, objects and functions are
//! reference-counted so cloning a value never copies heap data.
//!
//! Objects and functions compare by identity, primitives by content.

use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::object::ObjectRef;

/// Signature of a native callable: receiver plus owned argument list.
pub type NativeFn = dyn Fn(&Value, Vec<Value>) -> Result<Value>;

// ============================================================================
// Function
// ============================================================================

/// A named callable value.
///
/// The receiver is passed explicitly on every call; a `Function` is never
/// implicitly bound to an object.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    body: Rc<NativeFn>,
}

impl Function {
    /// Create a function from a closure
    pub fn new<F>(name: impl Into<Rc<str>>, body: F) -> Self
    where
        F: Fn(&Value, Vec<Value>) -> Result<Value> + 'static,
    {
        Self {
            name: name.into(),
            body: Rc::new(body),
        }
    }

    /// Function name (used in diagnostics only)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call with an explicit receiver
    pub fn call(&self, this: &Value, args: Vec<Value>) -> Result<Value> {
        (self.body)(this, args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.body) as *const (),
            Rc::as_ptr(&other.body) as *const (),
        )
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

// ============================================================================
// Value
// ============================================================================

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value (missing member, no return value)
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable shared string
    Str(Rc<str>),
    /// Object reference (record, raw instance or façade)
    Object(ObjectRef),
    /// Callable
    Function(Function),
}

impl Value {
    /// Build a string value
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Check for `Undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value can be called
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Extract a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract a float (integers widen)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Borrow string contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the object reference
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Borrow the function
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Boolean coercion: undefined, null, false, zero, NaN and "" are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Read a member by name.
    ///
    /// Only objects carry members; any other receiver is a type error.
    pub fn get(&self, member: &str) -> Result<Value> {
        match self {
            Value::Object(obj) => obj.get(member),
            other => Err(Error::TypeError(format!(
                "cannot read '{}' of {}",
                member,
                other.type_name()
            ))),
        }
    }

    /// Write a member by name, returning whether the write took effect.
    pub fn set(&self, member: &str, value: Value) -> Result<bool> {
        match self {
            Value::Object(obj) => obj.set(member, value),
            other => Err(Error::TypeError(format!(
                "cannot set '{}' on {}",
                member,
                other.type_name()
            ))),
        }
    }

    /// Call this value with an explicit receiver.
    pub fn call(&self, this: &Value, args: Vec<Value>) -> Result<Value> {
        match self {
            Value::Function(f) => f.call(this, args),
            other => Err(Error::TypeError(format!("{} is not a function", other))),
        }
    }

    /// Read `member` and call it with `self` as the receiver (`obj.member(args)`).
    pub fn invoke(&self, member: &str, args: Vec<Value>) -> Result<Value> {
        match self.get(member)? {
            Value::Function(f) => f.call(self, args),
            other => Err(Error::TypeError(format!(
                "{}.{} is not a function (got {})",
                self,
                member,
                other.type_name()
            ))),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Object(o) => write!(f, "[object {}]", o.class_name()),
            Value::Function(func) => write!(f, "[function {}]", func.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Object(o) => write!(f, "{:?}", o),
            Value::Function(func) => write!(f, "{:?}", func),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}
