//! Object model
//!
//! Three kinds of object share one reference type, [`ObjectRef`]:
//!
//! - **Record**: a plain name → value map (persistent contexts, ad-hoc objects)
//! - **Instance**: a raw class instance; reads fall back to the class's
//!   dispatch table for methods and accessors
//! - **Façade**: the intercepting wrapper around a raw instance
//!
//! Identity is pointer identity of the shared allocation. Storage borrows are
//! released before any user callback runs, so getters, setters and
//! interceptors may freely re-enter the object they belong to.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::class::{Class, Member};
use crate::error::Result;
use crate::intercept::Facade;
use crate::value::Value;

/// Shared handle to an object.
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectKind>);

pub(crate) enum ObjectKind {
    Record(Record),
    Instance(Instance),
    Facade(Facade),
}

impl ObjectRef {
    /// Allocate an empty record
    pub fn record() -> Self {
        Self::from_kind(ObjectKind::Record(Record::default()))
    }

    /// Allocate a record pre-populated with `fields`
    pub fn record_with<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let record = Record::default();
        record
            .fields
            .borrow_mut()
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v)));
        Self::from_kind(ObjectKind::Record(record))
    }

    pub(crate) fn from_kind(kind: ObjectKind) -> Self {
        ObjectRef(Rc::new(kind))
    }

    pub(crate) fn kind(&self) -> &ObjectKind {
        &self.0
    }

    /// Read a member by name. Missing members read as `Undefined`.
    pub fn get(&self, member: &str) -> Result<Value> {
        match self.kind() {
            ObjectKind::Record(record) => Ok(record.get(member)),
            ObjectKind::Instance(instance) => instance.get(self, member),
            ObjectKind::Facade(facade) => facade.get(self, member),
        }
    }

    /// Write a member by name, returning whether the write took effect.
    pub fn set(&self, member: &str, value: Value) -> Result<bool> {
        match self.kind() {
            ObjectKind::Record(record) => {
                record.set(member, value);
                Ok(true)
            }
            ObjectKind::Instance(instance) => instance.set(self, member, value),
            ObjectKind::Facade(facade) => facade.set(self, member, value),
        }
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether this object is an intercepting façade
    pub fn is_facade(&self) -> bool {
        matches!(self.kind(), ObjectKind::Facade(_))
    }

    /// Class name (`Object` for records)
    pub fn class_name(&self) -> &str {
        match self.kind() {
            ObjectKind::Record(_) => "Object",
            ObjectKind::Instance(instance) => instance.class.name(),
            ObjectKind::Facade(facade) => facade.class_name(),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind() {
            ObjectKind::Record(_) => "Record",
            ObjectKind::Instance(_) => "Instance",
            ObjectKind::Facade(_) => "Facade",
        };
        write!(
            f,
            "{}({}@{:p})",
            kind,
            self.class_name(),
            Rc::as_ptr(&self.0)
        )
    }
}

// ============================================================================
// Record
// ============================================================================

/// Plain mutable name → value map.
#[derive(Default)]
pub(crate) struct Record {
    fields: RefCell<FxHashMap<String, Value>>,
}

impl Record {
    fn get(&self, member: &str) -> Value {
        self.fields.borrow().get(member).cloned().unwrap_or_default()
    }

    fn set(&self, member: &str, value: Value) {
        self.fields.borrow_mut().insert(member.to_string(), value);
    }
}

// ============================================================================
// Instance
// ============================================================================

/// Raw class instance: own fields plus the class's dispatch table.
pub(crate) struct Instance {
    class: Rc<Class>,
    fields: RefCell<FxHashMap<String, Value>>,
}

impl Instance {
    /// Allocate with the class's field defaults
    pub(crate) fn new(class: Rc<Class>) -> Self {
        let fields: FxHashMap<String, Value> = class
            .field_defaults()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Self {
            class,
            fields: RefCell::new(fields),
        }
    }

    fn get(&self, this: &ObjectRef, member: &str) -> Result<Value> {
        let own = self.fields.borrow().get(member).cloned();
        if let Some(value) = own {
            return Ok(value);
        }

        match self.class.member(member) {
            Some(Member::Method(func)) => Ok(Value::Function(func.clone())),
            Some(Member::Accessor { get: Some(getter), .. }) => {
                getter.call(&Value::Object(this.clone()), Vec::new())
            }
            Some(Member::Accessor { get: None, .. }) | None => Ok(Value::Undefined),
        }
    }

    fn set(&self, this: &ObjectRef, member: &str, value: Value) -> Result<bool> {
        match self.class.member(member) {
            Some(Member::Accessor { set: Some(setter), .. }) => {
                setter.call(&Value::Object(this.clone()), vec![value])?;
                Ok(true)
            }
            Some(Member::Accessor { set: None, .. }) => Ok(false),
            Some(Member::Method(_)) | None => {
                self.fields.borrow_mut().insert(member.to_string(), value);
                Ok(true)
            }
        }
    }
}
