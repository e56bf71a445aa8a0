//! Façade objects and the factory that produces them

use std::rc::Rc;

use super::context::AccessContext;
use super::registry::OverrideRegistry;
use crate::error::Result;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::Value;

/// Builds façades for one wrapped class.
///
/// Owns the class's frozen interceptor table; every façade it makes shares it.
pub(crate) struct FacadeFactory {
    overrides: Rc<OverrideRegistry>,
    traced: bool,
}

impl FacadeFactory {
    pub(crate) fn new(registry: OverrideRegistry, traced: bool) -> Self {
        Self {
            overrides: Rc::new(registry),
            traced,
        }
    }

    pub(crate) fn registry(&self) -> &OverrideRegistry {
        &self.overrides
    }

    /// Seal a raw instance behind a new façade with a fresh persistent context.
    pub(crate) fn wrap(&self, raw: ObjectRef) -> ObjectRef {
        ObjectRef::from_kind(ObjectKind::Facade(Facade {
            raw,
            persistent: ObjectRef::record(),
            overrides: Rc::clone(&self.overrides),
            traced: self.traced,
        }))
    }
}

/// Per-instance state behind a façade: the raw instance (never handed out)
/// and the persistent context shared by all of its chains.
pub(crate) struct Facade {
    raw: ObjectRef,
    persistent: ObjectRef,
    overrides: Rc<OverrideRegistry>,
    traced: bool,
}

impl Facade {
    pub(crate) fn class_name(&self) -> &str {
        self.raw.class_name()
    }

    /// Read trap. `this` is the façade's own handle.
    pub(crate) fn get(&self, this: &ObjectRef, member: &str) -> Result<Value> {
        match self.access(this, member, false, Value::Undefined) {
            Some(ctx) => ctx.run(),
            None => self.raw.get(member),
        }
    }

    /// Write trap. Success is the chain result coerced to a boolean.
    pub(crate) fn set(&self, this: &ObjectRef, member: &str, value: Value) -> Result<bool> {
        match self.access(this, member, true, value.clone()) {
            Some(ctx) => Ok(ctx.run()?.truthy()),
            None => self.raw.set(member, value),
        }
    }

    /// Access context for an intercepted member, `None` for the fast path.
    fn access(
        &self,
        this: &ObjectRef,
        member: &str,
        setter: bool,
        value: Value,
    ) -> Option<AccessContext> {
        let (name, entry) = self.overrides.lookup(member)?;
        Some(AccessContext::new(
            this.clone(),
            Rc::clone(name),
            self.persistent.clone(),
            setter,
            value,
            self.raw.clone(),
            Rc::clone(entry),
            self.traced,
        ))
    }
}
