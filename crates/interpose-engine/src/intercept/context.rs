//! Per-call and per-access chain contexts

use std::cell::RefCell;
use std::rc::Rc;

use super::chain::{self, Chained, Cursor, Interceptor};
use super::registry::Override;
use crate::error::Result;
use crate::object::ObjectRef;
use crate::value::{Function, Value};

/// Interceptor around method calls
pub type MethodInterceptor = Interceptor<InvocationContext>;

/// Interceptor around property reads and writes
pub type AccessInterceptor = Interceptor<AccessContext>;

// ============================================================================
// InvocationContext
// ============================================================================

/// State of one method call travelling through a method chain.
///
/// `args` and `this` may be rewritten by any interceptor; the terminal call
/// uses whatever they hold when the chain is exhausted.
pub struct InvocationContext {
    target: ObjectRef,
    member: Rc<str>,
    persistent: ObjectRef,
    /// Arguments for the real call
    pub args: Vec<Value>,
    /// Receiver for the real call
    pub this: Value,
    function: Function,
    entry: Rc<Override>,
    cursor: Cursor,
    traced: bool,
}

impl InvocationContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        target: ObjectRef,
        member: Rc<str>,
        persistent: ObjectRef,
        this: Value,
        args: Vec<Value>,
        function: Function,
        entry: Rc<Override>,
        traced: bool,
    ) -> Self {
        let cursor = Cursor::new(entry.method_chain().len());
        Self {
            target,
            member,
            persistent,
            args,
            this,
            function,
            entry,
            cursor,
            traced,
        }
    }

    /// Context with no façade and an empty chain whose terminal returns
    /// `Undefined`
    #[cfg(test)]
    pub(crate) fn detached(args: Vec<Value>) -> Self {
        let target = ObjectRef::record();
        Self::new(
            target.clone(),
            Rc::from("detached"),
            ObjectRef::record(),
            Value::Object(target),
            args,
            Function::new("detached", |_, _| Ok(Value::Undefined)),
            Rc::new(Override::default()),
            false,
        )
    }

    /// The façade the call was made on
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Name of the called member
    pub fn member(&self) -> &str {
        &self.member
    }

    /// The instance's persistent context, shared by every chain on it
    pub fn persistent_context(&self) -> &ObjectRef {
        &self.persistent
    }

    /// Continue the chain: run the next interceptor inward, or the real call
    pub fn next(&mut self) -> Result<Value> {
        chain::proceed(self)
    }
}

impl Chained for InvocationContext {
    const KIND: &'static str = "method";

    fn links(&self) -> &[Interceptor<Self>] {
        self.entry.method_chain()
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    fn fallthrough(&mut self) -> Result<Value> {
        self.function.call(&self.this, self.args.clone())
    }

    fn member_name(&self) -> &str {
        &self.member
    }

    fn traced(&self) -> bool {
        self.traced
    }
}

// ============================================================================
// AccessContext
// ============================================================================

/// State of one property read or write travelling through an access chain.
///
/// For writes, `value` holds the value being assigned and may be rewritten.
/// For reads it starts as `Undefined` and is ignored: the read result is
/// whatever the chain returns.
pub struct AccessContext {
    target: ObjectRef,
    member: Rc<str>,
    persistent: ObjectRef,
    setter: bool,
    /// Value being written (writes only)
    pub value: Value,
    /// Object the terminal operation reads from or writes to
    pub this: Value,
    raw: ObjectRef,
    /// `this` as left by the finished chain; bound methods call through it
    settled_this: Rc<RefCell<Value>>,
    entry: Rc<Override>,
    cursor: Cursor,
    traced: bool,
}

impl AccessContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        target: ObjectRef,
        member: Rc<str>,
        persistent: ObjectRef,
        setter: bool,
        value: Value,
        raw: ObjectRef,
        entry: Rc<Override>,
        traced: bool,
    ) -> Self {
        let cursor = Cursor::new(entry.access_chain().len());
        let this = Value::Object(target.clone());
        let settled_this = Rc::new(RefCell::new(this.clone()));
        Self {
            target,
            member,
            persistent,
            setter,
            value,
            this,
            raw,
            settled_this,
            entry,
            cursor,
            traced,
        }
    }

    /// The façade being accessed
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Name of the accessed member
    pub fn member(&self) -> &str {
        &self.member
    }

    /// The instance's persistent context, shared by every chain on it
    pub fn persistent_context(&self) -> &ObjectRef {
        &self.persistent
    }

    /// `true` for writes, `false` for reads
    pub fn setter(&self) -> bool {
        self.setter
    }

    /// Continue the chain: run the next interceptor inward, or the real access
    pub fn next(&mut self) -> Result<Value> {
        chain::proceed(self)
    }

    /// Drive the whole chain from the outside and record the final `this`.
    ///
    /// Callables returned by a read are bound to the receiver the chain
    /// settled on, including reassignments made after an inner `next()`.
    pub(crate) fn run(mut self) -> Result<Value> {
        let result = self.next()?;
        *self.settled_this.borrow_mut() = self.this.clone();
        Ok(result)
    }

    /// Resolve the receiver for the terminal operation.
    ///
    /// The originating façade stands for its raw instance; going through the
    /// façade again would re-enter this very chain. Any other receiver is used
    /// as given, so its own interceptors run.
    fn receiver(&self) -> Value {
        match &self.this {
            Value::Object(obj) if obj.ptr_eq(&self.target) => Value::Object(self.raw.clone()),
            other => other.clone(),
        }
    }

    /// Wrap a resolved callable so that each call runs the method chain.
    fn bind_method(&self, function: Function) -> Function {
        let target = self.target.clone();
        let member = Rc::clone(&self.member);
        let persistent = self.persistent.clone();
        let this = Rc::clone(&self.settled_this);
        let entry = Rc::clone(&self.entry);
        let traced = self.traced;

        Function::new(Rc::clone(&self.member), move |_, args| {
            let mut ctx = InvocationContext::new(
                target.clone(),
                Rc::clone(&member),
                persistent.clone(),
                this.borrow().clone(),
                args,
                function.clone(),
                Rc::clone(&entry),
                traced,
            );
            ctx.next()
        })
    }
}

impl Chained for AccessContext {
    const KIND: &'static str = "access";

    fn links(&self) -> &[Interceptor<Self>] {
        self.entry.access_chain()
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    fn fallthrough(&mut self) -> Result<Value> {
        let receiver = self.receiver();
        if self.setter {
            let written = receiver.set(&self.member, self.value.clone())?;
            return Ok(Value::Bool(written));
        }

        match receiver.get(&self.member)? {
            Value::Function(function) => {
                *self.settled_this.borrow_mut() = self.this.clone();
                Ok(Value::Function(self.bind_method(function)))
            }
            other => Ok(other),
        }
    }

    fn member_name(&self) -> &str {
        &self.member
    }

    fn traced(&self) -> bool {
        self.traced
    }
}
