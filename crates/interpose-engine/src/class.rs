//! Class definitions
//!
//! A [`Class`] is an explicit dispatch table: field defaults, methods and
//! accessor pairs keyed by member name, plus an optional constructor body.
//! Classes are assembled with [`ClassBuilder`], which also collects interceptor
//! registrations and runs the class-transform step exactly once in
//! [`ClassBuilder::build`].
//!
//! ```rust,ignore
//! let greeter = ClassBuilder::new("Greeter")
//!     .field("greeting", "hello")
//!     .method("greet", |this, _args| this.get("greeting"))
//!     .after("greet", |_ctx, result| Ok(format!("{}!", result).into()))
//!     .build()?;
//!
//! let g = greeter.construct(vec![])?;
//! assert_eq!(g.invoke("greet", vec![])?, Value::from("hello!"));
//! ```

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::intercept::{
    combinators, AccessContext, AccessInterceptor, FacadeFactory, InvocationContext,
    MethodInterceptor, OverrideRegistry,
};
use crate::object::{Instance, ObjectKind, ObjectRef};
use crate::options::{InterceptOptions, UnwrappedPolicy};
use crate::value::{Function, Value};

/// Constructor body: runs with the freshly allocated raw instance as `this`.
pub type Constructor = Rc<dyn Fn(&Value, Vec<Value>) -> Result<()>>;

/// Entry in a class's dispatch table
#[derive(Clone, Debug)]
pub enum Member {
    /// Method shared by all instances
    Method(Function),
    /// Computed property; a missing getter reads `Undefined`, a missing
    /// setter rejects writes
    Accessor {
        /// Getter, called with the instance as `this` and no arguments
        get: Option<Function>,
        /// Setter, called with the instance as `this` and the new value
        set: Option<Function>,
    },
}

/// A class definition, possibly wrapped for interception.
pub struct Class {
    name: String,
    fields: Vec<(String, Value)>,
    members: FxHashMap<String, Member>,
    constructor: Option<Constructor>,
    facades: Option<FacadeFactory>,
}

impl Class {
    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a method or accessor
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Field defaults in declaration order
    pub fn field_defaults(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Whether instances are handed out behind a façade
    pub fn is_intercepted(&self) -> bool {
        self.facades.is_some()
    }

    /// The frozen interceptor table, if the class was wrapped
    pub fn interceptors(&self) -> Option<&OverrideRegistry> {
        self.facades.as_ref().map(|f| f.registry())
    }

    /// Construct an instance (`new Class(args)`).
    ///
    /// Runs field initialisers and the constructor body on a raw instance.
    /// For an intercepted class the raw instance is then sealed behind a fresh
    /// façade with its own empty persistent context, and only the façade is
    /// returned.
    pub fn construct(self: &Rc<Self>, args: Vec<Value>) -> Result<Value> {
        let raw = ObjectRef::from_kind(ObjectKind::Instance(Instance::new(Rc::clone(self))));
        if let Some(constructor) = &self.constructor {
            constructor(&Value::Object(raw.clone()), args)?;
        }

        match &self.facades {
            Some(factory) => {
                tracing::trace!(class = %self.name, "constructed intercepted instance");
                Ok(Value::Object(factory.wrap(raw)))
            }
            None => Ok(Value::Object(raw)),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("members", &self.members.len())
            .field("intercepted", &self.is_intercepted())
            .finish()
    }
}

// ============================================================================
// ClassBuilder
// ============================================================================

/// Builder for [`Class`] definitions and their interceptor registrations.
///
/// Registration order is call order: for each member the first registered
/// interceptor ends up innermost (closest to the real operation) and the last
/// registered outermost.
pub struct ClassBuilder {
    name: String,
    fields: Vec<(String, Value)>,
    members: FxHashMap<String, Member>,
    constructor: Option<Constructor>,
    registry: OverrideRegistry,
    wrap: bool,
}

impl ClassBuilder {
    /// Start a class definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            members: FxHashMap::default(),
            constructor: None,
            registry: OverrideRegistry::new(),
            wrap: true,
        }
    }

    /// Declare a field with its initial value
    pub fn field(mut self, name: impl Into<String>, initial: impl Into<Value>) -> Self {
        let name = name.into();
        let initial = initial.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = initial,
            None => self.fields.push((name, initial)),
        }
        self
    }

    /// Declare a method
    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Value, Vec<Value>) -> Result<Value> + 'static,
    {
        let name = name.into();
        let func = Function::new(name.as_str(), body);
        self.members.insert(name, Member::Method(func));
        self
    }

    /// Declare a computed property with a getter and a setter
    pub fn property<G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&Value) -> Result<Value> + 'static,
        S: Fn(&Value, Value) -> Result<()> + 'static,
    {
        let name = name.into();
        let getter = Function::new(name.as_str(), move |this, _| get(this));
        let setter = Function::new(name.as_str(), move |this, mut args| {
            let value = if args.is_empty() {
                Value::Undefined
            } else {
                args.swap_remove(0)
            };
            set(this, value)?;
            Ok(Value::Undefined)
        });
        self.members.insert(
            name,
            Member::Accessor {
                get: Some(getter),
                set: Some(setter),
            },
        );
        self
    }

    /// Declare a computed property without a setter
    pub fn read_only_property<G>(mut self, name: impl Into<String>, get: G) -> Self
    where
        G: Fn(&Value) -> Result<Value> + 'static,
    {
        let name = name.into();
        let getter = Function::new(name.as_str(), move |this, _| get(this));
        self.members.insert(
            name,
            Member::Accessor {
                get: Some(getter),
                set: None,
            },
        );
        self
    }

    /// Set the constructor body
    pub fn constructor<F>(mut self, body: F) -> Self
    where
        F: Fn(&Value, Vec<Value>) -> Result<()> + 'static,
    {
        self.constructor = Some(Rc::new(body));
        self
    }

    // ========================================================================
    // Interceptor registration
    // ========================================================================

    /// Append method-interceptors for `member`
    pub fn intercept_methods<I>(mut self, member: &str, interceptors: I) -> Self
    where
        I: IntoIterator<Item = MethodInterceptor>,
    {
        self.registry.register_method_interceptors(member, interceptors);
        self
    }

    /// Append access-interceptors for `member`
    pub fn intercept_accesses<I>(mut self, member: &str, interceptors: I) -> Self
    where
        I: IntoIterator<Item = AccessInterceptor>,
    {
        self.registry.register_access_interceptors(member, interceptors);
        self
    }

    /// Register a method-interceptor written as a closure
    pub fn around<F>(self, member: &str, f: F) -> Self
    where
        F: Fn(&mut InvocationContext) -> Result<Value> + 'static,
    {
        self.intercept_methods(member, [combinators::around(f)])
    }

    /// Register an access-interceptor written as a closure
    pub fn access<F>(self, member: &str, f: F) -> Self
    where
        F: Fn(&mut AccessContext) -> Result<Value> + 'static,
    {
        self.intercept_accesses(member, [combinators::access(f)])
    }

    /// Transform the result of every call to `member`
    pub fn after<F>(self, member: &str, transform: F) -> Self
    where
        F: Fn(&mut InvocationContext, Value) -> Result<Value> + 'static,
    {
        self.intercept_methods(member, [combinators::after(transform)])
    }

    /// Rewrite the arguments of every call to `member`
    pub fn before<F>(self, member: &str, transform: F) -> Self
    where
        F: Fn(&mut InvocationContext, Vec<Value>) -> Result<Vec<Value>> + 'static,
    {
        self.intercept_methods(member, [combinators::before(transform)])
    }

    /// Transform every read of `member`; writes pass through
    pub fn getter<F>(self, member: &str, transform: F) -> Self
    where
        F: Fn(&mut AccessContext, Value) -> Result<Value> + 'static,
    {
        self.intercept_accesses(member, [combinators::getter(transform)])
    }

    /// Transform every value written to `member`; reads pass through
    pub fn setter<F>(self, member: &str, transform: F) -> Self
    where
        F: Fn(&mut AccessContext, Value) -> Result<Value> + 'static,
    {
        self.intercept_accesses(member, [combinators::setter(transform)])
    }

    /// Do not wrap this class even if members carry interceptors.
    ///
    /// What happens to those interceptors is decided by
    /// [`InterceptOptions::unwrapped_overrides`].
    pub fn unwrapped(mut self) -> Self {
        self.wrap = false;
        self
    }

    /// Registrations collected so far
    pub fn registry(&self) -> &OverrideRegistry {
        &self.registry
    }

    /// Finish the class with default options
    pub fn build(self) -> Result<Rc<Class>> {
        self.build_with(&InterceptOptions::default())
    }

    /// Finish the class, running the class-transform step once.
    ///
    /// A class with no registrations keeps its plain construction. A class
    /// with registrations is wrapped unless [`ClassBuilder::unwrapped`] was
    /// requested.
    pub fn build_with(self, options: &InterceptOptions) -> Result<Rc<Class>> {
        let facades = if self.registry.is_empty() {
            tracing::debug!(class = %self.name, "no intercepted members, construction left unwrapped");
            None
        } else if !self.wrap {
            match options.unwrapped_overrides {
                UnwrappedPolicy::Ignore => {
                    tracing::warn!(
                        class = %self.name,
                        members = self.registry.len(),
                        "class is not wrapped, registered interceptors will never run"
                    );
                    None
                }
                UnwrappedPolicy::Reject => {
                    return Err(Error::Config(format!(
                        "class '{}' has {} intercepted member(s) but is not wrapped",
                        self.name,
                        self.registry.len()
                    )));
                }
            }
        } else {
            tracing::debug!(
                class = %self.name,
                members = self.registry.len(),
                "wrapping class for interception"
            );
            Some(FacadeFactory::new(self.registry, options.trace_chains))
        };

        Ok(Rc::new(Class {
            name: self.name,
            fields: self.fields,
            members: self.members,
            constructor: self.constructor,
            facades,
        }))
    }
}
