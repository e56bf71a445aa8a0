//! Interpose Engine
//!
//! Attaches cross-cutting behaviour (logging, validation, caching, access
//! checks, argument and result rewriting) to class members without touching
//! the class body. Instances of an intercepted class are handed out behind a
//! façade whose reads, writes and calls run through ordered interceptor
//! chains before reaching the real member.
//!
//! # Example
//!
//! ```ignore
//! use interpose_engine::{ClassBuilder, Value};
//!
//! let account = ClassBuilder::new("Account")
//!     .field("balance", 0)
//!     .method("deposit", |this, args| {
//!         let balance = this.get("balance")?.as_int().unwrap_or(0);
//!         let amount = args[0].as_int().unwrap_or(0);
//!         this.set("balance", Value::Int(balance + amount))?;
//!         Ok(Value::Int(balance + amount))
//!     })
//!     .around("deposit", |ctx| {
//!         let calls = ctx.persistent_context().get("calls")?.as_int().unwrap_or(0);
//!         ctx.persistent_context().set("calls", Value::Int(calls + 1))?;
//!         ctx.next()
//!     })
//!     .build()?;
//!
//! let acc = account.construct(vec![])?;
//! acc.invoke("deposit", vec![Value::Int(10)])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class;
pub mod error;
pub mod intercept;
pub mod object;
pub mod options;
pub mod value;

pub use class::{Class, ClassBuilder, Constructor, Member};
pub use error::{Error, Result};
pub use intercept::{
    combinators, AccessContext, AccessInterceptor, InvocationContext, MethodInterceptor,
    Override, OverrideRegistry,
};
pub use object::ObjectRef;
pub use options::{InterceptOptions, UnwrappedPolicy};
pub use value::{Function, NativeFn, Value};
