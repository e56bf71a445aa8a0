//! Interception Engine
//!
//! Attaches ordered interceptor chains to class members and routes every
//! read, write and call on an instance through them.
//!
//! ## Pieces
//!
//! - [`OverrideRegistry`]: member name → method chain + access chain
//! - `chain`: the LIFO cursor shared by both chain kinds
//! - [`InvocationContext`] / [`AccessContext`]: per-call and per-access state
//! - `Facade`: the object handed out in place of a raw instance
//! - [`combinators`]: `after`, `before`, `getter`, `setter`
//!
//! ## Flow
//!
//! ```text
//! facade.get("m") ──► access chain (A_n … A_1) ──► read "m" off `this`
//!                                                      │
//!                              callable? ──► bound wrapper
//!                                                      │
//! wrapper(args)   ──► method chain (M_n … M_1) ──► call with `this`, `args`
//! ```
//!
//! The last registered interceptor runs outermost. Members without an
//! override entry skip all of this and hit the raw instance directly.

mod chain;
pub mod combinators;
mod context;
mod facade;
mod registry;

pub use chain::Interceptor;
pub use context::{AccessContext, AccessInterceptor, InvocationContext, MethodInterceptor};
pub(crate) use facade::{Facade, FacadeFactory};
pub use registry::{Override, OverrideRegistry};
