//! Chain executor
//!
//! Both chain kinds share one protocol. A context owns a [`Cursor`] that
//! starts one past the end of its interceptor list. Every `next()` moves the
//! cursor down by one:
//!
//! - still in range → run the interceptor at the cursor, handing it the
//!   context so it can call `next()` itself
//! - exhausted → run the terminal operation with the context's current
//!   receiver and payload
//!
//! The cursor belongs to a single activation and is never reset. An
//! interceptor that skips `next()` swallows the rest of the chain; one that
//! calls it twice continues from wherever the cursor has moved to, which after
//! exhaustion means running the terminal operation again.

use std::rc::Rc;

use crate::error::Result;
use crate::value::Value;

/// An interceptor over context type `C`
pub type Interceptor<C> = Rc<dyn Fn(&mut C) -> Result<Value>>;

/// Position in an interceptor list, walked from the back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    position: isize,
}

impl Cursor {
    /// Cursor for a list of `len` interceptors
    pub(crate) fn new(len: usize) -> Self {
        Self {
            position: len as isize,
        }
    }

    /// Step inward. Returns the index to run, or `None` once exhausted.
    pub(crate) fn advance(&mut self) -> Option<usize> {
        self.position = self.position.saturating_sub(1);
        usize::try_from(self.position).ok()
    }

    /// Current position (negative once exhausted)
    #[cfg(test)]
    pub(crate) fn position(&self) -> isize {
        self.position
    }
}

/// A context that can be driven through a chain.
pub(crate) trait Chained: Sized {
    /// Chain kind, for diagnostics
    const KIND: &'static str;

    /// The interceptor list, in registration order
    fn links(&self) -> &[Interceptor<Self>];

    /// The activation's cursor
    fn cursor_mut(&mut self) -> &mut Cursor;

    /// The terminal operation
    fn fallthrough(&mut self) -> Result<Value>;

    /// Member being intercepted
    fn member_name(&self) -> &str;

    /// Whether per-step trace events are enabled
    fn traced(&self) -> bool;
}

/// Run the next link of the chain, or the terminal operation.
pub(crate) fn proceed<C: Chained>(ctx: &mut C) -> Result<Value> {
    match ctx.cursor_mut().advance() {
        Some(index) => {
            let link = Rc::clone(&ctx.links()[index]);
            if ctx.traced() {
                tracing::trace!(kind = C::KIND, member = ctx.member_name(), index, "interceptor");
            }
            link(ctx)
        }
        None => {
            if ctx.traced() {
                tracing::trace!(kind = C::KIND, member = ctx.member_name(), "fallthrough");
            }
            ctx.fallthrough()
        }
    }
}
