//! Derived interceptors
//!
//! Each helper here produces an ordinary method- or access-interceptor, so
//! they stack with hand-written ones and obey the same ordering rules.

use std::rc::Rc;

use super::context::{AccessContext, AccessInterceptor, InvocationContext, MethodInterceptor};
use crate::error::Result;
use crate::value::Value;

/// Method-interceptor from a closure
pub fn around<F>(f: F) -> MethodInterceptor
where
    F: Fn(&mut InvocationContext) -> Result<Value> + 'static,
{
    Rc::new(f)
}

/// Access-interceptor from a closure
pub fn access<F>(f: F) -> AccessInterceptor
where
    F: Fn(&mut AccessContext) -> Result<Value> + 'static,
{
    Rc::new(f)
}

/// Run the call, then pass its result through `transform`.
pub fn after<F>(transform: F) -> MethodInterceptor
where
    F: Fn(&mut InvocationContext, Value) -> Result<Value> + 'static,
{
    Rc::new(move |ctx: &mut InvocationContext| {
        let result = ctx.next()?;
        transform(ctx, result)
    })
}

/// Rewrite the arguments with `transform`, then run the call.
pub fn before<F>(transform: F) -> MethodInterceptor
where
    F: Fn(&mut InvocationContext, Vec<Value>) -> Result<Vec<Value>> + 'static,
{
    Rc::new(move |ctx: &mut InvocationContext| {
        let args = std::mem::take(&mut ctx.args);
        ctx.args = transform(ctx, args)?;
        ctx.next()
    })
}

/// Pass every read result through `transform`. Writes are untouched.
pub fn getter<F>(transform: F) -> AccessInterceptor
where
    F: Fn(&mut AccessContext, Value) -> Result<Value> + 'static,
{
    Rc::new(move |ctx: &mut AccessContext| {
        if ctx.setter() {
            return ctx.next();
        }
        let value = ctx.next()?;
        transform(ctx, value)
    })
}

/// Rewrite every written value with `transform`. Reads are untouched.
pub fn setter<F>(transform: F) -> AccessInterceptor
where
    F: Fn(&mut AccessContext, Value) -> Result<Value> + 'static,
{
    Rc::new(move |ctx: &mut AccessContext| {
        if !ctx.setter() {
            return ctx.next();
        }
        let value = std::mem::take(&mut ctx.value);
        ctx.value = transform(ctx, value)?;
        ctx.next()
    })
}
