//! Per-class interceptor table

use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::context::{AccessInterceptor, MethodInterceptor};

/// The two interceptor lists attached to one member.
///
/// Lists are in registration order; execution walks them from the back.
#[derive(Clone, Default)]
pub struct Override {
    method_chain: Vec<MethodInterceptor>,
    access_chain: Vec<AccessInterceptor>,
}

impl Override {
    /// Method-interceptors in registration order
    pub fn method_chain(&self) -> &[MethodInterceptor] {
        &self.method_chain
    }

    /// Access-interceptors in registration order
    pub fn access_chain(&self) -> &[AccessInterceptor] {
        &self.access_chain
    }
}

impl std::fmt::Debug for Override {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Override")
            .field("method_chain", &self.method_chain.len())
            .field("access_chain", &self.access_chain.len())
            .finish()
    }
}

/// Member name → [`Override`] for one class.
///
/// Append-only while the class is being built; shared read-only by every
/// façade once the class is wrapped.
#[derive(Debug, Default)]
pub struct OverrideRegistry {
    overrides: FxHashMap<Rc<str>, Rc<Override>>,
}

impl OverrideRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append method-interceptors to `member`'s method chain.
    ///
    /// Creates the member's entry on first use, even if `interceptors` is empty.
    pub fn register_method_interceptors<I>(&mut self, member: &str, interceptors: I)
    where
        I: IntoIterator<Item = MethodInterceptor>,
    {
        self.entry(member).method_chain.extend(interceptors);
    }

    /// Append access-interceptors to `member`'s access chain.
    pub fn register_access_interceptors<I>(&mut self, member: &str, interceptors: I)
    where
        I: IntoIterator<Item = AccessInterceptor>,
    {
        self.entry(member).access_chain.extend(interceptors);
    }

    fn entry(&mut self, member: &str) -> &mut Override {
        let slot = self.overrides.entry(Rc::from(member)).or_default();
        // Sole owner until the registry is frozen, so this never clones
        Rc::make_mut(slot)
    }

    /// Get the override for a member
    pub fn get(&self, member: &str) -> Option<&Override> {
        self.overrides.get(member).map(|o| o.as_ref())
    }

    /// Shared handles used by façades: interned member name and its override
    pub(crate) fn lookup(&self, member: &str) -> Option<(&Rc<str>, &Rc<Override>)> {
        self.overrides.get_key_value(member)
    }

    /// Number of intercepted members
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Check if no member has been registered
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}
