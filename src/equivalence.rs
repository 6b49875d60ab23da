//! Identity of a cached unit of operation-reading work.
//!
//! Two route contexts describe the same work when their handler methods, bound
//! request-mapping patterns and generic naming strategies are equal by value.
//! Contexts without a handler method are all equal to each other and never
//! equal to a context that has one.

use crate::context::RouteContext;
use crate::handler::MethodIdentity;
use crate::naming::GenericNaming;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Cache key derived from a [`RouteContext`]
#[derive(Debug, Clone)]
pub struct OperationCacheKey {
    method: Option<MethodIdentity>,
    pattern: String,
    naming: GenericNaming,
}

impl OperationCacheKey {
    pub fn new(context: &RouteContext) -> Self {
        Self {
            method: context.handler_method().map(|h| h.identity()),
            pattern: context.request_mapping_pattern().to_string(),
            naming: context.naming().clone(),
        }
    }
}

impl From<&RouteContext> for OperationCacheKey {
    fn from(context: &RouteContext) -> Self {
        Self::new(context)
    }
}

impl PartialEq for OperationCacheKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.method, &other.method) {
            (None, None) => true,
            (Some(_), None) | (None, Some(_)) => false,
            (Some(first), Some(second)) => {
                first == second && self.pattern == other.pattern && self.naming == other.naming
            }
        }
    }
}

impl Eq for OperationCacheKey {}

impl Hash for OperationCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Keys without a method are all equal, so they must hash alike
        match &self.method {
            None => 0u8.hash(state),
            Some(method) => {
                1u8.hash(state);
                method.hash(state);
                self.pattern.hash(state);
                self.naming.hash(state);
            }
        }
    }
}

/// Whether two contexts are the same cached unit of work
pub fn equivalent(first: &RouteContext, second: &RouteContext) -> bool {
    OperationCacheKey::new(first) == OperationCacheKey::new(second)
}

/// Hash consistent with [`equivalent`]
pub fn equivalence_hash(context: &RouteContext) -> u64 {
    let mut hasher = DefaultHasher::new();
    OperationCacheKey::new(context).hash(&mut hasher);
    hasher.finish()
}
