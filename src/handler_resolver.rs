//! Resolution of a route's handler to the method that actually implements it.
//!
//! A route may be registered against a trait method or a method whose host
//! type has several members of the same name (an inherent method next to a
//! trait method, inherited default methods, overloads by arity). The resolver
//! enumerates the host's members through a [`TypeResolver`] and narrows them
//! down to one canonical [`ResolvedMethod`]:
//!
//! 1. members with the same name as the declared method;
//! 2. a single candidate is returned as-is;
//! 3. otherwise candidates with the same parameter count whose parameters
//!    accept the declared parameter types and whose return type narrows the
//!    declared one (or both return `()`);
//! 4. the candidate with the most parameters among the covariant ones, or
//!    among all same-named members when none is covariant.
//!
//! Ties on parameter count go to the candidate with the narrowest return type,
//! then to member declaration order.

use crate::handler::{HandlerMethod, ResolvedMethodParameter};
use crate::type_resolver::{ResolvedMethod, ResolvedType, TypeExpr, TypeFlavor, TypeResolver};
use log::debug;
use std::sync::Arc;

/// Finds canonical method signatures for handler methods
pub struct HandlerMethodResolver {
    type_resolver: Arc<dyn TypeResolver>,
}

impl HandlerMethodResolver {
    pub fn new(type_resolver: Arc<dyn TypeResolver>) -> Self {
        Self { type_resolver }
    }

    /// Resolved return type of the handler, `()` when the method cannot be resolved
    pub fn method_return_type(&self, handler: Option<&HandlerMethod>) -> ResolvedType {
        self.resolved_method(handler)
            .map(|m| m.return_type)
            .unwrap_or_else(ResolvedType::void)
    }

    /// Parameters of the handler paired with their resolved types.
    ///
    /// Empty when the method cannot be resolved.
    pub fn method_parameters(&self, handler: Option<&HandlerMethod>) -> Vec<ResolvedMethodParameter> {
        let Some(handler) = handler else {
            return Vec::new();
        };
        let Some(resolved) = self.resolved_method(Some(handler)) else {
            return Vec::new();
        };

        handler
            .method_parameters()
            .into_iter()
            .zip(resolved.argument_types)
            .map(|(parameter, resolved_type)| ResolvedMethodParameter {
                parameter,
                resolved_type,
            })
            .collect()
    }

    pub fn resolved_method(&self, handler: Option<&HandlerMethod>) -> Option<ResolvedMethod> {
        let handler = handler?;
        let host = self
            .use_type(&handler.bean_type)
            .unwrap_or(&handler.declaring_type);
        debug!(
            "Resolving {} on host {} (bean {})",
            handler.name(),
            host,
            handler.bean_type
        );

        let candidates: Vec<ResolvedMethod> = self
            .type_resolver
            .resolve_members(host)
            .into_iter()
            .filter(|m| m.name == handler.method.name)
            .collect();

        self.resolve_to_method_with_max_resolved_types(candidates, handler)
    }

    /// The bean type when its members are meaningful, `None` for proxies and
    /// the meta-type
    pub fn use_type<'a>(&self, bean_type: &'a str) -> Option<&'a str> {
        match self.type_resolver.flavor_of(bean_type) {
            TypeFlavor::Proxy | TypeFlavor::MetaType => None,
            TypeFlavor::Concrete | TypeFlavor::Trait => Some(bean_type),
        }
    }

    fn resolve_to_method_with_max_resolved_types(
        &self,
        candidates: Vec<ResolvedMethod>,
        handler: &HandlerMethod,
    ) -> Option<ResolvedMethod> {
        if candidates.len() <= 1 {
            return candidates.into_iter().next();
        }

        let covariant: Vec<&ResolvedMethod> = candidates
            .iter()
            .filter(|c| c.argument_count() == handler.method.parameters.len())
            .filter(|c| self.is_covariant_candidate(c, handler))
            .collect();
        debug!(
            "{} candidates for {}, {} covariant",
            candidates.len(),
            handler.name(),
            covariant.len()
        );

        match covariant.len() {
            0 => self.max_by_argument_count(candidates.iter().collect()),
            1 => covariant.into_iter().next().cloned(),
            _ => self.max_by_argument_count(covariant),
        }
    }

    fn is_covariant_candidate(&self, candidate: &ResolvedMethod, handler: &HandlerMethod) -> bool {
        let arguments_accepted = candidate
            .argument_types
            .iter()
            .zip(&handler.method.parameters)
            .all(|(argument, declared)| self.covariant(argument, &declared.ty));
        if !arguments_accepted {
            return false;
        }

        let declared_return = &handler.method.return_type;
        Self::both_are_voids(&candidate.return_type, declared_return)
            || self.contravariant(&candidate.return_type, declared_return)
    }

    /// The candidate parameter accepts the declared parameter type
    pub fn covariant(&self, candidate_argument: &ResolvedType, declared: &TypeExpr) -> bool {
        self.type_resolver
            .is_assignable_from(&candidate_argument.erased_type, declared.erased_name())
    }

    /// The candidate return type can stand in for the declared return type
    pub fn contravariant(&self, candidate_return: &ResolvedType, declared: &TypeExpr) -> bool {
        self.type_resolver
            .is_assignable_from(declared.erased_name(), &candidate_return.erased_type)
    }

    pub fn both_are_voids(candidate_return: &ResolvedType, declared: &TypeExpr) -> bool {
        candidate_return.is_void() && declared.is_void()
    }

    /// Highest argument count; ties go to the narrowest return type, then to
    /// the first candidate
    fn max_by_argument_count(&self, candidates: Vec<&ResolvedMethod>) -> Option<ResolvedMethod> {
        let max_count = candidates.iter().map(|c| c.argument_count()).max()?;
        let tied: Vec<&ResolvedMethod> = candidates
            .into_iter()
            .filter(|c| c.argument_count() == max_count)
            .collect();

        tied.iter()
            .find(|c| {
                tied.iter().all(|other| {
                    self.type_resolver
                        .is_assignable_from(&other.return_type.erased_type, &c.return_type.erased_type)
                })
            })
            .or_else(|| tied.first())
            .map(|c| (*c).clone())
    }
}
