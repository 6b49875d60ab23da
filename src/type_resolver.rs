//! Type resolution over explicit type metadata.
//!
//! A [`TypeResolver`] turns declared type expressions into canonical
//! [`ResolvedType`]s, enumerates the methods a host type exposes, and answers
//! assignability questions. [`TypeRegistry`] is the default implementation: it
//! records the traits, types and impl blocks of a program and derives member
//! lists from them, substituting trait generic parameters and associated
//! types along the way.

use crate::handler::MethodDecl;
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Erased name of the unit type
pub const VOID: &str = "()";

/// Erased name of the universal type every type is assignable to
pub const ANY: &str = "_";

/// Name of the reflective meta-type
pub const META_TYPE: &str = "TypeId";

/// Trait impls whose methods every type carries and that never serve routes
const BASE_TRAITS: &[&str] = &[
    "Clone",
    "Debug",
    "Default",
    "Display",
    "Drop",
    "Eq",
    "Hash",
    "Ord",
    "PartialEq",
    "PartialOrd",
];

/// A declared type expression, generics not yet resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TypeExpr {
    /// The unit type `()`
    Unit,
    /// A named type with optional generic arguments, e.g. `Vec<Pet>`
    Named { name: String, args: Vec<TypeExpr> },
    /// A generic type variable, e.g. `T`
    Variable(String),
    /// An associated type of the implementing type, e.g. `Self::Output`
    SelfAssoc(String),
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: &str, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Named {
            name: name.to_string(),
            args,
        }
    }

    pub fn variable(name: &str) -> Self {
        TypeExpr::Variable(name.to_string())
    }

    /// Raw type name after erasure
    pub fn erased_name(&self) -> &str {
        match self {
            TypeExpr::Unit => VOID,
            TypeExpr::Named { name, .. } => name,
            TypeExpr::Variable(_) | TypeExpr::SelfAssoc(_) => ANY,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeExpr::Unit)
    }

    pub fn is_parameterized(&self) -> bool {
        matches!(self, TypeExpr::Named { args, .. } if !args.is_empty())
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Unit => write!(f, "{}", VOID),
            TypeExpr::Named { name, args } if args.is_empty() => write!(f, "{}", name),
            TypeExpr::Named { name, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}<{}>", name, args.join(", "))
            }
            TypeExpr::Variable(name) => write!(f, "{}", name),
            TypeExpr::SelfAssoc(name) => write!(f, "Self::{}", name),
        }
    }
}

/// Canonical, erasure-aware descriptor of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResolvedType {
    pub erased_type: String,
    pub type_parameters: Vec<ResolvedType>,
}

impl ResolvedType {
    pub fn simple(name: &str) -> Self {
        Self {
            erased_type: name.to_string(),
            type_parameters: Vec::new(),
        }
    }

    pub fn void() -> Self {
        Self::simple(VOID)
    }

    pub fn any() -> Self {
        Self::simple(ANY)
    }

    pub fn is_void(&self) -> bool {
        self.erased_type == VOID
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.type_parameters.is_empty() {
            return write!(f, "{}", self.erased_type);
        }
        let params: Vec<String> = self.type_parameters.iter().map(|t| t.to_string()).collect();
        write!(f, "{}<{}>", self.erased_type, params.join(", "))
    }
}

impl From<&ResolvedType> for TypeExpr {
    fn from(resolved: &ResolvedType) -> Self {
        match resolved.erased_type.as_str() {
            VOID => TypeExpr::Unit,
            _ => TypeExpr::Named {
                name: resolved.erased_type.clone(),
                args: resolved.type_parameters.iter().map(TypeExpr::from).collect(),
            },
        }
    }
}

/// A method of a host type with every type resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedMethod {
    pub declaring_type: String,
    pub name: String,
    pub argument_types: Vec<ResolvedType>,
    pub return_type: ResolvedType,
}

impl ResolvedMethod {
    pub fn argument_count(&self) -> usize {
        self.argument_types.len()
    }
}

/// How a host type behaves when it serves a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFlavor {
    /// An ordinary concrete type
    Concrete,
    /// A dynamically generated proxy; its own members are not meaningful
    Proxy,
    /// The reflective meta-type itself
    MetaType,
    /// A trait
    Trait,
}

/// Type resolution capability consumed by the handler method resolver
pub trait TypeResolver: Send + Sync {
    /// Resolves a declared type expression outside of any impl context
    fn resolve(&self, expr: &TypeExpr) -> ResolvedType;

    /// All methods exposed by a host type, base-trait methods excluded, in
    /// declaration order
    fn resolve_members(&self, host: &str) -> Vec<ResolvedMethod>;

    /// Whether a value of type `source` can be used where `target` is expected
    fn is_assignable_from(&self, target: &str, source: &str) -> bool;

    fn flavor_of(&self, type_name: &str) -> TypeFlavor;
}

/// A named field of a struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
}

/// A struct or enum declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub flavor: TypeFlavor,
    pub fields: Vec<FieldDecl>,
    /// Variant names when the declaration is an enum
    pub variants: Vec<String>,
}

impl TypeDecl {
    pub fn concrete(name: &str) -> Self {
        Self {
            name: name.to_string(),
            generics: Vec::new(),
            flavor: TypeFlavor::Concrete,
            fields: Vec::new(),
            variants: Vec::new(),
        }
    }

    pub fn proxy(name: &str) -> Self {
        Self {
            flavor: TypeFlavor::Proxy,
            ..Self::concrete(name)
        }
    }

    pub fn with_field(mut self, name: &str, ty: TypeExpr) -> Self {
        self.fields.push(FieldDecl {
            name: name.to_string(),
            ty,
        });
        self
    }

    pub fn with_generics(mut self, generics: &[&str]) -> Self {
        self.generics = generics.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_variants(mut self, variants: &[&str]) -> Self {
        self.variants = variants.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn is_enum(&self) -> bool {
        !self.variants.is_empty()
    }
}

/// A trait method, with or without a default body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitMethod {
    pub decl: MethodDecl,
    pub has_default: bool,
}

/// A trait declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub supertraits: Vec<String>,
    pub methods: Vec<TraitMethod>,
}

impl TraitDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            generics: Vec::new(),
            supertraits: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_generics(mut self, generics: &[&str]) -> Self {
        self.generics = generics.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_supertrait(mut self, name: &str) -> Self {
        self.supertraits.push(name.to_string());
        self
    }

    /// Adds a required method
    pub fn with_method(mut self, decl: MethodDecl) -> Self {
        self.methods.push(TraitMethod {
            decl,
            has_default: false,
        });
        self
    }

    /// Adds a method with a default body
    pub fn with_default_method(mut self, decl: MethodDecl) -> Self {
        self.methods.push(TraitMethod {
            decl,
            has_default: true,
        });
        self
    }
}

/// An inherent or trait impl block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplDecl {
    pub self_type: String,
    pub trait_ref: Option<TypeExpr>,
    pub associated_types: Vec<(String, TypeExpr)>,
    pub methods: Vec<MethodDecl>,
}

impl ImplDecl {
    pub fn inherent(self_type: &str) -> Self {
        Self {
            self_type: self_type.to_string(),
            trait_ref: None,
            associated_types: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn of_trait(trait_ref: TypeExpr, self_type: &str) -> Self {
        Self {
            trait_ref: Some(trait_ref),
            ..Self::inherent(self_type)
        }
    }

    pub fn with_method(mut self, decl: MethodDecl) -> Self {
        self.methods.push(decl);
        self
    }

    pub fn with_associated_type(mut self, name: &str, ty: TypeExpr) -> Self {
        self.associated_types.push((name.to_string(), ty));
        self
    }

    pub fn trait_name(&self) -> Option<&str> {
        self.trait_ref.as_ref().map(|t| t.erased_name())
    }
}

/// Generic variable and associated type bindings in effect inside an impl
#[derive(Debug, Default)]
struct Substitution<'a> {
    variables: HashMap<&'a str, &'a TypeExpr>,
    associated: HashMap<&'a str, &'a TypeExpr>,
}

/// In-memory registry of type metadata
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDecl>,
    traits: HashMap<String, TraitDecl>,
    impls: Vec<ImplDecl>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type(&mut self, decl: TypeDecl) {
        debug!("Registering type: {}", decl.name);
        self.types.insert(decl.name.clone(), decl);
    }

    pub fn register_trait(&mut self, decl: TraitDecl) {
        debug!("Registering trait: {}", decl.name);
        self.traits.insert(decl.name.clone(), decl);
    }

    pub fn register_impl(&mut self, decl: ImplDecl) {
        debug!(
            "Registering impl {} for {}",
            decl.trait_name().unwrap_or("<inherent>"),
            decl.self_type
        );
        self.impls.push(decl);
    }

    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    pub fn trait_decl(&self, name: &str) -> Option<&TraitDecl> {
        self.traits.get(name)
    }

    /// Types with an impl of `trait_name`, in impl declaration order
    pub fn implementors_of(&self, trait_name: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.impls
            .iter()
            .filter(|i| i.trait_name() == Some(trait_name))
            .map(|i| i.self_type.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Fields of a registered struct, the struct's generic parameters bound to
    /// the type parameters of `resolved`
    pub fn resolved_fields(&self, resolved: &ResolvedType) -> Vec<(String, ResolvedType)> {
        let Some(decl) = self.types.get(&resolved.erased_type) else {
            return Vec::new();
        };
        let bound: Vec<TypeExpr> = resolved.type_parameters.iter().map(TypeExpr::from).collect();
        let mut subst = Substitution::default();
        for (var, arg) in decl.generics.iter().zip(&bound) {
            subst.variables.insert(var.as_str(), arg);
        }
        decl.fields
            .iter()
            .map(|f| (f.name.clone(), self.resolve_in(&f.ty, &subst)))
            .collect()
    }

    /// Whether `resolved` names a registered struct or enum, as opposed to a
    /// scalar, a container or an unknown wrapper
    pub fn is_model(&self, resolved: &ResolvedType) -> bool {
        let name = resolved.erased_type.as_str();
        !Self::is_primitive(name) && !Self::is_container(name) && self.types.contains_key(name)
    }

    /// Whether `name` is a built-in scalar type
    pub fn is_primitive(name: &str) -> bool {
        matches!(
            name,
            "String"
                | "str"
                | "i8"
                | "i16"
                | "i32"
                | "i64"
                | "i128"
                | "isize"
                | "u8"
                | "u16"
                | "u32"
                | "u64"
                | "u128"
                | "usize"
                | "f32"
                | "f64"
                | "bool"
                | "char"
        )
    }

    /// Whether `name` is a standard wrapper or collection type
    pub fn is_container(name: &str) -> bool {
        matches!(
            name,
            "Vec" | "VecDeque" | "Option" | "Box" | "Arc" | "Rc" | "HashMap" | "BTreeMap" | "HashSet"
                | "BTreeSet"
        )
    }

    fn resolve_in(&self, expr: &TypeExpr, subst: &Substitution<'_>) -> ResolvedType {
        match expr {
            TypeExpr::Unit => ResolvedType::void(),
            TypeExpr::Named { name, args } => {
                if args.is_empty() {
                    if let Some(bound) = subst.variables.get(name.as_str()) {
                        return self.resolve_in(bound, &Substitution::default());
                    }
                }
                ResolvedType {
                    erased_type: name.clone(),
                    type_parameters: args.iter().map(|a| self.resolve_in(a, subst)).collect(),
                }
            }
            TypeExpr::Variable(name) => match subst.variables.get(name.as_str()) {
                Some(bound) => self.resolve_in(bound, &Substitution::default()),
                None => ResolvedType::any(),
            },
            TypeExpr::SelfAssoc(name) => match subst.associated.get(name.as_str()) {
                Some(bound) => self.resolve_in(bound, &Substitution::default()),
                None => ResolvedType::any(),
            },
        }
    }

    fn resolve_method(&self, declaring_type: &str, decl: &MethodDecl, subst: &Substitution<'_>) -> ResolvedMethod {
        ResolvedMethod {
            declaring_type: declaring_type.to_string(),
            name: decl.name.clone(),
            argument_types: decl
                .parameters
                .iter()
                .map(|p| self.resolve_in(&p.ty, subst))
                .collect(),
            return_type: self.resolve_in(&decl.return_type, subst),
        }
    }

    fn trait_members(&self, trait_decl: &TraitDecl) -> Vec<ResolvedMethod> {
        let subst = Substitution::default();
        trait_decl
            .methods
            .iter()
            .map(|m| self.resolve_method(&trait_decl.name, &m.decl, &subst))
            .collect()
    }

    fn impl_members(&self, host: &str, impl_decl: &ImplDecl) -> Vec<ResolvedMethod> {
        let mut subst = Substitution::default();
        for (name, ty) in &impl_decl.associated_types {
            subst.associated.insert(name.as_str(), ty);
        }

        let trait_decl = impl_decl.trait_name().and_then(|name| self.traits.get(name));
        if let (Some(trait_decl), Some(TypeExpr::Named { args, .. })) = (trait_decl, &impl_decl.trait_ref) {
            for (var, arg) in trait_decl.generics.iter().zip(args) {
                subst.variables.insert(var.as_str(), arg);
            }
        }

        let mut members: Vec<ResolvedMethod> = impl_decl
            .methods
            .iter()
            .map(|m| self.resolve_method(host, m, &subst))
            .collect();

        // Default trait methods the impl does not override are inherited
        if let Some(trait_decl) = trait_decl {
            for inherited in trait_decl.methods.iter().filter(|m| m.has_default) {
                let overridden = impl_decl.methods.iter().any(|m| m.name == inherited.decl.name);
                if !overridden {
                    members.push(self.resolve_method(&trait_decl.name, &inherited.decl, &subst));
                }
            }
        }

        members
    }

    /// Traits directly implemented by `name`, or supertraits when `name` is a trait
    fn direct_supertypes(&self, name: &str) -> Vec<&str> {
        if let Some(trait_decl) = self.traits.get(name) {
            return trait_decl.supertraits.iter().map(|s| s.as_str()).collect();
        }
        self.impls
            .iter()
            .filter(|i| i.self_type == name)
            .filter_map(|i| i.trait_name())
            .collect()
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve(&self, expr: &TypeExpr) -> ResolvedType {
        self.resolve_in(expr, &Substitution::default())
    }

    fn resolve_members(&self, host: &str) -> Vec<ResolvedMethod> {
        if let Some(trait_decl) = self.traits.get(host) {
            return self.trait_members(trait_decl);
        }

        let members: Vec<ResolvedMethod> = self
            .impls
            .iter()
            .filter(|i| i.self_type == host)
            .filter(|i| !i.trait_name().is_some_and(|t| BASE_TRAITS.contains(&t)))
            .flat_map(|i| self.impl_members(host, i))
            .collect();

        debug!("Resolved {} members for {}", members.len(), host);
        members
    }

    fn is_assignable_from(&self, target: &str, source: &str) -> bool {
        if target == source || target == ANY {
            return true;
        }

        let mut visited = HashSet::new();
        let mut pending = vec![source];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            for supertype in self.direct_supertypes(current) {
                if supertype == target {
                    return true;
                }
                pending.push(supertype);
            }
        }
        false
    }

    fn flavor_of(&self, type_name: &str) -> TypeFlavor {
        if type_name == META_TYPE {
            return TypeFlavor::MetaType;
        }
        if self.traits.contains_key(type_name) {
            return TypeFlavor::Trait;
        }
        self.types
            .get(type_name)
            .map(|t| t.flavor)
            .unwrap_or(TypeFlavor::Concrete)
    }
}
