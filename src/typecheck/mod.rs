mod scope;

use crate::ast::display::format_type;
use crate::ast::{Expr, Type};
use crate::span::Span;

pub use scope::ScopeResolver;

/// A type answered by a [`TypeResolver`].
///
/// The lowering engine treats it as opaque: it only copies the annotation
/// into synthesized declarations and asks whether it is an associative
/// container.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedType {
    ty: Type,
    container: bool,
}

impl ResolvedType {
    pub fn new(ty: Type) -> Self {
        let container = matches!(ty, Type::Map(..));
        Self { ty, container }
    }

    /// A type whose container-ness was decided by the resolver, e.g. a named
    /// type declared as a map.
    pub fn with_container(ty: Type, container: bool) -> Self {
        Self { ty, container }
    }

    /// The type to write into a declaration.
    pub fn annotation(&self) -> Type {
        self.ty.clone()
    }

    pub fn display(&self) -> String {
        format_type(&self.ty)
    }

    pub fn is_container(&self) -> bool {
        self.container
    }
}

/// The narrow type query the lowering engine consumes.
///
/// `at` is the span of the statement being rewritten; resolvers that track
/// lexical scope use it to pick the binding visible there.
pub trait TypeResolver {
    /// Type of an expression or identifier, or `None` when unknown.
    fn resolve(&self, expr: &Expr, at: Span) -> Option<ResolvedType>;

    /// Type of the `index`-th value produced by a multi-valued expression
    /// (a call, a map read with `ok`).
    fn resolve_result(&self, call: &Expr, index: usize, at: Span) -> Option<ResolvedType> {
        let _ = (call, index, at);
        None
    }
}

/// A resolver that knows nothing. Every annotation request fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullResolver;

impl TypeResolver for NullResolver {
    fn resolve(&self, _expr: &Expr, _at: Span) -> Option<ResolvedType> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_type_container() {
        let map = Type::Map(Box::new(Type::named("string")), Box::new(Type::named("int")));
        let resolved = ResolvedType::new(map);
        assert!(resolved.is_container());
        assert_eq!(resolved.display(), "map[string]int");

        let int = ResolvedType::new(Type::named("int"));
        assert!(!int.is_container());
        assert_eq!(int.annotation(), Type::named("int"));
    }

    #[test]
    fn test_null_resolver() {
        let r = NullResolver;
        assert!(r.resolve(&Expr::ident("x"), Span::dummy()).is_none());
        assert!(r
            .resolve_result(&Expr::ident("f"), 1, Span::dummy())
            .is_none());
    }
}
