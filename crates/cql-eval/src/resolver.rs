//! The reference resolver: library scopes, visibility, cross-library
//! lookup (spec.md §4.2).

use std::collections::HashMap;

use cql_ast::{Library, Type};
use indexmap::IndexMap;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct FunctionBinding {
    pub parameter_names: Vec<String>,
    pub operand_types: Vec<Type>,
    pub body: cql_ast::Expr,
    pub is_public: bool,
    pub is_fluent: bool,
}

#[derive(Default)]
struct Scope {
    /// Unqualified library key this scope belongs to, e.g. `"Common|1.0.0"`
    /// or `"<unnamed>"`.
    key: String,
    values: HashMap<String, (Value, bool)>,
    functions: HashMap<String, Vec<FunctionBinding>>,
    /// alias → included library key
    includes: HashMap<String, String>,
}

/// A stack of per-library scopes. One `ReferenceResolver` is built fresh
/// per `Eval` call and discarded with it.
pub struct ReferenceResolver {
    scopes: HashMap<String, Scope>,
    current: Option<String>,
    visiting: Vec<String>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self { scopes: HashMap::new(), current: None, visiting: Vec::new() }
    }

    pub fn set_current_library(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.scopes.entry(key.clone()).or_insert_with(|| Scope { key: key.clone(), ..Scope::default() });
        self.current = Some(key);
    }

    pub fn set_current_unnamed(&mut self) {
        self.set_current_library("<unnamed>");
    }

    /// Marks `included_key` as visible from the current scope under
    /// `alias`. Refuses a self-cycle unless `permit_cycle` is set
    /// (spec.md §9: "the include step must refuse self-cycles").
    pub fn include_library(&mut self, alias: impl Into<String>, included_key: impl Into<String>, permit_cycle: bool) -> EvalResult<()> {
        let current = self.current_key()?.to_string();
        let included_key = included_key.into();
        if !permit_cycle && included_key == current {
            return Err(EvalError::AstMalformed(format!("library '{current}' cannot include itself")));
        }
        let alias = alias.into();
        self.current_scope_mut()?.includes.insert(alias, included_key);
        Ok(())
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value, is_public: bool) -> EvalResult<()> {
        let name = name.into();
        self.current_scope_mut()?.values.insert(name, (value, is_public));
        Ok(())
    }

    pub fn define_func(
        &mut self,
        name: impl Into<String>,
        parameter_names: Vec<String>,
        operand_types: Vec<Type>,
        body: cql_ast::Expr,
        is_public: bool,
        is_fluent: bool,
    ) -> EvalResult<()> {
        let name = name.into();
        self.current_scope_mut()?
            .functions
            .entry(name)
            .or_default()
            .push(FunctionBinding { parameter_names, operand_types, body, is_public, is_fluent });
        Ok(())
    }

    /// Looks up `name` in the current scope.
    pub fn resolve(&self, name: &str) -> EvalResult<Value> {
        let scope = self.current_scope()?;
        scope
            .values
            .get(name)
            .map(|(v, _)| v.clone())
            .ok_or_else(|| EvalError::NotFound(format!("'{name}' is not defined")))
    }

    /// Looks up `name` inside the library reached from the current scope
    /// via `alias`, enforcing public visibility.
    pub fn resolve_global(&self, alias: &str, name: &str) -> EvalResult<Value> {
        let current = self.current_scope()?;
        let target_key = current
            .includes
            .get(alias)
            .ok_or_else(|| EvalError::NotFound(format!("no library included under alias '{alias}'")))?;
        let target = self
            .scopes
            .get(target_key)
            .ok_or_else(|| EvalError::NotFound(format!("included library '{target_key}' was not evaluated")))?;
        let (value, is_public) = target
            .values
            .get(name)
            .ok_or_else(|| EvalError::NotFound(format!("'{name}' is not defined in '{target_key}'")))?;
        if !is_public {
            return Err(EvalError::Visibility(format!("{name} is not public")));
        }
        Ok(value.clone())
    }

    pub fn resolve_func(&self, name: &str) -> EvalResult<&[FunctionBinding]> {
        let scope = self.current_scope()?;
        scope.functions.get(name).map(|v| v.as_slice()).ok_or_else(|| EvalError::NotFound(format!("function '{name}' is not defined")))
    }

    pub fn resolve_func_global(&self, alias: &str, name: &str) -> EvalResult<&[FunctionBinding]> {
        let current = self.current_scope()?;
        let target_key = current
            .includes
            .get(alias)
            .ok_or_else(|| EvalError::NotFound(format!("no library included under alias '{alias}'")))?;
        let target = self
            .scopes
            .get(target_key)
            .ok_or_else(|| EvalError::NotFound(format!("included library '{target_key}' was not evaluated")))?;
        let bindings = target
            .functions
            .get(name)
            .ok_or_else(|| EvalError::NotFound(format!("function '{name}' is not defined in '{target_key}'")))?;
        if bindings.iter().any(|b| !b.is_public) && bindings.iter().all(|b| !b.is_public) {
            return Err(EvalError::Visibility(format!("{name} is not public")));
        }
        Ok(bindings)
    }

    /// Freezes every public definition from every evaluated scope into
    /// the output map, or every definition (public and private) when
    /// `include_private` is set.
    pub fn freeze(&self, include_private: bool) -> IndexMap<String, IndexMap<String, Value>> {
        let mut out: IndexMap<String, IndexMap<String, Value>> = IndexMap::new();
        for (key, scope) in &self.scopes {
            let mut defs = IndexMap::new();
            for (name, (value, is_public)) in &scope.values {
                if *is_public || include_private {
                    defs.insert(name.clone(), value.clone());
                }
            }
            out.insert(key.clone(), defs);
        }
        out
    }

    /// The library key reached from the current scope via `alias`.
    pub fn alias_target_key(&self, alias: &str) -> EvalResult<String> {
        let current = self.current_scope()?;
        current.includes.get(alias).cloned().ok_or_else(|| EvalError::NotFound(format!("no library included under alias '{alias}'")))
    }

    pub fn current_library_key(&self) -> EvalResult<String> {
        Ok(self.current_key()?.to_string())
    }

    pub fn enter_visiting(&mut self, key: &str) -> EvalResult<()> {
        if self.visiting.iter().any(|k| k == key) {
            return Err(EvalError::AstMalformed(format!("include cycle detected at library '{key}'")));
        }
        self.visiting.push(key.to_string());
        Ok(())
    }

    pub fn exit_visiting(&mut self) {
        self.visiting.pop();
    }

    fn current_key(&self) -> EvalResult<&str> {
        self.current.as_deref().ok_or_else(|| EvalError::Internal("no current library scope set".into()))
    }

    fn current_scope(&self) -> EvalResult<&Scope> {
        let key = self.current_key()?;
        self.scopes.get(key).ok_or_else(|| EvalError::Internal(format!("scope '{key}' missing")))
    }

    fn current_scope_mut(&mut self) -> EvalResult<&mut Scope> {
        let key = self.current_key()?.to_string();
        self.scopes.get_mut(&key).ok_or_else(|| EvalError::Internal(format!("scope '{key}' missing")))
    }
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// The `(library_id)` key used throughout the resolver and the output
/// map: `name` alone for an unnamed-version library, `name|version`
/// otherwise.
pub fn library_key(library: &Library) -> String {
    match &library.id {
        Some(id) if id.version.is_empty() => id.name.clone(),
        Some(id) => format!("{}|{}", id.name, id.version),
        None => "<unnamed>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cql_ast::{Expr, ExprKind, Literal};

    fn bool_expr(b: bool) -> Expr {
        Expr::new(0, Type::Boolean, ExprKind::Literal(Literal::Boolean(b)))
    }

    #[test]
    fn resolve_finds_a_value_defined_in_the_current_scope() {
        let mut r = ReferenceResolver::new();
        r.set_current_library("Main");
        r.define("X", Value::integer(1), true).unwrap();
        assert_eq!(r.resolve("X").unwrap().to_int32().unwrap(), 1);
        assert!(r.resolve("Missing").is_err());
    }

    #[test]
    fn resolve_global_enforces_public_visibility() {
        let mut r = ReferenceResolver::new();
        r.set_current_library("Common|1.0.0");
        r.define("Pub", Value::integer(1), true).unwrap();
        r.define("Priv", Value::integer(2), false).unwrap();

        r.set_current_library("Main");
        r.include_library("Common", "Common|1.0.0", false).unwrap();
        assert_eq!(r.resolve_global("Common", "Pub").unwrap().to_int32().unwrap(), 1);
        assert!(matches!(r.resolve_global("Common", "Priv").unwrap_err(), EvalError::Visibility(_)));
        assert!(r.resolve_global("Nope", "Pub").is_err());
    }

    #[test]
    fn include_library_refuses_a_self_cycle_unless_permitted() {
        let mut r = ReferenceResolver::new();
        r.set_current_library("Main");
        assert!(r.include_library("Self", "Main", false).is_err());
        assert!(r.include_library("Self", "Main", true).is_ok());
    }

    #[test]
    fn enter_visiting_detects_a_revisited_library_key() {
        let mut r = ReferenceResolver::new();
        r.enter_visiting("A").unwrap();
        r.enter_visiting("B").unwrap();
        assert!(r.enter_visiting("A").is_err());
        r.exit_visiting();
        r.exit_visiting();
    }

    #[test]
    fn resolve_func_global_is_visible_when_any_overload_is_public() {
        let mut r = ReferenceResolver::new();
        r.set_current_library("Common");
        r.define_func("F", vec!["x".to_string()], vec![Type::Integer], bool_expr(true), true, false).unwrap();
        r.define_func("F", vec!["x".to_string(), "y".to_string()], vec![Type::Integer, Type::Integer], bool_expr(false), false, false).unwrap();

        r.set_current_library("Main");
        r.include_library("C", "Common", false).unwrap();
        let bindings = r.resolve_func_global("C", "F").unwrap();
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn freeze_includes_private_defs_only_when_asked() {
        let mut r = ReferenceResolver::new();
        r.set_current_library("Main");
        r.define("Pub", Value::integer(1), true).unwrap();
        r.define("Priv", Value::integer(2), false).unwrap();

        let public_only = r.freeze(false);
        assert_eq!(public_only.get("Main").unwrap().len(), 1);
        let everything = r.freeze(true);
        assert_eq!(everything.get("Main").unwrap().len(), 2);
    }

    fn empty_library(id: Option<cql_ast::LibraryId>) -> Library {
        Library {
            id,
            usings: vec![],
            includes: vec![],
            parameters: vec![],
            code_systems: vec![],
            value_sets: vec![],
            codes: vec![],
            concepts: vec![],
            statements: vec![],
        }
    }

    #[test]
    fn library_key_formats_named_unnamed_and_versioned_libraries() {
        let named = empty_library(Some(cql_ast::LibraryId { name: "Common".to_string(), version: "1.0.0".to_string() }));
        assert_eq!(library_key(&named), "Common|1.0.0");

        let unversioned = empty_library(Some(cql_ast::LibraryId { name: "Common".to_string(), version: String::new() }));
        assert_eq!(library_key(&unversioned), "Common");

        let unnamed = empty_library(None);
        assert_eq!(library_key(&unnamed), "<unnamed>");
    }
}
