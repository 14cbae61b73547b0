//! The library evaluator and expression evaluator: the fixed per-library
//! step order (spec.md §4.3) and the recursive AST walk that dispatches
//! every `ExprKind` node (spec.md §4.4).

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use cql_ast::{Expr, ExprKind, Library, Literal, MessageSeverity, Statement, TemporalPrecision as Precision, Type, Visibility};
use cql_model::DataModelRegistry;
use indexmap::IndexMap;

use crate::context::{CancellationToken, EvalConfig};
use crate::dispatch;
use crate::error::{EngineError, EvalError, EvalResult};
use crate::property;
use crate::query;
use crate::resolver::{library_key, FunctionBinding, ReferenceResolver};
use crate::retrieve;
use crate::temporal::{CqlDate, CqlDateTime, CqlTime};
use crate::value::{Value, ValueKind};
use crate::operators::type_ops;

pub type LibraryKey = String;
pub type Libraries = IndexMap<LibraryKey, IndexMap<String, Value>>;

/// Evaluates every library, in include-before-use order, and returns
/// every public top-level definition (spec.md §6.1).
pub fn eval(ctx: &CancellationToken, libraries: &[Library], config: &EvalConfig) -> Result<Libraries, EngineError> {
    let engine = Engine {
        config,
        ctx,
        resolver: RefCell::new(ReferenceResolver::new()),
        evaluated: RefCell::new(HashSet::new()),
        using_uris: RefCell::new(HashMap::new()),
    };
    let by_key: HashMap<String, &Library> = libraries.iter().map(|l| (library_key(l), l)).collect();
    for lib in libraries {
        let key = library_key(lib);
        engine.eval_library(lib, &key, &by_key).map_err(|e| EngineError::new(key.clone(), e))?;
    }
    Ok(engine.resolver.into_inner().freeze(config.return_private_defs))
}

struct Engine<'a> {
    config: &'a EvalConfig,
    ctx: &'a CancellationToken,
    resolver: RefCell<ReferenceResolver>,
    evaluated: RefCell<HashSet<String>>,
    /// Model URIs a library's `Using` statements declared, keyed by
    /// library key, read back while evaluating that library's `Retrieve`
    /// nodes.
    using_uris: RefCell<HashMap<String, Vec<String>>>,
}

type Locals = IndexMap<String, Value>;

impl<'a> Engine<'a> {
    /// Visits `lib`'s includes (recursively, each exactly once) and then
    /// runs its own Using → Parameters → CodeSystems → ValueSets → Codes
    /// → Concepts → Includes → Statements sequence.
    fn eval_library(&self, lib: &Library, key: &str, by_key: &HashMap<String, &Library>) -> EvalResult<()> {
        if self.evaluated.borrow().contains(key) {
            return Ok(());
        }
        self.resolver.borrow_mut().enter_visiting(key)?;
        self.resolver.borrow_mut().set_current_library(key);

        let mut using_uris = Vec::with_capacity(lib.usings.len());
        for using in &lib.usings {
            let uri = self
                .config
                .data_models
                .model_uri(&using.model_name, &using.model_version)
                .ok_or_else(|| EvalError::NotFound(format!("unknown data model '{}' {}", using.model_name, using.model_version)))?;
            using_uris.push(uri);
        }
        self.using_uris.borrow_mut().insert(key.to_string(), using_uris);

        let library_name = lib.id.as_ref().map(|id| id.name.clone()).unwrap_or_default();
        for param in &lib.parameters {
            self.ctx.check()?;
            let value = match self.config.parameters.get(&(library_name.clone(), param.name.clone())) {
                Some(binding) => self.eval_expr(binding, &Locals::new())?,
                None => match &param.default {
                    Some(expr) => self.eval_expr(expr, &Locals::new())?,
                    None => Value::null(),
                },
            };
            self.resolver.borrow_mut().define(param.name.clone(), value, param.visibility == Visibility::Public)?;
        }

        for cs in &lib.code_systems {
            let value = Value { kind: ValueKind::CodeSystem { id: cs.uri.clone(), version: cs.version.clone() }, provenance: None };
            self.resolver.borrow_mut().define(cs.name.clone(), value, cs.visibility == Visibility::Public)?;
        }

        for vs in &lib.value_sets {
            let value = Value { kind: ValueKind::ValueSet { id: vs.uri.clone(), version: vs.version.clone() }, provenance: None };
            self.resolver.borrow_mut().define(vs.name.clone(), value, vs.visibility == Visibility::Public)?;
        }

        for code_def in &lib.codes {
            let system_id = self.resolver.borrow().resolve(&code_def.code_system_ref).ok().and_then(|v| match v.kind {
                ValueKind::CodeSystem { id, .. } => Some(id),
                _ => None,
            });
            let value = Value {
                kind: ValueKind::Code(cql_model::Code { code: code_def.code.clone(), system: system_id, version: None, display: code_def.display.clone() }),
                provenance: None,
            };
            self.resolver.borrow_mut().define(code_def.name.clone(), value, code_def.visibility == Visibility::Public)?;
        }

        for concept_def in &lib.concepts {
            let mut codes = smallvec::SmallVec::new();
            for code_ref in &concept_def.code_refs {
                if let Ok(v) = self.resolver.borrow().resolve(code_ref) {
                    if let ValueKind::Code(c) = v.kind {
                        codes.push(c);
                    }
                }
            }
            let value = Value { kind: ValueKind::Concept { codes, display: concept_def.display.clone() }, provenance: None };
            self.resolver.borrow_mut().define(concept_def.name.clone(), value, concept_def.visibility == Visibility::Public)?;
        }

        for inc in &lib.includes {
            let inc_key = include_key(&inc.library_name, &inc.library_version);
            let inc_lib =
                by_key.get(inc_key.as_str()).ok_or_else(|| EvalError::NotFound(format!("included library '{inc_key}' was not provided")))?;
            self.eval_library(inc_lib, &inc_key, by_key)?;
            self.resolver.borrow_mut().set_current_library(key);
            self.resolver.borrow_mut().include_library(inc.alias.clone(), inc_key, false)?;
        }

        for stmt in &lib.statements {
            self.ctx.check()?;
            match stmt {
                Statement::Expression(def) => {
                    let value = self.eval_expr(&def.body, &Locals::new())?;
                    self.resolver.borrow_mut().define(def.name.clone(), value, def.visibility == Visibility::Public)?;
                }
                Statement::Function(def) => {
                    let operand_types = def.parameters.iter().map(|p| p.parameter_type.clone()).collect();
                    let parameter_names = def.parameters.iter().map(|p| p.name.clone()).collect();
                    self.resolver.borrow_mut().define_func(
                        def.name.clone(),
                        parameter_names,
                        operand_types,
                        def.body.clone(),
                        def.visibility == Visibility::Public,
                        def.fluent,
                    )?;
                }
            }
        }

        self.resolver.borrow_mut().exit_visiting();
        self.evaluated.borrow_mut().insert(key.to_string());
        Ok(())
    }

    fn eval_expr(&self, expr: &Expr, locals: &Locals) -> EvalResult<Value> {
        self.ctx.check()?;
        match &expr.kind {
            ExprKind::Literal(lit) => self.eval_literal(expr.id, lit),
            ExprKind::Ref(name) => {
                if let Some(v) = locals.get(name) {
                    return Ok(v.clone());
                }
                self.resolver.borrow().resolve(name)
            }
            ExprKind::QualifiedRef { library_alias, name } => self.resolver.borrow().resolve_global(library_alias, name),
            ExprKind::Property { source, path } => {
                let src = self.eval_expr(source, locals)?;
                property::access(&src, path, self.config.data_models.as_ref())
            }
            ExprKind::Operator { op, operands, precision } => {
                let mut values = Vec::with_capacity(operands.len());
                for operand in operands {
                    values.push(self.eval_expr(operand, locals)?);
                }
                let result = dispatch::dispatch(*op, &values, *precision)?;
                Ok(result.with_sources(expr.id, values))
            }
            ExprKind::If { condition, then_branch, else_branch } => {
                let cond = self.eval_expr(condition, locals)?;
                match cond.kind {
                    ValueKind::Boolean(true) => self.eval_expr(then_branch, locals),
                    _ => self.eval_expr(else_branch, locals),
                }
            }
            ExprKind::Case { comparand, items, else_result } => match comparand {
                Some(cmp_expr) => {
                    let cmp_value = self.eval_expr(cmp_expr, locals)?;
                    for item in items {
                        let when_value = self.eval_expr(&item.when, locals)?;
                        if matches!(cmp_value.equal(&when_value).kind, ValueKind::Boolean(true)) {
                            return self.eval_expr(&item.then, locals);
                        }
                    }
                    self.eval_expr(else_result, locals)
                }
                None => {
                    for item in items {
                        let when_value = self.eval_expr(&item.when, locals)?;
                        if matches!(when_value.kind, ValueKind::Boolean(true)) {
                            return self.eval_expr(&item.then, locals);
                        }
                    }
                    self.eval_expr(else_result, locals)
                }
            },
            ExprKind::List { elements, element_type } => {
                let mut items = Vec::with_capacity(elements.len());
                for el in elements {
                    items.push(self.eval_expr(el, locals)?);
                }
                Ok(Value::list(items, element_type.clone()))
            }
            ExprKind::Tuple { fields } | ExprKind::Instance { fields, .. } => {
                let mut map = IndexMap::new();
                for (name, field_expr) in fields {
                    map.insert(name.clone(), self.eval_expr(field_expr, locals)?);
                }
                Ok(Value { kind: ValueKind::Tuple(map), provenance: None })
            }
            ExprKind::Interval { low, high, low_inclusive, high_inclusive } => {
                let low_v = self.eval_expr(low, locals)?;
                let high_v = self.eval_expr(high, locals)?;
                Ok(Value {
                    kind: ValueKind::Interval {
                        low: Box::new(low_v),
                        high: Box::new(high_v),
                        low_inclusive: *low_inclusive,
                        high_inclusive: *high_inclusive,
                    },
                    provenance: None,
                })
            }
            ExprKind::IntervalField { source, field } => {
                let src = self.eval_expr(source, locals)?;
                if src.is_null() {
                    return Ok(Value::null());
                }
                match &src.kind {
                    ValueKind::Interval { low, high, low_inclusive, high_inclusive } => Ok(match field {
                        cql_ast::IntervalField::Low => (**low).clone(),
                        cql_ast::IntervalField::High => (**high).clone(),
                        cql_ast::IntervalField::LowClosed => Value::boolean(*low_inclusive),
                        cql_ast::IntervalField::HighClosed => Value::boolean(*high_inclusive),
                    }),
                    _ => Err(EvalError::TypeMismatch(format!("expected Interval, found {}", src.type_name()))),
                }
            }
            ExprKind::FunctionRef { library_alias, name, args } => self.eval_function_call(library_alias.as_deref(), name, args, locals),
            ExprKind::Query(query) => query::evaluate(query, self.ctx, |e, bindings| self.eval_expr(e, bindings)),
            ExprKind::Retrieve(retrieve) => {
                let value_set = match &retrieve.value_set {
                    Some(vs_expr) => Some(self.eval_expr(vs_expr, locals)?),
                    None => None,
                };
                let current_key = self.resolver.borrow().current_library_key()?;
                let uris = self.using_uris.borrow().get(&current_key).cloned().unwrap_or_default();
                retrieve::evaluate(retrieve, self.config, &uris, value_set)
            }
            ExprKind::Message { source, condition, code, severity, message } => {
                self.eval_message(source, condition.as_deref(), code.as_deref(), *severity, message, locals)
            }
            ExprKind::Now => {
                let offset = *self.config.evaluation_timestamp.offset();
                Ok(Value {
                    kind: ValueKind::DateTime(CqlDateTime {
                        date: self.config.evaluation_timestamp.date_naive(),
                        time: self.config.evaluation_timestamp.time(),
                        offset,
                        precision: Precision::Millisecond,
                    }),
                    provenance: None,
                })
            }
            ExprKind::Today => Ok(Value {
                kind: ValueKind::Date(CqlDate { date: self.config.evaluation_timestamp.date_naive(), precision: Precision::Day }),
                provenance: None,
            }),
            ExprKind::TimeOfDay => Ok(Value {
                kind: ValueKind::Time(CqlTime { time: self.config.evaluation_timestamp.time(), precision: Precision::Millisecond }),
                provenance: None,
            }),
            ExprKind::MinValue(t) => self.type_bound(t, true),
            ExprKind::MaxValue(t) => self.type_bound(t, false),
            ExprKind::Is { source, target_type } => {
                let src = self.eval_expr(source, locals)?;
                Ok(type_ops::is_type(&src, target_type))
            }
            ExprKind::As { source, target_type, strict } => {
                let src = self.eval_expr(source, locals)?;
                type_ops::as_type(&src, target_type, *strict)
            }
            ExprKind::Convert { source, target_type } => {
                let src = self.eval_expr(source, locals)?;
                type_ops::convert(&src, target_type)
            }
        }
    }

    fn eval_literal(&self, node: cql_ast::ExprId, lit: &Literal) -> EvalResult<Value> {
        Ok(match lit {
            Literal::Null => Value::null(),
            Literal::Boolean(b) => Value::boolean(*b),
            Literal::Integer(i) => Value::integer(*i),
            Literal::Long(i) => Value::long(*i),
            Literal::Decimal { value, text } => Value::decimal(*value).with_literal_text(node, text.clone()),
            Literal::String(s) => Value::string(s.clone()),
            Literal::Quantity { value, unit, .. } => Value { kind: ValueKind::Quantity { value: *value, unit: unit.clone() }, provenance: None },
            Literal::Date(text) => {
                let d = CqlDate::parse(&format!("@{text}"))?;
                Value { kind: ValueKind::Date(d), provenance: None }
            }
            Literal::DateTime(text) => {
                let d = CqlDateTime::parse(&format!("@{text}"))?;
                Value { kind: ValueKind::DateTime(d), provenance: None }
            }
            Literal::Time(text) => {
                let t = CqlTime::parse(&format!("@{text}"))?;
                Value { kind: ValueKind::Time(t), provenance: None }
            }
        })
    }

    fn type_bound(&self, t: &Type, is_min: bool) -> EvalResult<Value> {
        match t {
            Type::Integer => Ok(Value::integer(if is_min { i32::MIN } else { i32::MAX })),
            Type::Long => Ok(Value::long(if is_min { i64::MIN } else { i64::MAX })),
            Type::Decimal => {
                let max: rust_decimal::Decimal = crate::value::DECIMAL_MAX.parse().expect("DECIMAL_MAX parses");
                Ok(Value::decimal(if is_min { -max } else { max }))
            }
            Type::Date => Ok(Value { kind: ValueKind::Date(if is_min { CqlDate::min_value() } else { CqlDate::max_value() }), provenance: None }),
            Type::DateTime => {
                let offset = *self.config.evaluation_timestamp.offset();
                Ok(Value {
                    kind: ValueKind::DateTime(if is_min { CqlDateTime::min_value(offset) } else { CqlDateTime::max_value(offset) }),
                    provenance: None,
                })
            }
            Type::Time => Ok(Value { kind: ValueKind::Time(if is_min { CqlTime::min_value() } else { CqlTime::max_value() }), provenance: None }),
            other => Err(EvalError::UnsupportedOverload(format!("MinValue/MaxValue is not defined for {other}"))),
        }
    }

    fn eval_function_call(&self, library_alias: Option<&str>, name: &str, args: &[Expr], locals: &Locals) -> EvalResult<Value> {
        let arg_values: Vec<Value> = args.iter().map(|a| self.eval_expr(a, locals)).collect::<EvalResult<Vec<_>>>()?;
        let registry = self.config.data_models.as_ref();

        let (bindings, target_key): (Vec<FunctionBinding>, Option<String>) = match library_alias {
            Some(alias) => {
                let resolver = self.resolver.borrow();
                let bindings = resolver.resolve_func_global(alias, name)?.to_vec();
                let target = resolver.alias_target_key(alias)?;
                (bindings, Some(target))
            }
            None => {
                let resolver = self.resolver.borrow();
                (resolver.resolve_func(name)?.to_vec(), None)
            }
        };

        let binding = bindings
            .iter()
            .find(|b| {
                b.operand_types.len() == arg_values.len()
                    && b.operand_types.iter().zip(arg_values.iter()).all(|(declared, v)| param_matches(declared, &v.runtime_type(), registry))
            })
            .ok_or_else(|| {
                let arg_types: Vec<String> = arg_values.iter().map(|v| v.type_name()).collect();
                EvalError::UnsupportedOverload(format!("{name}({})", arg_types.join(", ")))
            })?;

        let mut new_locals = Locals::new();
        for (param_name, value) in binding.parameter_names.iter().zip(arg_values) {
            new_locals.insert(param_name.clone(), value);
        }

        match target_key {
            Some(key) => {
                let original = self.resolver.borrow().current_library_key()?;
                self.resolver.borrow_mut().set_current_library(&key);
                let result = self.eval_expr(&binding.body, &new_locals);
                self.resolver.borrow_mut().set_current_library(&original);
                result
            }
            None => self.eval_expr(&binding.body, &new_locals),
        }
    }

    fn eval_message(
        &self,
        source: &Expr,
        condition: Option<&Expr>,
        code: Option<&Expr>,
        severity: MessageSeverity,
        message: &Expr,
        locals: &Locals,
    ) -> EvalResult<Value> {
        let source_value = self.eval_expr(source, locals)?;
        let should_fire = match condition {
            Some(cond) => matches!(self.eval_expr(cond, locals)?.kind, ValueKind::Boolean(true)),
            None => true,
        };
        if !should_fire {
            return Ok(source_value);
        }

        let message_text = self.eval_expr(message, locals)?.to_str().map(str::to_string).unwrap_or_default();
        let code_text = match code {
            Some(c) => self.eval_expr(c, locals).ok().and_then(|v| v.to_str().map(str::to_string).ok()),
            None => None,
        };

        match severity {
            MessageSeverity::Trace => log::trace!("{message_text}"),
            MessageSeverity::Message => log::info!("{message_text}"),
            MessageSeverity::Warning => log::warn!("{message_text}"),
            MessageSeverity::Error => {
                log::error!("{message_text}");
                let full = match code_text {
                    Some(c) => format!("[{c}] {message_text}"),
                    None => message_text,
                };
                return Err(EvalError::LoggedError(full));
            }
        }
        Ok(source_value)
    }
}

fn param_matches(declared: &Type, actual: &Type, registry: &dyn DataModelRegistry) -> bool {
    match (declared, actual) {
        (Type::Any, _) => true,
        (Type::Named(d), Type::Named(a)) => registry.is_subtype(a, d),
        (Type::List(d), Type::List(a)) => param_matches(d, a, registry),
        (Type::Interval(d), Type::Interval(a)) => param_matches(d, a, registry),
        _ => declared == actual,
    }
}

/// Matches `library_key`'s own `name`/`name|version` convention for an
/// `Include`'s target.
fn include_key(name: &str, version: &str) -> String {
    if version.is_empty() {
        name.to_string()
    } else {
        format!("{name}|{version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cql_ast::{ExpressionDef, FunctionDef, FunctionParameter, IncludeDef, LibraryId, Literal, Operator};
    use cql_model::{Retriever, RetrieverError, TerminologyProvider};
    use std::sync::Arc;

    struct FakeRegistry;

    impl DataModelRegistry for FakeRegistry {
        fn model_uri(&self, model_name: &str, model_version: &str) -> Option<String> {
            Some(format!("http://example.org/{model_name}/{model_version}"))
        }
        fn property(&self, _type_name: &str, _property: &str) -> Option<cql_model::PropertyInfo> {
            None
        }
        fn is_subtype(&self, sub: &str, sup: &str) -> bool {
            sub == sup
        }
        fn is_retrievable(&self, _type_name: &str) -> bool {
            true
        }
    }

    struct FakeRetriever;
    impl Retriever for FakeRetriever {
        fn retrieve(&self, _data_type_name: &str) -> Result<Vec<Arc<dyn cql_model::ResourceHandle>>, RetrieverError> {
            Ok(vec![])
        }
    }

    struct FakeTerminology;
    impl TerminologyProvider for FakeTerminology {
        fn in_value_set(&self, _code: &cql_model::Code, _url: &str, _version: Option<&str>) -> Result<bool, cql_model::TerminologyError> {
            Ok(false)
        }
        fn expand(&self, _url: &str, _version: Option<&str>) -> Result<Vec<cql_model::Code>, cql_model::TerminologyError> {
            Ok(vec![])
        }
    }

    fn config() -> EvalConfig {
        crate::context::EvalConfigBuilder::new()
            .data_models(Arc::new(FakeRegistry))
            .retriever(Arc::new(FakeRetriever))
            .terminology(Arc::new(FakeTerminology))
            .build()
            .unwrap()
    }

    fn int_literal(n: i32) -> Expr {
        Expr::new(0, Type::Integer, ExprKind::Literal(Literal::Integer(n)))
    }

    fn empty_library(id: Option<LibraryId>) -> Library {
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
    fn eval_evaluates_expression_defs_and_hides_private_ones_by_default() {
        let mut lib = empty_library(None);
        lib.statements.push(Statement::Expression(ExpressionDef { visibility: Visibility::Public, name: "X".to_string(), body: int_literal(1) }));
        lib.statements.push(Statement::Expression(ExpressionDef { visibility: Visibility::Private, name: "Y".to_string(), body: int_literal(2) }));

        let ctx = CancellationToken::new();
        let cfg = config();
        let result = eval(&ctx, &[lib], &cfg).unwrap();
        let defs = result.get("<unnamed>").unwrap();
        assert_eq!(defs.get("X").unwrap().to_int32().unwrap(), 1);
        assert!(!defs.contains_key("Y"));
    }

    #[test]
    fn eval_resolves_cross_library_function_calls_through_includes() {
        let mut common = empty_library(Some(LibraryId { name: "Common".to_string(), version: "1.0.0".to_string() }));
        let double_body = Expr::new(
            0,
            Type::Integer,
            ExprKind::Operator { op: Operator::Multiply, operands: vec![Expr::new(0, Type::Integer, ExprKind::Ref("x".to_string())), int_literal(2)], precision: None },
        );
        common.statements.push(Statement::Function(FunctionDef {
            visibility: Visibility::Public,
            fluent: false,
            name: "Double".to_string(),
            parameters: vec![FunctionParameter { name: "x".to_string(), parameter_type: Type::Integer }],
            return_type: Type::Integer,
            body: double_body,
        }));

        let mut main = empty_library(None);
        main.includes.push(IncludeDef { library_name: "Common".to_string(), library_version: "1.0.0".to_string(), alias: "C".to_string() });
        let call = Expr::new(
            0,
            Type::Integer,
            ExprKind::FunctionRef { library_alias: Some("C".to_string()), name: "Double".to_string(), args: vec![int_literal(21)] },
        );
        main.statements.push(Statement::Expression(ExpressionDef { visibility: Visibility::Public, name: "Result".to_string(), body: call }));

        let ctx = CancellationToken::new();
        let cfg = config();
        let result = eval(&ctx, &[common, main], &cfg).unwrap();
        assert_eq!(result.get("<unnamed>").unwrap().get("Result").unwrap().to_int32().unwrap(), 42);
    }

    #[test]
    fn eval_surfaces_an_undeclared_include_as_an_engine_error() {
        let mut main = empty_library(None);
        main.includes.push(IncludeDef { library_name: "Missing".to_string(), library_version: String::new(), alias: "M".to_string() });
        let ctx = CancellationToken::new();
        let cfg = config();
        assert!(eval(&ctx, &[main], &cfg).is_err());
    }

    #[test]
    fn eval_literal_parses_every_literal_kind_including_temporals() {
        let cfg = config();
        let ctx = CancellationToken::new();
        let engine = Engine { config: &cfg, ctx: &ctx, resolver: RefCell::new(ReferenceResolver::new()), evaluated: RefCell::new(HashSet::new()), using_uris: RefCell::new(HashMap::new()) };
        engine.resolver.borrow_mut().set_current_unnamed();

        assert!(engine.eval_literal(0, &Literal::Null).unwrap().is_null());
        assert_eq!(engine.eval_literal(0, &Literal::Boolean(true)).unwrap().to_bool().unwrap(), true);
        assert_eq!(engine.eval_literal(0, &Literal::Integer(7)).unwrap().to_int32().unwrap(), 7);

        let date = engine.eval_literal(0, &Literal::Date("2020-06-15".to_string())).unwrap();
        assert!(matches!(date.kind, ValueKind::Date(_)));

        let datetime = engine.eval_literal(0, &Literal::DateTime("2020-06-15T10:30:00".to_string())).unwrap();
        assert!(matches!(datetime.kind, ValueKind::DateTime(_)));

        let time = engine.eval_literal(0, &Literal::Time("T10:30:00".to_string())).unwrap();
        assert!(matches!(time.kind, ValueKind::Time(_)));
    }

    #[test]
    fn type_bound_returns_min_and_max_and_rejects_unsupported_types() {
        let cfg = config();
        let ctx = CancellationToken::new();
        let engine = Engine { config: &cfg, ctx: &ctx, resolver: RefCell::new(ReferenceResolver::new()), evaluated: RefCell::new(HashSet::new()), using_uris: RefCell::new(HashMap::new()) };

        assert_eq!(engine.type_bound(&Type::Integer, true).unwrap().to_int32().unwrap(), i32::MIN);
        assert_eq!(engine.type_bound(&Type::Integer, false).unwrap().to_int32().unwrap(), i32::MAX);
        assert!(engine.type_bound(&Type::String, true).is_err());
    }

    #[test]
    fn param_matches_handles_any_named_subtypes_and_structural_containers() {
        let registry = FakeRegistry;
        assert!(param_matches(&Type::Any, &Type::Integer, &registry));
        assert!(param_matches(&Type::Named("Patient".to_string()), &Type::Named("Patient".to_string()), &registry));
        assert!(param_matches(&Type::list_of(Type::Integer), &Type::list_of(Type::Integer), &registry));
        assert!(!param_matches(&Type::Integer, &Type::String, &registry));
    }

    #[test]
    fn include_key_omits_the_version_separator_when_version_is_empty() {
        assert_eq!(include_key("Common", "1.0.0"), "Common|1.0.0");
        assert_eq!(include_key("Common", ""), "Common");
    }
}
