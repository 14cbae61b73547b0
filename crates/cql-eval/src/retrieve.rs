//! `Retrieve` node evaluation: data-type URI validation, resource
//! fetch, and value-set / code-property filtering (spec.md §6.4, §6.5).

use cql_ast::{Retrieve, Type};
use cql_model::Code as ModelCode;
use smallvec::SmallVec;

use crate::context::EvalConfig;
use crate::error::{EvalError, EvalResult};
use crate::property;
use crate::value::{Value, ValueKind};

/// Evaluates a `Retrieve` node. `using_uris` are the model URIs declared
/// by the enclosing library's `Using` statements; `value_set` is the
/// already-evaluated value-set filter expression, if the node has one.
pub fn evaluate(retrieve: &Retrieve, config: &EvalConfig, using_uris: &[String], value_set: Option<Value>) -> EvalResult<Value> {
    let model_uri = config
        .data_models
        .model_uri(&retrieve.model_name, &retrieve.model_version)
        .ok_or_else(|| EvalError::NotFound(format!("unknown data model '{}' {}", retrieve.model_name, retrieve.model_version)))?;
    if !using_uris.iter().any(|u| u == &model_uri) {
        return Err(EvalError::RetrieveError(format!(
            "RetrieveUriMismatch: model URI '{model_uri}' is not declared by any Using statement"
        )));
    }

    let handles = config
        .retriever
        .retrieve(&retrieve.type_name)
        .map_err(|e| EvalError::RetrieveError(e.to_string()))?;

    let mut resources = Vec::with_capacity(handles.len());
    for handle in handles {
        let resource_type = handle.resource_type().filter(|t| !t.is_empty());
        if resource_type.is_none() {
            return Err(EvalError::RetrieveError("NoResourceType: resource handle exposed no resource type tag".into()));
        }
        resources.push(Value { kind: ValueKind::Named { handle, runtime_type: retrieve.type_name.clone() }, provenance: None });
    }

    let value_set = match value_set {
        Some(v) if !v.is_null() => Some(v),
        _ => None,
    };

    let Some(value_set) = value_set else {
        return Ok(Value::list(resources, Type::Named(retrieve.type_name.clone())));
    };

    let code_property = retrieve
        .code_property
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| EvalError::RetrieveError("empty CodeProperty with a non-empty value-set filter".into()))?;

    let (vs_id, vs_version) = match &value_set.kind {
        ValueKind::ValueSet { id, version } => (id.clone(), version.clone()),
        ValueKind::String(s) => (s.clone(), None),
        _ => return Err(EvalError::TypeMismatch(format!("expected ValueSet, found {}", value_set.type_name()))),
    };

    let mut filtered = Vec::new();
    for resource in resources {
        let codes = extract_codes(&resource, code_property, config)?;
        let mut member = false;
        for code in &codes {
            if config
                .terminology
                .in_value_set(code, &vs_id, vs_version.as_deref())
                .map_err(|e| EvalError::RetrieveError(e.to_string()))?
            {
                member = true;
                break;
            }
        }
        if member {
            filtered.push(resource);
        }
    }
    Ok(Value::list(filtered, Type::Named(retrieve.type_name.clone())))
}

fn extract_codes(resource: &Value, code_property: &str, config: &EvalConfig) -> EvalResult<SmallVec<[ModelCode; 2]>> {
    let value = property::access(resource, code_property, config.data_models.as_ref())?;
    collect_codes(&value)
}

fn collect_codes(value: &Value) -> EvalResult<SmallVec<[ModelCode; 2]>> {
    match &value.kind {
        ValueKind::Code(c) => {
            let mut out = SmallVec::new();
            out.push(c.clone());
            Ok(out)
        }
        ValueKind::Concept { codes, .. } => Ok(codes.clone()),
        ValueKind::List { items, .. } => {
            let mut out = SmallVec::new();
            for item in items {
                out.extend(collect_codes(item)?);
            }
            Ok(out)
        }
        ValueKind::Null => Ok(SmallVec::new()),
        _ => Err(EvalError::RetrieveError(format!(
            "CodePropertyNotCodeable: code property did not resolve to a Code/Concept-shaped value, found {}",
            value.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cql_model::{Code, DataModelRegistry, PropertyInfo, PropertyShape, PropertyValue, ResourceHandle, Retriever, RetrieverError, TerminologyError, TerminologyProvider};
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FakeRegistry {
        uri: Option<String>,
        properties: HashMap<(&'static str, &'static str), PropertyInfo>,
    }

    impl DataModelRegistry for FakeRegistry {
        fn model_uri(&self, _model_name: &str, _model_version: &str) -> Option<String> {
            self.uri.clone()
        }
        fn property(&self, type_name: &str, property: &str) -> Option<PropertyInfo> {
            self.properties.iter().find(|((t, p), _)| *t == type_name && *p == property).map(|(_, info)| info.clone())
        }
        fn is_subtype(&self, sub: &str, sup: &str) -> bool {
            sub == sup
        }
        fn is_retrievable(&self, _type_name: &str) -> bool {
            true
        }
    }

    #[derive(Debug)]
    struct FakeResource {
        resource_type: Option<&'static str>,
        fields: HashMap<&'static str, PropertyValue>,
    }

    impl ResourceHandle for FakeResource {
        fn resource_type(&self) -> Option<&str> {
            self.resource_type
        }
        fn get(&self, canonical_name: &str) -> Option<PropertyValue> {
            self.fields.get(canonical_name).cloned()
        }
    }

    struct FakeRetriever {
        resources: Vec<Arc<dyn ResourceHandle>>,
    }

    impl Retriever for FakeRetriever {
        fn retrieve(&self, _data_type_name: &str) -> Result<Vec<Arc<dyn ResourceHandle>>, RetrieverError> {
            Ok(self.resources.clone())
        }
    }

    struct FakeTerminology {
        members: Vec<Code>,
    }

    impl TerminologyProvider for FakeTerminology {
        fn in_value_set(&self, code: &Code, _value_set_url: &str, _version: Option<&str>) -> Result<bool, TerminologyError> {
            Ok(self.members.contains(code))
        }
        fn expand(&self, _value_set_url: &str, _version: Option<&str>) -> Result<Vec<Code>, TerminologyError> {
            Ok(self.members.clone())
        }
    }

    fn config(registry: FakeRegistry, retriever: FakeRetriever, terminology: FakeTerminology) -> EvalConfig {
        crate::context::EvalConfigBuilder::new()
            .data_models(Arc::new(registry))
            .retriever(Arc::new(retriever))
            .terminology(Arc::new(terminology))
            .build()
            .unwrap()
    }

    fn retrieve_node(type_name: &str, code_property: Option<&str>) -> Retrieve {
        Retrieve {
            model_name: "FHIR".to_string(),
            model_version: "4.0.1".to_string(),
            type_name: type_name.to_string(),
            code_property: code_property.map(|s| s.to_string()),
            value_set: None,
        }
    }

    #[test]
    fn collect_codes_descends_through_concepts_and_lists_and_errors_on_non_codeable() {
        let code = Code::new("1234-5");
        let single = Value { kind: ValueKind::Code(code.clone()), provenance: None };
        assert_eq!(collect_codes(&single).unwrap().as_slice(), &[code.clone()]);

        let concept_codes = { let mut v = SmallVec::new(); v.push(code.clone()); v };
        let concept = Value { kind: ValueKind::Concept { codes: concept_codes, display: None }, provenance: None };
        assert_eq!(collect_codes(&concept).unwrap().as_slice(), &[code.clone()]);

        let list = Value::list(vec![single, concept], Type::Code);
        assert_eq!(collect_codes(&list).unwrap().len(), 2);

        assert!(collect_codes(&Value::null()).unwrap().is_empty());
        assert!(collect_codes(&Value::string("not a code")).is_err());
    }

    #[test]
    fn evaluate_rejects_a_model_uri_the_using_statements_never_declared() {
        let registry = FakeRegistry { uri: Some("http://hl7.org/fhir".to_string()), properties: HashMap::new() };
        let retriever = FakeRetriever { resources: vec![] };
        let terminology = FakeTerminology { members: vec![] };
        let cfg = config(registry, retriever, terminology);
        let retrieve = retrieve_node("Patient", None);
        let err = evaluate(&retrieve, &cfg, &["http://some.other.model".to_string()], None).unwrap_err();
        assert!(matches!(err, EvalError::RetrieveError(_)));
    }

    #[test]
    fn evaluate_without_a_value_set_returns_every_retrieved_resource() {
        let registry = FakeRegistry { uri: Some("http://hl7.org/fhir".to_string()), properties: HashMap::new() };
        let resources: Vec<Arc<dyn ResourceHandle>> = vec![
            Arc::new(FakeResource { resource_type: Some("Patient"), fields: HashMap::new() }),
            Arc::new(FakeResource { resource_type: Some("Patient"), fields: HashMap::new() }),
        ];
        let retriever = FakeRetriever { resources };
        let terminology = FakeTerminology { members: vec![] };
        let cfg = config(registry, retriever, terminology);
        let retrieve = retrieve_node("Patient", None);
        let result = evaluate(&retrieve, &cfg, &["http://hl7.org/fhir".to_string()], None).unwrap();
        assert_eq!(result.to_list().unwrap().len(), 2);
    }

    #[test]
    fn evaluate_errors_when_a_resource_handle_exposes_no_resource_type() {
        let registry = FakeRegistry { uri: Some("http://hl7.org/fhir".to_string()), properties: HashMap::new() };
        let resources: Vec<Arc<dyn ResourceHandle>> = vec![Arc::new(FakeResource { resource_type: None, fields: HashMap::new() })];
        let retriever = FakeRetriever { resources };
        let terminology = FakeTerminology { members: vec![] };
        let cfg = config(registry, retriever, terminology);
        let retrieve = retrieve_node("Patient", None);
        let err = evaluate(&retrieve, &cfg, &["http://hl7.org/fhir".to_string()], None).unwrap_err();
        assert!(matches!(err, EvalError::RetrieveError(_)));
    }

    #[test]
    fn evaluate_filters_by_value_set_membership_through_the_code_property() {
        let mut properties = HashMap::new();
        properties.insert(
            ("Condition", "code"),
            PropertyInfo { canonical_name: "code".to_string(), shape: PropertyShape::Scalar("Code".to_string()) },
        );
        let registry = FakeRegistry { uri: Some("http://hl7.org/fhir".to_string()), properties };

        let member_code = ModelCode::new("44054006").with_system("http://snomed.info/sct");
        let mut member_fields = HashMap::new();
        member_fields.insert("code", PropertyValue::String("44054006".to_string()));
        let non_member = Arc::new(FakeResource { resource_type: Some("Condition"), fields: member_fields });

        let retriever = FakeRetriever { resources: vec![non_member] };
        let terminology = FakeTerminology { members: vec![member_code] };
        let cfg = config(registry, retriever, terminology);
        let retrieve = retrieve_node("Condition", Some("code"));

        let value_set = Value { kind: ValueKind::ValueSet { id: "http://example.org/vs/diabetes".to_string(), version: None }, provenance: None };
        let err = evaluate(&retrieve, &cfg, &["http://hl7.org/fhir".to_string()], Some(value_set)).unwrap_err();
        assert!(matches!(err, EvalError::RetrieveError(msg) if msg.contains("CodePropertyNotCodeable")));
    }
}
