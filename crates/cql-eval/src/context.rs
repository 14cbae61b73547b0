//! Evaluation configuration and the cooperative cancellation token
//! (spec.md §5, §6.1).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use cql_ast::Expr;
use cql_model::{DataModelRegistry, Retriever, TerminologyProvider};

use crate::error::{EvalError, EvalResult};

/// A cheaply-cloned flag an external caller can set to request graceful
/// termination. The interpreter checks it at the entry of every
/// statement evaluation and every list iteration step.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> EvalResult<()> {
        if self.is_cancelled() {
            Err(EvalError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything an `Eval` call needs beyond the libraries themselves
/// (spec.md §6.1).
#[derive(Clone)]
pub struct EvalConfig {
    pub data_models: Arc<dyn DataModelRegistry>,
    pub retriever: Arc<dyn Retriever>,
    pub terminology: Arc<dyn TerminologyProvider>,
    /// `(library_name, parameter_name) → binding expression`.
    pub parameters: HashMap<(String, String), Expr>,
    pub evaluation_timestamp: DateTime<FixedOffset>,
    pub return_private_defs: bool,
    pub cancellation: CancellationToken,
}

pub struct EvalConfigBuilder {
    data_models: Option<Arc<dyn DataModelRegistry>>,
    retriever: Option<Arc<dyn Retriever>>,
    terminology: Option<Arc<dyn TerminologyProvider>>,
    parameters: HashMap<(String, String), Expr>,
    evaluation_timestamp: Option<DateTime<FixedOffset>>,
    return_private_defs: bool,
    cancellation: CancellationToken,
}

impl EvalConfigBuilder {
    pub fn new() -> Self {
        Self {
            data_models: None,
            retriever: None,
            terminology: None,
            parameters: HashMap::new(),
            evaluation_timestamp: None,
            return_private_defs: false,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn data_models(mut self, registry: Arc<dyn DataModelRegistry>) -> Self {
        self.data_models = Some(registry);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn terminology(mut self, terminology: Arc<dyn TerminologyProvider>) -> Self {
        self.terminology = Some(terminology);
        self
    }

    pub fn parameter(mut self, library_name: impl Into<String>, name: impl Into<String>, binding: Expr) -> Self {
        self.parameters.insert((library_name.into(), name.into()), binding);
        self
    }

    pub fn evaluation_timestamp(mut self, ts: DateTime<FixedOffset>) -> Self {
        self.evaluation_timestamp = Some(ts);
        self
    }

    pub fn return_private_defs(mut self, value: bool) -> Self {
        self.return_private_defs = value;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn build(self) -> EvalResult<EvalConfig> {
        Ok(EvalConfig {
            data_models: self
                .data_models
                .ok_or_else(|| EvalError::Internal("EvalConfig requires a data_models registry".into()))?,
            retriever: self.retriever.ok_or_else(|| EvalError::Internal("EvalConfig requires a retriever".into()))?,
            terminology: self
                .terminology
                .ok_or_else(|| EvalError::Internal("EvalConfig requires a terminology provider".into()))?,
            parameters: self.parameters,
            evaluation_timestamp: self.evaluation_timestamp.unwrap_or_else(|| {
                DateTime::<FixedOffset>::from(chrono::Utc::now())
            }),
            return_private_defs: self.return_private_defs,
            cancellation: self.cancellation,
        })
    }
}

impl Default for EvalConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
