//! Per-call evaluation state.

use basalt_config::EngineSettings;
use basalt_types::{AttributeValue, Bag, DataType, XsDate, XsTime};
use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

use crate::decision::{Status, StatusCode};
use crate::error::{EvalError, Result};
use crate::expression::{AttributeDesignator, VariableDefinition};
use crate::functions::FunctionRegistry;
use crate::policy::PolicyStore;
use crate::request::{Category, Request};
use crate::trace::{TraceEvent, TraceSink};
use crate::value::EvaluationValue;

pub const CURRENT_TIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-time";
pub const CURRENT_DATE: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-date";
pub const CURRENT_DATE_TIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-dateTime";

/// Everything one evaluation call reads: the request, the function
/// registry, the policy store, settings, a clock reading and an optional
/// trace sink.
///
/// The context is created per call and copied as evaluation descends the
/// policy tree, so nothing here is shared between concurrent calls.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    request: &'a Request,
    registry: &'a FunctionRegistry,
    store: &'a PolicyStore,
    settings: &'a EngineSettings,
    now: DateTime<FixedOffset>,
    sink: Option<&'a dyn TraceSink>,
    variables: &'a [VariableDefinition],
    depth: usize,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        request: &'a Request,
        registry: &'a FunctionRegistry,
        store: &'a PolicyStore,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            request,
            registry,
            store,
            settings,
            now: Utc::now().fixed_offset(),
            sink: None,
            variables: &[],
            depth: 0,
        }
    }

    /// Replaces the clock reading used for the current-time attributes.
    pub fn with_clock(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = now;
        self
    }

    pub fn with_sink(mut self, sink: &'a dyn TraceSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Scopes variable references to a policy's definitions.
    pub(crate) fn with_variables(mut self, variables: &'a [VariableDefinition]) -> Self {
        self.variables = variables;
        self
    }

    /// One level deeper in the policy tree or variable chain.
    pub(crate) fn descend(mut self) -> Result<Self> {
        self.depth += 1;
        if self.depth > self.settings.max_depth {
            return Err(EvalError::DepthExceeded(self.settings.max_depth));
        }
        Ok(self)
    }

    pub fn request(&self) -> &'a Request {
        self.request
    }

    pub fn registry(&self) -> &'a FunctionRegistry {
        self.registry
    }

    pub fn store(&self) -> &'a PolicyStore {
        self.store
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn trace(&self, event: impl FnOnce() -> TraceEvent) {
        if let Some(sink) = self.sink {
            sink.record(event());
        }
    }

    pub(crate) fn variable(&self, id: &str) -> Result<&'a VariableDefinition> {
        self.variables
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| EvalError::UndefinedVariable(id.to_string()))
    }

    /// Resolves a designator to a bag of request values.
    ///
    /// An absent attribute yields an empty bag, or Indeterminate with
    /// `missing-attribute` when the designator requires it. The
    /// current-time environment attributes fall back to the clock reading.
    pub fn resolve(&self, designator: &AttributeDesignator) -> EvaluationValue {
        let found = self.request.lookup(
            designator.category,
            &designator.attribute_id,
            designator.data_type,
            designator.issuer.as_deref(),
        );
        if let Some(bag) = found {
            return EvaluationValue::Bag(bag);
        }
        if let Some(value) = self.clock_attribute(designator) {
            return EvaluationValue::Bag(Bag::singleton(value));
        }
        if designator.must_be_present {
            debug!(
                attribute = %designator.attribute_id,
                category = %designator.category,
                "required attribute missing"
            );
            return EvaluationValue::Indeterminate(Status::new(
                StatusCode::MissingAttribute,
                format!(
                    "missing {} attribute {} of type {}",
                    designator.category, designator.attribute_id, designator.data_type
                ),
            ));
        }
        EvaluationValue::Bag(Bag::empty(designator.data_type))
    }

    fn clock_attribute(&self, designator: &AttributeDesignator) -> Option<AttributeValue> {
        if !self.settings.supply_current_time || designator.category != Category::Environment {
            return None;
        }
        match (designator.attribute_id.as_str(), designator.data_type) {
            (CURRENT_DATE_TIME, DataType::DateTime) => Some(AttributeValue::DateTime(self.now)),
            (CURRENT_DATE, DataType::Date) => Some(AttributeValue::Date(XsDate {
                date: self.now.date_naive(),
                offset: Some(*self.now.offset()),
            })),
            (CURRENT_TIME, DataType::Time) => Some(AttributeValue::Time(XsTime {
                time: self.now.time(),
                offset: Some(*self.now.offset()),
            })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn designator(category: Category, id: &str, data_type: DataType) -> AttributeDesignator {
        AttributeDesignator::new(category, id, data_type)
    }

    #[test]
    fn test_missing_attribute_is_empty_unless_required() {
        let request = Request::new();
        let registry = FunctionRegistry::with_builtins();
        let store = PolicyStore::new();
        let settings = EngineSettings::default();
        let ctx = EvaluationContext::new(&request, &registry, &store, &settings);

        let optional = designator(Category::Subject, "role", DataType::String);
        assert_eq!(
            ctx.resolve(&optional),
            EvaluationValue::Bag(Bag::empty(DataType::String))
        );

        let required = optional.required();
        match ctx.resolve(&required) {
            EvaluationValue::Indeterminate(status) => {
                assert_eq!(status.code, StatusCode::MissingAttribute);
            }
            other => panic!("expected Indeterminate, got {other:?}"),
        }
    }

    #[test]
    fn test_current_date_time_comes_from_the_clock() {
        let request = Request::new();
        let registry = FunctionRegistry::with_builtins();
        let store = PolicyStore::new();
        let settings = EngineSettings::default();
        let now = Utc
            .with_ymd_and_hms(2025, 1, 8, 10, 0, 0)
            .single()
            .expect("valid timestamp")
            .fixed_offset();
        let ctx = EvaluationContext::new(&request, &registry, &store, &settings).with_clock(now);

        let value = ctx.resolve(&designator(
            Category::Environment,
            CURRENT_DATE_TIME,
            DataType::DateTime,
        ));
        assert_eq!(
            value,
            EvaluationValue::Bag(Bag::singleton(AttributeValue::DateTime(now)))
        );

        let date = ctx.resolve(&designator(Category::Environment, CURRENT_DATE, DataType::Date));
        assert_eq!(
            date.elements().next().map(AttributeValue::encode),
            Some("2025-01-08Z".to_string())
        );
    }

    #[test]
    fn test_clock_can_be_disabled() {
        let request = Request::new();
        let registry = FunctionRegistry::with_builtins();
        let store = PolicyStore::new();
        let settings = EngineSettings {
            supply_current_time: false,
            ..EngineSettings::default()
        };
        let ctx = EvaluationContext::new(&request, &registry, &store, &settings);

        let value = ctx.resolve(&designator(
            Category::Environment,
            CURRENT_TIME,
            DataType::Time,
        ));
        assert_eq!(value, EvaluationValue::Bag(Bag::empty(DataType::Time)));
    }

    #[test]
    fn test_depth_is_bounded() {
        let request = Request::new();
        let registry = FunctionRegistry::with_builtins();
        let store = PolicyStore::new();
        let settings = EngineSettings {
            max_depth: 2,
            ..EngineSettings::default()
        };
        let ctx = EvaluationContext::new(&request, &registry, &store, &settings);

        let two = ctx.descend().and_then(EvaluationContext::descend).expect("within bounds");
        assert_eq!(two.depth(), 2);
        assert_eq!(two.descend().err(), Some(EvalError::DepthExceeded(2)));
    }
}
