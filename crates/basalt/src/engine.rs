//! The policy decision engine.

use std::sync::Arc;

use basalt_config::EngineSettings;
use chrono::{DateTime, FixedOffset, Utc};
use tracing::{info, warn};

use crate::context::EvaluationContext;
use crate::decision::Outcome;
use crate::error::Result;
use crate::functions::FunctionRegistry;
use crate::policy::{PolicyNode, PolicyStore};
use crate::request::Request;
use crate::response::Response;
use crate::trace::{TraceBuffer, TraceEvent, TraceSink};

/// Evaluates requests against an immutable policy tree.
///
/// The engine holds no per-call state: the clock reading, trace buffer and
/// variable scope of each call live in a fresh [`EvaluationContext`], so one
/// engine can serve concurrent evaluations from many threads.
#[derive(Debug, Clone)]
pub struct Engine {
    root: PolicyNode,
    settings: EngineSettings,
    registry: Arc<FunctionRegistry>,
    store: PolicyStore,
}

impl Engine {
    /// Creates an engine with the built-in functions and an empty policy
    /// store.
    pub fn new(root: impl Into<PolicyNode>, settings: EngineSettings) -> Self {
        Self {
            root: root.into(),
            settings,
            registry: Arc::new(FunctionRegistry::with_builtins()),
            store: PolicyStore::new(),
        }
    }

    /// Replaces the function registry, e.g. one extended with host functions.
    pub fn with_registry(mut self, registry: impl Into<Arc<FunctionRegistry>>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Sets the store that policy references resolve against.
    pub fn with_store(mut self, store: PolicyStore) -> Self {
        self.store = store;
        self
    }

    pub fn root(&self) -> &PolicyNode {
        &self.root
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    /// Checks the whole policy tree and store without a request: combining
    /// algorithm ids, function ids, arities, variable references and
    /// policy references.
    ///
    /// # Errors
    ///
    /// The first structural defect found.
    pub fn validate(&self) -> Result<()> {
        self.root.validate(&self.registry, &self.store)?;
        self.store.validate(&self.registry)
    }

    /// Evaluates `request`, including a trace when the settings ask for
    /// verbose responses.
    ///
    /// Request-dependent problems (missing attributes, type mismatches,
    /// ambiguous policy sets) yield an Indeterminate decision, never an
    /// error.
    ///
    /// # Errors
    ///
    /// Structural defects of the policy tree: unknown function or combining
    /// algorithm ids, unresolvable references, undefined variables and
    /// nesting beyond `max_depth`.
    pub fn evaluate(&self, request: &Request) -> Result<Response> {
        self.evaluate_at(request, Utc::now().fixed_offset())
    }

    /// Evaluates `request` and returns the trace of visited nodes with the
    /// response. The decision is the same as [`Engine::evaluate`] gives.
    ///
    /// # Errors
    ///
    /// As for [`Engine::evaluate`].
    pub fn evaluate_verbose(&self, request: &Request) -> Result<Response> {
        self.traced(request, Utc::now().fixed_offset())
    }

    /// Evaluates `request`, reporting every trace event to `sink`.
    ///
    /// # Errors
    ///
    /// As for [`Engine::evaluate`].
    pub fn evaluate_with_sink(&self, request: &Request, sink: &dyn TraceSink) -> Result<Response> {
        let outcome = self.run(request, Some(sink), Utc::now().fixed_offset())?;
        Ok(self.respond(outcome, None))
    }

    /// Evaluates `request` with a fixed clock reading for the current-time
    /// environment attributes. Like [`Engine::evaluate`], the response
    /// carries a trace when the settings ask for verbose responses.
    ///
    /// # Errors
    ///
    /// As for [`Engine::evaluate`].
    pub fn evaluate_at(&self, request: &Request, now: DateTime<FixedOffset>) -> Result<Response> {
        if self.settings.verbose {
            return self.traced(request, now);
        }
        let outcome = self.run(request, None, now)?;
        Ok(self.respond(outcome, None))
    }

    fn traced(&self, request: &Request, now: DateTime<FixedOffset>) -> Result<Response> {
        let buffer = TraceBuffer::new();
        let outcome = self.run(request, Some(&buffer as &dyn TraceSink), now)?;
        Ok(self.respond(outcome, Some(buffer.into_events())))
    }

    fn run(
        &self,
        request: &Request,
        sink: Option<&dyn TraceSink>,
        now: DateTime<FixedOffset>,
    ) -> Result<Outcome> {
        let mut ctx = EvaluationContext::new(request, &self.registry, &self.store, &self.settings)
            .with_clock(now);
        if let Some(sink) = sink {
            ctx = ctx.with_sink(sink);
        }
        self.root.evaluate(&ctx).inspect_err(|error| {
            warn!(
                root = %self.root.id(),
                error = %error,
                "evaluation aborted by a structural error"
            );
        })
    }

    fn respond(&self, outcome: Outcome, trace: Option<Vec<TraceEvent>>) -> Response {
        info!(
            root = %self.root.id(),
            decision = %outcome.decision,
            status = %outcome.status,
            obligations = outcome.obligations.len(),
            "request evaluated"
        );
        Response::new(outcome, trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combining::{CombiningAlgorithm, CombiningScope};
    use crate::context::CURRENT_DATE_TIME;
    use crate::decision::{Decision, Effect};
    use crate::expression::{AttributeDesignator, Expression};
    use crate::functions::{Arguments, Function, Param};
    use crate::policy::Policy;
    use crate::request::Category;
    use crate::rule::Rule;
    use crate::value::EvaluationValue;
    use basalt_types::{AttributeValue, DataType};
    use chrono::TimeZone;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_engine_is_send_and_sync() {
        assert_send_sync::<Engine>();
    }

    fn permit_all() -> Policy {
        Policy::new("all", CombiningAlgorithm::FirstApplicable.id(CombiningScope::Rule))
            .with_rule(Rule::new("everyone", Effect::Permit))
    }

    #[test]
    fn test_verbose_setting_adds_a_trace_without_changing_the_decision() {
        let quiet = Engine::new(permit_all(), EngineSettings::default());
        let verbose = Engine::new(
            permit_all(),
            EngineSettings {
                verbose: true,
                ..EngineSettings::default()
            },
        );
        let request = Request::new();

        let plain = quiet.evaluate(&request).expect("valid tree");
        let traced = verbose.evaluate(&request).expect("valid tree");
        assert_eq!(plain.decision, traced.decision);
        assert!(plain.trace.is_none());
        let trace = traced.trace.expect("verbose responses carry a trace");
        assert!(matches!(
            trace.last(),
            Some(TraceEvent::Decision {
                decision: Decision::Permit,
                ..
            })
        ));
    }

    #[test]
    fn test_sink_receives_events() {
        let engine = Engine::new(permit_all(), EngineSettings::default());
        let buffer = TraceBuffer::new();
        let response = engine
            .evaluate_with_sink(&Request::new(), &buffer)
            .expect("valid tree");
        assert!(response.trace.is_none());
        assert_eq!(buffer.len(), 4, "policy target, rule target, rule decision, policy decision");
    }

    #[test]
    fn test_structural_errors_are_returned() {
        let engine = Engine::new(
            Policy::new("p", "urn:example:no-such-algorithm"),
            EngineSettings::default(),
        );
        assert!(engine.validate().is_err());
        assert!(engine.evaluate(&Request::new()).is_err());
    }

    #[test]
    fn test_clock_answers_current_date_time() {
        let after_noon = Rule::permit("afternoon").with_condition(Expression::apply(
            "urn:oasis:names:tc:xacml:1.0:function:dateTime-greater-than",
            [
                Expression::apply(
                    "urn:oasis:names:tc:xacml:1.0:function:dateTime-one-and-only",
                    [AttributeDesignator::new(
                        Category::Environment,
                        CURRENT_DATE_TIME,
                        DataType::DateTime,
                    )
                    .into()],
                ),
                Expression::Value(
                    AttributeValue::parse(DataType::DateTime, "2024-05-01T12:00:00Z")
                        .expect("valid literal"),
                ),
            ],
        ));
        let policy = Policy::new("clock", CombiningAlgorithm::FirstApplicable.id(CombiningScope::Rule))
            .with_rule(after_noon);
        let engine = Engine::new(policy, EngineSettings::default());

        let morning = Utc
            .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .single()
            .expect("valid instant")
            .fixed_offset();
        let evening = Utc
            .with_ymd_and_hms(2024, 5, 1, 18, 0, 0)
            .single()
            .expect("valid instant")
            .fixed_offset();
        let request = Request::new();
        assert_eq!(
            engine.evaluate_at(&request, morning).expect("valid tree").decision,
            Decision::NotApplicable
        );
        assert_eq!(
            engine.evaluate_at(&request, evening).expect("valid tree").decision,
            Decision::Permit
        );
    }

    #[test]
    fn test_fixed_clock_evaluation_honours_the_verbose_setting() {
        let now = Utc
            .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .single()
            .expect("valid instant")
            .fixed_offset();
        let request = Request::new();

        let quiet = Engine::new(permit_all(), EngineSettings::default());
        assert!(quiet.evaluate_at(&request, now).expect("valid tree").trace.is_none());

        let verbose = Engine::new(
            permit_all(),
            EngineSettings {
                verbose: true,
                ..EngineSettings::default()
            },
        );
        let response = verbose.evaluate_at(&request, now).expect("valid tree");
        assert_eq!(response.decision, Decision::Permit);
        assert_eq!(response.trace.map(|t| t.len()), Some(4));
    }

    struct OnCall {
        arguments: Arguments,
    }

    impl Function for OnCall {
        fn id(&self) -> &str {
            "urn:example:function:is-on-call"
        }

        fn arguments(&self) -> &Arguments {
            &self.arguments
        }

        fn returns(&self) -> Option<Param> {
            Some(Param::Value(DataType::Boolean))
        }

        fn evaluate(
            &self,
            _ctx: &EvaluationContext<'_>,
            args: &[EvaluationValue],
        ) -> Result<EvaluationValue> {
            let on_call = args
                .first()
                .and_then(EvaluationValue::as_bag)
                .is_some_and(|bag| bag.contains(&AttributeValue::string("on-call")));
            Ok(EvaluationValue::boolean(on_call))
        }
    }

    #[test]
    fn test_host_functions_plug_into_the_registry() {
        let mut registry = FunctionRegistry::with_builtins();
        registry
            .register(OnCall {
                arguments: Arguments::Fixed(vec![Param::Bag(DataType::String)]),
            })
            .expect("new id");

        let policy = Policy::new("on-call", CombiningAlgorithm::DenyUnlessPermit.id(CombiningScope::Rule))
            .with_rule(Rule::permit("on-call").with_condition(Expression::apply(
                "urn:example:function:is-on-call",
                [AttributeDesignator::new(Category::Subject, "role", DataType::String).into()],
            )));
        let engine = Engine::new(policy, EngineSettings::default()).with_registry(registry);
        engine.validate().expect("host function is registered");

        let on_call = Request::new().with(Category::Subject, "role", "on-call");
        assert!(engine.evaluate(&on_call).expect("valid tree").is_permit());
        assert_eq!(
            engine.evaluate(&Request::new()).expect("valid tree").decision,
            Decision::Deny
        );
    }
}
