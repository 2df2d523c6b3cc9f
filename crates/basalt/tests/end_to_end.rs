//! End-to-end evaluation of policy trees through the engine.
//!
//! These tests build complete policy trees, evaluate requests through
//! [`Engine`] and check decisions, status codes, obligations and traces.

use basalt::{
    AttributeDesignator, Category, CombiningAlgorithm, CombiningScope, DataType, Decision, Effect,
    Engine, EngineSettings, Expression, IndeterminateKind, Match, NodeKind, Obligation, Policy,
    PolicyNode, PolicySet, PolicyStore, Request, Response, Rule, StatusCode, Target, TraceEvent,
};

const STRING_EQUAL: &str = "urn:oasis:names:tc:xacml:1.0:function:string-equal";
const FUNCTION: &str = "urn:oasis:names:tc:xacml:1.0:function:";

fn rule_algorithm(algorithm: CombiningAlgorithm) -> String {
    algorithm.id(CombiningScope::Rule)
}

fn policy_algorithm(algorithm: CombiningAlgorithm) -> String {
    algorithm.id(CombiningScope::Policy)
}

fn matching(category: Category, attribute: &str, value: &str) -> Target {
    Target::any().with_match(
        category,
        Match::new(
            STRING_EQUAL,
            value,
            AttributeDesignator::new(category, attribute, DataType::String),
        ),
    )
}

fn request(resource: &str, action: &str) -> Request {
    Request::new()
        .with(Category::Resource, "resource-id", resource)
        .with(Category::Action, "action-id", action)
}

/// Rule A permits anything on doc1, rule B denies every delete.
fn document_policy() -> Policy {
    Policy::new("documents", rule_algorithm(CombiningAlgorithm::DenyOverrides))
        .with_rule(
            Rule::new("A", Effect::Permit).with_target(matching(
                Category::Resource,
                "resource-id",
                "doc1",
            )),
        )
        .with_rule(
            Rule::new("B", Effect::Deny).with_target(matching(
                Category::Action,
                "action-id",
                "delete",
            )),
        )
}

fn engine(root: impl Into<PolicyNode>) -> Engine {
    let engine = Engine::new(root, EngineSettings::default());
    engine.validate().expect("policy tree is well formed");
    engine
}

fn decide(engine: &Engine, request: &Request) -> Response {
    engine
        .evaluate(request)
        .expect("well-formed trees never fail evaluation")
}

#[test]
fn test_deny_overrides_document_policy() {
    let engine = engine(document_policy());

    assert_eq!(decide(&engine, &request("doc1", "delete")).decision, Decision::Deny);
    assert_eq!(decide(&engine, &request("doc1", "read")).decision, Decision::Permit);
    assert_eq!(
        decide(&engine, &request("doc2", "read")).decision,
        Decision::NotApplicable
    );
}

#[test]
fn test_first_applicable_never_evaluates_later_rules() {
    let clearance_check = Expression::apply(
        format!("{FUNCTION}integer-greater-than"),
        [
            Expression::apply(
                format!("{FUNCTION}integer-one-and-only"),
                [AttributeDesignator::new(Category::Subject, "clearance", DataType::Integer)
                    .required()
                    .into()],
            ),
            Expression::value(3_i64),
        ],
    );
    let policy = Policy::new("ordered", rule_algorithm(CombiningAlgorithm::FirstApplicable))
        .with_rule(Rule::deny("writers").with_target(matching(
            Category::Action,
            "action-id",
            "write",
        )))
        .with_rule(Rule::permit("readers").with_target(matching(
            Category::Action,
            "action-id",
            "read",
        )))
        .with_rule(Rule::deny("uncleared").with_condition(clearance_check));
    let engine = engine(policy);

    let response = engine
        .evaluate_verbose(&request("doc1", "read"))
        .expect("valid tree");
    assert_eq!(response.decision, Decision::Permit);
    assert_eq!(response.status.code, StatusCode::Ok, "the missing clearance is never looked up");

    let trace = response.trace.expect("verbose response");
    let visited: Vec<&str> = trace
        .iter()
        .filter_map(|event| match event {
            TraceEvent::Decision {
                node: NodeKind::Rule,
                id,
                ..
            } => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(visited, vec!["writers", "readers"]);
    assert!(
        !trace
            .iter()
            .any(|event| matches!(event, TraceEvent::Condition { rule, .. } if rule == "uncleared")),
        "the third rule's condition must not be evaluated"
    );
}

#[test]
fn test_only_one_applicable_with_two_applicable_children() {
    let set = PolicySet::new(
        "exclusive",
        policy_algorithm(CombiningAlgorithm::OnlyOneApplicable),
    )
    .with_child(document_policy())
    .with_child(
        Policy::new("readers", rule_algorithm(CombiningAlgorithm::PermitOverrides))
            .with_target(matching(Category::Action, "action-id", "read"))
            .with_rule(Rule::permit("read")),
    );
    let engine = engine(set);

    let response = decide(&engine, &request("doc1", "read"));
    assert_eq!(
        response.decision,
        Decision::Indeterminate(IndeterminateKind::DenyPermit)
    );
    assert_eq!(response.status.code, StatusCode::ProcessingError);

    assert_eq!(
        decide(&engine, &request("doc2", "read")).decision,
        Decision::Permit,
        "only the readers policy applies"
    );
}

#[test]
fn test_absent_subject_items_are_vacuous() {
    let target = matching(Category::Resource, "resource-id", "doc1").with_match(
        Category::Action,
        Match::new(
            STRING_EQUAL,
            "read",
            AttributeDesignator::new(Category::Action, "action-id", DataType::String),
        ),
    );
    let policy = Policy::new("scoped", rule_algorithm(CombiningAlgorithm::PermitOverrides))
        .with_target(target)
        .with_rule(Rule::permit("anyone"));
    let engine = engine(policy);

    assert_eq!(decide(&engine, &request("doc1", "read")).decision, Decision::Permit);
}

#[test]
fn test_missing_required_attribute_is_indeterminate_not_an_error() {
    let policy = Policy::new("clearance", rule_algorithm(CombiningAlgorithm::DenyOverrides))
        .with_rule(Rule::permit("open"))
        .with_rule(
            Rule::deny("low-clearance").with_condition(Expression::apply(
                format!("{FUNCTION}integer-less-than"),
                [
                    Expression::apply(
                        format!("{FUNCTION}integer-one-and-only"),
                        [AttributeDesignator::new(
                            Category::Subject,
                            "clearance",
                            DataType::Integer,
                        )
                        .required()
                        .into()],
                    ),
                    Expression::value(2_i64),
                ],
            )),
        );
    let engine = engine(policy);

    let response = decide(&engine, &Request::new());
    assert_eq!(
        response.decision,
        Decision::Indeterminate(IndeterminateKind::DenyPermit),
        "a Deny-leaning error blocks the Permit"
    );
    assert_eq!(response.status.code, StatusCode::MissingAttribute);

    let cleared = Request::new().with(Category::Subject, "clearance", 5_i64);
    assert_eq!(decide(&engine, &cleared).decision, Decision::Permit);
}

#[test]
fn test_type_mismatch_in_a_condition_is_indeterminate() {
    // The designator selects strings; integer-one-and-only wants integers.
    let policy = Policy::new("typed", rule_algorithm(CombiningAlgorithm::PermitOverrides))
        .with_rule(
            Rule::permit("numeric").with_condition(Expression::apply(
                format!("{FUNCTION}integer-equal"),
                [
                    Expression::apply(
                        format!("{FUNCTION}integer-one-and-only"),
                        [AttributeDesignator::new(
                            Category::Subject,
                            "level",
                            DataType::String,
                        )
                        .into()],
                    ),
                    Expression::value(1_i64),
                ],
            )),
        );
    let engine = engine(policy);

    let response = decide(
        &engine,
        &Request::new().with(Category::Subject, "level", "one"),
    );
    assert_eq!(
        response.decision,
        Decision::Indeterminate(IndeterminateKind::Permit)
    );
    assert_eq!(response.status.code, StatusCode::ProcessingError);
}

#[test]
fn test_obligations_reach_the_response() {
    let audited = document_policy()
        .with_obligation(Obligation::new("log-access", Effect::Permit))
        .with_obligation(Obligation::new("notify-owner", Effect::Deny));
    let set = PolicySet::new("root", policy_algorithm(CombiningAlgorithm::DenyUnlessPermit))
        .with_child(audited)
        .with_obligation(Obligation::new("default-deny", Effect::Deny));
    let engine = engine(set);

    let permit = decide(&engine, &request("doc1", "read"));
    let ids: Vec<_> = permit.obligations.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["log-access"]);

    let deny = decide(&engine, &request("doc1", "delete"));
    let ids: Vec<_> = deny.obligations.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["notify-owner", "default-deny"]);

    let fallback = decide(&engine, &request("doc2", "read"));
    assert_eq!(fallback.decision, Decision::Deny);
    let ids: Vec<_> = fallback.obligations.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["default-deny"]);
}

#[test]
fn test_references_resolve_through_the_store() {
    let store = PolicyStore::new().with(document_policy());
    let root = PolicySet::new("root", policy_algorithm(CombiningAlgorithm::FirstApplicable))
        .with_reference("documents");
    let engine = Engine::new(root, EngineSettings::default()).with_store(store);
    engine.validate().expect("reference resolves");

    assert_eq!(decide(&engine, &request("doc1", "delete")).decision, Decision::Deny);

    let dangling = Engine::new(
        PolicySet::new("root", policy_algorithm(CombiningAlgorithm::FirstApplicable))
            .with_reference("documents"),
        EngineSettings::default(),
    );
    assert!(dangling.validate().is_err());
    assert!(dangling.evaluate(&request("doc1", "read")).is_err());
}

#[test]
fn test_json_documents() {
    let policy_json = serde_json::to_string(&PolicyNode::from(document_policy()))
        .expect("policy serializes");
    let policy: PolicyNode = serde_json::from_str(&policy_json).expect("policy parses");
    let engine = engine(policy);

    let request_json = r#"{
        "attributes": [
            {
                "id": "resource-id",
                "category": "resource",
                "data_type": "http://www.w3.org/2001/XMLSchema#string",
                "values": [{"data_type": "http://www.w3.org/2001/XMLSchema#string", "value": "doc1"}]
            },
            {
                "id": "action-id",
                "category": "action",
                "data_type": "http://www.w3.org/2001/XMLSchema#string",
                "values": [{"data_type": "http://www.w3.org/2001/XMLSchema#string", "value": "delete"}]
            }
        ]
    }"#;
    let request: Request = serde_json::from_str(request_json).expect("request parses");

    let response = decide(&engine, &request);
    let json: serde_json::Value =
        serde_json::from_str(&response.to_json().expect("response serializes")).expect("valid JSON");
    assert_eq!(json["decision"], "Deny");
    assert_eq!(json["status"]["code"], "ok");
}

#[test]
fn test_malformed_request_values_are_rejected_by_the_loader() {
    let request_json = r#"{
        "attributes": [{
            "id": "clearance",
            "category": "subject",
            "data_type": "http://www.w3.org/2001/XMLSchema#integer",
            "values": [{"data_type": "http://www.w3.org/2001/XMLSchema#integer", "value": "high"}]
        }]
    }"#;
    assert!(serde_json::from_str::<Request>(request_json).is_err());
}
