//! Concurrent evaluation against one shared engine.

use std::sync::Arc;
use std::thread;

use basalt::{
    AttributeDesignator, Category, CombiningAlgorithm, CombiningScope, DataType, Decision, Engine,
    EngineSettings, Expression, Match, Policy, Request, Rule, Target,
};

fn clearance_policy() -> Policy {
    let cleared = Expression::apply(
        "urn:oasis:names:tc:xacml:1.0:function:integer-greater-than-or-equal",
        [
            Expression::apply(
                "urn:oasis:names:tc:xacml:1.0:function:integer-one-and-only",
                [AttributeDesignator::new(Category::Subject, "clearance", DataType::Integer).into()],
            ),
            Expression::value(3_i64),
        ],
    );
    Policy::new(
        "clearance",
        CombiningAlgorithm::PermitUnlessDeny.id(CombiningScope::Rule),
    )
    .with_target(Target::any().with_match(
        Category::Resource,
        Match::new(
            "urn:oasis:names:tc:xacml:1.0:function:string-equal",
            "vault",
            AttributeDesignator::new(Category::Resource, "resource-id", DataType::String),
        ),
    ))
    .with_rule(Rule::deny("uncleared").with_condition(Expression::apply(
        "urn:oasis:names:tc:xacml:1.0:function:not",
        [cleared],
    )))
}

#[test]
fn test_shared_engine_across_threads() {
    let engine = Arc::new(Engine::new(
        clearance_policy(),
        EngineSettings {
            verbose: true,
            ..EngineSettings::default()
        },
    ));

    let handles: Vec<_> = (0..8_i64)
        .map(|worker| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                (0..50_i64)
                    .map(|i| {
                        let clearance = (worker + i) % 6;
                        let request = Request::new()
                            .with(Category::Resource, "resource-id", "vault")
                            .with(Category::Subject, "clearance", clearance);
                        let response = engine.evaluate(&request).expect("valid tree");
                        (clearance, response)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for (clearance, response) in handle.join().expect("worker panicked") {
            let expected = if clearance >= 3 {
                Decision::Permit
            } else {
                Decision::Deny
            };
            assert_eq!(response.decision, expected, "clearance {clearance}");
            // Each call gets its own trace: policy target, rule target,
            // condition, rule decision, policy decision.
            assert_eq!(response.trace.map(|t| t.len()), Some(5));
        }
    }
}

#[test]
fn test_repeated_evaluation_is_deterministic() {
    let engine = Engine::new(clearance_policy(), EngineSettings::default());
    let request = Request::new()
        .with(Category::Resource, "resource-id", "vault")
        .with(Category::Subject, "clearance", 1_i64);

    let first = engine.evaluate(&request).expect("valid tree");
    for _ in 0..10 {
        assert_eq!(engine.evaluate(&request).expect("valid tree"), first);
    }
}
