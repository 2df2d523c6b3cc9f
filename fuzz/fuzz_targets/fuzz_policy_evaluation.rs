#![no_main]

use arbitrary::Arbitrary;
use basalt::{
    AttributeDesignator, Category, CombiningAlgorithm, CombiningScope, DataType, Decision, Effect,
    Engine, EngineSettings, Expression, Match, Policy, PolicySet, Request, Rule, Target,
};
use libfuzzer_sys::fuzz_target;

const FUNCTION: &str = "urn:oasis:names:tc:xacml:1.0:function:";

// ============================================================================
// Arbitrary Implementations
// ============================================================================

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzCategory {
    Subject,
    Resource,
    Action,
    Environment,
}

impl From<FuzzCategory> for Category {
    fn from(f: FuzzCategory) -> Self {
        match f {
            FuzzCategory::Subject => Category::Subject,
            FuzzCategory::Resource => Category::Resource,
            FuzzCategory::Action => Category::Action,
            FuzzCategory::Environment => Category::Environment,
        }
    }
}

/// Attribute ids come from a small pool so that policies and requests
/// actually meet.
#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzAttributeId {
    Id,
    Role,
    Level,
}

impl FuzzAttributeId {
    fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Role => "role",
            Self::Level => "level",
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzMatch {
    category: FuzzCategory,
    attribute: FuzzAttributeId,
    value: u8,
    required: bool,
}

impl FuzzMatch {
    fn designator(&self) -> AttributeDesignator {
        let designator = AttributeDesignator::new(
            self.category.into(),
            self.attribute.as_str(),
            DataType::String,
        );
        if self.required {
            designator.required()
        } else {
            designator
        }
    }
}

/// Boolean condition shapes, bounded to depth 3.
#[derive(Debug, Clone, Arbitrary)]
enum FuzzCondition {
    Literal(bool),
    IsIn(FuzzMatch),
    LevelAtLeast(FuzzMatch),
    And2(Box<FuzzCondition>, Box<FuzzCondition>),
    Or2(Box<FuzzCondition>, Box<FuzzCondition>),
    Not(Box<FuzzCondition>),
}

impl FuzzCondition {
    fn to_expression(&self, depth: u8) -> Expression {
        if depth > 3 {
            return Expression::value(true);
        }
        match self {
            Self::Literal(b) => Expression::value(*b),
            Self::IsIn(m) => Expression::apply(
                format!("{FUNCTION}string-is-in"),
                [Expression::value(value_of(m.value).as_str()), m.designator().into()],
            ),
            Self::LevelAtLeast(m) => Expression::apply(
                format!("{FUNCTION}integer-greater-than-or-equal"),
                [
                    Expression::apply(
                        format!("{FUNCTION}integer-one-and-only"),
                        [AttributeDesignator::new(
                            m.category.into(),
                            m.attribute.as_str(),
                            DataType::Integer,
                        )
                        .into()],
                    ),
                    Expression::value(i64::from(m.value % 4)),
                ],
            ),
            Self::And2(a, b) => Expression::apply(
                format!("{FUNCTION}and"),
                [a.to_expression(depth + 1), b.to_expression(depth + 1)],
            ),
            Self::Or2(a, b) => Expression::apply(
                format!("{FUNCTION}or"),
                [a.to_expression(depth + 1), b.to_expression(depth + 1)],
            ),
            Self::Not(c) => Expression::apply(format!("{FUNCTION}not"), [c.to_expression(depth + 1)]),
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzRule {
    permit: bool,
    target: Vec<FuzzMatch>,
    condition: Option<FuzzCondition>,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzPolicy {
    algorithm: u8,
    target: Vec<FuzzMatch>,
    rules: Vec<FuzzRule>,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzAttribute {
    category: FuzzCategory,
    attribute: FuzzAttributeId,
    value: u8,
    numeric: bool,
}

fn value_of(selector: u8) -> String {
    format!("v{}", selector % 4)
}

fn target(matches: &[FuzzMatch]) -> Target {
    matches.iter().take(4).fold(Target::any(), |target, m| {
        target.with_match(
            m.category.into(),
            Match::new(
                format!("{FUNCTION}string-equal"),
                value_of(m.value).as_str(),
                m.designator(),
            ),
        )
    })
}

fn algorithm(selector: u8, scope: CombiningScope) -> CombiningAlgorithm {
    let candidates: Vec<_> = CombiningAlgorithm::ALL
        .into_iter()
        .filter(|a| a.supports(scope))
        .collect();
    candidates[usize::from(selector) % candidates.len()]
}

fn build_policy(index: usize, fuzz: &FuzzPolicy) -> Policy {
    let mut policy = Policy::new(
        format!("policy-{index}"),
        algorithm(fuzz.algorithm, CombiningScope::Rule).id(CombiningScope::Rule),
    )
    .with_target(target(&fuzz.target));
    for (i, r) in fuzz.rules.iter().take(6).enumerate() {
        let effect = if r.permit { Effect::Permit } else { Effect::Deny };
        let mut rule = Rule::new(format!("rule-{index}-{i}"), effect).with_target(target(&r.target));
        if let Some(condition) = &r.condition {
            rule = rule.with_condition(condition.to_expression(0));
        }
        policy = policy.with_rule(rule);
    }
    policy
}

fuzz_target!(|input: (u8, Vec<FuzzPolicy>, Vec<FuzzAttribute>)| {
    let (set_algorithm, policies, attributes) = input;

    let mut root = PolicySet::new(
        "root",
        algorithm(set_algorithm, CombiningScope::Policy).id(CombiningScope::Policy),
    );
    for (i, p) in policies.iter().take(4).enumerate() {
        root = root.with_child(build_policy(i, p));
    }

    let request = attributes.iter().take(8).fold(Request::new(), |request, a| {
        if a.numeric {
            request.with(a.category.into(), a.attribute.as_str(), i64::from(a.value % 4))
        } else {
            request.with(a.category.into(), a.attribute.as_str(), value_of(a.value).as_str())
        }
    });

    let engine = Engine::new(root, EngineSettings::default());
    engine.validate().expect("generated trees are well formed");

    // Well-formed trees never fail, whatever the request holds.
    let plain = engine.evaluate(&request).expect("evaluation of a well-formed tree");
    let verbose = engine
        .evaluate_verbose(&request)
        .expect("evaluation of a well-formed tree");

    // Tracing must not change the decision.
    assert_eq!(plain.decision, verbose.decision);

    // Obligations only ever accompany Permit or Deny.
    if matches!(plain.decision, Decision::NotApplicable | Decision::Indeterminate(_)) {
        assert!(plain.obligations.is_empty());
    }
    // An Indeterminate decision always explains itself.
    if plain.decision.is_indeterminate() {
        assert!(!plain.status.is_ok());
    }
});
