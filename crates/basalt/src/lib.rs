//! # basalt: an XACML-style attribute-based access control engine
//!
//! Evaluates an authorization request (attributes grouped by subject,
//! resource, action and environment) against a tree of policy sets,
//! policies and rules, producing Permit, Deny, NotApplicable or
//! Indeterminate together with status information and obligations.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Request                                     │
//! │  (typed attribute bags per category)         │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Engine                                      │
//! │  ├─ PolicySet / Policy: target, then         │
//! │  │  children folded by a combining algorithm │
//! │  ├─ Rule: target, condition, effect          │
//! │  └─ Expressions over the FunctionRegistry    │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Response                                    │
//! │  - Decision (Indeterminate{P|D|DP})          │
//! │  - Status explaining Indeterminate           │
//! │  - Obligations for the decision              │
//! │  - Optional trace of visited nodes           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Indeterminate results are data, not errors: missing attributes, type
//! mismatches inside a function and ambiguous policy sets all come back as
//! a [`Response`]. Only structural defects of the policy tree (unknown
//! function or algorithm ids, dangling references, undefined variables,
//! runaway nesting) are returned as [`EvalError`].
//!
//! ## Examples
//!
//! ```
//! use basalt::{
//!     AttributeDesignator, Category, CombiningAlgorithm, CombiningScope, Decision, Engine,
//!     DataType, EngineSettings, Match, Policy, Request, Rule, Target,
//! };
//!
//! let string_equal = "urn:oasis:names:tc:xacml:1.0:function:string-equal";
//! let on_action = |action: &str| {
//!     Target::any().with_match(
//!         Category::Action,
//!         Match::new(
//!             string_equal,
//!             action,
//!             AttributeDesignator::new(Category::Action, "action-id", DataType::String),
//!         ),
//!     )
//! };
//!
//! let policy = Policy::new("documents", CombiningAlgorithm::DenyOverrides.id(CombiningScope::Rule))
//!     .with_rule(Rule::permit("read").with_target(on_action("read")))
//!     .with_rule(Rule::deny("delete").with_target(on_action("delete")));
//!
//! let engine = Engine::new(policy, EngineSettings::default());
//! engine.validate().unwrap();
//!
//! let request = Request::new().with(Category::Action, "action-id", "delete");
//! assert_eq!(engine.evaluate(&request).unwrap().decision, Decision::Deny);
//! ```

pub mod combining;
pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod expression;
pub mod functions;
pub mod policy;
pub mod request;
pub mod response;
pub mod rule;
pub mod target;
pub mod trace;
pub mod value;

// Kani proofs for bounded model checking
#[cfg(any(test, kani))]
mod kani_proofs;

pub use basalt_config::EngineSettings;
pub use basalt_types::{AttributeValue, Bag, DataType, TypeError};
pub use combining::{CombiningAlgorithm, CombiningScope, combine, combine_decisions};
pub use context::EvaluationContext;
pub use decision::{
    AttributeAssignment, Decision, Effect, IndeterminateKind, Obligation, Outcome, Status,
    StatusCode,
};
pub use engine::Engine;
pub use error::{EvalError, Result};
pub use expression::{Apply, AttributeDesignator, Expression, VariableDefinition};
pub use functions::{Arguments, Function, FunctionRegistry, Param};
pub use policy::{Policy, PolicyNode, PolicySet, PolicyStore};
pub use request::{Attribute, Category, Request};
pub use response::Response;
pub use rule::Rule;
pub use target::{Match, MatchResult, Target, TargetItem};
pub use trace::{NodeKind, TraceBuffer, TraceEvent, TraceSink};
pub use value::EvaluationValue;
