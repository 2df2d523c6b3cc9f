//! The function library.
//!
//! Every function implements [`Function`]: an identifier, declared
//! arguments, a declared return type and an evaluation body. Functions are
//! looked up by identifier in a [`FunctionRegistry`], which starts with the
//! built-in set and can be extended by the host.
//!
//! ## Dispatch
//!
//! ```text
//! Apply ──► check_arguments ──► Function::evaluate
//!              │                      │
//!              │ arity mismatch       │ type error
//!              ▼                      ▼
//!          EvalError::Argument    Indeterminate(processing-error)
//! ```
//!
//! Declared-type mismatches and Indeterminate arguments never reach the
//! function body: [`check_arguments`] answers them with an Indeterminate
//! value.

mod arithmetic;
mod bag;
mod comparison;
mod datetime;
mod equality;
mod higher_order;
mod logical;
mod set;
mod string;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use basalt_types::{AttributeValue, Bag, DataType, TypeError};
use tracing::warn;

use crate::context::EvaluationContext;
use crate::error::{EvalError, Result};
use crate::value::EvaluationValue;

pub const XACML_1_0: &str = "urn:oasis:names:tc:xacml:1.0:function:";
pub const XACML_2_0: &str = "urn:oasis:names:tc:xacml:2.0:function:";
pub const XACML_3_0: &str = "urn:oasis:names:tc:xacml:3.0:function:";

/// Namespace of the per-type functions for `data_type`. The duration types
/// were only given function identifiers in XACML 3.0.
pub(crate) fn type_prefix(data_type: DataType) -> &'static str {
    match data_type {
        DataType::DayTimeDuration | DataType::YearMonthDuration => XACML_3_0,
        _ => XACML_1_0,
    }
}

// ============================================================================
// Signatures
// ============================================================================

/// One declared parameter or return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// A single value of this type.
    Value(DataType),
    /// A bag of this type.
    Bag(DataType),
    /// A single value of any type.
    AnyValue,
    /// A bag of any type.
    AnyBag,
    /// A single value or a bag.
    Any,
    /// A function reference.
    Function,
}

impl Param {
    /// Whether `value` has the declared shape and type. Indeterminate
    /// values are never accepted.
    pub fn accepts(self, value: &EvaluationValue) -> bool {
        match (self, value) {
            (Self::Value(dt), EvaluationValue::Value(v)) => v.data_type() == dt,
            (Self::Bag(dt), EvaluationValue::Bag(b)) => b.data_type() == dt,
            (Self::AnyValue, EvaluationValue::Value(_))
            | (Self::AnyBag | Self::Any, EvaluationValue::Bag(_))
            | (Self::Any, EvaluationValue::Value(_))
            | (Self::Function, EvaluationValue::Function(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(dt) => write!(f, "{dt}"),
            Self::Bag(dt) => write!(f, "bag of {dt}"),
            Self::AnyValue => f.write_str("any value"),
            Self::AnyBag => f.write_str("any bag"),
            Self::Any => f.write_str("any value or bag"),
            Self::Function => f.write_str("function"),
        }
    }
}

/// The declared parameter list of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arguments {
    Fixed(Vec<Param>),
    /// `leading` parameters followed by at least `min_repeated` occurrences
    /// of `repeated`.
    Variadic {
        leading: Vec<Param>,
        repeated: Param,
        min_repeated: usize,
    },
}

impl Arguments {
    pub fn fixed(params: impl Into<Vec<Param>>) -> Self {
        Self::Fixed(params.into())
    }

    pub fn variadic(repeated: Param, min_repeated: usize) -> Self {
        Self::Variadic {
            leading: Vec::new(),
            repeated,
            min_repeated,
        }
    }

    pub fn min_arity(&self) -> usize {
        match self {
            Self::Fixed(params) => params.len(),
            Self::Variadic {
                leading,
                min_repeated,
                ..
            } => leading.len() + min_repeated,
        }
    }

    /// `None` for variadic functions.
    pub fn max_arity(&self) -> Option<usize> {
        match self {
            Self::Fixed(params) => Some(params.len()),
            Self::Variadic { .. } => None,
        }
    }

    /// The declared type of the argument at `index`.
    pub fn param(&self, index: usize) -> Option<Param> {
        match self {
            Self::Fixed(params) => params.get(index).copied(),
            Self::Variadic {
                leading, repeated, ..
            } => Some(leading.get(index).copied().unwrap_or(*repeated)),
        }
    }

    /// Checks an argument count against the declaration.
    pub fn check_arity(&self, function: &str, count: usize) -> Result<()> {
        let min = self.min_arity();
        match self.max_arity() {
            Some(max) if count != max => Err(EvalError::argument(
                function,
                format!("expected {max} arguments, got {count}"),
            )),
            _ if count < min => Err(EvalError::argument(
                function,
                format!("expected at least {min} arguments, got {count}"),
            )),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Function
// ============================================================================

/// A named function usable in conditions, targets and higher-order
/// applications.
///
/// Implementations must be pure: the same context and arguments always give
/// the same result, and arguments are never modified.
pub trait Function: Send + Sync {
    fn id(&self) -> &str;

    fn arguments(&self) -> &Arguments;

    /// The declared result type; `None` when it depends on a function
    /// argument.
    fn returns(&self) -> Option<Param>;

    /// A boolean argument value that decides the result on its own, letting
    /// the caller stop evaluating further arguments.
    fn short_circuit(&self) -> Option<bool> {
        None
    }

    /// Evaluates the function.
    ///
    /// # Errors
    ///
    /// [`EvalError::Argument`] when called with too few (or too many)
    /// arguments; [`EvalError::Type`] when an operand has the wrong type.
    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        args: &[EvaluationValue],
    ) -> Result<EvaluationValue>;
}

type Body =
    dyn Fn(&EvaluationContext<'_>, &[EvaluationValue]) -> Result<EvaluationValue> + Send + Sync;

/// A built-in function: a signature plus a closure.
pub(crate) struct Builtin {
    id: String,
    arguments: Arguments,
    returns: Option<Param>,
    short_circuit: Option<bool>,
    body: Box<Body>,
}

impl Builtin {
    pub(crate) fn new<F>(
        id: impl Into<String>,
        arguments: Arguments,
        returns: Option<Param>,
        body: F,
    ) -> Self
    where
        F: Fn(&EvaluationContext<'_>, &[EvaluationValue]) -> Result<EvaluationValue>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            arguments,
            returns,
            short_circuit: None,
            body: Box::new(body),
        }
    }

    pub(crate) fn with_short_circuit(mut self, value: bool) -> Self {
        self.short_circuit = Some(value);
        self
    }
}

impl Function for Builtin {
    fn id(&self) -> &str {
        &self.id
    }

    fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    fn returns(&self) -> Option<Param> {
        self.returns
    }

    fn short_circuit(&self) -> Option<bool> {
        self.short_circuit
    }

    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        args: &[EvaluationValue],
    ) -> Result<EvaluationValue> {
        self.arguments.check_arity(&self.id, args.len())?;
        (self.body)(ctx, args)
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Checks evaluated arguments against `function`'s declaration.
///
/// Returns `Ok(Some(result))` when the call is already decided: a
/// short-circuit value is present, an argument is Indeterminate, or an
/// argument has the wrong declared type. Returns `Ok(None)` when the
/// function should be evaluated.
///
/// # Errors
///
/// [`EvalError::Argument`] on an arity mismatch.
pub fn check_arguments(
    function: &dyn Function,
    args: &[EvaluationValue],
) -> Result<Option<EvaluationValue>> {
    function.arguments().check_arity(function.id(), args.len())?;

    if let Some(decisive) = function.short_circuit() {
        let decisive_value = EvaluationValue::boolean(decisive);
        if args.contains(&decisive_value) {
            return Ok(Some(decisive_value));
        }
    }

    if let Some(indeterminate) = args.iter().find(|a| a.is_indeterminate()) {
        return Ok(Some(indeterminate.clone()));
    }

    for (index, arg) in args.iter().enumerate() {
        let Some(param) = function.arguments().param(index) else {
            return Err(EvalError::argument(
                function.id(),
                format!("no parameter declared at position {index}"),
            ));
        };
        if !param.accepts(arg) {
            return Ok(Some(EvaluationValue::processing_error(format!(
                "argument {index} of {}: expected {param}, found {}",
                function.id(),
                arg.describe()
            ))));
        }
    }
    Ok(None)
}

/// Checks and evaluates one function application.
///
/// Type errors raised by the function become Indeterminate
/// (processing-error); structural errors are returned.
pub fn invoke(
    function: &dyn Function,
    ctx: &EvaluationContext<'_>,
    args: &[EvaluationValue],
) -> Result<EvaluationValue> {
    if let Some(decided) = check_arguments(function, args)? {
        return Ok(decided);
    }
    match function.evaluate(ctx, args) {
        Err(err) if !err.is_structural() => {
            warn!(function = function.id(), error = %err, "type error converted to Indeterminate");
            Ok(EvaluationValue::processing_error(err.to_string()))
        }
        result => result,
    }
}

// ============================================================================
// Argument accessors for built-in bodies
// ============================================================================

fn arg(args: &[EvaluationValue], index: usize) -> Result<&EvaluationValue> {
    args.get(index).ok_or_else(|| {
        EvalError::argument("<builtin>", format!("missing argument at position {index}"))
    })
}

pub(crate) fn value_arg(args: &[EvaluationValue], index: usize) -> Result<&AttributeValue> {
    match arg(args, index)? {
        EvaluationValue::Value(value) => Ok(value),
        other => Err(TypeError::mismatch("single value", other.describe()).into()),
    }
}

pub(crate) fn bag_arg(args: &[EvaluationValue], index: usize) -> Result<&Bag> {
    match arg(args, index)? {
        EvaluationValue::Bag(bag) => Ok(bag),
        other => Err(TypeError::mismatch("bag", other.describe()).into()),
    }
}

pub(crate) fn function_arg(args: &[EvaluationValue], index: usize) -> Result<&Arc<dyn Function>> {
    match arg(args, index)? {
        EvaluationValue::Function(function) => Ok(function),
        other => Err(TypeError::mismatch("function", other.describe()).into()),
    }
}

pub(crate) fn bool_arg(args: &[EvaluationValue], index: usize) -> Result<bool> {
    arg(args, index)?.bool_value()
}

pub(crate) fn integer_arg(args: &[EvaluationValue], index: usize) -> Result<i64> {
    let value = value_arg(args, index)?;
    value
        .as_integer()
        .ok_or_else(|| TypeError::mismatch(DataType::Integer, value.data_type()).into())
}

pub(crate) fn double_arg(args: &[EvaluationValue], index: usize) -> Result<f64> {
    let value = value_arg(args, index)?;
    value
        .as_double()
        .ok_or_else(|| TypeError::mismatch(DataType::Double, value.data_type()).into())
}

pub(crate) fn string_arg(args: &[EvaluationValue], index: usize) -> Result<&str> {
    let value = value_arg(args, index)?;
    value
        .as_str()
        .ok_or_else(|| TypeError::mismatch(DataType::String, value.data_type()).into())
}

pub(crate) fn boolean_result() -> Option<Param> {
    Some(Param::Value(DataType::Boolean))
}

// ============================================================================
// Registry
// ============================================================================

/// Functions keyed by identifier.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        equality::register(&mut registry);
        comparison::register(&mut registry);
        arithmetic::register(&mut registry);
        logical::register(&mut registry);
        string::register(&mut registry);
        datetime::register(&mut registry);
        bag::register(&mut registry);
        set::register(&mut registry);
        higher_order::register(&mut registry);
        registry
    }

    pub(crate) fn add(&mut self, builtin: Builtin) {
        debug_assert!(
            !self.functions.contains_key(&builtin.id),
            "duplicate builtin {}",
            builtin.id
        );
        self.functions
            .insert(builtin.id.clone(), Arc::new(builtin));
    }

    /// Registers a host function.
    ///
    /// # Errors
    ///
    /// [`EvalError::DuplicateFunction`] when the identifier is taken.
    pub fn register(&mut self, function: impl Function + 'static) -> Result<()> {
        self.register_arc(Arc::new(function))
    }

    pub fn register_arc(&mut self, function: Arc<dyn Function>) -> Result<()> {
        let id = function.id().to_string();
        if self.functions.contains_key(&id) {
            return Err(EvalError::DuplicateFunction(id));
        }
        self.functions.insert(id, function);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(id).cloned()
    }

    /// Looks up a function that a policy refers to.
    ///
    /// # Errors
    ///
    /// [`EvalError::UnknownFunction`] when nothing is registered under `id`.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Function>> {
        self.get(id)
            .ok_or_else(|| EvalError::UnknownFunction(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.functions.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.len())
            .finish()
    }
}

// ============================================================================
// Test support
// ============================================================================


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use basalt_config::EngineSettings;
    use crate::policy::PolicyStore;
    use crate::request::Request;

    struct Always(Arguments);

    impl Function for Always {
        fn id(&self) -> &str {
            "urn:example:function:always"
        }

        fn arguments(&self) -> &Arguments {
            &self.0
        }

        fn returns(&self) -> Option<Param> {
            boolean_result()
        }

        fn evaluate(
            &self,
            _ctx: &EvaluationContext<'_>,
            _args: &[EvaluationValue],
        ) -> Result<EvaluationValue> {
            Ok(EvaluationValue::boolean(true))
        }
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = FunctionRegistry::with_builtins();
        for id in [
            "urn:oasis:names:tc:xacml:1.0:function:string-equal",
            "urn:oasis:names:tc:xacml:3.0:function:string-equal-ignore-case",
            "urn:oasis:names:tc:xacml:1.0:function:integer-greater-than",
            "urn:oasis:names:tc:xacml:1.0:function:integer-add",
            "urn:oasis:names:tc:xacml:1.0:function:and",
            "urn:oasis:names:tc:xacml:2.0:function:string-concatenate",
            "urn:oasis:names:tc:xacml:3.0:function:dateTime-add-dayTimeDuration",
            "urn:oasis:names:tc:xacml:1.0:function:string-one-and-only",
            "urn:oasis:names:tc:xacml:3.0:function:dayTimeDuration-bag-size",
            "urn:oasis:names:tc:xacml:1.0:function:x500Name-union",
            "urn:oasis:names:tc:xacml:1.0:function:any-of-all",
            "urn:oasis:names:tc:xacml:1.0:function:map",
        ] {
            assert!(registry.contains(id), "{id} missing");
        }
        let ids = registry.ids();
        assert!(ids.windows(2).all(|w| w[0] <= w[1]), "ids are sorted");
        assert_eq!(ids.len(), registry.len());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = FunctionRegistry::with_builtins();
        registry
            .register(Always(Arguments::Fixed(Vec::new())))
            .expect("fresh identifier");
        assert_eq!(
            registry.register(Always(Arguments::Fixed(Vec::new()))),
            Err(EvalError::DuplicateFunction(
                "urn:example:function:always".into()
            ))
        );
        assert!(matches!(
            registry.resolve("urn:example:function:never"),
            Err(EvalError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_every_builtin_rejects_missing_arguments() {
        let registry = FunctionRegistry::with_builtins();
        let request = Request::new();
        let store = PolicyStore::new();
        let settings = EngineSettings::default();
        let ctx = EvaluationContext::new(&request, &registry, &store, &settings);

        for id in registry.ids() {
            let function = registry.resolve(id).expect("listed id resolves");
            if function.arguments().min_arity() == 0 {
                continue;
            }
            let result = function.evaluate(&ctx, &[]);
            assert!(
                matches!(result, Err(EvalError::Argument { .. })),
                "{id} accepted an empty argument list: {result:?}"
            );
        }
    }

    #[test]
    fn test_arity_checks() {
        let fixed = Arguments::fixed([Param::AnyValue, Param::AnyValue]);
        assert!(fixed.check_arity("f", 2).is_ok());
        assert!(fixed.check_arity("f", 3).is_err());
        assert!(fixed.check_arity("f", 1).is_err());

        let variadic = Arguments::variadic(Param::Value(DataType::Integer), 2);
        assert!(variadic.check_arity("f", 1).is_err());
        assert!(variadic.check_arity("f", 5).is_ok());
        assert_eq!(variadic.param(4), Some(Param::Value(DataType::Integer)));
    }

    #[test]
    fn test_declared_type_mismatch_is_indeterminate() {
        let result = call(
            "urn:oasis:names:tc:xacml:1.0:function:integer-equal",
            vec![int(1), v("1")],
        );
        assert!(is_processing_error(&result), "{result:?}");
    }

    #[test]
    fn test_indeterminate_argument_propagates() {
        let missing = EvaluationValue::indeterminate(
            crate::decision::StatusCode::MissingAttribute,
            "role",
        );
        let result = call(
            "urn:oasis:names:tc:xacml:1.0:function:string-equal",
            vec![missing.clone(), v("a")],
        );
        assert_eq!(result, missing);
    }

    #[test]
    fn test_short_circuit_wins_over_indeterminate() {
        let missing = EvaluationValue::processing_error("unknown");
        let result = call(
            "urn:oasis:names:tc:xacml:1.0:function:or",
            vec![missing, v(true)],
        );
        assert_eq!(result, EvaluationValue::boolean(true));
    }
}
