//! Built-in scalar/aggregate function and operator signatures.
//!
//! Generated from specs/functions.toml

/// The result domain a function's return value takes, relative to its
/// arguments — resolved by `binder::bind_function` against the bound
/// argument bindings it actually has in hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDomain {
    Boolean,
    Integer,
    /// Same domain as the function's first argument.
    SameAsFirst,
    Untyped,
}

/// One recognized name's call signature: how many arguments it accepts,
/// what its result domain is, and whether it's an aggregate (its sole
/// argument is a plural space to range over rather than a row-scoped
/// scalar, §4.6 "Aggregates").
#[derive(Debug, Clone, Copy)]
pub struct FunctionSignature {
    pub name: &'static str,
    pub min_arity: usize,
    pub max_arity: Option<usize>,
    pub result: ResultDomain,
    pub is_aggregate: bool,
}

impl FunctionSignature {
    pub fn accepts_arity(&self, arity: usize) -> bool {
        arity >= self.min_arity && self.max_arity.map_or(true, |max| arity <= max)
    }
}

/// 28 recognized names.
pub static FUNCTIONS: &[FunctionSignature] = &[
    FunctionSignature { name: "!", min_arity: 1, max_arity: Some(1), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "!=", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "!==", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "!~", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "&", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "*", min_arity: 2, max_arity: Some(2), result: ResultDomain::SameAsFirst, is_aggregate: false },
    FunctionSignature { name: "+", min_arity: 2, max_arity: Some(2), result: ResultDomain::SameAsFirst, is_aggregate: false },
    FunctionSignature { name: "-", min_arity: 2, max_arity: Some(2), result: ResultDomain::SameAsFirst, is_aggregate: false },
    FunctionSignature { name: "/", min_arity: 2, max_arity: Some(2), result: ResultDomain::SameAsFirst, is_aggregate: false },
    FunctionSignature { name: "<", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "<=", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "=", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "==", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: ">", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: ">=", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "avg", min_arity: 1, max_arity: Some(1), result: ResultDomain::SameAsFirst, is_aggregate: true },
    FunctionSignature { name: "count", min_arity: 1, max_arity: Some(1), result: ResultDomain::Integer, is_aggregate: true },
    FunctionSignature { name: "exists", min_arity: 1, max_arity: Some(1), result: ResultDomain::Boolean, is_aggregate: true },
    FunctionSignature { name: "false", min_arity: 0, max_arity: Some(0), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "max", min_arity: 1, max_arity: Some(1), result: ResultDomain::SameAsFirst, is_aggregate: true },
    FunctionSignature { name: "min", min_arity: 1, max_arity: Some(1), result: ResultDomain::SameAsFirst, is_aggregate: true },
    FunctionSignature { name: "null", min_arity: 0, max_arity: Some(0), result: ResultDomain::Untyped, is_aggregate: false },
    FunctionSignature { name: "sum", min_arity: 1, max_arity: Some(1), result: ResultDomain::SameAsFirst, is_aggregate: true },
    FunctionSignature { name: "true", min_arity: 0, max_arity: Some(0), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "unary+", min_arity: 1, max_arity: Some(1), result: ResultDomain::SameAsFirst, is_aggregate: false },
    FunctionSignature { name: "unary-", min_arity: 1, max_arity: Some(1), result: ResultDomain::SameAsFirst, is_aggregate: false },
    FunctionSignature { name: "|", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
    FunctionSignature { name: "~", min_arity: 2, max_arity: Some(2), result: ResultDomain::Boolean, is_aggregate: false },
];

/// Looks up a name's call signature (§4.4 "call(syntax, scope?) -> Binding:
/// invokes the global function/identifier protocol by name + arity").
pub fn lookup(name: &str) -> Option<&'static FunctionSignature> {
    FUNCTIONS.iter().find(|sig| sig.name == name)
}
