//! Build script for htsql-core.
//!
//! Generates the built-in scalar/aggregate function signature table from
//! `specs/functions.toml`. Generated files are written to `src/generated/`
//! and should be committed to version control.
//!
//! Data source:
//! - `functions.toml`: one table per recognized function/operator name —
//!   arity bounds, result domain category, aggregate flag.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FunctionSpec {
    min_arity: usize,
    max_arity: Option<usize>,
    result: String,
    is_aggregate: bool,
}

fn main() {
    let spec_path = Path::new("specs/functions.toml");
    if !spec_path.exists() {
        panic!(
            "Spec file not found at {:?}. Expected at the crate root's specs/functions.toml",
            spec_path.canonicalize().unwrap_or_else(|_| spec_path.to_path_buf())
        );
    }

    let generated_dir = Path::new("src/generated");
    fs::create_dir_all(generated_dir).expect("Failed to create src/generated directory");

    let functions = load_functions(spec_path);

    generate_mod_rs(generated_dir);
    generate_functions(generated_dir, &functions);

    println!("cargo:rerun-if-changed=specs/functions.toml");
    println!("cargo:rerun-if-changed=build.rs");
}

fn load_functions(path: &Path) -> BTreeMap<String, FunctionSpec> {
    let content = fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {path:?}: {e}"));
    toml::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse {path:?}: {e}"))
}

fn generate_mod_rs(dir: &Path) {
    let content = r#"//! Generated function signature table.
//!
//! DO NOT EDIT MANUALLY - generated by build.rs from specs/functions.toml

pub mod functions;

pub use functions::*;
"#;
    fs::write(dir.join("mod.rs"), content).expect("Failed to write mod.rs");
}

fn result_domain_variant(result: &str) -> &'static str {
    match result {
        "boolean" => "ResultDomain::Boolean",
        "integer" => "ResultDomain::Integer",
        "same_as_first" => "ResultDomain::SameAsFirst",
        "untyped" => "ResultDomain::Untyped",
        other => panic!("unknown result domain category {other:?} in specs/functions.toml"),
    }
}

fn generate_functions(dir: &Path, functions: &BTreeMap<String, FunctionSpec>) {
    let mut code = String::from(
        r#"//! Built-in scalar/aggregate function and operator signatures.
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

"#,
    );

    code.push_str(&format!("/// {} recognized names.\n", functions.len()));
    code.push_str("pub static FUNCTIONS: &[FunctionSignature] = &[\n");
    for (name, spec) in functions {
        let max_arity = match spec.max_arity {
            Some(n) => format!("Some({n})"),
            None => "None".to_string(),
        };
        code.push_str(&format!(
            "    FunctionSignature {{ name: \"{name}\", min_arity: {min}, max_arity: {max_arity}, result: {result}, is_aggregate: {agg} }},\n",
            name = name.escape_default(),
            min = spec.min_arity,
            result = result_domain_variant(&spec.result),
            agg = spec.is_aggregate,
        ));
    }
    code.push_str("];\n\n");

    code.push_str(
        r#"/// Looks up a name's call signature (§4.4 "call(syntax, scope?) -> Binding:
/// invokes the global function/identifier protocol by name + arity").
pub fn lookup(name: &str) -> Option<&'static FunctionSignature> {
    FUNCTIONS.iter().find(|sig| sig.name == name)
}
"#,
    );

    fs::write(dir.join("functions.rs"), code).expect("Failed to write functions.rs");
}
