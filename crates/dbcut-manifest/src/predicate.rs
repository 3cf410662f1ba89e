use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Comparison operator of the filter mini-language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    Like,
    Nlike,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::In => "$in",
            Op::Nin => "$nin",
            Op::Like => "$like",
            Op::Nlike => "$nlike",
        }
    }
}

/// A node of the predicate mini-language's parsed tree.
///
/// This is the already-parsed form; the YAML surface syntax that produces
/// it is out of scope (§1). A field name may be qualified (`"author.name"`)
/// to reach into an eager-loaded relation — the compiler validates
/// reachability, this type just carries the string through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare {
        field: String,
        op: Op,
        value: JsonValue,
    },
}
