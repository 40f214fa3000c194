//! Record-count success conditions for Wait mode.
//!
//! Grammar: `count=N | count-gte=N | count-gt=N | count-lte=N | count-lt=N |
//! any | none`, with `N` a non-negative integer and surrounding whitespace
//! ignored. `any` is shorthand for `count > 0`, `none` for `count == 0`.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail};

/// Which form of the grammar produced this condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    /// Explicit `count...=N` comparison.
    Count,
    /// `any` - at least one record.
    Any,
    /// `none` - zero records.
    None,
}

/// Comparison operator applied to the record count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
}

impl CompareOp {
    fn apply(self, count: u64, value: u64) -> bool {
        match self {
            CompareOp::Eq => count == value,
            CompareOp::Ge => count >= value,
            CompareOp::Gt => count > value,
            CompareOp::Le => count <= value,
            CompareOp::Lt => count < value,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            CompareOp::Eq => "",
            CompareOp::Ge => "-gte",
            CompareOp::Gt => "-gt",
            CompareOp::Le => "-lte",
            CompareOp::Lt => "-lt",
        }
    }
}

/// A parsed record-count condition. Immutable after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    kind: ConditionKind,
    op: CompareOp,
    value: u64,
}

impl Condition {
    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Evaluate the condition against a record count.
    pub fn evaluate(&self, record_count: u64) -> bool {
        self.op.apply(record_count, self.value)
    }
}

impl FromStr for Condition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        match s {
            "any" => {
                return Ok(Condition {
                    kind: ConditionKind::Any,
                    op: CompareOp::Gt,
                    value: 0,
                })
            }
            "none" => {
                return Ok(Condition {
                    kind: ConditionKind::None,
                    op: CompareOp::Eq,
                    value: 0,
                })
            }
            _ => {}
        }

        let Some((lhs, rhs)) = s.split_once('=') else {
            bail!("invalid condition: {:?}", s);
        };

        let op = match lhs.trim() {
            "count" => CompareOp::Eq,
            "count-gte" => CompareOp::Ge,
            "count-gt" => CompareOp::Gt,
            "count-lte" => CompareOp::Le,
            "count-lt" => CompareOp::Lt,
            other => bail!("invalid condition: {:?}", other),
        };

        let value: u64 = rhs
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid condition value: {:?}", rhs.trim()))?;

        Ok(Condition {
            kind: ConditionKind::Count,
            op,
            value,
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConditionKind::Any => write!(f, "any"),
            ConditionKind::None => write!(f, "none"),
            ConditionKind::Count => write!(f, "count{}={}", self.op.suffix(), self.value),
        }
    }
}
