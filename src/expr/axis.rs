//! Structured axis expressions: `column1 [op column2]`.
//!
//! Labels are a pure rendering of the structure and are never parsed back.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel used by selection widgets for "no second column".
pub const NONE_SENTINEL: &str = "None";

/// Binary combinator between two columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOp {
    #[default]
    None,
    Subtract,
    Add,
    Multiply,
    Divide,
}

impl AxisOp {
    /// Widget order.
    pub const ALL: [AxisOp; 5] = [
        AxisOp::None,
        AxisOp::Subtract,
        AxisOp::Add,
        AxisOp::Multiply,
        AxisOp::Divide,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            AxisOp::None => NONE_SENTINEL,
            AxisOp::Subtract => "-",
            AxisOp::Add => "+",
            AxisOp::Multiply => "*",
            AxisOp::Divide => "/",
        }
    }

    /// Element-wise application. Division by zero yields a non-finite value.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            AxisOp::None => a,
            AxisOp::Subtract => a - b,
            AxisOp::Add => a + b,
            AxisOp::Multiply => a * b,
            AxisOp::Divide => a / b,
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&op| op == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&op| op == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// A derived plotting axis.
///
/// When `op` is [`AxisOp::None`] or `column2` is absent the expression reduces
/// to `column1` alone, whatever operator was nominally selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisExpr {
    pub column1: String,
    pub op: AxisOp,
    pub column2: Option<String>,
}

impl AxisExpr {
    /// Build from widget values; `column2` equal to the `None` sentinel
    /// (case-insensitive) or empty is treated as absent.
    pub fn new(column1: impl Into<String>, op: AxisOp, column2: Option<&str>) -> Self {
        Self {
            column1: column1.into(),
            op,
            column2: column2.and_then(normalize_optional_column),
        }
    }

    pub fn column(column1: impl Into<String>) -> Self {
        Self::new(column1, AxisOp::None, None)
    }

    pub fn combined(column1: impl Into<String>, op: AxisOp, column2: &str) -> Self {
        Self::new(column1, op, Some(column2))
    }

    /// Whether the operator is ignored and only `column1` contributes.
    pub fn is_degenerate(&self) -> bool {
        self.op == AxisOp::None || self.column2.is_none()
    }

    /// The second operand, only when it actually participates.
    pub fn effective_operand(&self) -> Option<(AxisOp, &str)> {
        if self.is_degenerate() {
            return None;
        }
        self.column2.as_deref().map(|c2| (self.op, c2))
    }

    pub fn label(&self) -> String {
        crate::expr::label(self)
    }
}

impl fmt::Display for AxisExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

fn normalize_optional_column(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NONE_SENTINEL) {
        None
    } else {
        Some(trimmed.to_string())
    }
}
