//! Axis-expression evaluation against a row table.

use crate::catalog::ColumnCatalog;
use crate::error::{GridError, GridResult};
use crate::expr::axis::AxisExpr;

/// Column-major view of the rows at one age bucket.
///
/// Every column returned for a source has the same length, `len()`.
pub trait ColumnSource {
    fn column(&self, name: &str) -> Option<&[f64]>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evaluate `expr` element-wise over `rows`.
///
/// Column names are validated against `catalog` first. In the degenerate case
/// (no operator or no second column) `column1`'s raw sequence is returned and
/// `column2` is not consulted at all.
pub fn resolve<S: ColumnSource + ?Sized>(
    expr: &AxisExpr,
    catalog: &ColumnCatalog,
    rows: &S,
) -> GridResult<Vec<f64>> {
    let first = lookup(&expr.column1, catalog, rows)?;

    let Some((op, column2)) = expr.effective_operand() else {
        return Ok(first.to_vec());
    };

    let second = lookup(column2, catalog, rows)?;
    Ok(first
        .iter()
        .zip(second.iter())
        .map(|(&a, &b)| op.apply(a, b))
        .collect())
}

/// Render the display label: `column1` alone when degenerate, otherwise
/// `column1 + symbol + column2`.
pub fn label(expr: &AxisExpr) -> String {
    match expr.effective_operand() {
        Some((op, column2)) => format!("{}{}{}", expr.column1, op.symbol(), column2),
        None => expr.column1.clone(),
    }
}

/// Whether `expr` is a single magnitude column, the y axis of a
/// color-magnitude diagram.
pub fn is_magnitude(expr: &AxisExpr, catalog: &ColumnCatalog) -> bool {
    expr.is_degenerate() && catalog.is_photometric(&expr.column1)
}

/// Distance modulus to carry in a request whose y axis is `y`.
///
/// Only a single magnitude is shifted; colors, other combinations and the
/// physical axes (`log_L`, `log_Teff`) stay at 0.
pub fn distance_shift(y: &AxisExpr, catalog: &ColumnCatalog, dmod: f64) -> f64 {
    if is_magnitude(y, catalog) { dmod } else { 0.0 }
}

/// Check every participating column of `expr` against the catalog.
pub fn validate(expr: &AxisExpr, catalog: &ColumnCatalog) -> GridResult<()> {
    if !catalog.contains(&expr.column1) {
        return Err(GridError::UnknownColumn(expr.column1.clone()));
    }
    if let Some((_, column2)) = expr.effective_operand() {
        if !catalog.contains(column2) {
            return Err(GridError::UnknownColumn(column2.to_string()));
        }
    }
    Ok(())
}

fn lookup<'a, S: ColumnSource + ?Sized>(
    name: &str,
    catalog: &ColumnCatalog,
    rows: &'a S,
) -> GridResult<&'a [f64]> {
    if !catalog.contains(name) {
        return Err(GridError::UnknownColumn(name.to_string()));
    }
    rows.column(name)
        .ok_or_else(|| GridError::UnknownColumn(name.to_string()))
}
