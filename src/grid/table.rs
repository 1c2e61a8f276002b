//! One precomputed isochrone table for a fixed grid key.
//!
//! The table holds, per discrete log-age bucket, the model rows ordered by
//! initial mass. It is immutable after construction; `get_curve` is a pure
//! function of the loaded data and the request.

use std::ops::Range;

use crate::catalog::ColumnCatalog;
use crate::data::RawTable;
use crate::domain::{snap_to_step, CurveResult, GridKey, MassRange};
use crate::error::{GridError, GridResult};
use crate::expr::{resolve, AxisExpr, ColumnSource};

/// Tolerance for matching a snapped age to a bucket.
const AGE_TOLERANCE: f64 = 1e-6;

/// Rows at one log-age, stored column-major in header order.
#[derive(Debug, Clone)]
struct AgeBlock {
    log_age: f64,
    initial_mass: Vec<f64>,
    columns: Vec<Vec<f64>>,
}

/// The curve a table presents before any user interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultView {
    pub age: f64,
    pub x: AxisExpr,
    pub y: AxisExpr,
    pub dmod: f64,
}

#[derive(Debug, Clone)]
pub struct IsochroneTable {
    key: GridKey,
    header: Vec<String>,
    catalog: ColumnCatalog,
    age_step: f64,
    blocks: Vec<AgeBlock>,
    default_view: Option<DefaultView>,
}

impl IsochroneTable {
    /// Convert a reader's raw table into columnar age buckets.
    ///
    /// Ages must be strictly increasing. Row order within a bucket is taken
    /// as given (the reader guarantees non-decreasing initial mass).
    pub fn from_raw(key: GridKey, raw: RawTable, age_step: f64) -> GridResult<Self> {
        if !(age_step.is_finite() && age_step > 0.0) {
            return Err(GridError::Configuration(format!("invalid age step {age_step}")));
        }
        let catalog = ColumnCatalog::from_header(&raw.header)?;
        let width = raw.header.len();

        let mut blocks = Vec::with_capacity(raw.blocks.len());
        for block in raw.blocks {
            if let Some(prev) = blocks.last().map(|b: &AgeBlock| b.log_age) {
                if block.log_age <= prev {
                    return Err(GridError::Reader {
                        key,
                        message: format!(
                            "ages must be strictly increasing (got {} after {prev})",
                            block.log_age
                        ),
                    });
                }
            }
            if block.rows.len() != block.initial_mass.len() {
                return Err(GridError::Reader {
                    key,
                    message: format!(
                        "age {}: {} rows but {} masses",
                        block.log_age,
                        block.rows.len(),
                        block.initial_mass.len()
                    ),
                });
            }
            // Mass windows are cut with a binary search.
            if let Some(idx) = block.initial_mass.windows(2).position(|w| !(w[0] <= w[1])) {
                return Err(GridError::Reader {
                    key,
                    message: format!(
                        "age {} row {}: initial mass {} after {}; masses must not decrease",
                        block.log_age,
                        idx + 1,
                        block.initial_mass[idx + 1],
                        block.initial_mass[idx]
                    ),
                });
            }

            let mut columns = vec![Vec::with_capacity(block.rows.len()); width];
            for (idx, row) in block.rows.iter().enumerate() {
                if row.len() != width {
                    return Err(GridError::Reader {
                        key,
                        message: format!(
                            "age {} row {idx}: expected {width} values, got {}",
                            block.log_age,
                            row.len()
                        ),
                    });
                }
                for (col, &value) in columns.iter_mut().zip(row.iter()) {
                    col.push(value);
                }
            }

            blocks.push(AgeBlock {
                log_age: block.log_age,
                initial_mass: block.initial_mass,
                columns,
            });
        }

        Ok(Self {
            key,
            header: raw.header,
            catalog,
            age_step,
            blocks,
            default_view: None,
        })
    }

    /// Record the startup view (age and axes) for this table.
    ///
    /// Fails if the default curve cannot actually be produced.
    pub fn set_default_age(&mut self, view: DefaultView) -> GridResult<()> {
        self.get_curve(view.age, &view.x, &view.y, view.dmod, None)?;
        self.default_view = Some(view);
        Ok(())
    }

    pub fn default_view(&self) -> Option<&DefaultView> {
        self.default_view.as_ref()
    }

    pub fn default_curve(&self) -> GridResult<CurveResult> {
        let view = self
            .default_view
            .as_ref()
            .ok_or_else(|| GridError::Configuration(format!("no default view set for {}", self.key)))?;
        self.get_curve(view.age, &view.x, &view.y, view.dmod, None)
    }

    /// Extract a 2-D curve at `age`.
    ///
    /// - `age` is snapped to the table's age step and must then match a bucket.
    /// - `dmod` is added to every y value; callers pass zero for physical axes.
    /// - `mass_range` keeps rows with initial mass in `[lo, hi]`, in order; an
    ///   empty intersection yields an empty curve.
    pub fn get_curve(
        &self,
        age: f64,
        x: &AxisExpr,
        y: &AxisExpr,
        dmod: f64,
        mass_range: Option<MassRange>,
    ) -> GridResult<CurveResult> {
        let block = self.block(age)?;
        let rows = match mass_range {
            Some(range) => mass_window(&block.initial_mass, range),
            None => 0..block.initial_mass.len(),
        };
        let view = BlockView {
            header: &self.header,
            block,
            rows,
        };

        let xs = resolve(x, &self.catalog, &view)?;
        let mut ys = resolve(y, &self.catalog, &view)?;
        if dmod != 0.0 {
            for v in ys.iter_mut() {
                *v += dmod;
            }
        }

        Ok(CurveResult {
            x: xs,
            y: ys,
            x_label: x.label(),
            y_label: y.label(),
        })
    }

    /// Initial masses of the rows `get_curve` would return.
    pub fn masses(&self, age: f64, mass_range: Option<MassRange>) -> GridResult<Vec<f64>> {
        let block = self.block(age)?;
        let rows = match mass_range {
            Some(range) => mass_window(&block.initial_mass, range),
            None => 0..block.initial_mass.len(),
        };
        Ok(block.initial_mass[rows].to_vec())
    }

    pub fn key(&self) -> GridKey {
        self.key
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    pub fn age_step(&self) -> f64 {
        self.age_step
    }

    pub fn ages(&self) -> Vec<f64> {
        self.blocks.iter().map(|b| b.log_age).collect()
    }

    /// Initial-mass span of the bucket at `age`.
    pub fn mass_span(&self, age: f64) -> GridResult<Option<MassRange>> {
        let block = self.block(age)?;
        Ok(match (block.initial_mass.first(), block.initial_mass.last()) {
            (Some(&lo), Some(&hi)) => Some(MassRange::new(lo, hi)),
            _ => None,
        })
    }

    fn block(&self, age: f64) -> GridResult<&AgeBlock> {
        let snapped = snap_to_step(age, self.age_step);
        self.blocks
            .iter()
            .find(|b| (b.log_age - snapped).abs() < AGE_TOLERANCE)
            .ok_or(GridError::AgeNotFound { key: self.key, age })
    }
}

/// Contiguous row window for a mass range over non-decreasing masses.
fn mass_window(masses: &[f64], range: MassRange) -> Range<usize> {
    let start = masses.partition_point(|&m| m < range.lo);
    let end = masses.partition_point(|&m| m <= range.hi);
    start..end.max(start)
}

struct BlockView<'a> {
    header: &'a [String],
    block: &'a AgeBlock,
    rows: Range<usize>,
}

impl ColumnSource for BlockView<'_> {
    fn column(&self, name: &str) -> Option<&[f64]> {
        let idx = self.header.iter().position(|h| h == name)?;
        self.block.columns.get(idx).map(|c| &c[self.rows.clone()])
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::data::{RawAgeBlock, RawTable};

    pub const HEADER: [&str; 13] = [
        "EEP",
        "log10_isochrone_age_yr",
        "initial_mass",
        "star_mass",
        "log_Teff",
        "log_g",
        "log_L",
        "[Fe/H]_init",
        "[Fe/H]",
        "B",
        "V",
        "R",
        "phase",
    ];

    /// Small hand-built table: ages 8.0 and 8.5, masses spanning [0.1, 8.0].
    ///
    /// `shift` perturbs the magnitudes so different keys give different curves.
    pub fn raw_table(shift: f64) -> RawTable {
        let masses = [0.1, 0.5, 1.0, 2.0, 4.0, 8.0];
        let blocks = [8.0, 8.5]
            .iter()
            .map(|&age| {
                let rows = masses
                    .iter()
                    .enumerate()
                    .map(|(i, &m)| {
                        let log_l = 4.0 * f64::log10(m) + (age - 8.0);
                        let log_t = 3.76 + 0.5 * f64::log10(m);
                        let v = 4.8 - 2.5 * log_l + shift;
                        // R is zero at row 2 so division tests hit a zero divisor.
                        let r = if i == 2 { 0.0 } else { v - 0.3 };
                        vec![
                            i as f64 + 1.0,
                            age,
                            m,
                            m,
                            log_t,
                            4.4,
                            log_l,
                            0.0,
                            0.0,
                            v + 0.6 - 0.1 * i as f64,
                            v,
                            r,
                            0.0,
                        ]
                    })
                    .collect();
                RawAgeBlock {
                    log_age: age,
                    initial_mass: masses.to_vec(),
                    rows,
                }
            })
            .collect();
        RawTable {
            header: HEADER.iter().map(|s| s.to_string()).collect(),
            blocks,
        }
    }
}
