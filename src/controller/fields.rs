//! Editable fields and how a single step on each becomes a [`ParamChange`].
//!
//! Front-ends map their own input events (key presses, slider drags) onto
//! `Field::step`, so every control goes through the same message path.

use crate::controller::{AxisEdit, AxisSel, ExplorerState, ParamChange, Side, StateField};
use crate::domain::snap_to_step;
use crate::grid::{KeyAxis, ModelGrid};

/// Distance-modulus slider step (mag).
pub const DMOD_STEP: f64 = 0.1;
/// Mass-range slider step (solar masses).
pub const MASS_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Age(Side),
    Metallicity(Side),
    Rotation(Side),
    Inclination(Side),
    DistanceModulus(Side),
    Column1(AxisSel),
    Operator(AxisSel),
    Column2(AxisSel),
    MassLow,
    MassHigh,
}

impl Field {
    /// Display order.
    pub const ALL: [Field; 18] = [
        Field::Age(Side::Primary),
        Field::Metallicity(Side::Primary),
        Field::Rotation(Side::Primary),
        Field::Inclination(Side::Primary),
        Field::DistanceModulus(Side::Primary),
        Field::Age(Side::Reference),
        Field::Metallicity(Side::Reference),
        Field::Rotation(Side::Reference),
        Field::Inclination(Side::Reference),
        Field::DistanceModulus(Side::Reference),
        Field::Column1(AxisSel::X),
        Field::Operator(AxisSel::X),
        Field::Column2(AxisSel::X),
        Field::Column1(AxisSel::Y),
        Field::Operator(AxisSel::Y),
        Field::Column2(AxisSel::Y),
        Field::MassLow,
        Field::MassHigh,
    ];

    pub fn label(self) -> String {
        let suffix = |side: Side| match side {
            Side::Primary => "",
            Side::Reference => " (ref)",
        };
        let axis = |sel: AxisSel| match sel {
            AxisSel::X => "x",
            AxisSel::Y => "y",
        };
        match self {
            Field::Age(s) => format!("log(age){}", suffix(s)),
            Field::Metallicity(s) => format!("[Fe/H]{}", suffix(s)),
            Field::Rotation(s) => format!("v/vc{}", suffix(s)),
            Field::Inclination(s) => format!("i [deg]{}", suffix(s)),
            Field::DistanceModulus(s) => format!("m-M{}", suffix(s)),
            Field::Column1(a) => format!("{} value 1", axis(a)),
            Field::Operator(a) => format!("{} operator", axis(a)),
            Field::Column2(a) => format!("{} value 2", axis(a)),
            Field::MassLow => "mass lo".to_string(),
            Field::MassHigh => "mass hi".to_string(),
        }
    }

    pub fn value(self, state: &ExplorerState) -> String {
        match self {
            Field::Age(s) => format!("{:.2}", state.side(s).age),
            Field::Metallicity(s) => format!("{:+.2}", state.side(s).metallicity),
            Field::Rotation(s) => format!("{:.1}", state.side(s).rotation),
            Field::Inclination(s) => format!("{:.1}", state.side(s).inclination),
            Field::DistanceModulus(s) => format!("{:.2}", state.side(s).dmod),
            Field::Column1(a) => state.axis(a).column1.clone(),
            Field::Operator(a) => state.axis(a).op.symbol().to_string(),
            Field::Column2(a) => state
                .axis(a)
                .column2
                .clone()
                .unwrap_or_else(|| crate::expr::NONE_SENTINEL.to_string()),
            Field::MassLow => format!("{:.2}", state.mass_range.lo),
            Field::MassHigh => format!("{:.2}", state.mass_range.hi),
        }
    }

    /// The change one step of `delta` (usually ±1) on this field produces.
    ///
    /// Returns `None` when the step would not change anything (e.g. at the end
    /// of a range or with an empty catalog).
    pub fn step(self, state: &ExplorerState, ctx: &StepContext<'_>, delta: i32) -> Option<ParamChange> {
        let disc = ctx.grid.discretization();
        let change = match self {
            Field::Age(s) => {
                let step = ctx.grid.age_step();
                let current = state.side(s).age;
                let next = snap_to_step(current + step * delta as f64, step).clamp(ctx.age_min, ctx.age_max);
                ParamChange::State(s, StateField::Age(next))
            }
            Field::Metallicity(s) => ParamChange::State(
                s,
                StateField::Metallicity(disc.step(KeyAxis::Metallicity, state.side(s).metallicity, delta)),
            ),
            Field::Rotation(s) => ParamChange::State(
                s,
                StateField::Rotation(disc.step(KeyAxis::Rotation, state.side(s).rotation, delta)),
            ),
            Field::Inclination(s) => ParamChange::State(
                s,
                StateField::Inclination(disc.step(KeyAxis::Inclination, state.side(s).inclination, delta)),
            ),
            Field::DistanceModulus(s) => {
                let next = snap_to_step(state.side(s).dmod + DMOD_STEP * delta as f64, DMOD_STEP).max(0.0);
                ParamChange::State(s, StateField::DistanceModulus(next))
            }
            Field::Column1(a) => {
                let next = ctx.grid.catalog().step(&state.axis(a).column1, delta)?;
                ParamChange::Axis(a, AxisEdit::Column1(next.to_string()))
            }
            Field::Operator(a) => {
                let op = state.axis(a).op;
                let next = if delta >= 0 { op.next() } else { op.prev() };
                ParamChange::Axis(a, AxisEdit::Operator(next))
            }
            Field::Column2(a) => {
                let next = ctx
                    .grid
                    .catalog()
                    .step_optional(state.axis(a).column2.as_deref(), delta);
                ParamChange::Axis(a, AxisEdit::Column2(next.map(str::to_string)))
            }
            Field::MassLow => {
                let next = snap_to_step(state.mass_range.lo + MASS_STEP * delta as f64, MASS_STEP).max(0.0);
                ParamChange::MassLow(next)
            }
            Field::MassHigh => {
                let next = snap_to_step(state.mass_range.hi + MASS_STEP * delta as f64, MASS_STEP).max(0.0);
                ParamChange::MassHigh(next)
            }
        };

        if is_noop(&change, state) { None } else { Some(change) }
    }
}

/// Grid and slider bounds needed to step fields.
pub struct StepContext<'a> {
    pub grid: &'a ModelGrid,
    pub age_min: f64,
    pub age_max: f64,
}

fn is_noop(change: &ParamChange, state: &ExplorerState) -> bool {
    match change {
        ParamChange::State(s, field) => {
            let p = state.side(*s);
            match *field {
                StateField::Age(v) => v == p.age,
                StateField::Metallicity(v) => v == p.metallicity,
                StateField::Rotation(v) => v == p.rotation,
                StateField::Inclination(v) => v == p.inclination,
                StateField::DistanceModulus(v) => v == p.dmod,
            }
        }
        ParamChange::Axis(a, edit) => {
            let axis = state.axis(*a);
            match edit {
                AxisEdit::Column1(c) => *c == axis.column1,
                AxisEdit::Operator(op) => *op == axis.op,
                AxisEdit::Column2(c) => *c == axis.column2,
            }
        }
        ParamChange::MassLow(v) => *v == state.mass_range.lo,
        ParamChange::MassHigh(v) => *v == state.mass_range.hi,
        ParamChange::Mode(m) => *m == state.mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SyntheticReader;
    use crate::domain::{DisplayMode, MassRange, ParameterState, PhotometricSet};
    use crate::expr::{AxisExpr, AxisOp};
    use crate::grid::{Discretization, LoadOptions};

    fn grid() -> ModelGrid {
        let reader = SyntheticReader::new(7.5, 10.0, 0.5).unwrap();
        let disc = Discretization {
            metallicity: vec![-0.15, 0.0, 0.15],
            rotation: vec![0.0, 0.1],
            inclination: vec![0.0, 45.0, 90.0],
        };
        ModelGrid::load_all(&reader, disc, LoadOptions::new(PhotometricSet::Tycho)).unwrap()
    }

    fn state() -> ExplorerState {
        let (x, y) = PhotometricSet::Tycho.default_axes();
        ExplorerState {
            primary: ParameterState::new(8.5, 0.0, 0.0, 0.0),
            reference: ParameterState::new(8.0, 0.0, 0.0, 0.0),
            x,
            y,
            mass_range: MassRange::new(1.0, 2.0),
            mode: DisplayMode::Cmd,
        }
    }

    #[test]
    fn every_field_has_a_label_and_value() {
        let s = state();
        for field in Field::ALL {
            assert!(!field.label().is_empty());
            assert!(!field.value(&s).is_empty());
        }
        assert_eq!(Field::Operator(AxisSel::Y).value(&s), "None");
    }

    #[test]
    fn age_steps_by_table_step_and_clamps() {
        let g = grid();
        let ctx = StepContext { grid: &g, age_min: 7.5, age_max: 10.0 };
        let mut s = state();
        assert_eq!(
            Field::Age(Side::Primary).step(&s, &ctx, 1),
            Some(ParamChange::State(Side::Primary, StateField::Age(9.0)))
        );
        s.primary.age = 10.0;
        assert_eq!(Field::Age(Side::Primary).step(&s, &ctx, 1), None);
    }

    #[test]
    fn key_fields_walk_discretization() {
        let g = grid();
        let ctx = StepContext { grid: &g, age_min: 7.5, age_max: 10.0 };
        let s = state();
        assert_eq!(
            Field::Inclination(Side::Reference).step(&s, &ctx, 1),
            Some(ParamChange::State(Side::Reference, StateField::Inclination(45.0)))
        );
        assert_eq!(Field::Rotation(Side::Primary).step(&s, &ctx, -1), None);
    }

    #[test]
    fn column_fields_cycle_catalog() {
        let g = grid();
        let ctx = StepContext { grid: &g, age_min: 7.5, age_max: 10.0 };
        let mut s = state();
        s.y = AxisExpr::new("Tycho_V", AxisOp::None, None);
        assert_eq!(
            Field::Column2(AxisSel::Y).step(&s, &ctx, 1),
            Some(ParamChange::Axis(AxisSel::Y, AxisEdit::Column2(Some("Hipparcos_Hp".to_string()))))
        );
        assert_eq!(
            Field::Column1(AxisSel::Y).step(&s, &ctx, 1),
            Some(ParamChange::Axis(AxisSel::Y, AxisEdit::Column1("Hipparcos_Hp".to_string())))
        );
        assert_eq!(
            Field::Operator(AxisSel::X).step(&s, &ctx, 1),
            Some(ParamChange::Axis(AxisSel::X, AxisEdit::Operator(AxisOp::Add)))
        );
    }

    #[test]
    fn mass_and_dmod_floor_at_zero() {
        let g = grid();
        let ctx = StepContext { grid: &g, age_min: 7.5, age_max: 10.0 };
        let mut s = state();
        assert_eq!(Field::DistanceModulus(Side::Primary).step(&s, &ctx, -1), None);
        s.mass_range.lo = 0.0;
        assert_eq!(Field::MassLow.step(&s, &ctx, -1), None);
        assert_eq!(Field::MassHigh.step(&s, &ctx, 1), Some(ParamChange::MassHigh(2.1)));
    }
}
