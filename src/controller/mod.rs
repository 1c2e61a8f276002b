//! Reactive recomputation of every displayed curve.
//!
//! Front-ends never mutate curves directly. They send a [`ParamChange`]
//! message; the controller applies it and runs one pass that rebuilds the
//! requests for every curve role, resolves them against the grid, and only
//! then writes results to the sinks. A pass either writes a role's complete
//! new curve or leaves the sink untouched, so no sink ever shows a mix of old
//! and new parameters.
//!
//! Errors never escape a pass. A role whose request fails keeps its previous
//! contents and the failure is written to the diagnostics sink.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{LOG_L, LOG_TEFF};
use crate::domain::{
    snap_to_step, CurveRequest, CurveResult, CurveRole, DisplayMode, ExplorerConfig, GridKey, MassRange,
    ParameterState,
};
use crate::error::{GridError, GridResult};
use crate::expr::{distance_shift, validate, AxisExpr, AxisOp};
use crate::grid::ModelGrid;

pub mod fields;
pub mod sinks;

pub use fields::*;
pub use sinks::*;

/// Initial highlighted initial-mass window (solar masses).
pub const DEFAULT_MASS_RANGE: (f64, f64) = (1.0, 2.0);

/// Which independently parametrized curve a state edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Primary,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateField {
    Age(f64),
    Metallicity(f64),
    Rotation(f64),
    Inclination(f64),
    DistanceModulus(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AxisSel {
    X,
    Y,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AxisEdit {
    Column1(String),
    Operator(AxisOp),
    /// `None` selects the "no second column" sentinel.
    Column2(Option<String>),
}

/// One user-triggered parameter change.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamChange {
    State(Side, StateField),
    Axis(AxisSel, AxisEdit),
    MassLow(f64),
    MassHigh(f64),
    Mode(DisplayMode),
}

/// Every tracked parameter. Axes and mass range are shared by all roles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerState {
    pub primary: ParameterState,
    pub reference: ParameterState,
    pub x: AxisExpr,
    pub y: AxisExpr,
    pub mass_range: MassRange,
    pub mode: DisplayMode,
}

impl ExplorerState {
    /// Startup state: primary at the default age, reference at the reference
    /// age, both on the solar-metallicity, non-rotating, pole-on table.
    pub fn initial(config: &ExplorerConfig, grid: &ModelGrid) -> Self {
        let options = grid.options();
        Self {
            primary: ParameterState::new(config.default_age, 0.0, 0.0, 0.0),
            reference: ParameterState::new(config.reference_age, 0.0, 0.0, 0.0),
            x: options.default_x.clone(),
            y: options.default_y.clone(),
            mass_range: MassRange::new(DEFAULT_MASS_RANGE.0, DEFAULT_MASS_RANGE.1),
            mode: DisplayMode::Cmd,
        }
    }

    pub fn side(&self, side: Side) -> &ParameterState {
        match side {
            Side::Primary => &self.primary,
            Side::Reference => &self.reference,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut ParameterState {
        match side {
            Side::Primary => &mut self.primary,
            Side::Reference => &mut self.reference,
        }
    }

    pub fn axis(&self, sel: AxisSel) -> &AxisExpr {
        match sel {
            AxisSel::X => &self.x,
            AxisSel::Y => &self.y,
        }
    }

    fn axis_mut(&mut self, sel: AxisSel) -> &mut AxisExpr {
        match sel {
            AxisSel::X => &mut self.x,
            AxisSel::Y => &mut self.y,
        }
    }
}

/// Outcome of one `apply`/`refresh` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Roles whose sinks were rewritten.
    pub updated: Vec<CurveRole>,
    /// Roles whose requests failed; their sinks kept previous contents.
    pub failed: Vec<(CurveRole, GridError)>,
    /// Set when the change itself was refused and no pass ran.
    pub rejected: Option<GridError>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.rejected.is_none()
    }
}

/// What a role should show for the current state.
enum Plan {
    Show(CurveRequest),
    Hide,
    Fail(GridError),
}

pub struct ReactiveController {
    grid: Arc<ModelGrid>,
    state: ExplorerState,
    sinks: SinkSet,
    /// Request whose result each role's sink currently holds.
    shown: BTreeMap<CurveRole, CurveRequest>,
    labels: Option<(String, String)>,
    diagnostic: Option<String>,
}

impl ReactiveController {
    pub fn new(grid: Arc<ModelGrid>, state: ExplorerState, sinks: SinkSet) -> Self {
        Self {
            grid,
            state,
            sinks,
            shown: BTreeMap::new(),
            labels: None,
            diagnostic: None,
        }
    }

    pub fn state(&self) -> &ExplorerState {
        &self.state
    }

    pub fn grid(&self) -> &ModelGrid {
        &self.grid
    }

    /// Most recent diagnostic, if the last pass or change reported one.
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Requests currently backing each displayed role.
    pub fn shown_requests(&self) -> &BTreeMap<CurveRole, CurveRequest> {
        &self.shown
    }

    /// Push externally parsed observational points. Recomputation passes
    /// never touch the overlay.
    pub fn set_overlay(&mut self, x: Vec<f64>, y: Vec<f64>) {
        if let Some(sink) = self.sinks.overlay.as_mut() {
            debug!(points = x.len(), "overlay set");
            sink.set(x, y);
        }
    }

    /// Apply one change and run a recomputation pass.
    pub fn apply(&mut self, change: ParamChange) -> PassReport {
        debug!(?change, "parameter change");
        if let Err(err) = self.mutate(change) {
            warn!(%err, "parameter change rejected");
            self.surface(Some(err.to_string()));
            return PassReport {
                rejected: Some(err),
                ..PassReport::default()
            };
        }
        self.pass(false)
    }

    /// Recompute and rewrite every role regardless of what is shown.
    pub fn refresh(&mut self) -> PassReport {
        self.pass(true)
    }

    /// Build the request a role would issue for the current state.
    pub fn request_for(&self, role: CurveRole) -> GridResult<Option<CurveRequest>> {
        match self.plan(role) {
            Plan::Show(request) => Ok(Some(request)),
            Plan::Hide => Ok(None),
            Plan::Fail(err) => Err(err),
        }
    }

    fn mutate(&mut self, change: ParamChange) -> GridResult<()> {
        match change {
            ParamChange::State(side, field) => {
                let value = match field {
                    StateField::Age(v)
                    | StateField::Metallicity(v)
                    | StateField::Rotation(v)
                    | StateField::Inclination(v)
                    | StateField::DistanceModulus(v) => v,
                };
                require_finite(value, "parameter")?;
                let params = self.state.side_mut(side);
                match field {
                    StateField::Age(v) => params.age = v,
                    StateField::Metallicity(v) => params.metallicity = v,
                    StateField::Rotation(v) => params.rotation = v,
                    StateField::Inclination(v) => params.inclination = v,
                    StateField::DistanceModulus(v) => params.dmod = v,
                }
            }
            ParamChange::Axis(sel, edit) => {
                let mut candidate = self.state.axis(sel).clone();
                match edit {
                    AxisEdit::Column1(name) => candidate.column1 = name,
                    AxisEdit::Operator(op) => candidate.op = op,
                    AxisEdit::Column2(name) => {
                        candidate = AxisExpr::new(candidate.column1, candidate.op, name.as_deref());
                    }
                }
                // An unknown column keeps the previous valid expression.
                validate(&candidate, self.grid.catalog())?;
                *self.state.axis_mut(sel) = candidate;
            }
            ParamChange::MassLow(v) => {
                require_finite(v, "mass range")?;
                self.state.mass_range.lo = v;
            }
            ParamChange::MassHigh(v) => {
                require_finite(v, "mass range")?;
                self.state.mass_range.hi = v;
            }
            ParamChange::Mode(mode) => self.state.mode = mode,
        }
        Ok(())
    }

    fn pass(&mut self, force: bool) -> PassReport {
        let mut report = PassReport::default();

        // Resolve everything first; nothing is written until all roles are done.
        let mut writes: Vec<(CurveRole, Option<(CurveRequest, CurveResult)>)> = Vec::new();
        for role in CurveRole::ALL {
            if !self.sinks.has_curve(role) {
                continue;
            }
            match self.plan(role) {
                Plan::Show(request) => {
                    if !force && self.shown.get(&role) == Some(&request) {
                        continue;
                    }
                    match self.grid.curve(&request) {
                        Ok(result) => writes.push((role, Some((request, result)))),
                        Err(err) => report.failed.push((role, err)),
                    }
                }
                Plan::Hide => {
                    if force || self.shown.contains_key(&role) {
                        writes.push((role, None));
                    }
                }
                Plan::Fail(err) => report.failed.push((role, err)),
            }
        }

        for (role, write) in writes {
            let Some(sink) = self.sinks.curves.get_mut(&role) else {
                continue;
            };
            match write {
                Some((request, result)) => {
                    sink.set(result.x, result.y);
                    self.shown.insert(role, request);
                }
                None => {
                    sink.set(Vec::new(), Vec::new());
                    self.shown.remove(&role);
                }
            }
            report.updated.push(role);
        }

        self.push_labels(force);

        if report.failed.is_empty() {
            self.surface(None);
        } else {
            for (role, err) in &report.failed {
                warn!(role = role.display_name(), %err, "curve not updated");
            }
            let message = report
                .failed
                .iter()
                .map(|(role, err)| format!("{}: {err}", role.display_name()))
                .collect::<Vec<_>>()
                .join("; ");
            self.surface(Some(message));
        }

        debug!(updated = report.updated.len(), failed = report.failed.len(), "pass complete");
        report
    }

    fn plan(&self, role: CurveRole) -> Plan {
        let state = &self.state;
        let built = match role {
            CurveRole::Primary => self.cmd_request(&state.primary, None),
            CurveRole::Reference => self.cmd_request(&state.reference, None),
            CurveRole::MassHighlight => self.cmd_request(&state.primary, Some(state.mass_range)),
            CurveRole::Hrd => {
                if state.mode != DisplayMode::CmdWithHrd {
                    return Plan::Hide;
                }
                self.hrd_request(&state.primary)
            }
        };
        match built {
            Ok(request) => Plan::Show(request),
            Err(err) => Plan::Fail(err),
        }
    }

    fn cmd_request(&self, params: &ParameterState, mass_range: Option<MassRange>) -> GridResult<CurveRequest> {
        Ok(CurveRequest {
            key: snap_key(params)?,
            age: snap_to_step(params.age, self.grid.age_step()),
            x: self.state.x.clone(),
            y: self.state.y.clone(),
            dmod: distance_shift(&self.state.y, self.grid.catalog(), params.dmod),
            mass_range,
        })
    }

    fn hrd_request(&self, params: &ParameterState) -> GridResult<CurveRequest> {
        Ok(CurveRequest {
            key: snap_key(params)?,
            age: snap_to_step(params.age, self.grid.age_step()),
            x: AxisExpr::column(LOG_TEFF),
            y: AxisExpr::column(LOG_L),
            dmod: 0.0,
            mass_range: None,
        })
    }

    fn push_labels(&mut self, force: bool) {
        let labels = (self.state.x.label(), self.state.y.label());
        if !force && self.labels.as_ref() == Some(&labels) {
            return;
        }
        if let Some(sink) = self.sinks.x_label.as_mut() {
            sink.set(&labels.0);
        }
        if let Some(sink) = self.sinks.y_label.as_mut() {
            sink.set(&labels.1);
        }
        self.labels = Some(labels);
    }

    fn surface(&mut self, message: Option<String>) {
        if self.diagnostic == message {
            return;
        }
        if let Some(sink) = self.sinks.diagnostics.as_mut() {
            sink.set(message.as_deref().unwrap_or(""));
        }
        self.diagnostic = message;
    }
}

fn snap_key(params: &ParameterState) -> GridResult<GridKey> {
    GridKey::snap(params.metallicity, params.rotation, params.inclination).ok_or_else(|| {
        GridError::InvalidParameter(format!(
            "cannot snap ([Fe/H]={}, v/vc={}, i={})",
            params.metallicity, params.rotation, params.inclination
        ))
    })
}

fn require_finite(value: f64, what: &str) -> GridResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GridError::InvalidParameter(format!("{what} must be finite (got {value})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RawTable, TableReader};
    use crate::domain::PhotometricSet;
    use crate::grid::table::fixtures::raw_table;
    use crate::grid::{Discretization, LoadOptions};

    struct FixtureReader;

    impl TableReader for FixtureReader {
        fn load_table(&self, key: GridKey, _tag: &str, _p: PhotometricSet) -> GridResult<RawTable> {
            Ok(raw_table(key.metallicity() * 2.0 + key.rotation()))
        }
    }

    fn grid() -> Arc<ModelGrid> {
        let disc = Discretization {
            metallicity: vec![-0.15, 0.0, 0.15],
            rotation: vec![0.0, 0.3],
            inclination: vec![0.0, 45.0, 90.0],
        };
        let options = LoadOptions {
            photometry: PhotometricSet::Tycho,
            extra_tag: "TP".to_string(),
            age_step: 0.5,
            default_age: 8.5,
            default_x: AxisExpr::column("B"),
            default_y: AxisExpr::column("V"),
        };
        Arc::new(ModelGrid::load_all(&FixtureReader, disc, options).unwrap())
    }

    fn state() -> ExplorerState {
        ExplorerState {
            primary: ParameterState::new(8.5, 0.0, 0.0, 0.0),
            reference: ParameterState::new(8.0, 0.0, 0.0, 0.0),
            x: AxisExpr::column("B"),
            y: AxisExpr::column("V"),
            mass_range: MassRange::new(0.5, 2.0),
            mode: DisplayMode::Cmd,
        }
    }

    fn controller() -> (ReactiveController, BufferBoard) {
        let board = BufferBoard::new();
        let mut c = ReactiveController::new(grid(), state(), board.sinks());
        let report = c.refresh();
        assert!(report.is_clean(), "{report:?}");
        (c, board)
    }

    #[test]
    fn initial_refresh_fills_every_active_role() {
        let (c, board) = controller();
        let default = c
            .grid()
            .lookup(GridKey::snap(0.0, 0.0, 0.0).unwrap())
            .unwrap()
            .default_curve()
            .unwrap();
        let primary = board.primary.snapshot();
        assert_eq!(primary.x, default.x);
        assert_eq!(primary.y, default.y);
        assert_eq!(board.mass_highlight.snapshot().len(), 3);
        assert!(board.hrd.snapshot().is_empty());
        assert_eq!(board.x_label.text(), "B");
        assert_eq!(board.y_label.text(), "V");
    }

    #[test]
    fn reference_change_leaves_primary_untouched() {
        let (mut c, board) = controller();
        let before = board.primary.snapshot();
        let ref_before = board.reference.snapshot();

        let report = c.apply(ParamChange::State(Side::Reference, StateField::Metallicity(0.15)));
        assert_eq!(report.updated, vec![CurveRole::Reference]);

        let after = board.primary.snapshot();
        assert_eq!(after.writes, before.writes);
        let bits = |v: &[f64]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&after.x), bits(&before.x));
        assert_eq!(bits(&after.y), bits(&before.y));
        assert_ne!(board.reference.snapshot().y, ref_before.y);
    }

    #[test]
    fn axis_change_updates_all_cmd_roles_and_labels() {
        let (mut c, board) = controller();
        c.apply(ParamChange::Axis(AxisSel::X, AxisEdit::Column2(Some("V".to_string()))));
        // Operator still None: second column has no effect.
        assert_eq!(board.x_label.text(), "B");

        let report = c.apply(ParamChange::Axis(AxisSel::X, AxisEdit::Operator(AxisOp::Subtract)));
        assert_eq!(
            report.updated,
            vec![CurveRole::Primary, CurveRole::Reference, CurveRole::MassHighlight]
        );
        assert_eq!(board.x_label.text(), "B-V");
        let p = board.primary.snapshot();
        for (x, y) in p.x.iter().zip(p.y.iter()) {
            assert!(x.is_finite() && y.is_finite());
        }
    }

    #[test]
    fn unrecoverable_key_keeps_previous_contents_and_reports() {
        let (mut c, board) = controller();
        let before = board.primary.snapshot();

        let report = c.apply(ParamChange::State(Side::Primary, StateField::Inclination(60.0)));
        assert!(report.updated.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(matches!(report.failed[0], (CurveRole::Primary, GridError::KeyNotFound(_))));
        assert_eq!(board.primary.snapshot(), before);
        assert!(board.diagnostics.text().contains("primary"));

        // Reference still updates while primary is broken.
        let report = c.apply(ParamChange::State(Side::Reference, StateField::Age(8.5)));
        assert_eq!(report.updated, vec![CurveRole::Reference]);
        assert!(!report.failed.is_empty());

        // Recovering clears the diagnostic.
        let report = c.apply(ParamChange::State(Side::Primary, StateField::Inclination(90.0)));
        assert!(report.is_clean());
        assert_eq!(board.diagnostics.text(), "");
        assert_eq!(c.diagnostic(), None);
    }

    #[test]
    fn unknown_column_falls_back_to_previous_expression() {
        let (mut c, board) = controller();
        let writes = board.primary.writes();
        let report = c.apply(ParamChange::Axis(AxisSel::Y, AxisEdit::Column1("Gaia_G".to_string())));
        assert_eq!(report.rejected, Some(GridError::UnknownColumn("Gaia_G".to_string())));
        assert_eq!(c.state().y, AxisExpr::column("V"));
        assert_eq!(board.primary.writes(), writes);
        assert!(board.diagnostics.text().contains("Gaia_G"));
    }

    #[test]
    fn distance_modulus_shifts_magnitudes_only() {
        let (mut c, board) = controller();
        let base = board.primary.snapshot();
        c.apply(ParamChange::State(Side::Primary, StateField::DistanceModulus(5.0)));
        let shifted = board.primary.snapshot();
        for (s, b) in shifted.y.iter().zip(base.y.iter()) {
            assert!((s - b - 5.0).abs() < 1e-12);
        }

        // A color on the y axis is distance independent.
        c.apply(ParamChange::Axis(AxisSel::Y, AxisEdit::Column2(Some("R".to_string()))));
        c.apply(ParamChange::Axis(AxisSel::Y, AxisEdit::Operator(AxisOp::Subtract)));
        let request = c.request_for(CurveRole::Primary).unwrap().unwrap();
        assert_eq!(request.dmod, 0.0);
    }

    #[test]
    fn hrd_mode_toggles_physical_curve() {
        let (mut c, board) = controller();
        c.apply(ParamChange::State(Side::Primary, StateField::DistanceModulus(10.0)));
        let report = c.apply(ParamChange::Mode(DisplayMode::CmdWithHrd));
        assert_eq!(report.updated, vec![CurveRole::Hrd]);
        let hrd = board.hrd.snapshot();
        assert_eq!(hrd.len(), 6);
        let request = c.request_for(CurveRole::Hrd).unwrap().unwrap();
        assert_eq!(request.dmod, 0.0);
        assert_eq!(request.x.label(), LOG_TEFF);

        let report = c.apply(ParamChange::Mode(DisplayMode::Cmd));
        assert_eq!(report.updated, vec![CurveRole::Hrd]);
        assert!(board.hrd.snapshot().is_empty());
    }

    #[test]
    fn mass_range_edits_only_touch_highlight() {
        let (mut c, board) = controller();
        let primary_writes = board.primary.writes();
        let report = c.apply(ParamChange::MassHigh(8.0));
        assert_eq!(report.updated, vec![CurveRole::MassHighlight]);
        assert_eq!(board.mass_highlight.snapshot().len(), 5);
        assert_eq!(board.primary.writes(), primary_writes);

        c.apply(ParamChange::MassLow(9.0));
        assert!(board.mass_highlight.snapshot().is_empty());
    }

    #[test]
    fn slider_drift_snaps_to_same_request() {
        let (mut c, board) = controller();
        let writes = board.primary.writes();
        let report = c.apply(ParamChange::State(Side::Primary, StateField::Age(8.5000000001)));
        assert!(report.updated.is_empty());
        assert_eq!(board.primary.writes(), writes);
    }

    #[test]
    fn non_finite_parameter_is_rejected() {
        let (mut c, _board) = controller();
        let report = c.apply(ParamChange::State(Side::Primary, StateField::Age(f64::NAN)));
        assert!(matches!(report.rejected, Some(GridError::InvalidParameter(_))));
        assert_eq!(c.state().primary.age, 8.5);
    }

    #[test]
    fn overlay_is_independent_of_passes() {
        let (mut c, board) = controller();
        c.set_overlay(vec![0.5, 0.6], vec![10.0, 11.0]);
        c.apply(ParamChange::State(Side::Primary, StateField::DistanceModulus(3.0)));
        c.refresh();
        let overlay = board.overlay.snapshot();
        assert_eq!(overlay.y, vec![10.0, 11.0]);
        assert_eq!(overlay.writes, 1);
    }
}
