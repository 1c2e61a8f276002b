//! Display sinks the controller writes into.
//!
//! A sink only accepts wholesale replacement; the controller never reads a
//! sink back. The in-memory buffers here are cheap shared handles so a
//! front-end (or a test) can keep one clone and observe what was written.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::domain::CurveRole;

pub trait CurveSink {
    /// Replace the sink contents. Previous contents are discarded.
    fn set(&mut self, x: Vec<f64>, y: Vec<f64>);
}

pub trait TextSink {
    fn set(&mut self, text: &str);
}

/// Contents of a curve buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Number of `set` calls so far.
    pub writes: u64,
}

impl Series {
    pub fn finite_points(&self) -> Vec<(f64, f64)> {
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| (x, y))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Shared in-memory curve sink.
#[derive(Debug, Clone, Default)]
pub struct SeriesBuffer(Rc<RefCell<Series>>);

impl SeriesBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Series {
        self.0.borrow().clone()
    }

    pub fn writes(&self) -> u64 {
        self.0.borrow().writes
    }
}

impl CurveSink for SeriesBuffer {
    fn set(&mut self, x: Vec<f64>, y: Vec<f64>) {
        let mut series = self.0.borrow_mut();
        series.x = x;
        series.y = y;
        series.writes += 1;
    }
}

/// Shared in-memory text sink.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer(Rc<RefCell<(String, u64)>>);

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.0.borrow().0.clone()
    }

    pub fn writes(&self) -> u64 {
        self.0.borrow().1
    }
}

impl TextSink for TextBuffer {
    fn set(&mut self, text: &str) {
        let mut inner = self.0.borrow_mut();
        inner.0.clear();
        inner.0.push_str(text);
        inner.1 += 1;
    }
}

/// Every sink a controller refreshes. Roles without a sink are not computed.
#[derive(Default)]
pub struct SinkSet {
    pub(crate) curves: BTreeMap<CurveRole, Box<dyn CurveSink>>,
    pub(crate) overlay: Option<Box<dyn CurveSink>>,
    pub(crate) x_label: Option<Box<dyn TextSink>>,
    pub(crate) y_label: Option<Box<dyn TextSink>>,
    pub(crate) diagnostics: Option<Box<dyn TextSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_curve(mut self, role: CurveRole, sink: impl CurveSink + 'static) -> Self {
        self.curves.insert(role, Box::new(sink));
        self
    }

    pub fn with_overlay(mut self, sink: impl CurveSink + 'static) -> Self {
        self.overlay = Some(Box::new(sink));
        self
    }

    pub fn with_labels(mut self, x: impl TextSink + 'static, y: impl TextSink + 'static) -> Self {
        self.x_label = Some(Box::new(x));
        self.y_label = Some(Box::new(y));
        self
    }

    pub fn with_diagnostics(mut self, sink: impl TextSink + 'static) -> Self {
        self.diagnostics = Some(Box::new(sink));
        self
    }

    pub fn has_curve(&self, role: CurveRole) -> bool {
        self.curves.contains_key(&role)
    }
}

/// Buffers for every sink, bundled for front-ends that draw from memory.
#[derive(Debug, Clone, Default)]
pub struct BufferBoard {
    pub primary: SeriesBuffer,
    pub reference: SeriesBuffer,
    pub mass_highlight: SeriesBuffer,
    pub hrd: SeriesBuffer,
    pub overlay: SeriesBuffer,
    pub x_label: TextBuffer,
    pub y_label: TextBuffer,
    pub diagnostics: TextBuffer,
}

impl BufferBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn curve(&self, role: CurveRole) -> &SeriesBuffer {
        match role {
            CurveRole::Primary => &self.primary,
            CurveRole::Reference => &self.reference,
            CurveRole::MassHighlight => &self.mass_highlight,
            CurveRole::Hrd => &self.hrd,
        }
    }

    /// A sink set writing into clones of these buffers.
    pub fn sinks(&self) -> SinkSet {
        CurveRole::ALL
            .iter()
            .fold(SinkSet::new(), |set, &role| set.with_curve(role, self.curve(role).clone()))
            .with_overlay(self.overlay.clone())
            .with_labels(self.x_label.clone(), self.y_label.clone())
            .with_diagnostics(self.diagnostics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_wholesale() {
        let buf = SeriesBuffer::new();
        let mut sink = buf.clone();
        sink.set(vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]);
        sink.set(vec![9.0], vec![8.0]);
        let s = buf.snapshot();
        assert_eq!(s.x, vec![9.0]);
        assert_eq!(s.y, vec![8.0]);
        assert_eq!(s.writes, 2);
    }

    #[test]
    fn finite_points_skip_sentinels() {
        let buf = SeriesBuffer::new();
        let mut sink = buf.clone();
        sink.set(vec![1.0, f64::INFINITY, 3.0], vec![1.0, 2.0, f64::NAN]);
        assert_eq!(buf.snapshot().finite_points(), vec![(1.0, 1.0)]);
    }

    #[test]
    fn text_buffer_tracks_writes() {
        let buf = TextBuffer::new();
        let mut sink = buf.clone();
        sink.set("B-V");
        sink.set("V");
        assert_eq!(buf.text(), "V");
        assert_eq!(buf.writes(), 2);
    }
}
