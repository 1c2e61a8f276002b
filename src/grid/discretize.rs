//! Grid discretization: the enumerated parameter values tables exist for.
//!
//! Each axis is a small, strictly increasing set fixed at startup. Raw
//! parameter values are snapped once (see [`GridKey::snap`]) and then matched
//! exactly; there is no nearest-neighbour fallback across the sets.

use serde::{Deserialize, Serialize};

use crate::domain::GridKey;
use crate::error::{GridError, GridResult};

/// Which discretized axis of a [`GridKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAxis {
    Metallicity,
    Rotation,
    Inclination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discretization {
    pub metallicity: Vec<f64>,
    pub rotation: Vec<f64>,
    pub inclination: Vec<f64>,
}

impl Discretization {
    /// 5 metallicities x 7 rotation rates x 3 inclinations.
    pub fn reference() -> Self {
        Self {
            metallicity: vec![-0.30, -0.15, 0.00, 0.15, 0.30],
            rotation: linear_steps(0.0, 0.6, 0.1),
            inclination: vec![0.0, 45.0, 90.0],
        }
    }

    pub fn validate(&self) -> GridResult<()> {
        check_axis("metallicity", &self.metallicity)?;
        check_axis("rotation", &self.rotation)?;
        check_axis("inclination", &self.inclination)?;

        // Distinct values must stay distinct after snapping to key precision.
        let keys = self.keys();
        let mut deduped = keys.clone();
        deduped.dedup();
        if deduped.len() != keys.len() {
            return Err(GridError::Configuration(
                "discretization values collide at key precision".to_string(),
            ));
        }
        Ok(())
    }

    pub fn values(&self, axis: KeyAxis) -> &[f64] {
        match axis {
            KeyAxis::Metallicity => &self.metallicity,
            KeyAxis::Rotation => &self.rotation,
            KeyAxis::Inclination => &self.inclination,
        }
    }

    /// Full cross product, ordered by key.
    pub fn keys(&self) -> Vec<GridKey> {
        let mut out = Vec::with_capacity(self.metallicity.len() * self.rotation.len() * self.inclination.len());
        for &m in &self.metallicity {
            for &v in &self.rotation {
                for &i in &self.inclination {
                    if let Some(key) = GridKey::snap(m, v, i) {
                        out.push(key);
                    }
                }
            }
        }
        out.sort();
        out
    }

    pub fn contains(&self, key: GridKey) -> bool {
        contains_snapped(&self.metallicity, key.metallicity())
            && contains_snapped(&self.rotation, key.rotation())
            && contains_snapped(&self.inclination, key.inclination())
    }

    /// Move `delta` positions along `axis` from the allowed value nearest to
    /// `current`, clamped at the ends.
    pub fn step(&self, axis: KeyAxis, current: f64, delta: i32) -> f64 {
        let values = self.values(axis);
        if values.is_empty() {
            return current;
        }
        let idx = nearest_index(values, current) as i64;
        let next = (idx + delta as i64).clamp(0, values.len() as i64 - 1) as usize;
        values[next]
    }
}

/// Inclusive evenly spaced values, rounded to 1e-9 to avoid accumulation drift.
pub fn linear_steps(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite() && step.is_finite() && step > 0.0 && max >= min) {
        return Vec::new();
    }
    let n = ((max - min) / step + 1e-9).floor() as usize + 1;
    (0..n)
        .map(|i| ((min + step * i as f64) * 1e9).round() / 1e9)
        .collect()
}

fn check_axis(name: &str, values: &[f64]) -> GridResult<()> {
    if values.is_empty() {
        return Err(GridError::Configuration(format!("{name} discretization is empty")));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(GridError::Configuration(format!("{name} discretization has non-finite values")));
    }
    if values.windows(2).any(|w| w[1] <= w[0]) {
        return Err(GridError::Configuration(format!(
            "{name} discretization must be strictly increasing"
        )));
    }
    Ok(())
}

fn contains_snapped(values: &[f64], snapped: f64) -> bool {
    values.iter().any(|&v| (v - snapped).abs() < 1e-6)
}

fn nearest_index(values: &[f64], current: f64) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|a, b| {
            (a.1 - current)
                .abs()
                .partial_cmp(&(b.1 - current).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map_or(0, |(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_cross_product_has_105_keys() {
        let d = Discretization::reference();
        d.validate().unwrap();
        assert_eq!(d.keys().len(), 105);
        assert_eq!(d.rotation, vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn contains_requires_exact_member_after_snapping() {
        let d = Discretization::reference();
        assert!(d.contains(GridKey::snap(0.0, 0.0, 90.0).unwrap()));
        assert!(!d.contains(GridKey::snap(0.0, 0.0, 60.0).unwrap()));
        assert!(!d.contains(GridKey::snap(0.05, 0.0, 0.0).unwrap()));
    }

    #[test]
    fn unordered_axis_is_rejected() {
        let d = Discretization {
            metallicity: vec![0.0, -0.15],
            rotation: vec![0.0],
            inclination: vec![0.0],
        };
        assert!(matches!(d.validate(), Err(GridError::Configuration(_))));
    }

    #[test]
    fn colliding_values_are_rejected() {
        let d = Discretization {
            metallicity: vec![0.001, 0.002],
            rotation: vec![0.0],
            inclination: vec![0.0],
        };
        assert!(matches!(d.validate(), Err(GridError::Configuration(_))));
    }

    #[test]
    fn step_clamps_at_ends() {
        let d = Discretization::reference();
        assert_eq!(d.step(KeyAxis::Inclination, 0.0, 1), 45.0);
        assert_eq!(d.step(KeyAxis::Inclination, 90.0, 1), 90.0);
        assert_eq!(d.step(KeyAxis::Metallicity, -0.30, -1), -0.30);
    }
}
