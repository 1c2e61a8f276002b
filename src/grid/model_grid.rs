//! The session's collection of isochrone tables keyed by [`GridKey`].
//!
//! Loading is a one-time bulk step: every key is read independently, so the
//! reads run in parallel (rayon). After load the grid is read-only and can be
//! shared across sessions behind an `Arc`.

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::catalog::ColumnCatalog;
use crate::data::TableReader;
use crate::domain::{CurveRequest, CurveResult, GridKey, PhotometricSet};
use crate::error::{GridError, GridResult};
use crate::expr::{validate, AxisExpr};
use crate::grid::discretize::Discretization;
use crate::grid::table::{DefaultView, IsochroneTable};

/// Settings applied uniformly to every table during load.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub photometry: PhotometricSet,
    pub extra_tag: String,
    /// Declared log-age precision of every table.
    pub age_step: f64,
    pub default_age: f64,
    pub default_x: AxisExpr,
    pub default_y: AxisExpr,
}

impl LoadOptions {
    pub fn new(photometry: PhotometricSet) -> Self {
        let (default_x, default_y) = photometry.default_axes();
        Self {
            photometry,
            extra_tag: crate::domain::DEFAULT_EXTRA_TAG.to_string(),
            age_step: crate::domain::DEFAULT_AGE_STEP,
            default_age: crate::domain::DEFAULT_AGE,
            default_x,
            default_y,
        }
    }
}

#[derive(Debug)]
pub struct ModelGrid {
    discretization: Discretization,
    tables: BTreeMap<GridKey, IsochroneTable>,
    catalog: ColumnCatalog,
    options: LoadOptions,
}

impl ModelGrid {
    /// Load every key of the discretization's cross product.
    pub fn load_all<R: TableReader + ?Sized>(
        reader: &R,
        discretization: Discretization,
        options: LoadOptions,
    ) -> GridResult<Self> {
        let keys = discretization.keys();
        Self::load(reader, discretization, &keys, options)
    }

    /// Load the given keys.
    ///
    /// Every key must belong to `discretization`; the catalog is taken from
    /// the first table's header and every other table must share it.
    pub fn load<R: TableReader + ?Sized>(
        reader: &R,
        discretization: Discretization,
        keys: &[GridKey],
        options: LoadOptions,
    ) -> GridResult<Self> {
        discretization.validate()?;
        if keys.is_empty() {
            return Err(GridError::Configuration("no grid keys to load".to_string()));
        }
        if let Some(bad) = keys.iter().find(|k| !discretization.contains(**k)) {
            return Err(GridError::Configuration(format!(
                "{bad} is outside the declared discretization"
            )));
        }

        let started = Instant::now();
        info!(
            keys = keys.len(),
            photometry = %options.photometry,
            "loading isochrone tables"
        );

        let default_view = DefaultView {
            age: options.default_age,
            x: options.default_x.clone(),
            y: options.default_y.clone(),
            dmod: 0.0,
        };

        let loaded: Vec<IsochroneTable> = keys
            .par_iter()
            .map(|&key| {
                let raw = reader.load_table(key, &options.extra_tag, options.photometry)?;
                let mut table = IsochroneTable::from_raw(key, raw, options.age_step)?;
                table
                    .set_default_age(default_view.clone())
                    .map_err(|e| GridError::Configuration(format!("default view for {key}: {e}")))?;
                debug!(%key, ages = table.ages().len(), "table loaded");
                Ok(table)
            })
            .collect::<GridResult<_>>()?;

        let catalog = loaded
            .first()
            .map(|t| t.catalog().clone())
            .ok_or_else(|| GridError::Configuration("no tables loaded".to_string()))?;
        if let Some(other) = loaded.iter().find(|t| t.catalog() != &catalog) {
            return Err(GridError::Configuration(format!(
                "table {} has a different column layout",
                other.key()
            )));
        }
        validate(&options.default_x, &catalog)
            .and_then(|_| validate(&options.default_y, &catalog))
            .map_err(|e| GridError::Configuration(format!("default axes: {e}")))?;

        let tables: BTreeMap<GridKey, IsochroneTable> =
            loaded.into_iter().map(|t| (t.key(), t)).collect();

        info!(
            tables = tables.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "isochrone grid ready"
        );

        Ok(Self {
            discretization,
            tables,
            catalog,
            options,
        })
    }

    pub fn lookup(&self, key: GridKey) -> GridResult<&IsochroneTable> {
        self.tables.get(&key).ok_or(GridError::KeyNotFound(key))
    }

    /// Resolve a request end to end: table lookup, then `get_curve`.
    pub fn curve(&self, request: &CurveRequest) -> GridResult<CurveResult> {
        self.lookup(request.key)?.get_curve(
            request.age,
            &request.x,
            &request.y,
            request.dmod,
            request.mass_range,
        )
    }

    pub fn keys(&self) -> impl Iterator<Item = GridKey> + '_ {
        self.tables.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    pub fn discretization(&self) -> &Discretization {
        &self.discretization
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn age_step(&self) -> f64 {
        self.options.age_step
    }
}
