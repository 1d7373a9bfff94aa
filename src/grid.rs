/*
Copyright 2021 Jakub Lewandowski

This file is part of Limited Area Model Grid Setup (lamgrid).

Limited Area Model Grid Setup (lamgrid) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Limited Area Model Grid Setup (lamgrid) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Limited Area Model Grid Setup (lamgrid). If not, see https://www.gnu.org/licenses/.
*/

//! Module responsible for deriving the geometry of the regional grid.
//!
//! Two grid generation methods are supported:
//!
//! - `ESGgrid` - Extended Schmidt Gnomonic grid, defined directly by its
//! centre, shape and cell size in meters.
//! - `GFDLgrid` - regional nest (tile 7) placed on tile 6 of a stretched
//! global cubed-sphere grid, defined by index limits on tile 6.
//!
//! Both generators are pure functions of their arguments. Inputs are
//! carried by [`GridParams`] and results by [`GridSpec`], so that every
//! consumer has to handle both methods explicitly.

mod esg;
mod gfdl;
mod layout;

pub use esg::{compute_esg_grid, EsgGrid, EsgParams};
pub use gfdl::{compute_gfdl_grid, prime_factors, GfdlGrid, GfdlParams};
pub use layout::Decomposition;

use crate::constants::{DEGS_PER_RADIAN, NH4, RADIUS_EARTH};
use crate::errors::GridError;
use crate::Float;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid generation method, as named in the workflow configuration.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub enum GridGenMethod {
    #[serde(rename = "ESGgrid")]
    Esg,
    #[serde(rename = "GFDLgrid")]
    Gfdl,
}

impl fmt::Display for GridGenMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridGenMethod::Esg => write!(f, "ESGgrid"),
            GridGenMethod::Gfdl => write!(f, "GFDLgrid"),
        }
    }
}

/// Environment in which the workflow runs.
///
/// Only changes the messages emitted during grid generation.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunEnvir {
    #[default]
    Community,
    Nco,
}

/// Physical constants used by the grid generators.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct EarthConstants {
    /// Earth radius in meters.
    pub radius: Float,
    pub degs_per_radian: Float,
}

impl Default for EarthConstants {
    fn default() -> Self {
        EarthConstants {
            radius: RADIUS_EARTH,
            degs_per_radian: DEGS_PER_RADIAN,
        }
    }
}

/// Settings of grid generation that are not properties of the grid itself.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct GridOptions {
    pub earth: EarthConstants,

    /// Widest halo (in cells) needed by the forecast model.
    pub nh4: i64,

    pub run_envir: RunEnvir,
}

impl Default for GridOptions {
    fn default() -> Self {
        GridOptions {
            earth: EarthConstants::default(),
            nh4: NH4,
            run_envir: RunEnvir::default(),
        }
    }
}

/// Inputs of one of the grid generators.
#[derive(Clone, PartialEq, Debug)]
pub enum GridParams {
    Esg(EsgParams),
    Gfdl(GfdlParams),
}

impl GridParams {
    pub fn method(&self) -> GridGenMethod {
        match self {
            GridParams::Esg(_) => GridGenMethod::Esg,
            GridParams::Gfdl(_) => GridGenMethod::Gfdl,
        }
    }

    /// Runs the generator matching the grid generation method.
    pub fn generate(&self, opts: &GridOptions) -> Result<GridSpec, GridError> {
        match self {
            GridParams::Esg(params) => Ok(GridSpec::Esg(compute_esg_grid(params, &opts.earth)?)),
            GridParams::Gfdl(params) => Ok(GridSpec::Gfdl(compute_gfdl_grid(params, opts)?)),
        }
    }
}

/// Resolved description of the regional grid.
///
/// Serializes with the keys used by the downstream grid generation tasks.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(tag = "GRID_GEN_METHOD")]
pub enum GridSpec {
    #[serde(rename = "ESGgrid")]
    Esg(EsgGrid),
    #[serde(rename = "GFDLgrid")]
    Gfdl(GfdlGrid),
}

impl GridSpec {
    pub fn method(&self) -> GridGenMethod {
        match self {
            GridSpec::Esg(_) => GridGenMethod::Esg,
            GridSpec::Gfdl(_) => GridGenMethod::Gfdl,
        }
    }

    pub fn nx(&self) -> i64 {
        match self {
            GridSpec::Esg(grid) => grid.nx,
            GridSpec::Gfdl(grid) => grid.nx,
        }
    }

    pub fn ny(&self) -> i64 {
        match self {
            GridSpec::Esg(grid) => grid.ny,
            GridSpec::Gfdl(grid) => grid.ny,
        }
    }

    /// Width of the wide halo in cells of the regional grid.
    pub fn halo_width(&self) -> i64 {
        match self {
            GridSpec::Esg(grid) => grid.halo_width,
            GridSpec::Gfdl(grid) => grid.nhw,
        }
    }

    /// Number of grid points of the domain without halo.
    ///
    /// Generators reject grids for which this product does not fit in `i64`.
    pub fn grid_points(&self) -> i64 {
        self.nx() * self.ny()
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridSpec::Esg(grid) => write!(f, "{}", grid),
            GridSpec::Gfdl(grid) => write!(f, "{}", grid),
        }
    }
}

/// Checks that all listed values are finite numbers.
fn check_finite(values: &[(&'static str, Float)]) -> Result<(), GridError> {
    for (name, value) in values {
        if !value.is_finite() {
            return Err(GridError::InvalidParameter(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

/// Unwraps the result of checked integer arithmetic on grid dimensions.
fn checked(value: Option<i64>, name: &str) -> Result<i64, GridError> {
    value.ok_or_else(|| GridError::InvalidParameter(format!("{} is too large", name)))
}

/// Checks that the grid centre lies on the globe.
fn check_center(lon: Float, lat: Float) -> Result<(), GridError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(GridError::InvalidParameter(format!(
            "latitude of the grid centre out of bounds: {}",
            lat
        )));
    }

    if !(-360.0..=360.0).contains(&lon) {
        return Err(GridError::InvalidParameter(format!(
            "longitude of the grid centre out of bounds: {}",
            lon
        )));
    }

    Ok(())
}
