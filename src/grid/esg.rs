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

//! Parameters of grids generated with the Extended Schmidt Gnomonic
//! (`ESGgrid`) method.
//!
//! The ESG grid generator works on the supergrid of the regional domain,
//! whose cells are half the size of the regional grid cells. Hence the
//! angular cell sizes are computed from half of `delx` and `dely`.

use super::{check_center, check_finite, checked, EarthConstants};
use crate::constants::ESG_STRETCH_FACTOR;
use crate::errors::GridError;
use crate::Float;
use log::debug;
use serde::Serialize;
use std::fmt;

/// Inputs of the `ESGgrid` generator.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct EsgParams {
    /// Longitude (in degrees) of the grid centre.
    pub lon_ctr: Float,

    /// Latitude (in degrees) of the grid centre.
    pub lat_ctr: Float,

    /// Number of cells in the zonal direction.
    pub nx: i64,

    /// Number of cells in the meridional direction.
    pub ny: i64,

    /// Rotation of the grid (in degrees).
    pub pazi: Float,

    /// Width (in cells) of the wide halo added around the domain
    /// before it is shaved to the halos used by the model.
    pub halo_width: i64,

    /// Cell size (in meters) in the zonal direction.
    pub delx: Float,

    /// Cell size (in meters) in the meridional direction.
    pub dely: Float,
}

impl EsgParams {
    fn check_bounds(&self, earth: &EarthConstants) -> Result<(), GridError> {
        check_finite(&[
            ("ESGgrid_LON_CTR", self.lon_ctr),
            ("ESGgrid_LAT_CTR", self.lat_ctr),
            ("ESGgrid_PAZI", self.pazi),
            ("ESGgrid_DELX", self.delx),
            ("ESGgrid_DELY", self.dely),
            ("RADIUS_EARTH", earth.radius),
            ("DEGS_PER_RADIAN", earth.degs_per_radian),
        ])?;

        check_center(self.lon_ctr, self.lat_ctr)?;

        if self.nx < 1 || self.ny < 1 {
            return Err(GridError::InvalidParameter(format!(
                "ESGgrid_NX and ESGgrid_NY must be positive, got {} and {}",
                self.nx, self.ny
            )));
        }

        if self.halo_width < 0 {
            return Err(GridError::InvalidParameter(format!(
                "ESGgrid_WIDE_HALO_WIDTH cannot be negative, got {}",
                self.halo_width
            )));
        }

        if self.delx <= 0.0 || self.dely <= 0.0 {
            return Err(GridError::InvalidParameter(format!(
                "ESGgrid_DELX and ESGgrid_DELY must be positive, got {} and {}",
                self.delx, self.dely
            )));
        }

        if earth.radius <= 0.0 || earth.degs_per_radian <= 0.0 {
            return Err(GridError::InvalidParameter(
                "RADIUS_EARTH and DEGS_PER_RADIAN must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parameters of the `ESGgrid` grid, in the order expected downstream.
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct EsgGrid {
    #[serde(rename = "LON_CTR")]
    pub lon_ctr: Float,

    #[serde(rename = "LAT_CTR")]
    pub lat_ctr: Float,

    #[serde(rename = "NX")]
    pub nx: i64,

    #[serde(rename = "NY")]
    pub ny: i64,

    #[serde(rename = "PAZI")]
    pub pazi: Float,

    /// Width of the wide halo in cells.
    #[serde(rename = "NHW")]
    pub halo_width: i64,

    #[serde(rename = "STRETCH_FAC")]
    pub stretch_factor: Float,

    /// Angular size (in degrees) of a supergrid cell in x direction.
    #[serde(rename = "DEL_ANGLE_X_SG")]
    pub del_angle_x_sg: Float,

    /// Angular size (in degrees) of a supergrid cell in y direction.
    #[serde(rename = "DEL_ANGLE_Y_SG")]
    pub del_angle_y_sg: Float,

    #[serde(rename = "NEG_NX_OF_DOM_WITH_WIDE_HALO")]
    pub neg_nx_with_halo: i64,

    #[serde(rename = "NEG_NY_OF_DOM_WITH_WIDE_HALO")]
    pub neg_ny_with_halo: i64,
}

impl fmt::Display for EsgGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {} {} {}",
            self.lon_ctr,
            self.lat_ctr,
            self.nx,
            self.ny,
            self.pazi,
            self.halo_width,
            self.stretch_factor,
            self.del_angle_x_sg,
            self.del_angle_y_sg,
            self.neg_nx_with_halo,
            self.neg_ny_with_halo
        )
    }
}

/// Computes the parameters of an `ESGgrid` grid.
///
/// The domain with wide halo spans `nx + 2 * halo_width` by
/// `ny + 2 * halo_width` cells, and the grid generator expects
/// those extents negated.
pub fn compute_esg_grid(params: &EsgParams, earth: &EarthConstants) -> Result<EsgGrid, GridError> {
    debug!("Computing ESGgrid parameters from {:?}", params);

    params.check_bounds(earth)?;

    let del_angle_x_sg = (params.delx / (2.0 * earth.radius)) * earth.degs_per_radian;
    let del_angle_y_sg = (params.dely / (2.0 * earth.radius)) * earth.degs_per_radian;

    let nx_with_halo = wide_extent(params.nx, params.halo_width, "ESGgrid_NX")?;
    let ny_with_halo = wide_extent(params.ny, params.halo_width, "ESGgrid_NY")?;
    checked(params.nx.checked_mul(params.ny), "ESGgrid_NX * ESGgrid_NY")?;

    Ok(EsgGrid {
        lon_ctr: params.lon_ctr,
        lat_ctr: params.lat_ctr,
        nx: params.nx,
        ny: params.ny,
        pazi: params.pazi,
        halo_width: params.halo_width,
        stretch_factor: ESG_STRETCH_FACTOR,
        del_angle_x_sg,
        del_angle_y_sg,
        neg_nx_with_halo: -nx_with_halo,
        neg_ny_with_halo: -ny_with_halo,
    })
}

/// Number of cells along one axis of the domain with wide halo.
fn wide_extent(n: i64, halo_width: i64, name: &str) -> Result<i64, GridError> {
    checked(
        halo_width
            .checked_mul(2)
            .and_then(|halo| n.checked_add(halo)),
        &format!("{} with wide halo", name),
    )
}
