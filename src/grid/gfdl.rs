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

//! Parameters of grids generated with the `GFDLgrid` method.
//!
//! The regional domain (tile 7) is a nest inside tile 6 of a global
//! stretched cubed-sphere grid with `res_t6` cells along each tile edge.
//! Every tile 6 cell covered by the nest is refined into
//! `refine_ratio x refine_ratio` tile 7 cells.
//!
//! The grid generator (`make_hgrid`) takes the nest limits as indices on
//! the tile 6 *supergrid*, which has twice the resolution of tile 6.
//! A tile 6 cell `i` spans supergrid cells `2i - 1` and `2i`, so a nest
//! boundary on the supergrid must start at an odd index and end at an even one.
//!
//! To obtain a grid with a wide halo the limits are moved outwards by
//! at least `nh4 + 1` tile 7 cells, rounded up to whole tile 6 cells.

use super::{check_center, check_finite, checked, GridOptions, RunEnvir};
use crate::errors::GridError;
use crate::Float;
use log::{debug, warn};
use serde::Serialize;
use std::fmt;

/// Inputs of the `GFDLgrid` generator.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct GfdlParams {
    /// Longitude (in degrees) of the centre of tile 6.
    pub lon_t6_ctr: Float,

    /// Latitude (in degrees) of the centre of tile 6.
    pub lat_t6_ctr: Float,

    /// Number of cells along each edge of tile 6.
    pub res_t6: i64,

    /// Stretch factor of the global cubed-sphere grid.
    pub stretch_factor: Float,

    /// Number of tile 7 cells along the edge of a single tile 6 cell.
    pub refine_ratio: i64,

    /// Tile 6 cell index at which the nest starts in x direction (1-based).
    pub istart_t7: i64,

    /// Tile 6 cell index at which the nest ends in x direction.
    pub iend_t7: i64,

    /// Tile 6 cell index at which the nest starts in y direction (1-based).
    pub jstart_t7: i64,

    /// Tile 6 cell index at which the nest ends in y direction.
    pub jend_t7: i64,
}

impl GfdlParams {
    fn check_bounds(&self, nh4: i64) -> Result<(), GridError> {
        check_finite(&[
            ("GFDLgrid_LON_T6_CTR", self.lon_t6_ctr),
            ("GFDLgrid_LAT_T6_CTR", self.lat_t6_ctr),
            ("GFDLgrid_STRETCH_FAC", self.stretch_factor),
        ])?;

        check_center(self.lon_t6_ctr, self.lat_t6_ctr)?;

        if self.stretch_factor <= 0.0 {
            return Err(GridError::InvalidParameter(format!(
                "GFDLgrid_STRETCH_FAC must be positive, got {}",
                self.stretch_factor
            )));
        }

        if self.res_t6 < 1 {
            return Err(GridError::InvalidParameter(format!(
                "GFDLgrid_NUM_CELLS must be positive, got {}",
                self.res_t6
            )));
        }

        if self.refine_ratio < 1 {
            return Err(GridError::InvalidParameter(format!(
                "GFDLgrid_REFINE_RATIO must be positive, got {}",
                self.refine_ratio
            )));
        }

        if nh4 < 0 {
            return Err(GridError::InvalidParameter(format!(
                "NH4 cannot be negative, got {}",
                nh4
            )));
        }

        checked(self.res_t6.checked_mul(2), "GFDLgrid_NUM_CELLS")?;
        checked(
            self.res_t6.checked_mul(self.refine_ratio),
            "GFDLgrid_NUM_CELLS * GFDLgrid_REFINE_RATIO",
        )?;

        check_limits("I", self.istart_t7, self.iend_t7, self.res_t6)?;
        check_limits("J", self.jstart_t7, self.jend_t7, self.res_t6)?;

        Ok(())
    }
}

/// Checks that nest limits along one axis are ordered and inside tile 6.
fn check_limits(axis: &'static str, start: i64, end: i64, res_t6: i64) -> Result<(), GridError> {
    if end <= start {
        return Err(GridError::InvalidParameter(format!(
            "GFDLgrid_{axis}END_OF_RGNL_DOM_ON_T6G ({end}) must be greater than \
             GFDLgrid_{axis}START_OF_RGNL_DOM_ON_T6G ({start})"
        )));
    }

    if start < 1 || end > res_t6 {
        return Err(GridError::InvalidParameter(format!(
            "nest limits {start}..{end} along {axis} lie outside tile 6 with {res_t6} cells"
        )));
    }

    Ok(())
}

/// Parameters of the `GFDLgrid` grid, in the order expected downstream.
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct GfdlGrid {
    #[serde(rename = "LON_CTR")]
    pub lon_ctr: Float,

    #[serde(rename = "LAT_CTR")]
    pub lat_ctr: Float,

    #[serde(rename = "NX")]
    pub nx: i64,

    #[serde(rename = "NY")]
    pub ny: i64,

    /// Width of the wide halo in tile 7 cells.
    #[serde(rename = "NHW")]
    pub nhw: i64,

    #[serde(rename = "STRETCH_FAC")]
    pub stretch_factor: Float,

    #[serde(rename = "ISTART_OF_RGNL_DOM_WITH_WIDE_HALO_ON_T6SG")]
    pub istart_with_halo_t6sg: i64,

    #[serde(rename = "IEND_OF_RGNL_DOM_WITH_WIDE_HALO_ON_T6SG")]
    pub iend_with_halo_t6sg: i64,

    #[serde(rename = "JSTART_OF_RGNL_DOM_WITH_WIDE_HALO_ON_T6SG")]
    pub jstart_with_halo_t6sg: i64,

    #[serde(rename = "JEND_OF_RGNL_DOM_WITH_WIDE_HALO_ON_T6SG")]
    pub jend_with_halo_t6sg: i64,
}

impl fmt::Display for GfdlGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {} {}",
            self.lon_ctr,
            self.lat_ctr,
            self.nx,
            self.ny,
            self.nhw,
            self.stretch_factor,
            self.istart_with_halo_t6sg,
            self.iend_with_halo_t6sg,
            self.jstart_with_halo_t6sg,
            self.jend_with_halo_t6sg
        )
    }
}

/// Computes the parameters of a `GFDLgrid` grid.
///
/// Tile 7 is assumed to be centred on tile 6. Outside of `nco` environment
/// a nest that is not centred is reported, but the result is computed
/// the same way in every environment.
pub fn compute_gfdl_grid(params: &GfdlParams, opts: &GridOptions) -> Result<GfdlGrid, GridError> {
    debug!("Computing GFDLgrid parameters from {:?}", params);

    params.check_bounds(opts.nh4)?;

    if opts.run_envir != RunEnvir::Nco {
        check_centering("x", params.istart_t7, params.iend_t7, params.res_t6);
        check_centering("y", params.jstart_t7, params.jend_t7, params.res_t6);
    }

    let refine_ratio = params.refine_ratio;

    // products of limits up to `res_t6` are checked in `check_bounds`
    let res_t6sg = 2 * params.res_t6;
    let istart_t6sg = 2 * params.istart_t7 - 1;
    let iend_t6sg = 2 * params.iend_t7;
    let jstart_t6sg = 2 * params.jstart_t7 - 1;
    let jend_t6sg = 2 * params.jend_t7;

    // initial guess of (2 * halo_width_t7g + refine_ratio - 1) / refine_ratio
    // supergrid cells, may be fractional; start limits move down past it and
    // end limits move up to its integer part
    let halo_width_t7g = checked(opts.nh4.checked_add(1), "NH4")?;
    let halo_numer = checked(
        halo_width_t7g
            .checked_mul(2)
            .and_then(|halo| halo.checked_add(refine_ratio - 1)),
        "NH4",
    )?;
    let halo_floor_t6sg = halo_numer / refine_ratio;
    let halo_ceil_t6sg = halo_floor_t6sg + i64::from(halo_numer % refine_ratio != 0);

    debug!(
        "Initial wide halo width: {}/{} cells on tile 6 supergrid, {} cells on tile 7",
        halo_numer, refine_ratio, halo_width_t7g
    );

    let (istart_with_halo_t6sg, iend_with_halo_t6sg) = extend_limits(
        "I",
        (istart_t6sg - halo_ceil_t6sg, iend_t6sg.saturating_add(halo_floor_t6sg)),
        res_t6sg,
        halo_width_t7g,
    )?;
    let (jstart_with_halo_t6sg, jend_with_halo_t6sg) = extend_limits(
        "J",
        (jstart_t6sg - halo_ceil_t6sg, jend_t6sg.saturating_add(halo_floor_t6sg)),
        res_t6sg,
        halo_width_t7g,
    )?;

    let halo_width_t6sg = istart_t6sg - istart_with_halo_t6sg;
    let halo_width_t6g = halo_width_t6sg / 2;
    let nhw = halo_width_t6g * refine_ratio;

    debug!(
        "Adjusted wide halo width: {} cells on tile 6 supergrid, {} cells on tile 7",
        halo_width_t6sg, nhw
    );

    let nx = ((iend_t6sg - istart_t6sg + 1) / 2) * refine_ratio;
    let ny = ((jend_t6sg - jstart_t6sg + 1) / 2) * refine_ratio;
    checked(nx.checked_mul(ny), "number of tile 7 cells")?;

    debug!(
        "Tile 7 has {}x{} cells (prime factors: {:?} and {:?}), \
         {}x{} cells with wide halo; supergrid limits with halo: i {}..{}, j {}..{}",
        nx,
        ny,
        prime_factors(nx),
        prime_factors(ny),
        ((iend_with_halo_t6sg - istart_with_halo_t6sg + 1) / 2) * refine_ratio,
        ((jend_with_halo_t6sg - jstart_with_halo_t6sg + 1) / 2) * refine_ratio,
        istart_with_halo_t6sg,
        iend_with_halo_t6sg,
        jstart_with_halo_t6sg,
        jend_with_halo_t6sg
    );

    Ok(GfdlGrid {
        lon_ctr: params.lon_t6_ctr,
        lat_ctr: params.lat_t6_ctr,
        nx,
        ny,
        nhw,
        stretch_factor: params.stretch_factor,
        istart_with_halo_t6sg,
        iend_with_halo_t6sg,
        jstart_with_halo_t6sg,
        jend_with_halo_t6sg,
    })
}

/// Moves supergrid limits extended by the halo to whole tile 6 cells,
/// failing when they leave the `1..=res_t6sg` supergrid of tile 6.
fn extend_limits(
    axis: &'static str,
    (start, end): (i64, i64),
    res_t6sg: i64,
    halo_width_t7g: i64,
) -> Result<(i64, i64), GridError> {
    // res_t6sg is even, so the odd/even adjustment cannot leave the tile
    if start < 1 || end > res_t6sg {
        return Err(GridError::InvalidParameter(format!(
            "wide halo of {} tile 7 cells extends the nest past tile 6 along {}: \
             supergrid limits {}..{} outside 1..{}",
            halo_width_t7g, axis, start, end, res_t6sg
        )));
    }

    Ok((odd_start(start), even_end(end)))
}

/// Supergrid start index moved down to the nearest odd index.
fn odd_start(index: i64) -> i64 {
    if index.rem_euclid(2) == 0 {
        index - 1
    } else {
        index
    }
}

/// Supergrid end index moved up to the nearest even index.
fn even_end(index: i64) -> i64 {
    if index.rem_euclid(2) == 1 {
        index + 1
    } else {
        index
    }
}

fn check_centering(axis: &str, start: i64, end: i64, res_t6: i64) {
    let lower_margin = start - 1;
    let upper_margin = res_t6 - end;

    if lower_margin != upper_margin {
        warn!(
            "Tile 7 is not centred on tile 6 in the {} direction: \
             margins are {} and {} tile 6 cells (limits {}..{}, tile 6 has {} cells)",
            axis, lower_margin, upper_margin, start, end, res_t6
        );
    }
}

/// Prime factors of `n` in ascending order, with repetitions.
///
/// Useful for choosing MPI layouts that divide the domain evenly.
pub fn prime_factors(mut n: i64) -> Vec<i64> {
    let mut factors = vec![];
    let mut i = 2;

    while i * i <= n {
        if n % i == 0 {
            n /= i;
            factors.push(i);
        } else {
            i += 1;
        }
    }

    if n > 1 {
        factors.push(n);
    }

    factors
}

#[cfg(test)]
mod tests {
    use super::{compute_gfdl_grid, prime_factors, GfdlParams};
    use crate::{
        errors::GridError,
        grid::{GridOptions, RunEnvir},
    };

    fn conus_25km() -> GfdlParams {
        GfdlParams {
            lon_t6_ctr: -97.5,
            lat_t6_ctr: 38.5,
            res_t6: 96,
            stretch_factor: 1.4,
            refine_ratio: 3,
            istart_t7: 13,
            iend_t7: 84,
            jstart_t7: 17,
            jend_t7: 80,
        }
    }

    fn options(nh4: i64, run_envir: RunEnvir) -> GridOptions {
        GridOptions {
            nh4,
            run_envir,
            ..GridOptions::default()
        }
    }

    #[test]
    fn reference_grid() {
        let grid = compute_gfdl_grid(&conus_25km(), &options(4, RunEnvir::Community)).unwrap();

        assert_eq!(grid.lon_ctr, -97.5);
        assert_eq!(grid.lat_ctr, 38.5);
        assert_eq!(grid.nx, 216);
        assert_eq!(grid.ny, 192);
        assert_eq!(grid.nhw, 6);
        assert_eq!(grid.stretch_factor, 1.4);
        assert_eq!(grid.istart_with_halo_t6sg, 21);
        assert_eq!(grid.iend_with_halo_t6sg, 172);
        assert_eq!(grid.jstart_with_halo_t6sg, 29);
        assert_eq!(grid.jend_with_halo_t6sg, 164);
        assert_eq!(
            grid.to_string(),
            "-97.5 38.5 216 192 6 1.4 21 172 29 164"
        );
    }

    #[test]
    fn supergrid_parity() {
        for refine_ratio in 1..=5 {
            for nh4 in 0..=6 {
                let params = GfdlParams {
                    refine_ratio,
                    ..conus_25km()
                };
                let grid = compute_gfdl_grid(&params, &options(nh4, RunEnvir::Community)).unwrap();

                assert_eq!(grid.istart_with_halo_t6sg % 2, 1);
                assert_eq!(grid.jstart_with_halo_t6sg % 2, 1);
                assert_eq!(grid.iend_with_halo_t6sg % 2, 0);
                assert_eq!(grid.jend_with_halo_t6sg % 2, 0);

                // the wide halo is never narrower than requested
                assert!(grid.nhw >= nh4 + 1);
                assert_eq!(grid.nx, 72 * refine_ratio);
                assert_eq!(grid.ny, 64 * refine_ratio);
            }
        }
    }

    #[test]
    fn fractional_halo() {
        let params = GfdlParams {
            refine_ratio: 5,
            ..conus_25km()
        };
        let grid = compute_gfdl_grid(&params, &options(4, RunEnvir::Community)).unwrap();

        assert_eq!(grid.istart_with_halo_t6sg, 21);
        assert_eq!(grid.iend_with_halo_t6sg, 170);
        assert_eq!(grid.jstart_with_halo_t6sg, 29);
        assert_eq!(grid.jend_with_halo_t6sg, 162);
        assert_eq!(grid.nhw, 10);
        assert_eq!(grid.nx, 360);
    }

    #[test]
    fn run_envir_does_not_change_result() {
        let params = GfdlParams {
            istart_t7: 10,
            ..conus_25km()
        };

        let community = compute_gfdl_grid(&params, &options(4, RunEnvir::Community)).unwrap();
        let nco = compute_gfdl_grid(&params, &options(4, RunEnvir::Nco)).unwrap();

        assert_eq!(community, nco);
        assert_eq!(community.nx, 75 * 3);
    }

    #[test]
    fn inverted_limits() {
        let opts = GridOptions::default();

        let params = GfdlParams {
            iend_t7: 13,
            ..conus_25km()
        };
        assert!(matches!(
            compute_gfdl_grid(&params, &opts),
            Err(GridError::InvalidParameter(_))
        ));

        let params = GfdlParams {
            jstart_t7: 81,
            ..conus_25km()
        };
        assert!(matches!(
            compute_gfdl_grid(&params, &opts),
            Err(GridError::InvalidParameter(_))
        ));
    }

    #[test]
    fn invalid_refine_ratio() {
        for refine_ratio in [0, -3] {
            let params = GfdlParams {
                refine_ratio,
                ..conus_25km()
            };
            assert!(matches!(
                compute_gfdl_grid(&params, &GridOptions::default()),
                Err(GridError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn halo_outside_tile() {
        let params = GfdlParams {
            istart_t7: 1,
            iend_t7: 96,
            jstart_t7: 1,
            jend_t7: 96,
            ..conus_25km()
        };
        let result = compute_gfdl_grid(&params, &options(4, RunEnvir::Nco));

        match result {
            Err(GridError::InvalidParameter(msg)) => assert!(msg.contains("wide halo")),
            other => panic!("unexpected result: {:?}", other),
        }

        // one tile 6 cell of margin is too little for the 6 cell halo of ratio 3
        let params = GfdlParams {
            istart_t7: 2,
            ..conus_25km()
        };
        assert!(compute_gfdl_grid(&params, &options(4, RunEnvir::Nco)).is_err());

        // exactly enough margin on both sides
        let params = GfdlParams {
            istart_t7: 3,
            iend_t7: 94,
            ..conus_25km()
        };
        let grid = compute_gfdl_grid(&params, &options(4, RunEnvir::Nco)).unwrap();
        assert_eq!(grid.istart_with_halo_t6sg, 1);
        assert_eq!(grid.iend_with_halo_t6sg, 192);
    }

    #[test]
    fn oversized_grid() {
        let huge_tile = GfdlParams {
            res_t6: i64::MAX,
            ..conus_25km()
        };
        let huge_ratio = GfdlParams {
            res_t6: 1 << 40,
            refine_ratio: 1 << 30,
            ..conus_25km()
        };
        let huge_nest = GfdlParams {
            res_t6: 4_000_000_000,
            refine_ratio: 1_000_000,
            istart_t7: 1000,
            iend_t7: 3_000_000_000,
            jstart_t7: 1000,
            jend_t7: 3_000_000_000,
            ..conus_25km()
        };

        for params in [huge_tile, huge_ratio, huge_nest] {
            assert!(matches!(
                compute_gfdl_grid(&params, &options(4, RunEnvir::Nco)),
                Err(GridError::InvalidParameter(_))
            ));
        }

        assert!(compute_gfdl_grid(&conus_25km(), &options(i64::MAX, RunEnvir::Nco)).is_err());
    }

    #[test]
    fn nest_outside_tile() {
        let params = GfdlParams {
            iend_t7: 97,
            ..conus_25km()
        };
        assert!(compute_gfdl_grid(&params, &GridOptions::default()).is_err());
    }

    #[test]
    fn factors() {
        assert_eq!(prime_factors(216), vec![2, 2, 2, 3, 3, 3]);
        assert_eq!(prime_factors(192), vec![2, 2, 2, 2, 2, 2, 3]);
        assert_eq!(prime_factors(131), vec![131]);
        assert!(prime_factors(1).is_empty());
    }
}
