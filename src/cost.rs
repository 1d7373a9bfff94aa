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

//! Module estimating the computational cost of a forecast on the requested grid.
//!
//! Cost of a forecast scales with the number of grid points and inversely
//! with the time step. Absolute values are meaningless across machines,
//! so the requested grid is always reported next to the reference grid
//! ([`REFERENCE_GRID_NAME`]) and experiments are compared by the ratio.

use crate::configuration::ExptConfig;
use crate::constants::REFERENCE_GRID_NAME;
use crate::errors::SetupError;
use crate::setup::{report_level, select_grid};
use crate::Float;
use log::{debug, log};
use std::{fmt, path::Path};

/// Time steps and grid point counts of the requested and reference grids.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct CostVector {
    /// Time step (in seconds) of the requested grid.
    pub time_step: Float,

    /// `nx * ny` of the requested grid.
    pub grid_points: i64,

    /// Time step (in seconds) of the reference grid.
    pub ref_time_step: Float,

    /// `nx * ny` of the reference grid.
    pub ref_grid_points: i64,
}

impl CostVector {
    pub fn as_array(&self) -> [Float; 4] {
        [
            self.time_step,
            self.grid_points as Float,
            self.ref_time_step,
            self.ref_grid_points as Float,
        ]
    }

    /// Cost of the requested grid relative to the reference grid,
    /// assuming cost proportional to `grid_points / time_step`.
    pub fn relative_cost(&self) -> Float {
        (self.grid_points as Float / self.time_step)
            / (self.ref_grid_points as Float / self.ref_time_step)
    }
}

impl fmt::Display for CostVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.time_step, self.grid_points, self.ref_time_step, self.ref_grid_points
        )
    }
}

/// Estimates the cost of the grid requested by `config`.
///
/// Predefined grids and the reference grid are resolved from `table_source`
/// without quilting parameters, which cost estimation does not use.
pub fn estimate_cost(config: &ExptConfig, table_source: &Path) -> Result<CostVector, SetupError> {
    let opts = config.grid_options();

    let requested = select_grid(config, table_source, false)?;
    let grid = requested.params.generate(&opts)?;
    let time_step = requested.dt_atmos(config)?;

    log!(
        report_level(config),
        "Requested {} grid: {}",
        grid.method(),
        grid
    );

    debug!("Computing reference grid {}", REFERENCE_GRID_NAME);

    let mut ref_config = config.clone();
    ref_config.workflow.predef_grid_name = Some(REFERENCE_GRID_NAME.to_string());

    let reference = select_grid(&ref_config, table_source, false)?;
    let ref_grid = reference.params.generate(&opts)?;
    let ref_time_step = reference.dt_atmos(&ref_config)?;

    let cost = CostVector {
        time_step,
        grid_points: grid.grid_points(),
        ref_time_step,
        ref_grid_points: ref_grid.grid_points(),
    };

    log!(
        report_level(config),
        "Cost relative to {}: {:.3}",
        REFERENCE_GRID_NAME,
        cost.relative_cost()
    );

    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::{estimate_cost, CostVector};
    use crate::{
        configuration::ExptConfig,
        errors::{ConfigError, ErrorKind, PredefError, SetupError},
        Float,
    };
    use float_cmp::approx_eq;
    use std::path::{Path, PathBuf};

    fn table() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
    }

    fn custom_esg(nx: i64, ny: i64) -> ExptConfig {
        ExptConfig::new_from_str(&format!(
            "
workflow:
  GRID_GEN_METHOD: ESGgrid
task_make_grid:
  ESGgrid_LON_CTR: -97.5
  ESGgrid_LAT_CTR: 38.5
  ESGgrid_NX: {}
  ESGgrid_NY: {}
  ESGgrid_PAZI: 0.0
  ESGgrid_WIDE_HALO_WIDTH: 6
  ESGgrid_DELX: 3000.0
  ESGgrid_DELY: 3000.0
task_run_fcst:
  DT_ATMOS: 36
",
            nx, ny
        ))
        .unwrap()
    }

    #[test]
    fn predefined_grid() {
        let config = ExptConfig::new_from_str(
            "workflow:\n  PREDEF_GRID_NAME: RRFS_CONUS_3km\ntask_run_fcst:\n  DT_ATMOS: 36\n",
        )
        .unwrap();

        let cost = estimate_cost(&config, &table()).unwrap();

        assert_eq!(cost.as_array(), [36.0, 1987440.0, 36.0, 28689.0]);
        assert_eq!(cost.to_string(), "36 1987440 36 28689");
    }

    #[test]
    fn predefined_time_steps() {
        let config =
            ExptConfig::new_from_str("workflow:\n  PREDEF_GRID_NAME: RRFS_CONUS_3km\n").unwrap();

        let cost = estimate_cost(&config, &table()).unwrap();

        assert_eq!(cost.time_step, 36.0);
        assert_eq!(cost.ref_time_step, 40.0);
    }

    #[test]
    fn deterministic() {
        let config = custom_esg(200, 150);

        let first = estimate_cost(&config, &table()).unwrap();
        let second = estimate_cost(&config, &table()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.grid_points, 30000);
        assert_eq!(first.ref_grid_points, 28689);
    }

    #[test]
    fn grows_with_grid_points() {
        let small = estimate_cost(&custom_esg(100, 100), &table()).unwrap();
        let large = estimate_cost(&custom_esg(200, 100), &table()).unwrap();

        assert!(large.grid_points > small.grid_points);
        assert!(large.relative_cost() > small.relative_cost());
        assert_eq!(large.time_step, small.time_step);
    }

    #[test]
    fn relative_cost() {
        let cost = CostVector {
            time_step: 20.0,
            grid_points: 2000,
            ref_time_step: 40.0,
            ref_grid_points: 1000,
        };

        assert!(approx_eq!(Float, cost.relative_cost(), 4.0, ulps = 2));
    }

    #[test]
    fn missing_time_step() {
        let mut config = custom_esg(100, 100);
        config.task_run_fcst.dt_atmos = None;

        match estimate_cost(&config, &table()) {
            Err(SetupError::Config(ConfigError::MissingParameter(name))) => {
                assert_eq!(name, "DT_ATMOS")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_grid_parameter() {
        let mut config = custom_esg(100, 100);
        config.task_make_grid.esg_dely = None;

        let err = estimate_cost(&config, &table()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("ESGgrid_DELY"));
    }

    #[test]
    fn unknown_predefined_grid() {
        let config =
            ExptConfig::new_from_str("workflow:\n  PREDEF_GRID_NAME: RRFS_CONUS_1km\n").unwrap();

        assert!(matches!(
            estimate_cost(&config, &table()),
            Err(SetupError::Predef(PredefError::NotFound(_)))
        ));
    }

    #[test]
    fn invalid_grid() {
        let config = custom_esg(0, 100);

        let err = estimate_cost(&config, &table()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}
