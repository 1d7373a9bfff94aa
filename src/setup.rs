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

//! Module selecting the grid requested by the experiment configuration.
//!
//! A predefined grid takes precedence over the custom grid parameters.
//! Time step and MPI layout set by the user override the values
//! recommended for the predefined grid.

use crate::configuration::ExptConfig;
use crate::errors::{ConfigError, SetupError};
use crate::grid::{Decomposition, GridParams, GridSpec};
use crate::predef::{resolve_predef_grid, PredefParams};
use crate::Float;
use log::{debug, log, Level};
use std::path::Path;

/// Grid parameters requested by the configuration together with
/// the predefined grid entry they came from, if any.
#[derive(Clone, PartialEq, Debug)]
pub struct GridSelection {
    pub params: GridParams,
    pub predef: Option<PredefParams>,
}

impl GridSelection {
    /// Time step of the forecast, from configuration or from the predefined grid.
    pub fn dt_atmos(&self, config: &ExptConfig) -> Result<Float, SetupError> {
        if let Some(dt_atmos) = config.task_run_fcst.dt_atmos {
            return Ok(dt_atmos);
        }

        if let Some(predef) = &self.predef {
            if let Some(dt_atmos) = predef.dt_atmos()? {
                return Ok(dt_atmos);
            }
        }

        Err(ConfigError::MissingParameter("DT_ATMOS".to_string()).into())
    }

    /// MPI layout of the forecast, when it is fully specified.
    pub fn decomposition(&self, config: &ExptConfig) -> Result<Option<Decomposition>, SetupError> {
        let fcst = &config.task_run_fcst;

        let predef_layout = match &self.predef {
            Some(predef) => predef.decomposition()?,
            None => None,
        };

        let layout_x = fcst.layout_x.or(predef_layout.map(|d| d.layout_x));
        let layout_y = fcst.layout_y.or(predef_layout.map(|d| d.layout_y));
        let blocksize = fcst.blocksize.or(predef_layout.map(|d| d.blocksize));

        let write_component = if fcst.quilting {
            predef_layout.and_then(|d| d.write_component)
        } else {
            None
        };

        match (layout_x, layout_y, blocksize) {
            (Some(layout_x), Some(layout_y), Some(blocksize)) => Ok(Some(Decomposition {
                layout_x,
                layout_y,
                blocksize,
                write_component,
            })),
            _ => Ok(None),
        }
    }
}

/// Collects parameters of the grid requested by `config`.
pub fn select_grid(
    config: &ExptConfig,
    table_source: &Path,
    quilting: bool,
) -> Result<GridSelection, SetupError> {
    match &config.workflow.predef_grid_name {
        Some(grid_name) => {
            debug!("Using predefined grid {}", grid_name);

            let predef = resolve_predef_grid(table_source, grid_name, quilting)?;
            debug!(
                "Predefined grid {} has {} parameters",
                predef.name(),
                predef.len()
            );

            Ok(GridSelection {
                params: predef.grid_params()?,
                predef: Some(predef),
            })
        }
        None => {
            let method = config
                .workflow
                .grid_gen_method
                .ok_or_else(|| ConfigError::MissingParameter("GRID_GEN_METHOD".to_string()))?;

            debug!("Using custom {} grid", method);

            Ok(GridSelection {
                params: config.task_make_grid.grid_params(method)?,
                predef: None,
            })
        }
    }
}

/// Derives the requested grid and checks its MPI layout.
pub fn describe_grid(
    config: &ExptConfig,
    table_source: &Path,
) -> Result<(GridSpec, Option<Decomposition>), SetupError> {
    let selection = select_grid(config, table_source, config.task_run_fcst.quilting)?;
    let grid = selection.params.generate(&config.grid_options())?;

    let decomposition = selection.decomposition(config)?;

    if let Some(decomposition) = &decomposition {
        decomposition.validate(grid.nx(), grid.ny())?;

        let (sub_nx, sub_ny) = decomposition.subdomain_shape(grid.nx(), grid.ny());

        log!(
            report_level(config),
            "Layout {}x{} uses {} tasks with subdomains up to {}x{} cells",
            decomposition.layout_x,
            decomposition.layout_y,
            decomposition.pe_count(),
            sub_nx,
            sub_ny
        );
    }

    Ok((grid, decomposition))
}

/// Level at which derived parameters are reported.
pub(crate) fn report_level(config: &ExptConfig) -> Level {
    if config.workflow.verbose {
        Level::Info
    } else {
        Level::Debug
    }
}

#[cfg(test)]
mod tests {
    use super::{describe_grid, select_grid};
    use crate::{configuration::ExptConfig, errors::SetupError, grid::GridGenMethod};
    use std::path::{Path, PathBuf};

    fn table() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
    }

    #[test]
    fn predefined_layout_with_override() {
        let config = ExptConfig::new_from_str(
            "workflow:\n  PREDEF_GRID_NAME: RRFS_CONUS_25km\ntask_run_fcst:\n  LAYOUT_X: 10\n",
        )
        .unwrap();

        let (grid, layout) = describe_grid(&config, &table()).unwrap();
        let layout = layout.unwrap();

        assert_eq!(grid.method(), GridGenMethod::Esg);
        assert_eq!(layout.layout_x, 10);
        assert_eq!(layout.layout_y, 2);
        assert_eq!(layout.write_component, None);
    }

    #[test]
    fn quilting_adds_write_tasks() {
        let config = ExptConfig::new_from_str(
            "workflow:\n  PREDEF_GRID_NAME: RRFS_CONUS_25km\ntask_run_fcst:\n  QUILTING: true\n",
        )
        .unwrap();

        let (_, layout) = describe_grid(&config, &table()).unwrap();
        let layout = layout.unwrap();

        assert_eq!(layout.write_component, Some((1, 2)));
        assert_eq!(layout.pe_count(), 5 * 2 + 2);
    }

    #[test]
    fn custom_grid_without_time_step() {
        let config = ExptConfig::new_from_str(
            "
workflow:
  GRID_GEN_METHOD: GFDLgrid
task_make_grid:
  GFDLgrid_LON_T6_CTR: -97.5
  GFDLgrid_LAT_T6_CTR: 38.5
  GFDLgrid_NUM_CELLS: 96
  GFDLgrid_STRETCH_FAC: 1.4
  GFDLgrid_REFINE_RATIO: 3
  GFDLgrid_ISTART_OF_RGNL_DOM_ON_T6G: 13
  GFDLgrid_IEND_OF_RGNL_DOM_ON_T6G: 84
  GFDLgrid_JSTART_OF_RGNL_DOM_ON_T6G: 17
  GFDLgrid_JEND_OF_RGNL_DOM_ON_T6G: 80
",
        )
        .unwrap();

        let selection = select_grid(&config, &table(), false).unwrap();
        assert!(selection.predef.is_none());
        assert!(matches!(
            selection.dt_atmos(&config),
            Err(SetupError::Config(_))
        ));
        assert!(selection.decomposition(&config).unwrap().is_none());
    }

    #[test]
    fn layout_too_large() {
        let config = ExptConfig::new_from_str(
            "workflow:\n  PREDEF_GRID_NAME: RRFS_CONUS_25km\ntask_run_fcst:\n  LAYOUT_Y: 200\n",
        )
        .unwrap();

        assert!(matches!(
            describe_grid(&config, &table()),
            Err(SetupError::Grid(_))
        ));
    }
}
