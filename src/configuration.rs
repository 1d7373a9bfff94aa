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

//! Module responsible for parsing and checking the experiment configuration.
//!
//! The configuration file uses [YAML](https://en.wikipedia.org/wiki/YAML)
//! and `serde` to enforce strong typing and automatic type checking.
//! Sections and keys follow the layout of the workflow's user config
//! (`user`, `workflow`, `task_make_grid`, `task_run_fcst`, `constants`),
//! and unknown keys are rejected when the file is read.
//!
//! Only the keys needed for grid setup and cost estimation are known here.

use crate::constants::{DEGS_PER_RADIAN, NH0, NH3, NH4, RADIUS_EARTH};
use crate::errors::ConfigError;
use crate::grid::{
    EarthConstants, EsgParams, GfdlParams, GridGenMethod, GridOptions, GridParams, RunEnvir,
};
use crate::Float;
use serde::Deserialize;
use std::{fs, path::Path};

/// Fields of the `user` section.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    /// _(Optional)_ Environment in which the workflow runs,
    /// `community` or `nco`. Defaults to `community`.
    #[serde(rename = "RUN_ENVIR", default)]
    pub run_envir: RunEnvir,
}

/// Fields of the `workflow` section.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Workflow {
    /// _(Optional)_ Name of the predefined grid. When set, grid parameters
    /// are taken from the predefined grids table.
    #[serde(rename = "PREDEF_GRID_NAME", default)]
    pub predef_grid_name: Option<String>,

    /// _(Optional)_ Grid generation method of a custom grid.
    ///
    /// Required when `PREDEF_GRID_NAME` is not set.
    #[serde(rename = "GRID_GEN_METHOD", default)]
    pub grid_gen_method: Option<GridGenMethod>,

    /// _(Optional)_ Report derived grid parameters at info level.
    /// Defaults to `false`.
    #[serde(rename = "VERBOSE", default)]
    pub verbose: bool,
}

/// Fields of the `task_make_grid` section.
///
/// All fields are optional, but the ones used by the selected
/// grid generation method must be set.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridSection {
    #[serde(rename = "ESGgrid_LON_CTR", default)]
    pub esg_lon_ctr: Option<Float>,

    #[serde(rename = "ESGgrid_LAT_CTR", default)]
    pub esg_lat_ctr: Option<Float>,

    #[serde(rename = "ESGgrid_NX", default)]
    pub esg_nx: Option<i64>,

    #[serde(rename = "ESGgrid_NY", default)]
    pub esg_ny: Option<i64>,

    #[serde(rename = "ESGgrid_PAZI", default)]
    pub esg_pazi: Option<Float>,

    #[serde(rename = "ESGgrid_WIDE_HALO_WIDTH", default)]
    pub esg_wide_halo_width: Option<i64>,

    #[serde(rename = "ESGgrid_DELX", default)]
    pub esg_delx: Option<Float>,

    #[serde(rename = "ESGgrid_DELY", default)]
    pub esg_dely: Option<Float>,

    #[serde(rename = "GFDLgrid_LON_T6_CTR", default)]
    pub gfdl_lon_t6_ctr: Option<Float>,

    #[serde(rename = "GFDLgrid_LAT_T6_CTR", default)]
    pub gfdl_lat_t6_ctr: Option<Float>,

    #[serde(rename = "GFDLgrid_NUM_CELLS", default)]
    pub gfdl_num_cells: Option<i64>,

    #[serde(rename = "GFDLgrid_STRETCH_FAC", default)]
    pub gfdl_stretch_fac: Option<Float>,

    #[serde(rename = "GFDLgrid_REFINE_RATIO", default)]
    pub gfdl_refine_ratio: Option<i64>,

    #[serde(rename = "GFDLgrid_ISTART_OF_RGNL_DOM_ON_T6G", default)]
    pub gfdl_istart_of_rgnl_dom_on_t6g: Option<i64>,

    #[serde(rename = "GFDLgrid_IEND_OF_RGNL_DOM_ON_T6G", default)]
    pub gfdl_iend_of_rgnl_dom_on_t6g: Option<i64>,

    #[serde(rename = "GFDLgrid_JSTART_OF_RGNL_DOM_ON_T6G", default)]
    pub gfdl_jstart_of_rgnl_dom_on_t6g: Option<i64>,

    #[serde(rename = "GFDLgrid_JEND_OF_RGNL_DOM_ON_T6G", default)]
    pub gfdl_jend_of_rgnl_dom_on_t6g: Option<i64>,
}

impl GridSection {
    /// Collects the inputs of the generator for `method`,
    /// failing on the first parameter that is not set.
    pub fn grid_params(&self, method: GridGenMethod) -> Result<GridParams, ConfigError> {
        match method {
            GridGenMethod::Esg => Ok(GridParams::Esg(EsgParams {
                lon_ctr: required(self.esg_lon_ctr, "ESGgrid_LON_CTR")?,
                lat_ctr: required(self.esg_lat_ctr, "ESGgrid_LAT_CTR")?,
                nx: required(self.esg_nx, "ESGgrid_NX")?,
                ny: required(self.esg_ny, "ESGgrid_NY")?,
                pazi: required(self.esg_pazi, "ESGgrid_PAZI")?,
                halo_width: required(self.esg_wide_halo_width, "ESGgrid_WIDE_HALO_WIDTH")?,
                delx: required(self.esg_delx, "ESGgrid_DELX")?,
                dely: required(self.esg_dely, "ESGgrid_DELY")?,
            })),
            GridGenMethod::Gfdl => Ok(GridParams::Gfdl(GfdlParams {
                lon_t6_ctr: required(self.gfdl_lon_t6_ctr, "GFDLgrid_LON_T6_CTR")?,
                lat_t6_ctr: required(self.gfdl_lat_t6_ctr, "GFDLgrid_LAT_T6_CTR")?,
                res_t6: required(self.gfdl_num_cells, "GFDLgrid_NUM_CELLS")?,
                stretch_factor: required(self.gfdl_stretch_fac, "GFDLgrid_STRETCH_FAC")?,
                refine_ratio: required(self.gfdl_refine_ratio, "GFDLgrid_REFINE_RATIO")?,
                istart_t7: required(
                    self.gfdl_istart_of_rgnl_dom_on_t6g,
                    "GFDLgrid_ISTART_OF_RGNL_DOM_ON_T6G",
                )?,
                iend_t7: required(
                    self.gfdl_iend_of_rgnl_dom_on_t6g,
                    "GFDLgrid_IEND_OF_RGNL_DOM_ON_T6G",
                )?,
                jstart_t7: required(
                    self.gfdl_jstart_of_rgnl_dom_on_t6g,
                    "GFDLgrid_JSTART_OF_RGNL_DOM_ON_T6G",
                )?,
                jend_t7: required(
                    self.gfdl_jend_of_rgnl_dom_on_t6g,
                    "GFDLgrid_JEND_OF_RGNL_DOM_ON_T6G",
                )?,
            })),
        }
    }
}

/// Fields of the `task_run_fcst` section.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Forecast {
    /// _(Optional)_ Time step (in seconds) of the forecast model.
    ///
    /// Overrides the value of the predefined grid. Must be positive.
    #[serde(rename = "DT_ATMOS", default)]
    pub dt_atmos: Option<Float>,

    /// _(Optional)_ Number of MPI tasks in x direction.
    #[serde(rename = "LAYOUT_X", default)]
    pub layout_x: Option<i64>,

    /// _(Optional)_ Number of MPI tasks in y direction.
    #[serde(rename = "LAYOUT_Y", default)]
    pub layout_y: Option<i64>,

    /// _(Optional)_ Number of columns in each physics block.
    #[serde(rename = "BLOCKSIZE", default)]
    pub blocksize: Option<i64>,

    /// _(Optional)_ Use the write component (output quilting).
    /// Defaults to `false`.
    #[serde(rename = "QUILTING", default)]
    pub quilting: bool,
}

impl Forecast {
    /// Checks if time step and layout are above limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if let Some(dt_atmos) = self.dt_atmos {
            if !(dt_atmos > 0.0 && dt_atmos.is_finite()) {
                return Err(ConfigError::OutOfBounds("DT_ATMOS must be positive"));
            }
        }

        for value in [self.layout_x, self.layout_y, self.blocksize].into_iter().flatten() {
            if value < 1 {
                return Err(ConfigError::OutOfBounds(
                    "LAYOUT_X, LAYOUT_Y and BLOCKSIZE must be positive",
                ));
            }
        }

        Ok(())
    }
}

/// Fields of the `constants` section.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Constants {
    /// _(Optional)_ Earth radius in meters. Defaults to `6371200.0`.
    #[serde(rename = "RADIUS_EARTH")]
    pub radius_earth: Float,

    #[serde(rename = "DEGS_PER_RADIAN")]
    pub degs_per_radian: Float,

    #[serde(rename = "NH0")]
    pub nh0: i64,

    #[serde(rename = "NH3")]
    pub nh3: i64,

    /// _(Optional)_ Widest halo needed by the forecast model. Defaults to `4`.
    #[serde(rename = "NH4")]
    pub nh4: i64,
}

impl Constants {
    /// Checks if constants have physically meaningful values.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if !(self.radius_earth > 0.0 && self.radius_earth.is_finite()) {
            return Err(ConfigError::OutOfBounds("RADIUS_EARTH must be positive"));
        }

        if !(self.degs_per_radian > 0.0 && self.degs_per_radian.is_finite()) {
            return Err(ConfigError::OutOfBounds("DEGS_PER_RADIAN must be positive"));
        }

        if self.nh0 < 0 || self.nh3 < self.nh0 || self.nh4 < self.nh3 {
            return Err(ConfigError::OutOfBounds(
                "halo widths must satisfy 0 <= NH0 <= NH3 <= NH4",
            ));
        }

        Ok(())
    }
}

impl Default for Constants {
    fn default() -> Self {
        Constants {
            radius_earth: RADIUS_EARTH,
            degs_per_radian: DEGS_PER_RADIAN,
            nh0: NH0,
            nh3: NH3,
            nh4: NH4,
        }
    }
}

/// Main config structure representing the sections of
/// the experiment configuration file.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExptConfig {
    #[serde(default)]
    pub user: User,

    #[serde(default)]
    pub workflow: Workflow,

    #[serde(default)]
    pub task_make_grid: GridSection,

    #[serde(default)]
    pub task_run_fcst: Forecast,

    #[serde(default)]
    pub constants: Constants,
}

impl ExptConfig {
    /// Config structure constructor, responsible for
    /// reading, deserializing and checking configuration.
    pub fn new_from_file(file_path: &Path) -> Result<ExptConfig, ConfigError> {
        let data = fs::read(file_path)?;
        let config: ExptConfig = serde_yaml::from_slice(data.as_slice())?;

        config.check_bounds()?;

        Ok(config)
    }

    /// Same as [`ExptConfig::new_from_file`] but for configuration already in memory.
    pub fn new_from_str(data: &str) -> Result<ExptConfig, ConfigError> {
        let config: ExptConfig = serde_yaml::from_str(data)?;

        config.check_bounds()?;

        Ok(config)
    }

    fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.workflow.predef_grid_name.is_none() && self.workflow.grid_gen_method.is_none() {
            return Err(ConfigError::MissingParameter(
                "PREDEF_GRID_NAME or GRID_GEN_METHOD".to_string(),
            ));
        }

        self.task_run_fcst.check_bounds()?;
        self.constants.check_bounds()?;

        Ok(())
    }

    /// Options of the grid generators derived from `constants` and `user` sections.
    pub fn grid_options(&self) -> GridOptions {
        GridOptions {
            earth: EarthConstants {
                radius: self.constants.radius_earth,
                degs_per_radian: self.constants.degs_per_radian,
            },
            nh4: self.constants.nh4,
            run_envir: self.user.run_envir,
        }
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingParameter(name.to_string()))
}
