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

//! Module containing constants used by the grid setup.

use crate::Float;

///Earth radius (in meters) assumed by the grid generation programs
pub const RADIUS_EARTH: Float = 6_371_200.0;

///Degrees in one radian
#[allow(clippy::excessive_precision)]
pub const DEGS_PER_RADIAN: Float = 57.295_779_513_082_320_876_79;

///Stretch factor of the globally-equivalent grid of ESGgrid domains.
///
///It cannot be exactly `1.0` because the orography filtering program
///assumes `nx == ny` on uniform cubed-sphere tiles.
pub const ESG_STRETCH_FACTOR: Float = 0.999;

///Halo width (in cells) of the grid without halo
pub const NH0: i64 = 0;

///Halo width (in cells) of the grid used by the lateral boundary conditions
pub const NH3: i64 = 3;

///Widest halo width (in cells) needed by the forecast model
pub const NH4: i64 = 4;

///Name of the grid all cost estimates are normalized against
pub const REFERENCE_GRID_NAME: &str = "RRFS_CONUS_25km";

///File name of the predefined grids lookup table
pub const PREDEF_GRID_PARAMS_FILE: &str = "predef_grid_params.yaml";

///Key of the output quilting group in predefined grid entries
pub const QUILTING_GROUP: &str = "QUILTING";

///Prefix of every write component (quilting) parameter
pub const QUILTING_PREFIX: &str = "WRTCMP_";

///Key of the grid generation method in predefined grid entries
pub const GRID_GEN_METHOD_KEY: &str = "GRID_GEN_METHOD";
