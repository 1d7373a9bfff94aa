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

//! Limited Area Model Grid Setup (lamgrid) derives the geometry of
//! a regional grid for a limited-area numerical weather prediction
//! workflow and estimates how expensive a forecast on that grid is.
//!
//! The grid is either one of the predefined grids (read from
//! `predef_grid_params.yaml`) or a custom grid defined in the
//! experiment configuration, generated with one of two methods:
//! Extended Schmidt Gnomonic (`ESGgrid`) or a regional nest on
//! a stretched cubed-sphere tile (`GFDLgrid`).
//!
//! Cost of a forecast is reported as time step and number of grid
//! points of the requested grid next to the same values of the
//! reference grid `RRFS_CONUS_25km`.

pub mod configuration;
pub mod constants;
pub mod cost;
pub mod cycles;
pub mod errors;
pub mod grid;
pub mod predef;
pub mod setup;


pub type Float = f64;
