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

//! Module responsible for reading the predefined grids table
//! and resolving parameters of a single predefined grid.
//!
//! The table is a YAML mapping from grid name to the grid parameters.
//! Parameters may be nested in groups, of which the `QUILTING` group
//! holds the write component (`WRTCMP_*`) parameters. A resolved grid
//! is always a single-level mapping: nested groups are flattened and
//! a parameter defined in more than one group is an error.

use crate::configuration::GridSection;
use crate::constants::{
    GRID_GEN_METHOD_KEY, PREDEF_GRID_PARAMS_FILE, QUILTING_GROUP, QUILTING_PREFIX,
};
use crate::errors::{ConfigError, PredefError};
use crate::grid::{Decomposition, GridGenMethod, GridParams};
use crate::Float;
use log::debug;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::{fs, path::Path};

/// Table of predefined grids, in the order of the source file.
#[derive(Clone, PartialEq, Debug)]
pub struct PredefGridTable {
    grids: Mapping,
}

impl PredefGridTable {
    /// Reads the table from a file, or from [`PREDEF_GRID_PARAMS_FILE`]
    /// inside the directory when `source` is a directory.
    pub fn new_from_file(source: &Path) -> Result<Self, PredefError> {
        let file_path = if source.is_dir() {
            source.join(PREDEF_GRID_PARAMS_FILE)
        } else {
            source.to_path_buf()
        };

        debug!("Reading predefined grids from {}", file_path.display());

        let data = fs::read(&file_path)?;
        let table: Value = serde_yaml::from_slice(data.as_slice())?;

        PredefGridTable::from_value(table)
    }

    pub fn new_from_str(data: &str) -> Result<Self, PredefError> {
        let table: Value = serde_yaml::from_str(data)?;

        PredefGridTable::from_value(table)
    }

    fn from_value(table: Value) -> Result<Self, PredefError> {
        match table {
            Value::Mapping(grids) => Ok(PredefGridTable { grids }),
            _ => Err(PredefError::InvalidParameter(
                "predefined grids table is not a mapping".to_string(),
            )),
        }
    }

    /// Names of all grids in the table.
    pub fn grid_names(&self) -> Vec<String> {
        self.grids
            .keys()
            .filter_map(|key| key.as_str().map(str::to_string))
            .collect()
    }

    /// Extracts and flattens parameters of the grid `grid_name`.
    ///
    /// Without quilting the `QUILTING` group is dropped, together with
    /// any other write component parameter.
    pub fn resolve(&self, grid_name: &str, quilting: bool) -> Result<PredefParams, PredefError> {
        let entry = match self.grids.get(grid_name) {
            Some(Value::Mapping(entry)) => entry,
            Some(_) => {
                return Err(PredefError::InvalidParameter(format!(
                    "entry of {} is not a mapping",
                    grid_name
                )))
            }
            None => return Err(PredefError::NotFound(grid_name.to_string())),
        };

        let entry: Mapping = entry
            .iter()
            .filter(|(key, _)| quilting || key.as_str() != Some(QUILTING_GROUP))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut values = flatten(grid_name, &entry)?;

        if !quilting {
            values = values
                .into_iter()
                .filter(|(key, _)| !key.as_str().map_or(false, is_quilting_key))
                .collect();
        }

        let params = PredefParams {
            name: grid_name.to_string(),
            values,
        };

        // every usable entry names its generator
        params.grid_gen_method()?;

        debug!(
            "Resolved {} parameters of predefined grid {}",
            params.len(),
            grid_name
        );

        Ok(params)
    }
}

/// Loads the table from `table_source` and resolves the grid `grid_name`.
///
/// The table is read anew on every call.
pub fn resolve_predef_grid(
    table_source: &Path,
    grid_name: &str,
    quilting_enabled: bool,
) -> Result<PredefParams, PredefError> {
    let table = PredefGridTable::new_from_file(table_source)?;

    table.resolve(grid_name, quilting_enabled)
}

fn is_quilting_key(key: &str) -> bool {
    key.starts_with(QUILTING_PREFIX)
}

/// Flattens nested groups of `mapping` into a single level, depth first.
fn flatten(root: &str, mapping: &Mapping) -> Result<Mapping, PredefError> {
    let mut flat = Mapping::new();
    let mut origins = FxHashMap::default();

    flatten_into(root, mapping, &mut flat, &mut origins)?;

    Ok(flat)
}

fn flatten_into(
    group: &str,
    mapping: &Mapping,
    flat: &mut Mapping,
    origins: &mut FxHashMap<String, String>,
) -> Result<(), PredefError> {
    for (key, value) in mapping {
        let key = key.as_str().ok_or_else(|| {
            PredefError::InvalidParameter(format!("non-string key {:?} in {}", key, group))
        })?;

        if let Value::Mapping(nested) = value {
            flatten_into(&format!("{}.{}", group, key), nested, flat, origins)?;
            continue;
        }

        if let Some(first) = origins.get(key) {
            return Err(PredefError::Conflict {
                key: key.to_string(),
                first: first.clone(),
                second: group.to_string(),
            });
        }

        origins.insert(key.to_string(), group.to_string());
        flat.insert(Value::String(key.to_string()), value.clone());
    }

    Ok(())
}

/// Flattened parameters of one predefined grid.
#[derive(Clone, PartialEq, Debug)]
pub struct PredefParams {
    name: String,
    values: Mapping,
}

impl PredefParams {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Parameter names in table order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().filter_map(Value::as_str)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.values
    }

    /// Typed value of parameter `key`, `None` when it is not set.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PredefError> {
        match self.values.get(key) {
            Some(value) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|err| PredefError::InvalidParameter(format!("{}: {}", key, err))),
            None => Ok(None),
        }
    }

    fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, PredefError> {
        self.get(key)?
            .ok_or_else(|| PredefError::MissingParameter(key.to_string()))
    }

    pub fn grid_gen_method(&self) -> Result<GridGenMethod, PredefError> {
        self.require(GRID_GEN_METHOD_KEY)
    }

    /// Time step (in seconds) recommended for this grid.
    pub fn dt_atmos(&self) -> Result<Option<Float>, PredefError> {
        self.get("DT_ATMOS")
    }

    /// Inputs of the grid generator named by `GRID_GEN_METHOD`.
    pub fn grid_params(&self) -> Result<GridParams, PredefError> {
        let method = self.grid_gen_method()?;

        let grid_values: Mapping = self
            .values
            .iter()
            .filter(|(key, _)| {
                key.as_str().map_or(false, |key| {
                    key.starts_with("ESGgrid_") || key.starts_with("GFDLgrid_")
                })
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let section: GridSection = serde_yaml::from_value(Value::Mapping(grid_values))?;

        section.grid_params(method).map_err(|err| match err {
            ConfigError::MissingParameter(key) => PredefError::MissingParameter(key),
            other => PredefError::InvalidParameter(other.to_string()),
        })
    }

    /// MPI layout of this grid, if the entry defines one.
    pub fn decomposition(&self) -> Result<Option<Decomposition>, PredefError> {
        let layout_x = self.get("LAYOUT_X")?;
        let layout_y = self.get("LAYOUT_Y")?;
        let blocksize = self.get("BLOCKSIZE")?;

        let write_groups = self.get("WRTCMP_write_groups")?;
        let write_tasks = self.get("WRTCMP_write_tasks_per_group")?;

        match (layout_x, layout_y, blocksize) {
            (Some(layout_x), Some(layout_y), Some(blocksize)) => Ok(Some(Decomposition {
                layout_x,
                layout_y,
                blocksize,
                write_component: write_groups.zip(write_tasks),
            })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PredefGridTable;
    use crate::{
        errors::PredefError,
        grid::{GridGenMethod, GridParams},
    };

    const TABLE: &str = r#"
"RRFS_CONUS_25km":
  GRID_GEN_METHOD: "ESGgrid"
  ESGgrid_LON_CTR: -97.5
  ESGgrid_LAT_CTR: 38.5
  ESGgrid_DELX: 25000.0
  ESGgrid_DELY: 25000.0
  ESGgrid_NX: 219
  ESGgrid_NY: 131
  ESGgrid_PAZI: 0.0
  ESGgrid_WIDE_HALO_WIDTH: 6
  DT_ATMOS: 40
  LAYOUT_X: 5
  LAYOUT_Y: 2
  BLOCKSIZE: 40
  QUILTING:
    WRTCMP_write_groups: 1
    WRTCMP_write_tasks_per_group: 2
    WRTCMP_output_grid: "lambert_conformal"
    WRTCMP_nx: 217
    WRTCMP_ny: 128

"NESTED_GROUPS":
  GRID_GEN_METHOD: "GFDLgrid"
  geometry:
    GFDLgrid_LON_T6_CTR: -97.5
    GFDLgrid_LAT_T6_CTR: 38.5
    GFDLgrid_NUM_CELLS: 96
    GFDLgrid_STRETCH_FAC: 1.4
    GFDLgrid_REFINE_RATIO: 3
    GFDLgrid_ISTART_OF_RGNL_DOM_ON_T6G: 13
    GFDLgrid_IEND_OF_RGNL_DOM_ON_T6G: 84
    GFDLgrid_JSTART_OF_RGNL_DOM_ON_T6G: 17
    GFDLgrid_JEND_OF_RGNL_DOM_ON_T6G: 80
  DT_ATMOS: 225

"CONFLICTING":
  GRID_GEN_METHOD: "ESGgrid"
  DT_ATMOS: 40
  QUILTING:
    WRTCMP_write_groups: 1
    DT_ATMOS: 60

"NO_METHOD":
  ESGgrid_NX: 10

"MISSING_NY":
  GRID_GEN_METHOD: "ESGgrid"
  ESGgrid_LON_CTR: -97.5
  ESGgrid_LAT_CTR: 38.5
  ESGgrid_DELX: 25000.0
  ESGgrid_DELY: 25000.0
  ESGgrid_NX: 219
  ESGgrid_PAZI: 0.0
  ESGgrid_WIDE_HALO_WIDTH: 6
"#;

    fn table() -> PredefGridTable {
        PredefGridTable::new_from_str(TABLE).unwrap()
    }

    #[test]
    fn grid_names() {
        assert_eq!(
            table().grid_names(),
            vec![
                "RRFS_CONUS_25km",
                "NESTED_GROUPS",
                "CONFLICTING",
                "NO_METHOD",
                "MISSING_NY"
            ]
        );
    }

    #[test]
    fn without_quilting() {
        let params = table().resolve("RRFS_CONUS_25km", false).unwrap();

        assert_eq!(params.name(), "RRFS_CONUS_25km");
        assert!(params.keys().all(|key| !key.starts_with("WRTCMP_")));
        assert!(!params.contains_key("QUILTING"));
        assert_eq!(params.len(), 13);
        assert_eq!(params.grid_gen_method().unwrap(), GridGenMethod::Esg);
        assert_eq!(params.dt_atmos().unwrap(), Some(40.0));
    }

    #[test]
    fn with_quilting() {
        let params = table().resolve("RRFS_CONUS_25km", true).unwrap();
        let keys: Vec<&str> = params.keys().collect();

        assert_eq!(keys.len(), 13 + 5);
        assert!(!keys.contains(&"QUILTING"));
        assert_eq!(keys[0], "GRID_GEN_METHOD");
        assert_eq!(keys[13], "WRTCMP_write_groups");
        assert_eq!(
            params.get::<String>("WRTCMP_output_grid").unwrap().as_deref(),
            Some("lambert_conformal")
        );

        let layout = params.decomposition().unwrap().unwrap();
        assert_eq!(layout.write_component, Some((1, 2)));
        assert_eq!(layout.pe_count(), 12);
    }

    #[test]
    fn nested_groups_are_flattened() {
        let params = table().resolve("NESTED_GROUPS", false).unwrap();

        assert!(params.contains_key("GFDLgrid_NUM_CELLS"));
        assert!(!params.contains_key("geometry"));
        assert!(params.decomposition().unwrap().is_none());

        match params.grid_params().unwrap() {
            GridParams::Gfdl(gfdl) => {
                assert_eq!(gfdl.res_t6, 96);
                assert_eq!(gfdl.refine_ratio, 3);
            }
            GridParams::Esg(_) => panic!("expected GFDLgrid parameters"),
        }
    }

    #[test]
    fn conflict_is_reported() {
        let result = table().resolve("CONFLICTING", true);

        match result {
            Err(PredefError::Conflict { key, first, second }) => {
                assert_eq!(key, "DT_ATMOS");
                assert_eq!(first, "CONFLICTING");
                assert_eq!(second, "CONFLICTING.QUILTING");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        // the conflicting group is dropped without quilting
        assert!(table().resolve("CONFLICTING", false).is_ok());
    }

    #[test]
    fn unknown_grid() {
        match table().resolve("RRFS_CONUS_1km", false) {
            Err(PredefError::NotFound(name)) => assert_eq!(name, "RRFS_CONUS_1km"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_method() {
        assert!(matches!(
            table().resolve("NO_METHOD", false),
            Err(PredefError::MissingParameter(_))
        ));
    }

    #[test]
    fn missing_grid_parameter() {
        let params = table().resolve("MISSING_NY", false).unwrap();

        match params.grid_params() {
            Err(PredefError::MissingParameter(key)) => assert_eq!(key, "ESGgrid_NY"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn table_is_not_mutated() {
        let table = table();
        let _ = table.resolve("RRFS_CONUS_25km", false).unwrap();
        let params = table.resolve("RRFS_CONUS_25km", true).unwrap();

        assert!(params.contains_key("WRTCMP_nx"));
    }
}
