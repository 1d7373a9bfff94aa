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

//! Domain decomposition of the forecast model over MPI tasks.

use crate::errors::GridError;

/// MPI layout of the forecast and (optionally) of the write component.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Decomposition {
    pub layout_x: i64,
    pub layout_y: i64,

    /// Number of columns in each physics block.
    pub blocksize: i64,

    /// Write component size as `(write_groups, write_tasks_per_group)`,
    /// present only when output quilting is used.
    pub write_component: Option<(i64, i64)>,
}

impl Decomposition {
    /// Checks that the layout can decompose a grid of `nx` by `ny` cells.
    pub fn validate(&self, nx: i64, ny: i64) -> Result<(), GridError> {
        if self.layout_x < 1 || self.layout_y < 1 {
            return Err(GridError::InvalidParameter(format!(
                "LAYOUT_X and LAYOUT_Y must be positive, got {} and {}",
                self.layout_x, self.layout_y
            )));
        }

        if self.blocksize < 1 {
            return Err(GridError::InvalidParameter(format!(
                "BLOCKSIZE must be positive, got {}",
                self.blocksize
            )));
        }

        if self.layout_x > nx || self.layout_y > ny {
            return Err(GridError::InvalidParameter(format!(
                "layout {}x{} has more tasks than the {}x{} grid has cells",
                self.layout_x, self.layout_y, nx, ny
            )));
        }

        if let Some((groups, tasks)) = self.write_component {
            if groups < 1 || tasks < 1 {
                return Err(GridError::InvalidParameter(format!(
                    "WRTCMP_write_groups and WRTCMP_write_tasks_per_group \
                     must be positive, got {} and {}",
                    groups, tasks
                )));
            }
        }

        Ok(())
    }

    /// Total number of MPI tasks of one ensemble member.
    pub fn pe_count(&self) -> i64 {
        let write_tasks = self
            .write_component
            .map_or(0, |(groups, tasks)| groups * tasks);

        self.layout_x * self.layout_y + write_tasks
    }

    /// Shape of the largest subdomain handled by a single task.
    pub fn subdomain_shape(&self, nx: i64, ny: i64) -> (i64, i64) {
        (div_ceil(nx, self.layout_x), div_ceil(ny, self.layout_y))
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}

#[cfg(test)]
mod tests {
    use super::Decomposition;

    fn conus_3km() -> Decomposition {
        Decomposition {
            layout_x: 30,
            layout_y: 16,
            blocksize: 32,
            write_component: None,
        }
    }

    #[test]
    fn pe_count() {
        let mut layout = conus_3km();
        assert_eq!(layout.pe_count(), 480);

        layout.write_component = Some((1, 32));
        assert_eq!(layout.pe_count(), 512);
    }

    #[test]
    fn uneven_subdomains() {
        let layout = conus_3km();
        assert!(layout.validate(1820, 1092).is_ok());
        assert_eq!(layout.subdomain_shape(1820, 1092), (61, 69));
    }

    #[test]
    fn too_many_tasks() {
        let layout = Decomposition {
            layout_x: 40,
            ..conus_3km()
        };
        assert!(layout.validate(30, 30).is_err());
    }

    #[test]
    fn non_positive_values() {
        for layout in [
            Decomposition {
                layout_x: 0,
                ..conus_3km()
            },
            Decomposition {
                blocksize: -1,
                ..conus_3km()
            },
            Decomposition {
                write_component: Some((1, 0)),
                ..conus_3km()
            },
        ] {
            assert!(layout.validate(1820, 1092).is_err());
        }
    }
}
