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

//! Module generating the date-hours of forecast cycles.

use crate::errors::CycleError;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::debug;

/// Format of cycle date-hours used by the workflow.
pub const CYCLE_FORMAT: &str = "%Y%m%d%H";

/// Days and hours of the forecast cycles.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CycleWindow {
    /// First day of cycles.
    pub start: NaiveDate,

    /// Last day of cycles (inclusive).
    pub end: NaiveDate,

    /// Hours of the day at which a cycle starts, in output order.
    pub cycle_hours: Vec<u32>,

    /// Hours between consecutive cycle days, a multiple of 24.
    pub increment_hours: i64,
}

impl CycleWindow {
    fn check_bounds(&self) -> Result<(), CycleError> {
        if self.increment_hours <= 0 || self.increment_hours % 24 != 0 {
            return Err(CycleError::InvalidParameter(format!(
                "increment must be a positive multiple of 24 hours, got {}",
                self.increment_hours
            )));
        }

        if self.cycle_hours.is_empty() {
            return Err(CycleError::InvalidParameter(
                "at least one cycle hour must be given".to_string(),
            ));
        }

        if let Some(hour) = self.cycle_hours.iter().find(|&&hour| hour > 23) {
            return Err(CycleError::InvalidParameter(format!(
                "cycle hour must be between 0 and 23, got {}",
                hour
            )));
        }

        if self.end < self.start {
            return Err(CycleError::InvalidParameter(format!(
                "end date {} is before start date {}",
                self.end, self.start
            )));
        }

        Ok(())
    }

    /// Cycle date-hours formatted as `YYYYMMDDHH`.
    pub fn cycle_strings(&self) -> Result<Vec<String>, CycleError> {
        Ok(format_cycle_dates(&generate_cycle_dates(self)?))
    }
}

/// Generates all cycle date-hours of `window`, day by day.
pub fn generate_cycle_dates(window: &CycleWindow) -> Result<Vec<NaiveDateTime>, CycleError> {
    window.check_bounds()?;

    let step = Duration::try_days(window.increment_hours / 24).ok_or_else(|| {
        CycleError::InvalidParameter(format!(
            "cycle increment of {} hours is too large",
            window.increment_hours
        ))
    })?;

    let mut cycles = vec![];
    let mut day = window.start;

    while day <= window.end {
        for &hour in &window.cycle_hours {
            let cycle = day.and_hms_opt(hour, 0, 0).ok_or_else(|| {
                CycleError::InvalidParameter(format!("invalid cycle {} {}:00", day, hour))
            })?;
            cycles.push(cycle);
        }

        day = match day.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }

    debug!(
        "Generated {} cycles from {} to {}",
        cycles.len(),
        window.start,
        window.end
    );

    Ok(cycles)
}

pub fn format_cycle_dates(cycles: &[NaiveDateTime]) -> Vec<String> {
    cycles
        .iter()
        .map(|cycle| cycle.format(CYCLE_FORMAT).to_string())
        .collect()
}

/// Date-hours from `first` to `last` inclusive, every `interval`.
pub fn cycles_between(
    first: NaiveDateTime,
    last: NaiveDateTime,
    interval: Duration,
) -> Result<Vec<NaiveDateTime>, CycleError> {
    if interval <= Duration::zero() {
        return Err(CycleError::InvalidParameter(format!(
            "cycle interval must be positive, got {}",
            interval
        )));
    }

    let mut cycles = vec![];
    let mut cycle = first;

    while cycle <= last {
        cycles.push(cycle);

        cycle = match cycle.checked_add_signed(interval) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(cycles)
}
