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

use thiserror::Error;

/// Broad classification of setup failures.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ErrorKind {
    InvalidParameter,
    NotFound,
    Conflict,
    Io,
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Error while reading experiment config: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while resolving predefined grid: {0}")]
    Predef(#[from] PredefError),

    #[error("Error while generating grid parameters: {0}")]
    Grid(#[from] GridError),

    #[error("Error while generating cycle dates: {0}")]
    Cycle(#[from] CycleError),

    #[error("Error while creating ThreadPool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Cannot serialize output: {0}")]
    CantSerialize(#[from] serde_yaml::Error),
}

impl SetupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SetupError::Config(err) => err.kind(),
            SetupError::Predef(err) => err.kind(),
            SetupError::Grid(GridError::InvalidParameter(_)) => ErrorKind::InvalidParameter,
            SetupError::Cycle(CycleError::InvalidParameter(_)) => ErrorKind::InvalidParameter,
            SetupError::ThreadPool(_) | SetupError::CantSerialize(_) => ErrorKind::Io,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open config file: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize config file: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds: {0}")]
    OutOfBounds(&'static str),

    #[error("Required parameter {0} has not been set")]
    MissingParameter(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::CantOpenFile(_) | ConfigError::CantDeserialize(_) => ErrorKind::Io,
            ConfigError::OutOfBounds(_) => ErrorKind::InvalidParameter,
            ConfigError::MissingParameter(_) => ErrorKind::NotFound,
        }
    }
}

#[derive(Error, Debug)]
pub enum PredefError {
    #[error("Cannot open predefined grids table: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize predefined grids table: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("PREDEF_GRID_NAME = {0} not found in predefined grids table")]
    NotFound(String),

    #[error("Parameter {0} is missing from the predefined grid entry")]
    MissingParameter(String),

    #[error("Parameter {key} is defined in both {first} and {second}")]
    Conflict {
        key: String,
        first: String,
        second: String,
    },

    #[error("Invalid predefined grid parameter: {0}")]
    InvalidParameter(String),
}

impl PredefError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredefError::CantOpenFile(_) | PredefError::CantDeserialize(_) => ErrorKind::Io,
            PredefError::NotFound(_) | PredefError::MissingParameter(_) => ErrorKind::NotFound,
            PredefError::Conflict { .. } => ErrorKind::Conflict,
            PredefError::InvalidParameter(_) => ErrorKind::InvalidParameter,
        }
    }
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Grid parameter is invalid: {0}")]
    InvalidParameter(String),
}

#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Cycle parameter is invalid: {0}")]
    InvalidParameter(String),
}
