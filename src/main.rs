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

//! Command line interface of lamgrid.
//!
//! Results are written to stdout, log messages to stderr.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use env_logger::Env;
use lamgrid::configuration::ExptConfig;
use lamgrid::cost::{estimate_cost, CostVector};
use lamgrid::cycles::CycleWindow;
use lamgrid::errors::SetupError;
use lamgrid::predef::{resolve_predef_grid, PredefGridTable};
use lamgrid::setup::describe_grid;
use log::{debug, error, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::{path::PathBuf, process};

#[derive(Parser)]
#[command(name = "lamgrid")]
#[command(about = "Regional grid setup and forecast cost estimation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate cost of forecasts relative to the reference grid
    Cost {
        /// Experiment configuration files
        #[arg(long, required = true, num_args = 1..)]
        cfg: Vec<PathBuf>,

        /// Directory with the predefined grids table
        #[arg(long, env = "LAMGRID_PARM_DIR", default_value = "data")]
        parm_dir: PathBuf,

        /// Number of threads, all available when 0
        #[arg(long, default_value_t = 0)]
        threads: usize,
    },

    /// Print parameters of a predefined grid
    Predef {
        /// Directory with the predefined grids table
        #[arg(long, env = "LAMGRID_PARM_DIR", default_value = "data")]
        parm_dir: PathBuf,

        /// Name of the predefined grid
        #[arg(long)]
        grid: String,

        /// Keep write component parameters
        #[arg(long)]
        quilting: bool,
    },

    /// List predefined grids
    List {
        /// Directory with the predefined grids table
        #[arg(long, env = "LAMGRID_PARM_DIR", default_value = "data")]
        parm_dir: PathBuf,
    },

    /// Print derived parameters of the configured grid
    Grid {
        /// Experiment configuration file
        #[arg(long)]
        cfg: PathBuf,

        /// Directory with the predefined grids table
        #[arg(long, env = "LAMGRID_PARM_DIR", default_value = "data")]
        parm_dir: PathBuf,
    },

    /// Print cycle date-hours as YYYYMMDDHH
    Cycles {
        /// First day of cycles (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of cycles (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Comma separated hours of the day
        #[arg(long, value_delimiter = ',', required = true)]
        hours: Vec<u32>,

        /// Hours between cycle days
        #[arg(long, default_value_t = 24)]
        incr: i64,
    },
}

/// The main program function.
///
/// Logger is initialised before anything else so that
/// errors of argument handling can be reported.
fn main() {
    #[cfg(not(feature = "debug"))]
    let logger_env = Env::new().filter_or("LAMGRID_LOG_LEVEL", "info");

    #[cfg(feature = "debug")]
    let logger_env = Env::new().filter_or("LAMGRID_LOG_LEVEL", "debug");

    env_logger::Builder::from_env(logger_env)
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli.command) {
        error!("lamgrid failed with error: {}", err);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), SetupError> {
    match command {
        Commands::Cost {
            cfg,
            parm_dir,
            threads,
        } => {
            debug!("Setting up ThreadPool");
            let threadpool = ThreadPoolBuilder::new().num_threads(threads).build()?;

            let costs: Vec<CostVector> = threadpool.install(|| {
                cfg.par_iter()
                    .map(|path| -> Result<CostVector, SetupError> {
                        debug!("Reading configuration from {}", path.display());
                        let config = ExptConfig::new_from_file(path)?;
                        estimate_cost(&config, &parm_dir)
                    })
                    .collect::<Result<Vec<_>, _>>()
            })?;

            for cost in costs {
                println!("{}", cost);
            }
        }
        Commands::Predef {
            parm_dir,
            grid,
            quilting,
        } => {
            let params = resolve_predef_grid(&parm_dir, &grid, quilting)?;
            print!("{}", serde_yaml::to_string(params.as_mapping())?);
        }
        Commands::List { parm_dir } => {
            let table = PredefGridTable::new_from_file(&parm_dir)?;

            for name in table.grid_names() {
                println!("{}", name);
            }
        }
        Commands::Grid { cfg, parm_dir } => {
            let config = ExptConfig::new_from_file(&cfg)?;
            let (grid, decomposition) = describe_grid(&config, &parm_dir)?;

            print!("{}", serde_yaml::to_string(&grid)?);

            match decomposition {
                Some(decomposition) => info!(
                    "Forecast needs {} MPI tasks per member",
                    decomposition.pe_count()
                ),
                None => info!("LAYOUT_X, LAYOUT_Y and BLOCKSIZE are not all set"),
            }
        }
        Commands::Cycles {
            start,
            end,
            hours,
            incr,
        } => {
            let window = CycleWindow {
                start,
                end,
                cycle_hours: hours,
                increment_hours: incr,
            };

            for cycle in window.cycle_strings()? {
                println!("{}", cycle);
            }
        }
    }

    Ok(())
}
