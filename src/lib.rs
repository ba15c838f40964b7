// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! A library for producing weekly work/rest rosters for a fleet of agents.
//!
//! The total number of on-duty agents at every five minute slot of the
//! planning horizon is made to track a prescribed target staffing curve
//! while each agent's sequence of daily shifts stays inside the language of
//! an agent-specific regular expression, and the agents' start-of-day times
//! stay comfortable across consecutive working days.
//!
//! The search is a simulated annealing run over the cross product of the
//! per-agent shift languages. Each agent's language is compiled (through
//! the `roster-redfa` crate) into a minimal deterministic finite automaton
//! that can sample words uniformly, resample the last sampled path and
//! refine a path against a fitness hint. The annealer proposes one-agent
//! mutations drawn from those samplers and accepts them under the
//! Metropolis rule against an energy mixing the staffing error and the
//! comfort dispersion.
//!
//! A typical run goes through the [`planner::StaffPlanner`] facade:
//! construct a [`plan::Plan`] from a [`target::Target`] and an agent list,
//! register a regular expression over [`shift::Shift`] for every agent,
//! then `run()` a week.
//!
//! The library does not parse input, write files or install a logger;
//! those belong to the caller. Progress of the calibration and annealing
//! phases is reported through the `log` facade.

#![deny(missing_docs)]

#[macro_use]
extern crate failure;

#[macro_use]
extern crate log;

extern crate rand;
extern crate roster_redfa;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;

pub mod anneal;
pub mod energy;
pub mod plan;
pub mod planner;
pub mod shift;
pub mod state;
pub mod target;

mod error;

pub use error::{Error, Result};
pub use roster_redfa::RegExp;

/// Slot length in minutes (fixed to 5 minutes).
pub const SLOT_LENGTH: u32 = 5;

/// Number of 5 minute slots in a day.
pub const SLOTS_DAY: usize = (24 * 60 / SLOT_LENGTH) as usize;

/// Annealing iteration limit for each agent day.
pub const NOVER: u32 = 100;
