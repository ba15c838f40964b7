// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

use std::result;

/// The error type for the roster planning operations.
///
/// Every variant is a user-recoverable invalid argument. Invariant
/// violations (a dangling dfa state reached during sampling, a letter
/// extracted from a non-literal expression) are programmer bugs and panic
/// instead of surfacing here.
#[derive(Debug, Fail)]
pub enum Error {
    /// The target curve slot length is not a multiple of 5 minutes.
    #[fail(display = "invalid slot length {}, must be a multiple of 5 minutes", _0)]
    InvalidSlotLength(u32),

    /// The target curve does not cover the whole planning horizon.
    #[fail(
        display = "too few target points, should be at least {} for {} days and {} minutes slots",
        needed, days, slot_length
    )]
    TooFewTargetPoints {
        /// Points needed to cover the horizon.
        needed: usize,
        /// Planning horizon in days.
        days: u32,
        /// Slot length of the provided points, in minutes.
        slot_length: u32,
    },

    /// The shift offset exceeds one day.
    #[fail(display = "invalid offset (should be less than 24*60)")]
    InvalidOffset,

    /// The requested week does not fit in the planning horizon.
    #[fail(display = "week exceed plan length")]
    WeekOutOfRange,

    /// The requested day does not fit in the planning horizon.
    #[fail(display = "day exceed plan length")]
    DayOutOfRange,

    /// The agent code is not part of the plan.
    #[fail(display = "agent {} not found in plan", _0)]
    AgentNotFound(String),

    /// A plan needs at least one agent.
    #[fail(display = "you must add agents to create a plan")]
    NoAgents,

    /// A planner state needs at least one sampler.
    #[fail(display = "you must provide some samplers")]
    NoSamplers,

    /// A working time span is empty or reversed.
    #[fail(display = "invalid time span")]
    InvalidSpan,

    /// The annealing temperature schedule is outside `[0.5, 1)`.
    #[fail(
        display = "invalid temperature schedule {} (must be between 0.5 and 1.0)",
        _0
    )]
    InvalidTemperatureSchedule(f64),

    /// The comfort energy weight is negative.
    #[fail(display = "comfort energy weight must be positive")]
    NegativeComfortWeight(f64),

    /// An annealing precondition does not hold.
    #[fail(display = "invalid annealing argument: {}", _0)]
    InvalidAnnealArgument(&'static str),
}

/// A specialized `Result` type for roster planning operations.
pub type Result<T> = result::Result<T, Error>;
