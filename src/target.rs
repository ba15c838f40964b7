// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The target staffing curve.

use std::fmt::{self, Display};

use error::{Error, Result};
use {SLOTS_DAY, SLOT_LENGTH};

/// The target staffing curve over the planning horizon.
///
/// Raw samples arrive at a configurable slot length (a multiple of 5
/// minutes) and are upsampled by repetition to the canonical 5 minute
/// grid, then zero-padded to a day boundary. An optional per-day rescaling
/// adjusts each day of the curve to a prescribed number of staff hours.
#[derive(Debug)]
pub struct Target {
    days: u32,
    target: Vec<f64>,

    shift_offset: u32,
    staff_hours: Vec<f64>,
}

impl Target {
    /// Create a target curve from raw samples.
    ///
    /// `slot_length` is the sample resolution in minutes and must be a
    /// multiple of 5; `samples` must cover at least `days` whole days at
    /// that resolution.
    pub fn new(slot_length: u32, days: u32, samples: &[f64]) -> Result<Target> {
        if slot_length < 5 || slot_length % 5 != 0 {
            return Err(Error::InvalidSlotLength(slot_length));
        }

        let slots = days as usize * (24 * 60 / slot_length) as usize;
        if samples.len() < slots {
            return Err(Error::TooFewTargetPoints {
                needed: slots,
                days,
                slot_length,
            });
        }

        // upsample to the 5 minute grid
        let ratio = (slot_length / SLOT_LENGTH) as usize;
        let mut target = Vec::with_capacity(samples.len() * ratio);
        for &sample in samples {
            for _ in 0..ratio {
                target.push(sample);
            }
        }

        // pad with zeros to the next planning day
        while target.len() % SLOTS_DAY != 0 {
            target.push(0.0);
        }

        Ok(Target {
            days,
            target,
            shift_offset: 0,
            staff_hours: Vec::new(),
        })
    }

    /// Length of the planning horizon in days.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Target staffing hours of one day, with the day window starting
    /// `offset` minutes after midnight.
    pub fn hours(&self, offset: u32, day: u32) -> f64 {
        let i0 = day as usize * SLOTS_DAY + (offset / SLOT_LENGTH) as usize;
        let i1 = i0 + SLOTS_DAY;
        let mut hours = 0.0;
        for i in i0..i1.min(self.target.len()) {
            hours += self.target[i] * f64::from(SLOT_LENGTH);
        }
        hours / 60.0
    }

    /// The non-rescaled target curve.
    pub fn unrescaled(&self) -> Vec<f64> {
        self.target.clone()
    }

    /// The target curve, rescaled per day when a rescaling was requested.
    ///
    /// The curve of day `d` is multiplied by `staff_hours[d mod k] /
    /// hours(offset, d)`; the factor defaults to 1 when either side is
    /// zero.
    pub fn target(&self) -> Vec<f64> {
        if self.staff_hours.is_empty() {
            return self.target.clone();
        }
        let mut scaled = self.target.clone();
        for day in 0..self.days {
            let h0 = self.hours(self.shift_offset, day);
            let h1 = self.staff_hours[day as usize % self.staff_hours.len()];
            let factor = if h0 == 0.0 || h1 == 0.0 { 1.0 } else { h1 / h0 };
            let i0 = day as usize * SLOTS_DAY + (self.shift_offset / SLOT_LENGTH) as usize;
            let i1 = i0 + SLOTS_DAY;
            for i in i0..i1.min(scaled.len()) {
                scaled[i] = self.target[i] * factor;
            }
        }
        scaled
    }

    /// Request a per-day rescaling of the curve to the given daily staff
    /// hours, with day windows starting `offset` minutes after midnight.
    ///
    /// The `staff_hours` cycle over the horizon when shorter than it.
    /// An offset beyond one day is an invalid argument (equality is
    /// allowed).
    pub fn rescale_staff(&mut self, offset: u32, staff_hours: &[f64]) -> Result<()> {
        if offset > 24 * 60 {
            return Err(Error::InvalidOffset);
        }
        self.shift_offset = offset;
        self.staff_hours = staff_hours.to_vec();
        Ok(())
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Target: days={}", self.days)
    }
}
