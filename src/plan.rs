// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The plan: the agents × days shift matrix together with the target and
//! planned staffing curves.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use error::{Error, Result};
use shift::Shift;
use target::Target;
use {SLOTS_DAY, SLOT_LENGTH};

/// Target and staffed hours over some window, with their difference in
/// percent of the target.
#[derive(Debug, Clone, Copy)]
pub struct Hours {
    /// Target hours.
    pub target: f64,
    /// Staffed hours.
    pub staffing: f64,
    /// Difference in percent of the target.
    pub difference: f64,
}

/// The plan under optimization.
///
/// Holds the (rescaled and unrescaled) target staffing curve, the current
/// staffing curve and the shift schedule of every agent. The curves are
/// sized to the horizon plus the trailing offset slots, so shifts crossing
/// midnight on the last day stay inside bounds.
///
/// The planner state mutates the plan in place; the staffing curve is kept
/// the pointwise sum of the per-agent shift occupancies at all times.
#[derive(Debug)]
pub struct Plan {
    pub(crate) target: Vec<f64>,
    pub(crate) target_unrescaled: Vec<f64>,
    pub(crate) staffing: Vec<f64>,
    pub(crate) rows: Vec<Vec<Shift>>,

    days: u32,
    offset: usize,
    agent_idx: BTreeMap<String, usize>,
}

impl Plan {
    /// Create an empty plan for the given agents and target curve.
    ///
    /// `offset` is the number of minutes the latest shift may reach past
    /// midnight; the staffing arrays grow by `offset / 5` trailing slots.
    /// An empty agent list or an offset beyond one day is an invalid
    /// argument.
    pub fn new(offset: u32, agents: &[String], target: &Target) -> Result<Plan> {
        if agents.is_empty() {
            return Err(Error::NoAgents);
        }
        if offset > 24 * 60 {
            return Err(Error::InvalidOffset);
        }

        let offset = (offset / SLOT_LENGTH) as usize;
        let mut rescaled = target.target();
        let mut unrescaled = target.unrescaled();
        for _ in 0..offset {
            rescaled.push(0.0);
            unrescaled.push(0.0);
        }
        let staffing = vec![0.0; rescaled.len()];

        let days = target.days();
        let mut rows = Vec::with_capacity(agents.len());
        let mut agent_idx = BTreeMap::new();
        for (i, code) in agents.iter().enumerate() {
            agent_idx.insert(code.clone(), i);
            rows.push(vec![Shift::default(); days as usize]);
        }

        Ok(Plan {
            target: rescaled,
            target_unrescaled: unrescaled,
            staffing,
            rows,
            days,
            offset,
            agent_idx,
        })
    }

    /// Plan length in days.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Time slots of a day plan, offset included.
    pub fn day_slots(&self) -> usize {
        SLOTS_DAY + self.offset
    }

    /// Time slots of a week plan, offset included.
    pub fn week_slots(&self) -> usize {
        7 * SLOTS_DAY + self.offset
    }

    /// The (rescaled) target staffing curve.
    pub fn target_staffing(&self) -> &[f64] {
        &self.target
    }

    /// The planned staffing curve.
    pub fn planned_staffing(&self) -> &[f64] {
        &self.staffing
    }

    /// Total target and staffed hours with their percent difference.
    pub fn hours(&self) -> Hours {
        self.hours_over(0, self.target.len())
    }

    /// Target and staffed hours of one week.
    pub fn hours_week(&self, week: u32) -> Result<Hours> {
        if week * 7 > self.days {
            return Err(Error::WeekOutOfRange);
        }
        let i0 = week as usize * 7 * SLOTS_DAY;
        Ok(self.hours_over(i0, i0 + 7 * SLOTS_DAY))
    }

    /// Target and staffed hours of one day.
    pub fn hours_day(&self, day: u32) -> Result<Hours> {
        if day > self.days {
            return Err(Error::DayOutOfRange);
        }
        let i0 = day as usize * SLOTS_DAY;
        Ok(self.hours_over(i0, i0 + SLOTS_DAY))
    }

    fn hours_over(&self, i0: usize, i1: usize) -> Hours {
        let mut target = 0.0;
        let mut staffing = 0.0;
        for i in i0..i1.min(self.target.len()) {
            target += self.target[i] * f64::from(SLOT_LENGTH);
            staffing += self.staffing[i] * f64::from(SLOT_LENGTH);
        }
        Hours {
            target: target / 60.0,
            staffing: staffing / 60.0,
            difference: 100.0 * (target - staffing) / target,
        }
    }

    /// Daily energy: the mean squared difference between the target and
    /// the planned staffing over the day's slots.
    pub fn energy(&self, day: u32) -> Result<f64> {
        if day > self.days {
            return Err(Error::DayOutOfRange);
        }
        let i0 = day as usize * SLOTS_DAY;
        let mut energy = 0.0;
        for i in i0..(i0 + SLOTS_DAY).min(self.staffing.len()) {
            let e = self.target[i] - self.staffing[i];
            energy += e * e;
        }
        Ok(energy / SLOTS_DAY as f64)
    }

    /// The plan row index of an agent.
    pub fn agent_index(&self, agent_code: &str) -> Result<usize> {
        match self.agent_idx.get(agent_code) {
            Some(&idx) => Ok(idx),
            None => Err(Error::AgentNotFound(agent_code.to_string())),
        }
    }

    /// The planned shifts of an agent.
    pub fn agent_plan(&self, agent_code: &str) -> Result<&[Shift]> {
        let idx = self.agent_index(agent_code)?;
        Ok(&self.rows[idx])
    }

    /// Overwrite an agent's plan starting from `day`, bounded by the plan
    /// length.
    pub fn update_plan(&mut self, agent_idx: usize, day: usize, row: &[Shift]) {
        let line = &mut self.rows[agent_idx];
        for (i, shift) in row.iter().enumerate() {
            if day + i < line.len() {
                line[day + i] = shift.clone();
            }
        }
    }

    /// Render the whole plan, one line per agent in code order:
    /// `code:` followed by the shift codes padded to column width 10.
    pub fn format_plan(&self) -> String {
        let mut out = String::new();
        for (code, &idx) in &self.agent_idx {
            out.push_str(code);
            out.push(':');
            for shift in &self.rows[idx] {
                out.push_str(&format!("{:>10}", shift.code()));
            }
            out.push('\n');
        }
        out
    }

    /// Render the staffing curves, one line per slot:
    /// `slot rescaled_target unrescaled_target staffing`.
    pub fn format_staffing(&self) -> String {
        let mut out = String::new();
        let len = self
            .target
            .len()
            .min(self.target_unrescaled.len())
            .min(self.staffing.len());
        for i in 0..len {
            out.push_str(&format!(
                "{} {:.4} {:.4} {:.4}\n",
                i, self.target[i], self.target_unrescaled[i], self.staffing[i]
            ));
        }
        out
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Plan: days={}", self.days)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn agents(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn week_target(level: f64) -> Target {
        Target::new(5, 7, &vec![level; 7 * SLOTS_DAY]).expect("valid target")
    }

    #[test]
    fn plan_needs_agents() {
        let sut = Plan::new(0, &[], &week_target(1.0));

        assert_matches!(sut, Err(Error::NoAgents));
    }

    #[test]
    fn plan_rejects_an_offset_beyond_one_day() {
        let sut = Plan::new(24 * 60 + 5, &agents(&["a1"]), &week_target(1.0));

        assert_matches!(sut, Err(Error::InvalidOffset));
    }

    #[test]
    fn plan_sizes_the_curves_with_the_offset_tail() {
        let sut = Plan::new(120, &agents(&["a1"]), &week_target(1.0)).expect("valid plan");

        assert_eq!(sut.target.len(), 7 * SLOTS_DAY + 24);
        assert_eq!(sut.staffing.len(), sut.target.len());
        assert_eq!(sut.week_slots(), 7 * SLOTS_DAY + 24);
        assert_eq!(sut.day_slots(), SLOTS_DAY + 24);
        assert_eq!(sut.target[7 * SLOTS_DAY], 0.0);
    }

    #[test]
    fn new_plan_rows_are_filled_with_default_shifts() {
        let sut = Plan::new(0, &agents(&["a1", "a2"]), &week_target(1.0)).expect("valid plan");

        assert_eq!(sut.rows.len(), 2);
        assert!(sut.rows.iter().all(|row| row.len() == 7));
        assert!(sut.rows[0].iter().all(|s| !s.work()));
    }

    #[test]
    fn agent_index_reports_unknown_codes() {
        let sut = Plan::new(0, &agents(&["a1"]), &week_target(1.0)).expect("valid plan");

        assert_eq!(sut.agent_index("a1").expect("known agent"), 0);
        assert_matches!(sut.agent_index("zz"), Err(Error::AgentNotFound(_)));
    }

    #[test]
    fn update_plan_overwrites_from_the_given_day() {
        let mut sut = Plan::new(0, &agents(&["a1"]), &week_target(1.0)).expect("valid plan");
        let worked = Shift::working("M", vec![(6 * 60, 14 * 60)]).expect("valid span");

        sut.update_plan(0, 2, &[worked.clone(), worked.clone()]);

        assert!(!sut.rows[0][1].work());
        assert!(sut.rows[0][2].work());
        assert!(sut.rows[0][3].work());
        assert!(!sut.rows[0][4].work());
    }

    #[test]
    fn update_plan_is_bounded_by_the_horizon() {
        let mut sut = Plan::new(0, &agents(&["a1"]), &week_target(1.0)).expect("valid plan");
        let worked = Shift::working("M", vec![(6 * 60, 14 * 60)]).expect("valid span");

        sut.update_plan(0, 6, &[worked.clone(), worked.clone(), worked.clone()]);

        assert!(sut.rows[0][6].work());
        assert_eq!(sut.rows[0].len(), 7);
    }

    #[test]
    fn energy_is_the_daily_mean_squared_error() {
        let sut = Plan::new(0, &agents(&["a1"]), &week_target(2.0)).expect("valid plan");

        assert_eq!(sut.energy(0).expect("valid day"), 4.0);
        assert_matches!(sut.energy(8), Err(Error::DayOutOfRange));
    }

    #[test]
    fn hours_track_target_and_staffing() {
        let mut sut = Plan::new(0, &agents(&["a1"]), &week_target(1.0)).expect("valid plan");
        let worked = Shift::working("M", vec![(0, 12 * 60)]).expect("valid span");
        worked.add_staff(0, 1.0, &mut sut.staffing);

        let day = sut.hours_day(0).expect("valid day");
        assert!((day.target - 24.0).abs() < 1e-12);
        assert!((day.staffing - 12.0).abs() < 1e-12);
        assert!((day.difference - 50.0).abs() < 1e-12);

        let week = sut.hours_week(0).expect("valid week");
        assert!((week.target - 7.0 * 24.0).abs() < 1e-12);
        assert!((week.staffing - 12.0).abs() < 1e-9);

        assert_matches!(sut.hours_week(2), Err(Error::WeekOutOfRange));
    }

    #[test]
    fn format_plan_pads_the_shift_codes() {
        let mut sut = Plan::new(0, &agents(&["a2", "a1"]), &week_target(0.0)).expect("valid plan");
        let worked = Shift::working("M06", vec![(6 * 60, 14 * 60)]).expect("valid span");
        sut.update_plan(0, 0, &[worked.clone()]);

        let rendered = sut.format_plan();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("a1:"));
        assert!(lines[1].starts_with("a2:"));
        assert!(lines[1].contains("       M06"));
    }

    #[test]
    fn format_staffing_lists_the_three_curves() {
        let sut = Plan::new(0, &agents(&["a1"]), &week_target(1.5)).expect("valid plan");

        let rendered = sut.format_staffing();
        let first = rendered.lines().next().expect("at least one slot");

        assert_eq!(first, "0 1.5000 1.5000 0.0000");
    }
}
