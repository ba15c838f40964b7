// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The staff planning facade.
//!
//! The planner takes a plan, the agents' shift grammars and a
//! configuration (temperature schedule and comfort weight) and drives the
//! planning pipeline:
//!
//! 1. instantiate the planner state (which seeds an initial plan)
//! 2. calibrate the energy weights
//! 3. calibrate the initial and final temperatures
//! 4. anneal
//! 5. format the report

use std::fmt::{self, Display};
use std::time::Instant;

use roster_redfa::RegExp;

use anneal::Anneal;
use error::{Error, Result};
use plan::Plan;
use shift::Shift;
use state::{Sampler, State};
use {NOVER, SLOT_LENGTH};

/// The staff planning process over one plan.
///
/// Every agent starts with a sampler for the empty language; agents left
/// without a grammar make the first `run()` fail loudly, since an empty
/// language cannot be sampled.
#[derive(Debug)]
pub struct StaffPlanner {
    temp_sched: f64,
    comfort_weight: f64,
    week: u32,
    plan: Plan,
    samplers: Vec<Sampler>,
    report: String,
    description: String,
}

impl StaffPlanner {
    /// Create a planner over a plan.
    ///
    /// `description` is only used in the report. `temp_sched` is the
    /// annealing temperature schedule and must lie in `[0.5, 1)`;
    /// `comfort_weight` is the comfort energy weight relative to the
    /// staffing energy and must not be negative.
    pub fn new(
        description: &str,
        plan: Plan,
        temp_sched: f64,
        comfort_weight: f64,
    ) -> Result<StaffPlanner> {
        if temp_sched < 0.5 || temp_sched >= 1.0 {
            return Err(Error::InvalidTemperatureSchedule(temp_sched));
        }
        if comfort_weight < 0.0 {
            return Err(Error::NegativeComfortWeight(comfort_weight));
        }

        let samplers = plan
            .rows
            .iter()
            .map(|_| Sampler::new(&RegExp::zero()))
            .collect();

        Ok(StaffPlanner {
            temp_sched,
            comfort_weight,
            week: 0,
            plan,
            samplers,
            report: String::new(),
            description: description.to_string(),
        })
    }

    /// Set the week to plan. The week must fit in the planning horizon.
    pub fn set_week(&mut self, week: u32) -> Result<()> {
        if i64::from(week) * 7 > i64::from(self.plan.days()) - 7 {
            return Err(Error::WeekOutOfRange);
        }
        self.week = week;
        Ok(())
    }

    /// Set an agent's sampler from its shift grammar.
    ///
    /// The regular expression over shifts is compiled into a dfa stored
    /// at the agent's plan row.
    pub fn set_agent_sampler(&mut self, agent: &str, regexp: &RegExp<Shift>) -> Result<()> {
        let idx = self.plan.agent_index(agent)?;
        self.samplers[idx] = Sampler::new(regexp);
        Ok(())
    }

    /// Run the planning process for the configured week and format the
    /// report.
    pub fn run(&mut self) -> Result<()> {
        let started = Instant::now();
        let nover = 10 * NOVER * self.samplers.len() as u32;
        let week = self.week;

        let mut state = State::new(&mut self.samplers, week, &mut self.plan)?;

        // calibrate energy weights
        state.calibrate(self.comfort_weight);

        let mut annealer = Anneal::new(nover, &mut state);

        // calibrate temperature
        let ti = annealer.calibrate_ti();
        let tf = annealer.calibrate_tf();

        let e0_tot = annealer.state().energy();
        let e0_stf = annealer.state().staffing_energy();
        let e0_cmf = annealer.state().comfort_energy();

        annealer.anneal(ti, tf, self.temp_sched)?;

        let e1_tot = annealer.state().energy();
        let e1_stf = annealer.state().staffing_energy();
        let e1_cmf = annealer.state().comfort_energy();

        drop(annealer);
        drop(state);

        let elapsed = started.elapsed();
        let steps = ((tf.ln() - ti.ln()) / self.temp_sched.ln()).round() as u32;

        let mut report = String::new();
        report.push_str(
            "===========================================================================\n",
        );
        report.push_str(&format!("{}\n", self.description));
        report.push_str(&format!("          turning length: {}\n", self.plan.days()));
        report.push_str(&format!("                 week n°: {}\n", week));
        report.push_str(&format!("             slot length: {} minutes\n", SLOT_LENGTH));
        report.push_str(&format!("               agents n°: {}\n", self.samplers.len()));
        let week_hours = self.plan.hours_week(week)?;
        report.push_str(&format!(
            "         target staffing: {:.2} hrs\n",
            week_hours.target
        ));
        report.push_str(&format!(
            "      simulated staffing: {:.2} hrs\n\n",
            week_hours.staffing
        ));
        report.push_str(&format!(
            "   comfort energy weight: {:.5}\n\n",
            self.comfort_weight
        ));
        report.push_str(&format!("         annealing steps: {}\n", steps));
        report.push_str(&format!(
            "       temperature range: {:.5} -> {:.5}\n",
            ti, tf
        ));
        report.push_str(&format!(
            "    temperature schedule: {:.2}\n",
            self.temp_sched
        ));
        report.push_str(&format!(
            "       optimization time: {:.1} minutes\n\n",
            elapsed.as_secs() as f64 / 60.0
        ));
        report.push_str(&format!(
            "         staffing energy: {:.5} -> {:.5}\n",
            e0_stf, e1_stf
        ));
        report.push_str(&format!(
            "          comfort energy: {:.5} -> {:.5}\n",
            e0_cmf, e1_cmf
        ));
        report.push_str(&format!(
            "            TOTAL ENERGY: {:.5} -> {:.5}\n\n",
            e0_tot, e1_tot
        ));

        report.push_str("     day by day staffing:\n");
        let mut trg_tot = 0.0;
        let mut stf_tot = 0.0;
        for day in week * 7..(week + 1) * 7 {
            let hours = self.plan.hours_day(day)?;
            report.push_str(&format!(
                "                 day {:>3}: {:.2} hrs (target {:.2} hrs error {:.2}%)\n",
                day + 1,
                hours.staffing,
                hours.target,
                hours.difference
            ));
            trg_tot += hours.target;
            stf_tot += hours.staffing;
        }
        report.push_str(&format!(
            "                   TOTAL: {:.2} hrs (target {:.2} hrs error {:.2}%)\n\n",
            stf_tot,
            trg_tot,
            100.0 * (trg_tot - stf_tot) / trg_tot
        ));

        report.push_str("       day by day energy:\n");
        for day in week * 7..(week + 1) * 7 {
            report.push_str(&format!(
                "                 day {:>3}: {:.2}\n",
                day + 1,
                self.plan.energy(day)?
            ));
        }
        report.push_str(
            "---------------------------------------------------------------------------\n",
        );

        self.report = report;
        Ok(())
    }

    /// The optimized plan.
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// The report of the last run (empty before the first run).
    pub fn report(&self) -> &str {
        &self.report
    }

    /// Render an agent's sampler in Graphviz dot format.
    pub fn sampler_dot(&self, agent: &str) -> Result<String> {
        let idx = self.plan.agent_index(agent)?;
        Ok(self.samplers[idx].to_dot())
    }
}

impl Display for StaffPlanner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Planner:")?;
        writeln!(f, "           description: {}", self.description)?;
        writeln!(f, "        turning length: {}", self.plan.days())?;
        writeln!(f, "           slot length: {} minutes", SLOT_LENGTH)?;
        writeln!(f, "             agents n°: {}", self.samplers.len())?;
        writeln!(
            f,
            "       target staffing: {:.2} hrs",
            self.plan.hours().target
        )?;
        writeln!(
            f,
            " comfort energy weight: {:.5}",
            self.comfort_weight
        )?;
        writeln!(f, "  temperature schedule: {:.2}", self.temp_sched)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use target::Target;
    use SLOTS_DAY;

    fn week_plan(level: f64, agents: &[&str]) -> Plan {
        let target = Target::new(5, 7, &vec![level; 7 * SLOTS_DAY]).expect("valid target");
        let agents: Vec<String> = agents.iter().map(|a| a.to_string()).collect();
        Plan::new(0, &agents, &target).expect("valid plan")
    }

    #[test]
    fn planner_validates_the_temperature_schedule() {
        let sut = StaffPlanner::new("t", week_plan(0.0, &["a1"]), 0.4, 0.0);
        assert_matches!(sut, Err(Error::InvalidTemperatureSchedule(_)));

        let sut = StaffPlanner::new("t", week_plan(0.0, &["a1"]), 1.0, 0.0);
        assert_matches!(sut, Err(Error::InvalidTemperatureSchedule(_)));
    }

    #[test]
    fn planner_validates_the_comfort_weight() {
        let sut = StaffPlanner::new("t", week_plan(0.0, &["a1"]), 0.9, -1.0);

        assert_matches!(sut, Err(Error::NegativeComfortWeight(_)));
    }

    #[test]
    fn set_week_checks_the_horizon() {
        let mut sut =
            StaffPlanner::new("t", week_plan(0.0, &["a1"]), 0.9, 0.0).expect("valid planner");

        assert_matches!(sut.set_week(0), Ok(()));
        assert_matches!(sut.set_week(1), Err(Error::WeekOutOfRange));
    }

    #[test]
    fn set_agent_sampler_checks_the_agent_code() {
        let mut sut =
            StaffPlanner::new("t", week_plan(0.0, &["a1"]), 0.9, 0.0).expect("valid planner");
        let rest = RegExp::literal(Shift::rest("R"));

        assert_matches!(sut.set_agent_sampler("a1", &rest.repeat(7)), Ok(()));
        assert_matches!(
            sut.set_agent_sampler("zz", &rest),
            Err(Error::AgentNotFound(_))
        );
    }

    #[test]
    fn sampler_dot_renders_the_agent_sampler() {
        let mut sut =
            StaffPlanner::new("t", week_plan(0.0, &["a1"]), 0.9, 0.0).expect("valid planner");
        let rest = RegExp::literal(Shift::rest("R"));
        sut.set_agent_sampler("a1", &rest.repeat(7)).expect("known agent");

        let dot = sut.sampler_dot("a1").expect("known agent");

        assert!(dot.starts_with("digraph FSM {"));
        assert_matches!(sut.sampler_dot("zz"), Err(Error::AgentNotFound(_)));
    }

    #[test]
    fn display_summarizes_the_configuration() {
        let sut =
            StaffPlanner::new("summary", week_plan(0.0, &["a1"]), 0.9, 0.5).expect("valid planner");

        let text = format!("{}", sut);

        assert!(text.contains("description: summary"));
        assert!(text.contains("turning length: 7"));
    }
}
