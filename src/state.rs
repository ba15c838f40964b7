// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The planner state: a sampler for the set of all possible plannings.
//!
//! The state consists of one sampler (a dfa over shifts) per agent and the
//! plan, and implements the mutation protocol the annealer drives:
//! [`mutate`](struct.State.html#method.mutate) draws a tentative weekly
//! row for one random agent (usually a fresh sample of the agent's
//! language, sometimes a fitness-guided refinement of the previous path)
//! and [`apply_mutation`](struct.State.html#method.apply_mutation) commits
//! it to the plan and the staffing curve. The tentative row is evaluated
//! through the energy terms without touching the shared staffing curve.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roster_redfa::Fsm;

use anneal::AnnealState;
use energy::{ComfortEnergy, StaffingEnergy};
use error::{Error, Result};
use plan::Plan;
use shift::{Shift, ShiftEpp};
use SLOTS_DAY;

/// The sampler of one agent's shift language.
pub type Sampler = Fsm<Shift, ShiftEpp>;

/// The planner state over a plan and the agents' samplers.
///
/// Construction seeds the plan: every agent's week is overwritten with one
/// fresh sample of its language and the staffing curve accumulates the
/// sampled shifts, then one mutation is queued. The borrowed plan and
/// samplers are used exclusively for the lifetime of the state.
#[derive(Debug)]
pub struct State<'a> {
    rng: StdRng,

    samplers: &'a mut [Sampler],
    week: u32,
    plan: &'a mut Plan,

    mutd_idx: usize,
    mutd_pln: Vec<Shift>,
    prev_stf: Vec<f64>,
    mutd_stf: Vec<f64>,

    w1: f64,

    staffing: StaffingEnergy,
    comfort: ComfortEnergy,
}

impl<'a> State<'a> {
    /// Create a state over the given samplers, week and plan, seeding the
    /// mutation source from OS entropy.
    pub fn new(samplers: &'a mut [Sampler], week: u32, plan: &'a mut Plan) -> Result<State<'a>> {
        State::with_rng(samplers, week, plan, StdRng::from_entropy())
    }

    /// Create a state with a deterministic mutation seed.
    pub fn with_seed(
        samplers: &'a mut [Sampler],
        week: u32,
        plan: &'a mut Plan,
        seed: u64,
    ) -> Result<State<'a>> {
        State::with_rng(samplers, week, plan, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        samplers: &'a mut [Sampler],
        week: u32,
        plan: &'a mut Plan,
        rng: StdRng,
    ) -> Result<State<'a>> {
        if samplers.is_empty() {
            return Err(Error::NoSamplers);
        }

        let week_slots = plan.week_slots();
        let staffing = StaffingEnergy::new(plan, week);
        let comfort = ComfortEnergy::new(week);
        let mut state = State {
            rng,
            samplers,
            week,
            plan,
            mutd_idx: 0,
            mutd_pln: Vec::new(),
            prev_stf: vec![0.0; week_slots],
            mutd_stf: vec![0.0; week_slots],
            w1: 1.0,
            staffing,
            comfort,
        };

        for i in 0..state.samplers.len() {
            let pln = state.samplers[i].sample();
            state.plan.update_plan(i, (week * 7) as usize, &pln);
            for (day, shift) in pln.iter().enumerate() {
                shift.add_staff((week * 7) as usize + day, 1.0, &mut state.plan.staffing);
            }
        }
        state.mutate();

        Ok(state)
    }

    /// The energy of the current state: the staffing energy plus the
    /// weighted comfort energy.
    pub fn energy(&self) -> f64 {
        self.staffing.energy(self.plan) + self.w1 * self.comfort.energy(self.plan)
    }

    /// The energy delta of the queued mutation.
    pub fn delta_energy(&self) -> f64 {
        self.staffing.delta(self.plan, &self.prev_stf, &self.mutd_stf)
            + self.w1 * self.comfort.delta(self.plan, self.mutd_idx, &self.mutd_pln)
    }

    /// The staffing energy contribution.
    pub fn staffing_energy(&self) -> f64 {
        self.staffing.energy(self.plan)
    }

    /// The staffing energy delta of the queued mutation.
    pub fn staffing_delta_energy(&self) -> f64 {
        self.staffing.delta(self.plan, &self.prev_stf, &self.mutd_stf)
    }

    /// The comfort energy contribution.
    pub fn comfort_energy(&self) -> f64 {
        self.comfort.energy(self.plan)
    }

    /// The comfort energy delta of the queued mutation.
    pub fn comfort_delta_energy(&self) -> f64 {
        self.comfort.delta(self.plan, self.mutd_idx, &self.mutd_pln)
    }

    /// Calibrate the comfort energy weight.
    ///
    /// Runs 200 000 mutate/apply iterations accumulating both energy
    /// terms and sets the weight to `ratio · mean(staffing) /
    /// mean(comfort)`, so that `ratio` expresses the relative importance
    /// of the comfort term in a dimensionless unit. A zero ratio disables
    /// the comfort term without any iteration.
    pub fn calibrate(&mut self, ratio: f64) {
        if ratio == 0.0 {
            self.w1 = 0.0;
            return;
        }

        let n = 200_000;
        info!("calibrating energy weights ({} iterations)", n);

        let mut sum0 = 0.0;
        let mut sum_sq0 = 0.0;
        let mut sum1 = 0.0;
        let mut sum_sq1 = 0.0;
        for _ in 1..n {
            self.mutate();
            self.apply_mutation();

            let e0 = self.staffing.energy(self.plan);
            sum0 += e0;
            sum_sq0 += e0 * e0;

            let e1 = self.comfort.energy(self.plan);
            sum1 += e1;
            sum_sq1 += e1 * e1;
        }

        let n = f64::from(n);
        let mean0 = sum0 / n;
        let stddev0 = ((sum_sq0 - sum0 * sum0 / n) / (n - 1.0)).sqrt();
        let mean1 = sum1 / n;
        let stddev1 = ((sum_sq1 - sum1 * sum1 / n) / (n - 1.0)).sqrt();
        info!("staffing energy: mean={:.4} stddev={:.4}", mean0, stddev0);
        info!(" comfort energy: mean={:.4} stddev={:.4}", mean1, stddev1);

        self.w1 = ratio * mean0 / mean1;
        info!("updating ratio: {:.4} -> {:.4}", ratio, self.w1);
    }

    /// Queue a mutation: choose an agent at random and draw a tentative
    /// week for it.
    ///
    /// With probability 0.8 the tentative week is a fresh sample of the
    /// agent's language; otherwise the previous sampled path is resampled
    /// against the combined staffing and comfort fitness, choosing the
    /// best shift on every edge.
    pub fn mutate(&mut self) {
        let idx = self.rng.gen_range(0..self.samplers.len());
        self.mutd_idx = idx;

        if self.rng.gen::<f64>() < 0.8 {
            self.mutd_pln = self.samplers[idx].sample();
        } else {
            let plan = &*self.plan;
            let staffing = &self.staffing;
            let comfort = &self.comfort;
            let w1 = self.w1;
            let week7 = (self.week * 7) as usize;
            self.mutd_pln = self.samplers[idx].resample_fit(|day, acc, shift| {
                let current = &plan.rows[idx][week7 + day];
                staffing.fitness(plan, week7 + day, current, shift)
                    + w1 * comfort.fitness(acc, current, shift)
            });
        }

        for i in 0..self.mutd_stf.len() {
            self.prev_stf[i] = 0.0;
            self.mutd_stf[i] = 0.0;
        }
        let week7 = (self.week * 7) as usize;
        for day in 0..7 {
            self.plan.rows[self.mutd_idx][week7 + day].add_staff(day, 1.0, &mut self.prev_stf);
            self.mutd_pln[day].add_staff(day, 1.0, &mut self.mutd_stf);
        }
    }

    /// Commit the queued mutation to the plan and the staffing curve.
    pub fn apply_mutation(&mut self) {
        let week7 = (self.week * 7) as usize;
        self.plan.update_plan(self.mutd_idx, week7, &self.mutd_pln);

        let n = self.plan.week_slots();
        let base = week7 * SLOTS_DAY;
        for i in 0..n {
            self.plan.staffing[base + i] += self.mutd_stf[i] - self.prev_stf[i];
        }
    }
}

impl<'a> AnnealState for State<'a> {
    fn mutate(&mut self) {
        State::mutate(self);
    }

    fn apply_mutation(&mut self) {
        State::apply_mutation(self);
    }

    fn energy(&self) -> f64 {
        State::energy(self)
    }

    fn delta_energy(&self) -> f64 {
        State::delta_energy(self)
    }
}
