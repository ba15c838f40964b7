// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The energy terms minimized by the annealer.
//!
//! Both terms evaluate one week of the plan and come in three forms: the
//! full evaluation, the algebraic delta of a tentative one-agent mutation
//! (computed without materializing the mutated staffing globally) and a
//! per-letter fitness hint consumed by the fitness-guided resampling of
//! the samplers.

use plan::Plan;
use shift::Shift;
use {SLOTS_DAY, SLOT_LENGTH};

/// Staffing energy term: the mean squared difference between the target
/// and the planned staffing curves over one week.
#[derive(Debug)]
pub struct StaffingEnergy {
    slot0: usize,
    slot1: usize,
}

impl StaffingEnergy {
    /// Create the term for the given week of the plan.
    pub fn new(plan: &Plan, week: u32) -> StaffingEnergy {
        let slot0 = week as usize * 7 * SLOTS_DAY;
        StaffingEnergy {
            slot0,
            slot1: slot0 + plan.week_slots(),
        }
    }

    /// The weekly mean squared staffing error.
    pub fn energy(&self, plan: &Plan) -> f64 {
        let mut energy = 0.0;
        for i in self.slot0..self.slot1 {
            let e = plan.staffing[i] - plan.target[i];
            energy += e * e;
        }
        energy / (self.slot1 - self.slot0) as f64
    }

    /// The energy change induced by replacing the mutated agent's weekly
    /// staffing contribution `prev_stf` with `mutd_stf`.
    ///
    /// For a single additive perturbation Δ of the staffing the change of
    /// the mean squared error is `mean(Δ · (Δ + 2·(staffing − target)))`,
    /// so only the mutated agent's slots are visited.
    pub fn delta(&self, plan: &Plan, prev_stf: &[f64], mutd_stf: &[f64]) -> f64 {
        let n = self.slot1 - self.slot0;
        let mut delta = 0.0;
        for i in 0..n {
            let e1 = mutd_stf[i] - prev_stf[i];
            let e2 = e1 + 2.0 * plan.staffing[self.slot0 + i] - 2.0 * plan.target[self.slot0 + i];
            delta += e1 * e2;
        }
        delta / n as f64
    }

    /// Per-letter fitness hint: the squared staffing error of `day` and
    /// the following day (so shifts crossing midnight are scored) with
    /// the agent's current shift `sh0` swapped for the candidate `sh1`.
    pub fn fitness(&self, plan: &Plan, day: usize, sh0: &Shift, sh1: &Shift) -> f64 {
        let mut fit = 0.0;
        let off = day * SLOTS_DAY;
        for i in 0..2 * SLOTS_DAY {
            if off + i >= plan.staffing.len() {
                break;
            }
            let t = i as u32 * SLOT_LENGTH;
            let f = plan.target[off + i]
                - (plan.staffing[off + i] - f64::from(sh0.staff(t)) + f64::from(sh1.staff(t)));
            fit += f * f;
        }
        fit / SLOTS_DAY as f64
    }
}

/// Comfort energy term: the dispersion of the entry times across
/// consecutive working days of one week.
#[derive(Debug)]
pub struct ComfortEnergy {
    week: u32,
}

impl ComfortEnergy {
    /// Create the term for the given week.
    pub fn new(week: u32) -> ComfortEnergy {
        ComfortEnergy { week }
    }

    /// The weekly entry time dispersion: for every agent and every pair
    /// of consecutive working days, the squared entry time difference in
    /// slots, averaged over the seven days.
    pub fn energy(&self, plan: &Plan) -> f64 {
        let day1 = (self.week * 7 + 1) as usize;
        let day7 = ((self.week + 1) * 7) as usize;
        let mut energy = 0.0;
        for row in &plan.rows {
            for i in day1..day7 {
                energy += pair_dispersion(&row[i - 1], &row[i]);
            }
        }
        energy / 7.0
    }

    /// The energy change induced by replacing the mutated agent's week
    /// with `mutd_pln`. The other agents' contributions cancel.
    pub fn delta(&self, plan: &Plan, mutd_idx: usize, mutd_pln: &[Shift]) -> f64 {
        let day1 = (self.week * 7 + 1) as usize;
        let day7 = ((self.week + 1) * 7) as usize;
        let row = &plan.rows[mutd_idx];

        let mut current = 0.0;
        for i in day1..day7 {
            current += pair_dispersion(&row[i - 1], &row[i]);
        }

        let mut mutated = 0.0;
        for i in 1..7 {
            mutated += pair_dispersion(&mutd_pln[i - 1], &mutd_pln[i]);
        }

        (mutated - current) / 7.0
    }

    /// Per-letter fitness hint: the pairwise dispersion against the last
    /// shift of the accumulated row, positive for the candidate `sh1` and
    /// negative for the current shift `sh0`.
    ///
    /// Note the sign convention: this is a goodness hint (smaller when
    /// the candidate aligns better than the current shift) and can go
    /// negative, unlike the staffing fitness which is a plain cost.
    pub fn fitness(&self, pln: &[Shift], sh0: &Shift, sh1: &Shift) -> f64 {
        let previous = match pln.last() {
            Some(previous) => previous,
            None => return 0.0,
        };
        pair_dispersion(previous, sh1) - pair_dispersion(previous, sh0)
    }
}

// squared entry time delta in slots, counted only between working days
fn pair_dispersion(sh0: &Shift, sh1: &Shift) -> f64 {
    if sh0.work() && sh1.work() {
        let d = (f64::from(sh1.t0()) - f64::from(sh0.t0())) / f64::from(SLOT_LENGTH);
        d * d
    } else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use plan::Plan;
    use target::Target;

    fn working(code: &str, start: u32, end: u32) -> Shift {
        Shift::working(code, vec![(start * 60, end * 60)]).expect("valid span")
    }

    fn one_agent_plan(level: f64) -> Plan {
        let target = Target::new(5, 7, &vec![level; 7 * SLOTS_DAY]).expect("valid target");
        Plan::new(0, &["a1".to_string()], &target).expect("valid plan")
    }

    #[test]
    fn staffing_energy_of_an_empty_plan_is_the_target_mean_square() {
        let plan = one_agent_plan(2.0);
        let sut = StaffingEnergy::new(&plan, 0);

        assert!((sut.energy(&plan) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn staffing_energy_counts_the_staffed_slots() {
        let mut plan = one_agent_plan(1.0);
        // half a day staffed
        working("H", 0, 12).add_staff(0, 1.0, &mut plan.staffing);
        let sut = StaffingEnergy::new(&plan, 0);

        let expected = (7.0 * SLOTS_DAY as f64 - 144.0) / (7.0 * SLOTS_DAY as f64);
        assert!((sut.energy(&plan) - expected).abs() < 1e-12);
    }

    #[test]
    fn staffing_delta_matches_the_full_recomputation() {
        let mut plan = one_agent_plan(1.0);
        let before = working("M", 6, 14);
        let after = working("E", 14, 22);
        before.add_staff(0, 1.0, &mut plan.staffing);
        let sut = StaffingEnergy::new(&plan, 0);
        let e0 = sut.energy(&plan);

        let mut prev_stf = vec![0.0; plan.week_slots()];
        let mut mutd_stf = vec![0.0; plan.week_slots()];
        before.add_staff(0, 1.0, &mut prev_stf);
        after.add_staff(0, 1.0, &mut mutd_stf);
        let delta = sut.delta(&plan, &prev_stf, &mutd_stf);

        before.add_staff(0, -1.0, &mut plan.staffing);
        after.add_staff(0, 1.0, &mut plan.staffing);
        let e1 = sut.energy(&plan);

        assert!((e1 - e0 - delta).abs() < 1e-9);
    }

    #[test]
    fn staffing_fitness_scores_the_candidate_swap() {
        let plan = one_agent_plan(0.0);
        let sut = StaffingEnergy::new(&plan, 0);
        let rest = Shift::rest("R");
        let candidate = working("M", 6, 14);

        // swapping rest for 8 staffed hours over a zero target costs
        // 96 slots of squared error, normalized by a day of slots
        let fit = sut.fitness(&plan, 0, &rest, &candidate);
        assert!((fit - 96.0 / SLOTS_DAY as f64).abs() < 1e-12);

        // the reverse swap heals the error
        let mut plan = one_agent_plan(0.0);
        candidate.add_staff(0, 1.0, &mut plan.staffing);
        let sut = StaffingEnergy::new(&plan, 0);
        assert_eq!(sut.fitness(&plan, 0, &candidate, &rest), 0.0);
    }

    #[test]
    fn comfort_energy_sums_squared_entry_deltas() {
        let mut plan = one_agent_plan(0.0);
        plan.update_plan(
            0,
            0,
            &[working("M", 6, 14), working("E", 14, 22), Shift::rest("R")],
        );
        let sut = ComfortEnergy::new(0);

        // one working pair with an 8 hour entry shift: (96)^2 / 7
        let expected = 96.0 * 96.0 / 7.0;
        assert!((sut.energy(&plan) - expected).abs() < 1e-12);
    }

    #[test]
    fn comfort_energy_ignores_rest_boundaries() {
        let mut plan = one_agent_plan(0.0);
        plan.update_plan(
            0,
            0,
            &[working("M", 6, 14), Shift::rest("R"), working("E", 14, 22)],
        );
        let sut = ComfortEnergy::new(0);

        assert_eq!(sut.energy(&plan), 0.0);
    }

    #[test]
    fn comfort_delta_matches_the_full_recomputation() {
        let mut plan = one_agent_plan(0.0);
        plan.update_plan(0, 0, &[working("M", 6, 14), working("E", 14, 22)]);
        let sut = ComfortEnergy::new(0);
        let e0 = sut.energy(&plan);

        let mutd: Vec<Shift> = (0..7).map(|_| working("M", 6, 14)).collect();
        let delta = sut.delta(&plan, 0, &mutd);

        plan.update_plan(0, 0, &mutd);
        let e1 = sut.energy(&plan);

        assert!((e1 - e0 - delta).abs() < 1e-12);
    }

    #[test]
    fn comfort_fitness_is_a_signed_hint() {
        let sut = ComfortEnergy::new(0);
        let row = vec![working("M", 6, 14)];
        let aligned = working("M2", 6, 14);
        let shifted = working("E", 14, 22);

        // candidate aligned, current shifted: negative (an improvement)
        assert!(sut.fitness(&row, &shifted, &aligned) < 0.0);
        // candidate shifted, current aligned: positive (a regression)
        assert!(sut.fitness(&row, &aligned, &shifted) > 0.0);
        // no accumulated row yet: neutral
        assert_eq!(sut.fitness(&[], &aligned, &shifted), 0.0);
    }
}
