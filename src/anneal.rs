// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! Generic simulated annealing over a mutable state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use error::{Error, Result};

// initial temperature acceptance threshold
const CHI0: f64 = 0.9;

// trial mutations for the final temperature calibration
const STATE_SETUP_TRIES: u32 = 10_000;

// a step accepting fewer mutations than this is quenched
const QUENCH_LIMIT: u32 = 10;

/// The mutation protocol a state must expose to be annealed.
///
/// The annealer repeatedly calls [`mutate`](#tymethod.mutate) to queue a
/// tentative change, inspects its [`delta_energy`](#tymethod.delta_energy)
/// and commits accepted changes with
/// [`apply_mutation`](#tymethod.apply_mutation).
pub trait AnnealState {
    /// Queue a tentative mutation of the state.
    fn mutate(&mut self);

    /// Commit the queued mutation.
    fn apply_mutation(&mut self);

    /// The energy of the current state.
    fn energy(&self) -> f64;

    /// The energy change the queued mutation would cause.
    fn delta_energy(&self) -> f64;
}

/// Simulated annealing algorithm over a state.
///
/// `nover` is the number of mutation attempts per temperature step. The
/// annealer owns its random number generator for the Metropolis draws,
/// independent of the randomness driving the state's mutations.
pub struct Anneal<'a, S: AnnealState + 'a> {
    rng: StdRng,
    nover: u32,
    state: &'a mut S,
}

impl<'a, S: AnnealState> Anneal<'a, S> {
    /// Create an annealer over the state, seeding the Metropolis draws
    /// from OS entropy.
    pub fn new(nover: u32, state: &'a mut S) -> Anneal<'a, S> {
        Anneal {
            rng: StdRng::from_entropy(),
            nover,
            state,
        }
    }

    /// Create an annealer with a deterministic Metropolis seed.
    pub fn with_seed(nover: u32, state: &'a mut S, seed: u64) -> Anneal<'a, S> {
        Anneal {
            rng: StdRng::seed_from_u64(seed),
            nover,
            state,
        }
    }

    /// The annealed state.
    pub fn state(&self) -> &S {
        &*self.state
    }

    /// Calibrate the initial temperature.
    ///
    /// Starting from 2.0, measure the Metropolis acceptance ratio over
    /// `nover / 50` trial mutations and double the temperature until the
    /// ratio reaches 0.9. At the returned temperature the annealer
    /// behaves like a random search on this problem instance.
    pub fn calibrate_ti(&mut self) -> f64 {
        info!("performing initial temperature calibration ...");
        let mut t0 = 2.0;
        loop {
            let mut accepted = 0;
            let mut attempts = 1;
            for _ in 0..self.nover / 50 {
                self.state.mutate();
                attempts += 1;
                if self.metropolis(self.state.delta_energy(), t0) {
                    self.state.apply_mutation();
                    accepted += 1;
                }
            }
            let chi = f64::from(accepted) / f64::from(attempts);
            if chi >= CHI0 {
                break;
            }
            t0 *= 2.0;
        }
        info!("initial temperature: {:.6}", t0);
        t0
    }

    /// Calibrate the final temperature.
    ///
    /// Over 10 000 trial mutations, keep the smallest strictly positive
    /// energy delta magnitude (seeded with the current energy). Below
    /// this temperature the Metropolis acceptance essentially freezes.
    pub fn calibrate_tf(&mut self) -> f64 {
        info!("performing final temperature calibration ...");
        let mut de_min = self.state.energy();
        for _ in 0..STATE_SETUP_TRIES {
            self.state.mutate();
            let de = self.state.delta_energy().abs();
            if de > 0.0 && de < de_min {
                de_min = de;
            }
        }
        info!("final temperature: {:.6}", de_min);
        de_min
    }

    /// Perform the annealing from temperature `ti` down to `tf` with the
    /// geometric schedule `delta_t`.
    ///
    /// Each of the `round((ln tf − ln ti) / ln delta_t)` steps attempts
    /// up to `nover` mutations, breaking early once `nover / 50` were
    /// accepted, and the whole run stops early once a step accepts fewer
    /// than ten mutations (the state is quenched; this is not an error).
    ///
    /// `ti` and `tf` must be positive with `ti > tf`, and `delta_t` must
    /// lie in `(0, 1)`; anything else is an invalid argument.
    pub fn anneal(&mut self, ti: f64, tf: f64, delta_t: f64) -> Result<()> {
        if ti <= 0.0 {
            return Err(Error::InvalidAnnealArgument("ti > 0"));
        }
        if tf <= 0.0 {
            return Err(Error::InvalidAnnealArgument("tf > 0"));
        }
        if ti <= tf {
            return Err(Error::InvalidAnnealArgument("ti > tf"));
        }
        if delta_t <= 0.0 || delta_t >= 1.0 {
            return Err(Error::InvalidAnnealArgument("0 < delta_t < 1"));
        }

        let mut temp = ti;
        let mut energy = self.state.energy();
        let steps = ((tf.ln() - ti.ln()) / delta_t.ln()).round() as u32;
        let nlimit = self.nover / 50;

        info!(
            "starting {} simulated annealing steps from temperature {:.4} (delta={:.4}) ...",
            steps, temp, delta_t
        );
        for n in 1..=steps {
            let mut accepted = 0;
            let mut attempts = 0;
            for k in 0..self.nover {
                attempts = k + 1;
                self.state.mutate();
                let de = self.state.delta_energy();
                if self.metropolis(de, temp) {
                    self.state.apply_mutation();
                    energy += de;
                    accepted += 1;
                }
                if accepted > nlimit {
                    break;
                }
            }
            // resynchronize to discard the rounding drift accumulated
            // through the deltas
            energy = self.state.energy();

            debug!(
                "{:>3}% T={:.4} E={:.4} ({} {}) ...",
                100 * n / steps,
                temp,
                energy,
                accepted,
                attempts
            );

            temp *= delta_t;
            if accepted < QUENCH_LIMIT {
                break;
            }
        }
        Ok(())
    }

    fn metropolis(&mut self, delta: f64, temp: f64) -> bool {
        delta < 0.0 || self.rng.gen::<f64>() < (-delta / temp).exp()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // a state whose every mutation costs a fixed energy delta
    struct FixedDelta {
        delta: f64,
        energy: f64,
        mutations: u32,
        applied: u32,
    }

    impl FixedDelta {
        fn new(delta: f64, energy: f64) -> FixedDelta {
            FixedDelta {
                delta,
                energy,
                mutations: 0,
                applied: 0,
            }
        }
    }

    impl AnnealState for FixedDelta {
        fn mutate(&mut self) {
            self.mutations += 1;
        }

        fn apply_mutation(&mut self) {
            self.energy += self.delta;
            self.applied += 1;
        }

        fn energy(&self) -> f64 {
            self.energy
        }

        fn delta_energy(&self) -> f64 {
            self.delta
        }
    }

    #[test]
    fn calibrate_ti_reaches_the_acceptance_threshold() {
        let mut state = FixedDelta::new(1.0, 100.0);
        let mut sut = Anneal::with_seed(250_000, &mut state, 23);

        let t0 = sut.calibrate_ti();

        // chi >= 0.9 needs exp(-1/t0) >= 0.9, so t0 >= 1/ln(1/0.9)
        assert!(t0 >= 1.0 / (1.0f64 / 0.9).ln());
    }

    #[test]
    fn calibrate_tf_finds_the_smallest_positive_delta() {
        let mut state = FixedDelta::new(0.25, 100.0);
        let mut sut = Anneal::with_seed(1000, &mut state, 29);

        let tf = sut.calibrate_tf();

        assert_eq!(tf, 0.25);
        assert_eq!(state.mutations, 10_000);
    }

    #[test]
    fn anneal_validates_its_arguments() {
        let mut state = FixedDelta::new(1.0, 100.0);
        let mut sut = Anneal::with_seed(1000, &mut state, 31);

        assert_matches!(
            sut.anneal(0.0, 0.1, 0.9),
            Err(Error::InvalidAnnealArgument("ti > 0"))
        );
        assert_matches!(
            sut.anneal(1.0, -0.1, 0.9),
            Err(Error::InvalidAnnealArgument("tf > 0"))
        );
        assert_matches!(
            sut.anneal(1.0, 2.0, 0.9),
            Err(Error::InvalidAnnealArgument("ti > tf"))
        );
        assert_matches!(
            sut.anneal(2.0, 1.0, 1.0),
            Err(Error::InvalidAnnealArgument("0 < delta_t < 1"))
        );
    }

    #[test]
    fn anneal_stops_early_when_quenched() {
        // deltas far above the temperature range: nothing gets accepted
        let mut state = FixedDelta::new(1000.0, 100.0);
        let nover = 1000;
        let mut sut = Anneal::with_seed(nover, &mut state, 37);

        sut.anneal(10.0, 0.001, 0.9).expect("valid arguments");

        // the ten step quench rule fires on the first step
        assert!(state.mutations <= nover);
        assert_eq!(state.applied, 0);
    }

    #[test]
    fn anneal_accepts_downhill_mutations() {
        let mut state = FixedDelta::new(-0.001, 100.0);
        let mut sut = Anneal::with_seed(1000, &mut state, 41);

        sut.anneal(2.0, 1.0, 0.9).expect("valid arguments");

        // every attempted mutation is downhill, so each step breaks at
        // the acceptance cap
        assert!(state.applied > 0);
        assert!(state.energy < 100.0);
    }
}
