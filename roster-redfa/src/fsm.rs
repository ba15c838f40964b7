// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The deterministic finite automaton generated from a regular expression,
//! and the random walks over it that sample the expression's language.
//!
//! To generate the *minimal* dfa for a given regular expression we
//! repeatedly derive the expression with respect to each letter of its
//! alphabet, associating
//!
//! - each dissimilar derivative with a **state**, and
//! - each letter used in a derivative with a **transition**.
//!
//! States are numbered from 1 and state 1 is the initial state. A state is
//! final when its expression is nullable. A transition exists exactly when
//! the derivative is not `∅`.
//!
//! For sampling, the letters driving each edge are grouped into
//! equi-probable buckets by a [`Partition`](trait.Partition.html)
//! classifier. A random walk first picks a successor state uniformly (one
//! entry per driving letter, so edges with more letters are more likely),
//! then a bucket uniformly, then a letter of the bucket uniformly. The
//! bucket level equalizes the chance of qualitatively similar letters so
//! a large class cannot drown out a small one.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt::{self, Display};
use std::marker::PhantomData;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use letter::Letter;
use regex::RegExp;

/// Classifier grouping the letters on a dfa edge into equi-probable
/// buckets.
///
/// Letters with the same tag land in the same bucket of their edge and the
/// sampler picks first a bucket, then a letter within it, each uniformly.
pub trait Partition<L> {
    /// The bucket tag of `letter`.
    fn tag(letter: &L) -> u32;
}

/// The trivial partition: every letter in one bucket.
pub struct SinglePartition;

impl<L> Partition<L> for SinglePartition {
    fn tag(_letter: &L) -> u32 {
        1
    }
}

/// A deterministic finite automaton for a regular expression over the
/// alphabet `L`, with sampling support.
///
/// The automaton is minimal by construction (one state per dissimilar
/// derivative of the source expression). It owns its random number
/// generator, seeded from OS entropy unless built through
/// [`with_seed`](#method.with_seed), and it remembers the state trace of
/// the last [`sample`](#method.sample) so that
/// [`resample`](#method.resample) can walk the same path again.
#[derive(Debug)]
pub struct Fsm<L: Letter, E: Partition<L> = SinglePartition> {
    rng: StdRng,

    // alphabet of the source expression, indexed in insertion order
    alphabet: Vec<L>,
    alphabet_map: HashMap<L, usize>,

    // final states
    finals: BTreeSet<usize>,

    // transitions in a form suitable for matching:
    // (q0, letter index) -> q1
    trans: BTreeMap<(usize, usize), usize>,

    // transitions in a form suitable for sampling:
    // q0 -> successors, one entry per driving letter
    outgoing: BTreeMap<usize, Vec<usize>>,
    // (q0, q1) -> letter indices partitioned into equi-probable buckets
    edge_letters: BTreeMap<(usize, usize), Vec<Vec<usize>>>,

    // state trace of the last sample
    trace: Vec<usize>,

    _partition: PhantomData<E>,
}

impl<L: Letter, E: Partition<L>> Fsm<L, E> {
    /// Build the dfa for `regexp`, seeding the sampler from OS entropy.
    pub fn new(regexp: &RegExp<L>) -> Fsm<L, E> {
        Fsm::with_rng(regexp, StdRng::from_entropy())
    }

    /// Build the dfa for `regexp` with a deterministic sampler seed.
    pub fn with_seed(regexp: &RegExp<L>, seed: u64) -> Fsm<L, E> {
        Fsm::with_rng(regexp, StdRng::seed_from_u64(seed))
    }

    fn with_rng(regexp: &RegExp<L>, rng: StdRng) -> Fsm<L, E> {
        let alphabet = regexp.alphabet();
        let alphabet_map = alphabet
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, l)| (l, i))
            .collect();

        // iterate the derivatives: each dissimilar derivative is a state
        let mut states = HashMap::new();
        states.insert(regexp.clone(), 1);
        let mut finals = BTreeSet::new();
        if regexp.nullable() {
            finals.insert(1);
        }
        let mut trans = BTreeMap::new();
        let mut pending = VecDeque::new();
        pending.push_back((regexp.clone(), 1));
        while let Some((q0, q0_idx)) = pending.pop_front() {
            for (l_idx, l) in alphabet.iter().enumerate() {
                let q1 = q0.derivative(l);
                if q1 == RegExp::zero() {
                    continue;
                }
                let nullable = q1.nullable();
                let next_idx = states.len() + 1;
                let q1_idx = match states.get(&q1) {
                    Some(&idx) => idx,
                    None => {
                        states.insert(q1.clone(), next_idx);
                        pending.push_back((q1, next_idx));
                        next_idx
                    }
                };
                if nullable {
                    finals.insert(q1_idx);
                }
                trans.insert((q0_idx, l_idx), q1_idx);
            }
        }

        // reindex the transitions for sampling
        let mut outgoing: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut edge_letters: BTreeMap<(usize, usize), Vec<Vec<usize>>> = BTreeMap::new();
        let mut bucket_idx: HashMap<((usize, usize), u32), usize> = HashMap::new();
        for (&(q0, l_idx), &q1) in &trans {
            outgoing.entry(q0).or_insert_with(Vec::new).push(q1);

            let tag = E::tag(&alphabet[l_idx]);
            let buckets = edge_letters.entry((q0, q1)).or_insert_with(Vec::new);
            let b = match bucket_idx.get(&((q0, q1), tag)) {
                Some(&b) => b,
                None => {
                    buckets.push(Vec::new());
                    bucket_idx.insert(((q0, q1), tag), buckets.len() - 1);
                    buckets.len() - 1
                }
            };
            buckets[b].push(l_idx);
        }

        // keep the letters of each bucket in letter order
        for buckets in edge_letters.values_mut() {
            for bucket in buckets.iter_mut() {
                bucket.sort_by(|&a, &b| alphabet[a].cmp(&alphabet[b]));
            }
        }

        Fsm {
            rng,
            alphabet,
            alphabet_map,
            finals,
            trans,
            outgoing,
            edge_letters,
            trace: Vec::new(),
            _partition: PhantomData,
        }
    }

    /// Walk a random path through the dfa and emit the word it spells.
    ///
    /// At a final state a fair coin decides whether to stop. The sequence
    /// of visited states is recorded and overwritten on each call; it is
    /// the path that [`resample`](#method.resample) walks again.
    ///
    /// # Panics
    ///
    /// Panics when the walk reaches a non-final state without outgoing
    /// transitions. Such dangling states cannot arise from a well formed
    /// expression and indicate a construction bug.
    pub fn sample(&mut self) -> Vec<L> {
        let mut word = Vec::new();
        let mut q0 = 1;
        self.trace.clear();
        self.trace.push(q0);
        loop {
            let stop = self.finals.contains(&q0);
            if stop && self.rng.gen_bool(0.5) {
                break;
            }

            let q1 = match self.outgoing.get(&q0) {
                Some(succ) if !succ.is_empty() => {
                    if succ.len() > 1 {
                        succ[self.rng.gen_range(0..succ.len())]
                    } else {
                        succ[0]
                    }
                }
                _ => {
                    if stop {
                        break;
                    }
                    panic!("dangling state in fsm");
                }
            };

            let l_idx = match self.edge_letters.get(&(q0, q1)) {
                Some(buckets) if !buckets.is_empty() => {
                    let bucket = if buckets.len() > 1 {
                        &buckets[self.rng.gen_range(0..buckets.len())]
                    } else {
                        &buckets[0]
                    };
                    if bucket.len() > 1 {
                        bucket[self.rng.gen_range(0..bucket.len())]
                    } else {
                        bucket[0]
                    }
                }
                _ => {
                    if stop {
                        break;
                    }
                    panic!("dangling state in fsm");
                }
            };

            word.push(self.alphabet[l_idx].clone());
            q0 = q1;
            self.trace.push(q1);
        }
        word
    }

    /// Walk the path of the previous [`sample`](#method.sample) again,
    /// redrawing a bucket and a letter uniformly on every edge.
    ///
    /// Falls back to a fresh `sample` when fewer than two states were
    /// traced (which also records a fresh trace).
    ///
    /// # Panics
    ///
    /// Panics when an edge of the trace has no letters recorded for it.
    pub fn resample(&mut self) -> Vec<L> {
        if self.trace.len() < 2 {
            return self.sample();
        }
        let mut word = Vec::with_capacity(self.trace.len() - 1);
        for i in 0..self.trace.len() - 1 {
            let edge = (self.trace[i], self.trace[i + 1]);
            let l_idx = match self.edge_letters.get(&edge) {
                Some(buckets) if !buckets.is_empty() => {
                    let bucket = if buckets.len() > 1 {
                        &buckets[self.rng.gen_range(0..buckets.len())]
                    } else {
                        &buckets[0]
                    };
                    if bucket.len() > 1 {
                        bucket[self.rng.gen_range(0..bucket.len())]
                    } else {
                        bucket[0]
                    }
                }
                _ => panic!("dangling state in fsm resampling"),
            };
            word.push(self.alphabet[l_idx].clone());
        }
        word
    }

    /// Walk the path of the previous [`sample`](#method.sample) again,
    /// choosing on every edge the letter with the smallest fitness value.
    ///
    /// The fitness function receives the step index, the word accumulated
    /// so far and the candidate letter. Every letter of every bucket on
    /// the edge is evaluated; ties keep the first seen letter.
    ///
    /// Falls back to a fresh `sample` when fewer than two states were
    /// traced.
    ///
    /// # Panics
    ///
    /// Panics when an edge of the trace has no letters recorded for it or
    /// when no fittest letter can be determined.
    pub fn resample_fit<F>(&mut self, mut fitness: F) -> Vec<L>
    where
        F: FnMut(usize, &[L], &L) -> f64,
    {
        if self.trace.len() < 2 {
            return self.sample();
        }
        let mut word = Vec::with_capacity(self.trace.len() - 1);
        for i in 0..self.trace.len() - 1 {
            let edge = (self.trace[i], self.trace[i + 1]);
            let buckets = match self.edge_letters.get(&edge) {
                Some(buckets) if !buckets.is_empty() => buckets,
                _ => panic!("dangling state in fsm resampling"),
            };

            let mut fit_min = 0.0;
            let mut fit_idx = None;
            for bucket in buckets {
                for &l_idx in bucket {
                    let fit = fitness(i, &word, &self.alphabet[l_idx]);
                    if fit_idx.is_none() || fit < fit_min {
                        fit_min = fit;
                        fit_idx = Some(l_idx);
                    }
                }
            }
            let l_idx = match fit_idx {
                Some(l_idx) => l_idx,
                None => panic!("could not determine fittest letter in resampling"),
            };
            word.push(self.alphabet[l_idx].clone());
        }
        word
    }

    /// Match a word against the dfa.
    ///
    /// Returns `false` for words holding letters outside the alphabet or
    /// driving into a missing transition; `true` exactly when the walk
    /// ends in a final state.
    pub fn matches(&self, w: &[L]) -> bool {
        let mut state = 1;
        for l in w {
            let l_idx = match self.alphabet_map.get(l) {
                Some(&l_idx) => l_idx,
                None => return false,
            };
            state = match self.trans.get(&(state, l_idx)) {
                Some(&q1) => q1,
                None => return false,
            };
        }
        self.finals.contains(&state)
    }

    /// Render the dfa in Graphviz dot format.
    ///
    /// The graph has a synthetic `start` node pointing at state 1, final
    /// states as double circles and one labelled edge per equi-probable
    /// bucket (showing the first letter and the bucket size when the
    /// bucket holds two or more letters).
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        out.push_str("digraph FSM {\n");
        out.push_str("  rankdir = LR;\n");
        out.push_str("  node [shape = plain];\n");
        out.push_str("  start;\n");
        out.push_str("  node [shape = doublecircle];\n");
        for state in &self.finals {
            out.push_str(&format!("  {};\n", state));
        }
        out.push_str("  node [shape = circle];\n");
        out.push_str("  start -> 1;\n");
        for (&(q0, q1), buckets) in &self.edge_letters {
            for bucket in buckets {
                if bucket.len() == 1 {
                    out.push_str(&format!(
                        "  {} -> {} [label=\"{}\"];\n",
                        q0, q1, self.alphabet[bucket[0]]
                    ));
                } else {
                    out.push_str(&format!(
                        "  {} -> {} [label=\"{}... ({})\"];\n",
                        q0,
                        q1,
                        self.alphabet[bucket[0]],
                        bucket.len()
                    ));
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

impl<L: Letter, E: Partition<L>> Display for Fsm<L, E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_dot())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lit(c: char) -> RegExp<char> {
        RegExp::literal(c)
    }

    // (a+b)*·c
    fn suffix_c() -> RegExp<char> {
        (lit('a') + lit('b')).kstar() * lit('c')
    }

    struct VowelPartition;

    impl Partition<char> for VowelPartition {
        fn tag(letter: &char) -> u32 {
            if "aeiou".contains(*letter) {
                1
            } else {
                2
            }
        }
    }

    #[test]
    fn matches_accepts_the_language() {
        let sut: Fsm<char> = Fsm::new(&suffix_c());

        assert!(sut.matches(&['c']));
        assert!(sut.matches(&['a', 'b', 'a', 'c']));
        assert!(!sut.matches(&[]));
        assert!(!sut.matches(&['a', 'b']));
    }

    #[test]
    fn matches_rejects_letters_outside_the_alphabet() {
        let sut: Fsm<char> = Fsm::new(&suffix_c());

        assert!(!sut.matches(&['x']));
        assert!(!sut.matches(&['a', 'x', 'c']));
    }

    #[test]
    fn matches_rejects_missing_transitions() {
        let sut: Fsm<char> = Fsm::new(&RegExp::word("abc".chars()));

        assert!(sut.matches(&['a', 'b', 'c']));
        assert!(!sut.matches(&['a', 'c', 'b']));
        assert!(!sut.matches(&['a', 'b', 'c', 'a']));
    }

    #[test]
    fn initial_state_is_final_for_a_nullable_expression() {
        let sut: Fsm<char> = Fsm::new(&lit('a').kstar());

        assert!(sut.matches(&[]));
    }

    #[test]
    fn construction_is_minimal_for_a_star_literal() {
        // a* derives back onto itself: one state only
        let sut: Fsm<char> = Fsm::new(&lit('a').kstar());

        assert_eq!(sut.trans.len(), 1);
        assert_eq!(sut.trans.get(&(1, 0)), Some(&1));
    }

    #[test]
    fn no_reachable_state_is_dangling() {
        let sut: Fsm<char> = Fsm::new(&suffix_c());

        let mut states: Vec<usize> = sut.trans.values().cloned().collect();
        states.push(1);
        for state in states {
            assert!(
                sut.finals.contains(&state)
                    || sut.outgoing.get(&state).map_or(false, |s| !s.is_empty())
            );
        }
    }

    #[test]
    fn samples_are_in_the_language() {
        let regexp = suffix_c();
        let mut sut: Fsm<char> = Fsm::with_seed(&regexp, 7);

        for _ in 0..1000 {
            let word = sut.sample();
            assert!(sut.matches(&word));
            assert!(regexp.matches(&word));
        }
    }

    #[test]
    fn resample_preserves_the_traced_path() {
        let regexp = suffix_c();
        let mut sut: Fsm<char> = Fsm::with_seed(&regexp, 11);

        let word = sut.sample();
        let trace = sut.trace.clone();
        let redrawn = sut.resample();

        assert_eq!(redrawn.len(), word.len());
        assert!(regexp.matches(&redrawn));
        assert_eq!(sut.trace, trace);
    }

    #[test]
    fn resample_without_a_trace_falls_back_to_sample() {
        let regexp = suffix_c();
        let mut sut: Fsm<char> = Fsm::with_seed(&regexp, 13);

        let word = sut.resample();

        assert!(regexp.matches(&word));
        assert!(!sut.trace.is_empty());
    }

    #[test]
    fn resample_fit_picks_the_smallest_fitness_letter() {
        // seven (a+b) choices; fitness prefers b everywhere
        let regexp = (lit('a') + lit('b')).repeat(7);
        let mut sut: Fsm<char> = Fsm::with_seed(&regexp, 17);

        sut.sample();
        let word = sut.resample_fit(|_, _, l| if *l == 'b' { -1.0 } else { 1.0 });

        assert_eq!(word, vec!['b'; 7]);
    }

    #[test]
    fn partition_buckets_split_the_edge_letters() {
        // one edge driven by two vowels and one consonant
        let regexp = RegExp::any_of("aex".chars());
        let sut: Fsm<char, VowelPartition> = Fsm::with_seed(&regexp, 19);

        assert_matches!(sut.edge_letters.get(&(1, 2)), Some(buckets) => {
            let mut sizes: Vec<usize> = buckets.iter().map(|b| b.len()).collect();
            sizes.sort();
            assert_eq!(sizes, vec![1, 2]);
        });
    }

    #[test]
    fn dot_output_has_the_start_node_and_finals() {
        let sut: Fsm<char> = Fsm::new(&RegExp::word("ab".chars()));

        let dot = sut.to_dot();

        assert!(dot.starts_with("digraph FSM {"));
        assert!(dot.contains("start -> 1;"));
        assert!(dot.contains("doublecircle"));
    }

    #[test]
    #[should_panic(expected = "dangling state in fsm")]
    fn sampling_the_empty_language_panics() {
        let mut sut: Fsm<char> = Fsm::new(&RegExp::zero());

        sut.sample();
    }
}
