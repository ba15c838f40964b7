// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! A library for building a deterministic finite automaton from a regular
//! expression over an arbitrary alphabet, and for sampling the language the
//! automaton accepts.
//!
//! The regular expressions are kept in a canonical form by smart
//! constructors so that the number of dissimilar Brzozowski derivatives of
//! any expression is finite. Iterating the derivatives then yields the
//! *minimal* dfa directly: one state per dissimilar derivative.
//!
//! The motivating use for this library is sampling weekly rosters from
//! per-agent shift grammars, but nothing in it knows about shifts: the
//! alphabet is any type implementing [`Letter`](letter/trait.Letter.html).

#![deny(missing_docs)]

extern crate itertools;
extern crate rand;

#[cfg(test)]
#[macro_use]
extern crate proptest;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;

pub mod fsm;
pub mod letter;
pub mod regex;

pub use fsm::{Fsm, Partition, SinglePartition};
pub use letter::Letter;
pub use regex::RegExp;
