// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! Regular expression types.
//!
//! The key type in this module is `RegExp<L>`, an immutable regular
//! expression over the alphabet `L`. Subterms are shared through reference
//! counted handles and every means of constructing a `RegExp` goes through
//! smart constructors that keep the expression in canonical form:
//!
//! - `∅` and `ε` absorption and identity rules for sums and products
//! - flat, duplicate-free, unordered sums and intersections
//! - flat, ordered products
//! - `(r*)* ≈ r*`, `ε* ≈ ε`, `∅* ≈ ε` and `r*·r* ≈ r*`
//!
//! The canonical form is what makes the set of dissimilar Brzozowski
//! derivatives of an expression finite, which in turn is what guarantees
//! that the dfa construction in the [`fsm`](../fsm/index.html) module
//! terminates.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::ops::{Add, BitAnd, Mul};
use std::rc::Rc;

use itertools::Itertools;
use letter::Letter;

const SUM_MASK: u64 = 0x426a_3d31;
const AND_MASK: u64 = 0x1ab3_4de1;
const PRD_MASK: u64 = 0x12b9_b0a1;
const KST_MASK: u64 = 0x2439_ab37;

/// A regular expression over the alphabet `L`.
///
/// A `RegExp` is an immutable handle to a shared term. Cloning is cheap
/// (a reference count increment) and two handles compare equal when their
/// terms are structurally equal modulo the canonical form.
///
/// Expressions are composed with the `*` (product), `+` (sum) and `&`
/// (intersection) operators, together with [`kstar`](#method.kstar) and
/// [`repeat`](#method.repeat).
#[derive(Clone)]
pub struct RegExp<L: Letter> {
    rex: Rc<Rex<L>>,
}

#[derive(PartialEq, Eq)]
enum Rex<L: Letter> {
    Zero,
    One,
    Lit(L),
    Sum(HashSet<RegExp<L>>),
    And(HashSet<RegExp<L>>),
    Prd(Vec<RegExp<L>>),
    Kst(RegExp<L>),
}

impl<L: Letter> RegExp<L> {
    /// The empty language `∅`.
    pub fn zero() -> RegExp<L> {
        RegExp {
            rex: Rc::new(Rex::Zero),
        }
    }

    /// The language `{ε}` holding only the empty word.
    pub fn one() -> RegExp<L> {
        RegExp {
            rex: Rc::new(Rex::One),
        }
    }

    /// The language holding exactly the one-letter word `l`.
    pub fn literal(l: L) -> RegExp<L> {
        RegExp {
            rex: Rc::new(Rex::Lit(l)),
        }
    }

    /// The language holding exactly the given word (a product of
    /// literals). The empty word gives `ε`.
    pub fn word<I>(w: I) -> RegExp<L>
    where
        I: IntoIterator<Item = L>,
    {
        w.into_iter()
            .fold(RegExp::one(), |acc, l| acc * RegExp::literal(l))
    }

    /// The language holding the one-letter words over the given letters
    /// (a sum of literals). No letters gives `∅`.
    pub fn any_of<I>(ls: I) -> RegExp<L>
    where
        I: IntoIterator<Item = L>,
    {
        ls.into_iter()
            .fold(RegExp::zero(), |acc, l| acc + RegExp::literal(l))
    }

    /// Kleene star of this expression.
    pub fn kstar(&self) -> RegExp<L> {
        match *self.rex {
            Rex::Zero | Rex::One => RegExp::one(),
            Rex::Kst(_) => self.clone(),
            _ => RegExp {
                rex: Rc::new(Rex::Kst(self.clone())),
            },
        }
    }

    /// Bounded repetition: the `n`-fold product of this expression with
    /// itself. `repeat(0)` is `ε`.
    pub fn repeat(&self, n: u32) -> RegExp<L> {
        let mut rep = RegExp::one();
        for _ in 0..n {
            rep = rep * self.clone();
        }
        rep
    }

    /// Check if the language of this expression contains the empty word.
    pub fn nullable(&self) -> bool {
        match *self.rex {
            Rex::Zero | Rex::Lit(_) => false,
            Rex::One | Rex::Kst(_) => true,
            Rex::Sum(ref items) => items.iter().any(|r| r.nullable()),
            Rex::And(ref items) => items.iter().all(|r| r.nullable()),
            Rex::Prd(ref items) => items.iter().all(|r| r.nullable()),
        }
    }

    /// The ν function: `ε` if this expression is nullable, `∅` otherwise.
    pub fn nu(&self) -> RegExp<L> {
        if self.nullable() {
            RegExp::one()
        } else {
            RegExp::zero()
        }
    }

    /// The Brzozowski derivative of this expression with respect to the
    /// letter `x`. The result is again in canonical form.
    pub fn derivative(&self, x: &L) -> RegExp<L> {
        match *self.rex {
            Rex::Zero | Rex::One => RegExp::zero(),
            Rex::Lit(ref c) => {
                if c == x {
                    RegExp::one()
                } else {
                    RegExp::zero()
                }
            }
            // ∂a (r + s) ≡ ∂a r + ∂a s
            Rex::Sum(ref items) => {
                let mut ds = HashSet::new();
                for r in items {
                    let d = r.derivative(x);
                    if !d.is_zero() {
                        ds.insert(d);
                    }
                }
                RegExp::sum_of(ds)
            }
            // ∂a (r & s) ≡ ∂a r & ∂a s
            Rex::And(ref items) => {
                let mut ds = HashSet::new();
                for r in items {
                    let d = r.derivative(x);
                    if d.is_zero() {
                        return d;
                    }
                    ds.insert(d);
                }
                RegExp::and_of(ds)
            }
            // ∂a (r · s) ≡ ∂a r · s + ν(r) · ∂a s
            Rex::Prd(ref items) => {
                let head = &items[0];
                let tail = RegExp::product_of(&items[1..]);
                if head.nullable() {
                    RegExp::sum(
                        RegExp::product(head.derivative(x), tail.clone()),
                        tail.derivative(x),
                    )
                } else {
                    RegExp::product(head.derivative(x), tail)
                }
            }
            // ∂a (r*) ≡ ∂a r · r*
            Rex::Kst(ref r) => RegExp::product(r.derivative(x), self.clone()),
        }
    }

    /// The derivative with respect to a word: the left-to-right fold of
    /// the letter derivative.
    pub fn derivative_word(&self, w: &[L]) -> RegExp<L> {
        let mut t = self.clone();
        for l in w {
            t = t.derivative(l);
        }
        t
    }

    /// Check if the word `w` is in the language of this expression.
    pub fn matches(&self, w: &[L]) -> bool {
        self.derivative_word(w).nullable()
    }

    /// Collect every letter occurring in this expression, in first
    /// occurrence order of a left-to-right traversal, without duplicates.
    pub fn alphabet(&self) -> Vec<L> {
        let mut seen = HashSet::new();
        let mut letters = Vec::new();
        self.traverse(&mut |l: &L| {
            if seen.insert(l.clone()) {
                letters.push(l.clone());
            }
        });
        letters
    }

    /// Map the letter type of this expression, preserving its structure.
    pub fn map<M, F>(&self, f: F) -> RegExp<M>
    where
        M: Letter,
        F: Fn(&L) -> M,
    {
        self.map_ref(&f)
    }

    /// Check if this expression is a single literal.
    pub fn is_literal(&self) -> bool {
        matches!(*self.rex, Rex::Lit(_))
    }

    /// Extract the letter of a literal expression.
    ///
    /// # Panics
    ///
    /// Panics if this expression is not a literal. Calling `letter` on a
    /// non-literal is a bug in the caller, not a recoverable condition.
    pub fn letter(&self) -> &L {
        match *self.rex {
            Rex::Lit(ref l) => l,
            _ => panic!("cannot extract letter from non literal"),
        }
    }

    fn is_zero(&self) -> bool {
        matches!(*self.rex, Rex::Zero)
    }

    fn traverse<F>(&self, f: &mut F)
    where
        F: FnMut(&L),
    {
        match *self.rex {
            Rex::Zero | Rex::One => {}
            Rex::Lit(ref l) => f(l),
            Rex::Sum(ref items) | Rex::And(ref items) => {
                for r in items {
                    r.traverse(f);
                }
            }
            Rex::Prd(ref items) => {
                for r in items {
                    r.traverse(f);
                }
            }
            Rex::Kst(ref r) => r.traverse(f),
        }
    }

    fn map_ref<M, F>(&self, f: &F) -> RegExp<M>
    where
        M: Letter,
        F: Fn(&L) -> M,
    {
        let rex = match *self.rex {
            Rex::Zero => Rex::Zero,
            Rex::One => Rex::One,
            Rex::Lit(ref l) => Rex::Lit(f(l)),
            Rex::Sum(ref items) => Rex::Sum(items.iter().map(|r| r.map_ref(f)).collect()),
            Rex::And(ref items) => Rex::And(items.iter().map(|r| r.map_ref(f)).collect()),
            Rex::Prd(ref items) => Rex::Prd(items.iter().map(|r| r.map_ref(f)).collect()),
            Rex::Kst(ref r) => Rex::Kst(r.map_ref(f)),
        };
        RegExp { rex: Rc::new(rex) }
    }

    // Product smart constructor. Implements:
    //
    //     ∅ · r ≈ ∅    r · ∅ ≈ ∅    ε · r ≈ r    r · ε ≈ r
    //     r* · r* ≈ r*
    //     (r · s) · t ≈ r · s · t ≈ r · (s · t)
    fn product(r: RegExp<L>, s: RegExp<L>) -> RegExp<L> {
        if r.is_zero() || matches!(*s.rex, Rex::One) {
            return r;
        }
        if s.is_zero() || matches!(*r.rex, Rex::One) {
            return s;
        }
        let star_square = match (&*r.rex, &*s.rex) {
            (&Rex::Kst(ref ri), &Rex::Kst(ref si)) => ri == si,
            _ => false,
        };
        if star_square {
            return r;
        }

        let mut items = Vec::new();
        match *r.rex {
            Rex::Prd(ref rs) => items.extend(rs.iter().cloned()),
            _ => items.push(r.clone()),
        }
        match *s.rex {
            Rex::Prd(ref ss) => items.extend(ss.iter().cloned()),
            _ => items.push(s.clone()),
        }
        RegExp {
            rex: Rc::new(Rex::Prd(items)),
        }
    }

    fn product_of(items: &[RegExp<L>]) -> RegExp<L> {
        if items.len() == 1 {
            items[0].clone()
        } else {
            RegExp {
                rex: Rc::new(Rex::Prd(items.to_vec())),
            }
        }
    }

    // Sum smart constructor. Implements:
    //
    //     ∅ + r ≈ r    r + ∅ ≈ r    r + r ≈ r
    //     r + s ≈ s + r
    //     (r + s) + t ≈ r + s + t ≈ r + (s + t)
    fn sum(r: RegExp<L>, s: RegExp<L>) -> RegExp<L> {
        if r.is_zero() {
            return s;
        }
        if s.is_zero() {
            return r;
        }
        if r == s {
            return r;
        }

        let mut items = HashSet::new();
        match *r.rex {
            Rex::Sum(ref rs) => items.extend(rs.iter().cloned()),
            _ => {
                items.insert(r.clone());
            }
        }
        match *s.rex {
            Rex::Sum(ref ss) => items.extend(ss.iter().cloned()),
            _ => {
                items.insert(s.clone());
            }
        }
        RegExp::sum_of(items)
    }

    fn sum_of(items: HashSet<RegExp<L>>) -> RegExp<L> {
        match items.len() {
            0 => RegExp::zero(),
            1 => items
                .into_iter()
                .next()
                .expect("a one item set has an item"),
            _ => RegExp {
                rex: Rc::new(Rex::Sum(items)),
            },
        }
    }

    // Intersection smart constructor. Implements:
    //
    //     ∅ & r ≈ ∅    r & ∅ ≈ ∅    r & r ≈ r
    //     r & s ≈ s & r
    //     (r & s) & t ≈ r & s & t ≈ r & (s & t)
    fn intersect(r: RegExp<L>, s: RegExp<L>) -> RegExp<L> {
        if r.is_zero() {
            return r;
        }
        if s.is_zero() {
            return s;
        }
        if r == s {
            return r;
        }

        let mut items = HashSet::new();
        match *r.rex {
            Rex::And(ref rs) => items.extend(rs.iter().cloned()),
            _ => {
                items.insert(r.clone());
            }
        }
        match *s.rex {
            Rex::And(ref ss) => items.extend(ss.iter().cloned()),
            _ => {
                items.insert(s.clone());
            }
        }
        RegExp::and_of(items)
    }

    fn and_of(items: HashSet<RegExp<L>>) -> RegExp<L> {
        match items.len() {
            0 => RegExp::zero(),
            1 => items
                .into_iter()
                .next()
                .expect("a one item set has an item"),
            _ => RegExp {
                rex: Rc::new(Rex::And(items)),
            },
        }
    }

    // Canonical structural hash. The combiner for the unordered Sum and
    // And items is commutative (xor with a constructor specific mask) so
    // that the hash does not depend on the iteration order of the backing
    // set. Products and stars combine order-dependently.
    fn hash_value(&self) -> u64 {
        match *self.rex {
            Rex::Zero => 0,
            Rex::One => 1,
            Rex::Lit(ref l) => {
                let mut hasher = DefaultHasher::new();
                l.hash(&mut hasher);
                hasher.finish()
            }
            Rex::Sum(ref items) => items
                .iter()
                .fold(0, |seed, r| seed ^ r.hash_value().wrapping_add(SUM_MASK)),
            Rex::And(ref items) => items
                .iter()
                .fold(0, |seed, r| seed ^ r.hash_value().wrapping_add(AND_MASK)),
            Rex::Prd(ref items) => items
                .iter()
                .fold(0, |seed, r| hash_combine(seed, PRD_MASK, r.hash_value())),
            Rex::Kst(ref r) => hash_combine(0, KST_MASK, r.hash_value()),
        }
    }
}

fn hash_combine(seed: u64, mask: u64, hash: u64) -> u64 {
    seed ^ hash
        .wrapping_add(mask)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

impl<L: Letter> PartialEq for RegExp<L> {
    fn eq(&self, other: &RegExp<L>) -> bool {
        Rc::ptr_eq(&self.rex, &other.rex) || self.rex == other.rex
    }
}

impl<L: Letter> Eq for RegExp<L> {}

impl<L: Letter> Hash for RegExp<L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl<L: Letter> Mul for RegExp<L> {
    type Output = RegExp<L>;

    /// Product (concatenation) of two regular expressions.
    fn mul(self, rhs: RegExp<L>) -> RegExp<L> {
        RegExp::product(self, rhs)
    }
}

impl<L: Letter> Add for RegExp<L> {
    type Output = RegExp<L>;

    /// Sum (alternation, logical or) of two regular expressions.
    fn add(self, rhs: RegExp<L>) -> RegExp<L> {
        RegExp::sum(self, rhs)
    }
}

impl<L: Letter> BitAnd for RegExp<L> {
    type Output = RegExp<L>;

    /// Intersection (logical and) of two regular expressions.
    fn bitand(self, rhs: RegExp<L>) -> RegExp<L> {
        RegExp::intersect(self, rhs)
    }
}

impl<L: Letter> Display for RegExp<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.rex {
            Rex::Zero => write!(f, "∅"),
            Rex::One => write!(f, "ε"),
            Rex::Lit(ref l) => write!(f, "{}", l),
            Rex::Sum(ref items) => write!(f, "({})", items.iter().join("+")),
            Rex::And(ref items) => write!(f, "({})", items.iter().join("&")),
            Rex::Prd(ref items) => write!(f, "({})", items.iter().join("·")),
            Rex::Kst(ref r) => write!(f, "({})*", r),
        }
    }
}

impl<L: Letter> fmt::Debug for RegExp<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
