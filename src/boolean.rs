//! Fuzzy booleans.
//!
//! A boolean is a weighted term `(term, certainty)`, each bound to the range
//! `[0, 1]`. The value is truthy when the term meets or exceeds the
//! certainty threshold. Values outside the range collapse to NaN, the
//! undefined boolean, which is never truthy and never ordered.

use std::cmp::Ordering;

/// Weighted truth value. Logical operations combine terms by min/max and
/// average the certainties of the two operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boolean {
    term: f64,
    cert: f64,
}

impl Boolean {
    pub fn new(term: f64, cert: f64) -> Self {
        let mut b = Boolean { term, cert };
        b.confirm_values();
        b
    }

    /// The undefined boolean.
    pub fn undefined() -> Self {
        Boolean {
            term: f64::NAN,
            cert: f64::NAN,
        }
    }

    /// Interpret a boolean word from source text. `undef`/`undefined`
    /// produce the NaN boolean; unrecognized words read as false.
    pub fn from_word(word: &str) -> Self {
        match word {
            "true" | "1" => Boolean::from(true),
            "false" | "0" => Boolean::from(false),
            "undef" | "undefined" => Boolean::undefined(),
            _ => Boolean::from(false),
        }
    }

    fn confirm_values(&mut self) {
        if !(0.0..=1.0).contains(&self.term) || !(0.0..=1.0).contains(&self.cert) {
            *self = Boolean::undefined();
        }
    }

    pub fn term(&self) -> f64 {
        self.term
    }

    pub fn certainty(&self) -> f64 {
        self.cert
    }

    pub fn is_undefined(&self) -> bool {
        self.term.is_nan() || self.cert.is_nan()
    }

    /// Truthy when the term meets the certainty threshold. NaN booleans are
    /// never truthy.
    pub fn is_truthy(&self) -> bool {
        self.term >= self.cert
    }

    /// Conjunction: minimum of the terms, averaged certainty.
    pub fn and(&self, other: &Boolean) -> Boolean {
        Boolean {
            term: self.term.min(other.term),
            cert: (self.cert + other.cert) / 2.0,
        }
    }

    /// Inclusive disjunction: maximum of the terms, averaged certainty.
    pub fn or(&self, other: &Boolean) -> Boolean {
        Boolean {
            term: self.term.max(other.term),
            cert: (self.cert + other.cert) / 2.0,
        }
    }

    /// Exclusive disjunction, driven by the signs of `term - certainty` on
    /// each side: differing signs keep the disjunction, matching signs with
    /// a non-zero sum invert the combined term.
    pub fn xor(&self, other: &Boolean) -> Boolean {
        let x = self.term - self.cert;
        let y = other.term - other.cert;

        let mut result = self.or(other);

        let p = x < 0.0;
        let q = y < 0.0;

        if p ^ q {
            return result;
        }

        if x + y != 0.0 {
            result.term = 1.0 - result.term;
        }

        result
    }

    /// Negation maps the term across the unit interval.
    pub fn negate(&self) -> Boolean {
        Boolean {
            term: 1.0 - self.term,
            cert: self.cert,
        }
    }

    /// Booleans order by their crisp truthiness; NaN booleans are unordered.
    pub fn compare(&self, other: &Boolean) -> Option<Ordering> {
        if self.is_undefined() || other.is_undefined() {
            return None;
        }

        Some(self.is_truthy().cmp(&other.is_truthy()))
    }

    pub fn render(&self, numeric: bool) -> String {
        match (self.is_truthy(), numeric) {
            (true, false) => "true".to_owned(),
            (false, false) => "false".to_owned(),
            (true, true) => "1".to_owned(),
            (false, true) => "0".to_owned(),
        }
    }
}

impl From<bool> for Boolean {
    fn from(x: bool) -> Self {
        Boolean {
            term: if x { 1.0 } else { 0.0 },
            cert: 1.0,
        }
    }
}
