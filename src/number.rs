//! Complex-valued numbers.
//!
//! Numbers hold a complex double. Arithmetic follows host complex
//! semantics, with one policy applied throughout: operations that are
//! undefined on complex or NaN input (modulus, floor division, remainder)
//! and division by zero produce the NaN number rather than an error.
//! Ordering exists only between real, non-NaN numbers.

use std::cmp::Ordering;

use num_complex::Complex64;

use crate::format::FormatSpec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    value: Complex64,
}

impl Number {
    pub fn new(re: f64, im: f64) -> Self {
        Number {
            value: Complex64::new(re, im),
        }
    }

    pub fn nan() -> Self {
        Number::new(f64::NAN, f64::NAN)
    }

    /// Parse the body of a numeric literal.
    ///
    /// Accepted forms: the empty string (zero), `nan`, `inf`/`+inf`/`-inf`,
    /// a real like `3.5` or `-2`, an imaginary like `4j`/`-1.5i`, and a
    /// complex pair written `(3, 4j)` or `3 + 4j` (commas and parentheses
    /// read as spacing). Unreadable components read as zero; a malformed
    /// sign token makes the whole literal NaN.
    pub fn from_literal(text: &str) -> Self {
        let text = text.trim().to_lowercase();

        if text.is_empty() {
            return Number::new(0.0, 0.0);
        }

        match text.as_str() {
            "nan" => return Number::nan(),
            "inf" | "+inf" => return Number::new(f64::INFINITY, f64::INFINITY),
            "-inf" => return Number::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            _ => {}
        }

        let spaced: String = text
            .chars()
            .map(|c| if matches!(c, ',' | '(' | ')') { ' ' } else { c })
            .collect();

        let mut tokens: Vec<&str> = spaced.split_whitespace().collect();

        let mut real = 0.0;
        let mut imag = 0.0;

        if let Some(&last) = tokens.last() {
            if last.ends_with('i') || last.ends_with('j') || tokens.len() > 1 {
                let mut body = last.chars();
                body.next_back();
                imag = body.as_str().parse::<f64>().unwrap_or(0.0);
                tokens.pop();
            }
        }

        if tokens.len() > 1 {
            match tokens.pop() {
                Some("-") => imag = -imag,
                Some("+") => {}
                _ => return Number::nan(),
            }
        }

        if let Some(&first) = tokens.first() {
            real = first.parse::<f64>().unwrap_or(0.0);
        }

        Number::new(real, imag)
    }

    pub fn real_part(&self) -> f64 {
        self.value.re
    }

    pub fn imag_part(&self) -> f64 {
        self.value.im
    }

    pub fn is_nan(&self) -> bool {
        self.value.re.is_nan() || self.value.im.is_nan()
    }

    pub fn is_complex(&self) -> bool {
        self.value.im != 0.0
    }

    fn is_zero(&self) -> bool {
        self.value.re == 0.0 && self.value.im == 0.0
    }

    pub fn is_truthy(&self) -> bool {
        !self.is_nan() && !self.is_zero()
    }

    pub fn integer_view(&self) -> i64 {
        if self.value.re.is_nan() {
            0
        } else {
            self.value.re as i64
        }
    }

    /// Ordered only when both sides are real and neither is NaN.
    pub fn compare(&self, other: &Number) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() || self.is_complex() || other.is_complex() {
            return None;
        }

        self.value.re.partial_cmp(&other.value.re)
    }

    pub fn add(&self, other: &Number) -> Number {
        Number {
            value: self.value + other.value,
        }
    }

    pub fn sub(&self, other: &Number) -> Number {
        Number {
            value: self.value - other.value,
        }
    }

    pub fn mul(&self, other: &Number) -> Number {
        Number {
            value: self.value * other.value,
        }
    }

    pub fn div(&self, other: &Number) -> Number {
        if other.is_zero() {
            return Number::nan();
        }

        Number {
            value: self.value / other.value,
        }
    }

    /// Integer modulus over the real parts. Complex or NaN operands, and a
    /// zero divisor, yield NaN.
    pub fn modulo(&self, other: &Number) -> Number {
        if self.is_nan() || other.is_nan() || self.is_complex() || other.is_complex() {
            return Number::nan();
        }

        let divisor = other.value.re as i64;
        if divisor == 0 {
            return Number::nan();
        }

        Number::new(((self.value.re as i64) % divisor) as f64, 0.0)
    }

    /// Floor division over the real parts; NaN on complex or NaN input.
    pub fn floor_div(&self, other: &Number) -> Number {
        if self.is_nan() || other.is_nan() || self.is_complex() || other.is_complex() {
            return Number::nan();
        }

        if other.value.re == 0.0 {
            return Number::nan();
        }

        Number::new((self.value.re / other.value.re).floor(), 0.0)
    }

    /// Fractional remainder of the quotient; NaN on complex or NaN input.
    pub fn remainder(&self, other: &Number) -> Number {
        if self.is_nan() || other.is_nan() || self.is_complex() || other.is_complex() {
            return Number::nan();
        }

        if other.value.re == 0.0 {
            return Number::nan();
        }

        let quotient = self.value.re / other.value.re;
        Number::new(quotient - quotient.floor(), 0.0)
    }

    pub fn pow(&self, other: &Number) -> Number {
        if self.is_nan() || other.is_nan() {
            return Number::nan();
        }

        // Real bases stay on the real power path, which is exact where the
        // complex exponential is not; a negative base with a fractional
        // exponent needs the complex plane.
        if !self.is_complex()
            && !other.is_complex()
            && (self.value.re >= 0.0 || other.value.re.fract() == 0.0)
        {
            return Number::new(self.value.re.powf(other.value.re), 0.0);
        }

        Number {
            value: self.value.powc(other.value),
        }
    }

    /// Reduce to the root of: `x.root(n)` is `x ** (1/n)`.
    pub fn root(&self, other: &Number) -> Number {
        if other.is_zero() {
            return Number::nan();
        }

        self.pow(&Number {
            value: Complex64::new(1.0, 0.0) / other.value,
        })
    }

    pub fn negate(&self) -> Number {
        if self.is_nan() {
            return Number::nan();
        }

        Number { value: -self.value }
    }

    /// Absolute value: the complex modulus.
    pub fn abs(&self) -> Number {
        Number::new(self.value.norm(), 0.0)
    }

    pub fn real(&self) -> Number {
        Number::new(self.value.re, 0.0)
    }

    pub fn imag(&self) -> Number {
        Number::new(self.value.im, 0.0)
    }

    /// Render one floating-point component honoring the format's type,
    /// precision, and sign directives.
    fn render_component(x: f64, fmt: &FormatSpec) -> String {
        if x.is_nan() {
            return "nan".to_owned();
        }
        if x.is_infinite() {
            return if x < 0.0 { "-inf" } else { "inf" }.to_owned();
        }

        let body = match fmt.type_char() {
            Some('b') | Some('B') => format!("{:b}", x as i64),
            Some('o') | Some('O') => format!("{:o}", x as i64),
            Some('x') => format!("{:x}", x as i64),
            Some('X') => format!("{:X}", x as i64),
            Some('d') | Some('D') => format!("{}", x as i64),
            Some('e') => format!("{:e}", x),
            Some('E') => format!("{:E}", x),
            Some('f') | Some('F') => match fmt.precision() {
                Some(p) => format!("{x:.p$}"),
                None => format!("{x:.6}"),
            },
            Some('c') | Some('C') => {
                let code = x as u32;
                char::from_u32(code).map(String::from).unwrap_or_default()
            }
            _ => match fmt.precision() {
                Some(p) => format!("{x:.p$}"),
                None => format!("{x}"),
            },
        };

        match fmt.sign() {
            Some('+') if x >= 0.0 && !body.starts_with('+') => format!("+{body}"),
            Some(' ') if x >= 0.0 => format!(" {body}"),
            _ => body,
        }
    }

    pub fn render(&self, fmt: &FormatSpec) -> String {
        if self.is_nan() {
            return fmt.pad("nan".to_owned(), '>');
        }

        let re = self.value.re;
        let im = self.value.im;

        let rendered = if im != 0.0 && re == 0.0 {
            format!("{}j", Number::render_component(im, fmt))
        } else if im == 0.0 {
            Number::render_component(re, fmt)
        } else {
            format!(
                "({},{}j)",
                Number::render_component(re, fmt),
                Number::render_component(im, fmt)
            )
        };

        fmt.pad(rendered, '>')
    }
}

impl From<i64> for Number {
    fn from(x: i64) -> Self {
        Number::new(x as f64, 0.0)
    }
}

impl From<f64> for Number {
    fn from(x: f64) -> Self {
        Number::new(x, 0.0)
    }
}
