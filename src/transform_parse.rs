//! Transform description strings.
//!
//! Reads lists such as `"translate(10,5) rotate(30) scale(2)"` into a
//! single [`Matrix3`]. Items compose left to right as `m = m ∘ item`, so the
//! rightmost item acts first on a point.
//!
//! Parsing is lenient: it stops at the first token it cannot read and keeps
//! everything read before that point, including the leading arguments of
//! the item that was cut short. A string that yields nothing leaves the
//! identity matrix.

use crate::basics::deg2rad;
use crate::matrix::{multiply, Matrix3};
use std::fmt;

/// Position and reason for stopping early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStop {
    pub offset: usize,
    pub message: &'static str,
}

impl fmt::Display for ParseStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transform string stopped at byte {}: {}",
            self.offset, self.message
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Matrix,
    Translate,
    Scale,
    Rotate,
    Shear,
}

impl ItemKind {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "matrix" => Some(Self::Matrix),
            "translate" => Some(Self::Translate),
            "scale" => Some(Self::Scale),
            "rotate" => Some(Self::Rotate),
            "shear" => Some(Self::Shear),
            _ => None,
        }
    }

    fn max_args(self) -> usize {
        match self {
            Self::Matrix => 9,
            Self::Translate | Self::Scale | Self::Shear => 2,
            Self::Rotate => 3,
        }
    }

    /// Build the item matrix from however many arguments were read.
    /// `None` means nothing usable was read.
    fn to_matrix(self, args: &[f64]) -> Option<Matrix3> {
        if args.is_empty() {
            return None;
        }
        let arg = |i: usize, default: f64| args.get(i).copied().unwrap_or(default);
        let m = match self {
            Self::Matrix => {
                let mut m = Matrix3::identity();
                for (i, v) in args.iter().enumerate() {
                    m.coeff[i / 3][i % 3] = *v;
                }
                m
            }
            Self::Translate => Matrix3::new_translation(arg(0, 0.0), arg(1, 0.0)),
            Self::Scale => Matrix3::new_scaling(arg(0, 1.0), arg(1, arg(0, 1.0))),
            Self::Rotate => {
                let mut m = Matrix3::new_rotation(deg2rad(arg(0, 0.0)));
                m.originate(arg(1, 0.0), arg(2, 0.0));
                m
            }
            Self::Shear => Matrix3::new_shearing(arg(0, 0.0), arg(1, 0.0)),
        };
        Some(m)
    }
}

// ============================================================================
// Cursor
// ============================================================================

struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace() || c == b',') {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == b'-') {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// `[+-]?(digits[.digits]|.digits)([eE][+-]?digits)?`
    fn number(&mut self) -> Option<f64> {
        self.skip_whitespace();
        let start = self.pos;
        let mut i = self.pos;
        if matches!(self.bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let int_start = i;
        while matches!(self.bytes.get(i), Some(c) if c.is_ascii_digit()) {
            i += 1;
        }
        let mut digits = i - int_start;
        if self.bytes.get(i) == Some(&b'.') {
            i += 1;
            let frac_start = i;
            while matches!(self.bytes.get(i), Some(c) if c.is_ascii_digit()) {
                i += 1;
            }
            digits += i - frac_start;
        }
        if digits == 0 {
            return None;
        }
        if matches!(self.bytes.get(i), Some(b'e' | b'E')) {
            let mut j = i + 1;
            if matches!(self.bytes.get(j), Some(b'+' | b'-')) {
                j += 1;
            }
            let exp_start = j;
            while matches!(self.bytes.get(j), Some(c) if c.is_ascii_digit()) {
                j += 1;
            }
            if j > exp_start {
                i = j;
            }
        }
        let v = self.input[start..i].parse::<f64>().ok()?;
        self.pos = i;
        Some(v)
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Parse a transform list, reporting where parsing stopped if it did.
pub fn parse_transform_lenient(input: &str) -> (Matrix3, Option<ParseStop>) {
    let mut matrix = Matrix3::identity();
    let mut cur = Cursor::new(input);

    loop {
        cur.skip_separators();
        if cur.at_end() {
            return (matrix, None);
        }

        let name_at = cur.pos;
        let Some(kind) = ItemKind::from_name(cur.ident()) else {
            return (matrix, Some(stop(name_at, "unknown transform name")));
        };
        if !cur.eat(b'(') {
            return (matrix, Some(stop(cur.pos, "expected '('")));
        }

        let mut args = Vec::with_capacity(kind.max_args());
        let mut failure = None;
        loop {
            if cur.eat(b')') {
                break;
            }
            if args.len() == kind.max_args() {
                failure = Some(stop(cur.pos, "too many arguments"));
                break;
            }
            match cur.number() {
                Some(v) => args.push(v),
                None => {
                    failure = Some(stop(cur.pos, "expected a number"));
                    break;
                }
            }
            cur.eat(b',');
        }

        if let Some(item) = kind.to_matrix(&args) {
            matrix = multiply(&matrix, &item);
        }
        if failure.is_some() {
            return (matrix, failure);
        }
    }
}

/// Parse a transform list. Malformed input is logged and whatever was read
/// before the error is kept.
pub fn parse_transform(input: &str) -> Matrix3 {
    let (matrix, stopped) = parse_transform_lenient(input);
    if let Some(s) = stopped {
        tracing::warn!(input, "{s}; keeping the coefficients read so far");
    }
    matrix
}

fn stop(offset: usize, message: &'static str) -> ParseStop {
    ParseStop { offset, message }
}
