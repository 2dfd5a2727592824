//! Exact decimal numbers.
//!
//! JSON numbers compare by mathematical value, and `multipleOf` must be
//! exact for decimal fractions: `5.1` is a multiple of `0.1` even though
//! neither is representable in binary floating point. Numbers are parsed
//! from their literal text (serde_json's `arbitrary_precision` feature
//! preserves it) into a normalized `mantissa * 10^exponent` form. Values
//! whose digits overflow an `i128` degrade to an `f64` approximation.

use std::cmp::Ordering;
use std::fmt;

/// A JSON number with decimal-exact semantics.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// `mantissa * 10^exponent`, normalized: a zero mantissa has exponent 0,
    /// a nonzero mantissa is not divisible by 10.
    Exact { mantissa: i128, exponent: i32 },
    /// Fallback for literals that exceed exact range.
    Approx(f64),
}

fn pow10(n: u32) -> Option<i128> {
    let mut out: i128 = 1;
    for _ in 0..n {
        out = out.checked_mul(10)?;
    }
    Some(out)
}

fn normalized(mut mantissa: i128, mut exponent: i32) -> Number {
    if mantissa == 0 {
        return Number::Exact {
            mantissa: 0,
            exponent: 0,
        };
    }
    while mantissa % 10 == 0 {
        mantissa /= 10;
        exponent += 1;
    }
    Number::Exact { mantissa, exponent }
}

impl Number {
    /// Parse a JSON number literal (`-1.25e3`, `0.1`, `42`, ...).
    pub fn from_literal(text: &str) -> Option<Self> {
        let mut rest = text;
        let negative = if let Some(r) = rest.strip_prefix('-') {
            rest = r;
            true
        } else {
            false
        };

        let int_end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        if int_end == 0 {
            return None;
        }
        let int_part = &rest[..int_end];
        rest = &rest[int_end..];

        let frac_part = if let Some(r) = rest.strip_prefix('.') {
            let frac_end = r.bytes().take_while(|b| b.is_ascii_digit()).count();
            if frac_end == 0 {
                return None;
            }
            rest = &r[frac_end..];
            &r[..frac_end]
        } else {
            ""
        };

        let mut exponent: i32 = 0;
        if let Some(r) = rest.strip_prefix(['e', 'E']) {
            exponent = r.parse().ok()?;
            rest = "";
        }
        if !rest.is_empty() {
            return None;
        }

        let digits = format!("{int_part}{frac_part}");
        let exponent = exponent.checked_sub(frac_part.len() as i32)?;
        match digits.trim_start_matches('0').parse::<i128>() {
            Ok(mantissa) => {
                let mantissa = if negative { -mantissa } else { mantissa };
                Some(normalized(mantissa, exponent))
            }
            Err(_) if digits.trim_start_matches('0').is_empty() => Some(normalized(0, 0)),
            Err(_) => text.parse::<f64>().ok().map(Number::Approx),
        }
    }

    pub fn from_serde(n: &serde_json::Number) -> Self {
        Self::from_literal(&n.to_string())
            .unwrap_or_else(|| Number::Approx(n.as_f64().unwrap_or(0.0)))
    }

    pub fn from_u64(n: u64) -> Self {
        normalized(n as i128, 0)
    }

    pub fn from_i64(n: i64) -> Self {
        normalized(n as i128, 0)
    }

    /// Whether the number is mathematically an integer.
    pub fn is_integer(&self) -> bool {
        match self {
            Number::Exact { exponent, .. } => *exponent >= 0,
            Number::Approx(f) => f.fract() == 0.0,
        }
    }

    /// The value as a `u64`, if it is a non-negative integer in range.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Number::Exact { mantissa, exponent } => {
                if *mantissa < 0 || *exponent < 0 {
                    return None;
                }
                let scaled = mantissa.checked_mul(pow10(*exponent as u32)?)?;
                u64::try_from(scaled).ok()
            }
            Number::Approx(f) => {
                if *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64 {
                    Some(*f as u64)
                } else {
                    None
                }
            }
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Exact { mantissa, exponent } => {
                *mantissa as f64 * 10f64.powi(*exponent)
            }
            Number::Approx(f) => *f,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Exact { mantissa, .. } => *mantissa == 0,
            Number::Approx(f) => *f == 0.0,
        }
    }

    pub fn is_positive(&self) -> bool {
        match self {
            Number::Exact { mantissa, .. } => *mantissa > 0,
            Number::Approx(f) => *f > 0.0,
        }
    }

    /// Exact multiple check: `self == k * divisor` for some integer `k`.
    pub fn is_multiple_of(&self, divisor: &Number) -> bool {
        if divisor.is_zero() {
            return false;
        }
        if let (
            Number::Exact {
                mantissa: ma,
                exponent: ea,
            },
            Number::Exact {
                mantissa: mb,
                exponent: eb,
            },
        ) = (self, divisor)
        {
            let e = (*ea).min(*eb);
            let scaled = |m: i128, exp: i32| -> Option<i128> {
                m.checked_mul(pow10((exp - e) as u32)?)
            };
            if let (Some(a), Some(b)) = (scaled(*ma, *ea), scaled(*mb, *eb)) {
                return a % b == 0;
            }
        }
        let quotient = self.to_f64() / divisor.to_f64();
        (quotient - quotient.round()).abs() <= 1e-9 * quotient.abs().max(1.0)
    }

    fn aligned(&self, other: &Number) -> Option<(i128, i128)> {
        if let (
            Number::Exact {
                mantissa: ma,
                exponent: ea,
            },
            Number::Exact {
                mantissa: mb,
                exponent: eb,
            },
        ) = (self, other)
        {
            let e = (*ea).min(*eb);
            let a = ma.checked_mul(pow10((*ea - e) as u32)?)?;
            let b = mb.checked_mul(pow10((*eb - e) as u32)?)?;
            Some((a, b))
        } else {
            None
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match self.aligned(other) {
            Some((a, b)) => a == b,
            None => self.to_f64() == other.to_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.aligned(other) {
            Some((a, b)) => a.partial_cmp(&b),
            None => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Exact { mantissa, exponent } => {
                if *exponent >= 0 {
                    write!(f, "{}", mantissa)?;
                    for _ in 0..*exponent {
                        f.write_str("0")?;
                    }
                    Ok(())
                } else {
                    let digits = mantissa.unsigned_abs().to_string();
                    let frac_len = (-exponent) as usize;
                    let sign = if *mantissa < 0 { "-" } else { "" };
                    if digits.len() > frac_len {
                        let (int_part, frac_part) = digits.split_at(digits.len() - frac_len);
                        write!(f, "{sign}{int_part}.{frac_part}")
                    } else {
                        write!(f, "{sign}0.{}{digits}", "0".repeat(frac_len - digits.len()))
                    }
                }
            }
            Number::Approx(v) => write!(f, "{v}"),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> Number {
        Number::from_literal(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(num("42").to_string(), "42");
        assert_eq!(num("-1.5").to_string(), "-1.5");
        assert_eq!(num("0.1").to_string(), "0.1");
        assert_eq!(num("1e3").to_string(), "1000");
        assert_eq!(num("1.25e2").to_string(), "125");
        assert_eq!(num("25e-3").to_string(), "0.025");
        assert_eq!(num("0").to_string(), "0");
        assert_eq!(num("0.00").to_string(), "0");
    }

    #[test]
    fn test_mathematical_equality() {
        assert_eq!(num("1"), num("1.0"));
        assert_eq!(num("1e2"), num("100"));
        assert_eq!(num("0.1"), num("0.10"));
        assert_ne!(num("0.1"), num("0.2"));
        assert_ne!(num("1"), num("-1"));
    }

    #[test]
    fn test_ordering() {
        assert!(num("0.5") < num("1"));
        assert!(num("-3") < num("0.1"));
        assert!(num("2e3") > num("1999.5"));
        assert!(num("1.0") <= num("1"));
    }

    #[test]
    fn test_is_integer() {
        assert!(num("5").is_integer());
        assert!(num("5.0").is_integer());
        assert!(num("1e2").is_integer());
        assert!(!num("5.1").is_integer());
    }

    #[test]
    fn test_as_u64() {
        assert_eq!(num("5").as_u64(), Some(5));
        assert_eq!(num("5.0").as_u64(), Some(5));
        assert_eq!(num("-5").as_u64(), None);
        assert_eq!(num("5.5").as_u64(), None);
    }

    #[test]
    fn test_exact_multiple_of() {
        // The binary-float trap: 5.1 / 0.1 is not integral in f64.
        assert!(num("5.1").is_multiple_of(&num("0.1")));
        assert!(num("0.0075").is_multiple_of(&num("0.0001")));
        assert!(num("9").is_multiple_of(&num("3")));
        assert!(!num("9").is_multiple_of(&num("4")));
        assert!(!num("5.15").is_multiple_of(&num("0.1")));
        assert!(!num("1").is_multiple_of(&num("0")));
    }

    #[test]
    fn test_huge_literal_degrades_gracefully() {
        let n = Number::from_literal("1e400").unwrap();
        assert!(matches!(n, Number::Exact { .. }) || matches!(n, Number::Approx(_)));
    }
}
