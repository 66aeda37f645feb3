//! Shell argument validation
//!
//! Numbers follow C integer-literal conventions: `0x` prefix for hex, a
//! leading `0` for octal, decimal otherwise, with an optional sign. Values are
//! parsed as signed 64-bit first so that `-1` is reported as out of range
//! rather than as garbage.

use crate::error::{Error, Result};

/// Parse a token as a 32-bit unsigned value
pub fn parse_u32(token: &str) -> Result<u32> {
    let invalid = || Error::InvalidNumber(token.to_string());

    let (negative, body) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };

    let (radix, digits) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        (16, hex)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };

    // from_str_radix accepts its own sign; reject anything but digits here
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid());
    }

    // Sign and digits together so that i64::MIN parses
    let signed = if negative {
        format!("-{}", digits)
    } else {
        digits.to_string()
    };
    let value = i64::from_str_radix(&signed, radix).map_err(|_| invalid())?;

    u32::try_from(value).map_err(|_| Error::OutOfRange(format!("Number \"{}\"", token)))
}

/// Check that `count` bytes starting at `address` stay inside the 32-bit
/// address space
pub fn check_span(address: u32, count: u32) -> Result<()> {
    if address as u64 + count as u64 > 1u64 << 32 {
        return Err(Error::OutOfRange(format!(
            "Range 0x{:08x}+0x{:x}",
            address, count
        )));
    }
    Ok(())
}

/// Number of positional arguments a command accepts
///
/// Counts exclude the command name itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Exact(usize),
    /// Between `min` and `max` arguments, inclusive
    Range(usize, usize),
    /// Any number of arguments
    Any,
}

impl Arity {
    /// Whether `argc` positional arguments satisfy this arity
    pub fn accepts(&self, argc: usize) -> bool {
        match *self {
            Arity::Exact(n) => argc == n,
            Arity::Range(min, max) => (min..=max).contains(&argc),
            Arity::Any => true,
        }
    }

    /// Validate `argc`, describing the requirement on failure
    pub fn check(&self, argc: usize) -> Result<()> {
        if self.accepts(argc) {
            return Ok(());
        }
        let message = match *self {
            Arity::Exact(n) => format!(
                "Command requires {} argument{}",
                n,
                if n == 1 { "" } else { "s" }
            ),
            Arity::Range(min, max) => format!("Command requires {} to {} arguments", min, max),
            Arity::Any => unreachable!("Arity::Any accepts every count"),
        };
        Err(Error::Usage(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("0", 0 ; "zero")]
    #[test_case("26", 26 ; "decimal")]
    #[test_case("0x1A", 26 ; "hex upper")]
    #[test_case("0x1a", 26 ; "hex lower")]
    #[test_case("0X1a", 26 ; "hex capital prefix")]
    #[test_case("032", 26 ; "octal")]
    #[test_case("+7", 7 ; "explicit plus")]
    #[test_case("-0", 0 ; "negative zero")]
    #[test_case("4294967295", u32::MAX ; "max")]
    #[test_case("0xffffffff", u32::MAX ; "max hex")]
    fn test_parse_valid(token: &str, expected: u32) {
        assert_eq!(parse_u32(token).unwrap(), expected);
    }

    #[test_case("12x" ; "trailing garbage")]
    #[test_case("" ; "empty")]
    #[test_case("abc" ; "letters")]
    #[test_case("0x" ; "bare hex prefix")]
    #[test_case("08" ; "bad octal digit")]
    #[test_case("0xg1" ; "bad hex digit")]
    #[test_case("--1" ; "double sign")]
    #[test_case("1 2" ; "embedded space")]
    #[test_case("99999999999999999999" ; "overflows i64")]
    fn test_parse_invalid(token: &str) {
        assert!(matches!(parse_u32(token), Err(Error::InvalidNumber(_))));
    }

    #[test_case("-1" ; "negative")]
    #[test_case("4294967296" ; "just above max")]
    #[test_case("0x100000000" ; "hex above max")]
    #[test_case("-9223372036854775808" ; "i64 min")]
    #[test_case("-0x8000000000000000" ; "i64 min hex")]
    fn test_parse_out_of_range(token: &str) {
        assert!(matches!(parse_u32(token), Err(Error::OutOfRange(_))));
    }

    proptest! {
        #[test]
        fn prop_decimal_and_hex_accepted(value: u32) {
            prop_assert_eq!(parse_u32(&value.to_string()).unwrap(), value);
            prop_assert_eq!(parse_u32(&format!("{:#x}", value)).unwrap(), value);
        }

        #[test]
        fn prop_negative_rejected(value in 1i64..=i64::MAX) {
            let token = format!("-{}", value);
            prop_assert!(matches!(parse_u32(&token), Err(Error::OutOfRange(_))));
        }

        #[test]
        fn prop_above_u32_rejected(value in (u32::MAX as i64 + 1)..=i64::MAX) {
            prop_assert!(matches!(parse_u32(&value.to_string()), Err(Error::OutOfRange(_))));
        }
    }

    #[test]
    fn test_arity_exact() {
        assert!(Arity::Exact(2).check(2).is_ok());
        let err = Arity::Exact(2).check(1).unwrap_err();
        assert_eq!(err.to_string(), "Command requires 2 arguments");
        let err = Arity::Exact(1).check(0).unwrap_err();
        assert_eq!(err.to_string(), "Command requires 1 argument");
        let err = Arity::Exact(0).check(1).unwrap_err();
        assert_eq!(err.to_string(), "Command requires 0 arguments");
    }

    #[test]
    fn test_arity_range() {
        let arity = Arity::Range(1, 2);
        assert!(!arity.accepts(0));
        assert!(arity.accepts(1));
        assert!(arity.accepts(2));
        assert!(!arity.accepts(3));
        assert_eq!(
            arity.check(3).unwrap_err().to_string(),
            "Command requires 1 to 2 arguments"
        );
        assert!(Arity::Any.check(100).is_ok());
    }

    #[test]
    fn test_check_span() {
        assert!(check_span(0, u32::MAX).is_ok());
        assert!(check_span(0xffff_fff0, 0x10).is_ok());
        assert!(matches!(
            check_span(0xffff_fff0, 0x11),
            Err(Error::OutOfRange(_))
        ));
    }
}
