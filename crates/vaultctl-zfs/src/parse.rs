//! Parsing of human-readable capacity literals.

use std::fmt;
use vaultctl_core::error::{VaultctlError, VaultctlResult};

/// Units in ascending order; the multiplier for index `i` is `1024^i`.
const UNITS: &[&str] = &["B", "K", "M", "G", "T", "P", "E", "Z", "Y"];

/// A capacity as supplied by the operator together with its resolved byte
/// count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Size {
    literal: String,
    bytes: u64,
}

impl Size {
    /// Resolve a literal like `10M` or `1.5G` to exact bytes.
    ///
    /// The numeric prefix may carry a decimal point; the unit is one of
    /// `B K M G T P E Z Y` with binary (1024-based) multipliers. A trailing
    /// lowercase `k` is accepted as an alias for `K`; no other lowercase
    /// unit is.
    pub fn parse(literal: &str) -> VaultctlResult<Self> {
        Ok(Self {
            literal: literal.to_string(),
            bytes: parse_size(literal)?,
        })
    }

    /// The literal as supplied by the operator.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// The resolved byte count.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

fn parse_size(literal: &str) -> VaultctlResult<u64> {
    let split = literal
        .find(|ch: char| !ch.is_ascii_digit() && ch != '.')
        .unwrap_or(literal.len());
    let (prefix, unit) = literal.split_at(split);

    let value: f64 = prefix
        .parse()
        .map_err(|_| size_format_error(literal))?;

    let unit = unit.trim();
    let unit = if unit == "k" { "K" } else { unit };
    let exponent = UNITS
        .iter()
        .position(|candidate| *candidate == unit)
        .ok_or_else(|| size_format_error(literal))?;

    Ok((value * 1024f64.powi(exponent as i32)).round() as u64)
}

fn size_format_error(literal: &str) -> VaultctlError {
    VaultctlError::SizeFormat {
        literal: literal.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_binary_multipliers() {
        for (literal, bytes) in [
            ("1B", 1),
            ("10K", 10_240),
            ("400M", 419_430_400),
            ("11G", 11_811_160_064),
            ("1T", 1_099_511_627_776),
            ("2P", 2_251_799_813_685_248),
        ] {
            assert_eq!(Size::parse(literal).unwrap().bytes(), bytes, "{literal}");
        }
    }

    #[test]
    fn lowercase_k_is_an_alias() {
        assert_eq!(
            Size::parse("10k").unwrap().bytes(),
            Size::parse("10K").unwrap().bytes()
        );
    }

    #[test]
    fn fractional_prefixes_are_supported() {
        assert_eq!(Size::parse("1.5G").unwrap().bytes(), 1_610_612_736);
        assert_eq!(Size::parse("0.5K").unwrap().bytes(), 512);
    }

    #[test]
    fn whitespace_before_the_unit_is_tolerated() {
        assert_eq!(Size::parse("10 M").unwrap().bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn rejects_unparseable_literals() {
        for literal in ["", "abc", "10X", "10", "1.2.3G", "10m", "10KB", "-5G"] {
            let err = Size::parse(literal).unwrap_err();
            match err {
                VaultctlError::SizeFormat { literal: reported } => {
                    assert_eq!(reported, literal);
                }
                other => panic!("unexpected error for {literal:?}: {other}"),
            }
        }
    }

    #[test]
    fn keeps_the_operator_literal() {
        let size = Size::parse("1.5G").unwrap();
        assert_eq!(size.literal(), "1.5G");
        assert_eq!(size.to_string(), "1.5G");
    }
}
