//! Flexible geometry units.
//!
//! | Written as | Meaning |
//! |---|---|
//! | `50.0`, `50`, `"50"`, `"50%"` | 50 % of the reference side |
//! | `0.5` | fractions strictly between 0 and 1 are read as percent (50 %) |
//! | `"20px"` | 20 pixels regardless of surface size |
//!
//! The reference side is the surface height for vertical coordinates and the
//! surface width for everything else, radius and length included.

use std::fmt;
use std::str::FromStr;

use teleop_types::TeleopError;

use crate::surface::SurfaceSize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Percent(f64),
    Pixels(i32),
}

/// Which surface side a dimension is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Width,
    Height,
}

impl Dimension {
    pub fn percent(value: f64) -> Self {
        if value > 0.0 && value < 1.0 {
            Dimension::Percent(value * 100.0)
        } else {
            Dimension::Percent(value)
        }
    }

    pub fn px(value: i32) -> Self {
        Dimension::Pixels(value)
    }

    /// Absolute pixels against a side of `reference` pixels.
    pub fn resolve(&self, reference: u32) -> i32 {
        match *self {
            Dimension::Percent(p) => (p * f64::from(reference) / 100.0).round() as i32,
            Dimension::Pixels(px) => px,
        }
    }

    pub fn resolve_on(&self, size: SurfaceSize, reference: Reference) -> i32 {
        match reference {
            Reference::Width => self.resolve(size.width),
            Reference::Height => self.resolve(size.height),
        }
    }
}

impl From<f64> for Dimension {
    fn from(value: f64) -> Self {
        Dimension::percent(value)
    }
}

impl From<i32> for Dimension {
    fn from(value: i32) -> Self {
        Dimension::Percent(f64::from(value))
    }
}

impl FromStr for Dimension {
    type Err = TeleopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let invalid = || TeleopError::InvalidDimension(s.to_string());
        if digits.is_empty() {
            return Err(invalid());
        }
        let value: i32 = digits.parse().map_err(|_| invalid())?;
        match unit {
            "" | "%" => Ok(Dimension::Percent(f64::from(value))),
            "px" => Ok(Dimension::Pixels(value)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<&str> for Dimension {
    type Error = TeleopError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Percent(p) => write!(f, "{p}%"),
            Dimension::Pixels(px) => write!(f, "{px}px"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_are_percentages() {
        assert_eq!(Dimension::from(0.25), Dimension::Percent(25.0));
        assert_eq!(Dimension::from(1.0), Dimension::Percent(1.0));
        assert_eq!(Dimension::from(0.0), Dimension::Percent(0.0));
        assert_eq!(Dimension::from(0.25).resolve(400), 100);
    }

    #[test]
    fn integers_are_percentages() {
        assert_eq!(Dimension::from(50).resolve(801), 401);
    }

    #[test]
    fn strings_parse_percent_bare_and_pixels() {
        assert_eq!("50%".parse::<Dimension>().unwrap(), Dimension::Percent(50.0));
        assert_eq!("50".parse::<Dimension>().unwrap(), Dimension::Percent(50.0));
        assert_eq!("20px".parse::<Dimension>().unwrap(), Dimension::Pixels(20));
        assert_eq!(Dimension::Pixels(20).resolve(1000), 20);
    }

    #[test]
    fn malformed_strings_are_rejected() {
        for bad in ["", "px", "-5", "5em", "1.5%", "abc"] {
            assert!(
                matches!(bad.parse::<Dimension>(), Err(TeleopError::InvalidDimension(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn vertical_dimensions_use_height() {
        let size = SurfaceSize::new(400, 800);
        let d = Dimension::from(50);
        assert_eq!(d.resolve_on(size, Reference::Width), 200);
        assert_eq!(d.resolve_on(size, Reference::Height), 400);
    }
}
