use std::fmt;

use super::error::{Result, WconError};
use super::value::Value;

/// A resolved unit: optional SI prefix on a base unit.
///
/// Opaque to the rest of the loader; only compared and displayed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeasurementUnit {
    pub prefix: &'static str,
    pub base: &'static str,
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.base)
    }
}

/// Turns the value of one `units` entry into a [`MeasurementUnit`].
pub trait UnitResolver {
    fn resolve(&self, key: &str, spec: &Value) -> Result<MeasurementUnit>;
}

/// Resolver for the unit strings commonly found in WCON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardUnits;

/// Bases that accept SI prefixes, plus their accepted spellings.
const PREFIXABLE: &[(&str, &[&str])] = &[
    ("m", &["m", "meter", "meters", "metre", "metres"]),
    ("s", &["s", "sec", "second", "seconds"]),
];

/// Bases used as-is.
const PLAIN: &[(&str, &[&str])] = &[
    ("in", &["in", "inch", "inches"]),
    ("ft", &["ft", "foot", "feet"]),
    ("min", &["min", "minute", "minutes"]),
    ("h", &["h", "hr", "hour", "hours"]),
    ("d", &["d", "day", "days"]),
    ("C", &["C", "celsius", "Celsius"]),
    ("F", &["F", "fahrenheit", "Fahrenheit"]),
    ("K", &["K", "kelvin", "Kelvin"]),
    ("%", &["%", "percent"]),
    ("1", &["1", ""]),
    ("frames", &["f", "frame", "frames"]),
    ("deg", &["deg", "degree", "degrees"]),
    ("rad", &["rad", "radian", "radians"]),
];

const PREFIXES: &[(&str, &[&str])] = &[
    ("G", &["G", "giga"]),
    ("M", &["M", "mega"]),
    ("k", &["k", "kilo"]),
    ("c", &["c", "centi"]),
    ("m", &["m", "milli"]),
    ("u", &["u", "µ", "μ", "micro"]),
    ("n", &["n", "nano"]),
];

fn lookup(table: &[(&'static str, &[&str])], token: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, spellings)| spellings.iter().any(|s| *s == token))
        .map(|(canonical, _)| *canonical)
}

impl StandardUnits {
    fn parse(token: &str) -> Option<MeasurementUnit> {
        let token = token.trim();
        if let Some(base) = lookup(PLAIN, token).or_else(|| lookup(PREFIXABLE, token)) {
            return Some(MeasurementUnit { prefix: "", base });
        }
        PREFIXES.iter().find_map(|(canonical, spellings)| {
            spellings.iter().find_map(|p| {
                let rest = token.strip_prefix(*p)?;
                let base = lookup(PREFIXABLE, rest)?;
                Some(MeasurementUnit {
                    prefix: *canonical,
                    base,
                })
            })
        })
    }
}

impl UnitResolver for StandardUnits {
    fn resolve(&self, key: &str, spec: &Value) -> Result<MeasurementUnit> {
        spec.as_str()
            .and_then(Self::parse)
            .ok_or_else(|| WconError::UnknownUnit {
                key: key.to_string(),
                spec: spec.to_string(),
            })
    }
}
