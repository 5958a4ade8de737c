use crate::consts::VERSION_REGEX;
use crate::error::{Error, ErrorKind, Result};
use exn::OptionExt;
use std::fmt;
use std::str::FromStr;

/// A `major[.minor]` version as written in qmldir files, imports and exports.
///
/// Both parts are optional: a versionless import or an implicit directory
/// export has neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: Option<u32>,
    pub minor: Option<u32>,
}
impl Version {
    pub const NONE: Self = Self { major: None, minor: None };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major: Some(major), minor: Some(minor) }
    }

    pub const fn major(major: u32) -> Self {
        Self { major: Some(major), minor: None }
    }

    pub fn is_none(&self) -> bool {
        self.major.is_none()
    }

    /// Parse `2`, `2.15`. Anything else is an
    /// [`InvalidVersion`](crate::error::ErrorKind::InvalidVersion).
    pub fn parse(value: &str) -> Result<Self> {
        let captures = VERSION_REGEX
            .captures(value.trim())
            .ok_or_raise(|| ErrorKind::InvalidVersion(value.to_string()))?;
        let part = |index: usize| -> Result<Option<u32>> {
            captures
                .get(index)
                .map(|m| m.as_str().parse::<u32>())
                .transpose()
                .map_err(|_| exn::Exn::from(ErrorKind::InvalidVersion(value.to_string())))
        };
        Ok(Self { major: part(1)?, minor: part(2)? })
    }
}
impl FromStr for Version {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.major, self.minor) {
            (Some(major), Some(minor)) => write!(f, "{major}.{minor}"),
            (Some(major), None) => write!(f, "{major}"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2", Version::major(2))]
    #[case("2.15", Version::new(2, 15))]
    #[case(" 6.0 ", Version::new(6, 0))]
    fn test_parse(#[case] input: &str, #[case] expected: Version) {
        assert_eq!(Version::parse(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("auto")]
    #[case("2.")]
    #[case("2.15.1")]
    #[case("99999999999")]
    fn test_parse_invalid(#[case] input: &str) {
        let err = Version::parse(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidVersion(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Version::new(2, 15).to_string(), "2.15");
        assert_eq!(Version::major(6).to_string(), "6");
        assert_eq!(Version::NONE.to_string(), "");
    }
}
