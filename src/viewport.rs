use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DsxError;

/// Browser window size used when rendering a page.
///
/// Serialized as the `WIDTHxHEIGHT` string used on the command line, so the
/// same value works in `config.toml` (`viewport = "1280x800"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 900,
        }
    }
}

impl FromStr for Viewport {
    type Err = DsxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            DsxError::Config(format!(
                "Invalid viewport '{}': expected WIDTHxHEIGHT with positive values (e.g., 1440x900)",
                s.trim()
            ))
        };
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Viewport { width, height })
    }
}

impl TryFrom<String> for Viewport {
    type Error = DsxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Viewport> for String {
    fn from(value: Viewport) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_width_by_height() {
        let vp: Viewport = " 1280 x 720 ".parse().unwrap();
        assert_eq!(vp, Viewport { width: 1280, height: 720 });
        assert_eq!("800X600".parse::<Viewport>().unwrap().height, 600);
    }

    #[test]
    fn rejects_malformed_and_zero_sizes() {
        for bad in ["1440", "x900", "abcx900", "1440x0", "0x900", "1x2x3"] {
            assert!(bad.parse::<Viewport>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn round_trips_through_toml_string() {
        #[derive(Deserialize)]
        struct Holder {
            viewport: Viewport,
        }
        let holder: Holder = toml::from_str("viewport = \"1024x768\"").unwrap();
        assert_eq!(holder.viewport.to_string(), "1024x768");
    }
}
