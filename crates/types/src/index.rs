use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Selects whether, and from which elements, links are harvested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IndexMode {
    /// Print the document as-is. No script ever runs.
    #[default]
    Off,
    /// Every in-document link (`<a href="#...">`) becomes a PDF link.
    Basic,
    /// Only elements marked `.index-item` that wrap a link become PDF links.
    Full,
}

impl IndexMode {
    pub fn is_enabled(self) -> bool {
        self != IndexMode::Off
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IndexMode::Off => "off",
            IndexMode::Basic => "basic",
            IndexMode::Full => "full",
        }
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown index mode '{0}' (expected off, basic or full)")]
pub struct IndexModeError(pub String);

impl FromStr for IndexMode {
    type Err = IndexModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(IndexMode::Off),
            "basic" | "classic" => Ok(IndexMode::Basic),
            "full" | "enhanced" => Ok(IndexMode::Full),
            _ => Err(IndexModeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_legacy_aliases() {
        assert_eq!("off".parse(), Ok(IndexMode::Off));
        assert_eq!("Basic".parse(), Ok(IndexMode::Basic));
        assert_eq!("classic".parse(), Ok(IndexMode::Basic));
        assert_eq!("enhanced".parse(), Ok(IndexMode::Full));
        assert!("sometimes".parse::<IndexMode>().is_err());
    }
}
