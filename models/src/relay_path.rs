use std::fmt;

const REFRESH_PATH: &str = "/refresh";
const LISTING_PATH: &str = "/listing";
const ERROR_PATH: &str = "/error";

/// Message paths understood by the relay protocol.
///
/// | Path | Direction | Payload |
/// |---|---|---|
/// | `/refresh` | wearable → handheld | none |
/// | `/listing` | handheld → wearable | encoded entries |
/// | `/error` | handheld → wearable | UTF-8 diagnostic |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayPath {
    Refresh,
    Listing,
    Error,
}

impl RelayPath {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RelayPath::Refresh => REFRESH_PATH,
            RelayPath::Listing => LISTING_PATH,
            RelayPath::Error => ERROR_PATH,
        }
    }

    /// Map a raw transport path to a known relay path.
    ///
    /// Unknown paths return `None`; callers ignore them so newer peers can add
    /// message types.
    pub fn parse(path: &str) -> Option<Self> {
        match path {
            REFRESH_PATH => Some(RelayPath::Refresh),
            LISTING_PATH => Some(RelayPath::Listing),
            ERROR_PATH => Some(RelayPath::Error),
            _ => None,
        }
    }
}

impl fmt::Display for RelayPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
