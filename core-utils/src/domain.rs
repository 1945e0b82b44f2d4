use std::fmt::{Display, Formatter};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid session type: {0}")]
    InvalidSessionType(String),
}

/// The kind of session a slot or pattern is for. Shared across every layer
/// (store, cache key namespacing, service, wire) rather than redefined per
/// layer, since it never grows row-specific fields the way an entity does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionType {
    Personal,
    Webinar,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Personal => "PERSONAL",
            SessionType::Webinar => "WEBINAR",
        }
    }
}

impl Display for SessionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERSONAL" => Ok(SessionType::Personal),
            "WEBINAR" => Ok(SessionType::Webinar),
            other => Err(DomainError::InvalidSessionType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_through_wire_string() {
        for st in [SessionType::Personal, SessionType::Webinar] {
            assert_eq!(SessionType::from_str(st.as_str()).unwrap(), st);
        }
    }
}
