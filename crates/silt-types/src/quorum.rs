use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A per-request consistency/durability setting.
///
/// Sent as the `r`, `w`, `dw`, or `rw` query parameter. `None` at a call
/// site means "fall through": first to the bucket default, then to the
/// client default, then to whatever the store itself is configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quorum {
    /// One replica must respond.
    One,
    /// A majority of replicas must respond.
    Majority,
    /// Every replica must respond.
    All,
    /// An explicit replica count.
    Count(u32),
}

impl Quorum {
    /// The value as it appears in a query parameter.
    pub fn to_wire(&self) -> String {
        match self {
            Quorum::One => "one".to_string(),
            Quorum::Majority => "quorum".to_string(),
            Quorum::All => "all".to_string(),
            Quorum::Count(n) => n.to_string(),
        }
    }
}

impl fmt::Display for Quorum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for Quorum {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one" => Ok(Quorum::One),
            "quorum" => Ok(Quorum::Majority),
            "all" => Ok(Quorum::All),
            other => other
                .parse::<u32>()
                .map(Quorum::Count)
                .map_err(|_| TypeError::InvalidQuorum(s.to_string())),
        }
    }
}

impl From<u32> for Quorum {
    fn from(n: u32) -> Self {
        Quorum::Count(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_forms() {
        assert_eq!(Quorum::One.to_wire(), "one");
        assert_eq!(Quorum::Majority.to_wire(), "quorum");
        assert_eq!(Quorum::All.to_wire(), "all");
        assert_eq!(Quorum::Count(3).to_wire(), "3");
    }

    #[test]
    fn parse_roundtrip() {
        for q in [Quorum::One, Quorum::Majority, Quorum::All, Quorum::Count(2)] {
            assert_eq!(q.to_wire().parse::<Quorum>().unwrap(), q);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "most".parse::<Quorum>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidQuorum(_)));
    }
}
