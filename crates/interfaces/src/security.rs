//! Security systems a snippet can target.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of isolation subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecuritySystem {
    AppArmor,
    SecComp,
    DBus,
    UDev,
    Mount,
}

impl SecuritySystem {
    pub const ALL: [SecuritySystem; 5] = [
        SecuritySystem::AppArmor,
        SecuritySystem::SecComp,
        SecuritySystem::DBus,
        SecuritySystem::UDev,
        SecuritySystem::Mount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecuritySystem::AppArmor => "apparmor",
            SecuritySystem::SecComp => "seccomp",
            SecuritySystem::DBus => "dbus",
            SecuritySystem::UDev => "udev",
            SecuritySystem::Mount => "mount",
        }
    }
}

impl fmt::Display for SecuritySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecuritySystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SecuritySystem::ALL
            .into_iter()
            .find(|system| system.as_str() == s)
            .ok_or_else(|| Error::UnknownSecurity(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for system in SecuritySystem::ALL {
            assert_eq!(system.as_str().parse::<SecuritySystem>().unwrap(), system);
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = "foo".parse::<SecuritySystem>().unwrap_err();
        assert!(matches!(err, Error::UnknownSecurity(ref name) if name == "foo"));
        assert!(err.to_string().starts_with("unknown security system"));
    }
}
