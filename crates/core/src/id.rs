// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity newtypes for agents, lanes and resources

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identity of an agent (a robot) as it appears on the wire
    AgentId
);

string_id!(
    /// Name of a lane, i.e. a resource-set requirement
    LaneId
);

string_id!(
    /// Identity of a shared physical resource
    ResourceId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn ids_display_their_raw_value() {
        assert_eq!(AgentId::new("robot1").to_string(), "robot1");
        assert_eq!(LaneId::from("horizontal").as_str(), "horizontal");
    }

    #[test]
    fn ids_can_be_looked_up_by_str() {
        let mut map = BTreeMap::new();
        map.insert(ResourceId::new("I1"), 1);
        assert_eq!(map.get("I1"), Some(&1));
    }
}
