// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static agent priority table
//!
//! Lower rank means higher precedence. Every agent has a rank: agents
//! missing from the table fall back to the default rank.

use crate::id::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Rank assigned to agents that are not listed in the table
pub const DEFAULT_RANK: Rank = Rank(99);

/// Precedence of an agent; lower values are served first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(pub u32);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Total mapping from agent identity to rank
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriorityTable {
    ranks: HashMap<AgentId, Rank>,
    default_rank: Rank,
}

impl PriorityTable {
    pub fn new(default_rank: Rank) -> Self {
        Self {
            ranks: HashMap::new(),
            default_rank,
        }
    }

    pub fn with_rank(mut self, agent: impl Into<AgentId>, rank: u32) -> Self {
        self.ranks.insert(agent.into(), Rank(rank));
        self
    }

    /// Rank of an agent, falling back to the default rank
    pub fn rank(&self, agent: &AgentId) -> Rank {
        self.ranks.get(agent).copied().unwrap_or(self.default_rank)
    }

    pub fn default_rank(&self) -> Rank {
        self.default_rank
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::new(DEFAULT_RANK)
    }
}

impl FromIterator<(AgentId, Rank)> for PriorityTable {
    fn from_iter<T: IntoIterator<Item = (AgentId, Rank)>>(iter: T) -> Self {
        Self {
            ranks: iter.into_iter().collect(),
            default_rank: DEFAULT_RANK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_agent_uses_its_rank() {
        let table = PriorityTable::default().with_rank("robot1", 1);
        assert_eq!(table.rank(&AgentId::new("robot1")), Rank(1));
    }

    #[test]
    fn unknown_agent_gets_default_rank() {
        let table = PriorityTable::default().with_rank("robot1", 1);
        assert_eq!(table.rank(&AgentId::new("intruder")), DEFAULT_RANK);
    }

    #[test]
    fn custom_default_rank_applies() {
        let table = PriorityTable::new(Rank(7));
        assert_eq!(table.rank(&AgentId::new("anyone")), Rank(7));
        assert!(table.is_empty());
    }

    #[test]
    fn lower_rank_orders_first() {
        assert!(Rank(1) < Rank(2));
        assert!(Rank(2) < DEFAULT_RANK);
    }
}
