// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lane table: named resource-set requirements
//!
//! A lane needs every resource in its set at once. A lane whose set strictly
//! contains another lane's set is *guarded*: the arbitration engine only
//! grants it when its head outranks the heads of those smaller lanes.

use crate::id::{LaneId, ResourceId};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Errors building a lane table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaneError {
    #[error("at least one lane must be configured")]
    NoLanes,
    #[error("lane {0} is declared more than once")]
    DuplicateLane(LaneId),
    #[error("lane {0} requires no resources")]
    NoResources(LaneId),
    #[error("lanes {0} and {1} require the same resources")]
    SameResources(LaneId, LaneId),
}

/// A named resource-set requirement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lane {
    pub id: LaneId,
    pub resources: BTreeSet<ResourceId>,
}

impl Lane {
    pub fn new<I, R>(id: impl Into<LaneId>, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceId>,
    {
        Self {
            id: id.into(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    /// True if this lane's set strictly contains `other`'s set
    pub fn strictly_contains(&self, other: &Lane) -> bool {
        self.resources.len() > other.resources.len() && self.resources.is_superset(&other.resources)
    }
}

/// Validated, ordered set of lanes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneTable {
    lanes: Vec<Lane>,
}

impl LaneTable {
    pub fn new(lanes: Vec<Lane>) -> Result<Self, LaneError> {
        if lanes.is_empty() {
            return Err(LaneError::NoLanes);
        }

        let mut names = HashSet::new();
        for (i, lane) in lanes.iter().enumerate() {
            if !names.insert(&lane.id) {
                return Err(LaneError::DuplicateLane(lane.id.clone()));
            }
            if lane.resources.is_empty() {
                return Err(LaneError::NoResources(lane.id.clone()));
            }
            if let Some(twin) = lanes[..i].iter().find(|l| l.resources == lane.resources) {
                return Err(LaneError::SameResources(twin.id.clone(), lane.id.clone()));
            }
        }

        Ok(Self { lanes })
    }

    /// Two resources, one lane per resource and a combined lane needing both
    pub fn standard() -> Self {
        Self {
            lanes: vec![
                Lane::new("vertical_A", ["I1"]),
                Lane::new("vertical_B", ["I2"]),
                Lane::new("horizontal", ["I1", "I2"]),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.id.as_str() == id)
    }

    /// Lanes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.iter()
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Union of every lane's resources
    pub fn resources(&self) -> BTreeSet<ResourceId> {
        self.lanes
            .iter()
            .flat_map(|l| l.resources.iter().cloned())
            .collect()
    }

    /// Lanes whose resource set is a strict subset of `lane`'s
    pub fn strict_subsets<'a>(&'a self, lane: &'a Lane) -> impl Iterator<Item = &'a Lane> + 'a {
        self.lanes.iter().filter(move |l| lane.strictly_contains(l))
    }

    pub fn is_guarded(&self, lane: &Lane) -> bool {
        self.strict_subsets(lane).next().is_some()
    }

    /// True if the lane needs every shared resource and more than one of them
    pub fn is_combined(&self, lane: &Lane) -> bool {
        lane.resources.len() > 1 && lane.resources == self.resources()
    }

    /// Guarded lanes, largest resource set first, then declaration order
    pub fn guarded(&self) -> Vec<&Lane> {
        let mut guarded: Vec<&Lane> = self.lanes.iter().filter(|l| self.is_guarded(l)).collect();
        // stable sort keeps declaration order among equal sizes
        guarded.sort_by(|a, b| b.resources.len().cmp(&a.resources.len()));
        guarded
    }

    /// Lanes granted purely on resource availability, in declaration order
    pub fn unguarded(&self) -> Vec<&Lane> {
        self.lanes.iter().filter(|l| !self.is_guarded(l)).collect()
    }
}

#[cfg(test)]
#[path = "lane_tests.rs"]
mod tests;
