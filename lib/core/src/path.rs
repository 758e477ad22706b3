//! Bounded multi-hop route search.
//!
//! Every simple path (no airport visited twice) of at most `max_hops` legs
//! from the source to the destination is enumerated, ranked by total
//! distance and grouped by the number of intermediate stops. A single
//! shortest path is not enough here: callers show alternatives per stop count.

use std::collections::BTreeMap;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, warn};
use crate::airport::AirportId;
use crate::graph::RouteGraph;
use crate::{Error, Result};

pub const DEFAULT_MAX_HOPS: usize = 3;
pub const DEFAULT_PATH_LIMIT: usize = 10;

pub type NodePath = SmallVec<[AirportId; 4]>;
pub type LegDistances = SmallVec<[f64; 4]>;

/// Paths keyed by intermediate stop count (0 = direct flight)
pub type PathGroups = BTreeMap<usize, Vec<FoundPath>>;

/// One itinerary from source to destination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoundPath {
    pub nodes: NodePath,
    /// Distance of each leg, in travel order
    pub legs: LegDistances,
    pub total_distance: f64,
}

impl FoundPath {
    #[inline]
    pub fn hops(&self) -> usize {
        self.legs.len()
    }

    /// Intermediate stops: `nodes.len() - 2`
    #[inline]
    pub fn stops(&self) -> usize {
        self.nodes.len().saturating_sub(2)
    }
}

/// Parameters of a path search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathQuery {
    pub source: AirportId,
    pub destination: AirportId,
    pub max_hops: usize,
    pub limit: usize,
}

impl PathQuery {
    #[inline]
    #[must_use]
    pub fn new(source: AirportId, destination: AirportId) -> Self {
        Self {
            source,
            destination,
            max_hops: DEFAULT_MAX_HOPS,
            limit: DEFAULT_PATH_LIMIT,
        }
    }

    #[inline]
    #[must_use]
    pub fn max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    #[inline]
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Reject queries that can never have an answer.
    ///
    /// `find` still returns an empty result for them; this lets a caller
    /// report a client error instead of "nothing found".
    pub fn validate(&self) -> Result<()> {
        if self.source == self.destination {
            return Err(Error::InvalidArgument(format!(
                "source and destination are the same airport ({})",
                self.source
            )));
        }
        Ok(())
    }
}

/// Path search over any [`RouteGraph`]
pub struct PathFinder<'g, G: RouteGraph> {
    graph: &'g G,
}

impl<'g, G: RouteGraph + Sync> PathFinder<'g, G> {
    #[inline]
    pub fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    /// All paths within the hop bound, globally sorted and truncated to the limit
    pub fn ranked(&self, query: &PathQuery) -> Vec<FoundPath> {
        if query.max_hops == 0 || query.source == query.destination {
            return Vec::new();
        }
        if self.graph.get_node(query.source).is_none()
            || self.graph.get_node(query.destination).is_none()
        {
            debug!(
                "Path query {} -> {} references an unknown airport",
                query.source, query.destination
            );
            return Vec::new();
        }

        let first_legs = self.next_legs(query.source);
        let mut found: Vec<FoundPath> = first_legs
            .par_iter()
            .filter(|(next, _)| *next != query.source)
            .flat_map_iter(|&(next, distance)| {
                let mut walk = Walk {
                    nodes: smallvec::smallvec![query.source, next],
                    legs: smallvec::smallvec![distance],
                    found: Vec::new(),
                };
                if next == query.destination {
                    walk.record();
                } else {
                    self.extend(&mut walk, query);
                }
                walk.found
            })
            .collect();

        found.sort_by(|a, b| {
            OrderedFloat(a.total_distance)
                .cmp(&OrderedFloat(b.total_distance))
                .then_with(|| a.nodes.cmp(&b.nodes))
        });
        found.truncate(query.limit.max(1));
        found
    }

    /// Ranked paths grouped by intermediate stop count
    pub fn find(&self, query: &PathQuery) -> PathGroups {
        group_by_stops(self.ranked(query))
    }

    fn extend(&self, walk: &mut Walk, query: &PathQuery) {
        if walk.legs.len() >= query.max_hops {
            return;
        }
        let Some(&current) = walk.nodes.last() else {
            return;
        };

        // Last allowed leg: only a direct hop to the destination can complete a path
        if walk.legs.len() + 1 == query.max_hops {
            if let Some(distance) = self.leg_to(current, query.destination) {
                walk.push(query.destination, distance);
                walk.record();
                walk.pop();
            }
            return;
        }

        for (next, distance) in self.next_legs(current) {
            if walk.nodes.contains(&next) {
                continue;
            }
            walk.push(next, distance);
            if next == query.destination {
                walk.record();
            } else {
                self.extend(walk, query);
            }
            walk.pop();
        }
    }

    /// Shortest usable leg from `from` to `to`, if any
    fn leg_to(&self, from: AirportId, to: AirportId) -> Option<f64> {
        self.graph
            .get_outgoing_edges(from)
            .iter()
            .filter(|route| route.destination == to)
            .filter_map(|route| self.usable_distance(route))
            .min_by(f64::total_cmp)
    }

    /// Distinct neighbours of `from` with the shortest leg to each.
    ///
    /// Parallel routes flown by different airlines collapse into one leg,
    /// so each airport sequence is reported once.
    fn next_legs(&self, from: AirportId) -> Vec<(AirportId, f64)> {
        let mut legs: Vec<(AirportId, f64)> = self
            .graph
            .get_outgoing_edges(from)
            .iter()
            .filter_map(|route| self.usable_distance(route).map(|d| (route.destination, d)))
            .collect();
        legs.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        legs.dedup_by_key(|leg| leg.0);
        legs
    }

    fn usable_distance(&self, route: &crate::Route) -> Option<f64> {
        if self.graph.get_node(route.destination).is_none() {
            warn!(
                "Skipping route {} -> {}: destination airport missing",
                route.source, route.destination
            );
            return None;
        }
        if !route.distance.is_finite() || route.distance < 0.0 {
            warn!(
                "Skipping route {} -> {}: invalid distance {}",
                route.source, route.destination, route.distance
            );
            return None;
        }
        Some(route.distance)
    }
}

/// Depth-first search state for one first-leg branch
struct Walk {
    nodes: NodePath,
    legs: LegDistances,
    found: Vec<FoundPath>,
}

impl Walk {
    #[inline]
    fn push(&mut self, node: AirportId, distance: f64) {
        self.nodes.push(node);
        self.legs.push(distance);
    }

    #[inline]
    fn pop(&mut self) {
        self.nodes.pop();
        self.legs.pop();
    }

    fn record(&mut self) {
        self.found.push(FoundPath {
            nodes: self.nodes.clone(),
            legs: self.legs.clone(),
            total_distance: self.legs.iter().sum(),
        });
    }
}

/// Group an already ranked list by stop count, keeping rank order inside each group
pub fn group_by_stops(paths: Vec<FoundPath>) -> PathGroups {
    let mut groups = PathGroups::new();
    for path in paths {
        groups.entry(path.stops()).or_default().push(path);
    }
    groups
}

/// Convenience wrapper: `PathFinder::new(graph).find(..)`
pub fn find_paths<G: RouteGraph + Sync>(
    graph: &G,
    source: AirportId,
    destination: AirportId,
    max_hops: usize,
    limit: usize,
) -> PathGroups {
    PathFinder::new(graph).find(
        &PathQuery::new(source, destination)
            .max_hops(max_hops)
            .limit(limit),
    )
}
