// Nearest-neighbour search over point coordinates by haversine distance
use std::sync::Arc;
use ordered_float::OrderedFloat;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;
use tracing::warn;
use crate::geo::Coordinate;
use crate::Result;

/// Chord-squared slack when deciding whether an R-tree candidate ties the boundary
const TIE_EPSILON: f64 = 1e-12;

/// A located entity, identified by its id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoEntry {
    pub id: u64,
    pub coordinate: Coordinate,
}

/// A query hit: entity id and its haversine distance in km
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub id: u64,
    pub distance: f64,
}

/// Result of a proximity query; `degraded` is set when the fallback answered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proximity {
    pub items: Vec<Neighbor>,
    pub degraded: bool,
}

/// Treat a caller-supplied limit of zero or less as one
#[inline]
pub fn normalize_limit(limit: i64) -> usize {
    if limit <= 0 {
        1
    } else {
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

/// A provider of distance-ordered candidates with stable pagination
pub trait ProximitySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `limit` results after skipping `offset`, ascending by distance then id
    fn nearest(&self, origin: Coordinate, limit: usize, offset: usize) -> Result<Vec<Neighbor>>;
}

fn by_distance_then_id(items: &mut [Neighbor]) {
    items.sort_by_key(|n| (OrderedFloat(n.distance), n.id));
}

/// Exhaustive haversine scan
#[derive(Debug, Clone, Default)]
pub struct LinearScan {
    entries: Vec<GeoEntry>,
}

impl LinearScan {
    pub fn new(entries: Vec<GeoEntry>) -> Self {
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProximitySource for LinearScan {
    fn name(&self) -> &'static str {
        "linear-scan"
    }

    fn nearest(&self, origin: Coordinate, limit: usize, offset: usize) -> Result<Vec<Neighbor>> {
        let mut all: Vec<Neighbor> = self
            .entries
            .iter()
            .map(|e| Neighbor {
                id: e.id,
                distance: origin.distance_to(&e.coordinate),
            })
            .collect();
        by_distance_then_id(&mut all);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }
}

/// R-tree over unit-sphere positions.
///
/// Euclidean order in 3D equals great-circle order on the sphere, so the
/// tree's nearest-neighbour iterator yields points by haversine distance.
pub struct SphereIndex {
    tree: RTree<GeomWithData<[f64; 3], (u64, Coordinate)>>,
}

impl SphereIndex {
    pub fn new(entries: &[GeoEntry]) -> Self {
        let points = entries
            .iter()
            .map(|e| GeomWithData::new(e.coordinate.to_unit_vector(), (e.id, e.coordinate)))
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl ProximitySource for SphereIndex {
    fn name(&self) -> &'static str {
        "sphere-rtree"
    }

    fn nearest(&self, origin: Coordinate, limit: usize, offset: usize) -> Result<Vec<Neighbor>> {
        let wanted = offset.saturating_add(limit);
        if wanted == 0 {
            return Ok(Vec::new());
        }

        let query = origin.to_unit_vector();
        let mut candidates = Vec::with_capacity(wanted);
        let mut boundary = f64::INFINITY;

        for (point, chord_2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            // Keep pulling points that tie the last wanted one so the id tie-break sees them all
            if candidates.len() >= wanted && chord_2 > boundary + TIE_EPSILON {
                break;
            }
            let (id, coordinate) = point.data;
            candidates.push(Neighbor {
                id,
                distance: origin.distance_to(&coordinate),
            });
            if candidates.len() == wanted {
                boundary = chord_2;
            }
        }

        by_distance_then_id(&mut candidates);
        Ok(candidates.into_iter().skip(offset).take(limit).collect())
    }
}

/// Proximity queries with an in-process fallback.
///
/// The primary source answers normally; if it fails, the exhaustive scan
/// answers instead and the result is flagged as degraded.
#[derive(Clone)]
pub struct GeoIndex {
    primary: Option<Arc<dyn ProximitySource>>,
    fallback: Arc<LinearScan>,
}

impl GeoIndex {
    /// Index backed by an R-tree with a linear-scan fallback
    pub fn new(entries: Vec<GeoEntry>) -> Self {
        let primary: Arc<dyn ProximitySource> = Arc::new(SphereIndex::new(&entries));
        Self {
            primary: Some(primary),
            fallback: Arc::new(LinearScan::new(entries)),
        }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (u64, Coordinate)>,
    {
        Self::new(
            points
                .into_iter()
                .map(|(id, coordinate)| GeoEntry { id, coordinate })
                .collect(),
        )
    }

    /// Swap the primary source, e.g. for an external search engine
    #[must_use]
    pub fn with_primary(mut self, primary: Arc<dyn ProximitySource>) -> Self {
        self.primary = Some(primary);
        self
    }

    /// Answer every query from the exhaustive scan
    #[must_use]
    pub fn without_primary(mut self) -> Self {
        self.primary = None;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fallback.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fallback.is_empty()
    }

    /// Nearest points to `origin`, ascending by distance then id.
    ///
    /// A `limit` of zero is treated as one.
    pub fn closest(&self, origin: Coordinate, limit: usize, offset: usize) -> Proximity {
        let limit = limit.max(1);

        if let Some(primary) = &self.primary {
            match primary.nearest(origin, limit, offset) {
                Ok(items) => return Proximity { items, degraded: false },
                Err(e) => warn!(
                    "Proximity source {} failed, falling back to {}: {}",
                    primary.name(),
                    self.fallback.name(),
                    e
                ),
            }
        }

        let items = match self.fallback.nearest(origin, limit, offset) {
            Ok(items) => items,
            Err(e) => {
                warn!("Fallback proximity scan failed: {}", e);
                Vec::new()
            }
        };
        Proximity {
            items,
            degraded: self.primary.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::haversine_distance;
    use crate::Error;

    struct Unavailable;

    impl ProximitySource for Unavailable {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        fn nearest(&self, _: Coordinate, _: usize, _: usize) -> Result<Vec<Neighbor>> {
            Err(Error::BackendUnavailable("connection refused".to_string()))
        }
    }

    fn cities() -> Vec<GeoEntry> {
        vec![
            GeoEntry { id: 1, coordinate: Coordinate::new(50.4501, 30.5234) }, // Kyiv
            GeoEntry { id: 2, coordinate: Coordinate::new(49.8397, 24.0297) }, // Lviv
            GeoEntry { id: 3, coordinate: Coordinate::new(52.2297, 21.0122) }, // Warsaw
        ]
    }

    #[test]
    fn test_closest_matches_hand_computed_haversine() {
        let index = GeoIndex::new(cities());
        let origin = Coordinate::new(49.0, 23.0);
        let result = index.closest(origin, 2, 0);

        assert!(!result.degraded);
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].id, 2);
        assert_eq!(result.items[1].id, 3);

        let lviv = haversine_distance(49.0, 23.0, 49.8397, 24.0297);
        let warsaw = haversine_distance(49.0, 23.0, 52.2297, 21.0122);
        assert!(((result.items[0].distance - lviv) / lviv).abs() < 1e-9);
        assert!(((result.items[1].distance - warsaw) / warsaw).abs() < 1e-9);
    }

    #[test]
    fn test_rtree_and_scan_agree() {
        let mut entries = Vec::new();
        for i in 0..200u64 {
            let lat = -80.0 + (i as f64 * 7.3) % 160.0;
            let lng = -179.0 + (i as f64 * 13.7) % 358.0;
            entries.push(GeoEntry { id: i, coordinate: Coordinate::new(lat, lng) });
        }
        let tree = SphereIndex::new(&entries);
        let scan = LinearScan::new(entries);

        for origin in [Coordinate::new(0.0, 0.0), Coordinate::new(45.0, -120.0), Coordinate::new(-60.0, 170.0)] {
            let a = tree.nearest(origin, 10, 5).unwrap();
            let b = scan.nearest(origin, 10, 5).unwrap();
            assert_eq!(
                a.iter().map(|n| n.id).collect::<Vec<_>>(),
                b.iter().map(|n| n.id).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_ties_broken_by_id() {
        let here = Coordinate::new(10.0, 10.0);
        let entries = vec![
            GeoEntry { id: 9, coordinate: here },
            GeoEntry { id: 4, coordinate: here },
            GeoEntry { id: 7, coordinate: here },
        ];
        let index = GeoIndex::new(entries);
        let ids: Vec<u64> = index.closest(here, 2, 0).items.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![4, 7]);
        let ids: Vec<u64> = index.closest(here, 2, 2).items.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![9]);
    }

    #[test]
    fn test_limit_and_ordering() {
        let index = GeoIndex::new(cities());
        let origin = Coordinate::new(51.0, 28.0);
        let result = index.closest(origin, 0, 0);
        assert_eq!(result.items.len(), 1);

        let result = index.closest(origin, 10, 0);
        assert_eq!(result.items.len(), 3);
        assert!(result.items.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(index.closest(origin, 10, 0), result);
    }

    #[test]
    fn test_empty_index() {
        let index = GeoIndex::new(Vec::new());
        assert!(index.closest(Coordinate::new(0.0, 0.0), 5, 0).items.is_empty());
    }

    #[test]
    fn test_unavailable_primary_degrades() {
        let index = GeoIndex::new(cities()).with_primary(Arc::new(Unavailable));
        let result = index.closest(Coordinate::new(49.0, 23.0), 1, 0);
        assert!(result.degraded);
        assert_eq!(result.items[0].id, 2);

        let plain = GeoIndex::new(cities()).without_primary();
        assert!(!plain.closest(Coordinate::new(49.0, 23.0), 1, 0).degraded);
    }

    #[test]
    fn test_normalize_limit() {
        assert_eq!(normalize_limit(-5), 1);
        assert_eq!(normalize_limit(0), 1);
        assert_eq!(normalize_limit(7), 7);
    }
}
