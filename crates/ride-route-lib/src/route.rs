//! Route segments and the stitcher that joins them
//!
//! Every composition strategy goes through [`stitch`], so joint deduplication follows a
//! single policy: a segment's first coordinate is dropped iff it is exactly equal (same
//! latitude and longitude, no tolerance) to the previous segment's last coordinate.

use crate::utils::LatLon;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport mode of a segment or of a whole-route plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Walk,
    Bike,
    #[serde(alias = "e_bike", alias = "e-bike")]
    EBike,
}

impl TransportMode {
    /// Priority order used to pick the default plan
    pub const PRIORITY: [TransportMode; 3] =
        [TransportMode::Walk, TransportMode::Bike, TransportMode::EBike];

    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Walk => "walk",
            TransportMode::Bike => "bike",
            TransportMode::EBike => "ebike",
        }
    }

    /// Human-readable label for mode cards
    pub fn label(self) -> &'static str {
        match self {
            TransportMode::Walk => "Walk",
            TransportMode::Bike => "Bike",
            TransportMode::EBike => "E-bike",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous, ordered coordinate sequence for one leg of travel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub transport: TransportMode,
    pub coordinates: Vec<LatLon>,
}

impl RouteSegment {
    pub fn new(transport: TransportMode, coordinates: Vec<LatLon>) -> Self {
        Self {
            transport,
            coordinates,
        }
    }

    /// Leg whose endpoints are the same node
    pub fn single_point(transport: TransportMode, at: LatLon) -> Self {
        Self::new(transport, vec![at])
    }

    /// Local substitute for a leg the routing service could not provide
    pub fn straight_line(transport: TransportMode, from: LatLon, to: LatLon) -> Self {
        Self::new(transport, vec![from, to])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    #[inline]
    pub fn first(&self) -> Option<LatLon> {
        self.coordinates.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<LatLon> {
        self.coordinates.last().copied()
    }
}

/// Concatenate coordinate runs in order, dropping a run's first coordinate when it exactly
/// equals the previous run's last coordinate
pub fn stitch<'a, I>(runs: I) -> Vec<LatLon>
where
    I: IntoIterator<Item = &'a [LatLon]>,
{
    let mut stitched: Vec<LatLon> = Vec::new();
    for run in runs {
        let skip = match (stitched.last(), run.first()) {
            (Some(prev), Some(first)) => usize::from(prev == first),
            _ => 0,
        };
        stitched.extend_from_slice(&run[skip..]);
    }
    stitched
}

/// Which composition path produced a route
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// walk → ride → walk through the nearest stations
    ThreeSegment,
    /// Consecutive pairs of start, via stops and destination
    ViaChain,
}

/// Whether, and how, a route had to fall back
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fallback {
    /// Every leg came from the routing service (or was a local one-point leg)
    None,
    /// Station resolution failed, the direct fetch succeeded
    Direct,
    /// The whole route is the two-point line from start to destination
    StraightLine,
    /// Via-chain only: this many pairs were replaced by straight lines
    PartialStraightLine { legs: usize },
}

/// Final stitched coordinate sequence with provenance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComposedRoute {
    coordinates: Vec<LatLon>,
    strategy: Strategy,
    fallback: Fallback,
}

impl ComposedRoute {
    pub fn new(coordinates: Vec<LatLon>, strategy: Strategy, fallback: Fallback) -> Self {
        Self {
            coordinates,
            strategy,
            fallback,
        }
    }

    /// Stitch segments into a route
    pub fn from_segments(segments: &[RouteSegment], strategy: Strategy, fallback: Fallback) -> Self {
        let coordinates = stitch(segments.iter().map(|s| s.coordinates.as_slice()));
        Self::new(coordinates, strategy, fallback)
    }

    /// The two-point line `[start, dest]`
    pub fn straight_line(from: LatLon, to: LatLon, strategy: Strategy) -> Self {
        Self::new(vec![from, to], strategy, Fallback::StraightLine)
    }

    #[inline]
    pub fn coordinates(&self) -> &[LatLon] {
        &self.coordinates
    }

    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    #[inline]
    pub fn fallback(&self) -> Fallback {
        self.fallback
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Path length along the coordinates in meters
    pub fn length_meters(&self) -> f64 {
        self.coordinates
            .windows(2)
            .map(|pair| pair[0].distance_to(pair[1]))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ll(lat: f64, lon: f64) -> LatLon {
        LatLon::new(lat, lon)
    }

    #[test]
    fn test_stitch_drops_exact_duplicate_joint() {
        let a = [ll(37.50, 127.00), ll(37.51, 127.01)];
        let b = [ll(37.51, 127.01), ll(37.52, 127.02), ll(37.53, 127.03)];
        let stitched = stitch([&a[..], &b[..]]);
        assert_eq!(stitched.len(), a.len() + b.len() - 1);
        assert_eq!(stitched[1], ll(37.51, 127.01));
        assert_eq!(stitched[2], ll(37.52, 127.02));
    }

    #[test]
    fn test_stitch_keeps_near_but_unequal_joint() {
        let a = [ll(37.50, 127.00), ll(37.51, 127.01)];
        let b = [ll(37.51, 127.010_000_1), ll(37.52, 127.02)];
        assert_eq!(stitch([&a[..], &b[..]]).len(), a.len() + b.len());
    }

    #[test]
    fn test_stitch_single_point_leg() {
        let walk = [ll(37.50, 127.00)];
        let ride = [ll(37.50, 127.00), ll(37.52, 127.02)];
        let walk_end = [ll(37.52, 127.02)];
        let stitched = stitch([&walk[..], &ride[..], &walk_end[..]]);
        assert_eq!(stitched, vec![ll(37.50, 127.00), ll(37.52, 127.02)]);
    }

    #[test]
    fn test_stitch_empty_runs() {
        let a = [ll(1.0, 1.0)];
        let empty: [LatLon; 0] = [];
        assert_eq!(stitch([&empty[..], &a[..], &empty[..]]).len(), 1);
        assert!(stitch(std::iter::empty::<&[LatLon]>()).is_empty());
    }

    #[test]
    fn test_composed_route_from_segments() {
        let segments = vec![
            RouteSegment::straight_line(TransportMode::Walk, ll(0.0, 0.0), ll(0.0, 1.0)),
            RouteSegment::straight_line(TransportMode::Bike, ll(0.0, 1.0), ll(0.0, 2.0)),
        ];
        let route = ComposedRoute::from_segments(&segments, Strategy::ViaChain, Fallback::None);
        assert_eq!(route.len(), 3);
        assert_eq!(route.strategy(), Strategy::ViaChain);
        assert!(route.length_meters() > 200_000.0);
    }

    #[test]
    fn test_transport_mode_wire_names() {
        let mode: TransportMode = serde_json::from_str("\"ebike\"").unwrap();
        assert_eq!(mode, TransportMode::EBike);
        let mode: TransportMode = serde_json::from_str("\"e_bike\"").unwrap();
        assert_eq!(mode, TransportMode::EBike);
        assert_eq!(serde_json::to_string(&TransportMode::Walk).unwrap(), "\"walk\"");
        assert_eq!(TransportMode::Bike.to_string(), "bike");
    }
}
