//! Route composition over an external routing service
//!
//! Two strategies share one stitcher:
//!
//! - **Three-segment** (no via stops): walk to the nearest ride station, ride to the
//!   station nearest the destination, walk the rest. The legs are fetched concurrently and
//!   the route is stitched only once all three are back and non-empty; anything else
//!   becomes the straight line `[start, dest]`.
//! - **Via-chain**: every consecutive pair of stops is fetched in turn, and a failed pair
//!   is replaced by its own straight line.
//!
//! The composer never touches selection state. Callers decide whether a finished
//! composition is still wanted.

use crate::nodes::{Category, Node, NodeStore};
use crate::route::{ComposedRoute, Fallback, RouteSegment, Strategy, TransportMode};
use crate::service::RoutingService;
use crate::spatial::SpatialQuery;
use crate::{Result, RouteError};
use std::sync::Arc;

pub struct RouteComposer<R> {
    service: Arc<R>,
}

impl<R> Clone for RouteComposer<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

/// Transport used on the middle leg for a ride station category
fn ride_transport(category: Category) -> TransportMode {
    match category {
        Category::EBikeStation => TransportMode::EBike,
        _ => TransportMode::Bike,
    }
}

impl<R: RoutingService> RouteComposer<R> {
    pub fn new(service: Arc<R>) -> Self {
        Self { service }
    }

    #[inline]
    pub fn service(&self) -> &Arc<R> {
        &self.service
    }

    /// Compose a route through `stops` (`[start, via.., dest]`).
    ///
    /// Uses the three-segment strategy for a plain start/destination pair and the
    /// via-chain strategy as soon as there is a via stop. `None` with fewer than two stops.
    pub async fn compose(
        &self,
        store: &NodeStore,
        stops: &[Node],
        ride: Category,
    ) -> Option<ComposedRoute> {
        match stops {
            [] | [_] => None,
            [start, dest] => Some(self.compose_three_segment(store, start, dest, ride).await),
            _ => self.compose_via_chain(stops).await,
        }
    }

    /// walk → ride → walk through the stations of `ride` nearest to each endpoint
    pub async fn compose_three_segment(
        &self,
        store: &NodeStore,
        start: &Node,
        dest: &Node,
        ride: Category,
    ) -> ComposedRoute {
        let query = SpatialQuery::new(store);
        let stations = query
            .nearest_in_category(start.position(), ride)
            .zip(query.nearest_in_category(dest.position(), ride));

        let Some((near_start, near_dest)) = stations else {
            tracing::warn!("{}", RouteError::MissingStation(ride));
            return self.direct_or_straight(start, dest).await;
        };

        tracing::debug!(
            "Three-segment route {} → [{} → {}] → {}",
            start.id,
            near_start.id,
            near_dest.id,
            dest.id
        );

        let (first, middle, last) = tokio::join!(
            self.leg(start, near_start, TransportMode::Walk),
            self.leg(near_start, near_dest, ride_transport(ride)),
            self.leg(near_dest, dest, TransportMode::Walk),
        );

        match (first, middle, last) {
            (Ok(first), Ok(middle), Ok(last)) => ComposedRoute::from_segments(
                &[first, middle, last],
                Strategy::ThreeSegment,
                Fallback::None,
            ),
            (first, middle, last) => {
                for err in [first.err(), middle.err(), last.err()].into_iter().flatten() {
                    tracing::warn!("Three-segment leg unavailable: {err}");
                }
                ComposedRoute::straight_line(
                    start.position(),
                    dest.position(),
                    Strategy::ThreeSegment,
                )
            }
        }
    }

    /// Fetch consecutive pairs of `stops` one after another; a failed pair becomes a
    /// straight line. `None` with fewer than two stops.
    pub async fn compose_via_chain(&self, stops: &[Node]) -> Option<ComposedRoute> {
        if stops.len() < 2 {
            return None;
        }

        let mut segments = Vec::with_capacity(stops.len() - 1);
        let mut substituted = 0;
        for pair in stops.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            match self.leg(from, to, TransportMode::Walk).await {
                Ok(segment) => segments.push(segment),
                Err(err) => {
                    tracing::warn!("Via leg {} → {} unavailable: {err}", from.id, to.id);
                    substituted += 1;
                    segments.push(RouteSegment::straight_line(
                        TransportMode::Walk,
                        from.position(),
                        to.position(),
                    ));
                }
            }
        }

        let fallback = match substituted {
            0 => Fallback::None,
            legs => Fallback::PartialStraightLine { legs },
        };
        Some(ComposedRoute::from_segments(
            &segments,
            Strategy::ViaChain,
            fallback,
        ))
    }

    /// One leg: a local single point when both ends are the same node, a fetch otherwise.
    /// An empty answer counts as a failure.
    async fn leg(&self, from: &Node, to: &Node, transport: TransportMode) -> Result<RouteSegment> {
        if from.key() == to.key() {
            return Ok(RouteSegment::single_point(transport, from.position()));
        }
        let coordinates = self.service.fetch_segment(from, to).await?;
        if coordinates.is_empty() {
            return Err(RouteError::Malformed("empty coordinate list".to_string()));
        }
        Ok(RouteSegment::new(transport, coordinates))
    }

    async fn direct_or_straight(&self, start: &Node, dest: &Node) -> ComposedRoute {
        match self.leg(start, dest, TransportMode::Walk).await {
            Ok(segment) => ComposedRoute::from_segments(
                &[segment],
                Strategy::ThreeSegment,
                Fallback::Direct,
            ),
            Err(err) => {
                tracing::warn!("Direct route {} → {} unavailable: {err}", start.id, dest.id);
                ComposedRoute::straight_line(
                    start.position(),
                    dest.position(),
                    Strategy::ThreeSegment,
                )
            }
        }
    }
}
