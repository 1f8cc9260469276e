//! Whole-route plans per transport mode
//!
//! Plans are only fetched on explicit request. A changed start or destination throws
//! the previous plan set away; nothing is refetched until the user asks again.

use crate::compat;
use crate::route::{RouteSegment, TransportMode};
use crate::selection::GuardToken;
use crate::{Result, RouteError, SelectError};
use serde::Deserialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Minutes spent on one leg of a plan
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct TimeShare {
    #[serde(rename = "type")]
    pub transport: TransportMode,
    #[serde(rename = "time_min", default)]
    pub minutes: f64,
}

/// One alternative route for one transport mode
#[derive(Clone, Debug, PartialEq)]
pub struct ModePlan {
    pub mode: TransportMode,
    pub success: bool,
    pub total_time_minutes: f64,
    pub sub_segments: SmallVec<[RouteSegment; 3]>,
    pub failure_message: Option<String>,
    /// Ordered per-leg timing, empty when the service did not report one
    pub time_breakdown: Vec<TimeShare>,
}

/// Display text and bar proportions for a plan card
#[derive(Clone, Debug, PartialEq)]
pub struct PlanSummary {
    /// e.g. `walk 5 min → bike 12 min`
    pub text: String,
    /// Legs with a positive duration and their fraction of the summed duration
    pub blocks: Vec<(TimeShare, f64)>,
}

#[derive(Deserialize)]
struct WirePlan {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    time_min: Option<f64>,
    #[serde(default)]
    time_segments: Vec<TimeShare>,
    #[serde(default)]
    time_components: Option<WireComponents>,
    #[serde(default)]
    segments: Vec<WireSegment>,
    #[serde(default)]
    message: Option<String>,
}

/// Older two-bucket timing: walking minutes plus riding minutes
#[derive(Deserialize)]
struct WireComponents {
    #[serde(default)]
    walk: f64,
    #[serde(default)]
    ride: f64,
    #[serde(default)]
    ride_type: Option<TransportMode>,
}

#[derive(Deserialize)]
struct WireSegment {
    #[serde(rename = "type")]
    transport: TransportMode,
    #[serde(default)]
    coordinates: Value,
}

impl ModePlan {
    pub fn failed(mode: TransportMode, message: impl Into<String>) -> Self {
        Self {
            mode,
            success: false,
            total_time_minutes: 0.0,
            sub_segments: SmallVec::new(),
            failure_message: Some(message.into()),
            time_breakdown: Vec::new(),
        }
    }

    /// Decode one entry of the plan-set response. Never fails: an unreadable entry
    /// becomes a failed plan.
    pub fn from_wire(mode: TransportMode, value: &Value) -> Self {
        let wire = match WirePlan::deserialize(value) {
            Ok(wire) => wire,
            Err(err) => {
                tracing::warn!("Unreadable {mode} plan: {err}");
                return Self::failed(mode, format!("unreadable plan: {err}"));
            }
        };

        if !wire.success {
            return Self::failed(mode, wire.message.unwrap_or_else(|| "no route".to_string()));
        }

        let mut sub_segments = SmallVec::new();
        for segment in wire.segments {
            match compat::coordinate_list(&segment.coordinates) {
                Ok(coordinates) => {
                    sub_segments.push(RouteSegment::new(segment.transport, coordinates))
                }
                Err(err) => {
                    tracing::warn!("Dropping {mode} plan with bad segment: {err}");
                    return Self::failed(mode, err.to_string());
                }
            }
        }

        let time_breakdown = if !wire.time_segments.is_empty() {
            wire.time_segments
        } else if let Some(components) = wire.time_components {
            let ride = components.ride_type.unwrap_or(TransportMode::Bike);
            vec![
                TimeShare {
                    transport: TransportMode::Walk,
                    minutes: components.walk,
                },
                TimeShare {
                    transport: ride,
                    minutes: components.ride,
                },
            ]
        } else {
            Vec::new()
        };

        Self {
            mode,
            success: true,
            total_time_minutes: wire.time_min.unwrap_or(0.0),
            sub_segments,
            failure_message: None,
            time_breakdown,
        }
    }

    /// Card text and proportions; falls back to the total time when no positive
    /// breakdown is available
    pub fn summary(&self) -> PlanSummary {
        let total: f64 = self.time_breakdown.iter().map(|s| s.minutes.max(0.0)).sum();
        if total > 0.0 {
            let blocks: Vec<(TimeShare, f64)> = self
                .time_breakdown
                .iter()
                .filter(|share| share.minutes > 0.0)
                .map(|&share| (share, share.minutes / total))
                .collect();
            let text = blocks
                .iter()
                .map(|(share, _)| format!("{} {} min", share.transport, share.minutes))
                .collect::<Vec<_>>()
                .join(" → ");
            return PlanSummary { text, blocks };
        }

        PlanSummary {
            text: format!("{} min", self.total_time_minutes),
            blocks: Vec::new(),
        }
    }
}

/// The plan set for one request, one plan per mode in priority order
#[derive(Clone, Debug, PartialEq)]
pub struct ModePlans {
    plans: [ModePlan; 3],
}

impl ModePlans {
    /// Plans ordered walk, bike, e-bike
    pub fn new(walk: ModePlan, bike: ModePlan, ebike: ModePlan) -> Self {
        Self {
            plans: [walk, bike, ebike],
        }
    }

    /// Decode `{ walk, bike, ebike }`; a missing mode becomes a failed plan
    pub fn from_wire(body: &Value) -> Result<Self> {
        let object = body
            .as_object()
            .ok_or_else(|| RouteError::Malformed("plan set is not an object".to_string()))?;

        let plan = |mode: TransportMode| match object.get(mode.as_str()) {
            Some(value) => ModePlan::from_wire(mode, value),
            None => ModePlan::failed(mode, "no plan returned"),
        };

        Ok(Self::new(
            plan(TransportMode::Walk),
            plan(TransportMode::Bike),
            plan(TransportMode::EBike),
        ))
    }

    pub fn get(&self, mode: TransportMode) -> &ModePlan {
        match mode {
            TransportMode::Walk => &self.plans[0],
            TransportMode::Bike => &self.plans[1],
            TransportMode::EBike => &self.plans[2],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModePlan> {
        self.plans.iter()
    }

    /// First successful mode in priority order
    pub fn default_mode(&self) -> Option<TransportMode> {
        TransportMode::PRIORITY
            .into_iter()
            .find(|&mode| self.get(mode).success)
    }
}

/// Lifecycle of the plan request
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PlanRequestState {
    #[default]
    NotRequested,
    Pending {
        token: GuardToken,
        request: u64,
    },
    Ready {
        plans: Arc<ModePlans>,
    },
    Failed {
        message: String,
    },
}

/// Tracks the single outstanding plan request and validates mode choices
#[derive(Debug, Default)]
pub struct ModePlanSelector {
    state: PlanRequestState,
    next_request: u64,
}

impl ModePlanSelector {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> &PlanRequestState {
        &self.state
    }

    pub fn plans(&self) -> Option<&Arc<ModePlans>> {
        match &self.state {
            PlanRequestState::Ready { plans } => Some(plans),
            _ => None,
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, PlanRequestState::Pending { .. })
    }

    /// Start a new request, superseding any outstanding one. Returns its request id.
    pub fn begin_request(&mut self, token: GuardToken) -> u64 {
        self.next_request += 1;
        let request = self.next_request;
        self.state = PlanRequestState::Pending { token, request };
        request
    }

    /// Commit a finished request. Returns `false` and leaves the state untouched when
    /// the request is no longer the outstanding one.
    pub fn complete(&mut self, token: GuardToken, request: u64, result: Result<ModePlans>) -> bool {
        let outstanding = matches!(
            self.state,
            PlanRequestState::Pending { token: t, request: r } if t == token && r == request
        );
        if !outstanding {
            tracing::debug!("Dropping stale mode plan result #{request}");
            return false;
        }

        self.state = match result {
            Ok(plans) => PlanRequestState::Ready {
                plans: Arc::new(plans),
            },
            Err(err) => {
                tracing::warn!("Mode plan request failed: {err}");
                PlanRequestState::Failed {
                    message: err.to_string(),
                }
            }
        };
        true
    }

    /// Forget any plans and outstanding request
    pub fn reset(&mut self) {
        self.state = PlanRequestState::NotRequested;
    }

    /// Default mode of the completed request
    pub fn default_mode(&self) -> Option<TransportMode> {
        self.plans().and_then(|plans| plans.default_mode())
    }

    /// Check that `mode` may become the active selection
    pub fn validate_select(&self, mode: TransportMode) -> std::result::Result<(), SelectError> {
        let plans = self.plans().ok_or(SelectError::NotReady)?;
        if plans.get(mode).success {
            Ok(())
        } else {
            Err(SelectError::ModeUnavailable(mode))
        }
    }
}
