//! Trading signal types and the signal state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{MarketCondition, Side};
use crate::error::LifecycleError;

/// Which rule produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RationaleTag {
    EmaAlignment,
    Breakout,
    MomentumAdx,
}

impl std::fmt::Display for RationaleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RationaleTag::EmaAlignment => write!(f, "ema_alignment"),
            RationaleTag::Breakout => write!(f, "breakout"),
            RationaleTag::MomentumAdx => write!(f, "momentum_adx"),
        }
    }
}

/// A signal emitted by a strategy's rule set. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSignal {
    /// Instrument the signal applies to
    pub instrument: String,
    /// Direction
    pub side: Side,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Strength in [0, 1]
    pub strength: f64,
    /// Strategy that produced the signal
    pub strategy_id: String,
    /// Rule that fired
    pub rationale: RationaleTag,
    /// Mid price at generation
    pub price: f64,
    /// Generation time
    pub timestamp: DateTime<Utc>,
    /// Indicator values the rule looked at
    pub indicators: BTreeMap<String, f64>,
}

impl CandidateSignal {
    /// Create a candidate. Confidence and strength are clamped to [0, 1];
    /// non-finite inputs collapse to 0.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument: impl Into<String>,
        side: Side,
        confidence: f64,
        strength: f64,
        strategy_id: impl Into<String>,
        rationale: RationaleTag,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            confidence: unit_clamp(confidence),
            strength: unit_clamp(strength),
            strategy_id: strategy_id.into(),
            rationale,
            price,
            timestamp,
            indicators: BTreeMap::new(),
        }
    }

    /// Attach an indicator reading.
    pub fn with_indicator(mut self, name: impl Into<String>, value: f64) -> Self {
        self.indicators.insert(name.into(), value);
        self
    }

    /// Ranking key, compared descending.
    pub fn rank_key(&self) -> (f64, f64) {
        (self.confidence, self.strength)
    }
}

fn unit_clamp(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// A candidate that passed the quality gate and session filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedSignal {
    /// Signal identifier
    pub id: Uuid,
    /// The admitted candidate
    pub candidate: CandidateSignal,
    /// Approval time
    pub approved_at: DateTime<Utc>,
    /// Position-size multiplier in force when the signal was sized
    pub risk_multiplier: Decimal,
    /// Account condition in force when the signal was sized
    pub condition: MarketCondition,
}

impl ApprovedSignal {
    /// Approve a candidate at `approved_at` with a neutral risk multiplier.
    pub fn new(candidate: CandidateSignal, approved_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate,
            approved_at,
            risk_multiplier: Decimal::ONE,
            condition: MarketCondition::Normal,
        }
    }

    /// Record the risk adjustment applied by the governor.
    pub fn with_risk(mut self, multiplier: Decimal, condition: MarketCondition) -> Self {
        self.risk_multiplier = multiplier;
        self.condition = condition;
        self
    }

    /// Strategy that produced the signal.
    pub fn strategy_id(&self) -> &str {
        &self.candidate.strategy_id
    }
}

/// Signal lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalState {
    Generated,
    Sent,
    Executed,
    Expired,
    Cancelled,
}

impl SignalState {
    /// Check if the signal is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SignalState::Executed | SignalState::Expired | SignalState::Cancelled
        )
    }

    /// Legal edges: `Generated -> Sent -> {Executed | Expired | Cancelled}`.
    pub fn can_transition_to(&self, next: SignalState) -> bool {
        matches!(
            (self, next),
            (SignalState::Generated, SignalState::Sent)
                | (SignalState::Sent, SignalState::Executed)
                | (SignalState::Sent, SignalState::Expired)
                | (SignalState::Sent, SignalState::Cancelled)
        )
    }
}

impl std::fmt::Display for SignalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignalState::Generated => "generated",
            SignalState::Sent => "sent",
            SignalState::Executed => "executed",
            SignalState::Expired => "expired",
            SignalState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Tracked state of one approved signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// The approved signal
    pub signal: ApprovedSignal,
    /// Current state
    pub state: SignalState,
    /// When the record was created
    pub generated_at: DateTime<Utc>,
    /// When the signal was handed to the gateway
    pub sent_at: Option<DateTime<Utc>>,
    /// When the signal reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    /// Lifecycle trade id created from this signal
    pub trade_id: Option<String>,
    /// Free-form reason for cancellation/expiry
    pub note: Option<String>,
}

impl SignalRecord {
    /// Start tracking an approved signal.
    pub fn generated(signal: ApprovedSignal, at: DateTime<Utc>) -> Self {
        Self {
            signal,
            state: SignalState::Generated,
            generated_at: at,
            sent_at: None,
            completed_at: None,
            trade_id: None,
            note: None,
        }
    }

    /// Signal identifier.
    pub fn id(&self) -> Uuid {
        self.signal.id
    }

    /// Move to `next`, rejecting edges the state machine does not allow.
    pub fn transition(&mut self, next: SignalState, at: DateTime<Utc>) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                entity: "signal",
                id: self.signal.id.to_string(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        match next {
            SignalState::Sent => self.sent_at = Some(at),
            _ if next.is_terminal() => self.completed_at = Some(at),
            _ => {}
        }
        self.state = next;
        Ok(())
    }
}
