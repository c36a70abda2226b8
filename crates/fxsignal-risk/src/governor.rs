//! Risk governor: per-account condition tracking, adaptation and cooldown.

use crate::adaptation::{adapt, AccountOverride, AdaptationTable};
use crate::condition::{ConditionDetector, ConditionInputs};
use chrono::{DateTime, Duration, Utc};
use fxsignal_core::{AdaptationEntry, MarketCondition, ReductionRequest, RiskProfile};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Per-account risk settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRiskConfig {
    pub base: RiskProfile,
    pub overrides: Vec<AccountOverride>,
    /// Minimum time between two adaptations
    pub cooldown: Duration,
}

impl Default for AccountRiskConfig {
    fn default() -> Self {
        Self {
            base: RiskProfile::default(),
            overrides: vec![],
            cooldown: Duration::minutes(5),
        }
    }
}

#[derive(Debug)]
struct AccountState {
    config: AccountRiskConfig,
    pairs: HashMap<String, MarketCondition>,
    detected: MarketCondition,
    applied: MarketCondition,
    profile: RiskProfile,
    last_adapted: Option<DateTime<Utc>>,
}

impl AccountState {
    fn new(config: AccountRiskConfig) -> Self {
        let profile = config.base.clone();
        Self {
            config,
            pairs: HashMap::new(),
            detected: MarketCondition::Normal,
            applied: MarketCondition::Normal,
            profile,
            last_adapted: None,
        }
    }

    fn max_pair_condition(&self) -> MarketCondition {
        MarketCondition::most_severe(self.pairs.values().copied())
    }
}

/// What happened to the account's profile in one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationOutcome {
    /// Detected condition equals the applied one
    Unchanged,
    /// Profile re-derived from the base for the new condition
    Adapted,
    /// Condition changed but the cooldown has not elapsed
    Deferred { remaining_secs: i64 },
}

/// Result of evaluating one account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountEvaluation {
    pub account: String,
    /// Condition applied before this evaluation
    pub previous: MarketCondition,
    /// Maximum condition over the account's pairs
    pub detected: MarketCondition,
    /// Condition applied after this evaluation
    pub applied: MarketCondition,
    pub profile: RiskProfile,
    pub outcome: AdaptationOutcome,
    /// Emergency de-risking directive for the order gateway
    pub reduction: Option<ReductionRequest>,
}

impl AccountEvaluation {
    /// Journal entry for adaptations and deferrals.
    pub fn to_entry(&self, at: DateTime<Utc>) -> Option<AdaptationEntry> {
        let deferred = match self.outcome {
            AdaptationOutcome::Unchanged => return None,
            AdaptationOutcome::Adapted => false,
            AdaptationOutcome::Deferred { .. } => true,
        };
        Some(AdaptationEntry {
            account: self.account.clone(),
            previous: self.previous,
            detected: self.detected,
            profile: self.profile.clone(),
            deferred,
            at,
        })
    }
}

/// Classifies conditions per account-instrument pair and adapts each
/// account's risk profile.
///
/// The set of accounts is fixed at construction; each account has its own
/// lock and no lock is held across an await.
#[derive(Debug)]
pub struct RiskGovernor {
    detector: ConditionDetector,
    table: AdaptationTable,
    reduction_fraction: Decimal,
    accounts: HashMap<String, Mutex<AccountState>>,
}

impl RiskGovernor {
    pub fn new(
        detector: ConditionDetector,
        table: AdaptationTable,
        reduction_fraction: Decimal,
        accounts: impl IntoIterator<Item = (String, AccountRiskConfig)>,
    ) -> Self {
        Self {
            detector,
            table,
            reduction_fraction,
            accounts: accounts
                .into_iter()
                .map(|(name, config)| (name, Mutex::new(AccountState::new(config))))
                .collect(),
        }
    }

    pub fn detector(&self) -> &ConditionDetector {
        &self.detector
    }

    /// Account names, sorted.
    pub fn accounts(&self) -> Vec<String> {
        let mut names: Vec<String> = self.accounts.keys().cloned().collect();
        names.sort();
        names
    }

    /// Evaluate one account.
    ///
    /// Each input is classified (bad input counts as `Normal`) and stored as
    /// that pair's condition; the account margin is added to every input and
    /// also tracked on its own. The account's detected condition is the
    /// maximum over its pairs. The profile is re-derived from the base only
    /// if that condition differs from the applied one and the cooldown has
    /// elapsed. A margin usage at or above the critical level always yields
    /// a reduction request.
    ///
    /// # Returns
    /// `None` for an unknown account.
    pub fn evaluate(
        &self,
        account: &str,
        inputs: &[ConditionInputs],
        margin_usage: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Option<AccountEvaluation> {
        let slot = self.accounts.get(account)?;
        let mut state = slot.lock();

        for input in inputs {
            let input = input.clone().with_margin_usage(margin_usage);
            let condition = self.detector.classify(&input);
            state.pairs.insert(input.instrument, condition);
        }
        if margin_usage.is_some() || state.pairs.is_empty() {
            let margin = ConditionInputs::margin_only(account, margin_usage);
            let condition = self.detector.classify(&margin);
            state.pairs.insert(margin.instrument, condition);
        }

        let previous = state.applied;
        let detected = state.max_pair_condition();
        state.detected = detected;

        let outcome = if detected == previous {
            AdaptationOutcome::Unchanged
        } else {
            let remaining = state
                .last_adapted
                .map(|last| state.config.cooldown - (now - last))
                .unwrap_or_else(Duration::zero);

            if remaining > Duration::zero() {
                debug!(
                    account,
                    %previous,
                    %detected,
                    remaining_secs = remaining.num_seconds(),
                    "Adaptation deferred by cooldown"
                );
                AdaptationOutcome::Deferred {
                    remaining_secs: remaining.num_seconds(),
                }
            } else {
                let profile = adapt(&self.table, &state.config.base, &state.config.overrides, detected);
                info!(
                    account,
                    %previous,
                    %detected,
                    position_size_multiplier = %profile.position_size_multiplier,
                    max_margin_usage = %profile.max_margin_usage,
                    paused = profile.is_paused(),
                    "Risk profile adapted"
                );
                state.profile = profile;
                state.applied = detected;
                state.last_adapted = Some(now);
                AdaptationOutcome::Adapted
            }
        };

        let reduction = margin_usage
            .filter(|usage| self.detector.is_critical(*usage))
            .map(|usage| {
                warn!(
                    account,
                    margin_usage = %usage,
                    fraction = %self.reduction_fraction,
                    "Critical margin usage, requesting reduction"
                );
                ReductionRequest {
                    account: account.to_string(),
                    fraction: self.reduction_fraction,
                    margin_usage: usage,
                    issued_at: now,
                }
            });

        Some(AccountEvaluation {
            account: account.to_string(),
            previous,
            detected,
            applied: state.applied,
            profile: state.profile.clone(),
            outcome,
            reduction,
        })
    }

    /// Maximum condition over every tracked pair of every account.
    pub fn current_condition(&self) -> MarketCondition {
        MarketCondition::most_severe(
            self.accounts
                .values()
                .map(|slot| slot.lock().max_pair_condition()),
        )
    }

    /// Detected condition for one pair.
    pub fn pair_condition(&self, account: &str, instrument: &str) -> Option<MarketCondition> {
        self.accounts
            .get(account)
            .and_then(|slot| slot.lock().pairs.get(instrument).copied())
    }

    /// Condition whose adaptation is currently in force.
    pub fn applied_condition(&self, account: &str) -> Option<MarketCondition> {
        self.accounts.get(account).map(|slot| slot.lock().applied)
    }

    /// Profile currently in force.
    pub fn profile(&self, account: &str) -> Option<RiskProfile> {
        self.accounts.get(account).map(|slot| slot.lock().profile.clone())
    }

    /// Base profile for an account.
    pub fn base_profile(&self, account: &str) -> Option<RiskProfile> {
        self.accounts
            .get(account)
            .map(|slot| slot.lock().config.base.clone())
    }
}
