//! Rewards engine
//!
//! Owns the durable state and the injected collaborators, and exposes the
//! operations callers use. Every mutating operation works on a copy of the
//! state and adopts it only after the store has persisted it, so a failed
//! call leaves nothing behind. The one exception is a payout batch the ledger
//! already accepted: its state is kept in memory even if the save fails.
//!
//! Progress is driven entirely by wager events: with no wagers a pending
//! distribution waits (or an operator calls [`RewardsEngine::advance_distribution`]).

use crate::collaborators::{BatchSizeOracle, ProfitSharing};
use crate::day_ledger::DailySummary;
use crate::distribution::{BatchOutcome, DistributionPhase, DistributionState};
use crate::errors::RewardsError;
use crate::ledger::TokenLedger;
use crate::rollover::{close_day, RolloverContext, RolloverReport};
use crate::state::{CollaboratorAddresses, RewardsState};
use crate::store::RewardsStore;
use serde::{Deserialize, Serialize};
use tap_economics::{pro_rata_share, EmissionParams};
use tap_types::{AccountId, Amount, DayIndex, REWARD_TOKEN_SYMBOL};
use tracing::{debug, error, info, warn};

/// Static engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Account allowed to change collaborator addresses.
    pub owner: AccountId,
    /// The engine's own token account.
    pub treasury: AccountId,
    /// Only deposits in this token are accepted.
    #[serde(default = "default_reward_symbol")]
    pub reward_symbol: String,
    #[serde(default)]
    pub emission: EmissionParams,
}

fn default_reward_symbol() -> String {
    REWARD_TOKEN_SYMBOL.to_string()
}

impl EngineConfig {
    pub fn new(owner: AccountId, treasury: AccountId) -> Self {
        Self {
            owner,
            treasury,
            reward_symbol: default_reward_symbol(),
            emission: EmissionParams::default(),
        }
    }
}

/// External collaborators injected at construction.
pub struct Collaborators {
    pub token: Box<dyn TokenLedger>,
    pub batch_size: Box<dyn BatchSizeOracle>,
    pub profit_sharing: Box<dyn ProfitSharing>,
}

/// Result of a recorded wager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerReceipt {
    pub day: DayIndex,
    /// Present when this wager closed the previous day.
    pub rollover: Option<RolloverReport>,
    /// Present when profit sharing asked for a payout step.
    pub batch: Option<BatchOutcome>,
}

/// Point-in-time view for operators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub current_day: DayIndex,
    pub phase: DistributionPhase,
    pub distribution: DistributionState,
    pub last_distribution_amount: Amount,
    pub today_total: Amount,
    pub today_participants: usize,
    pub yesterday_total: Amount,
    pub yesterday_participants: usize,
    pub treasury_balance: Amount,
    pub expected_pool: Amount,
    pub collaborators: CollaboratorAddresses,
}

pub struct RewardsEngine {
    config: EngineConfig,
    state: RewardsState,
    token: Box<dyn TokenLedger>,
    batch_size: Box<dyn BatchSizeOracle>,
    profit_sharing: Box<dyn ProfitSharing>,
    store: Box<dyn RewardsStore>,
}

impl RewardsEngine {
    /// Open the engine over `store`, installing a fresh state on first start.
    pub fn open(
        config: EngineConfig,
        collaborators: Collaborators,
        store: Box<dyn RewardsStore>,
    ) -> Result<Self, RewardsError> {
        config.emission.validate()?;
        let state = match store.load().map_err(RewardsError::Storage)? {
            Some(state) => {
                info!(
                    target: "treasury",
                    day = %state.ledger.current_day(),
                    phase = ?state.distribution.phase(),
                    "rewards state restored"
                );
                state
            }
            None => {
                let state = RewardsState::default();
                store.save(&state).map_err(RewardsError::Storage)?;
                info!(target: "treasury", "rewards state installed");
                state
            }
        };

        Ok(Self {
            config,
            state,
            token: collaborators.token,
            batch_size: collaborators.batch_size,
            profit_sharing: collaborators.profit_sharing,
            store,
        })
    }

    fn commit(&mut self, next: RewardsState) -> Result<(), RewardsError> {
        self.store.save(&next).map_err(RewardsError::Storage)?;
        self.state = next;
        Ok(())
    }

    /// Commit a state whose batch the ledger may already have accepted.
    ///
    /// Once tokens have moved the new cursor must not be dropped, so a failed
    /// save still adopts `next` in memory and reports `UnsavedPayout`.
    fn commit_batch(
        &mut self,
        next: RewardsState,
        batch: Option<&BatchOutcome>,
    ) -> Result<(), RewardsError> {
        let paid = matches!(batch, Some(BatchOutcome::Paid { .. }));
        match self.store.save(&next) {
            Ok(()) => {
                self.state = next;
                Ok(())
            }
            Err(source) if paid => {
                error!(
                    target: "treasury",
                    cursor = next.distribution.cursor,
                    error = %source,
                    "payout batch committed on the ledger but state save failed"
                );
                self.state = next;
                Err(RewardsError::UnsavedPayout(source))
            }
            Err(source) => Err(RewardsError::Storage(source)),
        }
    }

    fn ensure_owner(&self, caller: &AccountId, action: &'static str) -> Result<(), RewardsError> {
        if *caller != self.config.owner {
            return Err(RewardsError::Unauthorized {
                caller: caller.clone(),
                action,
            });
        }
        Ok(())
    }

    fn ensure_collaborator(
        expected: &Option<AccountId>,
        caller: &AccountId,
        action: &'static str,
    ) -> Result<(), RewardsError> {
        match expected {
            Some(addr) if addr == caller => Ok(()),
            _ => Err(RewardsError::Unauthorized {
                caller: caller.clone(),
                action,
            }),
        }
    }

    fn treasury_balance(&self) -> Result<Amount, RewardsError> {
        self.token
            .balance_of(&self.config.treasury)
            .map_err(RewardsError::Ledger)
    }

    // -------------------------------------------------------------------------
    // Wager intake
    // -------------------------------------------------------------------------

    /// Record a wager reported by the wager source.
    ///
    /// A `day_index` different from the current one closes the current day
    /// first. Afterwards profit sharing is signalled and, if it reports a
    /// distribution, the pending reward payout advances by one batch. A failed
    /// batch fails the whole call, including the wager itself.
    pub fn record_wager(
        &mut self,
        caller: &AccountId,
        participant: AccountId,
        amount: Amount,
        day_index: u64,
    ) -> Result<WagerReceipt, RewardsError> {
        Self::ensure_collaborator(&self.state.collaborators.game, caller, "record wagers")?;
        let day = DayIndex::from_raw(day_index)?;
        let mut next = self.state.clone();

        let mut rollover = None;
        let closing_day = next.ledger.current_day();
        if day != closing_day {
            let ctx = RolloverContext {
                ledger: self.token.as_ref(),
                treasury: &self.config.treasury,
                oracle: self.batch_size.as_ref(),
                params: &self.config.emission,
            };
            rollover = Some(close_day(
                closing_day,
                next.ledger.bucket(closing_day),
                &mut next.distribution,
                &mut next.emission,
                &ctx,
            )?);
            next.ledger.begin_day(day);
        }

        next.ledger.record(&participant, amount)?;
        debug!(
            target: "treasury",
            %participant,
            amount,
            %day,
            today_total = next.ledger.today().total(),
            "wager recorded"
        );

        let mut batch = None;
        if self
            .profit_sharing
            .distribute()
            .map_err(RewardsError::ProfitSharing)?
        {
            batch = Some(
                next.distribution
                    .advance(next.ledger.yesterday(), self.token.as_mut())?,
            );
        }

        self.commit_batch(next, batch.as_ref())?;
        Ok(WagerReceipt {
            day,
            rollover,
            batch,
        })
    }

    /// Advance a pending distribution by one batch without a wager.
    pub fn advance_distribution(&mut self) -> Result<BatchOutcome, RewardsError> {
        let mut next = self.state.clone();
        let outcome = next
            .distribution
            .advance(next.ledger.yesterday(), self.token.as_mut())?;
        if outcome != BatchOutcome::Idle {
            self.commit_batch(next, Some(&outcome))?;
        }
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Deposits
    // -------------------------------------------------------------------------

    /// Callback from the token ledger after `value` tokens arrived from `from`.
    ///
    /// Returning an error tells the ledger to refuse the deposit.
    pub fn on_tokens_received(
        &mut self,
        caller: &AccountId,
        from: &AccountId,
        value: Amount,
    ) -> Result<(), RewardsError> {
        Self::ensure_collaborator(&self.state.collaborators.token, caller, "deliver deposits")?;

        let balance = self.treasury_balance()?;
        if balance == self.config.emission.high_milestone {
            return Err(RewardsError::DepositRejected(format!(
                "treasury already holds the full allocation of {}",
                balance
            )));
        }
        let symbol = self.token.symbol().map_err(RewardsError::Ledger)?;
        if symbol != self.config.reward_symbol {
            return Err(RewardsError::DepositRejected(format!(
                "only {} is accepted, got {}",
                self.config.reward_symbol, symbol
            )));
        }

        let mut next = self.state.clone();
        if next.distribution.reserves_exhausted {
            info!(target: "treasury", "treasury refilled, rewards resume at next rollover");
        }
        next.distribution.clear_exhaustion();
        self.commit(next)?;

        info!(target: "treasury", %from, value, symbol = %symbol, "reward tokens received");
        Ok(())
    }

    /// The treasury only holds the reward token; native currency is always refused.
    pub fn on_native_payment(&self, from: &AccountId, value: Amount) -> Result<(), RewardsError> {
        warn!(target: "treasury", %from, value, "native currency payment refused");
        Err(RewardsError::NativePaymentRejected)
    }

    // -------------------------------------------------------------------------
    // Collaborator addresses (owner only)
    // -------------------------------------------------------------------------

    fn update_collaborators(
        &mut self,
        caller: &AccountId,
        action: &'static str,
        apply: impl FnOnce(&mut CollaboratorAddresses),
    ) -> Result<(), RewardsError> {
        self.ensure_owner(caller, action)?;
        let mut next = self.state.clone();
        apply(&mut next.collaborators);
        self.commit(next)?;
        info!(target: "treasury", action, "collaborator address updated");
        Ok(())
    }

    pub fn set_token_address(
        &mut self,
        caller: &AccountId,
        address: AccountId,
    ) -> Result<(), RewardsError> {
        self.update_collaborators(caller, "set the token address", |c| c.token = Some(address))
    }

    pub fn set_game_address(
        &mut self,
        caller: &AccountId,
        address: AccountId,
    ) -> Result<(), RewardsError> {
        self.update_collaborators(caller, "set the game address", |c| c.game = Some(address))
    }

    pub fn set_dividends_address(
        &mut self,
        caller: &AccountId,
        address: AccountId,
    ) -> Result<(), RewardsError> {
        self.update_collaborators(caller, "set the dividends address", |c| {
            c.dividends = Some(address)
        })
    }

    pub fn token_address(&self) -> Option<&AccountId> {
        self.state.collaborators.token.as_ref()
    }

    pub fn game_address(&self) -> Option<&AccountId> {
        self.state.collaborators.game.as_ref()
    }

    pub fn dividends_address(&self) -> Option<&AccountId> {
        self.state.collaborators.dividends.as_ref()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn current_day(&self) -> DayIndex {
        self.state.ledger.current_day()
    }

    pub fn today_total(&self) -> Amount {
        self.state.ledger.today().total()
    }

    pub fn wager_of(&self, day: DayIndex, participant: &AccountId) -> Amount {
        self.state.ledger.bucket(day).wager_of(participant)
    }

    pub fn todays_wager(&self, participant: &AccountId) -> Amount {
        self.state.ledger.today().wager_of(participant)
    }

    /// Pool the next rollover would set given the current treasury balance.
    pub fn expected_pool(&self) -> Result<Amount, RewardsError> {
        let balance = self.treasury_balance()?;
        Ok(self
            .state
            .emission
            .preview(balance, &self.config.emission)?
            .pool)
    }

    /// Reward `participant` would receive if today closed now.
    pub fn expected_reward_share(&self, participant: &AccountId) -> Result<Amount, RewardsError> {
        let today = self.state.ledger.today();
        if today.total() == 0 {
            return Ok(0);
        }
        let pool = self.expected_pool()?;
        Ok(pro_rata_share(pool, today.wager_of(participant), today.total())?)
    }

    pub fn daily_summary(&self) -> DailySummary {
        self.state.ledger.summary()
    }

    pub fn daily_summary_json(&self) -> Result<String, RewardsError> {
        Ok(serde_json::to_string(&self.daily_summary())?)
    }

    pub fn is_distribution_complete(&self) -> bool {
        self.state.distribution.complete
    }

    pub fn distribution(&self) -> &DistributionState {
        &self.state.distribution
    }

    pub fn state(&self) -> &RewardsState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> Result<EngineStatus, RewardsError> {
        let ledger = &self.state.ledger;
        Ok(EngineStatus {
            current_day: ledger.current_day(),
            phase: self.state.distribution.phase(),
            distribution: self.state.distribution.clone(),
            last_distribution_amount: self.state.emission.last_distribution_amount,
            today_total: ledger.today().total(),
            today_participants: ledger.today().len(),
            yesterday_total: ledger.yesterday().total(),
            yesterday_participants: ledger.yesterday().len(),
            treasury_balance: self.treasury_balance()?,
            expected_pool: self.expected_pool()?,
            collaborators: self.state.collaborators.clone(),
        })
    }

    /// Get token ledger for queries
    pub fn token_ledger(&self) -> &dyn TokenLedger {
        self.token.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FixedBatchSize, StaticProfitSharing};
    use crate::ledger::MockTokenLedger;
    use crate::store::MemoryRewardsStore;
    use tap_types::tap;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn engine(ledger: &MockTokenLedger, profit_sharing: bool) -> RewardsEngine {
        let mut engine = RewardsEngine::open(
            EngineConfig::new(id("owner"), id("treasury")),
            Collaborators {
                token: Box::new(ledger.clone()),
                batch_size: Box::new(FixedBatchSize(2)),
                profit_sharing: Box::new(StaticProfitSharing(profit_sharing)),
            },
            Box::new(MemoryRewardsStore::new()),
        )
        .unwrap();
        engine.set_game_address(&id("owner"), id("game")).unwrap();
        engine.set_token_address(&id("owner"), id("token")).unwrap();
        engine
    }

    #[test]
    fn test_fresh_install_state() {
        let ledger = MockTokenLedger::new(id("treasury"), tap(1_000));
        let engine = engine(&ledger, false);
        assert_eq!(engine.current_day(), DayIndex::Even);
        assert!(engine.is_distribution_complete());
        assert_eq!(engine.today_total(), 0);
        assert!(!engine.distribution().reserves_exhausted);
    }

    #[test]
    fn test_only_game_records_wagers() {
        let ledger = MockTokenLedger::new(id("treasury"), tap(1_000));
        let mut engine = engine(&ledger, false);
        let err = engine
            .record_wager(&id("mallory"), id("alice"), 10, 0)
            .unwrap_err();
        assert!(matches!(err, RewardsError::Unauthorized { .. }));
        assert_eq!(engine.today_total(), 0);
    }

    #[test]
    fn test_only_owner_sets_addresses() {
        let ledger = MockTokenLedger::new(id("treasury"), tap(1_000));
        let mut engine = engine(&ledger, false);
        assert!(engine.set_game_address(&id("game"), id("other")).is_err());
        assert_eq!(engine.game_address(), Some(&id("game")));
        engine.set_dividends_address(&id("owner"), id("divs")).unwrap();
        assert_eq!(engine.dividends_address(), Some(&id("divs")));
    }

    #[test]
    fn test_invalid_day_index_rejected() {
        let ledger = MockTokenLedger::new(id("treasury"), tap(1_000));
        let mut engine = engine(&ledger, false);
        assert!(matches!(
            engine.record_wager(&id("game"), id("alice"), 10, 2),
            Err(RewardsError::InvalidDayIndex(_))
        ));
    }

    #[test]
    fn test_expected_reward_share_uses_today() {
        let ledger = MockTokenLedger::new(id("treasury"), 1_000);
        let mut engine = engine(&ledger, false);
        assert_eq!(engine.expected_reward_share(&id("alice")).unwrap(), 0);

        engine.record_wager(&id("game"), id("alice"), 1, 0).unwrap();
        engine.record_wager(&id("game"), id("bob"), 3, 0).unwrap();
        // Decay tier capped by the 1,000 unit treasury.
        assert_eq!(engine.expected_pool().unwrap(), 1_000);
        assert_eq!(engine.expected_reward_share(&id("alice")).unwrap(), 250);
        assert_eq!(engine.expected_reward_share(&id("bob")).unwrap(), 750);
    }

    #[test]
    fn test_deposit_checks() {
        let ledger = MockTokenLedger::new(id("treasury"), 1);
        let mut engine = engine(&ledger, false);

        assert!(matches!(
            engine.on_tokens_received(&id("elsewhere"), &id("alice"), 5),
            Err(RewardsError::Unauthorized { .. })
        ));

        ledger.set_symbol("ICX");
        assert!(matches!(
            engine.on_tokens_received(&id("token"), &id("alice"), 5),
            Err(RewardsError::DepositRejected(_))
        ));

        ledger.set_symbol("TAP");
        ledger.credit(&id("treasury"), tap(264_000_000) - 1);
        assert!(matches!(
            engine.on_tokens_received(&id("token"), &id("alice"), 5),
            Err(RewardsError::DepositRejected(_))
        ));

        assert!(engine.on_native_payment(&id("alice"), 1).is_err());
    }

    #[test]
    fn test_status_reports_phase() {
        let ledger = MockTokenLedger::new(id("treasury"), tap(1_000));
        let mut engine = engine(&ledger, false);
        engine.record_wager(&id("game"), id("alice"), 5, 0).unwrap();
        engine.record_wager(&id("game"), id("bob"), 5, 1).unwrap();

        let status = engine.status().unwrap();
        assert_eq!(status.current_day, DayIndex::Odd);
        assert_eq!(status.phase, DistributionPhase::Armed);
        assert_eq!(status.yesterday_total, 5);
        assert_eq!(status.today_participants, 1);
        assert_eq!(status.treasury_balance, tap(1_000));
    }
}
