//! Wagering engine
//!
//! Entry point for every bet. A request runs validate → debit → resolve →
//! settle while holding the user's ledger lock, so two requests from one user
//! never interleave and requests from different users never wait on each other.
//!
//! Multi-step rounds are settled through a compare-and-set on the stored round
//! status. Cash-out, status query, auto cash-out and the sweeper all race for
//! that one transition; only the winner credits anything.

use crate::common::clock::SystemClock;
use crate::common::traits::{CasinoRepository, Clock};
use crate::config::{self, CasinoConfig};
use crate::errors::{CasinoError, CasinoResult, StorageError};
use crate::games::blackjack::{fresh_deck, BlackjackAction, BlackjackRound};
use crate::games::crash::{CashOut, CrashRound};
use crate::games::paytable::PayoutTables;
use crate::games::rng::OutcomeGenerator;
use crate::games::types::{
    BetReceipt, GameData, GameType, PlinkoRisk, RouletteBet, RoundPayload, RoundSnapshot,
    RoundState, RoundStatus, RoundUpdate, TransactionRecord,
};
use crate::games::validator::BetValidator;
use crate::games::{
    BetRequest, DiceBet, PlinkoDrop, Resolver, RoundContext, RoundEnd, RoundMachine, RouletteSpin,
    SlotsBet,
};
use crate::ledger::BalanceLedger;
use crate::storage::InMemoryRepository;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct CasinoEngine {
    config: Arc<CasinoConfig>,
    tables: Arc<PayoutTables>,
    rng: Arc<OutcomeGenerator>,
    repository: Arc<dyn CasinoRepository>,
    ledger: Arc<BalanceLedger>,
    clock: Arc<dyn Clock>,
}

impl CasinoEngine {
    /// Engine with an entropy-seeded generator and the system clock
    pub fn new(config: CasinoConfig, repository: Arc<dyn CasinoRepository>) -> CasinoResult<Self> {
        EngineBuilder::new()
            .with_config(config)
            .with_repository(repository)
            .build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &CasinoConfig {
        &self.config
    }

    pub fn tables(&self) -> &PayoutTables {
        &self.tables
    }

    /// Commitment to the generator seed, for later disclosure
    pub fn seed_commitment(&self) -> &str {
        self.rng.seed_commitment()
    }

    pub async fn balance(&self, user_id: &str) -> CasinoResult<Decimal> {
        self.ledger.balance(user_id).await
    }

    // -----------------------------------------------------------------------
    // Single-shot games
    // -----------------------------------------------------------------------

    pub async fn place_slots_bet(&self, user_id: &str, amount: Decimal) -> CasinoResult<BetReceipt> {
        self.place_bet(user_id, BetRequest::Slots(SlotsBet { amount }))
            .await
    }

    pub async fn place_dice_bet(
        &self,
        user_id: &str,
        amount: Decimal,
        target: u8,
    ) -> CasinoResult<BetReceipt> {
        self.place_bet(user_id, BetRequest::Dice(DiceBet { amount, target }))
            .await
    }

    /// All bets are scored against a single spin
    pub async fn place_roulette_bet(
        &self,
        user_id: &str,
        bets: Vec<RouletteBet>,
    ) -> CasinoResult<BetReceipt> {
        self.place_bet(user_id, BetRequest::Roulette(RouletteSpin { bets }))
            .await
    }

    pub async fn place_plinko_bet(
        &self,
        user_id: &str,
        amount: Decimal,
        risk: PlinkoRisk,
        rows: u8,
    ) -> CasinoResult<BetReceipt> {
        self.place_bet(user_id, BetRequest::Plinko(PlinkoDrop { amount, risk, rows }))
            .await
    }

    /// Validate, debit, resolve and settle one single-shot bet
    pub async fn place_bet(&self, user_id: &str, request: BetRequest) -> CasinoResult<BetReceipt> {
        let _guard = self.ledger.lock_user(user_id).await;

        let balance = self.ledger.balance(user_id).await?;
        let wager = BetValidator::new(&self.config).validate(&request, balance)?;
        self.ledger.debit(user_id, wager).await?;

        let resolution = request.resolve(&self.rng, &self.tables);
        let record = TransactionRecord::from_resolution(
            user_id,
            resolution,
            self.clock.now(),
            None,
            &self.tables.version,
        );

        match self.ledger.settle(&record).await {
            Ok(balance) => {
                log_settlement(&record);
                Ok(BetReceipt {
                    transaction: record,
                    balance,
                })
            }
            Err(e) => {
                error!(user_id, game_type = %request.game_type(), error = %e, "settlement failed, refunding wager");
                self.ledger.refund(user_id, wager).await;
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Crash
    // -----------------------------------------------------------------------

    /// Open a crash round. The response never carries the crash point.
    pub async fn start_crash(
        &self,
        user_id: &str,
        amount: Decimal,
        auto_cashout: Option<Decimal>,
    ) -> CasinoResult<RoundUpdate> {
        let _guard = self.ledger.lock_user(user_id).await;
        self.ensure_no_active_round(user_id, GameType::Crash).await?;

        let balance = self.ledger.balance(user_id).await?;
        BetValidator::new(&self.config).validate_crash_start(amount, auto_cashout, balance)?;
        self.ledger.debit(user_id, amount).await?;

        let crash = CrashRound::start(amount, auto_cashout, &self.rng, &self.tables.crash);
        let round = RoundState::new(user_id, RoundPayload::Crash(crash), self.clock.now());
        self.open_round(&round, amount).await?;

        Ok(RoundUpdate::InProgress {
            round: self.snapshot(&round),
        })
    }

    /// Cash out at the server-side multiplier. Fails with `RoundAlreadyCrashed`
    /// once the curve has reached the crash point.
    pub async fn cashout_crash(&self, user_id: &str, round_id: Uuid) -> CasinoResult<BetReceipt> {
        let _guard = self.ledger.lock_user(user_id).await;

        let round = self.load_active_round(user_id, round_id, GameType::Crash).await?;
        let RoundPayload::Crash(crash) = &round.payload else {
            return Err(CasinoError::RoundNotFound(round_id));
        };

        match crash.cash_out(&self.context(&round)) {
            CashOut::Honored(end) => self.finish_round(&round, end).await,
            CashOut::Crashed(end) => {
                let crash_point = crash.crash_point;
                match self.finish_round(&round, end).await {
                    Ok(_) | Err(CasinoError::RoundAlreadyResolved(_)) => {}
                    Err(e) => return Err(e),
                }
                Err(CasinoError::RoundAlreadyCrashed { crash_point })
            }
        }
    }

    /// Status of a crash round; settles it first if its end has been reached
    pub async fn crash_status(&self, user_id: &str, round_id: Uuid) -> CasinoResult<RoundUpdate> {
        self.round_status(user_id, round_id, GameType::Crash).await
    }

    // -----------------------------------------------------------------------
    // Blackjack
    // -----------------------------------------------------------------------

    pub async fn start_blackjack(&self, user_id: &str, amount: Decimal) -> CasinoResult<RoundUpdate> {
        let _guard = self.ledger.lock_user(user_id).await;
        self.ensure_no_active_round(user_id, GameType::Blackjack).await?;

        let balance = self.ledger.balance(user_id).await?;
        BetValidator::new(&self.config).validate_blackjack_start(amount, balance)?;
        self.ledger.debit(user_id, amount).await?;

        let rules = &self.config.blackjack;
        let mut deck = fresh_deck();
        self.rng.shuffle(&mut deck);
        let hand = match BlackjackRound::deal(amount, deck, rules) {
            Ok(hand) => hand,
            Err(e) => {
                self.ledger.refund(user_id, amount).await;
                return Err(e.into());
            }
        };

        if let Some(resolution) = hand.opening_outcome(rules) {
            let record = TransactionRecord::from_resolution(
                user_id,
                resolution,
                self.clock.now(),
                Some(Uuid::new_v4()),
                &self.tables.version,
            );
            return match self.ledger.settle(&record).await {
                Ok(balance) => {
                    log_settlement(&record);
                    Ok(RoundUpdate::Settled {
                        receipt: BetReceipt {
                            transaction: record,
                            balance,
                        },
                    })
                }
                Err(e) => {
                    self.ledger.refund(user_id, amount).await;
                    Err(e)
                }
            };
        }

        let round = RoundState::new(user_id, RoundPayload::Blackjack(hand), self.clock.now());
        self.open_round(&round, amount).await?;
        Ok(RoundUpdate::InProgress {
            round: self.snapshot(&round),
        })
    }

    pub async fn blackjack_action(
        &self,
        user_id: &str,
        round_id: Uuid,
        action: BlackjackAction,
    ) -> CasinoResult<RoundUpdate> {
        let _guard = self.ledger.lock_user(user_id).await;

        let mut round = self
            .load_active_round(user_id, round_id, GameType::Blackjack)
            .await?;
        // an idle hand is stood before the action; the caller gets that result
        if let Some(end) = round.payload.poll(&self.context(&round)) {
            let receipt = self.finish_round(&round, end).await?;
            return Ok(RoundUpdate::Settled { receipt });
        }

        let RoundPayload::Blackjack(hand) = &mut round.payload else {
            return Err(CasinoError::RoundNotFound(round_id));
        };
        let rules = &self.config.blackjack;

        let mut extra_wager = Decimal::ZERO;
        if action == BlackjackAction::Double {
            hand.check_double(rules)?;
            self.ledger.debit(user_id, hand.amount_wagered).await?;
            extra_wager = hand.amount_wagered;
        }

        let outcome = match hand.apply(action, rules) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.refund_extra(user_id, extra_wager).await;
                return Err(e.into());
            }
        };
        debug!(user_id, %round_id, ?action, "blackjack action applied");

        match outcome {
            Some(resolution) => {
                let end = RoundEnd {
                    status: RoundStatus::Resolved,
                    resolution,
                };
                match self.finish_round(&round, end).await {
                    Ok(receipt) => Ok(RoundUpdate::Settled { receipt }),
                    Err(e) => {
                        self.refund_extra(user_id, extra_wager).await;
                        Err(e)
                    }
                }
            }
            None => {
                round.updated_at = self.clock.now();
                self.repository.save_round(&round).await?;
                Ok(RoundUpdate::InProgress {
                    round: self.snapshot(&round),
                })
            }
        }
    }

    pub async fn blackjack_status(&self, user_id: &str, round_id: Uuid) -> CasinoResult<RoundUpdate> {
        self.round_status(user_id, round_id, GameType::Blackjack)
            .await
    }

    // -----------------------------------------------------------------------
    // Queries and maintenance
    // -----------------------------------------------------------------------

    /// Client-safe view of the user's live round, settling it first if due
    pub async fn active_round(
        &self,
        user_id: &str,
        game_type: GameType,
    ) -> CasinoResult<Option<RoundSnapshot>> {
        // single-shot games never leave a round behind
        if !game_type.is_multi_step() {
            return Ok(None);
        }
        let _guard = self.ledger.lock_user(user_id).await;
        self.settle_if_due(user_id, game_type).await?;

        Ok(self
            .repository
            .get_active_round(user_id, game_type)
            .await?
            .map(|round| self.snapshot(&round)))
    }

    /// Most recent transactions first
    pub async fn transaction_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> CasinoResult<Vec<TransactionRecord>> {
        Ok(self.repository.list_transactions(user_id, limit).await?)
    }

    /// Settle every active round whose end has passed. Returns how many settled.
    pub async fn sweep_expired_rounds(&self) -> CasinoResult<usize> {
        let candidates = self.repository.active_rounds().await?;
        let mut settled = 0;

        for candidate in candidates {
            let _guard = self.ledger.lock_user(&candidate.user_id).await;

            // A request may have settled it while we waited for the lock
            let round = match self.repository.get_round(candidate.round_id).await? {
                Some(round) if round.is_active() => round,
                _ => continue,
            };
            let Some(end) = round.payload.poll(&self.context(&round)) else {
                continue;
            };
            match self.finish_round(&round, end).await {
                Ok(_) => settled += 1,
                Err(CasinoError::RoundAlreadyResolved(_)) => {}
                Err(e) => {
                    warn!(round_id = %round.round_id, user_id = %round.user_id, error = %e, "sweep could not settle round")
                }
            }
        }

        if settled > 0 {
            info!(settled, "swept expired rounds");
        }
        Ok(settled)
    }

    /// Run the sweeper every `crash.sweep_interval_ms`
    pub fn spawn_configured_sweeper(&self) -> SweeperHandle {
        self.spawn_sweeper(Duration::from_millis(self.config.crash.sweep_interval_ms))
    }

    /// Run the sweeper on the tokio runtime every `interval`. It stops when
    /// the returned handle is dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        let engine = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = engine.sweep_expired_rounds().await {
                    warn!(error = %e, "round sweep failed");
                }
                let pruned = engine.ledger.prune_idle_locks();
                if pruned > 0 {
                    debug!(pruned, "pruned idle user locks");
                }
            }
        });
        info!(interval_ms = interval.as_millis() as u64, "round sweeper started");
        SweeperHandle { task }
    }

    // -----------------------------------------------------------------------
    // Round plumbing
    // -----------------------------------------------------------------------

    fn context<'a>(&'a self, round: &RoundState) -> RoundContext<'a> {
        RoundContext::for_round(round, self.clock.now(), &self.config, &self.tables)
    }

    fn snapshot(&self, round: &RoundState) -> RoundSnapshot {
        round.payload.snapshot(&self.context(round))
    }

    /// Settle an abandoned round at this key if its end has passed
    async fn settle_if_due(
        &self,
        user_id: &str,
        game_type: GameType,
    ) -> CasinoResult<Option<BetReceipt>> {
        let Some(round) = self.repository.get_active_round(user_id, game_type).await? else {
            return Ok(None);
        };
        match round.payload.poll(&self.context(&round)) {
            Some(end) => self.finish_round(&round, end).await.map(Some),
            None => Ok(None),
        }
    }

    async fn ensure_no_active_round(&self, user_id: &str, game_type: GameType) -> CasinoResult<()> {
        self.settle_if_due(user_id, game_type).await?;
        if self
            .repository
            .get_active_round(user_id, game_type)
            .await?
            .is_some()
        {
            return Err(CasinoError::RoundAlreadyActive { game_type });
        }
        Ok(())
    }

    /// Persist a freshly debited round, refunding the wager if that fails
    async fn open_round(&self, round: &RoundState, wager: Decimal) -> CasinoResult<()> {
        match self.repository.insert_round(round).await {
            Ok(()) => {
                info!(
                    user_id = %round.user_id,
                    game_type = %round.game_type,
                    round_id = %round.round_id,
                    amount = %wager,
                    "round started"
                );
                Ok(())
            }
            Err(e) => {
                self.ledger.refund(&round.user_id, wager).await;
                match e {
                    StorageError::Conflict(_) => Err(CasinoError::RoundAlreadyActive {
                        game_type: round.game_type,
                    }),
                    other => Err(CasinoError::Persistence(other)),
                }
            }
        }
    }

    /// Load a round the user may act on. Settled rounds report how they ended.
    async fn load_active_round(
        &self,
        user_id: &str,
        round_id: Uuid,
        game_type: GameType,
    ) -> CasinoResult<RoundState> {
        if let Some(round) = self.repository.get_round(round_id).await? {
            if round.user_id != user_id || round.game_type != game_type {
                return Err(CasinoError::RoundNotFound(round_id));
            }
            if !round.is_active() {
                return Err(CasinoError::RoundAlreadyResolved(round_id));
            }
            return Ok(round);
        }

        match self.repository.get_round_transaction(round_id).await? {
            Some(record) if record.user_id == user_id && record.game_type == game_type => {
                match record.metadata {
                    GameData::Crash {
                        crash_point,
                        cashout_multiplier: None,
                        ..
                    } => Err(CasinoError::RoundAlreadyCrashed { crash_point }),
                    _ => Err(CasinoError::RoundAlreadyResolved(round_id)),
                }
            }
            _ => Err(CasinoError::RoundNotFound(round_id)),
        }
    }

    async fn round_status(
        &self,
        user_id: &str,
        round_id: Uuid,
        game_type: GameType,
    ) -> CasinoResult<RoundUpdate> {
        let _guard = self.ledger.lock_user(user_id).await;

        if let Some(round) = self.repository.get_round(round_id).await? {
            if round.user_id == user_id && round.game_type == game_type && round.is_active() {
                return match round.payload.poll(&self.context(&round)) {
                    Some(end) => Ok(RoundUpdate::Settled {
                        receipt: self.finish_round(&round, end).await?,
                    }),
                    None => Ok(RoundUpdate::InProgress {
                        round: self.snapshot(&round),
                    }),
                };
            }
        }

        match self.repository.get_round_transaction(round_id).await? {
            Some(record) if record.user_id == user_id && record.game_type == game_type => {
                let balance = self.ledger.balance(user_id).await?;
                Ok(RoundUpdate::Settled {
                    receipt: BetReceipt {
                        transaction: record,
                        balance,
                    },
                })
            }
            _ => Err(CasinoError::RoundNotFound(round_id)),
        }
    }

    /// Claim the round's terminal transition, then credit and record. If
    /// settlement fails the claim is released so the next touch can retry.
    async fn finish_round(&self, round: &RoundState, end: RoundEnd) -> CasinoResult<BetReceipt> {
        let round_id = round.round_id;
        let claimed = self
            .repository
            .transition_round(round_id, RoundStatus::Active, end.status)
            .await?;
        if !claimed {
            debug!(%round_id, "round already claimed by another path");
            return Err(CasinoError::RoundAlreadyResolved(round_id));
        }

        let record = TransactionRecord::from_resolution(
            &round.user_id,
            end.resolution,
            self.clock.now(),
            Some(round_id),
            &self.tables.version,
        );

        match self.ledger.settle(&record).await {
            Ok(balance) => {
                if let Err(e) = self.repository.delete_round(round_id).await {
                    warn!(%round_id, error = %e, "settled round could not be deleted");
                }
                log_settlement(&record);
                Ok(BetReceipt {
                    transaction: record,
                    balance,
                })
            }
            Err(e) => {
                error!(%round_id, error = %e, "round settlement failed, reopening round");
                if let Err(revert) = self
                    .repository
                    .transition_round(round_id, end.status, RoundStatus::Active)
                    .await
                {
                    error!(%round_id, error = %revert, "round could not be reopened");
                }
                Err(e)
            }
        }
    }

    async fn refund_extra(&self, user_id: &str, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.ledger.refund(user_id, amount).await;
        }
    }
}

fn log_settlement(record: &TransactionRecord) {
    info!(
        user_id = %record.user_id,
        game_type = %record.game_type,
        round_id = ?record.round_id,
        amount = %record.amount,
        payout = %record.payout,
        multiplier = %record.multiplier,
        "round settled"
    );
}

/// Aborts the background sweeper when dropped
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Builder for [`CasinoEngine`]; every collaborator can be overridden for tests
#[derive(Default)]
pub struct EngineBuilder {
    config: Option<CasinoConfig>,
    repository: Option<Arc<dyn CasinoRepository>>,
    rng: Option<OutcomeGenerator>,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CasinoConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn CasinoRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_rng(mut self, rng: OutcomeGenerator) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Deterministic generator, for replay and tests
    pub fn with_seed(self, seed: [u8; 32]) -> Self {
        self.with_rng(OutcomeGenerator::from_seed(seed))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> CasinoResult<CasinoEngine> {
        let config = self.config.unwrap_or_default();
        config::validate(&config)?;

        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryRepository::new()));
        let rng = self.rng.unwrap_or_else(OutcomeGenerator::from_entropy);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let tables = PayoutTables::from_config(&config);

        debug!(
            table_version = %tables.version,
            seed_commitment = rng.seed_commitment(),
            "casino engine built"
        );

        Ok(CasinoEngine {
            config: Arc::new(config),
            tables: Arc::new(tables),
            rng: Arc::new(rng),
            ledger: Arc::new(BalanceLedger::new(repository.clone())),
            repository,
            clock,
        })
    }
}
