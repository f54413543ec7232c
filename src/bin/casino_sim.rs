//! Casino Simulator
//!
//! Plays many rounds of one game through the public engine API against an
//! in-memory repository and reports the observed return to player.

use casino_engine::{
    BlackjackAction, CasinoEngine, CasinoError, ConfigLoader, InMemoryRepository,
    ManualClock, PlinkoRisk, RouletteBet, RouletteBetType, RoundSnapshot, RoundUpdate,
    TransactionRecord,
};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

const PLAYER: &str = "sim-player";

#[derive(Parser, Debug)]
#[command(name = "casino-sim")]
#[command(about = "Simulate rounds of a casino game and report RTP", long_about = None)]
struct Args {
    /// Game to simulate
    #[arg(long, value_enum)]
    game: SimGame,

    /// Number of rounds to play
    #[arg(long, default_value = "10000")]
    rounds: u64,

    /// Wager per round
    #[arg(long, default_value = "1")]
    amount: Decimal,

    /// 32-byte generator seed as 64 hex characters
    #[arg(long)]
    seed: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Dice roll-under target
    #[arg(long, default_value = "50")]
    target: u8,

    /// Crash cash-out multiplier
    #[arg(long, default_value = "2.00")]
    cashout: Decimal,

    /// Plinko risk level
    #[arg(long, value_enum, default_value = "medium")]
    risk: SimRisk,

    /// Plinko row count
    #[arg(long, default_value = "16")]
    rows: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SimGame {
    Slots,
    Dice,
    Roulette,
    Plinko,
    Crash,
    Blackjack,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SimRisk {
    Low,
    Medium,
    High,
}

impl From<SimRisk> for PlinkoRisk {
    fn from(risk: SimRisk) -> Self {
        match risk {
            SimRisk::Low => PlinkoRisk::Low,
            SimRisk::Medium => PlinkoRisk::Medium,
            SimRisk::High => PlinkoRisk::High,
        }
    }
}

#[derive(Default)]
struct Tally {
    rounds: u64,
    wins: u64,
    wagered: Decimal,
    paid: Decimal,
}

impl Tally {
    fn record(&mut self, transaction: &TransactionRecord) {
        self.rounds += 1;
        if transaction.is_win {
            self.wins += 1;
        }
        self.wagered += transaction.amount;
        self.paid += transaction.payout;
    }

    fn rtp(&self) -> Decimal {
        if self.wagered.is_zero() {
            Decimal::ZERO
        } else {
            (self.paid / self.wagered).round_dp(4)
        }
    }

    fn win_rate(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.wins as f64 / self.rounds as f64
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;
    casino_engine::telemetry::init_tracing(&config.monitoring);

    let bankroll = args.amount * Decimal::from(args.rounds.max(1)) * Decimal::from(10);
    let repository = Arc::new(InMemoryRepository::new().with_user(PLAYER, bankroll));
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let mut builder = CasinoEngine::builder()
        .with_config(config)
        .with_repository(repository)
        .with_clock(clock.clone());
    if let Some(seed) = &args.seed {
        builder = builder.with_seed(parse_seed(seed)?);
    }
    let engine = builder.build()?;

    info!("🎰 Simulating {} rounds of {:?}", args.rounds, args.game);
    info!("🔐 Seed commitment: {}", engine.seed_commitment());

    let mut tally = Tally::default();
    for _ in 0..args.rounds {
        match play_round(&engine, &clock, &args).await {
            Ok(Some(transaction)) => tally.record(&transaction),
            Ok(None) => {}
            Err(e) => {
                warn!("⚠️  Round failed: {}", e);
                break;
            }
        }
    }

    println!("\n📊 {:?} simulation", args.game);
    println!("   Rounds:    {}", tally.rounds);
    println!("   Wagered:   {}", tally.wagered);
    println!("   Paid:      {}", tally.paid);
    println!("   RTP:       {}", tally.rtp());
    println!("   Win rate:  {:.4}", tally.win_rate());
    println!("   Balance:   {}", engine.balance(PLAYER).await?);

    Ok(())
}

/// Play one round of the chosen game. `None` means the round produced no
/// transaction to tally.
async fn play_round(
    engine: &CasinoEngine,
    clock: &ManualClock,
    args: &Args,
) -> Result<Option<TransactionRecord>, CasinoError> {
    match args.game {
        SimGame::Slots => engine
            .place_slots_bet(PLAYER, args.amount)
            .await
            .map(|receipt| Some(receipt.transaction)),
        SimGame::Dice => engine
            .place_dice_bet(PLAYER, args.amount, args.target)
            .await
            .map(|receipt| Some(receipt.transaction)),
        SimGame::Roulette => {
            let bets = vec![RouletteBet {
                bet_type: RouletteBetType::Red,
                numbers: vec![],
                amount: args.amount,
            }];
            engine
                .place_roulette_bet(PLAYER, bets)
                .await
                .map(|receipt| Some(receipt.transaction))
        }
        SimGame::Plinko => engine
            .place_plinko_bet(PLAYER, args.amount, args.risk.into(), args.rows)
            .await
            .map(|receipt| Some(receipt.transaction)),
        SimGame::Crash => play_crash(engine, clock, args.amount, args.cashout).await,
        SimGame::Blackjack => play_blackjack(engine, args.amount).await,
    }
}

/// Start a round, move the clock to the cash-out target and try to cash out.
/// A crash first is settled as a loss by the status query.
async fn play_crash(
    engine: &CasinoEngine,
    clock: &ManualClock,
    amount: Decimal,
    cashout: Decimal,
) -> Result<Option<TransactionRecord>, CasinoError> {
    let update = engine.start_crash(PLAYER, amount, None).await?;
    let Some(RoundSnapshot::Crash(view)) = update.snapshot() else {
        return Ok(None);
    };
    let round_id = view.round_id;

    clock.advance_ms(engine.tables().crash.elapsed_ms_to_reach(cashout));
    match engine.cashout_crash(PLAYER, round_id).await {
        Ok(receipt) => Ok(Some(receipt.transaction)),
        Err(CasinoError::RoundAlreadyCrashed { .. }) => {
            let status = engine.crash_status(PLAYER, round_id).await?;
            Ok(status.receipt().map(|r| r.transaction.clone()))
        }
        Err(e) => Err(e),
    }
}

/// Hit below 17, double on 10 or 11
async fn play_blackjack(
    engine: &CasinoEngine,
    amount: Decimal,
) -> Result<Option<TransactionRecord>, CasinoError> {
    let mut update = engine.start_blackjack(PLAYER, amount).await?;
    loop {
        let view = match &update {
            RoundUpdate::Settled { receipt } => return Ok(Some(receipt.transaction.clone())),
            RoundUpdate::InProgress {
                round: RoundSnapshot::Blackjack(view),
            } => view.clone(),
            RoundUpdate::InProgress { .. } => return Ok(None),
        };

        let action = if view.can_double && (10..=11).contains(&view.player_total) {
            BlackjackAction::Double
        } else if view.player_total < 17 {
            BlackjackAction::Hit
        } else {
            BlackjackAction::Stand
        };
        update = engine.blackjack_action(PLAYER, view.round_id, action).await?;
    }
}

fn parse_seed(hex_seed: &str) -> Result<[u8; 32], Box<dyn std::error::Error>> {
    let bytes = hex::decode(hex_seed)?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|_| "seed must be exactly 32 bytes (64 hex characters)")?;
    Ok(seed)
}
