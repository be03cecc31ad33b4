//! Bot-driven hold'em simulation.
//!
//! Spawns table actors through a TableManager, seats a handful of bots at
//! each, and plays every match out to its settlement.

mod bot;
mod config;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use anyhow::Error;
use ctrlc::set_handler;
use holdem_table::{
    Phase,
    table::{TableHandle, TableManager},
};
use log::{debug, info, warn};
use pico_args::Arguments;
use rand::{Rng, SeedableRng, rngs::StdRng};

use bot::Bot;
use config::SimConfig;

const HELP: &str = "\
Play bot-only hold'em matches until every table settles

USAGE:
  ht_sim [OPTIONS]

OPTIONS:
  --tables     N           Number of tables to run         [default: env HT_TABLES or 1]
  --players    N           Bots seated at each table       [default: env HT_PLAYERS or 4]
  --rounds     N           Hands per match                 [default: env HT_MAX_ROUNDS or 20]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  HT_TURN_SECS             Seconds before a stalled turn is folded
  HT_THINK_MS              Pause before each bot action
  HT_AUTO_REBUY            Whether broke bots rebuy (true/false)
  HT_SEED                  Seed for reproducible bot decisions
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let config = SimConfig::from_env(
        pargs.opt_value_from_str("--tables")?,
        pargs.opt_value_from_str("--players")?,
        pargs.opt_value_from_str("--rounds")?,
    )?;
    config.validate()?;

    // Catching signals for a clean stop between actions.
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    set_handler(move || flag.store(true, Ordering::SeqCst))?;

    env_logger::builder().format_target(false).init();
    info!(
        "Starting {} table(s) with {} bots each, {} hands per match",
        config.num_tables, config.players_per_table, config.table_defaults.max_rounds
    );

    let manager = Arc::new(TableManager::default());
    let sweeper = manager.spawn_sweeper(Duration::from_secs(1));
    let mut seeds = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut tasks = Vec::with_capacity(config.num_tables);
    for index in 0..config.num_tables {
        let handle = manager.create_table(config.table_config(index)).await?;
        let bots: Vec<Bot> = (0..config.players_per_table)
            .map(|i| Bot::new(index, i, seeds.random_range(0.1..0.7)))
            .collect();
        for bot in &bots {
            let seat = manager.join(handle.table_id(), bot.id.clone(), &bot.name).await?;
            debug!("{} took seat {seat}", bot.name);
        }
        info!(
            "Created table {} with ID {}",
            index + 1,
            holdem_table::table::short_id(&handle.table_id())
        );

        let driver = Driver {
            name: config.table_config(index).name,
            handle,
            bots,
            rng: StdRng::seed_from_u64(seeds.random()),
            config: config.clone(),
            shutdown: Arc::clone(&shutdown),
        };
        tasks.push(tokio::spawn(driver.run()));
    }

    for task in tasks {
        if let Err(e) = task.await? {
            log::error!("Table driver failed: {e}");
        }
    }

    for table in manager.list_tables().await {
        let _ = manager.close_table(table.id).await;
    }
    sweeper.abort();
    info!("Simulation finished");

    Ok(())
}

/// Plays one table's bots until the match settles.
struct Driver {
    name: String,
    handle: TableHandle,
    bots: Vec<Bot>,
    rng: StdRng,
    config: SimConfig,
    shutdown: Arc<AtomicBool>,
}

impl Driver {
    async fn run(mut self) -> Result<(), Error> {
        for bot in &self.bots {
            self.handle.set_ready(bot.id.clone(), true).await?;
        }

        while !self.shutdown.load(Ordering::SeqCst) {
            let view = self.handle.view(None).await?;
            match view.phase {
                Phase::Settled => {
                    self.settle().await?;
                    return Ok(());
                }
                Phase::Waiting => {
                    if !self.refill().await? {
                        warn!("{}: not enough funded bots to continue", self.name);
                        return Ok(());
                    }
                }
                Phase::Showdown => self.confirm().await?,
                _ => self.act(view.current_seat).await?,
            }
        }

        info!("Interrupted; stopping {}", self.name);
        Ok(())
    }

    /// Rebuy broke bots and ready everyone. Returns whether a hand can
    /// still be dealt.
    async fn refill(&mut self) -> Result<bool, Error> {
        let mut funded = 0;
        for bot in &self.bots {
            let view = self.handle.view(Some(bot.id.clone())).await?;
            if view.can_rebuy && self.config.auto_rebuy {
                self.handle.rebuy(bot.id.clone()).await?;
            }
            let view = self.handle.view(Some(bot.id.clone())).await?;
            if view.phase != Phase::Waiting {
                // Auto-start already dealt the next hand.
                return Ok(true);
            }
            let seat = view.viewer_seat.and_then(|s| view.players.iter().find(|p| p.seat == s));
            if seat.is_some_and(|p| p.chips > 0) {
                funded += 1;
                self.handle.set_ready(bot.id.clone(), true).await?;
            }
        }
        Ok(funded >= 2 || self.handle.view(None).await?.phase != Phase::Waiting)
    }

    async fn confirm(&mut self) -> Result<(), Error> {
        for bot in &self.bots {
            let view = self.handle.view(Some(bot.id.clone())).await?;
            if view.phase != Phase::Showdown {
                break;
            }
            if view.can_rebuy && self.config.auto_rebuy {
                self.handle.rebuy(bot.id.clone()).await?;
            }
            let next = self.handle.confirm_next_hand(bot.id.clone()).await?;
            debug!("{} confirmed: {next:?}", bot.name);
        }
        Ok(())
    }

    async fn act(&mut self, current: Option<usize>) -> Result<(), Error> {
        let Some(seat) = current else {
            tokio::time::sleep(Duration::from_millis(5)).await;
            return Ok(());
        };

        for bot in &self.bots {
            let view = self.handle.view(Some(bot.id.clone())).await?;
            if view.viewer_seat != Some(seat) {
                continue;
            }
            let Some(action) = bot.choose(&view, &mut self.rng) else {
                return Ok(());
            };
            if !self.config.think_time.is_zero() {
                tokio::time::sleep(self.config.think_time).await;
            }
            match self.handle.act(bot.id.clone(), action).await {
                Ok(outcome) => debug!("{} {} ({} in)", bot.name, outcome.action, outcome.amount),
                // The turn moved on (timeout) between the view and the action.
                Err(e) if e.is_rejection() => warn!("{} rejected: {e}", bot.name),
                Err(e) => return Err(e.into()),
            }
            return Ok(());
        }
        Ok(())
    }

    async fn settle(&mut self) -> Result<(), Error> {
        let settlement = self.handle.settlement().await?;
        info!("{} settled:", self.name);
        for entry in &settlement {
            info!(
                "  - {} finished with {} (bought in {}, profit {:+})",
                entry.name, entry.final_chips, entry.total_buy_in, entry.profit
            );
        }
        for bot in &self.bots {
            self.handle.confirm_settlement(bot.id.clone()).await?;
        }
        Ok(())
    }
}
