//! Durable archive for finished rounds and their bets.
//!
//! Writes flow through a bounded channel into a dedicated worker thread that
//! owns the SQLite connection; archival is broadcast-grade, so backpressure
//! drops the write with a warning instead of stalling the clock.

use anyhow::Context;
use aviator_types::{Bet, Round};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::{error, warn};

const DEFAULT_BUFFER: usize = 256;

/// A crashed round together with its final bets, ready for archival.
#[derive(Clone, Debug)]
pub struct ArchivedRound {
    pub round: Round,
    pub bets: Vec<Bet>,
}

enum ArchiveRequest {
    Round(Box<ArchivedRound>),
}

pub struct RoundArchive {
    sender: mpsc::Sender<ArchiveRequest>,
}

impl RoundArchive {
    /// Opens (creating if needed) the archive database, returning the handle
    /// and the most recent crash values (newest first) for history seeding.
    pub fn open(path: &Path, recent_limit: usize) -> anyhow::Result<(Self, Vec<Decimal>)> {
        let conn = Connection::open(path).context("open round archive db")?;
        init_schema(&conn)?;
        let recent = load_recent_crashes(&conn, recent_limit)?;

        let (sender, mut receiver) = mpsc::channel(DEFAULT_BUFFER);
        std::thread::Builder::new()
            .name("round-archive".to_string())
            .spawn(move || {
                while let Some(request) = receiver.blocking_recv() {
                    match request {
                        ArchiveRequest::Round(archived) => {
                            if let Err(err) = insert_round(&conn, &archived) {
                                error!(round_id = archived.round.id, ?err, "round archive write failed");
                            }
                        }
                    }
                }
            })
            .context("spawn round archive worker")?;

        Ok((Self { sender }, recent))
    }

    /// Enqueues a finished round. Never blocks the caller.
    pub fn archive(&self, archived: ArchivedRound) {
        let round_id = archived.round.id;
        match self.sender.try_send(ArchiveRequest::Round(Box::new(archived))) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(round_id, "round archive buffer full; dropping round");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(round_id, "round archive worker gone; dropping round");
            }
        }
    }
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS rounds (
            id INTEGER PRIMARY KEY,
            created_at_ms INTEGER NOT NULL,
            crash_multiplier TEXT NOT NULL,
            ended_at_ms INTEGER
        );
        CREATE TABLE IF NOT EXISTS bets (
            id INTEGER PRIMARY KEY,
            round_id INTEGER NOT NULL,
            user_id TEXT NOT NULL,
            amount TEXT NOT NULL,
            auto_cashout_threshold TEXT,
            cash_out_multiplier TEXT,
            outcome TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_bets_round ON bets(round_id);
        CREATE INDEX IF NOT EXISTS idx_bets_user ON bets(user_id);",
    )
    .context("init round archive schema")?;
    Ok(())
}

fn insert_round(conn: &Connection, archived: &ArchivedRound) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT OR REPLACE INTO rounds (id, created_at_ms, crash_multiplier, ended_at_ms)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            archived.round.id,
            archived.round.created_at_ms,
            archived.round.crash_multiplier.to_string(),
            archived.round.ended_at_ms,
        ],
    )?;
    for bet in &archived.bets {
        tx.execute(
            "INSERT OR REPLACE INTO bets
             (id, round_id, user_id, amount, auto_cashout_threshold,
              cash_out_multiplier, outcome, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                bet.id,
                bet.round_id,
                bet.user_id,
                bet.amount.to_string(),
                bet.auto_cashout_threshold.map(|value| value.to_string()),
                bet.cash_out_multiplier.map(|value| value.to_string()),
                bet.outcome.as_str(),
                bet.created_at_ms,
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn load_recent_crashes(conn: &Connection, limit: usize) -> anyhow::Result<Vec<Decimal>> {
    let mut statement = conn.prepare(
        "SELECT crash_multiplier FROM rounds
         WHERE ended_at_ms IS NOT NULL
         ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = statement.query_map(params![limit as i64], |row| row.get::<_, String>(0))?;
    let mut crashes = Vec::new();
    for row in rows {
        let raw = row?;
        match Decimal::from_str(&raw) {
            Ok(value) => crashes.push(value),
            Err(err) => warn!(%raw, ?err, "skipping unparseable archived crash value"),
        }
    }
    Ok(crashes)
}
