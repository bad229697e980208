//! Shared `wasmtime` engine with a wall-clock bound on guest execution.
//!
//! The engine is built with epoch interruption. A background thread bumps the
//! epoch every [`EPOCH_TICK`], and every store gets a deadline covering the
//! invocation timeout, so a guest that never returns traps instead of holding
//! its thread.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use wasmtime::{Config, Engine, Store};

/// Interval between epoch increments.
pub const EPOCH_TICK: Duration = Duration::from_millis(10);

/// Errors raised while building the walker engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `wasmtime` rejected the engine configuration.
    #[error("failed to configure wasm engine: {0}")]
    Configure(String),

    /// The epoch ticker thread could not be spawned.
    #[error("failed to start epoch ticker: {0}")]
    Ticker(#[source] std::io::Error),
}

/// Stops the ticker thread once the last engine handle is dropped.
struct EpochTicker {
    stop: Arc<AtomicBool>,
}

impl EpochTicker {
    fn spawn(engine: Engine) -> Result<Self, EngineError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        thread::Builder::new()
            .name("walker-epoch".to_owned())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    thread::sleep(EPOCH_TICK);
                    engine.increment_epoch();
                }
            })
            .map_err(EngineError::Ticker)?;
        Ok(Self { stop })
    }

    fn is_running(&self) -> bool {
        !self.stop.load(Ordering::Acquire)
    }
}

impl Drop for EpochTicker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Engine used by the filesystem strategies and the modules they load.
#[derive(Clone)]
pub struct WalkerEngine {
    engine: Engine,
    deadline_ticks: u64,
    ticker: Arc<EpochTicker>,
}

impl WalkerEngine {
    /// Builds an engine whose guests trap after running for `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine cannot be configured or the
    /// ticker thread cannot be started.
    pub fn new(timeout: Duration) -> Result<Self, EngineError> {
        let mut config = Config::new();
        config.epoch_interruption(true);
        let engine = Engine::new(&config).map_err(|err| EngineError::Configure(err.to_string()))?;
        let ticker = EpochTicker::spawn(engine.clone())?;
        Ok(Self {
            engine,
            deadline_ticks: deadline_ticks(timeout),
            ticker: Arc::new(ticker),
        })
    }

    /// Returns the underlying `wasmtime` engine.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns how many epoch ticks a single call may run for.
    #[must_use]
    pub const fn deadline_ticks(&self) -> u64 {
        self.deadline_ticks
    }

    /// Creates a store whose guest traps once the deadline passes.
    #[must_use]
    pub fn store(&self) -> Store<()> {
        let mut store = Store::new(&self.engine, ());
        store.set_epoch_deadline(self.deadline_ticks);
        store
    }
}

impl fmt::Debug for WalkerEngine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WalkerEngine")
            .field("deadline_ticks", &self.deadline_ticks)
            .field("ticking", &self.ticker.is_running())
            .finish_non_exhaustive()
    }
}

// One extra tick covers the partial interval already elapsed when the store
// is created.
fn deadline_ticks(timeout: Duration) -> u64 {
    let ticks = timeout.as_millis().div_ceil(EPOCH_TICK.as_millis());
    u64::try_from(ticks).unwrap_or(u64::MAX).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_millis(200), 21)]
    #[case(Duration::from_millis(5), 2)]
    #[case(Duration::from_secs(30), 3001)]
    fn deadline_covers_the_timeout(#[case] timeout: Duration, #[case] expected: u64) {
        assert_eq!(deadline_ticks(timeout), expected);
    }

    #[test]
    fn ticker_runs_while_the_engine_is_alive() {
        let engine = WalkerEngine::new(Duration::from_millis(50)).expect("engine starts");
        assert!(engine.ticker.is_running());
        assert_eq!(engine.deadline_ticks(), 6);
    }
}
