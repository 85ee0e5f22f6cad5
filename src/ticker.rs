//! Cancelable periodic tick source for the study timer.
//!
//! At most one interval exists per ticker. Arming replaces it and disarming
//! drops it, so a tick scheduled before a state change can never be
//! delivered after it.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Start ticking one period from now. Must run inside a tokio runtime.
    pub fn arm(&mut self) {
        let mut interval = time::interval_at(Instant::now() + self.period, self.period);
        // Catch up on late ticks so elapsed seconds track the wall clock.
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        self.interval = Some(interval);
    }

    pub fn disarm(&mut self) {
        self.interval = None;
    }

    /// Wait for the next tick; never resolves while disarmed.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_after_arming() {
        let mut ticker = Ticker::new(Duration::from_secs(1));
        ticker.arm();
        let started = Instant::now();

        ticker.tick().await;
        ticker.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_ticker_never_fires() {
        let mut ticker = Ticker::new(Duration::from_secs(1));
        ticker.arm();
        ticker.disarm();
        assert!(!ticker.is_armed());

        let fired = time::timeout(Duration::from_secs(10), ticker.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_restarts_the_period() {
        let mut ticker = Ticker::new(Duration::from_secs(1));
        ticker.arm();
        time::advance(Duration::from_millis(900)).await;
        ticker.arm();
        let rearmed = Instant::now();

        ticker.tick().await;
        assert_eq!(rearmed.elapsed(), Duration::from_secs(1));
    }
}
