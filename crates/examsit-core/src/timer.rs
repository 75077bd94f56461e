//! Section countdown state machine.
//!
//! The server owns the real timer; this type is the client's
//! locally-decrementing cache of it. Every value fetched from the server is
//! adopted wholesale — the local prediction is never trusted over a fresh
//! server read, and the two are never averaged. The caller drives `tick()`
//! once per second and owns the interval; `running()` going false is its
//! signal to drop the interval.

/// Local ticks between authoritative resyncs.
pub const RESYNC_EVERY_TICKS: u32 = 10;

/// Outcome of one local tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// Timer is paused, already expired, or has no time left to count.
    Idle,
    /// One second elapsed. `needs_resync` is set every
    /// [`RESYNC_EVERY_TICKS`]th tick.
    Ticked { needs_resync: bool },
    /// The local prediction reached zero. Returned exactly once.
    Expired,
}

/// Locally-predicted countdown for the active section.
#[derive(Debug, Clone)]
pub struct SectionTimer {
    remaining_seconds: u64,
    is_paused: bool,
    ticks_since_sync: u32,
    expiry_fired: bool,
}

impl SectionTimer {
    /// Start a timer from an authoritative server value.
    pub fn new(remaining_seconds: u64, is_paused: bool) -> Self {
        Self {
            remaining_seconds,
            is_paused,
            ticks_since_sync: 0,
            expiry_fired: false,
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Whether expiry has already fired for this section.
    pub fn has_expired(&self) -> bool {
        self.expiry_fired
    }

    /// Whether the countdown still needs ticking. False once paused or
    /// after expiry has fired; the caller must stop its interval then.
    pub fn running(&self) -> bool {
        !self.is_paused && !self.expiry_fired
    }

    /// Advance the local prediction by one second.
    pub fn tick(&mut self) -> TimerTick {
        if self.expiry_fired || self.is_paused {
            return TimerTick::Idle;
        }
        if self.remaining_seconds == 0 {
            // Latch so repeated zero-readings never re-fire expiry.
            self.expiry_fired = true;
            return TimerTick::Expired;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.expiry_fired = true;
            return TimerTick::Expired;
        }

        self.ticks_since_sync += 1;
        let needs_resync = self.ticks_since_sync >= RESYNC_EVERY_TICKS;
        if needs_resync {
            self.ticks_since_sync = 0;
        }
        TimerTick::Ticked { needs_resync }
    }

    /// Latch expiry without ticking. Used when an expired section is
    /// re-adopted from the server without having advanced; the section
    /// stays locked rather than reopening for answers.
    pub fn force_expire(&mut self) {
        self.expiry_fired = true;
    }

    /// Overwrite local state with an authoritative server value and reset
    /// the resync counter. An adopted non-zero value re-arms expiry.
    pub fn adopt(&mut self, remaining_seconds: u64, is_paused: bool) {
        self.remaining_seconds = remaining_seconds;
        self.is_paused = is_paused;
        self.ticks_since_sync = 0;
        if remaining_seconds > 0 {
            self.expiry_fired = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_one_second_per_tick() {
        let mut timer = SectionTimer::new(5, false);
        assert_eq!(timer.tick(), TimerTick::Ticked { needs_resync: false });
        assert_eq!(timer.remaining_seconds(), 4);
    }

    #[test]
    fn requests_resync_every_tenth_tick() {
        let mut timer = SectionTimer::new(100, false);
        for i in 1..=25 {
            let tick = timer.tick();
            let expected = i % 10 == 0;
            assert_eq!(
                tick,
                TimerTick::Ticked {
                    needs_resync: expected
                },
                "tick {i}"
            );
        }
    }

    #[test]
    fn expiry_fires_exactly_once() {
        let mut timer = SectionTimer::new(2, false);
        assert_eq!(timer.tick(), TimerTick::Ticked { needs_resync: false });
        assert_eq!(timer.tick(), TimerTick::Expired);
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert!(!timer.running());
    }

    #[test]
    fn paused_timer_does_not_count() {
        let mut timer = SectionTimer::new(10, true);
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert_eq!(timer.remaining_seconds(), 10);
        assert!(!timer.running());
    }

    #[test]
    fn adopt_overwrites_local_prediction() {
        let mut timer = SectionTimer::new(100, false);
        for _ in 0..7 {
            timer.tick();
        }
        assert_eq!(timer.remaining_seconds(), 93);

        // Server says otherwise; local value is discarded, not averaged.
        timer.adopt(120, false);
        assert_eq!(timer.remaining_seconds(), 120);

        // Resync counter restarts from the adoption point.
        for i in 1..=9 {
            assert_eq!(
                timer.tick(),
                TimerTick::Ticked { needs_resync: false },
                "tick {i}"
            );
        }
        assert_eq!(timer.tick(), TimerTick::Ticked { needs_resync: true });
    }

    #[test]
    fn adopt_pause_state() {
        let mut timer = SectionTimer::new(60, false);
        timer.adopt(58, true);
        assert!(timer.is_paused());
        assert_eq!(timer.tick(), TimerTick::Idle);
        timer.adopt(58, false);
        assert!(timer.running());
    }

    #[test]
    fn zero_start_expires_without_going_negative() {
        // A recovered section with no time left still gets its one expiry.
        let mut timer = SectionTimer::new(0, false);
        assert_eq!(timer.tick(), TimerTick::Expired);
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert_eq!(timer.remaining_seconds(), 0);
    }
}
