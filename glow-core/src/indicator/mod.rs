//! Fault LED blink pattern.
//!
//! While the plugs are heating the LED is held on. Once heating ends it goes
//! dark, unless a channel is faulted: then it blinks `first_faulted + 1`
//! times, pauses, and repeats. A change of the reported channel restarts the
//! count.

use crate::config::BlinkConfig;
use crate::time::Millis;

/// Summary the indicator consumes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FaultStatus {
    first_faulted: Option<usize>,
}

impl FaultStatus {
    pub const CLEAR: Self = Self {
        first_faulted: None,
    };

    #[must_use]
    pub const fn new(first_faulted: Option<usize>) -> Self {
        Self { first_faulted }
    }

    #[must_use]
    pub const fn has_any_fault(&self) -> bool {
        self.first_faulted.is_some()
    }

    #[must_use]
    pub const fn first_faulted(&self) -> Option<usize> {
        self.first_faulted
    }

    /// Blinks per repetition: the one-based number of the reported channel.
    #[must_use]
    pub const fn blink_count(&self) -> Option<usize> {
        match self.first_faulted {
            Some(index) => Some(index + 1),
            None => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LedLevel {
    On,
    Off,
}

impl LedLevel {
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, LedLevel::On)
    }
}

/// Non-blocking blink sequencer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlinkPattern {
    config: BlinkConfig,
    indicated: Option<usize>,
    blinks_done: usize,
    led_on: bool,
    in_pause: bool,
    last_change: Millis,
}

impl BlinkPattern {
    #[must_use]
    pub const fn new(config: BlinkConfig) -> Self {
        Self {
            config,
            indicated: None,
            blinks_done: 0,
            led_on: false,
            in_pause: false,
            last_change: Millis::ZERO,
        }
    }

    /// Advances the pattern and returns the level the LED should show.
    pub fn update(&mut self, now: Millis, status: FaultStatus, heating: bool) -> LedLevel {
        if heating {
            self.reset(now);
            return LedLevel::On;
        }

        let Some(target) = status.blink_count() else {
            self.reset(now);
            return LedLevel::Off;
        };

        if self.indicated != status.first_faulted() {
            self.reset(now);
            self.indicated = status.first_faulted();
            return LedLevel::Off;
        }

        let elapsed = now.elapsed_since(self.last_change);
        if self.in_pause {
            if elapsed >= self.config.pause_ms {
                self.in_pause = false;
                self.blinks_done = 0;
                self.last_change = now;
            }
        } else if self.led_on {
            if elapsed >= self.config.on_ms {
                self.led_on = false;
                self.blinks_done += 1;
                self.last_change = now;
            }
        } else if elapsed >= self.config.off_ms {
            if self.blinks_done < target {
                self.led_on = true;
            } else {
                self.in_pause = true;
            }
            self.last_change = now;
        }

        if self.led_on { LedLevel::On } else { LedLevel::Off }
    }

    fn reset(&mut self, now: Millis) {
        self.indicated = None;
        self.blinks_done = 0;
        self.led_on = false;
        self.in_pause = false;
        self.last_change = now;
    }
}

impl Default for BlinkPattern {
    fn default() -> Self {
        Self::new(BlinkConfig::DEFAULT)
    }
}
