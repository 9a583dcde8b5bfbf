//! Human-like timing jitter
//!
//! All state-changing actions are paced with randomized delays so runs look
//! like a person at a keyboard rather than a script. Ranges are half-open
//! `[lo, hi)` in milliseconds.

use rand::Rng;
use std::time::Duration;

/// Delay ranges for pacing, in milliseconds
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Before every state-changing action
    pub pre_action_ms: (u64, u64),
    /// Per typed character
    pub keystroke_ms: (u64, u64),
    /// Additional pause between characters
    pub inter_key_ms: (u64, u64),
}

impl Pacing {
    /// The standard human profile: 500-2000ms between actions, 50-200ms per
    /// keystroke, up to 100ms extra between keystrokes.
    pub fn human() -> Self {
        Self {
            pre_action_ms: (500, 2000),
            keystroke_ms: (50, 200),
            inter_key_ms: (0, 100),
        }
    }

    /// No delays at all. For tests.
    pub fn none() -> Self {
        Self {
            pre_action_ms: (0, 0),
            keystroke_ms: (0, 0),
            inter_key_ms: (0, 0),
        }
    }

    pub fn pre_action_delay(&self) -> Duration {
        sample(self.pre_action_ms)
    }

    pub fn keystroke_delay(&self) -> Duration {
        sample(self.keystroke_ms)
    }

    pub fn inter_key_pause(&self) -> Duration {
        sample(self.inter_key_ms)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::human()
    }
}

fn sample((lo, hi): (u64, u64)) -> Duration {
    let ms = if hi > lo {
        rand::thread_rng().gen_range(lo..hi)
    } else {
        lo
    };
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_action_delay_in_range() {
        let pacing = Pacing::human();
        for _ in 0..1000 {
            let ms = pacing.pre_action_delay().as_millis() as u64;
            assert!((500..2000).contains(&ms), "pre-action delay {ms} out of range");
        }
    }

    #[test]
    fn test_keystroke_delay_in_range() {
        let pacing = Pacing::human();
        for _ in 0..1000 {
            let ms = pacing.keystroke_delay().as_millis() as u64;
            assert!((50..200).contains(&ms), "keystroke delay {ms} out of range");
        }
    }

    #[test]
    fn test_inter_key_pause_in_range() {
        let pacing = Pacing::human();
        for _ in 0..1000 {
            let ms = pacing.inter_key_pause().as_millis() as u64;
            assert!(ms < 100, "inter-key pause {ms} out of range");
        }
    }

    #[test]
    fn test_none_profile_is_zero() {
        let pacing = Pacing::none();
        assert_eq!(pacing.pre_action_delay(), Duration::ZERO);
        assert_eq!(pacing.keystroke_delay(), Duration::ZERO);
        assert_eq!(pacing.inter_key_pause(), Duration::ZERO);
    }
}
