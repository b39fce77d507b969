use std::time::Duration;

/// Cadence of the reveal animation, one character per tick.
pub const TICK: Duration = Duration::from_millis(75);

/// Ticks the full caption stays on screen before the reveal restarts.
/// 13 x 75ms, standing in for a one second pause.
const HOLD_TICKS: u32 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Revealing { shown: usize },
    Holding { ticks_left: u32 },
}

/// Drives the "is thinking" caption: reveal one character per tick, hold the
/// full caption for a moment, then start over. Purely tick-driven, so the
/// animation is deterministic under test.
#[derive(Debug)]
pub struct TypingEffect {
    caption: String,
    phase: Phase,
}

impl TypingEffect {
    pub fn new(caption: String) -> Self {
        Self {
            caption,
            phase: Phase::Idle,
        }
    }

    /// Begins the animation. The first character becomes visible on the next
    /// tick, not immediately.
    pub fn start(&mut self) {
        self.phase = Phase::Revealing { shown: 0 };
    }

    /// Halts the animation. Safe to call repeatedly or while already idle.
    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Advances one tick and returns the caption prefix to display, or `None`
    /// when idle.
    pub fn tick(&mut self) -> Option<String> {
        let total = self.caption.chars().count();
        match self.phase {
            Phase::Idle => None,
            Phase::Revealing { shown } => {
                if shown < total {
                    let shown = shown + 1;
                    self.phase = Phase::Revealing { shown };
                    Some(self.prefix(shown))
                } else {
                    self.phase = Phase::Holding {
                        ticks_left: HOLD_TICKS,
                    };
                    Some(self.caption.clone())
                }
            }
            Phase::Holding { ticks_left } => {
                if ticks_left > 1 {
                    self.phase = Phase::Holding {
                        ticks_left: ticks_left - 1,
                    };
                } else {
                    self.phase = Phase::Revealing { shown: 0 };
                }
                Some(self.caption.clone())
            }
        }
    }

    fn prefix(&self, chars: usize) -> String {
        self.caption.chars().take(chars).collect()
    }
}
