use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    InDigit { candidate: char, count: u32 },
}

/// Per-stream stability state machine.
///
/// A candidate is confirmed once it has been seen in `stability_blocks`
/// consecutive blocks, and only if it differs from the last confirmed digit.
/// The last confirmed digit is forgotten after `silence_blocks_to_clear`
/// consecutive silent blocks, which is what allows a repeated key to be
/// reported again.
#[derive(Debug, Clone)]
pub struct Debouncer {
    stability_blocks: u32,
    silence_blocks_to_clear: u32,
    state: DebounceState,
    last_emitted: Option<char>,
    silent_blocks: u32,
}

impl Debouncer {
    /// Both counts are clamped to at least one block.
    pub fn new(stability_blocks: u32, silence_blocks_to_clear: u32) -> Self {
        Self {
            stability_blocks: stability_blocks.max(1),
            silence_blocks_to_clear: silence_blocks_to_clear.max(1),
            state: DebounceState::Idle,
            last_emitted: None,
            silent_blocks: 0,
        }
    }

    /// Current state of the machine.
    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Last confirmed digit, until silence releases it.
    pub fn last_emitted(&self) -> Option<char> {
        self.last_emitted
    }

    /// Return to `Idle` and forget the last digit.
    pub fn reset(&mut self) {
        self.state = DebounceState::Idle;
        self.last_emitted = None;
        self.silent_blocks = 0;
    }

    /// Consume one block's classifier output; returns a digit when confirmed.
    pub fn feed(&mut self, detected: Option<char>) -> Option<char> {
        let Some(symbol) = detected else {
            self.state = DebounceState::Idle;
            self.silent_blocks = self.silent_blocks.saturating_add(1);
            if self.silent_blocks >= self.silence_blocks_to_clear && self.last_emitted.is_some() {
                debug!(silent_blocks = self.silent_blocks, "released last digit");
                self.last_emitted = None;
            }
            return None;
        };

        self.silent_blocks = 0;
        let count = match self.state {
            DebounceState::InDigit { candidate, count } if candidate == symbol => {
                count.saturating_add(1)
            }
            _ => 1,
        };
        self.state = DebounceState::InDigit {
            candidate: symbol,
            count,
        };

        if count >= self.stability_blocks && self.last_emitted != Some(symbol) {
            debug!(digit = %symbol, blocks = count, "confirmed digit");
            self.last_emitted = Some(symbol);
            return Some(symbol);
        }
        None
    }
}
