//! Per-command state for one parse pass

/// Where a command is in the current parse pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePhase {
    #[default]
    Uninitialized,
    Parsing,
    /// Waiting on deferred values scheduled by the resolver
    Awaiting,
    Complete,
}

/// Mode and latch for one parse pass
#[derive(Debug, Clone, Default)]
pub struct ParseState {
    async_mode: bool,
    resolved: bool,
    phase: ParsePhase,
}

impl ParseState {
    /// Fresh state for a parse pass started by the sync or async entry point
    pub fn begin(async_mode: bool) -> Self {
        ParseState {
            async_mode,
            resolved: false,
            phase: ParsePhase::Parsing,
        }
    }

    pub fn async_mode(&self) -> bool {
        self.async_mode
    }

    pub fn resolved(&self) -> bool {
        self.resolved
    }

    pub fn phase(&self) -> ParsePhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: ParsePhase) {
        self.phase = phase;
    }

    /// Close the latch. Returns false when resolution must not run: sync
    /// mode, or already resolved in this pass.
    pub(crate) fn try_claim_resolution(&mut self) -> bool {
        if !self.async_mode || self.resolved {
            return false;
        }
        self.resolved = true;
        true
    }
}
