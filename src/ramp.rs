/// Rate limiter for the wireless input current.
///
/// Each [`advance`](WirelessRamp::advance) moves the programmed current towards the
/// target by at most one step. Retargeting keeps the current position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct WirelessRamp {
    target: u32,
    current: u32,
}

impl WirelessRamp {
    /// A settled ramp sitting at `start` mA.
    pub const fn new(start: u32) -> Self {
        WirelessRamp { target: start, current: start }
    }

    /// Current the ramp is heading for.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Current most recently programmed.
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Whether the target has been reached.
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Head for a new target from wherever the ramp is now.
    pub fn retarget(&mut self, target: u32) {
        self.target = target;
    }

    /// Restart from a measured `current` towards `target`.
    pub fn restart(&mut self, current: u32, target: u32) {
        self.current = current;
        self.target = target;
    }

    /// Park the ramp at `start` with nothing left to do.
    pub fn reset(&mut self, start: u32) {
        *self = WirelessRamp::new(start);
    }

    /// Take one step of at most `step` mA.
    ///
    /// Returns the new current to program, or `None` once the target has been reached.
    pub fn advance(&mut self, step: u32) -> Option<u32> {
        if self.is_settled() {
            return None;
        }
        let step = step.max(1);
        self.current = if self.target > self.current {
            self.current.saturating_add(step).min(self.target)
        } else {
            self.current.saturating_sub(step).max(self.target)
        };
        Some(self.current)
    }
}
