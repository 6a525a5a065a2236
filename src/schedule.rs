/// Deferred work the controller can schedule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Work {
    /// AICL backoff loop.
    Aicl,
    /// One wireless ramp tick.
    WirelessRamp,
    /// AFC detect timeout.
    AfcDetect,
    /// Wireless pad presence re-check.
    WirelessPadDetect,
    /// CHGIN debounce and health re-evaluation.
    ChgInDebounce,
    /// Charger interrupt follow-up.
    ChargerIrq,
    /// Unmask the CHGIN interrupt after startup.
    EnableChgInIrq,
    /// Periodic watchdog kick.
    Watchdog,
}

impl Work {
    /// Number of work kinds.
    pub const COUNT: usize = 8;

    const ALL: [Work; Self::COUNT] = [
        Work::Aicl,
        Work::WirelessRamp,
        Work::AfcDetect,
        Work::WirelessPadDetect,
        Work::ChgInDebounce,
        Work::ChargerIrq,
        Work::EnableChgInIrq,
        Work::Watchdog,
    ];
}

/// One pending deadline per [`Work`] kind.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Scheduler {
    due: [Option<u64>; Work::COUNT],
}

impl Scheduler {
    /// Run `work` at `at_ms`, replacing any pending deadline.
    pub fn schedule(&mut self, work: Work, at_ms: u64) {
        self.due[work as usize] = Some(at_ms);
    }

    /// Run `work` at `at_ms` unless it is already pending.
    ///
    /// Returns `false` when an earlier schedule was kept.
    pub fn schedule_if_idle(&mut self, work: Work, at_ms: u64) -> bool {
        if self.is_pending(work) {
            return false;
        }
        self.schedule(work, at_ms);
        true
    }

    /// Drop the pending deadline for `work`. No-op when nothing is pending.
    pub fn cancel(&mut self, work: Work) -> bool {
        self.due[work as usize].take().is_some()
    }

    /// Drop every pending deadline.
    pub fn cancel_all(&mut self) {
        self.due = [None; Work::COUNT];
    }

    /// Whether `work` has a pending deadline.
    pub fn is_pending(&self, work: Work) -> bool {
        self.due[work as usize].is_some()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<u64> {
        self.due.iter().flatten().min().copied()
    }

    /// Remove and return the work with the earliest deadline at or before `now_ms`.
    ///
    /// Equal deadlines come out in [`Work`] declaration order.
    pub fn take_due(&mut self, now_ms: u64) -> Option<Work> {
        let mut best: Option<(Work, u64)> = None;
        for work in Work::ALL {
            if let Some(at) = self.due[work as usize] {
                if at <= now_ms && best.map_or(true, |(_, b)| at < b) {
                    best = Some((work, at));
                }
            }
        }
        let (work, _) = best?;
        self.due[work as usize] = None;
        Some(work)
    }
}
