/// Why a pass was dropped for one frame.
///
/// Skips are transient: the next frame tries again from scratch.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SkipReason {
    /// The trail and frame counter buffers were released.
    MissingTrailBuffer,
    /// No color target was supplied for the render pass.
    MissingPassTarget,
}

/// Result of one compute or render pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassOutcome {
    /// Commands were submitted to the queue; `seq` is the renderer's submission
    /// sequence number (1-based, strictly increasing).
    Submitted { seq: u64 },
    Skipped(SkipReason),
}

impl PassOutcome {
    pub fn is_submitted(self) -> bool {
        matches!(self, PassOutcome::Submitted { .. })
    }

    pub fn seq(self) -> Option<u64> {
        match self {
            PassOutcome::Submitted { seq } => Some(seq),
            PassOutcome::Skipped(_) => None,
        }
    }
}

/// What happened during one draw callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameReport {
    /// Frame counter value after the compute pass.
    pub frame: u32,
    pub compute: PassOutcome,
    pub render: PassOutcome,
    /// A drawable was handed back for presentation.
    pub presented: bool,
}

impl FrameReport {
    /// Compute was queued ahead of render (vacuously true when either was skipped).
    pub fn is_ordered(&self) -> bool {
        match (self.compute.seq(), self.render.seq()) {
            (Some(c), Some(r)) => c < r,
            _ => true,
        }
    }
}

/// Cumulative pass counts for a renderer's lifetime.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct FrameStats {
    pub compute_passes: u64,
    pub compute_skipped: u64,
    pub frames_drawn: u64,
    pub frames_skipped: u64,
    pub submissions: u64,
    pub presents: u64,
}

impl FrameStats {
    pub fn record_compute(&mut self, outcome: PassOutcome) {
        if outcome.is_submitted() {
            self.compute_passes += 1;
            self.submissions += 1;
        } else {
            self.compute_skipped += 1;
        }
    }

    pub fn record_render(&mut self, outcome: PassOutcome, presented: bool) {
        if outcome.is_submitted() {
            self.frames_drawn += 1;
            self.submissions += 1;
        } else {
            self.frames_skipped += 1;
        }
        if presented {
            self.presents += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIP_TRAIL: PassOutcome = PassOutcome::Skipped(SkipReason::MissingTrailBuffer);

    #[test]
    fn outcome_accessors() {
        assert_eq!(PassOutcome::Submitted { seq: 3 }.seq(), Some(3));
        assert!(PassOutcome::Submitted { seq: 3 }.is_submitted());
        assert_eq!(SKIP_TRAIL.seq(), None);
        assert!(!SKIP_TRAIL.is_submitted());
    }

    #[test]
    fn report_ordering() {
        let mut report = FrameReport {
            frame: 1,
            compute: PassOutcome::Submitted { seq: 1 },
            render: PassOutcome::Submitted { seq: 2 },
            presented: true,
        };
        assert!(report.is_ordered());

        report.render = PassOutcome::Submitted { seq: 1 };
        report.compute = PassOutcome::Submitted { seq: 2 };
        assert!(!report.is_ordered());

        report.render = PassOutcome::Skipped(SkipReason::MissingPassTarget);
        assert!(report.is_ordered());
    }

    #[test]
    fn stats_count_submissions_and_skips() {
        let mut stats = FrameStats::default();

        stats.record_compute(PassOutcome::Submitted { seq: 1 });
        stats.record_render(PassOutcome::Submitted { seq: 2 }, true);
        stats.record_compute(SKIP_TRAIL);
        stats.record_render(SKIP_TRAIL, false);

        assert_eq!(
            stats,
            FrameStats {
                compute_passes: 1,
                compute_skipped: 1,
                frames_drawn: 1,
                frames_skipped: 1,
                submissions: 2,
                presents: 1,
            }
        );
    }
}
