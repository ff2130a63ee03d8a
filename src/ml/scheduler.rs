// ============================================================
// Layer 5 — Learning-rate Schedules
// ============================================================
// A schedule is advanced once per optimizer step, never per
// batch, so gradient accumulation stretches it correctly.
//
//   linear_warmup:
//     lr(t) = base · t / warmup                       t < warmup
//     lr(t) = base · max(0, (total − t) / (total − warmup))   otherwise

use burn::LearningRate;

use crate::domain::methods::SchedulerKind;

pub trait LrSchedule: Send {
    /// Learning rate for the next optimizer step
    fn lr(&self) -> LearningRate;

    /// Advance by one optimizer step
    fn step(&mut self);
}

#[derive(Debug, Clone)]
pub struct WarmupLinearSchedule {
    base_lr: LearningRate,
    warmup_steps: usize,
    total_steps: usize,
    current: usize,
}

impl WarmupLinearSchedule {
    pub fn new(base_lr: LearningRate, warmup_steps: usize, total_steps: usize) -> Self {
        Self { base_lr, warmup_steps, total_steps, current: 0 }
    }
}

impl LrSchedule for WarmupLinearSchedule {
    fn lr(&self) -> LearningRate {
        let t = self.current as f64;
        if self.current < self.warmup_steps {
            return self.base_lr * t / self.warmup_steps.max(1) as f64;
        }
        let remaining = self.total_steps.saturating_sub(self.current) as f64;
        let span = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.base_lr * (remaining / span).max(0.0)
    }

    fn step(&mut self) {
        self.current += 1;
    }
}

/// `None` means the optimizer always runs at the base rate.
pub fn build_schedule(
    kind: SchedulerKind,
    base_lr: LearningRate,
    warmup_steps: usize,
    total_steps: usize,
) -> Option<Box<dyn LrSchedule>> {
    match kind {
        SchedulerKind::LinearWarmup => {
            tracing::info!(
                "Linear warmup schedule: {} warmup steps, {} optimizer steps in total",
                warmup_steps,
                total_steps
            );
            Some(Box::new(WarmupLinearSchedule::new(base_lr, warmup_steps, total_steps)))
        }
        SchedulerKind::Constant => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_warmup_then_linear_decay() {
        let mut s = WarmupLinearSchedule::new(1e-3, 10, 110);
        assert!(close(s.lr(), 0.0));

        for _ in 0..5 {
            s.step();
        }
        assert!(close(s.lr(), 5e-4));

        for _ in 0..5 {
            s.step();
        }
        assert!(close(s.lr(), 1e-3));

        for _ in 0..50 {
            s.step();
        }
        assert!(close(s.lr(), 5e-4));

        for _ in 0..100 {
            s.step();
        }
        assert!(close(s.lr(), 0.0));
    }

    #[test]
    fn test_zero_warmup_starts_at_base_rate() {
        let s = WarmupLinearSchedule::new(2e-5, 0, 100);
        assert!(close(s.lr(), 2e-5));
    }

    #[test]
    fn test_constant_kind_has_no_schedule() {
        assert!(build_schedule(SchedulerKind::Constant, 1e-3, 10, 100).is_none());
        assert!(build_schedule(SchedulerKind::LinearWarmup, 1e-3, 10, 100).is_some());
    }
}
