use std::time::Duration;

/// Resource limits for one discovery run. Everything defaults to unbounded;
/// limits are enforced cooperatively at batch boundaries.
#[derive(Clone, Debug, Default)]
pub struct Budget {
    max_expansions: Option<usize>,
    max_discoveries: Option<usize>,
    max_seconds: Option<f64>,
}

impl Budget {
    pub fn unbounded() -> Self {
        Budget::default()
    }

    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = Some(max_expansions);
        self
    }

    pub fn with_max_discoveries(mut self, max_discoveries: usize) -> Self {
        self.max_discoveries = Some(max_discoveries);
        self
    }

    pub fn with_max_seconds(mut self, max_seconds: f64) -> Self {
        self.max_seconds = Some(max_seconds);
        self
    }

    pub fn max_discoveries(&self) -> Option<usize> {
        self.max_discoveries
    }

    /// Checks every limit; the first one hit wins.
    pub(crate) fn check(
        &self,
        expansions: usize,
        discoveries: usize,
        elapsed: Duration,
    ) -> Option<StopReason> {
        if let Some(cap) = self.max_expansions {
            if expansions >= cap {
                return Some(StopReason::Expansions);
            }
        }
        if self.discoveries_reached(discoveries) {
            return Some(StopReason::Discoveries);
        }
        if let Some(cap) = self.max_seconds {
            if elapsed.as_secs_f64() >= cap {
                return Some(StopReason::TimedOut);
            }
        }
        None
    }

    pub(crate) fn discoveries_reached(&self, discoveries: usize) -> bool {
        self.max_discoveries.is_some_and(|cap| discoveries >= cap)
    }
}

/// Why a discovery run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The worklist emptied.
    Exhausted,
    Expansions,
    Discoveries,
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_stops() {
        let budget = Budget::unbounded();
        assert_eq!(
            budget.check(usize::MAX - 1, 1000, Duration::from_secs(3600)),
            None
        );
    }

    #[test]
    fn limits_trip_in_order() {
        let budget = Budget::unbounded()
            .with_max_expansions(10)
            .with_max_discoveries(3)
            .with_max_seconds(1.0);

        assert_eq!(budget.check(0, 0, Duration::ZERO), None);
        assert_eq!(
            budget.check(10, 0, Duration::ZERO),
            Some(StopReason::Expansions)
        );
        assert_eq!(
            budget.check(0, 3, Duration::ZERO),
            Some(StopReason::Discoveries)
        );
        assert_eq!(
            budget.check(0, 0, Duration::from_secs(2)),
            Some(StopReason::TimedOut)
        );
    }

    #[test]
    fn zero_discovery_budget_stops_immediately() {
        let budget = Budget::unbounded().with_max_discoveries(0);
        assert_eq!(
            budget.check(0, 0, Duration::ZERO),
            Some(StopReason::Discoveries)
        );
    }
}
