//! Backend health state machine, as seen by one probe loop.
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: consecutive failures >= unhealthy_threshold
//! Unhealthy → Healthy: consecutive successes >= healthy_threshold
//! ```
//!
//! Counters reset on every transition and whenever the opposite outcome is
//! observed, so a single flap never accumulates.

/// A change the registry has to be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BecameHealthy,
    BecameUnhealthy,
}

/// Consecutive-outcome tracker for one backend.
#[derive(Debug, Clone)]
pub struct ProbeState {
    healthy: bool,
    consecutive_successes: u32,
    consecutive_failures: u32,
    healthy_threshold: u32,
    unhealthy_threshold: u32,
}

impl ProbeState {
    /// Start in the healthy state, matching the registry's initial state.
    pub fn new(healthy_threshold: u32, unhealthy_threshold: u32) -> Self {
        Self {
            healthy: true,
            consecutive_successes: 0,
            consecutive_failures: 0,
            healthy_threshold: healthy_threshold.max(1),
            unhealthy_threshold: unhealthy_threshold.max(1),
        }
    }

    #[cfg(test)]
    fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Record one probe result.
    pub fn observe(&mut self, success: bool) -> Option<Transition> {
        if success {
            self.mark_success()
        } else {
            self.mark_failure()
        }
    }

    fn mark_success(&mut self) -> Option<Transition> {
        self.consecutive_failures = 0;
        if self.healthy {
            return None;
        }

        self.consecutive_successes += 1;
        if self.consecutive_successes >= self.healthy_threshold {
            self.healthy = true;
            self.consecutive_successes = 0;
            return Some(Transition::BecameHealthy);
        }
        None
    }

    fn mark_failure(&mut self) -> Option<Transition> {
        self.consecutive_successes = 0;
        if !self.healthy {
            return None;
        }

        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.unhealthy_threshold {
            self.healthy = false;
            self.consecutive_failures = 0;
            return Some(Transition::BecameUnhealthy);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_on_first_observation_with_default_thresholds() {
        let mut state = ProbeState::new(1, 1);
        assert_eq!(state.observe(true), None);
        assert_eq!(state.observe(false), Some(Transition::BecameUnhealthy));
        assert_eq!(state.observe(false), None);
        assert_eq!(state.observe(true), Some(Transition::BecameHealthy));
        assert!(state.is_healthy());
    }

    #[test]
    fn thresholds_require_consecutive_outcomes() {
        let mut state = ProbeState::new(2, 3);

        assert_eq!(state.observe(false), None);
        assert_eq!(state.observe(false), None);
        assert_eq!(state.observe(true), None, "success resets the failure streak");
        assert_eq!(state.observe(false), None);
        assert_eq!(state.observe(false), None);
        assert_eq!(state.observe(false), Some(Transition::BecameUnhealthy));

        assert_eq!(state.observe(true), None);
        assert_eq!(state.observe(false), None, "failure resets the success streak");
        assert_eq!(state.observe(true), None);
        assert_eq!(state.observe(true), Some(Transition::BecameHealthy));
    }

    #[test]
    fn zero_thresholds_behave_like_one() {
        let mut state = ProbeState::new(0, 0);
        assert_eq!(state.observe(false), Some(Transition::BecameUnhealthy));
        assert_eq!(state.observe(true), Some(Transition::BecameHealthy));
    }
}
