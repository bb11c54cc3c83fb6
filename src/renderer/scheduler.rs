/// Frame-rate limiter for repaints.
///
/// Requests are coalesced: any number of [`FrameScheduler::request`] calls between two
/// display callbacks produce at most one paint, and a paint only happens once the
/// minimum frame interval has elapsed since the previous one.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    min_interval: f64,
    last_paint: Option<f64>,
    pending: bool,
}

impl FrameScheduler {
    pub fn new(target_fps: f64) -> Self {
        let min_interval = if target_fps.is_finite() && target_fps > 0.0 {
            1.0 / target_fps
        } else {
            0.0
        };
        Self {
            min_interval,
            last_paint: None,
            pending: false,
        }
    }

    pub fn min_interval(&self) -> f64 {
        self.min_interval
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Marks the board dirty. Returns `true` when the host has to schedule a display
    /// callback, `false` when one is already scheduled.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    /// Called from the display callback at time `now` (seconds). Returns whether to
    /// paint; a throttled request stays pending for the next callback.
    pub fn on_frame(&mut self, now: f64) -> bool {
        if !self.pending {
            return false;
        }
        if let Some(last) = self.last_paint {
            if now - last < self.min_interval {
                return false;
            }
        }
        self.pending = false;
        self.last_paint = Some(now);
        true
    }

    /// Records an out-of-band paint at `now` that bypassed throttling.
    pub fn forced(&mut self, now: f64) {
        self.pending = false;
        self.last_paint = Some(now);
    }

    /// Seconds until a pending request may paint, or `None` when nothing is pending.
    pub fn time_until_next(&self, now: f64) -> Option<f64> {
        if !self.pending {
            return None;
        }
        let wait = match self.last_paint {
            Some(last) => self.min_interval - (now - last),
            None => 0.0,
        };
        Some(wait.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_coalesce() {
        let mut scheduler = FrameScheduler::new(30.0);
        assert!(scheduler.request());
        assert!(!scheduler.request());
        assert!(scheduler.on_frame(0.0));
        assert!(!scheduler.on_frame(1.0));
    }

    #[test]
    fn test_throttles_to_target_rate() {
        let mut scheduler = FrameScheduler::new(30.0);
        scheduler.request();
        assert!(scheduler.on_frame(1.0));

        scheduler.request();
        assert!(!scheduler.on_frame(1.01));
        assert!(scheduler.is_pending());
        assert!(scheduler.time_until_next(1.01).unwrap() > 0.0);
        assert!(scheduler.on_frame(1.04));
    }

    #[test]
    fn test_forced_paint_clears_pending() {
        let mut scheduler = FrameScheduler::new(30.0);
        scheduler.request();
        scheduler.forced(2.0);
        assert!(!scheduler.is_pending());
        scheduler.request();
        assert!(!scheduler.on_frame(2.01));
    }
}
