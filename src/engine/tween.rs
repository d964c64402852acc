// Time-based tweens shared by the morph animator and the camera controller.
// Progress comes from elapsed wall-clock time, never from frame counts, so
// animation speed does not depend on the display refresh rate.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    OutCubic,
    OutQuart,
    InOutCubic,
}

impl Easing {
    /// Ease-out curve `1 - (1 - t)^power` for power 3 or 4.
    pub fn ease_out(power: u32) -> Self {
        match power {
            3 => Easing::OutCubic,
            _ => Easing::OutQuart,
        }
    }

    /// Map linear progress in [0, 1] to eased progress in [0, 1].
    pub fn apply(self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => t,
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::OutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Values a tween can interpolate.
pub trait Lerp: Copy {
    fn lerp(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tween<T> {
    pub start_value: T,
    pub end_value: T,
    pub start_time: Duration,
    pub duration: Duration,
    pub easing: Easing,
}

impl<T: Lerp> Tween<T> {
    pub fn new(start_value: T, end_value: T, start_time: Duration, duration: Duration, easing: Easing) -> Self {
        Self { start_value, end_value, start_time, duration, easing }
    }

    /// Linear progress in [0, 1]. A zero duration is immediately complete.
    pub fn progress(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start_time);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0) as f32
    }

    /// Value at `now`. Returns `end_value` exactly once progress reaches 1.
    pub fn sample(&self, now: Duration) -> T {
        let p = self.progress(now);
        if p >= 1.0 {
            return self.end_value;
        }
        self.start_value.lerp(self.end_value, self.easing.apply(p))
    }

    pub fn is_finished(&self, now: Duration) -> bool {
        self.progress(now) >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ALL: [Easing; 4] = [Easing::Linear, Easing::OutCubic, Easing::OutQuart, Easing::InOutCubic];

    #[test]
    fn easing_endpoints() {
        for easing in ALL {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?}");
            assert_eq!(easing.apply(1.0), 1.0, "{easing:?}");
        }
        assert_eq!(Easing::OutQuart.apply(f32::NAN), 0.0);
        assert_eq!(Easing::OutCubic.apply(2.0), 1.0);
    }

    #[test]
    fn easing_is_monotonic() {
        for easing in ALL {
            let mut prev = 0.0;
            for i in 0..=1000 {
                let v = easing.apply(i as f32 / 1000.0);
                assert!(v >= prev, "{easing:?} decreased at step {i}");
                prev = v;
            }
        }
    }

    #[test]
    fn ease_out_decelerates() {
        let early = Easing::OutQuart.apply(0.1) - Easing::OutQuart.apply(0.0);
        let late = Easing::OutQuart.apply(1.0) - Easing::OutQuart.apply(0.9);
        assert!(early > late);
        assert_relative_eq!(Easing::OutCubic.apply(0.5), 0.875);
    }

    #[test]
    fn tween_uses_wall_clock() {
        let start = Duration::from_millis(500);
        let tween = Tween::new(2.0_f32, 4.0, start, Duration::from_secs(2), Easing::Linear);
        assert_eq!(tween.sample(start), 2.0);
        assert_relative_eq!(tween.sample(start + Duration::from_secs(1)), 3.0);
        assert_eq!(tween.sample(start + Duration::from_secs(2)), 4.0);
        assert_eq!(tween.sample(start + Duration::from_secs(60)), 4.0);
        // Before the start time the tween holds its start value.
        assert_eq!(tween.sample(Duration::ZERO), 2.0);
        assert!(!tween.is_finished(start + Duration::from_millis(1999)));
        assert!(tween.is_finished(start + Duration::from_secs(2)));
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let tween = Tween::new(0.0_f32, 1.0, Duration::from_secs(3), Duration::ZERO, Easing::OutQuart);
        assert_eq!(tween.sample(Duration::from_secs(3)), 1.0);
        assert!(tween.is_finished(Duration::ZERO));
    }
}
