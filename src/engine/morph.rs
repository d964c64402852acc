// Morph animator: eases the displayed morph factor between 0 (female-typical)
// and 1 (male-typical). One tween at most; toggling mid-flight restarts from
// the value currently on screen.

use std::time::Duration;

use super::tween::{Easing, Tween};
use crate::config::MorphConfig;

pub struct MorphAnimator {
    /// Last displayed value. Always in [0, 1].
    value: f32,
    /// Where the current or last tween is heading: 0.0 or 1.0.
    target: f32,
    tween: Option<Tween<f32>>,
    duration: Duration,
    easing: Easing,
}

impl MorphAnimator {
    pub fn new(duration: Duration, easing: Easing) -> Self {
        Self {
            value: 0.0,
            target: 0.0,
            tween: None,
            duration,
            easing,
        }
    }

    pub fn from_config(config: &MorphConfig) -> Self {
        Self::new(config.duration(), Easing::ease_out(config.ease_power))
    }

    /// Flip the target between 0 and 1 and start easing toward it from the
    /// value displayed at `now`. Returns the new target.
    pub fn toggle(&mut self, now: Duration) -> f32 {
        let current = self.value_at(now);
        self.target = if self.target >= 0.5 { 0.0 } else { 1.0 };
        self.value = current;
        self.tween = Some(Tween::new(current, self.target, now, self.duration, self.easing));
        self.target
    }

    /// Advance to `now` and return the morph factor to display.
    /// Drops the tween once it completes.
    pub fn tick(&mut self, now: Duration) -> f32 {
        if let Some(tween) = self.tween {
            self.value = tween.sample(now);
            if tween.is_finished(now) {
                self.tween = None;
            }
        }
        self.value
    }

    /// Jump to `value` with no animation.
    pub fn set_immediate(&mut self, value: f32) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        self.value = value;
        self.target = if value >= 0.5 { 1.0 } else { 0.0 };
        self.tween = None;
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    fn value_at(&self, now: Duration) -> f32 {
        self.tween.map_or(self.value, |t| t.sample(now))
    }
}
