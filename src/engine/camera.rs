// Orbit camera around the mandible at the origin
//
// Camera model:
//   - Eye on a sphere about the origin, parameterized by pitch, yaw and distance
//   - Drag rotates (yaw += dx, pitch -= dy), wheel and buttons zoom
//   - Auto-rotate advances yaw by a fixed step per frame when idle
//   - Feature selection flies to a framing: 10% of the remaining gap per frame
//   - Reset and intro run a timed ease-in-out tween
//
// Priority each frame: drag > tween > fly-to > auto-rotate.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::time::Duration;

use glam::{Mat4, Vec2, Vec3};

use super::catalog::Framing;
use super::input::PointerEvent;
use super::tween::{Easing, Lerp, Tween};
use crate::config::CameraConfig;

/// Rendered pitch stays this far from the poles so look_at keeps a valid up vector.
const POLE_MARGIN: f32 = 1e-4;

/// Wrap an angle to (-PI, PI].
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    if angle > -PI && angle <= PI {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub pitch: f32,
    pub yaw: f32,
    pub distance: f32,
}

impl Lerp for CameraPose {
    /// Yaw takes the short way round.
    fn lerp(self, other: Self, t: f32) -> Self {
        CameraPose {
            pitch: self.pitch.lerp(other.pitch, t),
            yaw: self.yaw + wrap_angle(other.yaw - self.yaw) * t,
            distance: self.distance.lerp(other.distance, t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { last: Vec2 },
}

/// Per-frame camera output consumed by the renderer and the overlay.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    pub eye: Vec3,
    pub target: Vec3,
    pub view_proj: Mat4,
}

pub struct OrbitCamera {
    /// Private: always clamped to [-PI/2, PI/2]. Use pitch() to read.
    pitch: f32,
    /// Private: kept wrapped to (-PI, PI]. Use yaw() to read.
    yaw: f32,
    /// Private: always clamped to [min_distance, max_distance]. Use distance() to read.
    distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Radians per dragged pixel
    pub sensitivity: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
    /// Distance change per zoom button press
    pub zoom_step: f32,

    pub auto_rotate: bool,
    /// Radians of yaw per frame
    pub auto_rotate_speed: f32,

    /// Fraction of the remaining gap covered per frame while flying to a target
    pub fly_rate: f32,
    pub fly_epsilon: f32,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    home: CameraPose,
    reset_duration: Duration,
    intro_duration: Duration,

    drag: DragState,
    target: Option<CameraPose>,
    tween: Option<Tween<CameraPose>>,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::from_config(&CameraConfig::default())
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self {
            pitch: 0.0,
            yaw: 0.0,
            distance: config.home_distance,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            sensitivity: config.sensitivity,
            zoom_in_factor: config.zoom_in_factor,
            zoom_out_factor: config.zoom_out_factor,
            zoom_step: config.zoom_step,
            auto_rotate: config.auto_rotate,
            auto_rotate_speed: config.auto_rotate_speed,
            fly_rate: config.fly_rate,
            fly_epsilon: config.fly_epsilon,
            fov: config.fov_degrees.to_radians(),
            near: 0.1,
            far: 100.0,
            home: CameraPose {
                pitch: config.home_pitch,
                yaw: config.home_yaw,
                distance: config.home_distance,
            },
            reset_duration: config.reset_duration(),
            intro_duration: config.intro_duration(),
            drag: DragState::Idle,
            target: None,
            tween: None,
        };
        camera.home = camera.clamped(camera.home);
        camera.set_pose(camera.home);
        camera
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { x, y } => {
                self.cancel_transitions();
                self.drag = DragState::Dragging { last: Vec2::new(x, y) };
            }
            PointerEvent::Move { x, y } => {
                if let DragState::Dragging { last } = self.drag {
                    let pos = Vec2::new(x, y);
                    let delta = pos - last;
                    self.rotate(delta.x * self.sensitivity, -delta.y * self.sensitivity);
                    self.drag = DragState::Dragging { last: pos };
                }
            }
            PointerEvent::Up => {
                self.drag = DragState::Idle;
            }
            PointerEvent::Wheel { lines } => self.zoom_wheel(lines),
        }
    }

    /// One wheel event applies one zoom factor. Positive lines zoom in.
    pub fn zoom_wheel(&mut self, lines: f32) {
        if lines.is_nan() || lines == 0.0 {
            return;
        }
        self.cancel_transitions();
        let factor = if lines > 0.0 { self.zoom_in_factor } else { self.zoom_out_factor };
        self.set_distance(self.distance * factor);
    }

    pub fn zoom_in(&mut self) {
        self.cancel_transitions();
        self.set_distance(self.distance - self.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.cancel_transitions();
        self.set_distance(self.distance + self.zoom_step);
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Fly toward a feature framing. Cancels any timed tween.
    pub fn fly_to(&mut self, framing: &Framing) {
        self.tween = None;
        self.target = Some(self.clamped(CameraPose {
            pitch: framing.pitch,
            yaw: framing.yaw,
            distance: framing.distance,
        }));
    }

    /// Tween back to the home view.
    pub fn reset(&mut self, now: Duration) {
        self.target = None;
        self.tween = Some(Tween::new(self.pose(), self.home, now, self.reset_duration, Easing::InOutCubic));
    }

    /// Start fully zoomed out and tween into the home view.
    pub fn intro(&mut self, now: Duration) {
        self.target = None;
        let start = CameraPose { distance: self.max_distance, ..self.home };
        self.set_pose(start);
        self.tween = Some(Tween::new(start, self.home, now, self.intro_duration, Easing::InOutCubic));
    }

    pub fn cancel_transitions(&mut self) {
        self.target = None;
        self.tween = None;
    }

    /// Advance one frame. Call once per frame before rendering.
    pub fn update(&mut self, now: Duration) {
        if self.is_dragging() {
            return;
        }

        if let Some(tween) = self.tween {
            self.set_pose(tween.sample(now));
            if tween.is_finished(now) {
                self.tween = None;
            }
            return;
        }

        if let Some(target) = self.target {
            let current = self.pose();
            let dp = target.pitch - current.pitch;
            let dy = wrap_angle(target.yaw - current.yaw);
            let dd = target.distance - current.distance;
            if dp.abs() < self.fly_epsilon && dy.abs() < self.fly_epsilon && dd.abs() < self.fly_epsilon {
                self.set_pose(target);
                self.target = None;
            } else {
                self.set_pose(CameraPose {
                    pitch: current.pitch + dp * self.fly_rate,
                    yaw: current.yaw + dy * self.fly_rate,
                    distance: current.distance + dd * self.fly_rate,
                });
            }
            return;
        }

        if self.auto_rotate {
            self.yaw = wrap_angle(self.yaw + self.auto_rotate_speed);
        }
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    /// World-space position of the camera eye. Always derived from the angles.
    pub fn eye(&self) -> Vec3 {
        let pitch = self.pitch.clamp(-FRAC_PI_2 + POLE_MARGIN, FRAC_PI_2 - POLE_MARGIN);
        Vec3::new(
            self.yaw.cos() * pitch.cos() * self.distance,
            pitch.sin() * self.distance,
            self.yaw.sin() * pitch.cos() * self.distance,
        )
    }

    /// View matrix: looks from the eye toward the origin.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    /// Perspective projection matrix.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect.max(1e-3), self.near, self.far)
    }

    pub fn frame(&self, aspect: f32) -> CameraFrame {
        CameraFrame {
            eye: self.eye(),
            target: Vec3::ZERO,
            view_proj: self.projection_matrix(aspect) * self.view_matrix(),
        }
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose { pitch: self.pitch, yaw: self.yaw, distance: self.distance }
    }

    pub fn pitch(&self) -> f32 { self.pitch }
    pub fn yaw(&self) -> f32 { self.yaw }
    pub fn distance(&self) -> f32 { self.distance }
    pub fn home(&self) -> CameraPose { self.home }
    pub fn target(&self) -> Option<CameraPose> { self.target }
    pub fn is_dragging(&self) -> bool { matches!(self.drag, DragState::Dragging { .. }) }
    pub fn is_tweening(&self) -> bool { self.tween.is_some() }

    /// Zoom fraction in [0, 1]: 1 = fully zoomed in (min_distance), 0 = fully zoomed out.
    pub fn zoom_fraction(&self) -> f32 {
        let range = self.max_distance - self.min_distance;
        if range > 0.0 {
            1.0 - (self.distance - self.min_distance) / range
        } else {
            0.0
        }
    }

    // ------------------------------------------------------------------------

    fn rotate(&mut self, dyaw: f32, dpitch: f32) {
        self.yaw = wrap_angle(self.yaw + dyaw);
        self.set_pitch(self.pitch + dpitch);
    }

    fn set_pitch(&mut self, pitch: f32) {
        if !pitch.is_nan() {
            self.pitch = pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
        }
    }

    fn set_distance(&mut self, distance: f32) {
        if !distance.is_nan() {
            self.distance = distance.clamp(self.min_distance, self.max_distance);
        }
    }

    fn set_pose(&mut self, pose: CameraPose) {
        self.set_pitch(pose.pitch);
        self.yaw = wrap_angle(pose.yaw);
        self.set_distance(pose.distance);
    }

    fn clamped(&self, pose: CameraPose) -> CameraPose {
        let sanitize = |v: f32| if v.is_nan() { 0.0 } else { v };
        CameraPose {
            pitch: sanitize(pose.pitch).clamp(-FRAC_PI_2, FRAC_PI_2),
            yaw: wrap_angle(pose.yaw),
            distance: if pose.distance.is_nan() {
                self.min_distance
            } else {
                pose.distance.clamp(self.min_distance, self.max_distance)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn framing(distance: f32, pitch: f32, yaw: f32) -> Framing {
        Framing { distance, pitch, yaw }
    }

    #[test]
    fn random_drags_keep_pitch_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut cam = OrbitCamera::new();
        for _ in 0..200 {
            cam.handle_pointer(PointerEvent::Down { x: rng.gen_range(0.0..800.0), y: rng.gen_range(0.0..600.0) });
            for _ in 0..20 {
                cam.handle_pointer(PointerEvent::Move {
                    x: rng.gen_range(-5_000.0..5_000.0),
                    y: rng.gen_range(-5_000.0..5_000.0),
                });
                assert!(cam.pitch() >= -FRAC_PI_2 && cam.pitch() <= FRAC_PI_2);
                assert!(cam.eye().is_finite());
            }
            cam.handle_pointer(PointerEvent::Up);
        }
    }

    #[test]
    fn random_wheels_keep_distance_in_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut cam = OrbitCamera::new();
        for _ in 0..2_000 {
            let lines = rng.gen_range(-3.0..3.0);
            cam.handle_pointer(PointerEvent::Wheel { lines });
            if rng.gen_bool(0.1) {
                if rng.gen_bool(0.5) { cam.zoom_in() } else { cam.zoom_out() }
            }
            assert!(cam.distance() >= cam.min_distance && cam.distance() <= cam.max_distance);
        }
    }

    #[test]
    fn ten_wheel_steps_in() {
        let mut cam = OrbitCamera::new();
        assert_eq!(cam.distance(), 5.5);
        for _ in 0..10 {
            cam.zoom_wheel(1.0);
        }
        let expected = (5.5_f32 * 0.92_f32.powi(10)).max(cam.min_distance);
        assert_relative_eq!(cam.distance(), expected, epsilon = 1e-4);

        for _ in 0..100 {
            cam.zoom_wheel(1.0);
        }
        assert_eq!(cam.distance(), cam.min_distance);
    }

    #[test]
    fn drag_maps_pixels_to_angles() {
        let mut cam = OrbitCamera::new();
        let (yaw0, pitch0) = (cam.yaw(), cam.pitch());
        cam.handle_pointer(PointerEvent::Down { x: 100.0, y: 100.0 });
        cam.handle_pointer(PointerEvent::Move { x: 110.0, y: 105.0 });
        assert_relative_eq!(cam.yaw(), yaw0 + 10.0 * 0.008, epsilon = 1e-5);
        assert_relative_eq!(cam.pitch(), pitch0 - 5.0 * 0.008, epsilon = 1e-5);
        cam.handle_pointer(PointerEvent::Up);
        // Moves after release do nothing.
        cam.handle_pointer(PointerEvent::Move { x: 500.0, y: 500.0 });
        assert_relative_eq!(cam.yaw(), yaw0 + 10.0 * 0.008, epsilon = 1e-5);
    }

    #[test]
    fn fly_to_converges_and_clears() {
        let mut cam = OrbitCamera::new();
        cam.fly_to(&framing(3.0, -0.2, PI));
        let mut frames = 0;
        while cam.target().is_some() {
            cam.update(Duration::ZERO);
            frames += 1;
            assert!(frames < 500, "fly-to never settled");
        }
        assert_relative_eq!(cam.distance(), 3.0);
        assert_relative_eq!(cam.pitch(), -0.2);
        assert_relative_eq!(wrap_angle(cam.yaw() - PI), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn fly_to_takes_the_short_way_round() {
        let mut cam = OrbitCamera::new();
        // Yaw just below PI; target just above -PI is a tiny step across the seam.
        cam.fly_to(&framing(5.5, 0.0, PI - 0.05));
        while cam.target().is_some() {
            cam.update(Duration::ZERO);
        }
        cam.fly_to(&framing(5.5, 0.0, -PI + 0.05));
        cam.update(Duration::ZERO);
        let moved = wrap_angle(cam.yaw() - (PI - 0.05)).abs();
        assert!(moved < 0.02, "took the long way: {moved}");
    }

    #[test]
    fn drag_cancels_transitions_and_suppresses_motion() {
        let mut cam = OrbitCamera::new();
        cam.fly_to(&framing(3.0, 0.4, 0.0));
        cam.handle_pointer(PointerEvent::Down { x: 0.0, y: 0.0 });
        assert!(cam.target().is_none());
        let yaw = cam.yaw();
        cam.update(Duration::ZERO);
        assert_eq!(cam.yaw(), yaw, "auto-rotate ran while dragging");

        cam.handle_pointer(PointerEvent::Up);
        cam.reset(Duration::ZERO);
        assert!(cam.is_tweening());
        cam.zoom_wheel(-1.0);
        assert!(!cam.is_tweening());
    }

    #[test]
    fn auto_rotate_only_when_idle() {
        let mut cam = OrbitCamera::new();
        let yaw = cam.yaw();
        cam.update(Duration::ZERO);
        assert_relative_eq!(cam.yaw(), yaw + 0.003, epsilon = 1e-6);

        cam.auto_rotate = false;
        let yaw = cam.yaw();
        cam.update(Duration::ZERO);
        assert_eq!(cam.yaw(), yaw);
    }

    #[test]
    fn reset_tween_lands_on_home() {
        let mut cam = OrbitCamera::new();
        cam.handle_pointer(PointerEvent::Down { x: 0.0, y: 0.0 });
        cam.handle_pointer(PointerEvent::Move { x: 300.0, y: -90.0 });
        cam.handle_pointer(PointerEvent::Up);
        cam.zoom_wheel(-1.0);

        let start = Duration::from_secs(10);
        cam.reset(start);
        cam.update(start + Duration::from_secs(1));
        assert!(cam.is_tweening());
        cam.update(start + Duration::from_secs(2));
        assert!(!cam.is_tweening());
        assert_eq!(cam.pose(), cam.home());
    }

    #[test]
    fn intro_starts_zoomed_out() {
        let mut cam = OrbitCamera::new();
        cam.intro(Duration::ZERO);
        assert_eq!(cam.distance(), cam.max_distance);
        cam.update(Duration::from_millis(1_250));
        assert!(cam.distance() < cam.max_distance && cam.distance() > cam.home().distance);
        cam.update(Duration::from_millis(2_500));
        assert_eq!(cam.distance(), cam.home().distance);
    }

    #[test]
    fn eye_is_derived_from_angles() {
        let mut cam = OrbitCamera::new();
        cam.fly_to(&framing(4.0, 0.0, FRAC_PI_2));
        while cam.target().is_some() {
            cam.update(Duration::ZERO);
        }
        let eye = cam.eye();
        assert_relative_eq!(eye.length(), 4.0, epsilon = 1e-4);
        assert_relative_eq!(eye.z, 4.0, epsilon = 1e-4);

        // Straight overhead still yields a finite view.
        cam.fly_to(&framing(4.0, FRAC_PI_2, 0.0));
        while cam.target().is_some() {
            cam.update(Duration::ZERO);
        }
        assert!(cam.frame(1.5).view_proj.is_finite());
    }

    #[test]
    fn nan_input_is_ignored() {
        let mut cam = OrbitCamera::new();
        let before = cam.pose();
        cam.zoom_wheel(f32::NAN);
        cam.fly_to(&framing(f32::NAN, f32::NAN, f32::NAN));
        for _ in 0..400 {
            cam.update(Duration::ZERO);
        }
        assert!(cam.pitch().is_finite() && cam.yaw().is_finite() && cam.distance().is_finite());
        assert!(before.distance.is_finite());
    }

    #[test]
    fn wrap_angle_range() {
        assert_relative_eq!(wrap_angle(3.0 * PI).abs(), PI, epsilon = 1e-5);
        assert_relative_eq!(wrap_angle(TAU + 0.5), 0.5, epsilon = 1e-5);
        assert_relative_eq!(wrap_angle(-PI), PI, epsilon = 1e-5);
        assert_relative_eq!(wrap_angle(0.5), 0.5);
        assert_eq!(wrap_angle(f32::INFINITY), 0.0);
    }
}
