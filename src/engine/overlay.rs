// Landmark overlay: at most one indicator (label → anchor line with end markers,
// plus the measurement span between the feature's landmarks) for the selected
// feature, or for the hovered one when nothing is selected.
//
// Layout happens in model space; projection to screen happens after the camera
// update so the label tracks the model while it rotates. Landmark dots are
// projected the same way and picked in screen space.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use super::builder::MandibleModel;
use super::catalog::FeatureId;
use crate::prediction::Measurements;

/// Screen-space line thickness at emphasis factor 1.
const BASE_LINE_WIDTH: f32 = 1.6;
const BASE_MARKER_RADIUS: f32 = 2.5;
const HALO_SCALE: f32 = 1.8;
const MEASUREMENT_WIDTH_SCALE: f32 = 1.5;

/// Pixels from a landmark dot that still count as pointing at it.
pub const PICK_RADIUS: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Hovered,
    Selected,
}

impl Emphasis {
    pub fn factor(self) -> f32 {
        match self {
            Emphasis::Hovered => 1.0,
            Emphasis::Selected => 2.5,
        }
    }

    pub fn line_width(self) -> f32 {
        BASE_LINE_WIDTH * self.factor()
    }

    pub fn marker_radius(self) -> f32 {
        BASE_MARKER_RADIUS * (1.0 + self.factor()) / 2.0
    }

    pub fn halo_radius(self) -> f32 {
        self.marker_radius() * HALO_SCALE
    }

    pub fn measurement_width(self) -> f32 {
        self.line_width() * MEASUREMENT_WIDTH_SCALE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    pub id: FeatureId,
    pub emphasis: Emphasis,
    pub color: [f32; 3],
    /// Model-space point on the mandible.
    pub anchor: Vec3,
    pub label_position: Vec3,
    /// Model-space measurement landmarks, joined in order.
    pub measurement: Vec<Vec3>,
    pub text: String,
}

/// Indicator projected into window pixels (origin top-left).
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenIndicator {
    pub id: FeatureId,
    pub emphasis: Emphasis,
    pub color: [f32; 3],
    pub anchor: Vec2,
    pub label: Vec2,
    /// Empty when part of the span is behind the eye.
    pub measurement: Vec<Vec2>,
    pub text: String,
}

/// A clickable landmark point, in model space (`Vec3`) or on screen (`Vec2`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark<P> {
    pub id: FeatureId,
    pub position: P,
}

/// Where the indicator goes for this frame. Selected wins over hovered.
pub fn layout(
    selected: Option<FeatureId>,
    hovered: Option<FeatureId>,
    model: &MandibleModel,
    measurements: &Measurements,
) -> Option<Indicator> {
    let (id, emphasis) = match (selected, hovered) {
        (Some(id), _) => (id, Emphasis::Selected),
        (None, Some(id)) => (id, Emphasis::Hovered),
        (None, None) => return None,
    };
    Some(Indicator {
        id,
        emphasis,
        color: id.definition().color,
        anchor: model.anchor(id),
        label_position: model.label_position(id),
        measurement: model.measurement_line(id),
        text: label_text(id, measurements),
    })
}

/// `"M9 Gonial Angle — 120.0"`, or just the name when no value was entered.
pub fn label_text(id: FeatureId, measurements: &Measurements) -> String {
    let name = id.definition().display_name;
    match measurements.get(id.number()) {
        Some(value) => format!("{id} {name} — {}", format_value(value)),
        None => format!("{id} {name}"),
    }
}

/// Up to two decimals, at least one.
fn format_value(value: f32) -> String {
    let mut text = format!("{value:.2}");
    if text.ends_with('0') {
        text.pop();
    }
    text
}

impl Indicator {
    /// Project label and anchor. `None` when either point is behind the eye.
    pub fn project(&self, view_proj: Mat4, viewport: Vec2) -> Option<ScreenIndicator> {
        Some(ScreenIndicator {
            id: self.id,
            emphasis: self.emphasis,
            color: self.color,
            anchor: project_point(view_proj, self.anchor, viewport)?,
            label: project_point(view_proj, self.label_position, viewport)?,
            measurement: self
                .measurement
                .iter()
                .map(|p| project_point(view_proj, *p, viewport))
                .collect::<Option<Vec<_>>>()
                .unwrap_or_default(),
            text: self.text.clone(),
        })
    }
}

/// Pickable landmarks: the indicated feature's measurement points first,
/// then every feature's anchor in catalog order.
pub fn landmarks(model: &MandibleModel, indicator: Option<&Indicator>) -> Vec<Landmark<Vec3>> {
    let measured = indicator
        .into_iter()
        .flat_map(|i| i.measurement.iter().map(move |p| Landmark { id: i.id, position: *p }));
    let anchors = FeatureId::all().map(|id| Landmark { id, position: model.anchor(id) });
    measured.chain(anchors).collect()
}

/// Landmarks in window pixels. Points behind the eye are dropped.
pub fn project_landmarks(landmarks: &[Landmark<Vec3>], view_proj: Mat4, viewport: Vec2) -> Vec<Landmark<Vec2>> {
    landmarks
        .iter()
        .filter_map(|l| {
            project_point(view_proj, l.position, viewport).map(|position| Landmark { id: l.id, position })
        })
        .collect()
}

/// Feature of the landmark nearest `cursor` within `radius`. Earlier entries win ties.
pub fn pick(landmarks: &[Landmark<Vec2>], cursor: Vec2, radius: f32) -> Option<FeatureId> {
    let mut best: Option<(FeatureId, f32)> = None;
    for landmark in landmarks {
        let d = landmark.position.distance_squared(cursor);
        if d > radius * radius {
            continue;
        }
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((landmark.id, d));
        }
    }
    best.map(|(id, _)| id)
}

/// Model-space point to window pixels, y down.
pub fn project_point(view_proj: Mat4, point: Vec3, viewport: Vec2) -> Option<Vec2> {
    let clip = view_proj * point.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = clip.xy() / clip.w;
    Some(Vec2::new((ndc.x + 1.0) * 0.5 * viewport.x, (1.0 - ndc.y) * 0.5 * viewport.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::camera::OrbitCamera;
    use approx::assert_relative_eq;

    fn id(n: u8) -> FeatureId {
        FeatureId::new(n).unwrap()
    }

    fn model(morph: f32) -> MandibleModel {
        let mut model = MandibleModel::new();
        model.set_morph(morph);
        model
    }

    #[test]
    fn selection_beats_hover() {
        let m = Measurements::default();
        assert!(layout(None, None, &model(0.0), &m).is_none());

        let hovered = layout(None, Some(id(3)), &model(0.0), &m).unwrap();
        assert_eq!(hovered.id, id(3));
        assert_eq!(hovered.emphasis, Emphasis::Hovered);

        let both = layout(Some(id(9)), Some(id(3)), &model(0.0), &m).unwrap();
        assert_eq!(both.id, id(9));
        assert_eq!(both.emphasis, Emphasis::Selected);
        assert!(both.emphasis.line_width() > hovered.emphasis.line_width());
        assert!(both.emphasis.marker_radius() > hovered.emphasis.marker_radius());
    }

    #[test]
    fn label_shows_measurement_when_present() {
        let sample = Measurements::sample();
        assert_eq!(label_text(id(9), &sample), "M9 Gonial Angle — 120.0");
        assert_eq!(label_text(id(3), &sample), "M3 Mandibular Index — 0.85");
        assert_eq!(label_text(id(9), &Measurements::default()), "M9 Gonial Angle");
    }

    #[test]
    fn anchor_follows_morph_scale() {
        let m = Measurements::default();
        let female = layout(Some(id(12)), None, &model(0.0), &m).unwrap();
        let male = layout(Some(id(12)), None, &model(1.0), &m).unwrap();
        assert_relative_eq!(male.anchor.x, female.anchor.x * 1.26, epsilon = 1e-5);
        assert_relative_eq!(male.anchor.y, female.anchor.y * 1.14, epsilon = 1e-5);
        let offset = male.label_position - male.anchor;
        let expected = id(12).definition().label_offset;
        assert_relative_eq!(offset.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(offset.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(offset.z, expected.z, epsilon = 1e-5);
        assert_eq!(female.color, id(12).definition().color);
    }

    #[test]
    fn indicator_carries_the_measurement_span() {
        let m = Measurements::default();
        let indicator = layout(Some(id(2)), None, &model(1.0), &m).unwrap();
        assert_eq!(indicator.measurement, model(1.0).measurement_line(id(2)));
        assert!(indicator.measurement[0].x < 0.0 && indicator.measurement[1].x > 0.0);
        assert!(Emphasis::Selected.measurement_width() > Emphasis::Selected.line_width());

        let cam = OrbitCamera::new();
        let viewport = Vec2::new(800.0, 600.0);
        let frame = cam.frame(viewport.x / viewport.y);
        let screen = indicator.project(frame.view_proj, viewport).unwrap();
        assert_eq!(screen.measurement.len(), 2);
    }

    fn dot(n: u8, x: f32, y: f32) -> Landmark<Vec2> {
        Landmark { id: id(n), position: Vec2::new(x, y) }
    }

    #[test]
    fn pick_takes_the_nearest_dot_in_range() {
        let dots = [dot(2, 100.0, 100.0), dot(4, 108.0, 100.0), dot(9, 300.0, 300.0)];
        assert_eq!(pick(&dots, Vec2::new(103.0, 101.0), PICK_RADIUS), Some(id(2)));
        assert_eq!(pick(&dots, Vec2::new(106.0, 100.0), PICK_RADIUS), Some(id(4)));
        assert_eq!(pick(&dots, Vec2::new(300.0, 309.0), PICK_RADIUS), Some(id(9)));
        assert_eq!(pick(&dots, Vec2::new(200.0, 200.0), PICK_RADIUS), None);
        assert_eq!(pick(&[], Vec2::ZERO, PICK_RADIUS), None);

        // Coincident dots: the earlier one wins.
        let stacked = [dot(7, 50.0, 50.0), dot(1, 50.0, 50.0)];
        assert_eq!(pick(&stacked, Vec2::new(50.0, 50.0), PICK_RADIUS), Some(id(7)));
    }

    #[test]
    fn indicated_landmarks_come_before_anchors() {
        let model = model(0.0);
        assert_eq!(landmarks(&model, None).len(), 15);

        let indicator = layout(Some(id(9)), None, &model, &Measurements::default()).unwrap();
        let all = landmarks(&model, Some(&indicator));
        assert_eq!(all.len(), 15 + 3);
        assert!(all[..3].iter().all(|l| l.id == id(9)));
        assert_eq!(all[3].id, id(1));
        assert_eq!(all[3].position, model.anchor(id(1)));
    }

    #[test]
    fn projected_anchor_picks_its_feature() {
        let model = model(0.5);
        let cam = OrbitCamera::new();
        let viewport = Vec2::new(1280.0, 720.0);
        let frame = cam.frame(viewport.x / viewport.y);
        let dots = project_landmarks(&landmarks(&model, None), frame.view_proj, viewport);
        assert_eq!(dots.len(), 15);

        let condyle = dots.iter().find(|d| d.id == id(12)).unwrap();
        assert_eq!(pick(&dots, condyle.position + Vec2::new(2.0, -2.0), PICK_RADIUS), Some(id(12)));
    }

    #[test]
    fn origin_projects_to_viewport_center() {
        let cam = OrbitCamera::new();
        let viewport = Vec2::new(800.0, 600.0);
        let frame = cam.frame(viewport.x / viewport.y);
        let center = project_point(frame.view_proj, Vec3::ZERO, viewport).unwrap();
        assert_relative_eq!(center.x, 400.0, epsilon = 1e-2);
        assert_relative_eq!(center.y, 300.0, epsilon = 1e-2);

        // A point well behind the eye does not project.
        assert!(project_point(frame.view_proj, frame.eye * 3.0, viewport).is_none());

        let indicator = layout(Some(id(1)), None, &model(0.0), &Measurements::default()).unwrap();
        let screen = indicator.project(frame.view_proj, viewport).unwrap();
        assert!(screen.label.is_finite() && screen.anchor.is_finite());
    }
}
