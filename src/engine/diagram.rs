// Flat front-view diagram of the procedural parts.
// Used when no 3D-capable adapter exists: same parts, same materials, same
// indicator and landmark dots, drawn as 2D shapes by egui. Front view drops Z; shapes are sorted
// far to near so the painter's algorithm gives the right overlap.

use glam::{Vec2, Vec3, Vec3Swizzles};

use super::builder::{ColorStyle, PartKind, Primitive};
use super::mesh::PrimitiveShape;
use super::overlay::{Emphasis, Indicator, Landmark};
use super::catalog::FeatureId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape2D {
    /// Rectangle rotated by `angle` radians about its center (CCW, y up).
    Rect { center: Vec2, size: Vec2, angle: f32 },
    Circle { center: Vec2, radius: f32 },
    Triangle { points: [Vec2; 3] },
}

impl Shape2D {
    /// Outline points in model space. Circles give their bounding square.
    pub fn points(&self) -> Vec<Vec2> {
        match *self {
            Shape2D::Rect { center, size, angle } => {
                let half = size * 0.5;
                let rot = Vec2::from_angle(angle);
                [
                    Vec2::new(-half.x, -half.y),
                    Vec2::new(half.x, -half.y),
                    Vec2::new(half.x, half.y),
                    Vec2::new(-half.x, half.y),
                ]
                .iter()
                .map(|c| center + rot.rotate(*c))
                .collect()
            }
            Shape2D::Circle { center, radius } => vec![center - Vec2::splat(radius), center + Vec2::splat(radius)],
            Shape2D::Triangle { points } => points.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagramShape {
    pub kind: PartKind,
    pub shape: Shape2D,
    pub style: ColorStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramIndicator {
    pub id: FeatureId,
    pub emphasis: Emphasis,
    pub color: [f32; 3],
    pub anchor: Vec2,
    pub label: Vec2,
    pub measurement: Vec<Vec2>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagram {
    pub shapes: Vec<DiagramShape>,
    pub indicator: Option<DiagramIndicator>,
    /// Model-space XY, in pick order.
    pub landmarks: Vec<Landmark<Vec2>>,
}

/// Front view of `primitives` with the indicator and landmarks flattened alongside.
pub fn front_view(
    primitives: &[Primitive],
    indicator: Option<&Indicator>,
    landmarks: &[Landmark<Vec3>],
) -> Diagram {
    let mut ordered: Vec<&Primitive> = primitives.iter().collect();
    ordered.sort_by(|a, b| a.position.z.total_cmp(&b.position.z));

    let shapes = ordered
        .into_iter()
        .map(|p| DiagramShape { kind: p.kind, shape: flatten(p), style: p.style })
        .collect();

    Diagram {
        shapes,
        indicator: indicator.map(|i| DiagramIndicator {
            id: i.id,
            emphasis: i.emphasis,
            color: i.color,
            anchor: i.anchor.xy(),
            label: i.label_position.xy(),
            measurement: i.measurement.iter().map(|p| p.xy()).collect(),
            text: i.text.clone(),
        }),
        landmarks: landmarks.iter().map(|l| Landmark { id: l.id, position: l.position.xy() }).collect(),
    }
}

fn flatten(p: &Primitive) -> Shape2D {
    let center = p.position.xy();
    match p.shape {
        PrimitiveShape::Box | PrimitiveShape::Cylinder => {
            let (axis, angle) = p.rotation.to_axis_angle();
            Shape2D::Rect { center, size: p.size.xy(), angle: angle * axis.z.signum() }
        }
        PrimitiveShape::Sphere => Shape2D::Circle { center, radius: p.size.x * 0.5 },
        PrimitiveShape::Cone => {
            let half = p.size.xy() * 0.5;
            Shape2D::Triangle {
                points: [
                    center + Vec2::new(-half.x, -half.y),
                    center + Vec2::new(half.x, -half.y),
                    center + Vec2::new(0.0, half.y),
                ],
            }
        }
    }
}

/// Maps model-space XY (y up) to window pixels (y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagramTransform {
    pub scale: f32,
    pub offset: Vec2,
}

impl DiagramTransform {
    /// Fit the diagram's extent into `viewport` (a rect from `origin` of `size`) with a margin.
    pub fn fit(diagram: &Diagram, origin: Vec2, size: Vec2, margin: f32) -> Self {
        let mut points: Vec<Vec2> = diagram.shapes.iter().flat_map(|s| s.shape.points()).collect();
        if let Some(ind) = &diagram.indicator {
            points.push(ind.anchor);
            points.push(ind.label);
            points.extend(&ind.measurement);
        }
        points.extend(diagram.landmarks.iter().map(|l| l.position));
        let (min, max) = points.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(lo, hi), p| (lo.min(*p), hi.max(*p)),
        );
        if !(min.x <= max.x && min.y <= max.y) {
            return Self { scale: 1.0, offset: origin + size * 0.5 };
        }
        let extent = (max - min).max(Vec2::splat(1e-3));
        let avail = (size - Vec2::splat(2.0 * margin)).max(Vec2::ONE);
        let scale = (avail.x / extent.x).min(avail.y / extent.y);
        let mid = (min + max) * 0.5;
        let center = origin + size * 0.5;
        Self { scale, offset: center - Vec2::new(mid.x, -mid.y) * scale }
    }

    pub fn to_screen(&self, p: Vec2) -> Vec2 {
        self.offset + Vec2::new(p.x, -p.y) * self.scale
    }
}
