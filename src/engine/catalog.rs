// Feature catalog: the 15 mandibular measurements M1..M15.
//
// Anchors are points on the female-typical (morph 0) procedural model, in model
// space. The front of the mandible faces +Z and the left side is -X, so the
// lateral landmarks sit on the left half and are framed from yaw ≈ PI.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use glam::Vec3;

use crate::prediction::MEASUREMENT_COUNT;

/// Measurement number 1..=15. Displays as `M9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(u8);

impl FeatureId {
    pub fn new(number: u8) -> Option<Self> {
        (1..=MEASUREMENT_COUNT as u8).contains(&number).then_some(FeatureId(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn definition(self) -> &'static FeatureDefinition {
        &FEATURES[usize::from(self.0 - 1)]
    }

    pub fn all() -> impl Iterator<Item = FeatureId> {
        (1..=MEASUREMENT_COUNT as u8).map(FeatureId)
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

impl FromStr for FeatureId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches(['M', 'm']);
        digits
            .parse::<u8>()
            .ok()
            .and_then(FeatureId::new)
            .ok_or_else(|| format!("unknown feature id '{s}'"))
    }
}

/// Where the camera flies when a feature is selected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
}

#[derive(Debug)]
pub struct FeatureDefinition {
    pub id: FeatureId,
    pub display_name: &'static str,
    pub description: &'static str,
    pub note: &'static str,
    /// Linear RGB in [0, 1].
    pub color: [f32; 3],
    pub anchor: Vec3,
    pub label_offset: Vec3,
    /// Landmarks the measurement is taken between, joined in order. Two points
    /// for a distance, three for an angle (vertex in the middle).
    pub measurement_line: &'static [Vec3],
    pub framing: Framing,
}

impl FeatureDefinition {
    pub fn label_position(&self) -> Vec3 {
        self.anchor + self.label_offset
    }
}

pub fn features() -> &'static [FeatureDefinition] {
    &FEATURES
}

/// Case-insensitive lookup by display name.
pub fn find_by_name(name: &str) -> Option<&'static FeatureDefinition> {
    FEATURES.iter().find(|f| f.display_name.eq_ignore_ascii_case(name.trim()))
}

/// `0xRRGGBB` to normalized RGB.
pub(crate) const fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

const FRONT: f32 = FRAC_PI_2;
const LEFT: f32 = PI;

static FEATURES: [FeatureDefinition; MEASUREMENT_COUNT] = [
    FeatureDefinition {
        id: FeatureId(1),
        display_name: "Length",
        description: "Maximum anteroposterior dimension from gonion to gnathion",
        note: "Critical for bite analysis and facial reconstruction",
        color: rgb(0x00ff88),
        anchor: Vec3::new(0.0, -0.72, 0.2),
        label_offset: Vec3::new(-0.5, 0.3, 0.35),
        measurement_line: &[Vec3::new(-1.0, -0.4, 0.0), Vec3::new(0.0, -0.72, 0.2)],
        framing: Framing { distance: 3.5, pitch: 0.3, yaw: FRONT + 0.5 },
    },
    FeatureDefinition {
        id: FeatureId(2),
        display_name: "Bicondylar Breadth",
        description: "Maximum transverse width between lateral condylar surfaces",
        note: "Key indicator of mandibular size and TMJ function",
        color: rgb(0x00ccff),
        anchor: Vec3::new(-1.24, 0.6, 0.0),
        label_offset: Vec3::new(-0.5, 0.22, 0.38),
        measurement_line: &[Vec3::new(-1.24, 0.6, 0.0), Vec3::new(1.24, 0.6, 0.0)],
        framing: Framing { distance: 4.0, pitch: 0.3, yaw: FRONT },
    },
    FeatureDefinition {
        id: FeatureId(3),
        display_name: "Mandibular Index",
        description: "Ratio of mandibular height to length",
        note: "Indicates mandibular proportions and robusticity",
        color: rgb(0xff00ff),
        anchor: Vec3::new(0.3, -0.4, 0.24),
        label_offset: Vec3::new(0.45, -0.1, 0.32),
        measurement_line: &[Vec3::new(0.3, -0.24, 0.24), Vec3::new(0.3, -0.56, 0.24)],
        framing: Framing { distance: 3.5, pitch: 0.0, yaw: FRONT },
    },
    FeatureDefinition {
        id: FeatureId(4),
        display_name: "Bigonial Breadth",
        description: "Maximum transverse width between gonial angles",
        note: "Sexually dimorphic - wider in males",
        color: rgb(0xffff00),
        anchor: Vec3::new(-1.06, -0.4, 0.0),
        label_offset: Vec3::new(-0.5, -0.1, 0.32),
        measurement_line: &[Vec3::new(-1.06, -0.4, 0.0), Vec3::new(1.06, -0.4, 0.0)],
        framing: Framing { distance: 4.0, pitch: -0.6, yaw: FRONT },
    },
    FeatureDefinition {
        id: FeatureId(5),
        display_name: "Upper Ramus Breadth",
        description: "Minimum breadth of upper ramus",
        note: "Indicates ramus robusticity",
        color: rgb(0x00ffff),
        anchor: Vec3::new(-1.1, 0.22, 0.2),
        label_offset: Vec3::new(-0.42, 0.2, 0.35),
        measurement_line: &[Vec3::new(-1.27, 0.14, 0.2), Vec3::new(-0.99, 0.3, 0.2)],
        framing: Framing { distance: 3.0, pitch: 0.1, yaw: LEFT },
    },
    FeatureDefinition {
        id: FeatureId(6),
        display_name: "Lower Ramus Breadth",
        description: "Minimum breadth of lower ramus",
        note: "Related to masticatory muscle attachment",
        color: rgb(0xff6699),
        anchor: Vec3::new(-0.9, -0.22, 0.2),
        label_offset: Vec3::new(-0.5, 0.12, 0.3),
        measurement_line: &[Vec3::new(-1.01, -0.3, 0.2), Vec3::new(-0.73, -0.14, 0.2)],
        framing: Framing { distance: 3.0, pitch: -0.1, yaw: LEFT },
    },
    FeatureDefinition {
        id: FeatureId(7),
        display_name: "Condylar Ramus Height",
        description: "Vertical distance from condylar head to gonial angle",
        note: "Correlates with masticatory muscle development",
        color: rgb(0xff6600),
        anchor: Vec3::new(-1.12, 0.72, 0.0),
        label_offset: Vec3::new(-0.5, 0.16, 0.3),
        measurement_line: &[Vec3::new(-1.12, 0.72, 0.0), Vec3::new(-1.0, -0.4, 0.0)],
        framing: Framing { distance: 3.5, pitch: 0.0, yaw: LEFT },
    },
    FeatureDefinition {
        id: FeatureId(8),
        display_name: "Coronoid Ramus Height",
        description: "Vertical distance from coronoid tip to gonial angle",
        note: "Indicates temporalis muscle attachment area",
        color: rgb(0x9966ff),
        anchor: Vec3::new(-0.8, 0.35, 0.0),
        label_offset: Vec3::new(-0.45, 0.2, 0.28),
        measurement_line: &[Vec3::new(-0.8, 0.35, 0.0), Vec3::new(-1.0, -0.4, 0.0)],
        framing: Framing { distance: 3.5, pitch: 0.1, yaw: LEFT - 0.2 },
    },
    FeatureDefinition {
        id: FeatureId(9),
        display_name: "Gonial Angle",
        description: "Angle between posterior ramus border and mandibular base",
        note: "Highly sexually dimorphic - males have more acute angles",
        color: rgb(0xffaa00),
        anchor: Vec3::new(-1.0, -0.4, 0.06),
        label_offset: Vec3::new(-0.5, -0.18, 0.31),
        measurement_line: &[Vec3::new(-1.15, 0.35, 0.06), Vec3::new(-1.0, -0.4, 0.06), Vec3::new(-0.2, -0.56, 0.06)],
        framing: Framing { distance: 3.0, pitch: -0.2, yaw: LEFT },
    },
    FeatureDefinition {
        id: FeatureId(10),
        display_name: "Coronoid Length",
        description: "Length of coronoid process",
        note: "Related to temporalis muscle leverage",
        color: rgb(0x66ff99),
        anchor: Vec3::new(-0.8, 0.2, 0.08),
        label_offset: Vec3::new(-0.52, 0.1, 0.3),
        measurement_line: &[Vec3::new(-0.8, 0.35, 0.08), Vec3::new(-0.8, 0.05, 0.08)],
        framing: Framing { distance: 2.8, pitch: 0.2, yaw: LEFT - 0.2 },
    },
    FeatureDefinition {
        id: FeatureId(11),
        display_name: "Coronoid Breadth",
        description: "Breadth of coronoid process",
        note: "Indicates muscle attachment surface area",
        color: rgb(0xff99cc),
        anchor: Vec3::new(-0.8, 0.1, 0.08),
        label_offset: Vec3::new(-0.45, 0.16, 0.29),
        measurement_line: &[Vec3::new(-0.88, 0.05, 0.08), Vec3::new(-0.72, 0.05, 0.08)],
        framing: Framing { distance: 2.8, pitch: 0.3, yaw: LEFT - 0.4 },
    },
    FeatureDefinition {
        id: FeatureId(12),
        display_name: "Condyle-Condyle Distance",
        description: "Transverse distance between condylar centers",
        note: "Related to TMJ spacing and function",
        color: rgb(0xcc00ff),
        anchor: Vec3::new(1.12, 0.6, 0.0),
        label_offset: Vec3::new(0.5, 0.2, 0.1),
        measurement_line: &[Vec3::new(-1.12, 0.6, 0.0), Vec3::new(1.12, 0.6, 0.0)],
        framing: Framing { distance: 4.0, pitch: 0.4, yaw: FRONT },
    },
    FeatureDefinition {
        id: FeatureId(13),
        display_name: "Inter-Coronoid Distance",
        description: "Transverse distance between coronoid process tips",
        note: "Indicates mandibular arch width",
        color: rgb(0xff3366),
        anchor: Vec3::new(0.8, 0.35, 0.0),
        label_offset: Vec3::new(0.45, 0.18, 0.29),
        measurement_line: &[Vec3::new(-0.8, 0.35, 0.0), Vec3::new(0.8, 0.35, 0.0)],
        framing: Framing { distance: 3.5, pitch: 0.3, yaw: FRONT },
    },
    FeatureDefinition {
        id: FeatureId(14),
        display_name: "Coronoid-Foramen Distance",
        description: "Distance from coronoid tip to mental foramen",
        note: "Anatomical landmark relationship",
        color: rgb(0x33ccff),
        anchor: Vec3::new(-0.6, -0.08, -0.12),
        label_offset: Vec3::new(-0.52, 0.05, 0.27),
        measurement_line: &[Vec3::new(-0.8, 0.35, 0.0), Vec3::new(-0.6, -0.08, -0.12)],
        framing: Framing { distance: 3.5, pitch: -0.2, yaw: FRONT + 0.8 },
    },
    FeatureDefinition {
        id: FeatureId(15),
        display_name: "Bimental Breadth",
        description: "Breadth between mental foramina",
        note: "Indicates anterior mandibular width",
        color: rgb(0xffcc00),
        anchor: Vec3::new(0.6, -0.08, -0.12),
        label_offset: Vec3::new(0.46, -0.2, 0.25),
        measurement_line: &[Vec3::new(-0.6, -0.08, -0.12), Vec3::new(0.6, -0.08, -0.12)],
        framing: Framing { distance: 3.0, pitch: -0.5, yaw: FRONT },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_ordered_by_id() {
        for (idx, def) in features().iter().enumerate() {
            assert_eq!(usize::from(def.id.number()), idx + 1);
            assert_eq!(def.id.definition().display_name, def.display_name);
        }
        assert_eq!(FeatureId::all().count(), MEASUREMENT_COUNT);
    }

    #[test]
    fn ids_parse_and_display() {
        let id: FeatureId = "M9".parse().unwrap();
        assert_eq!(id.to_string(), "M9");
        assert_eq!(id.definition().display_name, "Gonial Angle");
        assert_eq!("m15".parse::<FeatureId>().unwrap().number(), 15);
        assert!("M0".parse::<FeatureId>().is_err());
        assert!("M16".parse::<FeatureId>().is_err());
        assert!("gonial".parse::<FeatureId>().is_err());
        assert!(FeatureId::new(0).is_none());
    }

    #[test]
    fn colors_are_normalized() {
        let gonial = FeatureId(9).definition().color;
        assert_eq!(gonial[0], 1.0);
        assert!((gonial[1] - 170.0 / 255.0).abs() < 1e-6);
        assert_eq!(gonial[2], 0.0);
        for def in features() {
            assert!(def.color.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn labels_sit_in_front_of_their_anchor() {
        for def in features() {
            assert!(def.label_offset.length() > 0.2, "{}", def.id);
            assert!(def.label_position().z > def.anchor.z, "{}", def.id);
            assert!(def.framing.distance >= 2.0, "{}", def.id);
        }
    }

    fn distance_to_segment(p: Vec3, a: Vec3, b: Vec3) -> f32 {
        let ab = b - a;
        let t = ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
        p.distance(a + ab * t)
    }

    #[test]
    fn anchors_lie_on_their_measurement_line() {
        for def in features() {
            let line = def.measurement_line;
            assert!((2..=3).contains(&line.len()), "{}", def.id);
            let nearest = line
                .windows(2)
                .map(|seg| distance_to_segment(def.anchor, seg[0], seg[1]))
                .fold(f32::INFINITY, f32::min);
            assert!(nearest < 0.1, "{} anchor is {nearest} off its line", def.id);
        }
        // Bilateral breadths are symmetric about the midline.
        for n in [2, 4, 12, 13, 15] {
            let line = FeatureId(n).definition().measurement_line;
            assert_eq!(line[0].x, -line[1].x, "M{n}");
            assert_eq!(line[0].y, line[1].y, "M{n}");
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(find_by_name("bigonial breadth").map(|f| f.id.number()), Some(4));
        assert!(find_by_name("Ramus").is_none());
    }
}
