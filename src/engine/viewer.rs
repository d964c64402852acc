// Viewer shell: single owner of model, camera, morph and selection state.
//
// Frame pipeline, in order:
//   1. poll the asset loader (may swap the model source)
//   2. camera update
//   3. morph tick
//   4. ECS sync of parts and materials
//   5. overlay layout + projection, landmark dots for picking

use std::time::Duration;

use bevy_ecs::world::World;
use glam::{Vec2, Vec3};

use super::builder::{material_for, model_width, placeholder, MandibleModel, Palette, Primitive};
use super::camera::{CameraFrame, OrbitCamera};
use super::catalog::FeatureId;
use super::components::{MeshRef, Transform};
use super::input::PointerEvent;
use super::loader::{AssetLoader, LoadState};
use super::morph::MorphAnimator;
use super::overlay::{self, Indicator, Landmark, ScreenIndicator};
use super::systems::{collect_draw_items, sync_scene, DrawItem, SceneItem};
use crate::config::ViewerConfig;
use crate::prediction::{Gender, Measurements, PredictionResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAction {
    ToggleMorph,
    ResetView,
    ReplayIntro,
    ToggleAutoRotate,
    ZoomIn,
    ZoomOut,
    /// Selecting the already selected feature deselects it.
    Select(FeatureId),
    Deselect,
    SelectNext,
    SelectPrevious,
    Hover(Option<FeatureId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    SelectionChanged(Option<FeatureId>),
    ModelSourceChanged(ModelSource),
}

/// What the scene is currently drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    /// Asset still loading; placeholder box shown.
    Loading,
    Asset,
    Procedural,
    /// Asset failed and the procedural fallback is disabled.
    Placeholder,
}

impl ModelSource {
    pub fn label(self) -> &'static str {
        match self {
            ModelSource::Loading => "loading model",
            ModelSource::Asset => "anatomical model",
            ModelSource::Procedural => "procedural model",
            ModelSource::Placeholder => "placeholder",
        }
    }
}

/// Read-only view of the viewer state for the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerSnapshot {
    pub morph: f32,
    pub morph_target: f32,
    pub morph_animating: bool,
    pub pitch: f32,
    pub yaw: f32,
    pub distance: f32,
    pub zoom_fraction: f32,
    pub auto_rotate: bool,
    pub selected: Option<FeatureId>,
    pub hovered: Option<FeatureId>,
    pub source: ModelSource,
    pub load_state: LoadState,
    pub predicted: Option<Gender>,
}

pub struct FrameOutput {
    pub camera: CameraFrame,
    pub draw_items: Vec<DrawItem>,
    pub indicator: Option<Indicator>,
    pub screen_indicator: Option<ScreenIndicator>,
    pub landmarks: Vec<Landmark<Vec3>>,
    /// `landmarks` in window pixels, for drawing and picking in 3D mode.
    pub screen_landmarks: Vec<Landmark<Vec2>>,
}

/// Single selection plus the auto-rotate flag it displaced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: Option<FeatureId>,
    pub hovered: Option<FeatureId>,
    saved_auto_rotate: Option<bool>,
}

impl SelectionState {
    /// Select `id`. The first selection remembers `auto_rotate` and stops the
    /// rotation; switching features keeps whatever the user has set since.
    /// Returns the auto-rotate flag to use while selected.
    fn select(&mut self, id: FeatureId, auto_rotate: bool) -> bool {
        self.selected = Some(id);
        if self.saved_auto_rotate.is_none() {
            self.saved_auto_rotate = Some(auto_rotate);
            return false;
        }
        auto_rotate
    }

    /// Clear the selection. Returns the auto-rotate flag to restore.
    fn deselect(&mut self) -> Option<bool> {
        self.selected = None;
        self.saved_auto_rotate.take()
    }
}

pub struct Viewer {
    config: ViewerConfig,
    model: MandibleModel,
    camera: OrbitCamera,
    morph: MorphAnimator,
    loader: AssetLoader,
    selection: SelectionState,
    palette: Palette,
    predicted: Option<Gender>,
    measurements: Measurements,
    source: ModelSource,
    world: World,
    events: Vec<ViewerEvent>,
}

impl Viewer {
    pub fn new(config: ViewerConfig, measurements: Measurements, prediction: Option<&PredictionResponse>) -> Self {
        let predicted = prediction.and_then(PredictionResponse::gender);
        let mut morph = MorphAnimator::from_config(&config.morph);
        if config.morph.follow_prediction && predicted == Some(Gender::Male) {
            morph.set_immediate(1.0);
        }
        let mut model = MandibleModel::new();
        model.set_morph(morph.value());

        Self {
            camera: OrbitCamera::from_config(&config.camera),
            morph,
            model,
            loader: AssetLoader::new(),
            selection: SelectionState::default(),
            palette: Palette::for_prediction(predicted),
            predicted,
            measurements,
            source: ModelSource::Loading,
            world: World::new(),
            events: Vec::new(),
            config,
        }
    }

    /// Kick off the intro tween and the one asset load attempt.
    pub fn start(&mut self, now: Duration) {
        self.camera.intro(now);
        match self.config.asset.path.clone() {
            Some(path) => {
                log::info!("Loading asset {}", path.display());
                self.loader.start(path, model_width(0.0));
                if self.loader.state() == LoadState::Failed {
                    self.fall_back();
                }
            }
            None => {
                log::info!("No asset configured");
                self.loader.skip();
                self.fall_back();
            }
        }
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    pub fn handle_action(&mut self, action: ViewerAction, now: Duration) {
        match action {
            ViewerAction::ToggleMorph => {
                let target = self.morph.toggle(now);
                log::debug!("Morph toward {}", if target >= 0.5 { "male" } else { "female" });
            }
            ViewerAction::ResetView => self.camera.reset(now),
            ViewerAction::ReplayIntro => self.camera.intro(now),
            ViewerAction::ToggleAutoRotate => {
                self.camera.auto_rotate = !self.camera.auto_rotate;
            }
            ViewerAction::ZoomIn => self.camera.zoom_in(),
            ViewerAction::ZoomOut => self.camera.zoom_out(),
            ViewerAction::Select(id) => {
                if self.selection.selected == Some(id) {
                    self.deselect();
                } else {
                    self.select(id);
                }
            }
            ViewerAction::Deselect => self.deselect(),
            ViewerAction::SelectNext => self.step_selection(1),
            ViewerAction::SelectPrevious => self.step_selection(-1),
            ViewerAction::Hover(id) => self.selection.hovered = id,
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        self.camera.handle_pointer(event);
    }

    fn select(&mut self, id: FeatureId) {
        self.camera.auto_rotate = self.selection.select(id, self.camera.auto_rotate);
        self.camera.fly_to(&id.definition().framing);
        self.events.push(ViewerEvent::SelectionChanged(Some(id)));
    }

    fn deselect(&mut self) {
        if self.selection.selected.is_none() {
            return;
        }
        if let Some(auto_rotate) = self.selection.deselect() {
            self.camera.auto_rotate = auto_rotate;
        }
        self.events.push(ViewerEvent::SelectionChanged(None));
    }

    fn step_selection(&mut self, step: i32) {
        let count = FeatureId::all().count() as i32;
        let current = self.selection.selected.map_or(if step > 0 { 0 } else { 1 }, |id| i32::from(id.number()));
        let next = (current - 1 + step).rem_euclid(count) + 1;
        if let Some(id) = FeatureId::new(next as u8) {
            self.select(id);
        }
    }

    // ------------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------------

    pub fn frame(&mut self, now: Duration, viewport: Vec2) -> FrameOutput {
        self.poll_loader();

        self.camera.update(now);
        let aspect = if viewport.y > 0.0 { viewport.x / viewport.y } else { 1.0 };
        let camera = self.camera.frame(aspect);

        let morph = self.morph.tick(now);
        self.model.set_morph(morph);

        let items = self.scene_items();
        sync_scene(&mut self.world, &items);
        let draw_items = collect_draw_items(&mut self.world);

        let indicator = overlay::layout(
            self.selection.selected,
            self.selection.hovered,
            &self.model,
            &self.measurements,
        );
        let screen_indicator = indicator.as_ref().and_then(|i| i.project(camera.view_proj, viewport));
        let landmarks = overlay::landmarks(&self.model, indicator.as_ref());
        let screen_landmarks = overlay::project_landmarks(&landmarks, camera.view_proj, viewport);

        FrameOutput { camera, draw_items, indicator, screen_indicator, landmarks, screen_landmarks }
    }

    fn poll_loader(&mut self) {
        let Some(result) = self.loader.poll() else {
            return;
        };
        match result {
            Ok(mesh) => {
                log::info!(
                    "Asset loaded: {} sub-meshes, {} triangles",
                    mesh.sub_meshes.len(),
                    mesh.triangle_count()
                );
                self.model.set_loaded_mesh(mesh);
                self.set_source(ModelSource::Asset);
            }
            Err(e) => {
                log::warn!("Asset load failed: {}", e);
                self.fall_back();
            }
        }
    }

    fn fall_back(&mut self) {
        let source = if self.config.asset.procedural_fallback {
            ModelSource::Procedural
        } else {
            ModelSource::Placeholder
        };
        self.set_source(source);
    }

    fn set_source(&mut self, source: ModelSource) {
        if self.source != source {
            log::info!("Showing {}", source.label());
            self.source = source;
            self.events.push(ViewerEvent::ModelSourceChanged(source));
        }
    }

    /// Scene description for the current source, morph and selection.
    pub fn scene_items(&self) -> Vec<SceneItem> {
        let (selected, hovered) = (self.selection.selected, self.selection.hovered);
        let morph = self.model.morph();
        match (self.source, self.model.loaded_mesh()) {
            (ModelSource::Asset, Some(mesh)) => {
                let transform = Transform::from_scale(self.model.loaded_scale());
                mesh.sub_meshes
                    .iter()
                    .enumerate()
                    .map(|(idx, sub)| SceneItem {
                        kind: sub.kind,
                        mesh: MeshRef::SubMesh(idx),
                        transform,
                        style: material_for(sub.kind, morph, selected, hovered, &self.palette),
                    })
                    .collect()
            }
            (ModelSource::Procedural, _) => self.primitives().iter().map(SceneItem::from_primitive).collect(),
            _ => vec![SceneItem::from_primitive(&placeholder(&self.palette))],
        }
    }

    /// Procedural parts for the current morph and selection. Also drives the flat diagram.
    pub fn primitives(&self) -> Vec<Primitive> {
        self.model.parts(self.selection.selected, self.selection.hovered, &self.palette)
    }

    // ------------------------------------------------------------------------
    // Outward
    // ------------------------------------------------------------------------

    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            morph: self.model.morph(),
            morph_target: self.morph.target(),
            morph_animating: self.morph.is_animating(),
            pitch: self.camera.pitch(),
            yaw: self.camera.yaw(),
            distance: self.camera.distance(),
            zoom_fraction: self.camera.zoom_fraction(),
            auto_rotate: self.camera.auto_rotate,
            selected: self.selection.selected,
            hovered: self.selection.hovered,
            source: self.source,
            load_state: self.loader.state(),
            predicted: self.predicted,
        }
    }

    pub fn model(&self) -> &MandibleModel {
        &self.model
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetConfig;
    use crate::engine::builder::PartKind;
    use std::path::PathBuf;
    use std::time::Instant;

    const VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

    fn id(n: u8) -> FeatureId {
        FeatureId::new(n).unwrap()
    }

    fn procedural_viewer() -> Viewer {
        let config = ViewerConfig {
            asset: AssetConfig { path: None, procedural_fallback: true },
            ..Default::default()
        };
        let mut viewer = Viewer::new(config, Measurements::sample(), None);
        viewer.start(Duration::ZERO);
        viewer
    }

    fn settle(viewer: &mut Viewer, from: Duration) -> Duration {
        let mut now = from;
        for _ in 0..400 {
            now += Duration::from_millis(16);
            viewer.frame(now, VIEWPORT);
        }
        now
    }

    #[test]
    fn selecting_another_feature_keeps_one_selection() {
        let mut viewer = procedural_viewer();
        viewer.handle_action(ViewerAction::Select(id(4)), Duration::ZERO);
        viewer.handle_action(ViewerAction::Select(id(9)), Duration::ZERO);
        let out = viewer.frame(Duration::from_millis(16), VIEWPORT);

        assert_eq!(viewer.snapshot().selected, Some(id(9)));
        let indicator = out.indicator.unwrap();
        assert_eq!(indicator.id, id(9));
        assert!(indicator.text.contains("120.0"));

        let highlighted: Vec<PartKind> = out
            .draw_items
            .iter()
            .filter(|d| d.style.color == viewer.palette().highlight)
            .map(|d| d.kind)
            .collect();
        assert_eq!(highlighted, vec![PartKind::GonialLeft, PartKind::GonialRight]);

        let events = viewer.drain_events();
        assert!(events.contains(&ViewerEvent::SelectionChanged(Some(id(9)))));
        assert!(viewer.drain_events().is_empty());
    }

    #[test]
    fn deselect_restores_auto_rotate() {
        let mut viewer = procedural_viewer();
        assert!(viewer.snapshot().auto_rotate);
        viewer.handle_action(ViewerAction::Select(id(2)), Duration::ZERO);
        assert!(!viewer.snapshot().auto_rotate);
        viewer.handle_action(ViewerAction::Select(id(5)), Duration::ZERO);
        viewer.handle_action(ViewerAction::Deselect, Duration::ZERO);
        assert!(viewer.snapshot().auto_rotate);
        assert_eq!(viewer.snapshot().selected, None);

        // With auto-rotate off beforehand, deselect leaves it off.
        viewer.handle_action(ViewerAction::ToggleAutoRotate, Duration::ZERO);
        viewer.handle_action(ViewerAction::Select(id(2)), Duration::ZERO);
        viewer.handle_action(ViewerAction::Select(id(2)), Duration::ZERO);
        assert_eq!(viewer.snapshot().selected, None);
        assert!(!viewer.snapshot().auto_rotate);
    }

    #[test]
    fn switching_features_keeps_auto_rotate_turned_back_on() {
        let mut viewer = procedural_viewer();
        viewer.handle_action(ViewerAction::Select(id(2)), Duration::ZERO);
        assert!(!viewer.snapshot().auto_rotate);
        viewer.handle_action(ViewerAction::ToggleAutoRotate, Duration::ZERO);
        assert!(viewer.snapshot().auto_rotate);

        viewer.handle_action(ViewerAction::Select(id(5)), Duration::ZERO);
        assert_eq!(viewer.snapshot().selected, Some(id(5)));
        assert!(viewer.snapshot().auto_rotate);
        viewer.handle_action(ViewerAction::SelectNext, Duration::ZERO);
        assert!(viewer.snapshot().auto_rotate);
    }

    #[test]
    fn failed_load_gives_a_scene_in_the_same_frame() {
        let config = ViewerConfig {
            asset: AssetConfig {
                path: Some(PathBuf::from("no/such/dir/mandible.obj")),
                procedural_fallback: true,
            },
            ..Default::default()
        };
        let mut viewer = Viewer::new(config, Measurements::default(), None);
        viewer.start(Duration::ZERO);

        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let mut now = Duration::ZERO;
        loop {
            now += Duration::from_millis(16);
            let out = viewer.frame(now, VIEWPORT);
            assert!(!out.draw_items.is_empty());
            if viewer.snapshot().source != ModelSource::Loading {
                assert_eq!(viewer.snapshot().source, ModelSource::Procedural);
                assert_eq!(out.draw_items.len(), PartKind::PROCEDURAL.len());
                break;
            }
            assert_eq!(out.draw_items.len(), 1, "placeholder while loading");
            assert!(Instant::now() < deadline, "load never resolved");
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert_eq!(viewer.snapshot().load_state, LoadState::Failed);
    }

    #[test]
    fn disabled_fallback_keeps_placeholder() {
        let config = ViewerConfig {
            asset: AssetConfig { path: None, procedural_fallback: false },
            ..Default::default()
        };
        let mut viewer = Viewer::new(config, Measurements::default(), None);
        viewer.start(Duration::ZERO);
        let out = viewer.frame(Duration::from_millis(16), VIEWPORT);
        assert_eq!(viewer.snapshot().source, ModelSource::Placeholder);
        assert_eq!(out.draw_items.len(), 1);
        assert_eq!(out.draw_items[0].kind, PartKind::Whole);
    }

    #[test]
    fn morph_toggle_runs_over_wall_clock() {
        let mut viewer = procedural_viewer();
        let start = Duration::from_secs(1);
        viewer.handle_action(ViewerAction::ToggleMorph, start);
        viewer.frame(start + Duration::from_millis(1_500), VIEWPORT);
        let mid = viewer.snapshot().morph;
        assert!(mid > 0.5 && mid < 1.0, "ease-out should be past halfway: {mid}");
        viewer.frame(start + Duration::from_secs(3), VIEWPORT);
        assert_eq!(viewer.snapshot().morph, 1.0);
        assert!(!viewer.snapshot().morph_animating);
    }

    #[test]
    fn selection_flies_the_camera_to_the_framing() {
        let mut viewer = procedural_viewer();
        let now = settle(&mut viewer, Duration::ZERO);
        viewer.handle_action(ViewerAction::Select(id(9)), now);
        settle(&mut viewer, now);
        let framing = id(9).definition().framing;
        let snap = viewer.snapshot();
        assert!((snap.distance - framing.distance).abs() < 1e-3);
        assert!((snap.pitch - framing.pitch).abs() < 1e-3);
    }

    #[test]
    fn male_prediction_starts_male_typical() {
        let response = PredictionResponse::from_json(
            r#"{"success": true, "prediction": {"gender": "M", "confidence": 91.0}}"#,
        )
        .unwrap();
        let viewer = Viewer::new(ViewerConfig::default(), Measurements::default(), Some(&response));
        let snap = viewer.snapshot();
        assert_eq!(snap.morph, 1.0);
        assert_eq!(snap.predicted, Some(Gender::Male));
        assert_eq!(viewer.palette().highlight, Palette::for_prediction(Some(Gender::Male)).highlight);
    }

    #[test]
    fn next_and_previous_wrap_around() {
        let mut viewer = procedural_viewer();
        viewer.handle_action(ViewerAction::SelectPrevious, Duration::ZERO);
        assert_eq!(viewer.snapshot().selected, Some(id(15)));
        viewer.handle_action(ViewerAction::SelectNext, Duration::ZERO);
        assert_eq!(viewer.snapshot().selected, Some(id(1)));
        viewer.handle_action(ViewerAction::SelectNext, Duration::ZERO);
        assert_eq!(viewer.snapshot().selected, Some(id(2)));
    }

    #[test]
    fn clicking_a_landmark_dot_selects_its_feature() {
        let mut viewer = procedural_viewer();
        let now = settle(&mut viewer, Duration::ZERO);
        let out = viewer.frame(now, VIEWPORT);
        assert_eq!(out.screen_landmarks.len(), 15);

        let target = out.screen_landmarks.iter().find(|l| l.id == id(2)).unwrap().position;
        let picked = overlay::pick(&out.screen_landmarks, target, overlay::PICK_RADIUS).unwrap();
        viewer.handle_action(ViewerAction::Select(picked), now);
        let out = viewer.frame(now + Duration::from_millis(16), VIEWPORT);
        assert_eq!(viewer.snapshot().selected, Some(picked));

        // The selected feature's span is pickable ahead of the anchors.
        let span = out.indicator.unwrap().measurement.len();
        assert_eq!(out.landmarks.len(), 15 + span);
        assert!(out.landmarks[..span].iter().all(|l| l.id == picked));
    }

    #[test]
    fn hover_shows_thin_indicator_until_selected() {
        let mut viewer = procedural_viewer();
        viewer.handle_action(ViewerAction::Hover(Some(id(3))), Duration::ZERO);
        let out = viewer.frame(Duration::from_millis(16), VIEWPORT);
        assert_eq!(out.indicator.map(|i| i.emphasis), Some(overlay::Emphasis::Hovered));
        viewer.handle_action(ViewerAction::Hover(None), Duration::ZERO);
        assert!(viewer.frame(Duration::from_millis(32), VIEWPORT).indicator.is_none());
    }
}
