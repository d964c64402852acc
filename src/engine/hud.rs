// egui controls panel, landmark label overlay and flat diagram.
// The HUD never mutates viewer state; it returns the actions the user asked for.
// Landmark dots are picked here too, so panel hover and dot hover resolve to
// one Hover action per frame.

use egui::epaint::Shadow;

use super::builder::ColorStyle;
use super::catalog::{features, FeatureId};
use super::diagram::{Diagram, DiagramTransform, Shape2D};
use super::overlay::{pick, Emphasis, Landmark, ScreenIndicator, PICK_RADIUS};
use super::viewer::{ViewerAction, ViewerSnapshot};
use crate::prediction::{Gender, Measurements};

const PANEL_WIDTH: f32 = 270.0;
const DIAGRAM_MARGIN: f32 = 40.0;
const DOT_RADIUS: f32 = 3.5;

pub struct FrameStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub entity_count: usize,
    pub draw_calls: u32,
    pub resolution: (u32, u32),
}

/// Everything the HUD draws for one frame.
pub struct HudFrame<'a> {
    pub snapshot: &'a ViewerSnapshot,
    pub measurements: &'a Measurements,
    /// Indicator in physical pixels (3D mode).
    pub indicator: Option<&'a ScreenIndicator>,
    /// Landmark dots in physical pixels (3D mode).
    pub landmarks: &'a [Landmark<glam::Vec2>],
    /// Front-view diagram (flat mode). When present it fills the central area.
    pub diagram: Option<&'a Diagram>,
    pub stats: Option<&'a FrameStats>,
}

pub struct Hud {
    pub show_stats: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Hud {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        // Style: dark, semi-transparent panel over the model
        let mut visuals = egui::Visuals::dark();
        visuals.panel_fill = egui::Color32::from_rgba_premultiplied(12, 14, 20, 225);
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 200);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        egui_ctx.set_visuals(visuals);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            show_stats: false,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_stats(&mut self) {
        self.show_stats = !self.show_stats;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Run one egui frame and paint it over `view`. Returns the requested actions.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        frame: &HudFrame<'_>,
    ) -> Vec<ViewerAction> {
        let raw_input = self.egui_state.take_egui_input(window);
        let points_per_pixel = 1.0 / screen_descriptor.pixels_per_point.max(1e-3);
        let show_stats = self.show_stats;
        let mut actions = Vec::new();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            let panel_hover = controls_panel(ctx, frame, &mut actions);

            let (dot_hover, dot_clicked) = if let Some(diagram) = frame.diagram {
                egui::CentralPanel::default()
                    .frame(egui::Frame::none().fill(egui::Color32::from_rgb(20, 22, 30)))
                    .show(ctx, |ui| {
                        let rect = ui.available_rect_before_wrap();
                        let dots = draw_diagram(ui.painter(), rect, diagram, &mut actions);
                        pointed_landmark(ctx, &dots, PickSurface::Diagram(rect))
                    })
                    .inner
            } else {
                let layer = egui::LayerId::new(egui::Order::Background, egui::Id::new("indicator"));
                let painter = ctx.layer_painter(layer);
                let dots: Vec<_> = frame
                    .landmarks
                    .iter()
                    .map(|l| Landmark { id: l.id, position: l.position * points_per_pixel })
                    .collect();
                paint_dots(&painter, &dots, |p| egui::pos2(p.x, p.y));
                if let Some(indicator) = frame.indicator {
                    draw_indicator(ctx, &painter, indicator, points_per_pixel, &mut actions);
                }
                pointed_landmark(ctx, &dots, PickSurface::Viewport)
            };

            if let (true, Some(id)) = (dot_clicked, dot_hover) {
                actions.push(ViewerAction::Select(id));
            }
            let hovered_now = panel_hover.or(dot_hover);
            if hovered_now != frame.snapshot.hovered {
                actions.push(ViewerAction::Hover(hovered_now));
            }

            if let (true, Some(stats)) = (show_stats, frame.stats) {
                stats_area(ctx, stats);
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        actions
    }
}

fn color32(rgb: [f32; 3], alpha: f32) -> egui::Color32 {
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]), to_u8(alpha))
}

fn style_color(style: &ColorStyle) -> egui::Color32 {
    color32(style.color, style.opacity)
}

// ── Controls panel ───────────────────────────────────────────────────────────

/// Returns the feature list entry under the pointer.
fn controls_panel(ctx: &egui::Context, frame: &HudFrame<'_>, actions: &mut Vec<ViewerAction>) -> Option<FeatureId> {
    let snap = frame.snapshot;
    let mut hovered_now = None;
    egui::SidePanel::left("controls")
        .resizable(false)
        .exact_width(PANEL_WIDTH)
        .show(ctx, |ui| {
            ui.heading("Mandible Morph");
            ui.label(format!("Showing: {}", snap.source.label()));
            if let Some(gender) = snap.predicted {
                let text = match gender {
                    Gender::Male => "Prediction: male",
                    Gender::Female => "Prediction: female",
                };
                ui.label(text);
            }
            ui.separator();

            ui.label(format!(
                "Morph: {:.0}% male-typical{}",
                snap.morph * 100.0,
                if snap.morph_animating { " (animating)" } else { "" }
            ));
            ui.add(egui::ProgressBar::new(snap.morph).desired_width(PANEL_WIDTH - 24.0));
            let morph_label = if snap.morph_target >= 0.5 { "Show female-typical" } else { "Show male-typical" };
            if ui.button(morph_label).clicked() {
                actions.push(ViewerAction::ToggleMorph);
            }

            ui.horizontal(|ui| {
                if ui.button("Reset view").clicked() {
                    actions.push(ViewerAction::ResetView);
                }
                if ui.button("Intro").clicked() {
                    actions.push(ViewerAction::ReplayIntro);
                }
                if ui.button("−").on_hover_text("Zoom out").clicked() {
                    actions.push(ViewerAction::ZoomOut);
                }
                if ui.button("+").on_hover_text("Zoom in").clicked() {
                    actions.push(ViewerAction::ZoomIn);
                }
            });
            let mut auto_rotate = snap.auto_rotate;
            if ui.checkbox(&mut auto_rotate, "Auto-rotate").changed() {
                actions.push(ViewerAction::ToggleAutoRotate);
            }
            ui.separator();

            ui.label("Features");
            egui::ScrollArea::vertical().max_height(330.0).show(ui, |ui| {
                for def in features() {
                    let is_selected = snap.selected == Some(def.id);
                    let text = egui::RichText::new(format!("{} {}", def.id, def.display_name))
                        .color(color32(def.color, 1.0));
                    let response = ui.selectable_label(is_selected, text);
                    if response.clicked() {
                        // Clicking the active entry deselects.
                        actions.push(ViewerAction::Select(def.id));
                    }
                    if response.hovered() {
                        hovered_now = Some(def.id);
                    }
                }
            });
            if let Some(id) = snap.selected {
                ui.separator();
                feature_details(ui, id, frame.measurements);
            }

            ui.separator();
            ui.label(format!(
                "Camera: pitch {:.0}°  yaw {:.0}°",
                snap.pitch.to_degrees(),
                snap.yaw.to_degrees()
            ));
            ui.label(format!("Distance {:.2}  zoom {:.0}%", snap.distance, snap.zoom_fraction * 100.0));
        });
    hovered_now
}

fn feature_details(ui: &mut egui::Ui, id: FeatureId, measurements: &Measurements) {
    let def = id.definition();
    ui.label(egui::RichText::new(format!("{} {}", id, def.display_name)).strong().color(color32(def.color, 1.0)));
    ui.label(def.description);
    ui.label(egui::RichText::new(def.note).italics());
    match measurements.get(id.number()) {
        Some(value) => ui.label(format!("Measured: {value}")),
        None => ui.label("Measured: —"),
    };
}

fn stats_area(ctx: &egui::Context, stats: &FrameStats) {
    egui::Area::new(egui::Id::new("frame_stats"))
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                .inner_margin(egui::Margin::same(8.0))
                .rounding(4.0)
                .show(ui, |ui: &mut egui::Ui| {
                    ui.label(format!("FPS: {}", stats.fps));
                    ui.label(format!("Frame: {:.2} ms", stats.frame_time_avg_ms));
                    ui.label(format!("Entities: {}", stats.entity_count));
                    ui.label(format!("Draw calls: {}", stats.draw_calls));
                    ui.label(format!("Resolution: {} x {}", stats.resolution.0, stats.resolution.1));
                });
        });
}

// ── Indicator ────────────────────────────────────────────────────────────────

/// Span + leader + markers on `painter`, label as a clickable area.
fn draw_indicator(
    ctx: &egui::Context,
    painter: &egui::Painter,
    indicator: &ScreenIndicator,
    points_per_pixel: f32,
    actions: &mut Vec<ViewerAction>,
) {
    let to_pos = |v: glam::Vec2| egui::pos2(v.x * points_per_pixel, v.y * points_per_pixel);
    let anchor = to_pos(indicator.anchor);
    let label = to_pos(indicator.label);
    let measurement: Vec<_> = indicator.measurement.iter().map(|p| to_pos(*p)).collect();
    paint_leader(painter, label, anchor, &measurement, indicator.color, indicator.emphasis);
    label_area(ctx, label, &indicator.text, indicator.color, indicator.emphasis, actions);
}

fn paint_leader(
    painter: &egui::Painter,
    label: egui::Pos2,
    anchor: egui::Pos2,
    measurement: &[egui::Pos2],
    color: [f32; 3],
    emphasis: Emphasis,
) {
    let solid = color32(color, 1.0);
    if measurement.len() >= 2 {
        painter.add(egui::Shape::line(
            measurement.to_vec(),
            egui::Stroke::new(emphasis.measurement_width(), solid),
        ));
        for point in measurement {
            painter.circle_filled(*point, emphasis.marker_radius(), solid);
        }
    }
    painter.line_segment([label, anchor], egui::Stroke::new(emphasis.line_width(), solid));
    for point in [label, anchor] {
        painter.circle_filled(point, emphasis.halo_radius(), color32(color, 0.3));
        painter.circle_filled(point, emphasis.marker_radius(), solid);
    }
}

/// One small dot per landmark, in the feature's color.
fn paint_dots(
    painter: &egui::Painter,
    dots: &[Landmark<glam::Vec2>],
    to_pos: impl Fn(glam::Vec2) -> egui::Pos2,
) {
    let outline = egui::Stroke::new(1.0, egui::Color32::from_black_alpha(160));
    for dot in dots {
        painter.circle(to_pos(dot.position), DOT_RADIUS, color32(dot.id.definition().color, 0.85), outline);
    }
}

/// Where landmark picking applies.
enum PickSurface {
    /// 3D mode: anywhere no egui area covers the scene.
    Viewport,
    /// Flat mode: inside the diagram rect, except under the label.
    Diagram(egui::Rect),
}

/// Landmark under the pointer, and whether it was clicked this frame.
/// Nothing is picked while a drag is in progress.
fn pointed_landmark(
    ctx: &egui::Context,
    dots: &[Landmark<glam::Vec2>],
    surface: PickSurface,
) -> (Option<FeatureId>, bool) {
    let (pos, dragging, clicked) =
        ctx.input(|i| (i.pointer.hover_pos(), i.pointer.primary_down(), i.pointer.primary_clicked()));
    let Some(pos) = pos else {
        return (None, false);
    };
    let open = match surface {
        PickSurface::Viewport => !ctx.is_pointer_over_area(),
        PickSurface::Diagram(rect) => {
            rect.contains(pos) && ctx.layer_id_at(pos).map_or(true, |layer| layer.order == egui::Order::Background)
        }
    };
    if dragging || !open {
        return (None, false);
    }
    let hit = pick(dots, glam::Vec2::new(pos.x, pos.y), PICK_RADIUS);
    (hit, clicked && hit.is_some())
}

fn label_area(
    ctx: &egui::Context,
    at: egui::Pos2,
    text: &str,
    color: [f32; 3],
    emphasis: Emphasis,
    actions: &mut Vec<ViewerAction>,
) {
    let solid = color32(color, 1.0);
    egui::Area::new(egui::Id::new("indicator_label"))
        .fixed_pos(at + egui::vec2(8.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 230))
                .stroke(egui::Stroke::new(emphasis.factor().min(2.0), solid))
                .inner_margin(egui::Margin::symmetric(8.0, 4.0))
                .rounding(4.0)
                .show(ui, |ui: &mut egui::Ui| {
                    let response = ui.add(
                        egui::Label::new(egui::RichText::new(text).color(solid).strong()).sense(egui::Sense::click()),
                    );
                    if emphasis == Emphasis::Selected && response.on_hover_text("Click to deselect").clicked() {
                        actions.push(ViewerAction::Deselect);
                    }
                });
        });
}

// ── Flat diagram ─────────────────────────────────────────────────────────────

/// Returns the landmark dots as drawn, in points.
fn draw_diagram(
    painter: &egui::Painter,
    rect: egui::Rect,
    diagram: &Diagram,
    actions: &mut Vec<ViewerAction>,
) -> Vec<Landmark<glam::Vec2>> {
    let origin = glam::Vec2::new(rect.min.x, rect.min.y);
    let size = glam::Vec2::new(rect.width(), rect.height());
    let transform = DiagramTransform::fit(diagram, origin, size, DIAGRAM_MARGIN);
    let to_pos = |p: glam::Vec2| {
        let s = transform.to_screen(p);
        egui::pos2(s.x, s.y)
    };

    let outline = egui::Stroke::new(1.0, egui::Color32::from_black_alpha(120));
    for shape in &diagram.shapes {
        let fill = style_color(&shape.style);
        match shape.shape {
            Shape2D::Circle { center, radius } => {
                painter.circle(to_pos(center), radius * transform.scale, fill, outline);
            }
            Shape2D::Rect { .. } | Shape2D::Triangle { .. } => {
                let points = shape.shape.points().into_iter().map(to_pos).collect();
                painter.add(egui::Shape::convex_polygon(points, fill, outline));
            }
        }
    }

    let dots: Vec<_> = diagram
        .landmarks
        .iter()
        .map(|l| Landmark { id: l.id, position: transform.to_screen(l.position) })
        .collect();
    paint_dots(painter, &dots, |p| egui::pos2(p.x, p.y));

    if let Some(indicator) = &diagram.indicator {
        let label = to_pos(indicator.label);
        let measurement: Vec<_> = indicator.measurement.iter().map(|p| to_pos(*p)).collect();
        paint_leader(painter, label, to_pos(indicator.anchor), &measurement, indicator.color, indicator.emphasis);
        label_area(painter.ctx(), label, &indicator.text, indicator.color, indicator.emphasis, actions);
    }
    dots
}
