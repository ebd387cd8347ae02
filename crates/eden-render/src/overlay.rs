//! Immediate-mode overlay panels backed by egui.
//!
//! Widgets are declared one call at a time during a frame and replayed into
//! `egui::Window`s at end-frame. Whatever the user did to a widget (dragged
//! a value, clicked a button) is handed back by the same widget's call on
//! the next frame.

use std::collections::HashMap;

use egui::epaint::ClippedPrimitive;
use egui::{Context, PlatformOutput, Pos2, RawInput, Rect, TexturesDelta, Vec2};

/// Panel that collects widgets declared outside any `begin_panel`.
pub const DEFAULT_PANEL: &str = "Debug";

/// One declared widget.
#[derive(Clone, Debug, PartialEq)]
pub enum Widget {
    Text(String),
    TextFloat { label: String, value: f32 },
    DragFloat { label: String, value: f32, speed: f32 },
    DragFloat3 { label: String, value: [f32; 3], speed: f32 },
    Button(String),
    Separator,
}

impl Widget {
    fn label(&self) -> Option<&str> {
        match self {
            Self::DragFloat { label, .. } | Self::DragFloat3 { label, .. } => Some(label),
            Self::Button(label) => Some(label),
            _ => None,
        }
    }
}

/// Widgets declared for one panel this frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PanelDecl {
    pub name: String,
    pub widgets: Vec<Widget>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Feedback {
    Float(f32),
    Float3([f32; 3]),
    Clicked,
}

type WidgetKey = (String, String);

/// Tessellated overlay output, ready for egui-ash-renderer.
pub struct OverlayFrame {
    pub primitives: Vec<ClippedPrimitive>,
    pub textures_delta: TexturesDelta,
    pub pixels_per_point: f32,
}

/// Per-frame panel declarations plus the egui context that draws them.
///
/// Window input arrives as a whole [`RawInput`] from the windowing layer
/// (egui-winit); cursor and clipboard requests go back the same way through
/// [`Overlay::take_platform_output`].
#[derive(Default)]
pub struct Overlay {
    ctx: Context,
    panels: Vec<PanelDecl>,
    open: Option<usize>,
    feedback: HashMap<WidgetKey, Feedback>,
    input: Option<RawInput>,
    platform_output: Option<PlatformOutput>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The egui context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Panels declared so far this frame.
    pub fn panels(&self) -> &[PanelDecl] {
        &self.panels
    }

    /// Whether the pointer is over an overlay window.
    pub fn wants_pointer_input(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    /// Input for the next `run`. Replaces input that was never consumed.
    pub fn set_input(&mut self, input: RawInput) {
        self.input = Some(input);
    }

    /// Platform requests (cursor icon, clipboard) from the last `run`.
    pub fn take_platform_output(&mut self) -> Option<PlatformOutput> {
        self.platform_output.take()
    }

    /// Open a panel. Returns false if a panel with this name was already
    /// begun this frame; widgets then land in the previously open panel or
    /// the default one.
    pub fn begin_panel(&mut self, name: &str) -> bool {
        if self.panels.iter().any(|p| p.name == name) {
            return false;
        }
        self.panels.push(PanelDecl {
            name: name.to_string(),
            widgets: Vec::new(),
        });
        self.open = Some(self.panels.len() - 1);
        true
    }

    pub fn end_panel(&mut self) {
        self.open = None;
    }

    pub fn text(&mut self, text: &str) {
        self.declare(Widget::Text(text.to_string()));
    }

    pub fn text_float(&mut self, label: &str, value: f32) {
        self.declare(Widget::TextFloat {
            label: label.to_string(),
            value,
        });
    }

    /// Draggable scalar. Returns the value edited last frame, or `value`.
    pub fn drag_float(&mut self, label: &str, value: f32, speed: f32) -> f32 {
        let key = self.declare(Widget::DragFloat {
            label: label.to_string(),
            value,
            speed,
        });
        match key.and_then(|k| self.feedback.remove(&k)) {
            Some(Feedback::Float(edited)) => edited,
            _ => value,
        }
    }

    /// Draggable vector. Writes last frame's edit into `value` and returns
    /// true when there was one.
    pub fn drag_float3(&mut self, label: &str, value: &mut [f32; 3], speed: f32) -> bool {
        let key = self.declare(Widget::DragFloat3 {
            label: label.to_string(),
            value: *value,
            speed,
        });
        match key.and_then(|k| self.feedback.remove(&k)) {
            Some(Feedback::Float3(edited)) => {
                *value = edited;
                true
            }
            _ => false,
        }
    }

    /// Button. Returns true once after it was clicked.
    pub fn button(&mut self, label: &str) -> bool {
        let key = self.declare(Widget::Button(label.to_string()));
        matches!(
            key.and_then(|k| self.feedback.remove(&k)),
            Some(Feedback::Clicked)
        )
    }

    pub fn separator(&mut self) {
        self.declare(Widget::Separator);
    }

    /// Drop this frame's declarations without drawing them.
    pub fn discard_frame(&mut self) {
        self.panels.clear();
        self.open = None;
    }

    fn declare(&mut self, widget: Widget) -> Option<WidgetKey> {
        let index = match self.open {
            Some(index) => index,
            None => self.default_panel(),
        };
        let panel = &mut self.panels[index];
        let key = widget
            .label()
            .map(|label| (panel.name.clone(), label.to_string()));
        panel.widgets.push(widget);
        key
    }

    fn default_panel(&mut self) -> usize {
        if let Some(index) = self.panels.iter().position(|p| p.name == DEFAULT_PANEL) {
            return index;
        }
        self.panels.push(PanelDecl {
            name: DEFAULT_PANEL.to_string(),
            widgets: Vec::new(),
        });
        self.panels.len() - 1
    }

    /// Replay this frame's panels through egui, collect interactions for
    /// the next frame and tessellate the result. Open panels are closed.
    ///
    /// Without input from [`Overlay::set_input`] the screen is `width`×`height`
    /// pixels at one pixel per point and no events happened.
    pub fn run(&mut self, width: u32, height: u32) -> OverlayFrame {
        self.open = None;
        let panels = std::mem::take(&mut self.panels);
        let raw_input = self.input.take().unwrap_or_else(|| RawInput {
            screen_rect: Some(Rect::from_min_size(
                Pos2::ZERO,
                Vec2::new(width as f32, height as f32),
            )),
            ..Default::default()
        });

        let feedback = &mut self.feedback;
        feedback.clear();
        let output = self.ctx.run(raw_input, |ctx| {
            for panel in &panels {
                egui::Window::new(panel.name.as_str()).show(ctx, |ui| {
                    for widget in &panel.widgets {
                        show_widget(ui, &panel.name, widget, feedback);
                    }
                });
            }
        });

        self.platform_output = Some(output.platform_output);
        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        OverlayFrame {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        }
    }
}

fn show_widget(
    ui: &mut egui::Ui,
    panel: &str,
    widget: &Widget,
    feedback: &mut HashMap<WidgetKey, Feedback>,
) {
    let key = |label: &str| (panel.to_string(), label.to_string());
    match widget {
        Widget::Text(text) => {
            ui.label(text.as_str());
        }
        Widget::TextFloat { label, value } => {
            ui.label(format_text_float(label, *value));
        }
        Widget::DragFloat {
            label,
            value,
            speed,
        } => {
            let mut edited = *value;
            let changed = ui
                .horizontal(|ui| {
                    ui.label(label.as_str());
                    ui.add(egui::DragValue::new(&mut edited).speed(*speed))
                        .changed()
                })
                .inner;
            if changed {
                feedback.insert(key(label), Feedback::Float(edited));
            }
        }
        Widget::DragFloat3 {
            label,
            value,
            speed,
        } => {
            let mut edited = *value;
            let changed = ui
                .horizontal(|ui| {
                    ui.label(label.as_str());
                    let mut changed = false;
                    for component in edited.iter_mut() {
                        changed |= ui
                            .add(egui::DragValue::new(component).speed(*speed))
                            .changed();
                    }
                    changed
                })
                .inner;
            if changed {
                feedback.insert(key(label), Feedback::Float3(edited));
            }
        }
        Widget::Button(label) => {
            if ui.button(label.as_str()).clicked() {
                feedback.insert(key(label), Feedback::Clicked);
            }
        }
        Widget::Separator => {
            ui.separator();
        }
    }
}

/// "label: value" with three decimals.
pub fn format_text_float(label: &str, value: f32) -> String {
    format!("{label}: {value:.3}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_panel_is_rejected() {
        let mut overlay = Overlay::new();
        assert!(overlay.begin_panel("Scene"));
        overlay.end_panel();
        assert!(!overlay.begin_panel("Scene"));
        assert!(overlay.begin_panel("Camera"));
        assert_eq!(overlay.panels().len(), 2);
    }

    #[test]
    fn loose_widgets_go_to_default_panel() {
        let mut overlay = Overlay::new();
        overlay.text("hello");
        overlay.separator();
        assert_eq!(overlay.panels().len(), 1);
        assert_eq!(overlay.panels()[0].name, DEFAULT_PANEL);
        assert_eq!(overlay.panels()[0].widgets.len(), 2);
    }

    #[test]
    fn widgets_follow_the_open_panel() {
        let mut overlay = Overlay::new();
        overlay.begin_panel("Tools");
        overlay.text_float("fps", 60.0);
        overlay.end_panel();
        overlay.text("outside");
        assert_eq!(overlay.panels()[0].widgets.len(), 1);
        assert_eq!(overlay.panels()[1].name, DEFAULT_PANEL);
    }

    #[test]
    fn untouched_widgets_return_inputs() {
        let mut overlay = Overlay::new();
        overlay.begin_panel("Tools");
        assert_eq!(overlay.drag_float("speed", 2.5, 0.1), 2.5);
        let mut v = [1.0, 2.0, 3.0];
        assert!(!overlay.drag_float3("pos", &mut v, 0.1));
        assert_eq!(v, [1.0, 2.0, 3.0]);
        assert!(!overlay.button("reset"));
    }

    #[test]
    fn feedback_is_returned_once() {
        let mut overlay = Overlay::new();
        let key = |label: &str| ("Tools".to_string(), label.to_string());
        overlay.feedback.insert(key("speed"), Feedback::Float(7.0));
        overlay
            .feedback
            .insert(key("pos"), Feedback::Float3([4.0, 5.0, 6.0]));
        overlay.feedback.insert(key("reset"), Feedback::Clicked);

        overlay.begin_panel("Tools");
        assert_eq!(overlay.drag_float("speed", 1.0, 0.1), 7.0);
        let mut v = [0.0; 3];
        assert!(overlay.drag_float3("pos", &mut v, 0.1));
        assert_eq!(v, [4.0, 5.0, 6.0]);
        assert!(overlay.button("reset"));
        assert!(!overlay.button("reset"));
    }

    #[test]
    fn feedback_is_keyed_by_panel() {
        let mut overlay = Overlay::new();
        overlay
            .feedback
            .insert(("A".to_string(), "go".to_string()), Feedback::Clicked);
        overlay.begin_panel("B");
        assert!(!overlay.button("go"));
    }

    #[test]
    fn run_consumes_declarations() {
        let mut overlay = Overlay::new();
        overlay.begin_panel("Stats");
        overlay.text("frame");
        overlay.button("step");
        // left open on purpose
        let frame = overlay.run(800, 600);
        // the font atlas arrives with the first frame
        assert!(!frame.textures_delta.set.is_empty());
        assert!(overlay.panels().is_empty());
        assert!(overlay.begin_panel("Stats"));
    }

    #[test]
    fn supplied_input_sets_the_screen() {
        let mut overlay = Overlay::new();
        overlay.set_input(RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 300.0))),
            ..Default::default()
        });
        overlay.run(800, 600);
        assert_eq!(overlay.context().screen_rect().width(), 400.0);

        // input is consumed by the frame that used it
        overlay.run(800, 600);
        assert_eq!(overlay.context().screen_rect().width(), 800.0);
    }

    #[test]
    fn platform_output_is_taken_once() {
        let mut overlay = Overlay::new();
        assert!(overlay.take_platform_output().is_none());
        overlay.run(800, 600);
        assert!(overlay.take_platform_output().is_some());
        assert!(overlay.take_platform_output().is_none());
    }

    #[test]
    fn discarded_frame_allows_new_panels() {
        let mut overlay = Overlay::new();
        overlay.begin_panel("Scene");
        overlay.discard_frame();
        assert!(overlay.panels().is_empty());
        assert!(overlay.begin_panel("Scene"));
    }

    #[test]
    fn text_float_uses_three_decimals() {
        assert_eq!(format_text_float("x", 1.5), "x: 1.500");
        assert_eq!(format_text_float("fps", 59.99999), "fps: 60.000");
    }
}
