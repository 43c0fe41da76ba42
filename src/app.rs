use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context as _;
use egui::{Align2, Color32, ColorImage, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, TextureOptions};
use rfd::FileDialog;

use crate::{
    Annotation, AnnotationHost as _, AnnotationViewer as _, Components, DragSelector, ImageInfo,
    ImagePlugin, MemoryHost, Offset, Overlay, OverlayViewer, PageSurface, PluginConfig,
    SelectionController as _,
};

/// Seconds the host viewer stays up after the pointer leaves a shape.
const VIEWER_HIDE_DELAY: f64 = 0.4;

/// Overlay state for the egui canvas, read back when painting.
struct EguiOverlay {
    edit_visible: Cell<bool>,
    view_opacity: Cell<f32>,
    hint_opacity: Cell<f32>,
    hint: RefCell<String>,
}

impl Overlay for EguiOverlay {
    fn set_edit_visible(&self, visible: bool) {
        self.edit_visible.set(visible);
    }

    fn set_view_opacity(&self, opacity: f32) {
        self.view_opacity.set(opacity);
    }

    fn set_hint_opacity(&self, opacity: f32) {
        self.hint_opacity.set(opacity);
    }
}

/// The demo window as a page: the canvas origin is the annotatable region.
struct EguiPage {
    origin: Offset,
    overlay: Rc<EguiOverlay>,
}

impl PageSurface for EguiPage {
    fn region_offset(&self) -> Offset {
        self.origin
    }

    // The image fills the region from its origin.
    fn image_offset(&self) -> Offset {
        self.origin
    }

    // The canvas is not scrollable.
    fn scroll_y(&self) -> f64 {
        0.0
    }

    fn mount_overlay(&self, _image: &ImageInfo, hint_message: &str) -> Rc<dyn Overlay> {
        self.overlay.hint.replace(hint_message.to_owned());
        self.overlay.edit_visible.set(false);
        self.overlay.hint_opacity.set(0.0);
        Rc::clone(&self.overlay) as Rc<dyn Overlay>
    }
}

/// One opened image bound to its coordinator.
struct Session {
    resource_id: String,
    texture: egui::TextureHandle,
    size: egui::Vec2,
    host: Rc<MemoryHost>,
    overlay: Rc<EguiOverlay>,
    plugin: ImagePlugin,
    selector: Rc<DragSelector>,
    viewer: Rc<OverlayViewer>,
    hovering: bool,
    editor_was_visible: bool,
    hide_timer_since: Option<f64>,
}

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct DemoApp {
    image_path: Option<String>,

    config: PluginConfig,

    /// Annotations of every image opened so far, standing in for host storage.
    annotations: Vec<Annotation>,

    #[serde(skip)]
    session: Option<Session>,

    #[serde(skip)]
    editor_text: String,

    #[serde(skip)]
    canvas_origin: Pos2,

    #[serde(skip)]
    pending_path: Option<PathBuf>,

    #[serde(skip)]
    error: Option<String>,
}

impl Default for DemoApp {
    fn default() -> Self {
        Self {
            image_path: None,
            config: PluginConfig::default(),
            annotations: Vec::new(),
            session: None,
            editor_text: String::new(),
            canvas_origin: Pos2::ZERO,
            pending_path: None,
            error: None,
        }
    }
}

impl DemoApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, image: Option<PathBuf>) -> Self {
        let mut this: Self = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };

        this.pending_path = image.or_else(|| this.image_path.clone().map(PathBuf::from));
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        this
    }

    fn open(&mut self, ctx: &egui::Context, path: &Path) {
        self.stash_annotations();
        match self.load_image(ctx, path) {
            Ok(session) => {
                self.image_path = Some(path.to_string_lossy().to_string());
                self.session = Some(session);
                self.error = None;
            }
            Err(e) => {
                log::warn!("{e:#}");
                self.error = Some(format!("{e:#}"));
            }
        }
    }

    fn load_image(&self, ctx: &egui::Context, path: &Path) -> anyhow::Result<Session> {
        let img = image::open(path)
            .with_context(|| format!("failed to open image '{}'", path.display()))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        let color = ColorImage::from_rgba_unmultiplied([w as usize, h as usize], img.as_raw());
        let texture = ctx.load_texture("annotated_image", color, TextureOptions::LINEAR);

        let resource_id = path.to_string_lossy().to_string();
        let overlay = Rc::new(EguiOverlay {
            edit_visible: Cell::new(false),
            view_opacity: Cell::new(self.config.hover.view_opacity_out),
            hint_opacity: Cell::new(0.0),
            hint: RefCell::new(String::new()),
        });
        let page = Rc::new(EguiPage {
            origin: Offset::new(f64::from(self.canvas_origin.x), f64::from(self.canvas_origin.y)),
            overlay: Rc::clone(&overlay),
        });
        let host = Rc::new(MemoryHost::new());

        let mut parts = None;
        let plugin = ImagePlugin::with_components(
            ImageInfo::new(resource_id.clone(), w, h),
            page,
            host.clone(),
            self.config.clone(),
            |broker, popup| {
                let selector = Rc::new(DragSelector::new(broker.clone(), w, h));
                let viewer = OverlayViewer::new(popup, broker.clone());
                parts = Some((Rc::clone(&selector), Rc::clone(&viewer)));
                Components { selector, viewer }
            },
        );
        let (selector, viewer) = parts.context("plugin did not build its components")?;

        host.load(
            self.annotations
                .iter()
                .filter(|a| a.belongs_to(&resource_id))
                .cloned()
                .collect(),
        );

        Ok(Session {
            resource_id,
            texture,
            size: egui::vec2(w as f32, h as f32),
            host,
            overlay,
            plugin,
            selector,
            viewer,
            hovering: false,
            editor_was_visible: false,
            hide_timer_since: None,
        })
    }

    /// Move the current session's annotations back into persisted storage.
    fn stash_annotations(&mut self) {
        if let Some(session) = &self.session {
            self.annotations.retain(|a| !a.belongs_to(&session.resource_id));
            self.annotations.extend(session.host.annotations());
        }
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.session.as_mut() else {
            ui.label("Open an image to start annotating.");
            return;
        };

        let (rect, response) = ui.allocate_exact_size(session.size, Sense::click_and_drag());
        self.canvas_origin = rect.min;
        let to_local = |p: Pos2| (f64::from(p.x - rect.min.x), f64::from(p.y - rect.min.y));

        let hovered = response.hovered();
        if hovered != session.hovering {
            session.hovering = hovered;
            if hovered {
                session.plugin.pointer_entered();
            } else {
                session.plugin.pointer_left();
                session.viewer.pointer_left();
            }
        }

        if session.overlay.edit_visible.get() {
            if let Some(pos) = response.interact_pointer_pos() {
                let (x, y) = to_local(pos);
                session.selector.pointer_move(x, y);
            }
            if response.drag_stopped() {
                if let Some(pos) = ui.input(|i| i.pointer.latest_pos()) {
                    let (x, y) = to_local(pos);
                    session.selector.pointer_up(x, y);
                }
            }
        } else if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ui.input(|i| i.pointer.press_origin()).or(response.interact_pointer_pos());
            if let Some(pos) = origin {
                let (x, y) = to_local(pos);
                session.viewer.pointer_left();
                session.plugin.pointer_down(x, y);
                if let Some(pos) = response.interact_pointer_pos() {
                    let (x, y) = to_local(pos);
                    session.selector.pointer_move(x, y);
                }
            }
        } else if let Some(pos) = response.hover_pos() {
            let (x, y) = to_local(pos);
            session.viewer.pointer_move(x, y);
        }

        let painter = ui.painter_at(rect);
        painter.image(
            session.texture.id(),
            rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );

        let to_screen = |g: &crate::Geometry| {
            Rect::from_min_size(
                rect.min + egui::vec2(g.x as f32, g.y as f32),
                egui::vec2(g.width as f32, g.height as f32),
            )
        };
        let view_alpha = session.overlay.view_opacity.get();
        let hovered_annotation = session.viewer.hovered();
        for annotation in session.viewer.annotations() {
            let highlight = hovered_annotation
                .as_ref()
                .is_some_and(|h| h.same_identity(&annotation));
            let color = if highlight { Color32::YELLOW } else { Color32::WHITE };
            painter.rect_stroke(
                to_screen(&annotation.shape.geometry),
                0.0,
                Stroke::new(2.0, color.gamma_multiply(view_alpha)),
                StrokeKind::Inside,
            );
        }

        if let Some(geometry) = session.selector.current_geometry() {
            painter.rect_stroke(
                to_screen(&geometry),
                0.0,
                Stroke::new(2.0, Color32::LIGHT_BLUE),
                StrokeKind::Inside,
            );
        }

        let hint_alpha = session.overlay.hint_opacity.get();
        if hint_alpha > 0.0 {
            painter.text(
                rect.min + egui::vec2(8.0, 8.0),
                Align2::LEFT_TOP,
                session.overlay.hint.borrow().as_str(),
                FontId::proportional(14.0),
                Color32::WHITE.gamma_multiply(hint_alpha),
            );
        }
    }

    fn host_widgets_ui(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let origin = self.canvas_origin;
        let host = Rc::clone(&session.host);
        let at = |p: crate::Point| origin + egui::vec2(p.x as f32, p.y as f32);

        let editor = host.editor();
        if editor.visible && !session.editor_was_visible {
            self.editor_text = editor.annotation.as_ref().map(|a| a.text.clone()).unwrap_or_default();
        }
        session.editor_was_visible = editor.visible;

        if editor.visible {
            egui::Window::new("Annotation")
                .fixed_pos(at(editor.position))
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.text_edit_multiline(&mut self.editor_text);
                    ui.horizontal(|ui| {
                        if ui.button("Save").clicked() {
                            host.submit_editor(&self.editor_text);
                        }
                        if ui.button("Cancel").clicked() {
                            host.cancel_editor();
                        }
                    });
                });
        }

        let viewer = host.viewer();
        if viewer.visible {
            let popup = egui::Area::new(egui::Id::new("annotation_viewer"))
                .fixed_pos(at(viewer.position))
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        for annotation in &viewer.annotations {
                            ui.label(if annotation.text.is_empty() {
                                "(no text)"
                            } else {
                                annotation.text.as_str()
                            });
                            let Some(id) = annotation.id.as_deref() else {
                                continue;
                            };
                            ui.horizontal(|ui| {
                                if ui.button("Edit").clicked() {
                                    host.edit_from_viewer(id);
                                }
                                if ui.button("Delete").clicked() {
                                    host.delete(id);
                                }
                            });
                        }
                    });
                });
            if popup.response.contains_pointer() {
                host.clear_viewer_hide_timer();
            }
        }

        let now = ctx.input(|i| i.time);
        if host.viewer().hide_timer_armed {
            let since = *session.hide_timer_since.get_or_insert(now);
            if now - since >= VIEWER_HIDE_DELAY {
                host.expire_hide_timer();
                session.hide_timer_since = None;
            } else {
                ctx.request_repaint_after(Duration::from_secs_f64(VIEWER_HIDE_DELAY));
            }
        } else {
            session.hide_timer_since = None;
        }
    }
}

impl eframe::App for DemoApp {
    /// Called by the framework to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.stash_annotations();
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(path) = self.pending_path.take() {
            self.open(ctx, &path);
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open...").clicked() {
                        if let Some(path) = FileDialog::new()
                            .add_filter("Image", &["png", "jpg", "jpeg"])
                            .pick_file()
                        {
                            self.pending_path = Some(path);
                        }
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.add_space(16.0);
                egui::widgets::global_theme_preference_buttons(ui);
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.image_path.as_deref().unwrap_or("(no image)"));
                if let Some(session) = &self.session {
                    ui.separator();
                    ui.label(format!(
                        "{} annotations | {:?}",
                        session.viewer.annotations().len(),
                        session.plugin.state()
                    ));
                    if session.selector.is_selecting() {
                        ui.label("selecting");
                    }
                }
            });
            if let Some(err) = &self.error {
                ui.colored_label(Color32::RED, err);
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas_ui(ui);
        });

        self.host_widgets_ui(ctx);
    }
}
