//! Recording doubles for driving an `ImagePlugin` without a browser.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use yuma_image_plugin::{
    Annotation, AnnotationHost, AnnotationViewer, Components, EventBroker, Geometry, HostEvent,
    HostHandler, HostTopic, ImageInfo, ImagePlugin, Offset, Overlay, PageSurface, PluginConfig,
    Point, PositionHint, SelectionController, Shape, Subscription,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Default)]
pub struct RecordingOverlay {
    pub edit_visible: Cell<bool>,
    pub view_opacity: Cell<f32>,
    pub hint_opacity: Cell<f32>,
    pub hint: RefCell<String>,
    pub mounts: Cell<usize>,
}

impl Overlay for RecordingOverlay {
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

pub struct RecordingPage {
    pub offset: Offset,
    pub image_offset: Cell<Offset>,
    pub scroll_y: Cell<f64>,
    pub overlay: Rc<RecordingOverlay>,
}

impl RecordingPage {
    pub fn new(left: f64, top: f64) -> Rc<Self> {
        Rc::new(Self {
            offset: Offset::new(left, top),
            image_offset: Cell::new(Offset::new(left, top)),
            scroll_y: Cell::new(0.0),
            overlay: Rc::new(RecordingOverlay::default()),
        })
    }
}

impl PageSurface for RecordingPage {
    fn region_offset(&self) -> Offset {
        self.offset
    }

    fn image_offset(&self) -> Offset {
        self.image_offset.get()
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    fn mount_overlay(&self, _image: &ImageInfo, hint_message: &str) -> Rc<dyn Overlay> {
        self.overlay.mounts.set(self.overlay.mounts.get() + 1);
        self.overlay.hint.replace(hint_message.to_owned());
        self.overlay.edit_visible.set(false);
        Rc::clone(&self.overlay) as Rc<dyn Overlay>
    }
}

#[derive(Default)]
pub struct RecordingSelector {
    pub calls: RefCell<Vec<String>>,
    pub active: Cell<bool>,
}

impl SelectionController for RecordingSelector {
    fn start_selection(&self, x: f64, y: f64) {
        self.active.set(true);
        self.calls.borrow_mut().push(format!("start {x} {y}"));
    }

    fn stop_selection(&self) {
        self.active.set(false);
        self.calls.borrow_mut().push("stop".to_owned());
    }

    fn is_selecting(&self) -> bool {
        self.active.get()
    }
}

#[derive(Default)]
pub struct RecordingViewer {
    pub calls: RefCell<Vec<String>>,
    pub shown: RefCell<Vec<Annotation>>,
}

impl RecordingViewer {
    pub fn adds(&self) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with("add")).count()
    }
}

impl AnnotationViewer for RecordingViewer {
    fn add_annotation(&self, annotation: &Annotation) {
        self.calls.borrow_mut().push(format!("add {}", annotation.text));
        let mut shown = self.shown.borrow_mut();
        if !shown.iter().any(|a| a.same_identity(annotation)) {
            shown.push(annotation.clone());
        }
    }

    fn remove_annotation(&self, annotation: &Annotation) {
        self.calls.borrow_mut().push(format!("remove {}", annotation.text));
        self.shown.borrow_mut().retain(|a| !a.same_identity(annotation));
    }

    fn annotations(&self) -> Vec<Annotation> {
        self.shown.borrow().clone()
    }
}

pub struct Fixture {
    pub plugin: ImagePlugin,
    pub page: Rc<RecordingPage>,
    pub selector: Rc<RecordingSelector>,
    pub viewer: Rc<RecordingViewer>,
}

/// Attach a plugin with recording selector and viewer.
pub fn attach(host: Rc<dyn AnnotationHost>, resource_id: &str, page: Rc<RecordingPage>) -> Fixture {
    let selector = Rc::new(RecordingSelector::default());
    let viewer = Rc::new(RecordingViewer::default());
    let plugin = ImagePlugin::with_components(
        ImageInfo::new(resource_id, 640, 480),
        page.clone(),
        host,
        PluginConfig::default(),
        |_, _| Components {
            selector: selector.clone(),
            viewer: viewer.clone(),
        },
    );
    Fixture {
        plugin,
        page,
        selector,
        viewer,
    }
}

pub fn annotation(target: &str, text: &str, geometry: Geometry) -> Annotation {
    let mut annotation = Annotation::draft(target, Shape::rect(geometry));
    annotation.text = text.to_owned();
    annotation
}

/// Host whose lifecycle events are emitted by the test and whose display
/// calls are recorded in order.
#[derive(Default)]
pub struct ScriptedHost {
    broker: EventBroker<HostEvent>,
    pub calls: RefCell<Vec<String>>,
}

impl ScriptedHost {
    pub fn emit(&self, event: HostEvent) -> usize {
        self.broker.publish(event)
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl AnnotationHost for ScriptedHost {
    fn subscribe(&self, topic: HostTopic, handler: HostHandler) -> Subscription {
        self.broker.subscribe(topic, move |event| handler(event))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.broker.unsubscribe(subscription);
    }

    fn before_annotation_created(&self, annotation: &Annotation) {
        self.record(format!("before {}", annotation.target));
    }

    fn show_editor(&self, annotation: &Annotation, hint: PositionHint) {
        self.record(format!("show_editor {} {} {}", annotation.target, hint.left, hint.top));
    }

    fn reveal_editor(&self) {
        self.record("reveal_editor".to_owned());
    }

    fn set_editor_position(&self, position: Point) {
        self.record(format!("editor_at {} {}", position.x, position.y));
    }

    fn show_viewer(&self, annotations: &[Annotation], hint: PositionHint) {
        self.record(format!("show_viewer {} {} {}", annotations.len(), hint.left, hint.top));
    }

    fn set_viewer_position(&self, position: Point) {
        self.record(format!("viewer_at {} {}", position.x, position.y));
    }

    fn start_viewer_hide_timer(&self) {
        self.record("start_timer".to_owned());
    }

    fn clear_viewer_hide_timer(&self) {
        self.record("clear_timer".to_owned());
    }
}
