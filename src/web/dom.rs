use std::rc::Rc;

use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, Window,
};

use crate::model::{Annotation, Geometry, Offset};
use crate::surface::{ImageInfo, Overlay, PageSurface};
use crate::viewer::{AnnotationViewer, OverlayViewer};

fn create<T: JsCast>(document: &Document, tag: &str, class: &str) -> Result<T, JsValue> {
    let element = document.create_element(tag)?;
    element.set_class_name(class);
    element.dyn_into::<T>().map_err(JsValue::from)
}

pub(super) fn set_style(element: &HtmlElement, property: &str, value: &str) {
    if let Err(e) = element.style().set_property(property, value) {
        log::warn!("failed to set {property}: {e:?}");
    }
}

fn stack(element: &HtmlElement) {
    set_style(element, "position", "absolute");
    set_style(element, "top", "0px");
    set_style(element, "left", "0px");
}

/// Container, hint and the two canvases placed over one image.
pub struct DomOverlay {
    pub layer: HtmlElement,
    pub hint: HtmlElement,
    pub view: HtmlCanvasElement,
    pub edit: HtmlCanvasElement,
}

impl Overlay for DomOverlay {
    fn set_edit_visible(&self, visible: bool) {
        set_style(&self.edit, "display", if visible { "block" } else { "none" });
    }

    fn set_view_opacity(&self, opacity: f32) {
        set_style(&self.view, "opacity", &opacity.to_string());
    }

    fn set_hint_opacity(&self, opacity: f32) {
        set_style(&self.hint, "opacity", &opacity.to_string());
    }
}

/// An image inside the annotatable element of a browser page.
pub struct DomPage {
    window: Window,
    region: Element,
    image: HtmlImageElement,
    overlay: Rc<DomOverlay>,
}

impl DomPage {
    /// Create the overlay elements up front; they are inserted on mount.
    pub fn new(window: Window, region: Element, image: HtmlImageElement) -> Result<Self, JsValue> {
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;
        let overlay = DomOverlay {
            layer: create(&document, "div", "yuma-annotationlayer")?,
            hint: create(&document, "div", "yuma-hint")?,
            view: create(&document, "canvas", "yuma-view-canvas")?,
            edit: create(&document, "canvas", "yuma-edit-canvas")?,
        };
        Ok(Self {
            window,
            region,
            image,
            overlay: Rc::new(overlay),
        })
    }

    pub fn overlay(&self) -> Rc<DomOverlay> {
        Rc::clone(&self.overlay)
    }

    fn page_offset(&self, element: &Element) -> Offset {
        let rect = element.get_bounding_client_rect();
        let scroll_x = self.window.page_x_offset().unwrap_or(0.0);
        let scroll_y = self.window.page_y_offset().unwrap_or(0.0);
        Offset::new(rect.left() + scroll_x, rect.top() + scroll_y)
    }
}

impl PageSurface for DomPage {
    fn region_offset(&self) -> Offset {
        self.page_offset(&self.region)
    }

    fn image_offset(&self) -> Offset {
        self.page_offset(&self.image)
    }

    fn scroll_y(&self) -> f64 {
        self.window.page_y_offset().unwrap_or(0.0)
    }

    fn mount_overlay(&self, image: &ImageInfo, hint_message: &str) -> Rc<dyn Overlay> {
        let overlay = &self.overlay;
        let width = format!("{}px", image.width);
        let height = format!("{}px", image.height);

        set_style(&overlay.layer, "position", "relative");
        set_style(&overlay.layer, "width", &width);
        set_style(&overlay.layer, "height", &height);

        stack(&overlay.hint);
        overlay.hint.set_text_content(Some(hint_message));
        overlay.set_hint_opacity(0.0);

        for canvas in [&overlay.view, &overlay.edit] {
            canvas.set_width(image.width);
            canvas.set_height(image.height);
            stack(canvas);
        }
        overlay.set_edit_visible(false);

        let mounted = self
            .image
            .replace_with_with_node_1(&overlay.layer)
            .and_then(|()| overlay.layer.append_child(&self.image).map(drop))
            .and_then(|()| overlay.layer.append_child(&overlay.hint).map(drop))
            .and_then(|()| overlay.layer.append_child(&overlay.view).map(drop))
            .and_then(|()| overlay.layer.append_child(&overlay.edit).map(drop));
        if let Err(e) = mounted {
            log::error!("failed to mount overlay for {}: {e:?}", image.resource_id);
        }

        Rc::clone(overlay) as Rc<dyn Overlay>
    }
}

fn context(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
}

fn stroke(ctx: &CanvasRenderingContext2d, geometry: &Geometry, color: &str) {
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(2.0);
    ctx.stroke_rect(geometry.x, geometry.y, geometry.width, geometry.height);
}

/// Draw a selection rectangle on the edit canvas, or clear it.
pub fn paint_selection(canvas: &HtmlCanvasElement, geometry: Option<Geometry>) {
    let Some(ctx) = context(canvas) else {
        return;
    };
    ctx.clear_rect(0.0, 0.0, f64::from(canvas.width()), f64::from(canvas.height()));
    if let Some(geometry) = geometry {
        stroke(&ctx, &geometry, "#fff");
    }
}

/// [`OverlayViewer`] that repaints the view canvas whenever it changes.
pub struct CanvasViewer {
    inner: Rc<OverlayViewer>,
    canvas: HtmlCanvasElement,
}

impl CanvasViewer {
    pub fn new(inner: Rc<OverlayViewer>, canvas: HtmlCanvasElement) -> Self {
        Self { inner, canvas }
    }

    pub fn inner(&self) -> &OverlayViewer {
        &self.inner
    }

    pub fn repaint(&self) {
        let Some(ctx) = context(&self.canvas) else {
            return;
        };
        ctx.clear_rect(
            0.0,
            0.0,
            f64::from(self.canvas.width()),
            f64::from(self.canvas.height()),
        );
        let hovered = self.inner.hovered();
        for annotation in self.inner.annotations() {
            let highlight = hovered.as_ref().is_some_and(|h| h.same_identity(&annotation));
            stroke(
                &ctx,
                &annotation.shape.geometry,
                if highlight { "#fff000" } else { "#fff" },
            );
        }
    }
}

impl AnnotationViewer for CanvasViewer {
    fn add_annotation(&self, annotation: &Annotation) {
        self.inner.add_annotation(annotation);
        self.repaint();
    }

    fn remove_annotation(&self, annotation: &Annotation) {
        self.inner.remove_annotation(annotation);
        self.repaint();
    }

    fn annotations(&self) -> Vec<Annotation> {
        self.inner.annotations()
    }
}
