//! Positioning of the host's popups relative to shapes on the image.
//!
//! Shapes live in overlay-local coordinates while the host positions its
//! editor and viewer relative to the annotatable region. Anchors are taken
//! from the image's own page offset; widget positions are made relative to
//! the region offset measured once at construction.

use std::rc::Rc;

use crate::config::PluginConfig;
use crate::host::AnnotationHost;
use crate::model::{Annotation, Geometry, Offset, Point, PositionHint};
use crate::surface::PageSurface;

/// Page coordinate just below and to the right of `geometry` on an image
/// at `image_offset`.
pub fn anchor(geometry: &Geometry, image_offset: Offset, config: &PluginConfig) -> Point {
    Point::new(
        geometry.x + image_offset.left + config.anchor_dx,
        geometry.y + geometry.height + image_offset.top + config.anchor_dy,
    )
}

/// Position of a host widget for a page-space `anchor`, relative to the
/// region at `region_offset`.
pub fn widget_position(anchor: Point, region_offset: Offset, scroll_y: f64) -> Point {
    Point::new(
        anchor.x - region_offset.left,
        anchor.y + scroll_y - region_offset.top,
    )
}

/// Hint given to the host's show primitives before the widget is moved to
/// its final position.
pub fn show_hint(offset: Offset, scroll_y: f64) -> PositionHint {
    PositionHint {
        top: scroll_y - offset.top,
        left: 0.0,
    }
}

/// Popup operations used by the annotation viewer.
pub trait PopupPort {
    /// Show `annotation` at overlay-local `(x, y)`.
    fn show(&self, annotation: &Annotation, x: f64, y: f64);

    fn set_position(&self, x: f64, y: f64);

    fn start_hide_timer(&self);

    fn clear_hide_timer(&self);
}

/// Drives the host viewer on behalf of one image.
///
/// Holds no timer state of its own: dismissal timing stays with the host.
pub struct Popup {
    host: Rc<dyn AnnotationHost>,
    page: Rc<dyn PageSurface>,
    offset: Offset,
    padding: f64,
}

impl Popup {
    pub fn new(
        host: Rc<dyn AnnotationHost>,
        page: Rc<dyn PageSurface>,
        offset: Offset,
        config: &PluginConfig,
    ) -> Self {
        Self {
            host,
            page,
            offset,
            padding: config.anchor_dx,
        }
    }
}

impl PopupPort for Popup {
    fn show(&self, annotation: &Annotation, x: f64, y: f64) {
        let scroll_y = self.page.scroll_y();
        self.host.show_viewer(
            std::slice::from_ref(annotation),
            show_hint(self.offset, scroll_y),
        );

        let image = self.page.image_offset();
        let page_point = Point::new(
            x + image.left + self.padding,
            y + image.top + scroll_y,
        );
        self.host.set_viewer_position(Point::new(
            page_point.x - self.offset.left,
            page_point.y - self.offset.top,
        ));
        self.host.clear_viewer_hide_timer();
    }

    fn set_position(&self, x: f64, y: f64) {
        self.host.set_viewer_position(Point::new(x, y));
    }

    fn start_hide_timer(&self) {
        self.host.start_viewer_hide_timer();
    }

    fn clear_hide_timer(&self) {
        self.host.clear_viewer_hide_timer();
    }
}
