//! Page-side ports: layout measurement and the overlay stacked on an image.

use std::rc::Rc;

use crate::model::Offset;

/// What the plugin needs to know about the image it annotates.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageInfo {
    /// Resource identifier of the image, matched against annotation targets.
    pub resource_id: String,

    /// Intrinsic size. A zero size gives a zero-sized overlay.
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn new(resource_id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            resource_id: resource_id.into(),
            width,
            height,
        }
    }
}

/// The layers stacked over an image: hint, read-only view surface and the
/// hidden edit surface.
pub trait Overlay {
    fn set_edit_visible(&self, visible: bool);

    fn set_view_opacity(&self, opacity: f32);

    fn set_hint_opacity(&self, opacity: f32);
}

/// The page hosting the annotatable region.
pub trait PageSurface {
    /// Page offset of the annotatable region.
    fn region_offset(&self) -> Offset;

    /// Current page offset of the annotated image itself. Anchors are placed
    /// from this, so images deeper in the region get their own popups.
    fn image_offset(&self) -> Offset;

    /// Current vertical scroll of the page.
    fn scroll_y(&self) -> f64;

    /// Replace the image with a positioned container holding the image and
    /// the overlay layers. The edit surface starts hidden and the hint
    /// transparent.
    fn mount_overlay(&self, image: &ImageInfo, hint_message: &str) -> Rc<dyn Overlay>;
}
