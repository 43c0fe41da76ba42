#![warn(clippy::all, rust_2018_idioms)]

//! Image annotation overlay for a JavaScript annotation host.
//!
//! One [`ImagePlugin`] is attached per image. It reconciles the in-page drag
//! selection with the host store's lifecycle callbacks, so that neither side
//! needs to know the other's representation.

pub mod config;
pub mod events;
pub mod host;
pub mod model;
pub mod plugin;
pub mod popup;
pub mod selection;
pub mod surface;
pub mod viewer;

#[cfg(not(target_arch = "wasm32"))]
mod app;
#[cfg(target_arch = "wasm32")]
mod web;

pub use config::{HoverStyle, PluginConfig};
pub use events::{BrokerEvent, Event, EventBroker, EventType, Subscription};
pub use host::{AnnotationHost, HostEvent, HostHandler, HostTopic, MemoryHost};
pub use model::{Annotation, Geometry, Offset, Point, PositionHint, Shape, ShapeKind};
pub use plugin::{Components, ImagePlugin, InteractionState, attach_each};
pub use popup::{Popup, PopupPort};
pub use selection::{DragSelector, SelectionController};
pub use surface::{ImageInfo, Overlay, PageSurface};
pub use viewer::{AnnotationViewer, OverlayViewer};

#[cfg(not(target_arch = "wasm32"))]
pub use app::DemoApp;

#[cfg(not(target_arch = "wasm32"))]
impl DemoApp {
    /// Run the demo host, optionally opening `image` right away.
    pub fn run(
        options: eframe::NativeOptions,
        image: Option<std::path::PathBuf>,
    ) -> Result<(), eframe::Error> {
        eframe::run_native(
            "yuma_image_plugin",
            options,
            Box::new(|cc| Ok(Box::new(DemoApp::new(cc, image)))),
        )
    }
}
