//! The per-image coordinator.
//!
//! An [`ImagePlugin`] binds one image to the shared annotation host. It
//! forwards completed selections to the host as drafts and applies the host's
//! lifecycle callbacks to its own viewer, ignoring annotations that target
//! other images.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::PluginConfig;
use crate::events::{Event, EventBroker, EventType, Subscription};
use crate::host::{AnnotationHost, HostEvent, HostHandler, HostTopic};
use crate::model::{Annotation, Offset, Point, Shape};
use crate::popup::{self, Popup, PopupPort};
use crate::selection::{DragSelector, SelectionController};
use crate::surface::{ImageInfo, Overlay, PageSurface};
use crate::viewer::{AnnotationViewer, OverlayViewer};

/// Where the per-image interaction currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Selecting,
    /// A selection was handed to the host editor and awaits creation.
    PendingCreate,
}

/// Selection and viewer implementations bound to one coordinator.
pub struct Components {
    pub selector: Rc<dyn SelectionController>,
    pub viewer: Rc<dyn AnnotationViewer>,
}

const HOST_TOPICS: [HostTopic; 6] = [
    HostTopic::ViewerEdit,
    HostTopic::ViewerHidden,
    HostTopic::AnnotationCreated,
    HostTopic::AnnotationsLoaded,
    HostTopic::AnnotationDeleted,
    HostTopic::AnnotationEditorHidden,
];

struct Shared {
    image: ImageInfo,
    offset: Offset,
    config: PluginConfig,
    broker: EventBroker<Event>,
    page: Rc<dyn PageSurface>,
    overlay: Rc<dyn Overlay>,
    host: Rc<dyn AnnotationHost>,
    selector: Rc<dyn SelectionController>,
    viewer: Rc<dyn AnnotationViewer>,
    state: Cell<InteractionState>,
}

impl Shared {
    fn owns(&self, annotation: &Annotation) -> bool {
        let owned = annotation.belongs_to(&self.image.resource_id);
        if !owned {
            log::debug!(
                "Ignoring annotation for {} on {}",
                annotation.target,
                self.image.resource_id
            );
        }
        owned
    }

    fn transition(&self, next: InteractionState) {
        let previous = self.state.replace(next);
        if previous != next {
            log::debug!("{}: {previous:?} -> {next:?}", self.image.resource_id);
        }
    }

    fn on_selection_completed(&self, shape: &Shape) {
        let annotation = Annotation::draft(self.image.resource_id.clone(), shape.clone());
        self.transition(InteractionState::PendingCreate);
        self.host.before_annotation_created(&annotation);

        let anchor = popup::anchor(&shape.geometry, self.page.image_offset(), &self.config);
        let scroll_y = self.page.scroll_y();

        // Open at the scroll line first, then move below the shape.
        self.host
            .show_editor(&annotation, popup::show_hint(self.offset, scroll_y));
        self.host
            .set_editor_position(popup::widget_position(anchor, self.offset, scroll_y));
    }

    fn on_selection_canceled(&self) {
        if self.state.get() == InteractionState::Selecting {
            self.overlay.set_edit_visible(false);
            self.transition(InteractionState::Idle);
        }
    }

    fn on_host_event(&self, event: &HostEvent) {
        match event {
            HostEvent::ViewerEdit(annotation) => {
                if self.owns(annotation) {
                    self.reveal_editor_at(annotation);
                }
            }
            HostEvent::ViewerHidden => {
                self.broker.publish(Event::PopupHidden);
            }
            HostEvent::AnnotationCreated(annotation) => {
                // Creation ends any selection on the page.
                self.selector.stop_selection();
                self.overlay.set_edit_visible(false);
                self.transition(InteractionState::Idle);
                if self.owns(annotation) {
                    self.viewer.add_annotation(annotation);
                }
            }
            HostEvent::AnnotationsLoaded(annotations) => {
                for annotation in annotations.iter().filter(|a| self.owns(a)) {
                    self.viewer.add_annotation(annotation);
                }
            }
            HostEvent::AnnotationDeleted(annotation) => {
                if self.owns(annotation) {
                    self.viewer.remove_annotation(annotation);
                }
            }
            HostEvent::AnnotationEditorHidden => {
                self.overlay.set_edit_visible(false);
                self.selector.stop_selection();
                self.transition(InteractionState::Idle);
            }
            HostEvent::BeforeAnnotationCreated(_) | HostEvent::AnnotationEditorShown(_) => {}
        }
    }

    /// Show the host editor below `annotation` without a second
    /// `annotationEditorShown` notification.
    fn reveal_editor_at(&self, annotation: &Annotation) {
        let anchor = popup::anchor(
            &annotation.shape.geometry,
            self.page.image_offset(),
            &self.config,
        );
        let scroll_y = self.page.scroll_y();

        self.host
            .set_editor_position(Point::new(0.0, scroll_y - self.offset.top));
        self.host.reveal_editor();
        self.host
            .set_editor_position(popup::widget_position(anchor, self.offset, scroll_y));
    }
}

/// Coordinator binding one image to the annotation host.
///
/// Dropping the plugin detaches it from the host and its broker.
pub struct ImagePlugin {
    shared: Rc<Shared>,
    broker_subscriptions: Vec<Subscription>,
    host_subscriptions: Vec<Subscription>,
}

impl ImagePlugin {
    /// Attach to `image` with a [`DragSelector`] and an [`OverlayViewer`].
    pub fn new(
        image: ImageInfo,
        page: Rc<dyn PageSurface>,
        host: Rc<dyn AnnotationHost>,
        config: PluginConfig,
    ) -> Self {
        let (width, height) = (image.width, image.height);
        Self::with_components(image, page, host, config, |broker, popup| Components {
            selector: Rc::new(DragSelector::new(broker.clone(), width, height)),
            viewer: OverlayViewer::new(popup, broker.clone()),
        })
    }

    /// Attach to `image`, letting `build` supply the selector and viewer for
    /// the new broker and popup.
    pub fn with_components(
        image: ImageInfo,
        page: Rc<dyn PageSurface>,
        host: Rc<dyn AnnotationHost>,
        config: PluginConfig,
        build: impl FnOnce(&EventBroker<Event>, Rc<dyn PopupPort>) -> Components,
    ) -> Self {
        let offset = page.region_offset();
        let broker = EventBroker::new();
        let overlay = page.mount_overlay(&image, &config.hint_message);
        let popup: Rc<dyn PopupPort> = Rc::new(Popup::new(
            Rc::clone(&host),
            Rc::clone(&page),
            offset,
            &config,
        ));
        let Components { selector, viewer } = build(&broker, popup);

        log::info!(
            "Image plugin attached to {} ({}x{}) at offset ({}, {})",
            image.resource_id,
            image.width,
            image.height,
            offset.left,
            offset.top
        );

        let shared = Rc::new(Shared {
            image,
            offset,
            config,
            broker,
            page,
            overlay,
            host,
            selector,
            viewer,
            state: Cell::new(InteractionState::Idle),
        });

        let mut plugin = Self {
            shared,
            broker_subscriptions: Vec::new(),
            host_subscriptions: Vec::new(),
        };
        plugin.wire();
        plugin
    }

    fn wire(&mut self) {
        let shared = &self.shared;

        let weak = Rc::downgrade(shared);
        self.broker_subscriptions.push(shared.broker.subscribe(
            EventType::SelectionCompleted,
            move |event| {
                if let (Some(shared), Event::SelectionCompleted { shape }) = (weak.upgrade(), event) {
                    shared.on_selection_completed(shape);
                }
            },
        ));

        let weak = Rc::downgrade(shared);
        self.broker_subscriptions.push(shared.broker.subscribe(
            EventType::SelectionCanceled,
            move |_| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_selection_canceled();
                }
            },
        ));

        for topic in HOST_TOPICS {
            let handler = host_handler(Rc::downgrade(shared));
            self.host_subscriptions
                .push(shared.host.subscribe(topic, handler));
        }
    }

    /// Region offset measured when the plugin was attached.
    pub fn offset(&self) -> Offset {
        self.shared.offset
    }

    pub fn state(&self) -> InteractionState {
        self.shared.state.get()
    }

    pub fn broker(&self) -> EventBroker<Event> {
        self.shared.broker.clone()
    }

    pub fn viewer(&self) -> Rc<dyn AnnotationViewer> {
        Rc::clone(&self.shared.viewer)
    }

    /// Pointer entered the overlay container.
    pub fn pointer_entered(&self) {
        let hover = &self.shared.config.hover;
        self.shared.overlay.set_view_opacity(hover.view_opacity_over);
        self.shared.overlay.set_hint_opacity(hover.hint_opacity_over);
        self.shared.broker.publish(Event::MouseOverAnnotatableMedia);
    }

    /// Pointer left the overlay container.
    pub fn pointer_left(&self) {
        let hover = &self.shared.config.hover;
        self.shared.overlay.set_view_opacity(hover.view_opacity_out);
        self.shared.overlay.set_hint_opacity(hover.hint_opacity_out);
        self.shared.broker.publish(Event::MouseOutOfAnnotatableMedia);
    }

    /// Pointer pressed on the view surface at overlay-local `(x, y)`.
    pub fn pointer_down(&self, x: f64, y: f64) {
        self.shared.overlay.set_edit_visible(true);
        self.shared.transition(InteractionState::Selecting);
        self.shared.selector.start_selection(x, y);
    }

    /// Drop every broker and host subscription held by this plugin.
    pub fn detach(&mut self) {
        for subscription in self.broker_subscriptions.drain(..) {
            self.shared.broker.unsubscribe(subscription);
        }
        for subscription in self.host_subscriptions.drain(..) {
            self.shared.host.unsubscribe(subscription);
        }
    }
}

impl Drop for ImagePlugin {
    fn drop(&mut self) {
        self.detach();
    }
}

fn host_handler(weak: Weak<Shared>) -> HostHandler {
    Rc::new(move |event: &HostEvent| {
        if let Some(shared) = weak.upgrade() {
            shared.on_host_event(event);
        }
    })
}

/// Attach one coordinator per image. Images whose attachment fails are
/// logged and skipped so the ones already mounted stay bound.
pub fn attach_each<I, T, E: fmt::Display>(
    images: impl IntoIterator<Item = I>,
    mut attach: impl FnMut(I) -> Result<T, E>,
) -> Vec<T> {
    images
        .into_iter()
        .filter_map(|image| match attach(image) {
            Ok(attached) => Some(attached),
            Err(e) => {
                log::error!("Failed to attach image plugin: {e}");
                None
            }
        })
        .collect()
}
