//! The external annotation host as seen from the image plugin.
//!
//! One host store serves every image on the page, so every coordinator
//! subscribes to the same topics and filters by annotation target.

mod identities;
mod memory;

pub use identities::IdentityCache;
pub use memory::{EditorState, MemoryHost, ViewerState};

use std::rc::Rc;

use crate::events::{BrokerEvent, Subscription};
use crate::model::{Annotation, Point, PositionHint};

/// Lifecycle signals a host emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostTopic {
    BeforeAnnotationCreated,
    AnnotationCreated,
    AnnotationsLoaded,
    AnnotationDeleted,
    AnnotationEditorShown,
    AnnotationEditorHidden,
    /// The viewer's "edit" button.
    ViewerEdit,
    /// The viewer widget was hidden.
    ViewerHidden,
}

impl HostTopic {
    /// Event name used by the JavaScript annotator.
    pub fn name(self) -> &'static str {
        match self {
            Self::BeforeAnnotationCreated => "beforeAnnotationCreated",
            Self::AnnotationCreated => "annotationCreated",
            Self::AnnotationsLoaded => "annotationsLoaded",
            Self::AnnotationDeleted => "annotationDeleted",
            Self::AnnotationEditorShown => "annotationEditorShown",
            Self::AnnotationEditorHidden => "annotationEditorHidden",
            Self::ViewerEdit => "edit",
            Self::ViewerHidden => "hide",
        }
    }

    /// Whether the topic is emitted by the viewer widget rather than the store.
    pub fn is_viewer_event(self) -> bool {
        matches!(self, Self::ViewerEdit | Self::ViewerHidden)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    BeforeAnnotationCreated(Annotation),
    AnnotationCreated(Annotation),
    AnnotationsLoaded(Vec<Annotation>),
    AnnotationDeleted(Annotation),
    AnnotationEditorShown(Annotation),
    AnnotationEditorHidden,
    ViewerEdit(Annotation),
    ViewerHidden,
}

impl BrokerEvent for HostEvent {
    type Kind = HostTopic;

    fn kind(&self) -> HostTopic {
        match self {
            Self::BeforeAnnotationCreated(_) => HostTopic::BeforeAnnotationCreated,
            Self::AnnotationCreated(_) => HostTopic::AnnotationCreated,
            Self::AnnotationsLoaded(_) => HostTopic::AnnotationsLoaded,
            Self::AnnotationDeleted(_) => HostTopic::AnnotationDeleted,
            Self::AnnotationEditorShown(_) => HostTopic::AnnotationEditorShown,
            Self::AnnotationEditorHidden => HostTopic::AnnotationEditorHidden,
            Self::ViewerEdit(_) => HostTopic::ViewerEdit,
            Self::ViewerHidden => HostTopic::ViewerHidden,
        }
    }
}

pub type HostHandler = Rc<dyn Fn(&HostEvent)>;

/// Callbacks and display primitives the plugin needs from the host.
///
/// The editor and viewer are singletons shared by every coordinator on the
/// page; implementations hand out references, never copies.
pub trait AnnotationHost {
    fn subscribe(&self, topic: HostTopic, handler: HostHandler) -> Subscription;

    fn unsubscribe(&self, subscription: Subscription);

    /// Announce a draft annotation before the editor opens.
    fn before_annotation_created(&self, annotation: &Annotation);

    /// Open the editor for `annotation`. Emits `annotationEditorShown`.
    fn show_editor(&self, annotation: &Annotation, hint: PositionHint);

    /// Make the editor visible without emitting `annotationEditorShown`.
    fn reveal_editor(&self);

    fn set_editor_position(&self, position: Point);

    fn show_viewer(&self, annotations: &[Annotation], hint: PositionHint);

    fn set_viewer_position(&self, position: Point);

    fn start_viewer_hide_timer(&self);

    fn clear_viewer_hide_timer(&self);
}
