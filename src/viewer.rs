use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::events::{Event, EventBroker, EventType};
use crate::model::Annotation;
use crate::popup::PopupPort;

/// Read-only presentation of the annotations on one image.
///
/// Adding or removing the same identity twice is harmless.
pub trait AnnotationViewer {
    fn add_annotation(&self, annotation: &Annotation);

    fn remove_annotation(&self, annotation: &Annotation);

    /// Current annotations in display order (last is topmost).
    fn annotations(&self) -> Vec<Annotation>;
}

/// Viewer for the view surface: keeps the displayed annotations and turns
/// hover into popup requests.
pub struct OverlayViewer {
    popup: Rc<dyn PopupPort>,
    broker: EventBroker<Event>,
    annotations: RefCell<Vec<Annotation>>,
    hovered: RefCell<Option<Annotation>>,
}

impl OverlayViewer {
    pub fn new(popup: Rc<dyn PopupPort>, broker: EventBroker<Event>) -> Rc<Self> {
        let viewer = Rc::new(Self {
            popup,
            broker: broker.clone(),
            annotations: RefCell::new(Vec::new()),
            hovered: RefCell::new(None),
        });

        let weak: Weak<Self> = Rc::downgrade(&viewer);
        broker.subscribe(EventType::PopupHidden, move |_| {
            if let Some(viewer) = weak.upgrade() {
                viewer.hovered.borrow_mut().take();
            }
        });
        viewer
    }

    pub fn hovered(&self) -> Option<Annotation> {
        self.hovered.borrow().clone()
    }

    /// Pointer moved to overlay-local `(x, y)` on the view surface.
    pub fn pointer_move(&self, x: f64, y: f64) {
        let topmost = self
            .annotations
            .borrow()
            .iter()
            .rev()
            .find(|a| a.shape.geometry.contains(x, y))
            .cloned();
        self.hover(topmost);
    }

    pub fn pointer_left(&self) {
        self.hover(None);
    }

    fn hover(&self, next: Option<Annotation>) {
        let previous = self.hovered.borrow().clone();
        let unchanged = match (&previous, &next) {
            (Some(a), Some(b)) => a.same_identity(b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        self.hovered.replace(next.clone());

        if let Some(annotation) = previous {
            self.broker.publish(Event::MouseOutOfAnnotation { annotation });
        }
        match next {
            Some(annotation) => {
                let geometry = annotation.shape.geometry;
                self.popup
                    .show(&annotation, geometry.x, geometry.y + geometry.height);
                self.broker.publish(Event::MouseOverAnnotation { annotation });
            }
            None => self.popup.start_hide_timer(),
        }
    }
}

impl AnnotationViewer for OverlayViewer {
    fn add_annotation(&self, annotation: &Annotation) {
        let mut annotations = self.annotations.borrow_mut();
        match annotations.iter_mut().find(|a| a.same_identity(annotation)) {
            Some(existing) => *existing = annotation.clone(),
            None => annotations.push(annotation.clone()),
        }
    }

    fn remove_annotation(&self, annotation: &Annotation) {
        self.annotations
            .borrow_mut()
            .retain(|a| !a.same_identity(annotation));

        let mut hovered = self.hovered.borrow_mut();
        if hovered.as_ref().is_some_and(|h| h.same_identity(annotation)) {
            *hovered = None;
        }
    }

    fn annotations(&self) -> Vec<Annotation> {
        self.annotations.borrow().clone()
    }
}
