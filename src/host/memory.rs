use std::cell::RefCell;

use super::{AnnotationHost, HostEvent, HostHandler, HostTopic};
use crate::events::{EventBroker, Subscription};
use crate::model::{Annotation, Point, PositionHint};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditorState {
    pub visible: bool,
    pub position: Point,

    /// The draft or stored annotation currently loaded into the editor.
    pub annotation: Option<Annotation>,

    /// How many `annotationEditorShown` notifications were emitted.
    pub shown_notifications: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewerState {
    pub visible: bool,
    pub position: Point,
    pub annotations: Vec<Annotation>,
    pub hide_timer_armed: bool,
}

#[derive(Default)]
struct Store {
    annotations: Vec<Annotation>,
    next_id: u64,
    editor: EditorState,
    viewer: ViewerState,
}

impl Store {
    fn assign_id(&mut self, annotation: &mut Annotation) {
        if annotation.id.is_none() {
            self.next_id += 1;
            annotation.id = Some(self.next_id.to_string());
        }
    }
}

/// Host store kept entirely in memory, with a single editor and viewer.
///
/// Drives the native demo and the integration tests. Host-side operations
/// (`load`, `submit_editor`, `delete`, ...) stand in for what a user does
/// inside the host's own widgets.
#[derive(Default)]
pub struct MemoryHost {
    broker: EventBroker<HostEvent>,
    store: RefCell<Store>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.store.borrow().annotations.clone()
    }

    pub fn annotation(&self, id: &str) -> Option<Annotation> {
        self.store
            .borrow()
            .annotations
            .iter()
            .find(|a| a.id.as_deref() == Some(id))
            .cloned()
    }

    pub fn editor(&self) -> EditorState {
        self.store.borrow().editor.clone()
    }

    pub fn viewer(&self) -> ViewerState {
        self.store.borrow().viewer.clone()
    }

    /// Bulk-load annotations, assigning ids where missing.
    pub fn load(&self, annotations: Vec<Annotation>) {
        let loaded = {
            let mut store = self.store.borrow_mut();
            let mut loaded = annotations;
            for annotation in &mut loaded {
                store.assign_id(annotation);
            }
            store.annotations.extend(loaded.iter().cloned());
            loaded
        };
        log::debug!("Loaded {} annotations", loaded.len());
        self.broker.publish(HostEvent::AnnotationsLoaded(loaded));
    }

    /// Save the editor contents. New drafts are created; stored annotations
    /// get their text updated. The editor is hidden afterwards.
    pub fn submit_editor(&self, text: &str) -> Option<Annotation> {
        let (saved, created) = {
            let mut store = self.store.borrow_mut();
            if !store.editor.visible {
                return None;
            }
            let mut annotation = store.editor.annotation.take()?;
            annotation.text = text.to_owned();

            let existing = annotation.id.clone().and_then(|id| {
                store
                    .annotations
                    .iter_mut()
                    .find(|a| a.id.as_deref() == Some(id.as_str()))
            });
            match existing {
                Some(stored) => {
                    stored.text = annotation.text.clone();
                    (annotation, false)
                }
                None => {
                    store.assign_id(&mut annotation);
                    store.annotations.push(annotation.clone());
                    (annotation, true)
                }
            }
        };

        if created {
            self.broker.publish(HostEvent::AnnotationCreated(saved.clone()));
        }
        self.hide_editor();
        Some(saved)
    }

    pub fn cancel_editor(&self) {
        self.store.borrow_mut().editor.annotation = None;
        self.hide_editor();
    }

    pub fn delete(&self, id: &str) -> Option<Annotation> {
        let (removed, was_viewed) = {
            let mut store = self.store.borrow_mut();
            let index = store
                .annotations
                .iter()
                .position(|a| a.id.as_deref() == Some(id))?;
            let removed = store.annotations.remove(index);
            let was_viewed = store.viewer.annotations.iter().any(|a| a.id == removed.id);
            (removed, was_viewed)
        };

        if was_viewed {
            self.hide_viewer();
        }
        self.broker.publish(HostEvent::AnnotationDeleted(removed.clone()));
        Some(removed)
    }

    /// The user pressed "edit" in the viewer for the annotation `id`.
    pub fn edit_from_viewer(&self, id: &str) -> bool {
        let Some(annotation) = self.annotation(id) else {
            return false;
        };
        self.store.borrow_mut().editor.annotation = Some(annotation.clone());
        self.hide_viewer();
        self.broker.publish(HostEvent::ViewerEdit(annotation));
        true
    }

    pub fn hide_viewer(&self) {
        {
            let mut store = self.store.borrow_mut();
            store.viewer.visible = false;
            store.viewer.annotations.clear();
            store.viewer.hide_timer_armed = false;
        }
        self.broker.publish(HostEvent::ViewerHidden);
    }

    /// Fire the viewer hide timer if it is armed.
    pub fn expire_hide_timer(&self) -> bool {
        let armed = self.store.borrow().viewer.hide_timer_armed;
        if armed {
            self.hide_viewer();
        }
        armed
    }

    fn hide_editor(&self) {
        self.store.borrow_mut().editor.visible = false;
        self.broker.publish(HostEvent::AnnotationEditorHidden);
    }
}

impl AnnotationHost for MemoryHost {
    fn subscribe(&self, topic: HostTopic, handler: HostHandler) -> Subscription {
        self.broker.subscribe(topic, move |event| handler(event))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.broker.unsubscribe(subscription);
    }

    fn before_annotation_created(&self, annotation: &Annotation) {
        self.broker
            .publish(HostEvent::BeforeAnnotationCreated(annotation.clone()));
    }

    fn show_editor(&self, annotation: &Annotation, hint: PositionHint) {
        {
            let mut store = self.store.borrow_mut();
            let editor = &mut store.editor;
            editor.visible = true;
            editor.annotation = Some(annotation.clone());
            editor.position = Point::new(hint.left, hint.top);
            editor.shown_notifications += 1;
        }
        self.broker
            .publish(HostEvent::AnnotationEditorShown(annotation.clone()));
    }

    fn reveal_editor(&self) {
        self.store.borrow_mut().editor.visible = true;
    }

    fn set_editor_position(&self, position: Point) {
        self.store.borrow_mut().editor.position = position;
    }

    fn show_viewer(&self, annotations: &[Annotation], hint: PositionHint) {
        let mut store = self.store.borrow_mut();
        let viewer = &mut store.viewer;
        viewer.visible = true;
        viewer.annotations = annotations.to_vec();
        viewer.position = Point::new(hint.left, hint.top);
    }

    fn set_viewer_position(&self, position: Point) {
        self.store.borrow_mut().viewer.position = position;
    }

    fn start_viewer_hide_timer(&self) {
        self.store.borrow_mut().viewer.hide_timer_armed = true;
    }

    fn clear_viewer_hide_timer(&self) {
        self.store.borrow_mut().viewer.hide_timer_armed = false;
    }
}
