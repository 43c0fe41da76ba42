//! [`AnnotationHost`] backed by a JavaScript annotator instance.
//!
//! Annotations cross the boundary as JSON. The annotator's own objects are
//! remembered so that display primitives receive the host's instances back,
//! with any fields this crate does not model.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Context as _;
use js_sys::{Array, Function, JSON, Object, Reflect};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;

use crate::events::Subscription;
use crate::host::{AnnotationHost, HostEvent, HostHandler, HostTopic, IdentityCache};
use crate::model::{Annotation, Point, PositionHint};

use super::dom::set_style;

struct Listener {
    subscription: Subscription,
    topic: HostTopic,
    callback: Closure<dyn FnMut(JsValue)>,
}

/// Annotator objects seen so far, keyed by annotation identity.
#[derive(Default)]
struct Identities {
    cache: IdentityCache<JsValue>,
}

impl Identities {
    /// The annotator's own object for `annotation`, or a fresh copy.
    fn instance_of(&self, annotation: &Annotation) -> JsValue {
        self.cache
            .get(annotation)
            .unwrap_or_else(|| to_js(annotation))
    }

    fn decode(&self, topic: HostTopic, value: &JsValue) -> anyhow::Result<HostEvent> {
        let event = match topic {
            HostTopic::AnnotationsLoaded => {
                let mut annotations = Vec::new();
                for item in Array::from(value).iter() {
                    // Text annotations without a shape belong to other plugins.
                    if let Ok(annotation) = to_annotation(&item) {
                        self.cache.remember(&annotation, item.clone());
                        annotations.push(annotation);
                    }
                }
                HostEvent::AnnotationsLoaded(annotations)
            }
            HostTopic::AnnotationEditorHidden => {
                self.cache.editor_hidden();
                HostEvent::AnnotationEditorHidden
            }
            HostTopic::ViewerHidden => HostEvent::ViewerHidden,
            _ => {
                let annotation = to_annotation(value)?;
                match topic {
                    HostTopic::AnnotationCreated => {
                        self.cache.created(&annotation, value.clone());
                        HostEvent::AnnotationCreated(annotation)
                    }
                    HostTopic::AnnotationDeleted => {
                        self.cache.forget(&annotation);
                        HostEvent::AnnotationDeleted(annotation)
                    }
                    HostTopic::BeforeAnnotationCreated => HostEvent::BeforeAnnotationCreated(annotation),
                    HostTopic::AnnotationEditorShown => HostEvent::AnnotationEditorShown(annotation),
                    _ => HostEvent::ViewerEdit(annotation),
                }
            }
        };
        Ok(event)
    }
}

pub struct JsHost {
    annotator: JsValue,
    next_id: Cell<u64>,
    listeners: RefCell<Vec<Listener>>,
    identities: Rc<Identities>,
}

fn to_annotation(value: &JsValue) -> anyhow::Result<Annotation> {
    let json = JSON::stringify(value)
        .map_err(|e| anyhow::anyhow!("{e:?}"))?
        .as_string()
        .context("annotation is not serializable")?;
    serde_json::from_str(&json).context("not an image annotation")
}

fn to_js(annotation: &Annotation) -> JsValue {
    serde_json::to_string(annotation)
        .ok()
        .and_then(|json| JSON::parse(&json).ok())
        .unwrap_or(JsValue::UNDEFINED)
}

fn set_field(object: &Object, key: &str, value: f64) {
    if let Err(e) = Reflect::set(object, &key.into(), &value.into()) {
        log::warn!("failed to set {key}: {e:?}");
    }
}

fn hint_object(hint: PositionHint) -> JsValue {
    let object = Object::new();
    set_field(&object, "top", hint.top);
    set_field(&object, "left", hint.left);
    object.into()
}

fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let function: Function = Reflect::get(target, &method.into())?.dyn_into()?;
    let array: Array = args.iter().collect();
    function.apply(target, &array)
}

impl JsHost {
    pub fn new(annotator: JsValue) -> Self {
        Self {
            annotator,
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            identities: Rc::new(Identities::default()),
        }
    }

    fn widget(&self, name: &str) -> Result<JsValue, JsValue> {
        Reflect::get(&self.annotator, &name.into())
    }

    /// Viewer topics are emitted by the viewer widget, the rest by the store.
    fn source_of(&self, topic: HostTopic) -> JsValue {
        if topic.is_viewer_event() {
            self.widget("viewer").unwrap_or(JsValue::UNDEFINED)
        } else {
            self.annotator.clone()
        }
    }

    fn invoke(&self, target: &JsValue, method: &str, args: &[JsValue]) {
        if let Err(e) = call(target, method, args) {
            log::warn!("annotator call '{method}' failed: {e:?}");
        }
    }

    fn set_widget_position(&self, widget: &str, position: Point) {
        let element = self
            .widget(widget)
            .and_then(|w| Reflect::get(&w, &"element".into()))
            .and_then(|e| Reflect::get(&e, &0.into()))
            .and_then(|e| e.dyn_into::<web_sys::HtmlElement>().map_err(JsValue::from));
        match element {
            Ok(element) => {
                set_style(&element, "left", &format!("{}px", position.x));
                set_style(&element, "top", &format!("{}px", position.y));
            }
            Err(e) => log::warn!("annotator {widget} has no element: {e:?}"),
        }
    }
}

impl Drop for JsHost {
    fn drop(&mut self) {
        let listeners: Vec<Subscription> = self
            .listeners
            .borrow()
            .iter()
            .map(|l| l.subscription)
            .collect();
        for subscription in listeners {
            self.unsubscribe(subscription);
        }
    }
}

impl AnnotationHost for JsHost {
    fn subscribe(&self, topic: HostTopic, handler: HostHandler) -> Subscription {
        self.next_id.set(self.next_id.get() + 1);
        let subscription = Subscription::new(self.next_id.get());

        let identities = Rc::clone(&self.identities);
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            match identities.decode(topic, &value) {
                Ok(event) => handler(&event),
                Err(e) => log::debug!("ignoring '{}' payload: {e:#}", topic.name()),
            }
        });

        self.invoke(
            &self.source_of(topic),
            "subscribe",
            &[topic.name().into(), callback.as_ref().clone()],
        );

        self.listeners.borrow_mut().push(Listener {
            subscription,
            topic,
            callback,
        });
        subscription
    }

    fn unsubscribe(&self, subscription: Subscription) {
        let listener = {
            let mut listeners = self.listeners.borrow_mut();
            let Some(index) = listeners.iter().position(|l| l.subscription == subscription) else {
                return;
            };
            listeners.remove(index)
        };
        self.invoke(
            &self.source_of(listener.topic),
            "unsubscribe",
            &[listener.topic.name().into(), listener.callback.as_ref().clone()],
        );
    }

    fn before_annotation_created(&self, annotation: &Annotation) {
        let value = to_js(annotation);
        self.identities.cache.remember_draft(annotation, value.clone());
        let args: Array = std::iter::once(value).collect();
        self.invoke(
            &self.annotator,
            "publish",
            &[HostTopic::BeforeAnnotationCreated.name().into(), args.into()],
        );
    }

    fn show_editor(&self, annotation: &Annotation, hint: PositionHint) {
        let value = self.identities.instance_of(annotation);
        self.invoke(&self.annotator, "showEditor", &[value, hint_object(hint)]);
    }

    fn reveal_editor(&self) {
        match self.widget("editor") {
            Ok(editor) => self.invoke(&editor, "show", &[]),
            Err(e) => log::warn!("annotator has no editor: {e:?}"),
        }
    }

    fn set_editor_position(&self, position: Point) {
        self.set_widget_position("editor", position);
    }

    fn show_viewer(&self, annotations: &[Annotation], hint: PositionHint) {
        let values: Array = annotations.iter().map(|a| self.identities.instance_of(a)).collect();
        self.invoke(&self.annotator, "showViewer", &[values.into(), hint_object(hint)]);
    }

    fn set_viewer_position(&self, position: Point) {
        self.set_widget_position("viewer", position);
    }

    fn start_viewer_hide_timer(&self) {
        self.invoke(&self.annotator, "startViewerHideTimer", &[]);
    }

    fn clear_viewer_hide_timer(&self) {
        self.invoke(&self.annotator, "clearViewerHideTimer", &[]);
    }
}
