//! Browser entry point.
//!
//! The annotator plugin contract hands the plugin its element and options at
//! construction and the annotator at initialisation. A thin JavaScript shim
//! registers `Annotator.Plugin.YumaImagePlugin` and forwards
//! `this.annotator` to [`YumaImagePlugin::plugin_init`].

mod annotator;
mod dom;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlImageElement, MouseEvent, Window};

use crate::config::PluginConfig;
use crate::host::AnnotationHost;
use crate::plugin::{Components, ImagePlugin, attach_each};
use crate::selection::DragSelector;
use crate::surface::ImageInfo;
use crate::viewer::OverlayViewer;

use annotator::JsHost;
use dom::{CanvasViewer, DomPage, paint_selection};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("logger already initialised: {e}").into());
    }
}

fn to_js_error(e: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{e:#}"))
}

/// One annotated image with the DOM listeners that feed it.
struct Binding {
    _plugin: Rc<ImagePlugin>,
    _listeners: Vec<Closure<dyn FnMut(MouseEvent)>>,
}

fn listen(
    target: &web_sys::EventTarget,
    event: &str,
    listeners: &mut Vec<Closure<dyn FnMut(MouseEvent)>>,
    handler: impl FnMut(MouseEvent) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(MouseEvent)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    listeners.push(closure);
    Ok(())
}

fn bind_image(
    window: &Window,
    region: &Element,
    image: HtmlImageElement,
    host: &Rc<dyn AnnotationHost>,
    config: &PluginConfig,
) -> Result<Binding, JsValue> {
    let info = ImageInfo::new(image.src(), image.width(), image.height());
    let page = Rc::new(DomPage::new(window.clone(), region.clone(), image)?);
    let overlay = page.overlay();

    let mut parts = None;
    let plugin = Rc::new(ImagePlugin::with_components(
        info.clone(),
        page,
        Rc::clone(host),
        config.clone(),
        |broker, popup| {
            let selector = Rc::new(DragSelector::new(broker.clone(), info.width, info.height));
            let viewer = Rc::new(CanvasViewer::new(
                OverlayViewer::new(popup, broker.clone()),
                overlay.view.clone(),
            ));
            parts = Some((Rc::clone(&selector), Rc::clone(&viewer)));
            Components { selector, viewer }
        },
    ));
    let (selector, viewer) = parts.ok_or_else(|| JsValue::from_str("plugin components missing"))?;

    let mut listeners = Vec::new();
    {
        let plugin = Rc::clone(&plugin);
        listen(&overlay.layer, "mouseover", &mut listeners, move |_| plugin.pointer_entered())?;
    }
    {
        let plugin = Rc::clone(&plugin);
        listen(&overlay.layer, "mouseout", &mut listeners, move |_| plugin.pointer_left())?;
    }
    {
        let (plugin, viewer, edit) = (Rc::clone(&plugin), Rc::clone(&viewer), overlay.edit.clone());
        listen(&overlay.view, "mousedown", &mut listeners, move |e| {
            viewer.inner().pointer_left();
            viewer.repaint();
            paint_selection(&edit, None);
            plugin.pointer_down(f64::from(e.offset_x()), f64::from(e.offset_y()));
        })?;
    }
    {
        let viewer = Rc::clone(&viewer);
        listen(&overlay.view, "mousemove", &mut listeners, move |e| {
            viewer.inner().pointer_move(f64::from(e.offset_x()), f64::from(e.offset_y()));
            viewer.repaint();
        })?;
    }
    {
        let viewer = Rc::clone(&viewer);
        listen(&overlay.view, "mouseleave", &mut listeners, move |_| {
            viewer.inner().pointer_left();
            viewer.repaint();
        })?;
    }
    {
        let (selector, edit) = (Rc::clone(&selector), overlay.edit.clone());
        listen(&overlay.edit, "mousemove", &mut listeners, move |e| {
            selector.pointer_move(f64::from(e.offset_x()), f64::from(e.offset_y()));
            paint_selection(&edit, selector.current_geometry());
        })?;
    }
    {
        let (selector, edit) = (Rc::clone(&selector), overlay.edit.clone());
        listen(&overlay.edit, "mouseup", &mut listeners, move |e| {
            let shape = selector.pointer_up(f64::from(e.offset_x()), f64::from(e.offset_y()));
            paint_selection(&edit, shape.map(|s| s.geometry));
        })?;
    }

    Ok(Binding {
        _plugin: plugin,
        _listeners: listeners,
    })
}

/// Bind every image in `region`. An image that fails to bind is logged and
/// skipped; the others keep working.
fn bind_all(
    window: &Window,
    region: &Element,
    host: &Rc<dyn AnnotationHost>,
    config: &PluginConfig,
) -> Vec<Binding> {
    // The collection is live and the overlay moves each image, so snapshot it.
    let collection = region.get_elements_by_tag_name(&config.image_selector);
    let images: Vec<HtmlImageElement> = (0..collection.length())
        .filter_map(|i| collection.item(i))
        .filter_map(|e| e.dyn_into::<HtmlImageElement>().ok())
        .collect();

    log::info!("Binding {} images", images.len());
    attach_each(images, |image| {
        let src = image.src();
        bind_image(window, region, image, host, config).map_err(|e| format!("{src}: {e:?}"))
    })
}

/// Image annotation plugin for the JavaScript annotator.
#[wasm_bindgen]
pub struct YumaImagePlugin {
    element: Element,
    config: PluginConfig,
    bindings: Rc<RefCell<Vec<Binding>>>,
    on_load: RefCell<Option<Closure<dyn FnMut()>>>,
}

#[wasm_bindgen]
impl YumaImagePlugin {
    #[wasm_bindgen(constructor)]
    pub fn new(element: Element, options: JsValue) -> Result<YumaImagePlugin, JsValue> {
        let options = if options.is_undefined() || options.is_null() {
            String::new()
        } else {
            js_sys::JSON::stringify(&options)?
                .as_string()
                .unwrap_or_default()
        };
        let config = PluginConfig::from_json(&options).map_err(to_js_error)?;
        Ok(Self {
            element,
            config,
            bindings: Rc::new(RefCell::new(Vec::new())),
            on_load: RefCell::new(None),
        })
    }

    /// Attach one coordinator per image once the page has loaded.
    #[wasm_bindgen(js_name = pluginInit)]
    pub fn plugin_init(&self, annotator: JsValue) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;
        let host: Rc<dyn AnnotationHost> = Rc::new(JsHost::new(annotator));

        let attach = {
            let (window, region, config) = (window.clone(), self.element.clone(), self.config.clone());
            let bindings = Rc::clone(&self.bindings);
            move || {
                let bound = bind_all(&window, &region, &host, &config);
                bindings.borrow_mut().extend(bound);
            }
        };

        if document.ready_state() == "complete" {
            attach();
        } else {
            let closure = Closure::once(attach);
            window.add_event_listener_with_callback("load", closure.as_ref().unchecked_ref())?;
            self.on_load.replace(Some(closure));
        }
        Ok(())
    }

    /// Number of images currently bound.
    #[wasm_bindgen(getter, js_name = imageCount)]
    pub fn image_count(&self) -> usize {
        self.bindings.borrow().len()
    }
}
