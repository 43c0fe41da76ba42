mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::{RecordingPage, ScriptedHost, annotation, attach, init_logging};
use yuma_image_plugin::{
    AnnotationHost as _, AnnotationViewer as _, Components, DragSelector, Event, EventType,
    Geometry, HostEvent, HostTopic, ImageInfo, ImagePlugin, InteractionState, MemoryHost, Offset,
    OverlayViewer, PluginConfig, Point, SelectionController as _, Shape,
};

const IMAGE: &str = "http://example.org/cat.jpg";
const OTHER: &str = "http://example.org/dog.jpg";

fn square() -> Geometry {
    Geometry::new(0.0, 0.0, 10.0, 10.0)
}

#[test]
fn completed_selection_opens_editor_below_shape() {
    init_logging();
    let host = Rc::new(ScriptedHost::default());
    let fixture = attach(host.clone(), IMAGE, RecordingPage::new(5.0, 5.0));

    fixture.plugin.pointer_down(10.0, 20.0);
    assert_eq!(fixture.plugin.state(), InteractionState::Selecting);
    assert!(fixture.page.overlay.edit_visible.get());

    fixture.plugin.broker().publish(Event::SelectionCompleted {
        shape: Shape::rect(Geometry::new(10.0, 20.0, 30.0, 40.0)),
    });

    assert_eq!(fixture.plugin.state(), InteractionState::PendingCreate);
    assert_eq!(
        *host.calls.borrow(),
        vec![
            format!("before {IMAGE}"),
            format!("show_editor {IMAGE} 0 -5"),
            // anchor (31, 70) relative to the region
            "editor_at 26 65".to_owned(),
        ]
    );
}

#[test]
fn viewer_edit_repositions_editor_without_second_show() {
    let host = Rc::new(ScriptedHost::default());
    let page = RecordingPage::new(50.0, 100.0);
    page.scroll_y.set(20.0);
    let _fixture = attach(host.clone(), IMAGE, page);

    host.emit(HostEvent::ViewerEdit(annotation(IMAGE, "", square())));

    assert_eq!(
        *host.calls.borrow(),
        vec!["editor_at 0 -80", "reveal_editor", "editor_at 16 35"]
    );
}

#[test]
fn annotations_for_other_images_are_ignored() {
    let host = Rc::new(ScriptedHost::default());
    let fixture = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));
    let foreign = annotation(OTHER, "dog", square());

    host.emit(HostEvent::AnnotationsLoaded(vec![foreign.clone()]));
    host.emit(HostEvent::AnnotationCreated(foreign.clone()));
    host.emit(HostEvent::AnnotationDeleted(foreign.clone()));
    host.emit(HostEvent::ViewerEdit(foreign));

    assert!(fixture.viewer.calls.borrow().is_empty());
    assert!(host.calls.borrow().is_empty());
}

#[test]
fn created_annotation_is_added_once_and_ends_selection() {
    let host = Rc::new(ScriptedHost::default());
    let fixture = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));

    fixture.plugin.pointer_down(3.0, 4.0);
    fixture.plugin.broker().publish(Event::SelectionCompleted {
        shape: Shape::rect(square()),
    });
    host.emit(HostEvent::AnnotationCreated(annotation(IMAGE, "cat", square())));

    assert_eq!(fixture.viewer.adds(), 1);
    assert_eq!(fixture.plugin.state(), InteractionState::Idle);
    assert!(!fixture.page.overlay.edit_visible.get());
    assert_eq!(*fixture.selector.calls.borrow(), vec!["start 3 4", "stop"]);
}

#[test]
fn repeated_delete_is_harmless() {
    let host = Rc::new(ScriptedHost::default());
    let fixture = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));
    let a = annotation(IMAGE, "a", square());

    host.emit(HostEvent::AnnotationsLoaded(vec![a.clone()]));
    host.emit(HostEvent::AnnotationDeleted(a.clone()));
    host.emit(HostEvent::AnnotationDeleted(a));

    assert!(fixture.viewer.annotations().is_empty());
    assert_eq!(*fixture.viewer.calls.borrow(), vec!["add a", "remove a", "remove a"]);
}

#[test]
fn editor_hidden_always_closes_selection() {
    let host = Rc::new(ScriptedHost::default());
    let fixture = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));

    host.emit(HostEvent::AnnotationEditorHidden);
    assert_eq!(*fixture.selector.calls.borrow(), vec!["stop"]);
    assert_eq!(fixture.plugin.state(), InteractionState::Idle);

    fixture.plugin.pointer_down(1.0, 1.0);
    assert!(fixture.page.overlay.edit_visible.get());
    host.emit(HostEvent::AnnotationEditorHidden);

    assert!(!fixture.page.overlay.edit_visible.get());
    assert!(!fixture.selector.active.get());
    assert_eq!(fixture.plugin.state(), InteractionState::Idle);
}

#[test]
fn loaded_annotations_keep_input_order() {
    let host = Rc::new(ScriptedHost::default());
    let fixture = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));
    let first = annotation(IMAGE, "first", Geometry::new(0.0, 0.0, 5.0, 5.0));
    let foreign = annotation(OTHER, "foreign", square());
    let last = annotation(IMAGE, "last", Geometry::new(20.0, 20.0, 5.0, 5.0));

    host.emit(HostEvent::AnnotationsLoaded(vec![
        first.clone(),
        foreign,
        last.clone(),
    ]));

    assert_eq!(fixture.viewer.annotations(), vec![first, last]);
}

#[test]
fn hidden_viewer_is_forwarded_to_broker() {
    let host = Rc::new(ScriptedHost::default());
    let fixture = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));
    let hidden = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hidden);
    fixture
        .plugin
        .broker()
        .subscribe(EventType::PopupHidden, move |_| counter.set(counter.get() + 1));

    host.emit(HostEvent::ViewerHidden);
    assert_eq!(hidden.get(), 1);
}

#[test]
fn hover_cross_fades_overlay() {
    let host = Rc::new(ScriptedHost::default());
    let fixture = attach(host, IMAGE, RecordingPage::new(0.0, 0.0));
    let seen = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        EventType::MouseOverAnnotatableMedia,
        EventType::MouseOutOfAnnotatableMedia,
    ] {
        let sink = Rc::clone(&seen);
        fixture
            .plugin
            .broker()
            .subscribe(kind, move |e| sink.borrow_mut().push(e.clone()));
    }
    let overlay = &fixture.page.overlay;

    fixture.plugin.pointer_entered();
    assert_eq!(overlay.view_opacity.get(), 1.0);
    assert_eq!(overlay.hint_opacity.get(), 0.8);

    fixture.plugin.pointer_left();
    assert_eq!(overlay.view_opacity.get(), 0.4);
    assert_eq!(overlay.hint_opacity.get(), 0.0);

    assert_eq!(
        *seen.borrow(),
        vec![
            Event::MouseOverAnnotatableMedia,
            Event::MouseOutOfAnnotatableMedia
        ]
    );
}

#[test]
fn one_host_serves_several_images() {
    let host = Rc::new(ScriptedHost::default());
    let cat = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));
    let dog = attach(host.clone(), OTHER, RecordingPage::new(0.0, 300.0));

    let delivered = host.emit(HostEvent::AnnotationCreated(annotation(OTHER, "dog", square())));

    assert_eq!(delivered, 2);
    assert!(cat.viewer.annotations().is_empty());
    assert_eq!(dog.viewer.annotations().len(), 1);
}

#[test]
fn editor_opens_below_the_image_that_was_drawn_on() {
    let host = Rc::new(ScriptedHost::default());
    let top = RecordingPage::new(0.0, 0.0);
    let bottom = RecordingPage::new(0.0, 0.0);
    bottom.image_offset.set(Offset::new(0.0, 300.0));
    let cat = attach(host.clone(), IMAGE, top);
    let dog = attach(host.clone(), OTHER, bottom);

    for fixture in [&cat, &dog] {
        fixture.plugin.pointer_down(0.0, 0.0);
        fixture.plugin.broker().publish(Event::SelectionCompleted {
            shape: Shape::rect(square()),
        });
    }
    host.emit(HostEvent::ViewerEdit(annotation(OTHER, "dog", square())));

    let positions: Vec<String> = host
        .calls
        .borrow()
        .iter()
        .filter(|c| c.starts_with("editor_at"))
        .cloned()
        .collect();
    assert_eq!(
        positions,
        vec![
            "editor_at 16 15",
            "editor_at 16 315",
            "editor_at 0 0",
            "editor_at 16 315",
        ]
    );
}

fn failing_subscriber(_: &HostEvent) {
    panic!("another plugin failed");
}

#[test]
fn failing_host_subscriber_does_not_starve_plugin() {
    init_logging();
    let host = Rc::new(ScriptedHost::default());
    host.subscribe(HostTopic::AnnotationCreated, Rc::new(failing_subscriber));
    let fixture = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));

    assert_eq!(host.emit(HostEvent::AnnotationCreated(annotation(IMAGE, "a", square()))), 1);
    assert_eq!(fixture.viewer.adds(), 1);
}

#[test]
fn detached_plugin_stops_listening() {
    let host = Rc::new(ScriptedHost::default());
    let mut fixture = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));

    fixture.plugin.detach();
    let delivered = host.emit(HostEvent::AnnotationCreated(annotation(IMAGE, "a", square())));

    assert_eq!(delivered, 0);
    assert!(fixture.viewer.calls.borrow().is_empty());
}

#[test]
fn dropping_plugin_detaches_it() {
    let host = Rc::new(ScriptedHost::default());
    let fixture = attach(host.clone(), IMAGE, RecordingPage::new(0.0, 0.0));
    drop(fixture);

    assert_eq!(host.emit(HostEvent::AnnotationEditorHidden), 0);
}

#[test]
fn default_components_show_loaded_annotations() {
    let host = Rc::new(MemoryHost::new());
    let page = RecordingPage::new(8.0, 16.0);
    let plugin = ImagePlugin::new(
        ImageInfo::new(IMAGE, 320, 240),
        page.clone(),
        host.clone(),
        PluginConfig::default(),
    );

    assert_eq!(plugin.offset().left, 8.0);
    assert_eq!(page.overlay.mounts.get(), 1);
    assert_eq!(*page.overlay.hint.borrow(), "Click and Drag to Annotate");

    host.load(vec![
        annotation(IMAGE, "mine", square()),
        annotation(OTHER, "theirs", square()),
    ]);
    let shown = plugin.viewer().annotations();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].text, "mine");
}

struct Session {
    plugin: ImagePlugin,
    page: Rc<RecordingPage>,
    host: Rc<MemoryHost>,
    selector: Rc<DragSelector>,
    viewer: Rc<OverlayViewer>,
}

fn session(width: u32, height: u32) -> Session {
    let host = Rc::new(MemoryHost::new());
    let page = RecordingPage::new(10.0, 10.0);
    let mut parts = None;
    let plugin = ImagePlugin::with_components(
        ImageInfo::new(IMAGE, width, height),
        page.clone(),
        host.clone(),
        PluginConfig::default(),
        |broker, popup| {
            let selector = Rc::new(DragSelector::new(broker.clone(), width, height));
            let viewer = OverlayViewer::new(popup, broker.clone());
            parts = Some((selector.clone(), viewer.clone()));
            Components { selector, viewer }
        },
    );
    let (selector, viewer) = parts.expect("components built");
    Session {
        plugin,
        page,
        host,
        selector,
        viewer,
    }
}

#[test]
fn drag_create_hover_edit_delete() {
    init_logging();
    let s = session(200, 200);

    s.plugin.pointer_down(10.0, 20.0);
    s.selector.pointer_move(25.0, 40.0);
    s.selector.pointer_up(40.0, 60.0).expect("selection completed");

    let editor = s.host.editor();
    assert!(editor.visible);
    assert_eq!(editor.shown_notifications, 1);
    assert_eq!(editor.position, Point::new(26.0, 65.0));
    assert_eq!(editor.annotation.map(|a| a.target), Some(IMAGE.to_owned()));
    assert_eq!(s.plugin.state(), InteractionState::PendingCreate);

    let created = s.host.submit_editor("a cat").expect("draft saved");
    assert_eq!(s.viewer.annotations(), vec![created.clone()]);
    assert_eq!(s.plugin.state(), InteractionState::Idle);
    assert!(!s.page.overlay.edit_visible.get());
    assert!(!s.selector.is_selecting());

    s.viewer.pointer_move(20.0, 30.0);
    let viewer = s.host.viewer();
    assert!(viewer.visible);
    assert_eq!(viewer.annotations, vec![created.clone()]);
    assert_eq!(viewer.position, Point::new(26.0, 60.0));

    s.viewer.pointer_move(150.0, 150.0);
    assert!(s.host.viewer().hide_timer_armed);
    s.viewer.pointer_move(20.0, 30.0);
    assert!(!s.host.viewer().hide_timer_armed);

    let id = created.id.clone().expect("host id");
    assert!(s.host.edit_from_viewer(&id));
    assert!(s.viewer.hovered().is_none());
    let editor = s.host.editor();
    assert!(editor.visible);
    assert_eq!(editor.shown_notifications, 1);
    assert_eq!(editor.position, Point::new(26.0, 65.0));

    s.host.cancel_editor();
    s.host.delete(&id).expect("stored");
    assert!(s.viewer.annotations().is_empty());
}

#[test]
fn cancelled_editor_returns_to_idle() {
    let s = session(200, 200);

    s.plugin.pointer_down(10.0, 10.0);
    s.selector.pointer_up(50.0, 50.0).expect("selection completed");
    s.host.cancel_editor();

    assert_eq!(s.plugin.state(), InteractionState::Idle);
    assert!(!s.page.overlay.edit_visible.get());
    assert!(s.host.annotations().is_empty());
    assert!(s.viewer.annotations().is_empty());
}

#[test]
fn zero_sized_image_degrades_to_cancelled_selection() {
    let s = session(0, 0);

    s.plugin.pointer_down(5.0, 5.0);
    assert!(s.selector.pointer_up(30.0, 30.0).is_none());

    assert_eq!(s.plugin.state(), InteractionState::Idle);
    assert!(!s.page.overlay.edit_visible.get());
    assert!(!s.host.editor().visible);
}
