use std::cell::RefCell;

use crate::events::{Event, EventBroker};
use crate::model::{Geometry, Point, Shape};

/// Drag-to-select interaction on the edit surface.
///
/// Implementations publish exactly one [`Event::SelectionCompleted`] per
/// completed drag on the image's broker.
pub trait SelectionController {
    fn start_selection(&self, x: f64, y: f64);

    /// Abort the current selection. A no-op when none is active.
    fn stop_selection(&self);

    fn is_selecting(&self) -> bool;
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    origin: Point,
    current: Point,
}

/// Rectangle selector fed with pointer positions local to the edit surface.
pub struct DragSelector {
    broker: EventBroker<Event>,
    width: f64,
    height: f64,
    drag: RefCell<Option<Drag>>,
}

impl DragSelector {
    pub fn new(broker: EventBroker<Event>, width: u32, height: u32) -> Self {
        Self {
            broker,
            width: f64::from(width),
            height: f64::from(height),
            drag: RefCell::new(None),
        }
    }

    fn clamp(&self, x: f64, y: f64) -> Point {
        Point::new(x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }

    /// Rectangle currently being dragged, for painting.
    pub fn current_geometry(&self) -> Option<Geometry> {
        self.drag
            .borrow()
            .map(|d| Geometry::from_corners(d.origin, d.current))
    }

    pub fn pointer_move(&self, x: f64, y: f64) {
        let point = self.clamp(x, y);
        if let Some(drag) = self.drag.borrow_mut().as_mut() {
            drag.current = point;
        }
    }

    /// Finish the drag. Returns the completed shape, or `None` when no drag
    /// was active or the rectangle has no area.
    pub fn pointer_up(&self, x: f64, y: f64) -> Option<Shape> {
        let point = self.clamp(x, y);
        let drag = self.drag.borrow_mut().take()?;

        let geometry = Geometry::from_corners(drag.origin, point);
        if geometry.is_empty() {
            log::debug!("Discarding empty selection at ({}, {})", point.x, point.y);
            self.broker.publish(Event::SelectionCanceled);
            return None;
        }

        let shape = Shape::rect(geometry);
        self.broker.publish(Event::SelectionCompleted {
            shape: shape.clone(),
        });
        Some(shape)
    }
}

impl SelectionController for DragSelector {
    fn start_selection(&self, x: f64, y: f64) {
        let origin = self.clamp(x, y);
        *self.drag.borrow_mut() = Some(Drag {
            origin,
            current: origin,
        });
        self.broker.publish(Event::SelectionStarted {
            x: origin.x,
            y: origin.y,
        });
    }

    fn stop_selection(&self) {
        let stopped = self.drag.borrow_mut().take().is_some();
        if stopped {
            self.broker.publish(Event::SelectionCanceled);
        }
    }

    fn is_selecting(&self) -> bool {
        self.drag.borrow().is_some()
    }
}
