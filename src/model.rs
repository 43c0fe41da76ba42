use serde::{Deserialize, Deserializer, Serialize};

/// A point in page or overlay coordinates, depending on context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Page offset of an element, as returned by a layout measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub left: f64,
    pub top: f64,
}

impl Offset {
    pub fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }
}

/// Placement hint handed to the host when it shows its editor or viewer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionHint {
    pub top: f64,
    pub left: f64,
}

/// Axis-aligned rectangle local to the editing overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanned by two corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rect,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "type", default)]
    pub kind: ShapeKind,
    pub geometry: Geometry,
}

impl Shape {
    pub fn rect(geometry: Geometry) -> Self {
        Self {
            kind: ShapeKind::Rect,
            geometry,
        }
    }
}

/// An annotation as exchanged with the host store.
///
/// `target` is the resource identifier of the annotated image (its `src`),
/// serialized as `url` to match what the host stores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(
        default,
        deserialize_with = "id_from_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(rename = "url", alias = "target")]
    pub target: String,

    pub shape: Shape,

    #[serde(default, deserialize_with = "text_or_null")]
    pub text: String,
}

/// Store backends hand out either string or integer ids.
fn id_from_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}

fn text_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Annotation {
    /// A draft annotation; the host assigns the id on creation.
    pub fn draft(target: impl Into<String>, shape: Shape) -> Self {
        Self {
            id: None,
            target: target.into(),
            shape,
            text: String::new(),
        }
    }

    pub fn belongs_to(&self, resource_id: &str) -> bool {
        self.target == resource_id
    }

    /// Identity used for removal: same target and the same host id when both
    /// carry one, otherwise the same shape.
    pub fn same_identity(&self, other: &Self) -> bool {
        if self.target != other.target {
            return false;
        }
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.shape == other.shape,
        }
    }
}
