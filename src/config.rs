use anyhow::Context as _;

/// Opacities applied to the overlay when the pointer enters or leaves it.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct HoverStyle {
    pub view_opacity_over: f32,
    pub view_opacity_out: f32,
    pub hint_opacity_over: f32,
    pub hint_opacity_out: f32,
}

impl Default for HoverStyle {
    fn default() -> Self {
        Self {
            view_opacity_over: 1.0,
            view_opacity_out: 0.4,
            hint_opacity_over: 0.8,
            hint_opacity_out: 0.0,
        }
    }
}

/// Per-instance plugin options. Every coordinator owns its own copy.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)] // options omitted by the host page fall back to defaults
pub struct PluginConfig {
    /// Horizontal padding between a shape's left edge and the popup.
    pub anchor_dx: f64,

    /// Vertical padding between a shape's bottom edge and the popup.
    pub anchor_dy: f64,

    pub hint_message: String,

    /// Tag name used to discover images inside the annotatable element.
    pub image_selector: String,

    pub hover: HoverStyle,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            anchor_dx: 16.0,
            anchor_dy: 5.0,
            hint_message: "Click and Drag to Annotate".to_owned(),
            image_selector: "img".to_owned(),
            hover: HoverStyle::default(),
        }
    }
}

impl PluginConfig {
    /// Parse the plugin options object handed over by the host page.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).context("invalid image plugin options")
    }
}
