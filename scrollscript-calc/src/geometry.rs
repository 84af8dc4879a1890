//! Element and viewport geometry exposed to calc() expressions

/// Live measurements of the animated element and the viewport
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub client_width: f64,
    pub client_height: f64,
    pub scroll_width: f64,
}

/// Variable names ordered longest first, so `vcenter` is replaced before `center`
pub const VARIABLE_NAMES: [&str; 8] = ["vcenter", "center", "end", "sw", "cw", "ch", "vw", "vh"];

impl Geometry {
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self { viewport_width, viewport_height, ..Default::default() }
    }

    pub fn with_element(mut self, client_width: f64, client_height: f64, scroll_width: f64) -> Self {
        self.client_width = client_width;
        self.client_height = client_height;
        self.scroll_width = scroll_width;
        self
    }

    /// Horizontal overflow: how far the element can scroll sideways
    pub fn scroll_overflow(&self) -> f64 {
        (self.scroll_width - self.client_width).max(0.0)
    }

    pub fn variable(&self, name: &str) -> Option<f64> {
        let value = match name {
            "vw" => self.viewport_width,
            "vh" => self.viewport_height,
            "cw" => self.client_width,
            "ch" => self.client_height,
            "sw" => self.scroll_overflow(),
            "center" => (self.viewport_width - self.client_width) / 2.0,
            "vcenter" => (self.viewport_height - self.client_height) / 2.0,
            "end" => self.viewport_width - self.client_width,
            _ => return None,
        };
        Some(value)
    }

    /// Replace every variable name with its current value as literal text
    pub fn substitute(&self, body: &str) -> String {
        let mut out = body.to_string();
        for name in VARIABLE_NAMES {
            if let Some(value) = self.variable(name) {
                out = out.replace(name, &format!("({})", value));
            }
        }
        out
    }
}
