//! Render options value object and theme defaults.
//!
//! `RenderOptions` is immutable-by-convention: every user edit builds a new
//! value that is assigned back into the session store, which is what makes
//! draft snapshots and preference persistence plain clones.

use serde::{
  Deserialize,
  Serialize,
};

use crate::color::normalize_hex;
use crate::style::SubExpressionStyle;

/// Host UI theme; picks the default background/font colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
  Dark,
  Light,
}

impl Theme {
  pub fn default_background(self) -> &'static str {
    match self {
      Theme::Dark => "2C2C2C",
      Theme::Light => "FFFFFF",
    }
  }

  pub fn default_font_color(self) -> &'static str {
    match self {
      Theme::Dark => "FFFFFF",
      Theme::Light => "000000",
    }
  }
}

/// Everything needed to render and style one formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
  pub source:       String,
  /// Block (display) vs inline layout.
  pub display_mode: bool,
  pub font_size:    f32,
  /// Canonical 6-digit hex, no marker.
  pub background:   String,
  /// Canonical 6-digit hex, no marker.
  pub font_color:   String,
  pub styles:       Vec<SubExpressionStyle>,
}

pub const DEFAULT_FONT_SIZE: f32 = 16.0;

impl RenderOptions {
  pub fn for_theme(theme: Theme) -> Self {
    Self {
      source:       String::new(),
      display_mode: true,
      font_size:    DEFAULT_FONT_SIZE,
      background:   theme.default_background().to_string(),
      font_color:   theme.default_font_color().to_string(),
      styles:       Vec::new(),
    }
  }

  /// Canonicalize every color field. Called whenever options enter the
  /// store from user input or external data.
  pub fn normalized(mut self) -> Self {
    self.background = normalize_hex(&self.background);
    self.font_color = normalize_hex(&self.font_color);
    for style in &mut self.styles {
      style.color = normalize_hex(&style.color);
    }
    self
  }
}
