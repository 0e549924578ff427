//! Widget configuration, resolved once at startup and read-only afterwards.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, WidgetError};

pub const DEFAULT_TITLE: &str = "Chat";
pub const DEFAULT_ACCENT: &str = "#1b9b3a";

/// Parsed `#rgb` / `#rrggbb` accent color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accent {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Accent {
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let mut it = hex.chars().map(|c| {
                    let v = c.to_digit(16).unwrap_or(0) as u8;
                    v * 16 + v
                });
                Some(Accent {
                    r: it.next()?,
                    g: it.next()?,
                    b: it.next()?,
                })
            }
            6 => Some(Accent {
                r: u8::from_str_radix(&hex[0..2], 16).ok()?,
                g: u8::from_str_radix(&hex[2..4], 16).ok()?,
                b: u8::from_str_radix(&hex[4..6], 16).ok()?,
            }),
            _ => None,
        }
    }
}

/// Immutable widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    endpoint_url: String,
    title: String,
    accent_color: String,
    accent: Accent,
}

impl WidgetConfig {
    /// Build a config with the default title and accent color.
    pub fn new(endpoint_url: impl Into<String>) -> Result<Self> {
        ConfigLayer {
            endpoint_url: Some(endpoint_url.into()),
            ..ConfigLayer::default()
        }
        .resolve()
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn accent_color(&self) -> &str {
        &self.accent_color
    }

    pub fn accent(&self) -> Accent {
        self.accent
    }
}

/// One partial source of settings (file, CLI flags, ...).
///
/// Layers are merged with [`ConfigLayer::overlay`]; absent fields fall
/// through to the layer underneath and finally to the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub endpoint_url: Option<String>,
    pub title: Option<String>,
    pub accent_color: Option<String>,
}

impl ConfigLayer {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| WidgetError::ConfigFile {
            path: "<inline>".into(),
            detail: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| WidgetError::ConfigFile {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| WidgetError::ConfigFile {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Fields set in `top` win over fields set in `self`.
    pub fn overlay(self, top: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            endpoint_url: top.endpoint_url.or(self.endpoint_url),
            title: top.title.or(self.title),
            accent_color: top.accent_color.or(self.accent_color),
        }
    }

    /// Validate and freeze into a [`WidgetConfig`].
    pub fn resolve(self) -> Result<WidgetConfig> {
        let endpoint_url = self
            .endpoint_url
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| WidgetError::Config {
                field: "endpoint_url",
                detail: "an endpoint URL is required".into(),
            })?;
        let url = reqwest::Url::parse(&endpoint_url).map_err(|e| WidgetError::Config {
            field: "endpoint_url",
            detail: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(WidgetError::Config {
                field: "endpoint_url",
                detail: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let accent_color = self
            .accent_color
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ACCENT.to_string());
        let accent = Accent::parse(accent_color.trim()).ok_or_else(|| WidgetError::Config {
            field: "accent_color",
            detail: format!("'{accent_color}' is not a #rgb or #rrggbb color"),
        })?;

        Ok(WidgetConfig {
            endpoint_url,
            title,
            accent_color,
            accent,
        })
    }
}
