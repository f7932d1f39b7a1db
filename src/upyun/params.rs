//! Extra request headers passed through to UpYun
//!
//! Image spaces accept `x-gmkerl-*` directives on upload. Applying any of them
//! to a file that is not a picture makes the upload fail, and the original
//! picture is not kept once a transform is applied.

use std::collections::BTreeMap;
use std::fmt;

/// Reserved key that toggles the `mkdir: true` header instead of being sent as-is
pub const AUTO_MKDIR_KEY: &str = "mkdir";

/// Thumbnail scaling mode for `x-gmkerl-type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbType {
    /// Fix the longer edge, the shorter one follows
    FixMax,
    /// Fix the shorter edge, the longer one follows
    FixMin,
    /// Fix both edges, never upscale (`WxH`)
    FixWidthOrHeight,
    FixWidth,
    FixHeight,
    Square,
    /// Fix both edges, upscale when needed (`WxH`)
    FixBoth,
    /// Scale by percentage (1-99)
    FixScale,
}

impl ThumbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbType::FixMax => "fix_max",
            ThumbType::FixMin => "fix_min",
            ThumbType::FixWidthOrHeight => "fix_width_or_height",
            ThumbType::FixWidth => "fix_width",
            ThumbType::FixHeight => "fix_height",
            ThumbType::Square => "square",
            ThumbType::FixBoth => "fix_both",
            ThumbType::FixScale => "fix_scale",
        }
    }
}

/// Rotation for `x-gmkerl-rotate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotate {
    /// Rotate according to EXIF orientation; ignored without EXIF
    Auto,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rotate::Auto => "auto",
            Rotate::Deg90 => "90",
            Rotate::Deg180 => "180",
            Rotate::Deg270 => "270",
        }
    }
}

/// Header name to value map sent verbatim with a request
///
/// Header names are case-insensitive, so keys are stored lowercase and a later
/// insert replaces an earlier one whatever its case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraParams {
    headers: BTreeMap<String, String>,
}

impl ExtraParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw header, replacing any previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let mut key = key.into();
        key.make_ascii_lowercase();
        self.headers.insert(key, value.into());
        self
    }

    /// Builder form of [`ExtraParams::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .get(key.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether the reserved auto-mkdir marker is present and truthy
    pub fn auto_mkdir(&self) -> bool {
        self.headers
            .get(AUTO_MKDIR_KEY)
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
    }

    /// Headers to send, with the reserved marker filtered out
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .filter(|(k, _)| k.as_str() != AUTO_MKDIR_KEY)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Thumbnail mode and its value (`150` or `200x150` depending on mode)
    pub fn thumb(self, kind: ThumbType, value: impl fmt::Display) -> Self {
        self.with("x-gmkerl-type", kind.as_str())
            .with("x-gmkerl-value", value.to_string())
    }

    /// Thumbnail quality, 1-100 (server default 95)
    pub fn quality(self, quality: u8) -> Self {
        self.with("x-gmkerl-quality", quality.clamp(1, 100).to_string())
    }

    pub fn unsharp(self, enabled: bool) -> Self {
        self.with("x-gmkerl-unsharp", enabled.to_string())
    }

    /// Named thumbnail version predefined on the bucket
    pub fn thumbnail(self, version: impl Into<String>) -> Self {
        self.with("x-gmkerl-thumbnail", version)
    }

    pub fn rotate(self, rotate: Rotate) -> Self {
        self.with("x-gmkerl-rotate", rotate.as_str())
    }

    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Self {
        self.with("x-gmkerl-crop", format!("{},{},{},{}", x, y, width, height))
    }

    /// Keep EXIF data through crop/scale/thumbnail transforms
    pub fn exif_switch(self, keep: bool) -> Self {
        self.with("x-gmkerl-exif-switch", keep.to_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtraParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = ExtraParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
