//! Timeline Model Definitions
//!
//! Defines the edit document, track and clip configuration types.
//! The engine reads only `start`, `length`, the asset variant and `asset.trim`
//! from a clip; every other field is carried through untouched so a loaded
//! edit re-serializes without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{
    timing::{LengthIntent, StartIntent, TimingIntent},
    Size2D, TimeSec,
};

// =============================================================================
// Assets
// =============================================================================

/// Source media asset (video, audio, luma matte)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Source URL
    pub src: String,
    /// Seconds skipped at the start of the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<TimeSec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MediaAsset {
    pub fn new(src: &str) -> Self {
        Self {
            src: src.to_string(),
            trim: None,
            extra: Map::new(),
        }
    }

    pub fn with_trim(mut self, trim: TimeSec) -> Self {
        self.trim = Some(trim);
        self
    }
}

/// Still image asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub src: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Text and rich-text asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextAsset {
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// HTML asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HtmlAsset {
    pub html: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Vector shape asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeAsset {
    pub shape: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Caption (subtitle) asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptionAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Asset carried by a clip, tagged by `type`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Asset {
    Video(MediaAsset),
    Audio(MediaAsset),
    Luma(MediaAsset),
    Image(ImageAsset),
    Text(TextAsset),
    RichText(TextAsset),
    Html(HtmlAsset),
    Shape(ShapeAsset),
    Caption(CaptionAsset),
}

impl Asset {
    /// Creates a video asset
    pub fn video(src: &str) -> Self {
        Self::Video(MediaAsset::new(src))
    }

    /// Creates an audio asset
    pub fn audio(src: &str) -> Self {
        Self::Audio(MediaAsset::new(src))
    }

    /// Creates an image asset
    pub fn image(src: &str) -> Self {
        Self::Image(ImageAsset {
            src: src.to_string(),
            extra: Map::new(),
        })
    }

    /// Creates a plain text asset
    pub fn text(text: &str) -> Self {
        Self::Text(TextAsset {
            text: text.to_string(),
            extra: Map::new(),
        })
    }

    /// Returns the wire name of the asset type
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Video(_) => "video",
            Self::Audio(_) => "audio",
            Self::Luma(_) => "luma",
            Self::Image(_) => "image",
            Self::Text(_) => "text",
            Self::RichText(_) => "rich-text",
            Self::Html(_) => "html",
            Self::Shape(_) => "shape",
            Self::Caption(_) => "caption",
        }
    }

    fn media(&self) -> Option<&MediaAsset> {
        match self {
            Self::Video(m) | Self::Audio(m) | Self::Luma(m) => Some(m),
            _ => None,
        }
    }

    /// Returns true for time-based media that carries a `trim`
    pub fn is_trimmable(&self) -> bool {
        self.media().is_some()
    }

    /// Returns the media source if this asset can have its duration probed
    pub fn probe_source(&self) -> Option<&str> {
        self.media()
            .map(|m| m.src.as_str())
            .filter(|src| !src.trim().is_empty())
    }

    /// Returns the trim in seconds (0 for untrimmed media)
    pub fn trim(&self) -> Option<TimeSec> {
        self.media().map(|m| m.trim.unwrap_or(0.0))
    }

    /// Sets the trim on trimmable media. Returns false for other assets.
    pub fn set_trim(&mut self, trim: TimeSec) -> bool {
        match self {
            Self::Video(m) | Self::Audio(m) | Self::Luma(m) => {
                m.trim = Some(trim);
                true
            }
            _ => false,
        }
    }

    /// Returns the text of text-bearing assets
    pub fn text_content(&self) -> Option<&str> {
        match self {
            Self::Text(t) | Self::RichText(t) => Some(&t.text),
            _ => None,
        }
    }

    /// Replaces the text of text-bearing assets. Returns false for other assets.
    pub fn set_text_content(&mut self, text: &str) -> bool {
        match self {
            Self::Text(t) | Self::RichText(t) => {
                t.text = text.to_string();
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// Clip Configuration
// =============================================================================

/// Clip configuration as authored in the edit document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    pub asset: Asset,
    pub start: StartIntent,
    pub length: LengthIntent,
    /// Fields owned by renderers (fit, position, transitions, keyframes...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClipConfig {
    pub fn new(asset: Asset, start: StartIntent, length: LengthIntent) -> Self {
        Self {
            asset,
            start,
            length,
            extra: Map::new(),
        }
    }

    /// Clip that follows the previous one with a fixed length in seconds
    pub fn auto(asset: Asset, length: TimeSec) -> Self {
        Self::new(asset, StartIntent::Auto, LengthIntent::Seconds(length))
    }

    /// Clip at a fixed position with a fixed length, both in seconds
    pub fn fixed(asset: Asset, start: TimeSec, length: TimeSec) -> Self {
        Self::new(
            asset,
            StartIntent::Seconds(start),
            LengthIntent::Seconds(length),
        )
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn timing_intent(&self) -> TimingIntent {
        TimingIntent::new(self.start, self.length)
    }

    pub fn set_timing_intent(&mut self, intent: TimingIntent) {
        self.start = intent.start;
        self.length = intent.length;
    }
}

// =============================================================================
// Edit Document
// =============================================================================

/// Track as stored in the edit document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    #[serde(default)]
    pub clips: Vec<ClipConfig>,
}

/// Timeline section of the edit document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Output section of the edit document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size2D>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "mp4".to_string(),
            size: Some(Size2D::default()),
            fps: Some(25.0),
            extra: Map::new(),
        }
    }
}

/// Merge field substituted into `{{ FIND }}` placeholders
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeField {
    pub find: String,
    pub replace: String,
}

impl MergeField {
    pub fn new(find: &str, replace: &str) -> Self {
        Self {
            find: find.to_string(),
            replace: replace.to_string(),
        }
    }
}

/// Complete edit document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDocument {
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merge: Vec<MergeField>,
}

impl EditDocument {
    /// Parses a document from JSON text
    pub fn from_json_str(json: &str) -> crate::core::CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Total number of clips across all tracks
    pub fn clip_count(&self) -> usize {
        self.timeline.tracks.iter().map(|t| t.clips.len()).sum()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clip_config_roundtrip_preserves_unknown_fields() {
        let value = json!({
            "asset": { "type": "video", "src": "https://cdn/a.mp4", "trim": 1.5, "volume": 0.5 },
            "start": "auto",
            "length": "end",
            "fit": "cover",
            "transition": { "in": "fade" }
        });

        let clip: ClipConfig = serde_json::from_value(value.clone()).unwrap();
        assert!(clip.start.is_auto());
        assert!(clip.length.is_end());
        assert_eq!(clip.asset.trim(), Some(1.5));
        assert_eq!(clip.extra["fit"], json!("cover"));

        let back = serde_json::to_value(&clip).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_asset_tags() {
        let asset: Asset =
            serde_json::from_value(json!({ "type": "rich-text", "text": "Hello" })).unwrap();
        assert_eq!(asset.type_name(), "rich-text");
        assert_eq!(asset.text_content(), Some("Hello"));
        assert!(!asset.is_trimmable());
        assert!(asset.probe_source().is_none());
    }

    #[test]
    fn test_unknown_asset_type_rejected() {
        let result = serde_json::from_value::<Asset>(json!({ "type": "hologram", "src": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_trim_defaults_to_zero_for_media() {
        let mut asset = Asset::audio("https://cdn/a.mp3");
        assert_eq!(asset.trim(), Some(0.0));
        assert!(asset.set_trim(2.0));
        assert_eq!(asset.trim(), Some(2.0));

        let mut text = Asset::text("hi");
        assert_eq!(text.trim(), None);
        assert!(!text.set_trim(1.0));
    }

    #[test]
    fn test_probe_source_ignores_empty_src() {
        assert!(Asset::video("  ").probe_source().is_none());
        assert_eq!(Asset::video("a.mp4").probe_source(), Some("a.mp4"));
    }

    #[test]
    fn test_document_parse() {
        let doc = EditDocument::from_json_str(
            r##"{
                "timeline": {
                    "background": "#000000",
                    "tracks": [
                        { "clips": [ { "asset": { "type": "text", "text": "Hi" }, "start": 0, "length": 2 } ] },
                        { "clips": [] }
                    ]
                },
                "output": { "format": "mp4", "size": { "width": 1280, "height": 720 } },
                "merge": [ { "find": "NAME", "replace": "World" } ]
            }"##,
        )
        .unwrap();

        assert_eq!(doc.timeline.tracks.len(), 2);
        assert_eq!(doc.clip_count(), 1);
        assert_eq!(doc.output.size, Some(Size2D::new(1280, 720)));
        assert_eq!(doc.merge[0].find, "NAME");
    }
}
