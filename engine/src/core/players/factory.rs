//! Player Factory and Asset Loaders

use std::collections::HashSet;
use std::rc::Rc;

use async_trait::async_trait;

use crate::core::{
    players::{ClipPlayer, Player},
    timeline::{Asset, ClipConfig},
    CoreError, CoreResult,
};

// =============================================================================
// Asset Loader
// =============================================================================

/// Fetches and decodes an asset for a player
#[async_trait(?Send)]
pub trait AssetLoader {
    async fn load(&self, asset: &Asset) -> CoreResult<()>;
}

/// Loader that completes immediately
#[derive(Clone, Debug, Default)]
pub struct NoopLoader;

#[async_trait(?Send)]
impl AssetLoader for NoopLoader {
    async fn load(&self, _asset: &Asset) -> CoreResult<()> {
        Ok(())
    }
}

/// Loader with scripted failures and stalls, keyed by source URL or text
#[derive(Clone, Debug, Default)]
pub struct MockLoader {
    failing: HashSet<String>,
    stalled: HashSet<String>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads of `source` fail with [`CoreError::AssetLoadFailed`]
    pub fn failing(mut self, source: &str) -> Self {
        self.failing.insert(source.to_string());
        self
    }

    /// Loads of `source` never complete
    pub fn stalled(mut self, source: &str) -> Self {
        self.stalled.insert(source.to_string());
        self
    }

    fn source_of(asset: &Asset) -> String {
        match asset {
            Asset::Video(m) | Asset::Audio(m) | Asset::Luma(m) => m.src.clone(),
            Asset::Image(i) => i.src.clone(),
            Asset::Text(t) | Asset::RichText(t) => t.text.clone(),
            Asset::Html(h) => h.html.clone(),
            Asset::Shape(s) => s.shape.clone(),
            Asset::Caption(c) => c.src.clone().unwrap_or_default(),
        }
    }
}

#[async_trait(?Send)]
impl AssetLoader for MockLoader {
    async fn load(&self, asset: &Asset) -> CoreResult<()> {
        let source = Self::source_of(asset);
        if self.stalled.contains(&source) {
            futures::future::pending::<()>().await;
        }
        if self.failing.contains(&source) {
            return Err(CoreError::AssetLoadFailed(source));
        }
        Ok(())
    }
}

// =============================================================================
// Player Factory
// =============================================================================

/// Builds players from clip configurations
pub trait PlayerFactory {
    fn create(&self, config: &ClipConfig) -> CoreResult<Box<dyn Player>>;
}

/// Factory producing a [`ClipPlayer`] for every asset type
pub struct StandardPlayerFactory {
    loader: Rc<dyn AssetLoader>,
}

impl StandardPlayerFactory {
    pub fn new(loader: Rc<dyn AssetLoader>) -> Self {
        Self { loader }
    }
}

impl Default for StandardPlayerFactory {
    fn default() -> Self {
        Self::new(Rc::new(NoopLoader))
    }
}

fn require_source(kind: &str, src: &str) -> CoreResult<()> {
    if src.trim().is_empty() {
        return Err(CoreError::PlayerConstruction(format!(
            "{kind} asset requires a non-empty src"
        )));
    }
    Ok(())
}

impl PlayerFactory for StandardPlayerFactory {
    fn create(&self, config: &ClipConfig) -> CoreResult<Box<dyn Player>> {
        match &config.asset {
            Asset::Video(m) | Asset::Audio(m) | Asset::Luma(m) => {
                require_source(config.asset.type_name(), &m.src)?;
                if m.trim.is_some_and(|t| !t.is_finite() || t < 0.0) {
                    return Err(CoreError::PlayerConstruction(
                        "trim must be finite and non-negative".to_string(),
                    ));
                }
            }
            Asset::Image(i) => require_source("image", &i.src)?,
            Asset::Text(_) | Asset::RichText(_) | Asset::Html(_) | Asset::Shape(_) => {}
            Asset::Caption(c) => {
                if let Some(src) = &c.src {
                    require_source("caption", src)?;
                }
            }
        }

        Ok(Box::new(ClipPlayer::new(
            config.clone(),
            Rc::clone(&self.loader),
        )))
    }
}
