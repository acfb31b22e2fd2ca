//! Players Module
//!
//! A player is one clip instance on the timeline: it carries the clip
//! configuration, its timing intent and resolved timing, and whatever the
//! host needs to load and draw the asset. The engine only talks to players
//! through the [`Player`] trait.

mod bindings;
mod factory;

pub use bindings::*;
pub use factory::*;

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::core::{
    timeline::{Asset, ClipConfig},
    timing::{ResolvedTiming, TimingIntent},
    CoreResult, TimeMs,
};

// =============================================================================
// Player Kind / Status
// =============================================================================

/// Player implementation selected from the asset type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerKind {
    Video,
    Audio,
    Luma,
    Image,
    Text,
    RichText,
    Html,
    Shape,
    Caption,
}

impl PlayerKind {
    pub fn for_asset(asset: &Asset) -> Self {
        match asset {
            Asset::Video(_) => Self::Video,
            Asset::Audio(_) => Self::Audio,
            Asset::Luma(_) => Self::Luma,
            Asset::Image(_) => Self::Image,
            Asset::Text(_) => Self::Text,
            Asset::RichText(_) => Self::RichText,
            Asset::Html(_) => Self::Html,
            Asset::Shape(_) => Self::Shape,
            Asset::Caption(_) => Self::Caption,
        }
    }

    /// Returns true for players with an audible or visible time base
    pub fn is_time_based(&self) -> bool {
        matches!(self, Self::Video | Self::Audio | Self::Luma)
    }
}

/// Lifecycle status of a player
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerStatus {
    /// Constructed, load not started
    Created,
    /// Asset load in flight
    Loading,
    /// Loaded and drawn
    Ready,
    /// Disposed; must not be used again
    Disposed,
}

// =============================================================================
// Player Trait
// =============================================================================

/// Clip instance driven by the engine
pub trait Player {
    fn kind(&self) -> PlayerKind;

    fn config(&self) -> &ClipConfig;

    /// Replaces the whole configuration
    fn set_config(&mut self, config: ClipConfig);

    fn timing_intent(&self) -> TimingIntent {
        self.config().timing_intent()
    }

    fn set_timing_intent(&mut self, intent: TimingIntent);

    fn resolved_timing(&self) -> ResolvedTiming;

    fn set_resolved_timing(&mut self, timing: ResolvedTiming);

    /// Resolved start in milliseconds
    fn start(&self) -> TimeMs {
        self.resolved_timing().start
    }

    /// Resolved length in milliseconds
    fn length(&self) -> TimeMs {
        self.resolved_timing().length
    }

    /// Resolved end in milliseconds
    fn end(&self) -> TimeMs {
        self.resolved_timing().end()
    }

    /// Starts loading the asset.
    ///
    /// The returned future must not borrow the player: the engine may dispose
    /// the player while the load is still pending.
    fn load(&mut self) -> LocalBoxFuture<'static, CoreResult<()>>;

    /// Builds the display state once the asset is loaded
    fn draw(&mut self);

    /// Per-frame update with the frame delta and the playhead position
    fn update(&mut self, delta_ms: TimeMs, elapsed_ms: TimeMs);

    fn dispose(&mut self);

    /// Rebuilds state after the configuration was restored by an undo
    fn reconfigure_after_restore(&mut self);

    fn status(&self) -> PlayerStatus;

    /// Returns true if the playhead is inside `[start, end)`
    fn is_active(&self, elapsed_ms: TimeMs) -> bool {
        elapsed_ms >= self.start() && elapsed_ms < self.end()
    }

    fn bindings(&self) -> &FieldBindings;

    fn set_bindings(&mut self, bindings: FieldBindings);
}

/// Deep copy of a player's configuration, taken by commands for undo
#[derive(Clone, Debug, PartialEq)]
pub struct ClipSnapshot {
    pub config: ClipConfig,
    pub bindings: FieldBindings,
}

impl ClipSnapshot {
    pub fn of(player: &dyn Player) -> Self {
        Self {
            config: player.config().clone(),
            bindings: player.bindings().clone(),
        }
    }
}

// =============================================================================
// Clip Player
// =============================================================================

/// Standard player for every asset type
pub struct ClipPlayer {
    kind: PlayerKind,
    config: ClipConfig,
    timing: ResolvedTiming,
    bindings: FieldBindings,
    loader: Rc<dyn AssetLoader>,
    status: PlayerStatus,
    visible: bool,
    draw_count: u32,
}

impl ClipPlayer {
    pub fn new(config: ClipConfig, loader: Rc<dyn AssetLoader>) -> Self {
        Self {
            kind: PlayerKind::for_asset(&config.asset),
            config,
            timing: ResolvedTiming::default(),
            bindings: FieldBindings::new(),
            loader,
            status: PlayerStatus::Created,
            visible: false,
            draw_count: 0,
        }
    }

    /// Whether the last update found the playhead inside the clip
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }
}

impl Player for ClipPlayer {
    fn kind(&self) -> PlayerKind {
        self.kind
    }

    fn config(&self) -> &ClipConfig {
        &self.config
    }

    fn set_config(&mut self, config: ClipConfig) {
        self.kind = PlayerKind::for_asset(&config.asset);
        self.config = config;
    }

    fn set_timing_intent(&mut self, intent: TimingIntent) {
        self.config.set_timing_intent(intent);
    }

    fn resolved_timing(&self) -> ResolvedTiming {
        self.timing
    }

    fn set_resolved_timing(&mut self, timing: ResolvedTiming) {
        self.timing = timing;
    }

    fn load(&mut self) -> LocalBoxFuture<'static, CoreResult<()>> {
        self.status = PlayerStatus::Loading;
        let loader = Rc::clone(&self.loader);
        let asset = self.config.asset.clone();
        Box::pin(async move { loader.load(&asset).await })
    }

    fn draw(&mut self) {
        if self.status == PlayerStatus::Disposed {
            return;
        }
        self.status = PlayerStatus::Ready;
        self.draw_count += 1;
    }

    fn update(&mut self, _delta_ms: TimeMs, elapsed_ms: TimeMs) {
        self.visible = self.status == PlayerStatus::Ready && self.is_active(elapsed_ms);
    }

    fn dispose(&mut self) {
        self.status = PlayerStatus::Disposed;
        self.visible = false;
    }

    fn reconfigure_after_restore(&mut self) {
        self.kind = PlayerKind::for_asset(&self.config.asset);
        self.visible = false;
    }

    fn status(&self) -> PlayerStatus {
        self.status
    }

    fn bindings(&self) -> &FieldBindings {
        &self.bindings
    }

    fn set_bindings(&mut self, bindings: FieldBindings) {
        self.bindings = bindings;
    }
}
