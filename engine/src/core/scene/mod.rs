//! Scene Graph Interface
//!
//! The engine does not render. It only keeps one container per track in the
//! host's scene graph, stacks containers by track index and attaches each
//! player's display object to its track's container.

use std::collections::HashMap;

use crate::core::{PlayerId, TrackId};

/// z-index of the container for track 0
pub const TRACK_Z_BASE: i32 = 100_000;

/// z-index distance between adjacent tracks
pub const TRACK_Z_STEP: i32 = 100;

/// Container z-index for a track index. Lower indices render above higher ones.
pub fn track_z_index(index: usize) -> i32 {
    let index = i32::try_from(index).unwrap_or(i32::MAX / TRACK_Z_STEP);
    TRACK_Z_BASE.saturating_sub(index.saturating_mul(TRACK_Z_STEP))
}

/// Minimal scene-graph surface used by the engine
pub trait SceneGraph {
    /// Adds a container. Returns false if one already exists for `key`.
    fn add_container(&mut self, key: &TrackId, z_index: i32) -> bool;

    /// Removes a container and detaches its children
    fn remove_container(&mut self, key: &TrackId) -> bool;

    fn has_container(&self, key: &TrackId) -> bool;

    fn set_z_index(&mut self, key: &TrackId, z_index: i32) -> bool;

    fn z_index(&self, key: &TrackId) -> Option<i32>;

    /// Appends a child. Returns false if the container doesn't exist.
    fn add_child(&mut self, key: &TrackId, child: &PlayerId) -> bool;

    fn remove_child(&mut self, key: &TrackId, child: &PlayerId) -> bool;

    /// Removes the child at `index`, returning it
    fn remove_child_at(&mut self, key: &TrackId, index: usize) -> Option<PlayerId>;

    fn children(&self, key: &TrackId) -> Option<&[PlayerId]>;
}

#[derive(Clone, Debug, Default)]
struct Container {
    z_index: i32,
    children: Vec<PlayerId>,
}

/// In-memory scene graph
#[derive(Clone, Debug, Default)]
pub struct SceneTree {
    containers: HashMap<TrackId, Container>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Container keys ordered front to back (highest z-index first)
    pub fn stacking_order(&self) -> Vec<TrackId> {
        let mut keys: Vec<(&TrackId, i32)> = self
            .containers
            .iter()
            .map(|(key, c)| (key, c.z_index))
            .collect();
        keys.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        keys.into_iter().map(|(key, _)| key.clone()).collect()
    }

    /// Finds the container holding `child`
    pub fn container_of(&self, child: &PlayerId) -> Option<&TrackId> {
        self.containers
            .iter()
            .find(|(_, c)| c.children.contains(child))
            .map(|(key, _)| key)
    }
}

impl SceneGraph for SceneTree {
    fn add_container(&mut self, key: &TrackId, z_index: i32) -> bool {
        if self.containers.contains_key(key) {
            return false;
        }
        self.containers.insert(
            key.clone(),
            Container {
                z_index,
                children: Vec::new(),
            },
        );
        true
    }

    fn remove_container(&mut self, key: &TrackId) -> bool {
        self.containers.remove(key).is_some()
    }

    fn has_container(&self, key: &TrackId) -> bool {
        self.containers.contains_key(key)
    }

    fn set_z_index(&mut self, key: &TrackId, z_index: i32) -> bool {
        match self.containers.get_mut(key) {
            Some(container) => {
                container.z_index = z_index;
                true
            }
            None => false,
        }
    }

    fn z_index(&self, key: &TrackId) -> Option<i32> {
        self.containers.get(key).map(|c| c.z_index)
    }

    fn add_child(&mut self, key: &TrackId, child: &PlayerId) -> bool {
        match self.containers.get_mut(key) {
            Some(container) => {
                container.children.push(child.clone());
                true
            }
            None => false,
        }
    }

    fn remove_child(&mut self, key: &TrackId, child: &PlayerId) -> bool {
        let Some(container) = self.containers.get_mut(key) else {
            return false;
        };
        match container.children.iter().position(|c| c == child) {
            Some(index) => {
                container.children.remove(index);
                true
            }
            None => false,
        }
    }

    fn remove_child_at(&mut self, key: &TrackId, index: usize) -> Option<PlayerId> {
        let container = self.containers.get_mut(key)?;
        if index < container.children.len() {
            Some(container.children.remove(index))
        } else {
            None
        }
    }

    fn children(&self, key: &TrackId) -> Option<&[PlayerId]> {
        self.containers.get(key).map(|c| c.children.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_z_index() {
        assert_eq!(track_z_index(0), 100_000);
        assert_eq!(track_z_index(3), 99_700);
    }

    #[test]
    fn test_container_children() {
        let mut scene = SceneTree::new();
        let track = "track-a".to_string();
        let (a, b) = ("a".to_string(), "b".to_string());

        assert!(!scene.add_child(&track, &a));
        assert!(scene.add_container(&track, track_z_index(0)));
        assert!(!scene.add_container(&track, 1));

        scene.add_child(&track, &a);
        scene.add_child(&track, &b);
        assert_eq!(scene.children(&track).unwrap(), &[a.clone(), b.clone()]);
        assert_eq!(scene.container_of(&b), Some(&track));

        assert_eq!(scene.remove_child_at(&track, 0), Some(a.clone()));
        assert!(!scene.remove_child(&track, &a));
        assert!(scene.remove_child(&track, &b));
        assert!(scene.children(&track).unwrap().is_empty());
    }

    #[test]
    fn test_stacking_order_follows_z_index() {
        let mut scene = SceneTree::new();
        let (top, bottom) = ("top".to_string(), "bottom".to_string());
        scene.add_container(&bottom, track_z_index(1));
        scene.add_container(&top, track_z_index(0));
        assert_eq!(scene.stacking_order(), vec![top.clone(), bottom.clone()]);

        scene.set_z_index(&top, track_z_index(2));
        assert_eq!(scene.stacking_order(), vec![bottom, top]);
    }
}
