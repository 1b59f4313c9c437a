#[cfg(not(target_arch = "wasm32"))]
pub mod renderer;

#[cfg(target_arch = "wasm32")]
pub mod dom;

use std::{
    cell::RefCell,
    collections::BTreeMap,
    rc::Rc,
    time::Duration
};

use crate::game::{
    entity::NodeTransform,
    math::Vector2F
};

pub type NodeId = u64;

/// Frame delay as a host timer timeout in milliseconds, clamped to `i32::MAX`.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) fn timeout_millis(delay: Duration) -> i32 {
    i32::try_from(delay.as_millis()).unwrap_or(i32::MAX)
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Container element '{0}' not found")]
    ContainerNotFound(String),

    #[error("Host document unavailable")]
    NoDocument,

    #[error("Could not create visual node, reason='{0}'")]
    NodeCreation(String),
}

/// The host document: one container holding one visual node per entity.
pub trait Surface {
    /// Container dimensions; the stage reads this once and caches it.
    fn container_size(&self) -> Vector2F;

    /// Creates a node showing `sprite` and appends it to the container.
    fn create_node(&mut self, sprite: &str) -> Result<NodeId, SurfaceError>;

    fn set_node_sprite(&mut self, node: NodeId, sprite: &str);

    fn place_node(&mut self, node: NodeId, transform: &NodeTransform);

    fn remove_node(&mut self, node: NodeId);
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub sprite: String,
    pub transform: NodeTransform,
}

/// Retained node table; iteration follows creation order.
#[derive(Debug, Default)]
pub struct SceneNodes {
    next_node_id: NodeId,
    nodes: BTreeMap<NodeId, SceneNode>,
}

impl SceneNodes {
    pub fn get(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }
}

pub type Scene = Rc<RefCell<SceneNodes>>;

/// In-memory surface. The node table is shared, so a renderer or a test can
/// read what the stage last committed.
#[derive(Debug, Clone)]
pub struct SceneSurface {
    container_size: Vector2F,
    scene: Scene,
}

impl SceneSurface {
    pub fn new(container_size: Vector2F) -> Self {
        Self {
            container_size,
            scene: Scene::default(),
        }
    }

    pub fn scene(&self) -> Scene {
        self.scene.clone()
    }
}

impl Surface for SceneSurface {
    fn container_size(&self) -> Vector2F {
        self.container_size
    }

    fn create_node(&mut self, sprite: &str) -> Result<NodeId, SurfaceError> {
        let mut scene = self.scene.borrow_mut();
        let node = scene.next_node_id;
        scene.next_node_id += 1;
        scene.nodes.insert(node, SceneNode {
            sprite: sprite.to_string(),
            transform: NodeTransform::default(),
        });
        Ok(node)
    }

    fn set_node_sprite(&mut self, node: NodeId, sprite: &str) {
        if let Some(scene_node) = self.scene.borrow_mut().nodes.get_mut(&node) {
            scene_node.sprite = sprite.to_string();
        }
    }

    fn place_node(&mut self, node: NodeId, transform: &NodeTransform) {
        if let Some(scene_node) = self.scene.borrow_mut().nodes.get_mut(&node) {
            scene_node.transform = *transform;
        }
    }

    fn remove_node(&mut self, node: NodeId) {
        if self.scene.borrow_mut().nodes.remove(&node).is_none() {
            log::warn!("Attempt to remove not existing node {node}");
        }
    }
}
