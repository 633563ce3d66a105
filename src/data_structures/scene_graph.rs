//! Scene graph and hierarchical scene organization.
//!
//! A [`TransformTree`] is an arena of nodes, each with a local transform and
//! an enabled flag. The [`SceneGraph`] owns such a tree together with the
//! drawables attached to its nodes, the camera, the light and the scene
//! clock. Rendering walks the tree depth-first, composes the world
//! transforms and draws every drawable on a visible node.
//!
//! # Visibility
//!
//! A node is visible when it and all of its ancestors are enabled, so
//! disabling a node hides its whole subtree.
//!
//! # Cursor
//!
//! For quick scene construction the graph keeps a cursor. [`SceneGraph::add_child`]
//! creates a node below the cursor and moves the cursor onto it,
//! [`SceneGraph::ascend`] moves it back up. Drawables added with
//! [`SceneGraph::add_drawable`] attach to the cursor.

use cgmath::SquareMatrix;
use thiserror::Error;

use crate::{
    camera::{Camera, Light, Viewpoint},
    data_structures::drawable::{Drawable, FrameView},
    registry::{MaterialHandle, Registry, RegistryError},
    render::RenderBackend,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("the cursor is already at the root")]
    AscendPastRoot,
    #[error("node {0} does not exist")]
    UnknownNode(usize),
    #[error("drawable {0} does not exist")]
    UnknownDrawable(usize),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Index of a node in its [`TransformTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransformNode {
    pub local: cgmath::Matrix4<f32>,
    pub enabled: bool,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
}

impl TransformNode {
    fn new(parent: Option<NodeHandle>, local: cgmath::Matrix4<f32>) -> Self {
        Self {
            local,
            enabled: true,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }
}

/**
 * Nodes are only ever appended, so every handle handed out stays valid and
 * the tree can't form cycles.
 */
#[derive(Clone, Debug)]
pub struct TransformTree {
    nodes: Vec<TransformNode>,
}

impl Default for TransformTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![TransformNode::new(None, cgmath::Matrix4::identity())],
        }
    }

    pub fn root(&self) -> NodeHandle {
        NodeHandle(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // the root always exists
        false
    }

    pub fn add_child(
        &mut self,
        parent: NodeHandle,
        local: cgmath::Matrix4<f32>,
    ) -> Result<NodeHandle, SceneError> {
        self.node(parent)?;
        Ok(self.push(parent, local))
    }

    // `parent` must already be in the arena
    fn push(&mut self, parent: NodeHandle, local: cgmath::Matrix4<f32>) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len());
        self.nodes.push(TransformNode::new(Some(parent), local));
        self.nodes[parent.0].children.push(handle);
        handle
    }

    pub fn node(&self, handle: NodeHandle) -> Result<&TransformNode, SceneError> {
        self.nodes
            .get(handle.0)
            .ok_or(SceneError::UnknownNode(handle.0))
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut TransformNode, SceneError> {
        self.nodes
            .get_mut(handle.0)
            .ok_or(SceneError::UnknownNode(handle.0))
    }

    pub fn parent(&self, handle: NodeHandle) -> Result<Option<NodeHandle>, SceneError> {
        Ok(self.node(handle)?.parent)
    }

    /// Replaces the local transform; the next traversal picks it up.
    pub fn set_transform(
        &mut self,
        handle: NodeHandle,
        local: cgmath::Matrix4<f32>,
    ) -> Result<(), SceneError> {
        self.node_mut(handle)?.local = local;
        Ok(())
    }

    pub fn transform(&self, handle: NodeHandle) -> Result<cgmath::Matrix4<f32>, SceneError> {
        Ok(self.node(handle)?.local)
    }

    pub fn set_enabled(&mut self, handle: NodeHandle, enabled: bool) -> Result<(), SceneError> {
        self.node_mut(handle)?.enabled = enabled;
        Ok(())
    }

    pub fn is_enabled(&self, handle: NodeHandle) -> Result<bool, SceneError> {
        Ok(self.node(handle)?.enabled)
    }

    /// `world(child) = world(parent) * local(child)`, starting with the root's local transform.
    pub fn world_transform(&self, handle: NodeHandle) -> Result<cgmath::Matrix4<f32>, SceneError> {
        let mut node = self.node(handle)?;
        let mut world = node.local;
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            world = node.local * world;
        }
        Ok(world)
    }

    /// True when the node and every ancestor are enabled.
    pub fn is_visible(&self, handle: NodeHandle) -> Result<bool, SceneError> {
        let mut current = Some(handle);
        while let Some(handle) = current {
            let node = self.node(handle)?;
            if !node.enabled {
                return Ok(false);
            }
            current = node.parent;
        }
        Ok(true)
    }

    /**
     * Depth-first walk over the visible part of the tree. Children are
     * visited in insertion order and a disabled node prunes its subtree.
     *
     * Returns the world transform of every node, `None` for hidden ones.
     */
    pub fn visible_world_transforms(&self) -> Vec<Option<cgmath::Matrix4<f32>>> {
        let mut worlds = vec![None; self.nodes.len()];
        let mut stack = vec![(self.root(), cgmath::Matrix4::identity())];
        while let Some((handle, parent_world)) = stack.pop() {
            let node = &self.nodes[handle.0];
            if !node.enabled {
                continue;
            }
            let world = parent_world * node.local;
            worlds[handle.0] = Some(world);
            // reversed so the first child is popped first
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
        worlds
    }
}

/// Index of a drawable in its [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DrawableId(usize);

impl DrawableId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Per-traversal switches.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderOptions {
    /// Draw every drawable with this material instead of its own.
    pub material_override: Option<MaterialHandle>,
}

#[derive(Debug)]
pub struct SceneGraph {
    tree: TransformTree,
    cursor: NodeHandle,
    drawables: Vec<(NodeHandle, Drawable)>,
    pub camera: Camera,
    pub light: Light,
    time: f32,
}

impl SceneGraph {
    pub fn new(camera: Camera, light: Light) -> Self {
        let tree = TransformTree::new();
        let cursor = tree.root();
        Self {
            tree,
            cursor,
            drawables: Vec::new(),
            camera,
            light,
            time: 0.0,
        }
    }

    pub fn tree(&self) -> &TransformTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut TransformTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeHandle {
        self.tree.root()
    }

    pub fn cursor(&self) -> NodeHandle {
        self.cursor
    }

    /// Creates a node below the cursor and moves the cursor onto it.
    pub fn add_child(&mut self, local: cgmath::Matrix4<f32>) -> NodeHandle {
        // the cursor always names a live node, so this only falls back in theory
        let node = self.tree.add_child(self.cursor, local).unwrap_or_else(|e| {
            log::error!("{}, attaching to the root instead", e);
            self.tree.push(NodeHandle(0), local)
        });
        self.cursor = node;
        node
    }

    /// Moves the cursor to its parent. Fails at the root and leaves the cursor there.
    pub fn ascend(&mut self) -> Result<NodeHandle, SceneError> {
        match self.tree.parent(self.cursor)? {
            Some(parent) => {
                self.cursor = parent;
                Ok(parent)
            }
            None => Err(SceneError::AscendPastRoot),
        }
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = self.tree.root();
    }

    pub fn set_cursor(&mut self, node: NodeHandle) -> Result<(), SceneError> {
        self.tree.node(node)?;
        self.cursor = node;
        Ok(())
    }

    pub fn set_transform(
        &mut self,
        node: NodeHandle,
        local: cgmath::Matrix4<f32>,
    ) -> Result<(), SceneError> {
        self.tree.set_transform(node, local)
    }

    pub fn set_enabled(&mut self, node: NodeHandle, enabled: bool) -> Result<(), SceneError> {
        self.tree.set_enabled(node, enabled)
    }

    pub fn world_transform(&self, node: NodeHandle) -> Result<cgmath::Matrix4<f32>, SceneError> {
        self.tree.world_transform(node)
    }

    /// Attaches a drawable to the cursor.
    pub fn add_drawable(&mut self, drawable: Drawable) -> DrawableId {
        let id = DrawableId(self.drawables.len());
        log::debug!("adding {} at node {}", drawable.name, self.cursor.0);
        self.drawables.push((self.cursor, drawable));
        id
    }

    pub fn add_drawable_at(
        &mut self,
        node: NodeHandle,
        drawable: Drawable,
    ) -> Result<DrawableId, SceneError> {
        self.tree.node(node)?;
        let id = DrawableId(self.drawables.len());
        self.drawables.push((node, drawable));
        Ok(id)
    }

    pub fn drawable(&self, id: DrawableId) -> Result<&Drawable, SceneError> {
        self.drawables
            .get(id.0)
            .map(|(_, drawable)| drawable)
            .ok_or(SceneError::UnknownDrawable(id.0))
    }

    pub fn drawable_mut(&mut self, id: DrawableId) -> Result<&mut Drawable, SceneError> {
        self.drawables
            .get_mut(id.0)
            .map(|(_, drawable)| drawable)
            .ok_or(SceneError::UnknownDrawable(id.0))
    }

    pub fn node_of(&self, id: DrawableId) -> Result<NodeHandle, SceneError> {
        self.drawables
            .get(id.0)
            .map(|(node, _)| *node)
            .ok_or(SceneError::UnknownDrawable(id.0))
    }

    /// All drawables with their nodes, in insertion order.
    pub fn drawables(&self) -> impl Iterator<Item = (NodeHandle, &Drawable)> {
        self.drawables.iter().map(|(node, drawable)| (*node, drawable))
    }

    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    /// Elapsed scene time in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advances the clock and every particle system.
    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        for (_, drawable) in self.drawables.iter_mut() {
            if let Some(system) = drawable.particles_mut() {
                system.step(dt);
            }
        }
    }

    pub fn set_particles_paused(&mut self, paused: bool) {
        for (_, drawable) in self.drawables.iter_mut() {
            if let Some(system) = drawable.particles_mut() {
                system.paused = paused;
            }
        }
    }

    /// Matrices and positions for rendering from `viewpoint`.
    pub fn frame_view(&self, viewpoint: &dyn Viewpoint) -> FrameView {
        FrameView {
            view: viewpoint.view_matrix(),
            proj: viewpoint.projection_matrix(),
            camera_pos: self.camera.position,
            light_pos: self.light.position,
            light_view_proj: self.light.view_projection(),
            time: self.time,
        }
    }

    /**
     * Draws every drawable on a visible node from `viewpoint`, in insertion order.
     *
     * Returns the number of draw calls issued. Depth testing is left as the
     * caller configured it.
     */
    pub fn render_from(
        &self,
        viewpoint: &dyn Viewpoint,
        backend: &mut dyn RenderBackend,
        registry: &Registry,
        options: &RenderOptions,
    ) -> Result<usize, SceneError> {
        let frame = self.frame_view(viewpoint);
        let worlds = self.tree.visible_world_transforms();
        let mut draws = 0;
        for (node, drawable) in self.drawables.iter() {
            let world = match worlds.get(node.0).copied().flatten() {
                Some(world) => world,
                None => continue,
            };
            let material = registry.material(options.material_override.unwrap_or(drawable.material))?;
            let shader = registry.shader_of(material)?;
            draws += drawable.draw(world, &frame, material, shader, backend);
        }
        Ok(draws)
    }
}
