//! Scene graph and hierarchical scene organization.
//!
//! A scene is a tree of boxed [`SceneNode`]s. Group and bone nodes are
//! [`ContainerNode`]s, nodes with geometry are [`ModelNode`]s. Local transforms
//! are set by the factories and by the animation mixer; world transforms are
//! derived by [`SceneNode::update_world_transforms`].

use std::sync::Arc;

use crate::{
    data_structures::{instance::Instance, model::Model},
    resources::animation::AnimationClip,
};

/// Transform and hierarchy state shared by every node kind.
#[derive(Default)]
pub struct NodeCore {
    pub name: Option<String>,
    pub local: Instance,
    pub world: Instance,
    pub children: Vec<Box<dyn SceneNode>>,
    /// Set for nodes referenced as joints by a skin.
    pub is_bone: bool,
}

impl NodeCore {
    pub fn named(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            ..Default::default()
        }
    }
}

pub trait SceneNode: Send + Sync {
    fn core(&self) -> &NodeCore;

    fn core_mut(&mut self) -> &mut NodeCore;

    fn model(&self) -> Option<&Model> {
        None
    }

    fn model_mut(&mut self) -> Option<&mut Model> {
        None
    }

    /// Clips imported together with this node. Only scene roots carry any.
    fn get_animation(&self) -> &[Arc<AnimationClip>] {
        &[]
    }

    fn name(&self) -> Option<&str> {
        self.core().name.as_deref()
    }

    fn is_bone(&self) -> bool {
        self.core().is_bone
    }

    fn get_local_transform(&self) -> &Instance {
        &self.core().local
    }

    fn local_transform_mut(&mut self) -> &mut Instance {
        &mut self.core_mut().local
    }

    fn get_world_transform(&self) -> &Instance {
        &self.core().world
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.core().children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.core_mut().children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.core_mut().children.push(child);
    }

    /// Recomputes this node's world transform from `parent` and recurses into the children.
    fn update_world_transforms(&mut self, parent: &Instance) {
        let core = self.core_mut();
        core.world = parent * &core.local;
        let world = core.world.clone();
        for child in core.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn update_world_transform_all(&mut self) {
        self.update_world_transforms(&Instance::default());
    }
}

pub struct ContainerNode {
    core: NodeCore,
    animations: Vec<Arc<AnimationClip>>,
}

impl ContainerNode {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            core: NodeCore::named(name),
            animations: Vec::new(),
        }
    }

    pub fn bone(name: Option<&str>) -> Self {
        let mut node = Self::new(name);
        node.core.is_bone = true;
        node
    }

    pub fn with_animations(mut self, animations: Vec<Arc<AnimationClip>>) -> Self {
        self.animations = animations;
        self
    }
}

impl SceneNode for ContainerNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn get_animation(&self) -> &[Arc<AnimationClip>] {
        &self.animations
    }
}

pub struct ModelNode {
    core: NodeCore,
    model: Model,
}

impl ModelNode {
    pub fn from_model(name: Option<&str>, model: Model) -> Self {
        Self {
            core: NodeCore::named(name),
            model,
        }
    }
}

impl SceneNode for ModelNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn model(&self) -> Option<&Model> {
        Some(&self.model)
    }

    fn model_mut(&mut self) -> Option<&mut Model> {
        Some(&mut self.model)
    }
}

/// Child indices leading from a root to one of its descendants.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn child(&self, idx: usize) -> Self {
        let mut path = self.0.clone();
        path.push(idx);
        Self(path)
    }
}

/// Depth-first search for the first node called `name`.
pub fn find_by_name<'a>(node: &'a dyn SceneNode, name: &str) -> Option<&'a dyn SceneNode> {
    find_path(node, name).and_then(|path| node_at(node, &path))
}

pub fn find_by_name_mut<'a>(
    node: &'a mut dyn SceneNode,
    name: &str,
) -> Option<&'a mut dyn SceneNode> {
    let path = find_path(node, name)?;
    node_at_mut(node, &path)
}

pub fn find_path(node: &dyn SceneNode, name: &str) -> Option<NodePath> {
    fn walk(node: &dyn SceneNode, name: &str, path: NodePath) -> Option<NodePath> {
        if node.name() == Some(name) {
            return Some(path);
        }
        node.get_children()
            .iter()
            .enumerate()
            .find_map(|(idx, child)| walk(child.as_ref(), name, path.child(idx)))
    }
    walk(node, name, NodePath::default())
}

pub fn node_at<'a>(node: &'a dyn SceneNode, path: &NodePath) -> Option<&'a dyn SceneNode> {
    let mut current = node;
    for &idx in &path.0 {
        current = current.get_children().get(idx)?.as_ref();
    }
    Some(current)
}

pub fn node_at_mut<'a>(
    node: &'a mut dyn SceneNode,
    path: &NodePath,
) -> Option<&'a mut dyn SceneNode> {
    let mut current = node;
    for &idx in &path.0 {
        current = current.get_children_mut().get_mut(idx)?.as_mut();
    }
    Some(current)
}

/// Visits every node depth-first, parents before children.
pub fn for_each_node(node: &dyn SceneNode, visit: &mut dyn FnMut(&dyn SceneNode)) {
    visit(node);
    for child in node.get_children() {
        for_each_node(child.as_ref(), visit);
    }
}
