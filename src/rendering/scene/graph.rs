use std::collections::HashMap;
use crate::rendering::scene::{NodeId, Object};
use crate::world::RenderableProvider;

pub struct SceneGraph {
    nodes: HashMap<NodeId, Object>,
    next_id: u32,
    // Add hierarchical relationships later
}

impl SceneGraph {
    pub fn new() -> Self {
        SceneGraph {
            nodes: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn add_object(&mut self, object: Object) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, object);
        id
    }

    pub fn remove_object(&mut self, id: NodeId) -> Option<Object> {
        self.nodes.remove(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Object> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Object> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderableProvider for SceneGraph {
    type Target = Object;

    fn is_live(&self, node: NodeId) -> bool {
        self.contains(node)
    }

    fn target_mut(&mut self, node: NodeId) -> Option<&mut Object> {
        self.get_mut(node)
    }
}
