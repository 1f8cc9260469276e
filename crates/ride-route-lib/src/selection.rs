//! User selection state and the generation guard used to drop stale async results

use crate::nodes::{Node, NodeKey};
use crate::route::TransportMode;
use std::collections::HashMap;

/// Generation of the start/destination/via state a request was issued for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GuardToken(u64);

impl GuardToken {
    #[inline]
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Why a node is a priority node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Start,
    Destination,
    /// Position in the via list
    Via(usize),
}

/// Nodes exempt from decluttering, with the role each one plays in the route
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrioritySet {
    roles: HashMap<NodeKey, Role>,
}

impl PrioritySet {
    /// Role of `key`; when a node plays several roles start wins over destination, and
    /// destination over via
    #[inline]
    pub fn role(&self, key: NodeKey) -> Option<Role> {
        self.roles.get(&key).copied()
    }

    #[inline]
    pub fn contains(&self, key: NodeKey) -> bool {
        self.roles.contains_key(&key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// What the user has picked on the map
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pinned: Option<Node>,
    start: Option<Node>,
    dest: Option<Node>,
    via: Vec<Node>,
    active_mode: Option<TransportMode>,
    generation: u64,
}

impl Selection {
    #[inline]
    pub fn pinned(&self) -> Option<&Node> {
        self.pinned.as_ref()
    }

    #[inline]
    pub fn start(&self) -> Option<&Node> {
        self.start.as_ref()
    }

    #[inline]
    pub fn dest(&self) -> Option<&Node> {
        self.dest.as_ref()
    }

    #[inline]
    pub fn via(&self) -> &[Node] {
        &self.via
    }

    #[inline]
    pub fn active_mode(&self) -> Option<TransportMode> {
        self.active_mode
    }

    /// Token for the current start/destination/via state
    #[inline]
    pub fn token(&self) -> GuardToken {
        GuardToken(self.generation)
    }

    #[inline]
    pub fn is_current(&self, token: GuardToken) -> bool {
        token.0 == self.generation
    }

    /// Returns `true` if the pinned node changed
    pub fn set_pinned(&mut self, node: Option<Node>) -> bool {
        let changed = self.pinned.map(|n| n.key()) != node.map(|n| n.key());
        self.pinned = node;
        changed
    }

    /// Returns `true` if the start changed; a change invalidates in-flight requests
    pub fn set_start(&mut self, node: Option<Node>) -> bool {
        let changed = self.start.map(|n| n.key()) != node.map(|n| n.key());
        if changed {
            self.start = node;
            self.bump();
        }
        changed
    }

    /// Returns `true` if the destination changed; a change invalidates in-flight requests
    pub fn set_dest(&mut self, node: Option<Node>) -> bool {
        let changed = self.dest.map(|n| n.key()) != node.map(|n| n.key());
        if changed {
            self.dest = node;
            self.bump();
        }
        changed
    }

    pub fn push_via(&mut self, node: Node) {
        self.via.push(node);
        self.bump();
    }

    pub fn remove_via(&mut self, index: usize) -> Option<Node> {
        (index < self.via.len()).then(|| {
            self.bump();
            self.via.remove(index)
        })
    }

    /// Switch start and destination
    pub fn swap_endpoints(&mut self) {
        if self.start.is_some() || self.dest.is_some() {
            std::mem::swap(&mut self.start, &mut self.dest);
            self.bump();
        }
    }

    /// Clears every selection except the pin
    pub fn clear_route(&mut self) {
        self.start = None;
        self.dest = None;
        self.via.clear();
        self.active_mode = None;
        self.bump();
    }

    pub fn set_active_mode(&mut self, mode: Option<TransportMode>) {
        self.active_mode = mode;
    }

    /// Ordered stops `[start, via.., dest]`, `None` unless both endpoints are set
    pub fn stops(&self) -> Option<Vec<Node>> {
        let (start, dest) = (self.start?, self.dest?);
        let mut stops = Vec::with_capacity(self.via.len() + 2);
        stops.push(start);
        stops.extend_from_slice(&self.via);
        stops.push(dest);
        Some(stops)
    }

    /// Start, destination and via stops
    pub fn priority(&self) -> PrioritySet {
        let mut roles = HashMap::new();
        for (index, node) in self.via.iter().enumerate() {
            roles.entry(node.key()).or_insert(Role::Via(index));
        }
        if let Some(dest) = self.dest {
            roles.insert(dest.key(), Role::Destination);
        }
        if let Some(start) = self.start {
            roles.insert(start.key(), Role::Start);
        }
        PrioritySet { roles }
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}
