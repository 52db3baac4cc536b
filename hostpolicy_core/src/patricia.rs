//! Arena-backed Patricia tree for one address family.
//!
//! Keys are left-aligned in a `u128`, so bit 0 is always the most
//! significant bit of the address regardless of family. Nodes live in a
//! `Vec` owned by the tree and refer to each other by [`NodeId`]; nothing
//! outside the tree ever holds a node.

use crate::errors::Error;
use crate::helpers::{canonical, common_prefix_len, get_bit};
use crate::types::{Entry, Family, InsertOutcome, Node, NodeId, Prefix};
use log::{debug, trace};

/// The slot an insert is about to rewrite.
#[derive(Debug, Copy, Clone)]
enum Link {
    Root,
    Child(NodeId, u8),
}

#[derive(Debug, Clone)]
pub struct PatriciaTree<T> {
    family: Family,
    nodes: Vec<Node<T>>,
    root: Option<NodeId>,
    len: usize,
}

impl<T> PatriciaTree<T> {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            nodes: Vec::new(),
            root: None,
            len: 0,
        }
    }

    /// Pre-size the arena. Fails instead of aborting when memory is short.
    pub fn with_capacity(family: Family, capacity: usize) -> Result<Self, Error> {
        let mut tree = Self::new(family);
        tree.nodes
            .try_reserve_exact(capacity)
            .map_err(|_| Error::AllocationFailure(capacity))?;
        Ok(tree)
    }

    #[inline]
    pub fn family(&self) -> Family {
        self.family
    }

    /// Number of stored prefixes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of arena slots in use, branch nodes included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id as usize]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id as usize]
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    fn link(&self, link: Link) -> Option<NodeId> {
        match link {
            Link::Root => self.root,
            Link::Child(parent, bit) => self.node(parent).child(bit),
        }
    }

    fn set_link(&mut self, link: Link, id: NodeId) {
        match link {
            Link::Root => self.root = Some(id),
            Link::Child(parent, bit) => *self.node_mut(parent).child_mut(bit) = Some(id),
        }
    }

    /// Insert `value` under `prefix`. The first value stored for a prefix
    /// wins; re-inserting reports [`InsertOutcome::Existing`].
    pub fn insert(&mut self, prefix: &Prefix, value: T) -> Result<InsertOutcome, Error> {
        if prefix.family() != self.family {
            return Err(Error::InvalidPrefix {
                family: prefix.family(),
                len: self.family.addr_len(),
                prefix_len: prefix.prefix_len(),
            });
        }
        let key = prefix.key();
        let prefix_len = prefix.prefix_len();
        trace!("[INSERT] {} key={:x} plen={}", prefix, key, prefix_len);

        // At most two nodes are added (split), reserve before touching links.
        if self.nodes.len() + 2 > NodeId::MAX as usize {
            return Err(Error::AllocationFailure(self.nodes.len() + 2));
        }
        self.nodes
            .try_reserve(2)
            .map_err(|_| Error::AllocationFailure(self.nodes.len() + 2))?;

        let mut link = Link::Root;
        loop {
            // --- Case 1: Empty Link ---
            let Some(cur) = self.link(link) else {
                let leaf = self.alloc(Node::leaf(key, prefix_len, value));
                self.set_link(link, leaf);
                self.len += 1;
                debug!("[INSERT] {} stored as leaf {}", prefix, leaf);
                return Ok(InsertOutcome::Inserted);
            };

            let (cur_key, cur_plen) = {
                let n = self.node(cur);
                (n.key, n.prefix_len)
            };
            let cpl = common_prefix_len(key, cur_key, prefix_len.min(cur_plen));

            // --- Case 2: Exact Match ---
            if cpl == prefix_len && prefix_len == cur_plen {
                let node = self.node_mut(cur);
                if node.is_terminal() {
                    debug!("[INSERT] {} already stored, keeping first value", prefix);
                    return Ok(InsertOutcome::Existing);
                }
                node.value = Some(value);
                self.len += 1;
                debug!("[INSERT] {} promoted branch {} to terminal", prefix, cur);
                return Ok(InsertOutcome::Inserted);
            }

            // --- Case 3: Insert Above (new prefix covers the current node) ---
            if cpl == prefix_len {
                let mut above = Node::leaf(key, prefix_len, value);
                *above.child_mut(get_bit(cur_key, prefix_len)) = Some(cur);
                let id = self.alloc(above);
                self.set_link(link, id);
                self.len += 1;
                debug!("[INSERT] {} inserted above node {}", prefix, cur);
                return Ok(InsertOutcome::Inserted);
            }

            // --- Case 4: Split (keys diverge before either prefix ends) ---
            if cpl < cur_plen {
                let mut branch = Node::branch(canonical(key, cpl), cpl);
                let leaf = self.alloc(Node::leaf(key, prefix_len, value));
                let new_bit = get_bit(key, cpl);
                *branch.child_mut(new_bit) = Some(leaf);
                *branch.child_mut(new_bit ^ 1) = Some(cur);
                let id = self.alloc(branch);
                self.set_link(link, id);
                self.len += 1;
                debug!("[INSERT] {} split at bit {} (branch {})", prefix, cpl, id);
                return Ok(InsertOutcome::Inserted);
            }

            // --- Case 5: Descend (current node is a proper prefix of the key) ---
            link = Link::Child(cur, get_bit(key, cur_plen));
            trace!("[INSERT] descending past node {} at bit {}", cur, cur_plen);
        }
    }

    /// Longest-prefix match for a left-aligned address key.
    pub fn best_match(&self, key: u128) -> Option<&T> {
        let width = self.family.bits();
        let mut best = None;
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = self.node(id);
            if common_prefix_len(key, node.key, node.prefix_len) < node.prefix_len {
                break;
            }
            if let Some(v) = node.value.as_ref() {
                best = Some(v);
            }
            if node.prefix_len >= width {
                break;
            }
            cur = node.child(get_bit(key, node.prefix_len));
        }
        best
    }

    /// Value stored for exactly this prefix, if any.
    pub fn get(&self, prefix: &Prefix) -> Option<&T> {
        if prefix.family() != self.family {
            return None;
        }
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = self.node(id);
            if node.prefix_len > prefix.prefix_len()
                || common_prefix_len(prefix.key(), node.key, node.prefix_len) < node.prefix_len
            {
                return None;
            }
            if node.prefix_len == prefix.prefix_len() {
                return node.value.as_ref();
            }
            cur = node.child(get_bit(prefix.key(), node.prefix_len));
        }
        None
    }

    /// All stored entries in pre-order (shorter prefixes before the ones they cover).
    pub fn entries(&self) -> Vec<Entry<T>>
    where
        T: Clone,
    {
        let mut out = Vec::with_capacity(self.len);
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if let Some(v) = node.value.as_ref() {
                let bytes = node.key.to_be_bytes();
                if let Ok(prefix) = Prefix::new(
                    self.family,
                    &bytes[..self.family.addr_len()],
                    node.prefix_len,
                ) {
                    out.push(Entry {
                        prefix,
                        value: v.clone(),
                    });
                }
            }
            // push right first so the left subtree is visited first
            stack.extend(node.right);
            stack.extend(node.left);
        }
        out
    }
}
