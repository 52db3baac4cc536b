//! Already-parsed configuration tree.
//!
//! Each node has a name, an optional scalar value and ordered children.
//! Sequence items are children too; their names are their positions
//! (`"0"`, `"1"`, ...) as a YAML loader would produce, and the sequence
//! node itself is flagged so a reader can tell it from a map.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfNode {
    pub name: String,
    pub value: Option<String>,
    pub children: Vec<ConfNode>,
    pub is_seq: bool,
}

impl ConfNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            children: Vec::new(),
            is_seq: false,
        }
    }

    /// Leaf node carrying a scalar value.
    pub fn scalar(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            children: Vec::new(),
            is_seq: false,
        }
    }

    /// Sequence node whose items are scalars named by position.
    pub fn list<I, S>(name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::sequence(name, items.into_iter().map(|v| ConfNode::scalar("", v)))
    }

    /// Sequence node; each item is renamed to its position.
    pub fn sequence<I>(name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = ConfNode>,
    {
        let children = items
            .into_iter()
            .enumerate()
            .map(|(i, mut item)| {
                item.name = i.to_string();
                item
            })
            .collect();
        Self {
            name: name.into(),
            value: None,
            children,
            is_seq: true,
        }
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: ConfNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: ConfNode) {
        self.children.push(child);
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[inline]
    pub fn is_sequence(&self) -> bool {
        self.is_seq
    }

    pub fn children(&self) -> impl Iterator<Item = &ConfNode> {
        self.children.iter()
    }

    /// First child whose name matches, ignoring ASCII case.
    pub fn child(&self, name: &str) -> Option<&ConfNode> {
        self.children
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(ConfNode::value)
    }

    /// Resolve a dotted path such as `defrag.host-config`.
    pub fn get(&self, path: &str) -> Option<&ConfNode> {
        path.split('.')
            .filter(|p| !p.is_empty())
            .try_fold(self, |node, part| node.child(part))
    }
}
