//! The input value model (I-nodes).
//!
//! Input trees are stored in an arena rather than as a graph of owned
//! pointers: every node is addressed by a [`NodeId`], parent links are plain
//! indices, and the whole tree is torn down in one deallocation when the
//! owning [`Arena`] is dropped.
use crate::bitmask::{self, TypeBit, TypeName};
use serde_json::Value as RawValue;

/// A handle into an [`Arena`]. Cheap to copy, stable for the lifetime of the
/// arena it was produced by.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct NodeId(u32);

/// The shape of a single I-node, excluding its back-references.
#[derive(Debug, Clone)]
pub enum Kind {
    Root(NodeId),
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// Element ids, in input order.
    Array(Vec<NodeId>),
    /// `(key, value id)` pairs, in input order.
    Object(Vec<(String, NodeId)>),
}

impl Kind {
    #[must_use]
    pub const fn type_name(&self) -> TypeName {
        match self {
            Kind::Root(_) => TypeName::Root,
            Kind::Null => TypeName::Null,
            Kind::Boolean(_) => TypeName::Boolean,
            Kind::Integer(_) => TypeName::Integer,
            Kind::Double(_) => TypeName::Double,
            Kind::String(_) => TypeName::String,
            Kind::Array(_) => TypeName::Array,
            Kind::Object(_) => TypeName::Object,
        }
    }

    #[must_use]
    pub const fn type_bit(&self) -> TypeBit {
        self.type_name().bit()
    }
}

/// A node of the input value tree, plus its back-references (§3.1).
#[derive(Debug, Clone)]
pub struct Node {
    kind: Kind,
    parent: Option<NodeId>,
    array_index: Option<usize>,
    field_key: Option<Box<str>>,
    /// The opaque raw form handed to the prettifier for diagnostic rendering.
    raw: RawValue,
}

impl Node {
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn array_index(&self) -> Option<usize> {
        self.array_index
    }

    #[must_use]
    pub fn field_key(&self) -> Option<&str> {
        self.field_key.as_deref()
    }

    #[must_use]
    pub fn raw(&self) -> &RawValue {
        &self.raw
    }

    #[must_use]
    pub fn type_bit(&self) -> TypeBit {
        self.kind.type_bit()
    }

    #[must_use]
    pub fn type_name(&self) -> TypeName {
        self.kind.type_name()
    }

    /// `true` iff this node is the value of an object field (invariant:
    /// mutually exclusive with [`Node::array_index`]).
    #[must_use]
    pub fn is_contained_field(&self) -> bool {
        self.field_key.is_some()
    }

    /// Returns `true` iff this node is a `Root` wrapper or the direct child
    /// of one whose own parent is that wrapper.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self.kind, Kind::Root(_))
    }
}

/// An arena of I-nodes, rooted at [`Arena::root`].
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    #[must_use]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Builds an arena from a parsed [`RawValue`], wrapping the top-level
    /// value in a `Root` node per §3.1. Returns `(arena, root_id)`.
    #[must_use]
    pub fn from_value(value: RawValue) -> (Self, NodeId) {
        let mut arena = Arena::default();
        let root_id = arena.push(Node {
            kind: Kind::Root(NodeId(0)), // patched below
            parent: None,
            array_index: None,
            field_key: None,
            raw: RawValue::Null,
        });
        let child_id = arena.insert(value, Some(root_id), None, None);
        arena.nodes[root_id.0 as usize].kind = Kind::Root(child_id);
        arena.nodes[root_id.0 as usize].raw = arena.nodes[child_id.0 as usize].raw.clone();
        (arena, root_id)
    }

    fn insert(
        &mut self,
        value: RawValue,
        parent: Option<NodeId>,
        array_index: Option<usize>,
        field_key: Option<Box<str>>,
    ) -> NodeId {
        let raw = value.clone();
        match value {
            RawValue::Null => self.push(Node {
                kind: Kind::Null,
                parent,
                array_index,
                field_key,
                raw,
            }),
            RawValue::Bool(b) => self.push(Node {
                kind: Kind::Boolean(b),
                parent,
                array_index,
                field_key,
                raw,
            }),
            RawValue::Number(ref n) => {
                let kind = if let Some(i) = n.as_i64() {
                    Kind::Integer(i)
                } else {
                    Kind::Double(n.as_f64().unwrap_or(f64::NAN))
                };
                self.push(Node {
                    kind,
                    parent,
                    array_index,
                    field_key,
                    raw,
                })
            }
            RawValue::String(s) => self.push(Node {
                kind: Kind::String(s),
                parent,
                array_index,
                field_key,
                raw,
            }),
            RawValue::Array(items) => {
                let placeholder = self.push(Node {
                    kind: Kind::Array(Vec::new()),
                    parent,
                    array_index,
                    field_key,
                    raw,
                });
                let children: Vec<NodeId> = items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| self.insert(item, Some(placeholder), Some(idx), None))
                    .collect();
                if let Kind::Array(ref mut v) = self.nodes[placeholder.0 as usize].kind {
                    *v = children;
                }
                placeholder
            }
            RawValue::Object(map) => {
                let placeholder = self.push(Node {
                    kind: Kind::Object(Vec::new()),
                    parent,
                    array_index,
                    field_key,
                    raw,
                });
                let children: Vec<(String, NodeId)> = map
                    .into_iter()
                    .map(|(key, item)| {
                        let key_box: Box<str> = key.clone().into_boxed_str();
                        let id = self.insert(item, Some(placeholder), None, Some(key_box));
                        (key, id)
                    })
                    .collect();
                if let Kind::Object(ref mut v) = self.nodes[placeholder.0 as usize].kind {
                    *v = children;
                }
                placeholder
            }
        }
    }
}

/// Looks up `key` among an object I-node's fields.
#[must_use]
pub fn object_get<'a>(arena: &'a Arena, fields: &[(String, NodeId)], key: &str) -> Option<&'a Node> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, id)| arena.get(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_child_parent_is_root() {
        let (arena, root_id) = Arena::from_value(json!({"a": 1}));
        let root = arena.get(root_id);
        assert!(root.parent().is_none());
        let Kind::Root(child_id) = *root.kind() else {
            panic!("expected root")
        };
        let child = arena.get(child_id);
        assert_eq!(child.parent(), Some(root_id));
    }

    #[test]
    fn test_array_index_and_field_key_are_exclusive() {
        let (arena, root_id) = Arena::from_value(json!({"xs": [1, 2]}));
        let root = arena.get(root_id);
        let Kind::Root(obj_id) = *root.kind() else {
            panic!()
        };
        let obj = arena.get(obj_id);
        let Kind::Object(fields) = obj.kind() else {
            panic!()
        };
        let arr = object_get(&arena, fields, "xs").unwrap();
        assert_eq!(arr.field_key(), Some("xs"));
        assert!(arr.array_index().is_none());
        let Kind::Array(elements) = arr.kind() else {
            panic!()
        };
        let first = arena.get(elements[0]);
        assert_eq!(first.array_index(), Some(0));
        assert!(first.field_key().is_none());
    }

    #[test]
    fn test_type_bit_matches_kind() {
        let (arena, root_id) = Arena::from_value(json!(true));
        let root = arena.get(root_id);
        let Kind::Root(child_id) = *root.kind() else {
            panic!()
        };
        assert_eq!(arena.get(child_id).type_bit(), bitmask::BOOLEAN);
    }
}
