//! The expected-schema node model (E-nodes) — §3.2.
use crate::{
    bitmask::{self, TypeBit},
    predicate::{Audit, Predicate},
};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// A field within an `EObject` — `(key, value, required, placeholder)`.
///
/// A placeholder field matches any input field whose value matches the
/// template `value`; its `key` is only a label.
pub struct Field {
    pub key: String,
    pub value: Node,
    pub required: bool,
    pub placeholder: bool,
}

impl Field {
    #[must_use]
    pub fn new(key: impl Into<String>, value: Node, required: bool) -> Self {
        Field {
            key: key.into(),
            value,
            required,
            placeholder: false,
        }
    }

    #[must_use]
    pub fn placeholder(label: impl Into<String>, value: Node, required: bool) -> Self {
        Field {
            key: label.into(),
            value,
            required,
            placeholder: true,
        }
    }
}

/// A conditional extension of an `EObject`'s field set — `(label,
/// predicate, outcomes)`. If `predicate` succeeds on the current input, the
/// outcomes are unioned into the active field set for that validation pass.
pub struct Branch {
    pub label: String,
    pub predicate: Arc<dyn Predicate>,
    pub outcomes: Vec<Field>,
}

impl Branch {
    #[must_use]
    pub fn new(label: impl Into<String>, predicate: Arc<dyn Predicate>, outcomes: Vec<Field>) -> Self {
        Branch {
            label: label.into(),
            predicate,
            outcomes,
        }
    }
}

/// The fields and branches of an `EObject`.
#[derive(Default)]
pub struct ObjectShape {
    pub fields: Vec<Field>,
    pub branches: Vec<Branch>,
}

/// Lazily-resolved target of an `ERedirect`, memoized on first resolution
/// (§9 — "resolution is memoised inside the redirect node on first
/// `compareStructure` call").
pub struct RedirectState {
    pub id: String,
    pub(crate) resolved: OnceCell<Arc<Node>>,
}

/// The variant of an expected-schema node.
pub enum Kind {
    Null,
    Boolean(Option<bool>),
    Integer(Option<i64>),
    Double(Option<f64>),
    String(Option<String>),
    /// `EScalar`: shorthand union of `{EBoolean, EInteger, EDouble, EString}`.
    Scalar,
    /// Ordered element templates.
    Array(Vec<Node>),
    Object(ObjectShape),
    /// Ordered alternative nodes (union).
    Mixed(Vec<Node>),
    Redirect(RedirectState),
    Root(Box<Node>),
}

/// A node of the expected-schema tree.
pub struct Node {
    pub(crate) kind: Kind,
    nullable: bool,
    audits: Vec<Arc<dyn Audit>>,
    id: Option<String>,
}

impl Node {
    fn new(kind: Kind) -> Self {
        Node {
            kind,
            nullable: false,
            audits: Vec::new(),
            id: None,
        }
    }

    /// Marks this node nullable: a `Null` input matches regardless of other
    /// type constraints (§4.1 step 1).
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Attaches an audit, run after the structural comparison (§4.1 step 4).
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn Audit>) -> Self {
        self.audits.push(audit);
        self
    }

    #[must_use]
    pub fn audits(&self) -> &[Arc<dyn Audit>] {
        &self.audits
    }

    /// Tags this node with an identifier. Registration in a [`crate::registry::Registry`]
    /// is a separate, explicit step (§3.3) — this only attaches the label.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// The static type bitmask of this node (§3.2). Panics if called on an
    /// unresolved `Redirect` — callers must resolve via
    /// [`crate::registry::Registry::resolve_node`] first; the engine always
    /// does so before inspecting a node's bitmask.
    #[must_use]
    pub fn type_bitmask(&self) -> TypeBit {
        match &self.kind {
            Kind::Null => bitmask::NULL,
            Kind::Boolean(_) => bitmask::BOOLEAN,
            Kind::Integer(_) => bitmask::INTEGER,
            Kind::Double(_) => bitmask::DOUBLE,
            Kind::String(_) => bitmask::STRING,
            Kind::Scalar => bitmask::SCALAR,
            Kind::Array(_) => bitmask::ARRAY,
            Kind::Object(_) => bitmask::OBJECT,
            Kind::Mixed(alts) => alts.iter().fold(0, |acc, n| acc | n.type_bitmask()),
            Kind::Root(_) => bitmask::ROOT,
            Kind::Redirect(_) => {
                unreachable!("type_bitmask called on an unresolved redirect node")
            }
        }
    }
}

/// Fluent constructors for [`Node`]s, used by callers to assemble schema
/// trees instead of constructing enum literals directly.
pub struct Builder;

impl Builder {
    #[must_use]
    pub fn null() -> Node {
        Node::new(Kind::Null)
    }

    #[must_use]
    pub fn boolean() -> Node {
        Node::new(Kind::Boolean(None))
    }

    #[must_use]
    pub fn boolean_eq(value: bool) -> Node {
        Node::new(Kind::Boolean(Some(value)))
    }

    #[must_use]
    pub fn integer() -> Node {
        Node::new(Kind::Integer(None))
    }

    #[must_use]
    pub fn integer_eq(value: i64) -> Node {
        Node::new(Kind::Integer(Some(value)))
    }

    #[must_use]
    pub fn double() -> Node {
        Node::new(Kind::Double(None))
    }

    #[must_use]
    pub fn double_eq(value: f64) -> Node {
        Node::new(Kind::Double(Some(value)))
    }

    #[must_use]
    pub fn string() -> Node {
        Node::new(Kind::String(None))
    }

    #[must_use]
    pub fn string_eq(value: impl Into<String>) -> Node {
        Node::new(Kind::String(Some(value.into())))
    }

    #[must_use]
    pub fn scalar() -> Node {
        Node::new(Kind::Scalar)
    }

    #[must_use]
    pub fn array(elements: Vec<Node>) -> Node {
        Node::new(Kind::Array(elements))
    }

    #[must_use]
    pub fn object() -> ObjectBuilder {
        ObjectBuilder {
            shape: ObjectShape::default(),
        }
    }

    #[must_use]
    pub fn mixed(alternatives: Vec<Node>) -> Node {
        Node::new(Kind::Mixed(alternatives))
    }

    #[must_use]
    pub fn redirect(id: impl Into<String>) -> Node {
        Node::new(Kind::Redirect(RedirectState {
            id: id.into(),
            resolved: OnceCell::new(),
        }))
    }

    #[must_use]
    pub fn root(child: Node) -> Node {
        Node::new(Kind::Root(Box::new(child)))
    }
}

/// Incrementally builds an `EObject`'s fields and branches.
pub struct ObjectBuilder {
    shape: ObjectShape,
}

impl ObjectBuilder {
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: Node, required: bool) -> Self {
        self.shape.fields.push(Field::new(key, value, required));
        self
    }

    #[must_use]
    pub fn placeholder(mut self, label: impl Into<String>, value: Node, required: bool) -> Self {
        self.shape
            .fields
            .push(Field::placeholder(label, value, required));
        self
    }

    #[must_use]
    pub fn add_branch(
        mut self,
        label: impl Into<String>,
        predicate: Arc<dyn Predicate>,
        outcomes: Vec<Field>,
    ) -> Self {
        self.shape.branches.push(Branch::new(label, predicate, outcomes));
        self
    }

    #[must_use]
    pub fn build(self) -> Node {
        Node::new(Kind::Object(self.shape))
    }
}
