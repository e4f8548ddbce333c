//! The path expression sub-language (§4.7, §6.4): `$`, `@`, `^`, `.key`.
use crate::{
    error::{FaultKind, ValidationFault},
    value::{Arena, Kind, Node, NodeId},
};
use ahash::AHashMap;
use std::sync::{Arc, RwLock};

/// The anchor a path starts from.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Start {
    /// `$` — always resets to the absolute document root.
    Root,
    /// `@` — starts at the node the path is evaluated against.
    Current,
}

/// One step after the start anchor.
#[derive(Debug, Clone, Eq, PartialEq)]
enum Step {
    Ascend,
    Child(String),
}

/// A parsed path. Cheap to evaluate repeatedly; see [`PathCache`] for
/// memoized parsing.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Path {
    raw: String,
    start: Start,
    steps: Vec<Step>,
}

impl Path {
    /// The original text this path was parsed from. `parse(p).raw() == p`
    /// for any `p` accepted by the grammar (§8, property 4).
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parses a path string per the grammar in §6.4.
    ///
    /// # Errors
    /// Returns a [`ValidationFault`] with [`FaultKind::PathSyntax`] if `s` is
    /// empty, starts with anything other than `$`/`@`, contains an ascend
    /// after a child step or after the `$` anchor, or ends with a dangling
    /// escape.
    pub fn parse(s: &str) -> Result<Self, ValidationFault> {
        let syntax_error = |reason: &'static str| {
            ValidationFault::new(FaultKind::PathSyntax {
                path: s.to_string(),
                reason,
            })
        };

        let mut chars = s.chars().peekable();
        let start = match chars.next() {
            Some('$') => Start::Root,
            Some('@') => Start::Current,
            Some(_) => return Err(syntax_error("path must start with '$' or '@'")),
            None => return Err(syntax_error("path must not be empty")),
        };

        let mut steps = Vec::new();
        let mut seen_child = false;
        while let Some(&c) = chars.peek() {
            match c {
                '^' => {
                    if seen_child {
                        return Err(syntax_error("'^' may not follow a '.' child step"));
                    }
                    if start == Start::Root {
                        return Err(syntax_error("'^' may not follow the '$' root anchor"));
                    }
                    chars.next();
                    steps.push(Step::Ascend);
                }
                '.' => {
                    chars.next();
                    let mut key = String::new();
                    loop {
                        match chars.peek() {
                            None | Some('$') | Some('^') | Some('.') => break,
                            Some('\\') => {
                                chars.next();
                                match chars.next() {
                                    Some(escaped) => key.push(escaped),
                                    None => {
                                        return Err(syntax_error(
                                            "dangling escape at end of path",
                                        ))
                                    }
                                }
                            }
                            Some(&other) => {
                                chars.next();
                                key.push(other);
                            }
                        }
                    }
                    seen_child = true;
                    steps.push(Step::Child(key));
                }
                _ => return Err(syntax_error("expected '^' or '.' to begin a step")),
            }
        }

        Ok(Path {
            raw: s.to_string(),
            start,
            steps,
        })
    }
}

/// Why evaluating a (syntactically valid) path against a concrete input
/// tree failed. Unlike a parse failure, this is not a [`ValidationFault`]:
/// callers (predicates/audits) are expected to handle it and fail quietly.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EvalError {
    CouldNotAscend,
    NotAnObject,
    MissingField(String),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::CouldNotAscend => write!(f, "could not ascend far enough"),
            EvalError::NotAnObject => write!(f, "target is not an object"),
            EvalError::MissingField(key) => write!(f, "could not find field {key}"),
        }
    }
}

fn topmost(arena: &Arena, mut id: NodeId) -> NodeId {
    loop {
        match arena.get(id).parent() {
            Some(parent) => id = parent,
            None => return id,
        }
    }
}

fn unwrap_root(arena: &Arena, id: NodeId) -> NodeId {
    match arena.get(id).kind() {
        Kind::Root(child) => *child,
        _ => id,
    }
}

fn is_root_wrapper(node: &Node) -> bool {
    matches!(node.kind(), Kind::Root(_))
}

/// Evaluates `path` against `start` within `arena`. Never mutates the tree.
pub fn find(arena: &Arena, path: &Path, start: NodeId) -> Result<NodeId, EvalError> {
    let mut cur = unwrap_root(arena, start);
    if path.start == Start::Root {
        let top = topmost(arena, start);
        cur = unwrap_root(arena, top);
    }
    for step in &path.steps {
        match step {
            Step::Ascend => {
                let node = arena.get(cur);
                match node.parent() {
                    None => return Err(EvalError::CouldNotAscend),
                    Some(parent) if is_root_wrapper(arena.get(parent)) => {
                        return Err(EvalError::CouldNotAscend)
                    }
                    Some(parent) => cur = parent,
                }
            }
            Step::Child(key) => {
                let node = arena.get(cur);
                match node.kind() {
                    Kind::Object(fields) => {
                        match fields.iter().find(|(k, _)| k == key) {
                            Some((_, id)) => cur = *id,
                            None => return Err(EvalError::MissingField(key.clone())),
                        }
                    }
                    _ => return Err(EvalError::NotAnObject),
                }
            }
        }
    }
    Ok(cur)
}

/// Memoized path parsing. Purely an optimization: tests must pass with the
/// cache bypassed entirely by calling [`Path::parse`] directly.
#[derive(Debug, Default)]
pub struct PathCache {
    inner: RwLock<AHashMap<String, Arc<Path>>>,
}

impl PathCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached parse of `s`, parsing and inserting on first use.
    pub fn get_or_parse(&self, s: &str) -> Result<Arc<Path>, ValidationFault> {
        if let Some(cached) = self.inner.read().expect("path cache lock poisoned").get(s) {
            return Ok(Arc::clone(cached));
        }
        let parsed = Arc::new(Path::parse(s)?);
        self.inner
            .write()
            .expect("path cache lock poisoned")
            .insert(s.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }
}
