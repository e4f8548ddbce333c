//! The identifier registry (§3.3): an engine-scoped mapping from identifier
//! to expected-schema node, used to resolve `ERedirect`s.
use crate::{
    error::{FaultKind, ValidationFault},
    schema::{Kind, Node},
};
use ahash::{AHashMap, AHashSet};
use std::sync::{Arc, RwLock};

/// Engine-scoped identifier registry. Populated during schema construction,
/// read during validation. Kept as an instance rather than global mutable
/// state, per the design note in §9.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<AHashMap<String, Arc<Node>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` under `id`. Construction-time only; not intended to
    /// be called once validation has started on a shared registry (§5).
    ///
    /// # Errors
    /// Returns [`FaultKind::DuplicateIdentifier`] if `id` is already
    /// registered.
    pub fn register(&self, id: impl Into<String>, node: Arc<Node>) -> Result<(), ValidationFault> {
        let id = id.into();
        let mut entries = self.entries.write().expect("registry lock poisoned");
        if entries.contains_key(&id) {
            return Err(ValidationFault::new(FaultKind::DuplicateIdentifier { id }));
        }
        entries.insert(id, node);
        Ok(())
    }

    /// Resolves `id` against the registry.
    ///
    /// # Errors
    /// Returns [`FaultKind::UnknownIdentifier`] if nothing is registered
    /// under `id`.
    pub fn lookup(&self, id: &str) -> Result<Arc<Node>, ValidationFault> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| {
                ValidationFault::new(FaultKind::UnknownIdentifier { id: id.to_string() })
            })
    }
}

/// Resolves `node` to a concrete (non-`Redirect`) node, following and
/// memoizing redirect chains. Forward references in schema *construction*
/// are fine because resolution is deferred to first use. A chain that
/// cycles back to an identifier already seen during this resolution faults
/// instead of looping forever — the engine's recursion-depth bound only
/// advances through structural recursion (Root/Array/Object/Mixed) and
/// never sees a redirect chain that doesn't bottom out in a concrete node
/// (§5).
pub fn resolve<'a>(node: &'a Node, registry: &Registry) -> Result<&'a Node, ValidationFault> {
    let mut current = node;
    let mut visited: AHashSet<String> = AHashSet::default();
    loop {
        match &current.kind {
            Kind::Redirect(state) => {
                if !visited.insert(state.id.clone()) {
                    return Err(ValidationFault::new(FaultKind::RedirectCycle {
                        id: state.id.clone(),
                    }));
                }
                let target = state
                    .resolved
                    .get_or_try_init(|| registry.lookup(&state.id))?;
                current = target;
            }
            _ => return Ok(current),
        }
    }
}
