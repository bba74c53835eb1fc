use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::ResourceError;

/// Identity of an independent render target (window, surface, offscreen
/// buffer). Ids are small and dense so per-object tables can index by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(u32);

impl ContextId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Hands out context ids, always the lowest free one.
///
/// Recycling keeps every [`ResourceTable`](crate::ResourceTable) no larger
/// than the peak number of contexts alive at once. A context must reclaim
/// its handles from every object before it is released; the registry does
/// not track handles itself.
#[derive(Debug)]
pub struct ContextRegistry {
    in_use: Mutex<Vec<bool>>,
    max_contexts: usize,
}

impl ContextRegistry {
    pub fn new(max_contexts: usize) -> Self {
        Self {
            in_use: Mutex::new(Vec::new()),
            max_contexts,
        }
    }

    /// Register a new context.
    pub fn acquire(&self) -> Result<ContextId, ResourceError> {
        let mut in_use = self.in_use.lock();
        let index = match in_use.iter().position(|used| !used) {
            Some(free) => {
                in_use[free] = true;
                free
            }
            None if in_use.len() < self.max_contexts => {
                in_use.push(true);
                in_use.len() - 1
            }
            None => {
                return Err(ResourceError::TooManyContexts {
                    max: self.max_contexts,
                });
            }
        };
        let id = ContextId::new(index as u32);
        tracing::debug!(%id, "render context acquired");
        Ok(id)
    }

    /// Release a context id for reuse. Returns `false` if it was not active.
    pub fn release(&self, id: ContextId) -> bool {
        let mut in_use = self.in_use.lock();
        match in_use.get_mut(id.index()) {
            Some(used) if *used => {
                *used = false;
                tracing::debug!(%id, "render context released");
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, id: ContextId) -> bool {
        self.in_use.lock().get(id.index()).copied().unwrap_or(false)
    }

    /// Currently active contexts in id order.
    pub fn active(&self) -> Vec<ContextId> {
        self.in_use
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, used)| **used)
            .map(|(i, _)| ContextId::new(i as u32))
            .collect()
    }

    pub fn max_contexts(&self) -> usize {
        self.max_contexts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_hands_out_dense_ids() {
        let registry = ContextRegistry::new(4);
        let a = registry.acquire().unwrap();
        let b = registry.acquire().unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(registry.active(), vec![a, b]);
    }

    #[test]
    fn released_ids_are_recycled_lowest_first() {
        let registry = ContextRegistry::new(4);
        let a = registry.acquire().unwrap();
        let _b = registry.acquire().unwrap();
        assert!(registry.release(a));
        assert!(!registry.is_active(a));
        assert_eq!(registry.acquire().unwrap(), a);
    }

    #[test]
    fn limit_is_enforced() {
        let registry = ContextRegistry::new(1);
        registry.acquire().unwrap();
        let err = registry.acquire().unwrap_err();
        assert!(matches!(err, ResourceError::TooManyContexts { max: 1 }));
    }

    #[test]
    fn releasing_unknown_context_is_a_no_op() {
        let registry = ContextRegistry::new(2);
        assert!(!registry.release(ContextId::new(7)));
    }

    #[test]
    fn display_format() {
        assert_eq!(ContextId::new(3).to_string(), "ctx#3");
    }
}
