//! Pattern renderer registry
//!
//! Resolution walks renderers in registration order and returns the first
//! whose `can_handle` accepts the query. Unmatched queries resolve to the
//! outline renderer.

use std::sync::Arc;

use super::outline::OutlineRenderer;
use super::{builtin_renderers, normalize_pattern_name, PatternConfig, PatternRenderer};

/// Result of a lookup
#[derive(Clone)]
pub struct Resolved {
    pub renderer: Arc<dyn PatternRenderer>,
    /// True when no registered renderer matched
    pub fallback: bool,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("renderer", &self.renderer.id())
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// Capability-keyed renderer collection
pub struct PatternRegistry {
    renderers: Vec<Arc<dyn PatternRenderer>>,
    fallback: Arc<dyn PatternRenderer>,
}

impl PatternRegistry {
    /// Registry with no renderers besides the fallback
    pub fn empty() -> Self {
        Self {
            renderers: Vec::new(),
            fallback: Arc::new(OutlineRenderer),
        }
    }

    /// Registry with every built-in family
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for renderer in builtin_renderers() {
            registry.register(renderer);
        }
        registry
    }

    /// Add a renderer. A renderer declaring an identifier that is already
    /// registered replaces the earlier one in its resolution slot.
    ///
    /// Returns true when an earlier registration was replaced.
    pub fn register(&mut self, renderer: Arc<dyn PatternRenderer>) -> bool {
        let declared: Vec<String> = renderer
            .pattern_types()
            .iter()
            .map(|t| normalize_pattern_name(t))
            .collect();

        let clashes: Vec<usize> = self
            .renderers
            .iter()
            .enumerate()
            .filter(|(_, existing)| {
                existing
                    .pattern_types()
                    .iter()
                    .any(|t| declared.contains(&normalize_pattern_name(t)))
            })
            .map(|(i, _)| i)
            .collect();

        let Some(&slot) = clashes.first() else {
            tracing::debug!("Registered pattern renderer '{}'", renderer.id());
            self.renderers.push(renderer);
            return false;
        };

        tracing::warn!(
            "Pattern renderer '{}' re-registered; replacing '{}'",
            renderer.id(),
            self.renderers[slot].id()
        );
        self.renderers[slot] = renderer;
        // later clashing registrations would shadow nothing; drop them
        for &i in clashes[1..].iter().rev() {
            self.renderers.remove(i);
        }
        true
    }

    /// Find the renderer for a pattern type or tool name.
    ///
    /// Unknown names resolve to the outline fallback with a warning.
    pub fn resolve(&self, name: &str, config: Option<&PatternConfig>) -> Resolved {
        match self.find(name, config) {
            Some(renderer) => Resolved {
                renderer,
                fallback: false,
            },
            None => {
                tracing::warn!("Unknown pattern type '{}', using outline", name);
                Resolved {
                    renderer: self.fallback.clone(),
                    fallback: true,
                }
            }
        }
    }

    /// First matching renderer without falling back.
    pub fn find(&self, name: &str, config: Option<&PatternConfig>) -> Option<Arc<dyn PatternRenderer>> {
        self.renderers
            .iter()
            .find(|r| r.can_handle(name, config))
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name, None).is_some()
    }

    /// Canonical ids in resolution order.
    pub fn pattern_ids(&self) -> Vec<&'static str> {
        self.renderers.iter().map(|r| r.id()).collect()
    }

    /// Every identifier and alias, in resolution order.
    pub fn declared_types(&self) -> Vec<&'static str> {
        self.renderers
            .iter()
            .flat_map(|r| r.pattern_types())
            .collect()
    }

    pub fn fallback(&self) -> Arc<dyn PatternRenderer> {
        self.fallback.clone()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for PatternRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRegistry")
            .field("renderers", &self.pattern_ids())
            .finish()
    }
}
