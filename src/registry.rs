//! Metadata registry: scope id to class metadata.
//!
//! The scanner is the only writer. Entries are replaced as whole values, so a
//! reader sees either the previous or the next complete metadata, never a mix.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::sync::{PoisonError, RwLock};

use crate::casing::kebab_case;
use crate::meta::{ClassMeta, ComponentMeta, ScopeId};

pub trait MetadataRegistry {
    fn get(&self, id: &ScopeId) -> Option<ClassMeta>;
    fn set(&self, id: ScopeId, meta: ClassMeta);
    fn remove(&self, id: &ScopeId) -> Option<ClassMeta>;
    fn clear(&self);
    /// Every entry, in insertion order.
    fn entries(&self) -> Vec<(ScopeId, ClassMeta)>;
    /// All entries whose metadata originates from `source_id`, in insertion order.
    fn entries_for_file(&self, source_id: &str) -> Vec<(ScopeId, ClassMeta)>;

    /// Replaces every entry of `source_id` with `entries`.
    fn replace_file(&self, source_id: &str, entries: Vec<(ScopeId, ClassMeta)>) {
        for (id, _) in self.entries_for_file(source_id) {
            self.remove(&id);
        }
        for (id, meta) in entries {
            self.set(id, meta);
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: RwLock<IndexMap<ScopeId, ClassMeta>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Digest of every entry of one file, used to detect metadata changes between scans.
    pub fn file_hash(&self, source_id: &str) -> String {
        let mut hasher = Sha256::new();
        for (id, meta) in self.entries_for_file(source_id) {
            hasher.update(id.as_str().as_bytes());
            hasher.update(serde_json::to_vec(&meta).unwrap_or_default());
        }
        format!("{:x}", hasher.finalize())
    }
}

impl MetadataRegistry for InMemoryRegistry {
    fn get(&self, id: &ScopeId) -> Option<ClassMeta> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn set(&self, id: ScopeId, meta: ClassMeta) {
        tracing::trace!(scope_id = %id, class = meta.class_name(), "registry set");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, meta);
    }

    fn remove(&self, id: &ScopeId) -> Option<ClassMeta> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(id)
    }

    fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn replace_file(&self, source_id: &str, entries: Vec<(ScopeId, ClassMeta)>) {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, meta| meta.source_id() != source_id);
        for (id, meta) in entries {
            map.insert(id, meta);
        }
        tracing::debug!(file = source_id, count = map.len(), "registry entries replaced");
    }

    fn entries(&self) -> Vec<(ScopeId, ClassMeta)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, meta)| (id.clone(), meta.clone()))
            .collect()
    }

    fn entries_for_file(&self, source_id: &str) -> Vec<(ScopeId, ClassMeta)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, meta)| meta.source_id() == source_id)
            .map(|(id, meta)| (id.clone(), meta.clone()))
            .collect()
    }
}

/// What a component's resolved imports contribute to its template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateImports {
    /// Tag spelling (selector, kebab-case and raw class name) to local binding.
    pub components: IndexMap<String, String>,
    /// Pipe registration name to local binding.
    pub pipes: IndexMap<String, String>,
}

impl TemplateImports {
    pub fn component_for(&self, tag: &str) -> Option<&str> {
        self.components.get(tag).map(String::as_str)
    }

    pub fn pipe_for(&self, name: &str) -> Option<&str> {
        self.pipes.get(name).map(String::as_str)
    }
}

/// Joins the resolved imports of `meta` with the registry entries they point at.
/// Imports that did not resolve contribute nothing.
pub fn template_imports(meta: &ComponentMeta, registry: &dyn MetadataRegistry) -> TemplateImports {
    let mut imports = TemplateImports::default();
    for import in &meta.imports {
        let Some(target) = import.resolved_scope.as_ref().and_then(|id| registry.get(id)) else {
            continue;
        };
        match &target {
            ClassMeta::Component(component) => {
                let mut spellings = component.effective_selectors();
                spellings.push(kebab_case(&component.class_name));
                spellings.push(component.class_name.clone());
                for tag in spellings {
                    imports
                        .components
                        .entry(tag)
                        .or_insert_with(|| import.local_name.clone());
                }
            }
            ClassMeta::Pipe(pipe) => {
                imports
                    .pipes
                    .entry(pipe.name.clone())
                    .or_insert_with(|| import.local_name.clone());
            }
            ClassMeta::Module(_) => {}
        }
    }
    imports
}
