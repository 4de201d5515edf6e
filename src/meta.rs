//! Class metadata shared between the scanner, the template compiler and the
//! class rewriter.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::ast::SourceLocation;

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable id of one class declaration: the first 8 hex chars of
/// `sha256("<file>#<declaration index>")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    pub fn derive(file: &str, index: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(file.as_bytes());
        hasher.update(b"#");
        hasher.update(index.to_string().as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        ScopeId(digest[..8].to_string())
    }

    /// Wraps an id received from a virtual module query.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        ScopeId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Attribute used for scoped styles.
    pub fn data_attribute(&self) -> String {
        format!("data-v-{}", self.0)
    }

    /// Local name of the imported render function.
    pub fn render_alias(&self) -> String {
        format!("__render_{}", self.0)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDINGS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingKind {
    #[serde(rename = "setup-const")]
    Constant,
    #[serde(rename = "setup-ref")]
    ReactiveRef,
    #[serde(rename = "setup-signal")]
    Signal,
}

/// Member name to binding kind, in class declaration order.
pub type BindingMetadata = IndexMap<String, BindingKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldRole {
    Input,
    Model,
    Output,
}

/// A class field initialized by `input()`, `model()` or `output()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBinding {
    pub name: String,
    pub role: FieldRole,
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassType {
    Component,
    Pipe,
    Module,
}

/// Imported name used for `import X from` and `import * as X from`.
pub const DEFAULT_EXPORT: &str = "default";
pub const NAMESPACE_EXPORT: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBinding {
    pub local_name: String,
    pub imported_name: String,
    pub source: String,
    pub is_type: bool,
    pub resolved_file: Option<String>,
    pub resolved_type: Option<ClassType>,
    pub resolved_scope: Option<ScopeId>,
}

impl ImportBinding {
    pub fn new(local: &str, imported: &str, source: &str) -> Self {
        ImportBinding {
            local_name: local.to_string(),
            imported_name: imported.to_string(),
            source: source.to_string(),
            is_type: false,
            resolved_file: None,
            resolved_type: None,
            resolved_scope: None,
        }
    }

    pub fn is_component(&self) -> bool {
        self.resolved_type == Some(ClassType::Component)
    }

    pub fn is_pipe(&self) -> bool {
        self.resolved_type == Some(ClassType::Pipe)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASS METADATA
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRef {
    /// Location of the decorator value in the class file.
    pub location: SourceLocation,
    /// Resolved file id for `templateUrl`, template text for `template`.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRef {
    pub location: SourceLocation,
    /// Resolved file id for `styleUrls`, stylesheet text for `styles`.
    pub source: String,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMeta {
    pub source_id: String,
    pub class_name: String,
    pub selectors: Vec<String>,
    pub template: Option<TemplateRef>,
    pub inline_template: bool,
    pub styles: Vec<StyleRef>,
    pub imports: Vec<ImportBinding>,
    pub bindings: BindingMetadata,
    pub fields: Vec<FieldBinding>,
    pub default_export: bool,
}

impl ComponentMeta {
    /// Explicit selectors, or the kebab-case class name when none were declared.
    pub fn effective_selectors(&self) -> Vec<String> {
        if self.selectors.is_empty() {
            vec![crate::casing::kebab_case(&self.class_name)]
        } else {
            self.selectors.clone()
        }
    }

    pub fn display_name(&self) -> String {
        self.selectors
            .first()
            .cloned()
            .unwrap_or_else(|| self.class_name.clone())
    }

    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.role == FieldRole::Input)
            .map(|f| f.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeMeta {
    pub source_id: String,
    pub class_name: String,
    pub name: String,
    pub default_export: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMeta {
    pub source_id: String,
    pub class_name: String,
    pub imports: Vec<ImportBinding>,
    pub default_export: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClassMeta {
    Component(ComponentMeta),
    Pipe(PipeMeta),
    Module(ModuleMeta),
}

impl ClassMeta {
    pub fn class_type(&self) -> ClassType {
        match self {
            ClassMeta::Component(_) => ClassType::Component,
            ClassMeta::Pipe(_) => ClassType::Pipe,
            ClassMeta::Module(_) => ClassType::Module,
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            ClassMeta::Component(m) => &m.class_name,
            ClassMeta::Pipe(m) => &m.class_name,
            ClassMeta::Module(m) => &m.class_name,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            ClassMeta::Component(m) => &m.source_id,
            ClassMeta::Pipe(m) => &m.source_id,
            ClassMeta::Module(m) => &m.source_id,
        }
    }

    pub fn is_default_export(&self) -> bool {
        match self {
            ClassMeta::Component(m) => m.default_export,
            ClassMeta::Pipe(m) => m.default_export,
            ClassMeta::Module(m) => m.default_export,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentMeta> {
        match self {
            ClassMeta::Component(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_pipe(&self) -> Option<&PipeMeta> {
        match self {
            ClassMeta::Pipe(m) => Some(m),
            _ => None,
        }
    }
}
