//! In-memory module host for tests.

use indexmap::IndexMap;
use std::cell::RefCell;

use crate::diagnostics::CompilerError;
use crate::pipeline::ModuleHost;

const RESOLVE_SUFFIXES: &[&str] = &["", ".ts", ".tsx", ".js", "/index.ts"];

#[derive(Default)]
pub struct MemoryHost {
    pub files: IndexMap<String, String>,
    pub errors: RefCell<Vec<CompilerError>>,
    pub warnings: RefCell<Vec<CompilerError>>,
    pub loads: RefCell<Vec<String>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, source: &str) -> Self {
        self.files.insert(path.to_string(), source.to_string());
        self
    }

    pub fn warning_codes(&self) -> Vec<String> {
        self.warnings.borrow().iter().map(|w| w.code.clone()).collect()
    }
}

/// Joins `specifier` onto the directory of `importer` and folds `.`/`..` segments.
fn join(importer: &str, specifier: &str) -> String {
    let mut segments: Vec<&str> = if specifier.starts_with('/') {
        Vec::new()
    } else {
        let dir = importer.rsplit_once('/').map_or("", |(dir, _)| dir);
        dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

impl ModuleHost for MemoryHost {
    fn resolve(&self, specifier: &str, importer: &str) -> Option<String> {
        let base = if specifier.starts_with('.') || specifier.starts_with('/') {
            join(importer, specifier)
        } else {
            specifier.to_string()
        };
        RESOLVE_SUFFIXES
            .iter()
            .map(|suffix| format!("{base}{suffix}"))
            .find(|candidate| self.files.contains_key(candidate))
    }

    fn load(&self, id: &str) -> Option<String> {
        self.loads.borrow_mut().push(id.to_string());
        self.files.get(id).cloned()
    }

    fn error(&self, error: &CompilerError) {
        self.errors.borrow_mut().push(error.clone());
    }

    fn warn(&self, warning: &CompilerError) {
        self.warnings.borrow_mut().push(warning.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_specifiers_with_extensions() {
        let host = MemoryHost::new()
            .file("/src/child/child.component.ts", "")
            .file("/src/app.component.html", "");
        assert_eq!(
            host.resolve("./child/child.component", "/src/app.component.ts").as_deref(),
            Some("/src/child/child.component.ts")
        );
        assert_eq!(
            host.resolve("../app.component.html", "/src/child/child.component.ts").as_deref(),
            Some("/src/app.component.html")
        );
        assert_eq!(host.resolve("@prang/core", "/src/app.component.ts"), None);
    }
}
