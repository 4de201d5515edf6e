//! Source discovery for the prescan pass.
//!
//! Recursively walks a project directory for script files that import the
//! framework module, so their classes are in the registry before the first
//! template asks for them.

use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::diagnostics::CompilerError;
use crate::pipeline::ModuleHost;

const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "js", "jsx", "mjs"];
const RESOLVE_SUFFIXES: &[&str] = &["", ".ts", ".tsx", ".mts", ".js", "/index.ts", "/index.js"];

/// Whether `path` names a script file the compiler handles (query strings ignored).
pub fn is_script_file(path: &str) -> bool {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| SCRIPT_EXTENSIONS.contains(&ext))
        && !path.ends_with(".d.ts")
}

pub fn is_dependency(path: &str) -> bool {
    path.contains("/node_modules/") || path.contains('\0')
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| name == "node_modules" || name.starts_with('.'))
}

/// Recursively find all script files below `dir`, skipping `node_modules` and hidden directories.
pub fn find_script_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .flatten()
    {
        let path = entry.path();
        if path.is_file() && is_script_file(&path.to_string_lossy()) {
            files.push(path.to_path_buf());
        }
    }

    files
}

/// Script files below `dir` whose text mentions `framework_module`, with their contents.
pub fn discover_sources(dir: &Path, framework_module: &str) -> Vec<(String, String)> {
    find_script_files(dir)
        .into_iter()
        .filter_map(|path| match fs::read_to_string(&path) {
            Ok(source) => Some((path.to_string_lossy().to_string(), source)),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "failed to read source");
                None
            }
        })
        .filter(|(_, source)| source.contains(framework_module) && source.contains("class"))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILE SYSTEM HOST
// ═══════════════════════════════════════════════════════════════════════════════

/// Module host backed by the local file system. Only relative and absolute
/// specifiers resolve; package imports are left to the bundler.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemHost;

/// Lexically folds `.` and `..` segments.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl ModuleHost for FileSystemHost {
    fn resolve(&self, specifier: &str, importer: &str) -> Option<String> {
        let base = if specifier.starts_with('/') {
            PathBuf::from(specifier)
        } else if specifier.starts_with('.') {
            let importer = importer.split_once('?').map_or(importer, |(path, _)| path);
            Path::new(importer).parent()?.join(specifier)
        } else {
            return None;
        };
        let base = normalize(&base).to_string_lossy().to_string();
        RESOLVE_SUFFIXES
            .iter()
            .map(|suffix| format!("{base}{suffix}"))
            .find(|candidate| Path::new(candidate).is_file())
    }

    fn load(&self, id: &str) -> Option<String> {
        let path = id.split_once('?').map_or(id, |(path, _)| path);
        match fs::read_to_string(path) {
            Ok(source) => Some(source),
            Err(e) => {
                tracing::debug!(file = path, error = %e, "load failed");
                None
            }
        }
    }

    fn error(&self, error: &CompilerError) {
        tracing::error!(file = %error.file, line = error.line, column = error.column, code = %error.code, "{}", error.message);
    }

    fn warn(&self, warning: &CompilerError) {
        tracing::warn!(file = %warning.file, line = warning.line, code = %warning.code, "{}", warning.message);
    }
}
