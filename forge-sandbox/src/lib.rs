#![deny(missing_docs)]
//! The workspace sandbox: a single process-wide path-containment root for
//! read/write tools, plus the separate project-root anchor used by the
//! `write_source`/`read_source`/`list_source`/`run_tests`/`git_commit`
//! tool family (spec.md §4.1).
//!
//! Mutable process-wide state (the active workspace root) is routed
//! through one owner — [`Sandbox`] — rather than captured by value in
//! tool handlers, per the session-owned-mutable-state design constraint:
//! every handler asks `Sandbox::resolve` at invocation time.

use layer0::error::SandboxError;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Normalize a raw path argument before it is resolved against a root.
///
/// `""`, `"."`, `"./"`, and `".\\"` all collapse to `"."`; everything else
/// is trimmed of surrounding whitespace and passed through unchanged —
/// the platform path-canonicaliser runs later, inside [`Sandbox::resolve`].
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed {
        "" | "." | "./" | ".\\" => ".".to_string(),
        other => other.to_string(),
    }
}

/// A process-wide path-containment root.
///
/// Each project has its own workspace, so the root is mutable across
/// requests — but mutation happens only from the orchestrator at request
/// boundaries (switching the active project), never from inside a tool
/// handler.
pub struct Sandbox {
    root: RwLock<PathBuf>,
}

impl Sandbox {
    /// Create a sandbox rooted at `root`. The root is not required to
    /// exist yet — callers create it on first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: RwLock::new(root.into()) }
    }

    /// Current root.
    pub fn root(&self) -> PathBuf {
        self.root.read().expect("sandbox root lock poisoned").clone()
    }

    /// Switch the active root (e.g. on a project switch). Callers should
    /// only do this from the orchestrator's request-boundary handling.
    pub fn set_root(&self, root: impl Into<PathBuf>) {
        *self.root.write().expect("sandbox root lock poisoned") = root.into();
    }

    /// Resolve a raw (caller-supplied, pre-normalization) path against the
    /// current root, enforcing containment.
    ///
    /// `p` is accepted only if `resolve(root/p)` is lexically within
    /// `resolve(root)`. Anything else yields [`SandboxError::PathEscape`].
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, SandboxError> {
        let normalized = normalize(raw);
        resolve_within(&self.root(), &normalized)
    }
}

/// Resolve `rel` against `root`, enforcing lexical containment. Shared by
/// [`Sandbox::resolve`] and [`ProjectAnchor::resolve`] since both use the
/// same containment rule against different roots.
fn resolve_within(root: &Path, rel: &str) -> Result<PathBuf, SandboxError> {
    let candidate = root.join(rel);
    let resolved = lexical_normalize(&candidate);
    let root_resolved = lexical_normalize(root);
    if resolved.starts_with(&root_resolved) {
        Ok(resolved)
    } else {
        Err(SandboxError::PathEscape { path: rel.to_string(), root: root.display().to_string() })
    }
}

/// Lexically normalize a path: resolve `.` and `..` components without
/// touching the filesystem (the path may not exist yet, e.g. for a
/// pending `write_file`). Not a substitute for `fs::canonicalize` on
/// paths that must already exist — callers that need symlink resolution
/// should canonicalize first and pass the result through here.
fn lexical_normalize(path: &Path) -> PathBuf {
    use std::path::Component;
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

/// The separate anchor used by the source-tool family. Detected by
/// searching upward from a starting directory for a marker file (e.g.
/// `Cargo.toml` at a workspace root, or `.git`).
pub struct ProjectAnchor {
    root: PathBuf,
}

impl ProjectAnchor {
    /// Search upward from `start` for a directory containing `marker`.
    pub fn discover(start: &Path, marker: &str) -> Result<Self, SandboxError> {
        let mut dir = start.to_path_buf();
        loop {
            if dir.join(marker).exists() {
                return Ok(Self { root: dir });
            }
            if !dir.pop() {
                return Err(SandboxError::NoProjectRoot(start.display().to_string()));
            }
        }
    }

    /// The discovered anchor root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path against this anchor, enforcing the same
    /// containment rule as [`Sandbox::resolve`].
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, SandboxError> {
        let normalized = normalize(raw);
        resolve_within(&self.root, &normalized)
    }
}
