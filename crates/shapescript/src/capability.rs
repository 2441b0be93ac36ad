//! Sandbox policy gating which directories/URLs a delegate may resolve (spec §1
//! "external file system / image loader... under a sandbox-permission policy", §6
//! "resolveURL").
//!
//! ShapeScript never touches the filesystem itself — only [`crate::delegate::MeshLibrary`]
//! implementations do — but the evaluator still owns the *policy* that a host's
//! `resolveURL`/`importGeometry` should be checked against, the same way a capability
//! set gates which external operations a sandboxed program may request.
//!
//! # Usage
//!
//! ```
//! use shapescript::{SandboxPolicy, Capability};
//!
//! let policy = SandboxPolicy::new(vec![Capability::Directory("assets".into())]);
//! assert!(policy.allows_path("assets/wood.png"));
//! assert!(!policy.allows_path("/etc/passwd"));
//! ```

use std::fmt;
use std::path::Path;

/// A single permission grant for delegate-resolved resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Permission to resolve any path under this directory prefix.
    Directory(String),
    /// Permission to resolve a URL whose host matches this value.
    Host(String),
    /// Permission to resolve any path or URL (no restriction).
    Unrestricted,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "dir:{dir}"),
            Self::Host(host) => write!(f, "host:{host}"),
            Self::Unrestricted => f.write_str("*"),
        }
    }
}

/// Error returned when a delegate resolution is denied by the sandbox policy.
#[derive(Debug, Clone)]
pub struct PermissionDenied {
    pub operation: String,
    pub required: String,
}

impl fmt::Display for PermissionDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sandbox denied: {} (requires capability '{}')", self.operation, self.required)
    }
}

impl std::error::Error for PermissionDenied {}

/// The set of directories/hosts a delegate is permitted to resolve names against.
///
/// Immutable once built. `SandboxPolicy::none()` denies every `texture`/`background`/
/// `import`/font resolution, turning a program into a pure computation with no host
/// file access; `SandboxPolicy::unrestricted()` permits everything, matching a
/// trusted, locally-run script.
#[derive(Debug, Clone, Default)]
pub struct SandboxPolicy {
    capabilities: Vec<Capability>,
}

impl SandboxPolicy {
    #[must_use]
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self { capabilities }
    }

    #[must_use]
    pub fn none() -> Self {
        Self { capabilities: Vec::new() }
    }

    #[must_use]
    pub fn unrestricted() -> Self {
        Self { capabilities: vec![Capability::Unrestricted] }
    }

    /// Checks whether a source-relative path is permitted.
    pub fn check_path(&self, path: &str) -> Result<(), PermissionDenied> {
        if self.allows_path(path) {
            Ok(())
        } else {
            Err(PermissionDenied {
                operation: format!("resolve path '{path}'"),
                required: "dir:<containing directory>".to_owned(),
            })
        }
    }

    #[must_use]
    pub fn allows_path(&self, path: &str) -> bool {
        let target = Path::new(path);
        self.capabilities.iter().any(|cap| match cap {
            Capability::Unrestricted => true,
            Capability::Directory(dir) => target.starts_with(Path::new(dir)),
            Capability::Host(_) => false,
        })
    }

    /// Checks whether a URL's host is permitted.
    pub fn check_host(&self, host: &str) -> Result<(), PermissionDenied> {
        if self.allows_host(host) {
            Ok(())
        } else {
            Err(PermissionDenied {
                operation: format!("resolve host '{host}'"),
                required: format!("host:{host}"),
            })
        }
    }

    #[must_use]
    pub fn allows_host(&self, host: &str) -> bool {
        self.capabilities.iter().any(|cap| match cap {
            Capability::Unrestricted => true,
            Capability::Host(allowed) => allowed == host,
            Capability::Directory(_) => false,
        })
    }

    /// Narrows this policy to capabilities also present in `restrict`, for handing a
    /// more restricted policy down to a recursively-imported file.
    #[must_use]
    pub fn subset(&self, restrict: &[Capability]) -> Self {
        Self {
            capabilities: self.capabilities.iter().filter(|cap| restrict.contains(cap)).cloned().collect(),
        }
    }
}

impl fmt::Display for SandboxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.capabilities.is_empty() {
            return f.write_str("SandboxPolicy(none)");
        }
        f.write_str("SandboxPolicy(")?;
        for (i, cap) in self.capabilities.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{cap}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_denies_everything() {
        let policy = SandboxPolicy::none();
        assert!(!policy.allows_path("assets/wood.png"));
        assert!(policy.check_path("assets/wood.png").is_err());
    }

    #[test]
    fn unrestricted_allows_everything() {
        let policy = SandboxPolicy::unrestricted();
        assert!(policy.allows_path("/etc/passwd"));
        assert!(policy.allows_host("example.com"));
    }

    #[test]
    fn directory_capability_scopes_to_prefix() {
        let policy = SandboxPolicy::new(vec![Capability::Directory("assets".into())]);
        assert!(policy.allows_path("assets/wood.png"));
        assert!(!policy.allows_path("secrets/key.txt"));
    }

    #[test]
    fn subset_narrows_capabilities() {
        let parent = SandboxPolicy::new(vec![Capability::Directory("a".into()), Capability::Directory("b".into())]);
        let child = parent.subset(&[Capability::Directory("a".into())]);
        assert!(child.allows_path("a/x"));
        assert!(!child.allows_path("b/x"));
    }
}
