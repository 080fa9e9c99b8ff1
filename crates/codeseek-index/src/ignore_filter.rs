//! Path exclusion for indexing.
//!
//! Patterns use gitignore syntax. Built-in defaults cover build output and
//! dependency directories; user patterns from the config are layered on top.

use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, warn};

/// Patterns excluded from every index.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/",
    ".hg/",
    ".svn/",
    ".vs/",
    ".idea/",
    ".vscode/",
    "node_modules/",
    "target/",
    "bin/",
    "obj/",
    "dist/",
    "build/",
    "__pycache__/",
    ".venv/",
    "venv/",
    "*.min.js",
    "*.min.css",
    "*.lock",
    "*.map",
    "*.g.cs",
    "*.Designer.cs",
];

/// Decides whether a path is excluded from indexing.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    root: PathBuf,
    matcher: Gitignore,
    user_patterns: Vec<String>,
}

impl IgnoreFilter {
    /// Build a filter rooted at `root` from the defaults plus `user_patterns`.
    ///
    /// Invalid user patterns are logged and skipped.
    pub fn new(root: &Path, user_patterns: &[String]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);

        for pattern in DEFAULT_IGNORE_PATTERNS {
            builder.add_line(None, pattern)?;
        }

        let mut accepted = Vec::new();
        for pattern in user_patterns {
            match builder.add_line(None, pattern) {
                Ok(_) => accepted.push(pattern.clone()),
                Err(e) => warn!("Skipping invalid ignore pattern {:?}: {}", pattern, e),
            }
        }

        let matcher = builder.build()?;
        debug!(
            "Ignore filter rooted at {:?} with {} user patterns",
            root,
            accepted.len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            matcher,
            user_patterns: accepted,
        })
    }

    /// Filter with only the built-in patterns.
    pub fn with_defaults(root: &Path) -> Result<Self> {
        Self::new(root, &[])
    }

    /// Whether `path`, or any directory above it up to the root, matches an
    /// ignore pattern.
    ///
    /// Paths outside the root are matched on their own; the directories
    /// above them are not part of the project and are never checked.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return self.matcher.matched(path, path.is_dir()).is_ignore();
        };

        if self.matcher.matched(relative, path.is_dir()).is_ignore() {
            return true;
        }

        relative
            .ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .any(|dir| self.matcher.matched(dir, true).is_ignore())
    }

    pub fn user_patterns(&self) -> &[String] {
        &self.user_patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directories_are_ignored() {
        let filter = IgnoreFilter::with_defaults(Path::new("/repo")).unwrap();
        assert!(filter.should_ignore(Path::new("/repo/node_modules/lib/index.js")));
        assert!(filter.should_ignore(Path::new("/repo/src/bin/Debug/app.cs")));
        assert!(filter.should_ignore(Path::new("/repo/.git/config")));
        assert!(!filter.should_ignore(Path::new("/repo/src/Program.cs")));
    }

    #[test]
    fn test_default_file_patterns() {
        let filter = IgnoreFilter::with_defaults(Path::new("/repo")).unwrap();
        assert!(filter.should_ignore(Path::new("/repo/web/app.min.js")));
        assert!(filter.should_ignore(Path::new("/repo/Cargo.lock")));
        assert!(!filter.should_ignore(Path::new("/repo/web/app.js")));
    }

    #[test]
    fn test_user_patterns() {
        let filter = IgnoreFilter::new(
            Path::new("/repo"),
            &["generated/".to_string(), "*.proto.cs".to_string()],
        )
        .unwrap();
        assert!(filter.should_ignore(Path::new("/repo/generated/Models.cs")));
        assert!(filter.should_ignore(Path::new("/repo/api/Service.proto.cs")));
        assert!(!filter.should_ignore(Path::new("/repo/api/Service.cs")));
        assert_eq!(filter.user_patterns().len(), 2);
    }

    #[test]
    fn test_paths_outside_root() {
        let filter = IgnoreFilter::with_defaults(Path::new("/repo")).unwrap();
        assert!(filter.should_ignore(Path::new("/elsewhere/web/app.min.js")));
        assert!(!filter.should_ignore(Path::new("/elsewhere/src/x.js")));
    }

    #[test]
    fn test_directories_above_root_are_not_checked() {
        let filter = IgnoreFilter::with_defaults(Path::new("/srv/build/app")).unwrap();
        assert!(!filter.should_ignore(Path::new("/srv/build/app/src/Program.cs")));
        assert!(filter.should_ignore(Path::new("/srv/build/app/bin/Program.cs")));

        let filter = IgnoreFilter::with_defaults(Path::new("/repo")).unwrap();
        assert!(!filter.should_ignore(Path::new("/home/me/bin/tools/Util.cs")));
    }
}
