//! Resolution of resource ids (language names) to data file paths.
use std::path::PathBuf;

/// A kind of data file: `prefix + id + suffix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceType {
    pub name: &'static str,
    pub prefix: &'static str,
    pub suffix: &'static str,
}

pub const GRAM_DB_TYPE: ResourceType = ResourceType {
    name: "gram_db",
    prefix: "",
    suffix: ".gram",
};

impl ResourceType {
    pub fn file_name(&self, resource_id: &str) -> String {
        format!("{}{}{}", self.prefix, resource_id, self.suffix)
    }
}

pub trait ResourceResolver: Send + Sync {
    fn resolve_path(&self, resource_id: &str) -> PathBuf;
}

/// Resolves inside a single root directory.
#[derive(Debug, Clone)]
pub struct DirResourceResolver {
    resource_type: ResourceType,
    root: PathBuf,
}

impl DirResourceResolver {
    pub fn new(resource_type: ResourceType, root: impl Into<PathBuf>) -> Self {
        Self {
            resource_type,
            root: root.into(),
        }
    }
}

impl ResourceResolver for DirResourceResolver {
    fn resolve_path(&self, resource_id: &str) -> PathBuf {
        self.root.join(self.resource_type.file_name(resource_id))
    }
}

/// Prefers the user data directory, falling back to the shared data
/// directory when the file is not present there.
#[derive(Debug, Clone)]
pub struct FallbackResourceResolver {
    resource_type: ResourceType,
    user_dir: PathBuf,
    shared_dir: PathBuf,
}

impl FallbackResourceResolver {
    pub fn new(
        resource_type: ResourceType,
        user_dir: impl Into<PathBuf>,
        shared_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resource_type,
            user_dir: user_dir.into(),
            shared_dir: shared_dir.into(),
        }
    }
}

impl ResourceResolver for FallbackResourceResolver {
    fn resolve_path(&self, resource_id: &str) -> PathBuf {
        let file_name = self.resource_type.file_name(resource_id);
        let user_path = self.user_dir.join(&file_name);
        if user_path.exists() {
            return user_path;
        }
        let shared_path = self.shared_dir.join(&file_name);
        if shared_path.exists() {
            shared_path
        } else {
            user_path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dir_resolver() {
        let resolver = DirResourceResolver::new(GRAM_DB_TYPE, "/data");
        assert_eq!(resolver.resolve_path("zh-hant"), PathBuf::from("/data/zh-hant.gram"));
    }

    #[test]
    fn test_fallback_resolver() {
        let user = tempdir().unwrap();
        let shared = tempdir().unwrap();
        let resolver = FallbackResourceResolver::new(GRAM_DB_TYPE, user.path(), shared.path());

        // neither exists: user path
        assert_eq!(resolver.resolve_path("zh-hans"), user.path().join("zh-hans.gram"));

        std::fs::write(shared.path().join("zh-hans.gram"), b"").unwrap();
        assert_eq!(resolver.resolve_path("zh-hans"), shared.path().join("zh-hans.gram"));

        std::fs::write(user.path().join("zh-hans.gram"), b"").unwrap();
        assert_eq!(resolver.resolve_path("zh-hans"), user.path().join("zh-hans.gram"));
    }
}
