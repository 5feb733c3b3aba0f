//! Active document and project lookups consumed by the template tokens

use std::fs;
use std::path::{Path, PathBuf};

/// Supplies the path of the document shown in one surface
pub trait DocumentContext {
    /// `None` until the host knows which document the surface shows
    fn current_document_path(&self) -> Option<PathBuf>;
}

impl<F> DocumentContext for F
where
    F: Fn() -> Option<PathBuf>,
{
    fn current_document_path(&self) -> Option<PathBuf> {
        self()
    }
}

/// Resolves the name of the project containing a document
pub trait ProjectLookup {
    fn project_name_for(&self, path: &Path) -> Option<String>;
}

impl<F> ProjectLookup for F
where
    F: Fn(&Path) -> Option<String>,
{
    fn project_name_for(&self, path: &Path) -> Option<String> {
        self(path)
    }
}

/// Manifests named after their directory's project
const DIRECTORY_MANIFESTS: &[&str] = &["Cargo.toml", "package.json", "pyproject.toml", "go.mod"];

/// Project file extensions whose file stem is the project name
const PROJECT_EXTENSIONS: &[&str] = &["csproj", "vbproj", "fsproj", "vcxproj"];

/// Finds the nearest ancestor directory holding a project manifest.
///
/// MSBuild-style project files name the project after their stem; other
/// manifests name it after the directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestProjectLookup;

impl ManifestProjectLookup {
    fn project_in(dir: &Path) -> Option<String> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::trace!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                return None;
            }
        };

        let mut has_manifest = false;
        for entry in entries.flatten() {
            let path = entry.path();
            if path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| PROJECT_EXTENSIONS.contains(&ext))
            {
                return path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned());
            }
            if path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| DIRECTORY_MANIFESTS.contains(&name))
            {
                has_manifest = true;
            }
        }

        if has_manifest {
            dir.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        } else {
            None
        }
    }
}

impl ProjectLookup for ManifestProjectLookup {
    fn project_name_for(&self, path: &Path) -> Option<String> {
        path.ancestors().skip(1).find_map(Self::project_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_manifest_names_project() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("engine");
        fs::create_dir_all(project.join("src")).unwrap();
        fs::write(project.join("Cargo.toml"), "[package]").unwrap();

        let name = ManifestProjectLookup.project_name_for(&project.join("src").join("lib.rs"));
        assert_eq!(name.as_deref(), Some("engine"));
    }

    #[test]
    fn test_project_file_stem_wins() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("folder");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("Watermark.Vsix.csproj"), "<Project />").unwrap();

        let name = ManifestProjectLookup.project_name_for(&project.join("Program.cs"));
        assert_eq!(name.as_deref(), Some("Watermark.Vsix"));
    }

    #[test]
    fn test_nearest_manifest_is_used() {
        let root = tempfile::tempdir().unwrap();
        let outer = root.path().join("outer");
        let inner = outer.join("crates").join("inner");
        fs::create_dir_all(inner.join("src")).unwrap();
        fs::write(outer.join("Cargo.toml"), "[workspace]").unwrap();
        fs::write(inner.join("Cargo.toml"), "[package]").unwrap();

        let name = ManifestProjectLookup.project_name_for(&inner.join("src").join("main.rs"));
        assert_eq!(name.as_deref(), Some("inner"));
    }

    #[test]
    fn test_no_manifest() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("loose");
        fs::create_dir_all(&dir).unwrap();

        // Ancestors above the temp dir may hold anything, so only check the
        // lookup does not report the loose directory itself
        let name = ManifestProjectLookup.project_name_for(&dir.join("notes.txt"));
        assert_ne!(name.as_deref(), Some("loose"));
    }

    #[test]
    fn test_closure_lookup() {
        let lookup = |_: &Path| Some("Fixed".to_string());
        assert_eq!(
            lookup.project_name_for(Path::new("/a/b.rs")).as_deref(),
            Some("Fixed")
        );
    }
}
