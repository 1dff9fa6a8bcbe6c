//! Resolution of the homework root, default materials and class context.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Folder under which `--folder` is resolved unless it already names it.
pub const HOMEWORKS_DIR: &str = "Homeworks";

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Make `path` absolute without requiring it to exist.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(expand_tilde(path))?;
    Ok(std::fs::canonicalize(&absolute).unwrap_or(absolute))
}

fn names_homeworks(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().eq_ignore_ascii_case("homeworks"),
        _ => false,
    })
}

/// Resolve `folder` relative to `base`: used as given when some component is
/// `homeworks` (any case), otherwise looked up under `base/Homeworks/`.
pub fn resolve_homework_root_from(base: &Path, folder: &Path) -> io::Result<PathBuf> {
    let folder = expand_tilde(folder);
    let candidate = if names_homeworks(&folder) {
        folder
    } else {
        Path::new(HOMEWORKS_DIR).join(folder)
    };
    absolutize(&base.join(candidate))
}

/// [`resolve_homework_root_from`] against the current directory.
pub fn resolve_homework_root(folder: &Path) -> io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    resolve_homework_root_from(&cwd, folder)
}

/// `<root>/Materials` when it exists, otherwise `<root>/materials`.
pub fn materials_dir(root: &Path) -> PathBuf {
    let capitalized = root.join("Materials");
    if capitalized.exists() {
        capitalized
    } else {
        root.join("materials")
    }
}

/// Default `(problems.pdf, solutions.pdf)` locations for a homework root.
pub fn default_materials(root: &Path) -> (PathBuf, PathBuf) {
    let base = materials_dir(root);
    (base.join("problems.pdf"), base.join("solutions.pdf"))
}

/// Class context text, if a usable `.txt` file was supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassInfo {
    /// Set only when the file was read.
    pub path: Option<PathBuf>,
    pub text: Option<String>,
    /// Why a supplied file was ignored.
    pub warning: Option<String>,
}

/// Read the class context file. Only existing `.txt` files are used; anything
/// else is ignored with a warning.
pub fn read_class_info(path: Option<&Path>) -> ClassInfo {
    let Some(path) = path else {
        return ClassInfo::default();
    };
    let path = expand_tilde(path);

    if !path.is_file() {
        return ClassInfo {
            warning: Some(format!("Class info not found at {}; ignoring.", path.display())),
            ..Default::default()
        };
    }
    let is_txt = path
        .extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("txt"));
    if !is_txt {
        return ClassInfo {
            warning: Some(format!(
                "Class info {} is not a .txt file; ignoring.",
                path.display()
            )),
            ..Default::default()
        };
    }

    match std::fs::read(&path) {
        Ok(bytes) => ClassInfo {
            path: Some(absolutize(&path).unwrap_or(path)),
            text: Some(String::from_utf8_lossy(&bytes).into_owned()),
            warning: None,
        },
        Err(e) => ClassInfo {
            warning: Some(format!(
                "Failed to read class info {}: {}; ignoring.",
                path.display(),
                e
            )),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_folder_is_resolved_under_homeworks() {
        let base = tempfile::tempdir().unwrap();
        let root = resolve_homework_root_from(base.path(), Path::new("hw3")).unwrap();
        assert!(root.ends_with("Homeworks/hw3"));
        assert!(root.is_absolute());
    }

    #[test]
    fn folder_naming_homeworks_is_used_as_is() {
        let base = tempfile::tempdir().unwrap();
        let root =
            resolve_homework_root_from(base.path(), Path::new("homeworks/hw3")).unwrap();
        assert!(root.ends_with("homeworks/hw3"));
        assert!(!root.to_string_lossy().contains("Homeworks/homeworks"));
    }

    #[test]
    fn materials_prefers_capitalized_folder() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(materials_dir(root.path()), root.path().join("materials"));

        std::fs::create_dir(root.path().join("Materials")).unwrap();
        let (problems, solutions) = default_materials(root.path());
        assert_eq!(problems, root.path().join("Materials/problems.pdf"));
        assert_eq!(solutions, root.path().join("Materials/solutions.pdf"));
    }

    #[test]
    fn class_info_reads_txt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class.TXT");
        std::fs::write(&path, "Calculus I, first-year students").unwrap();

        let info = read_class_info(Some(&path));
        assert_eq!(info.text.as_deref(), Some("Calculus I, first-year students"));
        assert!(info.path.is_some());
        assert!(info.warning.is_none());
    }

    #[test]
    fn class_info_ignores_other_formats_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("class.pdf");
        std::fs::write(&pdf, "%PDF").unwrap();

        let info = read_class_info(Some(&pdf));
        assert!(info.text.is_none() && info.path.is_none());
        assert!(info.warning.unwrap().contains("not a .txt"));

        let info = read_class_info(Some(&dir.path().join("missing.txt")));
        assert!(info.text.is_none());
        assert!(info.warning.unwrap().contains("not found"));

        assert_eq!(read_class_info(None), ClassInfo::default());
    }
}
