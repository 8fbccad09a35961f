//! Filename helpers and sibling-file lookup.

use std::fs;
use std::path::{Path, PathBuf};

use super::{RpFileStd, SharedFile};

/// Extension of `filename`, including the leading dot.
///
/// The dot must come after the last path separator and must not be the
/// final character.
pub fn file_ext(filename: &str) -> Option<&str> {
    let dot = filename.rfind('.')?;
    if dot + 1 >= filename.len() {
        return None;
    }
    if let Some(slash) = filename.rfind(['/', std::path::MAIN_SEPARATOR]) {
        if dot <= slash {
            return None;
        }
    }
    Some(&filename[dot..])
}

/// Open the file next to `filename` with the same stem and extension `ext`.
///
/// The uppercase form of `ext` is tried first, then the lowercase form. If
/// neither exists and `filename` is a symlink, the lookup is repeated next
/// to the link target.
pub fn open_related_file(filename: &str, ext: &str) -> Option<SharedFile> {
    let path = Path::new(filename);
    if let Some(file) = open_sibling(path, ext) {
        return Some(file);
    }

    let target = fs::read_link(path).ok()?;
    let target = match path.parent() {
        Some(dir) if target.is_relative() => dir.join(target),
        _ => target,
    };
    tracing::trace!(target = %target.display(), "retrying related file via symlink target");
    open_sibling(&target, ext)
}

fn open_sibling(path: &Path, ext: &str) -> Option<SharedFile> {
    let upper = ext.to_ascii_uppercase();
    let lower = ext.to_ascii_lowercase();
    let candidates = if upper == lower {
        vec![upper]
    } else {
        vec![upper, lower]
    };

    candidates
        .iter()
        .map(|ext| sibling_path(path, ext))
        .find_map(|candidate| match RpFileStd::open_shared(&candidate) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::trace!(path = %candidate.display(), error = %e, "related file not opened");
                None
            }
        })
}

fn sibling_path(path: &Path, ext: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{stem}{ext}");
    match path.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::RpFile;

    #[test]
    fn test_file_ext_rules() {
        assert_eq!(file_ext("game.GBA"), Some(".GBA"));
        assert_eq!(file_ext("/roms/a.b/game.vms"), Some(".vms"));
        assert_eq!(file_ext("/roms/a.b/game"), None);
        assert_eq!(file_ext("trailing."), None);
        assert_eq!(file_ext(""), None);
        assert_eq!(file_ext("noext"), None);
    }

    #[test]
    fn test_related_prefers_uppercase() {
        let dir = tempfile::tempdir().unwrap();
        let vms = dir.path().join("save.vms");
        fs::write(&vms, [0u8; 512]).unwrap();
        fs::write(dir.path().join("save.VMI"), [1u8; 108]).unwrap();

        let related = open_related_file(vms.to_str().unwrap(), ".vmi").unwrap();
        assert!(related.filename().unwrap().ends_with("save.VMI"));
    }

    #[test]
    fn test_related_missing() {
        let dir = tempfile::tempdir().unwrap();
        let vms = dir.path().join("lonely.vms");
        fs::write(&vms, [0u8; 512]).unwrap();
        assert!(open_related_file(vms.to_str().unwrap(), ".vmi").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_related_through_symlink() {
        let real = tempfile::tempdir().unwrap();
        let links = tempfile::tempdir().unwrap();
        fs::write(real.path().join("data.vms"), [0u8; 512]).unwrap();
        fs::write(real.path().join("data.vmi"), [0u8; 108]).unwrap();
        let link = links.path().join("data.vms");
        std::os::unix::fs::symlink(real.path().join("data.vms"), &link).unwrap();

        let related = open_related_file(link.to_str().unwrap(), ".vmi").unwrap();
        assert_eq!(related.size().unwrap(), 108);
    }
}
