use crate::error::TriageError;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Copies `from` to `to`, creating parent folders, and carries over the
/// permissions and access/modification times. Returns the bytes copied.
pub fn copy_preserving(from: &Path, to: &Path) -> Result<u64, TriageError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(TriageError::io("create folder", parent))?;
    }
    let bytes = fs::copy(from, to).map_err(TriageError::io("copy", from))?;

    let meta = fs::metadata(from).map_err(TriageError::io("stat", from))?;
    let mut times = fs::FileTimes::new();
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    let dest = open_for_times(to).map_err(TriageError::io("open", to))?;
    dest.set_times(times)
        .map_err(TriageError::io("set times", to))?;
    Ok(bytes)
}

// The copy may already be read-only, so ask only for what set_times needs.
#[cfg(unix)]
fn open_for_times(path: &Path) -> std::io::Result<fs::File> {
    fs::File::open(path)
}

#[cfg(windows)]
fn open_for_times(path: &Path) -> std::io::Result<fs::File> {
    use std::os::windows::fs::OpenOptionsExt;
    const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    fs::File::options()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .open(path)
}

#[cfg(not(any(unix, windows)))]
fn open_for_times(path: &Path) -> std::io::Result<fs::File> {
    fs::File::options().write(true).open(path)
}

/// Compares both files by BLAKE3 digest.
pub fn verify_copy(from: &Path, to: &Path) -> Result<(), TriageError> {
    if full_hash(from)? != full_hash(to)? {
        return Err(TriageError::VerifyMismatch {
            path: to.to_path_buf(),
        });
    }
    Ok(())
}

fn full_hash(path: &Path) -> Result<blake3::Hash, TriageError> {
    let mut file = fs::File::open(path).map_err(TriageError::io("open", path))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(TriageError::io("read", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn copies_contents_and_mtime_into_new_folders() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("a.jpg");
        fs::write(&src, b"pixels").unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fs::File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let dst = temp.path().join("out").join("2020").join("a.jpg");
        let n = copy_preserving(&src, &dst).unwrap();
        assert_eq!(n, 6);
        assert_eq!(fs::read(&dst).unwrap(), b"pixels");
        assert_eq!(fs::metadata(&dst).unwrap().modified().unwrap(), old);
        verify_copy(&src, &dst).unwrap();
    }

    #[test]
    fn verify_detects_differences() {
        let temp = tempfile::tempdir().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        fs::write(&a, b"one").unwrap();
        fs::write(&b, b"two").unwrap();
        assert!(matches!(
            verify_copy(&a, &b),
            Err(TriageError::VerifyMismatch { .. })
        ));
    }

    #[test]
    fn missing_source_propagates() {
        let temp = tempfile::tempdir().unwrap();
        let err = copy_preserving(&temp.path().join("nope"), &temp.path().join("x")).unwrap_err();
        assert!(matches!(err, TriageError::Io { operation: "copy", .. }));
    }
}
