use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically replaces `path` with `content`: write to a uniquely named
/// sibling, fsync, then rename over the target. A concurrent reader
/// observes either the previous content or the new content, never a
/// prefix.
pub fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

pub fn pid_file_name(name: &str) -> String {
    format!("{}.pid", name)
}

/// Records the pid of a supervised child under `dir`.
pub fn write_pid_in(dir: &Path, name: &str, pid: u32) -> std::io::Result<()> {
    write_atomic(&dir.join(pid_file_name(name)), &pid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_and_replaces_the_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("stmgr-1.pid");

        write_atomic(&target, "100").unwrap();
        assert_eq!("100", fs::read_to_string(&target).unwrap());

        write_atomic(&target, "2345").unwrap();
        assert_eq!("2345", fs::read_to_string(&target).unwrap());
    }

    #[test]
    fn leaves_no_temp_siblings_behind() {
        let dir = tempfile::tempdir().unwrap();
        write_pid_in(dir.path(), "metricsmgr-0", 42).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(1, entries.len());
        assert_eq!(
            "42",
            fs::read_to_string(dir.path().join("metricsmgr-0.pid")).unwrap()
        );
    }
}
