use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write a file through a temporary sibling which replaces the destination only when complete
pub(crate) fn write_atomically<E, F>(path: &Path, write: F) -> Result<(), E>
where
    E: From<std::io::Error>,
    F: FnOnce(&mut BufWriter<File>) -> Result<(), E>,
{
    let tmp = temporary_path(path);
    let mut writer = BufWriter::new(File::create(&tmp)?);
    let result = write(&mut writer).and_then(|()| {
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    });
    match result {
        Ok(()) => {
            fs::rename(&tmp, path)?;
            Ok(())
        }
        Err(e) => {
            // the destination, if any, is left untouched
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Write a `#! SET key value` header line
pub(crate) fn write_set<W: Write>(
    writer: &mut W,
    key: &str,
    value: impl std::fmt::Display,
) -> std::io::Result<()> {
    writeln!(writer, "#! SET {key} {value}")
}

#[cfg(test)]
pub(crate) fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "variational-bias-{}-{name}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_destination() {
        let path = test_dir("io-replace").join("out.txt");
        write_atomically::<std::io::Error, _>(&path, |w| writeln!(w, "first")).unwrap();
        write_atomically::<std::io::Error, _>(&path, |w| writeln!(w, "second")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        assert!(!temporary_path(&path).exists());
    }

    #[test]
    fn failed_write_keeps_destination() {
        let path = test_dir("io-failed").join("out.txt");
        write_atomically::<std::io::Error, _>(&path, |w| writeln!(w, "complete")).unwrap();
        let result = write_atomically::<std::io::Error, _>(&path, |w| {
            writeln!(w, "partial")?;
            Err(std::io::Error::other("interrupted"))
        });
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "complete\n");
        assert!(!temporary_path(&path).exists());
    }
}
