//! Table serialization.
//!
//! The writer is a pure serializer: content validation happens before samples
//! reach it.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use atmos_common::{format_table_time, AtmosphericSample, TableError};

use crate::{header_line, SEPARATOR};

/// Serialize the header and one row per sample into any writer.
pub fn write_rows<W: Write>(out: &mut W, samples: &[AtmosphericSample]) -> io::Result<()> {
    writeln!(out, "{}", header_line())?;
    for sample in samples {
        write_row(out, sample)?;
    }
    Ok(())
}

fn write_row<W: Write>(out: &mut W, sample: &AtmosphericSample) -> io::Result<()> {
    write!(out, "{}", format_table_time(&sample.time))?;

    let position = [sample.latitude_deg, sample.longitude_deg, sample.altitude_m];
    let magnitudes = sample.magnitudes().map(|(_, value)| value);

    // f64 Display is shortest round-trip plain decimal, never exponent form
    for value in position.iter().chain(magnitudes.iter()) {
        write!(out, "{}{}", SEPARATOR, value)?;
    }
    writeln!(out)
}

/// Write a complete table to `path`.
///
/// Missing parent directories are created. Rows go to a temporary file next
/// to the destination, which is renamed into place only after everything has
/// been flushed. On any failure the temporary file is removed and the
/// destination is left untouched, so a reader never sees a half-written
/// table under the final name.
///
/// # Returns
/// Number of data rows written
pub fn write_table(
    path: impl AsRef<Path>,
    samples: &[AtmosphericSample],
) -> Result<usize, TableError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&dir).map_err(|e| TableError::io(&dir, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".profile-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| TableError::io(&dir, e))?;

    debug!(temp = %temp.path().display(), "Writing profile table");

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write_rows(&mut writer, samples).map_err(|e| TableError::io(path, e))?;
        writer.flush().map_err(|e| TableError::io(path, e))?;
    }
    if let Some(permissions) = table_permissions(path) {
        temp.as_file()
            .set_permissions(permissions)
            .map_err(|e| TableError::io(path, e))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| TableError::io(path, e))?;

    temp.persist(path)
        .map_err(|e| TableError::io(path, e.error))?;

    info!(path = %path.display(), rows = samples.len(), "Wrote profile table");
    Ok(samples.len())
}

/// Mode the finished table should carry.
///
/// Temp files are created owner-only; the table must stay readable by the
/// simulator process. An existing destination keeps its mode, a new one gets
/// 0644.
fn table_permissions(path: &Path) -> Option<fs::Permissions> {
    if let Ok(meta) = fs::metadata(path) {
        return Some(meta.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(fs::Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}
