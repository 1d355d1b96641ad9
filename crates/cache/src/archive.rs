//! Cache entry archives
//!
//! An entry is the directory `{cache_dir}/{hash}`. It travels as a single
//! gzip-compressed tarball whose member paths are rooted at `cache_dir`, so
//! every member starts with `{hash}/`.
//!
//! The orchestrator keeps integrity markers named `source` inside an entry.
//! They are machine-local bookkeeping, so they are filtered out of archives
//! on the way in and again on the way out, at any depth.

use crate::{Error, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path};
use tar::{Archive, Builder};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Name of the orchestrator's integrity markers inside an entry
pub const CONTROL_FILE: &str = "source";

/// Archive filter used for cache entries
///
/// Rejects every path named `source` and anything below such a path.
#[must_use]
pub fn exclude_control_files(path: &Path) -> bool {
    !path
        .components()
        .any(|c| matches!(c, Component::Normal(name) if name == CONTROL_FILE))
}

/// Pack `{source_dir}/{entry_name}` into a gzip tarball at `dest`
///
/// Member paths are relative to `source_dir`. Paths for which `filter`
/// returns false are left out; a rejected directory is left out together
/// with its contents. Symlinks are stored as links.
pub fn pack<F>(source_dir: &Path, entry_name: &str, dest: &Path, filter: F) -> Result<usize>
where
    F: Fn(&Path) -> bool,
{
    pack_inner(source_dir, entry_name, dest, &filter)
        .map_err(|e| Error::archive("creating", dest, e))
}

fn pack_inner(
    source_dir: &Path,
    entry_name: &str,
    dest: &Path,
    filter: &dyn Fn(&Path) -> bool,
) -> io::Result<usize> {
    let root = source_dir.join(entry_name);
    let file = File::create(dest)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);

    let mut count = 0usize;
    let mut walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|_| {
                io::Error::other(format!(
                    "{} escapes {}",
                    entry.path().display(),
                    source_dir.display()
                ))
            })?;

        if !filter(rel) {
            trace!(path = %rel.display(), "Excluded from archive");
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        builder.append_path_with_name(entry.path(), rel)?;
        count += 1;
    }

    let mut writer = builder.into_inner()?.finish()?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    debug!(archive = %dest.display(), entries = count, "Created archive");
    Ok(count)
}

/// Unpack the gzip tarball at `archive` into `dest`
///
/// Members rejected by `filter` are skipped, as are members whose path
/// would land outside `dest`. Returns the number of members written.
pub fn unpack<F>(archive: &Path, dest: &Path, filter: F) -> Result<usize>
where
    F: Fn(&Path) -> bool,
{
    unpack_inner(archive, dest, &filter).map_err(|e| Error::archive("extracting", archive, e))
}

fn unpack_inner(archive: &Path, dest: &Path, filter: &dyn Fn(&Path) -> bool) -> io::Result<usize> {
    let file = File::open(archive)?;
    let mut tarball = Archive::new(GzDecoder::new(BufReader::new(file)));
    tarball.set_preserve_mtime(true);
    std::fs::create_dir_all(dest)?;

    let mut count = 0usize;
    for entry in tarball.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        if !filter(&path) {
            trace!(path = %path.display(), "Skipped while extracting");
            continue;
        }

        if entry.unpack_in(dest)? {
            count += 1;
        } else {
            warn!(path = %path.display(), "Refusing to extract member outside the cache directory");
        }
    }

    debug!(archive = %archive.display(), entries = count, "Extracted archive");
    Ok(count)
}
