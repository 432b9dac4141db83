//! Contained extraction of a validated archive into a sandbox directory.

use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use crate::config::ArchiveLimits;
use crate::error::{ArchiveRejection, IntakeError};

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Link targets longer than this are treated as corruption.
const MAX_LINK_TARGET: u64 = 4096;

/// What one extraction wrote to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Open `path` as a ZIP archive. Unreadable central directories are `Corrupted`.
pub fn open_archive(path: &Path) -> Result<ZipArchive<File>, IntakeError> {
    let file = File::open(path)
        .map_err(|e| IntakeError::io(format!("opening archive {}", path.display()), e))?;
    ZipArchive::new(file).map_err(|_| ArchiveRejection::Corrupted.into())
}

/// Member names in central-directory order.
pub fn member_names<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
    archive.file_names().map(str::to_string).collect()
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Destination for `member` under `root`, or `None` if it would land outside.
///
/// `root` must already be normalized. The root itself is not a valid destination.
pub fn contained_destination(root: &Path, member: &str) -> Option<PathBuf> {
    let candidate = normalize_lexically(&root.join(member));
    if candidate != root && candidate.starts_with(root) {
        Some(candidate)
    } else {
        None
    }
}

fn is_symlink_mode(mode: Option<u32>) -> bool {
    mode.is_some_and(|m| m & S_IFMT == S_IFLNK)
}

/// Remove `dest` and reject if it ended up as a symbolic link.
fn reject_if_symlink(dest: &Path, member: &str) -> Result<(), IntakeError> {
    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let _ = fs::remove_file(dest);
            Err(ArchiveRejection::SymlinkCreation {
                member: member.to_string(),
            }
            .into())
        }
        Ok(_) => Ok(()),
        Err(e) => Err(IntakeError::io(format!("inspecting member '{member}'"), e)),
    }
}

#[cfg(unix)]
fn create_link(target: &str, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(not(unix))]
fn create_link(target: &str, dest: &Path) -> std::io::Result<()> {
    fs::write(dest, target.as_bytes())
}

/// Copy one member to `dest`, stopping once `remaining` bytes would be exceeded.
///
/// Read failures mean the member data is damaged; write failures are host faults.
fn copy_member<R: Read>(
    reader: &mut R,
    dest: &Path,
    member: &str,
    remaining: u64,
    limit: u64,
) -> Result<u64, IntakeError> {
    let mut out = File::create(dest)
        .map_err(|e| IntakeError::io(format!("creating member '{member}'"), e))?;
    let mut buf = [0u8; 64 * 1024];
    let mut written: u64 = 0;

    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|_| IntakeError::from(ArchiveRejection::Corrupted))?;
        if n == 0 {
            break;
        }
        written += n as u64;
        if written > remaining {
            return Err(ArchiveRejection::TooLarge { limit }.into());
        }
        out.write_all(&buf[..n])
            .map_err(|e| IntakeError::io(format!("writing member '{member}'"), e))?;
    }

    out.flush()
        .map_err(|e| IntakeError::io(format!("flushing member '{member}'"), e))?;
    Ok(written)
}

/// Extract every member of `archive` beneath `root`.
///
/// Each destination is checked for containment before anything is written,
/// and each written path is checked afterwards for being a symbolic link.
/// Total uncompressed output is capped at `limits.max_total_bytes`.
pub fn extract_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    root: &Path,
    limits: &ArchiveLimits,
) -> Result<ExtractReport, IntakeError> {
    let root = normalize_lexically(root);
    let mut report = ExtractReport::default();

    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|_| IntakeError::from(ArchiveRejection::Corrupted))?;
        let name = member.name().to_string();

        let dest = contained_destination(&root, &name).ok_or_else(|| {
            IntakeError::from(ArchiveRejection::PathEscape {
                member: name.clone(),
            })
        })?;

        if member.is_dir() {
            fs::create_dir_all(&dest)
                .map_err(|e| IntakeError::io(format!("creating directory '{name}'"), e))?;
            report.directories += 1;
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| IntakeError::io(format!("creating parent of '{name}'"), e))?;
        }

        if is_symlink_mode(member.unix_mode()) {
            let mut target = String::new();
            (&mut member)
                .take(MAX_LINK_TARGET)
                .read_to_string(&mut target)
                .map_err(|_| IntakeError::from(ArchiveRejection::Corrupted))?;
            create_link(&target, &dest)
                .map_err(|e| IntakeError::io(format!("writing member '{name}'"), e))?;
            reject_if_symlink(&dest, &name)?;
            report.files += 1;
            continue;
        }

        let remaining = limits.max_total_bytes.saturating_sub(report.bytes);
        let written = copy_member(
            &mut member,
            &dest,
            &name,
            remaining,
            limits.max_total_bytes,
        )?;
        reject_if_symlink(&dest, &name)?;
        report.bytes += written;
        report.files += 1;
    }

    Ok(report)
}
