//! Fragment resource - one rendered file on disk

use anyhow::Result;
use nginxkit::{ConfigError, FileAttrs, FragmentFile};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use super::{ApplyContext, ApplyResult, Resource, ResourceState};

/// Hex digits of the blake3 digest shown in state details
const DIGEST_LEN: usize = 12;

/// A rendered vhost file to write or remove
#[derive(Debug, Clone)]
pub struct Fragment {
    pub vhost: String,
    pub file: FragmentFile,
}

impl Fragment {
    pub fn new(vhost: &str, file: FragmentFile) -> Self {
        Self {
            vhost: vhost.to_string(),
            file,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Read the file currently on disk, if any
    pub fn read_current(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        match fs::read(&self.file.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.write_error(source)),
        }
    }

    fn write_error(&self, source: io::Error) -> ConfigError {
        ConfigError::FragmentWrite {
            path: self.file.path.clone(),
            source,
        }
    }

    fn details(bytes: &[u8], mode: Option<u32>) -> String {
        let hash = blake3::hash(bytes).to_hex();
        let digest = &hash.as_str()[..DIGEST_LEN];
        match mode {
            Some(mode) => format!("blake3:{} mode {:o}", digest, mode),
            None => format!("blake3:{}", digest),
        }
    }
}

#[cfg(unix)]
fn file_mode(path: &Path) -> io::Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Some(fs::metadata(path)?.permissions().mode() & 0o7777))
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> io::Result<Option<u32>> {
    Ok(None)
}

#[cfg(unix)]
fn desired_mode(attrs: &FileAttrs) -> Option<u32> {
    Some(attrs.mode)
}

#[cfg(not(unix))]
fn desired_mode(_attrs: &FileAttrs) -> Option<u32> {
    None
}

/// Write `bytes` to a sibling temp file, apply attributes, then rename over `path`
fn write_atomic(path: &Path, bytes: &[u8], attrs: &FileAttrs) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = parent.join(format!(".{}.vhostctl-tmp", name));

    let result = write_temp(&temp, bytes, attrs).and_then(|()| fs::rename(&temp, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn write_temp(temp: &Path, bytes: &[u8], attrs: &FileAttrs) -> io::Result<()> {
    let mut file = File::create(temp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    set_attrs(temp, attrs)
}

#[cfg(unix)]
fn set_attrs(path: &Path, attrs: &FileAttrs) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(attrs.mode))?;
    if ownership::is_root() {
        let uid = ownership::uid(&attrs.owner)?;
        let gid = ownership::gid(&attrs.group)?;
        std::os::unix::fs::chown(path, Some(uid), Some(gid))?;
    } else {
        log::trace!(
            "not root, leaving ownership of {} unchanged",
            path.display()
        );
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_attrs(_path: &Path, _attrs: &FileAttrs) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
mod ownership {
    use std::ffi::CString;
    use std::io;

    pub fn is_root() -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail
        unsafe { libc::geteuid() == 0 }
    }

    /// Resolve a user name (or numeric id) to a uid
    pub fn uid(owner: &str) -> io::Result<u32> {
        if let Ok(id) = owner.parse() {
            return Ok(id);
        }
        let name = CString::new(owner)?;
        // SAFETY: name is NUL-terminated; the record is read before any other call
        unsafe {
            let pw = libc::getpwnam(name.as_ptr());
            if pw.is_null() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("unknown user '{}'", owner),
                ));
            }
            Ok((*pw).pw_uid)
        }
    }

    /// Resolve a group name (or numeric id) to a gid
    pub fn gid(group: &str) -> io::Result<u32> {
        if let Ok(id) = group.parse() {
            return Ok(id);
        }
        let name = CString::new(group)?;
        // SAFETY: as in uid()
        unsafe {
            let gr = libc::getgrnam(name.as_ptr());
            if gr.is_null() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("unknown group '{}'", group),
                ));
            }
            Ok((*gr).gr_gid)
        }
    }
}

impl Resource for Fragment {
    fn id(&self) -> String {
        self.file.path.display().to_string()
    }

    fn description(&self) -> String {
        let verb = if self.file.content.is_some() {
            "Write"
        } else {
            "Remove"
        };
        format!("{} {} of vhost '{}'", verb, self.file.kind, self.vhost)
    }

    fn resource_type(&self) -> &'static str {
        if self.file.kind.is_fragment() {
            "fragment"
        } else {
            "ssl_material"
        }
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Some(bytes) = self.read_current()? else {
            return Ok(ResourceState::Absent);
        };
        let mode = if desired_mode(&self.file.attrs).is_some() {
            file_mode(&self.file.path).map_err(|e| self.write_error(e))?
        } else {
            None
        };
        Ok(ResourceState::Present {
            details: Some(Self::details(&bytes, mode)),
        })
    }

    fn desired_state(&self) -> ResourceState {
        match &self.file.content {
            Some(bytes) => ResourceState::Present {
                details: Some(Self::details(bytes, desired_mode(&self.file.attrs))),
            },
            None => ResourceState::Absent,
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let current = self.current_state()?;
        if current == self.desired_state() {
            return Ok(ApplyResult::NoChange);
        }

        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        match &self.file.content {
            Some(bytes) => {
                write_atomic(&self.file.path, bytes, &self.file.attrs)
                    .map_err(|e| self.write_error(e))?;
                log::info!("wrote {} ({} bytes)", self.file.path.display(), bytes.len());
                Ok(if current.is_absent() {
                    ApplyResult::Created
                } else {
                    ApplyResult::Modified
                })
            }
            None => {
                fs::remove_file(&self.file.path).map_err(|e| self.write_error(e))?;
                log::info!("removed {}", self.file.path.display());
                Ok(ApplyResult::Removed)
            }
        }
    }

    fn notifies(&self) -> bool {
        self.file.notify
    }
}
