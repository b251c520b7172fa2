//! Persistence of generated files.

use std::fs;
use std::io;
use std::path::Path;

/// File name of the generated output in each package directory.
pub const OUTPUT_FILE: &str = "reset.gen.go";

/// Permission bits of every generated file.
pub const OUTPUT_MODE: u32 = 0o644;

/// Strategy for writing a generated file.
pub trait FileWriter {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Writes straight to the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWriter;

impl FsWriter {
    pub fn new() -> Self {
        Self
    }
}

impl FileWriter for FsWriter {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)?;
        set_mode(path)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(OUTPUT_MODE))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path) -> io::Result<()> {
    Ok(())
}
