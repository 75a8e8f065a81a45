//-
// Copyright (c) 2026, Mailbag contributors
//
// This file is part of Mailbag.
//
// Mailbag is free software: you can  redistribute it and/or modify it under
// the terms  of the GNU General  Public License as published  by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailbag is distributed  in the hope that it will  be useful, but WITHOUT
// ANY WARRANTY;  without even the  implied warranty of  MERCHANTABILITY or
// FITNESS FOR A PARTICULAR  PURPOSE. See the GNU General  Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mailbag. If not, see <http://www.gnu.org/licenses/>.

//! Miscellaneous functions for working with files.

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Write `data` into a new file at `path`, atomically.
///
/// The data is first staged in a temporary file within `tmp` and then
/// persisted to `path` without clobbering. The call fails with
/// `AlreadyExists` if `path` is already present; a partially written file is
/// never visible under `path`.
pub fn spit(
    tmp: impl AsRef<Path>,
    path: impl AsRef<Path>,
    mode: u32,
    data: &[u8],
) -> io::Result<()> {
    let mut tf = tempfile::NamedTempFile::new_in(tmp)?;
    tf.as_file_mut().write_all(data)?;
    chmod(tf.path(), mode)?;
    tf.as_file_mut().sync_all()?;
    tf.persist_noclobber(path)?;
    Ok(())
}

pub fn chmod(path: impl AsRef<Path>, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

pub trait IgnoreKinds {
    fn ignore_already_exists(self) -> Self;
}

impl<R: Default> IgnoreKinds for Result<R, io::Error> {
    fn ignore_already_exists(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                Ok(R::default())
            },
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn spit_never_clobbers() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.txt");

        spit(dir.path(), &target, 0o600, b"first").unwrap();
        assert_eq!("first", fs::read_to_string(&target).unwrap());

        let err = spit(dir.path(), &target, 0o600, b"second").unwrap_err();
        assert_eq!(io::ErrorKind::AlreadyExists, err.kind());
        assert_eq!("first", fs::read_to_string(&target).unwrap());
    }

    #[test]
    fn ignore_already_exists_passes_other_errors() {
        let r: io::Result<()> =
            Err(io::Error::new(io::ErrorKind::AlreadyExists, "x"));
        assert!(r.ignore_already_exists().is_ok());

        let r: io::Result<()> =
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "x"));
        assert!(r.ignore_already_exists().is_err());
    }
}
