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

//! The filesystem-backed mailbox store.
//!
//! Layout: `<spool-root>/<receiver>/message_<unix-seconds>.txt`, one
//! directory per receiver, one file per message. The directory listing is
//! the sole source of truth; there is no index, and every operation that
//! takes a message number re-derives ranks from a fresh enumeration.
//!
//! All operations on one `MailSpool` must be serialised externally (the
//! server wraps it in a process-wide mutex). Ranks observed by one client
//! can be shifted by another client's delivery or deletion between requests;
//! that instability is part of the protocol.

use std::fs;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::message::Message;
use crate::support::error::Error;
use crate::support::file_ops::{self, IgnoreKinds};

/// Directory entries containing this marker are message files; everything
/// else (including in-flight temporary files) is invisible to enumeration.
const MESSAGE_FILE_MARKER: &str = "message_";

pub struct MailSpool {
    root: PathBuf,
}

impl MailSpool {
    pub fn new(root: PathBuf) -> Self {
        MailSpool { root }
    }

    /// Create the spool root if it does not already exist.
    ///
    /// Called once before the listener starts; failure here is a setup
    /// failure, not a protocol error.
    pub fn bootstrap(root: &Path) -> Result<(), Error> {
        fs::DirBuilder::new()
            .mode(0o777)
            .create(root)
            .ignore_already_exists()?;
        Ok(())
    }

    /// Store a new message in the receiver's mailbox, creating the mailbox
    /// directory on first delivery.
    ///
    /// The file name is derived from the current unix second. On a
    /// same-second collision the timestamp is bumped until a free name is
    /// found, so every delivery lands in its own file.
    pub fn deliver(&self, message: &Message) -> Result<(), Error> {
        message.check_bounds()?;

        let mailbox = self.root.join(&message.receiver);
        fs::DirBuilder::new()
            .mode(0o777)
            .create(&mailbox)
            .ignore_already_exists()?;

        let text = message.to_file_text();
        let mut stamp = Utc::now().timestamp();
        loop {
            let path = mailbox.join(format!("message_{}.txt", stamp));
            match file_ops::spit(&mailbox, &path, 0o666, text.as_bytes()) {
                Ok(()) => return Ok(()),
                Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                    stamp += 1;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The subject of every message in the user's mailbox, in rank order.
    ///
    /// An absent mailbox is an empty mailbox here, unlike in the by-rank
    /// operations.
    pub fn enumerate(&self, user: &str) -> Result<Vec<String>, Error> {
        let files = match self.scan_mailbox(user) {
            Ok(files) => files,
            Err(Error::NoSuchMailbox) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut subjects = Vec::with_capacity(files.len());
        for path in &files {
            subjects.push(Message::parse(&fs::read_to_string(path)?)?.subject);
        }
        Ok(subjects)
    }

    /// Fetch the full content of the message at the given 1-based rank.
    pub fn fetch_by_rank(
        &self,
        user: &str,
        rank: u32,
    ) -> Result<Message, Error> {
        let path = self.locate(user, rank)?;
        Message::parse(&fs::read_to_string(path)?)
    }

    /// Remove the message at the given 1-based rank.
    pub fn delete_by_rank(&self, user: &str, rank: u32) -> Result<(), Error> {
        let path = self.locate(user, rank)?;
        fs::remove_file(path)?;
        Ok(())
    }

    fn locate(&self, user: &str, rank: u32) -> Result<PathBuf, Error> {
        let mut files = self.scan_mailbox(user)?;
        let index = rank
            .checked_sub(1)
            .map(|i| i as usize)
            .ok_or(Error::NoSuchMessage)?;
        if index >= files.len() {
            return Err(Error::NoSuchMessage);
        }
        Ok(files.swap_remove(index))
    }

    /// The shared traversal primitive: every message file in the user's
    /// mailbox, in raw directory enumeration order. Ranks are positions in
    /// this listing.
    fn scan_mailbox(&self, user: &str) -> Result<Vec<PathBuf>, Error> {
        let mailbox = self.root.join(user);
        let entries = match fs::read_dir(&mailbox) {
            Ok(entries) => entries,
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                return Err(Error::NoSuchMailbox);
            },
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry
                .file_name()
                .to_string_lossy()
                .contains(MESSAGE_FILE_MARKER)
            {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}
