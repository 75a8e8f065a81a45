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

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use super::dispatch::dispatch;
use super::syntax::{self, Frame, Response};
use crate::spool::store::MailSpool;
use crate::support::error::Error;

/// The per-connection worker.
///
/// Owns both halves of one accepted connection and runs its protocol loop
/// to completion. Dropping the `Server` (normally when the owning thread
/// finishes `run`) releases the transport on every exit path.
pub struct Server {
    read: Box<dyn BufRead + Send>,
    write: Box<dyn Write + Send>,
    spool: Arc<Mutex<MailSpool>>,
    log_prefix: String,
}

impl Server {
    pub fn new<R: BufRead + Send + 'static, W: Write + Send + 'static>(
        read: R,
        write: W,
        spool: Arc<Mutex<MailSpool>>,
        log_prefix: String,
    ) -> Self {
        Server {
            read: Box::new(read),
            write: Box::new(write),
            spool,
            log_prefix,
        }
    }

    /// Run the connection to completion.
    ///
    /// Returns `Ok` on QUIT or orderly peer disconnect; transport errors
    /// propagate to the caller. Neither QUIT nor disconnect produces a
    /// response frame.
    pub fn run(&mut self) -> Result<(), Error> {
        loop {
            let response = match syntax::read_frame(&mut self.read)? {
                Frame::Quit => return Ok(()),
                Frame::Eof => {
                    info!(
                        "{} Client disconnected without QUIT",
                        self.log_prefix,
                    );
                    return Ok(());
                },
                Frame::Malformed => {
                    warn!("{} Malformed frame", self.log_prefix);
                    Response::Err
                },
                Frame::Request(request) => {
                    dispatch(&self.log_prefix, &self.spool, &request)
                },
            };

            response.write_to(&mut self.write)?;
            self.write.flush()?;
        }
    }
}
