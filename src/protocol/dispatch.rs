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

use std::sync::Mutex;

use log::{error, info};

use super::syntax::{Request, Response};
use crate::spool::store::MailSpool;
use crate::support::error::Error;

/// Execute one request against the spool, under the global spool lock.
///
/// Every store failure is collapsed into `ERR` here; clients never see the
/// underlying cause, which is only logged. Rank misses and absent mailboxes
/// are ordinary client errors and logged at a lower level than real I/O
/// failures.
pub fn dispatch(
    log_prefix: &str,
    spool: &Mutex<MailSpool>,
    request: &Request,
) -> Response {
    match request {
        Request::Send(message) => {
            let result = spool.lock().unwrap().deliver(message);
            match result {
                Ok(()) => Response::Ok,
                Err(e) => {
                    error!(
                        "{} Failed to deliver to {:?}: {}",
                        log_prefix, message.receiver, e,
                    );
                    Response::Err
                },
            }
        },

        Request::List { username } => {
            let result = spool.lock().unwrap().enumerate(username);
            match result {
                Ok(subjects) => Response::List(subjects),
                Err(e) => {
                    error!(
                        "{} Failed to list mailbox {:?}: {}",
                        log_prefix, username, e,
                    );
                    Response::Err
                },
            }
        },

        Request::Read { username, rank } => {
            let result = spool.lock().unwrap().fetch_by_rank(username, *rank);
            match result {
                Ok(message) => Response::Message(message),
                Err(e) => {
                    log_miss(log_prefix, "read", username, *rank, &e);
                    Response::Err
                },
            }
        },

        Request::Delete { username, rank } => {
            let result =
                spool.lock().unwrap().delete_by_rank(username, *rank);
            match result {
                Ok(()) => Response::Ok,
                Err(e) => {
                    log_miss(log_prefix, "delete", username, *rank, &e);
                    Response::Err
                },
            }
        },
    }
}

fn log_miss(
    log_prefix: &str,
    operation: &str,
    username: &str,
    rank: u32,
    error: &Error,
) {
    match error {
        Error::NoSuchMailbox | Error::NoSuchMessage => info!(
            "{} Rejected {} of {:?} #{}: {}",
            log_prefix, operation, username, rank, error,
        ),
        _ => error!(
            "{} Failed to {} {:?} #{}: {}",
            log_prefix, operation, username, rank, error,
        ),
    }
}
