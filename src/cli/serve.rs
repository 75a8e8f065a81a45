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

use std::io::{BufReader, BufWriter};
use std::net::TcpListener;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering::SeqCst};
use std::sync::{Arc, Mutex};

use log::{error, info, warn};

use super::main::ServerSubcommand;
use crate::protocol::server::Server;
use crate::spool::store::MailSpool;

// Need to use this and not plain eprintln so that setup failures are
// timestamped like everything else
macro_rules! fatal {
    ($ex:ident, $($stuff:tt)*) => {{
        error!($($stuff)*);
        crate::support::sysexits::$ex.exit()
    }}
}

// Shared between the accept loop and the SIGINT handler. The handler may
// only perform async-signal-safe operations, so this is its own
// synchronisation domain, separate from the spool mutex and never held
// together with it.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);
static LISTENER_FD: AtomicI32 = AtomicI32::new(-1);

extern "C" fn handle_sigint(_: nix::libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, SeqCst);

    // Shutting the listening socket down forces the blocked accept() to
    // return so the loop can observe the flag.
    let fd = LISTENER_FD.swap(-1, SeqCst);
    if fd >= 0 {
        let _ = nix::sys::socket::shutdown(
            fd,
            nix::sys::socket::Shutdown::Both,
        );
    }
}

pub(super) fn serve(cmd: ServerSubcommand) {
    if let Err(e) = MailSpool::bootstrap(&cmd.spool_dir) {
        fatal!(
            EX_CANTCREAT,
            "Unable to create spool directory '{}': {}",
            cmd.spool_dir.display(),
            e
        );
    }

    let sigaction = nix::sys::signal::SigAction::new(
        nix::sys::signal::SigHandler::Handler(handle_sigint),
        nix::sys::signal::SaFlags::empty(),
        nix::sys::signal::SigSet::empty(),
    );
    if let Err(e) = unsafe {
        nix::sys::signal::sigaction(nix::sys::signal::Signal::SIGINT, &sigaction)
    } {
        fatal!(EX_OSERR, "Unable to register SIGINT handler: {}", e);
    }

    let listener = match TcpListener::bind(("0.0.0.0", cmd.port)) {
        Ok(listener) => listener,
        Err(e) => fatal!(
            EX_UNAVAILABLE,
            "Unable to listen on port {}: {}",
            cmd.port,
            e
        ),
    };
    LISTENER_FD.store(listener.as_raw_fd(), SeqCst);

    let spool = Arc::new(Mutex::new(MailSpool::new(cmd.spool_dir.clone())));
    info!(
        "Listening on port {}, spooling to '{}'",
        cmd.port,
        cmd.spool_dir.display(),
    );

    while !SHUTDOWN_REQUESTED.load(SeqCst) {
        let (stream_in, origin) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) => {
                if SHUTDOWN_REQUESTED.load(SeqCst) {
                    // The accept was broken on purpose by the signal handler
                    info!("Listener shut down");
                } else {
                    error!("Failed to accept connection: {}", e);
                }
                break;
            },
        };

        let stream_out = match stream_in.try_clone() {
            Ok(stream) => stream,
            Err(e) => {
                error!(
                    "{} Failed to duplicate socket handle: {}",
                    origin, e,
                );
                continue;
            },
        };

        let mut server = Server::new(
            BufReader::new(stream_in),
            BufWriter::new(stream_out),
            Arc::clone(&spool),
            origin.to_string(),
        );

        // Workers are fire-and-forget: never tracked, never joined. Any
        // still running when the process exits are abandoned along with
        // their connections.
        std::thread::spawn(move || {
            info!("{} Connection established", origin);

            match server.run() {
                Ok(()) => info!("{} Connection closed normally", origin),
                Err(e) => {
                    warn!("{} Abnormal client disconnect: {}", origin, e)
                },
            }
        });
    }

    LISTENER_FD.store(-1, SeqCst);
    info!("Mail exchange shut down");
}
