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

use std::path::PathBuf;

use structopt::StructOpt;

use crate::support::sysexits::*;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Run the mail exchange server.
    ///
    /// Binds the given port on all interfaces, spools messages under the
    /// given directory (created if absent), and serves each connection on
    /// its own thread until interrupted with SIGINT.
    Server(ServerSubcommand),
    /// Connect to a running server interactively.
    ///
    /// Commands are typed at the prompt; SEND additionally prompts for the
    /// message fields, with the body terminated by a line consisting of a
    /// single '.'.
    Client(ClientSubcommand),
}

#[derive(StructOpt)]
pub(super) struct ServerSubcommand {
    /// The TCP port to listen on.
    pub(super) port: u16,

    /// The directory in which messages are spooled.
    #[structopt(parse(from_os_str))]
    pub(super) spool_dir: PathBuf,
}

#[derive(StructOpt)]
pub(super) struct ClientSubcommand {
    /// The host the server runs on.
    pub(super) host: String,

    /// The port the server listens on.
    pub(super) port: u16,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        },
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        },
    });

    crate::init_simple_log(log::LevelFilter::Info);

    match cmd {
        Command::Server(cmd) => super::serve::serve(cmd),
        Command::Client(cmd) => super::client::run(cmd),
    }
}
