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

//! The interactive console client.
//!
//! A thin presentation wrapper over the wire protocol: prompt for a
//! command, prompt for its fields, assemble the frame, render the reply.
//! All protocol knowledge lives in the prompts and in how many reply lines
//! each command expects; the server is the authority on everything else.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;

use super::main::ClientSubcommand;
use crate::support::sysexits::*;

pub(super) fn run(cmd: ClientSubcommand) {
    let server = match TcpStream::connect((cmd.host.as_str(), cmd.port)) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Unable to connect to {}:{}: {}", cmd.host, cmd.port, e);
            EX_UNAVAILABLE.exit()
        },
    };
    let reply = match server.try_clone() {
        Ok(stream) => BufReader::new(stream),
        Err(e) => {
            eprintln!("Unable to duplicate socket handle: {}", e);
            EX_UNAVAILABLE.exit()
        },
    };

    let mut session = Session { server, reply };

    println!(
        "Connected to the server. \
         Available commands: SEND, LIST, READ, DELETE, QUIT"
    );

    loop {
        let command = match prompt(">> ") {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            },
        };

        let result = match command.trim() {
            "SEND" => session.send(),
            "LIST" => session.list(),
            "READ" => session.read_message(),
            "DELETE" | "DEL" => session.delete(),
            "QUIT" => {
                let _ = session.server.write_all(b"QUIT\n");
                break;
            },
            "" => continue,
            _ => {
                println!(
                    "Unknown command. \
                     Available commands: SEND, LIST, READ, DELETE, QUIT"
                );
                continue;
            },
        };

        match result {
            Ok(true) => (),
            // Stdin closed mid-command
            Ok(false) => break,
            Err(e) => {
                eprintln!("Connection error: {}", e);
                break;
            },
        }
    }
}

struct Session {
    server: TcpStream,
    reply: BufReader<TcpStream>,
}

impl Session {
    fn send(&mut self) -> io::Result<bool> {
        let sender = match prompt("Sender (max. 8 chars): ")? {
            Some(line) => line,
            None => return Ok(false),
        };
        let receiver = match prompt("Receiver (max. 8 chars): ")? {
            Some(line) => line,
            None => return Ok(false),
        };
        let subject = match prompt("Subject (max. 80 chars): ")? {
            Some(line) => line,
            None => return Ok(false),
        };

        println!("Message (end with a single dot '.'):");
        let mut frame =
            format!("SEND\n{}\n{}\n{}\n", sender, receiver, subject);
        loop {
            let line = match prompt("")? {
                Some(line) => line,
                None => return Ok(false),
            };
            let terminator = "." == line;
            frame.push_str(&line);
            frame.push('\n');
            if terminator {
                break;
            }
        }

        self.server.write_all(frame.as_bytes())?;
        println!("{}", self.read_reply_line()?);
        Ok(true)
    }

    fn list(&mut self) -> io::Result<bool> {
        let username = match prompt("Username (max. 8 chars): ")? {
            Some(line) => line,
            None => return Ok(false),
        };
        self.server
            .write_all(format!("LIST\n{}\n", username).as_bytes())?;

        // Subject lines until the all-decimal count line. A purely numeric
        // subject trips this up; that ambiguity is part of the protocol.
        let mut total = 0;
        loop {
            let line = self.read_reply_line()?;
            if !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
            {
                println!("Count of messages for the user: {}", line);
                break;
            }
            println!("{}", line);
            total += 1;
        }
        if 0 == total {
            println!("No messages found for the user.");
        }
        Ok(true)
    }

    fn read_message(&mut self) -> io::Result<bool> {
        match self.rank_command("READ")? {
            Some(()) => (),
            None => return Ok(false),
        }

        // Message text until the status line. A body line reading exactly
        // "OK" or "ERR" ends the rendering early; like LIST's numeric
        // subjects, the ambiguity is part of the protocol.
        loop {
            let line = self.read_reply_line()?;
            println!("{}", line);
            if "OK" == line || "ERR" == line {
                return Ok(true);
            }
        }
    }

    fn delete(&mut self) -> io::Result<bool> {
        match self.rank_command("DELETE")? {
            Some(()) => (),
            None => return Ok(false),
        }

        println!("{}", self.read_reply_line()?);
        Ok(true)
    }

    fn rank_command(&mut self, verb: &str) -> io::Result<Option<()>> {
        let username = match prompt("Username (max. 8 chars): ")? {
            Some(line) => line,
            None => return Ok(None),
        };
        let number = match prompt("Message number: ")? {
            Some(line) => line,
            None => return Ok(None),
        };

        self.server.write_all(
            format!("{}\n{}\n{}\n", verb, username, number).as_bytes(),
        )?;
        Ok(Some(()))
    }

    fn read_reply_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if 0 == self.reply.read_line(&mut line)? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Server closed the connection",
            ));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

/// Prompt on stdout and read one line from stdin; `None` on EOF.
fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if 0 == io::stdin().read_line(&mut line)? {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}
