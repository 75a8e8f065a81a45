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

//! End-to-end protocol tests: a real `Server` on one end of a socketpair, a
//! line-oriented client on the other, a real spool in a temp directory.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use tempfile::TempDir;

use super::server::Server;
use crate::spool::store::MailSpool;

struct Setup {
    _spool_dir: TempDir,
    spool: Arc<Mutex<MailSpool>>,
}

fn set_up() -> Setup {
    crate::init_test_log();

    let spool_dir = TempDir::new().unwrap();
    let spool = Arc::new(Mutex::new(MailSpool::new(
        spool_dir.path().to_owned(),
    )));
    Setup {
        _spool_dir: spool_dir,
        spool,
    }
}

impl Setup {
    fn connect(&self, cxn_name: &'static str) -> Client {
        let (server_io, client_io) = UnixStream::pair().unwrap();
        let spool = Arc::clone(&self.spool);

        std::thread::spawn(move || {
            let read = BufReader::new(server_io.try_clone().unwrap());
            let mut server = Server::new(
                read,
                BufWriter::new(server_io),
                spool,
                cxn_name.to_owned(),
            );
            // EOF and QUIT are both Ok; transport errors are the test's
            // business, not the server thread's.
            let _ = server.run();
        });

        Client::new(client_io)
    }
}

struct Client {
    read: BufReader<UnixStream>,
    write: UnixStream,
}

impl Client {
    fn new(io: UnixStream) -> Self {
        Client {
            read: BufReader::new(io.try_clone().unwrap()),
            write: io,
        }
    }

    fn write_raw(&mut self, data: &str) {
        self.write.write_all(data.as_bytes()).unwrap();
    }

    fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.read.read_line(&mut line).unwrap();
        line
    }

    /// Read response lines through the terminating `OK`/`ERR` line.
    fn read_through_status(&mut self) -> String {
        let mut response = String::new();
        loop {
            let line = self.read_line();
            assert!(!line.is_empty(), "connection closed mid-response");
            response.push_str(&line);
            if "OK\n" == line || "ERR\n" == line {
                return response;
            }
        }
    }

    /// Read a LIST response the way a naive client must: subject lines
    /// until the all-decimal count line.
    fn read_list(&mut self) -> String {
        let mut response = String::new();
        loop {
            let line = self.read_line();
            assert!(!line.is_empty(), "connection closed mid-response");
            response.push_str(&line);
            let text = line.trim_end();
            if !text.is_empty()
                && text.bytes().all(|b| b.is_ascii_digit())
            {
                return response;
            }
        }
    }

    fn send(
        &mut self,
        sender: &str,
        receiver: &str,
        subject: &str,
        body: &str,
    ) -> String {
        self.write_raw(&format!(
            "SEND\n{}\n{}\n{}\n{}\n.\n",
            sender, receiver, subject, body,
        ));
        self.read_line()
    }

    fn list(&mut self, username: &str) -> String {
        self.write_raw(&format!("LIST\n{}\n", username));
        self.read_list()
    }
}

#[test]
fn full_round_trip_scenario() {
    let setup = set_up();
    let mut client = setup.connect("round_trip");

    assert_eq!("OK\n", client.send("7777", "1234", "hi", "line1\nline2"));
    assert_eq!("hi\n1\n", client.list("1234"));

    client.write_raw("READ\n1234\n1\n");
    assert_eq!(
        "Sender: 7777\nReceiver: 1234\nSubject: hi\nMessage:\n\
         line1\nline2\nOK\n",
        client.read_through_status(),
    );

    client.write_raw("DELETE\n1234\n1\n");
    assert_eq!("OK\n", client.read_line());
    client.write_raw("DELETE\n1234\n1\n");
    assert_eq!("ERR\n", client.read_line());

    assert_eq!("0\n", client.list("1234"));
}

#[test]
fn list_of_unknown_user_is_zero() {
    let setup = set_up();
    let mut client = setup.connect("unknown_user");

    assert_eq!("0\n", client.list("nobody"));
}

#[test]
fn send_grows_list_by_exactly_one() {
    let setup = set_up();
    let mut client = setup.connect("list_growth");

    for n in 1..=3 {
        assert_eq!("OK\n", client.send("7777", "4242", "subj", "body"));
        let list = client.list("4242");
        assert_eq!(n + 1, list.lines().count());
        assert_eq!(Some(format!("{}", n).as_str()), list.lines().last());
    }
}

#[test]
fn del_is_an_alias_for_delete() {
    let setup = set_up();
    let mut client = setup.connect("del_alias");

    assert_eq!("OK\n", client.send("7777", "2222", "bye", "x"));
    client.write_raw("DEL\n2222\n1\n");
    assert_eq!("OK\n", client.read_line());
    assert_eq!("0\n", client.list("2222"));
}

#[test]
fn read_misses_are_err() {
    let setup = set_up();
    let mut client = setup.connect("read_misses");

    // No mailbox at all
    client.write_raw("READ\nghost\n1\n");
    assert_eq!("ERR\n", client.read_line());

    // Mailbox exists, rank out of range
    assert_eq!("OK\n", client.send("7777", "3333", "only", "x"));
    client.write_raw("READ\n3333\n2\n");
    assert_eq!("ERR\n", client.read_line());
}

#[test]
fn malformed_frames_leave_connection_usable() {
    let setup = set_up();
    let mut client = setup.connect("malformed");

    client.write_raw("FROB\n");
    assert_eq!("ERR\n", client.read_line());

    client.write_raw("READ\n1234\nnot-a-number\n");
    assert_eq!("ERR\n", client.read_line());

    assert_eq!(
        "ERR\n",
        client.send("far-too-long-sender", "1234", "hi", "x"),
    );

    // All of the above were rejected without touching the store
    assert_eq!("0\n", client.list("1234"));
}

#[test]
fn quit_closes_without_a_response() {
    let setup = set_up();
    let mut client = setup.connect("quit");

    client.write_raw("QUIT\n");
    assert_eq!("", client.read_line());
}

#[test]
fn numeric_subject_confuses_naive_list_parse() {
    // The documented LIST framing ambiguity, pinned down so nobody "fixes"
    // it by accident.
    let setup = set_up();
    let mut client = setup.connect("ambiguity");

    assert_eq!("OK\n", client.send("7777", "6666", "42", "x"));
    // A naive reader stops at the subject line, mistaking it for the count
    assert_eq!("42\n", client.list("6666"));
    // The actual count line is still in the stream
    assert_eq!("1\n", client.read_line());
}

#[test]
fn concurrent_deliveries_to_distinct_receivers() {
    let setup = set_up();

    (0..16u32).into_par_iter().for_each(|n| {
        let mut client = setup.connect("concurrent");
        let receiver = format!("u{}", n);
        assert_eq!(
            "OK\n",
            client.send("7777", &receiver, "fan-out", "body"),
        );
    });

    let mut client = setup.connect("concurrent_check");
    for n in 0..16u32 {
        assert_eq!("fan-out\n1\n", client.list(&format!("u{}", n)));
    }
}
