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

//! Wire framing for the mailbag protocol.
//!
//! A frame is a verb line followed by verb-specific field lines, each
//! terminated by `\n`. SEND additionally carries body lines up to a line
//! consisting solely of `.`, which is not part of the body. Responses are
//! `OK`/`ERR` single lines except for LIST (subject lines, then a decimal
//! count line) and READ (the stored message content, then `OK`).
//!
//! LIST replies are distinguishable only by the count line being all decimal
//! digits; a purely numeric subject is ambiguous to a naive reader. The
//! framing is kept as-is for wire compatibility.

use std::io::{self, BufRead, Read, Write};

use crate::spool::message::{Message, MAX_BODY, MAX_SUBJECT, MAX_USERNAME};
use crate::support::error::Error;

/// Longest accepted protocol line, including the newline.
const MAX_LINE: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Send(Message),
    List { username: String },
    Read { username: String, rank: u32 },
    Delete { username: String, rank: u32 },
}

/// One parsed unit of client input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Request(Request),
    /// QUIT; the worker closes the connection without a response.
    Quit,
    /// A recognisably complete but invalid frame; answered with `ERR`.
    Malformed,
    /// The peer is gone, or went away mid-frame.
    Eof,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Ok,
    Err,
    List(Vec<String>),
    Message(Message),
}

impl Response {
    pub fn write_to(&self, w: &mut (impl Write + ?Sized)) -> io::Result<()> {
        match self {
            Response::Ok => w.write_all(b"OK\n"),
            Response::Err => w.write_all(b"ERR\n"),
            Response::List(subjects) => {
                for subject in subjects {
                    writeln!(w, "{}", subject)?;
                }
                writeln!(w, "{}", subjects.len())
            },
            Response::Message(message) => {
                w.write_all(message.to_file_text().as_bytes())?;
                w.write_all(b"OK\n")
            },
        }
    }
}

enum Line {
    Text(String),
    /// An unusable line, either longer than `MAX_LINE` or not valid
    /// UTF-8. Overlong input has been drained through its newline so the
    /// stream stays frame-aligned; an undecodable line was already
    /// newline-terminated and needs no draining.
    TooLong,
    Eof,
}

fn read_line<R: BufRead>(r: &mut R) -> Result<Line, Error> {
    let mut buf = Vec::new();
    (&mut *r)
        .take(MAX_LINE as u64)
        .read_until(b'\n', &mut buf)?;

    if buf.is_empty() {
        return Ok(Line::Eof);
    }

    if !buf.ends_with(b"\n") {
        if buf.len() < MAX_LINE {
            // EOF in the middle of a line
            return Ok(Line::Eof);
        }

        loop {
            buf.clear();
            (&mut *r)
                .take(MAX_LINE as u64)
                .read_until(b'\n', &mut buf)?;
            if buf.is_empty() || buf.ends_with(b"\n") {
                return Ok(Line::TooLong);
            }
        }
    }

    buf.pop();
    if buf.ends_with(b"\r") {
        buf.pop();
    }
    Ok(String::from_utf8(buf)
        .map(Line::Text)
        .unwrap_or(Line::TooLong))
}

/// Read one frame from the client.
///
/// Malformed input never fails the connection; it is consumed through the
/// frame's natural end and reported as `Frame::Malformed` so the worker can
/// answer `ERR` and keep going. Only transport errors return `Err`.
pub fn read_frame<R: BufRead>(r: &mut R) -> Result<Frame, Error> {
    let verb = match read_line(r)? {
        Line::Eof => return Ok(Frame::Eof),
        Line::TooLong => return Ok(Frame::Malformed),
        Line::Text(s) => s,
    };

    match verb.as_str() {
        "QUIT" => Ok(Frame::Quit),
        "SEND" => read_send(r),
        "LIST" => read_list(r),
        "READ" => read_rank_command(r, false),
        "DELETE" | "DEL" => read_rank_command(r, true),
        _ => Ok(Frame::Malformed),
    }
}

fn read_send<R: BufRead>(r: &mut R) -> Result<Frame, Error> {
    let mut bad = false;
    let mut field = |r: &mut R| -> Result<Option<String>, Error> {
        match read_line(r)? {
            Line::Eof => Ok(None),
            Line::TooLong => {
                bad = true;
                Ok(Some(String::new()))
            },
            Line::Text(s) => Ok(Some(s)),
        }
    };

    let sender = match field(r)? {
        Some(s) => s,
        None => return Ok(Frame::Eof),
    };
    let receiver = match field(r)? {
        Some(s) => s,
        None => return Ok(Frame::Eof),
    };
    let subject = match field(r)? {
        Some(s) => s,
        None => return Ok(Frame::Eof),
    };

    // The body runs to the lone-dot terminator regardless of validity so
    // that a rejected SEND leaves the stream frame-aligned.
    let mut body = String::new();
    loop {
        match read_line(r)? {
            Line::Eof => return Ok(Frame::Eof),
            Line::TooLong => bad = true,
            Line::Text(line) => {
                if "." == line {
                    break;
                }
                if body.len() + line.len() + 1 > MAX_BODY {
                    bad = true;
                    continue;
                }
                if !body.is_empty() {
                    body.push('\n');
                }
                body.push_str(&line);
            },
        }
    }

    if bad
        || sender.is_empty()
        || sender.chars().count() > MAX_USERNAME
        || receiver.is_empty()
        || receiver.chars().count() > MAX_USERNAME
        || subject.is_empty()
        || subject.chars().count() > MAX_SUBJECT
    {
        return Ok(Frame::Malformed);
    }

    Ok(Frame::Request(Request::Send(Message::new(
        sender, receiver, subject, body,
    ))))
}

fn read_list<R: BufRead>(r: &mut R) -> Result<Frame, Error> {
    match read_line(r)? {
        Line::Eof => Ok(Frame::Eof),
        Line::TooLong => Ok(Frame::Malformed),
        Line::Text(username) => {
            if username.is_empty() {
                return Ok(Frame::Malformed);
            }
            Ok(Frame::Request(Request::List {
                username: truncate_chars(username, MAX_USERNAME),
            }))
        },
    }
}

fn read_rank_command<R: BufRead>(
    r: &mut R,
    delete: bool,
) -> Result<Frame, Error> {
    let username = match read_line(r)? {
        Line::Eof => return Ok(Frame::Eof),
        Line::TooLong => Line::TooLong,
        Line::Text(s) => Line::Text(s),
    };
    // The rank line is consumed even when the username was bad, to keep the
    // stream frame-aligned.
    let rank_line = match read_line(r)? {
        Line::Eof => return Ok(Frame::Eof),
        other => other,
    };

    let username = match username {
        Line::Text(s) if !s.is_empty() => truncate_chars(s, MAX_USERNAME),
        _ => return Ok(Frame::Malformed),
    };

    let rank = match rank_line {
        Line::Text(s) => match s.parse::<u32>() {
            Ok(rank) if rank >= 1 => rank,
            _ => return Ok(Frame::Malformed),
        },
        _ => return Ok(Frame::Malformed),
    };

    Ok(Frame::Request(if delete {
        Request::Delete { username, rank }
    } else {
        Request::Read { username, rank }
    }))
}

/// Truncate a username at its storage bound, as the original protocol did,
/// rather than rejecting it.
fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((ix, _)) = s.char_indices().nth(max) {
        s.truncate(ix);
    }
    s
}
