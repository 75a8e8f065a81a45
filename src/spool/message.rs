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

use crate::support::error::Error;

/// Maximum length of a username, in characters.
pub const MAX_USERNAME: usize = 8;
/// Maximum length of a subject, in characters.
pub const MAX_SUBJECT: usize = 80;
/// Maximum size of a message body, in bytes.
pub const MAX_BODY: usize = 4096;

/// One logical message as submitted by a sender.
///
/// A message has no durable identity of its own. Its externally visible
/// "number" is a rank, the 1-based position of its file within the current
/// enumeration of the receiver's mailbox directory, recomputed from scratch
/// on every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub receiver: String,
    pub subject: String,
    /// Body lines joined with `\n`, without the terminating `.` line the
    /// submission side uses and without a trailing newline.
    pub body: String,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Message {
            sender: sender.into(),
            receiver: receiver.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Check every field against the protocol size bounds.
    pub fn check_bounds(&self) -> Result<(), Error> {
        if self.sender.chars().count() > MAX_USERNAME
            || self.receiver.chars().count() > MAX_USERNAME
            || self.subject.chars().count() > MAX_SUBJECT
            || self.subject.contains('\n')
            || self.body.len() > MAX_BODY
        {
            return Err(Error::FieldTooLarge);
        }

        Ok(())
    }

    /// The canonical on-disk serialisation.
    ///
    /// This is also exactly what READ streams back to the client, so it is
    /// part of the wire compatibility surface and must not change.
    pub fn to_file_text(&self) -> String {
        format!(
            "Sender: {}\nReceiver: {}\nSubject: {}\nMessage:\n{}\n",
            self.sender, self.receiver, self.subject, self.body,
        )
    }

    /// Inverse of `to_file_text`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut lines = text.split('\n');

        let sender = header(lines.next(), "Sender: ")?;
        let receiver = header(lines.next(), "Receiver: ")?;
        let subject = header(lines.next(), "Subject: ")?;
        if Some("Message:") != lines.next() {
            return Err(Error::CorruptMessage);
        }

        // The serialisation ends with a newline after the body, so a
        // well-formed file yields at least two fragments here (an empty
        // body is "\n\n" after the header, not "\n").
        let rest: Vec<&str> = lines.collect();
        let body = match rest.split_last() {
            Some((&"", init)) if !init.is_empty() => init.join("\n"),
            _ => return Err(Error::CorruptMessage),
        };

        Ok(Message {
            sender,
            receiver,
            subject,
            body,
        })
    }
}

fn header(line: Option<&str>, prefix: &str) -> Result<String, Error> {
    line.and_then(|l| l.strip_prefix(prefix))
        .map(str::to_owned)
        .ok_or(Error::CorruptMessage)
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Message {
        Message::new("11111111", "1234", "hi", "line1\nline2")
    }

    #[test]
    fn file_text_format() {
        assert_eq!(
            "Sender: 11111111\nReceiver: 1234\nSubject: hi\n\
             Message:\nline1\nline2\n",
            sample().to_file_text(),
        );

        assert_eq!(
            "Sender: a\nReceiver: b\nSubject: s\nMessage:\n\n",
            Message::new("a", "b", "s", "").to_file_text(),
        );
    }

    #[test]
    fn parse_round_trip() {
        for message in vec![
            sample(),
            Message::new("a", "b", "s", ""),
            Message::new("a", "b", "s", "one line"),
            Message::new("a", "b", "s", "\n\nsparse\n"),
        ] {
            assert_eq!(
                message,
                Message::parse(&message.to_file_text()).unwrap(),
            );
        }
    }

    #[test]
    fn truncated_file_is_not_an_empty_body() {
        // A file cut off right after the header is corrupt; only the
        // canonical "\n\n" ending denotes an empty body.
        assert_matches!(
            Err(Error::CorruptMessage),
            Message::parse("Sender: a\nReceiver: b\nSubject: s\nMessage:\n")
        );
        assert_eq!(
            "",
            Message::parse("Sender: a\nReceiver: b\nSubject: s\nMessage:\n\n")
                .unwrap()
                .body,
        );
    }

    #[test]
    fn parse_rejects_malformed_files() {
        for text in &[
            "",
            "Sender: a\n",
            "Sender: a\nReceiver: b\nSubject: s\n",
            "Sender: a\nReceiver: b\nSubject: s\nMessage:\n",
            "Sender: a\nReceiver: b\nSubject: s\nbody\n",
            "Receiver: b\nSender: a\nSubject: s\nMessage:\nbody\n",
        ] {
            assert_matches!(Err(Error::CorruptMessage), Message::parse(text));
        }
    }

    #[test]
    fn bounds_checking() {
        assert!(sample().check_bounds().is_ok());
        assert_matches!(
            Err(Error::FieldTooLarge),
            Message::new("123456789", "b", "s", "x").check_bounds()
        );
        assert_matches!(
            Err(Error::FieldTooLarge),
            Message::new("a", "123456789", "s", "x").check_bounds()
        );
        assert_matches!(
            Err(Error::FieldTooLarge),
            Message::new("a", "b", "s".repeat(81), "x").check_bounds()
        );
        assert_matches!(
            Err(Error::FieldTooLarge),
            Message::new("a", "b", "s", "x".repeat(MAX_BODY + 1))
                .check_bounds()
        );
        // Bounds are characters, not bytes, for the text fields
        assert!(Message::new("åäöåäöåä", "b", "s", "x")
            .check_bounds()
            .is_ok());
    }
}
