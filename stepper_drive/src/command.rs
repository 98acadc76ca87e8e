use std::{
    fmt,
    io::{self, ErrorKind, Read, Write},
};

const MAX_REPLY_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Identify,
    SetPower { axis: u8, on: bool },
    GetPower { axis: u8 },
    SetRateLimit { axis: u8, degrees_per_second: f64 },
    SetPosition { axis: u8, degrees: f64 },
    GetPosition { axis: u8 },
    Home { axis: u8, direction: i8 },
    GetHome { axis: u8 },
}

impl Command {
    /// Queries are the only commands the controller answers.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Command::Identify
                | Command::GetPower { .. }
                | Command::GetPosition { .. }
                | Command::GetHome { .. }
        )
    }

    pub fn send(&self, sender: &mut (impl Write + Read)) -> io::Result<Option<String>> {
        let line = format!("{}\n", self);
        sender.write_all(line.as_bytes())?;
        sender.flush()?;

        if !self.is_query() {
            return Ok(None);
        }

        read_reply(sender).map(Some)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Identify => write!(f, "*IDN?"),
            Command::SetPower { axis, on } => {
                write!(f, "AX{}:POW {}", axis, if *on { "ON" } else { "OFF" })
            }
            Command::GetPower { axis } => write!(f, "AX{}:POW?", axis),
            Command::SetRateLimit {
                axis,
                degrees_per_second,
            } => write!(f, "AX{}:LIM:MAX {:.2}", axis, degrees_per_second),
            Command::SetPosition { axis, degrees } => write!(f, "AX{}:POS {:.2}", axis, degrees),
            Command::GetPosition { axis } => write!(f, "AX{}:POS?", axis),
            Command::Home { axis, direction } => write!(f, "AX{}:HOME {}", axis, direction),
            Command::GetHome { axis } => write!(f, "AX{}:HOME?", axis),
        }
    }
}

/// Reads one reply line and drops every control character and blank from it.
fn read_reply(sender: &mut impl Read) -> io::Result<String> {
    let mut raw = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match sender.read(&mut byte) {
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => {
                raw.push(byte[0]);
                if raw.len() > MAX_REPLY_LEN {
                    return Err(io::Error::new(
                        ErrorKind::InvalidData,
                        "Reply line too long",
                    ));
                }
            }
            // A timed out read ends the line, like a serial readline does
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(raw
        .into_iter()
        .filter(|&b| b > b' ')
        .map(char::from)
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory link that records what was written and plays back canned replies.
    #[derive(Default)]
    pub(crate) struct ScriptedLink {
        pub written: Vec<u8>,
        pub replies: VecDeque<u8>,
    }

    impl ScriptedLink {
        pub fn with_replies(replies: &[&str]) -> Self {
            Self {
                written: Vec::new(),
                replies: replies.concat().into_bytes().into(),
            }
        }

        pub fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.written)
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Read for ScriptedLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.replies.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None => Err(io::Error::new(ErrorKind::TimedOut, "no reply")),
            }
        }
    }

    impl Write for ScriptedLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn commands_format_as_protocol_lines() {
        assert_eq!(Command::Identify.to_string(), "*IDN?");
        assert_eq!(Command::SetPower { axis: 1, on: true }.to_string(), "AX1:POW ON");
        assert_eq!(Command::SetPower { axis: 2, on: false }.to_string(), "AX2:POW OFF");
        assert_eq!(
            Command::SetRateLimit {
                axis: 1,
                degrees_per_second: 353.6777
            }
            .to_string(),
            "AX1:LIM:MAX 353.68"
        );
        assert_eq!(
            Command::SetPosition {
                axis: 3,
                degrees: -12.0
            }
            .to_string(),
            "AX3:POS -12.00"
        );
        assert_eq!(
            Command::Home {
                axis: 1,
                direction: -1
            }
            .to_string(),
            "AX1:HOME -1"
        );
    }

    #[test]
    fn every_query_ends_with_question_mark() {
        let commands = [
            Command::Identify,
            Command::SetPower { axis: 1, on: true },
            Command::GetPower { axis: 1 },
            Command::SetRateLimit {
                axis: 1,
                degrees_per_second: 1.0,
            },
            Command::SetPosition {
                axis: 1,
                degrees: 1.0,
            },
            Command::GetPosition { axis: 1 },
            Command::Home {
                axis: 1,
                direction: -1,
            },
            Command::GetHome { axis: 1 },
        ];

        for command in commands {
            assert_eq!(command.is_query(), command.to_string().ends_with('?'));
        }
    }

    #[test]
    fn set_commands_do_not_wait_for_reply() {
        let mut link = ScriptedLink::default();

        let reply = Command::SetPower { axis: 1, on: true }
            .send(&mut link)
            .unwrap();

        assert_eq!(reply, None);
        assert_eq!(link.written, b"AX1:POW ON\n");
    }

    #[test]
    fn replies_are_stripped_of_control_characters() {
        let mut link = ScriptedLink::with_replies(&["\x02Stepper Drive v1.2\r\n"]);

        let reply = Command::Identify.send(&mut link).unwrap();

        assert_eq!(reply.as_deref(), Some("StepperDrivev1.2"));
    }

    #[test]
    fn silent_controller_gives_empty_reply() {
        let mut link = ScriptedLink::default();

        let reply = Command::GetPosition { axis: 1 }.send(&mut link).unwrap();

        assert_eq!(reply.as_deref(), Some(""));
    }

    #[test]
    fn runaway_reply_is_rejected() {
        let long = "x".repeat(MAX_REPLY_LEN + 10);
        let mut link = ScriptedLink::with_replies(&[long.as_str()]);

        let err = Command::Identify.send(&mut link).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
