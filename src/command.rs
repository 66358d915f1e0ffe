/// Single-character operator commands. Case matters: lower case steps,
/// upper case goes straight to full speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AccelerateForward,
    FullForward,
    AccelerateReverse,
    FullReverse,
    TurnLeft,
    FullLeft,
    TurnRight,
    FullRight,
    Stop,
    Brake,
    SteerCenter,
    /// Keeps the current motion alive without changing it.
    Maintain,
    Help,
}

/// Result of decoding one received character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    /// Line endings and padding sent by terminal clients.
    Ignored,
    Unrecognized(char),
}

pub const HELP: &[&str] = &[
    "Movement commands:",
    "------------------",
    "Stop - q",
    "Brake - b",
    "Forward - w",
    "Reverse - s",
    "Left - a",
    "Right - d",
    "Full forward - W",
    "Full reverse - S",
    "Full left - A",
    "Full right - D",
    "Steer center - c",
    "Maintain - m",
    "Help - h",
];

impl Command {
    pub fn parse(c: char) -> Input {
        let command = match c {
            'w' => Command::AccelerateForward,
            'W' => Command::FullForward,
            's' => Command::AccelerateReverse,
            'S' => Command::FullReverse,
            'a' => Command::TurnLeft,
            'A' => Command::FullLeft,
            'd' => Command::TurnRight,
            'D' => Command::FullRight,
            'q' => Command::Stop,
            'b' => Command::Brake,
            'c' => Command::SteerCenter,
            'm' => Command::Maintain,
            'h' => Command::Help,
            c if c.is_whitespace() || c == '\0' => return Input::Ignored,
            c => return Input::Unrecognized(c),
        };
        Input::Command(command)
    }

    /// Acknowledgement sent back to the operator. Help answers with [`HELP`] instead.
    pub fn ack(self) -> Option<&'static str> {
        let ack = match self {
            Command::AccelerateForward => "Accelerating forward.",
            Command::FullForward => "Full speed ahead!",
            Command::AccelerateReverse => "Accelerating backward.",
            Command::FullReverse => "Full speed reverse!",
            Command::TurnLeft => "Turning left.",
            Command::FullLeft => "Full left turn.",
            Command::TurnRight => "Turning right.",
            Command::FullRight => "Full right turn.",
            Command::Stop => "Full stop",
            Command::Brake => "Braking.",
            Command::SteerCenter => "Steering center.",
            Command::Maintain => "Maintaining course.",
            Command::Help => return None,
        };
        Some(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Command::parse('w'), Input::Command(Command::AccelerateForward));
        assert_eq!(Command::parse('W'), Input::Command(Command::FullForward));
        assert_eq!(Command::parse('a'), Input::Command(Command::TurnLeft));
        assert_eq!(Command::parse('A'), Input::Command(Command::FullLeft));
        assert_eq!(Command::parse('Q'), Input::Unrecognized('Q'));
    }

    #[test]
    fn test_parse_ignores_line_endings() {
        for c in ['\r', '\n', ' ', '\t', '\0'] {
            assert_eq!(Command::parse(c), Input::Ignored);
        }
    }

    #[test]
    fn test_parse_unrecognized() {
        assert_eq!(Command::parse('x'), Input::Unrecognized('x'));
        assert_eq!(Command::parse('7'), Input::Unrecognized('7'));
    }

    #[test]
    fn test_ack() {
        assert_eq!(Command::Stop.ack(), Some("Full stop"));
        assert_eq!(Command::Help.ack(), None);
    }

    #[test]
    fn test_help_lists_every_key() {
        let keys = "qbwsadWSADcmh";
        for key in keys.chars() {
            assert!(matches!(Command::parse(key), Input::Command(_)));
            assert!(
                HELP.iter().any(|line| line.ends_with(&format!("- {key}"))),
                "help misses {key}"
            );
        }
    }
}
