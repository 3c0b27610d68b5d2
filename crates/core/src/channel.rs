//! Communication channels

use serde::{Deserialize, Serialize};

/// A channel over which one side of a conversation is carried.
///
/// A conversation can move between channels mid-flight; the set of channels
/// that have ever been active is tracked on the conversation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Voice,
    Sms,
    Whatsapp,
    Email,
}

impl Channel {
    /// All channels defined by the system.
    pub const ALL: [Channel; 4] = [
        Channel::Voice,
        Channel::Sms,
        Channel::Whatsapp,
        Channel::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Voice => "voice",
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
            Channel::Email => "email",
        }
    }

    /// Whether the channel carries spoken audio.
    pub fn is_spoken(&self) -> bool {
        matches!(self, Channel::Voice)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(Channel::Voice),
            "sms" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::Whatsapp),
            "email" => Ok(Channel::Email),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_round_trip() {
        for channel in Channel::ALL {
            let parsed: Channel = channel.as_str().parse().unwrap();
            assert_eq!(parsed, channel);
        }
    }

    #[test]
    fn test_unknown_channel_rejected() {
        assert!("carrier_pigeon".parse::<Channel>().is_err());
    }
}
