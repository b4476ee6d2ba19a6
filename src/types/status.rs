use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! status_enum {
    ($name:ident, $default:ident, [$($variant:ident => $text:literal),+ $(,)?]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(
                        "invalid {} status: '{}'",
                        stringify!($name),
                        s
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum!(LeadStatus, New, [
    New => "NEW",
    Contacted => "CONTACTED",
    Qualified => "QUALIFIED",
    Proposal => "PROPOSAL",
    Won => "WON",
    Lost => "LOST",
]);

status_enum!(IdeaStatus, Backlog, [
    Backlog => "BACKLOG",
    InProgress => "IN_PROGRESS",
    Parked => "PARKED",
    Done => "DONE",
]);

status_enum!(ProjectStatus, Active, [
    Active => "ACTIVE",
    OnHold => "ON_HOLD",
    Done => "DONE",
    Archived => "ARCHIVED",
]);

status_enum!(TaskStatus, Todo, [
    Todo => "TODO",
    Doing => "DOING",
    Blocked => "BLOCKED",
    Done => "DONE",
]);

/// The action recorded against a history entry. Any status is reachable
/// from any other; there is no transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Status,
    Upload,
}

impl ActivityAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Status => "STATUS",
            Self::Upload => "UPLOAD",
        }
    }
}

impl FromStr for ActivityAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "STATUS" => Ok(Self::Status),
            "UPLOAD" => Ok(Self::Upload),
            other => Err(format!("invalid activity action: '{other}'")),
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for s in [
            LeadStatus::New,
            LeadStatus::Contacted,
            LeadStatus::Qualified,
            LeadStatus::Proposal,
            LeadStatus::Won,
            LeadStatus::Lost,
        ] {
            assert_eq!(s.as_str().parse::<LeadStatus>().unwrap(), s);
        }
        assert_eq!("ON_HOLD".parse::<ProjectStatus>().unwrap(), ProjectStatus::OnHold);
        assert_eq!("IN_PROGRESS".parse::<IdeaStatus>().unwrap(), IdeaStatus::InProgress);
    }

    #[test]
    fn test_rejects_unknown() {
        assert!("SHIPPED".parse::<LeadStatus>().is_err());
        assert!("SOMEDAY".parse::<IdeaStatus>().is_err());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("won".parse::<LeadStatus>().unwrap(), LeadStatus::Won);
        assert_eq!("todo".parse::<TaskStatus>().unwrap(), TaskStatus::Todo);
    }

    #[test]
    fn test_serde_uses_screaming_snake() {
        let json = serde_json::to_string(&LeadStatus::Won).unwrap();
        assert_eq!(json, "\"WON\"");
        let parsed: IdeaStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(parsed, IdeaStatus::InProgress);
    }
}
