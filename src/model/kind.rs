use crate::error::WitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primitive semantics of a field type.
///
/// `Enum` and `List` are structural kinds; every other kind is simple and may
/// serve as an enum base type or a list component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    String,
    Integer,
    Float,
    #[serde(rename = "bool")]
    Boolean,
    Instant,
    Url,
    User,
    Iteration,
    Area,
    Label,
    #[serde(rename = "boardcolumn")]
    BoardColumn,
    Markup,
    Codebase,
    Enum,
    List,
}

impl Kind {
    /// Every kind, simple kinds first.
    pub const ALL: [Self; 15] = [
        Self::String,
        Self::Integer,
        Self::Float,
        Self::Boolean,
        Self::Instant,
        Self::Url,
        Self::User,
        Self::Iteration,
        Self::Area,
        Self::Label,
        Self::BoardColumn,
        Self::Markup,
        Self::Codebase,
        Self::Enum,
        Self::List,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "bool",
            Self::Instant => "instant",
            Self::Url => "url",
            Self::User => "user",
            Self::Iteration => "iteration",
            Self::Area => "area",
            Self::Label => "label",
            Self::BoardColumn => "boardcolumn",
            Self::Markup => "markup",
            Self::Codebase => "codebase",
            Self::Enum => "enum",
            Self::List => "list",
        }
    }

    /// True for every kind except `Enum` and `List`.
    #[must_use]
    pub const fn is_simple(&self) -> bool {
        !matches!(self, Self::Enum | Self::List)
    }

    /// Kinds whose values are plain strings in every representation.
    #[must_use]
    pub const fn is_string_like(&self) -> bool {
        matches!(
            self,
            Self::String
                | Self::User
                | Self::Iteration
                | Self::Area
                | Self::Label
                | Self::BoardColumn
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Kind {
    type Err = WitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "boolean" => Ok(Self::Boolean),
            "board_column" | "board-column" => Ok(Self::BoardColumn),
            other => Self::ALL
                .iter()
                .find(|kind| kind.as_str() == other)
                .copied()
                .ok_or_else(|| WitError::UnknownKind {
                    kind: s.to_string(),
                }),
        }
    }
}
