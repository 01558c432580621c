use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid enum value for {field}: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde uses the same wire strings as `as_str`.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Waiting => "waiting",
    Confirmed => "confirmed",
    Upcoming => "upcoming",
    Success => "success",
    Changed => "changed",
});

str_enum!(PaymentStatus {
    Paid => "paid",
    Unpaid => "unpaid",
});

str_enum!(TaskStatus {
    NotDone => "not_done",
    Done => "done",
});

str_enum!(ReportStatus {
    Pending => "pending",
    Done => "done",
});

impl AppointmentStatus {
    /// Backend status string to a known status. Anything unrecognised
    /// (legacy `cancel`, typos) is shown as waiting.
    pub fn from_wire(raw: &str) -> Self {
        raw.trim().parse().unwrap_or_else(|_| {
            tracing::debug!(status = raw, "Unknown appointment status, treating as waiting");
            Self::Waiting
        })
    }

    /// Position along the client-visible flow. `Changed` sits outside it.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Waiting => Some(0),
            Self::Confirmed => Some(1),
            Self::Upcoming => Some(2),
            Self::Success => Some(3),
            Self::Changed => None,
        }
    }
}

impl TaskStatus {
    /// Only an explicit `done` counts as done.
    pub fn from_wire(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::NotDone)
    }
}

impl PaymentStatus {
    pub fn from_paid_flag(is_paid: bool) -> Self {
        if is_paid {
            Self::Paid
        } else {
            Self::Unpaid
        }
    }
}
