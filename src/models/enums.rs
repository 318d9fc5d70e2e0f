use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
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
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
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

str_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
});

// Tags recorded in `RagContextMetadata::data_types`.
str_enum!(DataSourceTag {
    DailyMetrics => "daily_metrics",
    Summary => "summary",
    HealthEvents => "health_events",
    UploadedFiles => "uploaded_files",
});

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn message_role_round_trips_through_str() {
        assert_eq!(MessageRole::from_str("user").unwrap(), MessageRole::User);
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn unknown_value_reports_enum_name() {
        let err = DataSourceTag::from_str("vectors").unwrap_err();
        match err {
            DatabaseError::InvalidEnum { field, value } => {
                assert_eq!(field, "DataSourceTag");
                assert_eq!(value, "vectors");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn serde_uses_snake_case_tags() {
        let json = serde_json::to_string(&DataSourceTag::UploadedFiles).unwrap();
        assert_eq!(json, "\"uploaded_files\"");
        let back: MessageRole = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(back, MessageRole::Assistant);
    }
}
