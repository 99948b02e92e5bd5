use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ResultExt, ensure};

use super::error::{EmptyHandleSnafu, InvalidHandleSnafu, ModelError, ModelResult};

// Relay handles are object pointers printed as hex; they carry no meaning beyond identity.
macro_rules! define_relay_handle {
    ($name:ident, $handle_type:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Parses the relay's textual form, with or without a `0x` prefix.
            pub fn parse(raw: &str) -> ModelResult<Self> {
                let trimmed = raw.trim();
                let digits = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                ensure!(
                    !digits.is_empty(),
                    EmptyHandleSnafu {
                        stage: "parse-relay-handle",
                        handle_type: $handle_type,
                    }
                );

                let parsed = u64::from_str_radix(digits, 16).context(InvalidHandleSnafu {
                    stage: "parse-relay-handle",
                    handle_type: $handle_type,
                    raw: raw.to_string(),
                })?;
                Ok(Self(parsed))
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "0x{:x}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(raw: &str) -> ModelResult<Self> {
                Self::parse(raw)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

define_relay_handle!(BufferHandle, "buffer-handle");
define_relay_handle!(LineHandle, "line-handle");
define_relay_handle!(NickHandle, "nick-handle");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_and_bare_hex() {
        assert_eq!(
            BufferHandle::parse("0x55d2a1c0").unwrap(),
            BufferHandle::new(0x55d2_a1c0)
        );
        assert_eq!(LineHandle::parse("ff").unwrap(), LineHandle::new(0xff));
        assert_eq!(NickHandle::parse(" 0XAb ").unwrap(), NickHandle::new(0xab));
    }

    #[test]
    fn displays_as_lowercase_prefixed_hex() {
        assert_eq!(BufferHandle::new(0xBEEF).to_string(), "0xbeef");
    }

    #[test]
    fn rejects_empty_and_non_hex_text() {
        assert!(matches!(
            BufferHandle::parse("0x"),
            Err(ModelError::EmptyHandle { .. })
        ));
        let error = LineHandle::parse("0xzz").unwrap_err();
        assert!(matches!(
            error,
            ModelError::InvalidHandle {
                handle_type: "line-handle",
                ..
            }
        ));
    }
}
