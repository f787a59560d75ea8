//! Strongly-typed identifiers
//!
//! Every stored row is keyed by a UUID. Newtypes keep a batch id from being
//! passed where a claim id is expected. New ids are minted as UUIDv7 so that
//! rows sort by creation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mints a new time-ordered identifier
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Prefix used by the `Display` form, e.g. `SMB-<uuid>`
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        /// Accepts both the prefixed display form and a bare UUID
        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Uuid::parse_str(raw).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(
    /// A claim, owned by the claims module
    ClaimId,
    "CLM"
);
define_id!(
    /// The claim administrator a batch is assigned to
    ClaimAdminId,
    "CADM"
);
define_id!(SamplingBatchId, "SMB");
define_id!(
    /// Link between a batch and one of its claims
    AssignmentId,
    "SMA"
);
define_id!(TaskId, "TSK");
define_id!(TaskGroupId, "TSKG");
define_id!(UserId, "USR");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_display() {
        let id = SamplingBatchId::new_v7();
        assert!(id.to_string().starts_with("SMB-"));
    }

    #[test]
    fn test_display_parses_back() {
        let original = ClaimId::new_v7();
        let parsed: ClaimId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_other_prefix_is_rejected() {
        let batch = SamplingBatchId::new_v7().to_string();
        assert!(batch.parse::<ClaimId>().is_err());
    }
}
