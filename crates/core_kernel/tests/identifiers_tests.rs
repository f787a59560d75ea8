//! Unit tests for the Identifiers module
//!
//! Tests cover identifier creation, parsing, conversion, and display
//! formatting for the claims and sampling identifiers.

use core_kernel::{
    ClaimId, ClaimAdminId, SamplingBatchId, AssignmentId,
    TaskId, TaskGroupId, UserId,
};
use uuid::Uuid;

mod sampling_batch_id_tests {
    use super::*;

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = SamplingBatchId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = SamplingBatchId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = SamplingBatchId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(SamplingBatchId::prefix(), "SMB");
    }

    #[test]
    fn test_from_str_with_prefix() {
        let original = SamplingBatchId::new_v7();
        let parsed: SamplingBatchId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_str_without_prefix() {
        let uuid = Uuid::new_v4();
        let parsed: SamplingBatchId = uuid.to_string().parse().unwrap();
        assert_eq!(*parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_json_serialization_is_transparent() {
        let id = SamplingBatchId::new_v7();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let deserialized: SamplingBatchId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}

mod claim_id_tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert_eq!(ClaimId::prefix(), "CLM");
    }

    #[test]
    fn test_display_format() {
        let id = ClaimId::new_v7();
        assert!(id.to_string().starts_with("CLM-"));
    }

    #[test]
    fn test_invalid_string_fails_to_parse() {
        let result: Result<ClaimId, _> = "CLM-not-a-uuid".parse();
        assert!(result.is_err());
    }
}

mod cross_type_tests {
    use super::*;

    #[test]
    fn test_different_id_types_are_distinct() {
        let uuid = Uuid::new_v4();
        let batch_id = SamplingBatchId::from_uuid(uuid);
        let claim_id = ClaimId::from_uuid(uuid);

        assert_eq!(*batch_id.as_uuid(), *claim_id.as_uuid());
        assert_ne!(batch_id.to_string(), claim_id.to_string());
    }

    #[test]
    fn test_id_prefixes_are_unique() {
        let prefixes = vec![
            ClaimId::prefix(),
            ClaimAdminId::prefix(),
            SamplingBatchId::prefix(),
            AssignmentId::prefix(),
            TaskId::prefix(),
            TaskGroupId::prefix(),
            UserId::prefix(),
        ];

        let mut unique_prefixes: Vec<&str> = prefixes.clone();
        unique_prefixes.sort();
        unique_prefixes.dedup();

        assert_eq!(
            prefixes.len(),
            unique_prefixes.len(),
            "All identifier prefixes should be unique"
        );
    }
}

mod edge_cases {
    use super::*;

    #[test]
    fn test_nil_uuid() {
        let id = TaskId::from_uuid(Uuid::nil());
        assert!(id.as_uuid().is_nil());
    }

    #[test]
    fn test_ids_order_by_creation() {
        let mut ids: Vec<AssignmentId> = (0..5)
            .map(|_| {
                std::thread::sleep(std::time::Duration::from_millis(1));
                AssignmentId::new_v7()
            })
            .collect();
        let created = ids.clone();
        ids.sort();
        assert_eq!(ids, created);
    }
}

mod parsing_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_bare_and_prefixed_forms_agree(bits in any::<u128>()) {
            let uuid = Uuid::from_u128(bits);
            let bare: TaskGroupId = uuid.to_string().parse().unwrap();
            let prefixed: TaskGroupId = format!("TSKG-{uuid}").parse().unwrap();
            prop_assert_eq!(bare, prefixed);
            prop_assert_eq!(*bare.as_uuid(), uuid);
        }
    }
}
