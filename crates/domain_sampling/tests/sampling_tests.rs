//! Sampling lifecycle tests against the in-memory adapter

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ClaimAdminId, ClaimId, SamplingBatchId, SystemPeriod, TaskGroupId, TaskId};

use domain_sampling::ports::mock::InMemorySamplingStore;
use domain_sampling::{
    AssignmentStatus, Claim, ClaimDetail, ClaimFilter, ClaimSamplingService, ClaimStatus,
    ClaimQueryPort, CreateBatchRequest, DetailKind, DetailStatus, ExtrapolationStrategy,
    ReviewStatus, SamplingConfig, SamplingError, SamplingStore, TaskResolution, TaskStatus,
};
use domain_sampling::task::{COMPLETE_BUSINESS_EVENT, RESOLVE_ACTION_EVENT};

// ============================================================================
// Helpers
// ============================================================================

fn claim(code: &str, price: Decimal) -> Claim {
    Claim {
        id: ClaimId::new_v7(),
        code: code.to_string(),
        status: ClaimStatus::Checked,
        review_status: ReviewStatus::Idle,
        health_facility_id: Some(1),
        insuree_id: Some(1),
        admin_id: None,
        care_type: None,
        visit_type: None,
        date_from: NaiveDate::from_ymd_opt(2024, 1, 13).unwrap(),
        date_to: None,
        date_claimed: NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
        claimed: price,
        approved: None,
        attachments_count: 0,
        restored_from: None,
        items: vec![ClaimDetail {
            id: 1,
            kind: DetailKind::Item,
            code: "0001".to_string(),
            status: DetailStatus::Passed,
            qty_provided: Decimal::ONE,
            qty_approved: None,
            price_asked: price,
            price_adjusted: None,
            price_approved: None,
            rejection_reason: None,
        }],
        services: vec![],
        system_period: SystemPeriod::current(),
    }
}

fn claims(count: usize) -> Vec<Claim> {
    (0..count).map(|i| claim(&format!("code_ABV{i}"), dec!(100))).collect()
}

fn service(store: &Arc<InMemorySamplingStore>, strategy: ExtrapolationStrategy) -> ClaimSamplingService {
    let config = SamplingConfig {
        extrapolation_strategy: strategy,
        random_seed: Some(7),
        ..SamplingConfig::default()
    };
    ClaimSamplingService::new(store.clone(), store.clone(), store.clone(), config)
}

fn request(percentage: i64, candidates: &[Claim]) -> CreateBatchRequest {
    CreateBatchRequest {
        percentage,
        candidates: candidates.iter().map(|c| c.id).collect(),
        ..Default::default()
    }
}

async fn setup(
    count: usize,
    strategy: ExtrapolationStrategy,
) -> (Arc<InMemorySamplingStore>, ClaimSamplingService, Vec<Claim>) {
    let claims = claims(count);
    let store = Arc::new(InMemorySamplingStore::with_claims(claims.clone()).await);
    let service = service(&store, strategy);
    (store, service, claims)
}

/// Records a delivered review: accepted at the adjusted price, or rejected
async fn deliver(store: &InMemorySamplingStore, claim_id: ClaimId, accept: bool) {
    store
        .update_claim(claim_id, move |claim| {
            claim.review_status = ReviewStatus::Delivered;
            if accept {
                let price = claim.items[0].adjusted_price();
                claim.items[0].price_approved = Some(price);
            } else {
                claim.status = ClaimStatus::Rejected;
            }
        })
        .await
        .unwrap();
}

/// Creates a batch at 20% over ten claims and delivers one rejected and one accepted review
async fn reviewed_batch(
    strategy: ExtrapolationStrategy,
) -> (Arc<InMemorySamplingStore>, ClaimSamplingService, SamplingBatchId) {
    let (store, service, claims) = setup(10, strategy).await;
    let batch = service.create(request(20, &claims)).await.unwrap();

    let idle: Vec<ClaimId> = store
        .assignments(batch.id)
        .await
        .into_iter()
        .filter(|a| a.status == AssignmentStatus::Idle)
        .map(|a| a.claim_id)
        .collect();
    deliver(&store, idle[0], false).await;
    deliver(&store, idle[1], true).await;

    (store, service, batch.id)
}

async fn skipped_claims(store: &InMemorySamplingStore, batch_id: SamplingBatchId) -> Vec<Claim> {
    let mut result = Vec::new();
    for assignment in store.assignments(batch_id).await {
        if assignment.status == AssignmentStatus::Skipped {
            result.push(store.claim(assignment.claim_id).await.unwrap());
        }
    }
    result
}

// ============================================================================
// Batch Creation
// ============================================================================

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_ten_claims_at_twenty_percent() {
        let (store, service, claims) = setup(10, ExtrapolationStrategy::Deduction).await;

        let batch = service.create(request(20, &claims)).await.unwrap();

        assert!(!batch.is_completed);
        assert!(!batch.is_applied);
        assert_eq!(batch.batch_no, Some(1));

        let assignments = store.assignments(batch.id).await;
        assert_eq!(assignments.len(), 10);
        let idle: Vec<_> = assignments.iter().filter(|a| a.status == AssignmentStatus::Idle).collect();
        let skipped = assignments.iter().filter(|a| a.status == AssignmentStatus::Skipped).count();
        assert_eq!(idle.len(), 2);
        assert_eq!(skipped, 8);

        for assignment in &assignments {
            let claim = store.claim(assignment.claim_id).await.unwrap();
            let expected = if assignment.status == AssignmentStatus::Idle {
                ReviewStatus::Selected
            } else {
                ReviewStatus::Idle
            };
            assert_eq!(claim.review_status, expected);
        }
    }

    #[tokio::test]
    async fn test_review_task_created_with_claim_pairs() {
        let (store, service, claims) = setup(3, ExtrapolationStrategy::Deduction).await;

        let batch = service.create(request(50, &claims)).await.unwrap();

        let tasks = store.tasks().await;
        assert_eq!(tasks.len(), 1);
        let (task, payload) = &tasks[0];
        assert_eq!(task.status, TaskStatus::Received);
        assert_eq!(payload.entity_id, batch.id);
        assert_eq!(payload.source, "claim_sampling");
        assert_eq!(payload.business_event, COMPLETE_BUSINESS_EVENT);
        let pairs = payload.data["claims"].as_array().unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0][0], "code_ABV0");
    }

    #[tokio::test]
    async fn test_task_group_accepts_task() {
        let (store, service, claims) = setup(3, ExtrapolationStrategy::Deduction).await;
        let request = CreateBatchRequest {
            task_group: Some(TaskGroupId::new_v7()),
            assigned_to: Some(ClaimAdminId::new_v7()),
            ..request(50, &claims)
        };

        let batch = service.create(request).await.unwrap();

        assert!(batch.assigned_to.is_some());
        assert_eq!(store.tasks().await[0].0.status, TaskStatus::Accepted);
    }

    #[tokio::test]
    async fn test_already_assigned_claims_are_excluded() {
        let (store, service, claims) = setup(10, ExtrapolationStrategy::Deduction).await;

        let first = service.create(request(20, &claims[..5])).await.unwrap();
        let second = service.create(request(20, &claims)).await.unwrap();

        let first_claims: Vec<ClaimId> =
            store.assignments(first.id).await.iter().map(|a| a.claim_id).collect();
        let second_claims: Vec<ClaimId> =
            store.assignments(second.id).await.iter().map(|a| a.claim_id).collect();
        assert_eq!(second_claims.len(), 5);
        assert!(second_claims.iter().all(|id| !first_claims.contains(id)));
    }

    #[tokio::test]
    async fn test_no_eligible_claims() {
        let (store, service, claims) = setup(4, ExtrapolationStrategy::Deduction).await;
        service.create(request(50, &claims)).await.unwrap();

        let result = service.create(request(50, &claims)).await;

        assert!(matches!(result, Err(SamplingError::NoEligibleClaims)));
        assert_eq!(store.batch_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_candidates_are_not_eligible() {
        let (_store, service, _claims) = setup(2, ExtrapolationStrategy::Deduction).await;
        let request = CreateBatchRequest {
            percentage: 50,
            candidates: vec![ClaimId::new_v7()],
            ..Default::default()
        };

        let result = service.create(request).await;

        assert!(matches!(result, Err(SamplingError::NoEligibleClaims)));
    }

    #[tokio::test]
    async fn test_percentage_out_of_range_writes_nothing() {
        let (store, service, claims) = setup(5, ExtrapolationStrategy::Deduction).await;

        for percentage in [0, 101, -1] {
            let error = service.create(request(percentage, &claims)).await.unwrap_err();
            assert!(matches!(error, SamplingError::PercentageOutOfRange(p) if p == percentage));
            assert!(error.is_validation());
        }
        assert_eq!(store.batch_count().await, 0);
    }

    #[tokio::test]
    async fn test_task_failure_rolls_back_everything() {
        let (store, service, claims) = setup(10, ExtrapolationStrategy::Deduction).await;
        store.fail_task_creation(true).await;

        let result = service.create(request(20, &claims)).await;

        assert!(matches!(result, Err(SamplingError::Port(_))));
        assert_eq!(store.batch_count().await, 0);
        assert!(store.tasks().await.is_empty());
        for claim in &claims {
            assert_eq!(store.claim(claim.id).await.unwrap().review_status, ReviewStatus::Idle);
        }

        // The same claims remain available once the task service recovers
        store.fail_task_creation(false).await;
        assert!(service.create(request(20, &claims)).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_from_filter() {
        let mut claims = claims(6);
        for claim in claims.iter_mut().take(2) {
            claim.status = ClaimStatus::Entered;
        }
        let store = Arc::new(InMemorySamplingStore::with_claims(claims.clone()).await);
        let service = service(&store, ExtrapolationStrategy::Deduction);
        let filter = ClaimFilter::from_json(serde_json::json!({ "status": 4 })).unwrap();

        let batch = service
            .create_from_filter(&filter, CreateBatchRequest { percentage: 25, ..Default::default() })
            .await
            .unwrap();

        let assigned: Vec<ClaimId> =
            store.assignments(batch.id).await.iter().map(|a| a.claim_id).collect();
        assert_eq!(assigned.len(), 4);
        assert!(!assigned.contains(&claims[0].id));
        assert!(!assigned.contains(&claims[1].id));
    }
}

// ============================================================================
// Summary and Task Callbacks
// ============================================================================

mod review_tests {
    use super::*;

    fn resolution(batch_id: SamplingBatchId, status: TaskStatus, action: Option<&str>) -> TaskResolution {
        TaskResolution {
            task_id: TaskId::new_v7(),
            entity_id: batch_id,
            status,
            business_event: None,
            executor_action_event: action.map(str::to_string),
            user: None,
        }
    }

    #[tokio::test]
    async fn test_sampling_summary() {
        let (_store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;

        let summary = service.prepare_sampling_summary(batch_id).await.unwrap();

        assert_eq!(summary.rejected_from_review.len(), 1);
        assert_eq!(summary.reviewed_delivered.len(), 2);
        assert_eq!(summary.total, 2);
        assert!(summary.rejected_from_review.is_subset(&summary.reviewed_delivered));
    }

    #[tokio::test]
    async fn test_resolution_completes_batch() {
        let (store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;

        let batch = service
            .on_task_resolved(&resolution(batch_id, TaskStatus::Accepted, Some(RESOLVE_ACTION_EVENT)))
            .await
            .unwrap()
            .unwrap();

        assert!(batch.is_completed);
        assert_eq!(batch.computed_value["total"], 2);
        assert_eq!(batch.computed_value["rejected_from_review"], 1);
        assert_eq!(batch.computed_value["deductible_ratio"], "0.5");

        let reviewed = store
            .assignments(batch_id)
            .await
            .iter()
            .filter(|a| a.status == AssignmentStatus::Reviewed)
            .count();
        assert_eq!(reviewed, 2);
        assert!(service.get_batch(batch_id).await.unwrap().is_completed);
    }

    #[tokio::test]
    async fn test_partial_review_keeps_batch_open() {
        let (store, service, claims) = setup(10, ExtrapolationStrategy::Deduction).await;
        let batch = service.create(request(20, &claims)).await.unwrap();
        let idle = store
            .assignments(batch.id)
            .await
            .into_iter()
            .find(|a| a.status == AssignmentStatus::Idle)
            .unwrap();
        deliver(&store, idle.claim_id, true).await;

        let updated = service
            .on_task_resolved(&resolution(batch.id, TaskStatus::Accepted, Some(RESOLVE_ACTION_EVENT)))
            .await
            .unwrap()
            .unwrap();

        assert!(!updated.is_completed);
        let statuses: Vec<_> = store.assignments(batch.id).await.iter().map(|a| a.status).collect();
        assert_eq!(statuses.iter().filter(|s| **s == AssignmentStatus::Reviewed).count(), 1);
        assert_eq!(statuses.iter().filter(|s| **s == AssignmentStatus::Idle).count(), 1);
    }

    #[tokio::test]
    async fn test_unrelated_resolution_ignored() {
        let (_store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;

        let rejected = service
            .on_task_resolved(&resolution(batch_id, TaskStatus::Failed, Some(RESOLVE_ACTION_EVENT)))
            .await
            .unwrap();
        let other_action = service
            .on_task_resolved(&resolution(batch_id, TaskStatus::Accepted, Some("other_action")))
            .await
            .unwrap();

        assert!(rejected.is_none());
        assert!(other_action.is_none());
        assert!(!service.get_batch(batch_id).await.unwrap().is_completed);
    }

    #[tokio::test]
    async fn test_update_batch_versions_batch() {
        let (store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;
        let admin = ClaimAdminId::new_v7();

        let batch = service.update_batch(batch_id, Some(admin)).await.unwrap();

        assert_eq!(batch.assigned_to, Some(admin));
        assert_eq!(batch.batch_no, Some(1));
        let history = store.batch_history(batch_id).await;
        assert_eq!(history.len(), 1);
        assert!(history[0].assigned_to.is_none());
    }

    #[tokio::test]
    async fn test_unknown_batch() {
        let (_store, service, _claims) = setup(1, ExtrapolationStrategy::Deduction).await;
        let missing = SamplingBatchId::new_v7();

        assert!(matches!(service.get_batch(missing).await, Err(SamplingError::BatchNotFound(_))));
        assert!(matches!(
            service.sampling_batch_claims(missing).await,
            Err(SamplingError::BatchNotFound(_))
        ));
        assert!(matches!(
            service.extrapolate_results(missing, None).await,
            Err(SamplingError::BatchNotFound(_))
        ));
        assert!(matches!(
            service.update_batch(missing, None).await,
            Err(SamplingError::BatchNotFound(_))
        ));
    }
}

// ============================================================================
// Extrapolation
// ============================================================================

mod extrapolation_tests {
    use super::*;

    #[tokio::test]
    async fn test_rejection_strategy_splits_by_ratio() {
        let (store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Rejection).await;

        let errors = service.extrapolate_results(batch_id, None).await.unwrap();
        assert!(errors.is_empty());

        let skipped = skipped_claims(&store, batch_id).await;
        assert_eq!(skipped.len(), 8);
        assert!(skipped.iter().all(|c| c.review_status == ReviewStatus::Bypassed));

        let rejected: Vec<_> = skipped.iter().filter(|c| c.status == ClaimStatus::Rejected).collect();
        let accepted: Vec<_> = skipped.iter().filter(|c| c.status != ClaimStatus::Rejected).collect();
        assert_eq!(rejected.len(), 4);
        assert_eq!(accepted.len(), 4);
        assert!(rejected.iter().all(|c| c.approved == Some(Decimal::ZERO)));
        assert!(accepted.iter().all(|c| c.approved == Some(dec!(100))));
        assert!(accepted.iter().all(|c| c.status == ClaimStatus::Processed));

        let batch = service.get_batch(batch_id).await.unwrap();
        assert!(batch.is_applied);
        assert_eq!(batch.assigned_value["ratio"], "0.5");
        assert_eq!(batch.assigned_value["targets"], 8);
        assert_eq!(batch.assigned_value["rejected"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_deduction_strategy_scales_amounts() {
        let (store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;

        let errors = service.extrapolate_results(batch_id, None).await.unwrap();
        assert!(errors.is_empty());

        let skipped = skipped_claims(&store, batch_id).await;
        assert_eq!(skipped.len(), 8);
        for claim in &skipped {
            assert_eq!(claim.review_status, ReviewStatus::Bypassed);
            assert_eq!(claim.approved, Some(dec!(50)));
            assert_eq!(claim.items[0].price_approved, Some(dec!(50)));
            assert_eq!(claim.status, ClaimStatus::Processed);
        }
    }

    #[tokio::test]
    async fn test_reviewed_claims_keep_their_review() {
        let (store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;

        service.extrapolate_results(batch_id, None).await.unwrap();

        for assignment in store.assignments(batch_id).await {
            if assignment.status == AssignmentStatus::Idle {
                let claim = store.claim(assignment.claim_id).await.unwrap();
                assert_eq!(claim.review_status, ReviewStatus::Delivered);
            }
        }
    }

    #[tokio::test]
    async fn test_no_delivered_review_fails_without_mutation() {
        let (store, service, claims) = setup(10, ExtrapolationStrategy::Deduction).await;
        let batch = service.create(request(20, &claims)).await.unwrap();
        let before = skipped_claims(&store, batch.id).await;

        let result = service.extrapolate_results(batch.id, None).await;

        assert!(matches!(result, Err(SamplingError::DeductibleRatioUndefined { .. })));
        assert_eq!(skipped_claims(&store, batch.id).await, before);
        assert!(!service.get_batch(batch.id).await.unwrap().is_applied);
    }

    #[tokio::test]
    async fn test_dedrem_failures_are_collected() {
        let (store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;
        let failing = skipped_claims(&store, batch_id).await[0].clone();
        store.fail_dedrem_for(failing.id).await;

        let errors = service.extrapolate_results(batch_id, None).await.unwrap();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].claim_id, failing.id);
        assert_eq!(errors[0].claim_code, failing.code);

        // The monetary update committed regardless
        let stored = store.claim(failing.id).await.unwrap();
        assert_eq!(stored.approved, Some(dec!(50)));
        assert_eq!(stored.review_status, ReviewStatus::Bypassed);
    }

    #[tokio::test]
    async fn test_completion_callback_extrapolates() {
        let (store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;
        let completion = TaskResolution {
            task_id: TaskId::new_v7(),
            entity_id: batch_id,
            status: TaskStatus::Completed,
            business_event: Some(COMPLETE_BUSINESS_EVENT.to_string()),
            executor_action_event: None,
            user: None,
        };

        let errors = service.on_task_completed(&completion).await.unwrap();

        assert!(errors.is_empty());
        assert!(skipped_claims(&store, batch_id)
            .await
            .iter()
            .all(|c| c.review_status == ReviewStatus::Bypassed));
    }

    #[tokio::test]
    async fn test_second_extrapolation_is_refused() {
        let (store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Rejection).await;
        service.extrapolate_results(batch_id, None).await.unwrap();
        let applied = service.get_batch(batch_id).await.unwrap();
        let claims_after_first = skipped_claims(&store, batch_id).await;

        let result = service.extrapolate_results(batch_id, None).await;

        assert!(matches!(result, Err(SamplingError::BatchAlreadyApplied(_))));
        let batch = service.get_batch(batch_id).await.unwrap();
        assert_eq!(batch.assigned_value, applied.assigned_value);
        assert_eq!(batch.assigned_value["approved"].as_array().unwrap().len(), 4);
        assert_eq!(batch.assigned_value["rejected"].as_array().unwrap().len(), 4);
        assert_eq!(store.batch_history(batch_id).await.len(), 1);
        assert_eq!(skipped_claims(&store, batch_id).await, claims_after_first);
    }

    #[tokio::test]
    async fn test_completion_after_manual_extrapolation_is_refused() {
        let (_store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;
        service.extrapolate_results(batch_id, None).await.unwrap();
        let completion = TaskResolution {
            task_id: TaskId::new_v7(),
            entity_id: batch_id,
            status: TaskStatus::Completed,
            business_event: Some(COMPLETE_BUSINESS_EVENT.to_string()),
            executor_action_event: None,
            user: None,
        };

        let error = service.on_task_completed(&completion).await.unwrap_err();

        assert!(matches!(error, SamplingError::BatchAlreadyApplied(_)));
        assert!(error.is_conflict());
    }

    #[tokio::test]
    async fn test_reject_bucket_is_rejected_by_the_status_service() {
        let (store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Rejection).await;
        let targets = skipped_claims(&store, batch_id).await;
        for claim in &targets {
            store.fail_dedrem_for(claim.id).await;
        }

        let errors = service.extrapolate_results(batch_id, None).await.unwrap();

        assert_eq!(errors.len(), 8);
        let rejection_failures = errors
            .iter()
            .filter(|e| e.detail.as_deref() == Some("rejection_failed"))
            .count();
        assert_eq!(rejection_failures, 4);

        // The extrapolation transaction only bypassed the review of the reject bucket
        let batch = service.get_batch(batch_id).await.unwrap();
        for id in batch.assigned_value["rejected"].as_array().unwrap() {
            let id: ClaimId = id.as_str().unwrap().parse().unwrap();
            let claim = store.claim(id).await.unwrap();
            assert_eq!(claim.review_status, ReviewStatus::Bypassed);
            assert_eq!(claim.status, ClaimStatus::Checked);
            assert_eq!(claim.approved, None);
        }
    }

    #[tokio::test]
    async fn test_batch_claims_listing() {
        let (_store, service, batch_id) = reviewed_batch(ExtrapolationStrategy::Deduction).await;

        let entries = service.sampling_batch_claims(batch_id).await.unwrap();

        assert_eq!(entries.len(), 10);
        assert!(entries.iter().all(|e| e.assignment.batch_id == batch_id));
    }
}

// ============================================================================
// Concurrency and Candidate Stability
// ============================================================================

mod concurrency_tests {
    use std::collections::HashSet;

    use super::*;

    async fn assigned_claims(store: &InMemorySamplingStore, batches: &[SamplingBatchId]) -> Vec<ClaimId> {
        let mut ids = Vec::new();
        for batch_id in batches {
            ids.extend(store.assignments(*batch_id).await.iter().map(|a| a.claim_id));
        }
        ids
    }

    #[tokio::test]
    async fn test_concurrent_creates_over_same_claims() {
        let (store, service, claims) = setup(10, ExtrapolationStrategy::Deduction).await;

        let (first, second) = tokio::join!(
            service.create(request(20, &claims)),
            service.create(request(20, &claims)),
        );

        let (winner, loser) = match (first, second) {
            (Ok(batch), Err(error)) | (Err(error), Ok(batch)) => (batch, error),
            other => panic!("expected exactly one batch, got {other:?}"),
        };
        assert!(matches!(loser, SamplingError::NoEligibleClaims) || loser.is_conflict());
        assert_eq!(store.batch_count().await, 1);
        assert_eq!(assigned_claims(&store, &[winner.id]).await.len(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_creates_over_overlapping_claims() {
        let (store, service, claims) = setup(10, ExtrapolationStrategy::Deduction).await;

        let (first, second) = tokio::join!(
            service.create(request(50, &claims[..6])),
            service.create(request(50, &claims[4..])),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        let assigned = assigned_claims(&store, &[first.id, second.id]).await;
        let distinct: HashSet<ClaimId> = assigned.iter().copied().collect();
        assert_eq!(assigned.len(), distinct.len());
        assert_eq!(distinct.len(), 10);
    }

    #[tokio::test]
    async fn test_candidate_search_is_stable_without_writes() {
        let (store, service, claims) = setup(10, ExtrapolationStrategy::Deduction).await;
        service.create(request(20, &claims[..4])).await.unwrap();
        let filter = ClaimFilter::default();

        let found_first = store.find_claims(&filter, None).await.unwrap();
        let found_second = store.find_claims(&filter, None).await.unwrap();
        assert_eq!(found_first, found_second);

        let ids: Vec<ClaimId> = found_first.iter().map(|c| c.id).collect();
        let mut tx = store.begin().await.unwrap();
        let assigned_first = tx.assigned_claim_ids(&ids).await.unwrap();
        let assigned_second = tx.assigned_claim_ids(&ids).await.unwrap();
        drop(tx);

        assert_eq!(assigned_first, assigned_second);
        assert_eq!(assigned_first.len(), 4);
    }
}
