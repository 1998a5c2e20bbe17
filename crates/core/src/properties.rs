//! Property tests over random operation sequences.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use crate::achievement::{AchievementStatus, AchievementType};
use crate::authorization::{Actor, AuthorizationGuard};
use crate::coordinator::{AchievementCoordinator, CreateAchievement, UpdateAchievement};
use crate::error::CoreError;
use crate::memory::{MemoryDirectory, MemoryDocumentStore, MemoryReferenceStore, RecordingNotifier};
use crate::roles::Role;
use crate::scoring::{base_points, rank_bonus, score};
use crate::types::DbId;
use crate::workflow::VerificationWorkflow;

const STUDENT: DbId = 100;
const STUDENT_USER: DbId = 10;
const ADVISOR: DbId = 7;
const ADVISOR_USER: DbId = 20;
const STRANGER_STUDENT: DbId = 101;
const STRANGER_STUDENT_USER: DbId = 11;
const STRANGER_ADVISOR: DbId = 8;
const STRANGER_ADVISOR_USER: DbId = 21;
const ADMIN_USER: DbId = 1;

struct World {
    documents: Arc<MemoryDocumentStore>,
    references: Arc<MemoryReferenceStore>,
    coordinator: AchievementCoordinator,
    workflow: VerificationWorkflow,
}

fn world() -> World {
    let documents = Arc::new(MemoryDocumentStore::default());
    let references = Arc::new(MemoryReferenceStore::default());
    let directory = Arc::new(MemoryDirectory::default());
    directory.add_advisor(ADVISOR, ADVISOR_USER);
    directory.add_advisor(STRANGER_ADVISOR, STRANGER_ADVISOR_USER);
    directory.add_student(STUDENT, STUDENT_USER, Some(ADVISOR));
    directory.add_student(STRANGER_STUDENT, STRANGER_STUDENT_USER, Some(STRANGER_ADVISOR));
    let coordinator = AchievementCoordinator::new(
        documents.clone(),
        references.clone(),
        AuthorizationGuard::new(directory),
    );
    let workflow =
        VerificationWorkflow::new(coordinator.clone(), Arc::new(RecordingNotifier::default()));
    World {
        documents,
        references,
        coordinator,
        workflow,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn input(kind: AchievementType) -> CreateAchievement {
    CreateAchievement {
        achievement_type: kind.as_str().into(),
        title: "Generated".into(),
        details: json!({ "level": "regional", "rank": 2 })
            .as_object()
            .cloned()
            .unwrap(),
        ..CreateAchievement::default()
    }
}

#[derive(Debug, Clone)]
enum Op {
    Create,
    CreateFailing,
    Update(usize),
    Submit(usize),
    Verify(usize, bool),
    Reject(usize, bool),
    Delete(usize),
    DeleteSoftFailing(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Create),
        1 => Just(Op::CreateFailing),
        1 => (0..8usize).prop_map(Op::Update),
        2 => (0..8usize).prop_map(Op::Submit),
        2 => (0..8usize, any::<bool>()).prop_map(|(i, admin)| Op::Verify(i, admin)),
        2 => (0..8usize, any::<bool>()).prop_map(|(i, blank)| Op::Reject(i, blank)),
        1 => (0..8usize).prop_map(Op::Delete),
        1 => (0..8usize).prop_map(Op::DeleteSoftFailing),
    ]
}

fn is_valid_path(path: &[AchievementStatus]) -> bool {
    use AchievementStatus::*;
    let valid: [&[AchievementStatus]; 3] = [
        &[Draft, Submitted, Verified],
        &[Draft, Submitted, Rejected],
        &[Draft, Deleted],
    ];
    valid.iter().any(|p| p.starts_with(path))
}

async fn run(world: &World, ops: Vec<Op>) {
    let student = Actor::new(STUDENT_USER, Role::Student);
    let advisor = Actor::new(ADVISOR_USER, Role::Advisor);
    let admin = Actor::new(ADMIN_USER, Role::Admin);
    let mut ids: Vec<DbId> = Vec::new();
    let pick = |ids: &[DbId], i: usize| ids.get(i % ids.len().max(1)).copied();

    for op in ops {
        match op {
            Op::Create => {
                let record = world
                    .coordinator
                    .create(&student, STUDENT, input(AchievementType::Competition))
                    .await
                    .unwrap();
                ids.push(record.reference.reference_id);
            }
            Op::CreateFailing => {
                world.references.fail_next("insert");
                let err = world
                    .coordinator
                    .create(&student, STUDENT, input(AchievementType::Other))
                    .await
                    .unwrap_err();
                assert!(matches!(err, CoreError::ReferenceCreateFailed));
            }
            Op::Update(i) => {
                if let Some(id) = pick(&ids, i) {
                    let patch = UpdateAchievement {
                        details: json!({ "level": "national" }).as_object().cloned(),
                        ..UpdateAchievement::default()
                    };
                    let _ = world.coordinator.update(&student, id, patch).await;
                }
            }
            Op::Submit(i) => {
                if let Some(id) = pick(&ids, i) {
                    let _ = world.workflow.submit(&student, id).await;
                }
            }
            Op::Verify(i, as_admin) => {
                if let Some(id) = pick(&ids, i) {
                    let actor = if as_admin { &admin } else { &advisor };
                    let _ = world.workflow.verify(actor, id).await;
                }
            }
            Op::Reject(i, blank) => {
                if let Some(id) = pick(&ids, i) {
                    let note = if blank { "" } else { "insufficient evidence" };
                    let result = world.workflow.reject(&advisor, id, note).await;
                    if blank {
                        // Tombstoned references are gone before the note is looked at.
                        assert!(matches!(
                            result,
                            Err(CoreError::InvalidArgument(_) | CoreError::NotFound { .. })
                        ));
                    }
                }
            }
            Op::Delete(i) => {
                if let Some(id) = pick(&ids, i) {
                    let _ = world.coordinator.delete(&student, id).await;
                }
            }
            Op::DeleteSoftFailing(i) => {
                if let Some(id) = pick(&ids, i) {
                    world.documents.fail_next("soft_delete");
                    let _ = world.coordinator.delete(&student, id).await;
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stores_stay_paired_and_paths_stay_valid(ops in prop::collection::vec(op(), 1..40)) {
        let world = world();
        runtime().block_on(run(&world, ops));

        let documents = world.documents.all();
        for reference in world.references.all() {
            let document = documents
                .iter()
                .find(|d| d.document_id == reference.document_id);
            let document = document.expect("every reference has a document");
            prop_assert_eq!(document.owner_student_id, reference.student_id);

            let path: Vec<_> = world
                .references
                .all_history()
                .into_iter()
                .filter(|e| e.reference_id == reference.reference_id)
                .map(|e| e.new_status)
                .collect();
            prop_assert!(is_valid_path(&path), "invalid path {:?}", path);
            prop_assert_eq!(path.last().copied(), Some(reference.status));

            let reviewed = matches!(
                reference.status,
                AchievementStatus::Verified | AchievementStatus::Rejected
            );
            prop_assert_eq!(reference.verified_by.is_some(), reviewed);
            prop_assert_eq!(reference.verified_at.is_some(), reviewed);
            prop_assert_eq!(
                reference.rejection_note.is_some(),
                reference.status == AchievementStatus::Rejected
            );
        }
        // Failed creates were compensated.
        prop_assert_eq!(documents.len(), world.references.all().len());
    }

    #[test]
    fn strangers_never_write(stranger_is_advisor in any::<bool>(), submit_first in any::<bool>()) {
        let world = world();
        let rt = runtime();
        let owner = Actor::new(STUDENT_USER, Role::Student);
        let stranger = if stranger_is_advisor {
            Actor::new(STRANGER_ADVISOR_USER, Role::Advisor)
        } else {
            Actor::new(STRANGER_STUDENT_USER, Role::Student)
        };

        let id = rt.block_on(async {
            let record = world
                .coordinator
                .create(&owner, STUDENT, input(AchievementType::Publication))
                .await
                .unwrap();
            let id = record.reference.reference_id;
            if submit_first {
                world.workflow.submit(&owner, id).await.unwrap();
            }
            id
        });
        let before = (world.documents.writes(), world.references.writes());

        let results = rt.block_on(async {
            vec![
                world.coordinator.update(&stranger, id, UpdateAchievement::default()).await.map(|_| ()),
                world.coordinator.delete(&stranger, id).await,
                world.workflow.submit(&stranger, id).await.map(|_| ()),
                world.workflow.verify(&stranger, id).await.map(|_| ()),
                world.workflow.reject(&stranger, id, "no").await.map(|_| ()),
                world.workflow.reject(&stranger, id, "").await.map(|_| ()),
                world.coordinator.create(&stranger, STUDENT, input(AchievementType::Other)).await.map(|_| ()),
            ]
        });
        for result in results {
            prop_assert!(matches!(result, Err(CoreError::Forbidden(_))), "{:?}", result);
        }
        prop_assert_eq!((world.documents.writes(), world.references.writes()), before);
    }

    #[test]
    fn scoring_is_deterministic(
        level in prop::sample::select(vec!["international", "national", "regional", "local", "unknown"]),
        rank in 0i32..6,
        extra in "[a-z]{1,8}",
    ) {
        let mut raw = Map::new();
        raw.insert("level".into(), Value::from(level));
        raw.insert("rank".into(), Value::from(rank));
        raw.insert(format!("x_{extra}"), Value::from(extra.clone()));

        let first = score(AchievementType::Competition, &raw);
        let second = score(AchievementType::Competition, &raw);
        prop_assert_eq!(&first, &second);

        let level_bonus = match level {
            "international" => 200,
            "national" => 100,
            "regional" => 50,
            "local" => 25,
            _ => 0,
        };
        prop_assert_eq!(
            first.points,
            base_points(AchievementType::Competition) + level_bonus + rank_bonus(rank)
        );
        let extra_key = format!("x_{extra}");
        prop_assert_eq!(&first.details.custom_fields[&extra_key], &Value::from(extra));
    }
}
