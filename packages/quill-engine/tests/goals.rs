use std::sync::Arc;

use uuid::Uuid;

use quill_engine::{CreateGoal, Error, MemoryService, UpdateGoal};
use quill_store::{memory::MemStore, models::GoalStatus};
use quill_testkit::{self as testkit, TEST_PROJECT};

fn service() -> (MemoryService, Arc<MemStore>) {
	let store = Arc::new(MemStore::new());

	(MemoryService::new(testkit::test_config(), store.clone()), store)
}

fn create_goal(title: &str, progress: f32) -> CreateGoal {
	CreateGoal {
		project_id: TEST_PROJECT.to_string(),
		title: title.to_string(),
		description: None,
		progress,
		parent_goal_id: None,
		blocked_by: Vec::new(),
	}
}

#[tokio::test]
async fn childless_goal_completion_equals_own_progress() {
	let (service, _) = service();
	let goal = service.create_goal(create_goal("draft chapter one", 35.0)).await.expect("create failed");
	let graph = service.build_graph(TEST_PROJECT).await.expect("graph failed");
	let node = graph.find(goal.goal_id).expect("node missing");

	assert_eq!(node.completion_percent, 35.0);
}

#[tokio::test]
async fn parent_completion_blends_own_and_child_progress() {
	let (service, _) = service();
	let parent = service.create_goal(create_goal("finish act one", 0.0)).await.expect("create failed");
	let mut child = create_goal("draft chapter one", 100.0);

	child.parent_goal_id = Some(parent.goal_id);

	service.create_goal(child).await.expect("create failed");

	let graph = service.build_graph(TEST_PROJECT).await.expect("graph failed");
	let node = graph.find(parent.goal_id).expect("node missing");

	// round(0.3 * 0 + 0.7 * 100) = 70.
	assert_eq!(node.completion_percent, 70.0);
	assert_eq!(node.children.len(), 1);
}

#[tokio::test]
async fn actionable_excludes_transitively_blocked_goals() {
	let (service, _) = service();
	let c = service.create_goal(create_goal("research harbors", 10.0)).await.expect("create failed");
	let mut b_input = create_goal("outline arc two", 0.0);

	b_input.blocked_by = vec![c.goal_id];

	let b = service.create_goal(b_input).await.expect("create failed");
	let mut a_input = create_goal("draft arc two", 0.0);

	a_input.blocked_by = vec![b.goal_id];

	let a = service.create_goal(a_input).await.expect("create failed");
	let actionable = service.actionable(TEST_PROJECT).await.expect("actionable failed");
	let ids: Vec<Uuid> = actionable.iter().map(|goal| goal.goal_id).collect();

	assert_eq!(ids, vec![c.goal_id]);

	service
		.update_goal(c.goal_id, UpdateGoal {
			status: Some(GoalStatus::Completed),
			..Default::default()
		})
		.await
		.expect("update failed");

	let actionable = service.actionable(TEST_PROJECT).await.expect("actionable failed");
	let ids: Vec<Uuid> = actionable.iter().map(|goal| goal.goal_id).collect();

	assert_eq!(ids, vec![b.goal_id]);
	assert!(!ids.contains(&a.goal_id));
}

#[tokio::test]
async fn critical_path_is_dependency_first_and_diamond_safe() {
	let (service, _) = service();
	let c = service.create_goal(create_goal("research harbors", 0.0)).await.expect("create failed");
	let mut b_input = create_goal("outline arc two", 0.0);

	b_input.blocked_by = vec![c.goal_id];

	let b = service.create_goal(b_input).await.expect("create failed");
	let mut d_input = create_goal("interview sailors", 0.0);

	d_input.blocked_by = vec![c.goal_id];

	let d = service.create_goal(d_input).await.expect("create failed");
	let mut a_input = create_goal("draft arc two", 0.0);

	a_input.blocked_by = vec![b.goal_id, d.goal_id];

	let a = service.create_goal(a_input).await.expect("create failed");
	let path = service.critical_path(a.goal_id).await.expect("critical path failed");
	let ids: Vec<Uuid> = path.iter().map(|goal| goal.goal_id).collect();

	// The shared dependency appears exactly once, ahead of its dependents.
	assert_eq!(ids, vec![c.goal_id, b.goal_id, d.goal_id, a.goal_id]);
}

#[tokio::test]
async fn parent_cycles_are_rejected_at_write_time() {
	let (service, _) = service();
	let a = service.create_goal(create_goal("outline arc two", 0.0)).await.expect("create failed");
	let mut b_input = create_goal("draft arc two", 0.0);

	b_input.parent_goal_id = Some(a.goal_id);

	let b = service.create_goal(b_input).await.expect("create failed");
	let err = service
		.update_goal(a.goal_id, UpdateGoal {
			parent_goal_id: Some(b.goal_id),
			..Default::default()
		})
		.await
		.expect_err("expected cycle rejection");

	assert!(matches!(err, Error::Validation { .. }), "{err}");
}

#[tokio::test]
async fn blocker_cycles_are_rejected_at_write_time() {
	let (service, _) = service();
	let a = service.create_goal(create_goal("outline arc two", 0.0)).await.expect("create failed");
	let mut b_input = create_goal("draft arc two", 0.0);

	b_input.blocked_by = vec![a.goal_id];

	let b = service.create_goal(b_input).await.expect("create failed");
	let err = service
		.update_goal(a.goal_id, UpdateGoal {
			blocked_by: Some(vec![b.goal_id]),
			..Default::default()
		})
		.await
		.expect_err("expected cycle rejection");

	assert!(matches!(err, Error::Validation { .. }), "{err}");

	let err = service
		.update_goal(a.goal_id, UpdateGoal {
			blocked_by: Some(vec![a.goal_id]),
			..Default::default()
		})
		.await
		.expect_err("expected self-reference rejection");

	assert!(matches!(err, Error::Validation { .. }), "{err}");
}

#[tokio::test]
async fn unknown_blockers_do_not_block() {
	let (service, _) = service();
	let mut input = create_goal("draft arc two", 0.0);

	input.blocked_by = vec![Uuid::new_v4()];

	let goal = service.create_goal(input).await.expect("create failed");
	let actionable = service.actionable(TEST_PROJECT).await.expect("actionable failed");

	assert!(actionable.iter().any(|candidate| candidate.goal_id == goal.goal_id));
}

#[tokio::test]
async fn goal_updates_preserve_omitted_fields() {
	let (service, _) = service();
	let goal = service.create_goal(create_goal("draft arc two", 20.0)).await.expect("create failed");
	let updated = service
		.update_goal(goal.goal_id, UpdateGoal {
			progress: Some(45.0),
			..Default::default()
		})
		.await
		.expect("update failed");

	assert_eq!(updated.title, "draft arc two");
	assert_eq!(updated.progress, 45.0);
	assert_eq!(updated.status, GoalStatus::Active);
	assert!(updated.updated_at.is_some());
}
