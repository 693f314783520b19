use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MemoryService, Result, notes};
use quill_store::{
	models::{Goal, GoalStatus},
	store::{Collection, FieldEq},
};

const OWN_PROGRESS_WEIGHT: f32 = 0.3;
const CHILD_PROGRESS_WEIGHT: f32 = 0.7;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateGoal {
	pub project_id: String,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub progress: f32,
	#[serde(default)]
	pub parent_goal_id: Option<Uuid>,
	#[serde(default)]
	pub blocked_by: Vec<Uuid>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UpdateGoal {
	pub title: Option<String>,
	pub description: Option<String>,
	pub status: Option<GoalStatus>,
	pub progress: Option<f32>,
	pub parent_goal_id: Option<Uuid>,
	pub blocked_by: Option<Vec<Uuid>>,
}

#[derive(Clone, Debug)]
pub struct GoalNode {
	pub goal: Goal,
	pub children: Vec<GoalNode>,
	pub completion_percent: f32,
	pub blocked: bool,
}

#[derive(Clone, Debug)]
pub struct GoalGraph {
	pub roots: Vec<GoalNode>,
}

impl GoalGraph {
	pub fn find(&self, goal_id: Uuid) -> Option<&GoalNode> {
		fn walk(nodes: &[GoalNode], goal_id: Uuid) -> Option<&GoalNode> {
			for node in nodes {
				if node.goal.goal_id == goal_id {
					return Some(node);
				}
				if let Some(found) = walk(&node.children, goal_id) {
					return Some(found);
				}
			}

			None
		}

		walk(&self.roots, goal_id)
	}
}

impl MemoryService {
	pub async fn create_goal(&self, input: CreateGoal) -> Result<Goal> {
		let title = input.title.trim().to_string();

		if title.is_empty() {
			return Err(Error::Validation { message: "Goal title must be non-empty.".to_string() });
		}
		if input.project_id.trim().is_empty() {
			return Err(Error::Validation {
				message: "Goals require a project_id.".to_string(),
			});
		}

		let goal = Goal {
			goal_id: Uuid::new_v4(),
			project_id: input.project_id.trim().to_string(),
			title,
			description: input.description,
			status: GoalStatus::Active,
			progress: input.progress.clamp(0.0, 100.0),
			parent_goal_id: input.parent_goal_id,
			blocked_by: input.blocked_by,
			created_at: OffsetDateTime::now_utc(),
			updated_at: None,
		};
		let existing = self.goals_by_id(&goal.project_id).await?;

		validate_edges(&goal, &existing)?;

		self.store.add(Collection::Goals, goal.to_document()?).await?;

		Ok(goal)
	}

	pub async fn get_goal(&self, goal_id: Uuid) -> Result<Goal> {
		let Some(document) = self.store.get(Collection::Goals, goal_id).await? else {
			return Err(Error::NotFound { message: format!("Unknown goal {goal_id}.") });
		};

		Ok(Goal::from_document(&document)?)
	}

	pub async fn update_goal(&self, goal_id: Uuid, partial: UpdateGoal) -> Result<Goal> {
		let mut goal = self.get_goal(goal_id).await?;

		if let Some(title) = partial.title {
			let trimmed = title.trim().to_string();

			if trimmed.is_empty() {
				return Err(Error::Validation {
					message: "Goal title must be non-empty.".to_string(),
				});
			}

			goal.title = trimmed;
		}
		if let Some(description) = partial.description {
			goal.description = Some(description);
		}
		if let Some(status) = partial.status {
			goal.status = status;
		}
		if let Some(progress) = partial.progress {
			goal.progress = progress.clamp(0.0, 100.0);
		}
		if let Some(parent_goal_id) = partial.parent_goal_id {
			goal.parent_goal_id = Some(parent_goal_id);
		}
		if let Some(blocked_by) = partial.blocked_by {
			goal.blocked_by = blocked_by;
		}

		let existing = self.goals_by_id(&goal.project_id).await?;

		validate_edges(&goal, &existing)?;

		goal.updated_at = Some(notes::next_timestamp(goal.updated_at));

		self.store.put(Collection::Goals, goal.to_document()?).await?;

		Ok(goal)
	}

	pub async fn delete_goal(&self, goal_id: Uuid) -> Result<()> {
		if !self.store.delete(Collection::Goals, goal_id).await? {
			return Err(Error::NotFound { message: format!("Unknown goal {goal_id}.") });
		}

		Ok(())
	}

	pub async fn list_goals(
		&self,
		project_id: &str,
		status: Option<GoalStatus>,
	) -> Result<Vec<Goal>> {
		let mut goals: Vec<Goal> = self.goals_by_id(project_id).await?.into_values().collect();

		if let Some(status) = status {
			goals.retain(|goal| goal.status == status);
		}

		goals.sort_by_key(|goal| goal.created_at);

		Ok(goals)
	}

	/// Two passes (index all nodes, attach children) plus one post-order
	/// completion pass. The write path rejects parent/blocker cycles, so
	/// the recursive completion walk needs no cycle defense.
	pub async fn build_graph(&self, project_id: &str) -> Result<GoalGraph> {
		let by_id = self.goals_by_id(project_id).await?;
		let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
		let mut roots = Vec::new();

		for goal in by_id.values() {
			match goal.parent_goal_id {
				Some(parent_id) if by_id.contains_key(&parent_id) => {
					children.entry(parent_id).or_default().push(goal.goal_id);
				},
				_ => roots.push(goal.goal_id),
			}
		}

		for ids in children.values_mut() {
			ids.sort_by_key(|id| by_id.get(id).map(|goal| goal.created_at));
		}

		roots.sort_by_key(|id| by_id.get(id).map(|goal| goal.created_at));

		let root_nodes =
			roots.into_iter().filter_map(|id| build_node(id, &by_id, &children)).collect();

		Ok(GoalGraph { roots: root_nodes })
	}

	/// Active goals that no incomplete blocker holds back, at any depth of
	/// the hierarchy.
	pub async fn actionable(&self, project_id: &str) -> Result<Vec<Goal>> {
		let by_id = self.goals_by_id(project_id).await?;
		let mut out: Vec<Goal> = by_id
			.values()
			.filter(|goal| goal.status == GoalStatus::Active && !is_blocked(goal, &by_id))
			.cloned()
			.collect();

		out.sort_by_key(|goal| goal.created_at);

		Ok(out)
	}

	/// Dependency-first ordering of everything the goal waits on,
	/// visited-set guarded so diamond dependencies appear once. The goal
	/// itself is the final element.
	pub async fn critical_path(&self, goal_id: Uuid) -> Result<Vec<Goal>> {
		let goal = self.get_goal(goal_id).await?;
		let by_id = self.goals_by_id(&goal.project_id).await?;
		let mut visited = HashSet::new();
		let mut path = Vec::new();

		visit_dependencies(goal_id, &by_id, &mut visited, &mut path);

		Ok(path)
	}

	pub(crate) async fn goals_by_id(&self, project_id: &str) -> Result<HashMap<Uuid, Goal>> {
		let filters = [FieldEq::new("project_id", project_id)];
		let documents = self.store.scan(Collection::Goals, &filters).await?;
		let mut by_id = HashMap::with_capacity(documents.len());

		for document in &documents {
			let goal = Goal::from_document(document)?;

			by_id.insert(goal.goal_id, goal);
		}

		Ok(by_id)
	}
}

pub fn is_blocked(goal: &Goal, by_id: &HashMap<Uuid, Goal>) -> bool {
	goal.blocked_by.iter().any(|blocker_id| {
		by_id
			.get(blocker_id)
			.map(|blocker| blocker.status != GoalStatus::Completed)
			.unwrap_or(false)
	})
}

fn build_node(
	goal_id: Uuid,
	by_id: &HashMap<Uuid, Goal>,
	children: &HashMap<Uuid, Vec<Uuid>>,
) -> Option<GoalNode> {
	let goal = by_id.get(&goal_id)?.clone();
	let child_nodes: Vec<GoalNode> = children
		.get(&goal_id)
		.map(|ids| ids.iter().filter_map(|id| build_node(*id, by_id, children)).collect())
		.unwrap_or_default();
	let completion_percent = if child_nodes.is_empty() {
		goal.progress
	} else {
		let child_average = child_nodes
			.iter()
			.map(|child| child.completion_percent)
			.sum::<f32>()
			/ child_nodes.len() as f32;

		(OWN_PROGRESS_WEIGHT * goal.progress + CHILD_PROGRESS_WEIGHT * child_average).round()
	};
	let blocked = is_blocked(&goal, by_id);

	Some(GoalNode { goal, children: child_nodes, completion_percent, blocked })
}

fn visit_dependencies(
	goal_id: Uuid,
	by_id: &HashMap<Uuid, Goal>,
	visited: &mut HashSet<Uuid>,
	path: &mut Vec<Goal>,
) {
	if !visited.insert(goal_id) {
		return;
	}

	let Some(goal) = by_id.get(&goal_id) else {
		return;
	};
	let mut blockers = goal.blocked_by.clone();

	blockers.sort_by_key(|id| by_id.get(id).map(|blocker| blocker.created_at));

	for blocker_id in blockers {
		visit_dependencies(blocker_id, by_id, visited, path);
	}

	path.push(goal.clone());
}

/// Rejects parent or blocker edges that would close a cycle, including
/// through edges already persisted. Run before every goal write.
fn validate_edges(goal: &Goal, existing: &HashMap<Uuid, Goal>) -> Result<()> {
	if goal.parent_goal_id == Some(goal.goal_id) || goal.blocked_by.contains(&goal.goal_id) {
		return Err(Error::Validation {
			message: "A goal cannot reference itself.".to_string(),
		});
	}

	if let Some(parent_id) = goal.parent_goal_id {
		let mut cursor = Some(parent_id);
		let mut hops = 0_usize;

		while let Some(current) = cursor {
			if current == goal.goal_id {
				return Err(Error::Validation {
					message: "Parent link would create a cycle.".to_string(),
				});
			}
			if hops > existing.len() {
				break;
			}

			cursor = existing.get(&current).and_then(|parent| parent.parent_goal_id);
			hops += 1;
		}
	}

	let mut visited = HashSet::new();
	let mut stack: Vec<Uuid> = goal.blocked_by.clone();

	while let Some(current) = stack.pop() {
		if current == goal.goal_id {
			return Err(Error::Validation {
				message: "Blocker link would create a cycle.".to_string(),
			});
		}
		if !visited.insert(current) {
			continue;
		}
		if let Some(blocker) = existing.get(&current) {
			stack.extend(blocker.blocked_by.iter().copied());
		}
	}

	Ok(())
}
