//! Task economy: members create real-world tasks, completing them pays the
//! shared pet wallet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::engine::{earn, ownership_mut, require, EngineError, EngineResult, PetEngine};
use crate::api::{PetId, TaskId, UserId};
use crate::models::ledger::TransactionKind;
use crate::models::pet::{MetricDelta, MetricsView, PetRecord};
use crate::models::social::{NotificationKind, Priority};
use crate::models::task::{Recurrence, Task, TaskCategory, TaskDifficulty, TaskStatus};
use crate::realtime::MessageType;
use crate::services::metrics;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: TaskCategory,
    #[serde(default)]
    pub difficulty: TaskDifficulty,
    #[serde(default)]
    pub currency_reward: Option<i64>,
    #[serde(default)]
    pub experience_reward: Option<u64>,
    #[serde(default)]
    pub metric_impacts: MetricDelta,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignees: Vec<UserId>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub task: Task,
    pub currency_earned: i64,
    pub experience_earned: u64,
    pub streak: u32,
    pub new_metrics: MetricsView,
    pub version: u64,
}

/// Streak value after a completion at `now`.
///
/// The streak continues when the previous completion is within two periods,
/// otherwise it restarts at 1.
pub fn next_streak(task: &Task, now: DateTime<Utc>) -> u32 {
    match (task.recurrence.period(), task.last_completed_at) {
        (Some(period), Some(last)) if now - last <= period * 2 => task.streak_count + 1,
        _ => 1,
    }
}

fn task_mut(pet: &mut PetRecord, task_id: TaskId) -> EngineResult<&mut Task> {
    pet.task_mut(task_id)
        .ok_or_else(|| EngineError::NotFound("Task".to_string()))
}

impl PetEngine {
    pub async fn create_task(
        &self,
        user_id: UserId,
        pet_id: PetId,
        request: NewTaskRequest,
        expected_version: Option<u64>,
    ) -> EngineResult<Task> {
        let title = request.title.trim().to_string();
        if title.is_empty() || title.chars().count() > 200 {
            return Err(EngineError::Validation(
                "Task title must be between 1 and 200 characters".to_string(),
            ));
        }
        let reward = request
            .currency_reward
            .unwrap_or_else(|| self.config.completion_bonus(request.difficulty));
        if reward < 0 || reward > self.config.max_task_reward {
            return Err(EngineError::Validation(format!(
                "Currency reward must be between 0 and {}",
                self.config.max_task_reward
            )));
        }
        let xp = request
            .experience_reward
            .unwrap_or(self.config.default_task_experience);
        if xp > self.config.max_task_experience {
            return Err(EngineError::Validation(format!(
                "Experience reward must be at most {}",
                self.config.max_task_experience
            )));
        }

        let task_id = self.repo.allocate_task_id().await?;
        let committed = self
            .mutate_pet(pet_id, user_id, expected_version, |pet| {
                require(pet, user_id, |p| p.can_create_tasks, "create tasks for")?;
                if let Some(stranger) = request.assignees.iter().find(|u| !pet.is_member(**u)) {
                    return Err(EngineError::Validation(format!(
                        "User {stranger} is not an owner of this pet"
                    )));
                }
                let now = Utc::now();
                let task = Task {
                    id: task_id,
                    title: title.clone(),
                    description: request.description.clone(),
                    category: request.category,
                    difficulty: request.difficulty,
                    status: TaskStatus::Active,
                    created_by: user_id,
                    currency_reward: reward,
                    experience_reward: xp,
                    metric_impacts: request.metric_impacts.clone(),
                    recurrence: request.recurrence,
                    due_date: request.due_date,
                    assignees: request.assignees.clone(),
                    streak_count: 0,
                    max_streak: 0,
                    last_completed_at: None,
                    total_completions: 0,
                    priority: request.priority,
                    tags: request.tags.clone(),
                    created_at: now,
                    updated_at: None,
                };
                pet.tasks.push(task.clone());
                Ok(task)
            })
            .await?;
        let pet = &committed.pet;
        let task = committed.value.clone();
        info!(pet_id = %pet_id, task_id = %task.id, "Task created");

        self.record_activity(
            pet,
            user_id,
            "task_created",
            serde_json::json!({ "task_id": task.id, "title": task.title }),
            MetricDelta::default(),
        )
        .await;
        self.broadcast(pet, MessageType::TaskCreated, serde_json::json!(task));
        self.publish(&committed);
        for assignee in task.assignees.iter().filter(|u| **u != user_id) {
            self.notify(
                *assignee,
                NotificationKind::TaskAssigned,
                "New task assigned".to_string(),
                format!("You were assigned \"{}\" for {}", task.title, pet.name),
                Priority::Normal,
                Some(pet_id),
            )
            .await;
        }
        Ok(task)
    }

    /// Replace the assignee list of an active task.
    pub async fn assign_task(
        &self,
        user_id: UserId,
        pet_id: PetId,
        task_id: TaskId,
        assignees: Vec<UserId>,
        expected_version: Option<u64>,
    ) -> EngineResult<Task> {
        let committed = self
            .mutate_pet(pet_id, user_id, expected_version, |pet| {
                require(pet, user_id, |p| p.can_create_tasks, "assign tasks for")?;
                if let Some(stranger) = assignees.iter().find(|u| !pet.is_member(**u)) {
                    return Err(EngineError::Validation(format!(
                        "User {stranger} is not an owner of this pet"
                    )));
                }
                let task = task_mut(pet, task_id)?;
                if !task.is_active() {
                    return Err(EngineError::Conflict("Task is no longer active".to_string()));
                }
                let before = std::mem::replace(&mut task.assignees, assignees.clone());
                task.assignees.sort();
                task.assignees.dedup();
                task.updated_at = Some(Utc::now());
                let added: Vec<UserId> = task
                    .assignees
                    .iter()
                    .copied()
                    .filter(|u| !before.contains(u))
                    .collect();
                Ok((task.clone(), added))
            })
            .await?;
        let pet = &committed.pet;
        let (task, added) = committed.value.clone();

        self.broadcast(pet, MessageType::TaskAssigned, serde_json::json!(task));
        self.publish(&committed);
        for assignee in added.into_iter().filter(|u| *u != user_id) {
            self.notify(
                assignee,
                NotificationKind::TaskAssigned,
                "New task assigned".to_string(),
                format!("You were assigned \"{}\" for {}", task.title, pet.name),
                Priority::Normal,
                Some(pet_id),
            )
            .await;
        }
        Ok(task)
    }

    pub async fn complete_task(
        &self,
        user_id: UserId,
        pet_id: PetId,
        task_id: TaskId,
        expected_version: Option<u64>,
    ) -> EngineResult<CompletionOutcome> {
        let committed = self
            .mutate_pet(pet_id, user_id, expected_version, |pet| {
                let now = Utc::now();
                let task = task_mut(pet, task_id)?;
                if !task.is_active() {
                    return Err(EngineError::Conflict("Task is no longer active".to_string()));
                }
                if !task.can_be_completed_by(user_id) {
                    return Err(EngineError::Forbidden(
                        "Only assignees can complete this task".to_string(),
                    ));
                }

                let streak = next_streak(task, now);
                task.streak_count = streak;
                task.max_streak = task.max_streak.max(streak);
                task.last_completed_at = Some(now);
                task.total_completions += 1;
                task.updated_at = Some(now);
                match task.recurrence.period() {
                    Some(period) => {
                        // A due date at the end of the calendar cannot advance.
                        let base = task.due_date.unwrap_or(now);
                        task.due_date = base.checked_add_signed(period);
                    }
                    None => task.status = TaskStatus::Completed,
                }
                let task = task.clone();

                earn(pet, task.currency_reward);
                pet.gain_experience(task.experience_reward);
                let applied = metrics::apply_delta(&mut pet.metrics, &task.metric_impacts);
                ownership_mut(pet, user_id)?.stats.total_tasks_completed += 1;
                Ok((task, applied))
            })
            .await?;
        let pet = &committed.pet;
        let (task, applied) = committed.value.clone();
        info!(
            pet_id = %pet_id,
            task_id = %task_id,
            user_id = %user_id,
            reward = task.currency_reward,
            "Task completed"
        );

        self.record_transaction(
            pet,
            user_id,
            task.currency_reward,
            TransactionKind::TaskReward,
            format!("Completed task: {}", task.title),
            Some(task.id),
            None,
        )
        .await;
        self.record_snapshot(pet, "task_completed", Some(task.title.clone())).await;
        self.record_activity(
            pet,
            user_id,
            "task_completed",
            serde_json::json!({
                "task_id": task.id,
                "reward": task.currency_reward,
                "streak": task.streak_count,
            }),
            applied,
        )
        .await;
        self.broadcast(
            pet,
            MessageType::TaskCompleted,
            serde_json::json!({ "task": task, "completed_by": user_id }),
        );
        self.publish(&committed);
        for member in pet.member_ids().into_iter().filter(|u| *u != user_id) {
            self.notify(
                member,
                NotificationKind::TaskCompleted,
                "Task completed".to_string(),
                format!("\"{}\" earned {} coins for {}", task.title, task.currency_reward, pet.name),
                Priority::Low,
                Some(pet_id),
            )
            .await;
        }
        self.evaluate_achievements(user_id, pet_id).await;

        Ok(CompletionOutcome {
            currency_earned: task.currency_reward,
            experience_earned: task.experience_reward,
            streak: task.streak_count,
            task,
            new_metrics: pet.metrics.view(),
            version: pet.version,
        })
    }

    /// Cancel a task. Only its creator or the pet owner may do so.
    pub async fn cancel_task(
        &self,
        user_id: UserId,
        pet_id: PetId,
        task_id: TaskId,
        expected_version: Option<u64>,
    ) -> EngineResult<Task> {
        let committed = self
            .mutate_pet(pet_id, user_id, expected_version, |pet| {
                let is_owner = pet.owner_id() == Some(user_id);
                let task = task_mut(pet, task_id)?;
                if task.created_by != user_id && !is_owner {
                    return Err(EngineError::Forbidden(
                        "Only the task creator or the pet owner can cancel a task".to_string(),
                    ));
                }
                if !task.is_active() {
                    return Err(EngineError::Conflict("Task is no longer active".to_string()));
                }
                task.status = TaskStatus::Cancelled;
                task.updated_at = Some(Utc::now());
                Ok(task.clone())
            })
            .await?;
        self.broadcast(&committed.pet, MessageType::TaskCancelled, serde_json::json!(committed.value));
        self.publish(&committed);
        Ok(committed.value)
    }

    /// Tasks of a pet, highest priority first, then newest.
    pub async fn list_tasks(
        &self,
        user_id: UserId,
        pet_id: PetId,
        status: Option<TaskStatus>,
    ) -> EngineResult<Vec<Task>> {
        let pet = self.load_for_member(pet_id, user_id).await?;
        let mut tasks: Vec<Task> = pet
            .tasks
            .into_iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect();
        tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then(b.created_at.cmp(&a.created_at)));
        Ok(tasks)
    }

    /// Expire overdue non-recurring tasks on every pet. Returns how many
    /// tasks changed.
    pub async fn expire_tasks(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        let mut expired = 0;
        for pet_id in self.repo.list_pet_ids().await? {
            let has_overdue = match self.repo.get_pet(pet_id).await {
                Ok(pet) => pet.tasks.iter().any(|t| t.is_overdue(now)),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            if !has_overdue {
                continue;
            }
            let committed = self
                .mutate_pet_as_system(pet_id, |pet| {
                    let mut ids = Vec::new();
                    for task in pet.tasks.iter_mut().filter(|t| t.is_overdue(now)) {
                        task.status = TaskStatus::Expired;
                        task.updated_at = Some(now);
                        ids.push(task.id);
                    }
                    Ok(ids)
                })
                .await;
            let committed = match committed {
                Ok(committed) => committed,
                Err(e) => {
                    warn!(pet_id = %pet_id, error = %e, "Task expiry failed");
                    continue;
                }
            };
            debug!(pet_id = %pet_id, count = committed.value.len(), "Tasks expired");
            expired += committed.value.len();
            self.publish(&committed);
        }
        Ok(expired)
    }
}
