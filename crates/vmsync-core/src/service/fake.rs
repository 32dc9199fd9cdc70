#![allow(clippy::unwrap_used)]
// In-memory configuration service for engine tests.
//
// Items live in a path-keyed map; a folder's children are the items whose
// path is exactly one `Type[id]` segment below it. Saves and tasks can be
// scripted to fail, and every call is recorded for assertions.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vmsync_api::FieldError;

use super::ConfigService;
use crate::error::CoreError;
use crate::model::{
    Entity, EntityKind, RemoteTask, TaskOperation, TaskRequest, TaskState, child_folder,
};

#[derive(Debug, Clone, Copy)]
pub(crate) enum SaveFailure {
    Validation,
    Systemic,
}

/// Scripted lifecycle for the next submitted task.
#[derive(Debug, Clone)]
pub(crate) struct TaskPlan {
    /// State reported at submission, then one per poll. The last repeats.
    states: Vec<TaskState>,
    error_text: Option<String>,
    result_path: Option<String>,
}

impl TaskPlan {
    pub(crate) fn succeed_after(polls: usize, result_path: Option<&str>) -> Self {
        let mut states = vec![TaskState::InProgress; polls];
        states.push(TaskState::Success);
        Self {
            states,
            error_text: None,
            result_path: result_path.map(str::to_owned),
        }
    }

    pub(crate) fn fail(message: &str) -> Self {
        Self {
            states: vec![TaskState::InProgress, TaskState::Error],
            error_text: Some(message.to_owned()),
            result_path: None,
        }
    }

    pub(crate) fn never_finish() -> Self {
        Self {
            states: vec![TaskState::Pending, TaskState::InProgress],
            error_text: None,
            result_path: None,
        }
    }

    fn ends_in_success(&self) -> bool {
        self.states.last() == Some(&TaskState::Success)
    }
}

struct RunningTask {
    plan: TaskPlan,
    cursor: usize,
}

impl RunningTask {
    fn snapshot(&self, path: &str) -> RemoteTask {
        let idx = self.cursor.min(self.plan.states.len() - 1);
        let state = self.plan.states[idx];
        RemoteTask {
            path: path.to_owned(),
            state,
            progress: if state.is_terminal() { 100 } else { 50 },
            error_text: (state == TaskState::Error)
                .then(|| self.plan.error_text.clone())
                .flatten(),
            result_path: (state == TaskState::Success)
                .then(|| self.plan.result_path.clone())
                .flatten(),
        }
    }
}

#[derive(Default)]
struct FakeState {
    items: BTreeMap<String, Entity>,
    invoke_results: HashMap<(String, String), BTreeMap<String, String>>,
    invoke_calls: Vec<(String, String)>,
    save_failures: HashMap<String, SaveFailure>,
    saved: Vec<Entity>,
    child_calls: HashMap<String, usize>,
    task_plans: VecDeque<TaskPlan>,
    tasks: HashMap<String, RunningTask>,
    submitted: Vec<TaskRequest>,
    next_task: usize,
    group_members: Vec<(String, String)>,
}

#[derive(Default)]
pub(crate) struct FakeService {
    state: Mutex<FakeState>,
    child_delay: Option<Duration>,
}

impl FakeService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Delay every child listing, so concurrent callers overlap.
    pub(crate) fn with_child_delay(mut self, delay: Duration) -> Self {
        self.child_delay = Some(delay);
        self
    }

    pub(crate) fn insert(&self, entity: Entity) {
        self.state
            .lock()
            .unwrap()
            .items
            .insert(entity.path.clone(), entity);
    }

    pub(crate) fn item(&self, path: &str) -> Option<Entity> {
        self.state.lock().unwrap().items.get(path).cloned()
    }

    pub(crate) fn saved(&self) -> Vec<Entity> {
        self.state.lock().unwrap().saved.clone()
    }

    pub(crate) fn submitted(&self) -> Vec<TaskRequest> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub(crate) fn child_calls(&self, folder_path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .child_calls
            .get(folder_path)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn invoke_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().invoke_calls.clone()
    }

    pub(crate) fn group_members(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().group_members.clone()
    }

    pub(crate) fn plan_task(&self, plan: TaskPlan) {
        self.state.lock().unwrap().task_plans.push_back(plan);
    }

    pub(crate) fn fail_save(&self, path: &str, failure: SaveFailure) {
        self.state
            .lock()
            .unwrap()
            .save_failures
            .insert(path.to_owned(), failure);
    }

    pub(crate) fn set_invoke_result(&self, path: &str, method: &str, result: &[(&str, &str)]) {
        let result = result
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        self.state
            .lock()
            .unwrap()
            .invoke_results
            .insert((path.to_owned(), method.to_owned()), result);
    }

    /// Apply the side effect of a successful task and report the path it produced.
    fn apply_effect(state: &mut FakeState, request: &TaskRequest) -> Option<String> {
        match request.operation {
            TaskOperation::AddDeviceGroup => {
                let name = request.argument("GroupName").unwrap_or_default().to_owned();
                let id = format!("g{}", state.next_task);
                let path = format!("{}/CameraGroup[{id}]", request.target);
                let group = Entity::new(id.as_str(), EntityKind::CameraGroup, path.as_str())
                    .with_name(name)
                    .with_enabled(true);
                state.items.insert(path.clone(), group);
                Some(path)
            }
            TaskOperation::AddDeviceGroupMember => {
                let group = request.target.trim_end_matches("/CameraFolder").to_owned();
                let camera = request.argument("ItemSelection").unwrap_or_default();
                state.group_members.push((group, camera.to_owned()));
                None
            }
            TaskOperation::DeleteHardware => {
                let victim = request.argument("ItemSelection").unwrap_or_default();
                let prefix = format!("{victim}/");
                state
                    .items
                    .retain(|path, _| path != victim && !path.starts_with(&prefix));
                None
            }
            TaskOperation::AddHardware | TaskOperation::ChangePassword => None,
        }
    }
}

#[async_trait]
impl ConfigService for FakeService {
    async fn get_child_items(&self, folder_path: &str) -> Result<Vec<Entity>, CoreError> {
        if let Some(delay) = self.child_delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        let mut state = self.state.lock().unwrap();
        *state.child_calls.entry(folder_path.to_owned()).or_default() += 1;
        let prefix = format!("{folder_path}/");
        Ok(state
            .items
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn get_item(&self, path: &str) -> Result<Entity, CoreError> {
        self.item(path).ok_or_else(|| CoreError::NotFound {
            kind: "Item".into(),
            identifier: path.to_owned(),
        })
    }

    async fn invoke_method(
        &self,
        path: &str,
        method: &str,
    ) -> Result<BTreeMap<String, String>, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.invoke_calls.push((path.to_owned(), method.to_owned()));
        state
            .invoke_results
            .get(&(path.to_owned(), method.to_owned()))
            .cloned()
            .ok_or_else(|| CoreError::Api {
                message: format!("method {method} not available on {path}"),
                status: Some(400),
            })
    }

    async fn save(&self, entity: &Entity) -> Result<(), CoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        match state.save_failures.get(&entity.path) {
            Some(SaveFailure::Validation) => {
                return Err(CoreError::Validation {
                    item: entity.name.clone(),
                    fields: vec![FieldError {
                        property: "Name".into(),
                        message: "rejected by server".into(),
                    }],
                });
            }
            Some(SaveFailure::Systemic) => {
                return Err(CoreError::Api {
                    message: "recording server unavailable".into(),
                    status: Some(503),
                });
            }
            None => {}
        }
        state.items.insert(entity.path.clone(), entity.clone());
        state.saved.push(entity.clone());
        Ok(())
    }

    async fn submit_task(&self, request: &TaskRequest) -> Result<RemoteTask, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_task += 1;
        let path = format!("/Task[{}]", state.next_task);
        let mut plan = state
            .task_plans
            .pop_front()
            .unwrap_or_else(|| TaskPlan::succeed_after(0, None));
        if plan.ends_in_success() {
            if let Some(produced) = Self::apply_effect(&mut state, request) {
                plan.result_path.get_or_insert(produced);
            }
        }
        state.submitted.push(request.clone());
        let running = RunningTask { plan, cursor: 0 };
        let snapshot = running.snapshot(&path);
        state.tasks.insert(path, running);
        Ok(snapshot)
    }

    async fn poll_task(&self, task: &RemoteTask) -> Result<RemoteTask, CoreError> {
        let mut state = self.state.lock().unwrap();
        let running = state
            .tasks
            .get_mut(&task.path)
            .ok_or_else(|| CoreError::NotFound {
                kind: "Task".into(),
                identifier: task.path.clone(),
            })?;
        running.cursor += 1;
        Ok(running.snapshot(&task.path))
    }
}

// ── Fixture builders ────────────────────────────────────────────────

pub(crate) fn recorder(id: &str, name: &str) -> Entity {
    Entity::new(
        id,
        EntityKind::RecordingServer,
        format!("/RecordingServerFolder/RecordingServer[{id}]"),
    )
    .with_name(name)
    .with_enabled(true)
}

pub(crate) fn hardware(parent: &Entity, id: &str, name: &str) -> Entity {
    Entity::new(
        id,
        EntityKind::Hardware,
        format!("{}/Hardware[{id}]", child_folder(&parent.path, EntityKind::Hardware)),
    )
    .with_name(name)
    .with_enabled(true)
}

pub(crate) fn driver(parent: &Entity, id: &str, name: &str, number: i32) -> Entity {
    Entity::new(
        id,
        EntityKind::HardwareDriver,
        format!(
            "{}/HardwareDriver[{id}]",
            child_folder(&parent.path, EntityKind::HardwareDriver)
        ),
    )
    .with_name(name)
    .with_property("Number", number.to_string())
}

pub(crate) fn channel(parent: &Entity, kind: EntityKind, id: &str, channel: i32) -> Entity {
    Entity::new(
        id,
        kind,
        format!("{}/{kind}[{id}]", child_folder(&parent.path, kind)),
    )
    .with_name(format!("{} {}", kind.label(), channel + 1))
    .with_property("Channel", channel.to_string())
}
