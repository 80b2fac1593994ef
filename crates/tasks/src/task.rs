use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgewms_core::{
    Aggregate, AggregateRoot, DomainError, LocationId, LotId, OrderId, TaskDetailId, TaskId,
    UserId,
};
use forgewms_events::Event;

/// Kind of work a task directs an operator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Putaway,
    Pick,
    Count,
    Replenish,
    Pack,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Putaway => "PUTAWAY",
            TaskType::Pick => "PICK",
            TaskType::Count => "COUNT",
            TaskType::Replenish => "REPLENISH",
            TaskType::Pack => "PACK",
        }
    }
}

impl core::fmt::Display for TaskType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUTAWAY" => Ok(Self::Putaway),
            "PICK" => Ok(Self::Pick),
            "COUNT" => Ok(Self::Count),
            "REPLENISH" => Ok(Self::Replenish),
            "PACK" => Ok(Self::Pack),
            other => Err(DomainError::validation(format!("unknown task type '{other}'"))),
        }
    }
}

/// Task lifecycle. Forward only; `Cancelled` is terminal but no operation
/// reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Created,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Created => "CREATED",
            TaskState::Assigned => "ASSIGNED",
            TaskState::InProgress => "IN_PROGRESS",
            TaskState::Completed => "COMPLETED",
            TaskState::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Cancelled)
    }
}

impl core::fmt::Display for TaskState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "ASSIGNED" => Ok(Self::Assigned),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(DomainError::validation(format!("unknown task state '{other}'"))),
        }
    }
}

/// One line of a task: a lot, how much of it, and where from/to.
///
/// PUTAWAY lines carry a destination only, PICK lines an origin only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: TaskDetailId,
    pub lot_id: LotId,
    pub requested: i64,
    pub completed: i64,
    pub origin: Option<LocationId>,
    pub destination: Option<LocationId>,
}

impl TaskDetail {
    pub fn putaway(lot_id: LotId, requested: i64, destination: LocationId) -> Self {
        Self {
            id: TaskDetailId::new(),
            lot_id,
            requested,
            completed: 0,
            origin: None,
            destination: Some(destination),
        }
    }

    pub fn pick(lot_id: LotId, requested: i64, origin: LocationId) -> Self {
        Self {
            id: TaskDetailId::new(),
            lot_id,
            requested,
            completed: 0,
            origin: Some(origin),
            destination: None,
        }
    }

    pub fn remaining(&self) -> i64 {
        self.requested - self.completed
    }

    pub fn is_pending(&self) -> bool {
        self.completed < self.requested
    }
}

/// Aggregate root: Task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: TaskId,
    task_type: TaskType,
    state: TaskState,
    priority: i32,
    order_id: Option<OrderId>,
    assigned_to: Option<UserId>,
    created_by: Option<UserId>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    details: Vec<TaskDetail>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl Task {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: TaskId) -> Self {
        Self {
            id,
            task_type: TaskType::Putaway,
            state: TaskState::Created,
            priority: 0,
            order_id: None,
            assigned_to: None,
            created_by: None,
            created_at: DateTime::<Utc>::default(),
            started_at: None,
            finished_at: None,
            details: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn assigned_to(&self) -> Option<UserId> {
        self.assigned_to
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Lines in creation order.
    pub fn details(&self) -> &[TaskDetail] {
        &self.details
    }

    pub fn detail(&self, id: TaskDetailId) -> Option<&TaskDetail> {
        self.details.iter().find(|d| d.id == id)
    }

    /// The line the scan flow works on next: the first one, in creation
    /// order, that still has quantity pending.
    pub fn first_pending_detail(&self) -> Option<&TaskDetail> {
        self.details.iter().find(|d| d.is_pending())
    }

    pub fn is_fully_completed(&self) -> bool {
        !self.details.is_empty() && self.details.iter().all(|d| !d.is_pending())
    }

    pub fn is_started(&self) -> bool {
        !matches!(self.state, TaskState::Created | TaskState::Assigned)
    }
}

impl AggregateRoot for Task {
    type Id = TaskId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateTask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTask {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub priority: i32,
    pub order_id: Option<OrderId>,
    pub created_by: Option<UserId>,
    pub details: Vec<TaskDetail>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignTask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignTask {
    pub task_id: TaskId,
    pub operator: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StartTask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTask {
    pub task_id: TaskId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordProgress (a confirmed quantity scan on one line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordProgress {
    pub task_id: TaskId,
    pub detail_id: TaskDetailId,
    pub quantity: i64,
    pub user_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskCommand {
    CreateTask(CreateTask),
    AssignTask(AssignTask),
    StartTask(StartTask),
    RecordProgress(RecordProgress),
}

/// Event: TaskCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub priority: i32,
    pub order_id: Option<OrderId>,
    pub created_by: Option<UserId>,
    pub details: Vec<TaskDetail>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TaskAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssigned {
    pub task_id: TaskId,
    pub operator: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TaskStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStarted {
    pub task_id: TaskId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DetailProgressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailProgressed {
    pub task_id: TaskId,
    pub detail_id: TaskDetailId,
    pub quantity: i64,
    /// Completed quantity of the line after this progress.
    pub completed: i64,
    pub user_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TaskCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompleted {
    pub task_id: TaskId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEvent {
    TaskCreated(TaskCreated),
    TaskAssigned(TaskAssigned),
    TaskStarted(TaskStarted),
    DetailProgressed(DetailProgressed),
    TaskCompleted(TaskCompleted),
}

impl TaskEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::TaskCreated(e) => e.task_id,
            TaskEvent::TaskAssigned(e) => e.task_id,
            TaskEvent::TaskStarted(e) => e.task_id,
            TaskEvent::DetailProgressed(e) => e.task_id,
            TaskEvent::TaskCompleted(e) => e.task_id,
        }
    }
}

impl Event for TaskEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::TaskCreated(_) => "tasks.task.created",
            TaskEvent::TaskAssigned(_) => "tasks.task.assigned",
            TaskEvent::TaskStarted(_) => "tasks.task.started",
            TaskEvent::DetailProgressed(_) => "tasks.task.progressed",
            TaskEvent::TaskCompleted(_) => "tasks.task.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TaskEvent::TaskCreated(e) => e.occurred_at,
            TaskEvent::TaskAssigned(e) => e.occurred_at,
            TaskEvent::TaskStarted(e) => e.occurred_at,
            TaskEvent::DetailProgressed(e) => e.occurred_at,
            TaskEvent::TaskCompleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Task {
    type Command = TaskCommand;
    type Event = TaskEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TaskEvent::TaskCreated(e) => {
                self.id = e.task_id;
                self.task_type = e.task_type;
                self.state = TaskState::Created;
                self.priority = e.priority;
                self.order_id = e.order_id;
                self.created_by = e.created_by;
                self.created_at = e.occurred_at;
                self.details = e.details.clone();
                self.created = true;
            }
            TaskEvent::TaskAssigned(e) => {
                self.assigned_to = Some(e.operator);
                self.state = TaskState::Assigned;
            }
            TaskEvent::TaskStarted(e) => {
                self.state = TaskState::InProgress;
                self.started_at = Some(e.occurred_at);
            }
            TaskEvent::DetailProgressed(e) => {
                if let Some(detail) = self.details.iter_mut().find(|d| d.id == e.detail_id) {
                    detail.completed = e.completed;
                }
            }
            TaskEvent::TaskCompleted(e) => {
                self.state = TaskState::Completed;
                self.finished_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TaskCommand::CreateTask(cmd) => self.handle_create(cmd),
            TaskCommand::AssignTask(cmd) => self.handle_assign(cmd),
            TaskCommand::StartTask(cmd) => self.handle_start(cmd),
            TaskCommand::RecordProgress(cmd) => self.handle_progress(cmd),
        }
    }
}

impl Task {
    fn ensure_task_id(&self, task_id: TaskId) -> Result<(), DomainError> {
        if self.id != task_id {
            return Err(DomainError::invariant("task_id mismatch"));
        }
        Ok(())
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("task {}", self.id)));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateTask) -> Result<Vec<TaskEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("task already exists"));
        }
        self.ensure_task_id(cmd.task_id)?;

        if cmd.details.is_empty() {
            return Err(DomainError::validation("a task needs at least one detail line"));
        }

        for detail in &cmd.details {
            if detail.requested <= 0 {
                return Err(DomainError::validation("requested quantity must be positive"));
            }
            if detail.completed != 0 {
                return Err(DomainError::validation("new detail lines start uncompleted"));
            }
            match cmd.task_type {
                TaskType::Putaway if detail.destination.is_none() || detail.origin.is_some() => {
                    return Err(DomainError::validation(
                        "putaway lines need a destination and no origin",
                    ));
                }
                TaskType::Pick if detail.origin.is_none() || detail.destination.is_some() => {
                    return Err(DomainError::validation(
                        "pick lines need an origin and no destination",
                    ));
                }
                _ => {}
            }
        }

        Ok(vec![TaskEvent::TaskCreated(TaskCreated {
            task_id: cmd.task_id,
            task_type: cmd.task_type,
            priority: cmd.priority,
            order_id: cmd.order_id,
            created_by: cmd.created_by,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign(&self, cmd: &AssignTask) -> Result<Vec<TaskEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_task_id(cmd.task_id)?;

        if !matches!(self.state, TaskState::Created | TaskState::Assigned) {
            return Err(DomainError::conflict(format!(
                "task in state {} can no longer be assigned",
                self.state
            )));
        }

        Ok(vec![TaskEvent::TaskAssigned(TaskAssigned {
            task_id: cmd.task_id,
            operator: cmd.operator,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start(&self, cmd: &StartTask) -> Result<Vec<TaskEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_task_id(cmd.task_id)?;

        if self.is_started() {
            return Err(DomainError::conflict(format!(
                "task in state {} cannot be started",
                self.state
            )));
        }

        Ok(vec![TaskEvent::TaskStarted(TaskStarted {
            task_id: cmd.task_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_progress(&self, cmd: &RecordProgress) -> Result<Vec<TaskEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_task_id(cmd.task_id)?;

        if self.state != TaskState::InProgress {
            return Err(DomainError::invariant(format!(
                "progress can only be recorded on an IN_PROGRESS task (state is {})",
                self.state
            )));
        }

        let detail = self
            .detail(cmd.detail_id)
            .ok_or_else(|| DomainError::not_found(format!("task detail {}", cmd.detail_id)))?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("progress quantity must be positive"));
        }
        if cmd.quantity > detail.remaining() {
            return Err(DomainError::invariant(format!(
                "quantity {} exceeds the {} units pending on the line",
                cmd.quantity,
                detail.remaining()
            )));
        }

        let completed = detail.completed + cmd.quantity;
        let mut events = vec![TaskEvent::DetailProgressed(DetailProgressed {
            task_id: cmd.task_id,
            detail_id: cmd.detail_id,
            quantity: cmd.quantity,
            completed,
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })];

        let all_done = self.details.iter().all(|d| {
            if d.id == cmd.detail_id {
                completed == d.requested
            } else {
                !d.is_pending()
            }
        });
        if all_done {
            events.push(TaskEvent::TaskCompleted(TaskCompleted {
                task_id: cmd.task_id,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }
}
