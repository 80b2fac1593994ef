use forgewms_catalog::CatalogReader;
use forgewms_core::{OrderId, TaskId};
use forgewms_inventory::InventoryRepository;

use crate::task::{Task, TaskEvent};

/// Storage port for tasks, implemented by the unit of work.
pub trait TaskRepository {
    fn task(&self, id: TaskId) -> Option<Task>;

    /// Tasks referencing an order, in creation order.
    fn tasks_for_order(&self, order_id: OrderId) -> Vec<Task>;

    /// Persist `task` as the state reached after applying `events`.
    ///
    /// The events are handed over so the unit of work can publish them once
    /// it commits.
    fn save_task(&mut self, task: Task, events: Vec<TaskEvent>);
}

/// Everything the task engine reads and writes inside one unit of work.
pub trait WarehouseRepository: CatalogReader + InventoryRepository + TaskRepository {}

impl<T> WarehouseRepository for T where T: CatalogReader + InventoryRepository + TaskRepository {}
