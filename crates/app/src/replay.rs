//! Scenario runner.
//!
//! Catalog seeding and unresolvable references (unknown codes, task
//! positions that were never created) abort the replay. Everything the
//! warehouse itself refuses is recorded in the report and the replay moves
//! on.

use std::collections::HashMap;

use anyhow::{Context, bail};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use forgewms_catalog::{Location, LocationType, Lot, Product};
use forgewms_core::{AggregateRoot, LocationId, LotId, OrderId, ProductId, TaskId, UserId};
use forgewms_events::{EventBus, EventEnvelope};
use forgewms_infra::{OperationOutcome, ServiceError, UnitOfWork, WarehouseService};
use forgewms_inventory::Movement;
use forgewms_tasks::{PickLine, TaskState, TaskType};

use crate::scenario::{Operation, Scenario};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationReport {
    pub index: usize,
    pub op: &'static str,
    pub success: bool,
    pub message: String,
    /// Position of the task the operation created, if it created one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_task: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub index: usize,
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub state: TaskState,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLine {
    pub lot: String,
    pub location: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub operations: Vec<OperationReport>,
    pub tasks: Vec<TaskSummary>,
    /// Non-zero holdings, in scenario lot order then location order.
    pub stock: Vec<StockLine>,
}

impl ReplayReport {
    pub fn failures(&self) -> usize {
        self.operations.iter().filter(|op| !op.success).count()
    }
}

struct Applied {
    success: bool,
    message: String,
    created_task: Option<usize>,
}

impl Applied {
    fn ok(message: String) -> Self {
        Self {
            success: true,
            message,
            created_task: None,
        }
    }

    fn failed(err: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            created_task: None,
        }
    }
}

pub struct Replay<S, B> {
    service: WarehouseService<S, B>,
    products: HashMap<String, ProductId>,
    lots: HashMap<String, LotId>,
    locations: HashMap<String, LocationId>,
    orders: HashMap<String, OrderId>,
    users: HashMap<String, UserId>,
    tasks: Vec<TaskId>,
}

impl<S, B> Replay<S, B>
where
    S: UnitOfWork,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(service: WarehouseService<S, B>) -> Self {
        Self {
            service,
            products: HashMap::new(),
            lots: HashMap::new(),
            locations: HashMap::new(),
            orders: HashMap::new(),
            users: HashMap::new(),
            tasks: Vec::new(),
        }
    }

    pub fn run(mut self, scenario: &Scenario) -> anyhow::Result<ReplayReport> {
        self.seed(scenario)?;

        let mut operations = Vec::with_capacity(scenario.operations.len());
        for (index, op) in scenario.operations.iter().enumerate() {
            let applied = self
                .apply(op)
                .with_context(|| format!("operation {index} ({})", op.name()))?;
            if applied.success {
                info!(index, op = op.name(), "{}", applied.message);
            } else {
                warn!(index, op = op.name(), "{}", applied.message);
            }
            operations.push(OperationReport {
                index,
                op: op.name(),
                success: applied.success,
                message: applied.message,
                created_task: applied.created_task,
            });
        }

        let report = ReplayReport {
            operations,
            tasks: self.task_summaries()?,
            stock: self.stock_lines(scenario)?,
        };
        info!(
            operations = report.operations.len(),
            failures = report.failures(),
            tasks = report.tasks.len(),
            "replay finished"
        );
        Ok(report)
    }

    fn seed(&mut self, scenario: &Scenario) -> anyhow::Result<()> {
        for spec in &scenario.products {
            let location_type = LocationType::new(spec.location_type.as_str())?;
            let product = self
                .service
                .register_product(Product::new(
                    spec.sku.as_str(),
                    spec.name.as_str(),
                    spec.unit_weight,
                    location_type,
                ))
                .with_context(|| format!("registering product {}", spec.sku))?;
            self.products.insert(spec.sku.clone(), product.id);
        }

        for spec in &scenario.locations {
            let location_type = LocationType::new(spec.location_type.as_str())?;
            let mut location = Location::new(
                spec.code.as_str(),
                location_type,
                spec.max_quantity,
                spec.max_weight,
            );
            if spec.overflow {
                location = location.overflow();
            }
            let location = self
                .service
                .register_location(location)
                .with_context(|| format!("registering location {}", spec.code))?;
            self.locations.insert(spec.code.clone(), location.id);
        }

        for spec in &scenario.lots {
            let product_id = self.product(&spec.sku)?;
            let lot = self
                .service
                .register_lot(Lot::new(
                    spec.code.as_str(),
                    product_id,
                    spec.manufactured_on,
                    spec.expires_on,
                    spec.original_quantity,
                ))
                .with_context(|| format!("registering lot {}", spec.code))?;
            self.lots.insert(spec.code.clone(), lot.id);
        }

        Ok(())
    }

    fn apply(&mut self, op: &Operation) -> anyhow::Result<Applied> {
        let applied = match op {
            Operation::AddStock {
                lot,
                location,
                quantity,
            } => {
                let result = self
                    .service
                    .add_stock(self.lot(lot)?, self.location(location)?, *quantity, None, None);
                ledger(&result)
            }
            Operation::RemoveStock {
                lot,
                location,
                quantity,
            } => {
                let result = self
                    .service
                    .remove_stock(self.lot(lot)?, self.location(location)?, *quantity, None, None);
                ledger(&result)
            }
            Operation::MoveStock {
                lot,
                from,
                to,
                quantity,
            } => {
                let result = self.service.move_stock(
                    self.lot(lot)?,
                    self.location(from)?,
                    self.location(to)?,
                    *quantity,
                    None,
                    None,
                );
                ledger(&result)
            }
            Operation::AdjustStock {
                lot,
                location,
                quantity,
            } => {
                let result =
                    self.service
                        .adjust_stock(self.lot(lot)?, self.location(location)?, *quantity, None);
                ledger(&result)
            }
            Operation::Putaway {
                order,
                lot,
                quantity,
                location,
                user,
            } => {
                let order_id = self.order(order);
                let user_id = user.as_deref().map(|name| self.user(name));
                let lot_id = self.lot(lot)?;
                let result = match location {
                    Some(code) => {
                        let location_id = self.location(code)?;
                        self.service.create_putaway_task_to_location(
                            order_id,
                            lot_id,
                            *quantity,
                            location_id,
                            user_id,
                        )
                    }
                    None => self
                        .service
                        .create_putaway_task(order_id, lot_id, *quantity, user_id),
                };
                self.created(result.map(|task| *task.id()))
            }
            Operation::Pick { order, lines, user } => {
                let order_id = self.order(order);
                let user_id = user.as_deref().map(|name| self.user(name));
                let lines = lines
                    .iter()
                    .map(|line| {
                        Ok(PickLine {
                            product_id: self.product(&line.sku)?,
                            quantity: line.quantity,
                        })
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                let result = self
                    .service
                    .create_picking_task_with_multiple_products(order_id, &lines, user_id);
                self.created(result.map(|task| *task.id()))
            }
            Operation::Assign { task, operator } => {
                let task_id = self.task(*task)?;
                let operator = self.user(operator);
                match self.service.assign_task(task_id, operator) {
                    Ok(task) => Applied::ok(format!("task {} is {}", task.id(), task.state())),
                    Err(err) => Applied::failed(err),
                }
            }
            Operation::Scan {
                task,
                scan_type,
                value,
                quantity,
                user,
            } => {
                let task_id = self.task(*task)?;
                let user_id = user.as_deref().map(|name| self.user(name));
                match self
                    .service
                    .validate_step(task_id, scan_type, value, *quantity, user_id)
                {
                    Ok(outcome) => Applied {
                        success: outcome.success,
                        message: match outcome.next_step {
                            Some(next) if outcome.success => {
                                format!("{} (next: {next})", outcome.message)
                            }
                            _ => outcome.message,
                        },
                        created_task: None,
                    },
                    Err(err) => Applied::failed(err),
                }
            }
        };
        Ok(applied)
    }

    fn created(&mut self, result: Result<TaskId, ServiceError>) -> Applied {
        match result {
            Ok(task_id) => {
                self.tasks.push(task_id);
                let index = self.tasks.len() - 1;
                Applied {
                    success: true,
                    message: format!("task {index} created ({task_id})"),
                    created_task: Some(index),
                }
            }
            Err(err) => Applied::failed(err),
        }
    }

    fn task_summaries(&self) -> anyhow::Result<Vec<TaskSummary>> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(index, task_id)| {
                let task = self
                    .service
                    .task(*task_id)?
                    .with_context(|| format!("task {index} vanished from the store"))?;
                Ok(TaskSummary {
                    index,
                    task_id: *task_id,
                    task_type: task.task_type(),
                    state: task.state(),
                    lines: task.details().len(),
                })
            })
            .collect()
    }

    fn stock_lines(&self, scenario: &Scenario) -> anyhow::Result<Vec<StockLine>> {
        let mut lines = Vec::new();
        for lot in &scenario.lots {
            let lot_id = self.lot(&lot.code)?;
            for location in &scenario.locations {
                let quantity = self.service.stock_at(lot_id, self.location(&location.code)?)?;
                if quantity != 0 {
                    lines.push(StockLine {
                        lot: lot.code.clone(),
                        location: location.code.clone(),
                        quantity,
                    });
                }
            }
        }
        Ok(lines)
    }

    fn product(&self, sku: &str) -> anyhow::Result<ProductId> {
        self.products
            .get(sku)
            .copied()
            .with_context(|| format!("unknown product sku '{sku}'"))
    }

    fn lot(&self, code: &str) -> anyhow::Result<LotId> {
        self.lots
            .get(code)
            .copied()
            .with_context(|| format!("unknown lot '{code}'"))
    }

    fn location(&self, code: &str) -> anyhow::Result<LocationId> {
        self.locations
            .get(code)
            .copied()
            .with_context(|| format!("unknown location '{code}'"))
    }

    fn task(&self, index: usize) -> anyhow::Result<TaskId> {
        match self.tasks.get(index) {
            Some(task_id) => Ok(*task_id),
            None => bail!("task {index} was never created ({} so far)", self.tasks.len()),
        }
    }

    fn order(&mut self, name: &str) -> OrderId {
        *self.orders.entry(name.to_string()).or_insert_with(OrderId::new)
    }

    fn user(&mut self, name: &str) -> UserId {
        *self.users.entry(name.to_string()).or_insert_with(UserId::new)
    }
}

fn ledger(result: &Result<Movement, ServiceError>) -> Applied {
    let outcome = OperationOutcome::from_ledger(result);
    Applied {
        success: outcome.success,
        message: outcome.message,
        created_task: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use forgewms_events::InMemoryEventBus;
    use forgewms_infra::{InMemoryWarehouseStore, WarehouseConfig};

    use super::*;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn replay() -> Replay<InMemoryWarehouseStore, Bus> {
        Replay::new(WarehouseService::new(
            InMemoryWarehouseStore::new(),
            Arc::new(InMemoryEventBus::new()),
            WarehouseConfig::default(),
        ))
    }

    fn bundled() -> Scenario {
        serde_json::from_str(include_str!("../scenarios/putaway_and_pick.json")).unwrap()
    }

    fn line(lot: &str, location: &str, quantity: i64) -> StockLine {
        StockLine {
            lot: lot.into(),
            location: location.into(),
            quantity,
        }
    }

    #[test]
    fn bundled_scenario_replays_to_the_expected_warehouse() {
        let report = replay().run(&bundled()).unwrap();

        let failed: Vec<usize> = report
            .operations
            .iter()
            .filter(|op| !op.success)
            .map(|op| op.index)
            .collect();
        // The wrong-location scan and the oversized pick.
        assert_eq!(failed, vec![3, 15]);
        assert_eq!(report.failures(), 2);

        let states: Vec<(TaskType, TaskState)> = report
            .tasks
            .iter()
            .map(|t| (t.task_type, t.state))
            .collect();
        assert_eq!(
            states,
            vec![
                (TaskType::Putaway, TaskState::Completed),
                (TaskType::Pick, TaskState::Completed),
                (TaskType::Putaway, TaskState::Created),
            ]
        );
        assert_eq!(report.tasks[1].lines, 2);

        assert_eq!(
            report.stock,
            vec![
                line("MILK-0301", "C-01", 7),
                line("MILK-0415", "C-01", 10),
                line("SOAP-01", "A-01", 26),
            ]
        );
    }

    #[test]
    fn created_tasks_are_numbered_in_creation_order() {
        let report = replay().run(&bundled()).unwrap();
        let created: Vec<usize> = report
            .operations
            .iter()
            .filter_map(|op| op.created_task)
            .collect();
        assert_eq!(created, vec![0, 1, 2]);
        assert!(report.operations[16].message.starts_with("task 2 created"));
    }

    #[test]
    fn unknown_references_abort_the_replay() {
        let mut scenario = bundled();
        scenario.operations = vec![Operation::AddStock {
            lot: "NOPE".into(),
            location: "A-01".into(),
            quantity: 1,
        }];
        let err = replay().run(&scenario).unwrap_err();
        assert!(format!("{err:#}").contains("unknown lot 'NOPE'"));

        scenario.operations = vec![Operation::Assign {
            task: 0,
            operator: "ana".into(),
        }];
        assert!(replay().run(&scenario).is_err());
    }

    #[test]
    fn refused_operations_do_not_stop_the_replay() {
        let mut scenario = bundled();
        scenario.operations = vec![
            Operation::RemoveStock {
                lot: "SOAP-01".into(),
                location: "A-01".into(),
                quantity: 5,
            },
            Operation::AddStock {
                lot: "SOAP-01".into(),
                location: "A-01".into(),
                quantity: 5,
            },
        ];
        let replay = replay();
        let report = replay.run(&scenario).unwrap();
        assert!(!report.operations[0].success);
        assert!(report.operations[0].message.contains("insufficient stock"));
        assert!(report.operations[1].success);
        assert_eq!(report.stock, vec![line("SOAP-01", "A-01", 5)]);
    }
}
