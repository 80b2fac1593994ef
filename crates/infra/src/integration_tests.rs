//! End-to-end tests of the warehouse service over the in-memory store.
//!
//! Path under test: call → unit of work (catalog, ledger, tasks) → commit →
//! bus. Verifies:
//! - putaway and picking tasks move stock only through accepted scans
//! - a failed call persists nothing and publishes only its alert
//! - stock is conserved against the movement history

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;
    use serde_json::Value as JsonValue;

    use forgewms_allocation::AllocationError;
    use forgewms_catalog::{Location, LocationType, Lot, Product};
    use forgewms_core::{Aggregate, DomainError, LocationId, LotId, OrderId, ProductId, TaskId, UserId};
    use forgewms_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
    use forgewms_inventory::LedgerError;
    use forgewms_tasks::{
        CreateTask, PickLine, ScanStep, Task, TaskCommand, TaskDetail, TaskError, TaskRepository,
        TaskState, TaskType,
    };

    use crate::config::WarehouseConfig;
    use crate::service::{OperationOutcome, ServiceError, WarehouseService};
    use crate::store::{InMemoryWarehouseStore, UnitOfWork};

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type Service = WarehouseService<InMemoryWarehouseStore, Bus>;

    struct Warehouse {
        service: Service,
        bus: Bus,
        shelf: LocationType,
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn warehouse_with(config: WarehouseConfig) -> Warehouse {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let service = WarehouseService::new(InMemoryWarehouseStore::new(), bus.clone(), config);
        Warehouse {
            service,
            bus,
            shelf: LocationType::new("SHELF").unwrap(),
        }
    }

    fn warehouse() -> Warehouse {
        warehouse_with(WarehouseConfig::default())
    }

    impl Warehouse {
        fn product(&self, sku: &str) -> ProductId {
            self.service
                .register_product(Product::new(sku, sku, 1.0, self.shelf.clone()))
                .unwrap()
                .id
        }

        fn location(&self, code: &str, max_quantity: i64) -> LocationId {
            self.service
                .register_location(Location::new(code, self.shelf.clone(), max_quantity, 1_000.0))
                .unwrap()
                .id
        }

        fn overflow(&self, code: &str) -> LocationId {
            self.service
                .register_location(Location::new(code, self.shelf.clone(), 1_000, 10_000.0).overflow())
                .unwrap()
                .id
        }

        fn lot(&self, code: &str, product_id: ProductId, expires: NaiveDate) -> LotId {
            self.service
                .register_lot(Lot::new(code, product_id, day(2024, 1, 1), expires, 1_000))
                .unwrap()
                .id
        }

        fn stock(&self, lot_id: LotId, location_id: LocationId, quantity: i64) {
            self.service
                .add_stock(lot_id, location_id, quantity, None, None)
                .unwrap();
        }

        fn scan(&self, task_id: TaskId, scan_type: &str, value: &str, quantity: Option<i64>) -> forgewms_tasks::StepOutcome {
            self.service
                .validate_step(task_id, scan_type, value, quantity, None)
                .unwrap()
        }

        fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
            self.bus.subscribe()
        }
    }

    fn event_types(sub: &Subscription<EventEnvelope<JsonValue>>) -> Vec<String> {
        sub.drain()
            .iter()
            .map(|env| env.event_type().to_string())
            .collect()
    }

    #[test]
    fn putaway_targets_an_empty_compatible_location() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        let a01 = wh.location("A-01", 50);

        let task = wh
            .service
            .create_putaway_task(OrderId::new(), lot, 20, Some(UserId::new()))
            .unwrap();

        assert_eq!(task.task_type(), TaskType::Putaway);
        assert_eq!(task.state(), TaskState::Created);
        assert_eq!(task.priority(), 5);
        assert_eq!(task.details().len(), 1);
        let detail = &task.details()[0];
        assert_eq!(detail.destination, Some(a01));
        assert_eq!(detail.origin, None);
        assert_eq!(detail.requested, 20);
        assert_eq!(detail.completed, 0);
    }

    #[test]
    fn putaway_scans_drive_the_task_to_completion() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        let a01 = wh.location("A-01", 50);
        wh.location("B-01", 50);
        let task = wh
            .service
            .create_putaway_task(OrderId::new(), lot, 20, None)
            .unwrap();
        let task_id = *forgewms_core::AggregateRoot::id(&task);

        let wrong = wh.scan(task_id, "location", "B-01", None);
        assert!(!wrong.success);
        assert_eq!(wrong.next_step, None);
        let unchanged = wh.service.task(task_id).unwrap().unwrap();
        assert_eq!(unchanged.details()[0].completed, 0);
        assert_eq!(unchanged.state(), TaskState::Created);

        let location = wh.scan(task_id, "location", "A-01", None);
        assert!(location.success);
        assert_eq!(location.next_step, Some(ScanStep::Lot));
        assert_eq!(
            wh.service.task(task_id).unwrap().unwrap().state(),
            TaskState::InProgress
        );

        let lot_scan = wh.scan(task_id, "lot", "L-1", None);
        assert!(lot_scan.success);
        assert_eq!(lot_scan.next_step, Some(ScanStep::Quantity));
        assert_eq!(lot_scan.data.as_ref().map(|d| d.pending), Some(20));

        let quantity = wh.scan(task_id, "quantity", "", Some(20));
        assert!(quantity.success, "{}", quantity.message);
        assert_eq!(quantity.next_step, None);

        assert_eq!(wh.service.stock_at(lot, a01).unwrap(), 20);
        let done = wh.service.task(task_id).unwrap().unwrap();
        assert_eq!(done.details()[0].completed, 20);
        assert_eq!(done.state(), TaskState::Completed);
        assert!(done.finished_at().is_some());

        let movements = wh.service.movements_for_task(task_id).unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].destination, Some(a01));
    }

    #[test]
    fn partial_quantities_loop_back_to_the_location_step() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        let a01 = wh.location("A-01", 50);
        let task = wh.service.create_putaway_task(OrderId::new(), lot, 10, None).unwrap();
        let task_id = *forgewms_core::AggregateRoot::id(&task);

        let first = wh.scan(task_id, "quantity", "", Some(4));
        assert!(first.success);
        assert_eq!(first.next_step, Some(ScanStep::Location));

        let too_many = wh.scan(task_id, "quantity", "", Some(7));
        assert!(!too_many.success);

        let rest = wh.scan(task_id, "quantity", "", Some(6));
        assert_eq!(rest.next_step, None);
        assert_eq!(wh.service.stock_at(lot, a01).unwrap(), 10);

        let after = wh.scan(task_id, "location", "A-01", None);
        assert!(!after.success);
        assert!(after.message.contains("COMPLETED"));
    }

    #[test]
    fn failed_multi_line_pick_persists_nothing_and_raises_an_alert() {
        let wh = warehouse();
        let p1 = wh.product("SKU-1");
        let p2 = wh.product("SKU-2");
        let a01 = wh.location("A-01", 50);
        let lot2 = wh.lot("L-2", p2, day(2025, 6, 1));
        wh.stock(lot2, a01, 10);
        let order = OrderId::new();
        let sub = wh.subscribe();

        let err = wh
            .service
            .create_picking_task_with_multiple_products(
                order,
                &[
                    PickLine { product_id: p1, quantity: 3 },
                    PickLine { product_id: p2, quantity: 2 },
                ],
                None,
            )
            .unwrap_err();

        assert!(matches!(
            err.allocation(),
            Some(AllocationError::NoAvailableStock { product_id }) if *product_id == p1
        ));
        assert!(wh.service.tasks_for_order(order).unwrap().is_empty());
        assert_eq!(wh.service.stock_at(lot2, a01).unwrap(), 10);

        let published = sub.drain();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type(), "alerts.insufficient_stock");
        assert_eq!(published[0].payload()["InsufficientStock"]["requested"], 3);
    }

    #[test]
    fn picking_allocates_fefo_and_scans_remove_stock() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let a01 = wh.location("A-01", 100);
        let a02 = wh.location("A-02", 100);
        let later = wh.lot("L-LATE", product, day(2025, 12, 31));
        let sooner = wh.lot("L-SOON", product, day(2025, 3, 1));
        wh.stock(later, a01, 50);
        wh.stock(sooner, a01, 4);
        wh.stock(sooner, a02, 8);

        let order = OrderId::new();
        let task = wh
            .service
            .create_picking_task_with_multiple_products(
                order,
                &[PickLine { product_id: product, quantity: 5 }],
                None,
            )
            .unwrap();
        let task_id = *forgewms_core::AggregateRoot::id(&task);
        let detail = &task.details()[0];
        assert_eq!(detail.lot_id, sooner);
        assert_eq!(detail.origin, Some(a02));

        assert!(wh.scan(task_id, "location", "A-02", None).success);
        let lot_scan = wh.scan(task_id, "lot", "L-SOON", None);
        assert_eq!(lot_scan.data.as_ref().map(|d| d.available), Some(8));
        let done = wh.scan(task_id, "quantity", "", Some(5));
        assert!(done.success);
        assert_eq!(done.next_step, None);

        assert_eq!(wh.service.stock_at(sooner, a02).unwrap(), 3);
        assert_eq!(wh.service.on_hand_for_lot(sooner).unwrap(), 7);
        assert_eq!(wh.service.on_hand_for_lot(later).unwrap(), 50);
        assert_eq!(wh.service.tasks_for_order(order).unwrap().len(), 1);
    }

    #[test]
    fn pick_scans_recheck_stock_that_moved_since_allocation() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let a01 = wh.location("A-01", 100);
        let lot = wh.lot("L-1", product, day(2025, 3, 1));
        wh.stock(lot, a01, 6);
        let task = wh
            .service
            .create_picking_task_with_multiple_products(
                OrderId::new(),
                &[PickLine { product_id: product, quantity: 5 }],
                None,
            )
            .unwrap();
        let task_id = *forgewms_core::AggregateRoot::id(&task);

        wh.service.remove_stock(lot, a01, 3, None, None).unwrap();

        let lot_scan = wh.scan(task_id, "lot", "L-1", None);
        assert!(!lot_scan.success);
        assert!(lot_scan.message.contains("insufficient stock"));
        let quantity = wh.scan(task_id, "quantity", "", Some(5));
        assert!(!quantity.success);
        assert_eq!(wh.service.stock_at(lot, a01).unwrap(), 3);
    }

    #[test]
    fn wrong_scans_are_idempotent_and_publish_nothing() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        wh.location("A-01", 50);
        let task = wh.service.create_putaway_task(OrderId::new(), lot, 5, None).unwrap();
        let task_id = *forgewms_core::AggregateRoot::id(&task);
        let sub = wh.subscribe();

        for _ in 0..3 {
            let outcome = wh.scan(task_id, "lot", "NOPE", None);
            assert!(!outcome.success);
            assert_eq!(outcome.next_step, None);
        }

        assert!(sub.drain().is_empty());
        let stored = wh.service.task(task_id).unwrap().unwrap();
        assert_eq!(stored.state(), TaskState::Created);
        assert_eq!(stored.details()[0].completed, 0);
    }

    #[test]
    fn unknown_scan_types_are_rejected_before_any_work() {
        let wh = warehouse();
        let err = wh
            .service
            .validate_step(TaskId::new(), "weight", "12", None, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn committed_work_publishes_and_failed_work_does_not() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        let a01 = wh.location("A-01", 50);
        let sub = wh.subscribe();

        let added = wh.service.add_stock(lot, a01, 5, None, None);
        assert!(OperationOutcome::from_ledger(&added).success);
        let published = sub.drain();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type(), "ledger.movement.recorded");
        assert_eq!(published[0].stream_type(), "ledger.lot");

        let removed = wh.service.remove_stock(lot, a01, 9, None, None);
        assert!(removed.as_ref().is_err_and(ServiceError::is_insufficient_stock));
        assert!(!OperationOutcome::from_ledger(&removed).success);
        assert!(sub.drain().is_empty());
        assert_eq!(wh.service.stock_at(lot, a01).unwrap(), 5);
    }

    #[test]
    fn a_scan_commits_its_movement_and_task_transitions_together() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        wh.location("A-01", 50);
        let sub = wh.subscribe();

        let task = wh.service.create_putaway_task(OrderId::new(), lot, 5, None).unwrap();
        let task_id = *forgewms_core::AggregateRoot::id(&task);
        wh.scan(task_id, "quantity", "", Some(5));

        assert_eq!(
            event_types(&sub),
            vec![
                "tasks.task.created",
                "ledger.movement.recorded",
                "tasks.task.started",
                "tasks.task.progressed",
                "tasks.task.completed",
            ]
        );
    }

    #[test]
    fn disabled_publication_keeps_the_bus_quiet() {
        let wh = warehouse_with(WarehouseConfig {
            publish_events: false,
            ..WarehouseConfig::default()
        });
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        let a01 = wh.location("A-01", 50);
        let sub = wh.subscribe();

        wh.stock(lot, a01, 5);
        assert!(sub.drain().is_empty());
        assert_eq!(wh.service.stock_at(lot, a01).unwrap(), 5);
    }

    #[test]
    fn putaway_falls_back_to_overflow_when_shelves_are_full() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        wh.location("A-01", 10);
        let spill = wh.overflow("OVF-01");

        let task = wh.service.create_putaway_task(OrderId::new(), lot, 20, None).unwrap();
        assert_eq!(task.details()[0].destination, Some(spill));
    }

    #[test]
    fn without_overflow_a_full_warehouse_raises_capacity_alert() {
        let wh = warehouse_with(WarehouseConfig {
            overflow_fallback: false,
            ..WarehouseConfig::default()
        });
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        wh.location("A-01", 10);
        wh.overflow("OVF-01");
        let order = OrderId::new();
        let sub = wh.subscribe();

        let err = wh.service.create_putaway_task(order, lot, 20, None).unwrap_err();

        assert!(matches!(
            err.allocation(),
            Some(AllocationError::CapacityExceeded { quantity: 20, .. })
        ));
        assert!(wh.service.tasks_for_order(order).unwrap().is_empty());
        assert_eq!(event_types(&sub), vec!["alerts.capacity_exceeded"]);
    }

    #[test]
    fn quantities_near_i64_max_fail_without_panicking() {
        let wh = warehouse_with(WarehouseConfig {
            overflow_fallback: false,
            ..WarehouseConfig::default()
        });
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        let a01 = wh.location("A-01", 10);
        wh.stock(lot, a01, 1);

        let err = wh
            .service
            .create_putaway_task(OrderId::new(), lot, i64::MAX, None)
            .unwrap_err();
        assert!(matches!(
            err.allocation(),
            Some(AllocationError::CapacityExceeded { .. })
        ));

        wh.stock(lot, a01, i64::MAX - 1);
        let err = wh.service.add_stock(lot, a01, 1, None, None).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Ledger(LedgerError::QuantityOverflow { held: i64::MAX, added: 1, .. })
        ));
        assert_eq!(wh.service.stock_at(lot, a01).unwrap(), i64::MAX);
        assert_eq!(wh.service.movements_for_lot(lot).unwrap().len(), 2);
    }

    #[test]
    fn explicit_putaway_location_must_fit() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        let small = wh.location("A-01", 10);
        let cold = wh
            .service
            .register_location(Location::new("C-01", LocationType::new("COLD").unwrap(), 100, 1_000.0))
            .unwrap()
            .id;
        let order = OrderId::new();
        let sub = wh.subscribe();

        let too_small = wh
            .service
            .create_putaway_task_to_location(order, lot, 20, small, None)
            .unwrap_err();
        assert!(matches!(too_small.allocation(), Some(AllocationError::LocationRejected(_))));

        let wrong_type = wh
            .service
            .create_putaway_task_to_location(order, lot, 5, cold, None)
            .unwrap_err();
        assert!(matches!(wrong_type.allocation(), Some(AllocationError::LocationRejected(_))));

        assert!(wh.service.tasks_for_order(order).unwrap().is_empty());
        assert!(sub.drain().is_empty());

        let ok = wh
            .service
            .create_putaway_task_to_location(order, lot, 10, small, None)
            .unwrap();
        assert_eq!(ok.details()[0].destination, Some(small));
    }

    #[test]
    fn tasks_can_be_reassigned_until_started() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        wh.location("A-01", 50);
        let task = wh.service.create_putaway_task(OrderId::new(), lot, 5, None).unwrap();
        let task_id = *forgewms_core::AggregateRoot::id(&task);

        let first = UserId::new();
        let second = UserId::new();
        wh.service.assign_task(task_id, first).unwrap();
        let reassigned = wh.service.assign_task(task_id, second).unwrap();
        assert_eq!(reassigned.state(), TaskState::Assigned);
        assert_eq!(reassigned.assigned_to(), Some(second));

        assert!(wh.scan(task_id, "location", "A-01", None).success);
        let err = wh.service.assign_task(task_id, first).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Task(TaskError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[test]
    fn missing_tasks_are_reported() {
        let wh = warehouse();
        let err = wh.service.assign_task(TaskId::new(), UserId::new()).unwrap_err();
        assert!(matches!(err, ServiceError::Task(TaskError::NotFound(_))));
    }

    #[test]
    fn count_tasks_have_no_scan_flow() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        let a01 = wh.location("A-01", 50);
        let task_id = TaskId::new();
        wh.service
            .store()
            .transact(|tx| -> Result<(), ServiceError> {
                let mut task = Task::empty(task_id);
                let events = task.execute(&TaskCommand::CreateTask(CreateTask {
                    task_id,
                    task_type: TaskType::Count,
                    priority: 1,
                    order_id: None,
                    created_by: None,
                    details: vec![TaskDetail::putaway(lot, 1, a01)],
                    occurred_at: Utc::now(),
                }))?;
                tx.save_task(task, events);
                Ok(())
            })
            .unwrap();

        let err = wh
            .service
            .validate_step(task_id, "location", "A-01", None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Task(TaskError::UnsupportedScanFlow(TaskType::Count))
        ));
    }

    #[test]
    fn ledger_calls_require_known_lots_and_locations() {
        let wh = warehouse();
        let product = wh.product("SKU-1");
        let lot = wh.lot("L-1", product, day(2025, 6, 1));
        let err = wh
            .service
            .add_stock(lot, LocationId::new(), 5, None, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
        assert!(wh.service.movements_for_lot(lot).unwrap().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, i64),
        Remove(usize, i64),
        Move(usize, usize, i64),
        Adjust(usize, i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..3usize, 1..20i64).prop_map(|(l, q)| Op::Add(l, q)),
            (0..3usize, 1..20i64).prop_map(|(l, q)| Op::Remove(l, q)),
            (0..3usize, 0..3usize, 1..20i64).prop_map(|(a, b, q)| Op::Move(a, b, q)),
            (0..3usize, 0..30i64).prop_map(|(l, q)| Op::Adjust(l, q)),
        ]
    }

    proptest! {
        #[test]
        fn stock_always_matches_the_movement_history(ops in proptest::collection::vec(op(), 1..40)) {
            let wh = warehouse();
            let product = wh.product("SKU-1");
            let lot = wh.lot("L-1", product, day(2025, 6, 1));
            let locations = [
                wh.location("A-01", 1_000),
                wh.location("A-02", 1_000),
                wh.location("A-03", 1_000),
            ];

            for op in ops {
                // Rejected operations are part of the input space; they must
                // simply leave no trace.
                let _ = match op {
                    Op::Add(l, q) => wh.service.add_stock(lot, locations[l], q, None, None),
                    Op::Remove(l, q) => wh.service.remove_stock(lot, locations[l], q, None, None),
                    Op::Move(a, b, q) => wh.service.move_stock(lot, locations[a], locations[b], q, None, None),
                    Op::Adjust(l, q) => wh.service.adjust_stock(lot, locations[l], q, None),
                };
            }

            let movements = wh.service.movements_for_lot(lot).unwrap();
            for location in locations {
                let held = wh.service.stock_at(lot, location).unwrap();
                prop_assert!(held >= 0);
                let replayed: i64 = movements.iter().map(|m| m.net_effect_at(location)).sum();
                prop_assert_eq!(held, replayed);
            }
            let net: i64 = movements.iter().map(|m| m.net_effect()).sum();
            prop_assert_eq!(wh.service.on_hand_for_lot(lot).unwrap(), net);
        }
    }
}
