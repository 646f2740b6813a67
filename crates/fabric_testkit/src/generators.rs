//! Property-based test generators using proptest.

use crate::fixtures::seed_port;
use fabric_journal::{JournalStore, Operation};
use proptest::prelude::*;

/// A port entry to be seeded in `waiting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    /// Port id.
    pub id: String,
    /// Parent network.
    pub network_id: String,
    /// `Bind` or `Delete`.
    pub operation: Operation,
    /// Member identifier.
    pub member: String,
}

/// Strategy for network ids drawn from a small pool so batches form.
pub fn network_id_strategy() -> impl Strategy<Value = String> {
    (0..4u8).prop_map(|n| format!("n{n}"))
}

/// Strategy for member identifiers in the controller's hexadecimal form.
pub fn member_strategy() -> impl Strategy<Value = String> {
    any::<u16>().prop_map(|g| format!("0x{g:016x}"))
}

/// Strategy for a batched port operation.
pub fn port_operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![Just(Operation::Bind), Just(Operation::Delete)]
}

/// Strategy for a set of waiting ports with unique ids.
pub fn waiting_ports_strategy(max: usize) -> impl Strategy<Value = Vec<PortSpec>> {
    prop::collection::vec(
        (network_id_strategy(), port_operation_strategy(), member_strategy()),
        0..=max,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (network_id, operation, member))| PortSpec {
                id: format!("p{i}"),
                network_id,
                operation,
                member,
            })
            .collect()
    })
}

/// Seeds every port as a waiting entry.
pub fn seed_ports<S: JournalStore + ?Sized>(store: &S, ports: &[PortSpec]) {
    for port in ports {
        seed_port(store, &port.id, &port.network_id, port.operation, &port.member);
    }
}
