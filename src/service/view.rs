// src/service/view.rs
//
// Boundary transform applied to every ticket before it leaves the API.
// The loader attaches the nested assignee and product-serial objects, which
// makes the raw foreign-key columns redundant; they are stripped here rather
// than leaking into responses. Total and idempotent: non-object input
// (including null) passes through unchanged.
use serde_json::Value;

const INTERNAL_FIELDS: [&str; 2] = ["product_serial_id", "assigned_to"];

pub fn transform_ticket(mut ticket: Value) -> Value {
    if let Value::Object(ref mut map) = ticket {
        for field in INTERNAL_FIELDS {
            map.remove(field);
        }
    }
    ticket
}

pub fn transform_tickets(tickets: Vec<Value>) -> Vec<Value> {
    tickets.into_iter().map(transform_ticket).collect()
}
