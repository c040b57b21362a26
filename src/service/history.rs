// src/service/history.rs
//
// Hydrates detected changes into the rows appended to a ticket's audit
// trail. Entries are immutable once written; the store assigns id and
// created_at at insertion time, inside the same transaction as the ticket
// write they describe.
use uuid::Uuid;

use crate::{
    models::ticketmodel::{ActionType, Actor},
    service::changes::DetectedChange,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub ticket_id: Uuid,
    pub action_type: ActionType,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by: Option<Uuid>,
}

impl NewHistoryEntry {
    pub fn from_change(ticket_id: Uuid, actor: Actor, change: DetectedChange) -> Self {
        NewHistoryEntry {
            ticket_id,
            action_type: change.action_type,
            description: change.description,
            old_value: change.old_value,
            new_value: change.new_value,
            performed_by: actor.user_id(),
        }
    }

    /// The unconditional entry written when a ticket is created. Both values
    /// are null; there is no prior state to record.
    pub fn created(ticket_id: Uuid, actor: Actor) -> Self {
        NewHistoryEntry {
            ticket_id,
            action_type: ActionType::Created,
            description: "Ticket created".to_string(),
            old_value: None,
            new_value: None,
            performed_by: actor.user_id(),
        }
    }

    /// Informational entry with no before/after values, e.g. "notification
    /// email sent".
    pub fn informational(ticket_id: Uuid, actor: Actor, description: String) -> Self {
        NewHistoryEntry {
            ticket_id,
            action_type: ActionType::StatusChanged,
            description,
            old_value: None,
            new_value: None,
            performed_by: actor.user_id(),
        }
    }
}
