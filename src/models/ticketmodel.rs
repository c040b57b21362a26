// src/models/ticketmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Received,
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Received => "received",
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "ticket_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "action_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Created,
    StatusChanged,
    Assigned,
    Resolved,
    Closed,
    Reopened,
    PriorityChanged,
    Updated,
}

/// Who performed an operation. Resolved once at the API boundary and passed
/// down, so the lifecycle never compares magic "system" strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(Uuid),
    System,
}

impl Actor {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::System => None,
        }
    }

    /// The actor recorded on a mutation: the authenticated user when one
    /// exists, otherwise the fallback assignee, otherwise the system actor.
    pub fn or_assignee(self, assignee: Option<Uuid>) -> Actor {
        match self {
            Actor::User(_) => self,
            Actor::System => assignee.map(Actor::User).unwrap_or(Actor::System),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub product_serial_id: Option<Uuid>,
    pub issue_title: Option<String>,
    pub issue_description: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketHistory {
    pub id: Uuid,
    /// Monotonic write-order key. Entries from one logical operation share a
    /// `created_at`, so replay order sorts on this instead.
    pub seq: i64,
    pub ticket_id: Uuid,
    pub action_type: ActionType,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketHistoryWithPerformer {
    #[sqlx(flatten)]
    pub entry: TicketHistory,
    pub performer_name: Option<String>,
}

/// Assignee profile attached to read paths in place of the raw foreign key.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssigneeSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContractSummary {
    pub id: Uuid,
    pub contract_number: String,
    pub customer_name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSerialDetail {
    pub id: Uuid,
    pub serial_number: String,
    pub name: String,
    pub contract: Option<ContractSummary>,
}

/// The composed read shape: ticket plus the nested objects the loader joins
/// in. Serialized and then passed through the view transform before it
/// leaves the API, which drops the redundant raw foreign keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub assignee: Option<AssigneeSummary>,
    pub product_serial: Option<ProductSerialDetail>,
    pub history: Vec<TicketHistoryWithPerformer>,
}
