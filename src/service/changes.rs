// src/service/changes.rs
//
// Pure change detection: compares a ticket's current state with a requested
// partial update and produces the semantic changes that must be audited.
// No I/O happens here, which is what keeps the audit classification
// unit-testable on its own.
use uuid::Uuid;

use crate::{
    dtos::ticketdtos::{Patch, UpdateTicketDto},
    models::ticketmodel::{ActionType, Ticket, TicketStatus},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedChange {
    pub action_type: ActionType,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Classify a status transition into the action type and generated
/// description recorded in the audit trail. The table is descriptive, not
/// restrictive: no edge is forbidden, backward moves included.
pub fn classify_status_change(old: TicketStatus, new: TicketStatus) -> (ActionType, String) {
    match new {
        TicketStatus::InProgress => (
            ActionType::Assigned,
            "Ticket accepted and work started".to_string(),
        ),
        TicketStatus::Resolved => (ActionType::Resolved, "Ticket resolved".to_string()),
        TicketStatus::Closed => (ActionType::Closed, "Ticket closed".to_string()),
        TicketStatus::Open => (ActionType::Reopened, "Ticket reopened".to_string()),
        _ => (
            ActionType::StatusChanged,
            format!(
                "Ticket status changed from {} to {}",
                old.as_str(),
                new.as_str()
            ),
        ),
    }
}

/// Detect the audited changes in an update, in fixed order: status, then
/// priority, then assignment. Comparison is by value inequality; fields
/// absent from the patch never produce an entry, and content-only edits
/// (description, customer contact) are deliberately silent.
pub fn detect_changes(existing: &Ticket, patch: &UpdateTicketDto) -> Vec<DetectedChange> {
    let mut changes = Vec::new();

    if let Some(new_status) = patch.status {
        if new_status != existing.status {
            let (action_type, description) = classify_status_change(existing.status, new_status);
            changes.push(DetectedChange {
                action_type,
                description,
                old_value: Some(existing.status.as_str().to_string()),
                new_value: Some(new_status.as_str().to_string()),
            });
        }
    }

    if let Some(new_priority) = patch.priority {
        if new_priority != existing.priority {
            changes.push(DetectedChange {
                action_type: ActionType::PriorityChanged,
                description: format!(
                    "Priority changed from {} to {}",
                    existing.priority.as_str(),
                    new_priority.as_str()
                ),
                old_value: Some(existing.priority.as_str().to_string()),
                new_value: Some(new_priority.as_str().to_string()),
            });
        }
    }

    match &patch.assigned_to {
        Patch::Missing => {}
        patched => {
            let new_assignee = match patched {
                Patch::Value(id) => Some(*id),
                _ => None,
            };
            if new_assignee != existing.assigned_to {
                changes.push(DetectedChange {
                    action_type: ActionType::Assigned,
                    description: "Ticket reassigned".to_string(),
                    old_value: existing.assigned_to.map(|id| id.to_string()),
                    new_value: new_assignee.map(|id| id.to_string()),
                });
            }
        }
    }

    changes
}

/// Change record for a direct reassignment; always classified as `assigned`
/// regardless of ticket status.
pub fn assignment_change(
    old_assignee: Option<Uuid>,
    new_assignee: Uuid,
    note: Option<String>,
) -> DetectedChange {
    DetectedChange {
        action_type: ActionType::Assigned,
        description: note.unwrap_or_else(|| "Ticket assigned to technician".to_string()),
        old_value: old_assignee.map(|id| id.to_string()),
        new_value: Some(new_assignee.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticketmodel::TicketPriority;
    use chrono::Utc;

    fn sample_ticket() -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            ticket_number: "SR-1-AAAAA".to_string(),
            product_serial_id: None,
            issue_title: None,
            issue_description: "Screen flicker".to_string(),
            priority: TicketPriority::Medium,
            status: TicketStatus::Received,
            customer_name: "A".to_string(),
            customer_email: None,
            customer_phone: None,
            assigned_to: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_classify_each_target_status() {
        let (action, _) = classify_status_change(TicketStatus::Received, TicketStatus::InProgress);
        assert_eq!(action, ActionType::Assigned);

        let (action, _) = classify_status_change(TicketStatus::InProgress, TicketStatus::Resolved);
        assert_eq!(action, ActionType::Resolved);

        let (action, _) = classify_status_change(TicketStatus::Resolved, TicketStatus::Closed);
        assert_eq!(action, ActionType::Closed);

        let (action, _) = classify_status_change(TicketStatus::Closed, TicketStatus::Open);
        assert_eq!(action, ActionType::Reopened);

        let (action, description) =
            classify_status_change(TicketStatus::Open, TicketStatus::Received);
        assert_eq!(action, ActionType::StatusChanged);
        assert_eq!(description, "Ticket status changed from open to received");
    }

    #[test]
    fn test_all_three_dimensions_in_fixed_order() {
        let existing = sample_ticket();
        let tech = Uuid::new_v4();
        let patch = UpdateTicketDto {
            status: Some(TicketStatus::InProgress),
            priority: Some(TicketPriority::Urgent),
            assigned_to: Patch::Value(tech),
            ..Default::default()
        };

        let changes = detect_changes(&existing, &patch);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].action_type, ActionType::Assigned);
        assert_eq!(changes[0].old_value.as_deref(), Some("received"));
        assert_eq!(changes[0].new_value.as_deref(), Some("in_progress"));
        assert_eq!(changes[1].action_type, ActionType::PriorityChanged);
        assert_eq!(changes[2].action_type, ActionType::Assigned);
        assert_eq!(changes[2].new_value, Some(tech.to_string()));
    }

    #[test]
    fn test_content_only_edit_is_silent() {
        let existing = sample_ticket();
        let patch = UpdateTicketDto {
            issue_description: Some("New description".to_string()),
            ..Default::default()
        };

        assert!(detect_changes(&existing, &patch).is_empty());
    }

    #[test]
    fn test_same_value_produces_no_entry() {
        let mut existing = sample_ticket();
        existing.status = TicketStatus::InProgress;
        let patch = UpdateTicketDto {
            status: Some(TicketStatus::InProgress),
            priority: Some(TicketPriority::Urgent),
            ..Default::default()
        };

        let changes = detect_changes(&existing, &patch);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action_type, ActionType::PriorityChanged);
    }

    #[test]
    fn test_clearing_assignment_is_audited() {
        let mut existing = sample_ticket();
        existing.assigned_to = Some(Uuid::new_v4());
        let patch = UpdateTicketDto {
            assigned_to: Patch::Null,
            ..Default::default()
        };

        let changes = detect_changes(&existing, &patch);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action_type, ActionType::Assigned);
        assert!(changes[0].old_value.is_some());
        assert_eq!(changes[0].new_value, None);
    }

    #[test]
    fn test_assignment_change_prefers_note() {
        let tech = Uuid::new_v4();
        let change = assignment_change(None, tech, Some("Handing over to hardware team".into()));
        assert_eq!(change.description, "Handing over to hardware team");
        assert_eq!(change.action_type, ActionType::Assigned);
        assert_eq!(change.old_value, None);
    }
}
