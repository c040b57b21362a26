// src/service/lifecycle.rs
//
// The single authority over ticket mutations. Every create/update/transition
// goes through here: validate, apply the change, detect what actually
// changed, and commit the new ticket state together with its audit entries
// as one unit. Generic over the store so the state machine is testable
// without Postgres.
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::ticketdb::{NewTicket, TicketExt, TicketUpdate},
    dtos::ticketdtos::{CreateTicketDto, Patch, UpdateStatusDto, UpdateTicketDto},
    models::ticketmodel::{
        Actor, Ticket, TicketDetail, TicketHistoryWithPerformer, TicketPriority, TicketStatus,
    },
    service::{
        changes::{assignment_change, classify_status_change, detect_changes},
        error::ServiceError,
        history::NewHistoryEntry,
    },
    utils::ticket_number::mint_ticket_number,
};

const MINT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct TicketLifecycle<S> {
    store: Arc<S>,
}

impl<S: TicketExt + Send + Sync> TicketLifecycle<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create(&self, dto: CreateTicketDto) -> Result<TicketDetail, ServiceError> {
        if dto.issue_description.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Issue description is required".to_string(),
            ));
        }
        if dto.customer_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Customer name is required".to_string(),
            ));
        }

        let ticket_number = match dto.ticket_number {
            Some(number) => {
                if self.store.ticket_number_exists(&number).await? {
                    return Err(ServiceError::Validation(format!(
                        "Ticket number {} is already in use",
                        number
                    )));
                }
                number
            }
            None => self.mint_unique_number().await?,
        };

        // A free-form serial number that matches nothing leaves the ticket
        // unlinked rather than failing the request.
        let product_serial_id = match (dto.product_serial_id, &dto.serial_number) {
            (Some(id), _) => Some(id),
            (None, Some(serial)) => self.store.find_serial_by_number(serial).await?,
            (None, None) => None,
        };

        let data = NewTicket {
            id: Uuid::new_v4(),
            ticket_number,
            product_serial_id,
            issue_title: dto.issue_title,
            issue_description: dto.issue_description,
            priority: dto.priority,
            status: dto.status.unwrap_or(TicketStatus::Received),
            customer_name: dto.customer_name,
            customer_email: dto.customer_email,
            customer_phone: dto.customer_phone,
            assigned_to: dto.assigned_to,
        };

        let performer = data
            .assigned_to
            .map(Actor::User)
            .unwrap_or(Actor::System);
        let entry = NewHistoryEntry::created(data.id, performer);

        let ticket = self.store.save_ticket(data, entry).await?;

        tracing::info!(
            ticket_id = %ticket.id,
            ticket_number = %ticket.ticket_number,
            "ticket created"
        );

        self.load_detail(ticket.id).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<TicketDetail, ServiceError> {
        self.load_detail(id).await
    }

    pub async fn find_all(
        &self,
        status: Option<TicketStatus>,
        priority: Option<TicketPriority>,
    ) -> Result<Vec<TicketDetail>, ServiceError> {
        Ok(self.store.list_tickets(status, priority).await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        dto: UpdateTicketDto,
        actor: Actor,
    ) -> Result<TicketDetail, ServiceError> {
        let existing = self.get_existing(id).await?;

        let changes = detect_changes(&existing, &dto);

        let performer = match &dto.assigned_to {
            Patch::Value(assignee) => actor.or_assignee(Some(*assignee)),
            _ => actor,
        };
        let entries = changes
            .into_iter()
            .map(|change| NewHistoryEntry::from_change(id, performer, change))
            .collect();

        let update = apply_patch(&existing, dto);
        self.commit(id, update, entries).await?;

        self.load_detail(id).await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        dto: UpdateStatusDto,
        actor: Actor,
    ) -> Result<TicketDetail, ServiceError> {
        let existing = self.get_existing(id).await?;

        let mut entries = Vec::new();
        if dto.status != existing.status {
            let (action_type, generated) = classify_status_change(existing.status, dto.status);
            // A caller-supplied note overrides the generated description;
            // the action type still follows the transition table.
            let description = dto.note.unwrap_or(generated);
            entries.push(NewHistoryEntry {
                ticket_id: id,
                action_type,
                description,
                old_value: Some(existing.status.as_str().to_string()),
                new_value: Some(dto.status.as_str().to_string()),
                performed_by: actor.user_id(),
            });
        }

        let mut update = carry_forward(&existing);
        update.status = dto.status;
        update.resolved_at = resolved_at_for(&existing, dto.status);

        self.commit(id, update, entries).await?;

        self.load_detail(id).await
    }

    /// Reassignment is always audited as `assigned`, whatever the ticket's
    /// status, and even when the technician is unchanged.
    pub async fn assign_technician(
        &self,
        id: Uuid,
        technician_id: Uuid,
        note: Option<String>,
        actor: Actor,
    ) -> Result<TicketDetail, ServiceError> {
        let existing = self.get_existing(id).await?;

        let change = assignment_change(existing.assigned_to, technician_id, note);
        let entries = vec![NewHistoryEntry::from_change(id, actor, change)];

        let mut update = carry_forward(&existing);
        update.assigned_to = Some(technician_id);

        self.commit(id, update, entries).await?;

        self.load_detail(id).await
    }

    /// Delete the ticket and its history as one unit, returning the final
    /// snapshot.
    pub async fn remove(&self, id: Uuid) -> Result<TicketDetail, ServiceError> {
        let detail = self
            .store
            .get_ticket_detail(id)
            .await?
            .ok_or(ServiceError::TicketNotFound(id))?;

        self.store
            .delete_ticket(id)
            .await?
            .ok_or(ServiceError::TicketNotFound(id))?;

        tracing::info!(ticket_id = %id, "ticket deleted");

        Ok(detail)
    }

    pub async fn get_history(
        &self,
        id: Uuid,
    ) -> Result<Vec<TicketHistoryWithPerformer>, ServiceError> {
        self.get_existing(id).await?;
        Ok(self.store.get_history(id).await?)
    }

    /// Append the informational entry for a customer notification that was
    /// just dispatched. Not part of any state transition.
    pub async fn record_notification(
        &self,
        id: Uuid,
        customer_email: &str,
        actor: Actor,
    ) -> Result<(), ServiceError> {
        self.get_existing(id).await?;

        let entry = NewHistoryEntry::informational(
            id,
            actor,
            format!("Notification email sent to customer ({})", customer_email),
        );
        self.store.append_history(entry).await?;

        Ok(())
    }

    async fn get_existing(&self, id: Uuid) -> Result<Ticket, ServiceError> {
        self.store
            .get_ticket(id)
            .await?
            .ok_or(ServiceError::TicketNotFound(id))
    }

    async fn load_detail(&self, id: Uuid) -> Result<TicketDetail, ServiceError> {
        self.store
            .get_ticket_detail(id)
            .await?
            .ok_or(ServiceError::TicketNotFound(id))
    }

    async fn commit(
        &self,
        id: Uuid,
        update: TicketUpdate,
        entries: Vec<NewHistoryEntry>,
    ) -> Result<Ticket, ServiceError> {
        self.store
            .update_ticket(id, update, entries)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => ServiceError::TicketNotFound(id),
                e => ServiceError::Database(e),
            })
    }

    async fn mint_unique_number(&self) -> Result<String, ServiceError> {
        for _ in 0..MINT_ATTEMPTS {
            let candidate = mint_ticket_number();
            if !self.store.ticket_number_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Validation(
            "Could not allocate a unique ticket number".to_string(),
        ))
    }
}

/// Carry the existing row forward unchanged; callers overwrite the fields
/// their operation touches.
fn carry_forward(existing: &Ticket) -> TicketUpdate {
    TicketUpdate {
        issue_title: existing.issue_title.clone(),
        issue_description: existing.issue_description.clone(),
        priority: existing.priority,
        status: existing.status,
        customer_name: existing.customer_name.clone(),
        customer_email: existing.customer_email.clone(),
        customer_phone: existing.customer_phone.clone(),
        product_serial_id: existing.product_serial_id,
        assigned_to: existing.assigned_to,
        resolved_at: existing.resolved_at,
    }
}

/// `resolved_at` is stamped when the ticket enters `resolved` and is never
/// cleared by later transitions; the first resolution time is part of the
/// record.
fn resolved_at_for(existing: &Ticket, new_status: TicketStatus) -> Option<chrono::DateTime<Utc>> {
    if new_status == TicketStatus::Resolved && existing.status != TicketStatus::Resolved {
        Some(Utc::now())
    } else {
        existing.resolved_at
    }
}

fn apply_patch(existing: &Ticket, patch: UpdateTicketDto) -> TicketUpdate {
    let status = patch.status.unwrap_or(existing.status);

    TicketUpdate {
        issue_title: patch.issue_title.apply(existing.issue_title.clone()),
        issue_description: patch
            .issue_description
            .unwrap_or_else(|| existing.issue_description.clone()),
        priority: patch.priority.unwrap_or(existing.priority),
        status,
        customer_name: patch
            .customer_name
            .unwrap_or_else(|| existing.customer_name.clone()),
        customer_email: patch.customer_email.apply(existing.customer_email.clone()),
        customer_phone: patch.customer_phone.apply(existing.customer_phone.clone()),
        product_serial_id: patch.product_serial_id.apply(existing.product_serial_id),
        assigned_to: patch.assigned_to.apply(existing.assigned_to),
        resolved_at: resolved_at_for(existing, status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticketmodel::{ActionType, TicketHistory};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Mutex;

    /// In-memory store with the same all-or-nothing semantics as the
    /// Postgres implementation, plus failure injection for the atomicity
    /// tests.
    #[derive(Default)]
    struct MemStore {
        tickets: Mutex<HashMap<Uuid, Ticket>>,
        history: Mutex<Vec<TicketHistory>>,
        serials: Mutex<HashMap<String, Uuid>>,
        next_seq: AtomicI64,
        fail_next_update: AtomicBool,
        vanish_next_delete: AtomicBool,
    }

    impl MemStore {
        // Reads sort on seq, not insertion order, like the SQL read path.
        fn history_for(&self, ticket_id: Uuid) -> Vec<TicketHistory> {
            let mut rows: Vec<TicketHistory> = self
                .history
                .lock()
                .unwrap()
                .iter()
                .filter(|h| h.ticket_id == ticket_id)
                .cloned()
                .collect();
            rows.sort_by_key(|h| h.seq);
            rows
        }

        fn push_entry(&self, entry: NewHistoryEntry) -> TicketHistory {
            let row = TicketHistory {
                id: Uuid::new_v4(),
                seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                ticket_id: entry.ticket_id,
                action_type: entry.action_type,
                description: entry.description,
                old_value: entry.old_value,
                new_value: entry.new_value,
                performed_by: entry.performed_by,
                created_at: Utc::now(),
            };
            self.history.lock().unwrap().push(row.clone());
            row
        }
    }

    #[async_trait]
    impl TicketExt for MemStore {
        async fn ticket_number_exists(&self, ticket_number: &str) -> Result<bool, sqlx::Error> {
            Ok(self
                .tickets
                .lock()
                .unwrap()
                .values()
                .any(|t| t.ticket_number == ticket_number))
        }

        async fn find_serial_by_number(
            &self,
            serial_number: &str,
        ) -> Result<Option<Uuid>, sqlx::Error> {
            Ok(self.serials.lock().unwrap().get(serial_number).copied())
        }

        async fn save_ticket(
            &self,
            data: NewTicket,
            entry: NewHistoryEntry,
        ) -> Result<Ticket, sqlx::Error> {
            let now = Utc::now();
            let ticket = Ticket {
                id: data.id,
                ticket_number: data.ticket_number,
                product_serial_id: data.product_serial_id,
                issue_title: data.issue_title,
                issue_description: data.issue_description,
                priority: data.priority,
                status: data.status,
                customer_name: data.customer_name,
                customer_email: data.customer_email,
                customer_phone: data.customer_phone,
                assigned_to: data.assigned_to,
                created_at: now,
                updated_at: now,
                resolved_at: None,
            };
            self.tickets.lock().unwrap().insert(ticket.id, ticket.clone());
            self.push_entry(entry);
            Ok(ticket)
        }

        async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
            Ok(self.tickets.lock().unwrap().get(&id).cloned())
        }

        async fn get_ticket_detail(&self, id: Uuid) -> Result<Option<TicketDetail>, sqlx::Error> {
            let ticket = match self.tickets.lock().unwrap().get(&id).cloned() {
                Some(t) => t,
                None => return Ok(None),
            };
            let history = self
                .history_for(id)
                .into_iter()
                .map(|entry| TicketHistoryWithPerformer {
                    entry,
                    performer_name: None,
                })
                .collect();
            Ok(Some(TicketDetail {
                ticket,
                assignee: None,
                product_serial: None,
                history,
            }))
        }

        async fn list_tickets(
            &self,
            status: Option<TicketStatus>,
            priority: Option<TicketPriority>,
        ) -> Result<Vec<TicketDetail>, sqlx::Error> {
            let ids: Vec<Uuid> = self
                .tickets
                .lock()
                .unwrap()
                .values()
                .filter(|t| status.map_or(true, |s| t.status == s))
                .filter(|t| priority.map_or(true, |p| t.priority == p))
                .map(|t| t.id)
                .collect();
            let mut details = Vec::new();
            for id in ids {
                details.push(self.get_ticket_detail(id).await?.unwrap());
            }
            Ok(details)
        }

        async fn update_ticket(
            &self,
            id: Uuid,
            update: TicketUpdate,
            entries: Vec<NewHistoryEntry>,
        ) -> Result<Ticket, sqlx::Error> {
            if self.fail_next_update.swap(false, Ordering::SeqCst) {
                return Err(sqlx::Error::PoolClosed);
            }

            let mut tickets = self.tickets.lock().unwrap();
            let ticket = tickets.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;
            ticket.issue_title = update.issue_title;
            ticket.issue_description = update.issue_description;
            ticket.priority = update.priority;
            ticket.status = update.status;
            ticket.customer_name = update.customer_name;
            ticket.customer_email = update.customer_email;
            ticket.customer_phone = update.customer_phone;
            ticket.product_serial_id = update.product_serial_id;
            ticket.assigned_to = update.assigned_to;
            ticket.resolved_at = update.resolved_at;
            ticket.updated_at = Utc::now();
            let updated = ticket.clone();
            drop(tickets);

            for entry in entries {
                self.push_entry(entry);
            }
            Ok(updated)
        }

        async fn append_history(
            &self,
            entry: NewHistoryEntry,
        ) -> Result<TicketHistory, sqlx::Error> {
            Ok(self.push_entry(entry))
        }

        async fn delete_ticket(&self, id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
            if self.vanish_next_delete.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            let removed = self.tickets.lock().unwrap().remove(&id);
            if removed.is_some() {
                self.history.lock().unwrap().retain(|h| h.ticket_id != id);
            }
            Ok(removed)
        }

        async fn get_history(
            &self,
            ticket_id: Uuid,
        ) -> Result<Vec<TicketHistoryWithPerformer>, sqlx::Error> {
            Ok(self
                .history_for(ticket_id)
                .into_iter()
                .map(|entry| TicketHistoryWithPerformer {
                    entry,
                    performer_name: None,
                })
                .collect())
        }
    }

    fn lifecycle() -> (TicketLifecycle<MemStore>, Arc<MemStore>) {
        let store = Arc::new(MemStore::default());
        (TicketLifecycle::new(store.clone()), store)
    }

    fn basic_create() -> CreateTicketDto {
        CreateTicketDto {
            ticket_number: None,
            issue_title: None,
            issue_description: "Screen flicker".to_string(),
            priority: TicketPriority::Medium,
            status: None,
            product_serial_id: None,
            serial_number: None,
            customer_name: "A".to_string(),
            customer_email: None,
            customer_phone: None,
            assigned_to: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_and_created_entry() {
        let (lifecycle, _) = lifecycle();

        let detail = lifecycle.create(basic_create()).await.unwrap();
        assert_eq!(detail.ticket.status, TicketStatus::Received);
        assert_eq!(detail.history.len(), 1);
        let entry = &detail.history[0].entry;
        assert_eq!(entry.action_type, ActionType::Created);
        assert_eq!(entry.old_value, None);
        assert_eq!(entry.new_value, None);
        assert_eq!(entry.performed_by, None);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_description() {
        let (lifecycle, store) = lifecycle();

        let mut dto = basic_create();
        dto.issue_description = "  ".to_string();
        let err = lifecycle.create(dto).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(store.tickets.lock().unwrap().is_empty());
        assert!(store.history.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_mints_distinct_ticket_numbers() {
        let (lifecycle, _) = lifecycle();

        let a = lifecycle.create(basic_create()).await.unwrap();
        let b = lifecycle.create(basic_create()).await.unwrap();
        assert_ne!(a.ticket.ticket_number, b.ticket.ticket_number);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_explicit_number() {
        let (lifecycle, _) = lifecycle();

        let mut dto = basic_create();
        dto.ticket_number = Some("SR-1-AAAAA".to_string());
        lifecycle.create(dto.clone()).await.unwrap();

        let err = lifecycle.create(dto).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_resolves_serial_number() {
        let (lifecycle, store) = lifecycle();
        let serial_id = Uuid::new_v4();
        store
            .serials
            .lock()
            .unwrap()
            .insert("SN-100".to_string(), serial_id);

        let mut dto = basic_create();
        dto.serial_number = Some("SN-100".to_string());
        let detail = lifecycle.create(dto).await.unwrap();
        assert_eq!(detail.ticket.product_serial_id, Some(serial_id));

        // An unknown serial leaves the ticket unlinked.
        let mut dto = basic_create();
        dto.serial_number = Some("SN-UNKNOWN".to_string());
        let detail = lifecycle.create(dto).await.unwrap();
        assert_eq!(detail.ticket.product_serial_id, None);
    }

    #[tokio::test]
    async fn test_status_walk_through_lifecycle() {
        let (lifecycle, _) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;

        // received -> in_progress is audited as `assigned`
        let detail = lifecycle
            .update_status(
                id,
                UpdateStatusDto {
                    status: TicketStatus::InProgress,
                    note: None,
                },
                Actor::System,
            )
            .await
            .unwrap();
        assert_eq!(detail.ticket.status, TicketStatus::InProgress);
        assert_eq!(detail.history.len(), 2);
        let entry = &detail.history[1].entry;
        assert_eq!(entry.action_type, ActionType::Assigned);
        assert_eq!(entry.old_value.as_deref(), Some("received"));
        assert_eq!(entry.new_value.as_deref(), Some("in_progress"));

        // in_progress -> resolved stamps resolved_at
        let detail = lifecycle
            .update_status(
                id,
                UpdateStatusDto {
                    status: TicketStatus::Resolved,
                    note: None,
                },
                Actor::System,
            )
            .await
            .unwrap();
        assert_eq!(detail.history[2].entry.action_type, ActionType::Resolved);
        let resolved_at = detail.ticket.resolved_at.unwrap();
        assert!(resolved_at >= detail.ticket.created_at);

        // moving away from resolved keeps the timestamp
        let detail = lifecycle
            .update_status(
                id,
                UpdateStatusDto {
                    status: TicketStatus::Open,
                    note: None,
                },
                Actor::System,
            )
            .await
            .unwrap();
        assert_eq!(detail.history[3].entry.action_type, ActionType::Reopened);
        assert_eq!(detail.ticket.resolved_at, Some(resolved_at));
    }

    #[tokio::test]
    async fn test_status_note_overrides_description() {
        let (lifecycle, _) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;

        let detail = lifecycle
            .update_status(
                id,
                UpdateStatusDto {
                    status: TicketStatus::Closed,
                    note: Some("Customer confirmed fix over the phone".to_string()),
                },
                Actor::System,
            )
            .await
            .unwrap();
        let entry = &detail.history[1].entry;
        assert_eq!(entry.action_type, ActionType::Closed);
        assert_eq!(entry.description, "Customer confirmed fix over the phone");
        assert_eq!(entry.old_value.as_deref(), Some("received"));
    }

    #[tokio::test]
    async fn test_same_status_writes_no_entry() {
        let (lifecycle, _) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;

        let detail = lifecycle
            .update_status(
                id,
                UpdateStatusDto {
                    status: TicketStatus::Received,
                    note: None,
                },
                Actor::System,
            )
            .await
            .unwrap();
        assert_eq!(detail.history.len(), 1);
    }

    #[tokio::test]
    async fn test_assign_on_resolved_ticket() {
        let (lifecycle, _) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;
        lifecycle
            .update_status(
                id,
                UpdateStatusDto {
                    status: TicketStatus::Resolved,
                    note: None,
                },
                Actor::System,
            )
            .await
            .unwrap();

        let tech = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let detail = lifecycle
            .assign_technician(id, tech, None, Actor::User(actor))
            .await
            .unwrap();

        assert_eq!(detail.ticket.assigned_to, Some(tech));
        assert_eq!(detail.ticket.status, TicketStatus::Resolved);
        let entry = &detail.history.last().unwrap().entry;
        assert_eq!(entry.action_type, ActionType::Assigned);
        assert_eq!(entry.old_value, None);
        assert_eq!(entry.new_value, Some(tech.to_string()));
        assert_eq!(entry.performed_by, Some(actor));
    }

    #[tokio::test]
    async fn test_update_emits_one_entry_per_changed_dimension() {
        let (lifecycle, _) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;
        lifecycle
            .update_status(
                id,
                UpdateStatusDto {
                    status: TicketStatus::InProgress,
                    note: None,
                },
                Actor::System,
            )
            .await
            .unwrap();

        // priority changes, status does not: exactly one new entry
        let detail = lifecycle
            .update(
                id,
                UpdateTicketDto {
                    status: Some(TicketStatus::InProgress),
                    priority: Some(TicketPriority::Urgent),
                    ..Default::default()
                },
                Actor::System,
            )
            .await
            .unwrap();
        assert_eq!(detail.history.len(), 3);
        assert_eq!(
            detail.history[2].entry.action_type,
            ActionType::PriorityChanged
        );
    }

    #[tokio::test]
    async fn test_content_edit_is_silent() {
        let (lifecycle, _) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;

        let detail = lifecycle
            .update(
                id,
                UpdateTicketDto {
                    issue_description: Some("Flicker only on battery power".to_string()),
                    ..Default::default()
                },
                Actor::System,
            )
            .await
            .unwrap();
        assert_eq!(
            detail.ticket.issue_description,
            "Flicker only on battery power"
        );
        assert_eq!(detail.history.len(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_no_partial_state() {
        let (lifecycle, store) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;

        store.fail_next_update.store(true, Ordering::SeqCst);
        let err = lifecycle
            .update_status(
                id,
                UpdateStatusDto {
                    status: TicketStatus::InProgress,
                    note: None,
                },
                Actor::System,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Database(_)));

        let detail = lifecycle.find_by_id(id).await.unwrap();
        assert_eq!(detail.ticket.status, TicketStatus::Received);
        assert_eq!(detail.history.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_cascades_history() {
        let (lifecycle, _) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;

        let snapshot = lifecycle.remove(id).await.unwrap();
        assert_eq!(snapshot.ticket.id, id);

        assert!(matches!(
            lifecycle.find_by_id(id).await.unwrap_err(),
            ServiceError::TicketNotFound(_)
        ));
        assert!(matches!(
            lifecycle.get_history(id).await.unwrap_err(),
            ServiceError::TicketNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_history_replays_in_write_order() {
        let (lifecycle, _) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;

        // One update touching all three audited dimensions; the trail must
        // come back status, then priority, then assignment.
        let tech = Uuid::new_v4();
        lifecycle
            .update(
                id,
                UpdateTicketDto {
                    status: Some(TicketStatus::InProgress),
                    priority: Some(TicketPriority::Urgent),
                    assigned_to: Patch::Value(tech),
                    ..Default::default()
                },
                Actor::System,
            )
            .await
            .unwrap();

        let history = lifecycle.get_history(id).await.unwrap();
        let actions: Vec<ActionType> = history.iter().map(|h| h.entry.action_type).collect();
        assert_eq!(
            actions,
            vec![
                ActionType::Created,
                ActionType::Assigned,
                ActionType::PriorityChanged,
                ActionType::Assigned,
            ]
        );
        assert!(history.windows(2).all(|w| w[0].entry.seq < w[1].entry.seq));
    }

    #[tokio::test]
    async fn test_remove_detects_concurrent_delete() {
        let (lifecycle, store) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;

        // The row disappears between the snapshot load and the delete.
        store.vanish_next_delete.store(true, Ordering::SeqCst);
        assert!(matches!(
            lifecycle.remove(id).await.unwrap_err(),
            ServiceError::TicketNotFound(found) if found == id
        ));
    }

    #[tokio::test]
    async fn test_unknown_ticket_is_not_found() {
        let (lifecycle, _) = lifecycle();
        let missing = Uuid::new_v4();

        assert!(matches!(
            lifecycle.find_by_id(missing).await.unwrap_err(),
            ServiceError::TicketNotFound(id) if id == missing
        ));
        assert!(matches!(
            lifecycle
                .update_status(
                    missing,
                    UpdateStatusDto {
                        status: TicketStatus::Closed,
                        note: None
                    },
                    Actor::System
                )
                .await
                .unwrap_err(),
            ServiceError::TicketNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_notification_entry_is_informational() {
        let (lifecycle, _) = lifecycle();
        let id = lifecycle.create(basic_create()).await.unwrap().ticket.id;
        let actor = Uuid::new_v4();

        lifecycle
            .record_notification(id, "a@example.com", Actor::User(actor))
            .await
            .unwrap();

        let history = lifecycle.get_history(id).await.unwrap();
        let entry = &history.last().unwrap().entry;
        assert_eq!(entry.old_value, None);
        assert_eq!(entry.new_value, None);
        assert_eq!(entry.performed_by, Some(actor));
        assert!(entry.description.contains("a@example.com"));
    }
}
