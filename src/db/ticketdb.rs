// src/db/ticketdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::ticketmodel::*;
use crate::service::history::NewHistoryEntry;

/// Resolved creation record; every field carries its final value by the time
/// it reaches the store.
#[derive(Debug, Clone)]
pub struct NewTicket {
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
}

/// Full post-patch column values for an update. The lifecycle applies the
/// partial patch against the loaded ticket first, so the store writes one
/// complete row instead of building dynamic SQL.
#[derive(Debug, Clone)]
pub struct TicketUpdate {
    pub issue_title: Option<String>,
    pub issue_description: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub product_serial_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait TicketExt {
    async fn ticket_number_exists(&self, ticket_number: &str) -> Result<bool, Error>;

    async fn find_serial_by_number(&self, serial_number: &str) -> Result<Option<Uuid>, Error>;

    /// Insert the ticket and its `created` history entry in one transaction.
    async fn save_ticket(&self, data: NewTicket, entry: NewHistoryEntry) -> Result<Ticket, Error>;

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, Error>;

    async fn get_ticket_detail(&self, id: Uuid) -> Result<Option<TicketDetail>, Error>;

    async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
        priority: Option<TicketPriority>,
    ) -> Result<Vec<TicketDetail>, Error>;

    /// Write the new ticket state and append the audit entries for this
    /// logical operation in one transaction; either all rows land or none.
    async fn update_ticket(
        &self,
        id: Uuid,
        update: TicketUpdate,
        entries: Vec<NewHistoryEntry>,
    ) -> Result<Ticket, Error>;

    async fn append_history(&self, entry: NewHistoryEntry) -> Result<TicketHistory, Error>;

    /// Delete the ticket; history rows go with it (ON DELETE CASCADE).
    async fn delete_ticket(&self, id: Uuid) -> Result<Option<Ticket>, Error>;

    async fn get_history(&self, ticket_id: Uuid) -> Result<Vec<TicketHistoryWithPerformer>, Error>;
}

#[derive(Debug, sqlx::FromRow)]
struct SerialRow {
    id: Uuid,
    serial_number: String,
    name: String,
    contract_id: Option<Uuid>,
}

impl DBClient {
    async fn compose_detail(&self, ticket: Ticket) -> Result<TicketDetail, Error> {
        let assignee = match ticket.assigned_to {
            Some(user_id) => {
                sqlx::query_as::<_, AssigneeSummary>(
                    r#"
                    SELECT id, name, email FROM users WHERE id = $1
                    "#,
                )
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };

        let product_serial = match ticket.product_serial_id {
            Some(serial_id) => {
                let row = sqlx::query_as::<_, SerialRow>(
                    r#"
                    SELECT id, serial_number, name, contract_id
                    FROM product_serials WHERE id = $1
                    "#,
                )
                .bind(serial_id)
                .fetch_optional(&self.pool)
                .await?;

                match row {
                    Some(row) => {
                        let contract = match row.contract_id {
                            Some(contract_id) => {
                                sqlx::query_as::<_, ContractSummary>(
                                    r#"
                                    SELECT id, contract_number, customer_name, status
                                    FROM contracts WHERE id = $1
                                    "#,
                                )
                                .bind(contract_id)
                                .fetch_optional(&self.pool)
                                .await?
                            }
                            None => None,
                        };
                        Some(ProductSerialDetail {
                            id: row.id,
                            serial_number: row.serial_number,
                            name: row.name,
                            contract,
                        })
                    }
                    None => None,
                }
            }
            None => None,
        };

        let history = self.get_history(ticket.id).await?;

        Ok(TicketDetail {
            ticket,
            assignee,
            product_serial,
            history,
        })
    }
}

#[async_trait]
impl TicketExt for DBClient {
    async fn ticket_number_exists(&self, ticket_number: &str) -> Result<bool, Error> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(SELECT 1 FROM tickets WHERE ticket_number = $1)
            "#,
        )
        .bind(ticket_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    async fn find_serial_by_number(&self, serial_number: &str) -> Result<Option<Uuid>, Error> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM product_serials WHERE serial_number = $1
            "#,
        )
        .bind(serial_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.0))
    }

    async fn save_ticket(&self, data: NewTicket, entry: NewHistoryEntry) -> Result<Ticket, Error> {
        let mut tx = self.pool.begin().await?;

        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets
                (id, ticket_number, product_serial_id, issue_title, issue_description,
                 priority, status, customer_name, customer_email, customer_phone,
                 assigned_to)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(data.id)
        .bind(&data.ticket_number)
        .bind(data.product_serial_id)
        .bind(&data.issue_title)
        .bind(&data.issue_description)
        .bind(data.priority)
        .bind(data.status)
        .bind(&data.customer_name)
        .bind(&data.customer_email)
        .bind(&data.customer_phone)
        .bind(data.assigned_to)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO ticket_history
                (ticket_id, action_type, description, old_value, new_value, performed_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.ticket_id)
        .bind(entry.action_type)
        .bind(&entry.description)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(entry.performed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ticket)
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT * FROM tickets WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn get_ticket_detail(&self, id: Uuid) -> Result<Option<TicketDetail>, Error> {
        match self.get_ticket(id).await? {
            Some(ticket) => Ok(Some(self.compose_detail(ticket).await?)),
            None => Ok(None),
        }
    }

    async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
        priority: Option<TicketPriority>,
    ) -> Result<Vec<TicketDetail>, Error> {
        let tickets = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT * FROM tickets
            WHERE ($1::ticket_status IS NULL OR status = $1)
              AND ($2::ticket_priority IS NULL OR priority = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .bind(priority)
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            details.push(self.compose_detail(ticket).await?);
        }

        Ok(details)
    }

    async fn update_ticket(
        &self,
        id: Uuid,
        update: TicketUpdate,
        entries: Vec<NewHistoryEntry>,
    ) -> Result<Ticket, Error> {
        let mut tx = self.pool.begin().await?;

        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET issue_title = $1,
                issue_description = $2,
                priority = $3,
                status = $4,
                customer_name = $5,
                customer_email = $6,
                customer_phone = $7,
                product_serial_id = $8,
                assigned_to = $9,
                resolved_at = $10,
                updated_at = NOW()
            WHERE id = $11
            RETURNING *
            "#,
        )
        .bind(&update.issue_title)
        .bind(&update.issue_description)
        .bind(update.priority)
        .bind(update.status)
        .bind(&update.customer_name)
        .bind(&update.customer_email)
        .bind(&update.customer_phone)
        .bind(update.product_serial_id)
        .bind(update.assigned_to)
        .bind(update.resolved_at)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::RowNotFound)?;

        for entry in &entries {
            sqlx::query(
                r#"
                INSERT INTO ticket_history
                    (ticket_id, action_type, description, old_value, new_value, performed_by)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(entry.ticket_id)
            .bind(entry.action_type)
            .bind(&entry.description)
            .bind(&entry.old_value)
            .bind(&entry.new_value)
            .bind(entry.performed_by)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(ticket)
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> Result<TicketHistory, Error> {
        let row = sqlx::query_as::<_, TicketHistory>(
            r#"
            INSERT INTO ticket_history
                (ticket_id, action_type, description, old_value, new_value, performed_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(entry.ticket_id)
        .bind(entry.action_type)
        .bind(&entry.description)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(entry.performed_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<Option<Ticket>, Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            DELETE FROM tickets WHERE id = $1 RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn get_history(&self, ticket_id: Uuid) -> Result<Vec<TicketHistoryWithPerformer>, Error> {
        let entries = sqlx::query_as::<_, TicketHistoryWithPerformer>(
            r#"
            SELECT
                th.*,
                u.name as performer_name
            FROM ticket_history th
            LEFT JOIN users u ON th.performed_by = u.id
            WHERE th.ticket_id = $1
            ORDER BY th.seq ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
