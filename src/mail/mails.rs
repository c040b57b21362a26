// src/mail/mails.rs
use super::sendmail::send_email;
use crate::models::ticketmodel::{TicketDetail, TicketStatus};

/// Send the resolution/closure notification for a ticket. The caller has
/// already checked that the ticket is in a terminal state and that a
/// customer email exists.
pub async fn send_ticket_notification(
    detail: &TicketDetail,
    to_email: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (subject, template_path) = match detail.ticket.status {
        TicketStatus::Closed => (
            "Your warranty ticket has been closed",
            "src/mail/templates/Ticket-closed.html",
        ),
        _ => (
            "Your warranty ticket has been resolved",
            "src/mail/templates/Ticket-resolved.html",
        ),
    };

    let product_line = match &detail.product_serial {
        Some(serial) => format!("{} (serial {})", serial.name, serial.serial_number),
        None => "N/A".to_string(),
    };
    let technician = detail
        .assignee
        .as_ref()
        .map(|a| a.name.clone())
        .unwrap_or_else(|| "our support team".to_string());

    let placeholders = vec![
        (
            "{{customer_name}}".to_string(),
            detail.ticket.customer_name.clone(),
        ),
        (
            "{{ticket_number}}".to_string(),
            detail.ticket.ticket_number.clone(),
        ),
        (
            "{{issue_description}}".to_string(),
            detail.ticket.issue_description.clone(),
        ),
        ("{{product}}".to_string(), product_line),
        ("{{technician}}".to_string(), technician),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}
