pub mod ticket_number;
pub mod token;
