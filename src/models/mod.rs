pub mod ticketmodel;
pub mod usermodel;
