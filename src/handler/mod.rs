pub mod portal;
pub mod tickets;
