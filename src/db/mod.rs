pub mod db;
pub mod ticketdb;
pub mod userdb;
