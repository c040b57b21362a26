pub mod changes;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod view;
