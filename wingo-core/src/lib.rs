pub mod history;
pub mod issue;
pub mod models;
pub mod simulate;
