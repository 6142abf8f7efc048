pub mod diag;
pub mod health;
