pub mod auth;
pub mod core;
pub mod marks;
pub mod marksheet;
pub mod students;
