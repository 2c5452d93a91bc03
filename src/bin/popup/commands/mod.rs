pub mod admin;
pub mod mission;
pub mod reward;
pub mod status;
