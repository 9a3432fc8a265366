pub mod letter;
pub mod triage;
