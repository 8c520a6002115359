//! Input validation helpers shared by the CLI and the web service.

pub mod validation;
