pub mod checker_service;
pub mod cleanup_service;
pub mod intake_service;
