pub mod code_sender;
pub mod media_relay;
pub mod profile_service;
pub mod verification_service;
