// Pure rules
pub mod asset_generation;
pub mod pricing;
pub mod receipt;
pub mod state_machine;

// Persistence helpers shared by commands
pub mod audit;
pub mod categories;

// Entry points used by the HTTP layer
pub mod assets;
pub mod procurement;
