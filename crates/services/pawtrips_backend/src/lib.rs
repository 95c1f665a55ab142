// --- File: crates/services/pawtrips_backend/src/lib.rs ---
pub mod app;
pub mod service_factory;

pub use app::build_router;
pub use service_factory::PawtripsServiceFactory;
