pub mod fetch_service;
pub mod delivery_service;
pub mod health;
pub mod registry_service;
pub mod registry_worker;
pub mod poll_service;

pub use fetch_service::FetchService;
pub use delivery_service::{Delivery, DeliveryService};
pub use health::HealthBoard;
pub use registry_service::{RegistryService, SourceReport};
pub use registry_worker::{RegistryHandle, RegistryRequest};
pub use poll_service::{CycleReport, PollService, PollSettings};
