//! Wire types for the fort query service.
//!
//! Everything here is plain serde data: inbound protocol messages, the scan request and
//! its DNF clauses, presentation records, and webhook payloads.

pub mod api;
pub mod filter;
pub mod geo;
pub mod inbound;
pub mod webhook;

pub use api::ApiGymResult;
pub use api::ApiIncident;
pub use api::ApiPokestopResult;
pub use api::ApiStationResult;
pub use api::FortScanResponse;
pub use api::GymScanResponse;
pub use api::PokestopScanResponse;
pub use api::QuestLocation;
pub use api::QuestStatus;
pub use filter::ApiFortScan;
pub use filter::DnfClause;
pub use filter::PokemonFilter;
pub use filter::RangeFilter;
pub use geo::AreaName;
pub use geo::FortType;
pub use geo::Location;
pub use inbound::InboundMessage;
pub use inbound::PokemonDisplay;
pub use webhook::ChangeType;
pub use webhook::EditType;
pub use webhook::FortChange;
pub use webhook::FortWebhook;
pub use webhook::WebhookMessage;
