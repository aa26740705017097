//! Raw records as delivered by the two upstream feeds.
//!
//! Everything here is deserialized leniently; see [`lenient`].

pub mod detail;
pub mod lenient;
pub mod mls;

pub use detail::{AddressParts, AddressValue, CompStub, PropertyDetailRecord, SchoolRecord};
pub use mls::{HomeDetails, MlsMedia, MlsPhoto, MlsRecord, PriceChange, PriceDirection, StatusChange};
