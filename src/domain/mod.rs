//! Domain model: services and their step graphs, the required-data table,
//! location classification, verification value types and the ports the
//! application layer depends on.

pub mod ports;
pub mod requirements;
pub mod route;
pub mod service;
pub mod verification;
