//! API middleware. Only the access logger; requests are unauthenticated.

pub mod access;
