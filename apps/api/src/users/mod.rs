//! User-facing account endpoints: identity bootstrap, settings, and the
//! cached-profile listing.

pub mod handlers;
