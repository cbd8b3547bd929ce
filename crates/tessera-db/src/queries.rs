//! Database query functions organized by domain.

pub mod journal;
pub mod royalties;
