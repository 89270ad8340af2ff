//! HTML → records. Everything here is synchronous and pure: a page goes in,
//! owned records come out, and no parsed document outlives the call.

pub mod fixtures;
pub mod ladder;
pub mod tables;

pub use fixtures::parse_fixtures_page;
pub use ladder::{parse_ladder_page, LadderPage};
