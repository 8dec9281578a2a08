//! Output generation.
//!
//! One RSS 2.0 feed file per program, named from the program slug
//! (`loose-joints` → `loose_joints_feed.xml`), written to the configured
//! output directory.

pub mod feed;
