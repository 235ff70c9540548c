//! Canopy Message Routing
//!
//! Role-aware forwarding of application packets along the tree:
//! - Readings and acknowledgements travel up to the parent
//! - Actuator commands flood down to every child
//! - Mobile light probes bounce between terminal and light sensor
//! - The gateway surfaces what reaches the root

pub mod router;

pub use router::{Router, RouterStats};
