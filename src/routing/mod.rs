//! Routing module
//!
//! Maps method and path to a terminal endpoint through prefix-mounted routers.

mod table;

pub use table::{Endpoint, Route, RouteMatch, RouteTable, Router};
