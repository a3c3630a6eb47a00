pub mod filter;
pub use filter::*;

pub mod fetch_item;
pub use fetch_item::*;

pub mod fetch_query;
pub use fetch_query::*;

mod fetch_xml;

pub mod describe;
pub use describe::*;
