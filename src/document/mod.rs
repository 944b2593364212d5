pub mod format;
pub mod tree;

pub use tree::{format_float, write_atomic, ConfigTree, NodeId};

/// Node type of a craft part
pub const PART_NODE: &str = "PART";
/// Identity field of a part node
pub const PART_IDENTITY: &str = "part";
/// Node type of a part module
pub const MODULE_NODE: &str = "MODULE";
/// Identity field of a module node
pub const MODULE_IDENTITY: &str = "name";
/// Root field holding the craft's participant name
pub const SHIP_FIELD: &str = "ship";
