pub mod search;
mod registry;

pub use registry::{Tool, ToolRegistry};
pub use search::{search_arguments, SearchArgs, SearchTool, TOOL_SEARCH};
