mod graph_fields;
mod paging;

pub use graph_fields::GraphFields;
pub use paging::PagingSettings;
