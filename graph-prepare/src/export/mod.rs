mod save_all;
mod save_graphml;
mod save_json;

pub use save_all::{PersistSummary, TimingsMs, save_all};
pub use save_graphml::write_graphml;
pub use save_json::{write_graph_jsonl, write_nodes_jsonl};
