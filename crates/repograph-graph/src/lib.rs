pub mod graph;
pub mod io;

pub use graph::{Direction, Graph};
pub use io::{graph_to_value, load_graph, save_graph, GraphMetadata};
