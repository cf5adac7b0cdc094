mod graph_validator;

pub use graph_validator::validate_graph;
