use thiserror::Error;

/// Errors raised by the layout controller and its drag protocol.
#[derive(Error, Debug)]
pub enum SimulationError {
	/// A link names a node id that is not part of the node set.
	#[error("link {link} references unknown node `{id}`")]
	Configuration {
		/// Position of the offending link in the input.
		link: usize,
		/// The unresolved node id.
		id: String,
	},

	/// Two input nodes share the same id.
	#[error("duplicate node id `{0}`")]
	DuplicateNode(String),

	/// No node with this id exists.
	#[error("node `{0}` not found")]
	NotFound(String),

	/// A drag move or end arrived for a node that is not being dragged.
	#[error("node `{0}` is not being dragged")]
	NotDragging(String),

	/// Graph data could not be parsed.
	#[error("failed to parse graph data: {0}")]
	Parse(#[from] serde_json::Error),
}
