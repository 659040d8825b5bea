use serde::Deserialize;
use serde_json::Value;

use super::error::SimulationError;

/// A node as supplied by the caller.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GraphNode {
	/// Unique identity, referenced by links.
	pub id: String,
	/// Category label, used for coloring only.
	#[serde(default)]
	pub group: Value,
	/// Optional initial position.
	#[serde(default)]
	pub x: Option<f64>,
	/// Optional initial position.
	#[serde(default)]
	pub y: Option<f64>,
	/// Optional fixed position.
	#[serde(default)]
	pub fx: Option<f64>,
	/// Optional fixed position.
	#[serde(default)]
	pub fy: Option<f64>,
}

impl GraphNode {
	/// A free node with the given id and group.
	pub fn new(id: impl Into<String>, group: impl Into<Value>) -> Self {
		Self {
			id: id.into(),
			group: group.into(),
			..Default::default()
		}
	}
}

fn default_value() -> f64 {
	1.0
}

/// A link between two node ids as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GraphLink {
	/// Source node id.
	pub source: String,
	/// Target node id.
	pub target: String,
	/// Weight, rendered as stroke width.
	#[serde(default = "default_value")]
	pub value: f64,
}

impl GraphLink {
	/// A link from `source` to `target` with the given weight.
	pub fn new(source: impl Into<String>, target: impl Into<String>, value: f64) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			value,
		}
	}
}

/// Input graph: ordered nodes and links.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GraphData {
	/// Nodes in input order.
	pub nodes: Vec<GraphNode>,
	/// Links in input order.
	#[serde(default)]
	pub links: Vec<GraphLink>,
}

impl GraphData {
	/// Parse `{"nodes": [...], "links": [...]}` JSON.
	pub fn from_json(json: &str) -> Result<Self, SimulationError> {
		Ok(serde_json::from_str(json)?)
	}
}

/// Simulation-owned node record.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	/// Position in the node list.
	pub index: usize,
	/// Identity copied from the input.
	pub id: String,
	/// Group copied from the input.
	pub group: Value,
	/// Current position.
	pub x: f64,
	/// Current position.
	pub y: f64,
	/// Current velocity.
	pub vx: f64,
	/// Current velocity.
	pub vy: f64,
	/// Fixed x; overrides `x` on every step while set.
	pub fx: Option<f64>,
	/// Fixed y; overrides `y` on every step while set.
	pub fy: Option<f64>,
}

impl Node {
	/// Whether either axis is fixed.
	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}
}

/// Simulation-owned link record with resolved endpoints.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
	/// Position in the link list.
	pub index: usize,
	/// Index of the source node.
	pub source: usize,
	/// Index of the target node.
	pub target: usize,
	/// Weight copied from the input.
	pub value: f64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_graph_json() {
		let data = GraphData::from_json(
			r#"{
				"nodes": [{"id": "a", "group": 1}, {"id": "b", "group": "team"}],
				"links": [{"source": "a", "target": "b"}]
			}"#,
		)
		.unwrap();
		assert_eq!(data.nodes.len(), 2);
		assert_eq!(data.nodes[0].group, Value::from(1));
		assert_eq!(data.nodes[1].group, Value::from("team"));
		assert_eq!(data.links[0].value, 1.0);
	}

	#[test]
	fn missing_links_default_to_empty() {
		let data = GraphData::from_json(r#"{"nodes": [{"id": "solo"}]}"#).unwrap();
		assert!(data.links.is_empty());
		assert_eq!(data.nodes[0].group, Value::Null);
	}

	#[test]
	fn malformed_json_is_a_parse_error() {
		let err = GraphData::from_json("{\"nodes\": [").unwrap_err();
		assert!(matches!(err, SimulationError::Parse(_)));
	}
}
