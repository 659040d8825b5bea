use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use log::error;
use serde_json::Value;

use crate::simulation::{DragController, ForceConfig, GraphData, Node, Simulation, SimulationError};

/// Tableau10, assigned to groups in order of first appearance.
const COLORS: &[&str] = &[
	"#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
	"#9c755f", "#bab0ab",
];

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;

/// Pan/zoom of the graph plus canvas size. Graph origin maps to `(x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub x: f64,
	pub y: f64,
	pub k: f64,
	pub width: f64,
	pub height: f64,
}

impl Viewport {
	pub fn centered(width: f64, height: f64) -> Self {
		Self {
			x: width / 2.0,
			y: height / 2.0,
			k: 1.0,
			width,
			height,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}
}

/// The node under the pointer and where on it the pointer grabbed.
#[derive(Clone, Debug)]
pub struct Grab {
	pub id: String,
	pub offset_x: f64,
	pub offset_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub viewport_start_x: f64,
	pub viewport_start_y: f64,
}

pub struct ForceGraphState {
	pub simulation: Simulation,
	pub drag: DragController,
	pub grab: Option<Grab>,
	pub pan: PanState,
	pub viewport: Rc<Cell<Viewport>>,
	pub colors: Rc<Vec<String>>,
	/// Index of the node under the pointer; its id is drawn as a label.
	pub hover: Rc<Cell<Option<usize>>>,
	dirty: bool,
}

/// Ordinal color per node, keyed on the node's group.
pub fn group_colors(nodes: &[Node]) -> Vec<String> {
	let mut seen: HashMap<String, usize> = HashMap::new();
	nodes
		.iter()
		.map(|node| {
			let key = match &node.group {
				Value::String(s) => s.clone(),
				other => other.to_string(),
			};
			let next = seen.len();
			let slot = *seen.entry(key).or_insert(next);
			COLORS[slot % COLORS.len()].to_string()
		})
		.collect()
}

impl ForceGraphState {
	pub fn new(
		data: &GraphData,
		forces: ForceConfig,
		width: f64,
		height: f64,
	) -> Result<Self, SimulationError> {
		let simulation = Simulation::initialize(data, forces)?;
		let colors = Rc::new(group_colors(simulation.nodes()));
		Ok(Self {
			simulation,
			drag: DragController::new(),
			grab: None,
			pan: PanState::default(),
			viewport: Rc::new(Cell::new(Viewport::centered(width, height))),
			colors,
			hover: Rc::new(Cell::new(None)),
			dirty: true,
		})
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<&Node> {
		let (gx, gy) = self.viewport.get().screen_to_graph(sx, sy);
		// HIT_RADIUS is in graph space, scales with zoom like nodes
		self.simulation.find(gx, gy, Some(HIT_RADIUS))
	}

	/// Start dragging the node under the pointer, or start panning.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		let (gx, gy) = self.viewport.get().screen_to_graph(sx, sy);
		let hit = self
			.node_at_position(sx, sy)
			.map(|node| (node.index, node.id.clone(), node.x - gx, node.y - gy));

		if let Some((index, id, offset_x, offset_y)) = hit {
			if let Err(err) = self.drag.drag_start(&mut self.simulation, &id) {
				error!("drag start rejected: {err}");
				return;
			}
			self.set_hover(Some(index));
			self.grab = Some(Grab {
				id,
				offset_x,
				offset_y,
			});
		} else {
			let viewport = self.viewport.get();
			self.pan = PanState {
				active: true,
				start_x: sx,
				start_y: sy,
				viewport_start_x: viewport.x,
				viewport_start_y: viewport.y,
			};
		}
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if let Some(grab) = &self.grab {
			let (gx, gy) = self.viewport.get().screen_to_graph(sx, sy);
			let (x, y) = (gx + grab.offset_x, gy + grab.offset_y);
			if let Err(err) = self.drag.drag_move(&mut self.simulation, &grab.id, x, y) {
				error!("drag move rejected: {err}");
			}
			self.dirty = true;
		} else if self.pan.active {
			let mut viewport = self.viewport.get();
			viewport.x = self.pan.viewport_start_x + (sx - self.pan.start_x);
			viewport.y = self.pan.viewport_start_y + (sy - self.pan.start_y);
			self.viewport.set(viewport);
			self.dirty = true;
		} else {
			let hovered = self.node_at_position(sx, sy).map(|node| node.index);
			self.set_hover(hovered);
		}
	}

	pub fn set_hover(&mut self, node: Option<usize>) {
		if self.hover.get() == node {
			return;
		}
		self.hover.set(node);
		self.dirty = true;
	}

	/// Id of the node under the pointer.
	pub fn hovered_id(&self) -> Option<&str> {
		let index = self.hover.get()?;
		self.simulation.nodes().get(index).map(|node| node.id.as_str())
	}

	pub fn pointer_up(&mut self) {
		if let Some(grab) = self.grab.take() {
			if let Err(err) = self.drag.drag_end(&mut self.simulation, &grab.id) {
				error!("drag end rejected: {err}");
			}
		}
		self.pan.active = false;
	}

	pub fn pointer_leave(&mut self) {
		self.grab = None;
		self.drag.release_all(&mut self.simulation);
		self.pan.active = false;
		self.set_hover(None);
	}

	/// Zoom around the pointer; positive `delta_y` zooms out.
	pub fn zoom(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let mut viewport = self.viewport.get();
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (viewport.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / viewport.k;
		viewport.x = sx - (sx - viewport.x) * ratio;
		viewport.y = sy - (sy - viewport.y) * ratio;
		viewport.k = new_k;
		self.viewport.set(viewport);
		self.dirty = true;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		let mut viewport = self.viewport.get();
		viewport.width = width;
		viewport.height = height;
		self.viewport.set(viewport);
		self.dirty = true;
	}

	/// Whether the view changed since the last call while the layout was at rest.
	pub fn take_dirty(&mut self) -> bool {
		std::mem::take(&mut self.dirty)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::simulation::{GraphLink, GraphNode, SimulationState};

	fn state() -> ForceGraphState {
		let mut data = GraphData {
			nodes: vec![
				GraphNode::new("a", "red"),
				GraphNode::new("b", "blue"),
				GraphNode::new("c", "red"),
			],
			links: vec![GraphLink::new("a", "b", 1.0)],
		};
		data.nodes[0].fx = Some(0.0);
		data.nodes[0].fy = Some(0.0);
		let mut state = ForceGraphState::new(&data, ForceConfig::default(), 200.0, 100.0).unwrap();
		state.simulation.unpin("a").unwrap();
		state
	}

	#[test]
	fn groups_share_colors_in_order_of_appearance() {
		let s = state();
		assert_eq!(s.colors[0], COLORS[0]);
		assert_eq!(s.colors[1], COLORS[1]);
		assert_eq!(s.colors[2], COLORS[0]);
	}

	#[test]
	fn numeric_and_missing_groups_get_colors() {
		let data = GraphData {
			nodes: vec![GraphNode::new("x", 3), GraphNode::new("y", Value::Null)],
			links: vec![],
		};
		let sim = Simulation::initialize(&data, ForceConfig::default()).unwrap();
		assert_eq!(group_colors(sim.nodes()), vec![COLORS[0], COLORS[1]]);
	}

	#[test]
	fn screen_center_is_graph_origin() {
		let s = state();
		assert_eq!(s.viewport.get().screen_to_graph(100.0, 50.0), (0.0, 0.0));
		assert_eq!(s.node_at_position(102.0, 51.0).map(|n| n.id.as_str()), Some("a"));
	}

	#[test]
	fn pointer_drag_drives_the_drag_protocol() {
		let mut s = state();
		s.pointer_down(101.0, 50.0);
		assert!(s.drag.is_dragging(&s.simulation, "a"));
		assert_eq!(s.simulation.alpha_target(), 0.3);

		// grabbed one unit right of center, so the node lands one unit left of the pointer
		s.pointer_move(131.0, 70.0);
		let a = s.simulation.node("a").unwrap();
		assert_eq!((a.fx, a.fy), (Some(30.0), Some(20.0)));

		s.pointer_up();
		assert!(s.grab.is_none());
		assert_eq!(s.drag.active_count(), 0);
		assert_eq!(s.simulation.alpha_target(), 0.0);
	}

	#[test]
	fn hover_tracks_the_node_under_the_pointer() {
		let mut s = state();
		s.take_dirty();
		s.pointer_move(101.0, 51.0);
		assert_eq!(s.hovered_id(), Some("a"));
		assert!(s.take_dirty());

		// same node again is not a change
		s.pointer_move(100.0, 50.0);
		assert!(!s.take_dirty());

		s.pointer_move(10.0, 10.0);
		assert_eq!(s.hovered_id(), None);
		assert!(s.take_dirty());

		s.pointer_move(100.0, 50.0);
		s.pointer_leave();
		assert_eq!(s.hover.get(), None);
	}

	#[test]
	fn dragged_node_stays_hovered() {
		let mut s = state();
		s.pointer_down(100.0, 50.0);
		assert_eq!(s.hovered_id(), Some("a"));
		s.pointer_move(180.0, 90.0);
		assert_eq!(s.hovered_id(), Some("a"));
	}

	#[test]
	fn pointer_on_background_pans() {
		let mut s = state();
		s.pointer_down(10.0, 10.0);
		assert!(s.pan.active);
		s.pointer_move(30.0, 5.0);
		let v = s.viewport.get();
		assert_eq!((v.x, v.y), (120.0, 45.0));
		s.pointer_up();
		assert!(!s.pan.active);
	}

	#[test]
	fn leaving_the_canvas_releases_drags() {
		let mut s = state();
		s.pointer_down(100.0, 50.0);
		s.pointer_leave();
		assert_eq!(s.drag.active_count(), 0);
		assert!(!s.simulation.node("a").unwrap().is_pinned());
	}

	#[test]
	fn zoom_keeps_pointer_fixed() {
		let mut s = state();
		let before = s.viewport.get().screen_to_graph(150.0, 20.0);
		s.zoom(150.0, 20.0, -1.0);
		let after = s.viewport.get().screen_to_graph(150.0, 20.0);
		assert!((before.0 - after.0).abs() < 1e-9);
		assert!((before.1 - after.1).abs() < 1e-9);
		assert!(s.viewport.get().k > 1.0);
	}

	#[test]
	fn view_changes_mark_dirty_once() {
		let mut s = state();
		assert!(s.take_dirty());
		assert!(!s.take_dirty());
		s.resize(300.0, 300.0);
		assert!(s.take_dirty());
		assert_eq!(s.simulation.state(), SimulationState::Cold);
	}
}
