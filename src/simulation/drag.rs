use std::collections::BTreeSet;

use log::{debug, warn};

use super::{Simulation, SimulationError};

/// Energy target held while at least one node is being dragged.
pub const DRAG_ALPHA_TARGET: f64 = 0.3;

/// Tracks active drag gestures and maps them onto pin/unpin/reheat/settle.
///
/// The first gesture to start reheats the layout; the last one to end lets it
/// cool down. Gestures on different nodes are independent.
#[derive(Clone, Debug, Default)]
pub struct DragController {
	active: BTreeSet<String>,
}

impl DragController {
	/// Create a controller with no active gestures.
	pub fn new() -> Self {
		Self::default()
	}

	/// Pin `id` where it currently is, reheating if no other drag is active.
	///
	/// Starting a drag on a node that is already being dragged only re-pins it.
	pub fn drag_start(&mut self, sim: &mut Simulation, id: &str) -> Result<(), SimulationError> {
		let (x, y) = match sim.node(id) {
			Some(node) => (node.x, node.y),
			None => return Err(SimulationError::NotFound(id.to_string())),
		};
		sim.pin(id, x, y)?;
		if self.active.is_empty() {
			sim.reheat(DRAG_ALPHA_TARGET);
		}
		self.active.insert(id.to_string());
		debug!("drag start `{}` ({} active)", id, self.active.len());
		Ok(())
	}

	/// Move the dragged node to `(x, y)`.
	pub fn drag_move(
		&mut self,
		sim: &mut Simulation,
		id: &str,
		x: f64,
		y: f64,
	) -> Result<(), SimulationError> {
		self.require_active(sim, id)?;
		sim.pin(id, x, y)
	}

	/// Release the node, letting the layout cool once no drags remain.
	pub fn drag_end(&mut self, sim: &mut Simulation, id: &str) -> Result<(), SimulationError> {
		self.require_active(sim, id)?;
		sim.unpin(id)?;
		self.active.remove(id);
		if self.active.is_empty() {
			sim.settle();
		}
		debug!("drag end `{}` ({} active)", id, self.active.len());
		Ok(())
	}

	/// End every active gesture, e.g. when the pointer leaves the canvas.
	///
	/// Gestures whose node is missing from `sim` are dropped with a warning.
	pub fn release_all(&mut self, sim: &mut Simulation) {
		let active = std::mem::take(&mut self.active);
		if active.is_empty() {
			return;
		}
		for id in &active {
			if let Err(err) = sim.unpin(id) {
				warn!("cannot release drag: {err}");
			}
		}
		sim.settle();
		debug!("released {} drags", active.len());
	}

	/// Whether `id` is currently being dragged.
	pub fn is_dragging(&self, sim: &Simulation, id: &str) -> bool {
		sim.node(id).is_some() && self.active.contains(id)
	}

	/// Number of gestures in progress.
	pub fn active_count(&self) -> usize {
		self.active.len()
	}

	fn require_active(&self, sim: &Simulation, id: &str) -> Result<(), SimulationError> {
		if sim.node(id).is_none() {
			Err(SimulationError::NotFound(id.to_string()))
		} else if !self.active.contains(id) {
			Err(SimulationError::NotDragging(id.to_string()))
		} else {
			Ok(())
		}
	}
}
