//! Force-directed layout controller.
//!
//! [`Simulation`] owns copies of the input nodes and links, relaxes their
//! positions one [`Simulation::step`] at a time under the configured
//! [`ForceConfig`], and lets callers pin nodes in place. The energy `alpha`
//! decays toward `alpha_target` on every step; once it falls to `alpha_min`
//! with a zero target the controller is [`SimulationState::Settled`] and
//! further steps do nothing until it is reheated.
//!
//! [`DragController`] layers the pointer drag gesture on top of pin, unpin,
//! reheat and settle.

mod drag;
mod error;
mod forces;
mod types;

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;

use log::{debug, info};
use serde::Deserialize;

pub use drag::{DRAG_ALPHA_TARGET, DragController};
pub use error::SimulationError;
pub use forces::{ForceConfig, LinkForce, ManyBodyForce, PositionForce};
pub use types::{GraphData, GraphLink, GraphNode, Link, Node};

use forces::{Lcg, LinkWeights};

const INITIAL_RADIUS: f64 = 10.0;

/// Receives node and link state after every step.
///
/// Renderers read positions only; fixed positions belong to the drag protocol.
pub trait Renderer {
	/// Draw the current layout.
	fn render(&mut self, nodes: &[Node], links: &[Link]);
}

impl<F> Renderer for F
where
	F: FnMut(&[Node], &[Link]),
{
	fn render(&mut self, nodes: &[Node], links: &[Link]) {
		self(nodes, links)
	}
}

/// Energy schedule and integration parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
	/// Starting energy.
	pub alpha: f64,
	/// Energy at or below which the layout counts as settled.
	pub alpha_min: f64,
	/// Fraction of the gap to `alpha_target` closed per step.
	pub alpha_decay: f64,
	/// Fraction of velocity lost per step.
	pub velocity_decay: f64,
	/// Seed for the jiggle generator.
	pub seed: u32,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		let alpha_min = 0.001;
		Self {
			alpha: 1.0,
			alpha_min,
			// reaches alpha_min from 1 in 300 steps
			alpha_decay: 1.0 - f64::powf(alpha_min, 1.0 / 300.0),
			velocity_decay: 0.4,
			seed: 1,
		}
	}
}

/// Lifecycle of a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
	/// No step has run yet.
	Cold,
	/// Energy is above the threshold or the target is nonzero.
	Running,
	/// Energy has decayed to the threshold with a zero target.
	Settled,
}

impl fmt::Display for SimulationState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Cold => "cold",
			Self::Running => "running",
			Self::Settled => "settled",
		})
	}
}

/// The layout interaction controller.
pub struct Simulation {
	nodes: Vec<Node>,
	links: Vec<Link>,
	ids: HashMap<String, usize>,
	forces: ForceConfig,
	weights: LinkWeights,
	config: SimulationConfig,
	alpha: f64,
	alpha_target: f64,
	state: SimulationState,
	rng: Lcg,
	renderers: Vec<Box<dyn Renderer>>,
}

impl fmt::Debug for Simulation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Simulation")
			.field("nodes", &self.nodes.len())
			.field("links", &self.links.len())
			.field("alpha", &self.alpha)
			.field("alpha_target", &self.alpha_target)
			.field("state", &self.state)
			.finish_non_exhaustive()
	}
}

impl Simulation {
	/// Build a controller with the default energy schedule.
	pub fn initialize(data: &GraphData, forces: ForceConfig) -> Result<Self, SimulationError> {
		Self::with_config(data, forces, SimulationConfig::default())
	}

	/// Build a controller, copying `data` into owned records.
	///
	/// Fails if two nodes share an id or a link names an unknown node.
	pub fn with_config(
		data: &GraphData,
		forces: ForceConfig,
		config: SimulationConfig,
	) -> Result<Self, SimulationError> {
		let mut ids = HashMap::with_capacity(data.nodes.len());
		let initial_angle = PI * (3.0 - 5f64.sqrt());
		let mut nodes = Vec::with_capacity(data.nodes.len());

		for (index, input) in data.nodes.iter().enumerate() {
			if ids.insert(input.id.clone(), index).is_some() {
				return Err(SimulationError::DuplicateNode(input.id.clone()));
			}
			// phyllotaxis placement for nodes without a position
			let radius = INITIAL_RADIUS * (0.5 + index as f64).sqrt();
			let angle = index as f64 * initial_angle;
			let x = input.fx.or(input.x).unwrap_or(radius * angle.cos());
			let y = input.fy.or(input.y).unwrap_or(radius * angle.sin());
			nodes.push(Node {
				index,
				id: input.id.clone(),
				group: input.group.clone(),
				x,
				y,
				vx: 0.0,
				vy: 0.0,
				fx: input.fx,
				fy: input.fy,
			});
		}

		let mut links = Vec::with_capacity(data.links.len());
		for (index, input) in data.links.iter().enumerate() {
			let resolve = |id: &str| {
				ids.get(id).copied().ok_or_else(|| SimulationError::Configuration {
					link: index,
					id: id.to_string(),
				})
			};
			links.push(Link {
				index,
				source: resolve(input.source.as_str())?,
				target: resolve(input.target.as_str())?,
				value: input.value,
			});
		}

		let weights = LinkWeights::new(forces.link.as_ref(), nodes.len(), &links);
		info!(
			"simulation initialized with {} nodes and {} links",
			nodes.len(),
			links.len()
		);

		Ok(Self {
			nodes,
			links,
			ids,
			forces,
			weights,
			alpha: config.alpha.clamp(0.0, 1.0),
			alpha_target: 0.0,
			state: SimulationState::Cold,
			rng: Lcg::new(config.seed),
			config,
			renderers: Vec::new(),
		})
	}

	/// Advance every node by one tick, then notify renderers.
	///
	/// A settled controller does nothing and returns [`SimulationState::Settled`].
	pub fn step(&mut self) -> SimulationState {
		if self.state == SimulationState::Settled {
			return self.state;
		}

		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		let alpha = self.alpha;

		if let Some(link) = &self.forces.link {
			forces::apply_link(
				link,
				&self.weights,
				&mut self.nodes,
				&self.links,
				alpha,
				&mut self.rng,
			);
		}
		if let Some(charge) = &self.forces.charge {
			forces::apply_many_body(charge, &mut self.nodes, alpha, &mut self.rng);
		}
		if let Some(x) = &self.forces.x {
			forces::apply_x(x, &mut self.nodes, alpha);
		}
		if let Some(y) = &self.forces.y {
			forces::apply_y(y, &mut self.nodes, alpha);
		}

		let retain = 1.0 - self.config.velocity_decay;
		for node in &mut self.nodes {
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= retain;
					node.x += node.vx;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= retain;
					node.y += node.vy;
				}
			}
		}

		let next = if self.alpha_target == 0.0 && self.alpha <= self.config.alpha_min {
			SimulationState::Settled
		} else {
			SimulationState::Running
		};
		self.transition(next);

		for renderer in &mut self.renderers {
			renderer.render(&self.nodes, &self.links);
		}
		self.state
	}

	/// Register a renderer called after every step, in registration order.
	pub fn on_tick(&mut self, renderer: impl Renderer + 'static) {
		self.renderers.push(Box::new(renderer));
	}

	/// Raise the energy target, waking a settled controller.
	///
	/// Decay restarts from the current alpha toward `target`.
	pub fn reheat(&mut self, target: f64) {
		self.alpha_target = target.clamp(0.0, 1.0);
		if self.state == SimulationState::Settled && self.alpha_target > 0.0 {
			self.transition(SimulationState::Running);
		}
	}

	/// Drop the energy target to zero so the layout cools down.
	pub fn settle(&mut self) {
		self.alpha_target = 0.0;
	}

	/// Replace the current energy, waking a settled controller if it is above
	/// the threshold.
	pub fn set_alpha(&mut self, alpha: f64) {
		self.alpha = alpha.clamp(0.0, 1.0);
		if self.state == SimulationState::Settled && self.alpha > self.config.alpha_min {
			self.transition(SimulationState::Running);
		}
	}

	/// Fix a node at `(x, y)`.
	///
	/// The node is moved there immediately; velocity is left for [`Self::step`]
	/// to clear.
	pub fn pin(&mut self, id: &str, x: f64, y: f64) -> Result<(), SimulationError> {
		let node = self.node_mut(id)?;
		node.fx = Some(x);
		node.fy = Some(y);
		node.x = x;
		node.y = y;
		Ok(())
	}

	/// Release a pinned node, keeping its velocity.
	pub fn unpin(&mut self, id: &str) -> Result<(), SimulationError> {
		let node = self.node_mut(id)?;
		node.fx = None;
		node.fy = None;
		Ok(())
	}

	/// The node closest to `(x, y)`, if any lies within `radius`.
	pub fn find(&self, x: f64, y: f64, radius: Option<f64>) -> Option<&Node> {
		let mut best = radius.map_or(f64::INFINITY, |r| r * r);
		let mut found = None;
		for node in &self.nodes {
			let (dx, dy) = (x - node.x, y - node.y);
			let d2 = dx * dx + dy * dy;
			if d2 < best {
				best = d2;
				found = Some(node);
			}
		}
		found
	}

	/// All nodes in input order.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// All links in input order.
	pub fn links(&self) -> &[Link] {
		&self.links
	}

	/// Look up a node by id.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.ids.get(id).map(|&i| &self.nodes[i])
	}

	/// Index of the node with this id.
	pub fn index_of(&self, id: &str) -> Option<usize> {
		self.ids.get(id).copied()
	}

	/// Current energy.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Energy the controller is decaying toward.
	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SimulationState {
		self.state
	}

	/// Whether steps have stopped producing motion.
	pub fn is_settled(&self) -> bool {
		self.state == SimulationState::Settled
	}

	/// Energy schedule in use.
	pub fn config(&self) -> &SimulationConfig {
		&self.config
	}

	/// Forces in use.
	pub fn forces(&self) -> &ForceConfig {
		&self.forces
	}

	fn node_mut(&mut self, id: &str) -> Result<&mut Node, SimulationError> {
		match self.ids.get(id) {
			Some(&i) => Ok(&mut self.nodes[i]),
			None => Err(SimulationError::NotFound(id.to_string())),
		}
	}

	fn transition(&mut self, next: SimulationState) {
		if self.state != next {
			debug!("simulation {} -> {} (alpha {:.4})", self.state, next, self.alpha);
			self.state = next;
		}
	}
}
