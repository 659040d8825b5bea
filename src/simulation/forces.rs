//! Force contributions applied on every step.
//!
//! Every force adds to node velocities, scaled by the current alpha. Positions
//! are only written by the integrator in [`super::Simulation::step`].

use serde::Deserialize;

use super::types::{Link, Node};

/// Which forces run on each step, and their parameters.
///
/// A `None` entry disables that force. The default enables all four with the
/// parameters used by the network demo.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
	/// Spring force along links.
	pub link: Option<LinkForce>,
	/// Pairwise many-body force.
	pub charge: Option<ManyBodyForce>,
	/// Pull toward a target x.
	pub x: Option<PositionForce>,
	/// Pull toward a target y.
	pub y: Option<PositionForce>,
}

impl Default for ForceConfig {
	fn default() -> Self {
		Self {
			link: Some(LinkForce::default()),
			charge: Some(ManyBodyForce::default()),
			x: Some(PositionForce::default()),
			y: Some(PositionForce::default()),
		}
	}
}

impl ForceConfig {
	/// No forces at all; nodes only coast on their velocity.
	pub fn none() -> Self {
		Self {
			link: None,
			charge: None,
			x: None,
			y: None,
		}
	}

	/// Replace the link force.
	pub fn with_link(mut self, link: LinkForce) -> Self {
		self.link = Some(link);
		self
	}

	/// Replace the many-body force.
	pub fn with_charge(mut self, charge: ManyBodyForce) -> Self {
		self.charge = Some(charge);
		self
	}

	/// Replace both centering forces with the same parameters.
	pub fn with_center(mut self, center: PositionForce) -> Self {
		self.x = Some(center.clone());
		self.y = Some(center);
		self
	}
}

/// Pulls linked nodes toward a target distance.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkForce {
	/// Rest length of every link.
	pub distance: f64,
	/// Fixed strength for every link. `None` derives it from node degree.
	pub strength: Option<f64>,
	/// Constraint passes per step.
	pub iterations: usize,
}

impl Default for LinkForce {
	fn default() -> Self {
		Self {
			distance: 30.0,
			strength: None,
			iterations: 1,
		}
	}
}

/// Repulsion (negative strength) or attraction between every pair of nodes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ManyBodyForce {
	/// Charge of each node.
	pub strength: f64,
	/// Distances below this are clamped, avoiding huge forces.
	pub distance_min: f64,
	/// Pairs farther apart than this are ignored.
	pub distance_max: f64,
}

impl Default for ManyBodyForce {
	fn default() -> Self {
		Self {
			strength: -30.0,
			distance_min: 1.0,
			distance_max: f64::INFINITY,
		}
	}
}

/// Pulls every node toward a coordinate on one axis.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PositionForce {
	/// Coordinate to pull toward.
	pub target: f64,
	/// Fraction of the remaining distance closed per step at alpha 1.
	pub strength: f64,
}

impl Default for PositionForce {
	fn default() -> Self {
		Self {
			target: 0.0,
			strength: 0.1,
		}
	}
}

/// Deterministic linear congruential generator for jiggle offsets.
#[derive(Clone, Debug)]
pub(crate) struct Lcg(u32);

impl Lcg {
	const A: u32 = 1_664_525;
	const C: u32 = 1_013_904_223;
	const M: f64 = 4_294_967_296.0;

	pub(crate) fn new(seed: u32) -> Self {
		Self(seed)
	}

	/// Uniform in [0, 1).
	pub(crate) fn next_f64(&mut self) -> f64 {
		self.0 = Self::A.wrapping_mul(self.0).wrapping_add(Self::C);
		self.0 as f64 / Self::M
	}

	/// A tiny offset used to separate coincident nodes.
	pub(crate) fn jiggle(&mut self) -> f64 {
		(self.next_f64() - 0.5) * 1e-6
	}
}

/// Per-link strength and bias, derived from endpoint degrees.
#[derive(Clone, Debug, Default)]
pub(crate) struct LinkWeights {
	strengths: Vec<f64>,
	biases: Vec<f64>,
}

impl LinkWeights {
	pub(crate) fn new(force: Option<&LinkForce>, node_count: usize, links: &[Link]) -> Self {
		let mut degree = vec![0usize; node_count];
		for link in links {
			degree[link.source] += 1;
			degree[link.target] += 1;
		}

		let fixed = force.and_then(|f| f.strength);
		let (mut strengths, mut biases) = (Vec::with_capacity(links.len()), Vec::with_capacity(links.len()));
		for link in links {
			let (ds, dt) = (degree[link.source] as f64, degree[link.target] as f64);
			strengths.push(fixed.unwrap_or(1.0 / ds.min(dt)));
			biases.push(ds / (ds + dt));
		}
		Self { strengths, biases }
	}
}

pub(crate) fn apply_link(
	force: &LinkForce,
	weights: &LinkWeights,
	nodes: &mut [Node],
	links: &[Link],
	alpha: f64,
	rng: &mut Lcg,
) {
	for _ in 0..force.iterations {
		for (i, link) in links.iter().enumerate() {
			let (s, t) = (&nodes[link.source], &nodes[link.target]);
			let mut x = t.x + t.vx - s.x - s.vx;
			if x == 0.0 {
				x = rng.jiggle();
			}
			let mut y = t.y + t.vy - s.y - s.vy;
			if y == 0.0 {
				y = rng.jiggle();
			}
			let len = x.hypot(y);
			let l = (len - force.distance) / len * alpha * weights.strengths[i];
			let (x, y) = (x * l, y * l);

			let bias = weights.biases[i];
			let target = &mut nodes[link.target];
			target.vx -= x * bias;
			target.vy -= y * bias;
			let source = &mut nodes[link.source];
			source.vx += x * (1.0 - bias);
			source.vy += y * (1.0 - bias);
		}
	}
}

/// Exact pairwise summation over all node pairs.
pub(crate) fn apply_many_body(force: &ManyBodyForce, nodes: &mut [Node], alpha: f64, rng: &mut Lcg) {
	let positions: Vec<(f64, f64)> = nodes.iter().map(|n| (n.x, n.y)).collect();
	let (min2, max2) = (
		force.distance_min * force.distance_min,
		force.distance_max * force.distance_max,
	);

	for (i, node) in nodes.iter_mut().enumerate() {
		let (nx, ny) = positions[i];
		for (j, &(ox, oy)) in positions.iter().enumerate() {
			if i == j {
				continue;
			}
			let (mut x, mut y) = (ox - nx, oy - ny);
			let mut l = x * x + y * y;
			if l >= max2 {
				continue;
			}
			if x == 0.0 {
				x = rng.jiggle();
				l += x * x;
			}
			if y == 0.0 {
				y = rng.jiggle();
				l += y * y;
			}
			if l < min2 {
				l = (min2 * l).sqrt();
			}
			let w = force.strength * alpha / l;
			node.vx += x * w;
			node.vy += y * w;
		}
	}
}

pub(crate) fn apply_x(force: &PositionForce, nodes: &mut [Node], alpha: f64) {
	for node in nodes {
		node.vx += (force.target - node.x) * force.strength * alpha;
	}
}

pub(crate) fn apply_y(force: &PositionForce, nodes: &mut [Node], alpha: f64) {
	for node in nodes {
		node.vy += (force.target - node.y) * force.strength * alpha;
	}
}

#[cfg(test)]
mod tests {
	use serde_json::Value;

	use super::*;

	fn node(index: usize, x: f64, y: f64) -> Node {
		Node {
			index,
			id: index.to_string(),
			group: Value::Null,
			x,
			y,
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
		}
	}

	fn link(index: usize, source: usize, target: usize) -> Link {
		Link {
			index,
			source,
			target,
			value: 1.0,
		}
	}

	#[test]
	fn lcg_is_deterministic_and_in_range() {
		let (mut a, mut b) = (Lcg::new(1), Lcg::new(1));
		for _ in 0..100 {
			let v = a.next_f64();
			assert_eq!(v, b.next_f64());
			assert!((0.0..1.0).contains(&v));
		}
		assert!(a.jiggle().abs() <= 0.5e-6);
	}

	#[test]
	fn link_weights_follow_degree() {
		// a - b - c: b has degree 2
		let links = vec![link(0, 0, 1), link(1, 1, 2)];
		let w = LinkWeights::new(Some(&LinkForce::default()), 3, &links);
		assert_eq!(w.strengths, vec![1.0, 1.0]);
		assert!((w.biases[0] - 1.0 / 3.0).abs() < 1e-12);
		assert!((w.biases[1] - 2.0 / 3.0).abs() < 1e-12);

		let fixed = LinkForce {
			strength: Some(0.25),
			..Default::default()
		};
		let w = LinkWeights::new(Some(&fixed), 3, &links);
		assert_eq!(w.strengths, vec![0.25, 0.25]);
	}

	#[test]
	fn stretched_link_pulls_endpoints_together() {
		let mut nodes = vec![node(0, 0.0, 0.0), node(1, 100.0, 0.0)];
		let links = vec![link(0, 0, 1)];
		let force = LinkForce::default();
		let w = LinkWeights::new(Some(&force), 2, &links);
		apply_link(&force, &w, &mut nodes, &links, 1.0, &mut Lcg::new(1));
		assert!(nodes[0].vx > 0.0);
		assert!(nodes[1].vx < 0.0);
		assert!((nodes[0].vx + nodes[1].vx).abs() < 1e-9);
	}

	#[test]
	fn compressed_link_pushes_endpoints_apart() {
		let mut nodes = vec![node(0, 0.0, 0.0), node(1, 10.0, 0.0)];
		let links = vec![link(0, 0, 1)];
		let force = LinkForce::default();
		let w = LinkWeights::new(Some(&force), 2, &links);
		apply_link(&force, &w, &mut nodes, &links, 1.0, &mut Lcg::new(1));
		assert!(nodes[0].vx < 0.0);
		assert!(nodes[1].vx > 0.0);
	}

	#[test]
	fn negative_charge_repels() {
		let mut nodes = vec![node(0, -5.0, 0.0), node(1, 5.0, 0.0)];
		apply_many_body(&ManyBodyForce::default(), &mut nodes, 1.0, &mut Lcg::new(1));
		// 30 * 10 / 100
		assert!((nodes[0].vx + 3.0).abs() < 1e-9);
		assert!((nodes[1].vx - 3.0).abs() < 1e-9);
	}

	#[test]
	fn charge_ignores_pairs_beyond_max_distance() {
		let mut nodes = vec![node(0, 0.0, 0.0), node(1, 50.0, 0.0)];
		let force = ManyBodyForce {
			distance_max: 10.0,
			..Default::default()
		};
		apply_many_body(&force, &mut nodes, 1.0, &mut Lcg::new(1));
		assert_eq!(nodes[0].vx, 0.0);
		assert_eq!(nodes[1].vx, 0.0);
	}

	#[test]
	fn coincident_nodes_are_separated() {
		let mut nodes = vec![node(0, 3.0, 3.0), node(1, 3.0, 3.0)];
		apply_many_body(&ManyBodyForce::default(), &mut nodes, 1.0, &mut Lcg::new(1));
		assert!(nodes[0].vx != 0.0 || nodes[0].vy != 0.0);
		assert!(nodes.iter().all(|n| n.vx.is_finite() && n.vy.is_finite()));
	}

	#[test]
	fn position_forces_pull_toward_target() {
		let mut nodes = vec![node(0, 10.0, -20.0)];
		let force = PositionForce::default();
		apply_x(&force, &mut nodes, 0.5);
		apply_y(&force, &mut nodes, 0.5);
		assert!((nodes[0].vx + 0.5).abs() < 1e-12);
		assert!((nodes[0].vy - 1.0).abs() < 1e-12);
	}

	#[test]
	fn force_config_deserializes_with_defaults() {
		let config: ForceConfig =
			serde_json::from_str(r#"{"link": {"distance": 50}, "charge": null}"#).unwrap();
		assert_eq!(config.link.as_ref().map(|l| l.distance), Some(50.0));
		assert_eq!(config.link.as_ref().map(|l| l.iterations), Some(1));
		assert!(config.charge.is_none());
		assert_eq!(config.x, Some(PositionForce::default()));
	}
}
