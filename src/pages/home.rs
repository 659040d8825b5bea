use leptos::prelude::*;
use log::error;

use crate::components::force_graph::ForceGraphCanvas;
use crate::simulation::GraphData;

const NETWORK_JSON: &str = include_str!("../../data/network.json");

/// Bundled character co-occurrence network.
fn sample_data() -> GraphData {
	GraphData::from_json(NETWORK_JSON).unwrap_or_else(|err| {
		error!("bundled graph data is invalid: {err}");
		GraphData::default()
	})
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let graph_data = Signal::derive(sample_data);

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ForceGraphCanvas data=graph_data fullscreen=true />
				<div class="graph-overlay">
					<h1>"Force-Directed Graph"</h1>
					<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::simulation::{ForceConfig, Simulation};

	#[test]
	fn bundled_network_is_valid() {
		let data = sample_data();
		assert!(!data.nodes.is_empty());
		let sim = Simulation::initialize(&data, ForceConfig::default()).unwrap();
		assert_eq!(sim.links().len(), data.links.len());
	}
}
