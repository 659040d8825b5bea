//! Draggable force-directed network graph.
//!
//! - [`simulation`]: the layout controller. Owns node and link records, steps
//!   link, charge and centering forces under a decaying alpha, and pins nodes
//!   for the drag protocol. No browser dependency.
//! - `components::force_graph`: the canvas component. Drives one simulation
//!   step per animation frame, draws through a `Renderer`, and maps mouse
//!   events onto drag, hover, pan and zoom.
//! - `pages`: the home route with the bundled network and the 404 route.
//!
//! [`init_logging`] and [`App`] are the entry points used by `main`.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

// Modules
mod components;
mod pages;
pub mod simulation;

// Top-Level pages
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Router serving the network demo at `/` and a 404 page elsewhere.
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		// sets the document title
		<Title text="Force-Directed Graph" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
