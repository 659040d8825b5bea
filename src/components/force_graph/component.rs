use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use log::{error, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render::CanvasRenderer;
use super::state::ForceGraphState;
use crate::simulation::{ForceConfig, GraphData, Link, Node, Renderer};

/// Counts effect runs so a superseded animation loop stops rescheduling itself.
#[derive(Clone, Default)]
struct LoopGeneration(Rc<Cell<u64>>);

impl LoopGeneration {
	/// Start a new loop, invalidating every earlier ticket.
	fn restart(&self) -> LoopTicket {
		let current = self.0.get() + 1;
		self.0.set(current);
		LoopTicket {
			generation: self.clone(),
			current,
		}
	}
}

struct LoopTicket {
	generation: LoopGeneration,
	current: u64,
}

impl LoopTicket {
	fn is_current(&self) -> bool {
		self.generation.0.get() == self.current
	}
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(optional)] forces: ForceConfig,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<ForceGraphState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let frame: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
	let generation = LoopGeneration::default();
	let alive = Arc::new(AtomicBool::new(true));
	let (state_init, animate_init, resize_cb_init, alive_init) =
		(state.clone(), animate.clone(), resize_cb.clone(), alive.clone());

	on_cleanup(move || alive.store(false, Ordering::Relaxed));

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		// tear down the loop and listener of a previous run before replacing them
		let ticket = generation.restart();
		if let Some(id) = frame.take() {
			let _ = window.cancel_animation_frame(id);
		}
		if let Some(old) = resize_cb_init.borrow_mut().take() {
			let _ = window
				.remove_event_listener_with_callback("resize", old.as_ref().unchecked_ref());
		}

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => {
					error!("2d context has an unexpected type");
					return;
				}
			},
			_ => {
				error!("canvas has no 2d context");
				return;
			}
		};

		let mut graph = match ForceGraphState::new(&data.get(), forces.clone(), w, h) {
			Ok(graph) => graph,
			Err(err) => {
				error!("cannot lay out graph: {err}");
				return;
			}
		};
		let renderer = Rc::new(RefCell::new(CanvasRenderer::new(
			ctx,
			graph.viewport.clone(),
			graph.colors.clone(),
			graph.hover.clone(),
		)));
		let renderer_tick = renderer.clone();
		graph
			.simulation
			.on_tick(move |nodes: &[Node], links: &[Link]| {
				renderer_tick.borrow_mut().render(nodes, links)
			});
		*state_init.borrow_mut() = Some(graph);

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		// one step per frame until settled, then redraw only when the view changes
		let (state_anim, animate_inner, alive_anim, frame_anim) = (
			state_init.clone(),
			animate_init.clone(),
			alive_init.clone(),
			frame.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			frame_anim.set(None);
			if !alive_anim.load(Ordering::Relaxed) || !ticket.is_current() {
				return;
			}
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				if !s.simulation.is_settled() {
					s.simulation.step();
				} else if s.take_dirty() {
					renderer
						.borrow_mut()
						.render(s.simulation.nodes(), s.simulation.links());
				}
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				match win.request_animation_frame(cb.as_ref().unchecked_ref()) {
					Ok(id) => frame_anim.set(Some(id)),
					Err(_) => warn!("animation frame request failed"),
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			frame.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.pointer_up();
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.zoom(x, y, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn restarting_invalidates_earlier_loops() {
		let generation = LoopGeneration::default();
		let first = generation.restart();
		assert!(first.is_current());

		let second = generation.restart();
		assert!(!first.is_current());
		assert!(second.is_current());
	}
}
