use std::cell::Cell;
use std::f64::consts::PI;
use std::rc::Rc;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{NODE_RADIUS, Viewport};
use crate::simulation::{Link, Node, Renderer};

/// Draws links as grey lines and nodes as colored dots onto a 2d canvas.
pub struct CanvasRenderer {
	ctx: CanvasRenderingContext2d,
	viewport: Rc<Cell<Viewport>>,
	colors: Rc<Vec<String>>,
	hover: Rc<Cell<Option<usize>>>,
}

impl CanvasRenderer {
	pub fn new(
		ctx: CanvasRenderingContext2d,
		viewport: Rc<Cell<Viewport>>,
		colors: Rc<Vec<String>>,
		hover: Rc<Cell<Option<usize>>>,
	) -> Self {
		Self {
			ctx,
			viewport,
			colors,
			hover,
		}
	}

	fn draw_links(&self, nodes: &[Node], links: &[Link]) {
		let ctx = &self.ctx;
		ctx.set_stroke_style_str("#999");
		ctx.set_global_alpha(0.6);
		for link in links {
			let (s, t) = (&nodes[link.source], &nodes[link.target]);
			ctx.set_line_width(link.value.sqrt());
			ctx.begin_path();
			ctx.move_to(s.x, s.y);
			ctx.line_to(t.x, t.y);
			ctx.stroke();
		}
		ctx.set_global_alpha(1.0);
	}

	fn draw_nodes(&self, nodes: &[Node]) {
		let ctx = &self.ctx;
		let k = self.viewport.get().k;
		for node in nodes {
			ctx.begin_path();
			let _ = ctx.arc(node.x, node.y, NODE_RADIUS, 0.0, 2.0 * PI);
			let color = self.colors.get(node.index).map_or("#4e79a7", String::as_str);
			ctx.set_fill_style_str(color);
			ctx.fill();

			// dashed ring on pinned nodes
			if node.is_pinned() {
				let _ = ctx.set_line_dash(&js_sys::Array::of2(
					&JsValue::from_f64(2.0 / k),
					&JsValue::from_f64(2.0 / k),
				));
				ctx.set_stroke_style_str("#333");
				ctx.set_line_width(1.0 / k);
				ctx.begin_path();
				let _ = ctx.arc(node.x, node.y, NODE_RADIUS + 2.0 / k, 0.0, 2.0 * PI);
				ctx.stroke();
				let _ = ctx.set_line_dash(&js_sys::Array::new());
			}
		}
	}

	fn draw_label(&self, nodes: &[Node]) {
		let Some(node) = self.hover.get().and_then(|i| nodes.get(i)) else {
			return;
		};
		let k = self.viewport.get().k;
		let ctx = &self.ctx;
		ctx.set_fill_style_str("#333");
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(&node.id, node.x + NODE_RADIUS + 3.0, node.y + 3.0);
	}
}

impl Renderer for CanvasRenderer {
	fn render(&mut self, nodes: &[Node], links: &[Link]) {
		let viewport = self.viewport.get();
		let ctx = &self.ctx;
		ctx.set_fill_style_str("#fff");
		ctx.fill_rect(0.0, 0.0, viewport.width, viewport.height);
		ctx.save();
		let _ = ctx.translate(viewport.x, viewport.y);
		let _ = ctx.scale(viewport.k, viewport.k);
		self.draw_links(nodes, links);
		self.draw_nodes(nodes);
		self.draw_label(nodes);
		ctx.restore();
	}
}
