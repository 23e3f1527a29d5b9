// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canvas rendering and interaction for the flow graph.
//!
//! Features:
//! - Node rendering with input/output affordances
//! - Connection rendering (cubic curves)
//! - Drag repositioning with commit-on-release
//! - Click-to-connect between nodes
//! - Click-to-delete on connection paths
//! - Single-node selection

use crate::connection::ConnectionId;
use crate::graph::FlowGraph;
use crate::node::{Node, NodeId};
use crate::registry::NodeRegistry;
use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};

/// Node widget dimensions
const NODE_WIDTH: f32 = 200.0;
const NODE_HEIGHT: f32 = 80.0;
const NODE_HEADER_HEIGHT: f32 = 28.0;
const NODE_ROUNDING: f32 = 8.0;
const NODE_SHADOW_OFFSET: f32 = 3.0;
const PORT_RADIUS: f32 = 6.0;

/// Connection visual parameters
const EDGE_CONTROL_INSET: f32 = 100.0;
const EDGE_THICKNESS: f32 = 2.0;
const EDGE_SEGMENTS: usize = 32;
/// The clickable band around an edge is wider than the visible stroke
const EDGE_HIT_TOLERANCE: f32 = 6.0;

/// Grid parameters
const GRID_SPACING: f32 = 20.0;

/// Canvas interaction mode
#[derive(Debug, Clone, Default)]
pub enum CanvasMode {
    /// Waiting for input
    #[default]
    Idle,
    /// A node is being dragged; `delta` accumulates until release
    Dragging {
        /// The node under the pointer
        node: NodeId,
        /// Motion since drag start, not yet committed to the graph
        delta: Vec2,
    },
    /// A connection gesture is in progress from `source`'s output
    Connecting {
        /// Source node of the pending connection
        source: NodeId,
        /// Live endpoint tracking the pointer, in screen space
        cursor: Pos2,
    },
}

/// What changed during one canvas frame
#[derive(Debug, Clone, Copy, Default)]
pub struct CanvasResponse {
    /// The selected node changed
    pub selection_changed: bool,
    /// The graph was mutated (move, connect, disconnect, delete)
    pub graph_changed: bool,
}

/// Canvas editor state
#[derive(Default)]
pub struct CanvasState {
    /// Current interaction mode
    pub mode: CanvasMode,
    /// The single selected node, if any
    selected: Option<NodeId>,
}

impl CanvasState {
    /// Create a new canvas state
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected node, if any
    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    /// Clear selection and abandon any gesture in progress
    pub fn reset(&mut self) {
        self.mode = CanvasMode::Idle;
        self.selected = None;
    }

    /// Render the canvas and apply interactions to the graph
    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        graph: &mut FlowGraph,
        registry: &NodeRegistry,
    ) -> CanvasResponse {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        // Drop state referencing nodes removed by other code paths
        self.prune_stale(graph);

        let mut out = CanvasResponse::default();

        draw_grid(&painter, rect);
        self.handle_input(ui, &response, rect, graph, &mut out);
        self.draw_connections(&painter, rect, graph);
        self.draw_pending_connection(&painter, rect, graph);
        self.draw_nodes(&painter, rect, graph, registry);

        out
    }

    fn prune_stale(&mut self, graph: &FlowGraph) {
        if let Some(selected) = &self.selected {
            if graph.node(selected).is_none() {
                self.selected = None;
            }
        }
        let stale = match &self.mode {
            CanvasMode::Dragging { node, .. } => graph.node(node).is_none(),
            CanvasMode::Connecting { source, .. } => graph.node(source).is_none(),
            CanvasMode::Idle => false,
        };
        if stale {
            self.mode = CanvasMode::Idle;
        }
    }

    fn handle_input(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        rect: Rect,
        graph: &mut FlowGraph,
        out: &mut CanvasResponse,
    ) {
        let pointer = ui
            .input(|i| i.pointer.hover_pos())
            .unwrap_or(rect.min);

        match &mut self.mode {
            CanvasMode::Idle => {
                if response.drag_started_by(egui::PointerButton::Primary) {
                    if let Some(node) = self.find_node_at(pointer, rect, graph) {
                        self.set_selected(Some(node.clone()), out);
                        self.mode = CanvasMode::Dragging {
                            node,
                            delta: Vec2::ZERO,
                        };
                        return;
                    }
                }

                if response.clicked() {
                    if let Some(source) = self.find_output_port_at(pointer, rect, graph) {
                        self.mode = CanvasMode::Connecting {
                            source,
                            cursor: pointer,
                        };
                    } else if let Some(node) = self.find_node_at(pointer, rect, graph) {
                        self.set_selected(Some(node), out);
                    } else if let Some(conn) = self.find_connection_at(pointer, rect, graph) {
                        graph.disconnect(&conn);
                        out.graph_changed = true;
                    } else {
                        self.set_selected(None, out);
                    }
                }
            }

            CanvasMode::Dragging { node, delta } => {
                if response.dragged() {
                    *delta += response.drag_delta();
                }
                if response.drag_stopped() {
                    if *delta != Vec2::ZERO {
                        let (id, d) = (node.clone(), *delta);
                        graph.move_node(&id, d.x, d.y);
                        out.graph_changed = true;
                    }
                    self.mode = CanvasMode::Idle;
                }
            }

            CanvasMode::Connecting { source, cursor } => {
                *cursor = pointer;

                if response.clicked() {
                    let source = source.clone();
                    if let Some(target) = self.find_node_at(pointer, rect, graph) {
                        // Self-targets are rejected inside connect; either
                        // way the gesture ends quietly.
                        if graph.connect(&source, &target).is_ok() {
                            out.graph_changed = true;
                        }
                    }
                    self.mode = CanvasMode::Idle;
                }
            }
        }

        // Delete the selected node (and its connections) from the keyboard,
        // unless a text field owns the keyboard
        let delete_pressed = !ui.ctx().wants_keyboard_input()
            && ui.input(|i| {
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)
            });
        if delete_pressed {
            if let Some(selected) = self.selected.take() {
                if graph.remove_node(&selected).is_some() {
                    out.graph_changed = true;
                }
                out.selection_changed = true;
                self.mode = CanvasMode::Idle;
            }
        }
    }

    fn set_selected(&mut self, node: Option<NodeId>, out: &mut CanvasResponse) {
        if self.selected != node {
            self.selected = node;
            out.selection_changed = true;
        }
    }

    /// Live delta for a node: non-zero only while that node is mid-drag
    fn live_delta(&self, id: &NodeId) -> Vec2 {
        match &self.mode {
            CanvasMode::Dragging { node, delta } if node == id => *delta,
            _ => Vec2::ZERO,
        }
    }

    fn node_rect(&self, node: &Node, rect: Rect) -> Rect {
        let delta = self.live_delta(&node.id);
        let min = Pos2::new(
            rect.min.x + node.position.x + delta.x,
            rect.min.y + node.position.y + delta.y,
        );
        Rect::from_min_size(min, Vec2::new(NODE_WIDTH, NODE_HEIGHT))
    }

    /// Output anchor: right-center of the node widget
    fn output_anchor(&self, node: &Node, rect: Rect) -> Pos2 {
        self.node_rect(node, rect).right_center()
    }

    /// Input anchor: left-center of the node widget
    fn input_anchor(&self, node: &Node, rect: Rect) -> Pos2 {
        self.node_rect(node, rect).left_center()
    }

    fn find_node_at(&self, pos: Pos2, rect: Rect, graph: &FlowGraph) -> Option<NodeId> {
        // Last-added nodes draw on top, so hit test in reverse
        let nodes: Vec<&Node> = graph.nodes().collect();
        nodes
            .iter()
            .rev()
            .find(|node| self.node_rect(node, rect).contains(pos))
            .map(|node| node.id.clone())
    }

    fn find_output_port_at(&self, pos: Pos2, rect: Rect, graph: &FlowGraph) -> Option<NodeId> {
        graph
            .nodes()
            .find(|node| self.output_anchor(node, rect).distance(pos) <= PORT_RADIUS * 2.0)
            .map(|node| node.id.clone())
    }

    fn find_connection_at(
        &self,
        pos: Pos2,
        rect: Rect,
        graph: &FlowGraph,
    ) -> Option<ConnectionId> {
        for conn in graph.connections() {
            let (Some(source), Some(target)) = (graph.node(&conn.source), graph.node(&conn.target))
            else {
                continue;
            };
            let from = self.output_anchor(source, rect);
            let to = self.input_anchor(target, rect);
            let points = bezier_points(from, to, EDGE_SEGMENTS);
            let hit = points
                .windows(2)
                .any(|pair| dist_to_segment(pos, pair[0], pair[1]) <= EDGE_HIT_TOLERANCE);
            if hit {
                return Some(conn.id.clone());
            }
        }
        None
    }

    fn draw_connections(&self, painter: &egui::Painter, rect: Rect, graph: &FlowGraph) {
        let color = Color32::from_rgb(59, 130, 246);
        for conn in graph.connections() {
            let (Some(source), Some(target)) = (graph.node(&conn.source), graph.node(&conn.target))
            else {
                continue;
            };
            let from = self.output_anchor(source, rect);
            let to = self.input_anchor(target, rect);
            draw_edge(painter, from, to, color);
        }
    }

    fn draw_pending_connection(&self, painter: &egui::Painter, rect: Rect, graph: &FlowGraph) {
        let CanvasMode::Connecting { source, cursor } = &self.mode else {
            return;
        };
        let Some(node) = graph.node(source) else {
            return;
        };
        let from = self.output_anchor(node, rect);
        let stroke = Stroke::new(EDGE_THICKNESS, Color32::from_gray(120));
        painter.extend(egui::Shape::dashed_line(&[from, *cursor], stroke, 5.0, 5.0));
    }

    fn draw_nodes(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        graph: &FlowGraph,
        registry: &NodeRegistry,
    ) {
        for node in graph.nodes() {
            let node_rect = self.node_rect(node, rect);
            if !node_rect.intersects(rect) {
                continue;
            }

            let spec = registry.spec(&node.kind);
            let is_selected = self.selected.as_ref() == Some(&node.id);

            // Shadow
            let shadow_rect =
                node_rect.translate(Vec2::new(NODE_SHADOW_OFFSET, NODE_SHADOW_OFFSET));
            painter.rect_filled(
                shadow_rect,
                NODE_ROUNDING,
                Color32::from_rgba_unmultiplied(0, 0, 0, 50),
            );

            // Body
            painter.rect_filled(node_rect, NODE_ROUNDING, Color32::from_rgb(250, 250, 250));

            // Header band in the kind's color
            let header_rect = Rect::from_min_size(
                node_rect.min,
                Vec2::new(node_rect.width(), NODE_HEADER_HEIGHT),
            );
            let [r, g, b] = spec.color;
            painter.rect_filled(
                header_rect,
                egui::Rounding {
                    nw: NODE_ROUNDING,
                    ne: NODE_ROUNDING,
                    sw: 0.0,
                    se: 0.0,
                },
                Color32::from_rgb(r, g, b),
            );
            painter.text(
                header_rect.left_center() + Vec2::new(8.0, 0.0),
                egui::Align2::LEFT_CENTER,
                format!("{} {}", spec.icon, node.kind.display_label()),
                egui::FontId::proportional(13.0),
                Color32::WHITE,
            );

            // Body line: trigger sub-kind or configured-field count
            let body_text = match node.trigger {
                Some(trigger) => format!("trigger: {}", trigger.as_str()),
                None if node.data.is_empty() => String::from("not configured"),
                None => format!("{} setting(s)", node.data.len()),
            };
            painter.text(
                Pos2::new(node_rect.min.x + 10.0, node_rect.min.y + NODE_HEADER_HEIGHT + 16.0),
                egui::Align2::LEFT_CENTER,
                body_text,
                egui::FontId::proportional(11.0),
                Color32::from_gray(110),
            );

            // Selection outline
            if is_selected {
                painter.rect_stroke(
                    node_rect,
                    NODE_ROUNDING,
                    Stroke::new(2.0, Color32::from_rgb(59, 130, 246)),
                );
            } else {
                painter.rect_stroke(
                    node_rect,
                    NODE_ROUNDING,
                    Stroke::new(1.0, Color32::from_gray(200)),
                );
            }

            // Ports: input left-center, output right-center
            let port_color = Color32::from_rgb(59, 130, 246);
            painter.circle_filled(self.input_anchor(node, rect), PORT_RADIUS, port_color);
            painter.circle_stroke(
                self.input_anchor(node, rect),
                PORT_RADIUS,
                Stroke::new(1.0, Color32::WHITE),
            );
            painter.circle_filled(self.output_anchor(node, rect), PORT_RADIUS, port_color);
            painter.circle_stroke(
                self.output_anchor(node, rect),
                PORT_RADIUS,
                Stroke::new(1.0, Color32::WHITE),
            );
        }
    }
}

fn draw_grid(painter: &egui::Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_gray(245));
    let grid_color = Color32::from_rgba_unmultiplied(0, 0, 0, 18);

    let mut x = rect.left();
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            Stroke::new(1.0, grid_color),
        );
        x += GRID_SPACING;
    }

    let mut y = rect.top();
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            Stroke::new(1.0, grid_color),
        );
        y += GRID_SPACING;
    }
}

fn draw_edge(painter: &egui::Painter, from: Pos2, to: Pos2, color: Color32) {
    let points = bezier_points(from, to, EDGE_SEGMENTS);
    for pair in points.windows(2) {
        painter.line_segment([pair[0], pair[1]], Stroke::new(EDGE_THICKNESS, color));
    }

    // Arrowhead aligned with the curve's end tangent
    if let [.., prev, last] = points.as_slice() {
        let dir = (*last - *prev).normalized();
        if dir.length() > 0.0 {
            let normal = Vec2::new(-dir.y, dir.x);
            let tip = *last;
            let base = tip - dir * 10.0;
            painter.add(egui::Shape::convex_polygon(
                vec![tip, base + normal * 4.0, base - normal * 4.0],
                color,
                Stroke::NONE,
            ));
        }
    }
}

/// Sample a cubic curve between two anchors.
///
/// Control points are inset horizontally toward the midpoint, capped at a
/// fixed maximum, which keeps short edges gentle and long edges readable.
fn bezier_points(from: Pos2, to: Pos2, segments: usize) -> Vec<Pos2> {
    let inset = EDGE_CONTROL_INSET.min((to.x - from.x).abs() / 3.0);
    let ctrl1 = Pos2::new(from.x + inset, from.y);
    let ctrl2 = Pos2::new(to.x - inset, to.y);

    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * from.x + 3.0 * mt2 * t * ctrl1.x + 3.0 * mt * t2 * ctrl2.x + t3 * to.x;
        let y = mt3 * from.y + 3.0 * mt2 * t * ctrl1.y + 3.0 * mt * t2 * ctrl2.y + t3 * to.y;
        points.push(Pos2::new(x, y));
    }
    points
}

/// Shortest distance from a point to a line segment
fn dist_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn test_bezier_hits_both_anchors() {
        let from = Pos2::new(10.0, 20.0);
        let to = Pos2::new(400.0, 180.0);
        let points = bezier_points(from, to, 32);

        assert_eq!(points.len(), 33);
        assert!(points[0].distance(from) < 0.001);
        assert!(points[32].distance(to) < 0.001);
    }

    #[test]
    fn test_dist_to_segment() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert!((dist_to_segment(Pos2::new(5.0, 3.0), a, b) - 3.0).abs() < 0.001);
        // Beyond the endpoints the distance is to the nearest endpoint
        assert!((dist_to_segment(Pos2::new(14.0, 3.0), a, b) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_prune_clears_removed_selection() {
        let mut graph = FlowGraph::new();
        let id = graph.add_node(NodeKind::Transformer, None);

        let mut canvas = CanvasState::new();
        canvas.selected = Some(id.clone());
        canvas.mode = CanvasMode::Dragging {
            node: id.clone(),
            delta: Vec2::new(5.0, 5.0),
        };

        graph.remove_node(&id);
        canvas.prune_stale(&graph);

        assert!(canvas.selected().is_none());
        assert!(matches!(canvas.mode, CanvasMode::Idle));
    }
}
