use serde::{Deserialize, Serialize};

use crate::blend::BlendMode;
use crate::params::GradientParameters;

/// One surface in the multi-layer stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientLayer {
    pub id: String,
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    pub visible: bool,
    #[serde(flatten)]
    pub params: GradientParameters,
}

impl GradientLayer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            visible: true,
            params: GradientParameters::default(),
        }
    }

    pub fn set_opacity(&mut self, value: f32) {
        self.opacity = if value.is_nan() { 1.0 } else { value.clamp(0.0, 1.0) };
    }
}

/// Partial edit applied by [`LayerStack::update`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct LayerUpdate {
    pub opacity: Option<f32>,
    pub blend_mode: Option<BlendMode>,
    pub visible: Option<bool>,
    pub params: Option<GradientParameters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Toward the top of the stack (higher index, painted later).
    Up,
    /// Toward the bottom (lower index).
    Down,
}

// ---------------------------------------------------------------------------
// LayerStack
// ---------------------------------------------------------------------------

/// Ordered layers, index 0 painted first. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStack {
    layers: Vec<GradientLayer>,
    active: String,
    next_id: u64,
}

impl Default for LayerStack {
    fn default() -> Self {
        let first = GradientLayer::new("layer_1");
        Self {
            active: first.id.clone(),
            layers: vec![first],
            next_id: 2,
        }
    }
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[GradientLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false; kept for the usual `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GradientLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut GradientLayer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn active_id(&self) -> &str {
        &self.active
    }

    pub fn active(&self) -> Option<&GradientLayer> {
        self.get(&self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut GradientLayer> {
        let id = self.active.clone();
        self.get_mut(&id)
    }

    /// Returns false when `id` is not in the stack.
    pub fn set_active(&mut self, id: &str) -> bool {
        if self.position(id).is_none() {
            log::warn!("set_active: no layer {id:?}");
            return false;
        }
        self.active = id.to_string();
        true
    }

    /// Activates the layer after the active one, wrapping.
    pub fn cycle_active(&mut self) -> &str {
        let idx = self.position(&self.active).unwrap_or(0);
        self.active = self.layers[(idx + 1) % self.layers.len()].id.clone();
        &self.active
    }

    /// Appends a default layer on top and makes it active.
    pub fn add(&mut self) -> &str {
        let mut id = format!("layer_{}", self.next_id);
        self.next_id += 1;
        while self.position(&id).is_some() {
            id = format!("layer_{}", self.next_id);
            self.next_id += 1;
        }
        log::info!("added {id}");
        self.layers.push(GradientLayer::new(id.clone()));
        self.active = id;
        &self.active
    }

    /// Removes `id`. The sole remaining layer is never removed.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.layers.len() <= 1 {
            log::debug!("refusing to remove the last layer");
            return false;
        }
        let Some(idx) = self.position(id) else {
            return false;
        };
        self.layers.remove(idx);
        if self.active == id {
            self.active = self.layers[0].id.clone();
        }
        log::info!("removed {id}");
        true
    }

    pub fn update(&mut self, id: &str, update: LayerUpdate) -> bool {
        let Some(layer) = self.get_mut(id) else {
            return false;
        };
        if let Some(opacity) = update.opacity {
            layer.set_opacity(opacity);
        }
        if let Some(mode) = update.blend_mode {
            layer.blend_mode = mode;
        }
        if let Some(visible) = update.visible {
            layer.visible = visible;
        }
        if let Some(params) = update.params {
            layer.params = params.sanitized();
        }
        true
    }

    /// Swaps `id` with its neighbour. Moving past either end is a no-op.
    pub fn move_layer(&mut self, id: &str, direction: MoveDirection) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let other = match direction {
            MoveDirection::Up if idx + 1 < self.layers.len() => idx + 1,
            MoveDirection::Down if idx > 0 => idx - 1,
            _ => return false,
        };
        self.layers.swap(idx, other);
        true
    }
}
