//! # Render Passes
//!
//! Read-only passes that turn scene objects into draw calls on an external
//! [`GraphicsBackend`]. Nothing here mutates the scene; the passes only need
//! the read side of the scene lock.
//!
//! ```text
//!  Scene (read guard)                Renderer                 Backend
//!  ──────────────────               ────────                 ───────
//!  particles ─┐
//!             ├─ world transform ─► queue ─► sort by layer ─► draw_sprite
//!  entities ──┘
//!  bounds ────── world rect ──────────────────────────────► draw_rect
//! ```

use vframe_core::{Bound, Entity, Handle, Particle, ShapeId, TextureId};
use vframe_shared::{Color, Rect, Vector};

use crate::scene::Scene;

/// One textured shape, ready to draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    /// Object the sprite was built from.
    pub source: Handle,
    /// Backend shape.
    pub shape: ShapeId,
    /// Backend texture.
    pub texture: TextureId,
    /// Color multiplied into the texture.
    pub bias: Color,
    /// World position.
    pub position: Vector,
    /// World rotation in radians.
    pub rotation: f32,
    /// World scale.
    pub scale: f32,
    /// Draw layer.
    pub layer: i32,
}

/// The drawing side the scene renders into.
///
/// Shapes and textures are owned by the backend; the scene only stores ids.
pub trait GraphicsBackend {
    /// Draws a textured shape.
    fn draw_sprite(&mut self, sprite: &Sprite);

    /// Draws a rectangle outline, used for bound debugging.
    fn draw_rect(&mut self, rect: Rect, color: Color);
}

/// Counts from the last pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Draw calls issued.
    pub drawn: usize,
    /// Inactive objects passed over.
    pub skipped: usize,
    /// Objects whose transform no longer resolves.
    pub orphaned: usize,
}

/// Draw-call builder. Keeps its sort queue between frames.
pub struct Renderer {
    queue: Vec<Sprite>,
    bound_color: Color,
    stats: RenderStats,
}

impl Renderer {
    /// Creates a renderer drawing bounds in green.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            bound_color: Color::new(0, 255, 0, 255),
            stats: RenderStats::default(),
        }
    }

    /// Sets the outline color of [`render_bounds`](Self::render_bounds).
    #[must_use]
    pub const fn with_bound_color(mut self, color: Color) -> Self {
        self.bound_color = color;
        self
    }

    /// Counts from the last pass.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Draws every active particle, lowest layer first. Returns draw calls.
    pub fn render_particles<B: GraphicsBackend + ?Sized>(
        &mut self,
        scene: &Scene,
        backend: &mut B,
    ) -> usize {
        self.begin();
        for (handle, particle) in scene.iter::<Particle>() {
            if !particle.is_active() {
                self.stats.skipped += 1;
                continue;
            }
            self.enqueue(
                scene,
                handle,
                particle.transform,
                (particle.shape, particle.texture, particle.bias, particle.layer),
            );
        }
        self.flush(backend)
    }

    /// Draws every active entity, lowest layer first. Returns draw calls.
    pub fn render_entities<B: GraphicsBackend + ?Sized>(
        &mut self,
        scene: &Scene,
        backend: &mut B,
    ) -> usize {
        self.begin();
        for (handle, entity) in scene.iter::<Entity>() {
            if !entity.is_active() {
                self.stats.skipped += 1;
                continue;
            }
            self.enqueue(
                scene,
                handle,
                entity.transform,
                (entity.shape, entity.texture, entity.bias, entity.layer),
            );
        }
        self.flush(backend)
    }

    /// Outlines every active bound in world space. Returns draw calls.
    pub fn render_bounds<B: GraphicsBackend + ?Sized>(
        &mut self,
        scene: &Scene,
        backend: &mut B,
    ) -> usize {
        self.begin();
        for (handle, bound) in scene.iter::<Bound>() {
            if !bound.is_active() {
                self.stats.skipped += 1;
                continue;
            }
            match scene.bound_rect(handle) {
                Ok(rect) => {
                    backend.draw_rect(rect, self.bound_color);
                    self.stats.drawn += 1;
                }
                Err(_) => self.stats.orphaned += 1,
            }
        }
        self.stats.drawn
    }

    fn begin(&mut self) {
        self.queue.clear();
        self.stats = RenderStats::default();
    }

    fn enqueue(
        &mut self,
        scene: &Scene,
        source: Handle,
        transform: Handle,
        (shape, texture, bias, layer): (ShapeId, TextureId, Color, i32),
    ) {
        let Ok(world) = scene.world_transform(transform) else {
            self.stats.orphaned += 1;
            return;
        };
        self.queue.push(Sprite {
            source,
            shape,
            texture,
            bias,
            position: world.position,
            rotation: world.rotation,
            scale: world.scale,
            layer,
        });
    }

    fn flush<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        self.queue.sort_by_key(|sprite| sprite.layer);
        for sprite in &self.queue {
            backend.draw_sprite(sprite);
        }
        self.stats.drawn = self.queue.len();
        self.stats.drawn
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
