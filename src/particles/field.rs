//! ParticleField — drifting points, pointer repulsion, proximity links.
//!
//! One `step` + `render` per display frame. Motion is integrated with a
//! unit time step, so speed is tied to the frame rate.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::config::{Coloring, EdgeMode, FieldConfig, LinkStyle, NeighborSearch, Repulsion};
use crate::error::FxError;

use super::grid::SpatialGrid;
use super::surface::{Paint, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Particle {
    pub position: Vec2,
    /// Pixels per frame.
    pub velocity: Vec2,
    pub radius: f32,
    pub alpha: f32,
    /// Degrees; only advanced under `Coloring::Spectrum`.
    pub hue: f32,
}

/// A link between particles `a < b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub a: usize,
    pub b: usize,
    pub opacity: f32,
}

/// `min(max, floor(width / pixels_per_particle))`; 0 for unusable widths.
pub fn particle_count(width: f32, max: usize, pixels_per_particle: f32) -> usize {
    if !(width.is_finite() && width > 0.0) {
        return 0;
    }
    ((width / pixels_per_particle).floor() as usize).min(max)
}

/// Push `position` away from `pointer`. Inside the radius the particle
/// moves by `(radius - d) / radius * strength` of its offset to the pointer.
pub fn repel(position: Vec2, pointer: Vec2, repulsion: &Repulsion) -> Vec2 {
    let offset = pointer - position;
    let distance = offset.length();
    if distance < repulsion.radius {
        let force = (repulsion.radius - distance) / repulsion.radius;
        position - offset * force * repulsion.strength
    } else {
        position
    }
}

/// `opacity * (1 - d / distance)` inside the link distance, 0 outside.
pub fn link_opacity(distance: f32, style: &LinkStyle) -> f32 {
    if distance < style.distance {
        style.opacity * (1.0 - distance / style.distance)
    } else {
        0.0
    }
}

fn wrap(v: f32, extent: f32) -> f32 {
    if v >= extent {
        0.0
    } else if v < 0.0 {
        extent
    } else {
        v
    }
}

/// Uniform in `[min, max)`, or `min` when the range is empty.
fn sample(rng: &mut SmallRng, min: f32, max: f32) -> f32 {
    if max > min { rng.gen_range(min..max) } else { min }
}

#[derive(Debug, Clone)]
pub struct ParticleField {
    config: FieldConfig,
    width: f32,
    height: f32,
    particles: Vec<Particle>,
    rng: SmallRng,
}

impl ParticleField {
    /// An empty field; call `init` with the viewport size.
    pub fn new(config: FieldConfig, seed: u64) -> Result<Self, FxError> {
        config.validate()?;
        Ok(ParticleField {
            config,
            width: 0.0,
            height: 0.0,
            particles: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Particles a viewport of this width gets.
    pub fn particle_count_for(&self, width: f32) -> usize {
        let c = &self.config;
        match c.fixed_count {
            Some(n) if width.is_finite() && width > 0.0 => n.min(c.max_particles),
            Some(_) => 0,
            None => particle_count(width, c.max_particles, c.pixels_per_particle),
        }
    }

    /// Replace every particle with a fresh random one.
    pub fn init(&mut self, width: f32, height: f32) {
        self.width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        self.height = if height.is_finite() { height.max(0.0) } else { 0.0 };

        let count = self.particle_count_for(self.width);
        let c = &self.config;
        let (w, h) = (self.width, self.height);
        let spectrum = matches!(c.coloring, Coloring::Spectrum { .. });

        self.particles.clear();
        self.particles.reserve(count);
        for _ in 0..count {
            let rng = &mut self.rng;
            let position = Vec2::new(sample(rng, 0.0, w), sample(rng, 0.0, h));
            let radius = sample(rng, c.radius_min, c.radius_max);
            let velocity = Vec2::new(
                sample(rng, -c.max_speed, c.max_speed),
                sample(rng, -c.max_speed, c.max_speed),
            );
            let alpha = sample(rng, c.alpha_min, c.alpha_max);
            let hue = if spectrum { sample(rng, 0.0, 360.0) } else { 0.0 };
            self.particles.push(Particle {
                position,
                velocity,
                radius,
                alpha,
                hue,
            });
        }
    }

    /// New viewport size: existing particles are discarded.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.init(width, height);
        debug!(
            "particle field resized to {}x{} with {} particles",
            self.width,
            self.height,
            self.particles.len()
        );
    }

    /// Advance one frame. `pointer` is in surface coordinates.
    pub fn step(&mut self, pointer: Option<Vec2>) {
        let (w, h) = (self.width, self.height);
        let edge = self.config.edge;
        let repulsion = self.config.repulsion;
        let hue_step = match self.config.coloring {
            Coloring::Spectrum { hue_step, .. } => Some(hue_step),
            Coloring::Solid { .. } => None,
        };

        for p in &mut self.particles {
            p.position += p.velocity;

            if let (Some(pointer), Some(repulsion)) = (pointer, repulsion.as_ref()) {
                p.position = repel(p.position, pointer, repulsion);
            }

            match edge {
                EdgeMode::Wrap => {
                    p.position.x = wrap(p.position.x, w);
                    p.position.y = wrap(p.position.y, h);
                }
                EdgeMode::Bounce => {
                    if p.position.x < 0.0 || p.position.x > w {
                        p.velocity.x = -p.velocity.x;
                    }
                    if p.position.y < 0.0 || p.position.y > h {
                        p.velocity.y = -p.velocity.y;
                    }
                }
            }

            if let Some(step) = hue_step {
                p.hue = (p.hue + step).rem_euclid(360.0);
            }
        }
    }

    /// Every pair closer than the link distance, ordered by `(a, b)`.
    pub fn connections(&self) -> Vec<Connection> {
        let Some(style) = self.config.links else {
            return Vec::new();
        };

        let link = |a: usize, b: usize| -> Option<Connection> {
            let d = self.particles[a].position.distance(self.particles[b].position);
            (d < style.distance).then(|| Connection {
                a,
                b,
                opacity: link_opacity(d, &style),
            })
        };

        let n = self.particles.len();
        match self.config.neighbor_search {
            NeighborSearch::Pairwise => (0..n)
                .flat_map(|a| (a + 1..n).filter_map(move |b| link(a, b)))
                .collect(),
            NeighborSearch::Grid => {
                let mut grid = SpatialGrid::new(style.distance);
                grid.rebuild(self.particles.iter().map(|p| p.position));
                let mut out = Vec::new();
                for a in 0..n {
                    let mut near = grid.query_radius(self.particles[a].position, style.distance);
                    near.retain(|&b| b > a);
                    near.sort_unstable();
                    out.extend(near.into_iter().filter_map(|b| link(a, b)));
                }
                out
            }
        }
    }

    fn paint(&self, p: &Particle, alpha: f32) -> Paint {
        match self.config.coloring {
            Coloring::Solid { r, g, b } => Paint::Rgba { r, g, b, a: alpha },
            Coloring::Spectrum {
                saturation,
                lightness,
                ..
            } => Paint::Hsla {
                h: p.hue,
                s: saturation,
                l: lightness,
                a: alpha,
            },
        }
    }

    /// Clear the surface, draw every particle, then every link.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.clear_rect(0.0, 0.0, self.width, self.height);

        for p in &self.particles {
            surface.fill_disc(p.position, p.radius, self.paint(p, p.alpha));
        }

        if let Some(style) = self.config.links {
            for c in self.connections() {
                let (pa, pb) = (&self.particles[c.a], &self.particles[c.b]);
                surface.stroke_line(pa.position, pb.position, self.paint(pa, c.opacity), style.width);
            }
        }
    }

    /// One display frame: `step` then `render`.
    pub fn frame<S: Surface + ?Sized>(&mut self, pointer: Option<Vec2>, surface: &mut S) {
        self.step(pointer);
        self.render(surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::surface::{DrawCommand, DrawList};

    fn field(width: f32, height: f32) -> ParticleField {
        let mut f = ParticleField::new(FieldConfig::constellation(), 7).unwrap();
        f.init(width, height);
        f
    }

    fn still(position: Vec2, velocity: Vec2) -> Particle {
        Particle {
            position,
            velocity,
            radius: 1.0,
            alpha: 0.5,
            hue: 0.0,
        }
    }

    #[test]
    fn count_follows_viewport_width() {
        assert_eq!(field(1000.0, 800.0).len(), 100);
        assert_eq!(field(50.0, 800.0).len(), 5);
        assert_eq!(field(2000.0, 800.0).len(), 100);
        assert_eq!(field(19.9, 800.0).len(), 1);
        assert_eq!(field(9.0, 800.0).len(), 0);
        assert_eq!(field(-40.0, 800.0).len(), 0);
        assert_eq!(field(f32::NAN, 800.0).len(), 0);
    }

    #[test]
    fn init_draws_within_ranges() {
        for (w, h) in [(1000.0, 800.0), (333.0, 17.0), (640.0, 0.0)] {
            let f = field(w, h);
            for p in f.particles() {
                assert!(p.position.x >= 0.0 && p.position.x < w.max(f32::MIN_POSITIVE), "{p:?}");
                assert!(p.position.y >= 0.0 && (p.position.y < h || h == 0.0), "{p:?}");
                assert!((0.5..2.5).contains(&p.radius), "{p:?}");
                assert!((-1.0..1.0).contains(&p.velocity.x), "{p:?}");
                assert!((-1.0..1.0).contains(&p.velocity.y), "{p:?}");
                assert!((0.2..0.7).contains(&p.alpha), "{p:?}");
            }
        }
    }

    #[test]
    fn same_seed_same_field() {
        assert_eq!(field(800.0, 600.0).particles(), field(800.0, 600.0).particles());
    }

    #[test]
    fn resize_rebuilds_the_set() {
        let mut f = field(1000.0, 800.0);
        let before = f.particles().to_vec();
        f.resize(300.0, 200.0);
        assert_eq!(f.len(), 30);
        assert_eq!((f.width(), f.height()), (300.0, 200.0));
        assert!(f.particles().iter().all(|p| p.position.x < 300.0 && p.position.y < 200.0));
        assert_ne!(&before[..30], f.particles());
    }

    #[test]
    fn wraps_each_axis_independently() {
        let mut f = field(100.0, 100.0);
        f.particles = vec![
            still(Vec2::new(99.5, 50.0), Vec2::new(1.0, 0.0)),
            still(Vec2::new(0.5, 50.0), Vec2::new(-1.0, 0.0)),
            still(Vec2::new(40.0, 99.0), Vec2::new(0.5, 1.0)),
            still(Vec2::new(40.0, 0.2), Vec2::new(0.0, -0.5)),
        ];
        f.step(None);
        let pos: Vec<Vec2> = f.particles().iter().map(|p| p.position).collect();
        assert_eq!(pos[0], Vec2::new(0.0, 50.0));
        assert_eq!(pos[1], Vec2::new(100.0, 50.0));
        assert_eq!(pos[2], Vec2::new(40.5, 0.0));
        assert_eq!(pos[3], Vec2::new(40.0, 100.0));
    }

    #[test]
    fn bounce_flips_velocity_without_clamping() {
        let mut f = ParticleField::new(FieldConfig::spectrum(), 1).unwrap();
        f.init(100.0, 100.0);
        f.particles = vec![still(Vec2::new(99.5, 50.0), Vec2::new(1.0, 0.25))];
        f.step(None);
        let p = f.particles()[0];
        assert_eq!(p.position, Vec2::new(100.5, 50.25));
        assert_eq!(p.velocity, Vec2::new(-1.0, 0.25));
    }

    #[test]
    fn repulsion_only_inside_radius() {
        let rep = Repulsion::default();
        let pointer = Vec2::new(500.0, 500.0);
        for d in [100.0, 100.5, 250.0] {
            let p = pointer + Vec2::new(d, 0.0);
            assert_eq!(repel(p, pointer, &rep), p, "no push at d={d}");
        }
        assert_eq!(repel(pointer, pointer, &rep), pointer, "coincident: offset is zero");
    }

    #[test]
    fn repulsion_pushes_away_and_weakens_with_distance() {
        let rep = Repulsion::default();
        let pointer = Vec2::new(0.0, 0.0);
        let mut last_fraction = f32::INFINITY;
        for d in [1.0_f32, 10.0, 40.0, 70.0, 99.0] {
            let p = Vec2::new(d * 0.6, d * 0.8);
            let pushed = repel(p, pointer, &rep);
            let after = pushed.distance(pointer);
            assert!(after > d, "d={d}: {after} should exceed {d}");
            let fraction = (after - d) / d;
            assert!(fraction < last_fraction, "push should weaken with distance");
            last_fraction = fraction;
        }
    }

    #[test]
    fn step_applies_pointer_after_motion() {
        let mut f = field(1000.0, 1000.0);
        f.particles = vec![still(Vec2::new(500.0, 500.0), Vec2::new(10.0, 0.0))];
        let mut unperturbed = f.clone();
        f.step(Some(Vec2::new(490.0, 500.0)));
        unperturbed.step(None);
        let pointer = Vec2::new(490.0, 500.0);
        assert!(
            f.particles()[0].position.distance(pointer)
                > unperturbed.particles()[0].position.distance(pointer)
        );
        assert!((f.particles()[0].position.x - 510.48).abs() < 1e-3);
    }

    #[test]
    fn link_opacity_fades_to_zero_at_the_limit() {
        let style = LinkStyle::default();
        assert_eq!(link_opacity(150.0, &style), 0.0);
        assert_eq!(link_opacity(400.0, &style), 0.0);
        assert!((link_opacity(0.0, &style) - 0.2).abs() < 1e-7);
        let mut last = 0.0;
        for d in (0..150).rev() {
            let o = link_opacity(d as f32, &style);
            assert!(o > last, "opacity should grow as distance shrinks");
            last = o;
        }
    }

    #[test]
    fn connections_use_strict_distance() {
        let mut f = field(1000.0, 1000.0);
        f.particles = vec![
            still(Vec2::new(0.0, 0.0), Vec2::ZERO),
            still(Vec2::new(150.0, 0.0), Vec2::ZERO),
            still(Vec2::new(75.0, 0.0), Vec2::ZERO),
        ];
        let links = f.connections();
        assert_eq!(links.len(), 2);
        assert_eq!((links[0].a, links[0].b), (0, 2));
        assert_eq!((links[1].a, links[1].b), (1, 2));
        assert!((links[0].opacity - 0.1).abs() < 1e-6);
    }

    #[test]
    fn grid_search_matches_pairwise() {
        let mut pairwise = field(1200.0, 900.0);
        for _ in 0..30 {
            pairwise.step(Some(Vec2::new(600.0, 450.0)));
        }
        let mut grid = pairwise.clone();
        grid.config.neighbor_search = NeighborSearch::Grid;
        let expected = pairwise.connections();
        assert!(!expected.is_empty());
        assert_eq!(grid.connections(), expected);
    }

    #[test]
    fn render_clears_then_draws_discs_and_links() {
        let mut f = field(400.0, 300.0);
        let mut list = DrawList::new();
        f.frame(Some(Vec2::new(200.0, 150.0)), &mut list);

        let cmds = list.commands();
        assert_eq!(
            cmds[0],
            DrawCommand::Clear {
                x: 0.0,
                y: 0.0,
                width: 400.0,
                height: 300.0
            }
        );
        let discs = cmds.iter().filter(|c| matches!(c, DrawCommand::Disc { .. })).count();
        let lines = cmds.iter().filter(|c| matches!(c, DrawCommand::Line { .. })).count();
        assert_eq!(discs, 40);
        assert_eq!(lines, f.connections().len());
        assert_eq!(cmds.len(), 1 + discs + lines);
        match &cmds[1] {
            DrawCommand::Disc { fill, .. } => assert!(fill.starts_with("rgba(0, 212, 255, ")),
            other => panic!("expected a disc, got {other:?}"),
        }
    }

    #[test]
    fn empty_field_renders_only_the_clear() {
        let f = field(0.0, 0.0);
        let mut list = DrawList::new();
        f.render(&mut list);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn spectrum_field_cycles_hue_and_draws_no_links() {
        let mut f = ParticleField::new(FieldConfig::spectrum(), 3).unwrap();
        f.init(1920.0, 1080.0);
        assert_eq!(f.len(), 50);
        assert!(f.particles().iter().all(|p| p.alpha == 0.8 && (1.0..4.0).contains(&p.radius)));

        let hues: Vec<f32> = f.particles().iter().map(|p| p.hue).collect();
        let mut list = DrawList::new();
        f.frame(None, &mut list);
        for (p, h) in f.particles().iter().zip(hues) {
            let expected = (h + 1.0).rem_euclid(360.0);
            assert!((p.hue - expected).abs() < 1e-3);
        }
        assert!(list.commands().iter().all(|c| !matches!(c, DrawCommand::Line { .. })));
        match &list.commands()[1] {
            DrawCommand::Disc { fill, .. } => assert!(fill.starts_with("hsla(")),
            other => panic!("expected a disc, got {other:?}"),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = FieldConfig {
            pixels_per_particle: 0.0,
            ..FieldConfig::constellation()
        };
        assert!(matches!(ParticleField::new(config, 0), Err(FxError::Config(_))));
    }
}
