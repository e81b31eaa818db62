//! Cave worms: chains of spheres steered through a direction noise field.

use strata_blocks::Block;
use strata_geom::Vec3;

use crate::coords::{CHUNK_SIZE, ChunkPos, LocalPos};
use crate::hash;
use crate::noise::NoiseSampler;

const HEAD_SALT: u32 = 0x3c6e_f372;
/// Offsets into the direction field for the x, y and z steering samples.
const STEER_OFFSETS: [f32; 3] = [1_000.0, 2_000.0, 3_000.0];

const N: f32 = CHUNK_SIZE as f32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WormShape {
    pub step_length: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub max_segments: usize,
    pub max_chunk_distance: i32,
}

impl WormShape {
    /// Horizontal distance a worm may travel from its head before it stops.
    #[inline]
    pub fn max_horizontal(&self) -> f32 {
        self.max_chunk_distance as f32 * N
    }

    /// Chunk offsets `(horizontal, vertical)` within which a head can touch a chunk.
    pub fn chunk_reach(&self) -> (i32, i32) {
        let vertical =
            (self.max_segments as f32 * self.step_length + self.max_radius) / N;
        (self.max_chunk_distance + 1, vertical.ceil() as i32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WormSegment {
    pub center: Vec3,
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaveWorm {
    segments: Vec<WormSegment>,
}

/// Deterministic worm head for a chunk, or `None` when the chunk seeds no worm.
pub fn worm_head(seed: u32, chunk: ChunkPos, probability: f32) -> Option<Vec3> {
    let h = hash::hash3(chunk.cx, chunk.cy, chunk.cz, seed ^ HEAD_SALT);
    if hash::unit(h) >= probability {
        return None;
    }
    let o = chunk.origin();
    let local = |salt: u32| hash::unit(hash::hash3(chunk.cx, chunk.cy, chunk.cz, h ^ salt)) * N;
    Some(Vec3::new(
        o.x as f32 + local(0x01),
        o.y as f32 + local(0x02),
        o.z as f32 + local(0x03),
    ))
}

impl CaveWorm {
    /// Grows a worm from `head`. Each step follows the normalised vector of three
    /// direction samples taken at fixed offsets from the current segment; the
    /// segment radius is their mean remapped into `[min_radius, max_radius]`.
    pub fn grow(head: Vec3, direction: &NoiseSampler, shape: &WormShape) -> Self {
        let mut segments = Vec::with_capacity(shape.max_segments);
        let (_, first_radius) = steer(head, direction, shape);
        segments.push(WormSegment {
            center: head,
            radius: first_radius,
        });
        let mut current = head;
        while segments.len() < shape.max_segments {
            let (dir, _) = steer(current, direction, shape);
            let next = current + dir * shape.step_length;
            if next.horizontal_distance(head) > shape.max_horizontal() {
                break;
            }
            let (_, radius) = steer(next, direction, shape);
            segments.push(WormSegment {
                center: next,
                radius,
            });
            current = next;
        }
        Self { segments }
    }

    #[inline]
    pub fn segments(&self) -> &[WormSegment] {
        &self.segments
    }

    /// Sets every voxel of `chunk` whose centre lies inside a segment sphere to `air`.
    /// Returns the number of voxels changed.
    pub fn carve_into(&self, chunk: ChunkPos, blocks: &mut [Block], air: Block) -> usize {
        let o = chunk.origin();
        let n = CHUNK_SIZE as i32;
        let mut carved = 0;
        for seg in &self.segments {
            let r = seg.radius;
            let lo = |c: f32, base: i32| ((c - r).floor() as i32 - base).max(0);
            let hi = |c: f32, base: i32| ((c + r).ceil() as i32 - base).min(n - 1);
            let (x0, x1) = (lo(seg.center.x, o.x), hi(seg.center.x, o.x));
            let (y0, y1) = (lo(seg.center.y, o.y), hi(seg.center.y, o.y));
            let (z0, z1) = (lo(seg.center.z, o.z), hi(seg.center.z, o.z));
            if x0 > x1 || y0 > y1 || z0 > z1 {
                continue;
            }
            let r2 = r * r;
            for z in z0..=z1 {
                for y in y0..=y1 {
                    for x in x0..=x1 {
                        let c = Vec3::new(
                            (o.x + x) as f32 + 0.5,
                            (o.y + y) as f32 + 0.5,
                            (o.z + z) as f32 + 0.5,
                        );
                        if (c - seg.center).length_sq() > r2 {
                            continue;
                        }
                        let idx = LocalPos::new(x, y, z).index();
                        if blocks[idx] != air {
                            blocks[idx] = air;
                            carved += 1;
                        }
                    }
                }
            }
        }
        carved
    }
}

fn steer(p: Vec3, direction: &NoiseSampler, shape: &WormShape) -> (Vec3, f32) {
    let s = STEER_OFFSETS.map(|o| direction.sample(p.x + o, p.y + o, p.z + o));
    let mut dir = Vec3::new(s[0], s[1], s[2]).normalized();
    if dir.length_sq() == 0.0 {
        dir = Vec3::new(1.0, 0.0, 0.0);
    }
    let mean = ((s[0] + s[1] + s[2]) / 3.0).clamp(-1.0, 1.0);
    let radius = shape.min_radius + (mean + 1.0) * 0.5 * (shape.max_radius - shape.min_radius);
    (dir, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CHUNK_VOLUME;
    use crate::noise::NoiseSettings;

    fn shape() -> WormShape {
        WormShape {
            step_length: 1.5,
            min_radius: 1.5,
            max_radius: 3.5,
            max_segments: 40,
            max_chunk_distance: 2,
        }
    }

    #[test]
    fn growth_is_deterministic_and_bounded() {
        let dir = NoiseSampler::new(NoiseSettings::direction(5));
        let head = Vec3::new(3.0, 40.0, -7.0);
        let a = CaveWorm::grow(head, &dir, &shape());
        let b = CaveWorm::grow(head, &dir, &shape());
        assert_eq!(a, b);
        assert!(!a.segments().is_empty());
        assert!(a.segments().len() <= shape().max_segments);
        for seg in a.segments() {
            assert!(seg.center.horizontal_distance(head) <= shape().max_horizontal());
            assert!(seg.radius >= shape().min_radius && seg.radius <= shape().max_radius);
        }
    }

    #[test]
    fn short_horizontal_budget_stops_early() {
        let dir = NoiseSampler::new(NoiseSettings::direction(11));
        let tight = WormShape {
            max_chunk_distance: 0,
            max_segments: 100,
            ..shape()
        };
        let w = CaveWorm::grow(Vec3::new(0.0, 0.0, 0.0), &dir, &tight);
        assert!(w.segments().len() < 100);
    }

    #[test]
    fn carve_only_produces_air() {
        let stone = Block::new(1);
        let mut blocks = vec![stone; CHUNK_VOLUME];
        let worm = CaveWorm {
            segments: vec![WormSegment {
                center: Vec3::new(8.0, 8.0, 8.0),
                radius: 2.0,
            }],
        };
        let carved = worm.carve_into(ChunkPos::new(0, 0, 0), &mut blocks, Block::AIR);
        assert!(carved > 0);
        assert_eq!(blocks.iter().filter(|b| b.is_air()).count(), carved);
        assert!(blocks[LocalPos::new(7, 7, 7).index()].is_air());
        assert_eq!(blocks[LocalPos::new(0, 0, 0).index()], stone);
        // A sphere in the neighbouring chunk touches nothing here.
        let far = worm.carve_into(ChunkPos::new(3, 0, 0), &mut blocks, Block::AIR);
        assert_eq!(far, 0);
    }

    #[test]
    fn heads_respect_probability_extremes() {
        let c = ChunkPos::new(-4, 2, 9);
        assert!(worm_head(1, c, 0.0).is_none());
        let head = worm_head(1, c, 1.0).unwrap();
        let o = c.origin();
        assert!(head.x >= o.x as f32 && head.x < o.x as f32 + N);
        assert!(head.y >= o.y as f32 && head.y < o.y as f32 + N);
    }
}
