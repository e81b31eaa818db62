use std::collections::HashMap;

use strata_geom::Vec2;

/// Normalised sub-rectangle of the atlas texture; `v` grows downward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };

    #[inline]
    pub const fn new(u0: f32, v0: f32, u1: f32, v1: f32) -> Self {
        Self { u0, v0, u1, v1 }
    }

    /// Maps a unit-square coordinate into this rect.
    #[inline]
    pub fn lerp(&self, u: f32, v: f32) -> Vec2 {
        Vec2::new(
            self.u0 + u * (self.u1 - self.u0),
            self.v0 + v * (self.v1 - self.v0),
        )
    }
}

/// Texture key → UV rect lookup. Packing the image itself is the renderer's job.
#[derive(Clone, Debug)]
pub struct TextureAtlas {
    rects: HashMap<String, UvRect>,
    fallback: UvRect,
}

impl Default for TextureAtlas {
    fn default() -> Self {
        Self::new(UvRect::FULL)
    }
}

impl TextureAtlas {
    pub fn new(fallback: UvRect) -> Self {
        Self {
            rects: HashMap::new(),
            fallback,
        }
    }

    /// Lays `keys` out row-major on a uniform `columns`-wide grid.
    pub fn grid<I, S>(keys: I, columns: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let columns = columns.max(1);
        let rows = keys.len().div_ceil(columns).max(1);
        let (cw, ch) = (1.0 / columns as f32, 1.0 / rows as f32);
        let mut atlas = Self::default();
        for (i, key) in keys.into_iter().enumerate() {
            let (col, row) = ((i % columns) as f32, (i / columns) as f32);
            atlas.insert(
                key,
                UvRect::new(col * cw, row * ch, (col + 1.0) * cw, (row + 1.0) * ch),
            );
        }
        atlas
    }

    pub fn insert(&mut self, key: impl Into<String>, rect: UvRect) {
        self.rects.insert(key.into(), rect);
    }

    /// Rect for `key`, or the fallback rect when the key is unknown.
    pub fn get(&self, key: &str) -> UvRect {
        match self.rects.get(key) {
            Some(r) => *r,
            None => {
                log::trace!("texture key `{key}` missing from atlas");
                self.fallback
            }
        }
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.rects.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}
