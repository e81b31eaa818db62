//! Integer hashes backing every deterministic per-position choice in generation.

#[inline]
fn mix(mut v: u32) -> u32 {
    v ^= v >> 16;
    v = v.wrapping_mul(0x7feb_352d);
    v ^= v >> 15;
    v = v.wrapping_mul(0x846c_a68b);
    v ^= v >> 16;
    v
}

pub(crate) fn hash3(x: i32, y: i32, z: i32, seed: u32) -> u32 {
    let mut h = seed ^ 0x9e37_79b9;
    h ^= mix((x as u32).wrapping_add(0x85eb_ca6b));
    h ^= mix((y as u32).wrapping_add(0xc2b2_ae35));
    h ^= mix((z as u32).wrapping_add(0x27d4_eb2f));
    mix(h)
}

pub(crate) fn hash2(x: i32, z: i32, seed: u32) -> u32 {
    let h = (x as u32).wrapping_mul(0x85eb_ca6b)
        ^ (z as u32).wrapping_mul(0xc2b2_ae35)
        ^ seed.wrapping_mul(0x27d4_eb2d);
    mix(h)
}

/// Uniform value in `[0, 1)` from a hash.
#[inline]
pub(crate) fn unit(h: u32) -> f32 {
    (h & 0x00FF_FFFF) as f32 / 16_777_216.0
}

/// Integer in `[-amp, amp]` from a hash.
#[inline]
pub(crate) fn signed(h: u32, amp: i32) -> i32 {
    if amp <= 0 {
        return 0;
    }
    (h % (2 * amp as u32 + 1)) as i32 - amp
}
