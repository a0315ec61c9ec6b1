/// Components per vertex in every buffer drawn by the solver.
pub const VERTEX_COMPONENTS: usize = 3;

/// The unit square, as a triangle strip.
#[rustfmt::skip]
pub static QUAD_VERTICES: [f32; 12] = [
    0.0, 0.0, 0.0,
    1.0, 0.0, 0.0,
    0.0, 1.0, 0.0,
    1.0, 1.0, 0.0,
];

/// A ring hugging the edges of the unit square, `inset` deep, as a
/// triangle strip.
pub fn boundary_ring(inset: f32) -> Vec<f32> {
    let inset = inset.clamp(0.0, 0.5);
    let outer = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let inner = [
        [inset, inset],
        [1.0 - inset, inset],
        [1.0 - inset, 1.0 - inset],
        [inset, 1.0 - inset],
    ];

    let mut vertices = Vec::with_capacity(10 * VERTEX_COMPONENTS);
    for corner in (0..4).chain(std::iter::once(0)) {
        let [ox, oy] = outer[corner];
        let [ix, iy] = inner[corner];
        vertices.extend_from_slice(&[ox, oy, 0.0, ix, iy, 0.0]);
    }
    vertices
}

/// Depth of the boundary ring, in texture coordinates, for a line `width`
/// texels wide centred on the edge of a `size`-texel field.
pub fn boundary_inset(width: f32, size: u32) -> f32 {
    0.5 * width / size as f32
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ring_is_a_closed_strip() {
        let ring = boundary_ring(0.1);
        assert_eq!(ring.len(), 10 * VERTEX_COMPONENTS);
        assert_eq!(ring[..6], ring[ring.len() - 6..]);
    }

    #[test]
    fn ring_hugs_the_edges() {
        let ring = boundary_ring(0.25);
        for vertex in ring.chunks(VERTEX_COMPONENTS) {
            let (x, y) = (vertex[0], vertex[1]);
            let on_edge = x == 0.0 || x == 1.0 || y == 0.0 || y == 1.0;
            let on_inner = x == 0.25 || x == 0.75 || y == 0.25 || y == 0.75;
            assert!(on_edge || on_inner, "({}, {})", x, y);
        }
    }

    #[test]
    fn ring_never_crosses_itself() {
        let ring = boundary_ring(3.0);
        assert!(ring.iter().all(|component| (0.0..=1.0).contains(component)));
        assert_eq!(ring[3], 0.5);
    }

    #[test]
    fn inset_is_half_the_line() {
        assert_relative_eq!(boundary_inset(64.0, 512), 0.0625, epsilon = 1e-6);
        assert_relative_eq!(boundary_inset(6.4, 512), 0.00625, epsilon = 1e-6);
    }
}
