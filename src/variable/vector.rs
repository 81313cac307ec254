//! Vector variable overlay (spec §4.2.3): when an `Array` variable is
//! tagged as a vector it additionally carries frame metadata and a
//! component→direction map, and `get` returns a `GeoVec` datum.

/// Coordinate-system kind for a vector overlay (spec §4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordKind {
    Cartesian,
    Cylindrical,
    SphericalSurface,
    Spherical,
    PlanetoCentric,
    PlanetoDetic,
    PlanetoGraphic,
}

/// Frame id, coordinate kind, component count, and component→direction map
/// of a vector-tagged `Array` variable (spec §4.2.3).
#[derive(Debug, Clone)]
pub struct VectorOverlay {
    pub frame_id: u8,
    pub kind: CoordKind,
    pub component_count: u8,
    /// Length `component_count`; each entry is the direction index (0..3)
    /// that array component `i` maps to.
    pub directions: [u8; 4],
}

impl VectorOverlay {
    pub fn new(frame_id: u8, kind: CoordKind, component_count: u8, directions: [u8; 4]) -> Self {
        VectorOverlay { frame_id, kind, component_count, directions }
    }
}
