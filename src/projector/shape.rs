use crate::Float;

/// Width of the deposition window along one axis. A quadratic shape
/// touches 3 nodes, and the particle can move at most one cell either way
/// during a step, so 5 slots cover the shape before and after the move.
pub const STENCIL: usize = 5;

pub type Stencil = [Float; STENCIL];
pub type Block = [[[Float; STENCIL]; STENCIL]; STENCIL];

/// The three non-zero quadratic B-spline weights for a particle sitting
/// `delta` away from its nearest primal node, ordered (-1, 0, +1).
#[inline(always)]
pub fn quadratic(delta: Float) -> [Float; 3] {
    let delta2 = delta * delta;
    [
        0.5 * (delta2 - delta + 0.25),
        0.75 - delta2,
        0.5 * (delta2 + delta + 0.25),
    ]
}

/// Places the quadratic weights in a 5 slot window. `shift` is the
/// difference between the node the weights are centred on and the node
/// the window is centred on, so `shift == 0` fills slots 1..=3.
#[inline(always)]
pub fn stencil(delta: Float, shift: i64) -> Stencil {
    if !cfg!(feature = "unchecked") {
        assert!(
            (-1..=1).contains(&shift),
            "particle moved {} cells in one step",
            shift
        );
    }
    let mut s: Stencil = [0.0; STENCIL];
    let first = (shift + 1) as usize;
    s[first..first + 3].copy_from_slice(&quadratic(delta));
    s
}
