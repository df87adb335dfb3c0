use crate::error::{DriverError, Result};

/// Number of matrices that can be saved with [`MatrixStack::push`].
pub const MATRIX_STACK_SIZE: usize = 32;

/// A 2D affine transformation.
///
/// Maps a user-space point to device space as
/// `x' = a*x + c*y + x`, `y' = b*x + d*y + y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub x: f64,
    pub y: f64,
}

impl Matrix {
    /// Identity matrix (no transformation)
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub const fn new(a: f64, b: f64, c: f64, d: f64, x: f64, y: f64) -> Self {
        Self { a, b, c, d, x, y }
    }

    pub const fn translation(x: f64, y: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub const fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `degrees`, counter-clockwise on screen (y grows downwards).
    ///
    /// Quarter turns use exact sines so that repeated rotations stay on the
    /// pixel grid.
    pub fn rotation(degrees: f64) -> Self {
        let (s, c) = if degrees == 0.0 {
            (0.0, 1.0)
        } else if degrees == 90.0 {
            (1.0, 0.0)
        } else if degrees == 180.0 {
            (0.0, -1.0)
        } else if degrees == 270.0 || degrees == -90.0 {
            (-1.0, 0.0)
        } else {
            let r = degrees.to_radians();
            (r.sin(), r.cos())
        };
        Self::new(c, -s, s, c, 0.0, 0.0)
    }

    /// Compose `other` in front of this matrix: points go through `other`
    /// first, then through `self`.
    pub fn pre_multiply(&self, other: &Matrix) -> Matrix {
        let m = self;
        Matrix {
            a: other.a * m.a + other.b * m.c,
            b: other.a * m.b + other.b * m.d,
            c: other.c * m.a + other.d * m.c,
            d: other.c * m.b + other.d * m.d,
            x: other.x * m.a + other.y * m.c + m.x,
            y: other.x * m.b + other.y * m.d + m.y,
        }
    }

    /// Transform a point, translation included.
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.x,
            x * self.b + y * self.d + self.y,
        )
    }

    /// Transform a vector: the linear part only, translation ignored.
    pub fn transform_vector(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.a + y * self.c, x * self.b + y * self.d)
    }

    /// True when axis-aligned rectangles stay axis-aligned and unflipped.
    pub fn is_axis_aligned(&self) -> bool {
        self.b == 0.0 && self.c == 0.0 && self.a > 0.0 && self.d > 0.0
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The current transformation plus a fixed-capacity stack of saved ones.
///
/// The stack never allocates; `push` past [`MATRIX_STACK_SIZE`] is refused.
#[derive(Clone, Debug)]
pub struct MatrixStack {
    current: Matrix,
    saved: [Matrix; MATRIX_STACK_SIZE],
    depth: usize,
}

impl MatrixStack {
    pub fn new() -> Self {
        Self {
            current: Matrix::IDENTITY,
            saved: [Matrix::IDENTITY; MATRIX_STACK_SIZE],
            depth: 0,
        }
    }

    pub fn current(&self) -> &Matrix {
        &self.current
    }

    /// Number of saved matrices.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn push(&mut self) -> Result<()> {
        if self.depth == MATRIX_STACK_SIZE {
            return Err(DriverError::MatrixStackOverflow(MATRIX_STACK_SIZE));
        }
        self.saved[self.depth] = self.current;
        self.depth += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(DriverError::MatrixStackUnderflow);
        }
        self.depth -= 1;
        self.current = self.saved[self.depth];
        Ok(())
    }

    pub fn mult(&mut self, m: &Matrix) {
        self.current = self.current.pre_multiply(m);
    }

    pub fn translate(&mut self, x: f64, y: f64) {
        self.mult(&Matrix::translation(x, y));
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.mult(&Matrix::scaling(sx, sy));
    }

    pub fn rotate(&mut self, degrees: f64) {
        if degrees != 0.0 {
            self.mult(&Matrix::rotation(degrees));
        }
    }

    /// Back to identity with nothing saved.
    pub fn reset(&mut self) {
        self.current = Matrix::IDENTITY;
        self.depth = 0;
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}
