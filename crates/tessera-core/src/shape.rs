use smallvec::SmallVec;
use std::fmt;

/// Tensor shape with stack-allocated storage for ≤4 dimensions.
///
/// Carries an optional alignment for the innermost dimension. Backends with
/// vector units require rows padded to a multiple of their lane count; the
/// padding lives in storage only and never changes the logical element count.
/// An alignment of 0 means no padding.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
    alignment: usize,
}

impl Shape {
    /// Create a new unaligned shape from dimensions.
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
            alignment: 0,
        }
    }

    /// Create a shape whose innermost dimension is padded to `alignment`.
    pub fn with_alignment(dims: &[usize], alignment: usize) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
            alignment,
        }
    }

    /// Scalar shape (0 dimensions).
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
            alignment: 0,
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of logical elements.
    pub fn numel(&self) -> usize {
        if self.dims.is_empty() {
            1 // scalar
        } else {
            self.dims.iter().product()
        }
    }

    /// Number of elements backing this shape, including alignment padding.
    pub fn storage_size(&self) -> usize {
        match self.dims.split_last() {
            None => 1,
            Some((&last, outer)) => {
                let padded = align_up(last, self.alignment);
                outer.iter().product::<usize>() * padded
            }
        }
    }

    /// Get dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Innermost-dimension alignment (0 = none).
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Outermost (batch) extent. Scalars and 1-D shapes are a single batch.
    pub fn batch(&self) -> usize {
        if self.dims.len() < 2 {
            1
        } else {
            self.dims[0]
        }
    }

    /// Elements in one batch row: the product of every dimension but the first.
    pub fn row_elems(&self) -> usize {
        match self.dims.len() {
            0 => 1,
            1 => self.dims[0],
            _ => self.dims[1..].iter().product(),
        }
    }

    /// Whether this is a scalar (0-dimensional).
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Whether two shapes have the same dimensions, ignoring alignment.
    pub fn same_dims(&self, other: &Shape) -> bool {
        self.dims == other.dims
    }
}

/// Round `n` up to a multiple of `align`. An alignment of 0 or 1 is a no-op.
pub fn align_up(n: usize, align: usize) -> usize {
    if align <= 1 {
        n
    } else {
        n.div_ceil(align) * align
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alignment > 1 {
            write!(f, "Shape({:?}, align={})", self.dims.as_slice(), self.alignment)
        } else {
            write!(f, "Shape({:?})", self.dims.as_slice())
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar() {
        let s = Shape::scalar();
        assert_eq!(s.ndim(), 0);
        assert_eq!(s.numel(), 1);
        assert_eq!(s.storage_size(), 1);
        assert_eq!(s.batch(), 1);
        assert_eq!(s.row_elems(), 1);
        assert!(s.is_scalar());
    }

    #[test]
    fn test_batch_and_rows() {
        let s = Shape::new(&[8, 4, 32]);
        assert_eq!(s.batch(), 8);
        assert_eq!(s.row_elems(), 128);
        assert_eq!(s.numel(), 1024);

        let v = Shape::new(&[10]);
        assert_eq!(v.batch(), 1);
        assert_eq!(v.row_elems(), 10);
    }

    #[test]
    fn test_alignment_pads_storage_only() {
        let s = Shape::with_alignment(&[1, 10], 8);
        assert_eq!(s.numel(), 10);
        assert_eq!(s.storage_size(), 16);

        let s = Shape::with_alignment(&[3, 16], 8);
        assert_eq!(s.storage_size(), 48);

        let s = Shape::with_alignment(&[1, 10], 0);
        assert_eq!(s.storage_size(), 10);
    }

    #[test]
    fn test_same_dims_ignores_alignment() {
        let a = Shape::with_alignment(&[2, 5], 8);
        let b = Shape::new(&[2, 5]);
        assert!(a.same_dims(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);
        assert_eq!(align_up(9, 0), 9);
    }

    #[test]
    fn test_from_slice() {
        let dims: &[usize] = &[2, 3];
        let s: Shape = dims.into();
        assert_eq!(s.dims(), &[2, 3]);
        assert_eq!(format!("{s}"), "[2, 3]");
    }
}
