//! Non-owning strided views over caller-supplied buffers.
//!
//! Views are constructed per call and never outlive it. Construction checks
//! that every element the view can address lies inside the borrowed slice, so
//! kernels index through views without further bounds reasoning.

/// Transpose flag for a matrix operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transpose {
    #[default]
    NoTrans,
    Trans,
}

impl Transpose {
    /// Parse a BLAS transpose character (`'n'` or `'t'`, either case).
    ///
    /// # Panics
    /// On any other character.
    pub fn from_flag(flag: u8) -> Self {
        match flag {
            b'n' | b'N' => Transpose::NoTrans,
            b't' | b'T' => Transpose::Trans,
            other => panic!("invalid transpose flag {:?}", other as char),
        }
    }

    /// The BLAS character for this flag.
    #[inline]
    pub fn as_flag(self) -> u8 {
        match self {
            Transpose::NoTrans => b'n',
            Transpose::Trans => b't',
        }
    }

    #[inline]
    pub fn is_trans(self) -> bool {
        self == Transpose::Trans
    }
}

/// Number of slice elements a column-major `rows × cols` matrix with leading
/// dimension `ld` touches.
#[inline]
pub fn matrix_extent(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 {
        0
    } else {
        (cols - 1) * ld + rows
    }
}

/// Number of slice elements a strided vector of `len` elements touches.
#[inline]
pub fn vector_extent(len: usize, inc: usize) -> usize {
    if len == 0 {
        0
    } else {
        (len - 1) * inc + 1
    }
}

fn check_matrix(buf_len: usize, rows: usize, cols: usize, ld: usize) {
    assert!(
        ld >= rows.max(1),
        "leading dimension {} is smaller than the row count {}",
        ld,
        rows
    );
    let extent = matrix_extent(rows, cols, ld);
    assert!(
        buf_len >= extent,
        "buffer of {} elements is too short for a {}x{} matrix with ld {}",
        buf_len,
        rows,
        cols,
        ld
    );
}

fn check_vector(buf_len: usize, len: usize, inc: usize) {
    let extent = vector_extent(len, inc);
    assert!(
        buf_len >= extent,
        "buffer of {} elements is too short for {} elements at stride {}",
        buf_len,
        len,
        inc
    );
}

/// Read-only column-major matrix view.
///
/// `rows`/`cols` describe the stored matrix; `trans` selects whether kernels
/// consume it as `A` or `Aᵗ`.
#[derive(Debug, Clone, Copy)]
pub struct MatRef<'a, P> {
    data: &'a [P],
    rows: usize,
    cols: usize,
    ld: usize,
    trans: Transpose,
}

impl<'a, P> MatRef<'a, P> {
    /// # Panics
    /// If `ld < max(1, rows)` or `data` is too short.
    pub fn new(data: &'a [P], rows: usize, cols: usize, ld: usize) -> Self {
        check_matrix(data.len(), rows, cols, ld);
        Self {
            data,
            rows,
            cols,
            ld,
            trans: Transpose::NoTrans,
        }
    }

    /// View of the `op(A)` of shape `op_rows × op_cols`.
    pub fn with_op(
        data: &'a [P],
        trans: Transpose,
        op_rows: usize,
        op_cols: usize,
        ld: usize,
    ) -> Self {
        let (rows, cols) = match trans {
            Transpose::NoTrans => (op_rows, op_cols),
            Transpose::Trans => (op_cols, op_rows),
        };
        Self::new(data, rows, cols, ld).transposed(trans)
    }

    /// Same storage, consumed with the given transpose flag.
    #[inline]
    pub fn transposed(mut self, trans: Transpose) -> Self {
        self.trans = trans;
        self
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn ld(&self) -> usize {
        self.ld
    }

    #[inline]
    pub fn trans(&self) -> Transpose {
        self.trans
    }

    /// Rows of `op(A)`.
    #[inline]
    pub fn op_rows(&self) -> usize {
        if self.trans.is_trans() {
            self.cols
        } else {
            self.rows
        }
    }

    /// Columns of `op(A)`.
    #[inline]
    pub fn op_cols(&self) -> usize {
        if self.trans.is_trans() {
            self.rows
        } else {
            self.cols
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &'a [P] {
        self.data
    }
}

/// Mutable column-major matrix view.
#[derive(Debug)]
pub struct MatMut<'a, P> {
    data: &'a mut [P],
    rows: usize,
    cols: usize,
    ld: usize,
}

impl<'a, P> MatMut<'a, P> {
    /// # Panics
    /// If `ld < max(1, rows)` or `data` is too short.
    pub fn new(data: &'a mut [P], rows: usize, cols: usize, ld: usize) -> Self {
        check_matrix(data.len(), rows, cols, ld);
        Self {
            data,
            rows,
            cols,
            ld,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn ld(&self) -> usize {
        self.ld
    }

    #[inline]
    pub fn as_slice(&self) -> &[P] {
        self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [P] {
        self.data
    }
}

/// Read-only strided vector view: element `i` lives at `data[i * inc]`.
#[derive(Debug, Clone, Copy)]
pub struct VecRef<'a, P> {
    data: &'a [P],
    len: usize,
    inc: usize,
}

impl<'a, P> VecRef<'a, P> {
    /// # Panics
    /// If `data` is too short for `len` elements at stride `inc`.
    pub fn new(data: &'a [P], len: usize, inc: usize) -> Self {
        check_vector(data.len(), len, inc);
        Self { data, len, inc }
    }

    /// Unit-stride view over the whole slice.
    pub fn contiguous(data: &'a [P]) -> Self {
        Self::new(data, data.len(), 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn inc(&self) -> usize {
        self.inc
    }

    #[inline]
    pub fn as_slice(&self) -> &'a [P] {
        self.data
    }

    #[inline]
    pub fn get(&self, i: usize) -> &P {
        &self.data[i * self.inc]
    }
}

/// Mutable strided vector view.
#[derive(Debug)]
pub struct VecMut<'a, P> {
    data: &'a mut [P],
    len: usize,
    inc: usize,
}

impl<'a, P> VecMut<'a, P> {
    /// # Panics
    /// If `data` is too short for `len` elements at stride `inc`.
    pub fn new(data: &'a mut [P], len: usize, inc: usize) -> Self {
        check_vector(data.len(), len, inc);
        Self { data, len, inc }
    }

    pub fn contiguous(data: &'a mut [P]) -> Self {
        let len = data.len();
        Self::new(data, len, 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn inc(&self) -> usize {
        self.inc
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [P] {
        self.data
    }

    #[inline]
    pub fn get_mut(&mut self, i: usize) -> &mut P {
        &mut self.data[i * self.inc]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose_flags() {
        assert_eq!(Transpose::from_flag(b'n'), Transpose::NoTrans);
        assert_eq!(Transpose::from_flag(b'T'), Transpose::Trans);
        assert_eq!(Transpose::Trans.as_flag(), b't');
    }

    #[test]
    #[should_panic(expected = "invalid transpose flag")]
    fn test_invalid_transpose_flag() {
        let _ = Transpose::from_flag(b'c');
    }

    #[test]
    fn test_op_dimensions() {
        let data = [0.0f64; 6];
        let a = MatRef::new(&data, 2, 3, 2);
        assert_eq!((a.op_rows(), a.op_cols()), (2, 3));
        let at = a.transposed(Transpose::Trans);
        assert_eq!((at.op_rows(), at.op_cols()), (3, 2));

        let b = MatRef::with_op(&data, Transpose::Trans, 3, 2, 2);
        assert_eq!((b.rows(), b.cols()), (2, 3));
    }

    #[test]
    fn test_op_shape() {
        // [[1, 2, 3], [4, 5, 6]] column-major
        let data = [1, 4, 2, 5, 3, 6];
        let a = MatRef::new(&data, 2, 3, 2);
        assert_eq!((a.op_rows(), a.op_cols()), (2, 3));
        let at = a.transposed(Transpose::Trans);
        assert_eq!((at.op_rows(), at.op_cols()), (3, 2));
    }

    #[test]
    fn test_extents() {
        assert_eq!(matrix_extent(3, 2, 5), 8);
        assert_eq!(matrix_extent(0, 4, 1), 0);
        assert_eq!(vector_extent(4, 3), 10);
        assert_eq!(vector_extent(4, 0), 1);
    }

    #[test]
    #[should_panic(expected = "leading dimension")]
    fn test_leading_dimension_too_small() {
        let data = [0i32; 8];
        let _ = MatRef::new(&data, 4, 2, 3);
    }

    #[test]
    #[should_panic(expected = "too short")]
    fn test_vector_out_of_bounds() {
        let data = [0i32; 5];
        let _ = VecRef::new(&data, 3, 3);
    }

    #[test]
    fn test_zero_stride_vector() {
        let data = [7i32];
        let v = VecRef::new(&data, 4, 0);
        assert_eq!(*v.get(3), 7);
    }
}
