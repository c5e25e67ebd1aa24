//! Rank-2 transpose, out-of-place and in place.

use crate::dtype::Element;
use crate::error::MatrtError;
use crate::tensor::Tensor;
use crate::Result;

fn matrix_dims<T: Element>(t: &Tensor<'_, T>) -> Result<(usize, usize)> {
    let dims = t.require_bound("transpose")?.dims();
    match dims {
        &[rows, cols] => Ok((rows, cols)),
        _ => Err(MatrtError::InvalidRank {
            op: "transpose",
            rank: dims.len(),
        }),
    }
}

/// `dst[j * rows + i] = src[i * cols + j]`
fn transpose_block<T: Element>(src: &[T], rows: usize, cols: usize, dst: &mut [T]) {
    for i in 0..rows {
        for j in 0..cols {
            dst[j * rows + i] = src[i * cols + j];
        }
    }
}

/// Write the transpose of `input` into `output`, binding it to `cols x rows`.
///
/// To transpose a handle onto itself use [`Tensor::transpose_in_place`].
pub fn transpose<T: Element>(input: &Tensor<'_, T>, output: &mut Tensor<'_, T>) -> Result<()> {
    let (rows, cols) = matrix_dims(input)?;
    output.allocate_or_reuse(&[cols, rows])?;
    transpose_block(input.as_slice(), rows, cols, output.as_mut_slice());
    Ok(())
}

impl<'a, T: Element> Tensor<'a, T> {
    /// Out-of-place transpose into `output`.
    pub fn transpose_into(&self, output: &mut Tensor<'_, T>) -> Result<()> {
        transpose(self, output)
    }

    /// A new tensor holding the transpose.
    pub fn transposed(&self) -> Result<Tensor<'static, T>> {
        let mut out = Tensor::new();
        transpose(self, &mut out)?;
        Ok(out)
    }

    /// Transpose this handle onto itself.
    ///
    /// The result is built in a temporary whose buffer then replaces this
    /// handle's storage. An aliased handle becomes an owner of the new buffer
    /// and its source is left untouched.
    pub fn transpose_in_place(&mut self) -> Result<()> {
        let tmp = self.transposed()?;
        self.adopt(tmp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose_2x3() {
        let a = Tensor::from_vec(vec![1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        let t = a.transposed().unwrap();
        assert_eq!(t.extents(), &[3, 2]);
        assert_eq!(t.as_slice(), &[1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_transpose_reuses_output() {
        let a = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let mut out: Tensor<f64> = Tensor::zeros(&[2, 2]).unwrap();
        let ptr = out.as_ptr();
        a.transpose_into(&mut out).unwrap();
        assert_eq!(out.as_ptr(), ptr);
        assert_eq!(out.as_slice(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_transpose_in_place() {
        let mut a = Tensor::from_vec(vec![1u8, 2, 3, 4, 5, 6], &[3, 2]).unwrap();
        a.transpose_in_place().unwrap();
        assert_eq!(a.extents(), &[2, 3]);
        assert_eq!(a.as_slice(), &[1, 3, 5, 2, 4, 6]);
        assert!(a.owns_data());
    }

    #[test]
    fn test_transpose_vectors() {
        let row = Tensor::from_row(&[1i64, 2, 3]);
        let col = row.transposed().unwrap();
        assert_eq!(col.extents(), &[3, 1]);
        assert_eq!(col.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_transpose_rejects_other_ranks() {
        let cube: Tensor<f32> = Tensor::zeros(&[2, 2, 2]).unwrap();
        let mut out: Tensor<f32> = Tensor::new();
        let err = transpose(&cube, &mut out).unwrap_err();
        assert_eq!(err, MatrtError::InvalidRank { op: "transpose", rank: 3 });
        assert!(!out.is_bound());

        let mut line: Tensor<f32> = Tensor::zeros(&[4]).unwrap();
        assert!(matches!(
            line.transpose_in_place(),
            Err(MatrtError::InvalidRank { rank: 1, .. })
        ));
        assert_eq!(line.extents(), &[4]);
    }
}
