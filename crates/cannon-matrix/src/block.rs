/// A square `block_size × block_size` sub-matrix owned by a single process.
///
/// Row-major and contiguous, so a whole block or a single row can be handed
/// to a collective as one slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    data: Vec<f64>,
    block_size: usize,
}

impl Block {
    /// Create a zero-filled block.
    pub fn zeros(block_size: usize) -> Self {
        Block {
            data: vec![0.0; block_size * block_size],
            block_size,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Returns row `i` of the block.
    ///
    /// # Panics
    /// Panics if `i >= block_size()`.
    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.block_size;
        &self.data[start..start + self.block_size]
    }

    /// Returns row `i` of the block mutably.
    ///
    /// # Panics
    /// Panics if `i >= block_size()`.
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let start = i * self.block_size;
        &mut self.data[start..start + self.block_size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let b = Block::zeros(3);
        assert_eq!(b.block_size(), 3);
        assert_eq!(b.as_slice(), &[0.0; 9]);
    }

    #[test]
    fn test_rows() {
        let mut b = Block::zeros(2);
        b.row_mut(1).copy_from_slice(&[3.0, 4.0]);
        assert_eq!(b.row(0), &[0.0, 0.0]);
        assert_eq!(b.row(1), &[3.0, 4.0]);
        assert_eq!(b.as_slice(), &[0.0, 0.0, 3.0, 4.0]);
    }

    #[test]
    fn test_empty_block() {
        let b = Block::zeros(0);
        assert!(b.as_slice().is_empty());
    }
}
