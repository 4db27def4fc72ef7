//! Strided line views.
//!
//! A line along axis `k` is the set of elements that differ only in their
//! `k`-th coordinate. With axis 0 fastest, consecutive elements of such a line
//! are `jump = dims[0] * ... * dims[k-1]` apart in the flat buffer.

use super::pixel::Pixel;

/// Flat offsets of the first element of every line along an axis.
///
/// `total` is the element count, `jump` the stride of the axis and `len` its
/// extent.
pub fn line_offsets(total: usize, jump: usize, len: usize) -> impl Iterator<Item = usize> {
    let block = jump * len;
    let outer = if block == 0 { 0 } else { total / block };
    (0..outer).flat_map(move |o| (0..jump).map(move |i| o * block + i))
}

/// Read-only view of one line.
#[derive(Clone, Copy)]
pub struct RowProxy<'a, T> {
    data: &'a [T],
    offset: usize,
    stride: usize,
    len: usize,
}

impl<'a, T: Pixel> RowProxy<'a, T> {
    pub fn new(data: &'a [T], offset: usize, stride: usize, len: usize) -> Self {
        Self {
            data,
            offset,
            stride,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        assert!(i < self.len, "row index {i} out of range (len {})", self.len);
        self.data[self.offset + i * self.stride]
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = T> + ExactSizeIterator + 'a {
        let RowProxy {
            data,
            offset,
            stride,
            len,
        } = *self;
        (0..len).map(move |i| data[offset + i * stride])
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

/// Mutable view of one line.
pub struct RowProxyMut<'a, T> {
    data: &'a mut [T],
    offset: usize,
    stride: usize,
    len: usize,
}

impl<'a, T: Pixel> RowProxyMut<'a, T> {
    pub fn new(data: &'a mut [T], offset: usize, stride: usize, len: usize) -> Self {
        Self {
            data,
            offset,
            stride,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        assert!(i < self.len, "row index {i} out of range (len {})", self.len);
        self.data[self.offset + i * self.stride]
    }

    #[inline]
    pub fn set(&mut self, i: usize, value: T) {
        assert!(i < self.len, "row index {i} out of range (len {})", self.len);
        self.data[self.offset + i * self.stride] = value;
    }

    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len).map(|i| self.get(i)).collect()
    }

    /// Overwrite the line from `values`, which must match its length.
    pub fn write_from(&mut self, values: &[T]) {
        assert_eq!(values.len(), self.len, "row length mismatch");
        for (i, &v) in values.iter().enumerate() {
            self.set(i, v);
        }
    }

    /// Cyclic shift: element `i` moves to `i - n`.
    pub fn rotate_left(&mut self, n: usize) {
        let mut values = self.to_vec();
        if !values.is_empty() {
            let len = values.len();
            values.rotate_left(n % len);
        }
        self.write_from(&values);
    }

    /// Cyclic shift: element `i` moves to `i + n`.
    pub fn rotate_right(&mut self, n: usize) {
        let mut values = self.to_vec();
        if !values.is_empty() {
            let len = values.len();
            values.rotate_right(n % len);
        }
        self.write_from(&values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_offsets_cover_every_line() {
        // shape [2, 3, 2], axis 1: jump 2, len 3
        let offsets: Vec<usize> = line_offsets(12, 2, 3).collect();
        assert_eq!(offsets, vec![0, 1, 6, 7]);
        // axis 0: jump 1, len 2
        let offsets: Vec<usize> = line_offsets(12, 1, 2).collect();
        assert_eq!(offsets, vec![0, 2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_row_proxy_strided_access() {
        let data: Vec<u8> = (0..12).collect();
        let row = RowProxy::new(&data, 1, 2, 3);
        assert_eq!(row.to_vec(), vec![1, 3, 5]);
        assert_eq!(row.iter().rev().collect::<Vec<_>>(), vec![5, 3, 1]);
    }

    #[test]
    fn test_rotate() {
        let mut data: Vec<u8> = (0..6).collect();
        let mut row = RowProxyMut::new(&mut data, 0, 2, 3);
        row.rotate_right(1);
        assert_eq!(row.to_vec(), vec![4, 0, 2]);
        row.rotate_left(1);
        assert_eq!(row.to_vec(), vec![0, 2, 4]);
        assert_eq!(data, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    #[should_panic]
    fn test_row_out_of_range() {
        let data = vec![0u8; 4];
        RowProxy::new(&data, 0, 1, 4).get(4);
    }
}
