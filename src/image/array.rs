//! N-dimensional pixel arrays.
//!
//! ## Memory Layout
//! Elements are stored in one flat buffer with the first coordinate varying
//! fastest: the stride of axis `i` is the product of the extents `0..i`. For
//! a 2-D image shaped `[width, height]` this is ordinary row-major order.
//!
//! ## Ownership
//! Buffers are shared. Cloning an array (typed or erased) aliases the same
//! storage; mutations through one handle are visible through every other.
//! [`TypedArray::deep_copy`] and [`ErasedArray::deep_copy`] are the only ways
//! to obtain an independent buffer.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use rayon::prelude::*;

use super::pixel::{with_pixel_type, Pixel, PixelType};
use super::rows::{line_offsets, RowProxy, RowProxyMut};

type Buffer<T> = RwLock<Vec<T>>;

/// Statically typed N-dimensional array.
pub struct TypedArray<T: Pixel> {
    shape: Vec<usize>,
    data: Arc<Buffer<T>>,
}

impl<T: Pixel> Clone for TypedArray<T> {
    /// Shallow: the clone aliases the same buffer.
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Pixel> fmt::Debug for TypedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedArray")
            .field("pixel_type", &T::TYPE)
            .field("shape", &self.shape)
            .finish()
    }
}

fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

impl<T: Pixel> TypedArray<T> {
    /// Zero-initialised array.
    pub fn new(shape: &[usize]) -> Self {
        Self::from_vec(shape, vec![T::default(); element_count(shape)])
    }

    /// Wrap an existing buffer.
    ///
    /// # Panics
    /// If `data.len()` differs from the product of `shape`.
    pub fn from_vec(shape: &[usize], data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            element_count(shape),
            "buffer of {} elements does not match shape {:?}",
            data.len(),
            shape
        );
        Self {
            shape: shape.to_vec(),
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Build an array by evaluating `f` at every coordinate.
    pub fn from_fn<F>(shape: &[usize], mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> T,
    {
        let total = element_count(shape);
        let mut data = Vec::with_capacity(total);
        let mut coords = vec![0usize; shape.len()];
        for _ in 0..total {
            data.push(f(&coords));
            advance(&mut coords, shape);
        }
        Self::from_vec(shape, data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        element_count(&self.shape)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat buffer index of a coordinate.
    ///
    /// # Panics
    /// On rank mismatch or an out-of-range coordinate.
    pub fn flat_index(&self, coords: &[usize]) -> usize {
        assert_eq!(
            coords.len(),
            self.shape.len(),
            "coordinate rank {} does not match array rank {}",
            coords.len(),
            self.shape.len()
        );
        let mut index = 0;
        let mut stride = 1;
        for (axis, (&c, &extent)) in coords.iter().zip(&self.shape).enumerate() {
            assert!(c < extent, "coordinate {c} out of range on axis {axis} (extent {extent})");
            index += c * stride;
            stride *= extent;
        }
        index
    }

    /// Product of the extents before `axis`.
    pub fn jump_size(&self, axis: usize) -> usize {
        self.shape[..axis].iter().product()
    }

    pub fn get(&self, coords: &[usize]) -> T {
        let index = self.flat_index(coords);
        self.read()[index]
    }

    pub fn set(&self, coords: &[usize], value: T) {
        let index = self.flat_index(coords);
        self.write()[index] = value;
    }

    pub fn get_flat(&self, index: usize) -> T {
        self.read()[index]
    }

    pub fn set_flat(&self, index: usize, value: T) {
        self.write()[index] = value;
    }

    /// Shared access to the flat buffer.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Exclusive access to the flat buffer.
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.read().clone()
    }

    /// Independent copy with its own buffer.
    pub fn deep_copy(&self) -> Self {
        Self::from_vec(&self.shape, self.to_vec())
    }

    /// True when both handles alias the same storage.
    pub fn shares_buffer_with(&self, other: &TypedArray<T>) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Element-wise transform into a freshly allocated array.
    pub fn map<U, F>(&self, f: F) -> TypedArray<U>
    where
        U: Pixel,
        F: Fn(T) -> U + Sync + Send,
    {
        let data: Vec<U> = self.read().par_iter().map(|&v| f(v)).collect();
        TypedArray::from_vec(&self.shape, data)
    }

    /// Element-wise transform that also sees each element's coordinate.
    pub fn map_with_coords<U, F>(&self, mut f: F) -> TypedArray<U>
    where
        U: Pixel,
        F: FnMut(T, &[usize]) -> U,
    {
        let src = self.read();
        let mut data = Vec::with_capacity(src.len());
        let mut coords = vec![0usize; self.shape.len()];
        for &v in src.iter() {
            data.push(f(v, &coords));
            advance(&mut coords, &self.shape);
        }
        TypedArray::from_vec(&self.shape, data)
    }

    /// Visit every line along `axis`.
    pub fn for_each_row<F>(&self, axis: usize, mut f: F)
    where
        F: FnMut(RowProxy<'_, T>),
    {
        assert!(axis < self.rank(), "axis {axis} out of range for rank {}", self.rank());
        let jump = self.jump_size(axis);
        let len = self.shape[axis];
        let data = self.read();
        for offset in line_offsets(self.len(), jump, len) {
            f(RowProxy::new(&data, offset, jump, len));
        }
    }

    /// Mutate every line along `axis` in place.
    pub fn for_each_row_mut<F>(&self, axis: usize, mut f: F)
    where
        F: FnMut(RowProxyMut<'_, T>),
    {
        assert!(axis < self.rank(), "axis {axis} out of range for rank {}", self.rank());
        let jump = self.jump_size(axis);
        let len = self.shape[axis];
        let total = self.len();
        let mut data = self.write();
        for offset in line_offsets(total, jump, len) {
            f(RowProxyMut::new(&mut data, offset, jump, len));
        }
    }

    /// Produce a new array by rewriting each line along `axis`.
    ///
    /// `f` receives the source line and the matching output line.
    pub fn transform_rows<U, F>(&self, axis: usize, mut f: F) -> TypedArray<U>
    where
        U: Pixel,
        F: FnMut(RowProxy<'_, T>, RowProxyMut<'_, U>),
    {
        assert!(axis < self.rank(), "axis {axis} out of range for rank {}", self.rank());
        let out = TypedArray::<U>::new(&self.shape);
        let jump = self.jump_size(axis);
        let len = self.shape[axis];
        {
            let src = self.read();
            let mut dst = out.write();
            for offset in line_offsets(self.len(), jump, len) {
                f(
                    RowProxy::new(&src, offset, jump, len),
                    RowProxyMut::new(&mut dst, offset, jump, len),
                );
            }
        }
        out
    }

    /// Copy into an `ndarray` array with the same logical axes.
    pub fn to_ndarray(&self) -> ArrayD<T> {
        // column-major in ndarray terms puts axis 0 fastest, matching our layout
        ArrayD::from_shape_vec(IxDyn(&self.shape).f(), self.to_vec())
            .unwrap_or_else(|_| unreachable!("buffer length always matches shape"))
    }

    /// Copy out of any `ndarray` array, keeping its logical axes.
    pub fn from_ndarray(array: &ArrayD<T>) -> Self {
        // iterating the transpose visits axis 0 fastest
        let data: Vec<T> = array.t().iter().copied().collect();
        Self::from_vec(array.shape(), data)
    }

    /// Forget the static type.
    pub fn erase(self) -> ErasedArray {
        ErasedArray {
            shape: self.shape,
            pixel_type: T::TYPE,
            buffer: self.data,
        }
    }
}

/// Step a coordinate vector to the next flat position, axis 0 fastest.
pub(crate) fn advance(coords: &mut [usize], shape: &[usize]) {
    for (c, &extent) in coords.iter_mut().zip(shape) {
        *c += 1;
        if *c < extent {
            return;
        }
        *c = 0;
    }
}

/// Type-erased N-dimensional array.
///
/// Holds the same shared buffer as the [`TypedArray`] it came from, tagged
/// with its [`PixelType`]. Cloning is shallow.
#[derive(Clone)]
pub struct ErasedArray {
    shape: Vec<usize>,
    pixel_type: PixelType,
    buffer: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for ErasedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedArray")
            .field("pixel_type", &self.pixel_type)
            .field("shape", &self.shape)
            .finish()
    }
}

impl ErasedArray {
    /// Zero-initialised array of a runtime-chosen type.
    pub fn zeros(pixel_type: PixelType, shape: &[usize]) -> Self {
        with_pixel_type!(pixel_type, P => TypedArray::<P>::new(shape).erase())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        element_count(&self.shape)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.pixel_type.size_of()
    }

    /// Typed view over the same buffer, `None` on a type mismatch.
    pub fn try_typed<T: Pixel>(&self) -> Option<TypedArray<T>> {
        if self.pixel_type != T::TYPE {
            return None;
        }
        let data = Arc::clone(&self.buffer).downcast::<Buffer<T>>().ok()?;
        Some(TypedArray {
            shape: self.shape.clone(),
            data,
        })
    }

    /// Typed view over the same buffer.
    ///
    /// # Panics
    /// If `T::TYPE` differs from the array's pixel type.
    pub fn typed<T: Pixel>(&self) -> TypedArray<T> {
        match self.try_typed() {
            Some(typed) => typed,
            None => panic!("cannot view {} array as {}", self.pixel_type, T::TYPE),
        }
    }

    pub fn deep_copy(&self) -> Self {
        with_pixel_type!(self.pixel_type, P => self.typed::<P>().deep_copy().erase())
    }

    pub fn shares_buffer_with(&self, other: &ErasedArray) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl<T: Pixel> From<TypedArray<T>> for ErasedArray {
    fn from(value: TypedArray<T>) -> Self {
        value.erase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_index_first_axis_fastest() {
        let a = TypedArray::<u8>::new(&[3, 4, 2]);
        assert_eq!(a.flat_index(&[0, 0, 0]), 0);
        assert_eq!(a.flat_index(&[1, 0, 0]), 1);
        assert_eq!(a.flat_index(&[0, 1, 0]), 3);
        assert_eq!(a.flat_index(&[2, 3, 1]), 2 + 3 * 3 + 12);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_coordinate_panics() {
        let a = TypedArray::<u8>::new(&[3, 4]);
        a.get(&[3, 0]);
    }

    #[test]
    #[should_panic]
    fn test_rank_mismatch_panics() {
        let a = TypedArray::<u8>::new(&[3, 4]);
        a.get(&[1]);
    }

    #[test]
    #[should_panic]
    fn test_buffer_size_mismatch_panics() {
        TypedArray::<f32>::from_vec(&[2, 2], vec![0.0; 3]);
    }

    #[test]
    fn test_clone_is_shallow() {
        let a = TypedArray::<u16>::new(&[2, 2]);
        let b = a.clone();
        b.set(&[1, 1], 7);
        assert_eq!(a.get(&[1, 1]), 7);
        assert!(a.shares_buffer_with(&b));
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let a = TypedArray::<u16>::new(&[2, 2]);
        let b = a.deep_copy();
        b.set(&[0, 1], 9);
        assert_eq!(a.get(&[0, 1]), 0);
        assert!(!a.shares_buffer_with(&b));
    }

    #[test]
    fn test_erase_and_recover() {
        let a = TypedArray::<[u8; 3]>::from_fn(&[2, 3], |c| [c[0] as u8, c[1] as u8, 0]);
        let erased = a.clone().erase();
        assert_eq!(erased.pixel_type(), PixelType::Rgb8);
        assert_eq!(erased.byte_len(), 18);
        assert!(erased.try_typed::<[u8; 4]>().is_none());
        let back = erased.typed::<[u8; 3]>();
        assert!(back.shares_buffer_with(&a));
        assert_eq!(back.get(&[1, 2]), [1, 2, 0]);
    }

    #[test]
    fn test_erased_deep_copy() {
        let erased = TypedArray::<f64>::from_vec(&[2], vec![1.0, 2.0]).erase();
        let copy = erased.deep_copy();
        assert!(!copy.shares_buffer_with(&erased));
        assert_eq!(copy.typed::<f64>().to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_map_with_coords_sees_coordinates() {
        let a = TypedArray::<u32>::new(&[3, 2]);
        let b = a.map_with_coords(|_, c| (c[0] + 10 * c[1]) as u32);
        assert_eq!(b.to_vec(), vec![0, 1, 2, 10, 11, 12]);
    }

    #[test]
    fn test_ndarray_interop_keeps_axes() {
        let a = TypedArray::<u8>::from_fn(&[3, 2], |c| (c[0] + 10 * c[1]) as u8);
        let nd = a.to_ndarray();
        assert_eq!(nd.shape(), &[3, 2]);
        assert_eq!(nd[[2, 1]], 12);
        let back = TypedArray::from_ndarray(&nd);
        assert_eq!(back.to_vec(), a.to_vec());
    }

    #[test]
    fn test_transform_rows_along_second_axis() {
        let a = TypedArray::<u8>::from_fn(&[2, 3], |c| (c[0] * 10 + c[1]) as u8);
        let reversed = a.transform_rows::<u8, _>(1, |src, mut dst| {
            for (i, v) in src.iter().rev().enumerate() {
                dst.set(i, v);
            }
        });
        assert_eq!(reversed.get(&[0, 0]), 2);
        assert_eq!(reversed.get(&[1, 2]), 10);
    }

    #[test]
    fn test_zero_sized_arrays() {
        let a = ErasedArray::zeros(PixelType::Double, &[0, 4]);
        assert!(a.is_empty());
        assert_eq!(a.byte_len(), 0);
    }
}
