//! Split multi-component pixels into one image per component.

use super::single_input;
use crate::error::Result;
use crate::image::{ComplexD, ComplexF, ComplexPixel, GrayA8, LabeledArray, Pixel, Rgb8, Rgba8, TypedArray};
use crate::options::Options;
use crate::registry::{pixel_dispatch, Algorithm};

pub trait SplitPixel: Pixel {
    type Component: Pixel;

    /// Output label of each component, in component order.
    const LABELS: &'static [&'static str];

    fn component(self, index: usize) -> Self::Component;
}

impl SplitPixel for GrayA8 {
    type Component = u8;
    const LABELS: &'static [&'static str] = &["gray", "alpha"];

    fn component(self, index: usize) -> u8 {
        self[index]
    }
}

impl SplitPixel for Rgb8 {
    type Component = u8;
    const LABELS: &'static [&'static str] = &["red", "green", "blue"];

    fn component(self, index: usize) -> u8 {
        self[index]
    }
}

impl SplitPixel for Rgba8 {
    type Component = u8;
    const LABELS: &'static [&'static str] = &["red", "green", "blue", "alpha"];

    fn component(self, index: usize) -> u8 {
        self[index]
    }
}

macro_rules! impl_split_complex {
    ($($t:ty => $real:ty),*) => {$(
        impl SplitPixel for $t {
            type Component = $real;
            const LABELS: &'static [&'static str] = &["real", "imaginary"];

            fn component(self, index: usize) -> $real {
                if index == 0 { self.re() } else { self.im() }
            }
        }
    )*};
}

impl_split_complex!(ComplexF => f32, ComplexD => f64);

/// One labelled image per channel or complex component.
pub struct SplitChannels;

impl SplitChannels {
    pub fn apply<T: SplitPixel>(images: &[TypedArray<T>], _options: &Options) -> Result<Vec<LabeledArray>> {
        let image = single_input(images)?;
        Ok(T::LABELS
            .iter()
            .enumerate()
            .map(|(index, label)| LabeledArray::new(image.map(move |p| p.component(index)), *label))
            .collect())
    }
}

impl Algorithm for SplitChannels {
    const NAME: &'static str = "split_channels";

    fn image_count_supported(count: usize) -> bool {
        count == 1
    }

    fn image_dims_supported(_dims: &[usize]) -> bool {
        true
    }

    fn same_dims_required() -> bool {
        true
    }

    pixel_dispatch!(GrayA8, Rgb8, Rgba8, ComplexF, ComplexD);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::PixelType;
    use std::path::Path;

    #[test]
    fn test_split_rgba() {
        let image = TypedArray::<Rgba8>::new(&[2, 2]);
        image.set(&[0, 0], [10, 20, 30, 40]);
        let out = SplitChannels::apply(&[image], &Options::new()).unwrap();
        let labels: Vec<&Path> = out.iter().map(LabeledArray::label).collect();
        assert_eq!(labels, vec![Path::new("red"), Path::new("green"), Path::new("blue"), Path::new("alpha")]);
        let firsts: Vec<u8> = out.iter().map(|l| l.image.typed::<u8>().get(&[0, 0])).collect();
        assert_eq!(firsts, vec![10, 20, 30, 40]);
        assert!(out.iter().all(|l| l.image.pixel_type() == PixelType::Gray8 && l.image.shape() == [2, 2]));
    }

    #[test]
    fn test_split_graya() {
        let image = TypedArray::<GrayA8>::from_vec(&[1], vec![[5, 6]]);
        let out = SplitChannels::apply(&[image], &Options::new()).unwrap();
        assert_eq!(out[0].label, Path::new("gray"));
        assert_eq!(out[1].image.typed::<u8>().to_vec(), vec![6]);
    }

    #[test]
    fn test_split_complex() {
        let image = TypedArray::<ComplexF>::from_vec(&[2], vec![ComplexF::new(1.0, -1.0), ComplexF::new(2.0, 0.5)]);
        let out = SplitChannels::apply(&[image], &Options::new()).unwrap();
        assert_eq!(out[0].label, Path::new("real"));
        assert_eq!(out[1].label, Path::new("imaginary"));
        assert_eq!(out[0].image.pixel_type(), PixelType::Float);
        assert_eq!(out[1].image.typed::<f32>().to_vec(), vec![-1.0, 0.5]);
    }
}
