use crate::Rgba;
use std::io::Write;

/// Dimensions and layout of an image buffer
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Width of the image
    pub width: usize,
    /// Height of the image
    pub height: usize,
    /// How many elements we need to skip to get to the next row.
    pub row_stride: usize,
    /// How many elements we need to skip to get to the next column.
    pub col_stride: usize,
}

impl Shape {
    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        row * self.row_stride + col * self.col_stride
    }
}

pub trait Image {
    type Pixel;

    fn data(&self) -> &[Self::Pixel];

    fn shape(&self) -> Shape;

    fn width(&self) -> usize {
        self.shape().width
    }

    fn height(&self) -> usize {
        self.shape().height
    }

    fn get(&self, row: usize, col: usize) -> Option<&Self::Pixel> {
        let shape = self.shape();
        if row >= shape.height || col >= shape.width {
            return None;
        }
        self.data().get(shape.offset(row, col))
    }
}

pub trait ImageMut: Image {
    fn data_mut(&mut self) -> &mut [Self::Pixel];

    fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Self::Pixel> {
        let shape = self.shape();
        if row >= shape.height || col >= shape.width {
            return None;
        }
        self.data_mut().get_mut(shape.offset(row, col))
    }

    fn clear(&mut self)
    where
        Self::Pixel: Default,
    {
        let shape = self.shape();
        let data = self.data_mut();
        for row in 0..shape.height {
            for col in 0..shape.width {
                data[shape.offset(row, col)] = Default::default();
            }
        }
    }
}

/// Image that owns its pixel buffer
#[derive(Clone)]
pub struct ImageOwned<P> {
    shape: Shape,
    data: Vec<P>,
}

impl<P> ImageOwned<P> {
    pub fn new(shape: Shape, data: Vec<P>) -> Self {
        Self { shape, data }
    }

    pub fn new_default(height: usize, width: usize) -> Self
    where
        P: Default + Clone,
    {
        let data = vec![P::default(); height * width];
        Self {
            shape: Shape {
                width,
                height,
                row_stride: width,
                col_stride: 1,
            },
            data,
        }
    }

    /// View the pixel buffer as raw bytes
    pub fn data_bytes(&self) -> &[u8]
    where
        P: bytemuck::Pod,
    {
        bytemuck::cast_slice(&self.data)
    }
}

impl<P> Image for ImageOwned<P> {
    type Pixel = P;

    fn shape(&self) -> Shape {
        self.shape
    }

    fn data(&self) -> &[Self::Pixel] {
        &self.data
    }
}

impl<P> ImageMut for ImageOwned<P> {
    fn data_mut(&mut self) -> &mut [Self::Pixel] {
        &mut self.data
    }
}

impl<'a, I> Image for &'a mut I
where
    I: Image + ?Sized,
{
    type Pixel = I::Pixel;

    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn data(&self) -> &[Self::Pixel] {
        (**self).data()
    }
}

impl<'a, I> ImageMut for &'a mut I
where
    I: ImageMut + ?Sized,
{
    fn data_mut(&mut self) -> &mut [Self::Pixel] {
        (**self).data_mut()
    }
}

/// Serialization of RGBA rasters to common image containers
pub trait ImageWrite: Image<Pixel = Rgba> {
    /// Write image as a 32-bit uncompressed BMP
    fn write_bmp(&self, mut out: impl Write) -> std::io::Result<()> {
        let shape = self.shape();
        let data = self.data();
        let pixel_data_size = shape.width * shape.height * 4;
        let file_size = 14 + 40 + pixel_data_size;

        // BITMAPFILEHEADER
        out.write_all(b"BM")?;
        out.write_all(&(file_size as u32).to_le_bytes())?;
        out.write_all(&0u32.to_le_bytes())?;
        out.write_all(&54u32.to_le_bytes())?;
        // BITMAPINFOHEADER, 32bpp BGRA, bottom-up
        out.write_all(&40u32.to_le_bytes())?;
        out.write_all(&(shape.width as i32).to_le_bytes())?;
        out.write_all(&(shape.height as i32).to_le_bytes())?;
        out.write_all(&1u16.to_le_bytes())?;
        out.write_all(&32u16.to_le_bytes())?;
        out.write_all(&0u32.to_le_bytes())?;
        out.write_all(&(pixel_data_size as u32).to_le_bytes())?;
        out.write_all(&[0u8; 16])?;

        for row in (0..shape.height).rev() {
            for col in 0..shape.width {
                let Rgba([r, g, b, a]) = data[shape.offset(row, col)];
                out.write_all(&[b, g, r, a])?;
            }
        }
        out.flush()
    }

    /// Write image as PNG
    #[cfg(feature = "png")]
    fn write_png(&self, out: impl Write) -> Result<(), png::EncodingError> {
        let shape = self.shape();
        let mut encoder = png::Encoder::new(out, shape.width as u32, shape.height as u32);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        let mut stream = writer.stream_writer()?;
        for row in 0..shape.height {
            for col in 0..shape.width {
                stream.write_all(&self.data()[shape.offset(row, col)].0)?;
            }
        }
        stream.finish()?;
        writer.finish()
    }
}

impl<I> ImageWrite for I where I: Image<Pixel = Rgba> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_owned() {
        let mut img = ImageOwned::<Rgba>::new_default(2, 3);
        assert_eq!(img.width(), 3);
        assert_eq!(img.height(), 2);
        assert_eq!(img.data().len(), 6);

        *img.get_mut(1, 2).unwrap() = Rgba([1, 2, 3, 4]);
        assert_eq!(img.get(1, 2), Some(&Rgba([1, 2, 3, 4])));
        assert_eq!(img.get(2, 0), None);
        assert_eq!(img.get(0, 3), None);

        assert_eq!(img.data_bytes().len(), 24);
        img.clear();
        assert_eq!(img.get(1, 2), Some(&Rgba::default()));
    }

    #[test]
    fn test_write_bmp() -> std::io::Result<()> {
        let mut img = ImageOwned::<Rgba>::new_default(2, 2);
        *img.get_mut(0, 0).unwrap() = Rgba([255, 0, 0, 255]);
        let mut out = Vec::new();
        img.write_bmp(&mut out)?;
        assert_eq!(&out[..2], b"BM");
        assert_eq!(out.len(), 54 + 16);
        // bottom-up: the (0, 0) red pixel is the first of the last row, BGRA
        assert_eq!(&out[54 + 8..54 + 12], &[0, 0, 255, 255]);
        Ok(())
    }

    #[cfg(feature = "png")]
    #[test]
    fn test_write_png() -> Result<(), png::EncodingError> {
        let img = ImageOwned::<Rgba>::new_default(3, 2);
        let mut out = Vec::new();
        img.write_png(&mut out)?;
        assert_eq!(&out[1..4], b"PNG");
        Ok(())
    }
}
