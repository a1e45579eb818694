// precomputed pixel summary tables
//
// the variance of a triangle only needs channel sums and squared sums over
// the pixels it covers. both tables are built once per target image: the
// per-pixel table feeds partial rows, the block table collapses an n×n
// block into a single lookup, which removes (n²−1)/n² of the per-pixel work
// inside large triangles.

use crate::image::ImageData;

/// one pixel of the target: quantized 0-255 channels plus the sum of their
/// squares.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub sq: u32,
}

/// per-pixel sums over the target image, row-major.
pub struct PixelTable {
    pixels: Vec<Pixel>,
    width: usize,
    height: usize,
}

impl PixelTable {
    pub fn from_image<I: ImageData + ?Sized>(image: &I) -> Self {
        profiling::scope!("PixelTable::from_image");
        let (width, height) = image.size();
        let mut pixels = Vec::with_capacity(width * height);

        for y in 0..height {
            for x in 0..width {
                let rgb = image.rgb_at(x, y);
                let (r, g, b) = (rgb.r * 255.0, rgb.g * 255.0, rgb.b * 255.0);
                pixels.push(Pixel {
                    r: r as u8,
                    g: g as u8,
                    b: b as u8,
                    // squared sum is taken before quantization, in one cast
                    sq: (r * r + g * g + b * b) as u32,
                });
            }
        }

        PixelTable {
            pixels,
            width,
            height,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[Pixel] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }
}

/// channel sums over one n×n block of the target.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockPixel {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    pub sq: u32,
}

/// per-block sums over the target image: entry (x, y) covers the n×n block
/// whose top-left pixel is (x, y). dimensions are (w−n+1) × (h−n+1).
pub struct BlockTable {
    blocks: Vec<BlockPixel>,
    width: usize,
    height: usize,
}

impl BlockTable {
    pub fn from_image<I: ImageData + ?Sized>(image: &I, n: usize) -> Self {
        profiling::scope!("BlockTable::from_image");
        let (w, h) = image.size();
        assert!(n >= 1 && n <= w && n <= h, "block size must fit the image");

        let width = w - n + 1;
        let height = h - n + 1;
        let mut blocks = vec![BlockPixel::default(); width * height];

        for y in 0..height {
            for x in 0..width {
                let block = &mut blocks[y * width + x];
                for i in 0..n {
                    for j in 0..n {
                        let rgb = image.rgb_at(x + i, y + j);
                        let (r, g, b) = (rgb.r * 255.0, rgb.g * 255.0, rgb.b * 255.0);
                        block.r += (r as u8) as u16;
                        block.g += (g as u8) as u16;
                        block.b += (b as u8) as u16;
                        block.sq += (r * r + g * g + b * b) as u32;
                    }
                }
            }
        }

        BlockTable {
            blocks,
            width,
            height,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> &BlockPixel {
        &self.blocks[y * self.width + x]
    }
}
