// image input seam
//
// the engine never decodes files; it consumes any pixel source exposing
// dimensions and normalized RGB reads. `RgbBuffer` is the plain owned
// implementation used by callers that already hold decoded pixels.

/// an RGB colour with channels normalized to [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// a read-only pixel source.
pub trait ImageData {
    /// (width, height) in pixels.
    fn size(&self) -> (usize, usize);

    /// the colour at (x, y). callers stay within `size()`.
    fn rgb_at(&self, x: usize, y: usize) -> Rgb;
}

/// a plain owned pixel buffer, row-major.
pub struct RgbBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl RgbBuffer {
    /// an all-black buffer.
    pub fn new(width: usize, height: usize) -> Self {
        RgbBuffer {
            width,
            height,
            pixels: vec![Rgb::default(); width * height],
        }
    }

    /// builds a buffer by sampling a closure at every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Rgb,
    {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        RgbBuffer {
            width,
            height,
            pixels,
        }
    }

    /// wraps raw RGBA8 pixels (4 bytes per pixel, alpha ignored), the layout
    /// image decoders typically hand over.
    pub fn from_rgba8(width: usize, height: usize, data: &[u8]) -> Self {
        assert_eq!(data.len(), width * height * 4, "rgba8 buffer size mismatch");

        let pixels = data
            .chunks_exact(4)
            .map(|px| Rgb {
                r: px[0] as f64 / 255.0,
                g: px[1] as f64 / 255.0,
                b: px[2] as f64 / 255.0,
            })
            .collect();

        RgbBuffer {
            width,
            height,
            pixels,
        }
    }

    pub fn put(&mut self, x: usize, y: usize, rgb: Rgb) {
        self.pixels[y * self.width + x] = rgb;
    }
}

impl ImageData for RgbBuffer {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    fn rgb_at(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }
}
