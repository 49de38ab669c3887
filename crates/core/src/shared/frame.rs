use ndarray::{s, ArrayView3};

/// A decoded image: contiguous interleaved bytes in row-major order.
///
/// Decoders may hand over RGBA or RGB pixels; the pipeline calls
/// [`Frame::to_rgb`] before detection so downstream stages always see
/// three channels.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `(height, width, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Keep channels 0..3 and drop the rest (alpha).
    ///
    /// Single- and dual-channel frames are expanded by repeating channel 0.
    pub fn to_rgb(&self) -> Frame {
        match self.channels {
            3 => self.clone(),
            c if c > 3 => {
                let data = self
                    .as_ndarray()
                    .slice(s![.., .., 0..3])
                    .iter()
                    .copied()
                    .collect();
                Frame::new(data, self.width, self.height, 3)
            }
            _ => {
                let step = self.channels.max(1) as usize;
                let data = self
                    .data
                    .chunks_exact(step)
                    .flat_map(|px| [px[0]; 3])
                    .collect();
                Frame::new(data, self.width, self.height, 3)
            }
        }
    }
}
