use crate::frame::{Plane, RawFrame};
use std::time::SystemTime;

const LUMA_ALIGN: usize = 32;
const CHROMA_ALIGN: usize = 16;

/// Moving test pattern rendered straight into padded I420 planes
#[derive(Debug, Clone)]
pub struct SyntheticPattern {
    width: u32,
    height: u32,
    luma_stride: usize,
    chroma_stride: usize,
}

impl SyntheticPattern {
    pub fn new(width: u32, height: u32) -> Self {
        let chroma_width = (width as usize + 1) / 2;
        Self {
            width,
            height,
            luma_stride: align_up(width as usize, LUMA_ALIGN),
            chroma_stride: align_up(chroma_width, CHROMA_ALIGN),
        }
    }

    pub fn luma_stride(&self) -> usize {
        self.luma_stride
    }

    pub fn chroma_stride(&self) -> usize {
        self.chroma_stride
    }

    /// Render frame `sequence`; the pattern drifts a few pixels per frame
    pub fn frame(&self, sequence: u64, timestamp: SystemTime) -> RawFrame {
        let w = self.width as usize;
        let h = self.height as usize;
        let cw = (w + 1) / 2;
        let ch = (h + 1) / 2;
        let shift = (sequence as usize).wrapping_mul(4);

        let mut y = vec![0u8; self.luma_stride * h];
        for row in 0..h {
            let line = &mut y[row * self.luma_stride..row * self.luma_stride + w];
            for (col, sample) in line.iter_mut().enumerate() {
                *sample = 16 + ((col + row + shift) % 220) as u8;
            }
        }

        let mut u = vec![128u8; self.chroma_stride * ch];
        let mut v = vec![128u8; self.chroma_stride * ch];
        for row in 0..ch {
            for col in 0..cw {
                let idx = row * self.chroma_stride + col;
                u[idx] = 96 + ((col * 2 + shift) % 64) as u8;
                v[idx] = 96 + ((row * 2 + shift) % 64) as u8;
            }
        }

        RawFrame::yuv420(
            sequence,
            timestamp,
            self.width,
            self.height,
            Plane::new(y, self.luma_stride, 1),
            Plane::new(u, self.chroma_stride, 1),
            Plane::new(v, self.chroma_stride, 1),
        )
    }
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}
