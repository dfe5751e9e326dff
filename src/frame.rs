use serde::{Deserialize, Serialize};

/// Pixel format produced by the image sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Compressed JPEG frames
    Jpeg,
    /// RGB 5:6:5, two bytes per pixel
    Rgb565,
    /// YUV 4:2:2, two bytes per pixel
    Yuv422,
    /// 8-bit grayscale
    Grayscale,
}

impl PixelFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Jpeg => 0, // Variable size, compressed
            PixelFormat::Rgb565 => 2,
            PixelFormat::Yuv422 => 2,
            PixelFormat::Grayscale => 1,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, PixelFormat::Jpeg)
    }

    /// File extension used when frames of this format are stored
    pub fn extension(&self) -> &'static str {
        match self {
            PixelFormat::Jpeg => "jpg",
            PixelFormat::Rgb565 => "rgb",
            PixelFormat::Yuv422 => "yuv",
            PixelFormat::Grayscale => "gray",
        }
    }

    /// Label used in log lines ("JPEG saved as ...")
    pub fn label(&self) -> &'static str {
        match self {
            PixelFormat::Jpeg => "JPEG",
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Yuv422 => "YUV422",
            PixelFormat::Grayscale => "Grayscale",
        }
    }
}

/// Sensor resolution class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSize {
    Qvga,
    Cif,
    Vga,
    Svga,
    Xga,
    Sxga,
    Uxga,
}

impl FrameSize {
    /// Width and height in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            FrameSize::Qvga => (320, 240),
            FrameSize::Cif => (400, 296),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
        }
    }
}

/// Where the driver allocates frame buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameLocation {
    Psram,
    Dram,
}

/// Buffering strategy when the pool fills up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrabMode {
    /// Fill buffers only when empty; frames are delivered in sequence
    WhenEmpty,
    /// Overwrite stale buffers so acquire returns the newest frame
    Latest,
}

/// Expected payload size for uncompressed formats
pub fn expected_frame_len(format: PixelFormat, size: FrameSize) -> Option<usize> {
    if format.is_compressed() {
        None
    } else {
        let (width, height) = size.dimensions();
        Some(width as usize * height as usize * format.bytes_per_pixel())
    }
}
