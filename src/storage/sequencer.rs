use crate::frame::PixelFormat;

/// Hands out `<mount_point>/<n>_img.<ext>` names with a process-lifetime
/// counter. Starts at 0 on every boot; earlier files may be overwritten.
#[derive(Debug, Clone)]
pub struct FilenameSequencer {
    mount_point: String,
    extension: &'static str,
    counter: u64,
}

impl FilenameSequencer {
    pub fn new<S: Into<String>>(mount_point: S, format: PixelFormat) -> Self {
        Self {
            mount_point: mount_point.into(),
            extension: format.extension(),
            counter: 0,
        }
    }

    pub fn next(&mut self) -> String {
        let name = format!("{}/{}_img.{}", self.mount_point, self.counter, self.extension);
        self.counter += 1;
        name
    }

    /// Counter value the next call will use
    pub fn peek(&self) -> u64 {
        self.counter
    }
}
