mod card;
mod driver;
pub mod mock;
mod mount;
mod sequencer;
mod writer;
#[cfg(test)]
mod tests;

pub use card::{DirectoryCard, VOLUME_LABEL_FILE};
pub use driver::{BlockStorage, MountFault, VolumeInfo};
pub use mock::MockStorage;
pub use mount::{MountState, StorageMountManager};
pub use sequencer::FilenameSequencer;
pub use writer::FrameWriter;
