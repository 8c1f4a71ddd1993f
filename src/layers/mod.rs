pub mod readout;
pub mod recurrent;

pub use readout::Readout;
pub use recurrent::{RnnCell, StepCache, CellGradients};
