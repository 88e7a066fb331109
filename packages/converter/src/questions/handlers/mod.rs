//! Question converters, one per source question kind.

mod calculated;
mod choice;
mod matching;
mod numerical;
mod template;
mod text;

pub use calculated::*;
pub use choice::*;
pub use matching::*;
pub use numerical::*;
pub use template::*;
pub use text::*;
