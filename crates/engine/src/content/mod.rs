mod images;
mod level;

pub use images::{load_image, ImageLoadError, ImageLoader};
pub use level::{load_level, parse_level, LevelDef, LevelError, SourceLocation};
