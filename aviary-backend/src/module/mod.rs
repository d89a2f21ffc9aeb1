pub mod filter;
pub mod gallery;
pub mod renderer;
pub mod resolver;

pub use filter::{FilterController, Visibility};
pub use gallery::{Gallery, Progress, ResolutionReport, UnitSnapshot};
pub use renderer::{render_error_page, CardRenderer, DisplayUnit, UnitStatus};
pub use resolver::{ImageResolver, ImageStrategy, ResolveError};
