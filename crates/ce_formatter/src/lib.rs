//! LaTeX serialization with style-driven rendering.

pub mod latex;
pub mod style;

pub use latex::{serialize_latex, LatexSerializer};
pub use style::{BoundsStyle, FractionStyle, RootStyle, SerializeStyle};
