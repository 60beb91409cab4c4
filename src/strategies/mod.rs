pub mod directional;
pub mod grid;
pub mod traits;
