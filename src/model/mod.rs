pub mod bar;
pub mod tick;

pub use bar::Bar;
pub use tick::Tick;
