pub mod clock;
pub mod entity;
pub mod input;
pub mod math;
pub mod stage;
