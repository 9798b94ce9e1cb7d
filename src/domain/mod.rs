pub mod entity;
pub mod movement;
pub mod physics;
pub mod pursuer;
pub mod tile;
