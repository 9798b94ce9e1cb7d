pub mod director;
pub mod event;
pub mod fx;
pub mod highscore;
pub mod level;
pub mod pause;
pub mod pool;
pub mod score;
pub mod store;
pub mod timer;
pub mod world;
