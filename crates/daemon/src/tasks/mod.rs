mod sweeper;

pub use sweeper::spawn_sweeper;
