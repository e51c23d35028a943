mod markers;
mod movement;
mod sessions;
mod tiles;
mod time;
