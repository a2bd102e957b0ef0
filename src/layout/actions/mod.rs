pub mod float;
pub mod focus;
pub mod layout;
pub mod movement;
pub mod resize;
pub mod workspace;
