pub mod combinatorics;
pub mod exclusive;
pub mod roller;
