pub mod bits;
pub mod skiplist;
