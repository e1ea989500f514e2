mod adhash;
mod basic;
mod completeness;
mod sync;
mod traits;
