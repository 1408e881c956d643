pub use fenris_traits::allocators::*;
