mod native;

pub use native::NativePlatform;
